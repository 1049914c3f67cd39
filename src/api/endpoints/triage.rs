//! Symptom triage endpoint.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, TriageResponse};
use crate::pipeline::triage::{build_request, SymptomInput};

/// `POST /api/triage`: classify a symptom form submission.
pub async fn assess(
    State(ctx): State<ApiContext>,
    payload: Result<Json<SymptomInput>, JsonRejection>,
) -> Result<Json<TriageResponse>, ApiError> {
    let Json(input) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let request = build_request(&input)?;
    let verdict = ctx
        .service
        .triage_until_cancelled(&request, &ctx.shutdown)
        .await?;

    Ok(Json(TriageResponse::new(&request, verdict)))
}
