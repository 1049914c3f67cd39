//! Active rule set, for debugging and review.

use axum::extract::State;
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::pipeline::triage::RuleSet;

/// `GET /api/rules`
pub async fn list(State(ctx): State<ApiContext>) -> Result<Json<RuleSet>, ApiError> {
    match &ctx.rules {
        Some(rules) => Ok(Json(rules.as_ref().clone())),
        None => Err(ApiError::NotFound(
            "Rules are served by the configured remote rule service".into(),
        )),
    }
}
