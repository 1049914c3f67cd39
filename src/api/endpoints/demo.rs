//! Canned demo submissions for front-end testing.

use axum::extract::Path;
use axum::Json;
use serde::Serialize;

use crate::api::error::ApiError;

pub const DEMO_IDS: [&str; 4] = ["emergency", "urgent", "gp", "self_care"];

/// A submission in the same shape `POST /api/triage` accepts.
#[derive(Debug, Clone, Serialize)]
pub struct DemoForm {
    pub symptoms_text: &'static str,
    pub symptoms_list: Vec<&'static str>,
    pub age: Option<u32>,
    pub is_child: bool,
    pub severity: &'static str,
    pub duration: Option<&'static str>,
    pub additional_factors: Vec<&'static str>,
    pub temperature: Option<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DemoPayload {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub payload: DemoForm,
}

#[derive(Serialize)]
pub struct DemoList {
    pub demo_ids: Vec<&'static str>,
    pub description: &'static str,
}

/// `GET /api/demo`
pub async fn list() -> Json<DemoList> {
    Json(DemoList {
        demo_ids: DEMO_IDS.to_vec(),
        description: "Use /api/demo/{id} to get specific demo payloads for testing",
    })
}

/// `GET /api/demo/:id`
pub async fn payload(Path(id): Path<String>) -> Result<Json<DemoPayload>, ApiError> {
    demo_payload(&id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Demo payload not found".into()))
}

pub fn demo_payload(id: &str) -> Option<DemoPayload> {
    let demo = match id {
        "emergency" => DemoPayload {
            id: "emergency",
            name: "Cardiac Emergency",
            description: "Severe chest pain with shortness of breath, expected EMERGENCY",
            payload: DemoForm {
                symptoms_text: "Crushing chest pain with shortness of breath and dizziness",
                symptoms_list: vec!["chest_pain", "breathlessness", "dizziness"],
                age: Some(58),
                is_child: false,
                severity: "severe",
                duration: Some("sudden onset"),
                additional_factors: vec!["sweating", "nausea"],
                temperature: None,
            },
        },
        "urgent" => DemoPayload {
            id: "urgent",
            name: "High Fever with Concerning Symptoms",
            description: "High fever with headache and confusion, expected URGENT",
            payload: DemoForm {
                symptoms_text: "High fever of 104°F with a bad headache and some confusion",
                symptoms_list: vec!["fever", "headache"],
                age: Some(34),
                is_child: false,
                severity: "severe",
                duration: Some("2 days"),
                additional_factors: vec!["confusion"],
                temperature: Some("104°F"),
            },
        },
        "gp" => DemoPayload {
            id: "gp",
            name: "Persistent Cough",
            description: "Cough lasting over 2 weeks, expected ROUTINE",
            payload: DemoForm {
                symptoms_text: "Persistent cough for three weeks and feeling tired",
                symptoms_list: vec!["cough", "fatigue"],
                age: Some(52),
                is_child: false,
                severity: "moderate",
                duration: Some("3 weeks"),
                additional_factors: vec!["weight loss"],
                temperature: None,
            },
        },
        "self_care" => DemoPayload {
            id: "self_care",
            name: "Mild Cold Symptoms",
            description: "Basic cold symptoms, expected SELF_CARE",
            payload: DemoForm {
                symptoms_text: "Runny nose, sneezing and a mild cough",
                symptoms_list: vec!["runny_nose"],
                age: Some(27),
                is_child: false,
                severity: "mild",
                duration: Some("2 days"),
                additional_factors: vec![],
                temperature: None,
            },
        },
        _ => return None,
    };
    Some(demo)
}
