use crate::domain::models::{Answers, SurveySubmission};
use crate::error::SurveyError;
use crate::state::SharedState;
use crate::web::session::CurrentEmployee;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Deserialize)]
pub struct SubmitPayload {
    #[serde(default)]
    pub answers: HashMap<String, serde_json::Value>,
}

#[derive(Serialize)]
pub struct SurveyStatus {
    pub survey_id: String,
    pub can_submit: bool,
}

#[derive(Serialize)]
pub struct SubmitResponse {
    pub id: Uuid,
    pub survey_id: String,
    pub created_at: DateTime<Utc>,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/status", get(status))
        .route("/responses", post(submit))
        .with_state(state)
}

/// Checked before the form is shown, so a repeat visit lands on the
/// already-submitted state.
async fn status(
    CurrentEmployee(employee): CurrentEmployee,
    State(state): State<SharedState>,
) -> Result<Json<SurveyStatus>, SurveyError> {
    let can_submit = state.gate.can_submit(&employee.email, &state.survey_id).await?;
    Ok(Json(SurveyStatus {
        survey_id: state.survey_id.clone(),
        can_submit,
    }))
}

async fn submit(
    CurrentEmployee(employee): CurrentEmployee,
    State(state): State<SharedState>,
    Json(payload): Json<SubmitPayload>,
) -> Result<(StatusCode, Json<SubmitResponse>), SurveyError> {
    let answers = Answers::from_raw(payload.answers)?;
    let response = SurveySubmission {
        email: employee.email,
        survey_id: state.survey_id.clone(),
        answers,
    }
    .validate()?;

    let stored = state.gate.submit(response).await?;
    Ok((
        StatusCode::CREATED,
        Json(SubmitResponse {
            id: stored.id,
            survey_id: stored.survey_id,
            created_at: stored.created_at,
        }),
    ))
}
