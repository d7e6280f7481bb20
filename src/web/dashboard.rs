use crate::analytics::metrics::{compute_metrics, DashboardMetrics, QuestionKeys};
use crate::error::SurveyError;
use crate::state::SharedState;
use crate::web::session::AdminSession;
use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/metrics", get(metrics))
        .with_state(state)
}

async fn metrics(
    AdminSession(admin): AdminSession,
    State(state): State<SharedState>,
) -> Result<Json<DashboardMetrics>, SurveyError> {
    let employees = state.store.list_employees().await?;
    let responses: Vec<_> = state
        .store
        .list_responses()
        .await?
        .into_iter()
        .filter(|r| r.survey_id == state.survey_id)
        .collect();

    tracing::debug!(
        "Dashboard for {}: {} employees, {} responses",
        admin.email,
        employees.len(),
        responses.len()
    );

    Ok(Json(compute_metrics(
        &employees,
        &responses,
        QuestionKeys::default(),
        Utc::now(),
    )))
}
