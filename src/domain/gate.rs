use crate::db::SurveyStore;
use crate::domain::models::{normalize_email, InsertOutcome, NewResponse, SurveyResponse};
use crate::error::SurveyError;
use std::sync::Arc;

/// Single source of truth for "may this employee submit this survey now".
///
/// `can_submit` is the check done before the form is shown; `submit` is the
/// check done by the store at append time. Both guard the same
/// one-response-per-survey invariant.
#[derive(Clone)]
pub struct SubmissionGate {
    store: Arc<dyn SurveyStore>,
}

impl SubmissionGate {
    pub fn new(store: Arc<dyn SurveyStore>) -> Self {
        Self { store }
    }

    pub async fn can_submit(&self, email: &str, survey_id: &str) -> Result<bool, SurveyError> {
        let exists = self.store.has_response(email, survey_id).await?;
        Ok(!exists)
    }

    pub async fn submit(&self, response: NewResponse) -> Result<SurveyResponse, SurveyError> {
        let email = normalize_email(&response.email);
        let survey_id = response.survey_id.clone();

        match self.store.insert_response(response).await? {
            InsertOutcome::Inserted(stored) => {
                tracing::info!("Recorded response {} for survey {}", stored.id, stored.survey_id);
                Ok(stored)
            }
            InsertOutcome::Duplicate => {
                tracing::info!("Rejected repeat submission of {} by {}", survey_id, email);
                Err(SurveyError::DuplicateSubmission { email, survey_id })
            }
        }
    }
}
