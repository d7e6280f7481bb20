use crate::config::Config;
use crate::db::SurveyStore;
use crate::domain::gate::SubmissionGate;
use crate::middleware::LoginLimiter;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SurveyStore>,
    pub gate: SubmissionGate,
    pub login_limiter: LoginLimiter,
    pub trust_proxy: bool,
    pub session_key: Vec<u8>,
    pub survey_id: String,
    pub secure_cookies: bool,
}

impl AppState {
    pub fn new(store: Arc<dyn SurveyStore>, config: &Config) -> Self {
        Self {
            gate: SubmissionGate::new(store.clone()),
            store,
            login_limiter: LoginLimiter::new(
                config.login_rate_limit,
                config.login_rate_window_secs,
            ),
            trust_proxy: config.trust_proxy,
            session_key: config.session_key.clone(),
            survey_id: config.survey_id.clone(),
            secure_cookies: config.secure_cookies,
        }
    }
}

pub type SharedState = Arc<AppState>;
