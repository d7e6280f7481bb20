use crate::domain::models::{Employee, UserRole};
use crate::error::SurveyError;
use crate::state::SharedState;
use crate::web::session::{self, CurrentEmployee};
use axum::{
    extract::{ConnectInfo, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Landing {
    Survey,
    Dashboard,
}

impl Landing {
    pub fn for_role(role: UserRole) -> Self {
        match role {
            UserRole::Admin => Landing::Dashboard,
            UserRole::Member => Landing::Survey,
        }
    }
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub landing: Landing,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
        .with_state(state)
}

/// Client address used to throttle logins. `X-Forwarded-For` is only
/// honoured when the service is configured to sit behind a proxy.
fn client_ip(headers: &HeaderMap, connect: Option<SocketAddr>, trust_proxy: bool) -> String {
    let forwarded = trust_proxy
        .then(|| headers.get("x-forwarded-for"))
        .flatten()
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    forwarded
        .or_else(|| connect.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

async fn login(
    connect: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    State(state): State<SharedState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, SurveyError> {
    let ip = client_ip(&headers, connect.map(|ConnectInfo(addr)| addr), state.trust_proxy);
    if !state.login_limiter.allow(&ip, &payload.email).await {
        tracing::warn!("Login rate limit exceeded for IP: {}", ip);
        return Err(SurveyError::RateLimited);
    }

    let email = payload.email.trim();
    if email.is_empty() {
        return Err(SurveyError::Validation("email is required".into()));
    }

    let employee = state
        .store
        .find_employee_by_email(email)
        .await?
        .ok_or_else(|| SurveyError::NotFound(email.to_string()))?;

    let token = session::sign_session(&employee.email, employee.role, &state.session_key)
        .map_err(|e| SurveyError::Internal(format!("failed to sign session: {e}")))?;

    let mut headers = HeaderMap::new();
    let cookie = HeaderValue::from_str(&session::session_cookie(&token, state.secure_cookies))
        .map_err(|e| SurveyError::Internal(format!("invalid cookie header: {e}")))?;
    headers.insert(header::SET_COOKIE, cookie);

    tracing::info!("{} logged in as {}", employee.email, employee.role.as_str());
    Ok((
        headers,
        Json(LoginResponse {
            landing: Landing::for_role(employee.role),
            email: employee.email,
            name: employee.name,
            role: employee.role,
        }),
    ))
}

async fn logout(State(state): State<SharedState>) -> Result<impl IntoResponse, SurveyError> {
    let cookie = HeaderValue::from_str(&session::clear_cookie(state.secure_cookies))
        .map_err(|e| SurveyError::Internal(format!("invalid cookie header: {e}")))?;
    Ok((StatusCode::NO_CONTENT, [(header::SET_COOKIE, cookie)]))
}

async fn me(CurrentEmployee(employee): CurrentEmployee) -> Json<Employee> {
    Json(employee)
}
