pub mod auth;
pub mod dashboard;
pub mod session;
pub mod survey;

use crate::state::SharedState;
use axum::{routing::get, Router};

async fn health() -> &'static str {
    "OK"
}

pub fn routes(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/auth", auth::router(state.clone()))
        .nest("/survey", survey::router(state.clone()))
        .nest("/dashboard", dashboard::router(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::{seed::demo_employees, InMemoryStore};
    use crate::state::AppState;
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app() -> Router {
        let store = Arc::new(InMemoryStore::with_employees(demo_employees()));
        let state = Arc::new(AppState::new(store, &Config::local()));
        routes(state)
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn json_request(method: Method, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(Method::GET).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    /// Logs in and returns the session token from the Set-Cookie header.
    async fn login(app: &Router, email: &str) -> String {
        let response = app
            .clone()
            .oneshot(json_request(Method::POST, "/auth/login", None, json!({ "email": email })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap()
            .to_string();
        cookie
            .split(';')
            .next()
            .and_then(|kv| kv.strip_prefix("session="))
            .unwrap()
            .to_string()
    }

    async fn submit(app: &Router, token: &str, answers: Value) -> Response {
        app.clone()
            .oneshot(json_request(
                Method::POST,
                "/survey/responses",
                Some(token),
                json!({ "answers": answers }),
            ))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app().oneshot(get_request("/health", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_login_lands_by_role() {
        let app = app();

        let response = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/auth/login",
                None,
                json!({ "email": "Admin@Company.com" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["landing"], "dashboard");
        assert_eq!(body["role"], "ADMIN");

        let response = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/auth/login",
                None,
                json!({ "email": "dev1@company.com" }),
            ))
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["landing"], "survey");
        assert_eq!(body["name"], "Developer One");
    }

    #[tokio::test]
    async fn test_unknown_email_is_not_found() {
        let response = app()
            .oneshot(json_request(
                Method::POST,
                "/auth/login",
                None,
                json!({ "email": "nobody@company.com" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["error"], "not_found");
    }

    #[tokio::test]
    async fn test_survey_requires_session() {
        let response = app()
            .oneshot(get_request("/survey/status", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_submit_once_then_already_submitted() {
        let app = app();
        let token = login(&app, "dev1@company.com").await;

        let status = body_json(
            app.clone()
                .oneshot(get_request("/survey/status", Some(&token)))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(status["can_submit"], true);
        assert_eq!(status["survey_id"], "bday-survey-2024");

        let response = submit(&app, &token, json!({ "q1": 4, "q2": "Great" })).await;
        assert_eq!(response.status(), StatusCode::CREATED);

        for _ in 0..2 {
            let response = submit(&app, &token, json!({ "q1": 5 })).await;
            assert_eq!(response.status(), StatusCode::CONFLICT);
            let body = body_json(response).await;
            assert_eq!(body["error"], "already_submitted");
        }

        let status = body_json(
            app.clone()
                .oneshot(get_request("/survey/status", Some(&token)))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(status["can_submit"], false);
    }

    #[tokio::test]
    async fn test_submit_without_rating_is_rejected() {
        let app = app();
        let token = login(&app, "dev2@company.com").await;

        let response = submit(&app, &token, json!({ "q2": "Nice cake" })).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = submit(&app, &token, json!({ "q1": 9 })).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        // rejected attempts leave the gate open
        let response = submit(&app, &token, json!({ "q1": 3 })).await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_dashboard_is_admin_only() {
        let app = app();
        let member = login(&app, "sale1@company.com").await;
        let response = app
            .clone()
            .oneshot(get_request("/dashboard/metrics", Some(&member)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_dashboard_metrics_after_one_submission() {
        let app = app();
        let member = login(&app, "dev1@company.com").await;
        let response = submit(&app, &member, json!({ "q1": 4, "q2": "Great" })).await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let admin = login(&app, "admin@company.com").await;
        let response = app
            .clone()
            .oneshot(get_request("/dashboard/metrics", Some(&admin)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let metrics = body_json(response).await;

        assert_eq!(metrics["total_participants"], 1);
        assert_eq!(metrics["participation_rate"], 25);
        assert_eq!(metrics["engagement_score"], 4.0);
        assert_eq!(metrics["improvement_priority"], "Low");
        assert_eq!(metrics["department_breakdown"]["Engineering"], 1);
        assert_eq!(metrics["anonymized_feedback"], json!([]));
        assert_eq!(metrics["non_participants"].as_array().map(Vec::len), Some(3));
        assert_eq!(metrics["monthly_trend"].as_array().map(Vec::len), Some(3));
    }

    #[tokio::test]
    async fn test_login_rate_limited() {
        let app = app();
        for _ in 0..5 {
            let response = app
                .clone()
                .oneshot(json_request(
                    Method::POST,
                    "/auth/login",
                    None,
                    json!({ "email": "nobody@company.com" }),
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
        }
        let response = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/auth/login",
                None,
                json!({ "email": "dev1@company.com" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_spoofed_forwarded_addresses_share_one_budget() {
        let app = app();
        let mut statuses = Vec::new();
        for i in 0..8 {
            let mut request = json_request(
                Method::POST,
                "/auth/login",
                None,
                json!({ "email": format!("guest{i}@company.com") }),
            );
            request.headers_mut().insert(
                "x-forwarded-for",
                format!("10.0.0.{i}").parse().unwrap(),
            );
            statuses.push(app.clone().oneshot(request).await.unwrap().status());
        }
        assert!(statuses[..5].iter().all(|s| *s == StatusCode::NOT_FOUND));
        assert!(statuses[5..].iter().all(|s| *s == StatusCode::TOO_MANY_REQUESTS));
    }
}
