use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

#[derive(Clone)]
pub struct HealthState {
    agents: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub agents: usize,
    pub checked_at: String,
}

pub fn router(agents: usize) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { agents })
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let payload = HealthResponse {
        status: "ready",
        service: HealthCheck {
            status: "ready",
            detail: format!("storechat-server serving {} agent route(s)", state.agents),
        },
        agents: state.agents,
        checked_at: Utc::now().to_rfc3339(),
    };

    (StatusCode::OK, Json(payload))
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, extract::State, http::Request, http::StatusCode, Json};
    use chrono::DateTime;
    use tower::ServiceExt;

    use crate::health::{health, router, HealthState};

    #[tokio::test]
    async fn health_reports_ready_with_agent_count() {
        let (status, Json(payload)) = health(State(HealthState { agents: 3 })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "ready");
        assert_eq!(payload.service.status, "ready");
        assert_eq!(payload.agents, 3);
        assert!(DateTime::parse_from_rfc3339(&payload.checked_at).is_ok());
    }

    #[tokio::test]
    async fn health_route_is_mounted_without_auth() {
        let response = router(1)
            .oneshot(Request::builder().uri("/health").body(Body::empty()).expect("request"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
    }
}
