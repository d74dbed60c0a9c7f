//! Public self-registration endpoint.
//!
//! Unlike the rest of the API this endpoint is unauthenticated and
//! answers plain text on every failure path, keeping the contract of the
//! original cloud function: 201 JSON on success, 405 on any non-POST
//! method, 500 on a persistence failure.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::directory::RegisteredAgent;
use crate::store::RegistryStore as _;

#[derive(Debug, Serialize, Deserialize)]
pub struct Body {
    pub name: String,
    pub capability: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub status: String,
    pub message: String,
}

/// Register an anonymous agent record.
pub async fn handler(
    State(state): State<AppState>,
    body: Result<Json<Body>, JsonRejection>,
) -> Response {
    let Ok(Json(body)) = body else {
        return (StatusCode::BAD_REQUEST, "Invalid registration body").into_response();
    };

    let name = body.name.trim();
    let capability = body.capability.trim();
    if name.is_empty() || capability.is_empty() {
        return (StatusCode::BAD_REQUEST, "Missing 'name' or 'capability'").into_response();
    }

    let agent = RegisteredAgent::new(name, capability);
    match state.stores.registry.insert(&agent).await {
        Ok(()) => (
            StatusCode::CREATED,
            Json(RegisterResponse {
                status: "registered".to_owned(),
                message: format!("Agent {} registered in the verse", agent.name),
            }),
        )
            .into_response(),
        Err(err) => {
            tracing::error!(error = %err, agent = %agent.name, "agent registration failed");

            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to register agent").into_response()
        },
    }
}

/// Everything that is not a POST.
pub async fn method_not_allowed() -> Response {
    (StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app;
    use crate::router::tests::{json_body, request, state, text_body};
    use axum::http::Method;
    use serde_json::json;

    #[tokio::test]
    async fn test_register_agent() {
        let app = app(state());

        let response = request(
            app,
            Method::POST,
            "/register",
            None,
            json!({"name": "Bot1", "capability": "chat"}).to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let body: RegisterResponse = json_body(response).await;
        assert_eq!(body.status, "registered");
        assert!(body.message.contains("Bot1"));
    }

    #[tokio::test]
    async fn test_register_rejects_other_methods() {
        let app = app(state());

        let response =
            request(app, Method::GET, "/register", None, String::default()).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(text_body(response).await, "Method Not Allowed");
    }

    #[tokio::test]
    async fn test_register_rejects_empty_fields() {
        let app = app(state());

        let response = request(
            app,
            Method::POST,
            "/register",
            None,
            json!({"name": "  ", "capability": "chat"}).to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
