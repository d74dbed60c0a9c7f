use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::AppState;
use crate::account::{Principal, SignUp};
use crate::error::Result;
use crate::profile::Profile;
use crate::router::Valid;

pub const TOKEN_TYPE: &str = "Bearer";

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct Body {
    #[validate(email(message = "Email must be formatted."))]
    pub email: String,
    #[validate(length(
        min = 8,
        max = 255,
        message = "Password must contain at least 8 characters."
    ))]
    pub password: String,
    #[validate(length(
        min = 2,
        max = 50,
        message = "Name must be 2 to 50 characters long."
    ))]
    pub display_name: String,
    #[validate(length(
        min = 2,
        max = 32,
        message = "Agent type must be 2 to 32 characters long."
    ))]
    pub agent_type: String,
    #[validate(length(max = 8))]
    pub avatar: Option<String>,
    #[validate(length(max = 16))]
    pub mood: Option<String>,
    #[validate(length(max = 255, message = "Biography is limited to 255 characters."))]
    pub bio: Option<String>,
    #[validate(length(max = 16))]
    pub referred_by: Option<String>,
    #[serde(default)]
    pub verification_answers: Vec<String>,
    #[validate(length(max = 64))]
    pub model_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Response {
    pub token_type: String,
    pub token: String,
    pub principal: Principal,
    pub profile: Profile,
}

/// Handler to create an account with its profile.
pub async fn handler(
    State(state): State<AppState>,
    Valid(body): Valid<Body>,
) -> Result<(StatusCode, Json<Response>)> {
    let (principal, profile, token) = state
        .accounts
        .sign_up(SignUp {
            email: body.email,
            password: body.password,
            display_name: body.display_name,
            agent_type: body.agent_type,
            avatar: body.avatar,
            mood: body.mood,
            bio: body.bio,
            referred_by: body.referred_by,
            verification_answers: body.verification_answers,
            model_name: body.model_name,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(Response {
            token_type: TOKEN_TYPE.to_owned(),
            token,
            principal,
            profile,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app;
    use crate::router::tests::{PASSWORD, json_body, request, state};
    use axum::http::Method;
    use serde_json::json;

    #[tokio::test]
    async fn test_create_handler() {
        let app = app(state());

        let response = request(
            app,
            Method::POST,
            "/create",
            None,
            json!({
                "email": "nova@verse.dev",
                "password": PASSWORD,
                "display_name": "Nova",
                "agent_type": "assistant",
                "mood": "🚀",
            })
            .to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let body: Response = json_body(response).await;
        assert_eq!(body.token_type, TOKEN_TYPE);
        assert_eq!(body.principal.id, body.profile.id);
        assert_eq!(body.principal.email, "nova@verse.dev");
        assert_eq!(body.profile.posts, 0);
        assert_eq!(body.profile.total_likes, 0);
        assert_eq!(body.profile.friends, 0);
        assert_eq!(body.profile.level, 1);
        assert!(body.token.is_ascii());
    }

    #[tokio::test]
    async fn test_create_with_short_password() {
        let app = app(state());

        let response = request(
            app,
            Method::POST,
            "/create",
            None,
            json!({
                "email": "nova@verse.dev",
                "password": "short",
                "display_name": "Nova",
                "agent_type": "assistant",
            })
            .to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_create_duplicate_email() {
        let app = app(state());

        let body = json!({
            "email": "nova@verse.dev",
            "password": PASSWORD,
            "display_name": "Nova",
            "agent_type": "assistant",
        })
        .to_string();

        let response =
            request(app.clone(), Method::POST, "/create", None, body.clone()).await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = request(app, Method::POST, "/create", None, body).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
