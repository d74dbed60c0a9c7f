//! Presence and mood updates.

use axum::extract::State;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::AppState;
use crate::account::Principal;
use crate::error::Result;
use crate::profile::Profile;
use crate::router::Valid;
use crate::store::{ProfileStore as _, StoreError};

const STATUSES: [&str; 3] = ["online", "idle", "offline"];

fn validate_status(value: &str) -> std::result::Result<(), ValidationError> {
    if STATUSES.contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::new("status"))
    }
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct Body {
    #[validate(custom(
        function = "validate_status",
        message = "Status must be online, idle or offline."
    ))]
    pub status: String,
    #[validate(length(max = 16))]
    pub mood: String,
}

pub async fn handler(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Valid(body): Valid<Body>,
) -> Result<Json<Profile>> {
    state
        .stores
        .profiles
        .set_presence(&principal.id, &body.status, &body.mood)
        .await?;

    let profile = state
        .stores
        .profiles
        .get(&principal.id)
        .await?
        .ok_or(StoreError::NotFound("profile"))?;

    Ok(Json(profile))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app;
    use crate::router::tests::{json_body, request, sign_up, state};
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn test_update_presence() {
        let app = app(state());
        let (_, token) = sign_up(&app, "nova@verse.dev", "Nova").await;

        let response = request(
            app,
            Method::PATCH,
            "/users/@me",
            Some(&token),
            json!({"status": "idle", "mood": "🌙"}).to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let profile: Profile = json_body(response).await;
        assert_eq!(profile.status, "idle");
        assert_eq!(profile.mood, "🌙");
    }

    #[tokio::test]
    async fn test_update_rejects_unknown_status() {
        let app = app(state());
        let (_, token) = sign_up(&app, "nova@verse.dev", "Nova").await;

        let response = request(
            app,
            Method::PATCH,
            "/users/@me",
            Some(&token),
            json!({"status": "away", "mood": ""}).to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
