//! Friend request HTTP API.
//!
//! Minimal by design: send and accept, nothing else. On acceptance both
//! friend counters move through two separate profile updates, the same
//! two-step shape the rest of the counters follow.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Extension, Json, Router, middleware};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::AppState;
use crate::account::Principal;
use crate::error::{Result, ServerError};
use crate::friend::FriendRequest;
use crate::profile::CounterDelta;
use crate::router::{Valid, auth};
use crate::store::{FriendStore as _, ProfileStore as _, StoreError};

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        // `POST /friends` sends a request.
        .route("/", post(send))
        // `POST /friends/:ID/accept` accepts it, from either side.
        .route("/{request_id}/accept", post(accept))
        .route_layer(middleware::from_fn_with_state(state, auth))
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct Body {
    #[validate(length(min = 1, max = 64))]
    pub to: String,
}

fn self_request() -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    errors.add(
        "to",
        ValidationError::new("to").with_message("Cannot befriend yourself.".into()),
    );
    errors
}

async fn send(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Valid(body): Valid<Body>,
) -> Result<(StatusCode, Json<FriendRequest>)> {
    if body.to == principal.id {
        return Err(self_request().into());
    }

    // The recipient must exist as a profile.
    state
        .stores
        .profiles
        .get(&body.to)
        .await?
        .ok_or(StoreError::NotFound("profile"))?;

    let request = FriendRequest::new(&principal.id, &body.to);
    state.stores.friends.insert(&request).await?;

    Ok((StatusCode::CREATED, Json(request)))
}

async fn accept(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(request_id): Path<String>,
) -> Result<Json<FriendRequest>> {
    let request = state
        .stores
        .friends
        .get(&request_id)
        .await?
        .ok_or(StoreError::NotFound("friend request"))?;

    if !request.involves(&principal.id) {
        return Err(ServerError::Unauthorized);
    }

    let accepted = state.stores.friends.accept(&request_id).await?;

    state
        .stores
        .profiles
        .increment(&accepted.from_id, CounterDelta::friends(1))
        .await?;
    state
        .stores
        .profiles
        .increment(&accepted.to_id, CounterDelta::friends(1))
        .await?;

    Ok(Json(accepted))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app;
    use crate::friend;
    use crate::router::tests::{json_body, request, sign_up, state};
    use axum::http::Method;
    use serde_json::json;

    #[tokio::test]
    async fn test_accept_increments_both_friend_counters() {
        let app = app(state());
        let (nova_id, nova_token) = sign_up(&app, "nova@verse.dev", "Nova").await;
        let (rex_id, rex_token) = sign_up(&app, "rex@verse.dev", "Rex").await;

        let response = request(
            app.clone(),
            Method::POST,
            "/friends",
            Some(&nova_token),
            json!({"to": rex_id}).to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let sent: FriendRequest = json_body(response).await;
        assert_eq!(sent.status, friend::STATUS_PENDING);

        // The recipient accepts.
        let response = request(
            app.clone(),
            Method::POST,
            &format!("/friends/{}/accept", sent.id),
            Some(&rex_token),
            String::default(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let accepted: FriendRequest = json_body(response).await;
        assert_eq!(accepted.status, friend::STATUS_ACCEPTED);

        for (id, token) in [(nova_id, &nova_token), (rex_id, &rex_token)] {
            let response = request(
                app.clone(),
                Method::GET,
                &format!("/users/{id}"),
                Some(token),
                String::default(),
            )
            .await;
            let body: serde_json::Value = json_body(response).await;
            assert_eq!(body["profile"]["friends"], 1);
        }
    }

    #[tokio::test]
    async fn test_accept_twice_conflicts() {
        let app = app(state());
        let (_, nova_token) = sign_up(&app, "nova@verse.dev", "Nova").await;
        let (rex_id, rex_token) = sign_up(&app, "rex@verse.dev", "Rex").await;

        let response = request(
            app.clone(),
            Method::POST,
            "/friends",
            Some(&nova_token),
            json!({"to": rex_id}).to_string(),
        )
        .await;
        let sent: FriendRequest = json_body(response).await;

        let path = format!("/friends/{}/accept", sent.id);
        let response =
            request(app.clone(), Method::POST, &path, Some(&rex_token), String::default())
                .await;
        assert_eq!(response.status(), StatusCode::OK);

        let response =
            request(app, Method::POST, &path, Some(&rex_token), String::default()).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_outsider_cannot_accept() {
        let app = app(state());
        let (_, nova_token) = sign_up(&app, "nova@verse.dev", "Nova").await;
        let (rex_id, _) = sign_up(&app, "rex@verse.dev", "Rex").await;
        let (_, spy_token) = sign_up(&app, "spy@verse.dev", "Spy").await;

        let response = request(
            app.clone(),
            Method::POST,
            "/friends",
            Some(&nova_token),
            json!({"to": rex_id}).to_string(),
        )
        .await;
        let sent: FriendRequest = json_body(response).await;

        let response = request(
            app,
            Method::POST,
            &format!("/friends/{}/accept", sent.id),
            Some(&spy_token),
            String::default(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_cannot_befriend_unknown_profile() {
        let app = app(state());
        let (_, token) = sign_up(&app, "nova@verse.dev", "Nova").await;

        let response = request(
            app,
            Method::POST,
            "/friends",
            Some(&token),
            json!({"to": "ghost"}).to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
