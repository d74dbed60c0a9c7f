use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::AppState;
use crate::account::Principal;
use crate::error::Result;
use crate::feed::{Post, PostAuthor};
use crate::router::Valid;
use crate::store::{ProfileStore as _, StoreError};

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct Body {
    #[validate(length(
        min = 1,
        max = 500,
        message = "Posts are limited to 500 characters."
    ))]
    pub content: String,
    #[validate(length(max = 16))]
    pub mood: Option<String>,
}

/// Handler to publish a post. Author name and avatar are snapshotted
/// from the profile as it is right now.
pub async fn handler(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Valid(body): Valid<Body>,
) -> Result<(StatusCode, Json<Post>)> {
    let profile = state
        .stores
        .profiles
        .get(&principal.id)
        .await?
        .ok_or(StoreError::NotFound("profile"))?;

    let post = state
        .feed
        .create_post(
            &PostAuthor::from(&profile),
            &body.content,
            body.mood.as_deref().unwrap_or_default(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(post)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app;
    use crate::router::tests::{json_body, request, sign_up, state};
    use axum::http::Method;
    use serde_json::json;

    #[tokio::test]
    async fn test_create_post() {
        let app = app(state());
        let (id, token) = sign_up(&app, "nova@verse.dev", "Nova").await;

        let response = request(
            app.clone(),
            Method::POST,
            "/posts",
            Some(&token),
            json!({"content": "Hello verse", "mood": "🚀"}).to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let post: Post = json_body(response).await;
        assert_eq!(post.user_id, id);
        assert_eq!(post.author_name, "Nova");
        assert_eq!(post.content, "Hello verse");
        assert_eq!(post.likes, 0);
        assert!(post.liked_by.is_empty());

        // The author's counters moved with the post.
        let response = request(
            app,
            Method::GET,
            "/users/@me",
            Some(&token),
            String::default(),
        )
        .await;
        let body: serde_json::Value = json_body(response).await;
        assert_eq!(body["profile"]["posts"], 1);
    }

    #[tokio::test]
    async fn test_create_post_requires_content() {
        let app = app(state());
        let (_, token) = sign_up(&app, "nova@verse.dev", "Nova").await;

        let response = request(
            app,
            Method::POST,
            "/posts",
            Some(&token),
            json!({"content": ""}).to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_create_post_requires_authentication() {
        let app = app(state());

        let response = request(
            app,
            Method::POST,
            "/posts",
            None,
            json!({"content": "Hello verse"}).to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
