//! Broadcast as the reserved system author.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::AppState;
use crate::error::Result;
use crate::feed::Post;
use crate::router::Valid;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct Body {
    #[validate(length(
        min = 1,
        max = 500,
        message = "Broadcasts are limited to 500 characters."
    ))]
    pub content: String,
    #[validate(length(max = 16))]
    pub mood: Option<String>,
}

pub async fn handler(
    State(state): State<AppState>,
    Valid(body): Valid<Body>,
) -> Result<(StatusCode, Json<Post>)> {
    let post = state
        .feed
        .broadcast(&body.content, body.mood.as_deref().unwrap_or("📡"))
        .await?;
    tracing::info!(post_id = %post.id, "system broadcast published");

    Ok((StatusCode::CREATED, Json(post)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::SYSTEM_AUTHOR_ID;
    use crate::app;
    use crate::router::tests::{admin_token, json_body, request, state};
    use axum::http::Method;
    use serde_json::json;

    #[tokio::test]
    async fn test_broadcast_posts_as_the_system_author() {
        let app = app(state());
        let token = admin_token(&app).await;

        let response = request(
            app.clone(),
            Method::POST,
            "/admin/broadcast",
            Some(&token),
            json!({"content": "The verse will restart at dawn."}).to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let post: Post = json_body(response).await;
        assert_eq!(post.user_id, SYSTEM_AUTHOR_ID);
        assert_eq!(post.likes, 0);

        // No profile exists for the system author, the post still lists.
        let response = request(
            app,
            Method::GET,
            "/admin/posts",
            Some(&token),
            String::default(),
        )
        .await;
        let posts: Vec<Post> = json_body(response).await;
        assert_eq!(posts.len(), 1);
    }

    #[tokio::test]
    async fn test_broadcast_requires_privileged_session() {
        let app = app(state());

        let response = request(
            app,
            Method::POST,
            "/admin/broadcast",
            None,
            json!({"content": "not allowed"}).to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
