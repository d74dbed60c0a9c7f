//! Read-all and hard-delete over profiles and posts.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::Result;
use crate::feed::Post;
use crate::profile::Profile;
use crate::store::ProfileStore as _;

/// Every profile, oldest first.
pub async fn list_profiles(State(state): State<AppState>) -> Result<Json<Vec<Profile>>> {
    Ok(Json(state.stores.profiles.list().await?))
}

/// Hard-delete one profile. The account behind it survives; historical
/// posts keep their snapshotted author fields.
pub async fn delete_profile(
    State(state): State<AppState>,
    Path(profile_id): Path<String>,
) -> Result<StatusCode> {
    state.stores.profiles.delete(&profile_id).await?;
    tracing::info!(%profile_id, "profile deleted by admin");

    Ok(StatusCode::NO_CONTENT)
}

/// Every post, newest first.
pub async fn list_posts(State(state): State<AppState>) -> Result<Json<Vec<Post>>> {
    Ok(Json(state.feed.list().await?))
}

/// Hard-delete one post.
pub async fn delete_post(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> Result<StatusCode> {
    state.feed.delete(&post_id).await?;
    tracing::info!(%post_id, "post deleted by admin");

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PurgeResponse {
    pub deleted: u64,
}

/// Wipe the whole feed.
pub async fn purge(State(state): State<AppState>) -> Result<Json<PurgeResponse>> {
    let deleted = state.feed.purge().await?;
    tracing::warn!(deleted, "feed purged by admin");

    Ok(Json(PurgeResponse { deleted }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app;
    use crate::router::tests::{admin_token, json_body, request, sign_up, state};
    use axum::http::Method;
    use serde_json::json;

    #[tokio::test]
    async fn test_list_and_delete_profiles() {
        let app = app(state());
        let token = admin_token(&app).await;
        let (nova_id, nova_token) = sign_up(&app, "nova@verse.dev", "Nova").await;

        let response = request(
            app.clone(),
            Method::GET,
            "/admin/profiles",
            Some(&token),
            String::default(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let profiles: Vec<Profile> = json_body(response).await;
        assert_eq!(profiles.len(), 2);

        let response = request(
            app.clone(),
            Method::DELETE,
            &format!("/admin/profiles/{nova_id}"),
            Some(&token),
            String::default(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        // The principal outlives its profile; the session still resolves
        // but the profile is gone.
        let response = request(
            app,
            Method::GET,
            "/users/@me",
            Some(&nova_token),
            String::default(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_purge_empties_the_feed() {
        let app = app(state());
        let token = admin_token(&app).await;
        let (_, nova_token) = sign_up(&app, "nova@verse.dev", "Nova").await;

        for i in 0..3 {
            request(
                app.clone(),
                Method::POST,
                "/posts",
                Some(&nova_token),
                json!({"content": format!("post {i}")}).to_string(),
            )
            .await;
        }

        let response = request(
            app.clone(),
            Method::POST,
            "/admin/posts/purge",
            Some(&token),
            String::default(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: PurgeResponse = json_body(response).await;
        assert_eq!(body.deleted, 3);

        let response = request(
            app,
            Method::GET,
            "/posts",
            Some(&nova_token),
            String::default(),
        )
        .await;
        let posts: Vec<Post> = json_body(response).await;
        assert!(posts.is_empty());
    }

    #[tokio::test]
    async fn test_delete_post() {
        let app = app(state());
        let token = admin_token(&app).await;
        let (_, nova_token) = sign_up(&app, "nova@verse.dev", "Nova").await;

        let response = request(
            app.clone(),
            Method::POST,
            "/posts",
            Some(&nova_token),
            json!({"content": "soon gone"}).to_string(),
        )
        .await;
        let post: Post = json_body(response).await;

        let response = request(
            app.clone(),
            Method::DELETE,
            &format!("/admin/posts/{}", post.id),
            Some(&token),
            String::default(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = request(
            app,
            Method::DELETE,
            &format!("/admin/posts/{}", post.id),
            Some(&token),
            String::default(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
