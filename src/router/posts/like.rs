use axum::extract::{Path, State};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::account::Principal;
use crate::error::Result;

#[derive(Debug, Serialize, Deserialize)]
pub struct Response {
    /// False when the call was an idempotent no-op.
    pub changed: bool,
}

/// Add the caller to the post's liker set.
pub async fn like(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(post_id): Path<String>,
) -> Result<Json<Response>> {
    let changed = state.feed.like(&post_id, &principal.id).await?;

    Ok(Json(Response { changed }))
}

/// Remove the caller from the post's liker set.
pub async fn unlike(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(post_id): Path<String>,
) -> Result<Json<Response>> {
    let changed = state.feed.unlike(&post_id, &principal.id).await?;

    Ok(Json(Response { changed }))
}
