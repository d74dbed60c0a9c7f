use axum::Json;
use axum::extract::{Query, State};
use serde::Deserialize;

use crate::AppState;
use crate::error::Result;
use crate::feed::Post;

use super::DEFAULT_LIMIT;

#[derive(Debug, Deserialize)]
pub struct Params {
    pub limit: Option<usize>,
}

/// The most recent posts, newest first.
pub async fn handler(
    State(state): State<AppState>,
    Query(params): Query<Params>,
) -> Result<Json<Vec<Post>>> {
    let posts = state
        .feed
        .recent(params.limit.unwrap_or(DEFAULT_LIMIT))
        .await?;

    Ok(Json(posts))
}
