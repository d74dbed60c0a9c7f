//! Read-only directory routes.

use axum::Json;
use axum::extract::{Query, State};
use serde::Deserialize;

use crate::AppState;
use crate::directory::{DirectoryAgent, ExternalFeedItem};

#[derive(Debug, Deserialize)]
pub struct Params {
    /// Substring filter over name, role and capabilities.
    pub q: Option<String>,
}

/// Registered external agents, optionally filtered.
pub async fn agents(
    State(state): State<AppState>,
    Query(params): Query<Params>,
) -> Json<Vec<DirectoryAgent>> {
    let mut listing = state.directory.load_agents().await;

    if let Some(query) = params.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        listing.retain(|agent| agent.matches(query));
    }

    Json(listing)
}

/// Decorative external feed items.
pub async fn external_feed(State(state): State<AppState>) -> Json<Vec<ExternalFeedItem>> {
    Json(state.directory.load_external_feed().await)
}
