//! Live feed stream over Server-Sent Events.
//!
//! The first event carries the current window; every later event carries
//! the full replacement window after a change. Disconnecting drops the
//! subscription and frees its listener slot.

use std::convert::Infallible;

use axum::Extension;
use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use serde::Deserialize;
use tokio_stream::Stream;

use crate::AppState;
use crate::account::Principal;
use crate::error::Result;
use crate::feed::Post;

use super::DEFAULT_LIMIT;

#[derive(Debug, Deserialize)]
pub struct Params {
    pub limit: Option<usize>,
}

pub async fn handler(
    State(state): State<AppState>,
    Extension(_principal): Extension<Principal>,
    Query(params): Query<Params>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    let (initial, mut subscription) = state
        .feed
        .subscribe(params.limit.unwrap_or(DEFAULT_LIMIT))
        .await?;

    let stream = async_stream::stream! {
        yield feed_event(&initial);

        while let Some(snapshot) = subscription.recv().await {
            yield feed_event(&snapshot);
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

fn feed_event(posts: &[Post]) -> std::result::Result<Event, Infallible> {
    Ok(Event::default()
        .event("feed")
        .data(serde_json::to_string(posts).unwrap_or_default()))
}
