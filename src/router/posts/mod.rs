//! Feed-related HTTP API.
mod create;
mod like;
mod list;
mod subscribe;

use axum::routing::{get, post, put};
use axum::{Router, middleware};

use crate::AppState;
use crate::router::auth;

/// Default page size for feed reads and subscriptions.
pub const DEFAULT_LIMIT: usize = 20;

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        // `POST /posts` goes to `create`, `GET /posts` to `list`.
        .route("/", post(create::handler).get(list::handler))
        // `GET /posts/subscribe` opens the live feed stream.
        .route("/subscribe", get(subscribe::handler))
        // `PUT`/`DELETE /posts/:ID/likes` toggle the caller's like.
        .route("/{post_id}/likes", put(like::like).delete(like::unlike))
        .route_layer(middleware::from_fn_with_state(state, auth))
}
