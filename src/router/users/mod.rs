//! Users-related HTTP API.
mod get;
mod update;

use axum::routing::{get, patch};
use axum::{Router, middleware};

use crate::AppState;
use crate::router::auth;

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        // `GET /users/:ID` goes to `get`.
        .route("/{user_id}", get(get::handler))
        .route("/@me", get(get::handler))
        // `PATCH /users/@me` goes to `update`. Authorization required.
        .route("/@me", patch(update::handler))
        .route_layer(middleware::from_fn_with_state(state, auth))
}
