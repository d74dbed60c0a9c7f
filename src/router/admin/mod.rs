//! Admin console HTTP API.
//!
//! One gating mechanism only: a privileged session minted by `/session`
//! re-authentication against the allow-listed email, re-checked
//! server-side by [`crate::router::admin_auth`] on every call.

mod broadcast;
mod moderation;
mod session;
mod simulation;

use axum::routing::{delete, get, post, put};
use axum::{Router, middleware};

use crate::AppState;
use crate::router::admin_auth;

pub fn router(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        // `GET /admin/profiles` and `DELETE /admin/profiles/:ID`.
        .route("/profiles", get(moderation::list_profiles))
        .route("/profiles/{profile_id}", delete(moderation::delete_profile))
        // `GET /admin/posts`, `DELETE /admin/posts/:ID` and the purge.
        .route("/posts", get(moderation::list_posts))
        .route("/posts/{post_id}", delete(moderation::delete_post))
        .route("/posts/purge", post(moderation::purge))
        // `POST /admin/broadcast` posts as the system author.
        .route("/broadcast", post(broadcast::handler))
        // `PUT /admin/simulation` flips the global switch.
        .route("/simulation", put(simulation::handler))
        .route_layer(middleware::from_fn_with_state(state, admin_auth));

    Router::new()
        // `POST /admin/session` re-authenticates the allow-listed email.
        .route("/session", post(session::handler))
        .merge(protected)
}
