//! HTTP API.

pub mod admin;
pub mod create;
pub mod directory;
pub mod friends;
pub mod login;
pub mod logout;
pub mod posts;
pub mod register;
pub mod status;
pub mod users;

use std::sync::LazyLock;

use axum::Json;
use axum::extract::{FromRequest, Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;
use regex_lite::Regex;
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::AppState;
use crate::error::ServerError;

const BEARER: &str = "Bearer ";

static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-f]{64}$").unwrap());

/// JSON body extractor that also runs the `validator` checks.
pub struct Valid<T>(pub T);

impl<S, T> FromRequest<S> for Valid<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ServerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate()?;

        Ok(Valid(value))
    }
}

/// Extract the bearer token, rejecting anything that cannot be one.
pub(crate) fn bearer(req: &Request) -> Result<String, ServerError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .map(|token| token.replace(BEARER, ""))
        .ok_or(ServerError::Unauthorized)?;

    if !TOKEN.is_match(&token) {
        return Err(ServerError::Unauthorized);
    }

    Ok(token)
}

/// Custom middleware for authentification.
pub async fn auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let token = bearer(&req)?;
    let (principal, _) = state
        .accounts
        .resolve(&token)
        .await?
        .ok_or(ServerError::Unauthorized)?;

    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}

/// Privileged-session middleware for the admin console. Every call
/// re-checks the allow-listed identity server-side; an admin-flagged
/// session belonging to anyone else is worthless.
pub async fn admin_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let token = bearer(&req)?;
    let Some((principal, session)) = state.accounts.resolve(&token).await? else {
        return Err(ServerError::Unauthorized);
    };

    let allowed = &state.config.admin.email;
    if !session.admin
        || allowed.is_empty()
        || !principal.email.eq_ignore_ascii_case(allowed)
    {
        return Err(ServerError::Unauthorized);
    }

    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}
