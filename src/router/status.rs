//! Public configuration page for front-end identification.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::config::Configuration;
use crate::profile::VERIFICATION_QUESTIONS;

/// Structured configuration.
#[derive(Serialize)]
pub struct Status {
    version: String,
    name: String,
    url: String,
    /// Questions the sign-up form shows for the verified badge.
    verification_questions: [&'static str; VERIFICATION_QUESTIONS.len()],
}

/// Public server status (configuration).
pub async fn status(State(config): State<Arc<Configuration>>) -> Json<Status> {
    Json(Status {
        version: config.version().to_owned(),
        name: config.name.clone(),
        url: config.url.clone(),
        verification_questions: VERIFICATION_QUESTIONS,
    })
}
