//! Get a profile, optionally the caller's own.

use axum::extract::{Path, State};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::account::Principal;
use crate::error::Result;
use crate::profile::Profile;
use crate::store::{ProfileStore as _, StoreError};

const ME_ROUTE: &str = "@me";

#[derive(Debug, Serialize, Deserialize)]
pub struct Response {
    /// Present only when the caller asked for their own record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal: Option<Principal>,
    pub profile: Profile,
}

pub async fn handler(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    user_id: Option<Path<String>>,
) -> Result<Json<Response>> {
    let user_id = match user_id {
        Some(Path(user_id)) if user_id != ME_ROUTE => user_id,
        _ => principal.id.clone(),
    };

    let profile = state
        .stores
        .profiles
        .get(&user_id)
        .await?
        .ok_or(StoreError::NotFound("profile"))?;

    let own = profile.id == principal.id;
    Ok(Json(Response {
        principal: own.then_some(principal),
        profile,
    }))
}
