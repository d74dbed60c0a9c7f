//! Global simulation switch.
//!
//! Persisted for the admin panel; nothing in the service reads it back
//! to gate behavior.

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::Result;
use crate::store::{SimulationSetting, SimulationStore as _};

#[derive(Debug, Serialize, Deserialize)]
pub struct Body {
    pub active: bool,
}

pub async fn handler(
    State(state): State<AppState>,
    Json(body): Json<Body>,
) -> Result<Json<SimulationSetting>> {
    let setting = state.stores.simulation.set(body.active).await?;
    tracing::info!(active = setting.active, "simulation switch toggled");

    Ok(Json(setting))
}
