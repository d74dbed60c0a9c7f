use axum::extract::{Request, State};
use axum::http::StatusCode;

use crate::AppState;
use crate::error::Result;
use crate::router::bearer;

/// Handler to revoke the presented session token. Revoking an already
/// dead token is a no-op.
pub async fn handler(State(state): State<AppState>, req: Request) -> Result<StatusCode> {
    let token = bearer(&req)?;
    state.accounts.sign_out(&token).await?;

    Ok(StatusCode::NO_CONTENT)
}
