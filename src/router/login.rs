use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::AppState;
use crate::account::Principal;
use crate::error::Result;
use crate::router::Valid;
use crate::router::create::TOKEN_TYPE;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct Body {
    #[validate(email(message = "Email must be formatted."))]
    pub email: String,
    #[validate(length(min = 8, max = 255))]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Response {
    pub token_type: String,
    pub token: String,
    pub principal: Principal,
}

/// Handler to open a session.
pub async fn handler(
    State(state): State<AppState>,
    Valid(body): Valid<Body>,
) -> Result<Json<Response>> {
    let (principal, token) =
        state.accounts.sign_in(&body.email, &body.password).await?;

    Ok(Json(Response {
        token_type: TOKEN_TYPE.to_owned(),
        token,
        principal,
    }))
}
