//! Accounts and sessions, the identity side of the service.

mod service;

pub use service::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account as saved on database. Owns the credentials; everything a user
/// shows to the world lives on their [`crate::profile::Profile`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Account {
    pub id: String,
    pub email: String,
    #[serde(skip)]
    pub password: String,
    pub created_at: DateTime<Utc>,
}

/// The authenticated identity attached to a request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    pub email: String,
}

impl From<&Account> for Principal {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id.clone(),
            email: account.email.clone(),
        }
    }
}

/// A bearer session. Admin sessions are only minted by the privileged
/// re-authentication path.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Session {
    pub token: String,
    pub account_id: String,
    pub admin: bool,
    pub created_at: DateTime<Utc>,
}
