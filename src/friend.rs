//! Friend requests between profiles.
//!
//! Deliberately minimal: a request is created pending and can only move
//! to accepted. There is no reject, cancel or inbox listing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_ACCEPTED: &str = "accepted";

/// Friend request as saved on database.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct FriendRequest {
    pub id: String,
    pub from_id: String,
    pub to_id: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl FriendRequest {
    /// New pending request from one profile to another.
    pub fn new(from_id: impl Into<String>, to_id: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            from_id: from_id.into(),
            to_id: to_id.into(),
            status: STATUS_PENDING.to_owned(),
            created_at: Utc::now(),
        }
    }

    /// Either party may act on the request.
    pub fn involves(&self, principal_id: &str) -> bool {
        self.from_id == principal_id || self.to_id == principal_id
    }
}
