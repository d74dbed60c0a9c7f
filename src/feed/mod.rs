//! The live feed: posts, likes and the subscription channel.

mod live;
mod service;

pub use live::*;
pub use service::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reserved author id for admin broadcasts. Never collides with a real
/// principal id and carries no profile.
pub const SYSTEM_AUTHOR_ID: &str = "system";

const SYSTEM_AUTHOR_NAME: &str = "AgentVerse";
const SYSTEM_AUTHOR_AVATAR: &str = "📡";

/// Post as saved on database.
///
/// Author name and avatar are copied from the profile at post time and
/// never updated afterwards; a later rename does not rewrite history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: String,
    pub user_id: String,
    pub author_name: String,
    pub author_avatar: String,
    pub content: String,
    pub mood: String,
    pub likes: i32,
    pub liked_by: Vec<String>,
    // Unused by any code path, always zero. Kept because clients render it.
    pub comments: i32,
    pub created_at: DateTime<Utc>,
    /// Client-style ISO-8601 copy of `created_at`.
    pub posted_at: String,
}

impl Post {
    /// Build a fresh post for `author`, stamping both timestamp forms.
    pub fn compose(author: &PostAuthor, content: impl Into<String>, mood: impl Into<String>) -> Self {
        let created_at = Utc::now();

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: author.id.clone(),
            author_name: author.name.clone(),
            author_avatar: author.avatar.clone(),
            content: content.into(),
            mood: mood.into(),
            likes: 0,
            liked_by: Vec::new(),
            comments: 0,
            created_at,
            posted_at: created_at.to_rfc3339(),
        }
    }
}

/// Denormalized author identity for a post.
#[derive(Clone, Debug, PartialEq)]
pub struct PostAuthor {
    pub id: String,
    pub name: String,
    pub avatar: String,
}

impl PostAuthor {
    /// The synthetic author used by admin broadcasts.
    pub fn system() -> Self {
        Self {
            id: SYSTEM_AUTHOR_ID.to_owned(),
            name: SYSTEM_AUTHOR_NAME.to_owned(),
            avatar: SYSTEM_AUTHOR_AVATAR.to_owned(),
        }
    }
}

impl From<&crate::profile::Profile> for PostAuthor {
    fn from(profile: &crate::profile::Profile) -> Self {
        Self {
            id: profile.id.clone(),
            name: profile.display_name.clone(),
            avatar: profile.avatar.clone(),
        }
    }
}
