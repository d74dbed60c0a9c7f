//! Persistence seams.
//!
//! Every collection sits behind a small async trait with two backends: a
//! PostgreSQL one for real deployments and an in-memory one used by tests
//! and by instances running without a `postgres` configuration section.

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use thiserror::Error;

use crate::account::{Account, Session};
use crate::directory::RegisteredAgent;
use crate::feed::Post;
use crate::friend::FriendRequest;
use crate::profile::{CounterDelta, Profile};

/// Storage errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0} already exists")]
    Conflict(&'static str),
}

/// Accounts and their bearer sessions.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Insert a new account; `Conflict` when the email is taken.
    async fn insert(&self, account: &Account) -> Result<(), StoreError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Account>, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;

    /// Remove an account. Only used to compensate a failed sign-up.
    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    async fn insert_session(&self, session: &Session) -> Result<(), StoreError>;

    async fn find_session(&self, token: &str) -> Result<Option<Session>, StoreError>;

    async fn revoke_session(&self, token: &str) -> Result<(), StoreError>;
}

/// One profile per principal.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Write a profile under its key. Overwrites whatever is there;
    /// callers invoke it once, right after account creation.
    async fn create(&self, profile: &Profile) -> Result<(), StoreError>;

    async fn get(&self, id: &str) -> Result<Option<Profile>, StoreError>;

    /// Apply counter increments in one atomic store-side update. The
    /// level field is recomputed from the resulting experience.
    async fn increment(&self, id: &str, delta: CounterDelta) -> Result<(), StoreError>;

    async fn set_presence(&self, id: &str, status: &str, mood: &str) -> Result<(), StoreError>;

    async fn list(&self) -> Result<Vec<Profile>, StoreError>;

    async fn delete(&self, id: &str) -> Result<(), StoreError>;
}

/// Posts and likes.
#[async_trait]
pub trait FeedStore: Send + Sync {
    /// Insert the post and bump the author's post counter and experience
    /// in one transaction; both commit or neither does. The reserved
    /// system author has no profile and inserts the post alone.
    async fn insert(&self, post: &Post) -> Result<(), StoreError>;

    async fn get(&self, post_id: &str) -> Result<Option<Post>, StoreError>;

    /// The `limit` most recent posts, descending by creation time.
    async fn window(&self, limit: usize) -> Result<Vec<Post>, StoreError>;

    /// Every post, descending by creation time.
    async fn list(&self) -> Result<Vec<Post>, StoreError>;

    /// Add `principal_id` to the liker set and keep the counter equal to
    /// the set size, in one transaction that also bumps the author's
    /// aggregate likes. Returns false when the principal already liked
    /// the post (idempotent no-op).
    async fn like(&self, post_id: &str, principal_id: &str) -> Result<bool, StoreError>;

    /// Reverse of [`FeedStore::like`]; false when there was no like.
    async fn unlike(&self, post_id: &str, principal_id: &str) -> Result<bool, StoreError>;

    async fn delete(&self, post_id: &str) -> Result<(), StoreError>;

    /// Delete every post, paging through fixed-size batches. A failure
    /// after some batches committed is returned as-is; there is no
    /// automatic resume.
    async fn purge(&self) -> Result<u64, StoreError>;
}

/// Friend requests. Counter updates on acceptance are the caller's job.
#[async_trait]
pub trait FriendStore: Send + Sync {
    async fn insert(&self, request: &FriendRequest) -> Result<(), StoreError>;

    async fn get(&self, id: &str) -> Result<Option<FriendRequest>, StoreError>;

    /// Flip a pending request to accepted. `Conflict` when it already
    /// was.
    async fn accept(&self, id: &str) -> Result<FriendRequest, StoreError>;
}

/// Global simulation switch. Write-only: the admin panel persists it and
/// no code path reads it back to gate behavior.
#[async_trait]
pub trait SimulationStore: Send + Sync {
    async fn set(&self, active: bool) -> Result<SimulationSetting, StoreError>;
}

/// Records created by the public registration endpoint.
#[async_trait]
pub trait RegistryStore: Send + Sync {
    async fn insert(&self, agent: &RegisteredAgent) -> Result<(), StoreError>;
}

/// Singleton simulation document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SimulationSetting {
    pub active: bool,
    pub updated_at: DateTime<Utc>,
}

/// Every store behind one handle, cloned into the app state.
#[derive(Clone)]
pub struct Stores {
    pub accounts: Arc<dyn AccountStore>,
    pub profiles: Arc<dyn ProfileStore>,
    pub posts: Arc<dyn FeedStore>,
    pub friends: Arc<dyn FriendStore>,
    pub simulation: Arc<dyn SimulationStore>,
    pub registry: Arc<dyn RegistryStore>,
}

impl Stores {
    /// PostgreSQL-backed stores sharing one pool.
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            accounts: Arc::new(postgres::PgAccounts::new(pool.clone())),
            profiles: Arc::new(postgres::PgProfiles::new(pool.clone())),
            posts: Arc::new(postgres::PgFeed::new(pool.clone())),
            friends: Arc::new(postgres::PgFriends::new(pool.clone())),
            simulation: Arc::new(postgres::PgSimulation::new(pool.clone())),
            registry: Arc::new(postgres::PgRegistry::new(pool)),
        }
    }

    /// In-memory stores sharing one state table.
    pub fn memory() -> Self {
        let state = memory::MemState::shared();

        Self {
            accounts: Arc::new(memory::MemAccounts::new(state.clone())),
            profiles: Arc::new(memory::MemProfiles::new(state.clone())),
            posts: Arc::new(memory::MemFeed::new(state.clone())),
            friends: Arc::new(memory::MemFriends::new(state.clone())),
            simulation: Arc::new(memory::MemSimulation::new(state.clone())),
            registry: Arc::new(memory::MemRegistry::new(state)),
        }
    }
}
