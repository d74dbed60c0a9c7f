//! In-memory backend.
//!
//! One shared state table behind a single `RwLock`, so multi-collection
//! writes (post + author counters, like + aggregate likes) are atomic the
//! same way the Postgres transactions are. Used by tests and by
//! instances started without a `postgres` configuration section.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::account::{Account, Session};
use crate::directory::RegisteredAgent;
use crate::feed::Post;
use crate::friend::{self, FriendRequest};
use crate::profile::{CounterDelta, Profile, level_for_xp};

use super::{
    AccountStore, FeedStore, FriendStore, ProfileStore, RegistryStore, SimulationSetting,
    SimulationStore, StoreError,
};

/// Backing state for every in-memory store.
#[derive(Default)]
pub struct MemState {
    accounts: HashMap<String, Account>,
    sessions: HashMap<String, Session>,
    profiles: HashMap<String, Profile>,
    posts: HashMap<String, Post>,
    friend_requests: HashMap<String, FriendRequest>,
    simulation: Option<SimulationSetting>,
    registrations: Vec<RegisteredAgent>,
}

pub type SharedState = Arc<RwLock<MemState>>;

impl MemState {
    pub fn shared() -> SharedState {
        Arc::new(RwLock::new(Self::default()))
    }

    fn apply_delta(&mut self, id: &str, delta: CounterDelta) {
        if let Some(profile) = self.profiles.get_mut(id) {
            profile.posts += delta.posts;
            profile.xp += delta.xp;
            profile.friends += delta.friends;
            profile.total_likes += delta.total_likes;
            profile.level = level_for_xp(profile.xp);
        }
    }

    fn ordered_posts(&self) -> Vec<Post> {
        let mut posts: Vec<Post> = self.posts.values().cloned().collect();
        posts.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        posts
    }
}

pub struct MemAccounts {
    state: SharedState,
}

impl MemAccounts {
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl AccountStore for MemAccounts {
    async fn insert(&self, account: &Account) -> Result<(), StoreError> {
        let mut state = self.state.write().await;

        if state.accounts.values().any(|a| a.email == account.email) {
            return Err(StoreError::Conflict("account"));
        }

        state.accounts.insert(account.id.clone(), account.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Account>, StoreError> {
        Ok(self.state.read().await.accounts.get(id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        Ok(self
            .state
            .read()
            .await
            .accounts
            .values()
            .find(|a| a.email == email)
            .cloned())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        state.accounts.remove(id);
        state.sessions.retain(|_, s| s.account_id != id);
        Ok(())
    }

    async fn insert_session(&self, session: &Session) -> Result<(), StoreError> {
        self.state
            .write()
            .await
            .sessions
            .insert(session.token.clone(), session.clone());
        Ok(())
    }

    async fn find_session(&self, token: &str) -> Result<Option<Session>, StoreError> {
        Ok(self.state.read().await.sessions.get(token).cloned())
    }

    async fn revoke_session(&self, token: &str) -> Result<(), StoreError> {
        self.state.write().await.sessions.remove(token);
        Ok(())
    }
}

pub struct MemProfiles {
    state: SharedState,
}

impl MemProfiles {
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl ProfileStore for MemProfiles {
    async fn create(&self, profile: &Profile) -> Result<(), StoreError> {
        self.state
            .write()
            .await
            .profiles
            .insert(profile.id.clone(), profile.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Profile>, StoreError> {
        Ok(self.state.read().await.profiles.get(id).cloned())
    }

    async fn increment(&self, id: &str, delta: CounterDelta) -> Result<(), StoreError> {
        let mut state = self.state.write().await;

        if !state.profiles.contains_key(id) {
            return Err(StoreError::NotFound("profile"));
        }

        state.apply_delta(id, delta);
        Ok(())
    }

    async fn set_presence(&self, id: &str, status: &str, mood: &str) -> Result<(), StoreError> {
        let mut state = self.state.write().await;

        match state.profiles.get_mut(id) {
            Some(profile) => {
                profile.status = status.to_owned();
                profile.mood = mood.to_owned();
                Ok(())
            },
            None => Err(StoreError::NotFound("profile")),
        }
    }

    async fn list(&self) -> Result<Vec<Profile>, StoreError> {
        let state = self.state.read().await;
        let mut profiles: Vec<Profile> = state.profiles.values().cloned().collect();
        profiles.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(profiles)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        match self.state.write().await.profiles.remove(id) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound("profile")),
        }
    }
}

pub struct MemFeed {
    state: SharedState,
}

impl MemFeed {
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl FeedStore for MemFeed {
    async fn insert(&self, post: &Post) -> Result<(), StoreError> {
        // One lock section stands in for the Postgres transaction.
        let mut state = self.state.write().await;

        state.posts.insert(post.id.clone(), post.clone());
        state.apply_delta(
            &post.user_id,
            CounterDelta {
                posts: 1,
                xp: crate::profile::XP_PER_POST,
                ..Default::default()
            },
        );
        Ok(())
    }

    async fn get(&self, post_id: &str) -> Result<Option<Post>, StoreError> {
        Ok(self.state.read().await.posts.get(post_id).cloned())
    }

    async fn window(&self, limit: usize) -> Result<Vec<Post>, StoreError> {
        let state = self.state.read().await;
        let mut posts = state.ordered_posts();
        posts.truncate(limit);
        Ok(posts)
    }

    async fn list(&self) -> Result<Vec<Post>, StoreError> {
        Ok(self.state.read().await.ordered_posts())
    }

    async fn like(&self, post_id: &str, principal_id: &str) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;

        let author_id = {
            let post = state
                .posts
                .get_mut(post_id)
                .ok_or(StoreError::NotFound("post"))?;

            if post.liked_by.iter().any(|id| id == principal_id) {
                return Ok(false);
            }

            post.liked_by.push(principal_id.to_owned());
            post.likes = post.liked_by.len() as i32;
            post.user_id.clone()
        };

        state.apply_delta(
            &author_id,
            CounterDelta {
                total_likes: 1,
                ..Default::default()
            },
        );
        Ok(true)
    }

    async fn unlike(&self, post_id: &str, principal_id: &str) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;

        let author_id = {
            let post = state
                .posts
                .get_mut(post_id)
                .ok_or(StoreError::NotFound("post"))?;

            let before = post.liked_by.len();
            post.liked_by.retain(|id| id != principal_id);
            if post.liked_by.len() == before {
                return Ok(false);
            }

            post.likes = post.liked_by.len() as i32;
            post.user_id.clone()
        };

        state.apply_delta(
            &author_id,
            CounterDelta {
                total_likes: -1,
                ..Default::default()
            },
        );
        Ok(true)
    }

    async fn delete(&self, post_id: &str) -> Result<(), StoreError> {
        match self.state.write().await.posts.remove(post_id) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound("post")),
        }
    }

    async fn purge(&self) -> Result<u64, StoreError> {
        // No batch limits to page through here; everything goes at once.
        let mut state = self.state.write().await;
        let deleted = state.posts.len() as u64;
        state.posts.clear();
        Ok(deleted)
    }
}

pub struct MemFriends {
    state: SharedState,
}

impl MemFriends {
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl FriendStore for MemFriends {
    async fn insert(&self, request: &FriendRequest) -> Result<(), StoreError> {
        self.state
            .write()
            .await
            .friend_requests
            .insert(request.id.clone(), request.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<FriendRequest>, StoreError> {
        Ok(self.state.read().await.friend_requests.get(id).cloned())
    }

    async fn accept(&self, id: &str) -> Result<FriendRequest, StoreError> {
        let mut state = self.state.write().await;

        let request = state
            .friend_requests
            .get_mut(id)
            .ok_or(StoreError::NotFound("friend request"))?;

        if request.status != friend::STATUS_PENDING {
            return Err(StoreError::Conflict("accepted friend request"));
        }

        request.status = friend::STATUS_ACCEPTED.to_owned();
        Ok(request.clone())
    }
}

pub struct MemSimulation {
    state: SharedState,
}

impl MemSimulation {
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl SimulationStore for MemSimulation {
    async fn set(&self, active: bool) -> Result<SimulationSetting, StoreError> {
        let setting = SimulationSetting {
            active,
            updated_at: Utc::now(),
        };
        self.state.write().await.simulation = Some(setting.clone());
        Ok(setting)
    }
}

pub struct MemRegistry {
    state: SharedState,
}

impl MemRegistry {
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl RegistryStore for MemRegistry {
    async fn insert(&self, agent: &RegisteredAgent) -> Result<(), StoreError> {
        self.state.write().await.registrations.push(agent.clone());
        Ok(())
    }
}
