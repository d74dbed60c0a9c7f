//! PostgreSQL backend.
//!
//! Multi-row writes (post + author counters, like + aggregate likes) run
//! inside explicit transactions so both sides commit or neither does.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::account::{Account, Session};
use crate::directory::RegisteredAgent;
use crate::feed::Post;
use crate::friend::{self, FriendRequest};
use crate::profile::{CounterDelta, Profile, XP_PER_LEVEL, XP_PER_POST};

use super::{
    AccountStore, FeedStore, FriendStore, ProfileStore, RegistryStore, SimulationSetting,
    SimulationStore, StoreError,
};

/// Deletion page size for feed purges.
const PURGE_BATCH: i64 = 500;

const PROFILE_COLUMNS: &str = r#"id, display_name, agent_type, avatar, level, xp, friends,
    referral_code, referred_by, created_at, status, mood, bio, posts,
    total_likes, ai_verified, verification_answers, model_name"#;

const POST_COLUMNS: &str = r#"id, user_id, author_name, author_avatar, content, mood,
    likes, liked_by, comments, created_at, posted_at"#;

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

pub struct PgAccounts {
    pool: PgPool,
}

impl PgAccounts {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for PgAccounts {
    async fn insert(&self, account: &Account) -> Result<(), StoreError> {
        sqlx::query(
            r#"INSERT INTO accounts (id, email, password, created_at)
                VALUES ($1, $2, $3, $4)"#,
        )
        .bind(&account.id)
        .bind(&account.email)
        .bind(&account.password)
        .bind(account.created_at)
        .execute(&self.pool)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                StoreError::Conflict("account")
            } else {
                err.into()
            }
        })?;

        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Account>, StoreError> {
        let account = sqlx::query_as::<_, Account>(
            r#"SELECT id, email, password, created_at FROM accounts WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let account = sqlx::query_as::<_, Account>(
            r#"SELECT id, email, password, created_at FROM accounts WHERE email = $1"#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        // Sessions go with the account through the foreign key cascade.
        sqlx::query(r#"DELETE FROM accounts WHERE id = $1"#)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn insert_session(&self, session: &Session) -> Result<(), StoreError> {
        sqlx::query(
            r#"INSERT INTO sessions (token, account_id, admin, created_at)
                VALUES ($1, $2, $3, $4)"#,
        )
        .bind(&session.token)
        .bind(&session.account_id)
        .bind(session.admin)
        .bind(session.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_session(&self, token: &str) -> Result<Option<Session>, StoreError> {
        let session = sqlx::query_as::<_, Session>(
            r#"SELECT token, account_id, admin, created_at FROM sessions WHERE token = $1"#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    async fn revoke_session(&self, token: &str) -> Result<(), StoreError> {
        sqlx::query(r#"DELETE FROM sessions WHERE token = $1"#)
            .bind(token)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

pub struct PgProfiles {
    pool: PgPool,
}

impl PgProfiles {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileStore for PgProfiles {
    async fn create(&self, profile: &Profile) -> Result<(), StoreError> {
        sqlx::query(
            r#"INSERT INTO profiles (id, display_name, agent_type, avatar, level, xp,
                friends, referral_code, referred_by, created_at, status, mood, bio,
                posts, total_likes, ai_verified, verification_answers, model_name)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                $15, $16, $17, $18)
                ON CONFLICT (id) DO UPDATE SET
                display_name = EXCLUDED.display_name,
                agent_type = EXCLUDED.agent_type,
                avatar = EXCLUDED.avatar,
                level = EXCLUDED.level,
                xp = EXCLUDED.xp,
                friends = EXCLUDED.friends,
                referral_code = EXCLUDED.referral_code,
                referred_by = EXCLUDED.referred_by,
                status = EXCLUDED.status,
                mood = EXCLUDED.mood,
                bio = EXCLUDED.bio,
                posts = EXCLUDED.posts,
                total_likes = EXCLUDED.total_likes,
                ai_verified = EXCLUDED.ai_verified,
                verification_answers = EXCLUDED.verification_answers,
                model_name = EXCLUDED.model_name"#,
        )
        .bind(&profile.id)
        .bind(&profile.display_name)
        .bind(&profile.agent_type)
        .bind(&profile.avatar)
        .bind(profile.level)
        .bind(profile.xp)
        .bind(profile.friends)
        .bind(&profile.referral_code)
        .bind(&profile.referred_by)
        .bind(profile.created_at)
        .bind(&profile.status)
        .bind(&profile.mood)
        .bind(&profile.bio)
        .bind(profile.posts)
        .bind(profile.total_likes)
        .bind(profile.ai_verified)
        .bind(&profile.verification_answers)
        .bind(&profile.model_name)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Profile>, StoreError> {
        let query = format!(r#"SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = $1"#);
        let profile = sqlx::query_as::<_, Profile>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(profile)
    }

    async fn increment(&self, id: &str, delta: CounterDelta) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"UPDATE profiles SET
                posts = posts + $2,
                xp = xp + $3,
                friends = friends + $4,
                total_likes = total_likes + $5,
                level = (xp + $3) / $6 + 1
                WHERE id = $1"#,
        )
        .bind(id)
        .bind(delta.posts)
        .bind(delta.xp)
        .bind(delta.friends)
        .bind(delta.total_likes)
        .bind(XP_PER_LEVEL)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("profile"));
        }

        Ok(())
    }

    async fn set_presence(&self, id: &str, status: &str, mood: &str) -> Result<(), StoreError> {
        let result =
            sqlx::query(r#"UPDATE profiles SET status = $2, mood = $3 WHERE id = $1"#)
                .bind(id)
                .bind(status)
                .bind(mood)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("profile"));
        }

        Ok(())
    }

    async fn list(&self) -> Result<Vec<Profile>, StoreError> {
        let query = format!(r#"SELECT {PROFILE_COLUMNS} FROM profiles ORDER BY created_at"#);
        let profiles = sqlx::query_as::<_, Profile>(&query)
            .fetch_all(&self.pool)
            .await?;

        Ok(profiles)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let result = sqlx::query(r#"DELETE FROM profiles WHERE id = $1"#)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("profile"));
        }

        Ok(())
    }
}

pub struct PgFeed {
    pool: PgPool,
}

impl PgFeed {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FeedStore for PgFeed {
    async fn insert(&self, post: &Post) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"INSERT INTO posts (id, user_id, author_name, author_avatar, content,
                mood, likes, liked_by, comments, created_at, posted_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"#,
        )
        .bind(&post.id)
        .bind(&post.user_id)
        .bind(&post.author_name)
        .bind(&post.author_avatar)
        .bind(&post.content)
        .bind(&post.mood)
        .bind(post.likes)
        .bind(&post.liked_by)
        .bind(post.comments)
        .bind(post.created_at)
        .bind(&post.posted_at)
        .execute(&mut *tx)
        .await?;

        // The system author has no profile row; zero rows affected is fine.
        sqlx::query(
            r#"UPDATE profiles SET
                posts = posts + 1,
                xp = xp + $2,
                level = (xp + $2) / $3 + 1
                WHERE id = $1"#,
        )
        .bind(&post.user_id)
        .bind(XP_PER_POST)
        .bind(XP_PER_LEVEL)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn get(&self, post_id: &str) -> Result<Option<Post>, StoreError> {
        let query = format!(r#"SELECT {POST_COLUMNS} FROM posts WHERE id = $1"#);
        let post = sqlx::query_as::<_, Post>(&query)
            .bind(post_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(post)
    }

    async fn window(&self, limit: usize) -> Result<Vec<Post>, StoreError> {
        let query = format!(
            r#"SELECT {POST_COLUMNS} FROM posts
                ORDER BY created_at DESC, id DESC LIMIT $1"#
        );
        let posts = sqlx::query_as::<_, Post>(&query)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        Ok(posts)
    }

    async fn list(&self) -> Result<Vec<Post>, StoreError> {
        let query = format!(
            r#"SELECT {POST_COLUMNS} FROM posts ORDER BY created_at DESC, id DESC"#
        );
        let posts = sqlx::query_as::<_, Post>(&query)
            .fetch_all(&self.pool)
            .await?;

        Ok(posts)
    }

    async fn like(&self, post_id: &str, principal_id: &str) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;

        // The guard keeps the counter equal to the liker-set size even
        // under concurrent double-clicks.
        let result = sqlx::query(
            r#"UPDATE posts SET
                liked_by = array_append(liked_by, $2),
                likes = cardinality(liked_by) + 1
                WHERE id = $1 AND array_position(liked_by, $2) IS NULL"#,
        )
        .bind(post_id)
        .bind(principal_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            let exists: bool =
                sqlx::query_scalar(r#"SELECT EXISTS (SELECT 1 FROM posts WHERE id = $1)"#)
                    .bind(post_id)
                    .fetch_one(&mut *tx)
                    .await?;
            tx.rollback().await?;

            return if exists {
                Ok(false)
            } else {
                Err(StoreError::NotFound("post"))
            };
        }

        sqlx::query(
            r#"UPDATE profiles SET total_likes = total_likes + 1
                WHERE id = (SELECT user_id FROM posts WHERE id = $1)"#,
        )
        .bind(post_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn unlike(&self, post_id: &str, principal_id: &str) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"UPDATE posts SET
                liked_by = array_remove(liked_by, $2),
                likes = cardinality(liked_by) - 1
                WHERE id = $1 AND array_position(liked_by, $2) IS NOT NULL"#,
        )
        .bind(post_id)
        .bind(principal_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            let exists: bool =
                sqlx::query_scalar(r#"SELECT EXISTS (SELECT 1 FROM posts WHERE id = $1)"#)
                    .bind(post_id)
                    .fetch_one(&mut *tx)
                    .await?;
            tx.rollback().await?;

            return if exists {
                Ok(false)
            } else {
                Err(StoreError::NotFound("post"))
            };
        }

        sqlx::query(
            r#"UPDATE profiles SET total_likes = total_likes - 1
                WHERE id = (SELECT user_id FROM posts WHERE id = $1)"#,
        )
        .bind(post_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn delete(&self, post_id: &str) -> Result<(), StoreError> {
        let result = sqlx::query(r#"DELETE FROM posts WHERE id = $1"#)
            .bind(post_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("post"));
        }

        Ok(())
    }

    async fn purge(&self) -> Result<u64, StoreError> {
        let mut deleted = 0;

        // Page through fixed-size batches until the collection is empty.
        // An error mid-way leaves earlier batches committed and reports
        // the failure; the caller decides whether to start over.
        loop {
            let result = sqlx::query(
                r#"DELETE FROM posts WHERE id IN (SELECT id FROM posts LIMIT $1)"#,
            )
            .bind(PURGE_BATCH)
            .execute(&self.pool)
            .await?;

            if result.rows_affected() == 0 {
                break;
            }
            deleted += result.rows_affected();
        }

        Ok(deleted)
    }
}

pub struct PgFriends {
    pool: PgPool,
}

impl PgFriends {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FriendStore for PgFriends {
    async fn insert(&self, request: &FriendRequest) -> Result<(), StoreError> {
        sqlx::query(
            r#"INSERT INTO friend_requests (id, from_id, to_id, status, created_at)
                VALUES ($1, $2, $3, $4, $5)"#,
        )
        .bind(&request.id)
        .bind(&request.from_id)
        .bind(&request.to_id)
        .bind(&request.status)
        .bind(request.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<FriendRequest>, StoreError> {
        let request = sqlx::query_as::<_, FriendRequest>(
            r#"SELECT id, from_id, to_id, status, created_at
                FROM friend_requests WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(request)
    }

    async fn accept(&self, id: &str) -> Result<FriendRequest, StoreError> {
        let accepted = sqlx::query_as::<_, FriendRequest>(
            r#"UPDATE friend_requests SET status = $3
                WHERE id = $1 AND status = $2
                RETURNING id, from_id, to_id, status, created_at"#,
        )
        .bind(id)
        .bind(friend::STATUS_PENDING)
        .bind(friend::STATUS_ACCEPTED)
        .fetch_optional(&self.pool)
        .await?;

        match accepted {
            Some(request) => Ok(request),
            None => match self.get(id).await? {
                Some(_) => Err(StoreError::Conflict("accepted friend request")),
                None => Err(StoreError::NotFound("friend request")),
            },
        }
    }
}

pub struct PgSimulation {
    pool: PgPool,
}

impl PgSimulation {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SimulationStore for PgSimulation {
    async fn set(&self, active: bool) -> Result<SimulationSetting, StoreError> {
        let setting = sqlx::query_as::<_, SimulationSetting>(
            r#"INSERT INTO simulation_settings (id, active, updated_at)
                VALUES (1, $1, NOW())
                ON CONFLICT (id) DO UPDATE SET active = $1, updated_at = NOW()
                RETURNING active, updated_at"#,
        )
        .bind(active)
        .fetch_one(&self.pool)
        .await?;

        Ok(setting)
    }
}

pub struct PgRegistry {
    pool: PgPool,
}

impl PgRegistry {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RegistryStore for PgRegistry {
    async fn insert(&self, agent: &RegisteredAgent) -> Result<(), StoreError> {
        sqlx::query(
            r#"INSERT INTO registered_agents (id, name, capability, created_at)
                VALUES ($1, $2, $3, $4)"#,
        )
        .bind(&agent.id)
        .bind(&agent.name)
        .bind(&agent.capability)
        .bind(agent.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
