//! Feed operations shared by the user routes and the admin console.

use std::sync::Arc;

use crate::config;
use crate::error::Result;
use crate::store::FeedStore;

use super::{FeedChannel, FeedSnapshot, FeedSubscription, Post, PostAuthor};

/// Feed manager: wraps the store and re-broadcasts the visible window
/// after every mutation.
#[derive(Clone)]
pub struct FeedService {
    posts: Arc<dyn FeedStore>,
    channel: FeedChannel,
    window: usize,
}

impl FeedService {
    /// Create a new [`FeedService`].
    pub fn new(posts: Arc<dyn FeedStore>, config: &config::Feed) -> Self {
        Self {
            posts,
            channel: FeedChannel::new(config.capacity),
            window: config.window.max(1),
        }
    }

    /// Publish a post for `author` and notify every subscriber.
    pub async fn create_post(
        &self,
        author: &PostAuthor,
        content: &str,
        mood: &str,
    ) -> Result<Post> {
        let post = Post::compose(author, content, mood);

        self.posts.insert(&post).await?;
        self.publish().await?;
        Ok(post)
    }

    /// Publish a post as the reserved system author. No profile backs it.
    pub async fn broadcast(&self, content: &str, mood: &str) -> Result<Post> {
        self.create_post(&PostAuthor::system(), content, mood).await
    }

    /// Add the principal to a post's liker set. Liking twice is a no-op;
    /// the like counter always equals the set size.
    pub async fn like(&self, post_id: &str, principal_id: &str) -> Result<bool> {
        let changed = self.posts.like(post_id, principal_id).await?;

        if changed {
            self.publish().await?;
        }
        Ok(changed)
    }

    /// Remove the principal from a post's liker set.
    pub async fn unlike(&self, post_id: &str, principal_id: &str) -> Result<bool> {
        let changed = self.posts.unlike(post_id, principal_id).await?;

        if changed {
            self.publish().await?;
        }
        Ok(changed)
    }

    /// Hard-delete one post.
    pub async fn delete(&self, post_id: &str) -> Result<()> {
        self.posts.delete(post_id).await?;
        self.publish().await?;
        Ok(())
    }

    /// Hard-delete every post. Returns the number removed.
    pub async fn purge(&self) -> Result<u64> {
        let deleted = self.posts.purge().await?;

        self.publish().await?;
        Ok(deleted)
    }

    /// The `limit` most recent posts, newest first.
    pub async fn recent(&self, limit: usize) -> Result<Vec<Post>> {
        Ok(self.posts.window(self.clamp(limit)).await?)
    }

    /// Every post, newest first.
    pub async fn list(&self) -> Result<Vec<Post>> {
        Ok(self.posts.list().await?)
    }

    /// Open a live subscription: the current window immediately, then a
    /// full replacement snapshot after every change.
    pub async fn subscribe(&self, limit: usize) -> Result<(FeedSnapshot, FeedSubscription)> {
        let limit = self.clamp(limit);

        Ok(self
            .channel
            .subscribe_with(limit, || self.posts.window(self.window))
            .await?)
    }

    async fn publish(&self) -> Result<()> {
        Ok(self
            .channel
            .publish_with(|| self.posts.window(self.window))
            .await?)
    }

    fn clamp(&self, limit: usize) -> usize {
        limit.clamp(1, self.window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::SYSTEM_AUTHOR_ID;
    use crate::profile::{Profile, XP_PER_POST};
    use crate::store::{FeedStore, ProfileStore, StoreError, Stores};

    fn service(stores: &Stores) -> FeedService {
        FeedService::new(
            Arc::clone(&stores.posts),
            &config::Feed {
                window: 20,
                capacity: 64,
            },
        )
    }

    async fn author(stores: &Stores, id: &str, name: &str) -> PostAuthor {
        let mut profile = Profile::new(id, name, "CAFE0123".into());
        profile.avatar = "🤖".to_owned();
        stores.profiles.create(&profile).await.unwrap();
        PostAuthor::from(&profile)
    }

    fn descending(posts: &[Post]) -> bool {
        posts.windows(2).all(|pair| {
            pair[0].created_at > pair[1].created_at
                || (pair[0].created_at == pair[1].created_at && pair[0].id > pair[1].id)
        })
    }

    #[tokio::test]
    async fn test_created_post_lands_first_in_window() {
        let stores = Stores::memory();
        let feed = service(&stores);
        let nova = author(&stores, "u1", "Nova").await;

        feed.create_post(&nova, "Hello verse", "🚀").await.unwrap();

        let (snapshot, _sub) = feed.subscribe(20).await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].content, "Hello verse");
        assert_eq!(snapshot[0].likes, 0);
        assert_eq!(snapshot[0].user_id, "u1");
        assert_eq!(snapshot[0].author_name, "Nova");
        assert_eq!(snapshot[0].comments, 0);
    }

    #[tokio::test]
    async fn test_create_post_bumps_author_counters() {
        let stores = Stores::memory();
        let feed = service(&stores);
        let nova = author(&stores, "u1", "Nova").await;

        feed.create_post(&nova, "one", "🚀").await.unwrap();
        feed.create_post(&nova, "two", "🚀").await.unwrap();

        let profile = stores.profiles.get("u1").await.unwrap().unwrap();
        assert_eq!(profile.posts, 2);
        assert_eq!(profile.xp, 2 * XP_PER_POST);
    }

    #[tokio::test]
    async fn test_n_distinct_likes_count_n() {
        let stores = Stores::memory();
        let feed = service(&stores);
        let nova = author(&stores, "u1", "Nova").await;
        let post = feed.create_post(&nova, "Hello verse", "🚀").await.unwrap();

        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..8 {
            let feed = feed.clone();
            let post_id = post.id.clone();
            tasks.spawn(async move { feed.like(&post_id, &format!("liker-{i}")).await });
        }
        while let Some(result) = tasks.join_next().await {
            assert!(result.unwrap().unwrap());
        }

        let stored = stores.posts.get(&post.id).await.unwrap().unwrap();
        assert_eq!(stored.likes, 8);
        assert_eq!(stored.liked_by.len(), 8);

        let profile = stores.profiles.get("u1").await.unwrap().unwrap();
        assert_eq!(profile.total_likes, 8);
    }

    #[tokio::test]
    async fn test_double_like_is_idempotent() {
        let stores = Stores::memory();
        let feed = service(&stores);
        let nova = author(&stores, "u1", "Nova").await;
        let post = feed.create_post(&nova, "Hello verse", "🚀").await.unwrap();

        assert!(feed.like(&post.id, "liker-1").await.unwrap());
        assert!(!feed.like(&post.id, "liker-1").await.unwrap());

        let stored = stores.posts.get(&post.id).await.unwrap().unwrap();
        assert_eq!(stored.likes, 1);
        assert_eq!(stored.liked_by, vec!["liker-1".to_owned()]);

        assert!(feed.unlike(&post.id, "liker-1").await.unwrap());
        assert!(!feed.unlike(&post.id, "liker-1").await.unwrap());

        let stored = stores.posts.get(&post.id).await.unwrap().unwrap();
        assert_eq!(stored.likes, 0);
        assert!(stored.liked_by.is_empty());
    }

    #[tokio::test]
    async fn test_like_unknown_post_is_not_found() {
        let stores = Stores::memory();
        let feed = service(&stores);

        let err = feed.like("ghost", "liker-1").await.unwrap_err();
        assert!(matches!(
            err,
            crate::error::ServerError::Store(StoreError::NotFound("post"))
        ));
    }

    #[tokio::test]
    async fn test_every_delivery_is_ordered() {
        let stores = Stores::memory();
        let feed = service(&stores);
        let nova = author(&stores, "u1", "Nova").await;

        let (initial, mut sub) = feed.subscribe(20).await.unwrap();
        assert!(initial.is_empty());

        let first = feed.create_post(&nova, "one", "🚀").await.unwrap();
        let second = feed.create_post(&nova, "two", "🚀").await.unwrap();
        feed.create_post(&nova, "three", "🚀").await.unwrap();
        feed.like(&second.id, "liker-1").await.unwrap();
        feed.delete(&first.id).await.unwrap();

        // Five mutations, five replacement snapshots, each fully ordered.
        for _ in 0..5 {
            let snapshot = sub.recv().await.expect("delivery");
            assert!(descending(&snapshot));
        }

        let last = feed.recent(20).await.unwrap();
        assert_eq!(last.len(), 2);
        assert_eq!(last[0].content, "three");
        assert_eq!(last[1].content, "two");
        assert_eq!(last[1].likes, 1);
    }

    #[tokio::test]
    async fn test_purge_then_subscribe_is_empty() {
        let stores = Stores::memory();
        let feed = service(&stores);
        let nova = author(&stores, "u1", "Nova").await;

        for i in 0..5 {
            feed.create_post(&nova, &format!("post {i}"), "🚀").await.unwrap();
        }

        assert_eq!(feed.purge().await.unwrap(), 5);

        let (snapshot, sub) = feed.subscribe(20).await.unwrap();
        assert!(snapshot.is_empty());
        sub.cancel();
    }

    #[tokio::test]
    async fn test_broadcast_needs_no_profile() {
        let stores = Stores::memory();
        let feed = service(&stores);

        let post = feed.broadcast("The verse is listening.", "📡").await.unwrap();
        assert_eq!(post.user_id, SYSTEM_AUTHOR_ID);

        let recent = feed.recent(20).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].author_name, "AgentVerse");
    }

    #[tokio::test]
    async fn test_subscriber_limit_is_clamped() {
        let stores = Stores::memory();
        let feed = service(&stores);
        let nova = author(&stores, "u1", "Nova").await;

        for i in 0..25 {
            feed.create_post(&nova, &format!("post {i}"), "🚀").await.unwrap();
        }

        // Window is 20; asking for more still caps at the window.
        let (snapshot, _sub) = feed.subscribe(100).await.unwrap();
        assert_eq!(snapshot.len(), 20);
        assert_eq!(snapshot[0].content, "post 24");
    }
}
