use log::{debug, info};

use crate::{
    config::RankOrder,
    error::{LedgerError, LedgerResult},
    post::{rank_posts, LikeState, NewPost, Post, PostId},
    store::Store,
    user::{hash_google_id, NewUser, User, UserId},
};

/// The authoritative record of posts and their likes.
#[derive(Debug)]
pub struct Ledger<S> {
    store: S,
}

impl<S: Store> Ledger<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Like the post if `user` does not like it yet, otherwise unlike it.
    pub fn toggle_like(&self, post: PostId, user: UserId) -> LedgerResult<LikeState> {
        self.user(user)?;
        let state = self
            .store
            .update_post(post, |post| Ok(post.toggle_like(user)))?;

        debug!(
            "user {} {} post {} ({} likes)",
            user,
            if state.liked { "liked" } else { "unliked" },
            post,
            state.like_count
        );
        Ok(state)
    }

    pub fn rank_posts(&self, order: RankOrder) -> LedgerResult<Vec<Post>> {
        Ok(rank_posts(self.store.posts()?, order))
    }

    /// Posts written by `user`, for their profile page.
    pub fn profile_posts(&self, user: UserId, order: RankOrder) -> LedgerResult<Vec<Post>> {
        self.user(user)?;
        Ok(rank_posts(self.store.posts_by_author(user)?, order))
    }

    pub fn delete_post(&self, post: PostId, requester: UserId) -> LedgerResult<Post> {
        let removed = self.store.remove_post(post, |stored| {
            if stored.author == requester {
                Ok(())
            } else {
                Err(LedgerError::Forbidden { post, requester })
            }
        })?;

        info!("Deleted post {} by user {}", post, requester);
        Ok(removed)
    }

    pub fn create_post(&self, post: NewPost) -> LedgerResult<Post> {
        if post.title.trim().is_empty() {
            return Err(LedgerError::InvalidInput("title must not be empty"));
        }
        if post.content.trim().is_empty() {
            return Err(LedgerError::InvalidInput("content must not be empty"));
        }
        self.user(post.author)?;

        let post = self.store.insert_post(post)?;
        info!("Created post {} `{}`", post.id, post.title);
        Ok(post)
    }

    pub fn find_post(&self, post: PostId) -> LedgerResult<Post> {
        self.store
            .find_post(post)?
            .ok_or(LedgerError::PostNotFound(post))
    }

    pub fn register_user(&self, user: NewUser) -> LedgerResult<User> {
        if user.username.trim().is_empty() {
            return Err(LedgerError::InvalidInput("username must not be empty"));
        }

        let user = self.store.insert_user(user)?;
        info!("Registered user {} ({})", user.username, user.id);
        Ok(user)
    }

    pub fn user(&self, user: UserId) -> LedgerResult<User> {
        self.store
            .find_user_by_id(user)?
            .ok_or(LedgerError::UserNotFound(user))
    }

    pub fn user_by_name(&self, name: &str) -> LedgerResult<User> {
        self.store
            .find_user_by_name(name)?
            .ok_or_else(|| LedgerError::UserNameNotFound(name.to_string()))
    }

    /// Resolve the local account bound to an external identity.
    pub fn login(&self, google_id: &str) -> LedgerResult<User> {
        let user = self
            .store
            .find_user_by_hashed_google_id(&hash_google_id(google_id))?
            .ok_or(LedgerError::UnknownIdentity)?;
        debug!("user {} signed in", user.id);
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::ErrorKind,
        store::{MemoryStore, SqliteStore},
    };

    fn ledger<S: Store>(store: S) -> (Ledger<S>, Post) {
        let ledger = Ledger::new(store);
        for name in ["alice", "bob", "carol"] {
            ledger
                .register_user(NewUser::new(name, &format!("google-{name}")))
                .unwrap();
        }
        let post = ledger
            .create_post(NewPost::new(UserId(1), "first", "hello"))
            .unwrap();
        (ledger, post)
    }

    fn scenario<S: Store>(store: S) {
        let (ledger, post) = ledger(store);
        let (u1, u2) = (UserId(2), UserId(3));

        assert_eq!(
            ledger.toggle_like(post.id, u1).unwrap(),
            LikeState { like_count: 1, liked: true }
        );
        assert_eq!(
            ledger.toggle_like(post.id, u1).unwrap(),
            LikeState { like_count: 0, liked: false }
        );

        ledger.toggle_like(post.id, u1).unwrap();
        ledger.toggle_like(post.id, u2).unwrap();

        let stored = ledger.find_post(post.id).unwrap();
        assert_eq!(stored.like_count(), 2);
        assert_eq!(stored.liked_by().iter().collect::<Vec<_>>(), vec![u1, u2]);
    }

    #[test]
    fn test_toggle_scenario_memory() {
        scenario(MemoryStore::new());
    }

    #[test]
    fn test_toggle_scenario_sqlite() {
        scenario(SqliteStore::open_in_memory().unwrap());
    }

    #[test]
    fn test_toggle_missing_post_or_user() {
        let (ledger, post) = ledger(MemoryStore::new());

        let err = ledger.toggle_like(PostId(99), UserId(1)).unwrap_err();
        assert!(matches!(err, LedgerError::PostNotFound(PostId(99))));
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = ledger.toggle_like(post.id, UserId(42)).unwrap_err();
        assert!(matches!(err, LedgerError::UserNotFound(UserId(42))));
        assert_eq!(ledger.find_post(post.id).unwrap().like_count(), 0);
    }

    #[test]
    fn test_delete_by_non_owner_is_forbidden() {
        let (ledger, post) = ledger(SqliteStore::open_in_memory().unwrap());
        ledger.toggle_like(post.id, UserId(2)).unwrap();
        let before = ledger.find_post(post.id).unwrap();

        let err = ledger.delete_post(post.id, UserId(2)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
        assert_eq!(ledger.find_post(post.id).unwrap(), before);

        ledger.delete_post(post.id, UserId(1)).unwrap();
        assert!(ledger.find_post(post.id).unwrap_err().kind() == ErrorKind::NotFound);
        assert!(ledger.rank_posts(RankOrder::Recent).unwrap().is_empty());
    }

    #[test]
    fn test_delete_missing_post() {
        let (ledger, _) = ledger(MemoryStore::new());
        let err = ledger.delete_post(PostId(7), UserId(1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_rank_and_profile() {
        let (ledger, first) = ledger(MemoryStore::new());
        let second = ledger
            .create_post(NewPost::new(UserId(2), "second", "by bob"))
            .unwrap();
        let third = ledger
            .create_post(NewPost::new(UserId(1), "third", "by alice"))
            .unwrap();

        ledger.toggle_like(second.id, UserId(1)).unwrap();
        ledger.toggle_like(second.id, UserId(3)).unwrap();
        ledger.toggle_like(third.id, UserId(2)).unwrap();

        let popular: Vec<_> = ledger
            .rank_posts(RankOrder::Popular)
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(popular, vec![second.id, third.id, first.id]);

        let recent = ledger.rank_posts(RankOrder::Recent).unwrap();
        assert!(recent.windows(2).all(|w| w[0].created_at >= w[1].created_at));
        assert_eq!(recent.first().map(|p| p.id), Some(third.id));

        let profile: Vec<_> = ledger
            .profile_posts(UserId(1), RankOrder::Popular)
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(profile, vec![third.id, first.id]);

        let err = ledger.profile_posts(UserId(9), RankOrder::Recent).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_create_post_validation() {
        let (ledger, _) = ledger(MemoryStore::new());

        let err = ledger
            .create_post(NewPost::new(UserId(1), "  ", "body"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Invalid);

        let err = ledger
            .create_post(NewPost::new(UserId(8), "title", "body"))
            .unwrap_err();
        assert!(matches!(err, LedgerError::UserNotFound(UserId(8))));
    }

    #[test]
    fn test_register_and_lookup() {
        let (ledger, _) = ledger(SqliteStore::open_in_memory().unwrap());

        let err = ledger
            .register_user(NewUser::new("alice", "someone-else"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let bob = ledger.user_by_name("bob").unwrap();
        assert_eq!(ledger.login("google-bob").unwrap(), bob);
        assert!(matches!(
            ledger.login("google-dave").unwrap_err(),
            LedgerError::UnknownIdentity
        ));
        assert!(ledger.user_by_name("dave").unwrap_err().kind() == ErrorKind::NotFound);
    }

    fn reused_identity<S: Store>(store: S) {
        let (ledger, _) = ledger(store);

        let err = ledger
            .register_user(NewUser::new("mallory", "google-alice"))
            .unwrap_err();
        assert!(matches!(err, LedgerError::IdentityTaken));
        assert_eq!(err.kind(), ErrorKind::Conflict);

        assert!(ledger.user_by_name("mallory").is_err());
        assert_eq!(ledger.login("google-alice").unwrap().username, "alice");
    }

    #[test]
    fn test_reused_identity_memory() {
        reused_identity(MemoryStore::new());
    }

    #[test]
    fn test_reused_identity_sqlite() {
        reused_identity(SqliteStore::open_in_memory().unwrap());
    }
}
