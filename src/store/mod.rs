pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::{
    error::LedgerResult,
    post::{NewPost, Post, PostId},
    user::{NewUser, User, UserId},
};

/// Owns post and user records.
///
/// Post mutations go through `update_post` or `remove_post`, which hold a
/// critical section scoped to that post. A closure that returns an error
/// leaves the stored record untouched.
pub trait Store: Send + Sync + 'static {
    /// Fails with `UsernameTaken` or `IdentityTaken` when either is already registered.
    fn insert_user(&self, user: NewUser) -> LedgerResult<User>;
    fn find_user_by_id(&self, id: UserId) -> LedgerResult<Option<User>>;
    fn find_user_by_name(&self, name: &str) -> LedgerResult<Option<User>>;
    fn find_user_by_hashed_google_id(&self, hashed: &str) -> LedgerResult<Option<User>>;

    fn insert_post(&self, post: NewPost) -> LedgerResult<Post>;
    fn find_post(&self, id: PostId) -> LedgerResult<Option<Post>>;
    /// Every post, in insertion order.
    fn posts(&self) -> LedgerResult<Vec<Post>>;
    /// Posts by one author, in insertion order.
    fn posts_by_author(&self, author: UserId) -> LedgerResult<Vec<Post>>;

    /// Apply `f` to the post atomically.
    fn update_post<R, F>(&self, id: PostId, f: F) -> LedgerResult<R>
    where
        F: FnOnce(&mut Post) -> LedgerResult<R>;

    /// Remove the post and its like-state if `check` accepts it.
    fn remove_post<F>(&self, id: PostId, check: F) -> LedgerResult<Post>
    where
        F: FnOnce(&Post) -> LedgerResult<()>;

    /// True when the store holds neither users nor posts.
    fn is_empty(&self) -> LedgerResult<bool>;
}
