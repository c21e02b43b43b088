use std::{
    collections::{btree_map::Entry, BTreeMap},
    sync::{
        atomic::{AtomicI64, Ordering},
        Mutex, RwLock,
    },
};

use crate::{
    error::{LedgerError, LedgerResult},
    post::{LikedBy, NewPost, Post, PostId},
    user::{NewUser, User, UserId},
};

use super::Store;

/// Keeps everything in process memory.
///
/// The post map is guarded by a `RwLock` and each post by its own `Mutex`:
/// toggles on different posts only share the read lock, while inserts and
/// deletes take the write lock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: RwLock<Vec<User>>,
    posts: RwLock<BTreeMap<PostId, Mutex<Post>>>,
    last_post_id: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn find_user(&self, predicate: impl Fn(&User) -> bool) -> LedgerResult<Option<User>> {
        let users = self.users.read()?;
        Ok(users.iter().find(|user| predicate(user)).cloned())
    }

    fn collect_posts(&self, predicate: impl Fn(&Post) -> bool) -> LedgerResult<Vec<Post>> {
        let posts = self.posts.read()?;
        let mut list = Vec::with_capacity(posts.len());
        for post in posts.values() {
            let post = post.lock()?;
            if predicate(&post) {
                list.push(post.clone());
            }
        }
        Ok(list)
    }
}

impl Store for MemoryStore {
    fn insert_user(&self, user: NewUser) -> LedgerResult<User> {
        let mut users = self.users.write()?;
        if users.iter().any(|u| u.username == user.username) {
            return Err(LedgerError::UsernameTaken(user.username));
        }
        if users.iter().any(|u| u.hashed_google_id == user.hashed_google_id) {
            return Err(LedgerError::IdentityTaken);
        }

        let user = user.into_user(UserId(users.len() as i64 + 1));
        users.push(user.clone());
        Ok(user)
    }

    fn find_user_by_id(&self, id: UserId) -> LedgerResult<Option<User>> {
        self.find_user(|user| user.id == id)
    }

    fn find_user_by_name(&self, name: &str) -> LedgerResult<Option<User>> {
        self.find_user(|user| user.username == name)
    }

    fn find_user_by_hashed_google_id(&self, hashed: &str) -> LedgerResult<Option<User>> {
        self.find_user(|user| user.hashed_google_id == hashed)
    }

    fn insert_post(&self, post: NewPost) -> LedgerResult<Post> {
        let mut posts = self.posts.write()?;
        let id = PostId(self.last_post_id.fetch_add(1, Ordering::SeqCst) + 1);
        let post = Post::restore(id, post, LikedBy::default());
        posts.insert(id, Mutex::new(post.clone()));
        Ok(post)
    }

    fn find_post(&self, id: PostId) -> LedgerResult<Option<Post>> {
        let posts = self.posts.read()?;
        match posts.get(&id) {
            Some(post) => Ok(Some(post.lock()?.clone())),
            None => Ok(None),
        }
    }

    fn posts(&self) -> LedgerResult<Vec<Post>> {
        self.collect_posts(|_| true)
    }

    fn posts_by_author(&self, author: UserId) -> LedgerResult<Vec<Post>> {
        self.collect_posts(|post| post.author == author)
    }

    fn update_post<R, F>(&self, id: PostId, f: F) -> LedgerResult<R>
    where
        F: FnOnce(&mut Post) -> LedgerResult<R>,
    {
        let posts = self.posts.read()?;
        let slot = posts.get(&id).ok_or(LedgerError::PostNotFound(id))?;
        let mut post = slot.lock()?;

        // work on a copy so a failing closure leaves nothing half-applied
        let mut draft = post.clone();
        let result = f(&mut draft)?;
        *post = draft;
        Ok(result)
    }

    fn remove_post<F>(&self, id: PostId, check: F) -> LedgerResult<Post>
    where
        F: FnOnce(&Post) -> LedgerResult<()>,
    {
        let mut posts = self.posts.write()?;
        match posts.entry(id) {
            Entry::Occupied(entry) => {
                check(&*entry.get().lock()?)?;
                Ok(entry.remove().into_inner()?)
            }
            Entry::Vacant(_) => Err(LedgerError::PostNotFound(id)),
        }
    }

    fn is_empty(&self) -> LedgerResult<bool> {
        Ok(self.users.read()?.is_empty() && self.posts.read()?.is_empty())
    }
}
