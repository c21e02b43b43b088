pub mod rank;

use std::{collections::BTreeSet, fmt};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::user::UserId;

pub use rank::rank_posts;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(pub i64);

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The users who like a post. Each user appears at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LikedBy(BTreeSet<UserId>);

impl LikedBy {
    pub fn contains(&self, user: UserId) -> bool {
        self.0.contains(&user)
    }
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn iter(&self) -> impl Iterator<Item = UserId> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<UserId> for LikedBy {
    fn from_iter<I: IntoIterator<Item = UserId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Outcome of a like toggle, as seen by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeState {
    pub like_count: u32,
    pub liked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: PostId,
    pub title: String,
    pub content: String,
    pub author: UserId,
    pub created_at: DateTime<Utc>,
    like_count: u32,
    liked_by: LikedBy,
}

impl Post {
    /// Rebuild a stored post. The counter is derived from the membership set.
    pub fn restore(id: PostId, post: NewPost, liked_by: LikedBy) -> Self {
        Self {
            id,
            title: post.title,
            content: post.content,
            author: post.author,
            created_at: post.created_at,
            like_count: liked_by.len() as u32,
            liked_by,
        }
    }

    pub fn like_count(&self) -> u32 {
        self.like_count
    }
    pub fn liked_by(&self) -> &LikedBy {
        &self.liked_by
    }
    pub fn is_liked_by(&self, user: UserId) -> bool {
        self.liked_by.contains(user)
    }

    /// Flip `user`'s membership, moving the counter with it.
    pub fn toggle_like(&mut self, user: UserId) -> LikeState {
        let liked = if self.liked_by.0.remove(&user) {
            self.like_count -= 1;
            false
        } else {
            self.liked_by.0.insert(user);
            self.like_count += 1;
            true
        };

        LikeState {
            like_count: self.like_count,
            liked,
        }
    }
}

/// A post that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    pub author: UserId,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl NewPost {
    pub fn new(author: UserId, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            author,
            title: title.into(),
            content: content.into(),
            created_at: Utc::now(),
        }
    }
    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post() -> Post {
        Post::restore(PostId(1), NewPost::new(UserId(1), "title", "body"), LikedBy::default())
    }

    #[test]
    fn test_toggle_like_twice_restores_state() {
        let mut post = post();
        post.toggle_like(UserId(2));
        let before = post.clone();

        post.toggle_like(UserId(3));
        post.toggle_like(UserId(3));

        assert_eq!(post, before);
    }

    #[test]
    fn test_toggle_like_scenario() {
        let mut post = post();

        assert_eq!(
            post.toggle_like(UserId(1)),
            LikeState { like_count: 1, liked: true }
        );
        assert_eq!(
            post.toggle_like(UserId(1)),
            LikeState { like_count: 0, liked: false }
        );

        post.toggle_like(UserId(1));
        let state = post.toggle_like(UserId(2));
        assert_eq!(state, LikeState { like_count: 2, liked: true });
        assert_eq!(
            post.liked_by().iter().collect::<Vec<_>>(),
            vec![UserId(1), UserId(2)]
        );
    }

    #[test]
    fn test_counter_matches_membership() {
        let mut post = post();
        let users = [1, 2, 3, 2, 4, 1, 1, 5, 3];
        for user in users {
            post.toggle_like(UserId(user));
            assert_eq!(post.like_count() as usize, post.liked_by().len());
        }
    }

    #[test]
    fn test_restore_derives_counter() {
        let liked_by: LikedBy = [UserId(2), UserId(2), UserId(7)].into_iter().collect();
        let post = Post::restore(PostId(4), NewPost::new(UserId(1), "t", "c"), liked_by);
        assert_eq!(post.like_count(), 2);
        assert!(post.is_liked_by(UserId(7)));
    }

    #[test]
    fn test_like_state_json() {
        let state = LikeState { like_count: 3, liked: false };
        assert_eq!(
            serde_json::to_value(state).unwrap(),
            serde_json::json!({ "likeCount": 3, "liked": false })
        );
    }
}
