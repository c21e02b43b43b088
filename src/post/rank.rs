use crate::config::RankOrder;

use super::Post;

/// Order a snapshot of posts.
///
/// Ids are handed out in insertion order, so `Recent` breaks timestamp ties by
/// descending id and `Popular` keeps ascending id among equal like counts.
pub fn rank_posts(mut posts: Vec<Post>, order: RankOrder) -> Vec<Post> {
    posts.sort_by_key(|post| post.id);
    match order {
        RankOrder::Recent => {
            posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)))
        }
        RankOrder::Popular => posts.sort_by(|a, b| b.like_count().cmp(&a.like_count())),
    }
    posts
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::{
        post::{LikedBy, NewPost, PostId},
        user::UserId,
    };

    fn post(id: i64, hour: u32, likes: &[i64]) -> Post {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap();
        let liked_by: LikedBy = likes.iter().map(|u| UserId(*u)).collect();
        Post::restore(
            PostId(id),
            NewPost::new(UserId(1), format!("post {id}"), "body").created_at(created),
            liked_by,
        )
    }

    fn ids(posts: &[Post]) -> Vec<i64> {
        posts.iter().map(|p| p.id.0).collect()
    }

    #[test]
    fn test_recent_is_newest_first() {
        let posts = vec![post(1, 8, &[]), post(2, 12, &[]), post(3, 10, &[])];
        let ranked = rank_posts(posts, RankOrder::Recent);
        assert_eq!(ids(&ranked), vec![2, 3, 1]);
        assert!(ranked.windows(2).all(|w| w[0].created_at >= w[1].created_at));
    }

    #[test]
    fn test_recent_ties_prefer_later_insert() {
        let posts = vec![post(1, 9, &[]), post(2, 9, &[]), post(3, 9, &[])];
        assert_eq!(ids(&rank_posts(posts, RankOrder::Recent)), vec![3, 2, 1]);
    }

    #[test]
    fn test_popular_is_stable() {
        let posts = vec![
            post(4, 1, &[1]),
            post(1, 2, &[]),
            post(2, 3, &[1, 2, 3]),
            post(3, 4, &[2]),
        ];
        let ranked = rank_posts(posts, RankOrder::Popular);
        assert_eq!(ids(&ranked), vec![2, 3, 4, 1]);
        assert!(ranked.windows(2).all(|w| w[0].like_count() >= w[1].like_count()));
    }

    #[test]
    fn test_empty_snapshot() {
        assert!(rank_posts(vec![], RankOrder::Popular).is_empty());
    }
}
