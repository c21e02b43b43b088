use std::{collections::HashMap, path::Path, sync::Mutex};

use log::{debug, info};
use rusqlite::{Connection, OptionalExtension, Row, Transaction, TransactionBehavior};

use crate::{
    error::{LedgerError, LedgerResult},
    post::{LikedBy, NewPost, Post, PostId},
    user::{NewUser, User, UserId},
};

use super::Store;

pub const TEMPLATE_DATABASE_UP_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    username         TEXT NOT NULL UNIQUE,
    hashed_google_id TEXT NOT NULL UNIQUE,
    member_since     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS posts (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    title      TEXT NOT NULL,
    content    TEXT NOT NULL,
    author     INTEGER NOT NULL REFERENCES users (id),
    created_at TEXT NOT NULL,
    likes      INTEGER NOT NULL DEFAULT 0 CHECK (likes >= 0)
);

CREATE TABLE IF NOT EXISTS post_likes (
    post_id INTEGER NOT NULL REFERENCES posts (id) ON DELETE CASCADE,
    user_id INTEGER NOT NULL REFERENCES users (id),
    PRIMARY KEY (post_id, user_id)
);
"#;

const USER_COLUMNS: &str = "id, username, hashed_google_id, member_since";
const POST_COLUMNS: &str = "id, title, content, author, created_at";

/// Stores users and posts in SQLite.
///
/// `posts.likes` and the `post_likes` rows of a post are always written in
/// the same `IMMEDIATE` transaction.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> LedgerResult<Self> {
        if path.exists() {
            info!("Connecting to database: {}", path.display());
        } else {
            info!("Creating database: {}", path.display());
        }
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> LedgerResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    pub fn from_connection(conn: Connection) -> LedgerResult<Self> {
        conn.pragma_update(None, "foreign_keys", true)?;
        conn.execute_batch(TEMPLATE_DATABASE_UP_SQL)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn find_user(&self, filter: &str, value: &dyn rusqlite::ToSql) -> LedgerResult<Option<User>> {
        let conn = self.conn.lock()?;
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {filter} = ?1");
        let user = conn.query_row(&sql, [value], read_user).optional()?;
        Ok(user)
    }

    fn query_posts(&self, author: Option<UserId>) -> LedgerResult<Vec<Post>> {
        let conn = self.conn.lock()?;

        let mut likes: HashMap<PostId, Vec<UserId>> = HashMap::new();
        let mut stmt = conn.prepare("SELECT post_id, user_id FROM post_likes")?;
        let rows = stmt.query_map([], |row| Ok((PostId(row.get(0)?), UserId(row.get(1)?))))?;
        for row in rows {
            let (post, user) = row?;
            likes.entry(post).or_default().push(user);
        }

        let mut stmt = conn.prepare(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE ?1 IS NULL OR author = ?1 ORDER BY id"
        ))?;
        let rows = stmt.query_map([author.map(|a| a.0)], read_post_row)?;

        let mut posts = vec![];
        for row in rows {
            let (id, post) = row?;
            let liked_by = likes.remove(&id).unwrap_or_default().into_iter().collect();
            posts.push(Post::restore(id, post, liked_by));
        }
        Ok(posts)
    }
}

impl Store for SqliteStore {
    fn insert_user(&self, user: NewUser) -> LedgerResult<User> {
        let mut conn = self.conn.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let taken: bool = tx.query_row(
            "SELECT EXISTS (SELECT 1 FROM users WHERE username = ?1)",
            [&user.username],
            |row| row.get(0),
        )?;
        if taken {
            return Err(LedgerError::UsernameTaken(user.username));
        }

        let linked: bool = tx.query_row(
            "SELECT EXISTS (SELECT 1 FROM users WHERE hashed_google_id = ?1)",
            [&user.hashed_google_id],
            |row| row.get(0),
        )?;
        if linked {
            return Err(LedgerError::IdentityTaken);
        }

        tx.execute(
            "INSERT INTO users (username, hashed_google_id, member_since) VALUES (?1, ?2, ?3)",
            (&user.username, &user.hashed_google_id, &user.member_since),
        )?;
        let id = UserId(tx.last_insert_rowid());
        tx.commit()?;

        debug!("Inserted user {} ({})", user.username, id);
        Ok(user.into_user(id))
    }

    fn find_user_by_id(&self, id: UserId) -> LedgerResult<Option<User>> {
        self.find_user("id", &id.0)
    }

    fn find_user_by_name(&self, name: &str) -> LedgerResult<Option<User>> {
        self.find_user("username", &name)
    }

    fn find_user_by_hashed_google_id(&self, hashed: &str) -> LedgerResult<Option<User>> {
        self.find_user("hashed_google_id", &hashed)
    }

    fn insert_post(&self, post: NewPost) -> LedgerResult<Post> {
        let conn = self.conn.lock()?;
        conn.execute(
            "INSERT INTO posts (title, content, author, created_at, likes) VALUES (?1, ?2, ?3, ?4, 0)",
            (&post.title, &post.content, post.author.0, &post.created_at),
        )?;
        let id = PostId(conn.last_insert_rowid());

        debug!("Inserted post {}", id);
        Ok(Post::restore(id, post, LikedBy::default()))
    }

    fn find_post(&self, id: PostId) -> LedgerResult<Option<Post>> {
        let conn = self.conn.lock()?;
        read_post(&conn, id)
    }

    fn posts(&self) -> LedgerResult<Vec<Post>> {
        self.query_posts(None)
    }

    fn posts_by_author(&self, author: UserId) -> LedgerResult<Vec<Post>> {
        self.query_posts(Some(author))
    }

    fn update_post<R, F>(&self, id: PostId, f: F) -> LedgerResult<R>
    where
        F: FnOnce(&mut Post) -> LedgerResult<R>,
    {
        let mut conn = self.conn.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut post = read_post(&tx, id)?.ok_or(LedgerError::PostNotFound(id))?;
        let before = post.liked_by().clone();
        let result = f(&mut post)?;

        write_likes(&tx, &post, &before)?;
        tx.execute(
            "UPDATE posts SET title = ?1, content = ?2, likes = ?3 WHERE id = ?4",
            (&post.title, &post.content, post.like_count(), id.0),
        )?;
        tx.commit()?;

        Ok(result)
    }

    fn remove_post<F>(&self, id: PostId, check: F) -> LedgerResult<Post>
    where
        F: FnOnce(&Post) -> LedgerResult<()>,
    {
        let mut conn = self.conn.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let post = read_post(&tx, id)?.ok_or(LedgerError::PostNotFound(id))?;
        check(&post)?;

        tx.execute("DELETE FROM post_likes WHERE post_id = ?1", [id.0])?;
        tx.execute("DELETE FROM posts WHERE id = ?1", [id.0])?;
        tx.commit()?;

        Ok(post)
    }

    fn is_empty(&self) -> LedgerResult<bool> {
        let conn = self.conn.lock()?;
        let rows: i64 = conn.query_row(
            "SELECT (SELECT COUNT(*) FROM users) + (SELECT COUNT(*) FROM posts)",
            [],
            |row| row.get(0),
        )?;
        Ok(rows == 0)
    }
}

fn read_user(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: UserId(row.get(0)?),
        username: row.get(1)?,
        hashed_google_id: row.get(2)?,
        member_since: row.get(3)?,
    })
}

fn read_post_row(row: &Row) -> rusqlite::Result<(PostId, NewPost)> {
    Ok((
        PostId(row.get(0)?),
        NewPost {
            title: row.get(1)?,
            content: row.get(2)?,
            author: UserId(row.get(3)?),
            created_at: row.get(4)?,
        },
    ))
}

fn read_post(conn: &Connection, id: PostId) -> LedgerResult<Option<Post>> {
    let row = conn
        .query_row(
            &format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ?1"),
            [id.0],
            read_post_row,
        )
        .optional()?;
    let Some((id, post)) = row else {
        return Ok(None);
    };

    let mut stmt = conn.prepare("SELECT user_id FROM post_likes WHERE post_id = ?1")?;
    let liked_by = stmt
        .query_map([id.0], |row| Ok(UserId(row.get(0)?)))?
        .collect::<rusqlite::Result<LikedBy>>()?;

    Ok(Some(Post::restore(id, post, liked_by)))
}

/// Bring `post_likes` in line with the post's in-memory membership set.
fn write_likes(tx: &Transaction, post: &Post, before: &LikedBy) -> LedgerResult<()> {
    for user in before.iter().filter(|user| !post.is_liked_by(*user)) {
        tx.execute(
            "DELETE FROM post_likes WHERE post_id = ?1 AND user_id = ?2",
            (post.id.0, user.0),
        )?;
    }
    for user in post.liked_by().iter().filter(|user| !before.contains(*user)) {
        tx.execute(
            "INSERT INTO post_likes (post_id, user_id) VALUES (?1, ?2)",
            (post.id.0, user.0),
        )?;
    }
    Ok(())
}
