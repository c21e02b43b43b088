use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub username: String,
    #[serde(skip_serializing)]
    pub hashed_google_id: String,
    pub member_since: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub hashed_google_id: String,
    pub member_since: DateTime<Utc>,
}

impl NewUser {
    /// The external id is only ever stored hashed.
    pub fn new(username: impl Into<String>, google_id: &str) -> Self {
        Self {
            username: username.into(),
            hashed_google_id: hash_google_id(google_id),
            member_since: Utc::now(),
        }
    }
    pub fn member_since(mut self, member_since: DateTime<Utc>) -> Self {
        self.member_since = member_since;
        self
    }
    pub fn into_user(self, id: UserId) -> User {
        User {
            id,
            username: self.username,
            hashed_google_id: self.hashed_google_id,
            member_since: self.member_since,
        }
    }
}

pub fn hash_google_id(google_id: &str) -> String {
    hex::encode(Sha256::digest(google_id.as_bytes()))
}
