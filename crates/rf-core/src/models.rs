//! # Domain Models
//!
//! These structs are what handlers see. They are built from the backend
//! documents in `documents.rs` and never carry revision tokens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{CommentId, PostId, UserId};

/// A registered account. Created once at registration, never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub display_name: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub email_verified: bool,
}

/// A submission with derived vote and comment counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub author_id: UserId,
    pub title: String,
    pub body: String,
    pub tags: Vec<String>,
    pub slug: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Always `upvotes - downvotes`, maintained incrementally
    pub score: i64,
    pub upvotes: i64,
    pub downvotes: i64,
    pub comment_count: i64,
    pub last_activity: DateTime<Utc>,
}

/// A comment on a post. `parent_id` is `None` for top-level comments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub post_id: PostId,
    pub author_id: UserId,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub parent_id: Option<CommentId>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteDirection {
    #[default]
    None,
    Up,
    Down,
}

impl VoteDirection {
    /// Contribution of this direction to `(upvotes, downvotes, score)`.
    pub fn contribution(self) -> (i64, i64, i64) {
        match self {
            VoteDirection::None => (0, 0, 0),
            VoteDirection::Up => (1, 0, 1),
            VoteDirection::Down => (0, 1, -1),
        }
    }
}
