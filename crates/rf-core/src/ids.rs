//! # Document IDs
//!
//! Every document is addressed by a stable, parseable string ID of the form
//! `type:identifier`:
//!
//! - `user:<username>`
//! - `post:<unix-nanos>`
//! - `comment:<unix-nanos>`
//! - `vote:<userID>:<resourceID>`
//! - `activity:<RFC3339 with trimmed nanos>:<resourceID>`

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

pub const USER_PREFIX: &str = "user:";
pub const POST_PREFIX: &str = "post:";
pub const COMMENT_PREFIX: &str = "comment:";

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(raw: String) -> Self {
                Self(raw)
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self(raw.to_string())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// `user:<username>`; the username is the primary key.
    UserId
);
string_id!(
    /// `post:<unix-nanos>` of the creation instant.
    PostId
);
string_id!(
    /// `comment:<unix-nanos>` of the creation instant.
    CommentId
);

impl UserId {
    pub fn new(username: &str) -> Self {
        Self(format!("{USER_PREFIX}{username}"))
    }

    /// The bare username, or the whole ID when it lacks the `user:` prefix.
    pub fn username(&self) -> &str {
        self.0.strip_prefix(USER_PREFIX).unwrap_or(&self.0)
    }
}

impl PostId {
    pub fn from_timestamp(ts: DateTime<Utc>) -> Self {
        Self(format!("{POST_PREFIX}{}", unix_nanos(ts)))
    }
}

impl CommentId {
    pub fn from_timestamp(ts: DateTime<Utc>) -> Self {
        Self(format!("{COMMENT_PREFIX}{}", unix_nanos(ts)))
    }
}

fn unix_nanos(ts: DateTime<Utc>) -> String {
    // i64 nanoseconds run out in 2262
    match ts.timestamp_nanos_opt() {
        Some(nanos) => nanos.to_string(),
        None => format!("{}{:09}", ts.timestamp(), ts.timestamp_subsec_nanos()),
    }
}

/// The kinds of resource a vote or activity entry can point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Post,
    Comment,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Post => "post",
            ResourceKind::Comment => "comment",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed pointer at a post or comment. Not persisted on its own.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceRef {
    pub kind: ResourceKind,
    /// Full document ID including its prefix, e.g. `post:1735992000000000000`
    pub id: String,
}

impl ResourceRef {
    pub fn post(id: &PostId) -> Self {
        Self { kind: ResourceKind::Post, id: id.to_string() }
    }

    pub fn comment(id: &CommentId) -> Self {
        Self { kind: ResourceKind::Comment, id: id.to_string() }
    }
}

/// The vote ID is the uniqueness constraint: one vote per (user, resource).
pub fn vote_id(user_id: &UserId, resource: &ResourceRef) -> String {
    format!("vote:{user_id}:{}", resource.id)
}

pub fn activity_id(ts: DateTime<Utc>, resource: &ResourceRef) -> String {
    format!("activity:{}:{}", rfc3339_nano(ts), resource.id)
}

/// RFC 3339 with trailing fractional zeros removed, and no `.` at all on
/// whole seconds: `12:00:00Z`, `12:00:00.5Z`, `12:00:00.000000001Z`.
fn rfc3339_nano(ts: DateTime<Utc>) -> String {
    let padded = ts.to_rfc3339_opts(SecondsFormat::Nanos, true);
    let Some((seconds, fraction)) = padded.trim_end_matches('Z').split_once('.') else {
        return padded;
    };
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        format!("{seconds}Z")
    } else {
        format!("{seconds}.{fraction}Z")
    }
}
