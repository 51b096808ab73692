//! # Backend Documents
//!
//! The persisted shape of each entity. Documents are immutable by
//! replacement: every update is a read-modify-write of the whole document,
//! guarded by the revision token in `DocMeta`.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::ids::{CommentId, PostId, ResourceRef, UserId};
use crate::models::{Comment, Post, User, VoteDirection};

/// Fields shared by every document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocMeta {
    #[serde(rename = "_id")]
    pub id: String,
    /// Version token compared on conditional writes. `None` until stored.
    #[serde(rename = "_rev", default, skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(rename = "docType")]
    pub doc_type: String,
}

impl DocMeta {
    pub fn new(id: impl Into<String>, doc_type: &str) -> Self {
        Self { id: id.into(), rev: None, doc_type: doc_type.to_string() }
    }
}

/// Anything a backend can store, load and conditionally replace.
pub trait Document: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    /// Value of the `docType` field
    const DOC_TYPE: &'static str;

    fn meta(&self) -> &DocMeta;
    fn meta_mut(&mut self) -> &mut DocMeta;

    fn id(&self) -> &str {
        &self.meta().id
    }

    fn rev(&self) -> Option<&str> {
        self.meta().rev.as_deref()
    }

    fn set_rev(&mut self, rev: Option<String>) {
        self.meta_mut().rev = rev;
    }
}

macro_rules! document {
    ($doc:ty, $doc_type:literal) => {
        impl Document for $doc {
            const DOC_TYPE: &'static str = $doc_type;

            fn meta(&self) -> &DocMeta {
                &self.meta
            }

            fn meta_mut(&mut self) -> &mut DocMeta {
                &mut self.meta
            }
        }
    };
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDoc {
    #[serde(flatten)]
    pub meta: DocMeta,
    pub email: String,
    #[serde(default)]
    pub display_name: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub email_verified: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDoc {
    #[serde(flatten)]
    pub meta: DocMeta,
    pub author_id: UserId,
    pub title: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub slug: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub score: i64,
    pub upvotes: i64,
    pub downvotes: i64,
    pub comment_count: i64,
    pub last_activity: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentDoc {
    #[serde(flatten)]
    pub meta: DocMeta,
    pub post_id: PostId,
    pub author_id: UserId,
    pub body: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<CommentId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteDoc {
    #[serde(flatten)]
    pub meta: DocMeta,
    pub user_id: UserId,
    pub resource: ResourceRef,
    pub direction: VoteDirection,
    pub updated_at: DateTime<Utc>,
}

/// Best-effort audit entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityDoc {
    #[serde(flatten)]
    pub meta: DocMeta,
    pub resource: ResourceRef,
    pub actor_id: UserId,
    pub timestamp: DateTime<Utc>,
}

document!(UserDoc, "user");
document!(PostDoc, "post");
document!(CommentDoc, "comment");
document!(VoteDoc, "vote");
document!(ActivityDoc, "activity");

impl From<UserDoc> for User {
    fn from(doc: UserDoc) -> Self {
        User {
            id: UserId::from(doc.meta.id),
            email: doc.email,
            display_name: doc.display_name,
            password_hash: doc.password_hash,
            created_at: doc.created_at,
            email_verified: doc.email_verified,
        }
    }
}

impl From<PostDoc> for Post {
    fn from(doc: PostDoc) -> Self {
        Post {
            id: PostId::from(doc.meta.id),
            author_id: doc.author_id,
            title: doc.title,
            body: doc.body,
            tags: doc.tags,
            slug: doc.slug,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
            score: doc.score,
            upvotes: doc.upvotes,
            downvotes: doc.downvotes,
            comment_count: doc.comment_count,
            last_activity: doc.last_activity,
        }
    }
}

impl From<CommentDoc> for Comment {
    fn from(doc: CommentDoc) -> Self {
        Comment {
            id: CommentId::from(doc.meta.id),
            post_id: doc.post_id,
            author_id: doc.author_id,
            body: doc.body,
            created_at: doc.created_at,
            parent_id: doc.parent_id,
        }
    }
}

/// Filter passed to `Backend::query_posts`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostListQuery {
    pub author: Option<UserId>,
    pub tag: Option<String>,
    /// `0` means unlimited
    pub limit: usize,
    /// Most recently active first; otherwise results are unordered
    pub recent_only: bool,
}
