//! # Resource Dispatch
//!
//! Raw IDs are decoded once into a `ResourceId` by their type prefix. The
//! `Store` resolves them into a `Resource` for exhaustive matching, or runs
//! a `ResourceHandlers` set against them.

use crate::error::Result;
use crate::ids::{CommentId, PostId, UserId, COMMENT_PREFIX, POST_PREFIX, USER_PREFIX};
use crate::models::{Comment, Post, User};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceId {
    Post(PostId),
    Comment(CommentId),
    User(UserId),
    Unknown(String),
}

impl ResourceId {
    pub fn parse(raw: &str) -> Self {
        if raw.starts_with(POST_PREFIX) {
            ResourceId::Post(PostId::from(raw))
        } else if raw.starts_with(COMMENT_PREFIX) {
            ResourceId::Comment(CommentId::from(raw))
        } else if raw.starts_with(USER_PREFIX) {
            ResourceId::User(UserId::from(raw))
        } else {
            ResourceId::Unknown(raw.to_string())
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ResourceId::Post(_) => "post",
            ResourceId::Comment(_) => "comment",
            ResourceId::User(_) => "user",
            ResourceId::Unknown(_) => "unknown",
        }
    }
}

/// A fetched resource. Comments are not addressable by ID yet and come
/// back as `Unsupported`.
#[derive(Debug, Clone, PartialEq)]
pub enum Resource {
    Post(Post),
    User(User),
    Unsupported { kind: &'static str, id: String },
}

type Handler<'a, T> = Box<dyn FnOnce(T) -> Result<()> + Send + 'a>;
type FallbackHandler<'a> = Box<dyn FnOnce(&str, &str) -> Result<()> + Send + 'a>;

/// Optional callbacks for `Store::get_resource`.
///
/// A recognized kind without a handler is a no-op. `unknown` receives
/// `(kind, id)` for comments and unrecognized prefixes.
#[derive(Default)]
pub struct ResourceHandlers<'a> {
    pub post: Option<Handler<'a, Post>>,
    /// Never invoked while comments are not addressable; see `Resource`.
    pub comment: Option<Handler<'a, Comment>>,
    pub user: Option<Handler<'a, User>>,
    pub unknown: Option<FallbackHandler<'a>>,
}

impl<'a> ResourceHandlers<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_post(mut self, f: impl FnOnce(Post) -> Result<()> + Send + 'a) -> Self {
        self.post = Some(Box::new(f));
        self
    }

    pub fn on_comment(mut self, f: impl FnOnce(Comment) -> Result<()> + Send + 'a) -> Self {
        self.comment = Some(Box::new(f));
        self
    }

    pub fn on_user(mut self, f: impl FnOnce(User) -> Result<()> + Send + 'a) -> Self {
        self.user = Some(Box::new(f));
        self
    }

    pub fn on_unknown(mut self, f: impl FnOnce(&str, &str) -> Result<()> + Send + 'a) -> Self {
        self.unknown = Some(Box::new(f));
        self
    }
}
