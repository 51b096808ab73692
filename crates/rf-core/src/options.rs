//! Per-call options for `Store` operations.

use crate::ids::{CommentId, UserId};

pub const DEFAULT_LIST_LIMIT: usize = 100;
pub const DEFAULT_MAX_RETRIES: u32 = 3;

#[derive(Debug, Clone, Default)]
pub struct UserOptions {
    pub display_name: String,
    pub email_verified: bool,
}

impl UserOptions {
    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    pub fn email_verified(mut self) -> Self {
        self.email_verified = true;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct PostOptions {
    pub tags: Vec<String>,
    pub slug: String,
    pub track_activity: bool,
}

impl PostOptions {
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = slug.into();
        self
    }

    pub fn track_activity(mut self) -> Self {
        self.track_activity = true;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct PostEditOptions {
    pub track_activity: bool,
}

impl PostEditOptions {
    pub fn track_activity(mut self) -> Self {
        self.track_activity = true;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct CommentOptions {
    /// `None` makes a top-level comment
    pub parent_id: Option<CommentId>,
    pub track_activity: bool,
}

impl CommentOptions {
    pub fn reply_to(mut self, parent_id: CommentId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn track_activity(mut self) -> Self {
        self.track_activity = true;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct VoteOptions {
    pub track_activity: bool,
    /// Attempts for post counter reconciliation; `None` uses the store's
    pub max_retries: Option<u32>,
}

impl VoteOptions {
    pub fn track_activity(mut self) -> Self {
        self.track_activity = true;
        self
    }

    pub fn conflict_retry(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }
}

#[derive(Debug, Clone)]
pub struct PostListOptions {
    pub author: Option<UserId>,
    pub tag: Option<String>,
    pub limit: usize,
    pub recent_only: bool,
}

impl Default for PostListOptions {
    fn default() -> Self {
        Self { author: None, tag: None, limit: DEFAULT_LIST_LIMIT, recent_only: false }
    }
}

impl PostListOptions {
    pub fn author(mut self, author: UserId) -> Self {
        self.author = Some(author);
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn recent_only(mut self) -> Self {
        self.recent_only = true;
        self
    }
}
