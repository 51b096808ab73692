//! # rf-backend-memory
//!
//! In-process implementation of `Backend`.
//! Each document kind lives in its own `DashMap` keyed by document ID, and
//! every stored document carries a `<generation>-<uuid>` revision so that
//! conditional writes behave like the document database.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rf_core::retry::{mutate_with_retry, VersionedCollection};
use rf_core::{
    vote_id, ActivityDoc, Backend, CommentDoc, CommentId, Document, PostDoc, PostId,
    PostListQuery, PostMutation, ResourceRef, Result, StoreError, UserDoc, UserId, VoteDoc,
};
use tracing::debug;
use uuid::Uuid;

/// One table of documents of a single kind.
struct Table<D> {
    docs: DashMap<String, D>,
}

impl<D: Document> Table<D> {
    fn new() -> Self {
        Self { docs: DashMap::new() }
    }

    /// Inserts a new document; an existing ID is a `Conflict`.
    fn insert(&self, doc: &D) -> Result<D> {
        match self.docs.entry(doc.id().to_string()) {
            Entry::Occupied(_) => Err(StoreError::Conflict(format!(
                "{} {} already exists",
                D::DOC_TYPE,
                doc.id()
            ))),
            Entry::Vacant(slot) => {
                let mut stored = doc.clone();
                stored.set_rev(Some(next_rev(None)));
                slot.insert(stored.clone());
                Ok(stored)
            }
        }
    }

    fn get(&self, id: &str) -> Result<D> {
        self.docs
            .get(id)
            .map(|doc| doc.value().clone())
            .ok_or_else(|| StoreError::not_found(D::DOC_TYPE, id))
    }

    /// Inserts or overwrites regardless of revision.
    fn upsert(&self, doc: &D) -> D {
        let mut entry = self.docs.entry(doc.id().to_string()).or_insert_with(|| doc.clone());
        let mut stored = doc.clone();
        stored.set_rev(Some(next_rev(entry.rev())));
        *entry = stored.clone();
        stored
    }

    /// Overwrites only if the caller saw the stored revision.
    fn replace_if_current(&self, doc: &D) -> Result<D> {
        let mut current = self
            .docs
            .get_mut(doc.id())
            .ok_or_else(|| StoreError::not_found(D::DOC_TYPE, doc.id()))?;

        if current.rev() != doc.rev() {
            return Err(StoreError::Conflict(format!(
                "{} {} was modified concurrently",
                D::DOC_TYPE,
                doc.id()
            )));
        }

        let mut stored = doc.clone();
        stored.set_rev(Some(next_rev(current.rev())));
        *current = stored.clone();
        Ok(stored)
    }

    fn scan(&self, keep: impl Fn(&D) -> bool) -> Vec<D> {
        self.docs
            .iter()
            .filter(|entry| keep(entry.value()))
            .map(|entry| entry.value().clone())
            .collect()
    }
}

#[async_trait]
impl<D: Document> VersionedCollection<D> for Table<D> {
    async fn load(&self, id: &str) -> Result<D> {
        self.get(id)
    }

    async fn replace(&self, doc: &D) -> Result<D> {
        self.replace_if_current(doc)
    }
}

/// Revisions count up from 1 like CouchDB's: `<generation>-<random>`.
fn next_rev(current: Option<&str>) -> String {
    let generation = current
        .and_then(|rev| rev.split_once('-'))
        .and_then(|(n, _)| n.parse::<u64>().ok())
        .unwrap_or(0);
    format!("{}-{}", generation + 1, Uuid::new_v4().simple())
}

pub struct MemoryBackend {
    users: Table<UserDoc>,
    posts: Table<PostDoc>,
    comments: Table<CommentDoc>,
    votes: Table<VoteDoc>,
    activity: Table<ActivityDoc>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            users: Table::new(),
            posts: Table::new(),
            comments: Table::new(),
            votes: Table::new(),
            activity: Table::new(),
        }
    }

    /// Number of audit entries recorded so far.
    pub fn activity_count(&self) -> usize {
        self.activity.docs.len()
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn create_user(&self, doc: &UserDoc) -> Result<()> {
        self.users.insert(doc).map(drop)
    }

    async fn get_user_by_id(&self, id: &UserId) -> Result<UserDoc> {
        self.users.get(id.as_str())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<UserDoc> {
        self.users
            .scan(|user| user.email == email)
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::not_found(UserDoc::DOC_TYPE, email))
    }

    async fn create_post(&self, doc: &PostDoc) -> Result<()> {
        self.posts.insert(doc).map(drop)
    }

    async fn get_post(&self, id: &PostId) -> Result<PostDoc> {
        self.posts.get(id.as_str())
    }

    async fn mutate_post(
        &self,
        id: &PostId,
        mutate: PostMutation<'_>,
        max_retries: u32,
    ) -> Result<PostDoc> {
        mutate_with_retry(&self.posts, id.as_str(), mutate, max_retries).await
    }

    async fn query_posts(&self, query: &PostListQuery) -> Result<Vec<PostDoc>> {
        let mut posts = self.posts.scan(|post| {
            query.author.as_ref().map_or(true, |author| &post.author_id == author)
                && query.tag.as_ref().map_or(true, |tag| post.tags.contains(tag))
        });

        if query.recent_only {
            posts.sort_by(|a, b| b.last_activity.cmp(&a.last_activity));
        }
        if query.limit > 0 {
            posts.truncate(query.limit);
        }

        debug!(matched = posts.len(), "queried posts");
        Ok(posts)
    }

    async fn create_comment(&self, doc: &CommentDoc) -> Result<()> {
        self.comments.insert(doc).map(drop)
    }

    async fn list_comments(&self, post_id: &PostId) -> Result<Vec<CommentDoc>> {
        Ok(self
            .comments
            .scan(|comment| &comment.post_id == post_id && comment.parent_id.is_none()))
    }

    async fn list_replies(&self, parent_id: &CommentId) -> Result<Vec<CommentDoc>> {
        Ok(self
            .comments
            .scan(|comment| comment.parent_id.as_ref() == Some(parent_id)))
    }

    async fn get_vote(&self, user_id: &UserId, resource: &ResourceRef) -> Result<VoteDoc> {
        self.votes.get(&vote_id(user_id, resource))
    }

    async fn put_vote(&self, doc: &VoteDoc) -> Result<()> {
        self.votes.upsert(doc);
        Ok(())
    }

    async fn add_activity(&self, doc: &ActivityDoc) -> Result<()> {
        self.activity.upsert(doc);
        Ok(())
    }
}
