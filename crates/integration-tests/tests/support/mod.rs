#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rf_backend_memory::MemoryBackend;
use rf_core::{
    ActivityDoc, Backend, CommentDoc, CommentId, PostDoc, PostId, PostListQuery, PostMutation,
    ResourceRef, Result, Store, StoreError, UserDoc, UserId, VoteDoc,
};

pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 4, 12, 0, 0).unwrap()
}

/// A clock that advances one second per reading, so every generated ID is
/// distinct and every timestamp predictable.
pub fn ticking_clock() -> impl Fn() -> DateTime<Utc> + Send + Sync + 'static {
    let ticks = AtomicI64::new(0);
    move || epoch() + chrono::Duration::seconds(ticks.fetch_add(1, Ordering::SeqCst))
}

/// Wraps `MemoryBackend` and fails `mutate_post` while `fail_mutations` is
/// set. Records the attempt budget of every `mutate_post` call.
pub struct FlakyBackend {
    pub inner: Arc<MemoryBackend>,
    pub fail_mutations: AtomicBool,
    pub mutate_calls: AtomicU32,
    budgets: Mutex<Vec<u32>>,
}

impl FlakyBackend {
    pub fn new(inner: Arc<MemoryBackend>) -> Self {
        Self {
            inner,
            fail_mutations: AtomicBool::new(false),
            mutate_calls: AtomicU32::new(0),
            budgets: Mutex::new(Vec::new()),
        }
    }

    pub fn budgets(&self) -> Vec<u32> {
        self.budgets.lock().unwrap().clone()
    }

    pub fn fail_mutations(&self, fail: bool) {
        self.fail_mutations.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Backend for FlakyBackend {
    async fn create_user(&self, doc: &UserDoc) -> Result<()> {
        self.inner.create_user(doc).await
    }

    async fn get_user_by_id(&self, id: &UserId) -> Result<UserDoc> {
        self.inner.get_user_by_id(id).await
    }

    async fn get_user_by_email(&self, email: &str) -> Result<UserDoc> {
        self.inner.get_user_by_email(email).await
    }

    async fn create_post(&self, doc: &PostDoc) -> Result<()> {
        self.inner.create_post(doc).await
    }

    async fn get_post(&self, id: &PostId) -> Result<PostDoc> {
        self.inner.get_post(id).await
    }

    async fn mutate_post(&self, id: &PostId, mutate: PostMutation<'_>, max_retries: u32) -> Result<PostDoc> {
        self.mutate_calls.fetch_add(1, Ordering::SeqCst);
        self.budgets.lock().unwrap().push(max_retries);
        if self.fail_mutations.load(Ordering::SeqCst) {
            return Err(StoreError::Backend(anyhow!("injected mutate_post failure")));
        }
        self.inner.mutate_post(id, mutate, max_retries).await
    }

    async fn query_posts(&self, query: &PostListQuery) -> Result<Vec<PostDoc>> {
        self.inner.query_posts(query).await
    }

    async fn create_comment(&self, doc: &CommentDoc) -> Result<()> {
        self.inner.create_comment(doc).await
    }

    async fn list_comments(&self, post_id: &PostId) -> Result<Vec<CommentDoc>> {
        self.inner.list_comments(post_id).await
    }

    async fn list_replies(&self, parent_id: &CommentId) -> Result<Vec<CommentDoc>> {
        self.inner.list_replies(parent_id).await
    }

    async fn get_vote(&self, user_id: &UserId, resource: &ResourceRef) -> Result<VoteDoc> {
        self.inner.get_vote(user_id, resource).await
    }

    async fn put_vote(&self, doc: &VoteDoc) -> Result<()> {
        self.inner.put_vote(doc).await
    }

    async fn add_activity(&self, doc: &ActivityDoc) -> Result<()> {
        self.inner.add_activity(doc).await
    }
}

/// A store over a fresh memory backend with a ticking clock.
pub fn store() -> (Store, Arc<MemoryBackend>) {
    let backend = Arc::new(MemoryBackend::new());
    let store = Store::new(backend.clone()).with_clock(ticking_clock());
    (store, backend)
}

/// A store whose backend can be told to fail counter updates.
pub fn flaky_store() -> (Store, Arc<FlakyBackend>) {
    let backend = Arc::new(FlakyBackend::new(Arc::new(MemoryBackend::new())));
    let store = Store::new(backend.clone()).with_clock(ticking_clock());
    (store, backend)
}

pub async fn register(store: &Store, username: &str) -> rf_core::User {
    store
        .register_user(&format!("{username}@example.com"), username, "hash", Default::default())
        .await
        .unwrap()
}
