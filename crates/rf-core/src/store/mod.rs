//! # Store
//!
//! The only component handlers call. It validates input, formats IDs, turns
//! domain operations into backend document operations and keeps the derived
//! post counters in step with votes and comments.
//!
//! The `Store` holds no mutable state beyond a backend handle and a clock,
//! so one instance can serve every request concurrently. Cancellation is
//! the caller's: dropping a returned future abandons the backend call.

mod comments;
mod posts;
mod resources;
mod users;
mod votes;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::documents::{ActivityDoc, DocMeta, Document};
use crate::error::{Result, StoreError};
use crate::ids::{activity_id, ResourceRef, UserId};
use crate::options::DEFAULT_MAX_RETRIES;
use crate::traits::Backend;

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Clone)]
pub struct Store {
    backend: Arc<dyn Backend>,
    clock: Clock,
    /// Attempts for every conditional post mutation unless a call overrides it
    max_retries: u32,
}

impl Store {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            clock: Arc::new(Utc::now),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Replaces the wall clock, e.g. with a deterministic one in tests.
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    /// Writes an audit entry. Failures are logged and dropped.
    async fn track_activity(&self, now: DateTime<Utc>, resource: ResourceRef, actor_id: &UserId) {
        let doc = ActivityDoc {
            meta: DocMeta::new(activity_id(now, &resource), ActivityDoc::DOC_TYPE),
            resource,
            actor_id: actor_id.clone(),
            timestamp: now,
        };
        if let Err(e) = self.backend.add_activity(&doc).await {
            debug!(error = %e, activity_id = doc.id(), "activity logging failed");
        }
    }
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(StoreError::InvalidInput(format!("{field} must not be empty")));
    }
    Ok(())
}
