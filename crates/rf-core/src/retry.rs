//! # Optimistic Concurrency
//!
//! Read, apply a pure transform, write only if the revision is unchanged,
//! and start over on a mismatch. Backends implement `VersionedCollection`
//! for their document tables and get conditional mutation from
//! `mutate_with_retry`.

use async_trait::async_trait;
use tracing::debug;

use crate::documents::Document;
use crate::error::{Result, StoreError};

/// A set of documents of one type that supports conditional replacement.
#[async_trait]
pub trait VersionedCollection<D: Document>: Send + Sync {
    /// Loads the current document including its revision token.
    async fn load(&self, id: &str) -> Result<D>;

    /// Persists `doc` only if the stored revision equals `doc.rev()`.
    /// Returns the document carrying its new revision, or `Conflict`.
    async fn replace(&self, doc: &D) -> Result<D>;
}

/// Applies `mutate` to the latest copy of document `id` until a conditional
/// write succeeds. `max_retries` counts total attempts; `0` behaves as `1`.
///
/// `mutate` runs once per attempt against a fresh copy. Errors it returns
/// abort the loop unchanged.
pub async fn mutate_with_retry<D, C>(
    collection: &C,
    id: &str,
    mutate: &(dyn Fn(&mut D) -> Result<()> + Send + Sync),
    max_retries: u32,
) -> Result<D>
where
    D: Document,
    C: VersionedCollection<D> + ?Sized,
{
    let attempts = max_retries.max(1);

    for attempt in 1..=attempts {
        let mut doc = collection.load(id).await?;
        mutate(&mut doc)?;

        match collection.replace(&doc).await {
            Ok(saved) => return Ok(saved),
            Err(StoreError::Conflict(_)) => {
                debug!(
                    doc_type = D::DOC_TYPE,
                    id,
                    attempt,
                    "conflict on conditional write, retrying"
                );
            }
            Err(e) => return Err(e),
        }
    }

    Err(StoreError::Conflict(format!(
        "{} {id} kept changing; gave up after {attempts} attempts",
        D::DOC_TYPE
    )))
}
