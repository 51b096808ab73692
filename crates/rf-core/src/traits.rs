//! # Core Traits (Ports)
//!
//! Any storage plugin must implement `Backend` to be used by the `Store`.
//! `PasswordHasher` and `SessionRegistry` are consumed by the account flow,
//! never by the `Store` itself.

use async_trait::async_trait;

use crate::documents::{ActivityDoc, CommentDoc, PostDoc, PostListQuery, UserDoc, VoteDoc};
use crate::error::Result;
use crate::ids::{CommentId, PostId, ResourceRef, UserId};

/// Pure transform applied to a freshly loaded post on every attempt.
///
/// It may run several times, so it must not have side effects.
pub type PostMutation<'a> = &'a (dyn Fn(&mut PostDoc) -> Result<()> + Send + Sync);

/// Durable storage for the five document kinds.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Prepares databases and secondary indexes. No-op by default.
    async fn ensure_indexes(&self) -> Result<()> {
        Ok(())
    }

    // User Operations
    /// Fails with `Conflict` if the ID is taken.
    async fn create_user(&self, doc: &UserDoc) -> Result<()>;
    async fn get_user_by_id(&self, id: &UserId) -> Result<UserDoc>;
    /// Equality lookup; any one match may be returned.
    async fn get_user_by_email(&self, email: &str) -> Result<UserDoc>;

    // Post Operations
    async fn create_post(&self, doc: &PostDoc) -> Result<()>;
    async fn get_post(&self, id: &PostId) -> Result<PostDoc>;
    /// Read, apply `mutate`, conditionally write; on a write conflict re-read
    /// and reapply, for at most `max_retries` attempts. Exhaustion is `Conflict`.
    async fn mutate_post(
        &self,
        id: &PostId,
        mutate: PostMutation<'_>,
        max_retries: u32,
    ) -> Result<PostDoc>;
    /// Callers must not rely on ordering unless `recent_only` is set.
    async fn query_posts(&self, query: &PostListQuery) -> Result<Vec<PostDoc>>;

    // Comment Operations
    async fn create_comment(&self, doc: &CommentDoc) -> Result<()>;
    /// Top-level comments of a post only.
    async fn list_comments(&self, post_id: &PostId) -> Result<Vec<CommentDoc>>;
    /// Direct replies to a comment.
    async fn list_replies(&self, parent_id: &CommentId) -> Result<Vec<CommentDoc>>;

    // Vote Operations
    async fn get_vote(&self, user_id: &UserId, resource: &ResourceRef) -> Result<VoteDoc>;
    /// Unconditional upsert keyed by the derived vote ID.
    async fn put_vote(&self, doc: &VoteDoc) -> Result<()>;

    /// Best-effort audit log; callers ignore the result.
    async fn add_activity(&self, doc: &ActivityDoc) -> Result<()>;
}

/// Password hashing contract used by registration and login.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, plaintext: &str) -> Result<String>;
    fn verify(&self, hash: &str, plaintext: &str) -> bool;
}

/// Maps opaque session tokens to authenticated usernames.
pub trait SessionRegistry: Send + Sync {
    fn check_auth(&self, token: &str) -> Option<String>;
    /// Fails only when no token can be generated.
    fn create_session(&self, username: &str) -> Result<String>;
    fn logout(&self, token: &str);
}
