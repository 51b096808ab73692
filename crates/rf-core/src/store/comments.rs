use tracing::{instrument, warn};

use super::{require, Store};
use crate::documents::{CommentDoc, DocMeta, Document, PostDoc};
use crate::error::{Result, StoreError};
use crate::ids::{CommentId, PostId, ResourceRef, UserId};
use crate::models::Comment;
use crate::options::CommentOptions;

impl Store {
    /// Creates a comment, then bumps the post's comment count and last
    /// activity.
    ///
    /// The comment document is authoritative: once it is written the call
    /// succeeds even if the counter update fails.
    #[instrument(skip_all, fields(post_id = %post_id, author_id = %author_id))]
    pub async fn add_comment(
        &self,
        post_id: &PostId,
        author_id: &UserId,
        body: &str,
        options: CommentOptions,
    ) -> Result<Comment> {
        require("post id", post_id.as_str())?;
        require("author id", author_id.as_str())?;
        require("body", body)?;

        let now = self.now();
        let comment_id = CommentId::from_timestamp(now);
        let doc = CommentDoc {
            meta: DocMeta::new(comment_id.as_str(), CommentDoc::DOC_TYPE),
            post_id: post_id.clone(),
            author_id: author_id.clone(),
            body: body.to_string(),
            created_at: now,
            parent_id: options.parent_id,
        };

        self.backend.create_comment(&doc).await?;

        let bump = |post: &mut PostDoc| -> Result<()> {
            post.comment_count += 1;
            post.last_activity = now;
            Ok(())
        };
        if let Err(e) = self.backend.mutate_post(post_id, &bump, self.max_retries).await {
            warn!(error = %e, comment_id = %comment_id, "comment saved but post counters not updated");
        }

        if options.track_activity {
            self.track_activity(now, ResourceRef::comment(&comment_id), author_id).await;
        }

        Ok(Comment::from(doc))
    }

    /// Comments are not addressable by ID yet; this is always `NotFound`.
    pub async fn get_comment(&self, comment_id: &CommentId) -> Result<Comment> {
        Err(StoreError::not_found(CommentDoc::DOC_TYPE, comment_id.as_str()))
    }

    /// Top-level comments of a post, unordered.
    pub async fn list_comments(&self, post_id: &PostId) -> Result<Vec<Comment>> {
        let docs = self.backend.list_comments(post_id).await?;
        Ok(docs.into_iter().map(Comment::from).collect())
    }

    /// Direct replies to a comment, unordered.
    pub async fn list_replies(&self, parent_id: &CommentId) -> Result<Vec<Comment>> {
        let docs = self.backend.list_replies(parent_id).await?;
        Ok(docs.into_iter().map(Comment::from).collect())
    }
}
