use tracing::instrument;

use super::{require, Store};
use crate::documents::{DocMeta, Document, PostDoc, PostListQuery};
use crate::error::Result;
use crate::ids::{PostId, ResourceRef, UserId};
use crate::models::Post;
use crate::options::{PostEditOptions, PostListOptions, PostOptions};

impl Store {
    /// Creates a post keyed by the current instant in nanoseconds.
    ///
    /// Two posts created in the same nanosecond collide and the second one
    /// fails with `Conflict`; it is not retried with a new timestamp.
    #[instrument(skip_all, fields(author_id = %author_id))]
    pub async fn create_post(
        &self,
        author_id: &UserId,
        title: &str,
        body: &str,
        options: PostOptions,
    ) -> Result<Post> {
        require("author id", author_id.as_str())?;
        require("title", title)?;
        require("body", body)?;

        let now = self.now();
        let post_id = PostId::from_timestamp(now);
        let doc = PostDoc {
            meta: DocMeta::new(post_id.as_str(), PostDoc::DOC_TYPE),
            author_id: author_id.clone(),
            title: title.to_string(),
            body: body.to_string(),
            tags: options.tags,
            slug: options.slug,
            created_at: now,
            updated_at: now,
            score: 0,
            upvotes: 0,
            downvotes: 0,
            comment_count: 0,
            last_activity: now,
        };

        self.backend.create_post(&doc).await?;

        if options.track_activity {
            self.track_activity(now, ResourceRef::post(&post_id), author_id).await;
        }

        Ok(Post::from(doc))
    }

    /// Replaces title and body. Counters written concurrently by votes and
    /// comments are preserved by the conditional retry.
    #[instrument(skip_all, fields(post_id = %post_id))]
    pub async fn edit_post_content(
        &self,
        post_id: &PostId,
        title: &str,
        body: &str,
        options: PostEditOptions,
    ) -> Result<Post> {
        require("post id", post_id.as_str())?;
        require("title", title)?;
        require("body", body)?;

        let now = self.now();
        let edit = |doc: &mut PostDoc| -> Result<()> {
            doc.title = title.to_string();
            doc.body = body.to_string();
            doc.updated_at = now;
            Ok(())
        };
        let doc = self.backend.mutate_post(post_id, &edit, self.max_retries).await?;

        if options.track_activity {
            self.track_activity(now, ResourceRef::post(post_id), &doc.author_id).await;
        }

        Ok(Post::from(doc))
    }

    pub async fn get_post(&self, post_id: &PostId) -> Result<Post> {
        self.backend.get_post(post_id).await.map(Post::from)
    }

    pub async fn list_posts(&self, options: PostListOptions) -> Result<Vec<Post>> {
        let query = PostListQuery {
            author: options.author,
            tag: options.tag,
            limit: options.limit,
            recent_only: options.recent_only,
        };
        let docs = self.backend.query_posts(&query).await?;
        Ok(docs.into_iter().map(Post::from).collect())
    }
}
