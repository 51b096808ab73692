use chrono::{DateTime, Utc};
use tracing::{instrument, warn};

use super::{require, Store};
use crate::documents::{DocMeta, Document, PostDoc, VoteDoc};
use crate::error::{Result, StoreError};
use crate::ids::{vote_id, PostId, ResourceKind, ResourceRef, UserId};
use crate::models::VoteDirection;
use crate::options::VoteOptions;

impl Store {
    /// Records `direction` as the user's vote on `resource`.
    ///
    /// Re-submitting the current direction is a no-op: nothing is written
    /// and no counter moves. Votes on posts then reconcile the post counters;
    /// that step is best-effort. Votes on comments are stored but have no
    /// counters.
    #[instrument(skip_all, fields(user_id = %user_id, resource = %resource.id, direction = ?direction))]
    pub async fn set_vote(
        &self,
        user_id: &UserId,
        resource: &ResourceRef,
        direction: VoteDirection,
        options: VoteOptions,
    ) -> Result<()> {
        require("user id", user_id.as_str())?;
        require("resource id", &resource.id)?;

        let (previous, rev) = match self.backend.get_vote(user_id, resource).await {
            Ok(doc) => (doc.direction, doc.meta.rev),
            Err(StoreError::NotFound(..)) => (VoteDirection::None, None),
            Err(e) => return Err(e),
        };

        if previous == direction {
            return Ok(());
        }

        let now = self.now();
        let mut meta = DocMeta::new(vote_id(user_id, resource), VoteDoc::DOC_TYPE);
        meta.rev = rev;
        let doc = VoteDoc {
            meta,
            user_id: user_id.clone(),
            resource: resource.clone(),
            direction,
            updated_at: now,
        };
        self.backend.put_vote(&doc).await?;

        if resource.kind == ResourceKind::Post {
            let post_id = PostId::from(resource.id.as_str());
            let reconcile = |post: &mut PostDoc| -> Result<()> {
                apply_vote_change(post, previous, direction, now);
                Ok(())
            };
            let max_retries = options.max_retries.unwrap_or(self.max_retries);
            if let Err(e) = self.backend.mutate_post(&post_id, &reconcile, max_retries).await {
                warn!(error = %e, vote_id = doc.id(), "vote saved but post counters not updated");
            }
        }

        if options.track_activity {
            self.track_activity(now, resource.clone(), user_id).await;
        }

        Ok(())
    }

    /// The user's current vote; no vote at all is `VoteDirection::None`.
    pub async fn get_user_vote(&self, user_id: &UserId, resource: &ResourceRef) -> Result<VoteDirection> {
        match self.backend.get_vote(user_id, resource).await {
            Ok(doc) => Ok(doc.direction),
            Err(StoreError::NotFound(..)) => Ok(VoteDirection::None),
            Err(e) => Err(e),
        }
    }
}

/// Removes the old direction's contribution, adds the new one's and bumps
/// last activity. `score` stays equal to `upvotes - downvotes` as long as it
/// was before.
pub(crate) fn apply_vote_change(
    post: &mut PostDoc,
    previous: VoteDirection,
    next: VoteDirection,
    now: DateTime<Utc>,
) {
    let (old_up, old_down, old_score) = previous.contribution();
    let (new_up, new_down, new_score) = next.contribution();

    post.upvotes += new_up - old_up;
    post.downvotes += new_down - old_down;
    post.score += new_score - old_score;
    post.last_activity = now;
}
