use super::Store;
use crate::error::{Result, StoreError};
use crate::resource::{Resource, ResourceHandlers, ResourceId};

impl Store {
    /// Fetches whatever `id` points at. Comments and unrecognized prefixes
    /// come back as `Resource::Unsupported` without touching the backend.
    pub async fn resolve(&self, id: &str) -> Result<Resource> {
        let parsed = ResourceId::parse(id);
        let kind = parsed.kind();
        match parsed {
            ResourceId::Post(post_id) => self.get_post(&post_id).await.map(Resource::Post),
            ResourceId::User(user_id) => self.get_user_by_id(&user_id).await.map(Resource::User),
            ResourceId::Comment(_) | ResourceId::Unknown(_) => Ok(Resource::Unsupported {
                kind,
                id: id.to_string(),
            }),
        }
    }

    /// Runs the matching handler for `id`.
    ///
    /// Posts and users are fetched only when a handler for them is present;
    /// otherwise the call is a no-op. Comments and unrecognized IDs go to
    /// `unknown` as `(kind, id)`, or fail with `NotFound` when there is none.
    /// Handler errors are returned as-is.
    pub async fn get_resource(&self, id: &str, handlers: ResourceHandlers<'_>) -> Result<()> {
        let parsed = ResourceId::parse(id);
        let kind = parsed.kind();
        match parsed {
            ResourceId::Post(post_id) => match handlers.post {
                Some(handler) => handler(self.get_post(&post_id).await?),
                None => Ok(()),
            },
            ResourceId::User(user_id) => match handlers.user {
                Some(handler) => handler(self.get_user_by_id(&user_id).await?),
                None => Ok(()),
            },
            ResourceId::Comment(_) | ResourceId::Unknown(_) => match handlers.unknown {
                Some(handler) => handler(kind, id),
                None => Err(StoreError::not_found(kind, id)),
            },
        }
    }
}
