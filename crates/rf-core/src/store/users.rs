use tracing::{info, instrument};

use super::{require, Store};
use crate::documents::{DocMeta, Document, UserDoc};
use crate::error::{Result, StoreError};
use crate::ids::UserId;
use crate::models::User;
use crate::options::UserOptions;

impl Store {
    /// Creates `user:<username>`. Email format is not checked here; see
    /// `validation::validate_email`.
    #[instrument(skip_all, fields(username = %username))]
    pub async fn register_user(
        &self,
        email: &str,
        username: &str,
        password_hash: &str,
        options: UserOptions,
    ) -> Result<User> {
        require("email", email)?;
        require("username", username)?;
        require("password hash", password_hash)?;

        let doc = UserDoc {
            meta: DocMeta::new(UserId::new(username), UserDoc::DOC_TYPE),
            email: email.to_string(),
            display_name: options.display_name,
            password_hash: password_hash.to_string(),
            created_at: self.now(),
            email_verified: options.email_verified,
        };

        match self.backend.create_user(&doc).await {
            Ok(()) => {}
            Err(StoreError::Conflict(_)) => return Err(StoreError::UserExists(username.to_string())),
            Err(e) => return Err(e),
        }

        info!(user_id = doc.id(), "registered user");
        Ok(User::from(doc))
    }

    pub async fn get_user_by_id(&self, id: &UserId) -> Result<User> {
        self.backend.get_user_by_id(id).await.map(User::from)
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<User> {
        self.backend.get_user_by_email(email).await.map(User::from)
    }
}
