//! # rf-backend-couchdb
//!
//! `Backend` implementation for a CouchDB-compatible document database
//! reached over HTTP.
//!
//! Every entity is one JSON document in a single database, told apart by
//! its `docType` field. Conditional writes use CouchDB's `_rev` check: a
//! `PUT` carrying a stale revision is answered with `409 Conflict`.

mod query;

use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use rf_core::retry::{mutate_with_retry, VersionedCollection};
use rf_core::{
    vote_id, ActivityDoc, Backend, CommentDoc, CommentId, Document, PostDoc, PostId,
    PostListQuery, PostMutation, ResourceRef, Result, StoreError, UserDoc, UserId, VoteDoc,
};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

pub use query::{comment_selector, post_query, reply_selector};

/// Mango indexes the queries in this crate rely on.
const INDEXES: &[(&str, &[&str])] = &[
    ("docType-email", &["docType", "email"]),
    ("docType-authorId", &["docType", "authorId"]),
    ("docType-lastActivity", &["docType", "lastActivity"]),
    ("docType-postId", &["docType", "postId"]),
    ("docType-parentId", &["docType", "parentId"]),
];

/// Attempts for `put_vote` when another writer replaced the vote first.
const VOTE_UPSERT_ATTEMPTS: u32 = 3;

/// Connection settings for `CouchBackend`.
#[derive(Debug)]
pub struct CouchConfig {
    /// Server base URL, e.g. `http://localhost:5984`
    pub url: String,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<SecretString>,
    /// Per-request timeout
    pub timeout: Duration,
    /// Rows fetched per `_find` page for unbounded queries
    pub page_size: usize,
}

impl CouchConfig {
    pub fn new(url: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            database: database.into(),
            username: None,
            password: None,
            timeout: Duration::from_secs(10),
            page_size: 200,
        }
    }

    pub fn credentials(mut self, username: impl Into<String>, password: SecretString) -> Self {
        self.username = Some(username.into());
        self.password = Some(password);
        self
    }
}

pub struct CouchBackend {
    client: Client,
    server: Url,
    db: Url,
    database: String,
    username: Option<String>,
    password: Option<SecretString>,
    page_size: usize,
}

#[derive(Deserialize)]
struct PutResponse {
    rev: String,
}

#[derive(Deserialize)]
struct FindResponse {
    docs: Vec<Value>,
    #[serde(default)]
    bookmark: Option<String>,
}

impl CouchBackend {
    pub fn new(config: CouchConfig) -> Result<Self> {
        let server = Url::parse(&config.url)
            .map_err(|e| StoreError::InvalidInput(format!("bad CouchDB url {:?}: {e}", config.url)))?;
        let db = child_url(&server, &config.database)?;
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(transport)?;

        Ok(Self {
            client,
            server,
            db,
            database: config.database,
            username: config.username,
            password: config.password,
            page_size: config.page_size.max(1),
        })
    }

    /// Builds the backend and checks that the server answers.
    pub async fn connect(config: CouchConfig) -> Result<Self> {
        let backend = Self::new(config)?;
        backend.ping().await?;
        Ok(backend)
    }

    pub async fn ping(&self) -> Result<()> {
        let response = self
            .request(Method::GET, self.server.clone())
            .send()
            .await
            .map_err(transport)?;
        expect_success(response, "server", self.server.as_str()).await?;
        Ok(())
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match (&self.username, &self.password) {
            (Some(user), password) => {
                builder.basic_auth(user, password.as_ref().map(|p| p.expose_secret().to_string()))
            }
            (None, _) => builder,
        }
    }

    async fn get_doc<D: Document>(&self, id: &str) -> Result<D> {
        let url = child_url(&self.db, id)?;
        let response = self.request(Method::GET, url).send().await.map_err(transport)?;
        let response = expect_success(response, D::DOC_TYPE, id).await?;
        response.json::<D>().await.map_err(transport)
    }

    /// Writes `doc` as-is. A missing `_rev` means "create"; a stale one is a
    /// `Conflict`. Returns the new revision.
    async fn put_doc<D: Document>(&self, doc: &D) -> Result<String> {
        let url = child_url(&self.db, doc.id())?;
        let response = self
            .request(Method::PUT, url)
            .json(doc)
            .send()
            .await
            .map_err(transport)?;
        let response = expect_success(response, D::DOC_TYPE, doc.id()).await?;
        let saved: PutResponse = response.json().await.map_err(transport)?;
        debug!(doc_type = D::DOC_TYPE, id = doc.id(), rev = %saved.rev, "stored document");
        Ok(saved.rev)
    }

    /// Runs a Mango query. With `limit == 0` every page is fetched through
    /// bookmarks. Rows that fail to decode are skipped.
    async fn find<D: Document>(&self, mut query: Value, limit: usize) -> Result<Vec<D>> {
        let url = child_url(&self.db, "_find")?;
        let page_size = if limit > 0 { limit } else { self.page_size };
        query["limit"] = json!(page_size);

        let mut docs = Vec::new();
        loop {
            let response = self
                .request(Method::POST, url.clone())
                .json(&query)
                .send()
                .await
                .map_err(transport)?;
            let response = expect_success(response, D::DOC_TYPE, "_find").await?;
            let page: FindResponse = response.json().await.map_err(transport)?;
            let rows = page.docs.len();

            for row in page.docs {
                match serde_json::from_value::<D>(row) {
                    Ok(doc) => docs.push(doc),
                    Err(e) => warn!(doc_type = D::DOC_TYPE, error = %e, "skipping undecodable document"),
                }
            }

            match page.bookmark {
                Some(bookmark) if limit == 0 && rows == page_size => {
                    query["bookmark"] = json!(bookmark);
                }
                _ => break,
            }
        }

        Ok(docs)
    }

    async fn create_database(&self) -> Result<()> {
        let response = self
            .request(Method::PUT, self.db.clone())
            .send()
            .await
            .map_err(transport)?;
        match response.status() {
            status if status.is_success() => info!(database = %self.database, "created database"),
            StatusCode::PRECONDITION_FAILED => debug!(database = %self.database, "database already exists"),
            _ => {
                expect_success(response, "database", &self.database).await?;
            }
        }
        Ok(())
    }

    async fn create_index(&self, name: &str, fields: &[&str]) -> Result<()> {
        let url = child_url(&self.db, "_index")?;
        let body = json!({ "index": { "fields": fields }, "name": name, "type": "json" });
        let response = self
            .request(Method::POST, url)
            .json(&body)
            .send()
            .await
            .map_err(transport)?;
        expect_success(response, "index", name).await?;
        debug!(index = name, "ensured index");
        Ok(())
    }
}

#[async_trait]
impl<D: Document> VersionedCollection<D> for CouchBackend {
    async fn load(&self, id: &str) -> Result<D> {
        self.get_doc(id).await
    }

    async fn replace(&self, doc: &D) -> Result<D> {
        let rev = self.put_doc(doc).await?;
        let mut saved = doc.clone();
        saved.set_rev(Some(rev));
        Ok(saved)
    }
}

#[async_trait]
impl Backend for CouchBackend {
    async fn ensure_indexes(&self) -> Result<()> {
        self.create_database().await?;
        for (name, fields) in INDEXES {
            self.create_index(name, fields).await?;
        }
        info!(database = %self.database, indexes = INDEXES.len(), "indexes ready");
        Ok(())
    }

    async fn create_user(&self, doc: &UserDoc) -> Result<()> {
        self.put_doc(doc).await.map(drop)
    }

    async fn get_user_by_id(&self, id: &UserId) -> Result<UserDoc> {
        self.get_doc(id.as_str()).await
    }

    async fn get_user_by_email(&self, email: &str) -> Result<UserDoc> {
        let query = json!({ "selector": { "docType": UserDoc::DOC_TYPE, "email": email } });
        self.find::<UserDoc>(query, 1)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::not_found(UserDoc::DOC_TYPE, email))
    }

    async fn create_post(&self, doc: &PostDoc) -> Result<()> {
        self.put_doc(doc).await.map(drop)
    }

    async fn get_post(&self, id: &PostId) -> Result<PostDoc> {
        self.get_doc(id.as_str()).await
    }

    async fn mutate_post(
        &self,
        id: &PostId,
        mutate: PostMutation<'_>,
        max_retries: u32,
    ) -> Result<PostDoc> {
        mutate_with_retry(self, id.as_str(), mutate, max_retries).await
    }

    async fn query_posts(&self, query: &PostListQuery) -> Result<Vec<PostDoc>> {
        self.find(post_query(query), query.limit).await
    }

    async fn create_comment(&self, doc: &CommentDoc) -> Result<()> {
        self.put_doc(doc).await.map(drop)
    }

    async fn list_comments(&self, post_id: &PostId) -> Result<Vec<CommentDoc>> {
        let docs: Vec<CommentDoc> = self.find(comment_selector(post_id), 0).await?;
        Ok(docs.into_iter().filter(|doc| doc.parent_id.is_none()).collect())
    }

    async fn list_replies(&self, parent_id: &CommentId) -> Result<Vec<CommentDoc>> {
        self.find(reply_selector(parent_id), 0).await
    }

    async fn get_vote(&self, user_id: &UserId, resource: &ResourceRef) -> Result<VoteDoc> {
        self.get_doc(&vote_id(user_id, resource)).await
    }

    async fn put_vote(&self, doc: &VoteDoc) -> Result<()> {
        let mut doc = doc.clone();
        for attempt in 1..=VOTE_UPSERT_ATTEMPTS {
            match self.put_doc(&doc).await {
                Ok(_) => return Ok(()),
                Err(StoreError::Conflict(_)) => {
                    debug!(vote_id = doc.id(), attempt, "vote revision stale, re-reading");
                    let current = match self.get_doc::<VoteDoc>(doc.id()).await {
                        Ok(current) => current.meta.rev,
                        Err(StoreError::NotFound(..)) => None,
                        Err(e) => return Err(e),
                    };
                    doc.set_rev(current);
                }
                Err(e) => return Err(e),
            }
        }
        Err(StoreError::Conflict(format!("vote {} kept changing", doc.id())))
    }

    async fn add_activity(&self, doc: &ActivityDoc) -> Result<()> {
        self.put_doc(doc).await.map(drop)
    }
}

fn child_url(base: &Url, segment: &str) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| StoreError::InvalidInput(format!("{base} cannot carry a path")))?
        .pop_if_empty()
        .push(segment);
    Ok(url)
}

fn transport(e: reqwest::Error) -> StoreError {
    StoreError::Backend(anyhow::Error::new(e).context("CouchDB request failed"))
}

async fn expect_success(response: Response, doc_type: &str, id: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(map_status(status, doc_type, id, &body))
}

/// Maps CouchDB status codes onto the store's error kinds.
fn map_status(status: StatusCode, doc_type: &str, id: &str, body: &str) -> StoreError {
    match status {
        StatusCode::NOT_FOUND => StoreError::not_found(doc_type, id),
        StatusCode::CONFLICT => StoreError::Conflict(format!("{doc_type} {id}: document update conflict")),
        StatusCode::BAD_REQUEST => StoreError::InvalidInput(format!("{doc_type} {id}: {body}")),
        other => StoreError::Backend(anyhow!("CouchDB answered {other} for {doc_type} {id}: {body}")),
    }
}
