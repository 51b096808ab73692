//! # Rusty-Forum Binary
//!
//! Assembles the `Store` over the backend selected in the settings and runs
//! one maintenance command against it.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use rf_auth_simple::{Accounts, Argon2PasswordHasher, AuthError, SessionStore};
use rf_config::{BackendKind, CouchSettings, LogSettings, Settings};
use rf_core::{
    Backend, CommentOptions, PostOptions, Resource, ResourceRef, Store, StoreError, User, UserId,
    VoteDirection, VoteOptions,
};
use serde_json::json;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[cfg(feature = "backend-memory")]
use rf_backend_memory::MemoryBackend;

#[cfg(feature = "backend-couchdb")]
use rf_backend_couchdb::{CouchBackend, CouchConfig};

#[derive(Parser)]
#[command(name = "rusty-forum", version, about = "Forum storage maintenance")]
struct Cli {
    /// Settings file; `forum.toml` in the working directory is used if present
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the database and its indexes
    Init,
    /// Register demo users and write a post with a comment and a vote
    Seed,
    /// Print a post or user as JSON
    Show { id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let env_file = rf_config::load_env_file();
    let settings = Settings::load(cli.config.as_deref()).context("loading settings")?;
    init_tracing(&settings.log);
    match env_file {
        Ok(Some(path)) => debug!(path = %path.display(), "loaded .env"),
        Ok(None) => {}
        Err(e) => warn!(error = %e, "ignoring unreadable .env file"),
    }

    let backend = open_backend(settings.backend, settings.couchdb).await?;
    let store = Store::new(backend).with_max_retries(settings.store.max_retries);

    match cli.command {
        Command::Init => {
            store.backend().ensure_indexes().await?;
            info!("storage initialised");
        }
        Command::Seed => seed(&store).await?,
        Command::Show { id } => show(&store, &id).await?,
    }
    Ok(())
}

fn init_tracing(log: &LogSettings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.filter));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if log.json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

#[allow(unused_variables)]
async fn open_backend(kind: BackendKind, couch: CouchSettings) -> anyhow::Result<Arc<dyn Backend>> {
    match kind {
        #[cfg(feature = "backend-memory")]
        BackendKind::Memory => {
            info!("using in-memory backend; data is lost on exit");
            Ok(Arc::new(MemoryBackend::new()))
        }
        #[cfg(feature = "backend-couchdb")]
        BackendKind::CouchDb => {
            let timeout = couch.timeout();
            let mut config = CouchConfig::new(couch.url, couch.database);
            config.timeout = timeout;
            if let (Some(username), Some(password)) = (couch.username, couch.password) {
                config = config.credentials(username, password);
            }

            let backend = CouchBackend::connect(config).await.context("connecting to CouchDB")?;
            info!("connected to CouchDB");
            Ok(Arc::new(backend))
        }
        #[allow(unreachable_patterns)]
        other => bail!("backend {other:?} is not compiled into this binary"),
    }
}

async fn seed(store: &Store) -> anyhow::Result<()> {
    store.backend().ensure_indexes().await?;
    let accounts = Accounts::new(
        store.clone(),
        Arc::new(Argon2PasswordHasher::new()),
        Arc::new(SessionStore::new()),
    );

    let alice = seed_user(store, &accounts, "alice", "Alice").await?;
    let bob = seed_user(store, &accounts, "bob", "Bob").await?;

    let post = store
        .create_post(
            &alice.id,
            "Welcome to Rusty-Forum",
            "Say hello below.",
            PostOptions::default().tags(["meta"]).track_activity(),
        )
        .await?;
    store
        .add_comment(&post.id, &bob.id, "Hello!", CommentOptions::default().track_activity())
        .await?;
    store
        .set_vote(&bob.id, &ResourceRef::post(&post.id), VoteDirection::Up, VoteOptions::default())
        .await?;

    let post = store.get_post(&post.id).await?;
    println!("{}", serde_json::to_string_pretty(&post)?);
    Ok(())
}

/// Registers a demo account, reusing it when a previous seed created it.
async fn seed_user(store: &Store, accounts: &Accounts, username: &str, display_name: &str) -> anyhow::Result<User> {
    let email = format!("{username}@example.com");
    match accounts.register(&email, username, "password", display_name).await {
        Ok(user) => Ok(user),
        Err(AuthError::Store(StoreError::UserExists(_))) => {
            info!(username, "demo user already present");
            Ok(store.get_user_by_id(&UserId::new(username)).await?)
        }
        Err(e) => Err(e.into()),
    }
}

async fn show(store: &Store, id: &str) -> anyhow::Result<()> {
    let value = match store.resolve(id).await? {
        Resource::Post(post) => serde_json::to_value(&post)?,
        Resource::User(user) => json!({
            "id": user.id,
            "email": user.email,
            "displayName": user.display_name,
            "createdAt": user.created_at,
            "emailVerified": user.email_verified,
        }),
        Resource::Unsupported { kind, id } => bail!("{kind} resources cannot be shown: {id}"),
    };
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
