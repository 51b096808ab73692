//! # StoreError
//!
//! Centralized error handling for the forum data-access layer.
//! Backend failures are mapped onto these kinds before they cross the
//! `Store` boundary, so callers can match on them directly.

use thiserror::Error;

/// The primary error type for all rf-core operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Referenced document is absent (e.g., User, Post, Vote)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// Caller passed an empty or malformed required field
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Duplicate ID on create, or optimistic-concurrency retries exhausted
    #[error("conflict: {0}")]
    Conflict(String),

    /// Registration-specific remap of a user document conflict
    #[error("user already exists: {0}")]
    UserExists(String),

    /// Infrastructure failure (e.g., database unreachable, undecodable document)
    #[error("backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

impl StoreError {
    pub fn not_found(kind: &str, id: impl Into<String>) -> Self {
        StoreError::NotFound(kind.to_string(), id.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(..))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }
}

/// A specialized Result type for Rusty-Forum storage logic.
pub type Result<T> = std::result::Result<T, StoreError>;
