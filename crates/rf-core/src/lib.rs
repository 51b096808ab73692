//! rusty-forum/crates/rf-core/src/lib.rs
//!
//! The data-access layer of Rusty-Forum: domain models, the backend document
//! model, the ports every storage plugin implements, and the `Store` that
//! handlers call.

pub mod documents;
pub mod error;
pub mod ids;
pub mod models;
pub mod options;
pub mod paths;
pub mod resource;
pub mod retry;
pub mod store;
pub mod traits;
pub mod validation;

// Re-exporting for easier access in other crates
pub use documents::*;
pub use error::*;
pub use ids::*;
pub use models::*;
pub use options::*;
pub use resource::*;
pub use store::Store;
pub use traits::*;
