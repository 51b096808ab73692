//! Conversions between canonical resource IDs and their public URL form.

use crate::ids::{PostId, UserId};

const CONTENT_ROOT: &str = "/u/";

/// Reduces a request path to a canonical resource ID.
///
/// `/u/posts/post:123`, `posts/post:123` and `  /u/posts/post:123  ` all
/// become `posts/post:123`.
pub fn normalize_resource_id_from_path(path: &str) -> &str {
    let path = path.trim();
    let path = path.strip_prefix('/').unwrap_or(path);
    let path = path.strip_prefix("u/").unwrap_or(path);
    path.trim_matches('/')
}

pub fn parse_post_id(uri: &str) -> PostId {
    PostId::from(normalize_resource_id_from_path(uri))
}

pub fn parse_comment_id(uri: &str) -> String {
    normalize_resource_id_from_path(uri).to_string()
}

pub fn post_url_from_id(id: &PostId) -> String {
    format!("{CONTENT_ROOT}{id}")
}

pub fn user_name_from_id(id: &UserId) -> &str {
    id.username()
}
