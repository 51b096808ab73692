//! Mango selectors for the list queries.

use rf_core::{CommentDoc, CommentId, Document, PostDoc, PostId, PostListQuery};
use serde_json::{json, Map, Value};

/// `_find` body for a post listing. The limit is added by the caller.
pub fn post_query(query: &PostListQuery) -> Value {
    let mut selector = Map::new();
    selector.insert("docType".into(), json!(PostDoc::DOC_TYPE));
    if let Some(author) = &query.author {
        selector.insert("authorId".into(), json!(author.as_str()));
    }
    if let Some(tag) = &query.tag {
        selector.insert("tags".into(), json!({ "$elemMatch": { "$eq": tag } }));
    }

    if !query.recent_only {
        return json!({ "selector": selector });
    }

    // Sorting needs the sort field in the selector to pick the index.
    selector.insert("lastActivity".into(), json!({ "$gt": null }));
    json!({
        "selector": selector,
        "sort": [{ "docType": "desc" }, { "lastActivity": "desc" }],
    })
}

pub fn comment_selector(post_id: &PostId) -> Value {
    json!({ "selector": { "docType": CommentDoc::DOC_TYPE, "postId": post_id.as_str() } })
}

pub fn reply_selector(parent_id: &CommentId) -> Value {
    json!({ "selector": { "docType": CommentDoc::DOC_TYPE, "parentId": parent_id.as_str() } })
}
