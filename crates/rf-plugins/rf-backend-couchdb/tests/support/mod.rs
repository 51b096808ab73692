//! In-process stand-in for a CouchDB server: one database, revision checks
//! on `PUT`, a small Mango subset on `_find` and offset bookmarks.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};

#[derive(Default)]
pub struct FakeCouch {
    docs: Mutex<BTreeMap<String, Value>>,
    databases: Mutex<HashSet<String>>,
    /// Next N updates of existing documents answer 409
    conflicts: AtomicU32,
    pub find_calls: AtomicU32,
    next_rev: AtomicU32,
    /// `Authorization` header of the last request to `/`
    pub welcome_auth: Mutex<Option<String>>,
}

impl FakeCouch {
    pub fn inject_conflicts(&self, n: u32) {
        self.conflicts.store(n, Ordering::SeqCst);
    }

    /// Stores a raw document, bypassing revision checks.
    pub fn insert_raw(&self, id: &str, mut doc: Value) {
        doc["_id"] = json!(id);
        doc["_rev"] = json!(format!("1-raw{id}"));
        self.docs.lock().unwrap().insert(id.to_string(), doc);
    }

    pub fn doc(&self, id: &str) -> Option<Value> {
        self.docs.lock().unwrap().get(id).cloned()
    }

    pub fn has_database(&self, name: &str) -> bool {
        self.databases.lock().unwrap().contains(name)
    }
}

pub async fn spawn() -> (String, Arc<FakeCouch>) {
    let state = Arc::new(FakeCouch::default());
    let app = Router::new()
        .route("/", get(welcome))
        .route("/{db}", put(create_db))
        .route("/{db}/_find", post(find))
        .route("/{db}/_index", post(create_index))
        .route("/{db}/{id}", get(get_doc).put(put_doc))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), state)
}

fn error(status: StatusCode, reason: &str) -> Response {
    (status, Json(json!({ "error": reason }))).into_response()
}

async fn welcome(State(couch): State<Arc<FakeCouch>>, headers: HeaderMap) -> Json<Value> {
    *couch.welcome_auth.lock().unwrap() = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    Json(json!({ "couchdb": "Welcome", "version": "fake" }))
}

async fn create_db(State(couch): State<Arc<FakeCouch>>, Path(db): Path<String>) -> Response {
    if couch.databases.lock().unwrap().insert(db) {
        (StatusCode::CREATED, Json(json!({ "ok": true }))).into_response()
    } else {
        error(StatusCode::PRECONDITION_FAILED, "file_exists")
    }
}

async fn create_index(Json(_body): Json<Value>) -> Json<Value> {
    Json(json!({ "result": "created" }))
}

async fn get_doc(
    State(couch): State<Arc<FakeCouch>>,
    Path((_db, id)): Path<(String, String)>,
) -> Response {
    match couch.doc(&id) {
        Some(doc) => Json(doc).into_response(),
        None => error(StatusCode::NOT_FOUND, "not_found"),
    }
}

async fn put_doc(
    State(couch): State<Arc<FakeCouch>>,
    Path((_db, id)): Path<(String, String)>,
    Json(mut body): Json<Value>,
) -> Response {
    let mut docs = couch.docs.lock().unwrap();
    let sent_rev = body.get("_rev").cloned();

    let generation = match docs.get(&id) {
        Some(existing) => {
            let injected = couch
                .conflicts
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if injected || sent_rev.as_ref() != existing.get("_rev") {
                return error(StatusCode::CONFLICT, "conflict");
            }
            generation_of(existing) + 1
        }
        None if sent_rev.is_some() => return error(StatusCode::CONFLICT, "conflict"),
        None => 1,
    };

    let n = couch.next_rev.fetch_add(1, Ordering::SeqCst);
    let rev = format!("{generation}-fake{n}");
    body["_id"] = json!(id);
    body["_rev"] = json!(rev);
    docs.insert(id.clone(), body);

    (StatusCode::CREATED, Json(json!({ "ok": true, "id": id, "rev": rev }))).into_response()
}

fn generation_of(doc: &Value) -> u64 {
    doc.get("_rev")
        .and_then(Value::as_str)
        .and_then(|rev| rev.split('-').next())
        .and_then(|g| g.parse().ok())
        .unwrap_or(0)
}

async fn find(State(couch): State<Arc<FakeCouch>>, Json(body): Json<Value>) -> Json<Value> {
    couch.find_calls.fetch_add(1, Ordering::SeqCst);
    let selector = body["selector"].as_object().cloned().unwrap_or_default();

    let mut matched: Vec<Value> = couch
        .docs
        .lock()
        .unwrap()
        .values()
        .filter(|doc| selector.iter().all(|(field, cond)| matches(doc.get(field), cond)))
        .cloned()
        .collect();

    if body.get("sort").is_some() {
        matched.sort_by(|a, b| {
            let key = |d: &Value| d["lastActivity"].as_str().unwrap_or_default().to_string();
            key(b).cmp(&key(a))
        });
    }

    let offset: usize = body["bookmark"].as_str().and_then(|b| b.parse().ok()).unwrap_or(0);
    let limit = body["limit"].as_u64().unwrap_or(25) as usize;
    let page: Vec<Value> = matched.into_iter().skip(offset).take(limit).collect();
    let bookmark = (offset + page.len()).to_string();

    Json(json!({ "docs": page, "bookmark": bookmark }))
}

fn matches(value: Option<&Value>, cond: &Value) -> bool {
    if let Some(elem) = cond.get("$elemMatch") {
        let wanted = &elem["$eq"];
        return value
            .and_then(Value::as_array)
            .is_some_and(|items| items.iter().any(|item| item == wanted));
    }
    if cond.get("$gt").is_some() {
        return value.is_some_and(|v| !v.is_null());
    }
    value == Some(cond)
}
