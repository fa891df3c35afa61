//! In-process mock of the remote document store and upstream feeds.
//!
//! Served with axum on an ephemeral localhost port. Tests inspect and
//! mutate the shared state directly, e.g. to make a document vanish.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::{Multipart, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

pub const API_KEY: &str = "test-key";
pub const CHATBOT_ID: &str = "bot-1";
pub const PROJECT_ID: &str = "prj-1";

#[derive(Debug, Clone)]
pub struct StoredDoc {
    pub id: String,
    pub filename: String,
    pub content: Vec<u8>,
    pub content_type: Option<String>,
    pub project_id: String,
    pub metadata: Value,
}

#[derive(Default)]
pub struct MockState {
    pub docs: Vec<StoredDoc>,
    pub creates: usize,
    pub updates: usize,
    pub rejected: usize,
    pub chatbot: Value,
    /// `getSchedule` pages keyed by incoming page token (`None` = newest).
    pub schedule_pages: HashMap<Option<String>, Value>,
    pub schedule_tokens: Vec<Option<String>>,
    pub activities: Value,
    pub feed_keys: Vec<Option<String>>,
}

impl MockState {
    pub fn doc(&self, id: &str) -> Option<&StoredDoc> {
        self.docs.iter().find(|d| d.id == id)
    }

    pub fn forget(&mut self, id: &str) {
        self.docs.retain(|d| d.id != id);
    }
}

pub type Shared = Arc<Mutex<MockState>>;

pub struct MockServer {
    pub addr: SocketAddr,
    pub state: Shared,
}

impl MockServer {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

pub async fn start() -> MockServer {
    let state: Shared = Arc::new(Mutex::new(MockState {
        chatbot: json!({ "id": CHATBOT_ID, "project_id": PROJECT_ID, "warm_up_messages": [] }),
        activities: json!({ "data": [] }),
        ..Default::default()
    }));

    let app = Router::new()
        .route(
            "/chatbot/{bot}/document",
            axum::routing::post(create_doc),
        )
        .route("/chatbot/{bot}/document/list", get(list_docs))
        .route(
            "/chatbot/{bot}/document/{id}",
            get(fetch_doc).put(update_doc),
        )
        .route("/chatbot/{bot}", get(get_chatbot).put(put_chatbot))
        .route("/getSchedule", get(get_schedule))
        .route("/thingstodo", get(things_to_do))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockServer { addr, state }
}

fn authorized(headers: &HeaderMap) -> bool {
    headers.get("x-api-key").and_then(|v| v.to_str().ok()) == Some(API_KEY)
}

fn unauthorized(state: &Shared) -> Response {
    state.lock().unwrap().rejected += 1;
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": "bad api key" }))).into_response()
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "document not found" }))).into_response()
}

struct Upload {
    filename: String,
    content: Vec<u8>,
    content_type: Option<String>,
    project_id: String,
    metadata: Value,
}

async fn read_upload(mut multipart: Multipart) -> Result<Upload, Response> {
    let mut upload = Upload {
        filename: String::new(),
        content: Vec::new(),
        content_type: None,
        project_id: String::new(),
        metadata: Value::Null,
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()).into_response())?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                upload.filename = field.file_name().unwrap_or_default().to_string();
                upload.content_type = field.content_type().map(str::to_string);
                upload.content = field.bytes().await.unwrap().to_vec();
            }
            "project_id" => upload.project_id = field.text().await.unwrap(),
            "metadata" => {
                let raw = field.text().await.unwrap();
                upload.metadata = serde_json::from_str(&raw)
                    .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()).into_response())?;
            }
            _ => {}
        }
    }

    if upload.filename.is_empty() || upload.project_id.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "missing file or project_id").into_response());
    }
    Ok(upload)
}

async fn create_doc(
    State(state): State<Shared>,
    Path(_bot): Path<String>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Response {
    if !authorized(&headers) {
        return unauthorized(&state);
    }
    let upload = match read_upload(multipart).await {
        Ok(u) => u,
        Err(resp) => return resp,
    };

    let id = uuid::Uuid::new_v4().to_string();
    let mut st = state.lock().unwrap();
    st.creates += 1;
    st.docs.push(StoredDoc {
        id: id.clone(),
        filename: upload.filename,
        content: upload.content,
        content_type: upload.content_type,
        project_id: upload.project_id,
        metadata: upload.metadata,
    });
    Json(json!({ "body": { "id": id } })).into_response()
}

async fn update_doc(
    State(state): State<Shared>,
    Path((_bot, id)): Path<(String, String)>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Response {
    if !authorized(&headers) {
        return unauthorized(&state);
    }
    let upload = match read_upload(multipart).await {
        Ok(u) => u,
        Err(resp) => return resp,
    };

    let mut st = state.lock().unwrap();
    st.updates += 1;
    let Some(doc) = st.docs.iter_mut().find(|d| d.id == id) else {
        return not_found();
    };
    doc.filename = upload.filename;
    doc.content = upload.content;
    doc.content_type = upload.content_type;
    doc.metadata = upload.metadata;
    Json(json!({ "body": { "id": id } })).into_response()
}

#[derive(Deserialize)]
struct ProjectQuery {
    project_id: String,
}

async fn fetch_doc(
    State(state): State<Shared>,
    Path((_bot, id)): Path<(String, String)>,
    Query(q): Query<ProjectQuery>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&headers) {
        return unauthorized(&state);
    }
    assert_eq!(q.project_id, PROJECT_ID);
    let st = state.lock().unwrap();
    match st.doc(&id) {
        Some(doc) => Json(json!({
            "body": {
                "id": doc.id,
                "filename": doc.filename,
                "metadata": doc.metadata,
                "content": String::from_utf8_lossy(&doc.content),
            }
        }))
        .into_response(),
        None => not_found(),
    }
}

#[derive(Deserialize)]
struct ListQuery {
    project_id: String,
    page: usize,
    number: usize,
}

async fn list_docs(
    State(state): State<Shared>,
    Path(_bot): Path<String>,
    Query(q): Query<ListQuery>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&headers) {
        return unauthorized(&state);
    }
    assert_eq!(q.project_id, PROJECT_ID);
    let st = state.lock().unwrap();
    let page: Vec<Value> = st
        .docs
        .iter()
        .skip(q.page.saturating_sub(1) * q.number)
        .take(q.number)
        .map(|d| json!({ "id": d.id, "filename": d.filename }))
        .collect();
    Json(json!({ "body": page })).into_response()
}

async fn get_chatbot(
    State(state): State<Shared>,
    Path(_bot): Path<String>,
    Query(q): Query<ProjectQuery>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&headers) {
        return unauthorized(&state);
    }
    assert_eq!(q.project_id, PROJECT_ID);
    let st = state.lock().unwrap();
    Json(json!({ "body": st.chatbot })).into_response()
}

async fn put_chatbot(
    State(state): State<Shared>,
    Path(_bot): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized(&state);
    }
    let mut st = state.lock().unwrap();
    if let Some(messages) = body.get("warm_up_messages") {
        st.chatbot["warm_up_messages"] = messages.clone();
    }
    Json(json!({ "body": st.chatbot })).into_response()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleQuery {
    hl: String,
    league_id: String,
    page_token: Option<String>,
}

async fn get_schedule(
    State(state): State<Shared>,
    Query(q): Query<ScheduleQuery>,
    headers: HeaderMap,
) -> Response {
    assert_eq!(q.hl, "en-US");
    assert!(!q.league_id.is_empty());
    let mut st = state.lock().unwrap();
    st.feed_keys.push(
        headers
            .get("x-api-key")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    );
    st.schedule_tokens.push(q.page_token.clone());
    match st.schedule_pages.get(&q.page_token) {
        Some(page) => Json(page.clone()).into_response(),
        None => (StatusCode::BAD_REQUEST, "unknown page token").into_response(),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ParkQuery {
    park_code: String,
}

async fn things_to_do(
    State(state): State<Shared>,
    Query(q): Query<ParkQuery>,
    headers: HeaderMap,
) -> Response {
    assert!(!q.park_code.is_empty());
    let mut st = state.lock().unwrap();
    st.feed_keys.push(
        headers
            .get("x-api-key")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    );
    Json(st.activities.clone()).into_response()
}

/// One `getSchedule` response page.
pub fn schedule_page(events: Vec<Value>, older: Option<&str>) -> Value {
    let pages = match older {
        Some(token) => json!({ "older": token, "newer": null }),
        None => json!({ "older": null, "newer": "n" }),
    };
    json!({ "data": { "schedule": { "events": events, "pages": pages } } })
}

pub fn schedule_event(id: &str, start: &str, state: &str, team1_outcome: Option<&str>) -> Value {
    let result = |outcome: Option<&str>, wins: u32| match outcome {
        Some(o) => json!({ "outcome": o, "gameWins": wins }),
        None => Value::Null,
    };
    let (w1, w2, o2) = match team1_outcome {
        Some("win") => (2, 1, Some("loss")),
        Some(_) => (1, 2, Some("win")),
        None => (0, 0, None),
    };
    json!({
        "startTime": start,
        "state": state,
        "type": "match",
        "blockName": "Swiss",
        "match": {
            "id": id,
            "teams": [
                { "name": "Gen.G", "code": "GEN", "result": result(team1_outcome, w1) },
                { "name": "T1", "code": "T1", "result": result(o2, w2) }
            ]
        }
    })
}
