use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, Method, StatusCode},
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};

pub const HELLO: &str = "Hello World!";

/// What `/echo` saw, returned as its JSON body.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Echo {
    pub method: String,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

/// The document served at `/json`; replaced wholesale by `PUT /json`.
pub type Doc = Arc<RwLock<Value>>;

pub fn initial_doc() -> Value {
    json!({ "weather": "sunny", "temperature": 25 })
}

pub fn app() -> Router {
    let doc: Doc = Arc::new(RwLock::new(initial_doc()));
    Router::new()
        .route("/text", get(text))
        .route("/json", get(get_json).put(put_json))
        .route("/error", get(not_found))
        .route("/malformed", get(malformed))
        .route("/status/{code}", any(status))
        .route("/echo", any(echo))
        .with_state(doc)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn text() -> &'static str {
    HELLO
}

async fn get_json(State(doc): State<Doc>) -> Json<Value> {
    Json(doc.read().await.clone())
}

async fn put_json(State(doc): State<Doc>, Json(input): Json<Value>) -> Json<Value> {
    let mut current = doc.write().await;
    *current = input;
    Json(current.clone())
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

async fn malformed() -> &'static str {
    "{\"weather\": sunny"
}

async fn status(Path(code): Path<u16>) -> (StatusCode, String) {
    match StatusCode::from_u16(code) {
        Ok(status) => (status, format!("status {code}")),
        Err(_) => (StatusCode::BAD_REQUEST, format!("invalid status {code}")),
    }
}

async fn echo(method: Method, headers: HeaderMap, body: String) -> Json<Echo> {
    let headers = headers
        .iter()
        .map(|(k, v)| {
            (
                k.as_str().to_string(),
                v.to_str().unwrap_or("(binary)").to_string(),
            )
        })
        .collect();
    Json(Echo {
        method: method.as_str().to_string(),
        headers,
        body,
    })
}
