use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Multipart, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

/// `max-age` sent on read responses unless configured otherwise.
pub const DEFAULT_MAX_AGE: u64 = 60;

type Params = Query<HashMap<String, String>>;

#[derive(Clone, Debug, Serialize)]
pub struct Upload {
    pub name: String,
    pub slug: String,
    pub path: String,
    pub content_length: usize,
    pub content_type: String,
}

#[derive(Default)]
pub struct Store {
    next_id: i64,
    /// (content type, record)
    items: Vec<(String, Map<String, Value>)>,
    uploads: Vec<Upload>,
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RwLock<Store>>,
    /// `Cache-Control: max-age` for read responses; `None` omits the header.
    pub max_age: Option<u64>,
}

pub fn app() -> Router {
    app_with_max_age(Some(DEFAULT_MAX_AGE))
}

pub fn app_with_max_age(max_age: Option<u64>) -> Router {
    let state = AppState {
        store: Arc::new(RwLock::new(Store::default())),
        max_age,
    };
    Router::new()
        .route("/api/content", get(get_content))
        .route("/api/contents", get(list_contents))
        .route("/api/search", get(search))
        .route("/api/uploads", get(get_upload))
        .route("/api/content/create", post(create_content))
        .route("/api/content/update", post(update_content))
        .route("/api/content/delete", post(delete_content))
        .with_state(state)
}

pub async fn run_with_max_age(
    listener: TcpListener,
    max_age: Option<u64>,
) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_max_age(max_age)).await
}

fn cached(state: &AppState, data: Vec<Value>) -> Response {
    let body = Json(json!({ "data": data }));
    match state.max_age {
        Some(age) => (
            [(header::CACHE_CONTROL, format!("max-age={age}, public"))],
            body,
        )
            .into_response(),
        None => body.into_response(),
    }
}

fn written(content_type: &str, id: i64, status: &str) -> Response {
    Json(json!({ "data": [{ "id": id, "type": content_type, "status": status }] })).into_response()
}

fn param<'a>(params: &'a HashMap<String, String>, key: &str) -> Result<&'a str, StatusCode> {
    params
        .get(key)
        .map(String::as_str)
        .filter(|v| !v.is_empty())
        .ok_or(StatusCode::BAD_REQUEST)
}

fn id_param(params: &HashMap<String, String>) -> Result<i64, StatusCode> {
    param(params, "id")?.parse().map_err(|_| StatusCode::BAD_REQUEST)
}

fn number_param(params: &HashMap<String, String>, key: &str, default: i64) -> i64 {
    params
        .get(key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn record_id(record: &Map<String, Value>) -> i64 {
    record.get("id").and_then(Value::as_i64).unwrap_or_default()
}

/// Apply `count`/`offset` paging; a negative count returns everything.
fn page(records: Vec<Value>, params: &HashMap<String, String>) -> Vec<Value> {
    let count = number_param(params, "count", 10);
    let offset = number_param(params, "offset", 0).max(0) as usize;
    let rest = records.into_iter().skip(offset);
    if count < 0 {
        rest.collect()
    } else {
        rest.take(count as usize).collect()
    }
}

async fn get_content(State(state): State<AppState>, Query(params): Params) -> Response {
    let store = state.store.read().await;

    let found = if let Some(slug) = params.get("slug") {
        store
            .items
            .iter()
            .find(|(_, r)| r.get("slug").and_then(Value::as_str) == Some(slug.as_str()))
    } else {
        let (Ok(ty), Ok(id)) = (param(&params, "type"), id_param(&params)) else {
            return StatusCode::BAD_REQUEST.into_response();
        };
        store
            .items
            .iter()
            .find(|(t, r)| t == ty && record_id(r) == id)
    };

    match found {
        Some((_, record)) => cached(&state, vec![Value::Object(record.clone())]),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn list_contents(State(state): State<AppState>, Query(params): Params) -> Response {
    let Ok(ty) = param(&params, "type") else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    let store = state.store.read().await;

    let mut records: Vec<&Map<String, Value>> = store
        .items
        .iter()
        .filter(|(t, _)| t == ty)
        .map(|(_, r)| r)
        .collect();
    records.sort_by_key(|r| record_id(r));
    if !params
        .get("order")
        .is_some_and(|o| o.eq_ignore_ascii_case("ASC"))
    {
        records.reverse();
    }

    let records = records.into_iter().cloned().map(Value::Object).collect();
    cached(&state, page(records, &params))
}

async fn search(State(state): State<AppState>, Query(params): Params) -> Response {
    let Ok(ty) = param(&params, "type") else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    let needle = params.get("q").map(|q| q.to_lowercase()).unwrap_or_default();
    let store = state.store.read().await;

    let records = store
        .items
        .iter()
        .filter(|(t, _)| t == ty)
        .filter(|(_, r)| {
            r.values()
                .any(|v| v.as_str().is_some_and(|s| s.to_lowercase().contains(&needle)))
        })
        .map(|(_, r)| Value::Object(r.clone()))
        .collect();

    cached(&state, page(records, &params))
}

async fn get_upload(State(state): State<AppState>, Query(params): Params) -> Response {
    let Ok(slug) = param(&params, "slug") else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    let store = state.store.read().await;

    match store.uploads.iter().find(|u| u.slug == slug) {
        Some(upload) => cached(&state, vec![json!(upload)]),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Split `tags.3` into (`tags`, 3). Names without a numeric suffix are
/// plain fields.
fn split_index(name: &str) -> Option<(&str, usize)> {
    let (base, idx) = name.rsplit_once('.')?;
    Some((base, idx.parse().ok()?))
}

/// Read every part of the form. File parts are stored as uploads and their
/// field takes the upload's path. Indexed names are folded into arrays.
async fn read_form(
    multipart: &mut Multipart,
    uploads: &mut Vec<Upload>,
) -> Result<Map<String, Value>, StatusCode> {
    let mut plain = Map::new();
    let mut indexed: HashMap<String, Vec<(usize, String)>> = HashMap::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| StatusCode::BAD_REQUEST)?
    {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field.bytes().await.map_err(|_| StatusCode::BAD_REQUEST)?;

        let value = match file_name {
            Some(file_name) => {
                let upload = Upload {
                    slug: file_name.to_lowercase().replace(['.', ' '], "-"),
                    path: format!("/api/uploads/{file_name}"),
                    name: file_name,
                    content_length: bytes.len(),
                    content_type,
                };
                let path = upload.path.clone();
                tracing::info!(slug = %upload.slug, bytes = upload.content_length, "stored upload");
                uploads.push(upload);
                path
            }
            None => String::from_utf8_lossy(&bytes).into_owned(),
        };

        match split_index(&name) {
            Some((base, i)) => indexed.entry(base.to_string()).or_default().push((i, value)),
            None => {
                plain.insert(name, Value::String(value));
            }
        }
    }

    for (base, mut values) in indexed {
        values.sort_by_key(|(i, _)| *i);
        plain.insert(
            base,
            Value::Array(values.into_iter().map(|(_, v)| Value::String(v)).collect()),
        );
    }
    Ok(plain)
}

async fn create_content(
    State(state): State<AppState>,
    Query(params): Params,
    mut multipart: Multipart,
) -> Response {
    let Ok(ty) = param(&params, "type") else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    let mut store = state.store.write().await;
    let mut uploads = Vec::new();
    let mut record = match read_form(&mut multipart, &mut uploads).await {
        Ok(record) => record,
        Err(status) => return status.into_response(),
    };

    store.next_id += 1;
    let id = store.next_id;
    record.insert("id".to_string(), json!(id));
    record.insert("uuid".to_string(), json!(Uuid::new_v4()));
    record.insert(
        "slug".to_string(),
        json!(format!("{}-{}", ty.to_lowercase(), Uuid::new_v4())),
    );
    store.items.push((ty.to_string(), record));
    store.uploads.extend(uploads);

    tracing::info!(content_type = ty, id, "created content");
    written(ty, id, "public")
}

async fn update_content(
    State(state): State<AppState>,
    Query(params): Params,
    mut multipart: Multipart,
) -> Response {
    let (Ok(ty), Ok(id)) = (param(&params, "type"), id_param(&params)) else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    let mut store = state.store.write().await;
    let mut uploads = Vec::new();
    let changes = match read_form(&mut multipart, &mut uploads).await {
        Ok(changes) => changes,
        Err(status) => return status.into_response(),
    };

    let Some((_, record)) = store
        .items
        .iter_mut()
        .find(|(t, r)| t == ty && record_id(r) == id)
    else {
        return StatusCode::NOT_FOUND.into_response();
    };
    for (k, v) in changes {
        if !matches!(k.as_str(), "id" | "uuid" | "slug") {
            record.insert(k, v);
        }
    }
    store.uploads.extend(uploads);

    written(ty, id, "public")
}

async fn delete_content(
    State(state): State<AppState>,
    Query(params): Params,
    mut multipart: Multipart,
) -> Response {
    let (Ok(ty), Ok(id)) = (param(&params, "type"), id_param(&params)) else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    // Drain the (field-less) form body.
    let _ = read_form(&mut multipart, &mut Vec::new()).await;

    let mut store = state.store.write().await;
    let before = store.items.len();
    store.items.retain(|(t, r)| !(t == ty && record_id(r) == id));
    if store.items.len() == before {
        return StatusCode::NOT_FOUND.into_response();
    }
    written(ty, id, "deleted")
}
