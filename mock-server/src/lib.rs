use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, RawQuery, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::debug;
use uuid::Uuid;

/// Prefix the hosted API is served under.
pub const API_ROOT: &str = "/attask/api/v7.0";
/// Largest bulk payload the service accepts.
pub const MAX_BULK: usize = 100;
/// Largest `$$LIMIT` the service accepts.
pub const MAX_LIMIT: usize = 2000;
/// Results returned by a search without `$$LIMIT`.
pub const DEFAULT_LIMIT: usize = 100;

pub type Item = Map<String, Value>;

#[derive(Default)]
pub struct Store {
    objects: HashMap<String, Vec<Item>>,
    sessions: HashMap<String, String>,
}

pub type Db = Arc<RwLock<Store>>;

type ApiResult = Result<Json<Value>, (StatusCode, Json<Value>)>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    let api = Router::new()
        .route("/login", get(login).post(login))
        .route("/logout", get(logout))
        .route(
            "/{obj_code}",
            get(get_list).post(create).put(bulk_update).delete(bulk_delete),
        )
        .route("/{obj_code}/search", get(search))
        .route("/{obj_code}/count", get(count))
        .route(
            "/{obj_code}/{id}",
            get(get_one).put(update_one).delete(delete_one),
        )
        .with_state(db);
    Router::new().nest(API_ROOT, api)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// Query-string and form-body parameters in wire order, repeated keys kept.
struct Params(Vec<(String, String)>);

impl Params {
    fn read(query: Option<String>, body: &str) -> Self {
        let mut pairs: Vec<(String, String)> = Vec::new();
        for encoded in [query.as_deref().unwrap_or(""), body] {
            pairs.extend(url::form_urlencoded::parse(encoded.as_bytes()).into_owned());
        }
        Params(pairs)
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find_map(|(k, v)| (k == key).then_some(v.as_str()))
    }

    fn all(&self, key: &str) -> Vec<&str> {
        self.0
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    fn number(&self, key: &str) -> Result<Option<usize>, (StatusCode, Json<Value>)> {
        self.get(key)
            .map(|v| {
                v.parse()
                    .map_err(|_| fail(StatusCode::UNPROCESSABLE_ENTITY, &format!("{key} must be a number")))
            })
            .transpose()
    }

    /// Plain field filters: everything that is not a control parameter.
    fn filters(&self) -> HashMap<&str, Vec<&str>> {
        let mut out: HashMap<&str, Vec<&str>> = HashMap::new();
        for (key, value) in &self.0 {
            if is_control(key) || key.ends_with("_Mod") {
                continue;
            }
            out.entry(key.as_str()).or_default().push(value.as_str());
        }
        out
    }

    /// Fields to write on create/update.
    fn assignments(&self) -> Item {
        self.0
            .iter()
            .filter(|(k, _)| !is_control(k) && k != "ID")
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect()
    }
}

fn is_control(key: &str) -> bool {
    matches!(
        key,
        "sessionID" | "apiKey" | "fields" | "method" | "action" | "updates" | "force" | "atomic"
    ) || key.starts_with("$$")
}

fn fail(status: StatusCode, message: &str) -> (StatusCode, Json<Value>) {
    (
        status,
        Json(json!({ "error": { "class": "mock.APIException", "message": message } })),
    )
}

fn data(value: Value) -> ApiResult {
    Ok(Json(json!({ "data": value })))
}

fn authorize(store: &Store, params: &Params) -> Result<(), (StatusCode, Json<Value>)> {
    if let Some(session) = params.get("sessionID") {
        if store.sessions.contains_key(session) {
            return Ok(());
        }
        return Err(fail(StatusCode::UNAUTHORIZED, "invalid session"));
    }
    match params.get("apiKey") {
        Some(key) if !key.is_empty() => Ok(()),
        _ => Err(fail(StatusCode::UNAUTHORIZED, "authentication required")),
    }
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn matches_filters(item: &Item, filters: &HashMap<&str, Vec<&str>>) -> bool {
    filters.iter().all(|(key, allowed)| {
        item.get(*key)
            .map(|value| allowed.contains(&text(value).as_str()))
            .unwrap_or(false)
    })
}

fn new_item(obj_code: &str, fields: Item) -> Item {
    let mut item = fields;
    item.insert("ID".into(), Value::String(Uuid::new_v4().simple().to_string()));
    item.insert("objCode".into(), Value::String(obj_code.to_uppercase()));
    item
}

fn parse_updates(params: &Params) -> Result<Vec<Item>, (StatusCode, Json<Value>)> {
    let raw = params
        .get("updates")
        .ok_or_else(|| fail(StatusCode::UNPROCESSABLE_ENTITY, "updates is required"))?;
    let updates: Vec<Item> = serde_json::from_str(raw)
        .map_err(|e| fail(StatusCode::UNPROCESSABLE_ENTITY, &format!("bad updates: {e}")))?;
    if updates.len() > MAX_BULK {
        return Err(fail(
            StatusCode::UNPROCESSABLE_ENTITY,
            &format!("bulk requests are limited to {MAX_BULK} objects"),
        ));
    }
    Ok(updates)
}

async fn login(State(db): State<Db>, RawQuery(query): RawQuery, body: String) -> ApiResult {
    let params = Params::read(query, &body);
    let username = params
        .get("username")
        .ok_or_else(|| fail(StatusCode::UNPROCESSABLE_ENTITY, "username is required"))?
        .to_string();
    if params.get("password").is_none() && params.get("apiKey").is_none() {
        return Err(fail(StatusCode::UNAUTHORIZED, "password or apiKey required"));
    }
    let session = Uuid::new_v4().simple().to_string();
    db.write().await.sessions.insert(session.clone(), username.clone());
    debug!(%username, "session opened");
    data(json!({ "sessionID": session, "userID": username }))
}

async fn logout(State(db): State<Db>, RawQuery(query): RawQuery) -> ApiResult {
    let params = Params::read(query, "");
    let mut store = db.write().await;
    authorize(&store, &params)?;
    if let Some(session) = params.get("sessionID") {
        store.sessions.remove(session);
    }
    data(json!({ "success": true }))
}

async fn get_list(
    State(db): State<Db>,
    Path(obj_code): Path<String>,
    RawQuery(query): RawQuery,
) -> ApiResult {
    let params = Params::read(query, "");
    let store = db.read().await;
    authorize(&store, &params)?;
    let ids: Vec<&str> = params
        .all("ID")
        .into_iter()
        .flat_map(|v| v.split(','))
        .collect();
    let found: Vec<Value> = store
        .objects
        .get(&obj_code)
        .into_iter()
        .flatten()
        .filter(|item| item.get("ID").map(text).is_some_and(|id| ids.contains(&id.as_str())))
        .cloned()
        .map(Value::Object)
        .collect();
    data(Value::Array(found))
}

async fn create(
    State(db): State<Db>,
    Path(obj_code): Path<String>,
    RawQuery(query): RawQuery,
    body: String,
) -> ApiResult {
    let params = Params::read(query, &body);
    let mut store = db.write().await;
    authorize(&store, &params)?;
    let created: Vec<Item> = if params.get("updates").is_some() {
        parse_updates(&params)?
            .into_iter()
            .map(|fields| new_item(&obj_code, fields))
            .collect()
    } else {
        vec![new_item(&obj_code, params.assignments())]
    };
    let bulk = params.get("updates").is_some();
    store
        .objects
        .entry(obj_code)
        .or_default()
        .extend(created.iter().cloned());
    if bulk {
        data(Value::Array(created.into_iter().map(Value::Object).collect()))
    } else {
        data(created.into_iter().next().map(Value::Object).unwrap_or(Value::Null))
    }
}

async fn bulk_update(
    State(db): State<Db>,
    Path(obj_code): Path<String>,
    RawQuery(query): RawQuery,
    body: String,
) -> ApiResult {
    let params = Params::read(query, &body);
    let mut store = db.write().await;
    authorize(&store, &params)?;
    if params.get("action").is_some() {
        return data(json!({ "success": true }));
    }
    let updates = parse_updates(&params)?;
    let objects = store.objects.entry(obj_code).or_default();
    let mut updated = Vec::with_capacity(updates.len());
    for update in updates {
        let id = update.get("ID").map(text).unwrap_or_default();
        let item = objects
            .iter_mut()
            .find(|item| item.get("ID").map(text).as_deref() == Some(id.as_str()))
            .ok_or_else(|| fail(StatusCode::NOT_FOUND, &format!("no object with ID {id}")))?;
        item.extend(update);
        updated.push(Value::Object(item.clone()));
    }
    data(Value::Array(updated))
}

async fn bulk_delete(
    State(db): State<Db>,
    Path(obj_code): Path<String>,
    RawQuery(query): RawQuery,
) -> ApiResult {
    let params = Params::read(query, "");
    let mut store = db.write().await;
    authorize(&store, &params)?;
    let ids = params.all("ID");
    if ids.len() > MAX_BULK {
        return Err(fail(
            StatusCode::UNPROCESSABLE_ENTITY,
            &format!("bulk requests are limited to {MAX_BULK} objects"),
        ));
    }
    let objects = store.objects.entry(obj_code).or_default();
    objects.retain(|item| !item.get("ID").map(text).is_some_and(|id| ids.contains(&id.as_str())));
    data(json!({ "success": true }))
}

async fn search(
    State(db): State<Db>,
    Path(obj_code): Path<String>,
    RawQuery(query): RawQuery,
) -> ApiResult {
    let params = Params::read(query, "");
    let store = db.read().await;
    authorize(&store, &params)?;
    let first = params.number("$$FIRST")?.unwrap_or(0);
    let limit = params.number("$$LIMIT")?.unwrap_or(DEFAULT_LIMIT);
    if limit > MAX_LIMIT {
        return Err(fail(
            StatusCode::UNPROCESSABLE_ENTITY,
            &format!("$$LIMIT may not exceed {MAX_LIMIT}"),
        ));
    }
    let filters = params.filters();
    let rows: Vec<Value> = store
        .objects
        .get(&obj_code)
        .into_iter()
        .flatten()
        .filter(|item| matches_filters(item, &filters))
        .skip(first)
        .take(limit)
        .cloned()
        .map(Value::Object)
        .collect();
    data(Value::Array(rows))
}

async fn count(
    State(db): State<Db>,
    Path(obj_code): Path<String>,
    RawQuery(query): RawQuery,
) -> ApiResult {
    let params = Params::read(query, "");
    let store = db.read().await;
    authorize(&store, &params)?;
    let filters = params.filters();
    let count = store
        .objects
        .get(&obj_code)
        .into_iter()
        .flatten()
        .filter(|item| matches_filters(item, &filters))
        .count();
    data(json!({ "count": count }))
}

async fn get_one(
    State(db): State<Db>,
    Path((obj_code, id)): Path<(String, String)>,
    RawQuery(query): RawQuery,
) -> ApiResult {
    let params = Params::read(query, "");
    let store = db.read().await;
    authorize(&store, &params)?;
    store
        .objects
        .get(&obj_code)
        .into_iter()
        .flatten()
        .find(|item| item.get("ID").map(text).as_deref() == Some(id.as_str()))
        .cloned()
        .map(|item| Json(json!({ "data": item })))
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, &format!("no {obj_code} with ID {id}")))
}

async fn update_one(
    State(db): State<Db>,
    Path((obj_code, id)): Path<(String, String)>,
    RawQuery(query): RawQuery,
    body: String,
) -> ApiResult {
    let params = Params::read(query, &body);
    let mut store = db.write().await;
    authorize(&store, &params)?;
    let item = store
        .objects
        .entry(obj_code.clone())
        .or_default()
        .iter_mut()
        .find(|item| item.get("ID").map(text).as_deref() == Some(id.as_str()))
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, &format!("no {obj_code} with ID {id}")))?;
    if params.get("action").is_some() {
        return data(json!({ "success": true }));
    }
    item.extend(params.assignments());
    data(Value::Object(item.clone()))
}

async fn delete_one(
    State(db): State<Db>,
    Path((obj_code, id)): Path<(String, String)>,
    RawQuery(query): RawQuery,
) -> ApiResult {
    let params = Params::read(query, "");
    let mut store = db.write().await;
    authorize(&store, &params)?;
    let objects = store.objects.entry(obj_code.clone()).or_default();
    let before = objects.len();
    objects.retain(|item| item.get("ID").map(text).as_deref() != Some(id.as_str()));
    if objects.len() == before {
        return Err(fail(StatusCode::NOT_FOUND, &format!("no {obj_code} with ID {id}")));
    }
    data(json!({ "success": true }))
}
