use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD as B64, Engine};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

/// Header every client must send alongside its credentials.
pub const CLIENT_HEADER: &str = "x-swu-api-client";

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Version {
    pub id: String,
    pub name: String,
    pub created: i64,
    pub html: String,
    pub text: String,
    pub subject: String,
    pub published: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub name: String,
    pub created: i64,
    pub tags: Vec<String>,
    pub versions: Vec<Version>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Recipient {
    pub address: String,
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SendRequest {
    pub email_id: String,
    pub recipient: Option<Recipient>,
    pub version_name: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ActivateRequest {
    pub recipient: Option<Recipient>,
    pub locale: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Log {
    pub object: String,
    pub id: String,
    pub created: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    pub recipient_name: String,
    pub recipient_address: String,
    pub status: String,
    pub email_id: String,
    pub email_name: String,
    pub email_version: String,
    pub events_url: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LogFilter {
    pub count: usize,
    pub offset: usize,
    pub created_gt: Option<i64>,
    pub created_gte: Option<i64>,
    pub created_lt: Option<i64>,
    pub created_lte: Option<i64>,
}

impl LogFilter {
    fn matches(&self, log: &Log) -> bool {
        self.created_gt.map_or(true, |t| log.created > t)
            && self.created_gte.map_or(true, |t| log.created >= t)
            && self.created_lt.map_or(true, |t| log.created < t)
            && self.created_lte.map_or(true, |t| log.created <= t)
    }
}

#[derive(Debug, Deserialize)]
pub struct ResendRequest {
    pub log_id: String,
}

/// Recipients enrolled through drip campaign activation.
#[derive(Clone, Debug, Serialize)]
pub struct Activation {
    pub campaign_id: String,
    pub address: String,
    pub locale: String,
}

#[derive(Debug, Default)]
pub struct Store {
    pub templates: Vec<Template>,
    pub logs: Vec<Log>,
    pub activations: Vec<Activation>,
}

pub type Db = Arc<RwLock<Store>>;

type ApiResult<T> = Result<T, (StatusCode, String)>;

pub fn app() -> Router {
    app_with_db(Db::default())
}

/// Router over shared state, so tests can inspect what the handlers stored.
pub fn app_with_db(db: Db) -> Router {
    let api = Router::new()
        .route("/templates", get(list_templates).post(create_template))
        .route("/templates/{id}", get(get_template))
        .route("/templates/{id}/versions", post(create_version))
        .route(
            "/templates/{id}/versions/{version}",
            get(get_version).put(update_version),
        )
        .route("/send", post(send))
        .route("/drip_campaigns/{id}/activate", post(activate_drip_campaign))
        .route("/logs", get(list_logs))
        .route("/logs/{id}", get(get_log))
        .route("/logs/{id}/events", get(get_log_events))
        .route("/resend", post(resend))
        .route_layer(middleware::from_fn(require_auth))
        .with_state(db);

    Router::new()
        .route("/templates", get(legacy_templates))
        .nest("/api/v1", api)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

fn new_id(prefix: &str) -> String {
    format!("{prefix}_{}", Uuid::new_v4().simple())
}

fn not_found(what: &str, id: &str) -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, format!("{what} {id} not found"))
}

/// Accepts `Basic base64(key:)` with a non-empty key plus the client header.
async fn require_auth(req: Request, next: Next) -> Response {
    let key = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Basic "))
        .and_then(|encoded| B64.decode(encoded).ok())
        .and_then(|decoded| String::from_utf8(decoded).ok())
        .and_then(|credentials| {
            credentials
                .split_once(':')
                .map(|(user, _)| user.to_string())
        })
        .filter(|user| !user.is_empty());

    if key.is_none() {
        debug!(path = %req.uri().path(), "rejected request without api key");
        return (StatusCode::UNAUTHORIZED, "missing or invalid api key").into_response();
    }
    if !req.headers().contains_key(CLIENT_HEADER) {
        return (StatusCode::UNAUTHORIZED, "missing client header").into_response();
    }
    next.run(req).await
}

async fn legacy_templates() -> Redirect {
    Redirect::permanent("/api/v1/templates")
}

async fn list_templates(State(db): State<Db>) -> Json<Vec<Template>> {
    Json(db.read().await.templates.clone())
}

async fn create_template(
    State(db): State<Db>,
    Json(mut version): Json<Version>,
) -> ApiResult<(StatusCode, Json<Template>)> {
    if version.name.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "name is required".to_string()));
    }
    let created = now();
    version.id = new_id("ver");
    version.created = created;
    let template = Template {
        id: new_id("tem"),
        name: version.name.clone(),
        created,
        tags: Vec::new(),
        versions: vec![version],
    };
    db.write().await.templates.push(template.clone());
    Ok((StatusCode::CREATED, Json(template)))
}

async fn get_template(State(db): State<Db>, Path(id): Path<String>) -> ApiResult<Json<Template>> {
    let store = db.read().await;
    store
        .templates
        .iter()
        .find(|t| t.id == id)
        .cloned()
        .map(Json)
        .ok_or_else(|| not_found("template", &id))
}

async fn create_version(
    State(db): State<Db>,
    Path(id): Path<String>,
    Json(mut version): Json<Version>,
) -> ApiResult<Json<Template>> {
    let mut store = db.write().await;
    let template = store
        .templates
        .iter_mut()
        .find(|t| t.id == id)
        .ok_or_else(|| not_found("template", &id))?;
    version.id = new_id("ver");
    version.created = now();
    template.versions.push(version);
    Ok(Json(template.clone()))
}

async fn get_version(
    State(db): State<Db>,
    Path((id, version)): Path<(String, String)>,
) -> ApiResult<Json<Version>> {
    let store = db.read().await;
    store
        .templates
        .iter()
        .find(|t| t.id == id)
        .ok_or_else(|| not_found("template", &id))?
        .versions
        .iter()
        .find(|v| v.id == version)
        .cloned()
        .map(Json)
        .ok_or_else(|| not_found("version", &version))
}

async fn update_version(
    State(db): State<Db>,
    Path((id, version)): Path<(String, String)>,
    Json(input): Json<Version>,
) -> ApiResult<Json<Version>> {
    let mut store = db.write().await;
    let existing = store
        .templates
        .iter_mut()
        .find(|t| t.id == id)
        .ok_or_else(|| not_found("template", &id))?
        .versions
        .iter_mut()
        .find(|v| v.id == version)
        .ok_or_else(|| not_found("version", &version))?;

    for (field, value) in [
        (&mut existing.name, input.name),
        (&mut existing.html, input.html),
        (&mut existing.text, input.text),
        (&mut existing.subject, input.subject),
    ] {
        if !value.is_empty() {
            *field = value;
        }
    }
    existing.published = input.published;
    Ok(Json(existing.clone()))
}

async fn send(
    State(db): State<Db>,
    Json(input): Json<SendRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let recipient = input
        .recipient
        .filter(|r| !r.address.is_empty())
        .ok_or((StatusCode::BAD_REQUEST, "recipient address is required".to_string()))?;

    let mut store = db.write().await;
    let template = store
        .templates
        .iter()
        .find(|t| t.id == input.email_id)
        .ok_or((StatusCode::BAD_REQUEST, format!("email_id {} not found", input.email_id)))?;
    let version_name = if input.version_name.is_empty() {
        template.versions.first().map(|v| v.name.clone()).unwrap_or_default()
    } else {
        input.version_name
    };

    let id = new_id("log");
    let log = Log {
        object: "log".to_string(),
        id: id.clone(),
        created: now(),
        kind: "sent".to_string(),
        message: "Message accepted for delivery".to_string(),
        recipient_name: recipient.name,
        recipient_address: recipient.address,
        status: "sent".to_string(),
        email_id: template.id.clone(),
        email_name: template.name.clone(),
        email_version: version_name.clone(),
        events_url: format!("/api/v1/logs/{id}/events"),
    };
    let response = serde_json::json!({
        "success": true,
        "status": "OK",
        "receipt_id": id,
        "email": {"name": log.email_name, "version_name": version_name},
    });
    info!(log_id = %log.id, email_id = %log.email_id, "email accepted");
    store.logs.push(log);
    Ok(Json(response))
}

async fn activate_drip_campaign(
    State(db): State<Db>,
    Path(id): Path<String>,
    Json(input): Json<ActivateRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let recipient = input
        .recipient
        .filter(|r| !r.address.is_empty())
        .ok_or((StatusCode::BAD_REQUEST, "recipient address is required".to_string()))?;
    info!(campaign_id = %id, "drip campaign activated");
    db.write().await.activations.push(Activation {
        campaign_id: id.clone(),
        address: recipient.address.clone(),
        locale: input.locale,
    });
    Ok(Json(serde_json::json!({
        "success": true,
        "status": "OK",
        "drip_campaign": {"id": id},
        "recipient_address": recipient.address,
    })))
}

async fn list_logs(State(db): State<Db>, Query(filter): Query<LogFilter>) -> Json<Vec<Log>> {
    let store = db.read().await;
    let count = if filter.count == 0 { usize::MAX } else { filter.count };
    let logs = store
        .logs
        .iter()
        .filter(|log| filter.matches(log))
        .skip(filter.offset)
        .take(count)
        .cloned()
        .collect();
    Json(logs)
}

async fn get_log(State(db): State<Db>, Path(id): Path<String>) -> ApiResult<Json<Log>> {
    let store = db.read().await;
    store
        .logs
        .iter()
        .find(|l| l.id == id)
        .cloned()
        .map(Json)
        .ok_or_else(|| not_found("log", &id))
}

async fn get_log_events(
    State(db): State<Db>,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let store = db.read().await;
    let log = store
        .logs
        .iter()
        .find(|l| l.id == id)
        .ok_or_else(|| not_found("log", &id))?;
    Ok(Json(serde_json::json!({
        "object": "event",
        "created": log.created,
        "type": log.kind,
        "message": log.message,
    })))
}

async fn resend(
    State(db): State<Db>,
    Json(input): Json<ResendRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let store = db.read().await;
    let log = store
        .logs
        .iter()
        .find(|l| l.id == input.log_id)
        .ok_or_else(|| not_found("log", &input.log_id))?;
    Ok(Json(serde_json::json!({
        "success": true,
        "status": "OK",
        "log_id": log.id,
        "email": {"name": log.email_name, "version_name": log.email_version},
    })))
}
