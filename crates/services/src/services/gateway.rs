//! Client for the dashboard's REST backend.
//!
//! Every endpoint answers with a `{ "success": bool, ... }` envelope. Reads
//! carry the collection under an entity-specific key; writes only report
//! success. The [`Gateway`] trait is the seam the store, forms and lists are
//! built on, so tests can swap the HTTP client for an in-memory backend.

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use models::{Entity, EntityKind};
use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};
use utils::response::{Envelope, EnvelopeError};

use super::config::ApiConfig;

#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("timeout")]
    Timeout,
    #[error("http {status}: {body}")]
    Http { status: u16, body: String },
    #[error("server rejected the request: {}", .message.as_deref().unwrap_or("no message"))]
    Rejected { message: Option<String> },
    #[error("malformed response: {0}")]
    Envelope(String),
    #[error("json error: {0}")]
    Serde(String),
    #[error("{0} records cannot be written from the dashboard")]
    ReadOnly(EntityKind),
}

impl ApiError {
    /// Returns true if the error is transient and a read may be retried.
    pub fn should_retry(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout => true,
            Self::Http { status, .. } => (500..=599).contains(status),
            _ => false,
        }
    }
}

impl From<EnvelopeError> for ApiError {
    fn from(e: EnvelopeError) -> Self {
        match e {
            EnvelopeError::Rejected { message } => Self::Rejected { message },
            other => Self::Envelope(other.to_string()),
        }
    }
}

/// Untyped operations against the backend, one collection per [`EntityKind`].
#[async_trait]
pub trait Gateway: Send + Sync {
    /// All records of a collection in backend order.
    async fn fetch(&self, kind: EntityKind) -> Result<Vec<Value>, ApiError>;

    async fn create(&self, kind: EntityKind, body: Value) -> Result<(), ApiError>;

    /// Create several records with one request.
    async fn create_batch(&self, kind: EntityKind, bodies: Vec<Value>) -> Result<(), ApiError>;

    async fn update(&self, kind: EntityKind, id: &str, body: Value) -> Result<(), ApiError>;

    async fn delete(&self, kind: EntityKind, id: &str) -> Result<(), ApiError>;
}

impl dyn Gateway {
    pub async fn fetch_all<T: Entity>(&self) -> Result<Vec<T>, ApiError> {
        self.fetch_where(|_: &T| true).await
    }

    /// Fetch a collection keeping only the records that satisfy `keep`.
    /// Relative order is preserved. Records that do not deserialize are
    /// logged and left out.
    pub async fn fetch_where<T, F>(&self, keep: F) -> Result<Vec<T>, ApiError>
    where
        T: Entity,
        F: Fn(&T) -> bool,
    {
        let values = self.fetch(T::KIND).await?;
        let mut records = Vec::with_capacity(values.len());
        for (index, value) in values.into_iter().enumerate() {
            match serde_json::from_value::<T>(value) {
                Ok(record) if keep(&record) => records.push(record),
                Ok(_) => {}
                Err(e) => warn!(kind = %T::KIND, index, error = %e, "skipping unreadable record"),
            }
        }
        Ok(records)
    }

    pub async fn create_entity<T: Entity>(&self, entity: &T) -> Result<(), ApiError> {
        self.create(T::KIND, to_body(entity)?).await
    }

    pub async fn create_entities<T: Entity>(&self, entities: &[T]) -> Result<(), ApiError> {
        let bodies = entities
            .iter()
            .map(to_body)
            .collect::<Result<Vec<_>, _>>()?;
        self.create_batch(T::KIND, bodies).await
    }

    pub async fn update_entity<T: Entity>(&self, id: &str, entity: &T) -> Result<(), ApiError> {
        self.update(T::KIND, id, to_body(entity)?).await
    }
}

fn to_body<T: Serialize>(entity: &T) -> Result<Value, ApiError> {
    serde_json::to_value(entity).map_err(|e| ApiError::Serde(e.to_string()))
}

/// [`Gateway`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    http: Client,
    base_url: String,
    users_base_url: String,
    backoff: ExponentialBuilder,
}

impl HttpGateway {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("sportos-admin/", env!("CARGO_PKG_VERSION")))
            .cookie_store(true)
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let backoff = ExponentialBuilder::default()
            .with_min_delay(config.retry_delay())
            .with_max_delay(config.retry_delay() * 20)
            .with_max_times(config.read_retries)
            .with_jitter();

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            users_base_url: config.users_base_url.trim_end_matches('/').to_string(),
            backoff,
        })
    }

    fn read_url(&self, kind: EntityKind) -> String {
        match kind {
            EntityKind::User => format!("{}/api/admin/get/all/users", self.users_base_url),
            _ => format!("{}/api/user/{}", self.base_url, kind.collection_path()),
        }
    }

    fn add_url(&self, kind: EntityKind) -> String {
        format!("{}/api/admin/add/{}", self.base_url, kind.resource_path())
    }

    fn add_batch_url(&self, kind: EntityKind) -> String {
        format!("{}/api/admin/add/{}", self.base_url, kind.collection_path())
    }

    fn update_url(&self, kind: EntityKind, id: &str) -> String {
        format!(
            "{}/api/admin/update/{}/{id}",
            self.base_url,
            kind.resource_path()
        )
    }

    fn delete_url(&self, kind: EntityKind, id: &str) -> String {
        let base = match kind {
            EntityKind::User => &self.users_base_url,
            _ => &self.base_url,
        };
        format!("{base}/api/admin/delete/{}/{id}", kind.resource_path())
    }

    fn writable(kind: EntityKind) -> Result<(), ApiError> {
        match kind {
            EntityKind::User => Err(ApiError::ReadOnly(kind)),
            _ => Ok(()),
        }
    }

    async fn get_envelope(&self, url: &str) -> Result<Envelope, ApiError> {
        let res = self.http.get(url).send().await.map_err(map_reqwest_error)?;
        read_envelope(res).await
    }

    /// Writes are sent once; a retried POST could create duplicates.
    async fn send_write(&self, request: RequestBuilder) -> Result<Envelope, ApiError> {
        let res = request.send().await.map_err(map_reqwest_error)?;
        read_envelope(res).await
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn fetch(&self, kind: EntityKind) -> Result<Vec<Value>, ApiError> {
        let url = self.read_url(kind);
        debug!(kind = %kind, url = %url, "fetching collection");

        let mut envelope = (|| async { self.get_envelope(&url).await })
            .retry(self.backoff)
            .when(|e: &ApiError| e.should_retry())
            .notify(|e, dur| {
                warn!(
                    kind = %kind,
                    "fetch failed, retrying after {:.2}s: {}",
                    dur.as_secs_f64(),
                    e
                )
            })
            .await?;

        let records: Vec<Value> = envelope.take(kind.collection_key())?;
        debug!(kind = %kind, count = records.len(), "fetched collection");
        Ok(records)
    }

    async fn create(&self, kind: EntityKind, body: Value) -> Result<(), ApiError> {
        Self::writable(kind)?;
        self.send_write(self.http.post(self.add_url(kind)).json(&body))
            .await?;
        info!(kind = %kind, "created record");
        Ok(())
    }

    async fn create_batch(&self, kind: EntityKind, bodies: Vec<Value>) -> Result<(), ApiError> {
        Self::writable(kind)?;
        let count = bodies.len();
        self.send_write(self.http.post(self.add_batch_url(kind)).json(&bodies))
            .await?;
        info!(kind = %kind, count, "created records");
        Ok(())
    }

    async fn update(&self, kind: EntityKind, id: &str, body: Value) -> Result<(), ApiError> {
        Self::writable(kind)?;
        self.send_write(self.http.put(self.update_url(kind, id)).json(&body))
            .await?;
        info!(kind = %kind, id, "updated record");
        Ok(())
    }

    async fn delete(&self, kind: EntityKind, id: &str) -> Result<(), ApiError> {
        self.send_write(self.http.delete(self.delete_url(kind, id)))
            .await?;
        info!(kind = %kind, id, "deleted record");
        Ok(())
    }
}

async fn read_envelope(res: Response) -> Result<Envelope, ApiError> {
    let status = res.status();
    if !status.is_success() {
        let body = res.text().await.unwrap_or_default();
        return Err(ApiError::Http {
            status: status.as_u16(),
            body,
        });
    }

    let body: Value = res
        .json()
        .await
        .map_err(|e| ApiError::Serde(e.to_string()))?;
    Ok(Envelope::parse(body)?)
}

fn map_reqwest_error(e: reqwest::Error) -> ApiError {
    if e.is_timeout() {
        ApiError::Timeout
    } else {
        ApiError::Transport(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::{
        net::SocketAddr,
        sync::{
            Arc, Mutex,
            atomic::{AtomicUsize, Ordering},
        },
    };

    use axum::{
        Json, Router,
        extract::{Path, State},
        http::StatusCode,
        response::IntoResponse,
        routing::{delete, get, post, put},
    };
    use models::{
        fixture::{Fixture, MatchStatus},
        league::League,
        user::User,
    };
    use serde_json::json;

    use super::*;

    #[derive(Clone, Default)]
    struct Backend {
        match_reads: Arc<AtomicUsize>,
        flaky_reads: Arc<AtomicUsize>,
        writes: Arc<Mutex<Vec<(String, Value)>>>,
    }

    async fn serve(router: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr
    }

    async fn backend() -> (HttpGateway, Backend) {
        let state = Backend::default();
        let router = Router::new()
            .route(
                "/api/user/matches",
                get(|State(s): State<Backend>| async move {
                    s.match_reads.fetch_add(1, Ordering::SeqCst);
                    Json(json!({
                        "success": true,
                        "matches": [
                            { "_id": "1", "status": "Live" },
                            { "_id": "2", "status": "Completed" },
                            { "_id": "3", "status": "Live" },
                            { "_id": "4", "status": "" },
                            { "_id": 5, "status": "Live" },
                            { "_id": "6", "status": "live" }
                        ]
                    }))
                }),
            )
            .route(
                "/api/user/news",
                get(|State(s): State<Backend>| async move {
                    if s.flaky_reads.fetch_add(1, Ordering::SeqCst) < 2 {
                        return (StatusCode::BAD_GATEWAY, Json(json!({}))).into_response();
                    }
                    Json(json!({ "success": true, "news": [] })).into_response()
                }),
            )
            .route(
                "/api/user/leagues",
                get(|| async { Json(json!({ "success": true, "league": [] })) }),
            )
            .route(
                "/api/user/banner",
                get(|| async { (StatusCode::NOT_FOUND, "no such route") }),
            )
            .route(
                "/api/admin/get/all/users",
                get(|| async {
                    Json(json!({
                        "success": true,
                        "users": [{ "_id": "u1", "name": "Ada", "email": "ada@example.com" }]
                    }))
                }),
            )
            .route(
                "/api/admin/add/{resource}",
                post(
                    |State(s): State<Backend>,
                     Path(resource): Path<String>,
                     Json(body): Json<Value>| async move {
                        s.writes.lock().unwrap().push((format!("POST {resource}"), body));
                        if resource == "league" {
                            return (
                                StatusCode::INTERNAL_SERVER_ERROR,
                                Json(json!({ "success": false })),
                            )
                                .into_response();
                        }
                        if resource == "trophy" {
                            return Json(json!({ "success": false, "message": "duplicate" }))
                                .into_response();
                        }
                        Json(json!({ "success": true })).into_response()
                    },
                ),
            )
            .route(
                "/api/admin/update/{resource}/{id}",
                put(
                    |State(s): State<Backend>,
                     Path((resource, id)): Path<(String, String)>,
                     Json(body): Json<Value>| async move {
                        s.writes
                            .lock()
                            .unwrap()
                            .push((format!("PUT {resource}/{id}"), body));
                        Json(json!({ "success": true }))
                    },
                ),
            )
            .route(
                "/api/admin/delete/{resource}/{id}",
                delete(
                    |State(s): State<Backend>, Path((resource, id)): Path<(String, String)>| async move {
                        s.writes
                            .lock()
                            .unwrap()
                            .push((format!("DELETE {resource}/{id}"), Value::Null));
                        Json(json!({ "success": true }))
                    },
                ),
            )
            .with_state(state.clone());

        let addr = serve(router).await;
        let config = ApiConfig {
            base_url: format!("http://{addr}/"),
            users_base_url: format!("http://{addr}"),
            timeout_secs: 5,
            read_retries: 3,
            retry_delay_ms: 1,
        };
        (HttpGateway::new(&config).unwrap(), state)
    }

    #[tokio::test]
    async fn test_filtered_fetch_keeps_order_and_status() {
        let (gateway, state) = backend().await;
        let gateway: Arc<dyn Gateway> = Arc::new(gateway);

        let live = gateway
            .fetch_where(|m: &Fixture| m.has_status(MatchStatus::Live))
            .await
            .unwrap();
        let ids: Vec<_> = live.iter().filter_map(|m| m.id.as_deref()).collect();
        assert_eq!(ids, vec!["1", "3", "6"]);

        let all = gateway.fetch_all::<Fixture>().await.unwrap();
        let ids: Vec<_> = all.iter().filter_map(|m| m.id.as_deref()).collect();
        assert_eq!(ids, vec!["1", "2", "3", "4", "6"]);
        assert_eq!(all[3].status, None);
        assert_eq!(state.match_reads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_users_come_from_the_users_deployment() {
        let (gateway, _) = backend().await;
        let gateway: Arc<dyn Gateway> = Arc::new(gateway);

        let users = gateway.fetch_all::<User>().await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].name, "Ada");
    }

    #[tokio::test]
    async fn test_transient_read_failures_are_retried() {
        let (gateway, state) = backend().await;
        let news = gateway.fetch(EntityKind::News).await.unwrap();
        assert!(news.is_empty());
        assert_eq!(state.flaky_reads.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let (gateway, _) = backend().await;
        let err = gateway.fetch(EntityKind::Banner).await.unwrap_err();
        assert!(matches!(err, ApiError::Http { status: 404, .. }));
        assert!(!err.should_retry());
    }

    #[tokio::test]
    async fn test_missing_collection_key_is_an_envelope_error() {
        let (gateway, _) = backend().await;
        let err = gateway.fetch(EntityKind::League).await.unwrap_err();
        assert!(matches!(err, ApiError::Envelope(_)), "{err:?}");
    }

    #[tokio::test]
    async fn test_writes_are_sent_once() {
        let (gateway, state) = backend().await;
        let gateway: Arc<dyn Gateway> = Arc::new(gateway);
        let league = League {
            league: "Premier".to_string(),
            logo_url: "https://img.example/pl.png".to_string(),
            ..League::blank()
        };

        let err = gateway.create_entity(&league).await.unwrap_err();
        assert!(matches!(err, ApiError::Http { status: 500, .. }));
        assert_eq!(state.writes.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_success_false_is_rejected() {
        let (gateway, _) = backend().await;
        let err = gateway
            .create(EntityKind::Trophy, json!({ "name": "Cup" }))
            .await
            .unwrap_err();
        match err {
            ApiError::Rejected { message } => assert_eq!(message.as_deref(), Some("duplicate")),
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_write_paths_and_bodies() {
        let (gateway, state) = backend().await;

        gateway
            .update(EntityKind::Banner, "b1", json!({ "imageUrl": "x" }))
            .await
            .unwrap();
        gateway
            .create_batch(
                EntityKind::StarPerformer,
                vec![json!({ "name": "A" }), json!({ "name": "B" })],
            )
            .await
            .unwrap();
        gateway.delete(EntityKind::Player, "p9").await.unwrap();
        gateway.delete(EntityKind::User, "u1").await.unwrap();

        let writes = state.writes.lock().unwrap().clone();
        let routes: Vec<_> = writes.iter().map(|(route, _)| route.as_str()).collect();
        assert_eq!(
            routes,
            vec![
                "PUT banner/b1",
                "POST starPerformers",
                "DELETE player/p9",
                "DELETE user/u1"
            ]
        );
        assert_eq!(writes[0].1, json!({ "imageUrl": "x" }));
        assert_eq!(writes[1].1.as_array().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn test_users_are_read_only() {
        let (gateway, state) = backend().await;
        let err = gateway
            .create(EntityKind::User, json!({ "name": "x" }))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::ReadOnly(EntityKind::User)));
        assert!(state.writes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_transport_error() {
        let config = ApiConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            read_retries: 0,
            retry_delay_ms: 1,
            ..ApiConfig::default()
        };
        let gateway = HttpGateway::new(&config).unwrap();
        let err = gateway.fetch(EntityKind::Sponsor).await.unwrap_err();
        assert!(err.should_retry(), "{err:?}");
    }
}
