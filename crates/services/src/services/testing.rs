//! In-memory collaborators for store, form and list tests.

use std::{
    collections::{HashMap, VecDeque},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use models::EntityKind;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::sync::Semaphore;

use super::{
    gateway::{ApiError, Gateway},
    media::{ImageUpload, MediaError, MediaHost},
};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Fetch(EntityKind),
    Create(EntityKind, Value),
    CreateBatch(EntityKind, Vec<Value>),
    Update(EntityKind, String, Value),
    Delete(EntityKind, String),
}

impl Call {
    pub fn is_write(&self) -> bool {
        !matches!(self, Call::Fetch(_))
    }
}

/// A backend that keeps collections in memory and records every call.
#[derive(Default)]
pub struct MemoryGateway {
    collections: Mutex<HashMap<EntityKind, Vec<Value>>>,
    calls: Mutex<Vec<Call>>,
    fetch_delays: Mutex<VecDeque<Duration>>,
    fail_next_fetch: Mutex<Option<ApiError>>,
    fail_next_write: Mutex<Option<ApiError>>,
    fail_next_delete: Mutex<Option<ApiError>>,
    next_id: AtomicU64,
}

impl MemoryGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seed(&self, kind: EntityKind, records: Vec<Value>) {
        self.collections.lock().insert(kind, records);
    }

    pub fn records(&self, kind: EntityKind) -> Vec<Value> {
        self.collections
            .lock()
            .get(&kind)
            .cloned()
            .unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn writes(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_write).collect()
    }

    pub fn fetches(&self, kind: EntityKind) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| **call == Call::Fetch(kind))
            .count()
    }

    /// Delay the next fetches, in call order. The snapshot is taken before
    /// the delay so a slow fetch returns older data.
    pub fn delay_fetches(&self, delays: impl IntoIterator<Item = Duration>) {
        self.fetch_delays.lock().extend(delays);
    }

    pub fn fail_next_fetch(&self, error: ApiError) {
        *self.fail_next_fetch.lock() = Some(error);
    }

    pub fn fail_next_write(&self, error: ApiError) {
        *self.fail_next_write.lock() = Some(error);
    }

    pub fn fail_next_delete(&self, error: ApiError) {
        *self.fail_next_delete.lock() = Some(error);
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }

    fn assign_id(&self, mut body: Value) -> Value {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(fields) = body.as_object_mut() {
            fields.insert("_id".to_string(), json!(format!("gen-{id}")));
        }
        body
    }
}

#[async_trait]
impl Gateway for MemoryGateway {
    async fn fetch(&self, kind: EntityKind) -> Result<Vec<Value>, ApiError> {
        self.record(Call::Fetch(kind));
        if let Some(error) = self.fail_next_fetch.lock().take() {
            return Err(error);
        }
        let snapshot = self.records(kind);
        let delay = self.fetch_delays.lock().pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(snapshot)
    }

    async fn create(&self, kind: EntityKind, body: Value) -> Result<(), ApiError> {
        self.record(Call::Create(kind, body.clone()));
        if let Some(error) = self.fail_next_write.lock().take() {
            return Err(error);
        }
        let body = self.assign_id(body);
        self.collections.lock().entry(kind).or_default().push(body);
        Ok(())
    }

    async fn create_batch(&self, kind: EntityKind, bodies: Vec<Value>) -> Result<(), ApiError> {
        self.record(Call::CreateBatch(kind, bodies.clone()));
        if let Some(error) = self.fail_next_write.lock().take() {
            return Err(error);
        }
        let bodies: Vec<_> = bodies.into_iter().map(|b| self.assign_id(b)).collect();
        self.collections
            .lock()
            .entry(kind)
            .or_default()
            .extend(bodies);
        Ok(())
    }

    async fn update(&self, kind: EntityKind, id: &str, body: Value) -> Result<(), ApiError> {
        self.record(Call::Update(kind, id.to_string(), body.clone()));
        if let Some(error) = self.fail_next_write.lock().take() {
            return Err(error);
        }
        let mut collections = self.collections.lock();
        let records = collections.entry(kind).or_default();
        match records.iter_mut().find(|r| r["_id"] == id) {
            Some(record) => {
                *record = body;
                Ok(())
            }
            None => Err(ApiError::Http {
                status: 404,
                body: format!("no {kind} {id}"),
            }),
        }
    }

    async fn delete(&self, kind: EntityKind, id: &str) -> Result<(), ApiError> {
        self.record(Call::Delete(kind, id.to_string()));
        if let Some(error) = self.fail_next_delete.lock().take() {
            return Err(error);
        }
        let mut collections = self.collections.lock();
        let records = collections.entry(kind).or_default();
        let before = records.len();
        records.retain(|r| r["_id"] != id);
        if records.len() == before {
            return Err(ApiError::Http {
                status: 404,
                body: format!("no {kind} {id}"),
            });
        }
        Ok(())
    }
}

/// Media host that answers with a predictable URL. Files named `fail*`
/// are refused. With a gate, each upload waits for a permit.
#[derive(Default)]
pub struct FakeMedia {
    gate: Option<Arc<Semaphore>>,
    uploads: Mutex<Vec<String>>,
}

impl FakeMedia {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn gated() -> (Arc<Self>, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let media = Arc::new(Self {
            gate: Some(gate.clone()),
            uploads: Mutex::default(),
        });
        (media, gate)
    }

    pub fn uploads(&self) -> Vec<String> {
        self.uploads.lock().clone()
    }
}

#[async_trait]
impl MediaHost for FakeMedia {
    async fn upload(&self, image: ImageUpload) -> Result<String, MediaError> {
        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|e| MediaError::Transport(e.to_string()))?
                .forget();
        }
        self.uploads.lock().push(image.file_name.clone());
        if image.file_name.starts_with("fail") {
            return Err(MediaError::Http {
                status: 400,
                body: "refused".to_string(),
            });
        }
        Ok(format!("https://media.test/{}", image.file_name))
    }
}
