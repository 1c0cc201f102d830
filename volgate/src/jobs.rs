//! In-memory volume service with async jobs.
//!
//! Stands in for the cluster's real domain handlers. Creating or deleting a
//! volume, and resyncing a device, start a job that finishes after a fixed
//! work time; callers follow it on `/queue/<id>`. The job id is the request
//! id issued by the admission pipeline.
//!
//! A finished job is handed out by one status poll. Results nobody polls
//! for are dropped once they are older than the result TTL; the purge runs
//! whenever a new job starts.

use crate::admission::{apply_admission, AdmissionController};
use crate::auth::{require_token, TokenVerifier};
use crate::protocol::{job_status_path, PENDING_HEADER};
use crate::request_id::RequestId;
use axum::extract::{Path, State};
use axum::http::header::{CONTENT_TYPE, LOCATION};
use axum::http::{HeaderValue, StatusCode};
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use bytes::Bytes;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::time::Instant;
use tracing::{debug, info};

/// A provisioned volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    pub id: String,
    pub name: String,
    /// Size in GB
    pub size: u64,
}

/// Body of `POST /volumes`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CreateVolume {
    pub size: u64,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum JobState {
    Pending,
    Done { status: StatusCode, body: String },
    Failed(String),
}

/// How long an uncollected job result is kept.
pub const DEFAULT_RESULT_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug)]
struct JobEntry {
    state: JobState,
    finished_at: Option<Instant>,
}

impl JobEntry {
    fn pending() -> Self {
        Self {
            state: JobState::Pending,
            finished_at: None,
        }
    }

    fn finished(state: JobState, at: Instant) -> Self {
        Self {
            state,
            finished_at: Some(at),
        }
    }
}

#[derive(Debug, Default)]
struct Inventory {
    jobs: HashMap<String, JobEntry>,
    volumes: HashMap<String, Volume>,
    used: u64,
}

/// Volume service state shared by the handlers.
#[derive(Debug)]
pub struct JobService {
    inventory: Mutex<Inventory>,
    work_time: Duration,
    result_ttl: Duration,
    capacity: u64,
    status_resource: String,
}

impl JobService {
    /// Creates a service with `capacity` GB of space whose jobs each take
    /// `work_time`.
    pub fn new(capacity: u64, work_time: Duration) -> Self {
        Self {
            inventory: Mutex::new(Inventory::default()),
            work_time,
            result_ttl: DEFAULT_RESULT_TTL,
            capacity,
            status_resource: crate::protocol::DEFAULT_STATUS_RESOURCE.to_string(),
        }
    }

    /// Uses a different path segment for job-status resources.
    pub fn with_status_resource(mut self, resource: impl Into<String>) -> Self {
        self.status_resource = resource.into();
        self
    }

    /// Keeps uncollected job results for `ttl` after they finish.
    pub fn with_result_ttl(mut self, ttl: Duration) -> Self {
        self.result_ttl = ttl;
        self
    }

    pub fn status_resource(&self) -> &str {
        &self.status_resource
    }

    /// Free space in GB.
    pub fn free(&self) -> u64 {
        let inventory = self.inventory.lock();
        self.capacity - inventory.used
    }

    pub fn volume(&self, id: &str) -> Option<Volume> {
        self.inventory.lock().volumes.get(id).cloned()
    }

    /// Number of jobs running or not yet collected by a final poll.
    pub fn job_count(&self) -> usize {
        self.inventory.lock().jobs.len()
    }

    /// Registers job `id` and runs `work` after the work time.
    ///
    /// Returns the `202 Accepted` response pointing at the job.
    fn start<F>(self: &Arc<Self>, id: RequestId, work: F) -> Response
    where
        F: FnOnce(&JobService) -> JobState + Send + 'static,
    {
        let key = id.to_string();
        self.purge_uncollected(Instant::now());
        self.inventory.lock().jobs.insert(key.clone(), JobEntry::pending());

        let service = Arc::clone(self);
        let job_key = key.clone();
        tokio::spawn(async move {
            tokio::time::sleep(service.work_time).await;
            let outcome = work(&service);
            debug!(job_id = %job_key, outcome = ?outcome, "Job finished");
            service
                .inventory
                .lock()
                .jobs
                .insert(job_key, JobEntry::finished(outcome, Instant::now()));
        });

        let location = job_status_path(&self.status_resource, &key);
        match HeaderValue::from_str(&location) {
            Ok(value) => (StatusCode::ACCEPTED, [(LOCATION, value)]).into_response(),
            Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "invalid job id").into_response(),
        }
    }

    fn finish_create(&self, id: &str, request: &CreateVolume) -> JobState {
        let mut inventory = self.inventory.lock();
        let free = self.capacity - inventory.used;
        if request.size > free {
            return JobState::Failed(format!(
                "no space: requested {}GB, {}GB free",
                request.size, free
            ));
        }

        let volume = Volume {
            id: id.to_string(),
            name: request
                .name
                .clone()
                .unwrap_or_else(|| format!("vol_{}", id)),
            size: request.size,
        };
        inventory.used += volume.size;
        inventory.volumes.insert(volume.id.clone(), volume.clone());

        match serde_json::to_string(&volume) {
            Ok(body) => JobState::Done {
                status: StatusCode::OK,
                body,
            },
            Err(e) => JobState::Failed(e.to_string()),
        }
    }

    fn finish_delete(&self, volume_id: &str) -> JobState {
        let mut inventory = self.inventory.lock();
        match inventory.volumes.remove(volume_id) {
            Some(volume) => {
                inventory.used -= volume.size;
                JobState::Done {
                    status: StatusCode::NO_CONTENT,
                    body: String::new(),
                }
            }
            None => JobState::Failed(format!("volume {} no longer exists", volume_id)),
        }
    }

    /// Reports a job's state; terminal states are handed out once.
    fn collect(&self, id: &str) -> Option<JobState> {
        let mut inventory = self.inventory.lock();
        match inventory.jobs.get(id)?.state {
            JobState::Pending => Some(JobState::Pending),
            _ => inventory.jobs.remove(id).map(|entry| entry.state),
        }
    }

    /// Drops finished results older than the result TTL.
    fn purge_uncollected(&self, now: Instant) -> usize {
        let mut inventory = self.inventory.lock();
        let before = inventory.jobs.len();
        let ttl = self.result_ttl;
        inventory.jobs.retain(|_, entry| match entry.finished_at {
            Some(at) => now.saturating_duration_since(at) <= ttl,
            None => true,
        });
        let purged = before - inventory.jobs.len();
        if purged > 0 {
            debug!(purged, "Dropped uncollected job results");
        }
        purged
    }
}

fn job_id(issued: Option<Extension<RequestId>>) -> RequestId {
    issued
        .map(|Extension(id)| id)
        .unwrap_or_else(RequestId::generate)
}

async fn hello() -> &'static str {
    "Hello from volgate"
}

async fn create_volume(
    State(service): State<Arc<JobService>>,
    issued: Option<Extension<RequestId>>,
    body: Bytes,
) -> Response {
    let request: CreateVolume = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            return (StatusCode::BAD_REQUEST, format!("invalid volume request: {}", e))
                .into_response()
        }
    };
    if request.size == 0 {
        return (StatusCode::BAD_REQUEST, "size must be positive").into_response();
    }

    let id = job_id(issued);
    let volume_id = id.to_string();
    service.start(id, move |svc| svc.finish_create(&volume_id, &request))
}

async fn list_volumes(State(service): State<Arc<JobService>>) -> Json<Vec<Volume>> {
    let mut volumes: Vec<Volume> = service.inventory.lock().volumes.values().cloned().collect();
    volumes.sort_by(|a, b| a.id.cmp(&b.id));
    Json(volumes)
}

async fn get_volume(
    State(service): State<Arc<JobService>>,
    Path(id): Path<String>,
) -> Result<Json<Volume>, (StatusCode, String)> {
    service
        .volume(&id)
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("volume {} not found", id)))
}

async fn delete_volume(
    State(service): State<Arc<JobService>>,
    issued: Option<Extension<RequestId>>,
    Path(id): Path<String>,
) -> Response {
    if service.volume(&id).is_none() {
        return (StatusCode::NOT_FOUND, format!("volume {} not found", id)).into_response();
    }
    service.start(job_id(issued), move |svc| svc.finish_delete(&id))
}

async fn resync_device(
    State(service): State<Arc<JobService>>,
    issued: Option<Extension<RequestId>>,
    Path(device): Path<String>,
) -> Response {
    service.start(job_id(issued), move |_| {
        info!(device = %device, "Device resynced");
        JobState::Done {
            status: StatusCode::NO_CONTENT,
            body: String::new(),
        }
    })
}

async fn job_status(State(service): State<Arc<JobService>>, Path(id): Path<String>) -> Response {
    match service.collect(&id) {
        None => (StatusCode::NOT_FOUND, format!("job {} not found", id)).into_response(),
        Some(JobState::Pending) => (
            StatusCode::OK,
            [(PENDING_HEADER, HeaderValue::from_static("true"))],
            "in progress",
        )
            .into_response(),
        Some(JobState::Done { status, body }) if body.is_empty() => status.into_response(),
        Some(JobState::Done { status, body }) => (
            status,
            [(CONTENT_TYPE, HeaderValue::from_static("application/json"))],
            body,
        )
            .into_response(),
        Some(JobState::Failed(message)) => {
            (StatusCode::INTERNAL_SERVER_ERROR, message).into_response()
        }
    }
}

/// Routes of the volume service, without admission or auth layers.
pub fn router(service: Arc<JobService>) -> Router {
    let status_route = format!("/{}/:id", service.status_resource());
    Router::new()
        .route("/hello", get(hello))
        .route("/volumes", post(create_volume).get(list_volumes))
        .route("/volumes/:id", get(get_volume).delete(delete_volume))
        .route("/devices/:id/resync", get(resync_device))
        .route(&status_route, get(job_status))
        .with_state(service)
}

/// The full server stack: issuer, admission, optional token check, handlers.
pub fn app(
    service: Arc<JobService>,
    controller: Arc<AdmissionController>,
    verifier: Option<Arc<TokenVerifier>>,
) -> Router {
    let mut routes = router(service);
    if let Some(verifier) = verifier {
        routes = routes.layer(middleware::from_fn_with_state(verifier, require_token));
    }
    apply_admission(routes, controller)
}

/// Serves `app` on `listener` until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    app: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let addr = listener.local_addr()?;
    info!(addr = %addr, "volgate server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("volgate server stopped");
    Ok(())
}
