//! Client against a live loopback server.
//!
//! These run in real time, so work times and poll intervals are short.

use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use volgate::admission::AdmissionController;
use volgate::auth::TokenVerifier;
use volgate::client::{ClientError, ClusterClient};
use volgate::config::{AdmissionConfig, ClientConfig};
use volgate::jobs::{self, JobService, Volume};

const USER: &str = "admin";
const SECRET: &str = "s3cret";

struct TestServer {
    base_url: String,
    controller: Arc<AdmissionController>,
    service: Arc<JobService>,
    shutdown: CancellationToken,
    task: JoinHandle<std::io::Result<()>>,
}

impl TestServer {
    async fn start(max_concurrent: usize, work_time: Duration, secured: bool) -> Self {
        let controller = Arc::new(AdmissionController::new(
            AdmissionConfig::new().with_max_concurrent(max_concurrent),
        ));
        let service = Arc::new(JobService::new(100, work_time));
        let verifier =
            secured.then(|| Arc::new(TokenVerifier::new().with_key(USER, SECRET)));
        let app = jobs::app(Arc::clone(&service), Arc::clone(&controller), verifier);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let shutdown = CancellationToken::new();
        let signal = shutdown.clone();
        let task = tokio::spawn(async move {
            jobs::serve(listener, app, async move { signal.cancelled().await }).await
        });

        Self {
            base_url,
            controller,
            service,
            shutdown,
            task,
        }
    }

    async fn stop(self) {
        self.shutdown.cancel();
        self.task.await.unwrap().unwrap();
    }
}

fn client_config() -> ClientConfig {
    ClientConfig::new()
        .with_poll_interval(Duration::from_millis(10))
        .with_backoff(Duration::from_millis(5), Duration::from_millis(20))
        .with_max_retries(500)
}

#[tokio::test]
async fn test_create_and_delete_volume() {
    let server = TestServer::start(4, Duration::from_millis(50), true).await;
    let client = ClusterClient::new(&server.base_url, USER, SECRET, client_config()).unwrap();

    client.hello().await.unwrap();

    let response = client
        .create("/volumes", r#"{"size":25,"name":"data"}"#.into())
        .await
        .unwrap();
    let volume: Volume = serde_json::from_slice(&response.body).unwrap();
    assert_eq!(volume.name, "data");
    assert_eq!(volume.size, 25);
    assert_eq!(server.service.free(), 75);

    let response = client.delete(&format!("/volumes/{}", volume.id)).await.unwrap();
    assert_eq!(response.status, reqwest::StatusCode::NO_CONTENT);
    assert_eq!(server.service.free(), 100);

    let stats = server.controller.stats();
    assert_eq!(stats.serving, 0);
    assert_eq!(stats.received, 0);
    assert_eq!(stats.completed, 2);

    server.stop().await;
}

#[tokio::test]
async fn test_overloaded_clients_retry_until_served() {
    let server = TestServer::start(1, Duration::from_millis(100), false).await;
    let client = Arc::new(ClusterClient::without_auth(&server.base_url, client_config()).unwrap());

    let mut tasks = Vec::new();
    for i in 0..3 {
        let client = Arc::clone(&client);
        tasks.push(tokio::spawn(async move {
            client
                .create("/volumes", format!(r#"{{"size":1,"name":"v{}"}}"#, i).into())
                .await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let stats = server.controller.stats();
    assert_eq!(stats.completed, 3);
    assert!(stats.rejected >= 1, "only one job fits at a time");
    assert_eq!(stats.serving, 0);
    assert_eq!(server.service.free(), 97);

    server.stop().await;
}

#[tokio::test]
async fn test_failed_job_reported_to_caller() {
    let server = TestServer::start(2, Duration::from_millis(20), false).await;
    let client = ClusterClient::without_auth(&server.base_url, client_config()).unwrap();

    let err = client
        .create("/volumes", r#"{"size":1000}"#.into())
        .await
        .unwrap_err();
    match err {
        ClientError::JobFailed { status, message } => {
            assert_eq!(status, reqwest::StatusCode::INTERNAL_SERVER_ERROR);
            assert!(message.contains("no space"));
        }
        other => panic!("expected JobFailed, got {:?}", other),
    }
    assert_eq!(server.controller.stats().serving, 0);

    server.stop().await;
}

#[tokio::test]
async fn test_unsigned_client_rejected_by_secured_server() {
    let server = TestServer::start(2, Duration::from_millis(20), true).await;
    let client = ClusterClient::without_auth(&server.base_url, client_config()).unwrap();

    let err = client
        .create("/volumes", r#"{"size":1}"#.into())
        .await
        .unwrap_err();
    assert!(
        matches!(err, ClientError::UnexpectedStatus { status, .. } if status == reqwest::StatusCode::UNAUTHORIZED),
        "got {:?}",
        err
    );

    server.stop().await;
}

#[tokio::test]
async fn test_retry_budget_exhausted_while_capacity_held() {
    let server = TestServer::start(1, Duration::from_secs(30), false).await;
    let patient = ClusterClient::without_auth(&server.base_url, client_config()).unwrap();
    let accepted = patient
        .retrying_send(reqwest::Method::POST, "/volumes", r#"{"size":1}"#.into())
        .await
        .unwrap();
    assert_eq!(accepted.status, reqwest::StatusCode::ACCEPTED);

    let impatient = ClusterClient::without_auth(
        &server.base_url,
        client_config().with_max_retries(3),
    )
    .unwrap();
    let err = impatient
        .create("/volumes", r#"{"size":1}"#.into())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::RetriesExhausted { attempts: 3 }));
    assert_eq!(server.controller.stats().rejected, 3);

    // The poll loop has no bound of its own; callers cap it.
    let waited =
        tokio::time::timeout(Duration::from_millis(100), patient.wait_for_job(&accepted)).await;
    assert!(waited.is_err());

    server.stop().await;
}
