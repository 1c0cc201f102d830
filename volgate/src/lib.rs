//! volgate - admission control and async job tracking for storage orchestration
//!
//! Long-running cluster operations (creating or deleting a volume) are
//! accepted with `202 Accepted` and finished in the background; the caller
//! polls a job-status resource until the job is done. This crate provides
//! both halves of that contract:
//!
//! - [`admission`]: the server gate that bounds in-flight work and tracks
//!   accepted jobs until a poll reports them finished or they go stale
//! - [`client`]: a throttled, signing, overload-retrying client that
//!   follows accepted jobs to completion
//!
//! # High-Level API
//!
//! ```ignore
//! use std::sync::Arc;
//! use volgate::admission::AdmissionController;
//! use volgate::config::{AdmissionConfig, ClientConfig};
//! use volgate::jobs::{self, JobService};
//!
//! let controller = Arc::new(AdmissionController::new(AdmissionConfig::default()));
//! let _sweeper = controller.start_sweeper();
//! let service = Arc::new(JobService::new(1024, Duration::from_secs(2)));
//! let app = jobs::app(service, controller, None);
//!
//! let client = volgate::client::ClusterClient::without_auth("http://127.0.0.1:8080", ClientConfig::default())?;
//! let volume = client.create("/volumes", r#"{"size":10}"#.into()).await?;
//! ```

pub mod admission;
pub mod auth;
pub mod client;
pub mod config;
pub mod jobs;
pub mod logging;
pub mod protocol;
pub mod request_id;

/// Version of the volgate library and CLI.
///
/// This is synchronized across all components in the workspace.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
