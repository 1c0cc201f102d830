//! Server-side admission control for async jobs.
//!
//! The [`AdmissionController`] bounds how many mutating requests and
//! running jobs the server carries at once, records each job the downstream
//! handler accepts, and forgets it again when a status poll reports it done
//! or the [sweeper](AdmissionController::start_sweeper) finds it stale.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use volgate::admission::{apply_admission, AdmissionController};
//! use volgate::config::AdmissionConfig;
//!
//! let controller = Arc::new(AdmissionController::new(AdmissionConfig::default()));
//! let sweeper = controller.start_sweeper();
//! let app = apply_admission(volgate::jobs::router(jobs), Arc::clone(&controller));
//! ```

mod controller;
mod middleware;
mod registry;
mod sweeper;

pub use controller::{AdmissionController, AdmissionPermit, AdmissionRejected, AdmissionStats};
pub use middleware::{admission_middleware, apply_admission};
pub use registry::JobRecord;
pub use sweeper::SweeperHandle;
