//! Configuration types for volgate components.
//!
//! Each component takes a small builder-style config struct
//! ([`AdmissionConfig`] for the server gate, [`ClientConfig`] for the
//! outbound transport). [`ConfigFile`] loads both from an INI file.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use volgate::config::{AdmissionConfig, ClientConfig};
//!
//! let admission = AdmissionConfig::new()
//!     .with_max_concurrent(4)
//!     .with_entry_ttl(Duration::from_secs(600));
//! assert_eq!(admission.max_concurrent(), 4);
//!
//! let client = ClientConfig::new().with_max_retries(5);
//! assert_eq!(client.max_retries(), 5);
//! ```

mod admission;
mod client;
mod defaults;
mod file;
mod parser;
mod settings;
mod writer;

pub use admission::AdmissionConfig;
pub use client::ClientConfig;
pub use defaults::*;
pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::{AdmissionSettings, ClientSettings, ConfigFile, LoggingSettings, ServerSettings};
