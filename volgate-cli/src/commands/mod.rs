//! CLI command implementations.
//!
//! # Command Modules
//!
//! - [`config`] - Configuration management (path, show, init)
//! - [`remote`] - Client calls against a running server (hello, submit, delete)
//! - [`serve`] - Run the volume service behind the admission gate

pub mod common;
pub mod config;
pub mod remote;
pub mod serve;
