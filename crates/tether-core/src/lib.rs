//! # tether-core
//!
//! Core library for tether providing:
//! - Layered configuration (defaults, YAML file, `TETHER_*` environment)
//! - Retry execution engine with policy-based configuration
//! - Liveness/readiness marker files for external health probes

pub mod config;
pub mod error;
pub mod health;
pub mod retry;
pub mod types;

pub use config::ConfigLoader;
pub use error::{Error, Result};
pub use health::HealthMarker;
pub use types::RuntimeConfig;
