//! Type definitions for tether configuration

pub mod runtime_config;

pub use runtime_config::*;
