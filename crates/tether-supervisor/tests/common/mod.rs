//! Common test infrastructure for tether-supervisor tests
//!
//! # Modules
//!
//! - `scripts`: POSIX shell stand-ins for the supervised CLI
//! - `provider`: An in-memory release provider installing those scripts
//! - `harness`: Running a supervisor in the background and waiting on it

#![allow(dead_code)]
#![allow(unused_imports)]

pub mod harness;
pub mod provider;
pub mod scripts;

pub use harness::*;
pub use provider::*;
pub use scripts::*;
