//! Common test infrastructure for tether-update tests
//!
//! # Usage
//!
//! ```ignore
//! mod common;
//! use common::*;
//! ```
//!
//! # Modules
//!
//! - `constants`: Versions, asset names, payload sizes
//! - `archives`: tar.gz fixture builders
//! - `mock_server`: Wiremock setup for the releases API and asset downloads

#![allow(dead_code)]
#![allow(unused_imports)]

pub mod archives;
pub mod constants;
pub mod mock_server;

pub use archives::*;
pub use constants::*;
pub use mock_server::*;
