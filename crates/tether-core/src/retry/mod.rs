//! Retry execution engine with policy-based configuration
//!
//! Used by the release provider as its single HTTP-level retry layer.
//! Everything above that layer (a failed scheduled update check) is
//! retried by the schedule itself.

mod error;
mod executor;
mod observer;
mod strategies;

pub use error::RetryError;
pub use executor::RetryExecutor;
pub use observer::{RetryObserver, TracingObserver};
pub use strategies::{
    calculate_delay, ClosurePredicate, HttpStatusError, HttpStatusPredicate, RetryPredicate,
};
