//! Shared types for the grant server workspace
//!
//! Holds the configuration error type used while loading service config and
//! the `Secret` wrapper that keeps client secrets out of logs.

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::{Secret, constant_time_eq};
