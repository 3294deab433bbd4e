//! Infrastructure adapters and runtime bootstrap.

pub mod cache;
pub mod error;
pub mod http;
pub(crate) mod lock;
pub mod memory;
pub mod seed;
pub mod telemetry;
