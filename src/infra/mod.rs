//! Infrastructure adapters and runtime bootstrap.

pub mod assets;
pub mod error;
pub mod http;
pub mod mail;
pub mod storage;
pub mod store;
pub mod telemetry;
