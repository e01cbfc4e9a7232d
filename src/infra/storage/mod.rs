//! Image storage backends.

mod local;
mod rest;

pub use local::LocalImageStorage;
pub use rest::RestImageStorage;
