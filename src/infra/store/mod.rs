//! Document store adapters.

mod memory;
mod rest;

pub use memory::MemoryDocumentStore;
pub use rest::RestDocumentStore;

pub const METRIC_STORE_REQUESTS_TOTAL: &str = "solar_leveling_store_requests_total";
pub const METRIC_STORE_REQUEST_MS: &str = "solar_leveling_store_request_ms";

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}
