// Itinerary sorting with a cache in front of the ordering work

pub mod config;
pub mod currency;
pub mod error;
pub mod fingerprint;
pub mod orchestrator;
pub mod request;
pub mod sorting;
pub mod sqlite;
pub mod store;

// Re-export key types for convenience
pub use currency::{CurrencyConverter, CurrencyError, REFERENCE_CURRENCY};
pub use error::SortError;
pub use fingerprint::{fingerprint, Fingerprint};
pub use orchestrator::{resolve, Resolver, SortStats, SortStatsSnapshot};
pub use request::{Itinerary, MalformedRequest, Price, SortRequest, SortingType};
pub use sorting::sort_request;
pub use sqlite::SqliteStore;
pub use store::{MemoryStore, Store, StoreError};
