//! planning-poster adapters crate
//!
//! This crate contains infrastructure adapters implementing the domain ports:
//! - `source`: Socrata open-data record source
//! - `state`: SQLite and in-memory dedup stores
//! - `map`: Tile-based static map renderer
//! - `x`: X (Twitter) publisher
//! - `outbox`: JSONL outbox publisher

pub mod map;
pub mod outbox;
mod socrata;
mod state_memory;
mod state_sqlite;

pub mod x_api;

/// Re-exports for record source adapters
pub mod source {
    pub use crate::socrata::{DEFAULT_BASE_URL, DEFAULT_DATASET, DEFAULT_ORDER, SocrataSource, parse_record};
}

/// Re-exports for state adapters
pub mod state {
    pub use crate::state_memory::InMemoryDedupStore;
    pub use crate::state_sqlite::SqliteDedupStore;
}

/// Re-exports for X API adapters
pub mod x {
    pub use crate::x_api::{DEFAULT_BASE_URL, XPublisher};
}
