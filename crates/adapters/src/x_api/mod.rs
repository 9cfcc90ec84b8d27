//! X (Twitter) API adapters

mod write;

pub use write::{DEFAULT_BASE_URL, XPublisher};
