//! Application use cases / business logic

pub mod format;
pub mod run_loop;

pub use format::{FormatConfig, PostFormatter};
pub use run_loop::{RunLoop, RunLoopConfig, RunLoopError};
