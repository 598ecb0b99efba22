//! Execution history sinks.

pub mod log_sink;
pub mod sqlite;

pub use log_sink::TracingHistorySink;
pub use sqlite::SqliteHistorySink;
