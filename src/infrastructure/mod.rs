//! Infrastructure layer module
//!
//! - Configuration loading (figment, YAML + environment)
//! - Logging setup (tracing-subscriber, tracing-appender)

pub mod config;
pub mod logging;
