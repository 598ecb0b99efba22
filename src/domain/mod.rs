//! Domain layer for the maestro orchestration pipeline
//!
//! This module contains the stage message types, collaborator ports and the
//! error taxonomy.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult};
