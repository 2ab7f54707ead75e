//! Talon - OSINT enrichment transforms for investigation graphs
//!
//! Normalizes heterogeneous, loosely-typed observations into strongly-typed
//! entities, runs pluggable transforms that call external reconnaissance
//! tools through container-backed adapters, and correlates the raw output
//! back into validated entities. Persistence, scheduling, and permissions
//! belong to collaborators; this crate is the transform/tool-execution
//! pipeline only.

pub mod cli;
pub mod config;
pub mod entity;
pub mod error;
pub mod events;
pub mod runtime;
pub mod tool;
pub mod transform;

pub use error::{Result, TalonError};
