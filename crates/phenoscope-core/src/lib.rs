//! Phenoscope Core - Selection state, query compilation, and view contracts
//!
//! This crate contains the durable state (facet selection, pagination) and the
//! pure logic (query compilation, portable query forms, view data shapes) of
//! the faceted exploration engine. Nothing here performs I/O; the fetch
//! orchestrator lives in `phenoscope-client`.

pub mod config;
pub mod error;
pub mod models;
pub mod pagination;
pub mod query;
pub mod selection;

pub use error::{PhenoscopeError, Result};
