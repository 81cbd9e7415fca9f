//! Phenoscope Client - Result fetch orchestration
//!
//! The `SearchBackend` port, its Elasticsearch HTTP implementation, and the
//! `ExplorerSession` that ties the selection store, pagination, and backend
//! together. The session issues one query per user action and republishes
//! all view state atomically from the single response.

pub mod backend;
pub mod http;
pub mod session;

pub use backend::{SearchBackend, SearchRequest, SearchResponse};
pub use http::EsBackend;
pub use session::{ExplorerSession, FetchOutcome, PreparedFetch};
