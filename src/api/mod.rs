//! HTTP surface for the triage pipeline.
//!
//! Routes are nested under `/api/`. The router is composable:
//! `triage_api_router()` returns a `Router` that can be mounted on any
//! axum server instance, and `start_server()` runs it in the background.

pub mod endpoints;
pub mod error;
pub mod router;
pub mod server;
pub mod types;

pub use router::triage_api_router;
pub use server::{start_server, ServerSession, TriageServer};
pub use types::ApiContext;
