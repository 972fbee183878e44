//! HTTP API.
//!
//! Routes are nested under `/api/`. Protected routes run through
//! Rate Limit → Session → Audit → Handler; `/api/health` and the
//! account routes are public.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::api_router;
pub use server::{ApiServer, ServerError};
pub use types::ApiContext;
