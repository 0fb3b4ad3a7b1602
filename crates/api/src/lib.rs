//! HTTP API layer for markaz.
//!
//! - **Endpoints**: program catalog, registration, session auth, admin review
//! - **Extractors**: session claims
//! - **Middleware**: token verification and the admin gate
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

pub use endpoints::router;
