//! HTTP surfaces: JSON RPC handlers and the scrape endpoint.
//!
//! Handlers are thin: decode the request, call the dispatcher synchronously,
//! and map the outcome to an acknowledgement or a stable error body.

pub mod error;
pub mod exposition;
pub mod handlers;

pub use error::ApiError;
