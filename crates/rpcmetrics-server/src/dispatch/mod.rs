//! Dispatcher module exports.
//!
//! Re-exports the dispatcher so RPC handlers and the app state can depend on
//! this module directly.

pub mod dispatcher;

pub use dispatcher::Dispatcher;
