//! Top-level facade crate for rpcmetrics.
//!
//! Re-exports the protocol types and the server library so users can depend on a single crate.

pub mod core {
    pub use rpcmetrics_core::*;
}

pub mod server {
    pub use rpcmetrics_server::*;
}
