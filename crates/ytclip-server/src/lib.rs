//! HTTP surface for the ytclip extraction service
//!
//! Exposed as a library so the router can be driven in-process by the
//! integration tests; the binary entry point lives in `main.rs`.

pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use router::build_router;
pub use state::AppState;
