//! ytclip-core: asynchronous audio-clip extraction pipeline
//!
//! Jobs move through a fixed stage order while a per-job progress bus
//! multicasts updates to any number of live subscribers. Job state is
//! held only in memory and evicted a bounded time after termination.

pub mod bus;
pub mod catalog;
pub mod config;
pub mod error;
pub mod events;
pub mod pipeline;
pub mod registry;
pub mod relay;
pub mod runner;
pub mod timecode;

pub use config::Config;
pub use error::{Result, YtClipError};
pub use pipeline::{Accepted, ExtractionRequest, Extractor};
