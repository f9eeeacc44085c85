#![forbid(unsafe_code)]
//! pipeplan-core: shared vocabulary for the pipeline advisor crates.
//!
//! Everything here is plain data plus validation. No I/O, no logging sinks,
//! no scheduling; those belong to the binary layer or to the external
//! platforms the advice is handed to.

pub mod config;
pub mod error;
pub mod hash;
pub mod id;
pub mod manifest;
pub mod prelude;
pub mod source;
pub mod volume;

/// Crate version stamped into manifests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
