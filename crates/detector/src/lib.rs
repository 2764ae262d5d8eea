//! Worker-backed image-target registration and frame matching.
//!
//! The heavy image matching runs in an isolated matching process reached
//! only by message passing; this crate manages target registration
//! lifecycle, the one-time readiness gate, and exact response correlation.
//!
//! * [`Detector`]: the public add/remove/detect/lookup/clear surface
//! * [`DetectorRegistry`]: configuration-keyed instance factory
//! * [`wire`]: the framed request/response protocol

mod detector;
/// Error types for the detection backend.
pub mod error;
pub mod registry;
mod transport;
pub mod wire;

pub use detector::Detector;
pub use error::{Error, Result};
pub use registry::DetectorRegistry;
pub use transport::MatcherConfig;

#[cfg(test)]
mod tests;
