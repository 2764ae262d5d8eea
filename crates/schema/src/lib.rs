//! Shared data model for artifact indexing and image-target detection.

/// Artifact and target descriptor types.
pub mod artifact;
/// Geographic context types.
pub mod geo;
/// Detectable image targets and raw frames.
pub mod image;
/// Observed markers and match results.
pub mod marker;

pub use artifact::{Artifact, BarcodeTarget, OneOrMany, Target};
pub use geo::GeoCoordinates;
pub use image::{DetectableImage, Frame};
pub use marker::{Marker, NearbyResult};
