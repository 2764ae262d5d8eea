//! In-memory marker-to-artifact index and the artifact store facade.
//!
//! [`LocalArtifactStore`] classifies incoming artifacts by their declared
//! target type and routes barcode targets into a [`MarkerIndex`]. Malformed
//! or unsupported descriptors never fail a call: they are dropped at
//! descriptor granularity and sibling descriptors on the same artifact are
//! still indexed.
//!
//! The store carries no internal locking. `add_artifact` takes `&mut self`;
//! callers sharing a store across tasks wrap it in a read/write lock so a
//! reader never observes a bucket mid-mutation.

/// Marker-keyed artifact buckets.
pub mod marker_index;

use std::sync::Arc;

use percept_schema::{Artifact, GeoCoordinates, Marker, NearbyResult, Target};

pub use marker_index::MarkerIndex;

/// Store contract exposed to orchestrating collaborators.
pub trait ArtifactStore {
	/// Registers an artifact under each supported target it declares.
	fn add_artifact(&mut self, artifact: Arc<Artifact>);

	/// Returns the artifacts registered under the observed markers.
	///
	/// `geo` is accepted for future proximity filtering and currently
	/// ignored.
	fn find_relevant_artifacts(
		&self,
		markers: &[Marker],
		geo: Option<&GeoCoordinates>,
	) -> Vec<NearbyResult>;
}

/// Artifact store backed by an in-memory [`MarkerIndex`].
#[derive(Debug, Default)]
pub struct LocalArtifactStore {
	markers: MarkerIndex,
}

impl LocalArtifactStore {
	/// Creates an empty store.
	pub fn new() -> Self {
		Self::default()
	}

	/// Drops every registration.
	pub fn reset(&mut self) {
		self.markers.reset();
	}

	/// Number of registrations currently held.
	pub fn len(&self) -> usize {
		self.markers.len()
	}

	/// Returns true when nothing is registered.
	pub fn is_empty(&self) -> bool {
		self.markers.is_empty()
	}
}

impl ArtifactStore for LocalArtifactStore {
	fn add_artifact(&mut self, artifact: Arc<Artifact>) {
		for target in artifact.targets() {
			match target {
				Target::Barcode(barcode) => {
					tracing::debug!(value = %barcode.text, "indexing barcode target");
					self.markers.add(barcode, target.clone(), Arc::clone(&artifact));
				}
				// Unsupported target types are skipped, not errors: new
				// discriminators must not break existing documents.
				Target::Unknown(_) => {
					tracing::debug!("skipping unsupported target type");
				}
			}
		}
	}

	fn find_relevant_artifacts(
		&self,
		markers: &[Marker],
		_geo: Option<&GeoCoordinates>,
	) -> Vec<NearbyResult> {
		self.markers.find(markers)
	}
}
