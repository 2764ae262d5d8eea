use std::sync::Arc;

use percept_schema::{Artifact, BarcodeTarget, Marker, NearbyResult, Target};
use rustc_hash::FxHashMap;

/// One registration under a marker key.
#[derive(Debug, Clone)]
struct Entry {
	target: Target,
	artifact: Arc<Artifact>,
}

/// Pure in-memory mapping from marker key to the artifacts registered under
/// it.
///
/// Buckets are append-only: an artifact leaves a bucket only when the owning
/// process resets the whole index. Multiple artifacts may share one key, and
/// registering the same artifact twice stores it twice.
#[derive(Debug, Default)]
pub struct MarkerIndex {
	buckets: FxHashMap<String, Vec<Entry>>,
}

impl MarkerIndex {
	/// Creates an empty index.
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends `artifact` to the bucket keyed by the barcode payload.
	///
	/// `target` is the descriptor the artifact was registered under; it is
	/// echoed back on matches so callers see which target fired.
	pub fn add(&mut self, barcode: &BarcodeTarget, target: Target, artifact: Arc<Artifact>) {
		self.buckets
			.entry(barcode.text.clone())
			.or_default()
			.push(Entry { target, artifact });
	}

	/// Returns the union of bucket contents for the observed markers.
	///
	/// Lookup keys on the marker value only; the marker's reported type is
	/// the capture side's vocabulary (e.g. `qrcode`) and does not have to
	/// match the stored discriminator. No deduplication across markers: a
	/// bucket shared by two observed markers contributes its artifacts once
	/// per marker.
	pub fn find(&self, markers: &[Marker]) -> Vec<NearbyResult> {
		let mut results = Vec::new();
		for marker in markers {
			let Some(entries) = self.buckets.get(&marker.value) else {
				continue;
			};
			for entry in entries {
				results.push(NearbyResult {
					target: Some(entry.target.clone()),
					content: entry.artifact.ar_content.clone(),
					artifact: Arc::clone(&entry.artifact),
				});
			}
		}
		results
	}

	/// Number of registrations across all buckets.
	pub fn len(&self) -> usize {
		self.buckets.values().map(Vec::len).sum()
	}

	/// Returns true when no registrations exist.
	pub fn is_empty(&self) -> bool {
		self.buckets.is_empty()
	}

	/// Drops every bucket.
	pub fn reset(&mut self) {
		self.buckets.clear();
	}
}
