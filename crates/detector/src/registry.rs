//! Configuration-keyed detector instances.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::detector::Detector;
use crate::error::Result;
use crate::transport::MatcherConfig;

/// Lazily constructed [`Detector`] instances, one per configuration.
///
/// Replaces a process-global singleton: callers sharing a configuration share
/// one backend (and one matching process), while tests can hold isolated
/// registries with isolated instances.
#[derive(Default)]
pub struct DetectorRegistry {
	detectors: RwLock<HashMap<MatcherConfig, Arc<Detector>>>,
}

impl DetectorRegistry {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the detector for `config`, constructing it on first use.
	///
	/// A configuration equal to one seen before returns the existing
	/// instance; it never respawns the matching process.
	pub fn obtain(&self, config: &MatcherConfig) -> Result<Arc<Detector>> {
		if let Some(detector) = self.detectors.read().get(config) {
			return Ok(Arc::clone(detector));
		}

		let mut detectors = self.detectors.write();
		// Re-check: another caller may have raced the construction.
		if let Some(detector) = detectors.get(config) {
			return Ok(Arc::clone(detector));
		}

		let detector = Arc::new(Detector::spawn(config)?);
		detectors.insert(config.clone(), Arc::clone(&detector));
		Ok(detector)
	}

	/// Number of constructed instances.
	pub fn len(&self) -> usize {
		self.detectors.read().len()
	}

	/// Returns true when nothing has been constructed yet.
	pub fn is_empty(&self) -> bool {
		self.detectors.read().is_empty()
	}
}
