use serde::{Deserialize, Serialize};

/// Geographic context attached to a lookup.
///
/// Accepted by the store contract and reserved for future proximity
/// filtering; the in-memory store does not consult it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoCoordinates {
	pub latitude: f64,
	pub longitude: f64,
}
