use std::collections::HashMap;
use std::time::Duration;

use parking_lot::RwLock;
use percept_schema::{DetectableImage, Frame};
use tokio::io::{AsyncBufRead, AsyncWrite};

use crate::error::{Error, Result};
use crate::transport::{MatcherConfig, Transport};
use crate::wire::{RequestOp, ResponseBody, WireFrame};

/// Worker-backed image-target detector.
///
/// Owns the registry of worker-assigned numeric target ids and delegates the
/// heavy matching to an isolated matching process. Every operation first
/// suspends on the one-time readiness gate (bounded, see
/// [`MatcherConfig::ready_timeout`]), then performs exactly one
/// request/response round trip.
///
/// A registry entry exists iff a successful [`add_target`](Self::add_target)
/// returned its id and no successful [`remove_target`](Self::remove_target)
/// consumed it; the matching process never reuses a live id.
pub struct Detector {
	transport: Transport,
	targets: RwLock<HashMap<u64, DetectableImage>>,
}

impl Detector {
	/// Spawns the configured matching process and returns a detector bound
	/// to it.
	///
	/// Must be called within a tokio runtime; the transport's IO task is
	/// spawned onto it.
	pub fn spawn(config: &MatcherConfig) -> Result<Self> {
		Ok(Self::with_transport(Transport::spawn(config)?))
	}

	/// Builds a detector over an already established duplex channel.
	///
	/// The peer is expected to speak the wire protocol, readiness sentinel
	/// included. Useful for in-memory transports in tests and for embedders
	/// that manage the matching process themselves.
	pub fn from_streams(
		reader: impl AsyncBufRead + Unpin + Send + 'static,
		writer: impl AsyncWrite + Unpin + Send + 'static,
		ready_timeout: Duration,
	) -> Self {
		Self::with_transport(Transport::from_streams(reader, writer, ready_timeout))
	}

	fn with_transport(transport: Transport) -> Self {
		Self { transport, targets: RwLock::new(HashMap::new()) }
	}

	/// Registers a template image with the matching process.
	///
	/// Returns the worker-assigned numeric id now bound to `image`.
	pub async fn add_target(&self, data: &[u8], image: DetectableImage) -> Result<u64> {
		self.transport.ready().await?;

		let response = self.transport.request(RequestOp::Add { data: data.to_vec() }).await?;
		let ResponseBody::Target { target } = response.body else {
			return Err(Error::Protocol("add acknowledged without a target id".into()));
		};

		tracing::debug!(id = target, image = %image.id, "target stored");
		self.targets.write().insert(target, image);
		Ok(target)
	}

	/// Drops the registration for `target`.
	pub async fn remove_target(&self, target: u64) -> Result<()> {
		self.transport.ready().await?;

		let response = self.transport.request(RequestOp::Remove { target }).await?;
		let ResponseBody::Target { target } = response.body else {
			return Err(Error::Protocol("remove acknowledged without a target id".into()));
		};

		tracing::debug!(id = target, "target removed");
		self.targets.write().remove(&target);
		Ok(())
	}

	/// Matches `frame` against every registered target.
	///
	/// With an empty registry this resolves immediately without contacting
	/// the matching process. Ids the matching process reports for targets
	/// removed while the request was in flight are filtered out silently.
	pub async fn detect(&self, frame: &Frame) -> Result<Vec<DetectableImage>> {
		self.transport.ready().await?;

		if self.targets.read().is_empty() {
			return Ok(Vec::new());
		}

		let response =
			self.transport.request(RequestOp::Process { frame: WireFrame::from(frame) }).await?;
		let ResponseBody::Matches { targets } = response.body else {
			return Err(Error::Protocol("process acknowledged without a match list".into()));
		};

		let matched = targets.unwrap_or_default();
		let registry = self.targets.read();
		Ok(matched.iter().filter_map(|id| registry.get(id).cloned()).collect())
	}

	/// Looks up a registration by the caller's external id.
	///
	/// Linear scan; registration cardinalities per detector stay small.
	pub fn target(&self, external_id: &str) -> Option<DetectableImage> {
		self.targets.read().values().find(|image| image.id == external_id).cloned()
	}

	/// Number of live registrations.
	pub fn target_count(&self) -> usize {
		self.targets.read().len()
	}

	/// Drops every local registration.
	///
	/// The matching process is not notified: the observed protocol has no
	/// clear message, so worker-side match state persists until the process
	/// exits.
	pub fn clear(&self) {
		self.targets.write().clear();
	}
}
