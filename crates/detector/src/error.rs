use std::io;
use std::time::Duration;

/// Alias for a `Result` with the error type [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Possible errors from the detection backend.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
	/// The matching process never signaled readiness within the bounded wait.
	#[error("matching process not ready after {0:?}")]
	ReadyTimeout(Duration),
	/// The matching process exited or its channel closed.
	#[error("matching process is gone")]
	MatcherGone,
	/// The matching process could not be spawned.
	#[error("failed to spawn matching process `{command}`: {reason}")]
	Spawn {
		/// The configured command.
		command: String,
		/// Why the spawn failed.
		reason: String,
	},
	/// The matching process violated the wire protocol.
	#[error("protocol error: {0}")]
	Protocol(String),
	/// The matching process replied with undecodable data.
	#[error("deserialization failed: {0}")]
	Deserialize(#[from] serde_json::Error),
	/// Input/output errors from the underlying channel.
	#[error("{0}")]
	Io(#[from] io::Error),
}
