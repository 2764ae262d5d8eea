//! Transport to the isolated matching process.
//!
//! The matching process is reachable only through asynchronous message
//! passing. A dedicated IO task owns both directions of the channel and a
//! `pending` map keyed by correlation id, so overlapping in-flight requests
//! are always resolved against their own caller and never against "the last
//! call made".

use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;

use serde_json::Value as JsonValue;
use tokio::io::{AsyncBufRead, AsyncWrite, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot, watch};

use crate::error::{Error, Result};
use crate::wire::{self, CorrelationIds, Request, RequestOp, Response};

/// Configuration locating a matching process.
///
/// Also the identity of a logical backend: detectors obtained through the
/// registry with equal configurations share one instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MatcherConfig {
	/// Executable or script to spawn.
	pub command: String,
	/// Arguments passed to the process.
	pub args: Vec<String>,
	/// Bounded wait for the readiness sentinel.
	pub ready_timeout: Duration,
}

impl MatcherConfig {
	/// Default bounded wait for the readiness sentinel.
	pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(10);

	/// Creates a configuration for `command` with no arguments.
	pub fn new(command: impl Into<String>) -> Self {
		Self {
			command: command.into(),
			args: Vec::new(),
			ready_timeout: Self::DEFAULT_READY_TIMEOUT,
		}
	}
}

/// A request handed to the IO task, paired with its completion.
struct PendingRequest {
	op: RequestOp,
	response_tx: oneshot::Sender<Result<Response>>,
}

/// Handle to the IO task servicing one matching process.
pub(crate) struct Transport {
	request_tx: mpsc::UnboundedSender<PendingRequest>,
	ready_rx: watch::Receiver<bool>,
	ready_timeout: Duration,
	/// Keeps the child alive for the transport's lifetime; killed on drop.
	_child: Option<Child>,
}

impl Transport {
	/// Spawns the matching process and the IO task servicing it.
	pub(crate) fn spawn(config: &MatcherConfig) -> Result<Self> {
		let mut cmd = Command::new(&config.command);
		cmd.args(&config.args)
			.stdin(Stdio::piped())
			.stdout(Stdio::piped())
			.stderr(Stdio::null())
			.kill_on_drop(true);

		let mut child = cmd.spawn().map_err(|e| Error::Spawn {
			command: config.command.clone(),
			reason: e.to_string(),
		})?;

		let stdin = child.stdin.take().ok_or_else(|| Error::Spawn {
			command: config.command.clone(),
			reason: "failed to capture stdin".into(),
		})?;
		let stdout = child.stdout.take().ok_or_else(|| Error::Spawn {
			command: config.command.clone(),
			reason: "failed to capture stdout".into(),
		})?;

		tracing::info!(command = %config.command, "spawned matching process");

		let mut transport =
			Self::from_streams(BufReader::new(stdout), stdin, config.ready_timeout);
		transport._child = Some(child);
		Ok(transport)
	}

	/// Builds a transport over arbitrary streams.
	///
	/// Used by the process path above and by tests driving in-memory duplex
	/// channels.
	pub(crate) fn from_streams(
		reader: impl AsyncBufRead + Unpin + Send + 'static,
		writer: impl AsyncWrite + Unpin + Send + 'static,
		ready_timeout: Duration,
	) -> Self {
		let (request_tx, request_rx) = mpsc::unbounded_channel();
		let (ready_tx, ready_rx) = watch::channel(false);

		tokio::spawn(run_io(reader, writer, request_rx, ready_tx));

		Self { request_tx, ready_rx, ready_timeout, _child: None }
	}

	/// Suspends until the matching process has signaled readiness.
	///
	/// The gate resolves at most once per process; afterwards this returns
	/// immediately. If the sentinel does not arrive within the bounded wait
	/// the caller gets an explicit [`Error::ReadyTimeout`] instead of
	/// suspending forever.
	pub(crate) async fn ready(&self) -> Result<()> {
		let mut ready_rx = self.ready_rx.clone();
		match tokio::time::timeout(self.ready_timeout, ready_rx.wait_for(|ready| *ready)).await {
			Ok(Ok(_)) => Ok(()),
			Ok(Err(_)) => Err(Error::MatcherGone),
			Err(_) => Err(Error::ReadyTimeout(self.ready_timeout)),
		}
	}

	/// Performs one request/response round trip.
	pub(crate) async fn request(&self, op: RequestOp) -> Result<Response> {
		let (response_tx, response_rx) = oneshot::channel();
		self.request_tx
			.send(PendingRequest { op, response_tx })
			.map_err(|_| Error::MatcherGone)?;
		response_rx.await.map_err(|_| Error::MatcherGone)?
	}
}

/// IO loop for one matching process.
///
/// Inbound reads run on their own task and arrive over a channel, so the
/// `select!` below only races cancel-safe channel receives and a framed read
/// is never dropped halfway through.
async fn run_io(
	reader: impl AsyncBufRead + Unpin + Send + 'static,
	mut writer: impl AsyncWrite + Unpin,
	mut request_rx: mpsc::UnboundedReceiver<PendingRequest>,
	ready_tx: watch::Sender<bool>,
) {
	let mut pending: HashMap<u64, oneshot::Sender<Result<Response>>> = HashMap::new();
	let mut ids = CorrelationIds::new();

	let (inbound_tx, mut inbound_rx) = mpsc::unbounded_channel();
	let read_task = tokio::spawn(read_loop(reader, inbound_tx));

	loop {
		tokio::select! {
			req = request_rx.recv() => {
				let Some(req) = req else {
					// Transport dropped; stop servicing the channel.
					break;
				};

				let id = ids.next();
				let request = Request { id, op: req.op };
				let msg = match serde_json::to_value(&request) {
					Ok(msg) => msg,
					Err(e) => {
						let _ = req.response_tx.send(Err(e.into()));
						continue;
					}
				};

				tracing::debug!(id, "dispatching request");
				match wire::write_message(&mut writer, &msg).await {
					Ok(()) => {
						pending.insert(id, req.response_tx);
					}
					Err(e) => {
						tracing::error!(error = %e, "write to matching process failed");
						let _ = req.response_tx.send(Err(e));
						break;
					}
				}
			}

			msg = inbound_rx.recv() => {
				match msg {
					Some(Ok(msg)) => handle_inbound(msg, &mut pending, &ready_tx),
					Some(Err(e)) => {
						tracing::error!(error = %e, "read from matching process failed");
						break;
					}
					None => {
						tracing::info!("matching process closed the channel");
						break;
					}
				}
			}
		}
	}

	read_task.abort();

	// Fail every completion still waiting on this process.
	for (_, tx) in pending.drain() {
		let _ = tx.send(Err(Error::MatcherGone));
	}
	while let Ok(req) = request_rx.try_recv() {
		let _ = req.response_tx.send(Err(Error::MatcherGone));
	}
}

/// Forwards framed inbound messages until EOF or a read error.
async fn read_loop(
	mut reader: impl AsyncBufRead + Unpin,
	inbound_tx: mpsc::UnboundedSender<Result<JsonValue>>,
) {
	let mut read_buf = String::new();
	loop {
		match wire::read_message(&mut reader, &mut read_buf).await {
			Ok(Some(msg)) => {
				if inbound_tx.send(Ok(msg)).is_err() {
					break;
				}
			}
			Ok(None) => break,
			Err(e) => {
				let _ = inbound_tx.send(Err(e));
				break;
			}
		}
	}
}

/// Routes one inbound message: readiness sentinel or correlated response.
fn handle_inbound(
	msg: JsonValue,
	pending: &mut HashMap<u64, oneshot::Sender<Result<Response>>>,
	ready_tx: &watch::Sender<bool>,
) {
	if wire::is_ready_sentinel(&msg) {
		tracing::debug!("matching process ready");
		let _ = ready_tx.send(true);
		return;
	}

	let response: Response = match serde_json::from_value(msg) {
		Ok(response) => response,
		Err(e) => {
			tracing::warn!(error = %e, "undecodable message from matching process");
			return;
		}
	};

	match pending.remove(&response.id) {
		Some(tx) => {
			let _ = tx.send(Ok(response));
		}
		None => {
			tracing::warn!(id = response.id, "response for unknown correlation id");
		}
	}
}
