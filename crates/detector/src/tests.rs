use std::time::Duration;

use percept_schema::{DetectableImage, Frame};
use serde_json::json;
use tokio::io::{BufReader, DuplexStream, ReadHalf, WriteHalf};

use crate::wire::{self, Request, RequestOp, Response, ResponseBody};
use crate::{Detector, Error};

fn image(id: &str) -> DetectableImage {
	DetectableImage { id: id.into(), name: None, media: None }
}

fn frame() -> Frame {
	Frame { width: 2, height: 2, pixels: vec![0; 16] }
}

/// Scripted matching process on the far end of an in-memory duplex channel.
struct FakeMatcher {
	reader: BufReader<ReadHalf<DuplexStream>>,
	writer: WriteHalf<DuplexStream>,
	buf: String,
}

impl FakeMatcher {
	async fn send_ready(&mut self) {
		wire::write_message(&mut self.writer, &json!("ready")).await.unwrap();
	}

	async fn recv(&mut self) -> Option<Request> {
		let msg = wire::read_message(&mut self.reader, &mut self.buf).await.unwrap()?;
		Some(serde_json::from_value(msg).unwrap())
	}

	async fn respond(&mut self, response: Response) {
		let msg = serde_json::to_value(&response).unwrap();
		wire::write_message(&mut self.writer, &msg).await.unwrap();
	}

	async fn ack_target(&mut self, id: u64, target: u64) {
		self.respond(Response { id, body: ResponseBody::Target { target } }).await;
	}

	async fn ack_matches(&mut self, id: u64, targets: Option<Vec<u64>>) {
		self.respond(Response { id, body: ResponseBody::Matches { targets } }).await;
	}
}

fn pair(ready_timeout: Duration) -> (Detector, FakeMatcher) {
	let (client, server) = tokio::io::duplex(64 * 1024);
	let (client_read, client_write) = tokio::io::split(client);
	let (server_read, server_write) = tokio::io::split(server);

	let detector = Detector::from_streams(BufReader::new(client_read), client_write, ready_timeout);
	let matcher = FakeMatcher {
		reader: BufReader::new(server_read),
		writer: server_write,
		buf: String::new(),
	};
	(detector, matcher)
}

async fn ready_pair() -> (Detector, FakeMatcher) {
	let (detector, mut matcher) = pair(Duration::from_secs(1));
	matcher.send_ready().await;
	(detector, matcher)
}

#[tokio::test]
async fn add_detect_remove_lifecycle() {
	let _ = tracing_subscriber::fmt().with_test_writer().try_init();
	let (detector, mut matcher) = ready_pair().await;

	let client = async {
		let id = detector.add_target(b"template", image("poster")).await.unwrap();
		assert_eq!(id, 0);

		let found = detector.detect(&frame()).await.unwrap();
		assert_eq!(found.len(), 1);
		assert_eq!(found[0].id, "poster");

		detector.remove_target(id).await.unwrap();
		assert_eq!(detector.target_count(), 0);
	};

	let server = async {
		let req = matcher.recv().await.unwrap();
		assert!(matches!(req.op, RequestOp::Add { .. }));
		matcher.ack_target(req.id, 0).await;

		let req = matcher.recv().await.unwrap();
		assert!(matches!(req.op, RequestOp::Process { .. }));
		matcher.ack_matches(req.id, Some(vec![0])).await;

		let req = matcher.recv().await.unwrap();
		let RequestOp::Remove { target } = req.op else { panic!("expected remove") };
		assert_eq!(target, 0);
		matcher.ack_target(req.id, target).await;
	};

	tokio::join!(client, server);
}

#[tokio::test]
async fn empty_registry_detect_skips_the_matcher() {
	let (detector, mut matcher) = ready_pair().await;

	assert!(detector.detect(&frame()).await.unwrap().is_empty());

	// The matcher never saw a single request.
	drop(detector);
	assert!(matcher.recv().await.is_none());
}

#[tokio::test]
async fn overlapping_requests_resolve_by_correlation_id() {
	let (detector, mut matcher) = ready_pair().await;

	let client = async {
		let (first, second) = tokio::join!(
			detector.add_target(b"first", image("first")),
			detector.add_target(b"second", image("second")),
		);
		assert_eq!(first.unwrap(), 10);
		assert_eq!(second.unwrap(), 11);

		// The numeric bindings must match the acks, not arrival order.
		let found = detector.detect(&frame()).await.unwrap();
		assert_eq!(found.len(), 1);
		assert_eq!(found[0].id, "first");
	};

	let server = async {
		// Dispatch order of the two concurrent adds is unspecified;
		// identify each request by its template payload.
		let mut by_payload = std::collections::HashMap::new();
		for _ in 0..2 {
			let req = matcher.recv().await.unwrap();
			let RequestOp::Add { data } = &req.op else { panic!("expected add") };
			by_payload.insert(data.clone(), req.id);
		}
		let first_id = by_payload[b"first".as_slice()];
		let second_id = by_payload[b"second".as_slice()];

		// Answer "second" before "first"; correlation must route each ack
		// to its own caller.
		matcher.ack_target(second_id, 11).await;
		matcher.ack_target(first_id, 10).await;

		let req = matcher.recv().await.unwrap();
		matcher.ack_matches(req.id, Some(vec![10])).await;
	};

	tokio::join!(client, server);
}

#[tokio::test]
async fn removal_consumes_exactly_one_registration() {
	let (detector, mut matcher) = ready_pair().await;

	let client = async {
		assert_eq!(detector.add_target(b"zero", image("zero")).await.unwrap(), 0);
		assert_eq!(detector.add_target(b"one", image("one")).await.unwrap(), 1);
		assert_eq!(detector.add_target(b"two", image("two")).await.unwrap(), 2);
		detector.remove_target(1).await.unwrap();
	};

	let server = async {
		for expected in 0..3u64 {
			let req = matcher.recv().await.unwrap();
			assert!(matches!(req.op, RequestOp::Add { .. }));
			matcher.ack_target(req.id, expected).await;
		}

		let req = matcher.recv().await.unwrap();
		let RequestOp::Remove { target } = req.op else { panic!("expected remove") };
		assert_eq!(target, 1);
		matcher.ack_target(req.id, target).await;
	};

	tokio::join!(client, server);

	assert!(detector.target("one").is_none());
	assert_eq!(detector.target("zero").unwrap().id, "zero");
	assert_eq!(detector.target("two").unwrap().id, "two");
	assert_eq!(detector.target_count(), 2);
}

#[tokio::test]
async fn stale_match_ids_are_filtered() {
	let (detector, mut matcher) = ready_pair().await;

	let client = async {
		detector.add_target(b"kept", image("kept")).await.unwrap();
		detector.add_target(b"dropped", image("dropped")).await.unwrap();
		detector.remove_target(1).await.unwrap();

		// The matching process still reports the removed target; the stale
		// id is silently dropped from the result.
		let found = detector.detect(&frame()).await.unwrap();
		assert_eq!(found.len(), 1);
		assert_eq!(found[0].id, "kept");
	};

	let server = async {
		for expected in 0..2u64 {
			let req = matcher.recv().await.unwrap();
			matcher.ack_target(req.id, expected).await;
		}

		let req = matcher.recv().await.unwrap();
		matcher.ack_target(req.id, 1).await;

		let req = matcher.recv().await.unwrap();
		matcher.ack_matches(req.id, Some(vec![0, 1])).await;
	};

	tokio::join!(client, server);
}

#[tokio::test]
async fn absent_match_list_is_normalized_to_empty() {
	let (detector, mut matcher) = ready_pair().await;

	let client = async {
		detector.add_target(b"t", image("t")).await.unwrap();
		assert!(detector.detect(&frame()).await.unwrap().is_empty());
	};

	let server = async {
		let req = matcher.recv().await.unwrap();
		matcher.ack_target(req.id, 0).await;

		let req = matcher.recv().await.unwrap();
		matcher.ack_matches(req.id, None).await;
	};

	tokio::join!(client, server);
}

#[tokio::test]
async fn unknown_correlation_ids_are_dropped() {
	let (detector, mut matcher) = ready_pair().await;

	// Unsolicited response before any request was made.
	matcher.respond(Response { id: 99, body: ResponseBody::Target { target: 5 } }).await;

	let client = async {
		assert_eq!(detector.add_target(b"t", image("t")).await.unwrap(), 0);
	};

	let server = async {
		let req = matcher.recv().await.unwrap();
		matcher.ack_target(req.id, 0).await;
	};

	tokio::join!(client, server);

	// Only the acknowledged registration exists.
	assert_eq!(detector.target_count(), 1);
	assert!(detector.target("t").is_some());
}

#[tokio::test]
async fn clear_drops_local_registrations_only() {
	let (detector, mut matcher) = ready_pair().await;

	let client = async {
		detector.add_target(b"t", image("t")).await.unwrap();
		detector.clear();
		assert_eq!(detector.target_count(), 0);

		// Registry is empty again, so no further round trips happen.
		assert!(detector.detect(&frame()).await.unwrap().is_empty());
	};

	let server = async {
		let req = matcher.recv().await.unwrap();
		matcher.ack_target(req.id, 0).await;
	};

	tokio::join!(client, server);

	drop(detector);
	assert!(matcher.recv().await.is_none());
}

#[tokio::test]
async fn missing_readiness_is_an_explicit_error() {
	let (detector, _matcher) = pair(Duration::from_millis(50));

	let err = detector.detect(&frame()).await.unwrap_err();
	assert!(matches!(err, Error::ReadyTimeout(_)));
}

#[tokio::test]
async fn dropped_matcher_fails_the_pending_request() {
	let (detector, mut matcher) = ready_pair().await;

	let client = async {
		let err = detector.add_target(b"t", image("t")).await.unwrap_err();
		assert!(matches!(err, Error::MatcherGone));
	};

	let server = async {
		let _req = matcher.recv().await.unwrap();
		drop(matcher);
	};

	tokio::join!(client, server);
}
