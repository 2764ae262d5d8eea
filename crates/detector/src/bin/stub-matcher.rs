//! Minimal matching process used by integration tests.
//!
//! Speaks the wire protocol over stdio. `add` assigns sequential numeric ids
//! and remembers the template bytes; `process` reports the ids of templates
//! whose bytes occur verbatim in the frame pixels, a stand-in for real image
//! matching; `remove` acks with the dropped id.

use std::io::{self, BufRead, Write};

use percept_detector::wire::{READY_SENTINEL, Request, RequestOp, Response, ResponseBody};
use serde_json::Value as JsonValue;

// The bin target shares the package dependency set with the library.
use base64 as _;
use parking_lot as _;
use percept_schema as _;
use serde as _;
use thiserror as _;
use tokio as _;
use tracing as _;

fn main() -> io::Result<()> {
	let mut stdin = io::stdin().lock();
	let mut stdout = io::stdout().lock();

	write_message(&mut stdout, &JsonValue::from(READY_SENTINEL))?;

	let mut templates: Vec<(u64, Vec<u8>)> = Vec::new();
	let mut next_id = 0u64;

	while let Some(msg) = read_message(&mut stdin)? {
		let request: Request = match serde_json::from_value(msg) {
			Ok(request) => request,
			Err(_) => continue,
		};

		let body = match request.op {
			RequestOp::Add { data } => {
				let target = next_id;
				next_id += 1;
				templates.push((target, data));
				ResponseBody::Target { target }
			}
			RequestOp::Remove { target } => {
				templates.retain(|(id, _)| *id != target);
				ResponseBody::Target { target }
			}
			RequestOp::Process { frame } => {
				let targets = templates
					.iter()
					.filter(|(_, template)| contains(&frame.pixels, template))
					.map(|(id, _)| *id)
					.collect();
				ResponseBody::Matches { targets: Some(targets) }
			}
		};

		let response = Response { id: request.id, body };
		let msg = serde_json::to_value(&response).map_err(io::Error::other)?;
		write_message(&mut stdout, &msg)?;
	}

	Ok(())
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
	!needle.is_empty() && haystack.windows(needle.len()).any(|window| window == needle)
}

fn write_message(output: &mut impl Write, msg: &JsonValue) -> io::Result<()> {
	let json = msg.to_string();
	write!(output, "Content-Length: {}\r\n\r\n{}", json.len(), json)?;
	output.flush()
}

fn read_message(input: &mut impl BufRead) -> io::Result<Option<JsonValue>> {
	let mut content_length: Option<usize> = None;
	let mut line = String::new();
	loop {
		line.clear();
		if input.read_line(&mut line)? == 0 {
			return Ok(None);
		}

		let trimmed = line.trim();
		if trimmed.is_empty() {
			break;
		}

		if let Some(len_str) = trimmed.strip_prefix("Content-Length: ") {
			content_length = len_str.parse().ok();
		}
	}

	let length = content_length.ok_or_else(|| io::Error::other("missing Content-Length"))?;

	let mut body = vec![0u8; length];
	input.read_exact(&mut body)?;
	serde_json::from_slice(&body).map(Some).map_err(io::Error::other)
}
