use std::io::{BufRead, Read};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::Value;

use crate::error::{PixelError, Result};

const EVENT_ENVELOPE_BYTES: usize = 16 * 1024;

/// Largest event that can carry a decoded frame of `max_payload_bytes`:
/// base64 growth plus room for the JSON fields around it.
pub fn event_limit_for_payload(max_payload_bytes: usize) -> usize {
    max_payload_bytes
        .div_ceil(3)
        .saturating_mul(4)
        .saturating_add(EVENT_ENVELOPE_BYTES)
}

/// One dispatched server-sent event.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SseEvent {
    pub event: Option<String>,
    pub data: String,
}

/// Pull-based reader of `text/event-stream` bodies.
///
/// Yields one item per blank-line-terminated event. A read failure is
/// reported once and ends the iteration. Events larger than the limit are
/// drained without being buffered and reported as
/// [`PixelError::OversizedPayload`]; reading continues after them.
pub struct SseReader<R> {
    reader: R,
    line: Vec<u8>,
    max_event_bytes: usize,
    done: bool,
}

impl<R: BufRead> SseReader<R> {
    pub fn new(reader: R) -> Self {
        Self::with_limit(reader, usize::MAX)
    }

    pub fn with_limit(reader: R, max_event_bytes: usize) -> Self {
        Self {
            reader,
            line: Vec::new(),
            max_event_bytes,
            done: false,
        }
    }

    /// Reads one line, keeping at most `max_event_bytes + 1` bytes of it.
    /// Returns the length of the whole line as read from the stream.
    fn next_line(&mut self) -> std::io::Result<usize> {
        self.line.clear();
        let cap = self.max_event_bytes.saturating_add(1);
        let read = (&mut self.reader)
            .take(cap as u64)
            .read_until(b'\n', &mut self.line)?;
        if read < cap || self.line.last() == Some(&b'\n') {
            return Ok(read);
        }

        let mut total = read;
        loop {
            let (consumed, found) = {
                let available = self.reader.fill_buf()?;
                if available.is_empty() {
                    return Ok(total);
                }
                match available.iter().position(|byte| *byte == b'\n') {
                    Some(at) => (at + 1, true),
                    None => (available.len(), false),
                }
            };
            self.reader.consume(consumed);
            total = total.saturating_add(consumed);
            if found {
                return Ok(total);
            }
        }
    }
}

impl<R: BufRead> Iterator for SseReader<R> {
    type Item = Result<SseEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let limit = self.max_event_bytes;
        let oversized = |len: usize| PixelError::OversizedPayload { len, limit };
        let mut event = SseEvent::default();
        let mut has_data = false;
        let mut seen = 0usize;
        let mut too_large = false;
        loop {
            let read = match self.next_line() {
                Ok(read) => read,
                Err(err) => {
                    self.done = true;
                    return Some(Err(PixelError::Transport(format!(
                        "event stream read failed: {err}"
                    ))));
                }
            };
            if read == 0 {
                self.done = true;
                if too_large {
                    return Some(Err(oversized(seen)));
                }
                return has_data.then_some(Ok(event));
            }
            if read > self.line.len() {
                seen = seen.saturating_add(read);
                too_large = true;
                event.data.clear();
                continue;
            }

            let text = String::from_utf8_lossy(&self.line);
            let line = text.trim_end_matches(['\n', '\r']);
            if line.is_empty() {
                if too_large {
                    return Some(Err(oversized(seen)));
                }
                if has_data {
                    return Some(Ok(event));
                }
                event = SseEvent::default();
                seen = 0;
                continue;
            }
            if line.starts_with(':') {
                continue;
            }
            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (line, ""),
            };
            match field {
                "event" => event.event = Some(value.to_string()),
                "data" => {
                    seen = seen.saturating_add(value.len());
                    if too_large || seen > limit {
                        too_large = true;
                        event.data.clear();
                    } else {
                        if has_data {
                            event.data.push('\n');
                        }
                        event.data.push_str(value);
                    }
                    has_data = true;
                }
                _ => {}
            }
        }
    }
}

/// Turns image-edit stream events into frame payloads.
///
/// Every event carrying `b64_json` yields that image immediately; an event
/// type ending in `.completed` is terminal. Error events end the stream.
pub struct ImageEventStream<R> {
    events: SseReader<R>,
    finished: bool,
}

impl<R: BufRead> ImageEventStream<R> {
    pub fn new(reader: R) -> Self {
        Self::from_events(SseReader::new(reader))
    }

    /// Caps each event at `max_event_bytes`; see [`event_limit_for_payload`].
    pub fn with_limit(reader: R, max_event_bytes: usize) -> Self {
        Self::from_events(SseReader::with_limit(reader, max_event_bytes))
    }

    fn from_events(events: SseReader<R>) -> Self {
        Self {
            events,
            finished: false,
        }
    }
}

impl<R: BufRead> Iterator for ImageEventStream<R> {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.finished {
            let event = match self.events.next()? {
                Ok(event) => event,
                Err(err @ PixelError::OversizedPayload { .. }) => return Some(Err(err)),
                Err(err) => {
                    self.finished = true;
                    return Some(Err(err));
                }
            };
            match interpret_event(&event) {
                StreamStep::Skip => continue,
                StreamStep::Done => self.finished = true,
                StreamStep::Failed(err) => {
                    self.finished = true;
                    return Some(Err(err));
                }
                StreamStep::Frame { payload, terminal } => {
                    self.finished = terminal;
                    return Some(payload);
                }
            }
        }
        None
    }
}

#[derive(Debug)]
enum StreamStep {
    Skip,
    Done,
    Failed(PixelError),
    Frame {
        payload: Result<Vec<u8>>,
        terminal: bool,
    },
}

fn interpret_event(event: &SseEvent) -> StreamStep {
    let data = event.data.trim();
    if data == "[DONE]" {
        return StreamStep::Done;
    }
    let parsed: Value = match serde_json::from_str(data) {
        Ok(parsed) => parsed,
        Err(err) => {
            return StreamStep::Frame {
                payload: Err(PixelError::InvalidImageData(format!(
                    "malformed stream event: {err}"
                ))),
                terminal: false,
            }
        }
    };
    let event_type = parsed
        .get("type")
        .and_then(Value::as_str)
        .or(event.event.as_deref())
        .unwrap_or_default();
    let terminal = event_type.ends_with(".completed");

    if event_type == "error" || parsed.get("error").is_some_and(|error| !error.is_null()) {
        let message = parsed
            .get("error")
            .and_then(|error| error.get("message").and_then(Value::as_str))
            .or_else(|| parsed.get("message").and_then(Value::as_str))
            .unwrap_or("unknown stream error");
        return StreamStep::Failed(PixelError::Transport(message.to_string()));
    }

    match parsed.get("b64_json").and_then(Value::as_str) {
        Some(b64) => StreamStep::Frame {
            payload: BASE64
                .decode(b64.as_bytes())
                .map_err(|err| PixelError::InvalidImageData(format!("base64 decode failed: {err}"))),
            terminal,
        },
        None if terminal => StreamStep::Done,
        None => StreamStep::Skip,
    }
}
