use std::path::{Path, PathBuf};

use anyhow::Result;
use image::RgbaImage;
use pixelizer_contracts::events::{EventPayload, EventWriter, Notifier};
use pixelizer_contracts::runs::summary::{now_utc_iso, write_summary, SessionSummary};
use serde_json::Value;

use crate::client::ClientHandle;
use crate::sink::{ResultSink, SinkOutcome};

/// Session state behind the upload / generate / reset surface.
pub struct FrontEnd<N: Notifier> {
    sink: ResultSink<N>,
    events: Option<EventWriter>,
    session_id: String,
    started_at: String,
    summary_path: Option<PathBuf>,
    input: Option<PathBuf>,
    output: Option<RgbaImage>,
    last_outcome: Option<SinkOutcome>,
    total_generations: u64,
    total_frames: u64,
    total_failures: u64,
}

impl<N: Notifier> FrontEnd<N> {
    pub fn new(sink: ResultSink<N>, session_id: impl Into<String>) -> Self {
        Self {
            sink,
            events: None,
            session_id: session_id.into(),
            started_at: now_utc_iso(),
            summary_path: None,
            input: None,
            output: None,
            last_outcome: None,
            total_generations: 0,
            total_frames: 0,
            total_failures: 0,
        }
    }

    /// Records the session in `events` and writes `summary.json` on finish.
    pub fn with_session_log(
        mut self,
        events: EventWriter,
        summary_path: impl Into<PathBuf>,
    ) -> Result<Self> {
        let mut payload = EventPayload::new();
        payload.insert(
            "output_dir".to_string(),
            Value::String(self.sink.output_dir().to_string_lossy().to_string()),
        );
        payload.insert("client_ready".to_string(), Value::Bool(self.sink.client().is_ready()));
        events.emit("session_started", payload)?;
        self.events = Some(events);
        self.summary_path = Some(summary_path.into());
        Ok(self)
    }

    pub fn sink(&self) -> &ResultSink<N> {
        &self.sink
    }

    /// Swaps the generation client, e.g. after a settings change.
    pub fn replace_client(&mut self, client: ClientHandle) {
        self.sink.replace_client(client);
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn upload(&mut self, path: impl Into<PathBuf>) {
        self.input = Some(path.into());
    }

    pub fn input(&self) -> Option<&Path> {
        self.input.as_deref()
    }

    pub fn output(&self) -> Option<&RgbaImage> {
        self.output.as_ref()
    }

    pub fn last_outcome(&self) -> Option<&SinkOutcome> {
        self.last_outcome.as_ref()
    }

    /// Runs one generation for the current input, calling `on_frame` with
    /// each image as it arrives. Returns the last displayed image.
    pub fn generate<F>(&mut self, mut on_frame: F) -> Option<&RgbaImage>
    where
        F: FnMut(&RgbaImage),
    {
        self.total_generations += 1;
        let mut stream = self.sink.process(self.input.as_deref());
        for frame in stream.by_ref() {
            match frame {
                Some(image) => {
                    on_frame(&image);
                    self.output = Some(image);
                }
                None => self.output = None,
            }
        }
        let outcome = stream.outcome().clone();
        self.total_frames += outcome.frames_decoded;
        if outcome.failed {
            self.total_failures += 1;
        }
        self.last_outcome = Some(outcome);
        self.output.as_ref()
    }

    /// Clears input and output. Always returns `(None, None)`.
    pub fn reset(&mut self) -> (Option<PathBuf>, Option<RgbaImage>) {
        self.input = None;
        self.output = None;
        (None, None)
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            session_id: self.session_id.clone(),
            started_at: self.started_at.clone(),
            finished_at: now_utc_iso(),
            total_generations: self.total_generations,
            total_frames: self.total_frames,
            total_failures: self.total_failures,
        }
    }

    /// Writes the session summary and the closing event, if configured.
    pub fn finish(self) -> Result<SessionSummary> {
        let summary = self.summary();
        if let Some(path) = self.summary_path.as_deref() {
            write_summary(path, &summary)?;
        }
        if let Some(events) = self.events.as_ref() {
            let mut payload = EventPayload::new();
            payload.insert("total_generations".to_string(), summary.total_generations.into());
            payload.insert("total_frames".to_string(), summary.total_frames.into());
            payload.insert("total_failures".to_string(), summary.total_failures.into());
            events.emit("session_finished", payload)?;
        }
        Ok(summary)
    }
}
