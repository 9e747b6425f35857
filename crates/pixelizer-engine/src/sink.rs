//! Resilient consumer of generation output.
//!
//! Every failure mode of a single request ends in at most one terminal `None`
//! plus a signal; nothing here propagates an error to the caller. Frames that
//! fail to decode are skipped so one bad event never costs the whole result.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat, ImageReader, RgbaImage};
use pixelizer_contracts::config::PixelizerConfig;
use pixelizer_contracts::events::{EventPayload, EventWriter, Notifier};
use pixelizer_contracts::runs::receipts::{build_receipt, write_receipt, GenerationReceipt, ReceiptRequest};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::backends::ResultStream;
use crate::client::{ClientHandle, Generation};
use crate::error::{PixelError, Result};
use crate::loader::{normalize_image, Bounds};

pub const SUPPORTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "bmp", "gif", "tif", "tiff"];

/// Decodes one output payload into RGBA.
///
/// Checks run in order: empty, over `ceiling` bytes, undecodable.
pub fn decode_chunk(bytes: &[u8], ceiling: usize) -> Result<RgbaImage> {
    if bytes.is_empty() {
        return Err(PixelError::EmptyPayload);
    }
    if bytes.len() > ceiling {
        return Err(PixelError::OversizedPayload {
            len: bytes.len(),
            limit: ceiling,
        });
    }
    image::load_from_memory(bytes)
        .map(DynamicImage::into_rgba8)
        .map_err(|err| PixelError::InvalidImageData(err.to_string()))
}

/// True when `path` exists and carries a known image extension.
pub fn is_supported_image_path(path: &Path) -> bool {
    let known = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()));
    known && path.is_file()
}

/// Opens an image after a header-only verify pass, then decodes it to RGBA.
pub fn safe_open_image_as_rgba(path: &Path) -> Result<RgbaImage> {
    let bytes = fs::read(path).map_err(|err| PixelError::io(path, err))?;
    ImageReader::new(Cursor::new(bytes.as_slice()))
        .with_guessed_format()
        .map_err(|err| PixelError::io(path, err))?
        .into_dimensions()
        .map_err(|err| {
            PixelError::Decode(format!("{} failed verification: {err}", path.display()))
        })?;
    image::load_from_memory(&bytes)
        .map(DynamicImage::into_rgba8)
        .map_err(|err| PixelError::Decode(format!("{}: {err}", path.display())))
}

/// Counters for one processed request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SinkOutcome {
    pub generation_id: Option<String>,
    pub output_path: Option<PathBuf>,
    pub frames_decoded: u64,
    pub frames_skipped: u64,
    pub failed: bool,
}

/// Wraps a [`ClientHandle`] with the request-level failure policy.
pub struct ResultSink<N: Notifier> {
    client: ClientHandle,
    notifier: N,
    events: Option<EventWriter>,
    output_dir: PathBuf,
    max_payload_bytes: usize,
    bounds: Bounds,
}

impl<N: Notifier> ResultSink<N> {
    pub fn new(client: ClientHandle, notifier: N, config: &PixelizerConfig) -> Self {
        Self {
            client,
            notifier,
            events: None,
            output_dir: config.output_dir.clone(),
            max_payload_bytes: config.max_payload_bytes,
            bounds: Bounds::from_config(config),
        }
    }

    pub fn with_events(mut self, events: EventWriter) -> Self {
        self.events = Some(events);
        self
    }

    pub fn client(&self) -> &ClientHandle {
        &self.client
    }

    pub fn replace_client(&mut self, client: ClientHandle) {
        self.client = client;
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Lazily runs one request for `input`.
    ///
    /// Yields `Some(image)` per decoded frame, or a single `Some(None)` when
    /// the request produced nothing usable.
    pub fn process(&self, input: Option<&Path>) -> SinkStream<'_, N> {
        SinkStream {
            sink: self,
            stage: Stage::Pending(input.map(Path::to_path_buf)),
            outcome: SinkOutcome::default(),
        }
    }

    fn emit(&self, event_type: &str, payload: Value) {
        let Some(events) = self.events.as_ref() else {
            return;
        };
        let payload = match payload {
            Value::Object(fields) => fields,
            _ => EventPayload::new(),
        };
        if let Err(err) = events.emit(event_type, payload) {
            eprintln!("pixelizer: failed to record {event_type}: {err:#}");
        }
    }

    fn start(&self, input: &Path) -> Result<Generation> {
        let client = self.client.client()?;
        if !is_supported_image_path(input) {
            let unsupported = PixelError::UnsupportedExtension(input.to_path_buf());
            self.notifier
                .warning(&format!("{unsupported}; trying to open it anyway."));
        }
        let rgba = safe_open_image_as_rgba(input)?;
        let target = normalize_image(DynamicImage::ImageRgba8(rgba), self.bounds)?;
        client.generate(&target)
    }
}

enum Stage {
    Pending(Option<PathBuf>),
    Streaming(Active),
    Done,
}

struct Active {
    frames: ResultStream,
    request: Option<ReceiptRequest>,
    generation_id: String,
    output_path: PathBuf,
    warnings: Vec<String>,
}

/// Iterator returned by [`ResultSink::process`].
pub struct SinkStream<'a, N: Notifier> {
    sink: &'a ResultSink<N>,
    stage: Stage,
    outcome: SinkOutcome,
}

impl<N: Notifier> SinkStream<'_, N> {
    pub fn outcome(&self) -> &SinkOutcome {
        &self.outcome
    }

    fn fail(&mut self, message: String) -> Option<Option<RgbaImage>> {
        self.sink.notifier.error(&message);
        self.outcome.failed = true;
        self.stage = Stage::Done;
        Some(None)
    }

    fn begin(&mut self, input: Option<PathBuf>) -> Option<Option<RgbaImage>> {
        let Some(input) = input else {
            self.sink
                .notifier
                .warning("No input image supplied. Upload a photo first.");
            self.outcome.failed = true;
            self.stage = Stage::Done;
            return Some(None);
        };

        let generation = match self.sink.start(&input) {
            Ok(generation) => generation,
            Err(PixelError::ModelUnavailable(reason)) => {
                return self.fail(format!("Model not initialized: {reason}"))
            }
            Err(err @ (PixelError::Decode(_) | PixelError::Io { .. } | PixelError::Read(_))) => {
                return self.fail(format!("Could not open input image: {err}"))
            }
            Err(err) => return self.fail(format!("Pixelization failed: {err}")),
        };

        let generation_id = Uuid::new_v4().simple().to_string()[..8].to_string();
        let output_path = self
            .sink
            .output_dir
            .join(format!("pixelized_{generation_id}.png"));
        self.sink.emit(
            "generation_started",
            json!({
                "generation_id": generation_id,
                "input": input.to_string_lossy(),
                "output_path": output_path.to_string_lossy(),
                "request": generation.request,
            }),
        );
        self.outcome.generation_id = Some(generation_id.clone());
        self.stage = Stage::Streaming(Active {
            frames: generation.frames,
            request: generation.request,
            generation_id,
            output_path,
            warnings: Vec::new(),
        });
        None
    }

    fn pull(&mut self) -> Option<Option<RgbaImage>> {
        let Stage::Streaming(active) = &mut self.stage else {
            return None;
        };
        let sink = self.sink;
        loop {
            let chunk = match active.frames.next() {
                Some(chunk) => chunk,
                None => return self.finish(),
            };
            let decoded = chunk.and_then(|bytes| decode_chunk(&bytes, sink.max_payload_bytes));
            let image = match decoded {
                Ok(image) => image,
                Err(err) => {
                    let message = format!("Skipping frame that could not be decoded: {err}");
                    sink.notifier.warning(&message);
                    active.warnings.push(message);
                    self.outcome.frames_skipped += 1;
                    sink.emit(
                        "frame_skipped",
                        json!({
                            "generation_id": active.generation_id,
                            "error": err.to_string(),
                        }),
                    );
                    continue;
                }
            };

            if let Err(err) = save_frame(&image, &active.output_path) {
                let message = format!("Pixelization failed: {err}");
                self.finish_receipt();
                return self.fail(message);
            }
            self.outcome.frames_decoded += 1;
            self.outcome.output_path = Some(active.output_path.clone());
            sink.emit(
                "frame_decoded",
                json!({
                    "generation_id": active.generation_id,
                    "index": self.outcome.frames_decoded - 1,
                    "width": image.width(),
                    "height": image.height(),
                    "output_path": active.output_path.to_string_lossy(),
                }),
            );
            return Some(Some(image));
        }
    }

    fn finish(&mut self) -> Option<Option<RgbaImage>> {
        self.finish_receipt();
        if self.outcome.frames_decoded == 0 {
            return self.fail(PixelError::NoOutputProduced.to_string());
        }
        self.stage = Stage::Done;
        None
    }

    fn finish_receipt(&mut self) {
        let Stage::Streaming(active) = &self.stage else {
            return;
        };
        let status = if self.outcome.frames_decoded == 0 {
            "failed"
        } else {
            "done"
        };
        self.sink.emit(
            "generation_finished",
            json!({
                "generation_id": active.generation_id,
                "status": status,
                "frames_decoded": self.outcome.frames_decoded,
                "frames_skipped": self.outcome.frames_skipped,
            }),
        );
        let Some(request) = active.request.clone() else {
            return;
        };
        let receipt = GenerationReceipt {
            generation_id: active.generation_id.clone(),
            request,
            output_path: self.outcome.output_path.clone(),
            frames_decoded: self.outcome.frames_decoded,
            frames_skipped: self.outcome.frames_skipped,
            warnings: active.warnings.clone(),
        };
        let path = self
            .sink
            .output_dir
            .join(format!("receipt-{}.json", active.generation_id));
        if let Err(err) = write_receipt(&path, &build_receipt(&receipt)) {
            self.sink
                .notifier
                .warning(&format!("Could not write receipt {}: {err:#}", path.display()));
        }
    }
}

impl<N: Notifier> Iterator for SinkStream<'_, N> {
    type Item = Option<RgbaImage>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match std::mem::replace(&mut self.stage, Stage::Done) {
                Stage::Pending(input) => {
                    if let Some(item) = self.begin(input) {
                        return Some(item);
                    }
                }
                Stage::Streaming(active) => {
                    self.stage = Stage::Streaming(active);
                    return self.pull();
                }
                Stage::Done => return None,
            }
        }
    }
}

fn save_frame(image: &RgbaImage, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| PixelError::io(parent, err))?;
    }
    image
        .save_with_format(path, ImageFormat::Png)
        .map_err(|err| PixelError::Encode(format!("{}: {err}", path.display())))
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::fs;
    use std::io::Cursor;
    use std::path::{Path, PathBuf};
    use std::rc::Rc;

    use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
    use pixelizer_contracts::config::{PixelizerConfig, Quality, SubmissionMode};
    use pixelizer_contracts::events::{EventWriter, MemoryNotifier, SignalLevel};
    use pixelizer_contracts::runs::receipts::ReceiptRequest;
    use serde_json::Value;

    use super::{decode_chunk, is_supported_image_path, safe_open_image_as_rgba, ResultSink};
    use crate::buffer::NormalizedImage;
    use crate::client::{ClientHandle, Generation, Pixelize};
    use crate::error::{PixelError, Result};

    struct FakeClient {
        frames: RefCell<Vec<Result<Vec<u8>>>>,
        calls: Rc<Cell<usize>>,
        with_request: bool,
    }

    impl FakeClient {
        fn new(frames: Vec<Result<Vec<u8>>>) -> (Self, Rc<Cell<usize>>) {
            let calls = Rc::new(Cell::new(0));
            let client = Self {
                frames: RefCell::new(frames),
                calls: calls.clone(),
                with_request: false,
            };
            (client, calls)
        }
    }

    impl Pixelize for FakeClient {
        fn generate(&self, _target: &NormalizedImage) -> Result<Generation> {
            self.calls.set(self.calls.get() + 1);
            let frames = std::mem::take(&mut *self.frames.borrow_mut());
            let mut generation = Generation::from_frames(Box::new(frames.into_iter()));
            if self.with_request {
                generation.request = Some(ReceiptRequest {
                    backend: "fake".to_string(),
                    model: "gpt-image-1".to_string(),
                    quality: Quality::Medium,
                    size: "4x4".to_string(),
                    submission: SubmissionMode::Direct,
                    stream: true,
                    input_files: vec!["image.png".to_string()],
                    prompt_sha256: "00".repeat(32),
                });
            }
            Ok(generation)
        }
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([9, 8, 7, 255])))
            .write_to(&mut cursor, ImageFormat::Png)
            .unwrap();
        cursor.into_inner()
    }

    fn config(output_dir: &Path) -> PixelizerConfig {
        PixelizerConfig {
            output_dir: output_dir.to_path_buf(),
            max_payload_bytes: 4096,
            ..PixelizerConfig::default()
        }
    }

    fn input_file(dir: &Path, name: &str) -> anyhow::Result<PathBuf> {
        let path = dir.join(name);
        fs::write(&path, png(6, 6))?;
        Ok(path)
    }

    #[test]
    fn decode_chunk_classifies_payloads() {
        assert!(matches!(decode_chunk(&[], 10), Err(PixelError::EmptyPayload)));
        assert!(matches!(
            decode_chunk(&png(2, 2), 8),
            Err(PixelError::OversizedPayload { limit: 8, .. })
        ));
        assert!(matches!(
            decode_chunk(b"not an image", 1024),
            Err(PixelError::InvalidImageData(_))
        ));
        let image = decode_chunk(&png(3, 5), 1 << 20).unwrap();
        assert_eq!(image.dimensions(), (3, 5));
    }

    #[test]
    fn oversized_check_applies_to_any_ceiling() {
        let bytes = png(4, 4);
        for ceiling in [1, bytes.len() / 2, bytes.len() - 1] {
            assert!(matches!(
                decode_chunk(&bytes, ceiling),
                Err(PixelError::OversizedPayload { .. })
            ));
        }
        assert!(decode_chunk(&bytes, bytes.len()).is_ok());
    }

    #[test]
    fn missing_input_warns_once_without_calling_client() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let (client, calls) = FakeClient::new(vec![Ok(png(2, 2))]);
        let notifier = MemoryNotifier::new();
        let sink = ResultSink::new(ClientHandle::ready(client), &notifier, &config(temp.path()));

        let results: Vec<_> = sink.process(None).collect();
        assert_eq!(results.len(), 1);
        assert!(results[0].is_none());
        assert_eq!(notifier.count(SignalLevel::Warning), 1);
        assert_eq!(notifier.count(SignalLevel::Error), 0);
        assert_eq!(calls.get(), 0);
        Ok(())
    }

    #[test]
    fn empty_stream_reports_no_output() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let input = input_file(temp.path(), "person.png")?;
        let (client, calls) = FakeClient::new(Vec::new());
        let notifier = MemoryNotifier::new();
        let sink = ResultSink::new(ClientHandle::ready(client), &notifier, &config(temp.path()));

        let results: Vec<_> = sink.process(Some(&input)).collect();
        assert_eq!(results.len(), 1);
        assert!(results[0].is_none());
        assert_eq!(calls.get(), 1);

        let errors: Vec<_> = notifier
            .signals()
            .into_iter()
            .filter(|(level, _)| *level == SignalLevel::Error)
            .collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].1, PixelError::NoOutputProduced.to_string());
        Ok(())
    }

    #[test]
    fn only_bad_chunks_end_in_no_output() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let input = input_file(temp.path(), "person.png")?;
        let (client, _) = FakeClient::new(vec![Ok(b"garbage".to_vec())]);
        let notifier = MemoryNotifier::new();
        let sink = ResultSink::new(ClientHandle::ready(client), &notifier, &config(temp.path()));

        let mut stream = sink.process(Some(&input));
        let results: Vec<_> = stream.by_ref().collect();
        assert_eq!(results.len(), 1);
        assert!(results[0].is_none());
        assert_eq!(notifier.count(SignalLevel::Warning), 1);
        assert_eq!(notifier.count(SignalLevel::Error), 1);
        assert!(stream.outcome().failed);
        assert_eq!(stream.outcome().frames_skipped, 1);
        Ok(())
    }

    #[test]
    fn corrupt_chunk_is_skipped_and_valid_one_kept() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let input = input_file(temp.path(), "person.png")?;
        let (client, _) = FakeClient::new(vec![Ok(b"\x89PNG broken".to_vec()), Ok(png(4, 7))]);
        let notifier = MemoryNotifier::new();
        let sink = ResultSink::new(ClientHandle::ready(client), &notifier, &config(temp.path()));

        let mut stream = sink.process(Some(&input));
        let results: Vec<_> = stream.by_ref().collect();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].as_ref().map(|image| image.dimensions()), Some((4, 7)));
        assert_eq!(notifier.count(SignalLevel::Warning), 1);
        assert_eq!(notifier.count(SignalLevel::Error), 0);

        let outcome = stream.outcome();
        assert!(!outcome.failed);
        assert_eq!(outcome.frames_decoded, 1);
        let written = image::open(outcome.output_path.as_ref().unwrap())?;
        assert_eq!((written.width(), written.height()), (4, 7));
        Ok(())
    }

    #[test]
    fn stream_errors_do_not_discard_earlier_frames() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let input = input_file(temp.path(), "person.png")?;
        let (client, _) = FakeClient::new(vec![
            Ok(png(2, 2)),
            Err(PixelError::Transport("connection reset".to_string())),
            Ok(vec![]),
            Ok(png(3, 3)),
        ]);
        let notifier = MemoryNotifier::new();
        let sink = ResultSink::new(ClientHandle::ready(client), &notifier, &config(temp.path()));

        let sizes: Vec<_> = sink
            .process(Some(&input))
            .map(|frame| frame.map(|image| image.dimensions()))
            .collect();
        assert_eq!(sizes, vec![Some((2, 2)), Some((3, 3))]);
        assert_eq!(notifier.count(SignalLevel::Warning), 2);
        Ok(())
    }

    #[test]
    fn unavailable_client_short_circuits() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let notifier = MemoryNotifier::new();
        let sink = ResultSink::new(
            ClientHandle::unavailable("OPENAI_API_KEY not set"),
            &notifier,
            &config(temp.path()),
        );

        let missing = temp.path().join("never-read.png");
        let results: Vec<_> = sink.process(Some(&missing)).collect();
        assert_eq!(results.len(), 1);
        assert!(results[0].is_none());
        assert_eq!(notifier.count(SignalLevel::Warning), 0);
        let signals = notifier.signals();
        assert_eq!(signals.len(), 1);
        assert!(signals[0].1.contains("not initialized"));
        Ok(())
    }

    #[test]
    fn corrupt_input_fails_fast() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let input = temp.path().join("broken.png");
        fs::write(&input, b"\x89PNG\r\n\x1a\nthis is not a png")?;
        let (client, calls) = FakeClient::new(vec![Ok(png(2, 2))]);
        let notifier = MemoryNotifier::new();
        let sink = ResultSink::new(ClientHandle::ready(client), &notifier, &config(temp.path()));

        let results: Vec<_> = sink.process(Some(&input)).collect();
        assert_eq!(results.len(), 1);
        assert!(results[0].is_none());
        assert_eq!(calls.get(), 0);
        assert_eq!(notifier.count(SignalLevel::Error), 1);
        assert!(notifier.signals()[0].1.contains("Could not open input image"));
        Ok(())
    }

    #[test]
    fn unknown_extension_only_warns() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let input = input_file(temp.path(), "capture.tmp")?;
        assert!(!is_supported_image_path(&input));
        let (client, _) = FakeClient::new(vec![Ok(png(2, 2))]);
        let notifier = MemoryNotifier::new();
        let sink = ResultSink::new(ClientHandle::ready(client), &notifier, &config(temp.path()));

        let results: Vec<_> = sink.process(Some(&input)).collect();
        assert_eq!(results.len(), 1);
        assert!(results[0].is_some());
        assert_eq!(notifier.count(SignalLevel::Warning), 1);
        assert_eq!(notifier.count(SignalLevel::Error), 0);
        let warning = &notifier.signals()[0].1;
        assert!(warning.starts_with(&PixelError::UnsupportedExtension(input.clone()).to_string()));
        assert!(warning.ends_with("trying to open it anyway."));
        Ok(())
    }

    #[test]
    fn frame_write_failure_ends_in_single_error() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let input = input_file(temp.path(), "person.png")?;
        fs::write(temp.path().join("blocker"), b"regular file")?;
        let (client, calls) = FakeClient::new(vec![Ok(png(2, 2)), Ok(png(3, 3))]);
        let notifier = MemoryNotifier::new();
        let sink = ResultSink::new(
            ClientHandle::ready(client),
            &notifier,
            &config(&temp.path().join("blocker").join("out")),
        );

        let mut stream = sink.process(Some(&input));
        let results: Vec<_> = stream.by_ref().collect();
        assert_eq!(results.len(), 1);
        assert!(results[0].is_none());
        assert_eq!(calls.get(), 1);
        assert_eq!(notifier.count(SignalLevel::Warning), 0);
        assert_eq!(notifier.count(SignalLevel::Error), 1);
        assert!(notifier.signals()[0].1.starts_with("Pixelization failed:"));

        let outcome = stream.outcome();
        assert!(outcome.failed);
        assert_eq!(outcome.frames_decoded, 0);
        assert!(outcome.output_path.is_none());
        Ok(())
    }

    #[test]
    fn receipt_and_events_are_written() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let input = input_file(temp.path(), "person.png")?;
        let (mut client, _) = FakeClient::new(vec![Ok(png(2, 2)), Ok(b"bad".to_vec()), Ok(png(2, 2))]);
        client.with_request = true;
        let events_path = temp.path().join("events.jsonl");
        let notifier = MemoryNotifier::new();
        let sink = ResultSink::new(ClientHandle::ready(client), &notifier, &config(temp.path()))
            .with_events(EventWriter::new(&events_path, "session-1"));

        let mut stream = sink.process(Some(&input));
        assert_eq!(stream.by_ref().flatten().count(), 2);
        let generation_id = stream.outcome().generation_id.clone().unwrap();
        assert_eq!(generation_id.len(), 8);
        assert!(temp
            .path()
            .join(format!("pixelized_{generation_id}.png"))
            .is_file());

        let receipt: Value = serde_json::from_str(&fs::read_to_string(
            temp.path().join(format!("receipt-{generation_id}.json")),
        )?)?;
        assert_eq!(receipt["schema_version"], 1);
        assert_eq!(receipt["frames_decoded"], 2);
        assert_eq!(receipt["frames_skipped"], 1);
        assert_eq!(receipt["request"]["backend"], "fake");

        let types: Vec<String> = fs::read_to_string(&events_path)?
            .lines()
            .map(|line| serde_json::from_str::<Value>(line).unwrap()["type"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(
            types,
            vec![
                "generation_started",
                "frame_decoded",
                "frame_skipped",
                "frame_decoded",
                "generation_finished",
            ]
        );
        Ok(())
    }

    #[test]
    fn safe_open_rejects_truncated_files() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let good = input_file(temp.path(), "good.png")?;
        assert_eq!(safe_open_image_as_rgba(&good)?.dimensions(), (6, 6));

        let truncated = temp.path().join("cut.png");
        let bytes = png(6, 6);
        fs::write(&truncated, &bytes[..bytes.len() / 2])?;
        assert!(matches!(
            safe_open_image_as_rgba(&truncated),
            Err(PixelError::Decode(_))
        ));
        Ok(())
    }
}
