use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};

pub type EventPayload = Map<String, Value>;

/// Append-only writer for `events.jsonl`.
///
/// - default fields are `type`, `session_id`, `ts`
/// - caller payload is merged last and can override defaults
/// - one compact JSON object per line
#[derive(Debug, Clone)]
pub struct EventWriter {
    inner: Arc<EventWriterInner>,
}

#[derive(Debug)]
struct EventWriterInner {
    path: PathBuf,
    session_id: String,
    lock: Mutex<()>,
}

impl EventWriter {
    pub fn new(path: impl Into<PathBuf>, session_id: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(EventWriterInner {
                path: path.into(),
                session_id: session_id.into(),
                lock: Mutex::new(()),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    pub fn session_id(&self) -> &str {
        &self.inner.session_id
    }

    pub fn emit(&self, event_type: &str, payload: EventPayload) -> anyhow::Result<Value> {
        let mut event = Map::new();
        event.insert("type".to_string(), Value::String(event_type.to_string()));
        event.insert(
            "session_id".to_string(),
            Value::String(self.inner.session_id.clone()),
        );
        event.insert("ts".to_string(), Value::String(now_utc_iso()));
        for (key, value) in payload {
            event.insert(key, value);
        }

        if let Some(parent) = self.inner.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let line = serde_json::to_string(&event)?;
        let _guard = self
            .inner
            .lock
            .lock()
            .map_err(|_| anyhow::anyhow!("event writer lock poisoned"))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.inner.path)?;
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")?;

        Ok(Value::Object(event))
    }
}

/// Severity of a user-facing signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SignalLevel {
    Info,
    Warning,
    Error,
}

impl SignalLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for SignalLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receiver for user-facing messages raised while a request runs.
///
/// Implementations must not fail: a signal that cannot be delivered is dropped.
pub trait Notifier {
    fn notify(&self, level: SignalLevel, message: &str);

    fn info(&self, message: &str) {
        self.notify(SignalLevel::Info, message);
    }

    fn warning(&self, message: &str) {
        self.notify(SignalLevel::Warning, message);
    }

    fn error(&self, message: &str) {
        self.notify(SignalLevel::Error, message);
    }
}

/// Writes every signal to the event log as a `signal` event and echoes
/// warnings and errors to stderr.
#[derive(Debug, Clone)]
pub struct EventNotifier {
    events: EventWriter,
    echo: bool,
}

impl EventNotifier {
    pub fn new(events: EventWriter) -> Self {
        Self { events, echo: true }
    }

    pub fn quiet(events: EventWriter) -> Self {
        Self {
            events,
            echo: false,
        }
    }

    pub fn events(&self) -> &EventWriter {
        &self.events
    }
}

impl Notifier for EventNotifier {
    fn notify(&self, level: SignalLevel, message: &str) {
        let mut payload = EventPayload::new();
        payload.insert("level".to_string(), Value::String(level.to_string()));
        payload.insert("message".to_string(), Value::String(message.to_string()));
        if let Err(err) = self.events.emit("signal", payload) {
            eprintln!("pixelizer: failed to record signal: {err:#}");
        }
        if self.echo && level >= SignalLevel::Warning {
            eprintln!("[{level}] {message}");
        }
    }
}

/// Keeps signals in memory, in arrival order.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    signals: Mutex<Vec<(SignalLevel, String)>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signals(&self) -> Vec<(SignalLevel, String)> {
        self.signals
            .lock()
            .map(|rows| rows.clone())
            .unwrap_or_default()
    }

    pub fn count(&self, level: SignalLevel) -> usize {
        self.signals()
            .iter()
            .filter(|(row_level, _)| *row_level == level)
            .count()
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, level: SignalLevel, message: &str) {
        if let Ok(mut rows) = self.signals.lock() {
            rows.push((level, message.to_string()));
        }
    }
}

impl<N: Notifier + ?Sized> Notifier for &N {
    fn notify(&self, level: SignalLevel, message: &str) {
        (**self).notify(level, message);
    }
}

fn now_utc_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}
