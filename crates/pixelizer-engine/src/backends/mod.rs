use std::collections::BTreeMap;
use std::time::Duration;

use pixelizer_contracts::config::{PixelizerConfig, Quality, TransportConfig};

use crate::buffer::NormalizedImage;
use crate::error::{PixelError, Result};

pub mod dryrun;
pub mod openai;
pub mod sse;

pub use dryrun::DryrunBackend;
pub use openai::OpenAiBackend;

/// Lazily produced output payloads for one request.
///
/// Pulling may block on network I/O. A failing element does not invalidate
/// the ones already returned.
pub type ResultStream = Box<dyn Iterator<Item = Result<Vec<u8>>>>;

/// One image-edit submission.
#[derive(Debug, Clone, PartialEq)]
pub struct EditRequest {
    pub model: String,
    pub quality: Quality,
    pub size: String,
    pub prompt: String,
    pub images: Vec<NormalizedImage>,
    pub stream: bool,
    pub partial_images: u8,
    /// Largest decoded frame the caller will accept; bounds streamed events.
    pub max_payload_bytes: usize,
}

impl EditRequest {
    pub fn from_config(
        config: &PixelizerConfig,
        prompt: impl Into<String>,
        images: Vec<NormalizedImage>,
    ) -> Self {
        Self {
            model: config.model.clone(),
            quality: config.quality,
            size: config.size.clone(),
            prompt: prompt.into(),
            images,
            stream: config.stream,
            partial_images: config.partial_images,
            max_payload_bytes: config.max_payload_bytes,
        }
    }

    pub fn input_filenames(&self) -> Vec<String> {
        self.images
            .iter()
            .map(|image| image.filename().to_string())
            .collect()
    }
}

pub trait ImageBackend {
    fn name(&self) -> &str;
    fn edit(&self, request: &EditRequest) -> Result<ResultStream>;
}

#[derive(Default)]
pub struct BackendRegistry {
    backends: BTreeMap<String, Box<dyn ImageBackend>>,
    unavailable: BTreeMap<String, String>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<B: ImageBackend + 'static>(&mut self, backend: B) {
        self.backends
            .insert(backend.name().to_string(), Box::new(backend));
    }

    /// Remembers why `name` could not be constructed.
    pub fn mark_unavailable(&mut self, name: &str, reason: impl Into<String>) {
        self.unavailable.insert(name.to_string(), reason.into());
    }

    pub fn get(&self, name: &str) -> Option<&dyn ImageBackend> {
        self.backends.get(name).map(|backend| backend.as_ref())
    }

    /// Removes and returns the named backend so it can be owned by a client.
    pub fn take(&mut self, name: &str) -> Result<Box<dyn ImageBackend>> {
        if let Some(backend) = self.backends.remove(name) {
            return Ok(backend);
        }
        Err(PixelError::ModelUnavailable(
            match self.unavailable.get(name) {
                Some(reason) => reason.clone(),
                None => format!(
                    "unknown backend '{name}' (available: {})",
                    self.names().join(", ")
                ),
            },
        ))
    }

    pub fn names(&self) -> Vec<String> {
        self.backends.keys().cloned().collect()
    }
}

/// Registry with the offline backend plus the HTTP one when it can be built.
pub fn default_backend_registry(transport: &TransportConfig, timeout: Duration) -> BackendRegistry {
    let mut registry = BackendRegistry::new();
    registry.register(DryrunBackend);
    match OpenAiBackend::new(transport.clone(), timeout) {
        Ok(backend) => registry.register(backend),
        Err(PixelError::ModelUnavailable(reason)) => registry.mark_unavailable("openai", reason),
        Err(err) => registry.mark_unavailable("openai", err.to_string()),
    }
    registry
}
