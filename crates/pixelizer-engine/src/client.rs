use pixelizer_contracts::config::{PixelizerConfig, SubmissionMode};
use pixelizer_contracts::runs::receipts::ReceiptRequest;

use crate::backends::{EditRequest, ImageBackend, ResultStream};
use crate::buffer::{NormalizedImage, DEFAULT_FILENAME};
use crate::compositor::concatenate_buffers;
use crate::error::{PixelError, Result};
use crate::prompt::{prompt_digest, PromptBuilder};
use crate::references::ReferenceSet;

/// A started generation: what was submitted plus its lazy output.
pub struct Generation {
    pub request: Option<ReceiptRequest>,
    pub frames: ResultStream,
}

impl Generation {
    pub fn from_frames(frames: ResultStream) -> Self {
        Self {
            request: None,
            frames,
        }
    }
}

/// Anything that can turn a normalized target image into output frames.
pub trait Pixelize {
    fn generate(&self, target: &NormalizedImage) -> Result<Generation>;
}

/// Generation client bound to one reference set, prompt and backend.
pub struct Pixelizer {
    config: PixelizerConfig,
    references: ReferenceSet,
    prompt: String,
    backend: Box<dyn ImageBackend>,
}

impl Pixelizer {
    pub fn new(
        config: PixelizerConfig,
        references: ReferenceSet,
        backend: Box<dyn ImageBackend>,
    ) -> Self {
        let prompt = PromptBuilder::new(references.len()).build();
        Self {
            config,
            references,
            prompt,
            backend,
        }
    }

    /// Loads the reference set described by `config` and binds `backend`.
    pub fn load(config: PixelizerConfig, backend: Box<dyn ImageBackend>) -> Result<Self> {
        let references = ReferenceSet::load(&config)?;
        Ok(Self::new(config, references, backend))
    }

    pub fn config(&self) -> &PixelizerConfig {
        &self.config
    }

    pub fn references(&self) -> &ReferenceSet {
        &self.references
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// `[target] + references`, or a single canvas of the same sequence in
    /// composite mode.
    pub fn assemble_inputs(&self, target: &NormalizedImage) -> Result<Vec<NormalizedImage>> {
        let target = target.clone().with_filename(DEFAULT_FILENAME);
        match self.config.submission {
            SubmissionMode::Direct => {
                let mut images = Vec::with_capacity(self.references.len() + 1);
                images.push(target);
                images.extend(self.references.images().iter().cloned());
                Ok(images)
            }
            SubmissionMode::Composite => {
                let mut sequence = vec![&target];
                sequence.extend(self.references.images());
                let canvas = concatenate_buffers(&sequence, self.config.composite_direction)?
                    .ok_or(PixelError::NoInput)?;
                Ok(vec![canvas])
            }
        }
    }

    pub fn edit_request(&self, target: &NormalizedImage) -> Result<EditRequest> {
        let images = self.assemble_inputs(target)?;
        Ok(EditRequest::from_config(&self.config, self.prompt.clone(), images))
    }

    fn receipt_request(&self, request: &EditRequest) -> ReceiptRequest {
        ReceiptRequest {
            backend: self.backend.name().to_string(),
            model: request.model.clone(),
            quality: request.quality,
            size: request.size.clone(),
            submission: self.config.submission,
            stream: request.stream,
            input_files: request.input_filenames(),
            prompt_sha256: prompt_digest(&request.prompt),
        }
    }
}

impl Pixelize for Pixelizer {
    fn generate(&self, target: &NormalizedImage) -> Result<Generation> {
        let request = self.edit_request(target)?;
        let frames = self.backend.edit(&request)?;
        Ok(Generation {
            request: Some(self.receipt_request(&request)),
            frames,
        })
    }
}

/// A generation client, or the reason one could not be built.
pub enum ClientHandle {
    Ready(Box<dyn Pixelize>),
    Unavailable(String),
}

impl ClientHandle {
    pub fn ready(client: impl Pixelize + 'static) -> Self {
        Self::Ready(Box::new(client))
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable(reason.into())
    }

    pub fn from_result<P: Pixelize + 'static>(result: Result<P>) -> Self {
        match result {
            Ok(client) => Self::ready(client),
            Err(PixelError::ModelUnavailable(reason)) => Self::Unavailable(reason),
            Err(err) => Self::unavailable(err.to_string()),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    pub fn client(&self) -> Result<&dyn Pixelize> {
        match self {
            Self::Ready(client) => Ok(client.as_ref()),
            Self::Unavailable(reason) => Err(PixelError::ModelUnavailable(reason.clone())),
        }
    }
}

impl std::fmt::Debug for ClientHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ready(_) => f.write_str("ClientHandle::Ready"),
            Self::Unavailable(reason) => write!(f, "ClientHandle::Unavailable({reason})"),
        }
    }
}
