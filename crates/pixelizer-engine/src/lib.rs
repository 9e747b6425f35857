//! Image preparation, remote edit calls and streamed-result assembly for
//! turning a photographed person into a pixel-art character.
//!
//! Data flows leaf-first: [`loader`] normalizes the target, [`compositor`]
//! optionally merges it with the reference set, [`client::Pixelizer`] submits
//! the edit through an [`backends::ImageBackend`], and [`sink::ResultSink`]
//! decodes, persists and hands frames to the [`frontend::FrontEnd`].

pub mod backends;
pub mod buffer;
pub mod client;
pub mod compositor;
pub mod error;
pub mod frontend;
pub mod loader;
pub mod prompt;
pub mod references;
pub mod sink;

pub use backends::{
    default_backend_registry, BackendRegistry, DryrunBackend, EditRequest, ImageBackend,
    OpenAiBackend, ResultStream,
};
pub use buffer::NormalizedImage;
pub use client::{ClientHandle, Generation, Pixelize, Pixelizer};
pub use compositor::{concatenate, concatenate_buffers, concatenate_paths};
pub use error::{PixelError, Result};
pub use frontend::FrontEnd;
pub use loader::{normalize, Bounds, ImageInput};
pub use pixelizer_contracts::config::{Direction, PixelizerConfig, Quality, SubmissionMode};
pub use prompt::{prompt_digest, PromptBuilder};
pub use references::ReferenceSet;
pub use sink::{decode_chunk, ResultSink, SinkOutcome, SinkStream};
