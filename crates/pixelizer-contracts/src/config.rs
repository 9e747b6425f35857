use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
pub const MAX_PARTIAL_IMAGES: u8 = 3;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}' ({reason})")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(key: &str, value: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Quality level forwarded to the remote edit endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Auto,
    Low,
    Medium,
    High,
    Standard,
    Hd,
}

impl Quality {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Standard => "standard",
            Self::Hd => "hd",
        }
    }
}

impl FromStr for Quality {
    type Err = ConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "standard" => Ok(Self::Standard),
            "hd" => Ok(Self::Hd),
            _ => Err(ConfigError::invalid(
                "quality",
                raw,
                "expected auto, low, medium, high, standard or hd",
            )),
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the target and the reference set are submitted.
///
/// `Direct` sends `[target] + references` as separate image parts;
/// `Composite` merges them into one canvas first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionMode {
    Direct,
    Composite,
}

impl SubmissionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Composite => "composite",
        }
    }
}

impl FromStr for SubmissionMode {
    type Err = ConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "direct" | "multi" => Ok(Self::Direct),
            "composite" | "canvas" => Ok(Self::Composite),
            _ => Err(ConfigError::invalid(
                "submission",
                raw,
                "expected direct or composite",
            )),
        }
    }
}

impl fmt::Display for SubmissionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Concatenation axis for composite canvases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Horizontal,
    Vertical,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Horizontal => "horizontal",
            Self::Vertical => "vertical",
        }
    }
}

impl FromStr for Direction {
    type Err = ConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "horizontal" | "h" => Ok(Self::Horizontal),
            "vertical" | "v" => Ok(Self::Vertical),
            _ => Err(ConfigError::invalid(
                "direction",
                raw,
                "expected horizontal or vertical",
            )),
        }
    }
}

/// Validates a `WxH` size string (or `auto`) and returns it normalized.
pub fn parse_size(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().to_ascii_lowercase();
    if trimmed == "auto" {
        return Ok(trimmed);
    }
    let Some((w, h)) = trimmed.split_once('x') else {
        return Err(ConfigError::invalid("size", raw, "expected WxH"));
    };
    let width = w.trim().parse::<u32>().ok().filter(|value| *value > 0);
    let height = h.trim().parse::<u32>().ok().filter(|value| *value > 0);
    match (width, height) {
        (Some(width), Some(height)) => Ok(format!("{width}x{height}")),
        _ => Err(ConfigError::invalid(
            "size",
            raw,
            "width and height must be positive integers",
        )),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PixelizerConfig {
    pub reference_dir: PathBuf,
    pub reference_prefix: String,
    pub reference_count: usize,
    pub reference_ext: String,
    pub model: String,
    pub quality: Quality,
    pub size: String,
    pub submission: SubmissionMode,
    pub composite_direction: Direction,
    pub stream: bool,
    pub partial_images: u8,
    pub max_width: u32,
    pub max_height: u32,
    pub max_payload_bytes: usize,
    pub output_dir: PathBuf,
    pub request_timeout_secs: u64,
}

impl Default for PixelizerConfig {
    fn default() -> Self {
        Self {
            reference_dir: PathBuf::from("input"),
            reference_prefix: "ref".to_string(),
            reference_count: 7,
            reference_ext: "png".to_string(),
            model: "gpt-image-1".to_string(),
            quality: Quality::Medium,
            size: "1024x1536".to_string(),
            submission: SubmissionMode::Direct,
            composite_direction: Direction::Horizontal,
            stream: true,
            partial_images: 2,
            max_width: 1024,
            max_height: 1024,
            max_payload_bytes: 20 * 1024 * 1024,
            output_dir: PathBuf::from("output"),
            request_timeout_secs: 300,
        }
    }
}

impl PixelizerConfig {
    /// Defaults overlaid with any `PIXELIZER_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_overrides(non_empty_env)?;
        Ok(config)
    }

    /// Applies overrides from a key lookup. Keys use the `PIXELIZER_*` names.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("PIXELIZER_REFERENCE_DIR") {
            self.reference_dir = PathBuf::from(value);
        }
        if let Some(value) = lookup("PIXELIZER_REFERENCE_PREFIX") {
            self.reference_prefix = value;
        }
        if let Some(value) = lookup("PIXELIZER_REFERENCE_COUNT") {
            self.reference_count = parse_number("PIXELIZER_REFERENCE_COUNT", &value)?;
        }
        if let Some(value) = lookup("PIXELIZER_REFERENCE_EXT") {
            self.reference_ext = value.trim_start_matches('.').to_string();
        }
        if let Some(value) = lookup("PIXELIZER_MODEL") {
            self.model = value;
        }
        if let Some(value) = lookup("PIXELIZER_QUALITY") {
            self.quality = value.parse()?;
        }
        if let Some(value) = lookup("PIXELIZER_SIZE") {
            self.size = parse_size(&value)?;
        }
        if let Some(value) = lookup("PIXELIZER_SUBMISSION") {
            self.submission = value.parse()?;
        }
        if let Some(value) = lookup("PIXELIZER_DIRECTION") {
            self.composite_direction = value.parse()?;
        }
        if let Some(value) = lookup("PIXELIZER_STREAM") {
            self.stream = parse_flag("PIXELIZER_STREAM", &value)?;
        }
        if let Some(value) = lookup("PIXELIZER_PARTIAL_IMAGES") {
            let partial: u8 = parse_number("PIXELIZER_PARTIAL_IMAGES", &value)?;
            if partial > MAX_PARTIAL_IMAGES {
                return Err(ConfigError::invalid(
                    "PIXELIZER_PARTIAL_IMAGES",
                    &value,
                    format!("at most {MAX_PARTIAL_IMAGES}"),
                ));
            }
            self.partial_images = partial;
        }
        if let Some(value) = lookup("PIXELIZER_MAX_WIDTH") {
            self.max_width = parse_positive("PIXELIZER_MAX_WIDTH", &value)?;
        }
        if let Some(value) = lookup("PIXELIZER_MAX_HEIGHT") {
            self.max_height = parse_positive("PIXELIZER_MAX_HEIGHT", &value)?;
        }
        if let Some(value) = lookup("PIXELIZER_MAX_PAYLOAD_BYTES") {
            self.max_payload_bytes = parse_positive("PIXELIZER_MAX_PAYLOAD_BYTES", &value)?;
        }
        if let Some(value) = lookup("PIXELIZER_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(value);
        }
        if let Some(value) = lookup("PIXELIZER_REQUEST_TIMEOUT_SECS") {
            self.request_timeout_secs = parse_positive("PIXELIZER_REQUEST_TIMEOUT_SECS", &value)?;
        }
        Ok(())
    }

    /// `{reference_dir}/{prefix}{index}.{ext}` for `index` in `1..=count`.
    pub fn reference_paths(&self) -> Vec<PathBuf> {
        (1..=self.reference_count)
            .map(|index| {
                self.reference_dir.join(format!(
                    "{}{}.{}",
                    self.reference_prefix, index, self.reference_ext
                ))
            })
            .collect()
    }
}

/// Credentials and endpoint for the remote edit boundary.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct TransportConfig {
    pub api_key: Option<String>,
    pub api_base: String,
    pub api_version: Option<String>,
}

impl fmt::Debug for TransportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_base", &self.api_base)
            .field("api_version", &self.api_version)
            .finish()
    }
}

impl TransportConfig {
    pub fn from_env() -> Self {
        Self {
            api_key: non_empty_env("OPENAI_API_KEY")
                .or_else(|| non_empty_env("OPENAI_API_KEY_BACKUP")),
            api_base: non_empty_env("OPENAI_API_BASE")
                .map(|value| value.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            api_version: non_empty_env("OPENAI_API_VERSION"),
        }
    }

    pub fn is_azure(&self) -> bool {
        self.api_version.is_some()
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_number<T: FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| ConfigError::invalid(key, raw, "expected a non-negative integer"))
}

fn parse_positive<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + Default,
{
    let value: T = parse_number(key, raw)?;
    if value <= T::default() {
        return Err(ConfigError::invalid(key, raw, "must be greater than zero"));
    }
    Ok(value)
}

/// Parses `on/off`, `true/false`, `yes/no` or `1/0`.
pub fn parse_flag(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::invalid(key, raw, "expected a boolean")),
    }
}
