use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::{Quality, SubmissionMode};

pub const RECEIPT_SCHEMA_VERSION: u64 = 1;

/// What was sent to the remote edit boundary, minus the image payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptRequest {
    pub backend: String,
    pub model: String,
    pub quality: Quality,
    pub size: String,
    pub submission: SubmissionMode,
    pub stream: bool,
    #[serde(default)]
    pub input_files: Vec<String>,
    pub prompt_sha256: String,
}

/// Outcome of one generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationReceipt {
    pub generation_id: String,
    pub request: ReceiptRequest,
    pub output_path: Option<PathBuf>,
    pub frames_decoded: u64,
    pub frames_skipped: u64,
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// Receipt JSON: `schema_version` followed by the receipt fields.
pub fn build_receipt(receipt: &GenerationReceipt) -> Value {
    let mut root = Map::new();
    root.insert(
        "schema_version".to_string(),
        Value::Number(RECEIPT_SCHEMA_VERSION.into()),
    );
    if let Value::Object(fields) = serde_json::to_value(receipt).unwrap_or(Value::Null) {
        root.extend(fields);
    }
    Value::Object(root)
}

pub fn write_receipt(path: &Path, payload: &Value) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(payload)?)?;
    Ok(())
}
