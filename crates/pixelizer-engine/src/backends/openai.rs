use std::io::BufReader;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use pixelizer_contracts::config::TransportConfig;
use reqwest::blocking::multipart::{Form as MultipartForm, Part as MultipartPart};
use reqwest::blocking::{Client as HttpClient, Response as HttpResponse};
use serde_json::Value;

use super::sse::{event_limit_for_payload, ImageEventStream};
use super::{EditRequest, ImageBackend, ResultStream};
use crate::error::{PixelError, Result};

/// `images/edits` over HTTPS, either plain OpenAI or an Azure deployment.
pub struct OpenAiBackend {
    transport: TransportConfig,
    api_key: String,
    http: HttpClient,
}

impl OpenAiBackend {
    pub fn new(transport: TransportConfig, timeout: Duration) -> Result<Self> {
        let api_key = transport
            .api_key
            .clone()
            .ok_or_else(|| PixelError::ModelUnavailable("OPENAI_API_KEY not set".to_string()))?;
        let http = HttpClient::builder().timeout(timeout).build()?;
        Ok(Self {
            transport,
            api_key,
            http,
        })
    }

    fn send(&self, request: &EditRequest) -> Result<HttpResponse> {
        let endpoint = edits_endpoint(&self.transport, &request.model);
        let mut form = MultipartForm::new();
        for (key, value) in form_fields(request) {
            form = form.text(key, value);
        }
        for image in &request.images {
            let part = MultipartPart::bytes(image.bytes().to_vec())
                .file_name(image.filename().to_string())
                .mime_str(image.content_type())?;
            form = form.part("image[]", part);
        }

        let builder = self.http.post(&endpoint).multipart(form);
        let builder = if self.transport.is_azure() {
            builder.header("api-key", &self.api_key)
        } else {
            builder.bearer_auth(&self.api_key)
        };
        let response = builder
            .send()
            .map_err(|err| PixelError::Transport(format!("OpenAI edits request failed: {err}")))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(PixelError::Transport(format!(
                "OpenAI edits request failed ({}): {}",
                status.as_u16(),
                truncate_text(&body, 512)
            )));
        }
        Ok(response)
    }
}

impl ImageBackend for OpenAiBackend {
    fn name(&self) -> &str {
        "openai"
    }

    fn edit(&self, request: &EditRequest) -> Result<ResultStream> {
        if request.images.is_empty() {
            return Err(PixelError::NoInput);
        }
        let response = self.send(request)?;
        if request.stream {
            return Ok(Box::new(ImageEventStream::with_limit(
                BufReader::new(response),
                event_limit_for_payload(request.max_payload_bytes),
            )));
        }

        let body = response
            .text()
            .map_err(|err| PixelError::Transport(format!("OpenAI response body read failed: {err}")))?;
        let payload: Value = serde_json::from_str(&body).map_err(|err| {
            PixelError::Transport(format!("OpenAI returned invalid JSON payload: {err}"))
        })?;
        let frames = extract_image_items(&payload);
        if frames.is_empty() {
            return Err(PixelError::Transport(
                "OpenAI edits response returned no images".to_string(),
            ));
        }
        Ok(Box::new(frames.into_iter()))
    }
}

/// Edit endpoint for plain OpenAI or, when an API version is set, an Azure
/// deployment named after the model.
pub fn edits_endpoint(transport: &TransportConfig, model: &str) -> String {
    let base = transport.api_base.trim_end_matches('/');
    match transport.api_version.as_deref() {
        Some(version) => {
            format!("{base}/openai/deployments/{model}/images/edits?api-version={version}")
        }
        None => format!("{base}/images/edits"),
    }
}

/// Text fields of the multipart form, in submission order.
pub fn form_fields(request: &EditRequest) -> Vec<(&'static str, String)> {
    let mut fields = vec![
        ("model", request.model.clone()),
        ("prompt", request.prompt.clone()),
        ("quality", request.quality.as_str().to_string()),
        ("size", request.size.clone()),
        ("n", "1".to_string()),
    ];
    if request.stream {
        fields.push(("stream", "true".to_string()));
        fields.push(("partial_images", request.partial_images.to_string()));
    }
    fields
}

/// Decodes every `data[].b64_json` entry of a single-shot response.
pub fn extract_image_items(payload: &Value) -> Vec<Result<Vec<u8>>> {
    payload
        .get("data")
        .and_then(Value::as_array)
        .map(|rows| {
            rows.iter()
                .filter_map(|row| row.get("b64_json").and_then(Value::as_str))
                .map(|b64| {
                    BASE64.decode(b64.as_bytes()).map_err(|err| {
                        PixelError::InvalidImageData(format!("OpenAI image base64 decode failed: {err}"))
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}
