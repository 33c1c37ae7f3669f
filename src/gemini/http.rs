//! Gemini REST implementation of the backend traits.
//!
//! The key travels in the `x-goog-api-key` header on every request,
//! downloads included.

use super::backend::{
    BackendError, BackendResult, DownloadResponse, Downloader, SpeechBackend, SynthesisBackend,
    TextBackend,
};
use crate::config::GeminiConfig;
use crate::error::{LuminaError, Result};
use crate::models::{
    Conditioning, GenerationRequest, ImageInput, Operation, OperationFailure, OperationHandle,
    OperationOutcome, SynthesisOutput,
};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{header, Client, Response};
use serde::Deserialize;
use serde_json::{json, Value};

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Clone)]
pub struct GeminiHttpBackend {
    client: Client,
    base_url: String,
}

impl GeminiHttpBackend {
    pub fn new(config: &GeminiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| LuminaError::Backend(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self::with_client(client, &config.base_url))
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn model_url(&self, model: &str, method: &str) -> String {
        format!("{}/models/{}:{}", self.base_url, model, method)
    }

    async fn post_json(&self, url: &str, body: &Value, api_key: &str) -> BackendResult<Value> {
        log::debug!("POST {}", url);
        let response = self
            .client
            .post(url)
            .header(API_KEY_HEADER, api_key)
            .json(body)
            .send()
            .await
            .map_err(transport)?;
        read_json(response).await
    }
}

fn transport(e: reqwest::Error) -> BackendError {
    BackendError::Transport {
        status: e.status().map(|s| s.as_u16()),
        message: e.to_string(),
    }
}

async fn read_json(response: Response) -> BackendResult<Value> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(BackendError::Http {
            status: status.as_u16(),
            body,
        });
    }
    response
        .json::<Value>()
        .await
        .map_err(|e| BackendError::Malformed(e.to_string()))
}

fn wire_image(image: &ImageInput) -> Value {
    json!({
        "bytesBase64Encoded": image.data,
        "mimeType": image.mime_type,
    })
}

/// Body for `models/{model}:predictLongRunning`.
pub fn predict_payload(request: &GenerationRequest) -> Value {
    let mut instance = json!({ "prompt": request.prompt });

    match &request.conditioning {
        Conditioning::TextOnly { .. } => {}
        Conditioning::SingleImage {
            image, last_frame, ..
        } => {
            instance["image"] = wire_image(image);
            if let Some(last) = last_frame {
                instance["lastFrame"] = wire_image(last);
            }
        }
        Conditioning::ReferenceImages { references } => {
            instance["referenceImages"] = references
                .iter()
                .map(|image| {
                    json!({
                        "image": wire_image(image),
                        "referenceType": "asset",
                    })
                })
                .collect();
        }
        Conditioning::Extension { prior, .. } => {
            instance["video"] = json!({ "uri": prior.uri });
        }
    }

    let mut parameters = json!({
        "aspectRatio": request.aspect_ratio().as_str(),
        "resolution": request.resolution().as_str(),
        "sampleCount": 1,
    });
    if let Some(negative) = &request.negative_prompt {
        parameters["negativePrompt"] = json!(negative);
    }

    json!({
        "instances": [instance],
        "parameters": parameters,
    })
}

#[derive(Debug, Deserialize)]
struct WireOperation {
    name: String,
    #[serde(default)]
    done: bool,
    response: Option<WireOperationResponse>,
    error: Option<WireStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireOperationResponse {
    generate_video_response: Option<WireVideoResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireVideoResponse {
    #[serde(default)]
    generated_samples: Vec<WireSample>,
    #[serde(default)]
    rai_media_filtered_reasons: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct WireSample {
    video: Option<WireVideo>,
}

#[derive(Debug, Deserialize)]
struct WireVideo {
    uri: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireStatus {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
}

/// Converts a `google.longrunning.Operation` JSON document.
pub fn parse_operation(value: Value) -> BackendResult<Operation> {
    let wire: WireOperation =
        serde_json::from_value(value).map_err(|e| BackendError::Malformed(e.to_string()))?;

    let handle = OperationHandle::new(wire.name);
    if !wire.done {
        return Ok(Operation::pending(handle));
    }

    let outcome = match wire.error {
        Some(status) => OperationOutcome::Failed(OperationFailure {
            code: status.code,
            message: status.message,
        }),
        None => {
            let video = wire.response.and_then(|r| r.generate_video_response);
            let (video_uri, filtered_reason) = match video {
                Some(v) => (
                    v.generated_samples
                        .into_iter()
                        .find_map(|s| s.video.and_then(|video| video.uri)),
                    (!v.rai_media_filtered_reasons.is_empty())
                        .then(|| v.rai_media_filtered_reasons.join("; ")),
                ),
                None => (None, None),
            };
            OperationOutcome::Succeeded(SynthesisOutput {
                video_uri,
                filtered_reason,
            })
        }
    };

    Ok(Operation {
        handle,
        outcome: Some(outcome),
    })
}

/// Concatenates the text parts of the first candidate.
fn candidate_text(value: &Value) -> BackendResult<String> {
    let parts = value["candidates"][0]["content"]["parts"]
        .as_array()
        .ok_or_else(|| BackendError::Malformed("no candidates in response".into()))?;
    Ok(parts
        .iter()
        .filter_map(|part| part["text"].as_str())
        .collect::<Vec<_>>()
        .join(""))
}

fn candidate_audio(value: &Value) -> BackendResult<Vec<u8>> {
    let data = value["candidates"][0]["content"]["parts"]
        .as_array()
        .and_then(|parts| {
            parts
                .iter()
                .find_map(|part| part["inlineData"]["data"].as_str())
        })
        .ok_or_else(|| BackendError::Malformed("no inline audio in response".into()))?;
    STANDARD
        .decode(data)
        .map_err(|e| BackendError::Malformed(format!("audio is not base64: {}", e)))
}

#[async_trait]
impl SynthesisBackend for GeminiHttpBackend {
    async fn submit(
        &self,
        model: &str,
        request: &GenerationRequest,
        api_key: &str,
    ) -> BackendResult<Operation> {
        let url = self.model_url(model, "predictLongRunning");
        let body = predict_payload(request);
        let value = self.post_json(&url, &body, api_key).await?;
        parse_operation(value)
    }

    async fn poll(&self, handle: &OperationHandle, api_key: &str) -> BackendResult<Operation> {
        let url = format!("{}/{}", self.base_url, handle.name());
        log::debug!("GET {}", url);
        let response = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, api_key)
            .send()
            .await
            .map_err(transport)?;
        parse_operation(read_json(response).await?)
    }
}

#[async_trait]
impl TextBackend for GeminiHttpBackend {
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        api_key: &str,
        json_output: bool,
    ) -> BackendResult<String> {
        let mut body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
        });
        if json_output {
            body["generationConfig"] = json!({ "responseMimeType": "application/json" });
        }
        let value = self
            .post_json(&self.model_url(model, "generateContent"), &body, api_key)
            .await?;
        candidate_text(&value)
    }
}

#[async_trait]
impl SpeechBackend for GeminiHttpBackend {
    async fn synthesize(
        &self,
        model: &str,
        text: &str,
        voice: &str,
        api_key: &str,
    ) -> BackendResult<Vec<u8>> {
        let body = json!({
            "contents": [{ "parts": [{ "text": text }] }],
            "generationConfig": {
                "responseModalities": ["AUDIO"],
                "speechConfig": {
                    "voiceConfig": {
                        "prebuiltVoiceConfig": { "voiceName": voice }
                    }
                }
            }
        });
        let value = self
            .post_json(&self.model_url(model, "generateContent"), &body, api_key)
            .await?;
        candidate_audio(&value)
    }
}

#[async_trait]
impl Downloader for GeminiHttpBackend {
    async fn fetch(&self, uri: &str, api_key: &str) -> BackendResult<DownloadResponse> {
        let response = self
            .client
            .get(uri)
            .header(API_KEY_HEADER, api_key)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status().as_u16();
        let mime_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let declared_len = response.content_length();

        let body = response.bytes().await.map_err(|e| BackendError::Transport {
            status: Some(status),
            message: e.to_string(),
        })?;

        Ok(DownloadResponse {
            status,
            body: body.to_vec(),
            mime_type,
            declared_len,
        })
    }
}
