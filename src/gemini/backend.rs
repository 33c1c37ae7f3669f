use crate::models::{GenerationRequest, Operation, OperationHandle};
use async_trait::async_trait;
use std::fmt;

/// Raw failure from a backend call, before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The service answered with a non-2xx status.
    Http { status: u16, body: String },
    /// The request never produced a complete response.
    Transport {
        status: Option<u16>,
        message: String,
    },
    /// A 2xx response that could not be understood.
    Malformed(String),
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::Http { status, body } => write!(f, "HTTP {}: {}", status, body),
            BackendError::Transport { message, .. } => write!(f, "transport: {}", message),
            BackendError::Malformed(msg) => write!(f, "malformed response: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}

pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Long-running video synthesis.
#[async_trait]
pub trait SynthesisBackend: Send + Sync {
    async fn submit(
        &self,
        model: &str,
        request: &GenerationRequest,
        api_key: &str,
    ) -> BackendResult<Operation>;

    /// Idempotent for a given handle.
    async fn poll(&self, handle: &OperationHandle, api_key: &str) -> BackendResult<Operation>;
}

#[async_trait]
pub trait TextBackend: Send + Sync {
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        api_key: &str,
        json_output: bool,
    ) -> BackendResult<String>;
}

#[async_trait]
pub trait SpeechBackend: Send + Sync {
    /// Returns raw 16-bit little-endian mono PCM.
    async fn synthesize(
        &self,
        model: &str,
        text: &str,
        voice: &str,
        api_key: &str,
    ) -> BackendResult<Vec<u8>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadResponse {
    pub status: u16,
    pub body: Vec<u8>,
    pub mime_type: Option<String>,
    /// `Content-Length` as announced by the server.
    pub declared_len: Option<u64>,
}

impl DownloadResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Fetches artifact bytes. Any HTTP response, successful or not, is `Ok`;
/// `Err` is reserved for transport failures.
#[async_trait]
pub trait Downloader: Send + Sync {
    async fn fetch(&self, uri: &str, api_key: &str) -> BackendResult<DownloadResponse>;
}
