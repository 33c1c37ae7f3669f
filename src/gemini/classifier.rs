//! Maps backend failures onto [`ErrorKind`](crate::error::ErrorKind).
//!
//! Rules apply in this order:
//! 1. absent or placeholder credential: `CredentialMissing`
//! 2. HTTP 403 whose body mentions a leaked key: `CredentialInvalid`
//! 3. any other HTTP 403: `BillingRequired`
//! 4. "Requested entity was not found": `CredentialInvalid`
//! 5. finished operation without a result URI: `SynthesisEmpty`
//! 6. other non-2xx while downloading: `DownloadFailed`
//!
//! Outside downloads, a 401 or a body carrying Google's invalid-key reason
//! (`API_KEY_INVALID`, "API key not valid") is also `CredentialInvalid`.
//!
//! Anything left over on the submit/poll/text/speech paths is `Backend`.

use super::backend::BackendError;
use crate::credentials::Credential;
use crate::error::{LuminaError, Result};
use crate::models::{FinishedOperation, OperationFailure, OperationOutcome, SynthesisOutput};

const LEAKED_MARKER: &str = "leaked";
const NOT_FOUND_MARKER: &str = "requested entity was not found";
const INVALID_KEY_MARKERS: &[&str] = &["api key not valid", "api_key_invalid"];
const MAX_DETAIL_LEN: usize = 300;

/// Where in the pipeline a failure was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Submit,
    Poll,
    Download,
    Script,
    Speech,
}

impl Stage {
    fn as_str(&self) -> &'static str {
        match self {
            Stage::Submit => "submit",
            Stage::Poll => "poll",
            Stage::Download => "download",
            Stage::Script => "script",
            Stage::Speech => "speech",
        }
    }
}

pub fn require_credential(credential: Credential) -> Result<String> {
    credential.require()
}

pub fn classify_http(stage: Stage, status: u16, body: &str) -> LuminaError {
    let lowered = body.to_lowercase();
    let detail = truncate(body);

    if status == 403 {
        if lowered.contains(LEAKED_MARKER) {
            return LuminaError::CredentialInvalid(format!(
                "the API key was reported as leaked: {}",
                detail
            ));
        }
        return LuminaError::BillingRequired(format!(
            "{} was refused (403); the project needs an active billing account: {}",
            stage.as_str(),
            detail
        ));
    }

    if lowered.contains(NOT_FOUND_MARKER) || (stage == Stage::Poll && status == 404) {
        return LuminaError::CredentialInvalid(format!(
            "requested entity was not found during {}; select another key",
            stage.as_str()
        ));
    }

    if stage != Stage::Download
        && (status == 401 || INVALID_KEY_MARKERS.iter().any(|m| lowered.contains(m)))
    {
        return LuminaError::CredentialInvalid(format!(
            "{} rejected the API key: {}",
            stage.as_str(),
            detail
        ));
    }

    match stage {
        Stage::Download => LuminaError::DownloadFailed {
            status,
            message: detail,
        },
        Stage::Submit if status == 400 => LuminaError::InvalidRequest(format!(
            "backend rejected the request: {}",
            detail
        )),
        _ => LuminaError::Backend(format!(
            "{} failed with HTTP {}: {}",
            stage.as_str(),
            status,
            detail
        )),
    }
}

pub fn classify_backend(stage: Stage, err: BackendError) -> LuminaError {
    match err {
        BackendError::Http { status, body } => classify_http(stage, status, &body),
        BackendError::Transport { status, message } => match stage {
            Stage::Download => LuminaError::DownloadFailed {
                status: status.unwrap_or(0),
                message: format!("incomplete download: {}", message),
            },
            _ => LuminaError::Backend(format!("{} transport failure: {}", stage.as_str(), message)),
        },
        BackendError::Malformed(message) => LuminaError::Backend(format!(
            "{} returned an unreadable response: {}",
            stage.as_str(),
            message
        )),
    }
}

/// Classifies an operation that finished with an error status. The codes are
/// google.rpc canonical codes.
pub fn classify_operation_failure(failure: &OperationFailure) -> LuminaError {
    let status = match failure.code {
        5 => 404,
        7 => 403,
        16 => 401,
        3 => 400,
        _ => 500,
    };
    match classify_http(Stage::Poll, status, &failure.message) {
        LuminaError::Backend(_) => LuminaError::Backend(format!(
            "synthesis failed (code {}): {}",
            failure.code,
            truncate(&failure.message)
        )),
        other => other,
    }
}

/// Returns the downloadable URI of a finished operation.
pub fn result_uri(finished: &FinishedOperation) -> Result<&str> {
    match finished.outcome() {
        OperationOutcome::Failed(failure) => Err(classify_operation_failure(failure)),
        OperationOutcome::Succeeded(output) => output_uri(output),
    }
}

fn output_uri(output: &SynthesisOutput) -> Result<&str> {
    match output.video_uri.as_deref().map(str::trim) {
        Some(uri) if !uri.is_empty() => Ok(uri),
        _ => Err(LuminaError::SynthesisEmpty(match &output.filtered_reason {
            Some(reason) => format!("no video returned: {}", reason),
            None => "no video URI returned".to_string(),
        })),
    }
}

fn truncate(body: &str) -> String {
    let body = body.trim();
    if body.chars().count() <= MAX_DETAIL_LEN {
        return body.to_string();
    }
    let cut: String = body.chars().take(MAX_DETAIL_LEN).collect();
    format!("{}...", cut)
}
