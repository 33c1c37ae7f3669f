use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable failure kinds surfaced to callers.
///
/// UI layers branch on these rather than on error prose: a `CredentialInvalid`
/// opens the key picker, a `BillingRequired` opens the upgrade flow, and so on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidRequest,
    CredentialMissing,
    CredentialInvalid,
    BillingRequired,
    SynthesisEmpty,
    DownloadFailed,
    Backend,
    Cancelled,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::CredentialMissing => "credential_missing",
            ErrorKind::CredentialInvalid => "credential_invalid",
            ErrorKind::BillingRequired => "billing_required",
            ErrorKind::SynthesisEmpty => "synthesis_empty",
            ErrorKind::DownloadFailed => "download_failed",
            ErrorKind::Backend => "backend",
            ErrorKind::Cancelled => "cancelled",
        }
    }

    /// Whether re-running the whole job unchanged can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::SynthesisEmpty | ErrorKind::DownloadFailed | ErrorKind::Backend
        )
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum LuminaError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("No API credential available: {0}")]
    CredentialMissing(String),

    #[error("API credential rejected: {0}")]
    CredentialInvalid(String),

    #[error("Billing required: {0}")]
    BillingRequired(String),

    #[error("Synthesis finished without a usable result: {0}")]
    SynthesisEmpty(String),

    #[error("Download failed (status {status}): {message}")]
    DownloadFailed { status: u16, message: String },

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Job cancelled: {0}")]
    Cancelled(String),
}

impl LuminaError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LuminaError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            LuminaError::CredentialMissing(_) => ErrorKind::CredentialMissing,
            LuminaError::CredentialInvalid(_) => ErrorKind::CredentialInvalid,
            LuminaError::BillingRequired(_) => ErrorKind::BillingRequired,
            LuminaError::SynthesisEmpty(_) => ErrorKind::SynthesisEmpty,
            LuminaError::DownloadFailed { .. } => ErrorKind::DownloadFailed,
            LuminaError::Backend(_) => ErrorKind::Backend,
            LuminaError::Cancelled(_) => ErrorKind::Cancelled,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    /// HTTP status recorded for diagnostics, when the failure came from one.
    pub fn status(&self) -> Option<u16> {
        match self {
            LuminaError::DownloadFailed { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for LuminaError {
    fn from(e: reqwest::Error) -> Self {
        LuminaError::Backend(format!("transport error: {}", e))
    }
}

impl From<serde_json::Error> for LuminaError {
    fn from(e: serde_json::Error) -> Self {
        LuminaError::Backend(format!("malformed payload: {}", e))
    }
}

pub type Result<T> = std::result::Result<T, LuminaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        let err = LuminaError::DownloadFailed {
            status: 502,
            message: "bad gateway".into(),
        };
        assert_eq!(err.kind(), ErrorKind::DownloadFailed);
        assert_eq!(err.status(), Some(502));
        assert!(err.is_retryable());

        let err = LuminaError::CredentialInvalid("leaked".into());
        assert_eq!(err.kind(), ErrorKind::CredentialInvalid);
        assert!(!err.is_retryable());
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::BillingRequired).unwrap();
        assert_eq!(json, "\"billing_required\"");
        assert_eq!(ErrorKind::SynthesisEmpty.to_string(), "synthesis_empty");
    }
}
