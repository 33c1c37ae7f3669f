use super::backend::Downloader;
use super::classifier::{classify_backend, classify_http, require_credential, result_uri, Stage};
use super::job::JobTag;
use crate::credentials::CredentialResolver;
use crate::error::{LuminaError, Result};
use crate::models::{Artifact, FinishedOperation};
use uuid::Uuid;

const DEFAULT_VIDEO_MIME: &str = "video/mp4";

/// Downloads the media produced by a finished operation.
pub struct ArtifactRetriever<'a> {
    downloader: &'a dyn Downloader,
    credentials: &'a dyn CredentialResolver,
    tag: JobTag,
}

impl<'a> ArtifactRetriever<'a> {
    pub fn new(downloader: &'a dyn Downloader, credentials: &'a dyn CredentialResolver) -> Self {
        Self {
            downloader,
            credentials,
            tag: JobTag::default(),
        }
    }

    pub fn with_job(mut self, job_id: Uuid) -> Self {
        self.tag = JobTag::new(job_id);
        self
    }

    pub async fn retrieve(&self, finished: &FinishedOperation) -> Result<Artifact> {
        let uri = result_uri(finished)?;
        let api_key = require_credential(self.credentials.resolve())?;

        log::info!("{}Downloading artifact for {}", self.tag, finished.handle().name());

        let response = self
            .downloader
            .fetch(uri, &api_key)
            .await
            .map_err(|e| classify_backend(Stage::Download, e))?;

        if !response.is_success() {
            let body = String::from_utf8_lossy(&response.body);
            log::error!(
                "{}Download failed with status {}: {}",
                self.tag,
                response.status,
                body.chars().take(200).collect::<String>()
            );
            return Err(classify_http(Stage::Download, response.status, &body));
        }

        if response.body.is_empty() {
            return Err(LuminaError::DownloadFailed {
                status: response.status,
                message: "empty body".into(),
            });
        }

        if let Some(declared) = response.declared_len {
            if declared != response.body.len() as u64 {
                return Err(LuminaError::DownloadFailed {
                    status: response.status,
                    message: format!(
                        "truncated body: expected {} bytes, got {}",
                        declared,
                        response.body.len()
                    ),
                });
            }
        }

        let mime_type = response
            .mime_type
            .as_deref()
            .map(|m| m.split(';').next().unwrap_or(m).trim())
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_VIDEO_MIME)
            .to_string();

        log::info!(
            "{}Downloaded {} bytes ({})",
            self.tag,
            response.body.len(),
            mime_type
        );

        Ok(Artifact {
            bytes: response.body,
            mime_type,
            uri: uri.to_string(),
        })
    }
}
