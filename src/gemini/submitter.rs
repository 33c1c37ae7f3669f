use super::backend::SynthesisBackend;
use super::classifier::{classify_backend, Stage};
use super::job::JobTag;
use crate::config::GeminiConfig;
use crate::error::Result;
use crate::models::{GenerationRequest, ModelVariant, Operation};
use uuid::Uuid;

/// Starts synthesis jobs. The model is picked from the request's mode and is
/// not caller-controlled. Nothing here retries.
pub struct OperationSubmitter<'a> {
    backend: &'a dyn SynthesisBackend,
    config: &'a GeminiConfig,
    tag: JobTag,
}

impl<'a> OperationSubmitter<'a> {
    pub fn new(backend: &'a dyn SynthesisBackend, config: &'a GeminiConfig) -> Self {
        Self {
            backend,
            config,
            tag: JobTag::default(),
        }
    }

    pub fn with_job(mut self, job_id: Uuid) -> Self {
        self.tag = JobTag::new(job_id);
        self
    }

    pub fn model_for(&self, variant: ModelVariant) -> &'a str {
        match variant {
            ModelVariant::Fast => &self.config.fast_model,
            ModelVariant::Full => &self.config.full_model,
        }
    }

    pub async fn submit(&self, request: &GenerationRequest, api_key: &str) -> Result<Operation> {
        let model = self.model_for(request.mode().variant());

        log::info!(
            "{}Submitting {:?} synthesis to {} ({} / {})",
            self.tag,
            request.mode(),
            model,
            request.aspect_ratio().as_str(),
            request.resolution().as_str()
        );

        let operation = self
            .backend
            .submit(model, request, api_key)
            .await
            .map_err(|e| {
                log::error!("{}Synthesis submission failed: {}", self.tag, e);
                classify_backend(Stage::Submit, e)
            })?;

        log::debug!("{}Operation accepted: {}", self.tag, operation.handle.name());
        Ok(operation)
    }
}
