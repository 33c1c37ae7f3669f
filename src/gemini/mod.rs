pub mod backend;
pub mod classifier;
pub mod http;
pub mod job;
pub mod narration;
pub mod poller;
pub mod prompt_tools;
pub mod request_builder;
pub mod retriever;
pub mod submitter;

use crate::{
    config::GeminiConfig,
    credentials::{CredentialResolver, EnvCredentialResolver},
    error::Result,
    logger,
    models::{GenerationSettings, NarrationRequest, ProgressEvent, StoryboardScene},
};
use std::sync::Arc;
use uuid::Uuid;

pub use backend::{
    BackendError, BackendResult, DownloadResponse, Downloader, SpeechBackend, SynthesisBackend,
    TextBackend,
};
pub use http::GeminiHttpBackend;
pub use job::{CancelToken, JobTag, ProgressReporter, VideoJob, VideoOutput};
pub use narration::{wrap_pcm_as_wav, NarrationPipeline};
pub use poller::{PollState, Poller};
pub use prompt_tools::PromptTools;
pub use request_builder::RequestBuilder;
pub use retriever::ArtifactRetriever;
pub use submitter::OperationSubmitter;

/// Entry point for video jobs and the text/speech helpers around them.
///
/// Cheap to clone; clones share the backends and the credential resolver.
#[derive(Clone)]
pub struct GeminiClient {
    config: Arc<GeminiConfig>,
    credentials: Arc<dyn CredentialResolver>,
    synthesis: Arc<dyn SynthesisBackend>,
    text: Arc<dyn TextBackend>,
    speech: Arc<dyn SpeechBackend>,
    downloader: Arc<dyn Downloader>,
}

impl GeminiClient {
    /// Talks to the Gemini REST API and reads the key from the environment
    /// variable named in the config.
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let backend = Arc::new(GeminiHttpBackend::new(&config)?);
        let credentials = Arc::new(EnvCredentialResolver::new(config.credential_var.clone()));
        Ok(Self::from_parts(
            config,
            credentials,
            backend.clone(),
            backend.clone(),
            backend.clone(),
            backend,
        ))
    }

    pub fn from_parts(
        config: GeminiConfig,
        credentials: Arc<dyn CredentialResolver>,
        synthesis: Arc<dyn SynthesisBackend>,
        text: Arc<dyn TextBackend>,
        speech: Arc<dyn SpeechBackend>,
        downloader: Arc<dyn Downloader>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            credentials,
            synthesis,
            text,
            speech,
            downloader,
        }
    }

    pub fn with_credentials(mut self, credentials: Arc<dyn CredentialResolver>) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    /// Whether a usable key can be resolved right now.
    pub fn has_credential(&self) -> bool {
        self.credentials.resolve().is_present()
    }

    pub fn narration(&self) -> NarrationPipeline<'_> {
        NarrationPipeline::new(
            self.text.as_ref(),
            self.speech.as_ref(),
            self.credentials.as_ref(),
            &self.config,
        )
    }

    pub fn prompt_tools(&self) -> PromptTools<'_> {
        PromptTools::new(
            self.text.as_ref(),
            self.credentials.as_ref(),
            &self.config.text_model,
        )
    }

    pub async fn refine_prompt(&self, prompt: &str) -> String {
        self.prompt_tools().refine_prompt(prompt).await
    }

    pub async fn plan_storyboard(&self, script: &str) -> Vec<StoryboardScene> {
        self.prompt_tools().plan_storyboard(script).await
    }

    pub async fn directors_note(&self, prompt: &str) -> String {
        self.prompt_tools().directors_note(prompt).await
    }

    /// Runs one video job to completion: build, submit, poll, download.
    pub async fn generate_video(
        &self,
        settings: &GenerationSettings,
        progress: &ProgressReporter,
        cancel: Option<&CancelToken>,
    ) -> Result<VideoOutput> {
        let job_id = Uuid::new_v4();
        let _timer = logger::timer(&format!("video job {}", job_id));

        let result = self.run_video_job(job_id, settings, progress, cancel).await;
        match &result {
            Ok(output) => {
                log::info!(
                    "[job {}] {:?} video ready: {} bytes",
                    job_id,
                    output.mode,
                    output.artifact.len()
                );
                progress.emit(ProgressEvent::Completed);
            }
            Err(e) => {
                log::error!("[job {}] failed ({}): {}", job_id, e.kind(), e);
                progress.emit(ProgressEvent::Failed { kind: e.kind() });
            }
        }
        result
    }

    /// Like [`generate_video`](Self::generate_video), then narrates the scene
    /// from the settings' narration fields. Narration never fails the job.
    pub async fn generate_with_narration(
        &self,
        settings: &GenerationSettings,
        progress: &ProgressReporter,
        cancel: Option<&CancelToken>,
    ) -> Result<VideoOutput> {
        self.narrated_job(Uuid::new_v4(), settings, progress, cancel)
            .await
    }

    /// Spawns a narrated job on the runtime and hands back its event stream.
    pub fn spawn_video_job(&self, settings: GenerationSettings) -> VideoJob {
        let job_id = Uuid::new_v4();
        let (progress, events) = ProgressReporter::channel();
        let cancel = CancelToken::new();
        let client = self.clone();
        let task_cancel = cancel.clone();

        let handle = tokio::spawn(async move {
            client
                .narrated_job(job_id, &settings, &progress, Some(&task_cancel))
                .await
        });

        VideoJob::new(job_id, events, handle, cancel)
    }

    async fn narrated_job(
        &self,
        job_id: Uuid,
        settings: &GenerationSettings,
        progress: &ProgressReporter,
        cancel: Option<&CancelToken>,
    ) -> Result<VideoOutput> {
        let _timer = logger::timer(&format!("narrated video job {}", job_id));

        let mut output = match self.run_video_job(job_id, settings, progress, cancel).await {
            Ok(output) => output,
            Err(e) => {
                log::error!("[job {}] failed ({}): {}", job_id, e.kind(), e);
                progress.emit(ProgressEvent::Failed { kind: e.kind() });
                return Err(e);
            }
        };

        let request = NarrationRequest {
            text: settings.narration_text.clone(),
            voice_id: settings.voice_id.clone(),
            language: settings.language.clone(),
        };
        if !request.is_empty() && !cancel.map_or(false, CancelToken::is_cancelled) {
            progress.emit(ProgressEvent::Narrating);
            output.narration = self
                .narration()
                .with_job(job_id)
                .narrate(&settings.prompt, &request)
                .await;
        }

        log::info!(
            "[job {}] done, narration {}",
            job_id,
            if output.narration.is_some() { "attached" } else { "skipped" }
        );
        progress.emit(ProgressEvent::Completed);
        Ok(output)
    }

    async fn run_video_job(
        &self,
        job_id: Uuid,
        settings: &GenerationSettings,
        progress: &ProgressReporter,
        cancel: Option<&CancelToken>,
    ) -> Result<VideoOutput> {
        let api_key = classifier::require_credential(self.credentials.resolve())?;
        let request = RequestBuilder::build(settings)?;
        let mode = request.mode();

        let submitter =
            OperationSubmitter::new(self.synthesis.as_ref(), &self.config).with_job(job_id);
        let model = submitter.model_for(mode.variant()).to_string();
        log::info!("[job {}] {:?} via {}", job_id, mode, model);

        progress.emit(ProgressEvent::Submitting {
            mode,
            model: model.clone(),
        });
        job::checkpoint(cancel)?;

        let operation = submitter.submit(&request, &api_key).await?;
        drop(api_key);
        progress.emit(ProgressEvent::Submitted {
            operation: operation.handle.name().to_string(),
        });

        let finished = Poller::new(
            self.synthesis.as_ref(),
            self.credentials.as_ref(),
            self.config.poll_interval,
            progress,
        )
        .with_max_polls(self.config.max_polls)
        .with_cancel(cancel)
        .with_job(job_id)
        .run(operation)
        .await?;

        job::checkpoint(cancel)?;
        progress.emit(ProgressEvent::Downloading);
        let artifact = ArtifactRetriever::new(self.downloader.as_ref(), self.credentials.as_ref())
            .with_job(job_id)
            .retrieve(&finished)
            .await?;

        // Cancelled mid-download: the bytes are dropped here.
        job::checkpoint(cancel)?;

        Ok(VideoOutput {
            job_id,
            mode,
            model,
            artifact,
            narration: None,
        })
    }
}
