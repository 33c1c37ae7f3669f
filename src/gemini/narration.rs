//! Narration: a spoken script generated for a scene, rendered to WAV.
//!
//! Narration is best-effort. Script generation degrades to an empty string
//! and [`NarrationPipeline::narrate`] to `None`; neither fails a video job.

use super::backend::{SpeechBackend, TextBackend};
use super::classifier::{classify_backend, require_credential, Stage};
use super::job::JobTag;
use crate::config::GeminiConfig;
use crate::credentials::CredentialResolver;
use crate::error::{LuminaError, Result};
use crate::models::{AudioFormat, NarrationRequest, NarrationResult};
use uuid::Uuid;

const WAV_HEADER_LEN: usize = 44;
const PCM_FORMAT_TAG: u16 = 1;

pub fn script_instruction(scene: &str, language: &str) -> String {
    format!(
        "You are a documentary narrator. Write a voice-over for the following scene that \
         takes about 15 seconds to speak aloud (roughly 35 words). Write it entirely in {language}, \
         using no other language. Return only the narration text, with no title, quotes or stage \
         directions.\n\nScene: {scene}"
    )
}

/// Wraps 16-bit mono PCM in a RIFF/WAVE container.
///
/// The header depends only on `sample_rate` and the sample count. A trailing
/// odd byte is not a whole sample and is dropped.
pub fn wrap_pcm_as_wav(pcm: &[u8], sample_rate: u32) -> Vec<u8> {
    let format = AudioFormat {
        sample_rate,
        ..AudioFormat::SPEECH_PCM
    };
    let block_align = format.block_align();
    let samples = pcm.len() / block_align as usize;
    let data_len = (samples * block_align as usize) as u32;

    let mut wav = Vec::with_capacity(WAV_HEADER_LEN + data_len as usize);
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(36 + data_len).to_le_bytes());
    wav.extend_from_slice(b"WAVE");
    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&PCM_FORMAT_TAG.to_le_bytes());
    wav.extend_from_slice(&format.channels.to_le_bytes());
    wav.extend_from_slice(&format.sample_rate.to_le_bytes());
    wav.extend_from_slice(&format.byte_rate().to_le_bytes());
    wav.extend_from_slice(&block_align.to_le_bytes());
    wav.extend_from_slice(&format.bits_per_sample.to_le_bytes());
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_len.to_le_bytes());
    wav.extend_from_slice(&pcm[..data_len as usize]);
    wav
}

pub struct NarrationPipeline<'a> {
    text: &'a dyn TextBackend,
    speech: &'a dyn SpeechBackend,
    credentials: &'a dyn CredentialResolver,
    config: &'a GeminiConfig,
    tag: JobTag,
}

impl<'a> NarrationPipeline<'a> {
    pub fn new(
        text: &'a dyn TextBackend,
        speech: &'a dyn SpeechBackend,
        credentials: &'a dyn CredentialResolver,
        config: &'a GeminiConfig,
    ) -> Self {
        Self {
            text,
            speech,
            credentials,
            config,
            tag: JobTag::default(),
        }
    }

    pub fn with_job(mut self, job_id: Uuid) -> Self {
        self.tag = JobTag::new(job_id);
        self
    }

    /// Returns an empty string on any failure.
    pub async fn generate_script(&self, scene: &str, language: &str) -> String {
        match self.try_generate_script(scene, language).await {
            Ok(script) => script,
            Err(e) => {
                log::warn!(
                    "{}Narration script generation failed ({}): {}",
                    self.tag,
                    e.kind(),
                    e
                );
                String::new()
            }
        }
    }

    async fn try_generate_script(&self, scene: &str, language: &str) -> Result<String> {
        let language = language.trim();
        if language.is_empty() {
            return Err(LuminaError::InvalidRequest("narration language is blank".into()));
        }
        let api_key = require_credential(self.credentials.resolve())?;
        let prompt = script_instruction(scene, language);
        let script = self
            .text
            .generate(&self.config.text_model, &prompt, &api_key, false)
            .await
            .map_err(|e| classify_backend(Stage::Script, e))?;
        Ok(script.trim().trim_matches('"').trim().to_string())
    }

    pub async fn synthesize_speech(&self, text: &str, voice: &str) -> Result<NarrationResult> {
        let text = text.trim();
        if text.is_empty() {
            return Err(LuminaError::InvalidRequest("narration text is empty".into()));
        }

        let api_key = require_credential(self.credentials.resolve())?;
        log::info!(
            "{}Synthesizing {} chars of narration with voice {}",
            self.tag,
            text.len(),
            voice
        );

        let pcm = self
            .speech
            .synthesize(&self.config.speech_model, text, voice, &api_key)
            .await
            .map_err(|e| classify_backend(Stage::Speech, e))?;

        if pcm.len() < 2 {
            return Err(LuminaError::Backend("speech backend returned no audio".into()));
        }

        let format = AudioFormat::SPEECH_PCM;
        Ok(NarrationResult {
            script: text.to_string(),
            audio: wrap_pcm_as_wav(&pcm, format.sample_rate),
            format,
        })
    }

    /// Explicit narration text wins; otherwise a script is generated when a
    /// language is given. Any failure yields `None`.
    pub async fn narrate(&self, scene: &str, request: &NarrationRequest) -> Option<NarrationResult> {
        let script = match request.text.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => text.to_string(),
            _ => match request.language() {
                Some(language) => self.generate_script(scene, language).await,
                None => return None,
            },
        };

        if script.is_empty() {
            log::warn!("{}No narration script available, skipping speech", self.tag);
            return None;
        }

        let voice = request
            .voice_id
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(&self.config.default_voice);

        match self.synthesize_speech(&script, voice).await {
            Ok(result) => Some(result),
            Err(e) => {
                log::warn!("{}Narration skipped ({}): {}", self.tag, e.kind(), e);
                None
            }
        }
    }
}
