#![allow(dead_code)]

use async_trait::async_trait;
use lumina::gemini::{
    BackendError, BackendResult, DownloadResponse, Downloader, SpeechBackend, SynthesisBackend,
    TextBackend,
};
use lumina::{
    CredentialResolver, GeminiClient, GeminiConfig, GenerationRequest, Operation,
    OperationHandle, OperationOutcome, StaticCredentialResolver, SynthesisOutput,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const OPERATION: &str = "models/veo/operations/op-1";
pub const VIDEO_URI: &str = "https://files.example/v1/video.mp4:download";

pub fn pending() -> Operation {
    Operation::pending(OperationHandle::new(OPERATION))
}

pub fn succeeded(uri: Option<&str>) -> Operation {
    Operation {
        handle: OperationHandle::new(OPERATION),
        outcome: Some(OperationOutcome::Succeeded(SynthesisOutput {
            video_uri: uri.map(String::from),
            filtered_reason: None,
        })),
    }
}

/// Replies to polls from a script; the last reply repeats.
#[derive(Default)]
pub struct ScriptedSynthesis {
    pub submitted: Mutex<Vec<(String, GenerationRequest, String)>>,
    pub poll_keys: Mutex<Vec<String>>,
    replies: Mutex<VecDeque<BackendResult<Operation>>>,
    submit_error: Option<BackendError>,
}

impl ScriptedSynthesis {
    pub fn new(replies: Vec<BackendResult<Operation>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            ..Default::default()
        }
    }

    pub fn failing_submit(error: BackendError) -> Self {
        Self {
            submit_error: Some(error),
            ..Default::default()
        }
    }

    pub fn submit_count(&self) -> usize {
        self.submitted.lock().unwrap().len()
    }

    pub fn poll_count(&self) -> usize {
        self.poll_keys.lock().unwrap().len()
    }
}

#[async_trait]
impl SynthesisBackend for ScriptedSynthesis {
    async fn submit(
        &self,
        model: &str,
        request: &GenerationRequest,
        api_key: &str,
    ) -> BackendResult<Operation> {
        self.submitted
            .lock()
            .unwrap()
            .push((model.to_string(), request.clone(), api_key.to_string()));
        match &self.submit_error {
            Some(e) => Err(e.clone()),
            None => Ok(pending()),
        }
    }

    async fn poll(&self, handle: &OperationHandle, api_key: &str) -> BackendResult<Operation> {
        assert_eq!(handle.name(), OPERATION);
        self.poll_keys.lock().unwrap().push(api_key.to_string());
        let mut replies = self.replies.lock().unwrap();
        if replies.len() > 1 {
            replies.pop_front().unwrap()
        } else {
            replies.front().cloned().unwrap_or_else(|| Ok(pending()))
        }
    }
}

pub struct RecordingDownloader {
    pub fetched: Mutex<Vec<(String, String)>>,
    body: Vec<u8>,
}

impl RecordingDownloader {
    pub fn new(body: &[u8]) -> Self {
        Self {
            fetched: Mutex::new(Vec::new()),
            body: body.to_vec(),
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetched.lock().unwrap().len()
    }
}

#[async_trait]
impl Downloader for RecordingDownloader {
    async fn fetch(&self, uri: &str, api_key: &str) -> BackendResult<DownloadResponse> {
        self.fetched
            .lock()
            .unwrap()
            .push((uri.to_string(), api_key.to_string()));
        Ok(DownloadResponse {
            status: 200,
            body: self.body.clone(),
            mime_type: Some("video/mp4".into()),
            declared_len: Some(self.body.len() as u64),
        })
    }
}

pub struct CannedText(pub BackendResult<String>);

#[async_trait]
impl TextBackend for CannedText {
    async fn generate(
        &self,
        _model: &str,
        _prompt: &str,
        _api_key: &str,
        _json_output: bool,
    ) -> BackendResult<String> {
        self.0.clone()
    }
}

pub struct CannedSpeech {
    pub voices: Mutex<Vec<String>>,
    reply: BackendResult<Vec<u8>>,
}

impl CannedSpeech {
    pub fn new(reply: BackendResult<Vec<u8>>) -> Self {
        Self {
            voices: Mutex::new(Vec::new()),
            reply,
        }
    }
}

#[async_trait]
impl SpeechBackend for CannedSpeech {
    async fn synthesize(
        &self,
        _model: &str,
        _text: &str,
        voice: &str,
        _api_key: &str,
    ) -> BackendResult<Vec<u8>> {
        self.voices.lock().unwrap().push(voice.to_string());
        self.reply.clone()
    }
}

pub struct Harness {
    pub client: GeminiClient,
    pub synthesis: Arc<ScriptedSynthesis>,
    pub downloader: Arc<RecordingDownloader>,
    pub speech: Arc<CannedSpeech>,
}

pub fn test_config() -> GeminiConfig {
    GeminiConfig::new()
        .with_poll_interval(Duration::ZERO)
        .with_models("veo-fast", "veo-full")
}

pub fn harness(synthesis: ScriptedSynthesis) -> Harness {
    harness_with(
        synthesis,
        Arc::new(StaticCredentialResolver::new("test-key")),
        CannedText(Ok("A quiet harbour wakes up.".into())),
        CannedSpeech::new(Ok(vec![0u8; 96])),
    )
}

pub fn harness_with(
    synthesis: ScriptedSynthesis,
    credentials: Arc<dyn CredentialResolver>,
    text: CannedText,
    speech: CannedSpeech,
) -> Harness {
    let synthesis = Arc::new(synthesis);
    let downloader = Arc::new(RecordingDownloader::new(b"\x00\x00\x00\x18ftypmp42"));
    let speech = Arc::new(speech);
    let client = GeminiClient::from_parts(
        test_config(),
        credentials,
        synthesis.clone(),
        Arc::new(text),
        speech.clone(),
        downloader.clone(),
    );
    Harness {
        client,
        synthesis,
        downloader,
        speech,
    }
}
