use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFormat {
    pub channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
}

impl AudioFormat {
    /// What the speech backend emits: 16-bit little-endian mono at 24 kHz.
    pub const SPEECH_PCM: AudioFormat = AudioFormat {
        channels: 1,
        sample_rate: 24_000,
        bits_per_sample: 16,
    };

    pub fn block_align(&self) -> u16 {
        self.channels * (self.bits_per_sample / 8)
    }

    pub fn byte_rate(&self) -> u32 {
        self.sample_rate * self.block_align() as u32
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct NarrationResult {
    pub script: String,
    /// WAV container bytes.
    pub audio: Vec<u8>,
    pub format: AudioFormat,
}

impl NarrationResult {
    pub fn mime_type(&self) -> &'static str {
        "audio/wav"
    }
}

impl std::fmt::Debug for NarrationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NarrationResult")
            .field("script", &self.script)
            .field("audio_len", &self.audio.len())
            .field("format", &self.format)
            .finish()
    }
}

/// Narration inputs carried alongside a video request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrationRequest {
    pub text: Option<String>,
    pub voice_id: Option<String>,
    pub language: Option<String>,
}

impl NarrationRequest {
    pub fn is_empty(&self) -> bool {
        self.text.as_deref().map_or(true, |t| t.trim().is_empty()) && self.language().is_none()
    }

    /// The requested script language, ignoring blank values.
    pub fn language(&self) -> Option<&str> {
        self.language.as_deref().map(str::trim).filter(|l| !l.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoiceGender {
    Male,
    Female,
    Neutral,
}

#[derive(Debug, Clone, Serialize)]
pub struct Voice {
    pub id: &'static str,
    pub description: &'static str,
    pub gender: VoiceGender,
}

impl Voice {
    /// Prebuilt voices offered by the speech model.
    pub fn catalogue() -> &'static [Voice] {
        &[
            Voice {
                id: "Kore",
                description: "Firm, clear narrator",
                gender: VoiceGender::Female,
            },
            Voice {
                id: "Puck",
                description: "Upbeat and lively",
                gender: VoiceGender::Male,
            },
            Voice {
                id: "Zephyr",
                description: "Bright and airy",
                gender: VoiceGender::Female,
            },
            Voice {
                id: "Charon",
                description: "Deep and informative",
                gender: VoiceGender::Male,
            },
            Voice {
                id: "Fenrir",
                description: "Excitable, dramatic",
                gender: VoiceGender::Male,
            },
            Voice {
                id: "Aoede",
                description: "Breezy, conversational",
                gender: VoiceGender::Neutral,
            },
        ]
    }

    pub fn find(id: &str) -> Option<&'static Voice> {
        Self::catalogue()
            .iter()
            .find(|voice| voice.id.eq_ignore_ascii_case(id))
    }
}
