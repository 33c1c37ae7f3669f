use crate::error::{LuminaError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AspectRatio {
    #[serde(rename = "16:9")]
    Wide,
    #[serde(rename = "9:16")]
    Tall,
    #[serde(rename = "1:1")]
    Square,
}

impl AspectRatio {
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Wide => "16:9",
            AspectRatio::Tall => "9:16",
            AspectRatio::Square => "1:1",
        }
    }
}

impl Default for AspectRatio {
    fn default() -> Self {
        AspectRatio::Wide
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resolution {
    #[serde(rename = "720p")]
    Baseline,
    #[serde(rename = "1080p")]
    High,
}

impl Resolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::Baseline => "720p",
            Resolution::High => "1080p",
        }
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Resolution::Baseline
    }
}

/// Base64-encoded image bytes plus their mime type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInput {
    pub data: String,
    pub mime_type: String,
}

impl ImageInput {
    pub fn new(data: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Accepts `data:<mime>;base64,<payload>` or a bare base64 payload
    /// (assumed PNG).
    pub fn from_data_uri(uri: &str) -> Result<Self> {
        let Some(rest) = uri.strip_prefix("data:") else {
            if uri.trim().is_empty() {
                return Err(LuminaError::InvalidRequest("empty image payload".into()));
            }
            return Ok(Self::new(uri.trim(), "image/png"));
        };

        let (mime_type, data) = rest
            .split_once(";base64,")
            .ok_or_else(|| LuminaError::InvalidRequest("image data URI is not base64".into()))?;

        if data.is_empty() {
            return Err(LuminaError::InvalidRequest("empty image payload".into()));
        }

        let mime_type = if mime_type.is_empty() {
            "image/png"
        } else {
            mime_type
        };
        Ok(Self::new(data, mime_type))
    }
}

/// Handle to a previously generated video, used to request an extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorVideo {
    pub uri: String,
}

/// Raw settings as collected from the caller. Several conditioning inputs may
/// be set at once; [`crate::gemini::RequestBuilder`] decides which one wins.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationSettings {
    pub prompt: String,
    pub negative_prompt: Option<String>,
    pub motion_strength: Option<u8>,
    #[serde(default)]
    pub aspect_ratio: AspectRatio,
    #[serde(default)]
    pub resolution: Resolution,
    pub style: Option<String>,
    pub image: Option<ImageInput>,
    pub last_frame: Option<ImageInput>,
    pub reference_images: Option<Vec<ImageInput>>,
    pub prior_video: Option<PriorVideo>,
    pub narration_text: Option<String>,
    pub voice_id: Option<String>,
    pub language: Option<String>,
}

impl GenerationSettings {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_aspect_ratio(mut self, aspect_ratio: AspectRatio) -> Self {
        self.aspect_ratio = aspect_ratio;
        self
    }

    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    pub fn with_negative_prompt(mut self, negative: impl Into<String>) -> Self {
        self.negative_prompt = Some(negative.into());
        self
    }

    pub fn with_motion_strength(mut self, strength: u8) -> Self {
        self.motion_strength = Some(strength);
        self
    }

    pub fn with_image(mut self, image: ImageInput) -> Self {
        self.image = Some(image);
        self
    }

    pub fn with_last_frame(mut self, image: ImageInput) -> Self {
        self.last_frame = Some(image);
        self
    }

    pub fn with_reference_images(mut self, images: Vec<ImageInput>) -> Self {
        self.reference_images = Some(images);
        self
    }

    pub fn with_prior_video(mut self, prior: PriorVideo) -> Self {
        self.prior_video = Some(prior);
        self
    }

    pub fn with_narration(
        mut self,
        text: Option<String>,
        voice_id: Option<String>,
        language: Option<String>,
    ) -> Self {
        self.narration_text = text;
        self.voice_id = voice_id;
        self.language = language;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditioningMode {
    TextOnly,
    SingleImage,
    ReferenceImages,
    Extension,
}

impl ConditioningMode {
    pub fn variant(&self) -> ModelVariant {
        match self {
            ConditioningMode::TextOnly | ConditioningMode::SingleImage => ModelVariant::Fast,
            ConditioningMode::ReferenceImages | ConditioningMode::Extension => ModelVariant::Full,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelVariant {
    Fast,
    Full,
}

/// Mode-specific payload. Reference-image and extension requests do not carry
/// the fields the backend fixes for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conditioning {
    TextOnly {
        aspect_ratio: AspectRatio,
        resolution: Resolution,
    },
    SingleImage {
        image: ImageInput,
        last_frame: Option<ImageInput>,
        aspect_ratio: AspectRatio,
        resolution: Resolution,
    },
    ReferenceImages {
        references: Vec<ImageInput>,
    },
    Extension {
        prior: PriorVideo,
        aspect_ratio: AspectRatio,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub negative_prompt: Option<String>,
    pub conditioning: Conditioning,
}

impl GenerationRequest {
    pub fn mode(&self) -> ConditioningMode {
        match self.conditioning {
            Conditioning::TextOnly { .. } => ConditioningMode::TextOnly,
            Conditioning::SingleImage { .. } => ConditioningMode::SingleImage,
            Conditioning::ReferenceImages { .. } => ConditioningMode::ReferenceImages,
            Conditioning::Extension { .. } => ConditioningMode::Extension,
        }
    }

    pub fn aspect_ratio(&self) -> AspectRatio {
        match &self.conditioning {
            Conditioning::TextOnly { aspect_ratio, .. }
            | Conditioning::SingleImage { aspect_ratio, .. }
            | Conditioning::Extension { aspect_ratio, .. } => *aspect_ratio,
            Conditioning::ReferenceImages { .. } => AspectRatio::Wide,
        }
    }

    pub fn resolution(&self) -> Resolution {
        match &self.conditioning {
            Conditioning::TextOnly { resolution, .. }
            | Conditioning::SingleImage { resolution, .. } => *resolution,
            Conditioning::ReferenceImages { .. } | Conditioning::Extension { .. } => {
                Resolution::Baseline
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationHandle(String);

impl OperationHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SynthesisOutput {
    pub video_uri: Option<String>,
    /// Set when the backend withheld samples, e.g. a safety filter.
    pub filtered_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationFailure {
    pub code: i32,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationOutcome {
    Succeeded(SynthesisOutput),
    Failed(OperationFailure),
}

/// A backend job as last reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub handle: OperationHandle,
    pub outcome: Option<OperationOutcome>,
}

impl Operation {
    pub fn pending(handle: OperationHandle) -> Self {
        Self {
            handle,
            outcome: None,
        }
    }

    pub fn done(&self) -> bool {
        self.outcome.is_some()
    }

    /// Seals a completed operation. Gives the operation back if it is still
    /// running.
    pub fn finish(self) -> std::result::Result<FinishedOperation, Operation> {
        match self.outcome {
            Some(outcome) => Ok(FinishedOperation {
                handle: self.handle,
                outcome,
            }),
            None => Err(self),
        }
    }
}

/// A terminal operation. It has no path back to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishedOperation {
    handle: OperationHandle,
    outcome: OperationOutcome,
}

impl FinishedOperation {
    pub fn handle(&self) -> &OperationHandle {
        &self.handle
    }

    pub fn outcome(&self) -> &OperationOutcome {
        &self.outcome
    }
}

/// Downloaded media. Dropping it releases the bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct Artifact {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub uri: String,
}

impl Artifact {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_prior(&self) -> PriorVideo {
        PriorVideo {
            uri: self.uri.clone(),
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl std::fmt::Debug for Artifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Artifact")
            .field("len", &self.bytes.len())
            .field("mime_type", &self.mime_type)
            .field("uri", &self.uri)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_uri_parsing() {
        let image = ImageInput::from_data_uri("data:image/jpeg;base64,QUJD").unwrap();
        assert_eq!(image.mime_type, "image/jpeg");
        assert_eq!(image.data, "QUJD");

        let bare = ImageInput::from_data_uri("QUJD").unwrap();
        assert_eq!(bare.mime_type, "image/png");

        assert!(ImageInput::from_data_uri("data:image/png,QUJD").is_err());
        assert!(ImageInput::from_data_uri("data:image/png;base64,").is_err());
    }

    #[test]
    fn test_wire_names() {
        assert_eq!(serde_json::to_string(&AspectRatio::Tall).unwrap(), "\"9:16\"");
        assert_eq!(serde_json::to_string(&Resolution::High).unwrap(), "\"1080p\"");
        assert_eq!(ConditioningMode::Extension.variant(), ModelVariant::Full);
        assert_eq!(ConditioningMode::SingleImage.variant(), ModelVariant::Fast);
    }

    #[test]
    fn test_finish_keeps_pending_operations() {
        let op = Operation::pending(OperationHandle::new("operations/1"));
        let op = op.finish().unwrap_err();
        assert!(!op.done());

        let done = Operation {
            handle: OperationHandle::new("operations/1"),
            outcome: Some(OperationOutcome::Succeeded(SynthesisOutput::default())),
        };
        let finished = done.finish().unwrap();
        assert_eq!(finished.handle().name(), "operations/1");
    }
}
