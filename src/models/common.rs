use super::video::ConditioningMode;
use serde::{Deserialize, Serialize};

/// A single shot from [`crate::gemini::GeminiClient::plan_storyboard`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryboardScene {
    pub title: String,
    pub prompt: String,
    #[serde(rename = "shotType", alias = "shot_type", default)]
    pub shot_type: String,
}

/// Progress of a video job. Purely informational.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    Submitting { mode: ConditioningMode, model: String },
    Submitted { operation: String },
    Polling { tick: u32, status: String },
    Downloading,
    Narrating,
    Completed,
    Failed { kind: crate::error::ErrorKind },
}

impl ProgressEvent {
    /// Human-readable status line for display.
    pub fn status(&self) -> String {
        match self {
            ProgressEvent::Submitting { mode, .. } => match mode {
                ConditioningMode::Extension => "Extending cinematic timeline...".to_string(),
                _ => "Connecting to Veo servers...".to_string(),
            },
            ProgressEvent::Submitted { .. } => "Job accepted, rendering started...".to_string(),
            ProgressEvent::Polling { status, .. } => status.clone(),
            ProgressEvent::Downloading => "Downloading cinematic master...".to_string(),
            ProgressEvent::Narrating => "Recording narration...".to_string(),
            ProgressEvent::Completed => "Done.".to_string(),
            ProgressEvent::Failed { kind } => format!("Failed ({})", kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storyboard_scene_accepts_camel_case() {
        let json = r#"{"title":"Opening","prompt":"A wide shot","shotType":"Wide"}"#;
        let scene: StoryboardScene = serde_json::from_str(json).unwrap();
        assert_eq!(scene.shot_type, "Wide");
    }

    #[test]
    fn test_polling_status_passthrough() {
        let event = ProgressEvent::Polling {
            tick: 2,
            status: "Finalizing pixels...".into(),
        };
        assert_eq!(event.status(), "Finalizing pixels...");
    }
}
