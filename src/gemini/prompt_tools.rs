use super::backend::TextBackend;
use super::classifier::{classify_backend, require_credential, Stage};
use crate::credentials::CredentialResolver;
use crate::error::{LuminaError, Result};
use crate::models::StoryboardScene;

/// Text-model helpers around a video prompt. All of them are best-effort and
/// fall back to a neutral value instead of failing.
pub struct PromptTools<'a> {
    text: &'a dyn TextBackend,
    credentials: &'a dyn CredentialResolver,
    model: &'a str,
}

impl<'a> PromptTools<'a> {
    pub fn new(
        text: &'a dyn TextBackend,
        credentials: &'a dyn CredentialResolver,
        model: &'a str,
    ) -> Self {
        Self {
            text,
            credentials,
            model,
        }
    }

    /// Rewrites a prompt with lighting, movement and mood cues. Returns the
    /// input unchanged when refinement is unavailable.
    pub async fn refine_prompt(&self, prompt: &str) -> String {
        if prompt.trim().is_empty() {
            return String::new();
        }
        let instruction = format!(
            "Act as a professional cinematographer. Improve this video prompt for an AI video \
             model (Veo 3.1). Keep it concise but descriptive about lighting, movement, and mood. \
             Return only the improved prompt. Prompt: \"{}\"",
            prompt
        );
        match self.ask(&instruction, false).await {
            Ok(refined) if !refined.trim().is_empty() => refined.trim().to_string(),
            Ok(_) => prompt.to_string(),
            Err(e) => {
                log::warn!("Prompt refinement failed, keeping original: {}", e);
                prompt.to_string()
            }
        }
    }

    /// Splits a short script into three scenes. Empty on failure.
    pub async fn plan_storyboard(&self, script: &str) -> Vec<StoryboardScene> {
        if script.trim().is_empty() {
            return Vec::new();
        }
        let instruction = format!(
            "Act as a film director. Break this short script into 3 cinematic scenes for an AI \
             video model. Return ONLY a JSON array of objects with keys: \"title\" (short name), \
             \"prompt\" (detailed visual description), \"shotType\" (e.g. Wide, Close-up, POV). \
             Script: \"{}\"",
            script
        );
        let parsed = match self.ask(&instruction, true).await {
            Ok(raw) => parse_storyboard(&raw),
            Err(e) => Err(e),
        };
        parsed.unwrap_or_else(|e| {
            log::warn!("Storyboard planning failed: {}", e);
            Vec::new()
        })
    }

    /// One-sentence director's note about a scene. Empty on failure.
    pub async fn directors_note(&self, prompt: &str) -> String {
        let instruction = format!(
            "As a legendary film director, write a 1-sentence \"Director's Note\" about the \
             cinematic potential of this scene: \"{}\". Focus on mood and visual storytelling.",
            prompt
        );
        self.ask(&instruction, false)
            .await
            .map(|note| note.trim().to_string())
            .unwrap_or_default()
    }

    async fn ask(&self, instruction: &str, json_output: bool) -> Result<String> {
        let api_key = require_credential(self.credentials.resolve())?;
        self.text
            .generate(self.model, instruction, &api_key, json_output)
            .await
            .map_err(|e| classify_backend(Stage::Script, e))
    }
}

/// Parses a JSON array of scenes, tolerating a fenced code block around it.
pub fn parse_storyboard(raw: &str) -> Result<Vec<StoryboardScene>> {
    let trimmed = raw.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .map(|rest| rest.trim_end().trim_end_matches("```"))
        .unwrap_or(trimmed)
        .trim();

    serde_json::from_str(unfenced)
        .map_err(|e| LuminaError::Backend(format!("storyboard is not a scene list: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_array() {
        let raw = r#"[{"title":"Arrival","prompt":"Train pulls in","shotType":"Wide"}]"#;
        let scenes = parse_storyboard(raw).unwrap();
        assert_eq!(scenes.len(), 1);
        assert_eq!(scenes[0].title, "Arrival");
    }

    #[test]
    fn test_parse_fenced_array() {
        let raw = "```json\n[{\"title\":\"A\",\"prompt\":\"B\",\"shotType\":\"POV\"}]\n```";
        let scenes = parse_storyboard(raw).unwrap();
        assert_eq!(scenes[0].shot_type, "POV");
    }

    #[test]
    fn test_parse_rejects_object() {
        assert!(parse_storyboard(r#"{"title":"x"}"#).is_err());
    }
}
