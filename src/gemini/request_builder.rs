use crate::error::{LuminaError, Result};
use crate::models::{Conditioning, ConditioningMode, GenerationRequest, GenerationSettings};

pub const MOTION_STRENGTH_RANGE: std::ops::RangeInclusive<u8> = 1..=10;
const DEFAULT_EXTENSION_PROMPT: &str = "Continue the scene";

/// Turns raw settings into a mode-valid request. Pure.
///
/// Mode precedence is Extension > Reference-Images > Single-Image > Text-Only.
/// Inputs belonging to a lower-precedence mode are dropped, never merged.
pub struct RequestBuilder;

impl RequestBuilder {
    pub fn resolve_mode(settings: &GenerationSettings) -> ConditioningMode {
        if settings.prior_video.is_some() {
            ConditioningMode::Extension
        } else if settings
            .reference_images
            .as_ref()
            .map_or(false, |refs| !refs.is_empty())
        {
            ConditioningMode::ReferenceImages
        } else if settings.image.is_some() {
            ConditioningMode::SingleImage
        } else {
            ConditioningMode::TextOnly
        }
    }

    pub fn build(settings: &GenerationSettings) -> Result<GenerationRequest> {
        if let Some(strength) = settings.motion_strength {
            if !MOTION_STRENGTH_RANGE.contains(&strength) {
                return Err(LuminaError::InvalidRequest(format!(
                    "motion strength must be between {} and {}, got {}",
                    MOTION_STRENGTH_RANGE.start(),
                    MOTION_STRENGTH_RANGE.end(),
                    strength
                )));
            }
        }

        let mode = Self::resolve_mode(settings);
        let prompt = settings.prompt.trim();

        let conditioning = match mode {
            ConditioningMode::Extension => Conditioning::Extension {
                prior: settings.prior_video.clone().ok_or_else(missing_input)?,
                aspect_ratio: settings.aspect_ratio,
            },
            ConditioningMode::ReferenceImages => Conditioning::ReferenceImages {
                references: settings.reference_images.clone().ok_or_else(missing_input)?,
            },
            ConditioningMode::SingleImage => Conditioning::SingleImage {
                image: settings.image.clone().ok_or_else(missing_input)?,
                last_frame: settings.last_frame.clone(),
                aspect_ratio: settings.aspect_ratio,
                resolution: settings.resolution,
            },
            ConditioningMode::TextOnly => {
                if prompt.is_empty() {
                    return Err(LuminaError::InvalidRequest(
                        "a prompt is required when no image or video is supplied".into(),
                    ));
                }
                Conditioning::TextOnly {
                    aspect_ratio: settings.aspect_ratio,
                    resolution: settings.resolution,
                }
            }
        };

        let prompt = match mode {
            ConditioningMode::Extension if prompt.is_empty() => DEFAULT_EXTENSION_PROMPT.to_string(),
            ConditioningMode::Extension => prompt.to_string(),
            _ => decorate_prompt(prompt, settings),
        };

        let negative_prompt = settings
            .negative_prompt
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(String::from);

        Ok(GenerationRequest {
            prompt,
            negative_prompt,
            conditioning,
        })
    }
}

fn decorate_prompt(prompt: &str, settings: &GenerationSettings) -> String {
    let mut decorated = String::new();
    if let Some(style) = settings.style.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        decorated.push_str(&format!("[Style: {}] ", style));
    }
    if let Some(strength) = settings.motion_strength {
        decorated.push_str(&format!("[Motion: {}/10] ", strength));
    }
    decorated.push_str(prompt);
    decorated.trim_end().to_string()
}

fn missing_input() -> LuminaError {
    LuminaError::InvalidRequest("conditioning input disappeared while building".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::models::{AspectRatio, ImageInput, PriorVideo, Resolution};

    fn image(tag: &str) -> ImageInput {
        ImageInput::new(tag, "image/png")
    }

    #[test]
    fn test_text_only() {
        let settings = GenerationSettings::new("A dragon flies over a neon city")
            .with_aspect_ratio(AspectRatio::Wide)
            .with_resolution(Resolution::Baseline);
        let request = RequestBuilder::build(&settings).unwrap();
        assert_eq!(request.mode(), ConditioningMode::TextOnly);
        assert_eq!(request.prompt, "A dragon flies over a neon city");
        assert_eq!(request.aspect_ratio(), AspectRatio::Wide);
    }

    #[test]
    fn test_empty_prompt_text_only_is_invalid() {
        let err = RequestBuilder::build(&GenerationSettings::new("   ")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }

    #[test]
    fn test_empty_prompt_allowed_with_image() {
        let settings = GenerationSettings::new("").with_image(image("a"));
        let request = RequestBuilder::build(&settings).unwrap();
        assert_eq!(request.mode(), ConditioningMode::SingleImage);
    }

    #[test]
    fn test_extension_forces_baseline() {
        for resolution in [Resolution::Baseline, Resolution::High] {
            let settings = GenerationSettings::new("keep going")
                .with_resolution(resolution)
                .with_aspect_ratio(AspectRatio::Tall)
                .with_prior_video(PriorVideo {
                    uri: "https://files/prior".into(),
                });
            let request = RequestBuilder::build(&settings).unwrap();
            assert_eq!(request.mode(), ConditioningMode::Extension);
            assert_eq!(request.resolution(), Resolution::Baseline);
            assert_eq!(request.aspect_ratio(), AspectRatio::Tall);
        }
    }

    #[test]
    fn test_reference_images_force_wide_baseline() {
        for (ratio, resolution) in [
            (AspectRatio::Tall, Resolution::High),
            (AspectRatio::Square, Resolution::Baseline),
            (AspectRatio::Wide, Resolution::High),
        ] {
            let settings = GenerationSettings::new("hero walks")
                .with_aspect_ratio(ratio)
                .with_resolution(resolution)
                .with_reference_images(vec![image("a"), image("b")]);
            let request = RequestBuilder::build(&settings).unwrap();
            assert_eq!(request.mode(), ConditioningMode::ReferenceImages);
            assert_eq!(request.aspect_ratio(), AspectRatio::Wide);
            assert_eq!(request.resolution(), Resolution::Baseline);
        }
    }

    #[test]
    fn test_extension_beats_reference_images() {
        let settings = GenerationSettings::new("next shot")
            .with_reference_images(vec![image("a")])
            .with_image(image("single"))
            .with_prior_video(PriorVideo {
                uri: "https://files/prior".into(),
            });
        let request = RequestBuilder::build(&settings).unwrap();
        assert_eq!(request.mode(), ConditioningMode::Extension);
        assert!(matches!(request.conditioning, Conditioning::Extension { .. }));
    }

    #[test]
    fn test_empty_reference_list_falls_through() {
        let settings = GenerationSettings::new("a cat")
            .with_reference_images(vec![])
            .with_image(image("single"));
        assert_eq!(
            RequestBuilder::resolve_mode(&settings),
            ConditioningMode::SingleImage
        );

        let settings = GenerationSettings::new("a cat").with_reference_images(vec![]);
        assert_eq!(RequestBuilder::resolve_mode(&settings), ConditioningMode::TextOnly);
    }

    #[test]
    fn test_prompt_decoration() {
        let settings = GenerationSettings::new("rain on glass")
            .with_style("Film noir")
            .with_motion_strength(4);
        let request = RequestBuilder::build(&settings).unwrap();
        assert_eq!(request.prompt, "[Style: Film noir] [Motion: 4/10] rain on glass");
    }

    #[test]
    fn test_extension_defaults_prompt_and_skips_style() {
        let settings = GenerationSettings::new("")
            .with_style("Anime")
            .with_prior_video(PriorVideo {
                uri: "https://files/prior".into(),
            });
        let request = RequestBuilder::build(&settings).unwrap();
        assert_eq!(request.prompt, "Continue the scene");
    }

    #[test]
    fn test_motion_strength_bounds() {
        for strength in [0, 11, 200] {
            let settings = GenerationSettings::new("x").with_motion_strength(strength);
            assert_eq!(
                RequestBuilder::build(&settings).unwrap_err().kind(),
                ErrorKind::InvalidRequest
            );
        }
    }

    #[test]
    fn test_blank_negative_prompt_dropped() {
        let settings = GenerationSettings::new("x").with_negative_prompt("  ");
        assert_eq!(RequestBuilder::build(&settings).unwrap().negative_prompt, None);
    }

    #[test]
    fn test_build_is_deterministic() {
        let settings = GenerationSettings::new("same").with_style("Pixar");
        assert_eq!(
            RequestBuilder::build(&settings).unwrap(),
            RequestBuilder::build(&settings).unwrap()
        );
    }
}
