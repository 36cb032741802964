//! Motion configuration (motion.toml)
//!
//! Every section and field falls back to its default, so a config file only
//! needs to name what it changes. Easings are written by name.

use crate::easing::Easing;
use crate::error::Result;
use crate::particles::{Intensity, ParticleFieldConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Top-level motion configuration
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct MotionConfig {
    #[serde(default)]
    pub frame: FrameConfig,
    #[serde(default)]
    pub cursor: CursorConfig,
    #[serde(default)]
    pub magnetic: MagneticConfig,
    #[serde(default)]
    pub tilt: TiltConfig,
    #[serde(default)]
    pub reveal: RevealConfig,
    #[serde(default)]
    pub particles: ParticlesConfig,
}

/// Per-context frame clock settings
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct FrameConfig {
    /// Largest delta a single frame may advance a context clock by
    #[serde(default = "default_max_delta")]
    pub max_delta: f32,
}

fn default_max_delta() -> f32 {
    0.1
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_delta: default_max_delta(),
        }
    }
}

/// Custom cursor layers
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CursorConfig {
    pub dot_duration: f32,
    pub dot_ease: Easing,
    pub ring_duration: f32,
    pub ring_ease: Easing,
    pub glow_duration: f32,
    pub glow_ease: Easing,
    /// Glow is centered on the pointer by offsetting half its size
    pub glow_offset: f32,
    /// Ring scale while hovering an interactive element
    pub ring_hover_scale: f32,
    /// Dot scale while hovering an interactive element
    pub dot_hover_scale: f32,
    pub hover_duration: f32,
}

impl Default for CursorConfig {
    fn default() -> Self {
        Self {
            dot_duration: 0.1,
            dot_ease: Easing::EaseOutCubic,
            ring_duration: 0.4,
            ring_ease: Easing::EaseOutQuart,
            glow_duration: 0.8,
            glow_ease: Easing::EaseOutQuart,
            glow_offset: 200.0,
            ring_hover_scale: 2.0,
            dot_hover_scale: 0.0,
            hover_duration: 0.3,
        }
    }
}

/// Magnetic buttons
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MagneticConfig {
    pub strength: f32,
    /// Inner content follows at this fraction of the button's pull
    pub content_factor: f32,
    pub duration: f32,
    pub ease: Easing,
    pub release_duration: f32,
    pub release_ease: Easing,
}

impl Default for MagneticConfig {
    fn default() -> Self {
        Self {
            strength: 0.3,
            content_factor: 0.5,
            duration: 0.4,
            ease: Easing::EaseOutQuart,
            release_duration: 0.7,
            release_ease: Easing::ElasticOut {
                amplitude: 1.0,
                period: 0.3,
            },
        }
    }
}

/// Card tilt
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TiltConfig {
    pub degrees: f32,
    pub duration: f32,
    pub ease: Easing,
}

impl Default for TiltConfig {
    fn default() -> Self {
        Self {
            degrees: 12.0,
            duration: 0.3,
            ease: Easing::EaseOutQuart,
        }
    }
}

/// Scroll-triggered text and section reveals
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RevealConfig {
    /// Start edge, e.g. `"top 80%"`
    pub start: String,
    pub duration: f32,
    pub stagger: f32,
    pub y: f32,
    pub rotate_x: f32,
    pub ease: Easing,
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            start: "top 80%".to_string(),
            duration: 0.8,
            stagger: 0.02,
            y: 60.0,
            rotate_x: -20.0,
            ease: Easing::EaseOutQuart,
        }
    }
}

/// Background particle field
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ParticlesConfig {
    pub intensity: Intensity,
    pub seed: u64,
    pub show_geometry: bool,
}

impl Default for ParticlesConfig {
    fn default() -> Self {
        let field = ParticleFieldConfig::default();
        Self {
            intensity: Intensity::default(),
            seed: field.seed,
            show_geometry: field.show_geometry,
        }
    }
}

impl ParticlesConfig {
    pub fn field_config(&self) -> ParticleFieldConfig {
        let mut config = ParticleFieldConfig::with_intensity(self.intensity).seed(self.seed);
        config.show_geometry = self.show_geometry;
        config
    }
}

impl MotionConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from a file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.as_ref().display(), "loaded motion config");
        Ok(config)
    }

    /// Serialize to TOML string
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = MotionConfig::from_toml_str("").unwrap();
        assert_eq!(config, MotionConfig::default());
        assert_eq!(config.frame.max_delta, 0.1);
        assert_eq!(config.cursor.ring_duration, 0.4);
    }

    #[test]
    fn test_partial_sections() {
        let config = MotionConfig::from_toml_str(
            r#"
            [magnetic]
            strength = 0.5
            release_ease = "back.out(1.7)"

            [particles]
            intensity = "high"
            "#,
        )
        .unwrap();

        assert_eq!(config.magnetic.strength, 0.5);
        assert_eq!(config.magnetic.duration, 0.4);
        assert_eq!(config.magnetic.release_ease, Easing::BackOut(1.7));
        assert_eq!(config.particles.field_config().count, 1200);
        assert_eq!(config.tilt, TiltConfig::default());
    }

    #[test]
    fn test_unknown_easing_is_rejected() {
        let result = MotionConfig::from_toml_str("[tilt]\nease = \"wobbly\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = MotionConfig::default();
        config.reveal.start = "top 60%".to_string();
        let text = config.to_toml().unwrap();
        assert_eq!(MotionConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_json_uses_same_names() {
        let json = serde_json::to_value(MotionConfig::default()).unwrap();
        assert_eq!(json["cursor"]["dot_ease"], "power2.out");
        assert_eq!(json["particles"]["intensity"], "medium");

        let parsed: MotionConfig =
            serde_json::from_str(r#"{"tilt": {"degrees": 8.0}}"#).unwrap();
        assert_eq!(parsed.tilt.degrees, 8.0);
        assert_eq!(parsed.tilt.duration, 0.3);
    }
}
