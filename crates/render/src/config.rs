use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const MAX_BLUR_RADIUS: i32 = 10;

/// Per-run frame settings. Missing JSON fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    pub vsync: bool,
    pub fullscreen: bool,
    /// Route the color pass through the offscreen blur.
    pub post_process: bool,
    /// Box blur radius in pixels, `0..=MAX_BLUR_RADIUS`.
    pub blur_radius: i32,
    /// Edge length of the square shadow map.
    pub shadow_map_resolution: u32,
    pub clear_color: [f32; 4],
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            vsync: false,
            fullscreen: false,
            post_process: true,
            blur_radius: 1,
            shadow_map_resolution: 1024,
            clear_color: [0.4, 0.6, 0.75, 1.0],
        }
    }
}

impl FrameConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json_str(&text)?;
        tracing::info!(path = %path.as_ref().display(), "frame config loaded");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0..=MAX_BLUR_RADIUS).contains(&self.blur_radius) {
            return Err(ConfigError::Invalid(format!(
                "blur_radius {} outside 0..={MAX_BLUR_RADIUS}",
                self.blur_radius
            )));
        }
        if self.shadow_map_resolution == 0 {
            return Err(ConfigError::Invalid(
                "shadow_map_resolution must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Whether presentation must wait for vertical blank.
    pub fn vsync_required(&self, tearing_supported: bool) -> bool {
        self.vsync || !tearing_supported || self.fullscreen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_demo() {
        let c = FrameConfig::default();
        assert_eq!(c.blur_radius, 1);
        assert_eq!(c.shadow_map_resolution, 1024);
        assert_eq!(c.clear_color, [0.4, 0.6, 0.75, 1.0]);
        assert!(c.post_process);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let c = FrameConfig::from_json_str(r#"{ "vsync": true, "blur_radius": 4 }"#).unwrap();
        assert!(c.vsync);
        assert_eq!(c.blur_radius, 4);
        assert_eq!(c.shadow_map_resolution, 1024);
    }

    #[test]
    fn out_of_range_blur_is_rejected() {
        let err = FrameConfig::from_json_str(r#"{ "blur_radius": 11 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn bad_json_is_a_parse_error() {
        let err = FrameConfig::from_json_str("{ vsync: yes").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn vsync_rules() {
        let mut c = FrameConfig::default();
        assert!(!c.vsync_required(true));
        assert!(c.vsync_required(false));
        c.fullscreen = true;
        assert!(c.vsync_required(true));
        c.fullscreen = false;
        c.vsync = true;
        assert!(c.vsync_required(true));
    }
}
