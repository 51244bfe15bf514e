//! Renderer configuration

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::types::Result;

/// Renderer settings loaded at scene setup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Per-frame clear color for the face pixel buffers. Pixels the render
    /// never reaches keep this value, so it doubles as the sky color.
    pub sky_color: u32,
    /// Quadtree depth per cube face; faces are `1 << face_depth` pixels wide.
    pub face_depth: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            sky_color: 0xC0C0_C0C0,
            face_depth: 10,
        }
    }
}

impl RenderConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text)
            .map_err(|e| crate::core::Error::InputParse(format!("{}: {}", path.display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RenderConfig::default();
        assert_eq!(config.sky_color, 0xC0C0_C0C0);
        assert_eq!(config.face_depth, 10);
    }

    #[test]
    fn test_json_roundtrip() {
        let config = RenderConfig {
            sky_color: 0x1020_3040,
            face_depth: 8,
        };
        let text = serde_json::to_string(&config).expect("serialize failed");
        let back: RenderConfig = serde_json::from_str(&text).expect("deserialize failed");
        assert_eq!(back.sky_color, config.sky_color);
        assert_eq!(back.face_depth, config.face_depth);
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join("octcast_render_config.json");
        std::fs::write(&path, r#"{"sky_color": 255, "face_depth": 6}"#).expect("write failed");
        let config = RenderConfig::load(&path).expect("load failed");
        assert_eq!(config.sky_color, 255);
        assert_eq!(config.face_depth, 6);
        std::fs::remove_file(&path).ok();

        let missing = std::env::temp_dir().join("octcast_no_config.json");
        assert!(RenderConfig::load(&missing).is_err());
    }
}
