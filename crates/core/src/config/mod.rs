use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{BlendMode, EdgeMode, Result};

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub render: RenderConfig,
    pub preset: PresetConfig,
}

impl AppConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

/// Output size and frame count for offline rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub width: usize,
    pub height: usize,
    pub frames: u32,
    /// Worker threads for the tile scheduler; 0 means one per hardware thread.
    pub threads: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 320,
            height: 240,
            frames: 60,
            threads: 0,
        }
    }
}

/// Ordered list of effect nodes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PresetConfig {
    pub name: String,
    pub nodes: Vec<NodeConfig>,
}

impl PresetConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeConfig {
    ColorMap(ColorMapConfig),
    Movement(MovementConfig),
}

/// Source text for the four script slots of a node.
///
/// `pixel` holds the level script of a colour map or the point script of a
/// movement node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptSet {
    pub init: String,
    pub frame: String,
    pub beat: String,
    pub pixel: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorMapConfig {
    pub scripts: ScriptSet,
    pub blend: BlendMode,
    /// Rebuild the lookup table every frame instead of only on edits.
    pub recompute: bool,
    pub enabled: bool,
}

impl Default for ColorMapConfig {
    fn default() -> Self {
        Self {
            scripts: ScriptSet {
                pixel: "red = red; green = green; blue = blue".to_string(),
                ..ScriptSet::default()
            },
            blend: BlendMode::Replace,
            recompute: false,
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    pub scripts: ScriptSet,
    pub edge: EdgeMode,
    pub blend: BlendMode,
    /// Requested row bands per frame; 0 means one per hardware thread.
    pub threads: usize,
    pub enabled: bool,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            scripts: ScriptSet {
                pixel: "x = x; y = y".to_string(),
                ..ScriptSet::default()
            },
            edge: EdgeMode::Clamp,
            blend: BlendMode::Replace,
            threads: 0,
            enabled: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tagged_nodes_with_defaults() {
        let preset = PresetConfig::from_json_str(
            r#"{
                "name": "swirl",
                "nodes": [
                    { "type": "movement", "edge": "wrap", "scripts": { "pixel": "x = x + 0.1" } },
                    { "type": "color_map", "blend": "multiply", "recompute": true }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(preset.name, "swirl");
        match &preset.nodes[0] {
            NodeConfig::Movement(movement) => {
                assert_eq!(movement.edge, EdgeMode::Wrap);
                assert_eq!(movement.blend, BlendMode::Replace);
                assert_eq!(movement.scripts.pixel, "x = x + 0.1");
                assert!(movement.enabled);
            }
            other => panic!("expected movement node, got {other:?}"),
        }
        match &preset.nodes[1] {
            NodeConfig::ColorMap(color) => {
                assert_eq!(color.blend, BlendMode::Multiply);
                assert!(color.recompute);
                assert!(color.scripts.pixel.contains("red = red"));
            }
            other => panic!("expected color map node, got {other:?}"),
        }
    }

    #[test]
    fn empty_document_uses_render_defaults() {
        let config = AppConfig::from_json_str("{}").unwrap();
        assert_eq!(config.render.width, 320);
        assert_eq!(config.render.frames, 60);
        assert!(config.preset.nodes.is_empty());
    }

    #[test]
    fn rejects_unknown_node_types() {
        let err = PresetConfig::from_json_str(r#"{ "nodes": [ { "type": "blur" } ] }"#)
            .unwrap_err();
        assert!(matches!(err, crate::VisFxError::Config(_)));
    }
}
