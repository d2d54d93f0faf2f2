use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Texture units a config may name, `GL_TEXTURE0` through `GL_TEXTURE31`.
pub const MAX_TEXTURE_UNITS: u32 = 32;

/// Renderer behaviour that varies between deployments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Unbind the external texture after each draw. Some drivers only show a
    /// texture shared between contexts fresh content after it is re-bound;
    /// contexts that own the texture exclusively can turn this off.
    pub unbind_after_draw: bool,
    /// Colour the frame is cleared to before the quad is drawn.
    pub clear_color: [f32; 4],
    /// Texture unit the external texture is bound to, below [`MAX_TEXTURE_UNITS`].
    pub texture_unit: u32,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            unbind_after_draw: true,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            texture_unit: 0,
        }
    }
}

impl RendererConfig {
    /// Load from a JSON file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let file = std::fs::File::open(path)?;
        let config: Self = serde_json::from_reader(file)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.texture_unit >= MAX_TEXTURE_UNITS {
            return Err(ConfigError::TextureUnit {
                unit: self.texture_unit,
                max: MAX_TEXTURE_UNITS,
            });
        }
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }
}
