use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Tagged `#shader vertex` / `#shader fragment` file.
    pub shader_path: PathBuf,
    pub clear_color: [f32; 4],
    /// Draw with the built-in shader when `shader_path` cannot be loaded or built.
    pub fallback_shader: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            shader_path: PathBuf::from("assets/shaders/Basic.shader"),
            clear_color: [0.0, 0.0, 0.0, 1.0],
            fallback_shader: false,
        }
    }
}
