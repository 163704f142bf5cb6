pub mod config;
pub mod render;

// Re-export commonly used types
pub use config::{AppConfig, RenderConfig, WindowConfig};
pub use render::device::{GlDevice, ShaderDevice};
pub use render::renderer::Renderer;
pub use render::shaders::{build_program, compile_stage, ShaderError, ShaderProgram, ShaderStage};
pub use render::source::ShaderSource;
