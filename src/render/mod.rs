pub mod device;
pub mod mesh;
pub mod renderer;
pub mod shaders;
pub mod source;

pub use device::{GlDevice, ShaderDevice};
pub use mesh::QuadMesh;
pub use renderer::{load_program, Renderer};
pub use shaders::{ShaderError, ShaderProgram, ShaderStage};
pub use source::ShaderSource;
