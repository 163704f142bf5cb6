use super::device::GlDevice;
use super::mesh::QuadMesh;
use super::shaders::{fallback, ShaderError, ShaderProgram};
use crate::config::RenderConfig;

/// Builds the program named by `config`, substituting the built-in pair when
/// the file is unusable and `fallback_shader` is set.
pub fn load_program(
    device: &GlDevice,
    config: &RenderConfig,
) -> Result<ShaderProgram, ShaderError> {
    match ShaderProgram::from_file(device, &config.shader_path) {
        Ok(program) => Ok(program),
        Err(err) if config.fallback_shader => {
            log::warn!("{}; drawing with the built-in shader", err);
            ShaderProgram::build(device, &fallback::source())
        }
        Err(err) => Err(err),
    }
}

/// Everything drawn per frame: one program, one quad.
pub struct Renderer {
    program: ShaderProgram,
    mesh: QuadMesh,
}

impl Renderer {
    pub fn new(device: &GlDevice, program: ShaderProgram, clear_color: [f32; 4]) -> Self {
        device.set_clear_color(clear_color);
        let mesh = QuadMesh::upload(device);
        program.set_used();
        Self { program, mesh }
    }

    pub fn program(&self) -> &ShaderProgram {
        &self.program
    }

    pub fn draw_frame(&self, device: &GlDevice) {
        device.clear();
        self.program.set_used();
        self.mesh.draw(device);
    }
}
