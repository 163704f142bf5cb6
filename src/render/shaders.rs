// shaders.rs - stage compilation and program linking

use super::device::{GlDevice, ShaderDevice};
use super::source::ShaderSource;
use gl::types::*;
use std::ffi::NulError;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("Failed to read shader file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Null byte error: {0}")]
    Nul(#[from] NulError),
    #[error("Shader object creation failed: {0}")]
    Creation(String),
    #[error("Failed to compile {stage} shader: {log}")]
    Compilation { stage: ShaderStage, log: String },
    #[error("Program linking failed: {0}")]
    Linking(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub fn gl_kind(self) -> GLenum {
        match self {
            ShaderStage::Vertex => gl::VERTEX_SHADER,
            ShaderStage::Fragment => gl::FRAGMENT_SHADER,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Compiles one stage. On failure the stage object is already deleted and the
/// driver's info log is carried in the error.
pub fn compile_stage<D: ShaderDevice>(
    device: &D,
    stage: ShaderStage,
    source: &str,
) -> Result<D::Shader, ShaderError> {
    let shader = device.create_shader(stage).map_err(ShaderError::Creation)?;

    if let Err(err) = device.shader_source(shader, source) {
        device.delete_shader(shader);
        return Err(err.into());
    }
    device.compile_shader(shader);

    if !device.shader_compile_status(shader) {
        let log = device.shader_info_log(shader);
        log::error!("Failed to compile {} shader: {}", stage, log);
        device.delete_shader(shader);
        return Err(ShaderError::Compilation { stage, log });
    }

    Ok(shader)
}

/// Compiles both stages and links them. No program object is created unless
/// both stages compiled; every stage object is released before returning.
pub fn build_program<D: ShaderDevice>(
    device: &D,
    source: &ShaderSource,
) -> Result<D::Program, ShaderError> {
    // Both stages are compiled even if the first fails so each gets its log.
    let vertex = compile_stage(device, ShaderStage::Vertex, &source.vertex);
    let fragment = compile_stage(device, ShaderStage::Fragment, &source.fragment);

    let (vertex, fragment) = match (vertex, fragment) {
        (Ok(vertex), Ok(fragment)) => (vertex, fragment),
        (Err(err), other) | (other, Err(err)) => {
            if let Ok(shader) = other {
                device.delete_shader(shader);
            }
            return Err(err);
        }
    };

    let program = match device.create_program() {
        Ok(program) => program,
        Err(err) => {
            device.delete_shader(vertex);
            device.delete_shader(fragment);
            return Err(ShaderError::Creation(err));
        }
    };

    device.attach_shader(program, vertex);
    device.attach_shader(program, fragment);
    device.link_program(program);

    let linked = device.program_link_status(program);
    if linked {
        device.validate_program(program);
        if !device.program_validate_status(program) {
            log::warn!(
                "Program validation failed: {}",
                device.program_info_log(program)
            );
        }
    }

    // The linked program keeps the compiled code.
    device.detach_shader(program, vertex);
    device.detach_shader(program, fragment);
    device.delete_shader(vertex);
    device.delete_shader(fragment);

    if !linked {
        let log = device.program_info_log(program);
        log::error!("Program linking failed: {}", log);
        device.delete_program(program);
        return Err(ShaderError::Linking(log));
    }

    Ok(program)
}

/// Linked GL program, deleted on drop.
pub struct ShaderProgram {
    id: GLuint,
}

impl ShaderProgram {
    pub fn build(device: &GlDevice, source: &ShaderSource) -> Result<Self, ShaderError> {
        let id = build_program(device, source)?;
        log::info!("Built shader program {}", id);
        Ok(Self { id })
    }

    pub fn from_file(device: &GlDevice, path: impl AsRef<Path>) -> Result<Self, ShaderError> {
        let source = ShaderSource::from_file(path)?;
        Self::build(device, &source)
    }

    pub fn id(&self) -> GLuint {
        self.id
    }

    pub fn set_used(&self) {
        unsafe {
            gl::UseProgram(self.id);
        }
    }
}

impl Drop for ShaderProgram {
    fn drop(&mut self) {
        unsafe { gl::DeleteProgram(self.id) };
    }
}

/// Solid colour pair used when the configured shader file is unusable.
pub mod fallback {
    use super::ShaderSource;

    pub const VERTEX_SRC: &str = r#"#version 330 core
layout (location = 0) in vec4 position;

void main() {
    gl_Position = position;
}
"#;

    pub const FRAGMENT_SRC: &str = r#"#version 330 core
layout (location = 0) out vec4 color;

void main() {
    color = vec4(1.0, 0.0, 1.0, 1.0);
}
"#;

    pub fn source() -> ShaderSource {
        ShaderSource::new(VERTEX_SRC, FRAGMENT_SRC)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::{HashMap, HashSet};

    const SYNTAX_ERROR: &str = "0:1(1): error: syntax error, unexpected end of file";

    /// In-memory driver: a stage compiles when its source has a `main`.
    #[derive(Default)]
    struct FakeDevice {
        next_id: RefCell<u32>,
        sources: RefCell<HashMap<u32, String>>,
        compiled: RefCell<HashSet<u32>>,
        live_shaders: RefCell<HashSet<u32>>,
        live_programs: RefCell<HashSet<u32>>,
        attached: RefCell<Vec<(u32, u32)>>,
        fail_create_shader: bool,
        fail_create_program: bool,
        fail_link: bool,
    }

    impl FakeDevice {
        fn next(&self) -> u32 {
            let mut id = self.next_id.borrow_mut();
            *id += 1;
            *id
        }
    }

    impl ShaderDevice for FakeDevice {
        type Shader = u32;
        type Program = u32;

        fn create_shader(&self, stage: ShaderStage) -> Result<u32, String> {
            if self.fail_create_shader {
                return Err(format!("out of {} shader objects", stage));
            }
            let id = self.next();
            self.live_shaders.borrow_mut().insert(id);
            Ok(id)
        }

        fn shader_source(&self, shader: u32, source: &str) -> Result<(), NulError> {
            std::ffi::CString::new(source)?;
            self.sources.borrow_mut().insert(shader, source.to_string());
            Ok(())
        }

        fn compile_shader(&self, shader: u32) {
            if self.sources.borrow()[&shader].contains("void main()") {
                self.compiled.borrow_mut().insert(shader);
            }
        }

        fn shader_compile_status(&self, shader: u32) -> bool {
            self.compiled.borrow().contains(&shader)
        }

        fn shader_info_log(&self, shader: u32) -> String {
            if self.shader_compile_status(shader) {
                String::new()
            } else {
                SYNTAX_ERROR.to_string()
            }
        }

        fn delete_shader(&self, shader: u32) {
            assert!(self.live_shaders.borrow_mut().remove(&shader));
        }

        fn create_program(&self) -> Result<u32, String> {
            if self.fail_create_program {
                return Err("out of program objects".to_string());
            }
            let id = self.next();
            self.live_programs.borrow_mut().insert(id);
            Ok(id)
        }

        fn attach_shader(&self, program: u32, shader: u32) {
            assert!(self.compiled.borrow().contains(&shader));
            self.attached.borrow_mut().push((program, shader));
        }

        fn detach_shader(&self, program: u32, shader: u32) {
            self.attached
                .borrow_mut()
                .retain(|&pair| pair != (program, shader));
        }

        fn link_program(&self, _program: u32) {}

        fn program_link_status(&self, _program: u32) -> bool {
            !self.fail_link
        }

        fn validate_program(&self, _program: u32) {}

        fn program_validate_status(&self, _program: u32) -> bool {
            true
        }

        fn program_info_log(&self, _program: u32) -> String {
            if self.fail_link {
                "error: vertex output not consumed".to_string()
            } else {
                String::new()
            }
        }

        fn delete_program(&self, program: u32) {
            assert!(self.live_programs.borrow_mut().remove(&program));
        }
    }

    fn valid_source() -> ShaderSource {
        ShaderSource::new(
            "#version 330 core\nvoid main() { gl_Position = vec4(0.0); }\n",
            "#version 330 core\nout vec4 color;\nvoid main() { color = vec4(1.0); }\n",
        )
    }

    #[test]
    fn test_build_program_success() {
        let device = FakeDevice::default();
        let program = build_program(&device, &valid_source()).unwrap();

        assert!(device.live_programs.borrow().contains(&program));
        assert!(device.live_shaders.borrow().is_empty());
        assert!(device.attached.borrow().is_empty());
    }

    #[test]
    fn test_invalid_stage_reports_failure() {
        let device = FakeDevice::default();

        let vertex = compile_stage(&device, ShaderStage::Vertex, &valid_source().vertex);
        let fragment = compile_stage(&device, ShaderStage::Fragment, "color = ;\n");

        assert!(vertex.is_ok());
        match fragment {
            Err(ShaderError::Compilation { stage, log }) => {
                assert_eq!(stage, ShaderStage::Fragment);
                assert!(!log.is_empty());
            }
            other => panic!("expected compilation error, got {:?}", other),
        }
        // Only the valid stage is still alive.
        assert_eq!(device.live_shaders.borrow().len(), 1);
    }

    #[test]
    fn test_failed_stage_creates_no_program() {
        let device = FakeDevice::default();
        let source = ShaderSource::new(valid_source().vertex, "not glsl\n");

        match build_program(&device, &source) {
            Err(ShaderError::Compilation { stage, log }) => {
                assert_eq!(stage, ShaderStage::Fragment);
                assert_eq!(log, SYNTAX_ERROR);
            }
            other => panic!("expected compilation error, got {:?}", other),
        }
        assert!(device.live_programs.borrow().is_empty());
        assert!(device.live_shaders.borrow().is_empty());
        assert!(device.attached.borrow().is_empty());
    }

    #[test]
    fn test_first_failing_stage_is_reported() {
        let device = FakeDevice::default();
        let source = ShaderSource::default();

        match build_program(&device, &source) {
            Err(ShaderError::Compilation { stage, .. }) => {
                assert_eq!(stage, ShaderStage::Vertex)
            }
            other => panic!("expected compilation error, got {:?}", other),
        }
        assert!(device.live_shaders.borrow().is_empty());
    }

    #[test]
    fn test_link_failure_releases_everything() {
        let device = FakeDevice {
            fail_link: true,
            ..Default::default()
        };

        match build_program(&device, &valid_source()) {
            Err(ShaderError::Linking(log)) => assert!(log.contains("not consumed")),
            other => panic!("expected linking error, got {:?}", other),
        }
        assert!(device.live_programs.borrow().is_empty());
        assert!(device.live_shaders.borrow().is_empty());
    }

    #[test]
    fn test_nul_in_source_releases_stages() {
        let device = FakeDevice::default();
        let source = ShaderSource::parse(
            "#shader vertex\r\nvoid main() {}\r\n#shader fragment\r\nB\0\r\n",
        );

        assert!(matches!(
            build_program(&device, &source),
            Err(ShaderError::Nul(_))
        ));
        assert!(device.live_shaders.borrow().is_empty());
        assert!(device.live_programs.borrow().is_empty());
    }

    #[test]
    fn test_program_creation_failure_releases_stages() {
        let device = FakeDevice {
            fail_create_program: true,
            ..Default::default()
        };

        match build_program(&device, &valid_source()) {
            Err(ShaderError::Creation(msg)) => assert!(msg.contains("program")),
            other => panic!("expected creation error, got {:?}", other),
        }
        assert!(device.live_shaders.borrow().is_empty());
        assert!(device.live_programs.borrow().is_empty());
    }

    #[test]
    fn test_shader_creation_failure() {
        let device = FakeDevice {
            fail_create_shader: true,
            ..Default::default()
        };

        match build_program(&device, &valid_source()) {
            Err(ShaderError::Creation(msg)) => assert!(msg.contains("vertex")),
            other => panic!("expected creation error, got {:?}", other),
        }
        assert!(device.live_shaders.borrow().is_empty());
        assert!(device.live_programs.borrow().is_empty());
    }

    #[test]
    fn test_fallback_compiles() {
        let device = FakeDevice::default();
        assert!(build_program(&device, &fallback::source()).is_ok());
    }

    #[test]
    fn test_error_messages() {
        let err = ShaderError::Compilation {
            stage: ShaderStage::Vertex,
            log: "bad token".to_string(),
        };
        assert_eq!(err.to_string(), "Failed to compile vertex shader: bad token");
        assert_eq!(ShaderStage::Fragment.gl_kind(), gl::FRAGMENT_SHADER);
    }
}
