use super::shaders::ShaderStage;
use gl::types::*;
use std::ffi::{c_void, CStr, CString, NulError};
use std::marker::PhantomData;
use std::ptr;

/// The driver calls the shader build step is written against.
///
/// Every GL object the build step touches is created through a device, so
/// the order of creation, attachment and deletion is visible in the code
/// instead of hiding behind ambient driver state.
pub trait ShaderDevice {
    type Shader: Copy;
    type Program: Copy;

    fn create_shader(&self, stage: ShaderStage) -> Result<Self::Shader, String>;
    fn shader_source(&self, shader: Self::Shader, source: &str) -> Result<(), NulError>;
    fn compile_shader(&self, shader: Self::Shader);
    fn shader_compile_status(&self, shader: Self::Shader) -> bool;
    fn shader_info_log(&self, shader: Self::Shader) -> String;
    fn delete_shader(&self, shader: Self::Shader);

    fn create_program(&self) -> Result<Self::Program, String>;
    fn attach_shader(&self, program: Self::Program, shader: Self::Shader);
    fn detach_shader(&self, program: Self::Program, shader: Self::Shader);
    fn link_program(&self, program: Self::Program);
    fn program_link_status(&self, program: Self::Program) -> bool;
    fn validate_program(&self, program: Self::Program);
    fn program_validate_status(&self, program: Self::Program) -> bool;
    fn program_info_log(&self, program: Self::Program) -> String;
    fn delete_program(&self, program: Self::Program);
}

/// Token proving the GL function pointers are loaded for the context that is
/// current on this thread. Not `Send`: GL calls must stay on that thread.
pub struct GlDevice {
    _context: PhantomData<*const ()>,
}

impl GlDevice {
    /// Loads the GL entry points through `loader`.
    ///
    /// # Safety
    /// A GL context must be current on the calling thread and stay current for
    /// as long as the returned device, or anything created from it, is alive.
    pub unsafe fn load<F>(loader: F) -> Self
    where
        F: FnMut(&'static str) -> *const c_void,
    {
        gl::load_with(loader);
        Self {
            _context: PhantomData,
        }
    }

    pub fn version(&self) -> Option<String> {
        let version = unsafe { gl::GetString(gl::VERSION) };
        if version.is_null() {
            return None;
        }
        let version = unsafe { CStr::from_ptr(version as *const std::os::raw::c_char) };
        Some(version.to_string_lossy().into_owned())
    }

    pub fn set_clear_color(&self, [r, g, b, a]: [f32; 4]) {
        unsafe { gl::ClearColor(r, g, b, a) };
    }

    pub fn clear(&self) {
        unsafe { gl::Clear(gl::COLOR_BUFFER_BIT) };
    }

    pub fn viewport(&self, width: u32, height: u32) {
        unsafe { gl::Viewport(0, 0, width as GLsizei, height as GLsizei) };
    }

    fn create_whitespace_cstring_with_len(len: usize) -> CString {
        let mut buffer: Vec<u8> = Vec::with_capacity(len + 1);
        buffer.extend([b' '].iter().cycle().take(len));
        // Spaces only, so no interior nul.
        unsafe { CString::from_vec_unchecked(buffer) }
    }

    fn read_log(len: GLint, fetch: impl FnOnce(GLsizei, *mut GLchar)) -> String {
        if len <= 0 {
            return String::new();
        }
        let log = Self::create_whitespace_cstring_with_len(len as usize);
        fetch(len, log.as_ptr() as *mut GLchar);
        log.to_string_lossy()
            .trim_end_matches(|c: char| c == '\0' || c.is_whitespace())
            .to_string()
    }
}

impl ShaderDevice for GlDevice {
    type Shader = GLuint;
    type Program = GLuint;

    fn create_shader(&self, stage: ShaderStage) -> Result<GLuint, String> {
        let shader = unsafe { gl::CreateShader(stage.gl_kind()) };
        if shader == 0 {
            return Err(format!("glCreateShader returned 0 for {} stage", stage));
        }
        Ok(shader)
    }

    fn shader_source(&self, shader: GLuint, source: &str) -> Result<(), NulError> {
        let source = CString::new(source.as_bytes())?;
        unsafe { gl::ShaderSource(shader, 1, &source.as_ptr(), ptr::null()) };
        Ok(())
    }

    fn compile_shader(&self, shader: GLuint) {
        unsafe { gl::CompileShader(shader) };
    }

    fn shader_compile_status(&self, shader: GLuint) -> bool {
        let mut success = 0;
        unsafe { gl::GetShaderiv(shader, gl::COMPILE_STATUS, &mut success) };
        success != 0
    }

    fn shader_info_log(&self, shader: GLuint) -> String {
        let mut len = 0;
        unsafe { gl::GetShaderiv(shader, gl::INFO_LOG_LENGTH, &mut len) };
        Self::read_log(len, |len, buffer| unsafe {
            gl::GetShaderInfoLog(shader, len, ptr::null_mut(), buffer)
        })
    }

    fn delete_shader(&self, shader: GLuint) {
        unsafe { gl::DeleteShader(shader) };
    }

    fn create_program(&self) -> Result<GLuint, String> {
        let program = unsafe { gl::CreateProgram() };
        if program == 0 {
            return Err("glCreateProgram returned 0".to_string());
        }
        Ok(program)
    }

    fn attach_shader(&self, program: GLuint, shader: GLuint) {
        unsafe { gl::AttachShader(program, shader) };
    }

    fn detach_shader(&self, program: GLuint, shader: GLuint) {
        unsafe { gl::DetachShader(program, shader) };
    }

    fn link_program(&self, program: GLuint) {
        unsafe { gl::LinkProgram(program) };
    }

    fn program_link_status(&self, program: GLuint) -> bool {
        let mut success = 0;
        unsafe { gl::GetProgramiv(program, gl::LINK_STATUS, &mut success) };
        success != 0
    }

    fn validate_program(&self, program: GLuint) {
        unsafe { gl::ValidateProgram(program) };
    }

    fn program_validate_status(&self, program: GLuint) -> bool {
        let mut success = 0;
        unsafe { gl::GetProgramiv(program, gl::VALIDATE_STATUS, &mut success) };
        success != 0
    }

    fn program_info_log(&self, program: GLuint) -> String {
        let mut len = 0;
        unsafe { gl::GetProgramiv(program, gl::INFO_LOG_LENGTH, &mut len) };
        Self::read_log(len, |len, buffer| unsafe {
            gl::GetProgramInfoLog(program, len, ptr::null_mut(), buffer)
        })
    }

    fn delete_program(&self, program: GLuint) {
        unsafe { gl::DeleteProgram(program) };
    }
}
