use extquad_common::ContextId;
use std::fmt;
use std::fmt::Debug;

/// `GL_NO_ERROR`.
pub const NO_ERROR: u32 = 0;

/// Shader pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Sampling parameters the renderer sets on the external texture target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TexParam {
    MinFilter,
    MagFilter,
    WrapS,
    WrapT,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TexValue {
    Nearest,
    Linear,
    ClampToEdge,
}

/// Buffers cleared at the start of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClearBuffers {
    pub color: bool,
    pub depth: bool,
}

impl ClearBuffers {
    pub const COLOR_AND_DEPTH: Self = Self {
        color: true,
        depth: true,
    };
}

/// Error flags reported by `glGetError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlErrorCode {
    InvalidEnum,
    InvalidValue,
    InvalidOperation,
    StackOverflow,
    StackUnderflow,
    OutOfMemory,
    InvalidFramebufferOperation,
    ContextLost,
    Other(u32),
}

impl GlErrorCode {
    /// Decode a raw `glGetError` value. Returns `None` for `GL_NO_ERROR`.
    pub fn from_raw(raw: u32) -> Option<Self> {
        let code = match raw {
            NO_ERROR => return None,
            0x0500 => GlErrorCode::InvalidEnum,
            0x0501 => GlErrorCode::InvalidValue,
            0x0502 => GlErrorCode::InvalidOperation,
            0x0503 => GlErrorCode::StackOverflow,
            0x0504 => GlErrorCode::StackUnderflow,
            0x0505 => GlErrorCode::OutOfMemory,
            0x0506 => GlErrorCode::InvalidFramebufferOperation,
            0x0507 => GlErrorCode::ContextLost,
            other => GlErrorCode::Other(other),
        };
        Some(code)
    }

    pub fn raw(self) -> u32 {
        match self {
            GlErrorCode::InvalidEnum => 0x0500,
            GlErrorCode::InvalidValue => 0x0501,
            GlErrorCode::InvalidOperation => 0x0502,
            GlErrorCode::StackOverflow => 0x0503,
            GlErrorCode::StackUnderflow => 0x0504,
            GlErrorCode::OutOfMemory => 0x0505,
            GlErrorCode::InvalidFramebufferOperation => 0x0506,
            GlErrorCode::ContextLost => 0x0507,
            GlErrorCode::Other(raw) => raw,
        }
    }
}

impl fmt::Display for GlErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GlErrorCode::InvalidEnum => "GL_INVALID_ENUM",
            GlErrorCode::InvalidValue => "GL_INVALID_VALUE",
            GlErrorCode::InvalidOperation => "GL_INVALID_OPERATION",
            GlErrorCode::StackOverflow => "GL_STACK_OVERFLOW",
            GlErrorCode::StackUnderflow => "GL_STACK_UNDERFLOW",
            GlErrorCode::OutOfMemory => "GL_OUT_OF_MEMORY",
            GlErrorCode::InvalidFramebufferOperation => "GL_INVALID_FRAMEBUFFER_OPERATION",
            GlErrorCode::ContextLost => "GL_CONTEXT_LOST",
            GlErrorCode::Other(raw) => return write!(f, "GL error 0x{raw:04x}"),
        };
        write!(f, "{name} (0x{:04x})", self.raw())
    }
}

/// The slice of OpenGL ES 2.0 the renderer drives.
///
/// A value implementing this trait stands for one current GPU context. Passing
/// `&mut G` into every renderer operation is what ties the renderer to that
/// context; `context_id` lets the renderer notice when it is handed a
/// different one.
///
/// The texture calls all target `GL_TEXTURE_EXTERNAL_OES` and the buffer calls
/// target `GL_ARRAY_BUFFER`; backends pick the enums.
pub trait GlApi {
    type Shader: Copy + Debug + PartialEq;
    type Program: Copy + Debug + PartialEq;
    type Texture: Copy + Debug + PartialEq;
    type Buffer: Copy + Debug + PartialEq;
    type UniformLocation: Clone + Debug;

    fn context_id(&self) -> ContextId;

    /// Pop one error flag, `NO_ERROR` when none is pending.
    fn get_error(&mut self) -> u32;

    fn create_shader(&mut self, stage: ShaderStage) -> Result<Self::Shader, String>;
    fn shader_source(&mut self, shader: Self::Shader, source: &str);
    fn compile_shader(&mut self, shader: Self::Shader);
    fn shader_compile_status(&mut self, shader: Self::Shader) -> bool;
    fn shader_info_log(&mut self, shader: Self::Shader) -> String;
    fn delete_shader(&mut self, shader: Self::Shader);

    fn create_program(&mut self) -> Result<Self::Program, String>;
    fn attach_shader(&mut self, program: Self::Program, shader: Self::Shader);
    fn detach_shader(&mut self, program: Self::Program, shader: Self::Shader);
    fn link_program(&mut self, program: Self::Program);
    fn program_link_status(&mut self, program: Self::Program) -> bool;
    fn program_info_log(&mut self, program: Self::Program) -> String;
    fn delete_program(&mut self, program: Self::Program);
    fn use_program(&mut self, program: Option<Self::Program>);

    fn attrib_location(&mut self, program: Self::Program, name: &str) -> Option<u32>;
    fn uniform_location(
        &mut self,
        program: Self::Program,
        name: &str,
    ) -> Option<Self::UniformLocation>;

    fn create_texture(&mut self) -> Result<Self::Texture, String>;
    fn active_texture(&mut self, unit: u32);
    fn bind_external_texture(&mut self, texture: Option<Self::Texture>);
    fn external_tex_parameter(&mut self, param: TexParam, value: TexValue);
    fn delete_texture(&mut self, texture: Self::Texture);

    fn create_buffer(&mut self) -> Result<Self::Buffer, String>;
    fn bind_array_buffer(&mut self, buffer: Option<Self::Buffer>);
    /// Upload `data` to the bound array buffer with `GL_STATIC_DRAW` usage.
    fn array_buffer_data(&mut self, data: &[u8]);
    fn delete_buffer(&mut self, buffer: Self::Buffer);

    /// Float attribute pointer into the bound array buffer; `stride` and
    /// `offset` are in bytes.
    fn vertex_attrib_pointer_f32(&mut self, index: u32, size: i32, stride: i32, offset: i32);
    fn enable_vertex_attrib_array(&mut self, index: u32);

    /// Upload a column-major matrix (no transpose).
    fn uniform_matrix_4(&mut self, location: &Self::UniformLocation, value: &[f32; 16]);
    fn uniform_1_i32(&mut self, location: &Self::UniformLocation, value: i32);

    fn clear_color(&mut self, rgba: [f32; 4]);
    fn clear(&mut self, buffers: ClearBuffers);
    fn draw_triangle_strip(&mut self, first: i32, count: i32);
}
