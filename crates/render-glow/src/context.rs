use crate::enums::{
    TEXTURE_EXTERNAL_OES, clear_mask, shader_type, tex_param, tex_value, texture_unit,
};
use extquad_common::ContextId;
use extquad_render::{ClearBuffers, GlApi, RenderError, ShaderStage, TexParam, TexValue, shaders};
use glow::HasContext;
use std::marker::PhantomData;
use std::mem::ManuallyDrop;

/// A current GL context the renderer can drive.
///
/// Every call goes straight to the driver. The wrapper exists to give the
/// context an identity and to pin it to its thread.
///
/// Dropping it deletes the helper vertex array, so the context has to still
/// be current at that point.
pub struct GlowContext {
    gl: glow::Context,
    id: ContextId,
    vertex_array: Option<<glow::Context as HasContext>::VertexArray>,
    _not_send: PhantomData<*const ()>,
}

impl GlowContext {
    /// Wrap a loaded context.
    ///
    /// Desktop core profiles refuse attribute pointers without a bound vertex
    /// array, so one is created and left bound there. ES contexts need none.
    ///
    /// # Safety
    /// `gl` must be current on the calling thread, and stay current whenever
    /// this value is used.
    pub unsafe fn new(gl: glow::Context) -> Result<Self, RenderError> {
        let vertex_array = if gl.version().is_embedded {
            None
        } else {
            // SAFETY: the caller guarantees the context is current.
            let vao = unsafe { gl.create_vertex_array() }.map_err(|reason| {
                RenderError::Create {
                    what: "vertex array",
                    reason,
                }
            })?;
            unsafe { gl.bind_vertex_array(Some(vao)) };
            Some(vao)
        };
        let id = ContextId::next();
        tracing::info!(
            context = %id,
            version = ?gl.version(),
            external_images = gl
                .supported_extensions()
                .contains(shaders::EXTERNAL_IMAGE_EXTENSION),
            "wrapped GL context"
        );
        Ok(Self {
            gl,
            id,
            vertex_array,
            _not_send: PhantomData,
        })
    }

    /// Load a context through `loader` (for example `eglGetProcAddress`) and wrap it.
    ///
    /// # Safety
    /// Same as [`GlowContext::new`]; `loader` must return entry points of the
    /// current context.
    pub unsafe fn from_loader_function<F>(loader: F) -> Result<Self, RenderError>
    where
        F: FnMut(&std::ffi::CStr) -> *const std::ffi::c_void,
    {
        // SAFETY: forwarded to the caller.
        unsafe { Self::new(glow::Context::from_loader_function_cstr(loader)) }
    }

    pub fn gl(&self) -> &glow::Context {
        &self.gl
    }

    /// Whether the driver advertises `GL_OES_EGL_image_external`.
    pub fn supports_external_images(&self) -> bool {
        self.gl
            .supported_extensions()
            .contains(shaders::EXTERNAL_IMAGE_EXTENSION)
    }

    /// Release the helper vertex array and hand the context back.
    pub fn into_inner(self) -> glow::Context {
        let mut this = ManuallyDrop::new(self);
        this.release_vertex_array();
        // SAFETY: `this` is never dropped, so `gl` is read out exactly once.
        // The remaining fields have no drop glue.
        unsafe { std::ptr::read(&this.gl) }
    }

    fn release_vertex_array(&mut self) {
        if let Some(vao) = self.vertex_array.take() {
            // SAFETY: the context is current per the constructor contract.
            unsafe { self.gl.delete_vertex_array(vao) };
        }
    }
}

impl Drop for GlowContext {
    fn drop(&mut self) {
        self.release_vertex_array();
    }
}

// SAFETY (all methods below): a `GlowContext` only exists for a context the
// constructor's caller promised is current on this thread, and `!Send` keeps
// it there.
impl GlApi for GlowContext {
    type Shader = <glow::Context as HasContext>::Shader;
    type Program = <glow::Context as HasContext>::Program;
    type Texture = <glow::Context as HasContext>::Texture;
    type Buffer = <glow::Context as HasContext>::Buffer;
    type UniformLocation = <glow::Context as HasContext>::UniformLocation;

    fn context_id(&self) -> ContextId {
        self.id
    }

    fn get_error(&mut self) -> u32 {
        unsafe { self.gl.get_error() }
    }

    fn create_shader(&mut self, stage: ShaderStage) -> Result<Self::Shader, String> {
        unsafe { self.gl.create_shader(shader_type(stage)) }
    }

    fn shader_source(&mut self, shader: Self::Shader, source: &str) {
        unsafe { self.gl.shader_source(shader, source) }
    }

    fn compile_shader(&mut self, shader: Self::Shader) {
        unsafe { self.gl.compile_shader(shader) }
    }

    fn shader_compile_status(&mut self, shader: Self::Shader) -> bool {
        unsafe { self.gl.get_shader_compile_status(shader) }
    }

    fn shader_info_log(&mut self, shader: Self::Shader) -> String {
        unsafe { self.gl.get_shader_info_log(shader) }
    }

    fn delete_shader(&mut self, shader: Self::Shader) {
        unsafe { self.gl.delete_shader(shader) }
    }

    fn create_program(&mut self) -> Result<Self::Program, String> {
        unsafe { self.gl.create_program() }
    }

    fn attach_shader(&mut self, program: Self::Program, shader: Self::Shader) {
        unsafe { self.gl.attach_shader(program, shader) }
    }

    fn detach_shader(&mut self, program: Self::Program, shader: Self::Shader) {
        unsafe { self.gl.detach_shader(program, shader) }
    }

    fn link_program(&mut self, program: Self::Program) {
        unsafe { self.gl.link_program(program) }
    }

    fn program_link_status(&mut self, program: Self::Program) -> bool {
        unsafe { self.gl.get_program_link_status(program) }
    }

    fn program_info_log(&mut self, program: Self::Program) -> String {
        unsafe { self.gl.get_program_info_log(program) }
    }

    fn delete_program(&mut self, program: Self::Program) {
        unsafe { self.gl.delete_program(program) }
    }

    fn use_program(&mut self, program: Option<Self::Program>) {
        unsafe { self.gl.use_program(program) }
    }

    fn attrib_location(&mut self, program: Self::Program, name: &str) -> Option<u32> {
        unsafe { self.gl.get_attrib_location(program, name) }
    }

    fn uniform_location(
        &mut self,
        program: Self::Program,
        name: &str,
    ) -> Option<Self::UniformLocation> {
        unsafe { self.gl.get_uniform_location(program, name) }
    }

    fn create_texture(&mut self) -> Result<Self::Texture, String> {
        unsafe { self.gl.create_texture() }
    }

    fn active_texture(&mut self, unit: u32) {
        match texture_unit(unit) {
            Some(texture) => unsafe { self.gl.active_texture(texture) },
            None => tracing::error!(unit, "texture unit has no GL enum, call skipped"),
        }
    }

    fn bind_external_texture(&mut self, texture: Option<Self::Texture>) {
        unsafe { self.gl.bind_texture(TEXTURE_EXTERNAL_OES, texture) }
    }

    fn external_tex_parameter(&mut self, param: TexParam, value: TexValue) {
        unsafe {
            self.gl
                .tex_parameter_i32(TEXTURE_EXTERNAL_OES, tex_param(param), tex_value(value))
        }
    }

    fn delete_texture(&mut self, texture: Self::Texture) {
        unsafe { self.gl.delete_texture(texture) }
    }

    fn create_buffer(&mut self) -> Result<Self::Buffer, String> {
        unsafe { self.gl.create_buffer() }
    }

    fn bind_array_buffer(&mut self, buffer: Option<Self::Buffer>) {
        unsafe { self.gl.bind_buffer(glow::ARRAY_BUFFER, buffer) }
    }

    fn array_buffer_data(&mut self, data: &[u8]) {
        unsafe {
            self.gl
                .buffer_data_u8_slice(glow::ARRAY_BUFFER, data, glow::STATIC_DRAW)
        }
    }

    fn delete_buffer(&mut self, buffer: Self::Buffer) {
        unsafe { self.gl.delete_buffer(buffer) }
    }

    fn vertex_attrib_pointer_f32(&mut self, index: u32, size: i32, stride: i32, offset: i32) {
        unsafe {
            self.gl
                .vertex_attrib_pointer_f32(index, size, glow::FLOAT, false, stride, offset)
        }
    }

    fn enable_vertex_attrib_array(&mut self, index: u32) {
        unsafe { self.gl.enable_vertex_attrib_array(index) }
    }

    fn uniform_matrix_4(&mut self, location: &Self::UniformLocation, value: &[f32; 16]) {
        unsafe {
            self.gl
                .uniform_matrix_4_f32_slice(Some(location), false, value)
        }
    }

    fn uniform_1_i32(&mut self, location: &Self::UniformLocation, value: i32) {
        unsafe { self.gl.uniform_1_i32(Some(location), value) }
    }

    fn clear_color(&mut self, rgba: [f32; 4]) {
        let [r, g, b, a] = rgba;
        unsafe { self.gl.clear_color(r, g, b, a) }
    }

    fn clear(&mut self, buffers: ClearBuffers) {
        unsafe { self.gl.clear(clear_mask(buffers)) }
    }

    fn draw_triangle_strip(&mut self, first: i32, count: i32) {
        unsafe { self.gl.draw_arrays(glow::TRIANGLE_STRIP, first, count) }
    }
}
