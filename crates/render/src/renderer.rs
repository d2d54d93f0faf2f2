use crate::config::{MAX_TEXTURE_UNITS, RendererConfig};
use crate::error::{ConfigError, RenderError, check_gl};
use crate::geometry::{
    POSITION_COMPONENTS, POSITION_OFFSET_BYTES, QuadGeometry, UV_COMPONENTS, UV_OFFSET_BYTES,
    VERTEX_STRIDE_BYTES,
};
use crate::gl::{ClearBuffers, GlApi, TexParam, TexValue};
use crate::program::ShaderProgram;
use crate::shaders::{FRAGMENT_SHADER, VERTEX_SHADER};
use extquad_common::ContextId;
use glam::Mat4;

/// Producer of the external texture's content.
///
/// The renderer pulls the transform right before each draw; the producer must
/// have latched its newest frame into the texture by then.
pub trait TextureSource {
    /// Transform to apply to texture coordinates for the latched frame.
    fn current_transform(&mut self) -> Mat4;
}

/// A source whose transform never changes.
impl TextureSource for Mat4 {
    fn current_transform(&mut self) -> Mat4 {
        *self
    }
}

/// GPU objects that live exactly as long as one successful `setup`.
struct GpuResources<G: GlApi> {
    context: ContextId,
    program: ShaderProgram<G>,
    texture: G::Texture,
    vertex_buffer: G::Buffer,
}

impl<G: GlApi> GpuResources<G> {
    fn release(self, gl: &mut G) {
        self.program.release(gl);
        gl.delete_texture(self.texture);
        gl.delete_buffer(self.vertex_buffer);
    }
}

/// Draws an external (video/camera) texture onto a full-viewport quad.
///
/// Lifecycle: `setup` on a fresh context, `draw_frame` once per latched frame,
/// `teardown` before the context goes away. Every operation takes the context
/// it runs against; it has to be the one `setup` ran on.
pub struct SurfaceTextureRenderer<G: GlApi> {
    config: RendererConfig,
    geometry: QuadGeometry,
    /// `None` means the built-in pass-through shader.
    fragment_source: Option<String>,
    model_view_projection: Mat4,
    surface_transform: Mat4,
    resources: Option<GpuResources<G>>,
}

impl<G: GlApi> Default for SurfaceTextureRenderer<G> {
    fn default() -> Self {
        Self::new(RendererConfig::default())
    }
}

impl<G: GlApi> SurfaceTextureRenderer<G> {
    pub fn new(config: RendererConfig) -> Self {
        Self {
            config,
            geometry: QuadGeometry::new(),
            fragment_source: None,
            model_view_projection: Mat4::IDENTITY,
            surface_transform: Mat4::IDENTITY,
            resources: None,
        }
    }

    /// Build the program, allocate the external texture and upload the quad.
    ///
    /// Running this again on the same context starts over from scratch. On a
    /// different context the previous handles are dropped without deletion,
    /// since they died with the context they came from.
    pub fn setup(&mut self, gl: &mut G) -> Result<(), RenderError> {
        let context = gl.context_id();
        let _span = tracing::info_span!("setup", %context).entered();
        self.config.validate()?;

        if let Some(previous) = self.resources.take() {
            if previous.context == context {
                previous.release(gl);
            } else {
                tracing::warn!(
                    previous = %previous.context,
                    "context replaced, forgetting handles from the lost context"
                );
            }
        }

        let program = ShaderProgram::build(gl, VERTEX_SHADER, self.fragment_source())?;

        let texture = match create_external_texture(gl) {
            Ok(texture) => texture,
            Err(e) => {
                program.release(gl);
                return Err(e);
            }
        };

        let vertex_buffer = match upload_geometry(gl, &self.geometry) {
            Ok(buffer) => buffer,
            Err(e) => {
                program.release(gl);
                gl.delete_texture(texture);
                return Err(e);
            }
        };

        tracing::info!(
            program = ?program.handle(),
            ?texture,
            custom_shader = self.fragment_source.is_some(),
            "renderer ready"
        );
        self.resources = Some(GpuResources {
            context,
            program,
            texture,
            vertex_buffer,
        });
        Ok(())
    }

    /// Draw the latched frame with `transform` as the surface transform.
    pub fn draw_frame(&mut self, gl: &mut G, transform: Mat4) -> Result<(), RenderError> {
        let _span = tracing::trace_span!("draw_frame").entered();
        self.check_context(gl, "draw_frame")?;
        check_gl(gl, "draw_frame start")?;

        self.surface_transform = transform;

        let Some(res) = self.resources.as_ref() else {
            return Err(RenderError::NotReady { op: "draw_frame" });
        };
        let unit = self.config.texture_unit;

        gl.clear_color(self.config.clear_color);
        check_gl(gl, "glClearColor")?;
        gl.clear(ClearBuffers::COLOR_AND_DEPTH);
        check_gl(gl, "glClear")?;

        gl.use_program(Some(res.program.handle()));
        check_gl(gl, "glUseProgram")?;

        let drawn = bind_and_draw(
            gl,
            res,
            unit,
            &self.model_view_projection,
            &self.surface_transform,
        );

        // Reset bindings whether or not the draw went through.
        gl.bind_array_buffer(None);
        let mut reset = check_gl(gl, "glBindBuffer reset");
        if self.config.unbind_after_draw {
            gl.bind_external_texture(None);
            reset = reset.and(check_gl(gl, "glBindTexture unbind"));
        }
        drawn.and(reset)
    }

    /// Pull the transform from `source` and draw.
    pub fn draw_from<S: TextureSource + ?Sized>(
        &mut self,
        gl: &mut G,
        source: &mut S,
    ) -> Result<(), RenderError> {
        let transform = source.current_transform();
        self.draw_frame(gl, transform)
    }

    /// Swap the fragment shader; `None` restores the pass-through shader.
    ///
    /// The replacement is compiled, linked and resolved before the current
    /// program is released. If any of that fails the current program stays
    /// in place and keeps drawing.
    pub fn change_fragment_shader(
        &mut self,
        gl: &mut G,
        source: Option<&str>,
    ) -> Result<(), RenderError> {
        self.check_context(gl, "change_fragment_shader")?;
        let fragment = source.unwrap_or(FRAGMENT_SHADER);
        let replacement = ShaderProgram::build(gl, VERTEX_SHADER, fragment)?;

        let Some(res) = self.resources.as_mut() else {
            replacement.release(gl);
            return Err(RenderError::NotReady {
                op: "change_fragment_shader",
            });
        };
        let previous = std::mem::replace(&mut res.program, replacement);
        tracing::info!(
            previous = ?previous.handle(),
            current = ?res.program.handle(),
            default = source.is_none(),
            "fragment shader replaced"
        );
        previous.release(gl);
        self.fragment_source = source.map(str::to_string);
        Ok(())
    }

    /// Release the program, texture and vertex buffer. Does nothing when not
    /// set up.
    pub fn teardown(&mut self, gl: &mut G) -> Result<(), RenderError> {
        let Some(res) = self.resources.as_ref() else {
            return Ok(());
        };
        if res.context != gl.context_id() {
            return Err(RenderError::ContextMismatch {
                expected: res.context,
                actual: gl.context_id(),
            });
        }
        if let Some(res) = self.resources.take() {
            tracing::info!(context = %res.context, "releasing renderer resources");
            res.release(gl);
        }
        Ok(())
    }

    fn check_context(&self, gl: &G, op: &'static str) -> Result<(), RenderError> {
        match &self.resources {
            None => Err(RenderError::NotReady { op }),
            Some(res) if res.context != gl.context_id() => Err(RenderError::ContextMismatch {
                expected: res.context,
                actual: gl.context_id(),
            }),
            Some(_) => Ok(()),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.resources.is_some()
    }

    /// External texture to hand to the frame producer.
    pub fn texture(&self) -> Option<G::Texture> {
        self.resources.as_ref().map(|r| r.texture)
    }

    pub fn program(&self) -> Option<&ShaderProgram<G>> {
        self.resources.as_ref().map(|r| &r.program)
    }

    /// Context the renderer was set up on.
    pub fn context(&self) -> Option<ContextId> {
        self.resources.as_ref().map(|r| r.context)
    }

    /// Last transform passed to `draw_frame`.
    pub fn surface_transform(&self) -> Mat4 {
        self.surface_transform
    }

    pub fn model_view_projection(&self) -> Mat4 {
        self.model_view_projection
    }

    pub fn fragment_source(&self) -> &str {
        self.fragment_source.as_deref().unwrap_or(FRAGMENT_SHADER)
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn geometry(&self) -> &QuadGeometry {
        &self.geometry
    }
}

fn create_external_texture<G: GlApi>(gl: &mut G) -> Result<G::Texture, RenderError> {
    let texture = gl.create_texture().map_err(|reason| RenderError::Create {
        what: "external texture",
        reason,
    })?;
    tracing::debug!(?texture, "allocated external texture");

    match configure_external_texture(gl, texture) {
        Ok(()) => Ok(texture),
        Err(e) => {
            gl.bind_external_texture(None);
            gl.delete_texture(texture);
            Err(e)
        }
    }
}

/// Nearest-neighbour minification, linear magnification, clamped edges.
fn configure_external_texture<G: GlApi>(gl: &mut G, texture: G::Texture) -> Result<(), RenderError> {
    gl.bind_external_texture(Some(texture));
    check_gl(gl, "glBindTexture external")?;
    for (param, value, op) in [
        (TexParam::MinFilter, TexValue::Nearest, "glTexParameter MIN_FILTER"),
        (TexParam::MagFilter, TexValue::Linear, "glTexParameter MAG_FILTER"),
        (TexParam::WrapS, TexValue::ClampToEdge, "glTexParameter WRAP_S"),
        (TexParam::WrapT, TexValue::ClampToEdge, "glTexParameter WRAP_T"),
    ] {
        gl.external_tex_parameter(param, value);
        check_gl(gl, op)?;
    }
    gl.bind_external_texture(None);
    Ok(())
}

/// Steps 4 to 7 of a draw: bind the texture and quad, upload uniforms, draw.
fn bind_and_draw<G: GlApi>(
    gl: &mut G,
    res: &GpuResources<G>,
    unit: u32,
    model_view_projection: &Mat4,
    surface_transform: &Mat4,
) -> Result<(), RenderError> {
    let bindings = res.program.bindings();

    gl.active_texture(unit);
    check_gl(gl, "glActiveTexture")?;
    gl.bind_external_texture(Some(res.texture));
    check_gl(gl, "glBindTexture external")?;

    gl.bind_array_buffer(Some(res.vertex_buffer));
    check_gl(gl, "glBindBuffer quad")?;
    gl.vertex_attrib_pointer_f32(
        bindings.position,
        POSITION_COMPONENTS,
        VERTEX_STRIDE_BYTES,
        POSITION_OFFSET_BYTES,
    );
    check_gl(gl, "glVertexAttribPointer position")?;
    gl.enable_vertex_attrib_array(bindings.position);
    check_gl(gl, "glEnableVertexAttribArray position")?;
    gl.vertex_attrib_pointer_f32(
        bindings.texture_coordinate,
        UV_COMPONENTS,
        VERTEX_STRIDE_BYTES,
        UV_OFFSET_BYTES,
    );
    check_gl(gl, "glVertexAttribPointer textureCoordinate")?;
    gl.enable_vertex_attrib_array(bindings.texture_coordinate);
    check_gl(gl, "glEnableVertexAttribArray textureCoordinate")?;

    gl.uniform_matrix_4(
        &bindings.model_view_projection,
        &model_view_projection.to_cols_array(),
    );
    check_gl(gl, "glUniformMatrix4fv modelViewProjection")?;
    gl.uniform_matrix_4(
        &bindings.surface_transform,
        &surface_transform.to_cols_array(),
    );
    check_gl(gl, "glUniformMatrix4fv surfaceTransform")?;
    if let Some(sampler) = &bindings.sampler {
        let sampler_unit = i32::try_from(unit).map_err(|_| ConfigError::TextureUnit {
            unit,
            max: MAX_TEXTURE_UNITS,
        })?;
        gl.uniform_1_i32(sampler, sampler_unit);
        check_gl(gl, "glUniform1i sampler")?;
    }

    gl.draw_triangle_strip(0, QuadGeometry::VERTEX_COUNT);
    check_gl(gl, "glDrawArrays")
}

fn upload_geometry<G: GlApi>(gl: &mut G, geometry: &QuadGeometry) -> Result<G::Buffer, RenderError> {
    let buffer = gl.create_buffer().map_err(|reason| RenderError::Create {
        what: "vertex buffer",
        reason,
    })?;

    gl.bind_array_buffer(Some(buffer));
    let uploaded = check_gl(gl, "glBindBuffer quad").and_then(|()| {
        gl.array_buffer_data(geometry.as_bytes());
        check_gl(gl, "glBufferData quad")
    });
    gl.bind_array_buffer(None);

    match uploaded {
        Ok(()) => Ok(buffer),
        Err(e) => {
            gl.delete_buffer(buffer);
            Err(e)
        }
    }
}
