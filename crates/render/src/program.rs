use crate::error::{LocationKind, RenderError, check_gl};
use crate::gl::{GlApi, ShaderStage};
use crate::shaders;

/// Locations resolved from one linked program.
#[derive(Debug, Clone)]
pub struct AttributeBindings<U> {
    pub position: u32,
    pub texture_coordinate: u32,
    pub model_view_projection: U,
    pub surface_transform: U,
    /// Absent when a custom fragment shader names its sampler differently.
    pub sampler: Option<U>,
}

/// An owned, linked GPU program together with its bindings.
///
/// The handle is only released through [`ShaderProgram::release`], which
/// consumes the value, so a released program cannot be drawn with.
pub struct ShaderProgram<G: GlApi> {
    handle: G::Program,
    bindings: AttributeBindings<G::UniformLocation>,
}

impl<G: GlApi> std::fmt::Debug for ShaderProgram<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShaderProgram")
            .field("handle", &self.handle)
            .field("bindings", &self.bindings)
            .finish()
    }
}

impl<G: GlApi> ShaderProgram<G> {
    /// Compile both stages, link them and resolve the bindings.
    ///
    /// Nothing is left allocated on failure.
    pub fn build(gl: &mut G, vertex_src: &str, fragment_src: &str) -> Result<Self, RenderError> {
        let handle = create_program(gl, vertex_src, fragment_src)?;
        match resolve_bindings(gl, handle) {
            Ok(bindings) => {
                tracing::debug!(program = ?handle, ?bindings, "program ready");
                Ok(Self { handle, bindings })
            }
            Err(e) => {
                gl.delete_program(handle);
                Err(e)
            }
        }
    }

    pub fn handle(&self) -> G::Program {
        self.handle
    }

    pub fn bindings(&self) -> &AttributeBindings<G::UniformLocation> {
        &self.bindings
    }

    pub fn release(self, gl: &mut G) {
        tracing::debug!(program = ?self.handle, "deleting program");
        gl.delete_program(self.handle);
    }
}

/// Compile one shader stage, returning the driver's log on failure.
pub fn compile_shader<G: GlApi>(
    gl: &mut G,
    stage: ShaderStage,
    source: &str,
) -> Result<G::Shader, RenderError> {
    let shader = gl.create_shader(stage).map_err(|reason| RenderError::Create {
        what: match stage {
            ShaderStage::Vertex => "vertex shader",
            ShaderStage::Fragment => "fragment shader",
        },
        reason,
    })?;
    check_gl(gl, format!("glCreateShader type={stage}"))?;

    gl.shader_source(shader, source);
    gl.compile_shader(shader);
    if !gl.shader_compile_status(shader) {
        let log = gl.shader_info_log(shader);
        tracing::error!(%stage, log = %log.trim_end(), "could not compile shader");
        gl.delete_shader(shader);
        return Err(RenderError::Compile {
            stage,
            log: log.trim_end().to_string(),
        });
    }
    Ok(shader)
}

/// Two-stage build: compile each stage, then attach both and link.
pub fn create_program<G: GlApi>(
    gl: &mut G,
    vertex_src: &str,
    fragment_src: &str,
) -> Result<G::Program, RenderError> {
    let vs = compile_shader(gl, ShaderStage::Vertex, vertex_src)?;
    let fs = match compile_shader(gl, ShaderStage::Fragment, fragment_src) {
        Ok(fs) => fs,
        Err(e) => {
            gl.delete_shader(vs);
            return Err(e);
        }
    };

    let program = match gl.create_program() {
        Ok(program) => program,
        Err(reason) => {
            gl.delete_shader(vs);
            gl.delete_shader(fs);
            return Err(RenderError::Create {
                what: "program",
                reason,
            });
        }
    };

    let linked = attach_and_link(gl, program, vs, fs);

    gl.detach_shader(program, vs);
    gl.detach_shader(program, fs);
    gl.delete_shader(vs);
    gl.delete_shader(fs);

    match linked {
        Ok(()) => Ok(program),
        Err(e) => {
            gl.delete_program(program);
            Err(e)
        }
    }
}

fn attach_and_link<G: GlApi>(
    gl: &mut G,
    program: G::Program,
    vs: G::Shader,
    fs: G::Shader,
) -> Result<(), RenderError> {
    gl.attach_shader(program, vs);
    check_gl(gl, "glAttachShader vertex")?;
    gl.attach_shader(program, fs);
    check_gl(gl, "glAttachShader fragment")?;
    gl.link_program(program);
    if !gl.program_link_status(program) {
        let log = gl.program_info_log(program);
        tracing::error!(log = %log.trim_end(), "could not link program");
        return Err(RenderError::Link {
            log: log.trim_end().to_string(),
        });
    }
    Ok(())
}

fn resolve_bindings<G: GlApi>(
    gl: &mut G,
    program: G::Program,
) -> Result<AttributeBindings<G::UniformLocation>, RenderError> {
    let position = attrib(gl, program, shaders::POSITION_ATTRIBUTE)?;
    let texture_coordinate = attrib(gl, program, shaders::TEXTURE_COORDINATE_ATTRIBUTE)?;
    let model_view_projection = uniform(gl, program, shaders::MVP_UNIFORM)?;
    let surface_transform = uniform(gl, program, shaders::SURFACE_TRANSFORM_UNIFORM)?;
    let sampler = gl.uniform_location(program, shaders::SAMPLER_UNIFORM);
    if sampler.is_none() {
        tracing::debug!(
            name = shaders::SAMPLER_UNIFORM,
            "sampler uniform not found, relying on unit 0 default"
        );
    }
    Ok(AttributeBindings {
        position,
        texture_coordinate,
        model_view_projection,
        surface_transform,
        sampler,
    })
}

fn attrib<G: GlApi>(gl: &mut G, program: G::Program, name: &str) -> Result<u32, RenderError> {
    let location = gl.attrib_location(program, name);
    check_gl(gl, format!("glGetAttribLocation {name}"))?;
    location.ok_or_else(|| RenderError::Location {
        kind: LocationKind::Attribute,
        name: name.to_string(),
    })
}

fn uniform<G: GlApi>(
    gl: &mut G,
    program: G::Program,
    name: &str,
) -> Result<G::UniformLocation, RenderError> {
    let location = gl.uniform_location(program, name);
    check_gl(gl, format!("glGetUniformLocation {name}"))?;
    location.ok_or_else(|| RenderError::Location {
        kind: LocationKind::Uniform,
        name: name.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::RecordingGl;
    use crate::shaders::{FRAGMENT_SHADER, VERTEX_SHADER};

    #[test]
    fn default_pair_builds_with_all_locations() {
        let mut gl = RecordingGl::new();
        let program = ShaderProgram::build(&mut gl, VERTEX_SHADER, FRAGMENT_SHADER).unwrap();
        let b = program.bindings();
        assert_ne!(b.position, b.texture_coordinate);
        assert!(b.sampler.is_some());
        assert_eq!(gl.live_programs(), 1);
        assert_eq!(gl.live_shaders(), 0);
    }

    #[test]
    fn vertex_compile_failure_reports_stage_and_log() {
        let mut gl = RecordingGl::new();
        let err = create_program(&mut gl, "void main() {", FRAGMENT_SHADER).unwrap_err();
        match err {
            RenderError::Compile { stage, log } => {
                assert_eq!(stage, ShaderStage::Vertex);
                assert!(log.contains("ERROR"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(gl.live_shaders(), 0);
        assert_eq!(gl.live_programs(), 0);
    }

    #[test]
    fn fragment_compile_failure_releases_vertex_stage() {
        let mut gl = RecordingGl::new();
        let err = create_program(&mut gl, VERTEX_SHADER, "precision mediump float;").unwrap_err();
        assert!(matches!(
            err,
            RenderError::Compile {
                stage: ShaderStage::Fragment,
                ..
            }
        ));
        assert_eq!(gl.live_shaders(), 0);
    }

    #[test]
    fn link_failure_carries_linker_log() {
        let mut gl = RecordingGl::new();
        let fragment = "precision mediump float;\n\
                        varying vec2 vMissing;\n\
                        void main() { gl_FragColor = vec4(vMissing, 0.0, 1.0); }\n";
        let err = create_program(&mut gl, VERTEX_SHADER, fragment).unwrap_err();
        match err {
            RenderError::Link { log } => assert!(log.contains("vMissing")),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(gl.live_programs(), 0);
        assert_eq!(gl.live_shaders(), 0);
    }

    #[test]
    fn missing_uniform_is_a_location_error() {
        let mut gl = RecordingGl::new();
        let vertex = "uniform mat4 uModelViewProjection;\n\
                      attribute vec4 aPosition;\n\
                      attribute vec4 aTextureCoordinate;\n\
                      varying vec2 vTextureCoordinate;\n\
                      void main() {\n\
                      gl_Position = uModelViewProjection * aPosition;\n\
                      vTextureCoordinate = aTextureCoordinate.xy;\n\
                      }\n";
        let err = ShaderProgram::build(&mut gl, vertex, FRAGMENT_SHADER).unwrap_err();
        match err {
            RenderError::Location { kind, name } => {
                assert_eq!(kind, LocationKind::Uniform);
                assert_eq!(name, shaders::SURFACE_TRANSFORM_UNIFORM);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(gl.live_programs(), 0);
    }

    #[test]
    fn create_program_failure_is_reported() {
        let mut gl = RecordingGl::new();
        gl.fail_creation("glCreateProgram");
        let err = create_program(&mut gl, VERTEX_SHADER, FRAGMENT_SHADER).unwrap_err();
        assert!(matches!(err, RenderError::Create { what: "program", .. }));
        assert_eq!(gl.live_shaders(), 0);
    }

    #[test]
    fn gl_error_during_attach_names_the_call() {
        let mut gl = RecordingGl::new();
        gl.inject_error("glAttachShader", crate::gl::GlErrorCode::InvalidOperation);
        let err = create_program(&mut gl, VERTEX_SHADER, FRAGMENT_SHADER).unwrap_err();
        match err {
            RenderError::GlState { op, .. } => assert_eq!(op, "glAttachShader vertex"),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(gl.live_programs(), 0);
    }
}
