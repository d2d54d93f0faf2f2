/// Vertex attribute: quad corner position.
pub const POSITION_ATTRIBUTE: &str = "aPosition";
/// Vertex attribute: quad corner texture coordinate.
pub const TEXTURE_COORDINATE_ATTRIBUTE: &str = "aTextureCoordinate";
/// Uniform: model-view-projection matrix.
pub const MVP_UNIFORM: &str = "uModelViewProjection";
/// Uniform: per-frame surface transform from the texture producer.
pub const SURFACE_TRANSFORM_UNIFORM: &str = "uSurfaceTransform";
/// Uniform: external sampler. Optional, custom fragment shaders may rename it.
pub const SAMPLER_UNIFORM: &str = "sExternalTexture";

/// Extension every external-texture fragment shader has to enable.
pub const EXTERNAL_IMAGE_EXTENSION: &str = "GL_OES_EGL_image_external";

/// GLSL ES vertex shader: passes the transformed texture coordinate through.
pub const VERTEX_SHADER: &str = r#"uniform mat4 uModelViewProjection;
uniform mat4 uSurfaceTransform;
attribute vec4 aPosition;
attribute vec4 aTextureCoordinate;
varying vec2 vTextureCoordinate;
void main() {
    gl_Position = uModelViewProjection * aPosition;
    vTextureCoordinate = (uSurfaceTransform * aTextureCoordinate).xy;
}
"#;

/// GLSL ES fragment shader: samples the external texture unchanged.
///
/// Replacement fragment shaders read `vTextureCoordinate` and declare their
/// own `samplerExternalOES` uniform.
pub const FRAGMENT_SHADER: &str = r#"#extension GL_OES_EGL_image_external : require
precision mediump float;
varying vec2 vTextureCoordinate;
uniform samplerExternalOES sExternalTexture;
void main() {
    gl_FragColor = texture2D(sExternalTexture, vTextureCoordinate);
}
"#;
