use crate::gl::{GlApi, GlErrorCode, ShaderStage};
use extquad_common::ContextId;
use std::fmt;

/// Kind of shader input a location lookup was for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationKind {
    Attribute,
    Uniform,
}

impl fmt::Display for LocationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocationKind::Attribute => f.write_str("attribute"),
            LocationKind::Uniform => f.write_str("uniform"),
        }
    }
}

/// Errors from renderer operations. None of these are retried internally.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("{stage} shader failed to compile: {log}")]
    Compile { stage: ShaderStage, log: String },
    #[error("program failed to link: {log}")]
    Link { log: String },
    #[error("{kind} `{name}` has no location in the linked program")]
    Location { kind: LocationKind, name: String },
    #[error("{op}: {code}")]
    GlState { op: String, code: GlErrorCode },
    #[error("failed to create {what}: {reason}")]
    Create { what: &'static str, reason: String },
    #[error("{op} called before setup")]
    NotReady { op: &'static str },
    #[error("renderer belongs to {expected}, called with {actual}")]
    ContextMismatch {
        expected: ContextId,
        actual: ContextId,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl RenderError {
    /// Shader compile, link and location failures mean the shader source and
    /// the context disagree; everything else is the context misbehaving.
    pub fn is_shader_error(&self) -> bool {
        matches!(
            self,
            RenderError::Compile { .. } | RenderError::Link { .. } | RenderError::Location { .. }
        )
    }
}

/// Errors from loading or saving a [`crate::RendererConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("texture unit {unit} out of range, must be below {max}")]
    TextureUnit { unit: u32, max: u32 },
}

/// Drain the context's error flags after `op`.
///
/// The first pending flag becomes the error; any further flags are logged so
/// they are not misattributed to a later call.
pub fn check_gl<G: GlApi>(gl: &mut G, op: impl Into<String>) -> Result<(), RenderError> {
    let mut first = None;
    // Drain at most 16 flags per check.
    for _ in 0..16 {
        let Some(code) = GlErrorCode::from_raw(gl.get_error()) else {
            break;
        };
        if first.is_none() {
            first = Some(code);
        } else {
            tracing::warn!(%code, "additional GL error flag pending");
        }
    }
    match first {
        None => Ok(()),
        Some(code) => {
            let op = op.into();
            tracing::error!(%op, %code, "GL call failed");
            Err(RenderError::GlState { op, code })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::RecordingGl;

    #[test]
    fn clean_context_passes() {
        let mut gl = RecordingGl::new();
        assert!(check_gl(&mut gl, "noop").is_ok());
    }

    #[test]
    fn first_flag_is_reported_and_queue_drained() {
        let mut gl = RecordingGl::new();
        gl.push_error(GlErrorCode::InvalidValue);
        gl.push_error(GlErrorCode::OutOfMemory);

        let err = check_gl(&mut gl, "glTexParameter").unwrap_err();
        match err {
            RenderError::GlState { op, code } => {
                assert_eq!(op, "glTexParameter");
                assert_eq!(code, GlErrorCode::InvalidValue);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(check_gl(&mut gl, "after").is_ok());
    }

    #[test]
    fn drain_is_capped_per_check() {
        let mut gl = RecordingGl::new();
        for _ in 0..20 {
            gl.push_error(GlErrorCode::InvalidValue);
        }
        assert!(check_gl(&mut gl, "first").is_err());
        // The four flags past the cap surface on the next check.
        assert!(check_gl(&mut gl, "second").is_err());
        assert!(check_gl(&mut gl, "third").is_ok());
    }

    #[test]
    fn error_messages_carry_context() {
        let err = RenderError::Compile {
            stage: ShaderStage::Fragment,
            log: "0:3: syntax error".into(),
        };
        assert_eq!(
            err.to_string(),
            "fragment shader failed to compile: 0:3: syntax error"
        );
        assert!(err.is_shader_error());

        let err = RenderError::Location {
            kind: LocationKind::Uniform,
            name: "uSurfaceTransform".into(),
        };
        assert!(err.to_string().contains("uniform `uSurfaceTransform`"));

        let err = RenderError::NotReady { op: "draw_frame" };
        assert!(!err.is_shader_error());
    }
}
