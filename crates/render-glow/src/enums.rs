use extquad_render::{ClearBuffers, ShaderStage, TexParam, TexValue};

/// `GL_TEXTURE_EXTERNAL_OES` from `OES_EGL_image_external`.
pub const TEXTURE_EXTERNAL_OES: u32 = 0x8D65;

pub(crate) fn shader_type(stage: ShaderStage) -> u32 {
    match stage {
        ShaderStage::Vertex => glow::VERTEX_SHADER,
        ShaderStage::Fragment => glow::FRAGMENT_SHADER,
    }
}

/// `GL_TEXTUREi` for `unit`, or `None` when the sum leaves `u32`.
pub(crate) fn texture_unit(unit: u32) -> Option<u32> {
    glow::TEXTURE0.checked_add(unit)
}

pub(crate) fn tex_param(param: TexParam) -> u32 {
    match param {
        TexParam::MinFilter => glow::TEXTURE_MIN_FILTER,
        TexParam::MagFilter => glow::TEXTURE_MAG_FILTER,
        TexParam::WrapS => glow::TEXTURE_WRAP_S,
        TexParam::WrapT => glow::TEXTURE_WRAP_T,
    }
}

pub(crate) fn tex_value(value: TexValue) -> i32 {
    (match value {
        TexValue::Nearest => glow::NEAREST,
        TexValue::Linear => glow::LINEAR,
        TexValue::ClampToEdge => glow::CLAMP_TO_EDGE,
    }) as i32
}

pub(crate) fn clear_mask(buffers: ClearBuffers) -> u32 {
    let mut mask = 0;
    if buffers.color {
        mask |= glow::COLOR_BUFFER_BIT;
    }
    if buffers.depth {
        mask |= glow::DEPTH_BUFFER_BIT;
    }
    mask
}
