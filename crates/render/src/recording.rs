//! Software stand-in for a GL context.
//!
//! `RecordingGl` implements [`GlApi`] without a GPU. It records every call,
//! runs a small GLSL ES front-end (extension directives, `main`, brace
//! balance, declared inputs) so compile and link diagnostics look like a
//! driver's, tracks object lifetimes, and snapshots the state each draw
//! call sees. Tests and the CLI drive the renderer against it.

use crate::config::MAX_TEXTURE_UNITS;
use crate::gl::{ClearBuffers, GlApi, GlErrorCode, NO_ERROR, ShaderStage, TexParam, TexValue};
use crate::shaders;
use extquad_common::{ContextId, SurfaceTransform};
use glam::Mat4;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

/// One recorded GL call.
#[derive(Debug, Clone, PartialEq)]
pub enum GlCall {
    CreateShader { stage: ShaderStage, shader: u32 },
    ShaderSource { shader: u32 },
    CompileShader { shader: u32 },
    DeleteShader { shader: u32 },
    CreateProgram { program: u32 },
    AttachShader { program: u32, shader: u32 },
    DetachShader { program: u32, shader: u32 },
    LinkProgram { program: u32 },
    DeleteProgram { program: u32 },
    UseProgram { program: Option<u32> },
    GetAttribLocation { name: String },
    GetUniformLocation { name: String },
    CreateTexture { texture: u32 },
    ActiveTexture { unit: u32 },
    BindExternalTexture { texture: Option<u32> },
    TexParameter { param: TexParam, value: TexValue },
    DeleteTexture { texture: u32 },
    CreateBuffer { buffer: u32 },
    BindArrayBuffer { buffer: Option<u32> },
    ArrayBufferData { len: usize },
    DeleteBuffer { buffer: u32 },
    VertexAttribPointer { index: u32, size: i32, stride: i32, offset: i32 },
    EnableVertexAttribArray { index: u32 },
    UniformMatrix4 { location: u32, value: [f32; 16] },
    Uniform1i { location: u32, value: i32 },
    ClearColor { rgba: [f32; 4] },
    Clear { buffers: ClearBuffers },
    DrawArrays { first: i32, count: i32 },
}

impl GlCall {
    /// The GL entry point this call corresponds to.
    pub fn name(&self) -> &'static str {
        match self {
            GlCall::CreateShader { .. } => "glCreateShader",
            GlCall::ShaderSource { .. } => "glShaderSource",
            GlCall::CompileShader { .. } => "glCompileShader",
            GlCall::DeleteShader { .. } => "glDeleteShader",
            GlCall::CreateProgram { .. } => "glCreateProgram",
            GlCall::AttachShader { .. } => "glAttachShader",
            GlCall::DetachShader { .. } => "glDetachShader",
            GlCall::LinkProgram { .. } => "glLinkProgram",
            GlCall::DeleteProgram { .. } => "glDeleteProgram",
            GlCall::UseProgram { .. } => "glUseProgram",
            GlCall::GetAttribLocation { .. } => "glGetAttribLocation",
            GlCall::GetUniformLocation { .. } => "glGetUniformLocation",
            GlCall::CreateTexture { .. } => "glGenTextures",
            GlCall::ActiveTexture { .. } => "glActiveTexture",
            GlCall::BindExternalTexture { .. } => "glBindTexture",
            GlCall::TexParameter { .. } => "glTexParameteri",
            GlCall::DeleteTexture { .. } => "glDeleteTextures",
            GlCall::CreateBuffer { .. } => "glGenBuffers",
            GlCall::BindArrayBuffer { .. } => "glBindBuffer",
            GlCall::ArrayBufferData { .. } => "glBufferData",
            GlCall::DeleteBuffer { .. } => "glDeleteBuffers",
            GlCall::VertexAttribPointer { .. } => "glVertexAttribPointer",
            GlCall::EnableVertexAttribArray { .. } => "glEnableVertexAttribArray",
            GlCall::UniformMatrix4 { .. } => "glUniformMatrix4fv",
            GlCall::Uniform1i { .. } => "glUniform1i",
            GlCall::ClearColor { .. } => "glClearColor",
            GlCall::Clear { .. } => "glClear",
            GlCall::DrawArrays { .. } => "glDrawArrays",
        }
    }
}

/// State captured at a `glDrawArrays` call.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    pub program: u32,
    pub texture: Option<u32>,
    pub first: i32,
    pub count: i32,
    pub model_view_projection: Option<Mat4>,
    pub surface_transform: Option<Mat4>,
    pub sampler_unit: Option<i32>,
    /// Positions fetched through the position attribute pointer.
    pub positions: Vec<[f32; 3]>,
    /// Texture coordinates fetched through the texture-coordinate pointer.
    pub tex_coords: Vec<[f32; 2]>,
}

impl DrawRecord {
    /// Texture coordinates each vertex samples after the surface transform.
    pub fn sampled_uvs(&self) -> Vec<[f32; 2]> {
        let st = self.surface_transform.unwrap_or(Mat4::IDENTITY);
        self.tex_coords
            .iter()
            .map(|uv| SurfaceTransform::apply(&st, *uv))
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
struct Interface {
    attributes: Vec<String>,
    uniforms: Vec<String>,
    varyings: Vec<String>,
}

#[derive(Debug)]
struct ShaderObject {
    stage: ShaderStage,
    source: String,
    compiled: Option<Result<Interface, String>>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum UniformValue {
    Mat4([f32; 16]),
    Int(i32),
}

#[derive(Debug, Default)]
struct ProgramObject {
    attached: Vec<u32>,
    attributes: Vec<String>,
    uniforms: Vec<String>,
    linked: bool,
    log: String,
    values: HashMap<u32, UniformValue>,
}

#[derive(Debug, Clone, Copy)]
struct AttribPointer {
    buffer: u32,
    size: i32,
    stride: i32,
    offset: i32,
}

/// A recording, GPU-less [`GlApi`].
#[derive(Debug)]
pub struct RecordingGl {
    id: ContextId,
    next_name: u32,
    calls: Vec<GlCall>,
    errors: VecDeque<GlErrorCode>,
    injected: Vec<(&'static str, GlErrorCode)>,
    failing_creation: Vec<&'static str>,
    extensions: BTreeSet<String>,
    shaders: HashMap<u32, ShaderObject>,
    programs: HashMap<u32, ProgramObject>,
    textures: HashMap<u32, Vec<(TexParam, TexValue)>>,
    buffers: HashMap<u32, Vec<u8>>,
    current_program: Option<u32>,
    active_unit: u32,
    bound_textures: BTreeMap<u32, u32>,
    bound_buffer: Option<u32>,
    pointers: BTreeMap<u32, AttribPointer>,
    enabled: BTreeSet<u32>,
    clear_color: [f32; 4],
    draws: Vec<DrawRecord>,
}

impl Default for RecordingGl {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingGl {
    /// A context that supports external images.
    pub fn new() -> Self {
        Self::with_extensions([shaders::EXTERNAL_IMAGE_EXTENSION])
    }

    /// A context advertising exactly `extensions`.
    pub fn with_extensions<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: ContextId::next(),
            next_name: 1,
            calls: Vec::new(),
            errors: VecDeque::new(),
            injected: Vec::new(),
            failing_creation: Vec::new(),
            extensions: extensions.into_iter().map(Into::into).collect(),
            shaders: HashMap::new(),
            programs: HashMap::new(),
            textures: HashMap::new(),
            buffers: HashMap::new(),
            current_program: None,
            active_unit: 0,
            bound_textures: BTreeMap::new(),
            bound_buffer: None,
            pointers: BTreeMap::new(),
            enabled: BTreeSet::new(),
            clear_color: [0.0; 4],
            draws: Vec::new(),
        }
    }

    /// Raise `code` right after the next call to the GL entry point `call`.
    pub fn inject_error(&mut self, call: &'static str, code: GlErrorCode) {
        self.injected.push((call, code));
    }

    /// Make the next object creation through `call` return no handle.
    /// Accepts `glCreateShader`, `glCreateProgram`, `glGenTextures` and `glGenBuffers`.
    pub fn fail_creation(&mut self, call: &'static str) {
        self.failing_creation.push(call);
    }

    /// Queue an error flag as if an earlier, unchecked call had raised it.
    pub fn push_error(&mut self, code: GlErrorCode) {
        self.errors.push_back(code);
    }

    pub fn calls(&self) -> &[GlCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Names of the recorded calls, in order.
    pub fn call_names(&self) -> Vec<&'static str> {
        self.calls.iter().map(GlCall::name).collect()
    }

    pub fn draws(&self) -> &[DrawRecord] {
        &self.draws
    }

    /// Hand over the draws recorded so far and start a fresh list.
    pub fn take_draws(&mut self) -> Vec<DrawRecord> {
        std::mem::take(&mut self.draws)
    }

    pub fn live_programs(&self) -> usize {
        self.programs.len()
    }

    pub fn live_shaders(&self) -> usize {
        self.shaders.len()
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_program_live(&self, program: u32) -> bool {
        self.programs.contains_key(&program)
    }

    /// Parameters set on `texture`, in call order.
    pub fn texture_parameters(&self, texture: u32) -> Option<&[(TexParam, TexValue)]> {
        self.textures.get(&texture).map(Vec::as_slice)
    }

    /// External texture bound on the active unit.
    pub fn bound_external_texture(&self) -> Option<u32> {
        self.bound_textures.get(&self.active_unit).copied()
    }

    pub fn current_clear_color(&self) -> [f32; 4] {
        self.clear_color
    }

    fn record(&mut self, call: GlCall) {
        let name = call.name();
        self.calls.push(call);
        if let Some(i) = self.injected.iter().position(|(n, _)| *n == name) {
            let (_, code) = self.injected.remove(i);
            self.errors.push_back(code);
        }
    }

    fn raise(&mut self, code: GlErrorCode) {
        // GL keeps one sticky flag per kind.
        if !self.errors.contains(&code) {
            self.errors.push_back(code);
        }
    }

    fn take_creation_failure(&mut self, call: &'static str) -> bool {
        match self.failing_creation.iter().position(|n| *n == call) {
            Some(i) => {
                self.failing_creation.remove(i);
                true
            }
            None => false,
        }
    }

    fn alloc_name(&mut self) -> u32 {
        let name = self.next_name;
        self.next_name += 1;
        name
    }

    fn set_uniform(&mut self, location: u32, value: UniformValue) {
        let Some(program) = self.current_program.and_then(|p| self.programs.get_mut(&p)) else {
            self.raise(GlErrorCode::InvalidOperation);
            return;
        };
        if location as usize >= program.uniforms.len() {
            self.raise(GlErrorCode::InvalidOperation);
            return;
        }
        program.values.insert(location, value);
    }

    fn link(&mut self, program: u32) {
        let Some(attached) = self.programs.get(&program).map(|p| p.attached.clone()) else {
            self.raise(GlErrorCode::InvalidValue);
            return;
        };
        let mut vertex = None;
        let mut fragment = None;
        for shader in attached {
            if let Some(obj) = self.shaders.get(&shader) {
                let iface = match &obj.compiled {
                    Some(Ok(iface)) => Some(iface.clone()),
                    _ => None,
                };
                match obj.stage {
                    ShaderStage::Vertex => vertex = iface,
                    ShaderStage::Fragment => fragment = iface,
                }
            }
        }
        let result = match (vertex, fragment) {
            (Some(vs), Some(fs)) => link_interfaces(&vs, &fs),
            _ => Err("ERROR: program requires a compiled vertex and fragment shader".to_string()),
        };
        let Some(obj) = self.programs.get_mut(&program) else {
            return;
        };
        obj.values.clear();
        match result {
            Ok((attributes, uniforms)) => {
                obj.attributes = attributes;
                obj.uniforms = uniforms;
                obj.linked = true;
                obj.log.clear();
            }
            Err(log) => {
                obj.attributes.clear();
                obj.uniforms.clear();
                obj.linked = false;
                obj.log = log;
            }
        }
    }

    fn fetch<const N: usize>(&self, index: u32, first: i32, count: i32) -> Vec<[f32; N]> {
        let Some(ptr) = self.pointers.get(&index) else {
            return Vec::new();
        };
        if !self.enabled.contains(&index) || ptr.size as usize != N {
            return Vec::new();
        }
        let Some(data) = self.buffers.get(&ptr.buffer) else {
            return Vec::new();
        };
        let stride = if ptr.stride == 0 {
            N * 4
        } else {
            ptr.stride as usize
        };
        (first..first + count)
            .filter_map(|v| {
                let base = ptr.offset as usize + v as usize * stride;
                let mut out = [0.0f32; N];
                for (i, slot) in out.iter_mut().enumerate() {
                    let at = base + i * 4;
                    let bytes: [u8; 4] = data.get(at..at + 4)?.try_into().ok()?;
                    *slot = f32::from_ne_bytes(bytes);
                }
                Some(out)
            })
            .collect()
    }

    fn snapshot_draw(&self, program: u32, first: i32, count: i32) -> DrawRecord {
        let obj = &self.programs[&program];
        let uniform = |name: &str| {
            let loc = obj.uniforms.iter().position(|u| u == name)? as u32;
            obj.values.get(&loc).copied()
        };
        let matrix = |name: &str| match uniform(name) {
            Some(UniformValue::Mat4(m)) => Some(Mat4::from_cols_array(&m)),
            _ => None,
        };
        let sampler_unit = match uniform(shaders::SAMPLER_UNIFORM) {
            Some(UniformValue::Int(unit)) => Some(unit),
            _ => None,
        };
        let attrib = |name: &str| obj.attributes.iter().position(|a| a == name).map(|i| i as u32);
        let positions = attrib(shaders::POSITION_ATTRIBUTE)
            .map(|i| self.fetch::<3>(i, first, count))
            .unwrap_or_default();
        let tex_coords = attrib(shaders::TEXTURE_COORDINATE_ATTRIBUTE)
            .map(|i| self.fetch::<2>(i, first, count))
            .unwrap_or_default();
        let unit = sampler_unit.map(|u| u as u32).unwrap_or(0);

        DrawRecord {
            program,
            texture: self.bound_textures.get(&unit).copied(),
            first,
            count,
            model_view_projection: matrix(shaders::MVP_UNIFORM),
            surface_transform: matrix(shaders::SURFACE_TRANSFORM_UNIFORM),
            sampler_unit,
            positions,
            tex_coords,
        }
    }
}

impl GlApi for RecordingGl {
    type Shader = u32;
    type Program = u32;
    type Texture = u32;
    type Buffer = u32;
    type UniformLocation = u32;

    fn context_id(&self) -> ContextId {
        self.id
    }

    fn get_error(&mut self) -> u32 {
        self.errors.pop_front().map(GlErrorCode::raw).unwrap_or(NO_ERROR)
    }

    fn create_shader(&mut self, stage: ShaderStage) -> Result<u32, String> {
        if self.take_creation_failure("glCreateShader") {
            return Err("glCreateShader returned 0".into());
        }
        let shader = self.alloc_name();
        self.shaders.insert(
            shader,
            ShaderObject {
                stage,
                source: String::new(),
                compiled: None,
            },
        );
        self.record(GlCall::CreateShader { stage, shader });
        Ok(shader)
    }

    fn shader_source(&mut self, shader: u32, source: &str) {
        self.record(GlCall::ShaderSource { shader });
        if let Some(obj) = self.shaders.get_mut(&shader) {
            obj.source = source.to_string();
        } else {
            self.raise(GlErrorCode::InvalidValue);
        }
    }

    fn compile_shader(&mut self, shader: u32) {
        self.record(GlCall::CompileShader { shader });
        if let Some(obj) = self.shaders.get_mut(&shader) {
            obj.compiled = Some(parse_interface(obj.stage, &obj.source, &self.extensions));
        } else {
            self.raise(GlErrorCode::InvalidValue);
        }
    }

    fn shader_compile_status(&mut self, shader: u32) -> bool {
        matches!(
            self.shaders.get(&shader).and_then(|s| s.compiled.as_ref()),
            Some(Ok(_))
        )
    }

    fn shader_info_log(&mut self, shader: u32) -> String {
        match self.shaders.get(&shader).and_then(|s| s.compiled.as_ref()) {
            Some(Err(log)) => log.clone(),
            _ => String::new(),
        }
    }

    fn delete_shader(&mut self, shader: u32) {
        self.record(GlCall::DeleteShader { shader });
        self.shaders.remove(&shader);
    }

    fn create_program(&mut self) -> Result<u32, String> {
        if self.take_creation_failure("glCreateProgram") {
            return Err("glCreateProgram returned 0".into());
        }
        let program = self.alloc_name();
        self.programs.insert(program, ProgramObject::default());
        self.record(GlCall::CreateProgram { program });
        Ok(program)
    }

    fn attach_shader(&mut self, program: u32, shader: u32) {
        self.record(GlCall::AttachShader { program, shader });
        if !self.shaders.contains_key(&shader) {
            self.raise(GlErrorCode::InvalidValue);
            return;
        }
        let already = self.programs.get(&program).map(|p| p.attached.contains(&shader));
        match already {
            None => self.raise(GlErrorCode::InvalidValue),
            Some(true) => self.raise(GlErrorCode::InvalidOperation),
            Some(false) => {
                if let Some(obj) = self.programs.get_mut(&program) {
                    obj.attached.push(shader);
                }
            }
        }
    }

    fn detach_shader(&mut self, program: u32, shader: u32) {
        self.record(GlCall::DetachShader { program, shader });
        if let Some(obj) = self.programs.get_mut(&program) {
            obj.attached.retain(|s| *s != shader);
        }
    }

    fn link_program(&mut self, program: u32) {
        self.record(GlCall::LinkProgram { program });
        self.link(program);
    }

    fn program_link_status(&mut self, program: u32) -> bool {
        self.programs.get(&program).is_some_and(|p| p.linked)
    }

    fn program_info_log(&mut self, program: u32) -> String {
        self.programs
            .get(&program)
            .map(|p| p.log.clone())
            .unwrap_or_default()
    }

    fn delete_program(&mut self, program: u32) {
        self.record(GlCall::DeleteProgram { program });
        self.programs.remove(&program);
        if self.current_program == Some(program) {
            self.current_program = None;
        }
    }

    fn use_program(&mut self, program: Option<u32>) {
        self.record(GlCall::UseProgram { program });
        match program {
            None => self.current_program = None,
            Some(p) => match self.programs.get(&p).map(|obj| obj.linked) {
                None => self.raise(GlErrorCode::InvalidValue),
                Some(false) => self.raise(GlErrorCode::InvalidOperation),
                Some(true) => self.current_program = Some(p),
            },
        }
    }

    fn attrib_location(&mut self, program: u32, name: &str) -> Option<u32> {
        self.record(GlCall::GetAttribLocation { name: name.into() });
        let obj = self.programs.get(&program)?;
        obj.attributes.iter().position(|a| a == name).map(|i| i as u32)
    }

    fn uniform_location(&mut self, program: u32, name: &str) -> Option<u32> {
        self.record(GlCall::GetUniformLocation { name: name.into() });
        let obj = self.programs.get(&program)?;
        obj.uniforms.iter().position(|u| u == name).map(|i| i as u32)
    }

    fn create_texture(&mut self) -> Result<u32, String> {
        if self.take_creation_failure("glGenTextures") {
            return Err("glGenTextures produced no name".into());
        }
        let texture = self.alloc_name();
        self.textures.insert(texture, Vec::new());
        self.record(GlCall::CreateTexture { texture });
        Ok(texture)
    }

    fn active_texture(&mut self, unit: u32) {
        self.record(GlCall::ActiveTexture { unit });
        if unit >= MAX_TEXTURE_UNITS {
            self.raise(GlErrorCode::InvalidEnum);
            return;
        }
        self.active_unit = unit;
    }

    fn bind_external_texture(&mut self, texture: Option<u32>) {
        self.record(GlCall::BindExternalTexture { texture });
        match texture {
            None => {
                self.bound_textures.remove(&self.active_unit);
            }
            Some(t) if self.textures.contains_key(&t) => {
                self.bound_textures.insert(self.active_unit, t);
            }
            Some(_) => self.raise(GlErrorCode::InvalidOperation),
        }
    }

    fn external_tex_parameter(&mut self, param: TexParam, value: TexValue) {
        self.record(GlCall::TexParameter { param, value });
        let valid = match param {
            TexParam::MinFilter | TexParam::MagFilter => value != TexValue::ClampToEdge,
            TexParam::WrapS | TexParam::WrapT => value == TexValue::ClampToEdge,
        };
        if !valid {
            self.raise(GlErrorCode::InvalidEnum);
            return;
        }
        let bound = self.bound_external_texture();
        match bound.and_then(|t| self.textures.get_mut(&t)) {
            Some(params) => params.push((param, value)),
            None => self.raise(GlErrorCode::InvalidOperation),
        }
    }

    fn delete_texture(&mut self, texture: u32) {
        self.record(GlCall::DeleteTexture { texture });
        self.textures.remove(&texture);
        self.bound_textures.retain(|_, t| *t != texture);
    }

    fn create_buffer(&mut self) -> Result<u32, String> {
        if self.take_creation_failure("glGenBuffers") {
            return Err("glGenBuffers produced no name".into());
        }
        let buffer = self.alloc_name();
        self.buffers.insert(buffer, Vec::new());
        self.record(GlCall::CreateBuffer { buffer });
        Ok(buffer)
    }

    fn bind_array_buffer(&mut self, buffer: Option<u32>) {
        self.record(GlCall::BindArrayBuffer { buffer });
        match buffer {
            Some(b) if !self.buffers.contains_key(&b) => self.raise(GlErrorCode::InvalidOperation),
            _ => self.bound_buffer = buffer,
        }
    }

    fn array_buffer_data(&mut self, data: &[u8]) {
        self.record(GlCall::ArrayBufferData { len: data.len() });
        match self.bound_buffer.and_then(|b| self.buffers.get_mut(&b)) {
            Some(storage) => *storage = data.to_vec(),
            None => self.raise(GlErrorCode::InvalidOperation),
        }
    }

    fn delete_buffer(&mut self, buffer: u32) {
        self.record(GlCall::DeleteBuffer { buffer });
        self.buffers.remove(&buffer);
        if self.bound_buffer == Some(buffer) {
            self.bound_buffer = None;
        }
    }

    fn vertex_attrib_pointer_f32(&mut self, index: u32, size: i32, stride: i32, offset: i32) {
        self.record(GlCall::VertexAttribPointer {
            index,
            size,
            stride,
            offset,
        });
        if !(1..=4).contains(&size) || stride < 0 {
            self.raise(GlErrorCode::InvalidValue);
            return;
        }
        match self.bound_buffer {
            Some(buffer) => {
                self.pointers.insert(
                    index,
                    AttribPointer {
                        buffer,
                        size,
                        stride,
                        offset,
                    },
                );
            }
            None => self.raise(GlErrorCode::InvalidOperation),
        }
    }

    fn enable_vertex_attrib_array(&mut self, index: u32) {
        self.record(GlCall::EnableVertexAttribArray { index });
        self.enabled.insert(index);
    }

    fn uniform_matrix_4(&mut self, location: &u32, value: &[f32; 16]) {
        self.record(GlCall::UniformMatrix4 {
            location: *location,
            value: *value,
        });
        self.set_uniform(*location, UniformValue::Mat4(*value));
    }

    fn uniform_1_i32(&mut self, location: &u32, value: i32) {
        self.record(GlCall::Uniform1i {
            location: *location,
            value,
        });
        self.set_uniform(*location, UniformValue::Int(value));
    }

    fn clear_color(&mut self, rgba: [f32; 4]) {
        self.record(GlCall::ClearColor { rgba });
        self.clear_color = rgba;
    }

    fn clear(&mut self, buffers: ClearBuffers) {
        self.record(GlCall::Clear { buffers });
    }

    fn draw_triangle_strip(&mut self, first: i32, count: i32) {
        self.record(GlCall::DrawArrays { first, count });
        if first < 0 || count < 0 {
            self.raise(GlErrorCode::InvalidValue);
            return;
        }
        let Some(program) = self.current_program else {
            self.raise(GlErrorCode::InvalidOperation);
            return;
        };
        let record = self.snapshot_draw(program, first, count);
        self.draws.push(record);
    }
}

/// Check one shader stage and collect its declared inputs and outputs.
fn parse_interface(
    stage: ShaderStage,
    source: &str,
    supported: &BTreeSet<String>,
) -> Result<Interface, String> {
    let mut iface = Interface::default();
    let mut enabled = BTreeSet::new();
    let mut depth: i64 = 0;
    let mut has_main = false;
    let mut last_line = 1;

    for (n, raw) in source.lines().enumerate() {
        let line_no = n + 1;
        last_line = line_no;
        let line = raw.split("//").next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }

        if let Some(rest) = line.strip_prefix("#extension") {
            let mut parts = rest.split(':');
            let name = parts.next().unwrap_or("").trim().to_string();
            let behavior = parts.next().unwrap_or("").trim();
            if behavior == "require" && !supported.contains(&name) {
                return Err(format!(
                    "ERROR: 0:{line_no}: '#extension' : extension '{name}' is not supported"
                ));
            }
            if supported.contains(&name) {
                enabled.insert(name);
            }
            continue;
        }
        if line.starts_with('#') {
            continue;
        }

        if line.contains("samplerExternalOES")
            && !enabled.contains(shaders::EXTERNAL_IMAGE_EXTENSION)
        {
            return Err(format!(
                "ERROR: 0:{line_no}: 'samplerExternalOES' : requires extension '{}' to be enabled",
                shaders::EXTERNAL_IMAGE_EXTENSION
            ));
        }
        if line.contains("void main") {
            has_main = true;
        }
        for c in line.chars() {
            match c {
                '{' => depth += 1,
                '}' => depth -= 1,
                _ => {}
            }
            if depth < 0 {
                return Err(format!("ERROR: 0:{line_no}: '}}' : syntax error"));
            }
        }

        for statement in line.split(';') {
            let mut tokens = statement.split_whitespace();
            let Some(qualifier) = tokens.next() else {
                continue;
            };
            let list = match qualifier {
                "attribute" if stage == ShaderStage::Fragment => {
                    return Err(format!(
                        "ERROR: 0:{line_no}: 'attribute' : supported in vertex shaders only"
                    ));
                }
                "attribute" => &mut iface.attributes,
                "uniform" => &mut iface.uniforms,
                "varying" => &mut iface.varyings,
                _ => continue,
            };
            let rest: Vec<&str> = tokens
                .filter(|t| !matches!(*t, "lowp" | "mediump" | "highp"))
                .collect();
            let [_ty, name] = rest.as_slice() else {
                return Err(format!(
                    "ERROR: 0:{line_no}: '{qualifier}' : syntax error in declaration"
                ));
            };
            let name = name.split('[').next().unwrap_or_default().to_string();
            if !list.contains(&name) {
                list.push(name);
            }
        }
    }

    if depth != 0 {
        return Err(format!(
            "ERROR: 0:{last_line}: '' : syntax error, unexpected end of file"
        ));
    }
    if !has_main {
        return Err("ERROR: 0:0: '' : missing function 'main'".to_string());
    }
    Ok(iface)
}

/// Match fragment inputs against vertex outputs and lay out locations.
fn link_interfaces(vs: &Interface, fs: &Interface) -> Result<(Vec<String>, Vec<String>), String> {
    for varying in &fs.varyings {
        if !vs.varyings.contains(varying) {
            return Err(format!(
                "ERROR: Varying `{varying}` is read by the fragment shader but not written by the vertex shader"
            ));
        }
    }
    let mut uniforms = vs.uniforms.clone();
    for u in &fs.uniforms {
        if !uniforms.contains(u) {
            uniforms.push(u.clone());
        }
    }
    Ok((vs.attributes.clone(), uniforms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shaders::{FRAGMENT_SHADER, VERTEX_SHADER};

    fn compile(gl: &mut RecordingGl, stage: ShaderStage, src: &str) -> u32 {
        let s = gl.create_shader(stage).unwrap();
        gl.shader_source(s, src);
        gl.compile_shader(s);
        s
    }

    #[test]
    fn default_shaders_compile() {
        let mut gl = RecordingGl::new();
        let vs = compile(&mut gl, ShaderStage::Vertex, VERTEX_SHADER);
        let fs = compile(&mut gl, ShaderStage::Fragment, FRAGMENT_SHADER);
        assert!(gl.shader_compile_status(vs));
        assert!(gl.shader_compile_status(fs));
        assert_eq!(gl.shader_info_log(fs), "");
    }

    #[test]
    fn missing_extension_fails_on_directive_line() {
        let mut gl = RecordingGl::with_extensions(Vec::<String>::new());
        let fs = compile(&mut gl, ShaderStage::Fragment, FRAGMENT_SHADER);
        assert!(!gl.shader_compile_status(fs));
        let log = gl.shader_info_log(fs);
        assert!(log.contains("0:1"));
        assert!(log.contains("GL_OES_EGL_image_external"));
    }

    #[test]
    fn external_sampler_without_directive_fails() {
        let mut gl = RecordingGl::new();
        let src = "precision mediump float;\nuniform samplerExternalOES s;\nvoid main() {}\n";
        let fs = compile(&mut gl, ShaderStage::Fragment, src);
        assert!(gl.shader_info_log(fs).contains("samplerExternalOES"));
    }

    #[test]
    fn unbalanced_braces_fail() {
        let mut gl = RecordingGl::new();
        let fs = compile(&mut gl, ShaderStage::Fragment, "void main() {\n");
        assert!(!gl.shader_compile_status(fs));
        assert!(gl.shader_info_log(fs).contains("syntax error"));
    }

    #[test]
    fn attributes_rejected_in_fragment_stage() {
        let mut gl = RecordingGl::new();
        let fs = compile(
            &mut gl,
            ShaderStage::Fragment,
            "attribute vec4 a;\nvoid main() {}\n",
        );
        assert!(gl.shader_info_log(fs).contains("vertex shaders only"));
    }

    #[test]
    fn locations_follow_declaration_order() {
        let mut gl = RecordingGl::new();
        let vs = compile(&mut gl, ShaderStage::Vertex, VERTEX_SHADER);
        let fs = compile(&mut gl, ShaderStage::Fragment, FRAGMENT_SHADER);
        let p = gl.create_program().unwrap();
        gl.attach_shader(p, vs);
        gl.attach_shader(p, fs);
        gl.link_program(p);
        assert!(gl.program_link_status(p));
        assert_eq!(gl.attrib_location(p, shaders::POSITION_ATTRIBUTE), Some(0));
        assert_eq!(
            gl.attrib_location(p, shaders::TEXTURE_COORDINATE_ATTRIBUTE),
            Some(1)
        );
        assert_eq!(gl.uniform_location(p, shaders::MVP_UNIFORM), Some(0));
        assert_eq!(
            gl.uniform_location(p, shaders::SURFACE_TRANSFORM_UNIFORM),
            Some(1)
        );
        assert_eq!(gl.uniform_location(p, shaders::SAMPLER_UNIFORM), Some(2));
        assert_eq!(gl.uniform_location(p, "uMissing"), None);
    }

    #[test]
    fn using_a_deleted_program_raises_invalid_value() {
        let mut gl = RecordingGl::new();
        let p = gl.create_program().unwrap();
        gl.delete_program(p);
        gl.use_program(Some(p));
        assert_eq!(gl.get_error(), GlErrorCode::InvalidValue.raw());
        assert_eq!(gl.get_error(), NO_ERROR);
    }

    #[test]
    fn injected_error_fires_once() {
        let mut gl = RecordingGl::new();
        gl.inject_error("glClear", GlErrorCode::OutOfMemory);
        gl.clear(ClearBuffers::COLOR_AND_DEPTH);
        gl.clear(ClearBuffers::COLOR_AND_DEPTH);
        assert_eq!(gl.get_error(), GlErrorCode::OutOfMemory.raw());
        assert_eq!(gl.get_error(), NO_ERROR);
    }

    #[test]
    fn tex_parameter_needs_bound_texture() {
        let mut gl = RecordingGl::new();
        gl.external_tex_parameter(TexParam::MinFilter, TexValue::Nearest);
        assert_eq!(gl.get_error(), GlErrorCode::InvalidOperation.raw());

        gl.external_tex_parameter(TexParam::WrapS, TexValue::Linear);
        assert_eq!(gl.get_error(), GlErrorCode::InvalidEnum.raw());
    }

    #[test]
    fn draw_without_program_is_invalid() {
        let mut gl = RecordingGl::new();
        gl.draw_triangle_strip(0, 4);
        assert_eq!(gl.get_error(), GlErrorCode::InvalidOperation.raw());
        assert!(gl.draws().is_empty());
    }

    #[test]
    fn texture_unit_past_the_limit_is_invalid_enum() {
        let mut gl = RecordingGl::new();
        gl.active_texture(MAX_TEXTURE_UNITS - 1);
        assert_eq!(gl.get_error(), NO_ERROR);
        gl.active_texture(MAX_TEXTURE_UNITS);
        assert_eq!(gl.get_error(), GlErrorCode::InvalidEnum.raw());
        assert_eq!(gl.active_unit, MAX_TEXTURE_UNITS - 1);
    }
}
