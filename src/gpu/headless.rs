//! Headless backend that records GPU activity without a GL context.

use super::{
    BackendError, BlendConfig, BufferId, DepthConfig, DrawCall, ProgramId, RasterImage,
    RenderBackend, ShaderStage, TextureId, Uniforms,
};
use crate::style::BufferUsage;
use std::collections::HashMap;

/// One recorded draw call.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    pub program: ProgramId,
    pub index_count: usize,
    pub uniforms: Uniforms,
    pub depth: DepthConfig,
    pub blend: BlendConfig,
    /// Attribute names bound for the draw, in binding order
    pub attributes: Vec<String>,
    /// Sampler names bound for the draw, in binding order
    pub textures: Vec<String>,
}

#[derive(Debug, Clone)]
enum Buffer {
    Vertex { len: usize, usage: BufferUsage },
    Index { len: usize },
}

/// Backend that keeps resources in memory and records draws.
///
/// Shader sources containing the configured failure marker fail to compile,
/// which lets tests exercise error paths.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    next_id: u32,
    programs: HashMap<u32, (String, String)>,
    buffers: HashMap<u32, Buffer>,
    /// Texture sizes by handle
    textures: HashMap<u32, (u32, u32)>,
    draws: Vec<DrawRecord>,
    fail_marker: Option<String>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every shader whose source contains `marker` fail to compile.
    pub fn fail_shaders_containing(mut self, marker: impl Into<String>) -> Self {
        self.fail_marker = Some(marker.into());
        self
    }

    /// Draw calls issued so far, in order.
    pub fn draws(&self) -> &[DrawRecord] {
        &self.draws
    }

    pub fn clear_draws(&mut self) {
        self.draws.clear();
    }

    /// Number of live programs.
    pub fn program_count(&self) -> usize {
        self.programs.len()
    }

    /// Length of a live vertex buffer, in floats.
    pub fn vertex_buffer_len(&self, buffer: BufferId) -> Option<usize> {
        match self.buffers.get(&buffer.0)? {
            Buffer::Vertex { len, .. } => Some(*len),
            Buffer::Index { .. } => None,
        }
    }

    /// Usage hint of a live vertex buffer.
    pub fn vertex_buffer_usage(&self, buffer: BufferId) -> Option<BufferUsage> {
        match self.buffers.get(&buffer.0)? {
            Buffer::Vertex { usage, .. } => Some(*usage),
            Buffer::Index { .. } => None,
        }
    }

    /// Width and height of a live texture.
    pub fn texture_size(&self, texture: TextureId) -> Option<(u32, u32)> {
        self.textures.get(&texture.0).copied()
    }

    fn next(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn check_source(&self, stage: ShaderStage, source: &str) -> Result<(), BackendError> {
        match &self.fail_marker {
            Some(marker) if source.contains(marker.as_str()) => Err(BackendError::ShaderCompile {
                stage,
                log: format!("ERROR: 0:1: '{}' : syntax error", marker),
            }),
            _ => Ok(()),
        }
    }
}

impl RenderBackend for HeadlessBackend {
    fn compile_program(&mut self, vertex: &str, fragment: &str) -> Result<ProgramId, BackendError> {
        self.check_source(ShaderStage::Vertex, vertex)?;
        self.check_source(ShaderStage::Fragment, fragment)?;

        let id = self.next();
        self.programs
            .insert(id, (vertex.to_string(), fragment.to_string()));
        Ok(ProgramId(id))
    }

    fn create_vertex_buffer(
        &mut self,
        data: &[f32],
        usage: BufferUsage,
    ) -> Result<BufferId, BackendError> {
        let id = self.next();
        self.buffers.insert(
            id,
            Buffer::Vertex {
                len: data.len(),
                usage,
            },
        );
        Ok(BufferId(id))
    }

    fn create_index_buffer(&mut self, data: &[u32]) -> Result<BufferId, BackendError> {
        let id = self.next();
        self.buffers.insert(id, Buffer::Index { len: data.len() });
        Ok(BufferId(id))
    }

    fn create_texture(&mut self, image: &RasterImage) -> Result<TextureId, BackendError> {
        let id = self.next();
        self.textures.insert(id, (image.width(), image.height()));
        Ok(TextureId(id))
    }

    fn draw(&mut self, call: &DrawCall<'_>) -> Result<(), BackendError> {
        if !self.programs.contains_key(&call.program.0) {
            return Err(BackendError::UnknownHandle(format!("{:?}", call.program)));
        }
        match self.buffers.get(&call.indices.0) {
            Some(Buffer::Index { len }) if *len >= call.index_count => {}
            _ => return Err(BackendError::UnknownHandle(format!("{:?}", call.indices))),
        }
        for binding in call.bindings {
            if !matches!(self.buffers.get(&binding.buffer.0), Some(Buffer::Vertex { .. })) {
                return Err(BackendError::UnknownHandle(format!("{:?}", binding.buffer)));
            }
        }
        for binding in call.textures {
            if !self.textures.contains_key(&binding.texture.0) {
                return Err(BackendError::UnknownHandle(format!("{:?}", binding.texture)));
            }
        }

        self.draws.push(DrawRecord {
            program: call.program,
            index_count: call.index_count,
            uniforms: call.uniforms.clone(),
            depth: call.depth,
            blend: call.blend,
            attributes: call.bindings.iter().map(|b| b.name.clone()).collect(),
            textures: call.textures.iter().map(|t| t.name.clone()).collect(),
        });
        Ok(())
    }

    fn delete_program(&mut self, program: ProgramId) {
        self.programs.remove(&program.0);
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        self.buffers.remove(&buffer.0);
    }

    fn delete_texture(&mut self, texture: TextureId) {
        self.textures.remove(&texture.0);
    }

    fn live_resources(&self) -> usize {
        self.programs.len() + self.buffers.len() + self.textures.len()
    }
}
