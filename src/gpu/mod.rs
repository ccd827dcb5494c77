//! GPU backend abstraction.
//!
//! Models talk to the GPU only through [`RenderBackend`]. Two
//! implementations exist:
//! - [`GlowFrame`]: a per-frame view over [`GlowBackend`] and a borrowed
//!   `glow::Context` (WebGL2 on wasm32, desktop GL natively)
//! - [`HeadlessBackend`]: records resources and draw calls without a GL
//!   context, used by tests

mod glow_backend;
mod headless;

pub use glow_backend::{GlowBackend, GlowFrame};
pub use headless::{DrawRecord, HeadlessBackend};

use crate::style::BufferUsage;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Handle to a linked shader program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramId(pub(crate) u32);

/// Handle to a vertex or index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub(crate) u32);

/// Handle to a 2D texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub(crate) u32);

/// RGBA8 pixels of a raster, rows top to bottom.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    width: u32,
    height: u32,
    pixels: Arc<[u8]>,
}

impl RasterImage {
    /// Wraps raw RGBA8 pixels. The length must be `width * height * 4`.
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, BackendError> {
        let expected = width as usize * height as usize * 4;
        if width == 0 || height == 0 || pixels.len() != expected {
            return Err(BackendError::Resource(format!(
                "raster of {}x{} needs {} bytes, got {}",
                width,
                height,
                expected,
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels: pixels.into(),
        })
    }

    /// Builds an image from a color per pixel.
    pub fn from_fn(width: u32, height: u32, mut pixel: impl FnMut(u32, u32) -> [u8; 4]) -> Self {
        let mut pixels = Vec::with_capacity(width as usize * height as usize * 4);
        for y in 0..height {
            for x in 0..width {
                pixels.extend_from_slice(&pixel(x, y));
            }
        }
        Self {
            width,
            height,
            pixels: pixels.into(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

/// Shader pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => write!(f, "vertex"),
            ShaderStage::Fragment => write!(f, "fragment"),
        }
    }
}

/// Errors returned by a backend.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendError {
    /// A shader stage failed to compile.
    ShaderCompile { stage: ShaderStage, log: String },
    /// The program failed to link.
    Link(String),
    /// A GL object could not be created.
    Resource(String),
    /// A handle was used after deletion or never existed.
    UnknownHandle(String),
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::ShaderCompile { stage, log } => {
                write!(f, "Failed to compile {} shader: {}", stage, log)
            }
            BackendError::Link(log) => write!(f, "Failed to link program: {}", log),
            BackendError::Resource(msg) => write!(f, "Failed to create GL resource: {}", msg),
            BackendError::UnknownHandle(handle) => write!(f, "Unknown handle: {}", handle),
        }
    }
}

impl std::error::Error for BackendError {}

/// Value of one shader uniform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    /// Column-major 4x4 matrix
    Mat4([f32; 16]),
}

/// Uniform set keyed by GLSL name.
pub type Uniforms = BTreeMap<String, UniformValue>;

/// Depth test state for a draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DepthConfig {
    pub enable: bool,
    pub write: bool,
}

impl DepthConfig {
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn enabled() -> Self {
        Self {
            enable: true,
            write: true,
        }
    }
}

/// Blend state for a draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendConfig {
    /// Opaque, blending off
    None,
    /// Straight-alpha "over" blending
    #[default]
    Normal,
    /// Additive glow
    Additive,
}

/// Binds one vertex buffer to a shader attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexBinding {
    pub name: String,
    pub buffer: BufferId,
    /// Components per vertex
    pub size: usize,
}

/// Binds one texture to a sampler uniform.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureBinding {
    pub name: String,
    pub texture: TextureId,
}

/// Everything needed to issue one indexed draw.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall<'a> {
    pub program: ProgramId,
    pub bindings: &'a [VertexBinding],
    pub textures: &'a [TextureBinding],
    pub indices: BufferId,
    pub index_count: usize,
    pub uniforms: &'a Uniforms,
    pub depth: DepthConfig,
    pub blend: BlendConfig,
}

/// Minimal GPU interface used by models.
pub trait RenderBackend {
    /// Compiles and links a vertex/fragment shader pair.
    fn compile_program(&mut self, vertex: &str, fragment: &str) -> Result<ProgramId, BackendError>;

    fn create_vertex_buffer(
        &mut self,
        data: &[f32],
        usage: BufferUsage,
    ) -> Result<BufferId, BackendError>;

    fn create_index_buffer(&mut self, data: &[u32]) -> Result<BufferId, BackendError>;

    /// Uploads an RGBA8 image as a linearly filtered, edge-clamped texture.
    fn create_texture(&mut self, image: &RasterImage) -> Result<TextureId, BackendError>;

    fn draw(&mut self, call: &DrawCall<'_>) -> Result<(), BackendError>;

    /// Deletes a program. Unknown handles are ignored.
    fn delete_program(&mut self, program: ProgramId);

    /// Deletes a buffer. Unknown handles are ignored.
    fn delete_buffer(&mut self, buffer: BufferId);

    /// Deletes a texture. Unknown handles are ignored.
    fn delete_texture(&mut self, texture: TextureId);

    /// Number of programs, buffers and textures currently alive.
    fn live_resources(&self) -> usize;
}
