//! OpenGL / WebGL2 backend built on `glow`.
//!
//! `GlowBackend` owns the GL object handles but not the context. The context
//! belongs to the host (eframe hands it to paint callbacks), so every frame
//! wraps both in a [`GlowFrame`] which implements [`RenderBackend`].

use super::{
    BackendError, BlendConfig, BufferId, DrawCall, ProgramId, RasterImage, RenderBackend,
    ShaderStage, TextureId, UniformValue,
};
use crate::style::BufferUsage;
use glow::HasContext;
use std::collections::HashMap;

/// GL object handles owned by the scene.
#[derive(Debug, Default)]
pub struct GlowBackend {
    next_id: u32,
    programs: HashMap<u32, glow::Program>,
    buffers: HashMap<u32, glow::Buffer>,
    textures: HashMap<u32, glow::Texture>,
    vertex_array: Option<glow::VertexArray>,
    /// `#version` line for the context, resolved on first compile
    version_declaration: Option<&'static str>,
}

impl GlowBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Borrows the backend together with a GL context for one frame.
    pub fn frame<'a>(&'a mut self, gl: &'a glow::Context) -> GlowFrame<'a> {
        GlowFrame { gl, backend: self }
    }

    /// Deletes every GL object still alive. Call before the context goes away.
    pub fn destroy(&mut self, gl: &glow::Context) {
        unsafe {
            for (_, program) in self.programs.drain() {
                gl.delete_program(program);
            }
            for (_, buffer) in self.buffers.drain() {
                gl.delete_buffer(buffer);
            }
            for (_, texture) in self.textures.drain() {
                gl.delete_texture(texture);
            }
            if let Some(vao) = self.vertex_array.take() {
                gl.delete_vertex_array(vao);
            }
        }
    }

    fn next(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

/// A [`GlowBackend`] bound to a live GL context.
pub struct GlowFrame<'a> {
    gl: &'a glow::Context,
    backend: &'a mut GlowBackend,
}

impl GlowFrame<'_> {
    unsafe fn compile_stage(
        &self,
        stage: ShaderStage,
        source: &str,
    ) -> Result<glow::Shader, BackendError> {
        let gl = self.gl;
        let kind = match stage {
            ShaderStage::Vertex => glow::VERTEX_SHADER,
            ShaderStage::Fragment => glow::FRAGMENT_SHADER,
        };

        let shader = gl.create_shader(kind).map_err(BackendError::Resource)?;
        gl.shader_source(shader, &format!("{}\n{}", self.version_declaration(), source));
        gl.compile_shader(shader);
        if !gl.get_shader_compile_status(shader) {
            let log = gl.get_shader_info_log(shader);
            gl.delete_shader(shader);
            return Err(BackendError::ShaderCompile { stage, log });
        }
        Ok(shader)
    }

    unsafe fn upload(&mut self, target: u32, bytes: &[u8], usage: u32) -> Result<BufferId, BackendError> {
        let gl = self.gl;
        let buffer = gl.create_buffer().map_err(BackendError::Resource)?;
        gl.bind_buffer(target, Some(buffer));
        gl.buffer_data_u8_slice(target, bytes, usage);
        gl.bind_buffer(target, None);

        let id = self.backend.next();
        self.backend.buffers.insert(id, buffer);
        Ok(BufferId(id))
    }

    fn version_declaration(&self) -> &'static str {
        self.backend
            .version_declaration
            .unwrap_or_else(|| egui_glow::ShaderVersion::get(self.gl).version_declaration())
    }

    fn buffer(&self, id: BufferId) -> Result<glow::Buffer, BackendError> {
        self.backend
            .buffers
            .get(&id.0)
            .copied()
            .ok_or_else(|| BackendError::UnknownHandle(format!("{:?}", id)))
    }

    fn texture(&self, id: TextureId) -> Result<glow::Texture, BackendError> {
        self.backend
            .textures
            .get(&id.0)
            .copied()
            .ok_or_else(|| BackendError::UnknownHandle(format!("{:?}", id)))
    }

    unsafe fn set_uniform(&self, program: glow::Program, name: &str, value: &UniformValue) {
        let gl = self.gl;
        let Some(location) = gl.get_uniform_location(program, name) else {
            // Unused uniforms are optimized out by the GLSL compiler
            return;
        };
        let location = Some(&location);
        match value {
            UniformValue::Float(v) => gl.uniform_1_f32(location, *v),
            UniformValue::Vec2(v) => gl.uniform_2_f32(location, v[0], v[1]),
            UniformValue::Vec3(v) => gl.uniform_3_f32(location, v[0], v[1], v[2]),
            UniformValue::Vec4(v) => gl.uniform_4_f32(location, v[0], v[1], v[2], v[3]),
            UniformValue::Mat4(m) => gl.uniform_matrix_4_f32_slice(location, false, m),
        }
    }
}

impl RenderBackend for GlowFrame<'_> {
    fn compile_program(&mut self, vertex: &str, fragment: &str) -> Result<ProgramId, BackendError> {
        if self.backend.version_declaration.is_none() {
            let version = egui_glow::ShaderVersion::get(self.gl);
            log::debug!("Compiling layer shaders as {:?}", version);
            self.backend.version_declaration = Some(version.version_declaration());
        }
        unsafe {
            let gl = self.gl;
            let vs = self.compile_stage(ShaderStage::Vertex, vertex)?;
            let fs = match self.compile_stage(ShaderStage::Fragment, fragment) {
                Ok(fs) => fs,
                Err(e) => {
                    gl.delete_shader(vs);
                    return Err(e);
                }
            };

            let program = match gl.create_program() {
                Ok(program) => program,
                Err(e) => {
                    gl.delete_shader(vs);
                    gl.delete_shader(fs);
                    return Err(BackendError::Resource(e));
                }
            };
            gl.attach_shader(program, vs);
            gl.attach_shader(program, fs);
            gl.link_program(program);

            let linked = gl.get_program_link_status(program);
            gl.detach_shader(program, vs);
            gl.detach_shader(program, fs);
            gl.delete_shader(vs);
            gl.delete_shader(fs);

            if !linked {
                let log = gl.get_program_info_log(program);
                gl.delete_program(program);
                return Err(BackendError::Link(log));
            }

            let id = self.backend.next();
            self.backend.programs.insert(id, program);
            Ok(ProgramId(id))
        }
    }

    fn create_vertex_buffer(
        &mut self,
        data: &[f32],
        usage: BufferUsage,
    ) -> Result<BufferId, BackendError> {
        let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_ne_bytes()).collect();
        let usage = match usage {
            BufferUsage::Static => glow::STATIC_DRAW,
            BufferUsage::Dynamic => glow::DYNAMIC_DRAW,
        };
        unsafe { self.upload(glow::ARRAY_BUFFER, &bytes, usage) }
    }

    fn create_index_buffer(&mut self, data: &[u32]) -> Result<BufferId, BackendError> {
        let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_ne_bytes()).collect();
        unsafe { self.upload(glow::ELEMENT_ARRAY_BUFFER, &bytes, glow::STATIC_DRAW) }
    }

    fn create_texture(&mut self, image: &RasterImage) -> Result<TextureId, BackendError> {
        unsafe {
            let gl = self.gl;
            let texture = gl.create_texture().map_err(BackendError::Resource)?;
            gl.bind_texture(glow::TEXTURE_2D, Some(texture));
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, glow::LINEAR as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, glow::LINEAR as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, glow::CLAMP_TO_EDGE as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, glow::CLAMP_TO_EDGE as i32);
            gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
            gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                glow::RGBA8 as i32,
                image.width() as i32,
                image.height() as i32,
                0,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                glow::PixelUnpackData::Slice(Some(image.pixels())),
            );
            gl.bind_texture(glow::TEXTURE_2D, None);

            let id = self.backend.next();
            self.backend.textures.insert(id, texture);
            Ok(TextureId(id))
        }
    }

    fn draw(&mut self, call: &DrawCall<'_>) -> Result<(), BackendError> {
        let program = self
            .backend
            .programs
            .get(&call.program.0)
            .copied()
            .ok_or_else(|| BackendError::UnknownHandle(format!("{:?}", call.program)))?;
        let indices = self.buffer(call.indices)?;
        // Resolve every handle before touching GL state
        let buffers = call
            .bindings
            .iter()
            .map(|binding| Ok((binding, self.buffer(binding.buffer)?)))
            .collect::<Result<Vec<_>, BackendError>>()?;
        let textures = call
            .textures
            .iter()
            .map(|binding| Ok((binding, self.texture(binding.texture)?)))
            .collect::<Result<Vec<_>, BackendError>>()?;

        unsafe {
            let gl = self.gl;
            let vao = match self.backend.vertex_array {
                Some(vao) => vao,
                None => {
                    let vao = gl.create_vertex_array().map_err(BackendError::Resource)?;
                    self.backend.vertex_array = Some(vao);
                    vao
                }
            };

            gl.use_program(Some(program));
            gl.bind_vertex_array(Some(vao));

            let mut enabled = Vec::with_capacity(buffers.len());
            for (binding, buffer) in buffers {
                let Some(location) = gl.get_attrib_location(program, &binding.name) else {
                    continue;
                };
                gl.bind_buffer(glow::ARRAY_BUFFER, Some(buffer));
                gl.enable_vertex_attrib_array(location);
                gl.vertex_attrib_pointer_f32(location, binding.size as i32, glow::FLOAT, false, 0, 0);
                enabled.push(location);
            }
            gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(indices));

            for (name, value) in call.uniforms {
                self.set_uniform(program, name, value);
            }
            for (unit, (binding, texture)) in textures.iter().enumerate() {
                gl.active_texture(glow::TEXTURE0 + unit as u32);
                gl.bind_texture(glow::TEXTURE_2D, Some(*texture));
                if let Some(location) = gl.get_uniform_location(program, &binding.name) {
                    gl.uniform_1_i32(Some(&location), unit as i32);
                }
            }

            if call.depth.enable {
                gl.enable(glow::DEPTH_TEST);
                gl.depth_func(glow::LEQUAL);
                gl.depth_mask(call.depth.write);
            } else {
                gl.disable(glow::DEPTH_TEST);
            }

            match call.blend {
                BlendConfig::None => gl.disable(glow::BLEND),
                BlendConfig::Normal => {
                    gl.enable(glow::BLEND);
                    gl.blend_func_separate(
                        glow::SRC_ALPHA,
                        glow::ONE_MINUS_SRC_ALPHA,
                        glow::ONE,
                        glow::ONE_MINUS_SRC_ALPHA,
                    );
                }
                BlendConfig::Additive => {
                    gl.enable(glow::BLEND);
                    gl.blend_func(glow::SRC_ALPHA, glow::ONE);
                }
            }

            gl.draw_elements(glow::TRIANGLES, call.index_count as i32, glow::UNSIGNED_INT, 0);

            for location in enabled {
                gl.disable_vertex_attrib_array(location);
            }
            for unit in 0..textures.len() {
                gl.active_texture(glow::TEXTURE0 + unit as u32);
                gl.bind_texture(glow::TEXTURE_2D, None);
            }
            gl.active_texture(glow::TEXTURE0);
            gl.bind_buffer(glow::ARRAY_BUFFER, None);
            gl.bind_vertex_array(None);
            gl.use_program(None);
            gl.disable(glow::DEPTH_TEST);
        }
        Ok(())
    }

    fn delete_program(&mut self, program: ProgramId) {
        if let Some(program) = self.backend.programs.remove(&program.0) {
            unsafe { self.gl.delete_program(program) };
        }
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        if let Some(buffer) = self.backend.buffers.remove(&buffer.0) {
            unsafe { self.gl.delete_buffer(buffer) };
        }
    }

    fn delete_texture(&mut self, texture: TextureId) {
        if let Some(texture) = self.backend.textures.remove(&texture.0) {
            unsafe { self.gl.delete_texture(texture) };
        }
    }

    fn live_resources(&self) -> usize {
        self.backend.programs.len() + self.backend.buffers.len() + self.backend.textures.len()
    }
}
