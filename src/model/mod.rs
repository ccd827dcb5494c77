//! Shader models: compiled programs plus the GPU buffers they draw.
//!
//! A [`LayerModel`] describes how one kind of layer is drawn: which shaders,
//! which triangulator, which style attributes, which uniforms. [`Model`] is
//! the built result living on the GPU.

mod atmosphere;
mod fill;
mod label;
mod line;
mod point;
mod raster;
mod shaders;

pub use atmosphere::AtmosphereModel;
pub use fill::FillModel;
pub use label::{Label, LabelModel};
pub use line::LineModel;
pub use point::PointModel;
pub use raster::RasterModel;

use crate::gpu::{
    BackendError, BlendConfig, BufferId, DepthConfig, DrawCall, ProgramId, RasterImage,
    RenderBackend, ShaderStage, TextureBinding, UniformValue, Uniforms, VertexBinding,
};
use crate::layer::LayerStyle;
use crate::style::{
    BufferUsage, EncodedFeature, GeometryBuffers, StyleAttribute, StyleAttributeRegistry,
    StyleError,
};
use crate::triangulation::Triangulator;
use crate::view::FrameContext;
use std::fmt;

/// Static description of a shader model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelDescriptor {
    /// Shader module name, used in logs and errors
    pub module: &'static str,
    pub vertex_shader: &'static str,
    pub fragment_shader: &'static str,
    pub depth: DepthConfig,
    pub blend: BlendConfig,
    /// Z-index forced by the model regardless of the layer's own
    pub z_index: Option<i32>,
}

/// How one kind of layer is turned into GPU draws.
pub trait LayerModel: Send + Sync {
    fn descriptor(&self) -> ModelDescriptor;

    fn triangulator(&self) -> &dyn Triangulator;

    /// Registers the model's attributes on top of the builtin `position`.
    fn register_attributes(&self, registry: &mut StyleAttributeRegistry);

    /// Image sampled by the shader as `u_texture`, if the model has one.
    fn texture(&self) -> Option<&RasterImage> {
        None
    }

    /// Uniforms for one draw. Called every frame.
    fn uniforms(&self, style: &LayerStyle, frame: &FrameContext) -> Uniforms {
        frame_uniforms(style, frame)
    }
}

/// Uniforms shared by every model.
pub fn frame_uniforms(style: &LayerStyle, frame: &FrameContext) -> Uniforms {
    let mut uniforms = Uniforms::new();
    uniforms.insert(
        "u_ViewProjection".to_string(),
        UniformValue::Mat4(frame.view_projection.to_cols_array()),
    );
    uniforms.insert(
        "u_PixelScale".to_string(),
        UniformValue::Vec2(frame.pixel_scale),
    );
    uniforms.insert(
        "u_PixelsPerDegree".to_string(),
        UniformValue::Vec2(frame.pixels_per_degree),
    );
    uniforms.insert(
        "u_UnitsPerPixel".to_string(),
        UniformValue::Float(frame.units_per_pixel),
    );
    uniforms.insert(
        "u_opacity".to_string(),
        UniformValue::Float(style.opacity.clamp(0.0, 1.0)),
    );
    uniforms
}

/// Registers the per-feature `color` attribute.
pub(crate) fn color_attribute() -> StyleAttribute {
    StyleAttribute::new(
        "color",
        "a_Color",
        BufferUsage::Dynamic,
        4,
        |feature, _feature_idx, _vertex, _attribute_idx, _normal| feature.color.to_vec(),
    )
}

/// Registers the per-feature `size` attribute.
pub(crate) fn size_attribute() -> StyleAttribute {
    StyleAttribute::new(
        "size",
        "a_Size",
        BufferUsage::Dynamic,
        1,
        |feature, _feature_idx, _vertex, _attribute_idx, _normal| vec![feature.size],
    )
}

/// Errors raised while building or drawing a model.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    ShaderCompile {
        module: String,
        stage: ShaderStage,
        log: String,
    },
    Link {
        module: String,
        log: String,
    },
    Style(StyleError),
    Backend {
        module: String,
        source: BackendError,
    },
}

impl ModelError {
    /// Attaches the module name to a backend error.
    pub fn from_backend(module: &str, error: BackendError) -> Self {
        match error {
            BackendError::ShaderCompile { stage, log } => ModelError::ShaderCompile {
                module: module.to_string(),
                stage,
                log,
            },
            BackendError::Link(log) => ModelError::Link {
                module: module.to_string(),
                log,
            },
            source => ModelError::Backend {
                module: module.to_string(),
                source,
            },
        }
    }
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::ShaderCompile { module, stage, log } => {
                write!(f, "{}: {} shader failed to compile: {}", module, stage, log)
            }
            ModelError::Link { module, log } => write!(f, "{}: program failed to link: {}", module, log),
            ModelError::Style(e) => write!(f, "Style error: {}", e),
            ModelError::Backend { module, source } => write!(f, "{}: {}", module, source),
        }
    }
}

impl std::error::Error for ModelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ModelError::Style(e) => Some(e),
            ModelError::Backend { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<StyleError> for ModelError {
    fn from(e: StyleError) -> Self {
        ModelError::Style(e)
    }
}

/// A built model: one program, one buffer per attribute, one index buffer.
///
/// Resources are released only through [`Model::clear_models`].
#[derive(Debug)]
pub struct Model {
    module: &'static str,
    z_index: i32,
    depth: DepthConfig,
    blend: BlendConfig,
    program: Option<ProgramId>,
    bindings: Vec<VertexBinding>,
    textures: Vec<TextureBinding>,
    indices: Option<BufferId>,
    index_count: usize,
}

impl Model {
    /// Encodes, triangulates and uploads features, then compiles the shaders.
    ///
    /// On failure every resource created so far is released.
    pub fn build(
        backend: &mut dyn RenderBackend,
        layer_model: &dyn LayerModel,
        features: &[EncodedFeature<'_>],
        z_index: i32,
    ) -> Result<Self, ModelError> {
        let descriptor = layer_model.descriptor();

        let mut registry = StyleAttributeRegistry::new();
        layer_model.register_attributes(&mut registry);
        let geometry = registry.build_buffers(features, layer_model.triangulator())?;

        let program = backend
            .compile_program(descriptor.vertex_shader, descriptor.fragment_shader)
            .map_err(|e| ModelError::from_backend(descriptor.module, e))?;

        let mut model = Self {
            module: descriptor.module,
            z_index: descriptor.z_index.unwrap_or(z_index),
            depth: descriptor.depth,
            blend: descriptor.blend,
            program: Some(program),
            bindings: Vec::new(),
            textures: Vec::new(),
            indices: None,
            index_count: 0,
        };

        if let Err(e) = model.upload(backend, &geometry, layer_model.texture()) {
            model.clear_models(backend);
            return Err(ModelError::from_backend(descriptor.module, e));
        }

        log::debug!(
            "Built {} model: {} features, {} vertices, {} indices",
            model.module,
            features.len(),
            geometry.vertex_count,
            model.index_count
        );
        Ok(model)
    }

    fn upload(
        &mut self,
        backend: &mut dyn RenderBackend,
        geometry: &GeometryBuffers,
        texture: Option<&RasterImage>,
    ) -> Result<(), BackendError> {
        if geometry.indices.is_empty() {
            return Ok(());
        }

        for attribute in &geometry.attributes {
            let buffer = backend.create_vertex_buffer(&attribute.data, attribute.usage)?;
            self.bindings.push(VertexBinding {
                name: attribute.buffer_name.clone(),
                buffer,
                size: attribute.size,
            });
        }
        self.indices = Some(backend.create_index_buffer(&geometry.indices)?);
        self.index_count = geometry.indices.len();

        if let Some(image) = texture {
            self.textures.push(TextureBinding {
                name: "u_texture".to_string(),
                texture: backend.create_texture(image)?,
            });
        }
        Ok(())
    }

    /// Issues the draw call. Models without geometry draw nothing.
    pub fn draw(&self, backend: &mut dyn RenderBackend, uniforms: &Uniforms) -> Result<(), ModelError> {
        let (Some(program), Some(indices)) = (self.program, self.indices) else {
            return Ok(());
        };

        backend
            .draw(&DrawCall {
                program,
                bindings: &self.bindings,
                textures: &self.textures,
                indices,
                index_count: self.index_count,
                uniforms,
                depth: self.depth,
                blend: self.blend,
            })
            .map_err(|e| ModelError::from_backend(self.module, e))
    }

    /// Releases every GPU resource of the model. Safe to call repeatedly.
    pub fn clear_models(&mut self, backend: &mut dyn RenderBackend) {
        if let Some(program) = self.program.take() {
            backend.delete_program(program);
        }
        for binding in self.bindings.drain(..) {
            backend.delete_buffer(binding.buffer);
        }
        if let Some(indices) = self.indices.take() {
            backend.delete_buffer(indices);
        }
        for binding in self.textures.drain(..) {
            backend.delete_texture(binding.texture);
        }
        self.index_count = 0;
    }

    pub fn is_built(&self) -> bool {
        self.program.is_some()
    }

    pub fn module(&self) -> &'static str {
        self.module
    }

    pub fn z_index(&self) -> i32 {
        self.z_index
    }

    pub fn index_count(&self) -> usize {
        self.index_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{Feature, FeatureCollection, Properties};
    use crate::gpu::HeadlessBackend;
    use crate::layer::LayerKind;
    use crate::style::StyleEncoding;
    use crate::triangulation::PointShape;
    use geo_types::{line_string, polygon, Geometry, Point};

    fn square() -> FeatureCollection {
        vec![Feature::new(
            0,
            Geometry::Polygon(polygon![
                (x: 0.0, y: 0.0),
                (x: 1.0, y: 0.0),
                (x: 1.0, y: 1.0),
                (x: 0.0, y: 1.0),
            ]),
            Properties::new(),
        )]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_clear_models_is_idempotent() {
        let mut backend = HeadlessBackend::new();
        let features = square();
        let encoded = StyleEncoding::default().encode(&features);

        let mut model = Model::build(&mut backend, &FillModel::default(), &encoded, 0).unwrap();
        assert!(model.is_built());
        assert!(backend.live_resources() > 0);

        model.clear_models(&mut backend);
        assert_eq!(backend.live_resources(), 0);
        model.clear_models(&mut backend);
        assert_eq!(backend.live_resources(), 0);
        assert!(!model.is_built());

        // Drawing a cleared model is a no-op
        model.draw(&mut backend, &Uniforms::new()).unwrap();
        assert!(backend.draws().is_empty());
    }

    #[test]
    fn test_compile_failure_names_module() {
        let mut backend = HeadlessBackend::new().fail_shaders_containing("v_color");
        let features = square();
        let encoded = StyleEncoding::default().encode(&features);

        match Model::build(&mut backend, &FillModel::default(), &encoded, 0) {
            Err(ModelError::ShaderCompile { module, stage, .. }) => {
                assert_eq!(module, "fill");
                assert_eq!(stage, ShaderStage::Vertex);
            }
            other => panic!("expected compile error, got {:?}", other),
        }
        assert_eq!(backend.live_resources(), 0);
    }

    #[test]
    fn test_uniforms_recomputed_per_draw() {
        let mut backend = HeadlessBackend::new();
        let features = square();
        let encoded = StyleEncoding::default().encode(&features);
        let fill = FillModel::default();
        let model = Model::build(&mut backend, &fill, &encoded, 3).unwrap();

        let frame = FrameContext::default();
        for opacity in [0.25, 0.75] {
            let style = LayerStyle {
                opacity,
                ..Default::default()
            };
            model.draw(&mut backend, &fill.uniforms(&style, &frame)).unwrap();
        }

        let draws = backend.draws();
        assert_eq!(draws.len(), 2);
        assert_eq!(draws[0].uniforms["u_opacity"], UniformValue::Float(0.25));
        assert_eq!(draws[1].uniforms["u_opacity"], UniformValue::Float(0.75));
        assert_eq!(draws[0].index_count, model.index_count());
        assert_eq!(model.z_index(), 3);
    }

    fn mixed() -> FeatureCollection {
        vec![
            Feature::new(
                0,
                Geometry::Polygon(polygon![
                    (x: 0.0, y: 0.0),
                    (x: 2.0, y: 0.0),
                    (x: 2.0, y: 2.0),
                    (x: 0.0, y: 2.0),
                ]),
                Properties::new(),
            ),
            Feature::new(
                1,
                Geometry::LineString(line_string![(x: 0.0, y: 0.0), (x: 2.0, y: 1.0), (x: 3.0, y: 3.0)]),
                Properties::new(),
            ),
            Feature::new(2, Geometry::Point(Point::new(1.0, 1.0)), Properties::new()),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_every_model_fills_declared_attribute_sizes() {
        let features = mixed();
        let encoded = StyleEncoding::default().encode(&features);
        let kinds = [
            LayerKind::Fill,
            LayerKind::Line,
            LayerKind::Point(PointShape::Circle),
            LayerKind::Atmosphere,
            LayerKind::Raster(RasterImage::from_fn(2, 2, |_, _| [0, 0, 0, 255])),
        ];

        for kind in kinds {
            let layer_model = kind.layer_model().unwrap();
            let mut registry = StyleAttributeRegistry::new();
            layer_model.register_attributes(&mut registry);
            let buffers = registry
                .build_buffers(&encoded, layer_model.triangulator())
                .unwrap();

            assert!(buffers.vertex_count > 0, "{} produced no vertices", kind.name());
            assert_eq!(buffers.attributes.len(), registry.len());
            for (attribute, buffer) in registry.attributes().iter().zip(&buffers.attributes) {
                assert_eq!(
                    buffer.data.len(),
                    buffers.vertex_count * attribute.size,
                    "{} attribute {}",
                    kind.name(),
                    attribute.name
                );
            }
        }
    }
}
