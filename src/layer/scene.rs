//! Scene: owns layers, builds their models lazily and draws them in z-order.

use super::{LayerId, LayerKind, LayerSpec, LayerStyle, RenderHost};
use crate::district::{ComposeError, Composition};
use crate::gpu::RenderBackend;
use crate::model::{Label, LayerModel, Model, ModelError};
use crate::view::FrameContext;
use web_time::Instant;

/// Build state of one layer.
enum LayerState {
    /// Not built yet, or invalidated by a configuration change
    Pending,
    Built(Model),
    /// Host-painted layer with precomputed labels
    Overlay(Vec<Label>),
    /// Build failed; the layer is skipped until its configuration changes
    Failed(ModelError),
}

struct SceneLayer {
    id: LayerId,
    spec: LayerSpec,
    model: Option<Box<dyn LayerModel>>,
    state: LayerState,
}

/// Counters from one `render` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderStats {
    pub built: usize,
    pub drawn: usize,
    pub failed: usize,
}

/// The rendering host for layers.
///
/// Models are built on the first `render` after a layer is added. A model
/// that fails to build or draw is logged and skipped; other layers keep
/// rendering.
#[derive(Default)]
pub struct Scene {
    layers: Vec<SceneLayer>,
    next_id: u64,
    /// Models of removed or invalidated layers, released on the next render
    released: Vec<Model>,
    loaded: bool,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once the scene has rendered at least one frame.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn layer(&self, id: LayerId) -> Option<&LayerSpec> {
        self.find(id).map(|layer| &layer.spec)
    }

    /// Layer ids in draw order.
    pub fn layer_ids(&self) -> Vec<LayerId> {
        self.draw_order().into_iter().map(|i| self.layers[i].id).collect()
    }

    /// Build error of a layer, if its model failed.
    pub fn layer_error(&self, id: LayerId) -> Option<&ModelError> {
        match &self.find(id)?.state {
            LayerState::Failed(e) => Some(e),
            _ => None,
        }
    }

    /// Adds the layers of a composition.
    ///
    /// Compositions whose token was cancelled are refused.
    pub fn apply(&mut self, composition: Composition) -> Result<Vec<LayerId>, ComposeError> {
        if composition.token.is_cancelled() {
            log::debug!("Dropping cancelled {:?} composition", composition.task);
            return Err(ComposeError::Cancelled);
        }

        log::info!(
            "Applying {:?} composition with {} layers",
            composition.task,
            composition.layers.len()
        );
        Ok(composition
            .layers
            .into_iter()
            .map(|layer| self.add_layer(layer))
            .collect())
    }

    /// Updates style options in place. Takes effect on the next draw.
    pub fn set_style(&mut self, id: LayerId, style: LayerStyle) -> bool {
        match self.find_mut(id) {
            Some(layer) => {
                layer.spec.style = style;
                true
            }
            None => false,
        }
    }

    pub fn set_visible(&mut self, id: LayerId, visible: bool) -> bool {
        match self.find_mut(id) {
            Some(layer) => {
                layer.spec.visible = visible;
                true
            }
            None => false,
        }
    }

    /// Changes a layer's configuration. The model is rebuilt on the next render.
    pub fn update_layer(&mut self, id: LayerId, update: impl FnOnce(&mut LayerSpec)) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        let layer = &mut self.layers[index];
        update(&mut layer.spec);
        layer.model = layer.spec.kind.layer_model();
        if let LayerState::Built(model) = std::mem::replace(&mut layer.state, LayerState::Pending) {
            self.released.push(model);
        }
        true
    }

    /// Labels of visible label layers at `zoom`, in draw order.
    pub fn labels(&self, zoom: f32) -> impl Iterator<Item = &Label> + '_ {
        self.draw_order()
            .into_iter()
            .map(|i| &self.layers[i])
            .filter(move |layer| layer.spec.visible && layer.spec.in_zoom_range(zoom))
            .filter_map(|layer| match &layer.state {
                LayerState::Overlay(labels) => Some(labels),
                _ => None,
            })
            .flatten()
    }

    /// Builds pending models and draws every visible layer in z-order.
    ///
    /// Layers whose zoom range excludes the frame zoom are built but not drawn.
    pub fn render(&mut self, backend: &mut dyn RenderBackend, frame: &FrameContext) -> RenderStats {
        let mut stats = RenderStats::default();

        for mut model in self.released.drain(..) {
            model.clear_models(backend);
        }

        for layer in &mut self.layers {
            if matches!(layer.state, LayerState::Pending) {
                layer.state = build_layer(backend, layer);
                match &layer.state {
                    LayerState::Failed(_) => stats.failed += 1,
                    _ => stats.built += 1,
                }
            }
        }

        for index in self.draw_order() {
            let layer = &self.layers[index];
            if !layer.spec.visible || !layer.spec.in_zoom_range(frame.zoom) {
                continue;
            }
            let (LayerState::Built(model), Some(layer_model)) = (&layer.state, &layer.model) else {
                continue;
            };

            let uniforms = layer_model.uniforms(&layer.spec.style, frame);
            match model.draw(backend, &uniforms) {
                Ok(()) => stats.drawn += 1,
                Err(e) => {
                    log::error!("Failed to draw layer '{}': {}", layer.spec.name, e);
                    stats.failed += 1;
                }
            }
        }

        self.loaded = true;
        stats
    }

    /// Releases the GPU resources of every layer and removes them.
    pub fn clear(&mut self, backend: &mut dyn RenderBackend) {
        for layer in self.layers.drain(..) {
            if let LayerState::Built(model) = layer.state {
                self.released.push(model);
            }
        }
        for mut model in self.released.drain(..) {
            model.clear_models(backend);
        }
    }

    fn find(&self, id: LayerId) -> Option<&SceneLayer> {
        self.layers.iter().find(|layer| layer.id == id)
    }

    fn find_mut(&mut self, id: LayerId) -> Option<&mut SceneLayer> {
        self.layers.iter_mut().find(|layer| layer.id == id)
    }

    fn index_of(&self, id: LayerId) -> Option<usize> {
        self.layers.iter().position(|layer| layer.id == id)
    }

    /// Layer indices sorted by effective z-index, then insertion order.
    fn draw_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.layers.len()).collect();
        order.sort_by_key(|&i| {
            let layer = &self.layers[i];
            let z = match &layer.state {
                LayerState::Built(model) => model.z_index(),
                _ => layer
                    .model
                    .as_ref()
                    .and_then(|m| m.descriptor().z_index)
                    .unwrap_or(layer.spec.z_index),
            };
            (z, layer.id)
        });
        order
    }
}

fn build_layer(backend: &mut dyn RenderBackend, layer: &SceneLayer) -> LayerState {
    if let LayerKind::Label(labels) = &layer.spec.kind {
        return LayerState::Overlay(labels.labels(&layer.spec.features));
    }
    let Some(layer_model) = &layer.model else {
        return LayerState::Overlay(Vec::new());
    };

    let start = Instant::now();
    let encoded = layer.spec.encoding.encode(&layer.spec.features);
    match Model::build(backend, layer_model.as_ref(), &encoded, layer.spec.z_index) {
        Ok(model) => {
            log::debug!(
                "Built layer '{}' ({}) in {:.1}ms",
                layer.spec.name,
                layer.spec.kind.name(),
                start.elapsed().as_secs_f64() * 1000.0
            );
            LayerState::Built(model)
        }
        Err(e) => {
            log::error!("Failed to build layer '{}': {}", layer.spec.name, e);
            LayerState::Failed(e)
        }
    }
}

impl RenderHost for Scene {
    fn add_layer(&mut self, layer: LayerSpec) -> LayerId {
        self.next_id += 1;
        let id = LayerId(self.next_id);
        log::debug!("Adding {} layer '{}' as {}", layer.kind.name(), layer.name, id);
        self.layers.push(SceneLayer {
            id,
            model: layer.kind.layer_model(),
            spec: layer,
            state: LayerState::Pending,
        });
        id
    }

    fn remove_layer(&mut self, id: LayerId) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        let layer = self.layers.remove(index);
        if let LayerState::Built(model) = layer.state {
            self.released.push(model);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::district::{CancellationToken, LoadTask};
    use crate::feature::{Feature, FeatureCollection, Properties};
    use crate::gpu::{HeadlessBackend, RasterImage};
    use crate::model::LabelModel;
    use crate::view::MapView;
    use crate::style::StyleMapping;
    use eframe::egui::Color32;
    use geo_types::{line_string, polygon, Geometry};
    use serde_json::json;

    fn polygons() -> FeatureCollection {
        let mut props = Properties::new();
        props.insert("name".to_string(), json!("square"));
        vec![Feature::new(
            0,
            Geometry::Polygon(polygon![
                (x: 0.0, y: 0.0),
                (x: 1.0, y: 0.0),
                (x: 1.0, y: 1.0),
                (x: 0.0, y: 1.0),
            ]),
            props,
        )]
        .into_iter()
        .collect()
    }

    fn lines() -> FeatureCollection {
        vec![Feature::new(
            0,
            Geometry::LineString(line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0)]),
            Properties::new(),
        )]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_models_build_lazily_and_draw_in_z_order() {
        let mut scene = Scene::new();
        let mut backend = HeadlessBackend::new();

        let line = scene.add_layer(LayerSpec::new("line", LayerKind::Line, lines()).z_index(2));
        let fill = scene.add_layer(
            LayerSpec::new("fill", LayerKind::Fill, polygons())
                .color(StyleMapping::constant(Color32::RED))
                .z_index(1),
        );
        scene.add_layer(LayerSpec::new("atmosphere", LayerKind::Atmosphere, polygons()));
        assert_eq!(backend.live_resources(), 0);
        assert!(!scene.is_loaded());

        let stats = scene.render(&mut backend, &FrameContext::default());
        assert_eq!(stats.built, 3);
        assert_eq!(stats.drawn, 3);
        assert!(scene.is_loaded());

        let ids = scene.layer_ids();
        assert_eq!(&ids[1..], &[fill, line]);

        let modules: Vec<_> = backend.draws().iter().map(|d| d.attributes.len()).collect();
        // atmosphere (position size normal uv), fill (position color), line (position color size normal distance)
        assert_eq!(modules, vec![4, 2, 5]);

        // Second frame reuses the built models
        let stats = scene.render(&mut backend, &FrameContext::default());
        assert_eq!(stats.built, 0);
        assert_eq!(stats.drawn, 3);
    }

    #[test]
    fn test_failed_model_does_not_block_others() {
        let mut scene = Scene::new();
        let mut backend = HeadlessBackend::new().fail_shaders_containing("u_dash_array");

        let line = scene.add_layer(LayerSpec::new("line", LayerKind::Line, lines()));
        let fill = scene.add_layer(LayerSpec::new("fill", LayerKind::Fill, polygons()));

        let stats = scene.render(&mut backend, &FrameContext::default());
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.drawn, 1);
        assert!(matches!(
            scene.layer_error(line),
            Some(ModelError::ShaderCompile { module, .. }) if module == "line"
        ));
        assert!(scene.layer_error(fill).is_none());

        // Failed layers are not retried every frame
        let stats = scene.render(&mut backend, &FrameContext::default());
        assert_eq!(stats.failed, 0);
        assert_eq!(stats.drawn, 1);
    }

    #[test]
    fn test_remove_and_clear_release_resources() {
        let mut scene = Scene::new();
        let mut backend = HeadlessBackend::new();

        let fill = scene.add_layer(LayerSpec::new("fill", LayerKind::Fill, polygons()));
        scene.add_layer(LayerSpec::new("line", LayerKind::Line, lines()));
        scene.render(&mut backend, &FrameContext::default());
        let live = backend.live_resources();
        assert!(live > 0);

        assert!(scene.remove_layer(fill));
        assert!(!scene.remove_layer(fill));
        scene.render(&mut backend, &FrameContext::default());
        assert!(backend.live_resources() < live);

        scene.clear(&mut backend);
        assert_eq!(backend.live_resources(), 0);
        assert!(scene.is_empty());
    }

    #[test]
    fn test_update_layer_rebuilds() {
        let mut scene = Scene::new();
        let mut backend = HeadlessBackend::new();
        let fill = scene.add_layer(LayerSpec::new("fill", LayerKind::Fill, polygons()));
        scene.render(&mut backend, &FrameContext::default());
        let live = backend.live_resources();

        scene.update_layer(fill, |spec| spec.encoding.color = StyleMapping::constant(Color32::BLUE));
        let stats = scene.render(&mut backend, &FrameContext::default());
        assert_eq!(stats.built, 1);
        assert_eq!(backend.live_resources(), live);
    }

    #[test]
    fn test_hidden_layers_are_not_drawn() {
        let mut scene = Scene::new();
        let mut backend = HeadlessBackend::new();
        let fill = scene.add_layer(LayerSpec::new("fill", LayerKind::Fill, polygons()));
        scene.set_visible(fill, false);

        let stats = scene.render(&mut backend, &FrameContext::default());
        assert_eq!(stats.built, 1);
        assert_eq!(stats.drawn, 0);
    }

    #[test]
    fn test_label_layers_expose_labels() {
        let mut scene = Scene::new();
        let mut backend = HeadlessBackend::new();
        scene.add_layer(LayerSpec::new(
            "labels",
            LayerKind::Label(LabelModel::new("name", 10.0, Color32::BLACK)),
            polygons(),
        ));
        assert_eq!(scene.labels(1.0).count(), 0);

        scene.render(&mut backend, &FrameContext::default());
        let labels: Vec<_> = scene.labels(1.0).collect();
        assert_eq!(labels.len(), 1);
        assert_eq!(labels[0].text, "square");
        assert!(backend.draws().is_empty());
    }

    #[test]
    fn test_zoom_range_limits_drawing() {
        let mut scene = Scene::new();
        let mut backend = HeadlessBackend::new();
        scene.add_layer(LayerSpec::new("overview", LayerKind::Fill, polygons()).zoom_range(None, Some(4.0)));
        scene.add_layer(LayerSpec::new("detail", LayerKind::Line, lines()).zoom_range(Some(4.0), None));
        scene.add_layer(
            LayerSpec::new(
                "labels",
                LayerKind::Label(LabelModel::new("name", 10.0, Color32::BLACK)),
                polygons(),
            )
            .zoom_range(Some(4.0), None),
        );

        let mut view = MapView::default();
        let stats = scene.render(&mut backend, &view.frame());
        assert_eq!(stats.built, 3);
        assert_eq!(stats.drawn, 1);
        assert_eq!(backend.draws()[0].attributes.len(), 2);
        assert_eq!(scene.labels(view.zoom).count(), 0);

        backend.clear_draws();
        view.zoom = 6.0;
        let stats = scene.render(&mut backend, &view.frame());
        assert_eq!(stats.drawn, 1);
        assert_eq!(backend.draws()[0].attributes.len(), 5);
        assert_eq!(scene.labels(view.zoom).count(), 1);
    }

    #[test]
    fn test_raster_layer_draws_with_texture() {
        let mut scene = Scene::new();
        let mut backend = HeadlessBackend::new();
        let extent = geo_types::Rect::new(
            geo_types::coord! { x: 100.0, y: 20.0 },
            geo_types::coord! { x: 120.0, y: 40.0 },
        );
        let image = RasterImage::from_fn(16, 16, |x, y| [x as u8 * 16, y as u8 * 16, 0, 255]);
        let raster = scene.add_layer(LayerSpec::raster("relief", image, extent).z_index(-1));
        scene.add_layer(LayerSpec::new("fill", LayerKind::Fill, polygons()));

        let stats = scene.render(&mut backend, &FrameContext::default());
        assert_eq!(stats.drawn, 2);
        assert_eq!(scene.layer_ids()[0], raster);
        assert_eq!(backend.draws()[0].textures, vec!["u_texture"]);
        assert!(backend.draws()[1].textures.is_empty());

        scene.clear(&mut backend);
        assert_eq!(backend.live_resources(), 0);
    }

    #[test]
    fn test_cancelled_composition_is_refused() {
        let mut scene = Scene::new();
        let token = CancellationToken::new();
        let composition = Composition {
            task: LoadTask::Fill,
            layers: vec![LayerSpec::new("fill", LayerKind::Fill, polygons())],
            token: token.clone(),
        };

        token.cancel();
        assert!(matches!(scene.apply(composition), Err(ComposeError::Cancelled)));
        assert!(scene.is_empty());
    }
}
