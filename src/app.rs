//! Workbench application: owns the scene, drives compositions and paints.

use crate::url_params;
use eframe::egui::{self, Align2, Color32, FontId, Rect, RichText, Sense, Vec2};
use geo_types::{coord, Geometry, Point, Rect as GeoRect};
use geolayer_workbench::district::{
    CompositionChannel, CountryComposer, DataSource, Depth, DistrictDataConfig,
    DistrictLayerOptions, MemorySource,
};
use geolayer_workbench::feature::{Feature, FeatureCollection, Properties};
use geolayer_workbench::gpu::{GlowBackend, RasterImage};
use geolayer_workbench::layer::{LayerId, LayerKind, LayerSpec, LayerStyle, RenderHost, RenderStats, Scene};
use geolayer_workbench::style::StyleMapping;
use geolayer_workbench::triangulation::PointShape;
use geolayer_workbench::view::MapView;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

const DEMO_COUNTRY: &str = "DEMO";
const DEMO_DISTRICT_CONFIG: &str = include_str!("../assets/demo/district.json");
const DEMO_OPTIONS: &str = include_str!("../assets/demo/options.json");
const DEMO_FILES: [(&str, &str); 3] = [
    ("fill.json", include_str!("../assets/demo/fill.json")),
    ("province_line.json", include_str!("../assets/demo/province_line.json")),
    ("city_line.json", include_str!("../assets/demo/city_line.json")),
];

/// Scene and GL handles, shared with the paint callback.
#[derive(Default)]
struct RenderState {
    scene: Scene,
    backend: GlowBackend,
    stats: RenderStats,
}

/// Main application state and logic.
pub struct WorkbenchApp {
    render: Arc<Mutex<RenderState>>,
    view: MapView,
    zoom: f32,
    pan_offset: Vec2,

    source: Rc<dyn DataSource>,
    data_config: DistrictDataConfig,
    options: DistrictLayerOptions,
    composer: Option<CountryComposer>,
    channel: CompositionChannel,

    /// Layers added by the app itself; kept across recompositions
    base_layers: Vec<LayerId>,
    /// Last configuration error, shown in the layer window
    status: Option<String>,
    /// Failed loads of the current composition, shown in the layer window
    load_errors: Vec<String>,
}

impl WorkbenchApp {
    /// Creates the app, loading district data from `data_dir` when given.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn new(cc: &eframe::CreationContext<'_>, data_dir: Option<std::path::PathBuf>) -> Self {
        use geolayer_workbench::district::FileSource;

        let loaded = data_dir.and_then(|dir| match load_data_dir(&dir) {
            Ok((config, options)) => {
                log::info!("Loading district data from {}", dir.display());
                let source: Rc<dyn DataSource> = Rc::new(FileSource::new(dir));
                Some((source, config, options))
            }
            Err(e) => {
                log::error!("Failed to load data directory {}: {}", dir.display(), e);
                None
            }
        });
        let (source, config, options) = loaded.unwrap_or_else(demo_data);

        Self::with_source(cc, source, config, options)
    }

    /// Creates the app, loading district data from the `data` url parameter when given.
    #[cfg(target_arch = "wasm32")]
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        use geolayer_workbench::district::HttpSource;

        let (mut source, config, options) = demo_data();
        if let Some(base_url) = url_params::parse_from_url().data {
            log::info!("Loading district data from {}", base_url);
            source = Rc::new(HttpSource::new(Some(base_url)));
        }

        Self::with_source(cc, source, config, options)
    }

    fn with_source(
        cc: &eframe::CreationContext<'_>,
        source: Rc<dyn DataSource>,
        data_config: DistrictDataConfig,
        mut options: DistrictLayerOptions,
    ) -> Self {
        if cc.gl.is_none() {
            log::warn!("No GL context; layers will not be drawn");
        }

        let params = url_params::parse_from_url();
        if let Some(depth) = params.depth {
            options.depth = depth;
        }
        let mut view = MapView::default();
        if let Some(lat) = params.lat {
            view.center_lat = lat;
        }
        if let Some(lon) = params.lon {
            view.center_lon = lon;
        }

        let mut app = Self {
            render: Arc::new(Mutex::new(RenderState::default())),
            view,
            zoom: 1.0,
            pan_offset: Vec2::ZERO,
            source,
            data_config,
            options,
            composer: None,
            channel: CompositionChannel::new(),
            base_layers: Vec::new(),
            status: None,
            load_errors: Vec::new(),
        };
        app.add_base_layers();
        app.compose(&cc.egui_ctx);
        app
    }

    /// Adds the layers that do not come from the district data.
    fn add_base_layers(&mut self) {
        let Ok(mut state) = self.render.lock() else {
            return;
        };

        let cities = FeatureCollection::new(
            [("Urumqi", 87.6, 43.8), ("Lanzhou", 103.8, 36.1), ("Beijing", 116.4, 39.9), ("Guangzhou", 113.3, 23.1)]
                .iter()
                .enumerate()
                .map(|(i, (name, lon, lat))| {
                    let mut properties = Properties::new();
                    properties.insert("name".to_string(), serde_json::json!(name));
                    Feature::new(i as u64, Geometry::Point(Point::new(*lon, *lat)), properties)
                })
                .collect(),
        );
        let points = LayerSpec::new("cities", LayerKind::Point(PointShape::Hexagon), cities)
            .color(StyleMapping::constant(Color32::from_rgb(40, 40, 120)))
            .size(StyleMapping::constant(9.0))
            .z_index(10);
        self.base_layers.push(state.scene.add_layer(points));

        // Shaded backdrop for the overview; hidden once zoomed in
        let relief = LayerSpec::raster(
            "relief",
            relief_image(),
            GeoRect::new(coord! { x: 73.0, y: 18.0 }, coord! { x: 135.0, y: 54.0 }),
        )
        .style(LayerStyle {
            opacity: 0.35,
            ..Default::default()
        })
        .z_index(-1)
        .zoom_range(None, Some(6.0));
        self.base_layers.push(state.scene.add_layer(relief));

        let globe = FeatureCollection::new(vec![Feature::new(
            0,
            Geometry::Point(Point::new(0.0, 0.0)),
            Properties::new(),
        )]);
        let atmosphere = LayerSpec::new("atmosphere", LayerKind::Atmosphere, globe)
            .color(StyleMapping::constant(Color32::from_rgb(120, 170, 255)))
            .style(LayerStyle {
                opacity: 0.4,
                ..Default::default()
            });
        let id = state.scene.add_layer(atmosphere);
        // Only meaningful on a globe view
        state.scene.set_visible(id, false);
        self.base_layers.push(id);
    }

    /// Cancels the running composition and starts a new one with the current options.
    fn compose(&mut self, ctx: &egui::Context) {
        if let Some(composer) = self.composer.take() {
            composer.cancel();
        }
        if let Ok(mut state) = self.render.lock() {
            for id in state.scene.layer_ids() {
                if !self.base_layers.contains(&id) {
                    state.scene.remove_layer(id);
                }
            }
        }

        let composer = match CountryComposer::new(
            self.source.clone(),
            &self.data_config,
            DEMO_COUNTRY,
            self.options.clone(),
        ) {
            Ok(composer) => composer,
            Err(e) => {
                log::error!("Cannot compose district layers: {}", e);
                self.status = Some(e.to_string());
                return;
            }
        };
        self.status = None;
        self.load_errors.clear();

        let tasks = composer.tasks();
        #[cfg(target_arch = "wasm32")]
        self.channel.spawn(ctx.clone(), tasks);
        #[cfg(not(target_arch = "wasm32"))]
        self.channel.run_blocking(tasks);
        ctx.request_repaint();

        self.composer = Some(composer);
    }

    fn render_layer_window(&mut self, ctx: &egui::Context) {
        let mut depth = self.options.depth;

        egui::Window::new("Layers")
            .anchor(Align2::LEFT_TOP, [8.0, 8.0])
            .resizable(false)
            .show(ctx, |ui| {
                egui::ComboBox::from_label("Depth")
                    .selected_text(depth_name(depth))
                    .show_ui(ui, |ui| {
                        for d in [Depth::Province, Depth::City, Depth::County] {
                            ui.selectable_value(&mut depth, d, depth_name(d));
                        }
                    });

                if let Some(status) = &self.status {
                    ui.label(RichText::new(status).color(Color32::from_rgb(200, 60, 60)));
                }
                for error in &self.load_errors {
                    ui.label(RichText::new(error).color(Color32::from_rgb(200, 60, 60)).size(11.0));
                }
                if self.channel.is_loading() {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label(format!("{} load(s) pending", self.channel.pending()));
                    });
                }
                ui.separator();

                let Ok(mut state) = self.render.lock() else {
                    return;
                };
                let scene = &mut state.scene;
                egui::Grid::new("layer_grid").striped(true).show(ui, |ui| {
                    for id in scene.layer_ids() {
                        let Some(layer) = scene.layer(id) else {
                            continue;
                        };
                        let mut visible = layer.visible;
                        let mut style = layer.style;
                        let name = layer.name.clone();
                        let failed = scene.layer_error(id).map(|e| e.to_string());

                        if ui.checkbox(&mut visible, name).changed() {
                            scene.set_visible(id, visible);
                        }
                        if ui
                            .add(egui::Slider::new(&mut style.opacity, 0.0..=1.0).show_value(false))
                            .changed()
                        {
                            scene.set_style(id, style);
                        }
                        match failed {
                            Some(error) => ui.label(RichText::new("failed").color(Color32::RED)).on_hover_text(error),
                            None => ui.label(""),
                        };
                        ui.end_row();
                    }
                });

                let stats = state.stats;
                ui.label(
                    RichText::new(format!(
                        "{} built, {} drawn, {} failed",
                        stats.built, stats.drawn, stats.failed
                    ))
                    .size(11.0),
                );
            });

        if depth != self.options.depth {
            log::info!("Switching district depth to {}", depth);
            self.options.depth = depth;
            self.compose(ctx);
        }
    }

    fn render_map(&mut self, ui: &mut egui::Ui) {
        let (response, painter) = ui.allocate_painter(ui.available_size(), Sense::click_and_drag());
        let rect = response.rect;
        self.handle_interaction(&response, rect);
        self.view.update(self.zoom, self.pan_offset, rect);

        let frame = self.view.frame();
        let render = self.render.clone();
        let callback = egui::PaintCallback {
            rect,
            callback: Arc::new(egui_glow::CallbackFn::new(move |_info, painter| {
                let Ok(mut state) = render.lock() else {
                    return;
                };
                let RenderState {
                    scene,
                    backend,
                    stats,
                } = &mut *state;
                *stats = scene.render(&mut backend.frame(painter.gl()), &frame);
            })),
        };
        painter.add(callback);

        let Ok(state) = self.render.lock() else {
            return;
        };
        for label in state.scene.labels(self.zoom) {
            if !self.view.is_visible(label.anchor, 1.0) {
                continue;
            }
            painter.text(
                self.view.geo_to_screen(label.anchor),
                Align2::CENTER_CENTER,
                &label.text,
                FontId::proportional(label.size),
                label.color,
            );
        }
    }

    fn handle_interaction(&mut self, response: &egui::Response, rect: Rect) {
        if response.dragged() {
            self.pan_offset += response.drag_delta();
        }

        // Zoom relative to the cursor position
        if response.hovered() {
            let scroll_delta = response.ctx.input(|i| i.raw_scroll_delta);
            if scroll_delta.y != 0.0 {
                let old_zoom = self.zoom;
                let new_zoom = (old_zoom * (1.0 + scroll_delta.y * 0.001)).clamp(0.2, 40.0);
                if let Some(cursor_pos) = response.hover_pos() {
                    let cursor_rel = cursor_pos - rect.center();
                    let ratio = new_zoom / old_zoom;
                    self.pan_offset = cursor_rel * (1.0 - ratio) + self.pan_offset * ratio;
                }
                self.zoom = new_zoom;
            }
        }

        if response.double_clicked() {
            self.zoom = 1.0;
            self.pan_offset = Vec2::ZERO;
        }
    }
}

impl eframe::App for WorkbenchApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if let Ok(mut state) = self.render.lock() {
            let report = self.channel.drain_into(&mut state.scene);
            if report.added > 0 {
                log::info!("Applied {} district layer(s)", report.added);
            }
            self.load_errors
                .extend(report.errors.iter().map(|e| e.to_string()));
        }

        egui::CentralPanel::default()
            .frame(egui::Frame::default().fill(Color32::from_rgb(236, 240, 244)))
            .show(ctx, |ui| self.render_map(ui));

        self.render_layer_window(ctx);
    }

    fn on_exit(&mut self, gl: Option<&eframe::glow::Context>) {
        if let Some(composer) = &self.composer {
            composer.cancel();
        }
        let (Some(gl), Ok(mut state)) = (gl, self.render.lock()) else {
            return;
        };
        let RenderState { scene, backend, .. } = &mut *state;
        scene.clear(&mut backend.frame(gl));
        backend.destroy(gl);
    }
}

fn depth_name(depth: Depth) -> &'static str {
    match depth {
        Depth::Province => "Province",
        Depth::City => "City",
        Depth::County => "County",
    }
}

/// Procedural shading from the western highlands down to the eastern lowlands.
fn relief_image() -> RasterImage {
    const WIDTH: u32 = 64;
    const HEIGHT: u32 = 32;
    RasterImage::from_fn(WIDTH, HEIGHT, |x, y| {
        let west = 1.0 - x as f32 / (WIDTH - 1) as f32;
        let north = 1.0 - y as f32 / (HEIGHT - 1) as f32;
        let height = (0.7 * west + 0.3 * north).clamp(0.0, 1.0);
        [
            (90.0 + 110.0 * height) as u8,
            (150.0 + 40.0 * height) as u8,
            (110.0 - 30.0 * height) as u8,
            255,
        ]
    })
}

/// Bundled demo data served from memory.
fn demo_data() -> (Rc<dyn DataSource>, DistrictDataConfig, DistrictLayerOptions) {
    let mut source = MemorySource::new();
    for (url, text) in DEMO_FILES {
        match FeatureCollection::from_geojson_str(text) {
            Ok(features) => source = source.with(url, features),
            Err(e) => log::error!("Bundled {} is invalid: {}", url, e),
        }
    }

    let config = DistrictDataConfig::from_json(DEMO_DISTRICT_CONFIG).unwrap_or_else(|e| {
        log::error!("{}", e);
        DistrictDataConfig::default()
    });
    let options = DistrictLayerOptions::from_json(DEMO_OPTIONS).unwrap_or_else(|e| {
        log::error!("{}", e);
        DistrictLayerOptions::default()
    });

    (Rc::new(source), config, options)
}

/// Reads `district.json` and the optional `options.json` of a data directory.
#[cfg(not(target_arch = "wasm32"))]
fn load_data_dir(
    dir: &std::path::Path,
) -> Result<(DistrictDataConfig, DistrictLayerOptions), String> {
    let config = std::fs::read_to_string(dir.join("district.json")).map_err(|e| e.to_string())?;
    let config = DistrictDataConfig::from_json(&config).map_err(|e| e.to_string())?;

    let options = match std::fs::read_to_string(dir.join("options.json")) {
        Ok(text) => DistrictLayerOptions::from_json(&text).map_err(|e| e.to_string())?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => DistrictLayerOptions::default(),
        Err(e) => return Err(e.to_string()),
    };

    Ok((config, options))
}
