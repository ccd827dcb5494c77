//! Country district composer.
//!
//! Loads the district data for one country and turns it into layers:
//! - a fill layer, plus a label layer when labels are enabled
//! - national borders styled per border class, and the province /
//!   undetermined borders drawn dashed
//! - city or county borders depending on the depth
//!
//! Every load is an independent future resolving to a [`Composition`]. The
//! host applies compositions to its scene as they arrive, so a failing fill
//! load never holds back the borders.

use super::{
    CancellationToken, ComposeError, DataSource, Depth, DepthDataConfig, DistrictDataConfig,
    DistrictLayerOptions, SourceConfig,
};
use crate::feature::{BorderClass, FeatureCollection};
use crate::layer::{LayerKind, LayerSpec, LayerStyle, LineType};
use crate::model::LabelModel;
use crate::style::{parse_color, StyleMapping};
use eframe::egui::Color32;
use futures_util::future::LocalBoxFuture;
use std::fmt;
use std::rc::Rc;

/// Color of the province / undetermined border layer.
const UNDETERMINED_STROKE: Color32 = Color32::from_rgb(0x80, 0x80, 0x80);
/// Dash and gap of the province / undetermined border layer, in points.
const UNDETERMINED_DASH: [f32; 2] = [2.0, 2.0];
/// Color for border classes without a configured stroke.
const FALLBACK_STROKE: Color32 = Color32::WHITE;

/// One data load of a composer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadTask {
    /// Fill data, then label data when configured
    Fill,
    ProvinceLine,
    CityLine,
    CountyLine,
}

impl fmt::Display for LoadTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoadTask::Fill => "fill",
            LoadTask::ProvinceLine => "province line",
            LoadTask::CityLine => "city line",
            LoadTask::CountyLine => "county line",
        };
        write!(f, "{}", name)
    }
}

/// Layers produced by one load, for the host to add.
#[derive(Debug, Clone)]
pub struct Composition {
    pub task: LoadTask,
    pub layers: Vec<LayerSpec>,
    /// Token of the composer that produced it
    pub token: CancellationToken,
}

pub type CompositionResult = Result<Composition, ComposeError>;

pub type CompositionFuture = LocalBoxFuture<'static, CompositionResult>;

/// Parameterized style of the city and county border layers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlLineStyle {
    pub stroke: Color32,
    pub width: f32,
    pub opacity: f32,
    pub z_index: i32,
}

impl ControlLineStyle {
    pub fn city(options: &DistrictLayerOptions) -> Self {
        Self::new(options.city_stroke, options.city_stroke_width)
    }

    pub fn county(options: &DistrictLayerOptions) -> Self {
        Self::new(options.county_stroke, options.county_stroke_width)
    }

    fn new(stroke: Color32, width: f32) -> Self {
        Self {
            stroke,
            width,
            opacity: 0.5,
            z_index: 2,
        }
    }

    pub fn layer(&self, name: impl Into<String>, features: FeatureCollection) -> LayerSpec {
        LayerSpec::new(name, LayerKind::Line, features)
            .color(StyleMapping::constant(self.stroke))
            .size(StyleMapping::constant(self.width))
            .style(LayerStyle {
                opacity: self.opacity,
                ..Default::default()
            })
            .z_index(self.z_index)
    }
}

/// Stroke of a national-group border.
pub fn border_stroke(options: &DistrictLayerOptions, class: BorderClass) -> Color32 {
    match class {
        BorderClass::Emphasized => options.stroke,
        BorderClass::Coastline => options.coastline_stroke,
        BorderClass::National => options.national_stroke,
        _ => FALLBACK_STROKE,
    }
}

/// Width of a national-group border.
pub fn border_width(options: &DistrictLayerOptions, class: BorderClass) -> f32 {
    match class {
        BorderClass::Emphasized => options.stroke_width,
        BorderClass::Coastline => options.coastline_width,
        _ => options.national_width,
    }
}

/// Builds the district layers of one country.
pub struct CountryComposer {
    source: Rc<dyn DataSource>,
    country: String,
    config: DepthDataConfig,
    options: DistrictLayerOptions,
    fill_colors: Vec<Color32>,
    token: CancellationToken,
}

impl CountryComposer {
    /// Validates the configuration for `(country, options.depth)`.
    pub fn new(
        source: Rc<dyn DataSource>,
        data_config: &DistrictDataConfig,
        country: impl Into<String>,
        options: DistrictLayerOptions,
    ) -> Result<Self, ComposeError> {
        let country = country.into();
        let config = data_config.validate(&country, options.depth)?.clone();

        let fill_colors = options
            .fill
            .values
            .iter()
            .map(|value| parse_color(value))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ComposeError::Configuration(format!("Invalid fill value: {}", e)))?;
        if options.fill.field.is_some() && options.fill.values.is_empty() {
            return Err(ComposeError::Configuration(
                "fill.field needs at least one fill.values color".to_string(),
            ));
        }
        if let Some((min, max)) = options.fill.domain {
            if !(min < max) {
                return Err(ComposeError::Configuration(format!(
                    "fill.domain must be increasing, got [{}, {}]",
                    min, max
                )));
            }
        }

        log::info!(
            "Composing {} district layers at depth {}",
            country,
            options.depth
        );
        Ok(Self {
            source,
            country,
            config,
            options,
            fill_colors,
            token: CancellationToken::new(),
        })
    }

    pub fn country(&self) -> &str {
        &self.country
    }

    pub fn options(&self) -> &DistrictLayerOptions {
        &self.options
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Cancels every task of this composer, started or not.
    pub fn cancel(&self) {
        log::debug!("Cancelling {} district composition", self.country);
        self.token.cancel();
    }

    /// The loads that `tasks` will run.
    pub fn load_tasks(&self) -> Vec<LoadTask> {
        let mut tasks = vec![LoadTask::Fill, LoadTask::ProvinceLine];
        match self.options.depth {
            Depth::Province => {}
            Depth::City => tasks.push(LoadTask::CityLine),
            Depth::County => tasks.push(LoadTask::CountyLine),
        }
        tasks
    }

    /// One independent future per load, in `load_tasks` order.
    pub fn tasks(&self) -> Vec<CompositionFuture> {
        self.load_tasks()
            .into_iter()
            .filter_map(|task| self.task(task))
            .collect()
    }

    fn task(&self, task: LoadTask) -> Option<CompositionFuture> {
        let ctx = TaskContext {
            task,
            source: self.source.clone(),
            token: self.token.clone(),
            country: self.country.clone(),
        };
        let options = self.options.clone();

        let future: CompositionFuture = match task {
            LoadTask::Fill => {
                let fill = self.config.fill.clone();
                let label = self.config.label.clone();
                let colors = self.fill_colors.clone();
                Box::pin(compose_fill(ctx, fill, label, options, colors))
            }
            LoadTask::ProvinceLine => {
                let line = self.config.province_line.clone();
                Box::pin(compose_borders(ctx, line, options))
            }
            LoadTask::CityLine => {
                let line = self.config.city_line.clone()?;
                Box::pin(compose_control_line(ctx, line, ControlLineStyle::city(&options)))
            }
            LoadTask::CountyLine => {
                let line = self.config.county_line.clone()?;
                Box::pin(compose_control_line(ctx, line, ControlLineStyle::county(&options)))
            }
        };
        Some(future)
    }
}

/// What every task future owns.
struct TaskContext {
    task: LoadTask,
    source: Rc<dyn DataSource>,
    token: CancellationToken,
    country: String,
}

impl TaskContext {
    async fn fetch(&self, config: &SourceConfig) -> Result<FeatureCollection, ComposeError> {
        if self.token.is_cancelled() {
            return Err(ComposeError::Cancelled);
        }
        let features = self
            .source
            .fetch(config, &self.token)
            .await
            .map_err(|error| {
                // A fetch aborted by cancellation is not a load failure
                if self.token.is_cancelled() {
                    ComposeError::Cancelled
                } else {
                    ComposeError::DataLoad {
                        task: self.task,
                        error,
                    }
                }
            })?;
        if self.token.is_cancelled() {
            return Err(ComposeError::Cancelled);
        }

        log::debug!(
            "Loaded {} features for {} {}",
            features.len(),
            self.country,
            self.task
        );
        Ok(features)
    }

    fn finish(self, layers: Vec<LayerSpec>) -> CompositionResult {
        if self.token.is_cancelled() {
            return Err(ComposeError::Cancelled);
        }
        Ok(Composition {
            task: self.task,
            layers,
            token: self.token,
        })
    }

    fn name(&self, suffix: &str) -> String {
        format!("{}-{}", self.country, suffix)
    }
}

async fn compose_fill(
    ctx: TaskContext,
    fill: SourceConfig,
    label: Option<SourceConfig>,
    options: DistrictLayerOptions,
    colors: Vec<Color32>,
) -> CompositionResult {
    let fill_data = ctx.fetch(&fill).await?;
    let label_data = match &label {
        Some(label) => Some(ctx.fetch(label).await?),
        None => None,
    };

    let color = fill_color(&options, colors, &fill_data);
    let mut layers = vec![LayerSpec::new(ctx.name("fill"), LayerKind::Fill, fill_data)
        .color(color)
        .style(LayerStyle {
            opacity: options.opacity,
            ..Default::default()
        })
        .z_index(options.z_index)];

    if let Some(label_data) = label_data.filter(|_| options.label.enable) {
        let label = &options.label;
        layers.push(
            LayerSpec::new(
                ctx.name("label"),
                LayerKind::Label(LabelModel::new(label.field.clone(), label.size, label.color)),
                label_data,
            )
            .z_index(options.z_index + 3),
        );
    }

    ctx.finish(layers)
}

/// Fill color mapping: quantized over `fill.field` when configured, constant otherwise.
fn fill_color(
    options: &DistrictLayerOptions,
    colors: Vec<Color32>,
    features: &FeatureCollection,
) -> StyleMapping<Color32> {
    let Some(field) = &options.fill.field else {
        return StyleMapping::constant(options.fill.color);
    };

    let domain = options.fill.domain.or_else(|| {
        let values = features.iter().filter_map(|f| f.property_f64(field));
        values.fold(None, |acc: Option<(f64, f64)>, v| match acc {
            None => Some((v, v)),
            Some((min, max)) => Some((min.min(v), max.max(v))),
        })
    });

    match domain.map(|domain| StyleMapping::quantize(field.clone(), domain, colors)) {
        Some(Ok(mapping)) => mapping,
        Some(Err(e)) => {
            log::warn!("Falling back to constant fill for '{}': {}", field, e);
            StyleMapping::constant(options.fill.color)
        }
        None => {
            log::warn!("No numeric '{}' values for fill scale", field);
            StyleMapping::constant(options.fill.color)
        }
    }
}

async fn compose_borders(
    ctx: TaskContext,
    line: SourceConfig,
    options: DistrictLayerOptions,
) -> CompositionResult {
    let split = ctx.fetch(&line).await?.split_borders();
    log::debug!(
        "Split borders: {} province/undetermined, {} national",
        split.province.len(),
        split.national.len()
    );

    let stroke_options = options.clone();
    let width_options = options.clone();
    let national = LayerSpec::new(ctx.name("national-border"), LayerKind::Line, split.national)
        .color(StyleMapping::by_class(move |class| {
            border_stroke(&stroke_options, class)
        }))
        .size(StyleMapping::by_class(move |class| {
            border_width(&width_options, class)
        }))
        .z_index(options.z_index + 1);

    let undetermined = LayerSpec::new(ctx.name("undetermined-border"), LayerKind::Line, split.province)
        .color(StyleMapping::constant(UNDETERMINED_STROKE))
        .size(StyleMapping::constant(options.national_width))
        .style(LayerStyle {
            line_type: LineType::Dash,
            dash_array: UNDETERMINED_DASH,
            ..Default::default()
        })
        .z_index(options.z_index + 1);

    ctx.finish(vec![national, undetermined])
}

async fn compose_control_line(
    ctx: TaskContext,
    line: SourceConfig,
    style: ControlLineStyle,
) -> CompositionResult {
    let features = ctx.fetch(&line).await?;
    let suffix = match ctx.task {
        LoadTask::CountyLine => "county-border",
        _ => "city-border",
    };
    let layer = style.layer(ctx.name(suffix), features);
    ctx.finish(vec![layer])
}
