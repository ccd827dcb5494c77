//! District data configuration and layer options.
//!
//! Both are loaded from JSON. Layer options use camelCase keys and every
//! field is optional.

use super::{ComposeError, SourceConfig};
use crate::style::serde_color;
use eframe::egui::Color32;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Administrative depth of a district map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Depth {
    /// Province fills with province borders
    #[default]
    Province = 1,
    /// Adds city borders
    City = 2,
    /// Adds county borders
    County = 3,
}

impl TryFrom<u8> for Depth {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Depth::Province),
            2 => Ok(Depth::City),
            3 => Ok(Depth::County),
            other => Err(format!("depth must be 1, 2 or 3, got {}", other)),
        }
    }
}

impl From<Depth> for u8 {
    fn from(depth: Depth) -> Self {
        depth as u8
    }
}

impl fmt::Display for Depth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", u8::from(*self))
    }
}

/// Data sources for one country at one depth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepthDataConfig {
    pub fill: SourceConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<SourceConfig>,
    pub province_line: SourceConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city_line: Option<SourceConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub county_line: Option<SourceConfig>,
}

/// Country code → depth → data sources.
///
/// ```json
/// { "CHN": { "1": { "fill": { "url": "..." }, "provinceLine": { "url": "..." } } } }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DistrictDataConfig {
    countries: BTreeMap<String, BTreeMap<u8, DepthDataConfig>>,
}

impl DistrictDataConfig {
    pub fn from_json(json: &str) -> Result<Self, ComposeError> {
        serde_json::from_str(json)
            .map_err(|e| ComposeError::Configuration(format!("Invalid district data config: {}", e)))
    }

    pub fn insert(&mut self, country: impl Into<String>, depth: Depth, config: DepthDataConfig) {
        self.countries
            .entry(country.into())
            .or_default()
            .insert(depth.into(), config);
    }

    pub fn get(&self, country: &str, depth: Depth) -> Option<&DepthDataConfig> {
        self.countries.get(country)?.get(&u8::from(depth))
    }

    pub fn countries(&self) -> impl Iterator<Item = &str> {
        self.countries.keys().map(String::as_str)
    }

    /// Resolves and checks the sources for `(country, depth)`.
    ///
    /// Depth 2 needs a city line source and depth 3 a county line source.
    pub fn validate(&self, country: &str, depth: Depth) -> Result<&DepthDataConfig, ComposeError> {
        let config = self.get(country, depth).ok_or_else(|| {
            ComposeError::Configuration(format!(
                "No data configured for country '{}' at depth {}",
                country, depth
            ))
        })?;

        let missing = match depth {
            Depth::City if config.city_line.is_none() => Some("cityLine"),
            Depth::County if config.county_line.is_none() => Some("countyLine"),
            _ => None,
        };
        if let Some(field) = missing {
            return Err(ComposeError::Configuration(format!(
                "Country '{}' at depth {} has no {} source",
                country, depth, field
            )));
        }

        for source in [Some(&config.fill), Some(&config.province_line), config.label.as_ref()]
            .into_iter()
            .flatten()
        {
            if source.url.trim().is_empty() {
                return Err(ComposeError::Configuration(format!(
                    "Country '{}' at depth {} has a source with an empty url",
                    country, depth
                )));
            }
        }

        Ok(config)
    }
}

/// Label options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LabelOptions {
    pub enable: bool,
    /// Property holding the label text
    pub field: String,
    pub size: f32,
    #[serde(with = "serde_color")]
    pub color: Color32,
}

impl Default for LabelOptions {
    fn default() -> Self {
        Self {
            enable: true,
            field: "NAME_CHN".to_string(),
            size: 8.0,
            color: Color32::BLACK,
        }
    }
}

/// Fill options.
///
/// With a `field` and a list of `values` the fill color is quantized over
/// the field. The domain defaults to the field's range in the data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FillOptions {
    #[serde(with = "serde_color")]
    pub color: Color32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub values: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<(f64, f64)>,
}

impl Default for FillOptions {
    fn default() -> Self {
        Self {
            color: Color32::from_rgb(0xdd, 0xdd, 0xdd),
            field: None,
            values: Vec::new(),
            domain: None,
        }
    }
}

/// Options of a district layer group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DistrictLayerOptions {
    pub depth: Depth,
    pub label: LabelOptions,
    pub fill: FillOptions,
    pub opacity: f32,

    #[serde(with = "serde_color")]
    pub national_stroke: Color32,
    pub national_width: f32,
    #[serde(with = "serde_color")]
    pub coastline_stroke: Color32,
    pub coastline_width: f32,
    /// Stroke of emphasized borders
    #[serde(with = "serde_color")]
    pub stroke: Color32,
    pub stroke_width: f32,
    #[serde(with = "serde_color")]
    pub city_stroke: Color32,
    pub city_stroke_width: f32,
    #[serde(with = "serde_color")]
    pub county_stroke: Color32,
    pub county_stroke_width: f32,

    pub z_index: i32,
}

impl Default for DistrictLayerOptions {
    fn default() -> Self {
        let gray = Color32::from_rgb(0x63, 0x63, 0x63);
        Self {
            depth: Depth::default(),
            label: LabelOptions::default(),
            fill: FillOptions::default(),
            opacity: 1.0,
            national_stroke: Color32::from_rgb(0xe4, 0x5e, 0x5e),
            national_width: 1.0,
            coastline_stroke: Color32::from_rgb(0x41, 0x90, 0xda),
            coastline_width: 1.0,
            stroke: Color32::from_rgb(0xbd, 0xbd, 0xbd),
            stroke_width: 0.6,
            city_stroke: gray,
            city_stroke_width: 0.6,
            county_stroke: gray,
            county_stroke_width: 0.6,
            z_index: 0,
        }
    }
}

impl DistrictLayerOptions {
    pub fn from_json(json: &str) -> Result<Self, ComposeError> {
        serde_json::from_str(json)
            .map_err(|e| ComposeError::Configuration(format!("Invalid layer options: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(url: &str) -> SourceConfig {
        SourceConfig::new(url)
    }

    #[test]
    fn test_options_defaults() {
        let options = DistrictLayerOptions::from_json("{}").unwrap();
        assert_eq!(options, DistrictLayerOptions::default());
        assert_eq!(options.depth, Depth::Province);
        assert!(options.label.enable);
        assert_eq!(options.label.field, "NAME_CHN");
        assert_eq!(options.stroke_width, 0.6);
    }

    #[test]
    fn test_options_camel_case() {
        let options = DistrictLayerOptions::from_json(
            r##"{"depth": 3, "nationalStroke": "#f00", "coastlineWidth": 2, "zIndex": 4, "label": {"enable": false}}"##,
        )
        .unwrap();
        assert_eq!(options.depth, Depth::County);
        assert_eq!(options.national_stroke, Color32::from_rgb(255, 0, 0));
        assert_eq!(options.coastline_width, 2.0);
        assert_eq!(options.z_index, 4);
        assert!(!options.label.enable);
        assert_eq!(options.label.size, 8.0);
    }

    #[test]
    fn test_invalid_options() {
        assert!(DistrictLayerOptions::from_json(r#"{"depth": 4}"#).is_err());
        assert!(DistrictLayerOptions::from_json(r#"{"stroke": "not-a-color"}"#).is_err());
    }

    #[test]
    fn test_data_config_from_json() {
        let config = DistrictDataConfig::from_json(
            r#"{
                "CHN": {
                    "1": {
                        "fill": {"url": "fill.json", "type": "geojson"},
                        "label": {"url": "label.json"},
                        "provinceLine": {"url": "line.json"}
                    }
                }
            }"#,
        )
        .unwrap();

        let depth1 = config.validate("CHN", Depth::Province).unwrap();
        assert_eq!(depth1.fill.url, "fill.json");
        assert_eq!(depth1.fill.extra["type"], "geojson");
        assert!(depth1.city_line.is_none());
        assert_eq!(config.countries().collect::<Vec<_>>(), vec!["CHN"]);
    }

    #[test]
    fn test_validation_fails_fast() {
        let mut config = DistrictDataConfig::default();
        config.insert(
            "CHN",
            Depth::City,
            DepthDataConfig {
                fill: source("fill.json"),
                label: None,
                province_line: source("line.json"),
                city_line: None,
                county_line: None,
            },
        );

        assert!(matches!(
            config.validate("CHN", Depth::City),
            Err(ComposeError::Configuration(msg)) if msg.contains("cityLine")
        ));
        assert!(matches!(
            config.validate("CHN", Depth::County),
            Err(ComposeError::Configuration(_))
        ));
        assert!(matches!(
            config.validate("USA", Depth::City),
            Err(ComposeError::Configuration(_))
        ));
    }
}
