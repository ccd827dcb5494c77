//! Data sources for district features.

use super::CancellationToken;
use crate::feature::FeatureCollection;
use futures_util::future::LocalBoxFuture;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;

/// Where to load one collection from.
///
/// Fields other than `url` are kept and passed through to the source
/// untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub url: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl SourceConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            extra: serde_json::Map::new(),
        }
    }
}

/// A collection could not be fetched or parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct DataLoadError {
    pub url: String,
    pub message: String,
}

impl DataLoadError {
    pub fn new(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for DataLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Failed to load '{}': {}", self.url, self.message)
    }
}

impl std::error::Error for DataLoadError {}

/// Asynchronous provider of feature collections.
///
/// Futures are local: on wasm32 they run on the browser event loop.
pub trait DataSource {
    fn fetch<'a>(
        &'a self,
        config: &'a SourceConfig,
        token: &'a CancellationToken,
    ) -> LocalBoxFuture<'a, Result<FeatureCollection, DataLoadError>>;
}

/// In-memory source keyed by url. Records every url it is asked for.
#[derive(Debug, Default)]
pub struct MemorySource {
    entries: HashMap<String, Result<FeatureCollection, String>>,
    fetched: RefCell<Vec<String>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: impl Into<String>, features: FeatureCollection) -> Self {
        self.entries.insert(url.into(), Ok(features));
        self
    }

    /// Makes fetches of `url` fail with `message`.
    pub fn with_failure(mut self, url: impl Into<String>, message: impl Into<String>) -> Self {
        self.entries.insert(url.into(), Err(message.into()));
        self
    }

    /// Urls fetched so far, in order.
    pub fn fetched(&self) -> Vec<String> {
        self.fetched.borrow().clone()
    }
}

impl DataSource for MemorySource {
    fn fetch<'a>(
        &'a self,
        config: &'a SourceConfig,
        _token: &'a CancellationToken,
    ) -> LocalBoxFuture<'a, Result<FeatureCollection, DataLoadError>> {
        Box::pin(async move {
            self.fetched.borrow_mut().push(config.url.clone());
            match self.entries.get(&config.url) {
                Some(Ok(features)) => Ok(features.clone()),
                Some(Err(message)) => Err(DataLoadError::new(&config.url, message.as_str())),
                None => Err(DataLoadError::new(&config.url, "not found")),
            }
        })
    }
}

/// Reads GeoJSON files relative to a root directory.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone)]
pub struct FileSource {
    root: std::path::PathBuf,
}

#[cfg(not(target_arch = "wasm32"))]
impl FileSource {
    pub fn new(root: impl Into<std::path::PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl DataSource for FileSource {
    fn fetch<'a>(
        &'a self,
        config: &'a SourceConfig,
        _token: &'a CancellationToken,
    ) -> LocalBoxFuture<'a, Result<FeatureCollection, DataLoadError>> {
        Box::pin(async move {
            let path = self.root.join(&config.url);
            log::debug!("Reading {}", path.display());

            let text = std::fs::read_to_string(&path)
                .map_err(|e| DataLoadError::new(&config.url, e.to_string()))?;
            FeatureCollection::from_geojson_str(&text)
                .map_err(|e| DataLoadError::new(&config.url, e))
        })
    }
}

/// Fetches GeoJSON over HTTP with the browser `fetch` API.
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Clone, Default)]
pub struct HttpSource {
    /// Prefix for relative urls
    base_url: Option<String>,
}

#[cfg(target_arch = "wasm32")]
impl HttpSource {
    pub fn new(base_url: Option<String>) -> Self {
        Self { base_url }
    }

    fn resolve(&self, url: &str) -> String {
        match &self.base_url {
            Some(base) if !url.contains("://") => {
                format!("{}/{}", base.trim_end_matches('/'), url.trim_start_matches('/'))
            }
            _ => url.to_string(),
        }
    }
}

#[cfg(target_arch = "wasm32")]
impl DataSource for HttpSource {
    fn fetch<'a>(
        &'a self,
        config: &'a SourceConfig,
        token: &'a CancellationToken,
    ) -> LocalBoxFuture<'a, Result<FeatureCollection, DataLoadError>> {
        Box::pin(async move {
            let url = self.resolve(&config.url);
            let text = fetch_text(&url)
                .await
                .map_err(|message| DataLoadError::new(&config.url, message))?;
            if token.is_cancelled() {
                return Err(DataLoadError::new(&config.url, "cancelled"));
            }
            FeatureCollection::from_geojson_str(&text)
                .map_err(|e| DataLoadError::new(&config.url, e))
        })
    }
}

#[cfg(target_arch = "wasm32")]
async fn fetch_text(url: &str) -> Result<String, String> {
    use wasm_bindgen::JsCast;
    use wasm_bindgen_futures::JsFuture;
    use web_sys::{Request, RequestInit, RequestMode, Response};

    let opts = RequestInit::new();
    opts.set_method("GET");
    opts.set_mode(RequestMode::Cors);

    let request = Request::new_with_str_and_init(url, &opts)
        .map_err(|e| format!("Failed to create request: {:?}", e))?;
    let window = web_sys::window().ok_or("No window object")?;

    let response = JsFuture::from(window.fetch_with_request(&request))
        .await
        .map_err(|e| format!("Fetch failed: {:?}", e))?;
    let response: Response = response
        .dyn_into()
        .map_err(|_| "Fetch did not return a Response".to_string())?;

    if !response.ok() {
        return Err(format!("HTTP {} {}", response.status(), response.status_text()));
    }

    let text = response
        .text()
        .map_err(|e| format!("Failed to read body: {:?}", e))?;
    let text = JsFuture::from(text)
        .await
        .map_err(|e| format!("Failed to read body: {:?}", e))?;
    text.as_string()
        .ok_or_else(|| "Response body is not text".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_source_records_fetches() {
        let source = MemorySource::new()
            .with("a.json", FeatureCollection::empty())
            .with_failure("b.json", "boom");
        let token = CancellationToken::new();

        let a = pollster::block_on(source.fetch(&SourceConfig::new("a.json"), &token));
        assert!(a.unwrap().is_empty());

        let b = pollster::block_on(source.fetch(&SourceConfig::new("b.json"), &token));
        assert_eq!(b.unwrap_err(), DataLoadError::new("b.json", "boom"));

        let c = pollster::block_on(source.fetch(&SourceConfig::new("c.json"), &token));
        assert_eq!(c.unwrap_err().message, "not found");

        assert_eq!(source.fetched(), vec!["a.json", "b.json", "c.json"]);
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn test_file_source_reads_geojson() {
        let dir = std::env::temp_dir().join(format!("geolayer-source-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("lines.json"),
            r#"{"type":"FeatureCollection","features":[{"type":"Feature","properties":{"type":"2"},"geometry":{"type":"LineString","coordinates":[[0,0],[1,1]]}}]}"#,
        )
        .unwrap();

        let source = FileSource::new(&dir);
        let token = CancellationToken::new();
        let features =
            pollster::block_on(source.fetch(&SourceConfig::new("lines.json"), &token)).unwrap();
        assert_eq!(features.len(), 1);

        let missing = pollster::block_on(source.fetch(&SourceConfig::new("missing.json"), &token));
        assert_eq!(missing.unwrap_err().url, "missing.json");

        std::fs::remove_dir_all(&dir).ok();
    }
}
