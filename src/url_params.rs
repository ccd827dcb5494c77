//! Startup parameters from the page query string.
//!
//! `?data=<base url>&depth=2&lat=35&lon=105` loads the district data from
//! `<base url>` instead of the bundled demo and opens the view there.

use geolayer_workbench::district::Depth;

/// Parsed URL parameters.
#[derive(Debug, Default)]
pub struct UrlParams {
    /// Base url the district sources are resolved against
    pub data: Option<String>,
    pub depth: Option<Depth>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

impl UrlParams {
    fn parse(query: &str) -> Self {
        let mut params = UrlParams::default();

        for pair in query.trim_start_matches('?').split('&') {
            let mut kv = pair.splitn(2, '=');
            let key = kv.next().unwrap_or("");
            let value = kv.next().unwrap_or("");
            match key {
                "data" if !value.is_empty() => params.data = Some(value.to_string()),
                "depth" => {
                    params.depth = value.parse::<u8>().ok().and_then(|d| Depth::try_from(d).ok())
                }
                "lat" => params.lat = value.parse().ok(),
                "lon" => params.lon = value.parse().ok(),
                _ => {}
            }
        }

        params
    }
}

/// Parse URL query parameters from the current browser URL.
#[cfg(target_arch = "wasm32")]
pub fn parse_from_url() -> UrlParams {
    let search = web_sys::window().and_then(|window| window.location().search().ok());
    match search {
        Some(search) => UrlParams::parse(&search),
        None => UrlParams::default(),
    }
}

/// No-op stub for native builds.
#[cfg(not(target_arch = "wasm32"))]
pub fn parse_from_url() -> UrlParams {
    UrlParams::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query() {
        let params = UrlParams::parse("?data=https://example.org/geo&depth=2&lat=30.5&lon=x");
        assert_eq!(params.data.as_deref(), Some("https://example.org/geo"));
        assert_eq!(params.depth, Some(Depth::City));
        assert_eq!(params.lat, Some(30.5));
        assert_eq!(params.lon, None);
    }

    #[test]
    fn test_invalid_depth_is_ignored() {
        let params = UrlParams::parse("depth=7&data=");
        assert_eq!(params.depth, None);
        assert!(params.data.is_none());
    }
}
