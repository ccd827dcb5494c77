//! Geographic feature data model.
//!
//! Features are loaded from GeoJSON, carry their raw properties and a
//! boundary classification resolved once at load time.

mod classification;
mod collection;

pub use classification::BorderClass;
pub use collection::{BorderSplit, Feature, FeatureCollection};
pub(crate) use collection::visit_coords;

/// Feature property map (string keys, JSON values).
pub type Properties = serde_json::Map<String, serde_json::Value>;
