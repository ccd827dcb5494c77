//! District layers: administrative fills and borders composed from data
//! sources.

mod cancel;
mod channel;
mod composer;
mod config;
mod source;

pub use cancel::CancellationToken;
pub use channel::{CompositionChannel, DrainReport};
pub use composer::{
    border_stroke, border_width, Composition, CompositionFuture, CompositionResult,
    ControlLineStyle, CountryComposer, LoadTask,
};
pub use config::{
    Depth, DepthDataConfig, DistrictDataConfig, DistrictLayerOptions, FillOptions, LabelOptions,
};
#[cfg(not(target_arch = "wasm32"))]
pub use source::FileSource;
#[cfg(target_arch = "wasm32")]
pub use source::HttpSource;
pub use source::{DataLoadError, DataSource, MemorySource, SourceConfig};

use std::fmt;

/// Errors raised while composing district layers.
#[derive(Debug, Clone, PartialEq)]
pub enum ComposeError {
    /// The data config or layer options are unusable
    Configuration(String),
    /// A load failed; only the layers of that task are lost
    DataLoad { task: LoadTask, error: DataLoadError },
    /// The composer was cancelled before the task finished
    Cancelled,
}

impl fmt::Display for ComposeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComposeError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            ComposeError::DataLoad { task, error } => write!(f, "{} task failed: {}", task, error),
            ComposeError::Cancelled => write!(f, "Composition cancelled"),
        }
    }
}

impl std::error::Error for ComposeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ComposeError::DataLoad { error, .. } => Some(error),
            _ => None,
        }
    }
}
