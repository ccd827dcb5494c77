#![warn(clippy::all)]

//! Geolayer Workbench - layered map rendering over WebGL.
//!
//! Vector features are classified, encoded through style scales, triangulated
//! into GPU buffers and drawn through shader models. District layers (fills,
//! borders, labels) are composed asynchronously from configured data sources
//! and applied to a [`layer::Scene`], which builds and draws them in z-order.

pub mod district;
pub mod feature;
pub mod gpu;
pub mod layer;
pub mod model;
pub mod style;
pub mod triangulation;
pub mod view;
