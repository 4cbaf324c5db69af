//! Facade crate for the `framewire-*` workspace.
//!
//! This crate provides:
//! - re-exports of the component model, the circle-grid detector and the
//!   builtin components,
//! - (feature `image`) helpers running the circle-grid detector on
//!   `image::GrayImage` buffers,
//! - (feature `cli`) the `framewire` binary: `list`, `run`, `find-grid`.
//!
//! ## Quickstart
//!
//! ```no_run
//! use framewire::core::{Pipeline, PipelineConfig};
//! use framewire::components::builtin_registry;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cfg = PipelineConfig::load_json("pipeline.json")?;
//! let mut pipeline = Pipeline::from_config(&cfg, &builtin_registry())?;
//! pipeline.init()?;
//! pipeline.start()?;
//! pipeline.run(100);
//! pipeline.stop()?;
//! pipeline.finish()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `framewire::core`: components, properties, streams, registry, pipeline.
//! - `framewire::grid`: blob extraction, homographies, circle-grid search,
//!   calibration boards.
//! - `framewire::components`: `ImageWriter`, `TimeTrigger`, `CvFindCirclesGrid`.
//! - `framewire::detect` (feature `image`): end-to-end grid detection.

pub use framewire_components as components;
pub use framewire_core as core;
pub use framewire_grid as grid;

pub use framewire_components::{
    builtin_registry, register_builtins, CvFindCirclesGrid, ImageWriter, TimeTrigger,
};
pub use framewire_core::{Component, ComponentRegistry, Pipeline, PipelineConfig};
pub use framewire_grid::{CalibrationBoard, CirclesGridParams, ImagePosition, PatternSize};

#[cfg(feature = "image")]
pub mod detect;
