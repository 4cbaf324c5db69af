//! Component model for framewire dataflow plugins.
//!
//! This crate holds everything a plugin and a host share:
//! - [`Component`]: lifecycle callbacks plus handler dispatch,
//! - [`Property`] and [`enum_translator!`]: typed configuration values,
//! - [`DataStreamIn`] / [`DataStreamOut`]: typed ports,
//! - [`Interface`]: the named streams and handlers a component exposes,
//! - [`ComponentRegistry`]: explicit type-name -> factory mapping,
//! - [`Pipeline`]: a small single-threaded reference host driven by a
//!   [`PipelineConfig`].
//!
//! It does not depend on any image type; payloads are plain Rust values.

mod clock;
mod component;
mod config;
mod interface;
mod logger;
mod node;
mod pipeline;
mod property;
mod registry;
mod stream;
mod translator;

pub use clock::{Clock, ManualClock, SystemClock};
pub use component::{Component, ComponentError, ComponentState};
pub use config::{split_endpoint, ComponentConfig, ConfigError, ConnectionConfig, PipelineConfig};
pub use interface::{HandlerInfo, HandlerSpec, Interface, InterfaceError, StreamInfo, Trigger};
pub use node::{hosted, Hosted, Node};
pub use pipeline::{Pipeline, PipelineError};
pub use property::{Property, PropertyAccess, PropertyError, PropertyInfo, PropertyType};
pub use registry::{ComponentRegistry, Factory, RegistryError};
pub use stream::{DataStreamIn, DataStreamOut, Direction, StreamError, StreamPort};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;

#[doc(hidden)]
pub mod __private {
    pub use serde_json::Value;
}
