//! Single-threaded reference host.
//!
//! A [`Pipeline`] owns hosted components, wires their streams and drives the
//! lifecycle. Each [`Pipeline::step`] visits the components in insertion
//! order: ready handlers are dispatched first, then `on_step` runs.

use log::{debug, error, info};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::component::ComponentError;
use crate::config::{split_endpoint, PipelineConfig};
use crate::node::Node;
use crate::registry::{ComponentRegistry, RegistryError};
use crate::stream::StreamError;

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("component `{component}`: {source}")]
    Component {
        component: String,
        #[source]
        source: ComponentError,
    },
    #[error("component `{0}` already exists")]
    DuplicateComponent(String),
    #[error("unknown component `{0}`")]
    UnknownComponent(String),
    #[error("invalid endpoint `{0}`, expected `component.stream`")]
    BadEndpoint(String),
    #[error("component `{component}` has no stream `{stream}`")]
    UnknownStream { component: String, stream: String },
    #[error("cannot connect `{from}` to `{to}`: {source}")]
    Connect {
        from: String,
        to: String,
        #[source]
        source: StreamError,
    },
}

fn in_component(component: &str) -> impl FnOnce(ComponentError) -> PipelineError + '_ {
    move |source| PipelineError::Component {
        component: component.to_string(),
        source,
    }
}

#[derive(Default)]
pub struct Pipeline {
    nodes: Vec<Box<dyn Node>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Instantiate, configure, prepare and wire every component of `cfg`.
    pub fn from_config(
        cfg: &PipelineConfig,
        registry: &ComponentRegistry,
    ) -> Result<Self, PipelineError> {
        let mut pipeline = Self::new();
        for c in &cfg.components {
            let mut node = registry.create(&c.kind, &c.name)?;
            for (key, value) in &c.properties {
                node.set_property(key, value).map_err(in_component(&c.name))?;
            }
            node.prepare_interface().map_err(in_component(&c.name))?;
            pipeline.add(node)?;
        }
        for conn in &cfg.connections {
            pipeline.connect(&conn.from, &conn.to)?;
        }
        info!(
            "pipeline ready: {} components, {} connections",
            cfg.components.len(),
            cfg.connections.len()
        );
        Ok(pipeline)
    }

    pub fn add(&mut self, node: Box<dyn Node>) -> Result<(), PipelineError> {
        if self.node(node.name()).is_some() {
            return Err(PipelineError::DuplicateComponent(node.name().to_string()));
        }
        self.nodes.push(node);
        Ok(())
    }

    /// Connect `from` (an output, `component.stream`) to `to` (an input).
    pub fn connect(&mut self, from: &str, to: &str) -> Result<(), PipelineError> {
        let (src_name, src_stream) =
            split_endpoint(from).ok_or_else(|| PipelineError::BadEndpoint(from.to_string()))?;
        let (dst_name, dst_stream) =
            split_endpoint(to).ok_or_else(|| PipelineError::BadEndpoint(to.to_string()))?;

        let output = self.port(src_name, src_stream)?;
        let input = self.port(dst_name, dst_stream)?;
        output
            .connect_to(input)
            .map_err(|source| PipelineError::Connect {
                from: from.to_string(),
                to: to.to_string(),
                source,
            })?;
        debug!("connected {from} -> {to}");
        Ok(())
    }

    fn port(&self, component: &str, stream: &str) -> Result<&dyn crate::StreamPort, PipelineError> {
        let node = self
            .node(component)
            .ok_or_else(|| PipelineError::UnknownComponent(component.to_string()))?;
        node.stream(stream).ok_or_else(|| PipelineError::UnknownStream {
            component: component.to_string(),
            stream: stream.to_string(),
        })
    }

    pub fn node(&self, name: &str) -> Option<&dyn Node> {
        self.nodes
            .iter()
            .find(|n| n.name() == name)
            .map(|n| n.as_ref())
    }

    pub fn node_mut(&mut self, name: &str) -> Option<&mut (dyn Node + 'static)> {
        self.nodes
            .iter_mut()
            .find(|n| n.name() == name)
            .map(|n| n.as_mut())
    }

    pub fn nodes(&self) -> impl Iterator<Item = &dyn Node> {
        self.nodes.iter().map(|n| n.as_ref())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn init(&mut self) -> Result<(), PipelineError> {
        self.for_each("init", |n| n.init())
    }

    pub fn start(&mut self) -> Result<(), PipelineError> {
        self.for_each("start", |n| n.start())
    }

    pub fn stop(&mut self) -> Result<(), PipelineError> {
        self.for_each("stop", |n| n.stop())
    }

    pub fn finish(&mut self) -> Result<(), PipelineError> {
        self.for_each("finish", |n| n.finish())
    }

    fn for_each(
        &mut self,
        call: &str,
        mut f: impl FnMut(&mut dyn Node) -> Result<(), ComponentError>,
    ) -> Result<(), PipelineError> {
        for node in &mut self.nodes {
            debug!("{}::{call}", node.name());
            f(node.as_mut()).map_err(in_component(node.name()))?;
        }
        Ok(())
    }

    /// One pass over every component. Returns the number of handlers run.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "trace", skip(self), fields(nodes = self.nodes.len()))
    )]
    pub fn step(&mut self) -> usize {
        let mut ran = 0;
        for node in &mut self.nodes {
            ran += node.dispatch();
            if let Err(err) = node.step() {
                error!("{}::step failed: {}", node.name(), err);
            }
        }
        ran
    }

    /// Run `steps` passes. Returns the total number of handlers run.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self)))]
    pub fn run(&mut self, steps: usize) -> usize {
        (0..steps).map(|_| self.step()).sum()
    }

    /// Invoke a handler by name, e.g. a manual `SaveImage` button.
    pub fn invoke(&mut self, component: &str, handler: &str) -> Result<(), PipelineError> {
        let node = self
            .node_mut(component)
            .ok_or_else(|| PipelineError::UnknownComponent(component.to_string()))?;
        node.invoke(handler).map_err(in_component(component))
    }
}
