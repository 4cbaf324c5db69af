//! The component contract implemented by every plugin.

use std::fmt;

use crate::interface::{Interface, InterfaceError};
use crate::property::{PropertyAccess, PropertyError};
use crate::stream::StreamError;

/// Errors surfaced by components and their hosts.
#[derive(thiserror::Error, Debug)]
pub enum ComponentError {
    #[error(transparent)]
    Property(#[from] PropertyError),
    #[error(transparent)]
    Interface(#[from] InterfaceError),
    #[error(transparent)]
    Stream(#[from] StreamError),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("`{call}` is not allowed while the component is {state}")]
    State {
        call: &'static str,
        state: ComponentState,
    },
    #[error("unknown handler `{0}`")]
    UnknownHandler(String),
    #[error("{0}")]
    Failed(String),
}

/// Lifecycle position of a hosted component.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentState {
    /// Constructed; properties may be assigned.
    Created,
    /// Interface prepared; streams may be connected.
    Prepared,
    /// Initialized and idle.
    Ready,
    Running,
    Finished,
}

impl fmt::Display for ComponentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ComponentState::Created => "created",
            ComponentState::Prepared => "prepared",
            ComponentState::Ready => "ready",
            ComponentState::Running => "running",
            ComponentState::Finished => "finished",
        };
        f.write_str(s)
    }
}

/// A dataflow component.
///
/// The host drives a component through a fixed sequence:
///
/// 1. property assignment (from configuration),
/// 2. [`prepare_interface`](Component::prepare_interface), where streams and
///    handlers are registered; properties are final at this point,
/// 3. [`on_init`](Component::on_init), then any number of
///    [`on_start`](Component::on_start) / [`on_stop`](Component::on_stop)
///    pairs with [`on_step`](Component::on_step) and handler calls in between,
/// 4. [`on_finish`](Component::on_finish).
///
/// Handlers are identified by the component's own `Handler` token type, so a
/// component dispatches them with a plain `match`.
pub trait Component: Send + 'static {
    type Handler: Copy + fmt::Debug + Send + 'static;

    fn name(&self) -> &str;

    /// Every property of the component.
    fn properties(&mut self) -> Vec<&mut dyn PropertyAccess>;

    fn prepare_interface(
        &mut self,
        iface: &mut Interface<Self::Handler>,
    ) -> Result<(), ComponentError>;

    fn on_init(&mut self) -> Result<(), ComponentError> {
        Ok(())
    }

    fn on_start(&mut self) -> Result<(), ComponentError> {
        Ok(())
    }

    fn on_stop(&mut self) -> Result<(), ComponentError> {
        Ok(())
    }

    fn on_finish(&mut self) -> Result<(), ComponentError> {
        Ok(())
    }

    fn on_step(&mut self) -> Result<(), ComponentError> {
        Ok(())
    }

    fn handle(&mut self, handler: Self::Handler) -> Result<(), ComponentError>;

    /// Called after property `name` was assigned a different value.
    fn property_changed(&mut self, _name: &str) {}
}
