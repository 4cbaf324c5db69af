//! Component communication interface: named streams and handlers.

use serde::Serialize;

use crate::stream::{Direction, StreamPort};

/// When the host should run a handler.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "streams", rename_all = "snake_case")]
pub enum Trigger {
    /// Only when invoked explicitly by name.
    Manual,
    /// Once per pipeline step.
    Periodic,
    /// When every listed input received a value since the handler last ran.
    OnData(Vec<String>),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("stream `{0}` is already registered")]
    DuplicateStream(String),
    #[error("handler `{0}` is already registered")]
    DuplicateHandler(String),
    #[error("unknown stream `{0}`")]
    UnknownStream(String),
    #[error("unknown handler `{0}`")]
    UnknownHandler(String),
    #[error("handler `{handler}` cannot depend on `{stream}`: not an input stream")]
    NotAnInput { handler: String, stream: String },
    #[error("handler `{0}` cannot be both periodic and data-driven")]
    MixedTrigger(String),
}

/// Handler registration: a name, the component-side token and its trigger.
#[derive(Clone, Debug)]
pub struct HandlerSpec<H> {
    name: String,
    handler: H,
    trigger: Trigger,
}

impl<H: Copy> HandlerSpec<H> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handler(&self) -> H {
        self.handler
    }

    pub fn trigger(&self) -> &Trigger {
        &self.trigger
    }
}

/// Listing entry for one registered stream.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StreamInfo {
    pub name: String,
    pub direction: Direction,
    pub type_name: &'static str,
}

/// Listing entry for one registered handler.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HandlerInfo {
    pub name: String,
    pub trigger: Trigger,
}

/// Streams and handlers a component exposes to the host.
///
/// Built once in [`Component::prepare_interface`](crate::Component::prepare_interface);
/// names are unique within each kind. The same port may be registered under
/// several names to provide aliases.
pub struct Interface<H> {
    streams: Vec<(String, Box<dyn StreamPort>)>,
    handlers: Vec<HandlerSpec<H>>,
}

impl<H> Default for Interface<H> {
    fn default() -> Self {
        Self {
            streams: Vec::new(),
            handlers: Vec::new(),
        }
    }
}

impl<H: Copy> Interface<H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_stream<P>(
        &mut self,
        name: impl Into<String>,
        port: &P,
    ) -> Result<(), InterfaceError>
    where
        P: StreamPort + Clone + 'static,
    {
        let name = name.into();
        if self.stream(&name).is_some() {
            return Err(InterfaceError::DuplicateStream(name));
        }
        self.streams.push((name, Box::new(port.clone())));
        Ok(())
    }

    /// Register a manual handler. Use [`Self::add_dependency`] to make it
    /// periodic or data-driven.
    pub fn register_handler(
        &mut self,
        name: impl Into<String>,
        handler: H,
    ) -> Result<(), InterfaceError> {
        let name = name.into();
        if self.handler(&name).is_some() {
            return Err(InterfaceError::DuplicateHandler(name));
        }
        self.handlers.push(HandlerSpec {
            name,
            handler,
            trigger: Trigger::Manual,
        });
        Ok(())
    }

    /// Bind `handler` to an input stream, or with `None` to every step.
    pub fn add_dependency(
        &mut self,
        handler: &str,
        stream: Option<&str>,
    ) -> Result<(), InterfaceError> {
        if let Some(stream) = stream {
            let port = self
                .stream(stream)
                .ok_or_else(|| InterfaceError::UnknownStream(stream.to_string()))?;
            if port.direction() != Direction::Input {
                return Err(InterfaceError::NotAnInput {
                    handler: handler.to_string(),
                    stream: stream.to_string(),
                });
            }
        }

        let spec = self
            .handlers
            .iter_mut()
            .find(|h| h.name == handler)
            .ok_or_else(|| InterfaceError::UnknownHandler(handler.to_string()))?;

        let next = match (&spec.trigger, stream) {
            (Trigger::Manual | Trigger::Periodic, None) => Trigger::Periodic,
            (Trigger::Manual, Some(s)) => Trigger::OnData(vec![s.to_string()]),
            (Trigger::OnData(deps), Some(s)) => {
                let mut deps = deps.clone();
                if !deps.iter().any(|d| d == s) {
                    deps.push(s.to_string());
                }
                Trigger::OnData(deps)
            }
            _ => return Err(InterfaceError::MixedTrigger(handler.to_string())),
        };
        spec.trigger = next;
        Ok(())
    }

    pub fn stream(&self, name: &str) -> Option<&dyn StreamPort> {
        self.streams
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, p)| p.as_ref())
    }

    pub fn streams(&self) -> impl Iterator<Item = (&str, &dyn StreamPort)> {
        self.streams.iter().map(|(n, p)| (n.as_str(), p.as_ref()))
    }

    pub fn handler(&self, name: &str) -> Option<&HandlerSpec<H>> {
        self.handlers.iter().find(|h| h.name == name)
    }

    pub fn handlers(&self) -> &[HandlerSpec<H>] {
        &self.handlers
    }

    pub fn stream_infos(&self) -> Vec<StreamInfo> {
        self.streams()
            .map(|(name, port)| StreamInfo {
                name: name.to_string(),
                direction: port.direction(),
                type_name: port.type_name(),
            })
            .collect()
    }

    pub fn handler_infos(&self) -> Vec<HandlerInfo> {
        self.handlers
            .iter()
            .map(|h| HandlerInfo {
                name: h.name.clone(),
                trigger: h.trigger.clone(),
            })
            .collect()
    }
}
