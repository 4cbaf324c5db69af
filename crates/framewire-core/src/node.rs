//! Type-erased component wrapper used by hosts.

use std::any::Any;

use log::{error, trace};
use serde_json::Value;

use crate::component::{Component, ComponentError, ComponentState};
use crate::interface::{HandlerInfo, Interface, StreamInfo, Trigger};
use crate::property::{PropertyError, PropertyInfo};
use crate::stream::StreamPort;

/// Object-safe host view of a component.
pub trait Node: Send {
    fn name(&self) -> &str;
    fn state(&self) -> ComponentState;

    /// Assign a property from a configuration value.
    fn set_property(&mut self, name: &str, value: &Value) -> Result<(), ComponentError>;
    fn property_infos(&mut self) -> Vec<PropertyInfo>;

    fn prepare_interface(&mut self) -> Result<(), ComponentError>;
    fn stream(&self, name: &str) -> Option<&dyn StreamPort>;
    fn stream_infos(&self) -> Vec<StreamInfo>;
    fn handler_infos(&self) -> Vec<HandlerInfo>;

    fn init(&mut self) -> Result<(), ComponentError>;
    fn start(&mut self) -> Result<(), ComponentError>;
    fn stop(&mut self) -> Result<(), ComponentError>;
    fn finish(&mut self) -> Result<(), ComponentError>;
    fn step(&mut self) -> Result<(), ComponentError>;

    /// Run a handler by name, regardless of its trigger.
    fn invoke(&mut self, handler: &str) -> Result<(), ComponentError>;

    /// Run every periodic handler and every data-driven handler whose inputs
    /// all received new values. Handler failures are logged, not returned.
    /// Returns the number of handlers that ran.
    fn dispatch(&mut self) -> usize;

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Hosts a concrete [`Component`] behind the [`Node`] interface.
pub struct Hosted<C: Component> {
    component: C,
    interface: Interface<C::Handler>,
    state: ComponentState,
    /// Per handler, the input sequences observed when it last ran.
    seen: Vec<Vec<u64>>,
}

/// Box a component for a registry or a pipeline.
pub fn hosted<C: Component>(component: C) -> Box<dyn Node> {
    Box::new(Hosted::new(component))
}

impl<C: Component> Hosted<C> {
    pub fn new(component: C) -> Self {
        Self {
            component,
            interface: Interface::new(),
            state: ComponentState::Created,
            seen: Vec::new(),
        }
    }

    pub fn component(&self) -> &C {
        &self.component
    }

    pub fn component_mut(&mut self) -> &mut C {
        &mut self.component
    }

    pub fn interface(&self) -> &Interface<C::Handler> {
        &self.interface
    }

    fn expect_state(
        &self,
        call: &'static str,
        allowed: &[ComponentState],
    ) -> Result<(), ComponentError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(ComponentError::State {
                call,
                state: self.state,
            })
        }
    }

    fn run_handler(&mut self, name: &str, handler: C::Handler) -> Result<(), ComponentError> {
        trace!("{}::{}()", self.component.name(), name);
        self.component.handle(handler)
    }

    fn sequences(&self, deps: &[String]) -> Vec<u64> {
        deps.iter()
            .map(|d| self.interface.stream(d).map_or(0, |p| p.sequence()))
            .collect()
    }
}

impl<C: Component> Node for Hosted<C> {
    fn name(&self) -> &str {
        self.component.name()
    }

    fn state(&self) -> ComponentState {
        self.state
    }

    fn set_property(&mut self, name: &str, value: &Value) -> Result<(), ComponentError> {
        if self.state == ComponentState::Finished {
            return Err(ComponentError::State {
                call: "set_property",
                state: self.state,
            });
        }
        let prepared = self.state != ComponentState::Created;
        let changed = {
            let mut props = self.component.properties();
            let prop = props
                .iter_mut()
                .find(|p| p.name() == name)
                .ok_or_else(|| PropertyError::Unknown(name.to_string()))?;
            if prepared && prop.is_constant() {
                return Err(PropertyError::Locked(name.to_string()).into());
            }
            prop.set_json(value)?
        };
        if changed {
            self.component.property_changed(name);
        }
        Ok(())
    }

    fn property_infos(&mut self) -> Vec<PropertyInfo> {
        self.component
            .properties()
            .into_iter()
            .map(|p| PropertyInfo::from_access(&*p))
            .collect()
    }

    fn prepare_interface(&mut self) -> Result<(), ComponentError> {
        self.expect_state("prepare_interface", &[ComponentState::Created])?;
        trace!("{}::prepare_interface()", self.component.name());
        let mut iface = Interface::new();
        self.component.prepare_interface(&mut iface)?;
        self.seen = iface
            .handlers()
            .iter()
            .map(|h| match h.trigger() {
                Trigger::OnData(deps) => vec![0; deps.len()],
                Trigger::Manual | Trigger::Periodic => Vec::new(),
            })
            .collect();
        self.interface = iface;
        self.state = ComponentState::Prepared;
        Ok(())
    }

    fn stream(&self, name: &str) -> Option<&dyn StreamPort> {
        self.interface.stream(name)
    }

    fn stream_infos(&self) -> Vec<StreamInfo> {
        self.interface.stream_infos()
    }

    fn handler_infos(&self) -> Vec<HandlerInfo> {
        self.interface.handler_infos()
    }

    fn init(&mut self) -> Result<(), ComponentError> {
        self.expect_state("init", &[ComponentState::Prepared])?;
        trace!("{}::on_init()", self.component.name());
        self.component.on_init()?;
        self.state = ComponentState::Ready;
        Ok(())
    }

    fn start(&mut self) -> Result<(), ComponentError> {
        self.expect_state("start", &[ComponentState::Ready])?;
        trace!("{}::on_start()", self.component.name());
        self.component.on_start()?;
        self.state = ComponentState::Running;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), ComponentError> {
        self.expect_state("stop", &[ComponentState::Running])?;
        trace!("{}::on_stop()", self.component.name());
        self.component.on_stop()?;
        self.state = ComponentState::Ready;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), ComponentError> {
        self.expect_state("finish", &[ComponentState::Ready])?;
        trace!("{}::on_finish()", self.component.name());
        self.component.on_finish()?;
        self.state = ComponentState::Finished;
        Ok(())
    }

    fn step(&mut self) -> Result<(), ComponentError> {
        self.expect_state("step", &[ComponentState::Running])?;
        self.component.on_step()
    }

    fn invoke(&mut self, handler: &str) -> Result<(), ComponentError> {
        self.expect_state("invoke", &[ComponentState::Ready, ComponentState::Running])?;
        let token = self
            .interface
            .handler(handler)
            .map(|h| h.handler())
            .ok_or_else(|| ComponentError::UnknownHandler(handler.to_string()))?;
        self.run_handler(handler, token)
    }

    fn dispatch(&mut self) -> usize {
        if self.state != ComponentState::Running {
            return 0;
        }

        let mut ran = 0;
        for idx in 0..self.interface.handlers().len() {
            let spec = &self.interface.handlers()[idx];
            let ready = match spec.trigger() {
                Trigger::Manual => false,
                Trigger::Periodic => true,
                Trigger::OnData(deps) => {
                    let now = self.sequences(deps);
                    let fresh = now.iter().zip(&self.seen[idx]).all(|(n, s)| n > s);
                    if fresh {
                        self.seen[idx] = now;
                    }
                    fresh
                }
            };
            if !ready {
                continue;
            }

            let spec = &self.interface.handlers()[idx];
            let (name, token) = (spec.name().to_string(), spec.handler());
            ran += 1;
            if let Err(err) = self.run_handler(&name, token) {
                error!("{}::{} failed: {}", self.component.name(), name, err);
            }
        }
        ran
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
