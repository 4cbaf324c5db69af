use std::time::{Duration, Instant};

use framewire_core::{
    Clock, Component, ComponentError, DataStreamOut, Interface, Property, PropertyAccess,
    SystemClock,
};
use log::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TriggerHandler {
    Trigger,
    Start,
    Stop,
}

/// Emits `()` on `out_trigger` once more than `time` microseconds have passed
/// since the previous emission. Missed intervals are not caught up.
pub struct TimeTrigger<C: Clock + 'static = SystemClock> {
    name: String,
    time: Property<u64>,
    on_start: Property<bool>,
    out_trigger: DataStreamOut<()>,
    clock: C,
    enabled: bool,
    last_fired: Instant,
}

impl TimeTrigger {
    pub fn new(name: &str) -> Self {
        Self::with_clock(name, SystemClock)
    }
}

impl<C: Clock + 'static> TimeTrigger<C> {
    pub fn with_clock(name: &str, clock: C) -> Self {
        let last_fired = clock.now();
        Self {
            name: name.to_string(),
            time: Property::new("time", 1000),
            on_start: Property::new("on_start", true),
            out_trigger: DataStreamOut::new(),
            clock,
            enabled: false,
            last_fired,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn interval(&self) -> Duration {
        Duration::from_micros(*self.time)
    }

    fn fire_if_due(&mut self) {
        if !self.enabled {
            return;
        }
        let now = self.clock.now();
        let elapsed = now.saturating_duration_since(self.last_fired);
        if elapsed > self.interval() {
            debug!("{}: trigger after {:?}", self.name, elapsed);
            self.last_fired = now;
            self.out_trigger.write(());
        }
    }
}

impl<C: Clock + 'static> Component for TimeTrigger<C> {
    type Handler = TriggerHandler;

    fn name(&self) -> &str {
        &self.name
    }

    fn properties(&mut self) -> Vec<&mut dyn PropertyAccess> {
        vec![&mut self.time as &mut dyn PropertyAccess, &mut self.on_start]
    }

    fn prepare_interface(
        &mut self,
        iface: &mut Interface<TriggerHandler>,
    ) -> Result<(), ComponentError> {
        iface.register_stream("out_trigger", &self.out_trigger)?;
        iface.register_handler("trigger", TriggerHandler::Trigger)?;
        iface.add_dependency("trigger", None)?;
        iface.register_handler("start", TriggerHandler::Start)?;
        iface.register_handler("stop", TriggerHandler::Stop)?;
        Ok(())
    }

    fn on_init(&mut self) -> Result<(), ComponentError> {
        self.enabled = *self.on_start;
        self.last_fired = self.clock.now();
        Ok(())
    }

    fn handle(&mut self, handler: TriggerHandler) -> Result<(), ComponentError> {
        match handler {
            TriggerHandler::Trigger => self.fire_if_due(),
            TriggerHandler::Start => self.enabled = true,
            TriggerHandler::Stop => self.enabled = false,
        }
        Ok(())
    }
}
