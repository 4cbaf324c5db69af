//! Typed data stream ports.
//!
//! Ports are cheap handles around shared buffers: a component keeps one
//! clone in its fields and registers another with its [`Interface`], which is
//! how the host reaches it for wiring and dependency tracking.
//!
//! Input ports keep only the newest value. Every delivery bumps a sequence
//! counter; hosts compare it against the last sequence a handler saw to
//! decide whether the handler has fresh data.
//!
//! [`Interface`]: crate::Interface

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Direction of a port as seen from the owning component.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Input,
    Output,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Input => f.write_str("input"),
            Direction::Output => f.write_str("output"),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    #[error("cannot connect {from} to {to}: expected an output and an input")]
    Direction { from: Direction, to: Direction },
    #[error("cannot connect `{from}` output to `{to}` input: payload types differ")]
    TypeMismatch {
        from: &'static str,
        to: &'static str,
    },
}

/// Object-safe view of a port, used by hosts.
pub trait StreamPort: Send + Sync {
    fn direction(&self) -> Direction;

    /// Payload type name, for diagnostics and listings.
    fn type_name(&self) -> &'static str;

    /// Number of values delivered to this port so far (always 0 for outputs).
    fn sequence(&self) -> u64;

    /// Connect this output to `input`. Inputs reject the call.
    fn connect_to(&self, input: &dyn StreamPort) -> Result<(), StreamError>;

    fn as_any(&self) -> &dyn Any;
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

struct InBuffer<T> {
    value: Option<T>,
    sequence: u64,
}

/// Input port holding the newest delivered value.
pub struct DataStreamIn<T> {
    buffer: Arc<Mutex<InBuffer<T>>>,
}

impl<T> Clone for DataStreamIn<T> {
    fn clone(&self) -> Self {
        Self {
            buffer: Arc::clone(&self.buffer),
        }
    }
}

impl<T> Default for DataStreamIn<T> {
    fn default() -> Self {
        Self {
            buffer: Arc::new(Mutex::new(InBuffer {
                value: None,
                sequence: 0,
            })),
        }
    }
}

impl<T> fmt::Debug for DataStreamIn<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let buf = lock(&self.buffer);
        f.debug_struct("DataStreamIn")
            .field("type", &std::any::type_name::<T>())
            .field("filled", &buf.value.is_some())
            .field("sequence", &buf.sequence)
            .finish()
    }
}

impl<T: Send + 'static> DataStreamIn<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value`, replacing any unread one.
    pub fn deliver(&self, value: T) {
        let mut buf = lock(&self.buffer);
        buf.value = Some(value);
        buf.sequence += 1;
    }

    /// Take the buffered value, leaving the port empty.
    pub fn read(&self) -> Option<T> {
        lock(&self.buffer).value.take()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.buffer).value.is_none()
    }

    pub fn sequence(&self) -> u64 {
        lock(&self.buffer).sequence
    }
}

impl<T: Send + 'static> StreamPort for DataStreamIn<T> {
    fn direction(&self) -> Direction {
        Direction::Input
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn sequence(&self) -> u64 {
        DataStreamIn::sequence(self)
    }

    fn connect_to(&self, input: &dyn StreamPort) -> Result<(), StreamError> {
        Err(StreamError::Direction {
            from: Direction::Input,
            to: input.direction(),
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Output port fanning every written value out to its connected inputs.
pub struct DataStreamOut<T> {
    sinks: Arc<Mutex<Vec<DataStreamIn<T>>>>,
}

impl<T> Clone for DataStreamOut<T> {
    fn clone(&self) -> Self {
        Self {
            sinks: Arc::clone(&self.sinks),
        }
    }
}

impl<T> Default for DataStreamOut<T> {
    fn default() -> Self {
        Self {
            sinks: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<T> fmt::Debug for DataStreamOut<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataStreamOut")
            .field("type", &std::any::type_name::<T>())
            .field("connections", &lock(&self.sinks).len())
            .finish()
    }
}

impl<T: Clone + Send + 'static> DataStreamOut<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect(&self, input: &DataStreamIn<T>) {
        lock(&self.sinks).push(input.clone());
    }

    pub fn connections(&self) -> usize {
        lock(&self.sinks).len()
    }

    /// Deliver `value` to every connected input. Unconnected writes are dropped.
    pub fn write(&self, value: T) {
        let sinks = lock(&self.sinks);
        if let Some((last, rest)) = sinks.split_last() {
            for sink in rest {
                sink.deliver(value.clone());
            }
            last.deliver(value);
        }
    }
}

impl<T: Clone + Send + 'static> StreamPort for DataStreamOut<T> {
    fn direction(&self) -> Direction {
        Direction::Output
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn sequence(&self) -> u64 {
        0
    }

    fn connect_to(&self, input: &dyn StreamPort) -> Result<(), StreamError> {
        if input.direction() != Direction::Input {
            return Err(StreamError::Direction {
                from: Direction::Output,
                to: input.direction(),
            });
        }
        let Some(typed) = input.as_any().downcast_ref::<DataStreamIn<T>>() else {
            return Err(StreamError::TypeMismatch {
                from: self.type_name(),
                to: input.type_name(),
            });
        };
        self.connect(typed);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_keeps_newest_and_read_takes_ownership() {
        let port = DataStreamIn::<u32>::new();
        assert!(port.is_empty());
        port.deliver(1);
        port.deliver(2);
        assert_eq!(port.sequence(), 2);
        assert_eq!(port.read(), Some(2));
        assert!(port.is_empty());
        assert_eq!(port.read(), None);
    }

    #[test]
    fn output_fans_out_to_all_inputs() {
        let out = DataStreamOut::<String>::new();
        let a = DataStreamIn::new();
        let b = DataStreamIn::new();
        out.connect(&a);
        out.connect(&b);
        out.write("frame".to_string());
        assert_eq!(a.read().as_deref(), Some("frame"));
        assert_eq!(b.read().as_deref(), Some("frame"));
    }

    #[test]
    fn erased_connect_checks_type_and_direction() {
        let out = DataStreamOut::<()>::new();
        let unit_in = DataStreamIn::<()>::new();
        let text_in = DataStreamIn::<String>::new();

        assert!(out.connect_to(&unit_in).is_ok());
        assert!(matches!(
            out.connect_to(&text_in),
            Err(StreamError::TypeMismatch { .. })
        ));
        assert!(matches!(
            unit_in.connect_to(&out),
            Err(StreamError::Direction { .. })
        ));

        out.write(());
        assert_eq!(StreamPort::sequence(&unit_in), 1);
    }
}
