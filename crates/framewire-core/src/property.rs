//! Typed component properties.
//!
//! A [`Property`] is a named configuration value with a default. Hosts see
//! properties only through the object-safe [`PropertyAccess`] trait, which
//! converts from and to `serde_json::Value` so that pipeline files can carry
//! either native JSON scalars or strings.

use std::fmt;
use std::ops::Deref;

use serde::Serialize;
use serde_json::Value;

/// Errors raised while assigning property values.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PropertyError {
    #[error("unknown property `{0}`")]
    Unknown(String),
    #[error("property `{name}` expects {expected}, got {got}")]
    InvalidValue {
        name: String,
        expected: &'static str,
        got: String,
    },
    #[error("property `{0}` cannot change after interface preparation")]
    Locked(String),
}

/// A value type that can live inside a [`Property`].
pub trait PropertyType: Clone + fmt::Debug + PartialEq + Send + 'static {
    /// Human readable type name, used in error messages and listings.
    const TYPE_NAME: &'static str;

    /// Parse a configuration value. Strings are accepted for every type.
    fn from_json(value: &Value) -> Option<Self>;

    fn to_json(&self) -> Value;
}

macro_rules! integer_property {
    ($($t:ty => $name:literal),* $(,)?) => {$(
        impl PropertyType for $t {
            const TYPE_NAME: &'static str = $name;

            fn from_json(value: &Value) -> Option<Self> {
                match value {
                    Value::Number(n) => n
                        .as_i64()
                        .and_then(|v| <$t>::try_from(v).ok())
                        .or_else(|| n.as_u64().and_then(|v| <$t>::try_from(v).ok())),
                    Value::String(s) => s.trim().parse().ok(),
                    _ => None,
                }
            }

            fn to_json(&self) -> Value {
                Value::from(*self)
            }
        }
    )*};
}

integer_property!(
    i32 => "i32",
    i64 => "i64",
    u32 => "u32",
    u64 => "u64",
    usize => "usize",
);

macro_rules! float_property {
    ($($t:ty => $name:literal),* $(,)?) => {$(
        impl PropertyType for $t {
            const TYPE_NAME: &'static str = $name;

            fn from_json(value: &Value) -> Option<Self> {
                match value {
                    Value::Number(n) => n.as_f64().map(|v| v as $t),
                    Value::String(s) => s.trim().parse().ok(),
                    _ => None,
                }
            }

            fn to_json(&self) -> Value {
                Value::from(*self)
            }
        }
    )*};
}

float_property!(f32 => "f32", f64 => "f64");

impl PropertyType for bool {
    const TYPE_NAME: &'static str = "bool";

    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => n.as_i64().map(|v| v != 0),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Some(true),
                "false" | "0" | "no" | "off" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    fn to_json(&self) -> Value {
        Value::Bool(*self)
    }
}

impl PropertyType for String {
    const TYPE_NAME: &'static str = "string";

    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    fn to_json(&self) -> Value {
        Value::String(self.clone())
    }
}

/// Named, typed configuration value owned by a component.
#[derive(Clone, Debug)]
pub struct Property<T> {
    name: String,
    value: T,
    default: T,
    constant: bool,
}

impl<T: PropertyType> Property<T> {
    pub fn new(name: impl Into<String>, default: T) -> Self {
        Self {
            name: name.into(),
            value: default.clone(),
            default,
            constant: false,
        }
    }

    /// Mark the property as fixed once the component interface is prepared.
    pub fn constant(mut self) -> Self {
        self.constant = true;
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn get(&self) -> &T {
        &self.value
    }

    #[inline]
    pub fn default_value(&self) -> &T {
        &self.default
    }

    /// Assign a new value. Returns `true` when the value actually changed.
    pub fn set(&mut self, value: T) -> bool {
        if self.value == value {
            return false;
        }
        self.value = value;
        true
    }

    pub fn reset(&mut self) {
        self.value = self.default.clone();
    }
}

impl<T> Deref for Property<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

/// Type-erased view of a [`Property`], used by hosts.
pub trait PropertyAccess {
    fn name(&self) -> &str;
    fn type_name(&self) -> &'static str;
    fn is_constant(&self) -> bool;
    fn value_json(&self) -> Value;

    /// Parse and assign a value. Returns `true` when the value changed.
    fn set_json(&mut self, value: &Value) -> Result<bool, PropertyError>;
}

impl<T: PropertyType> PropertyAccess for Property<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn type_name(&self) -> &'static str {
        T::TYPE_NAME
    }

    fn is_constant(&self) -> bool {
        self.constant
    }

    fn value_json(&self) -> Value {
        self.value.to_json()
    }

    fn set_json(&mut self, value: &Value) -> Result<bool, PropertyError> {
        let parsed = T::from_json(value).ok_or_else(|| PropertyError::InvalidValue {
            name: self.name.clone(),
            expected: T::TYPE_NAME,
            got: value.to_string(),
        })?;
        Ok(self.set(parsed))
    }
}

/// Snapshot of one property, suitable for listings and reports.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PropertyInfo {
    pub name: String,
    pub type_name: &'static str,
    pub value: Value,
    pub constant: bool,
}

impl PropertyInfo {
    pub fn from_access(p: &dyn PropertyAccess) -> Self {
        Self {
            name: p.name().to_string(),
            type_name: p.type_name(),
            value: p.value_json(),
            constant: p.is_constant(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_reports_changes_only() {
        let mut p = Property::new("count", 1usize);
        assert!(!p.set(1));
        assert!(p.set(3));
        assert_eq!(*p, 3);
        p.reset();
        assert_eq!(*p.get(), 1);
    }

    #[test]
    fn json_and_string_values_are_accepted() {
        let mut p = Property::new("time", 1000u64);
        assert_eq!(p.set_json(&json!(250)), Ok(true));
        assert_eq!(p.set_json(&json!(" 500 ")), Ok(true));
        assert_eq!(*p, 500);

        let mut b = Property::new("auto_trigger", false);
        assert_eq!(b.set_json(&json!("true")), Ok(true));
        assert_eq!(b.set_json(&json!(0)), Ok(true));
        assert!(!*b);

        let mut s = Property::new("directory", String::from("."));
        assert_eq!(s.set_json(&json!("/tmp")), Ok(true));
        assert_eq!(s.value_json(), json!("/tmp"));
    }

    #[test]
    fn invalid_values_name_the_property() {
        let mut p = Property::new("digits", 2u32);
        let err = p.set_json(&json!(-4)).unwrap_err();
        assert_eq!(
            err,
            PropertyError::InvalidValue {
                name: "digits".into(),
                expected: "u32",
                got: "-4".into(),
            }
        );
        assert_eq!(*p, 2);
    }

    #[test]
    fn info_snapshot_reflects_flags() {
        let p = Property::new("count", 2usize).constant();
        let info = PropertyInfo::from_access(&p);
        assert_eq!(info.name, "count");
        assert_eq!(info.type_name, "usize");
        assert_eq!(info.value, json!(2));
        assert!(info.constant);
    }
}
