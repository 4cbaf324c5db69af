//! Enumerated property values.
//!
//! [`enum_translator!`](crate::enum_translator) declares a plain Rust enum
//! together with an explicit table mapping every variant to a label and an
//! integer code. The generated type implements
//! [`PropertyType`](crate::PropertyType), so a `Property<MyEnum>` accepts the
//! label (case-insensitive) or the integer code from configuration.

/// Declare a translated enumeration.
///
/// ```
/// framewire_core::enum_translator! {
///     /// Resampling filter.
///     pub enum Filter {
///         Nearest = ("NEAREST", 0),
///         Linear = ("LINEAR", 1),
///     }
/// }
///
/// assert_eq!(Filter::from_label("linear"), Some(Filter::Linear));
/// assert_eq!(Filter::from_code(0), Some(Filter::Nearest));
/// assert_eq!(Filter::Linear.label(), "LINEAR");
/// ```
#[macro_export]
macro_rules! enum_translator {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($variant:ident = ($label:literal, $code:literal)),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        $vis enum $name {
            $($variant),+
        }

        impl $name {
            /// Every variant with its label and integer code.
            pub const TABLE: &'static [($name, &'static str, i64)] =
                &[$(($name::$variant, $label, $code)),+];

            pub fn from_label(label: &str) -> Option<Self> {
                let label = label.trim();
                Self::TABLE
                    .iter()
                    .find(|(_, l, _)| l.eq_ignore_ascii_case(label))
                    .map(|(v, _, _)| *v)
            }

            pub fn from_code(code: i64) -> Option<Self> {
                Self::TABLE
                    .iter()
                    .find(|(_, _, c)| *c == code)
                    .map(|(v, _, _)| *v)
            }

            pub fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }

            pub fn code(self) -> i64 {
                match self {
                    $($name::$variant => $code),+
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.label())
            }
        }

        impl $crate::PropertyType for $name {
            const TYPE_NAME: &'static str = stringify!($name);

            fn from_json(value: &$crate::__private::Value) -> Option<Self> {
                match value {
                    $crate::__private::Value::String(s) => Self::from_label(s)
                        .or_else(|| s.trim().parse::<i64>().ok().and_then(Self::from_code)),
                    $crate::__private::Value::Number(n) => n.as_i64().and_then(Self::from_code),
                    _ => None,
                }
            }

            fn to_json(&self) -> $crate::__private::Value {
                $crate::__private::Value::String(self.label().to_string())
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::{Property, PropertyAccess, PropertyError};
    use serde_json::json;

    crate::enum_translator! {
        enum Mode {
            Fast = ("FAST", 0),
            Exact = ("EXACT", 7),
        }
    }

    #[test]
    fn table_is_bidirectional() {
        for (variant, label, code) in Mode::TABLE {
            assert_eq!(Mode::from_label(label), Some(*variant));
            assert_eq!(Mode::from_code(*code), Some(*variant));
            assert_eq!(variant.label(), *label);
            assert_eq!(variant.code(), *code);
        }
        assert_eq!(Mode::from_code(3), None);
        assert_eq!(Mode::from_label("slow"), None);
    }

    #[test]
    fn property_accepts_label_or_code() {
        let mut p = Property::new("mode", Mode::Fast);
        assert_eq!(p.set_json(&json!("exact")), Ok(true));
        assert_eq!(*p, Mode::Exact);
        assert_eq!(p.set_json(&json!(0)), Ok(true));
        assert_eq!(*p, Mode::Fast);
        assert_eq!(p.set_json(&json!("7")), Ok(true));
        assert_eq!(p.value_json(), json!("EXACT"));
        assert!(matches!(
            p.set_json(&json!("LANCZOS")),
            Err(PropertyError::InvalidValue { .. })
        ));
    }
}
