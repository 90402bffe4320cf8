//! See [Value].
use indexmap::IndexMap;
use std::fmt::{Display, Formatter};

use crate::TagKind;

/// A dynamically-typed NBT tree.
///
/// This is what decoding into "any" produces: compounds become
/// insertion-ordered maps, lists become vectors, scalars and arrays their
/// natural Rust types. It is also a convenient way to build documents by
/// hand; see [Value::compound].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// An 8-bit signed integer.
    Byte(i8),
    /// A 16-bit signed integer.
    Short(i16),
    /// A 32-bit signed integer.
    Int(i32),
    /// A 64-bit signed integer.
    Long(i64),
    /// A 32-bit floating point number.
    Float(f32),
    /// A 64-bit floating point number.
    Double(f64),
    /// A string of characters.
    String(String),
    /// A variable-length array of 8-bit signed integers.
    ByteArray(Vec<i8>),
    /// A variable-length array of 32-bit signed integers.
    IntArray(Vec<i32>),
    /// A variable-length array of 64-bit signed integers.
    LongArray(Vec<i64>),
    /// A list of values sharing a single kind.
    List(Vec<Value>),
    /// A map of named values, ordered by insertion.
    Compound(IndexMap<String, Value>),
}

impl Default for Value {
    fn default() -> Self {
        Value::Compound(IndexMap::new())
    }
}

impl Value {
    /// The tag kind this value serializes as.
    pub fn kind(&self) -> TagKind {
        match self {
            Value::Byte(_) => TagKind::Byte,
            Value::Short(_) => TagKind::Short,
            Value::Int(_) => TagKind::Int,
            Value::Long(_) => TagKind::Long,
            Value::Float(_) => TagKind::Float,
            Value::Double(_) => TagKind::Double,
            Value::String(_) => TagKind::String,
            Value::ByteArray(_) => TagKind::ByteArray,
            Value::IntArray(_) => TagKind::IntArray,
            Value::LongArray(_) => TagKind::LongArray,
            Value::List(_) => TagKind::List,
            Value::Compound(_) => TagKind::Compound,
        }
    }

    /// Starts building a compound value.
    pub fn compound() -> Builder {
        Builder {
            entries: IndexMap::new(),
        }
    }

    /// Returns a child of a compound value by name.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Compound(map) => map.get(key),
            _ => None,
        }
    }
}

macro_rules! impl_value_accessors {
    ($(($fn_name:ident, $get_name:ident, $typ:ty, $variant:path)),* $(,)?) => {$(
        impl Value {
            #[doc = concat!("Returns the contained value if this is a ", stringify!($variant), ".")]
            pub fn $fn_name(&self) -> Option<$typ> {
                match self {
                    $variant(v) => Some(v.clone()),
                    _ => None,
                }
            }

            #[doc = concat!("Returns the child `key` of a compound if it is a ", stringify!($variant), ".")]
            pub fn $get_name(&self, key: &str) -> Option<$typ> {
                self.get(key).and_then(Value::$fn_name)
            }
        }
    )*};
}

impl_value_accessors!(
    (as_byte, get_byte, i8, Value::Byte),
    (as_short, get_short, i16, Value::Short),
    (as_int, get_int, i32, Value::Int),
    (as_long, get_long, i64, Value::Long),
    (as_float, get_float, f32, Value::Float),
    (as_double, get_double, f64, Value::Double),
    (as_string, get_string, String, Value::String),
    (as_byte_array, get_byte_array, Vec<i8>, Value::ByteArray),
    (as_int_array, get_int_array, Vec<i32>, Value::IntArray),
    (as_long_array, get_long_array, Vec<i64>, Value::LongArray),
    (as_list, get_list, Vec<Value>, Value::List),
);

impl Value {
    /// Returns a reference to the entries of a compound value.
    pub fn as_compound(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Compound(map) => Some(map),
            _ => None,
        }
    }

    /// Returns the child `key` of a compound if it is itself a compound.
    pub fn get_compound(&self, key: &str) -> Option<&IndexMap<String, Value>> {
        self.get(key).and_then(Value::as_compound)
    }
}

/// Allows for a more ergonomic way of creating compound values.
#[must_use]
#[derive(Debug, Default)]
pub struct Builder {
    entries: IndexMap<String, Value>,
}

impl Builder {
    /// Inserts a value under the provided key, replacing any previous
    /// entry with that key.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    /// Consumes the builder and returns the finished compound.
    #[must_use]
    pub fn build(self) -> Value {
        Value::Compound(self.entries)
    }
}

impl From<Builder> for Value {
    fn from(builder: Builder) -> Self {
        builder.build()
    }
}

macro_rules! impl_value_conv {
    ($(($typ:ty, $variant:path)),* $(,)?) => {$(
        impl From<$typ> for Value {
            fn from(value: $typ) -> Self {
                $variant(value)
            }
        }
    )*};
}

impl_value_conv!(
    (i8, Value::Byte),
    (i16, Value::Short),
    (i32, Value::Int),
    (i64, Value::Long),
    (f32, Value::Float),
    (f64, Value::Double),
    (String, Value::String),
    (Vec<i8>, Value::ByteArray),
    (Vec<i32>, Value::IntArray),
    (Vec<i64>, Value::LongArray),
    (Vec<Value>, Value::List),
    (IndexMap<String, Value>, Value::Compound),
);

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Byte(value as i8)
    }
}

fn fmt_seq<T: Display>(f: &mut Formatter<'_>, prefix: &str, items: &[T], suffix: &str) -> std::fmt::Result {
    write!(f, "[{prefix}")?;
    for (i, item) in items.iter().enumerate() {
        write!(f, "{item}{suffix}")?;
        if i < items.len() - 1 {
            write!(f, ", ")?;
        }
    }
    write!(f, "]")
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Byte(v) => write!(f, "{v}b"),
            Value::Short(v) => write!(f, "{v}s"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Long(v) => write!(f, "{v}L"),
            Value::Float(v) => write!(f, "{v}f"),
            Value::Double(v) => write!(f, "{v}d"),
            Value::String(v) => write!(f, "{v:?}"),
            Value::ByteArray(v) => fmt_seq(f, "B; ", v, "b"),
            Value::IntArray(v) => fmt_seq(f, "I; ", v, ""),
            Value::LongArray(v) => fmt_seq(f, "L; ", v, "L"),
            Value::List(v) => fmt_seq(f, "", v, ""),
            Value::Compound(map) => {
                write!(f, "{{")?;
                for (i, (name, value)) in map.iter().enumerate() {
                    write!(f, "{name:?}: {value}")?;
                    if i < map.len() - 1 {
                        write!(f, ", ")?;
                    }
                }
                write!(f, "}}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_and_accessors() {
        let value = Value::compound()
            .with("Difficulty", 1i8)
            .with("LevelName", "world")
            .with("seed", -6450i64)
            .with("times", vec![1i32, 2, 3])
            .build();
        assert_eq!(value.kind(), TagKind::Compound);
        assert_eq!(value.get_byte("Difficulty"), Some(1));
        assert_eq!(value.get_string("LevelName").as_deref(), Some("world"));
        assert_eq!(value.get_long("seed"), Some(-6450));
        assert_eq!(value.get_int_array("times"), Some(vec![1, 2, 3]));
        assert_eq!(value.get_byte("LevelName"), None);
        assert_eq!(value.get("missing"), None);
    }

    #[test]
    fn display_notation() {
        let value = Value::compound()
            .with("a", 1i8)
            .with("xs", vec![Value::Double(0.5), Value::Double(1.5)])
            .build();
        assert_eq!(value.to_string(), r#"{"a": 1b, "xs": [0.5d, 1.5d]}"#);
    }
}
