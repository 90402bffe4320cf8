//! The dynamic adapter: any NBT subtree in, a [Value] tree out.
use indexmap::IndexMap;
use std::sync::Arc;

use crate::adapter::{Adaptable, Adapter, AdapterRef};
use crate::engine::Engine;
use crate::err::{ErrorPath, PathPart, ReadError};
use crate::reader::TagSource;
use crate::value::Value;
use crate::writer::TagSink;
use crate::{reader, writer, TagKind};

/// Adapter for [Value]: reads whatever kind the wire presents,
/// recursively, and writes back exactly the kinds the tree holds.
#[derive(Debug, Default, Clone, Copy)]
pub struct ValueAdapter;

impl Adapter<Value> for ValueAdapter {
    fn kind(&self) -> TagKind {
        // Nominal only; the written kind follows the value itself.
        TagKind::Compound
    }

    fn write(&self, value: &Value, sink: &mut dyn TagSink) -> writer::Res {
        write_value(value, sink)
    }

    fn read(&self, source: &mut dyn TagSource) -> reader::Res<Value> {
        read_value(source)
    }
}

impl Adaptable for Value {
    fn build_adapter(_: &Engine) -> AdapterRef<Self> {
        Arc::new(ValueAdapter)
    }
}

fn write_value(value: &Value, sink: &mut dyn TagSink) -> writer::Res {
    match value {
        Value::Byte(v) => sink.write_byte(*v),
        Value::Short(v) => sink.write_short(*v),
        Value::Int(v) => sink.write_int(*v),
        Value::Long(v) => sink.write_long(*v),
        Value::Float(v) => sink.write_float(*v),
        Value::Double(v) => sink.write_double(*v),
        Value::String(v) => sink.write_string(v),
        Value::ByteArray(v) => sink.write_byte_array(v),
        Value::IntArray(v) => sink.write_int_array(v),
        Value::LongArray(v) => sink.write_long_array(v),
        Value::List(items) => {
            if items.is_empty() {
                sink.begin_list_of(0, TagKind::End)?;
            } else {
                sink.begin_list(items.len())?;
                for (i, item) in items.iter().enumerate() {
                    write_value(item, sink).map_err(|e| e.prepend(PathPart::Index(i)))?;
                }
            }
            sink.end_list()
        }
        Value::Compound(map) => {
            sink.begin_compound()?;
            for (name, item) in map {
                sink.name(name)?;
                write_value(item, sink).map_err(|e| e.prepend(PathPart::Field(name.clone())))?;
            }
            sink.end_compound()
        }
    }
}

fn read_value(source: &mut dyn TagSource) -> reader::Res<Value> {
    match source.peek()? {
        TagKind::Byte => Ok(Value::Byte(source.read_byte()?)),
        TagKind::Short => Ok(Value::Short(source.read_short()?)),
        TagKind::Int => Ok(Value::Int(source.read_int()?)),
        TagKind::Long => Ok(Value::Long(source.read_long()?)),
        TagKind::Float => Ok(Value::Float(source.read_float()?)),
        TagKind::Double => Ok(Value::Double(source.read_double()?)),
        TagKind::String => Ok(Value::String(source.read_string()?)),
        TagKind::ByteArray => Ok(Value::ByteArray(source.read_byte_array()?)),
        TagKind::IntArray => Ok(Value::IntArray(source.read_int_array()?)),
        TagKind::LongArray => Ok(Value::LongArray(source.read_long_array()?)),
        TagKind::List => {
            let len = source.begin_list()?;
            let mut items = Vec::with_capacity(len);
            for _ in 0..len {
                items.push(read_value(source)?);
            }
            source.end_list()?;
            Ok(Value::List(items))
        }
        TagKind::Compound => {
            source.begin_compound()?;
            let mut map = IndexMap::new();
            loop {
                if source.peek()? == TagKind::End {
                    break;
                }
                let name = source.name()?.to_string();
                let value = read_value(source)?;
                map.insert(name, value);
            }
            source.end_compound()?;
            Ok(Value::Compound(map))
        }
        TagKind::End => Err(ErrorPath::new_with_path(
            ReadError::CorruptData("a value cannot start with an End tag".to_string()),
            source.path(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;

    #[test]
    fn round_trips_every_kind() {
        let engine = Engine::new();
        let value = Value::compound()
            .with("b", 1i8)
            .with("s", 2i16)
            .with("i", 3i32)
            .with("l", 4i64)
            .with("f", 0.5f32)
            .with("d", 0.25f64)
            .with("str", "hello")
            .with("ba", vec![1i8, -2])
            .with("ia", vec![1i32, -2])
            .with("la", vec![1i64, -2])
            .with("list", vec![Value::Int(1), Value::Int(2)])
            .with("nested", Value::compound().with("x", 9i32))
            .with("empty", Vec::<Value>::new())
            .build();
        let bytes = engine.to_bytes(&value).unwrap();
        let back: Value = engine.from_bytes(&bytes).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn preserves_numeric_widths() {
        let engine = Engine::new();
        let value = Value::compound()
            .with("Difficulty", 1i8)
            .with("LastPlayed", 1687182273928i64)
            .with("BorderDamagePerBlock", 0.2f64)
            .build();
        let bytes = engine.to_bytes(&value).unwrap();
        let back: Value = engine.from_bytes(&bytes).unwrap();
        assert!(matches!(back.get("Difficulty"), Some(Value::Byte(1))));
        assert!(matches!(back.get("LastPlayed"), Some(Value::Long(1687182273928))));
        assert!(matches!(back.get("BorderDamagePerBlock"), Some(Value::Double(_))));
    }

    #[test]
    fn mixed_kind_lists_cannot_be_written() {
        let engine = Engine::new();
        let value = Value::List(vec![Value::Int(1), Value::Byte(2)]);
        let err = engine.to_bytes(&value).unwrap_err();
        assert!(matches!(
            err.inner,
            crate::err::WriteError::UnexpectedKind { .. }
        ));
        assert_eq!(err.path.to_string(), "[1]");
    }
}
