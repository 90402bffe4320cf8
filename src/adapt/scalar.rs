//! Scalar and string adapters.
use std::sync::Arc;

use crate::adapter::{Adaptable, Adapter, AdapterRef};
use crate::engine::Engine;
use crate::err::{ErrorPath, ReadError};
use crate::reader::TagSource;
use crate::writer::TagSink;
use crate::{reader, writer, TagKind};

macro_rules! numeric_adapter {
    ($(($adapter:ident, $typ:ty, $kind:path, $write_fn:ident)),* $(,)?) => {$(
        #[doc = concat!("The built-in adapter for `", stringify!($typ), "` values.")]
        #[derive(Debug, Default, Clone, Copy)]
        pub struct $adapter;

        impl Adapter<$typ> for $adapter {
            fn kind(&self) -> TagKind {
                $kind
            }

            fn write(&self, value: &$typ, sink: &mut dyn TagSink) -> writer::Res {
                sink.$write_fn(*value)
            }

            fn read(&self, source: &mut dyn TagSource) -> reader::Res<$typ> {
                // Numeric decoding is lenient: any numeric kind narrows
                // into the target, strings go through a textual parse.
                match source.peek()? {
                    TagKind::Byte => Ok(source.read_byte()? as $typ),
                    TagKind::Short => Ok(source.read_short()? as $typ),
                    TagKind::Int => Ok(source.read_int()? as $typ),
                    TagKind::Long => Ok(source.read_long()? as $typ),
                    TagKind::Float => Ok(source.read_float()? as $typ),
                    TagKind::Double => Ok(source.read_double()? as $typ),
                    TagKind::String => {
                        let path = source.path();
                        let text = source.read_string()?;
                        let trimmed = text.trim();
                        trimmed
                            .parse::<$typ>()
                            .or_else(|_| trimmed.parse::<f64>().map(|v| v as $typ))
                            .map_err(|_| {
                                ErrorPath::new_with_path(
                                    ReadError::CorruptData(format!(
                                        concat!("cannot parse {:?} as ", stringify!($typ)),
                                        trimmed
                                    )),
                                    path,
                                )
                            })
                    }
                    found => Err(ErrorPath::new_with_path(
                        ReadError::UnexpectedKind {
                            expected: $kind,
                            found,
                        },
                        source.path(),
                    )),
                }
            }
        }

        impl Adaptable for $typ {
            fn build_adapter(_: &Engine) -> AdapterRef<Self> {
                Arc::new($adapter)
            }
        }
    )*};
}

numeric_adapter!(
    (ByteAdapter, i8, TagKind::Byte, write_byte),
    (ShortAdapter, i16, TagKind::Short, write_short),
    (IntAdapter, i32, TagKind::Int, write_int),
    (LongAdapter, i64, TagKind::Long, write_long),
    (FloatAdapter, f32, TagKind::Float, write_float),
    (DoubleAdapter, f64, TagKind::Double, write_double),
);

/// The built-in adapter for `bool` values, stored as a Byte where zero is
/// `false` and anything else is `true`.
#[derive(Debug, Default, Clone, Copy)]
pub struct BoolAdapter;

impl Adapter<bool> for BoolAdapter {
    fn kind(&self) -> TagKind {
        TagKind::Byte
    }

    fn write(&self, value: &bool, sink: &mut dyn TagSink) -> writer::Res {
        sink.write_byte(*value as i8)
    }

    fn read(&self, source: &mut dyn TagSource) -> reader::Res<bool> {
        match source.peek()? {
            TagKind::Byte => Ok(source.read_byte()? != 0),
            TagKind::Short => Ok(source.read_short()? != 0),
            TagKind::Int => Ok(source.read_int()? != 0),
            TagKind::Long => Ok(source.read_long()? != 0),
            TagKind::Float => Ok(source.read_float()? != 0.0),
            TagKind::Double => Ok(source.read_double()? != 0.0),
            TagKind::String => {
                let path = source.path();
                let text = source.read_string()?;
                let trimmed = text.trim();
                trimmed
                    .parse::<bool>()
                    .or_else(|_| trimmed.parse::<f64>().map(|v| v != 0.0))
                    .map_err(|_| {
                        ErrorPath::new_with_path(
                            ReadError::CorruptData(format!("cannot parse {trimmed:?} as bool")),
                            path,
                        )
                    })
            }
            found => Err(ErrorPath::new_with_path(
                ReadError::UnexpectedKind {
                    expected: TagKind::Byte,
                    found,
                },
                source.path(),
            )),
        }
    }
}

impl Adaptable for bool {
    fn build_adapter(_: &Engine) -> AdapterRef<Self> {
        Arc::new(BoolAdapter)
    }
}

/// The built-in adapter for `char` values, stored as a Short carrying the
/// UTF-16 code unit.
#[derive(Debug, Default, Clone, Copy)]
pub struct CharAdapter;

impl CharAdapter {
    fn from_code(code: u32, path: crate::err::Path) -> reader::Res<char> {
        char::from_u32(code).ok_or_else(|| {
            ErrorPath::new_with_path(
                ReadError::CorruptData(format!("{code:#x} is not a valid character")),
                path,
            )
        })
    }
}

impl Adapter<char> for CharAdapter {
    fn kind(&self) -> TagKind {
        TagKind::Short
    }

    fn write(&self, value: &char, sink: &mut dyn TagSink) -> writer::Res {
        sink.write_short(*value as u32 as i16)
    }

    fn read(&self, source: &mut dyn TagSource) -> reader::Res<char> {
        match source.peek()? {
            TagKind::Short => {
                let path = source.path();
                let code = source.read_short()? as u16 as u32;
                Self::from_code(code, path)
            }
            TagKind::Int => {
                let path = source.path();
                let code = source.read_int()? as u32;
                Self::from_code(code, path)
            }
            TagKind::String => {
                let path = source.path();
                let text = source.read_string()?;
                let mut chars = text.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(c),
                    _ => Err(ErrorPath::new_with_path(
                        ReadError::CorruptData(format!(
                            "expected a single character, got {text:?}"
                        )),
                        path,
                    )),
                }
            }
            found => Err(ErrorPath::new_with_path(
                ReadError::UnexpectedKind {
                    expected: TagKind::Short,
                    found,
                },
                source.path(),
            )),
        }
    }
}

impl Adaptable for char {
    fn build_adapter(_: &Engine) -> AdapterRef<Self> {
        Arc::new(CharAdapter)
    }
}

/// The built-in adapter for owned strings.
#[derive(Debug, Default, Clone, Copy)]
pub struct StringAdapter;

impl Adapter<String> for StringAdapter {
    fn kind(&self) -> TagKind {
        TagKind::String
    }

    fn write(&self, value: &String, sink: &mut dyn TagSink) -> writer::Res {
        sink.write_string(value)
    }

    fn read(&self, source: &mut dyn TagSource) -> reader::Res<String> {
        // String decoding accepts numeric kinds through formatting.
        match source.peek()? {
            TagKind::String => source.read_string(),
            TagKind::Byte => Ok(source.read_byte()?.to_string()),
            TagKind::Short => Ok(source.read_short()?.to_string()),
            TagKind::Int => Ok(source.read_int()?.to_string()),
            TagKind::Long => Ok(source.read_long()?.to_string()),
            TagKind::Float => Ok(source.read_float()?.to_string()),
            TagKind::Double => Ok(source.read_double()?.to_string()),
            found => Err(ErrorPath::new_with_path(
                ReadError::UnexpectedKind {
                    expected: TagKind::String,
                    found,
                },
                source.path(),
            )),
        }
    }
}

impl Adaptable for String {
    fn build_adapter(_: &Engine) -> AdapterRef<Self> {
        Arc::new(StringAdapter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;

    #[test]
    fn narrowing_and_widening_reads() {
        let engine = Engine::new();
        // An i32 on the wire decodes into i64, f64 and i8.
        let bytes = engine.to_bytes(&1034i32).unwrap();
        assert_eq!(engine.from_bytes::<i64>(&bytes).unwrap(), 1034);
        assert_eq!(engine.from_bytes::<f64>(&bytes).unwrap(), 1034.0);
        assert_eq!(engine.from_bytes::<i8>(&bytes).unwrap(), 1034i32 as i8);
    }

    #[test]
    fn strings_parse_as_numbers_and_back() {
        let engine = Engine::new();
        let bytes = engine.to_bytes(&"-42.5".to_string()).unwrap();
        assert_eq!(engine.from_bytes::<f32>(&bytes).unwrap(), -42.5);
        assert_eq!(engine.from_bytes::<i32>(&bytes).unwrap(), -42);

        let bytes = engine.to_bytes(&123i32).unwrap();
        assert_eq!(engine.from_bytes::<String>(&bytes).unwrap(), "123");
    }

    #[test]
    fn bools_are_bytes() {
        let engine = Engine::new();
        let bytes = engine.to_bytes(&true).unwrap();
        assert_eq!(engine.from_bytes::<i8>(&bytes).unwrap(), 1);
        assert!(engine.from_bytes::<bool>(&bytes).unwrap());
        let bytes = engine.to_bytes(&0i32).unwrap();
        assert!(!engine.from_bytes::<bool>(&bytes).unwrap());
    }

    #[test]
    fn chars_are_shorts() {
        let engine = Engine::new();
        let bytes = engine.to_bytes(&'ß').unwrap();
        assert_eq!(engine.from_bytes::<i16>(&bytes).unwrap(), 'ß' as u32 as i16);
        assert_eq!(engine.from_bytes::<char>(&bytes).unwrap(), 'ß');
    }

    #[test]
    fn unparsable_string_is_corrupt_data() {
        let engine = Engine::new();
        let bytes = engine.to_bytes(&"not a number".to_string()).unwrap();
        let err = engine.from_bytes::<i32>(&bytes).unwrap_err();
        assert!(matches!(err.inner, crate::err::ReadError::CorruptData(_)));
    }
}
