//! Numeric array values and their adapters.
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use crate::adapter::{Adaptable, Adapter, AdapterRef};
use crate::engine::Engine;
use crate::err::{ErrorPath, ReadError};
use crate::reader::TagSource;
use crate::writer::TagSink;
use crate::{reader, writer, TagKind};

/// A variable-length array of 8-bit signed integers, serialized with the
/// ByteArray wire kind (a `Vec<i8>` serializes as a List of Bytes).
#[derive(Default, Debug, Clone, Eq, PartialEq)]
pub struct ByteArray(pub Vec<i8>);

/// A variable-length array of 32-bit signed integers, serialized with the
/// IntArray wire kind.
#[derive(Default, Debug, Clone, Eq, PartialEq)]
pub struct IntArray(pub Vec<i32>);

/// A variable-length array of 64-bit signed integers, serialized with the
/// LongArray wire kind.
#[derive(Default, Debug, Clone, Eq, PartialEq)]
pub struct LongArray(pub Vec<i64>);

macro_rules! impl_array_conv {
    ($(($typ:ty, $newtyp:path)),* $(,)?) => {$(
        impl From<$typ> for $newtyp {
            fn from(value: $typ) -> Self {
                $newtyp(value)
            }
        }

        impl From<$newtyp> for $typ {
            fn from(value: $newtyp) -> Self {
                value.0
            }
        }

        impl Deref for $newtyp {
            type Target = $typ;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl DerefMut for $newtyp {
            fn deref_mut(&mut self) -> &mut Self::Target {
                &mut self.0
            }
        }
    )*};
}

impl_array_conv!(
    (Vec<i8>, ByteArray),
    (Vec<i32>, IntArray),
    (Vec<i64>, LongArray),
);

macro_rules! array_adapter {
    ($(($adapter:ident, $newtyp:ident, $kind:path,
        $read_whole:ident, $read_one:ident, $write_whole:ident)),* $(,)?) => {$(
        #[derive(Debug, Default, Clone, Copy)]
        struct $adapter;

        impl Adapter<$newtyp> for $adapter {
            fn kind(&self) -> TagKind {
                $kind
            }

            fn write(&self, value: &$newtyp, sink: &mut dyn TagSink) -> writer::Res {
                sink.$write_whole(&value.0)
            }

            fn read(&self, source: &mut dyn TagSource) -> reader::Res<$newtyp> {
                match source.peek()? {
                    $kind => Ok($newtyp(source.$read_whole()?)),
                    // A list whose elements match the component kind is
                    // accepted in place of the packed array form.
                    TagKind::List => {
                        let len = source.begin_list()?;
                        let mut values = Vec::with_capacity(len);
                        for _ in 0..len {
                            values.push(source.$read_one()?);
                        }
                        source.end_list()?;
                        Ok($newtyp(values))
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

        impl Adaptable for $newtyp {
            fn build_adapter(_: &Engine) -> AdapterRef<Self> {
                Arc::new($adapter)
            }
        }
    )*};
}

array_adapter!(
    (
        ByteArrayAdapter,
        ByteArray,
        TagKind::ByteArray,
        read_byte_array,
        read_byte,
        write_byte_array
    ),
    (
        IntArrayAdapter,
        IntArray,
        TagKind::IntArray,
        read_int_array,
        read_int,
        write_int_array
    ),
    (
        LongArrayAdapter,
        LongArray,
        TagKind::LongArray,
        read_long_array,
        read_long,
        write_long_array
    ),
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;

    #[test]
    fn arrays_round_trip() {
        let engine = Engine::new();
        let input = IntArray(vec![0, -10342, 30, 20, 3, -4]);
        let bytes = engine.to_bytes(&input).unwrap();
        assert_eq!(engine.from_bytes::<IntArray>(&bytes).unwrap(), input);
    }

    #[test]
    fn arrays_accept_matching_lists() {
        let engine = Engine::new();
        // A List<Long> decodes into a LongArray.
        let bytes = engine.to_bytes(&vec![1i64, 2, 3]).unwrap();
        let back: LongArray = engine.from_bytes(&bytes).unwrap();
        assert_eq!(back.0, [1, 2, 3]);
    }

    #[test]
    fn mismatched_array_kind_is_rejected() {
        let engine = Engine::new();
        let bytes = engine.to_bytes(&ByteArray(vec![1, 2])).unwrap();
        let err = engine.from_bytes::<IntArray>(&bytes).unwrap_err();
        assert!(matches!(
            err.inner,
            ReadError::UnexpectedKind {
                expected: TagKind::IntArray,
                found: TagKind::ByteArray
            }
        ));
    }
}
