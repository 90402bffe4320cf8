//! Enum adapters: variants serialized by name, decoded by name or by
//! declaration-order ordinal.
use std::marker::PhantomData;

use crate::adapter::Adapter;
use crate::err::{ErrorPath, ReadError};
use crate::reader::TagSource;
use crate::writer::TagSink;
use crate::{reader, writer, TagKind};

/// The bridge between user enums and the engine.
///
/// Implemented by [crate::impl_nbt_enum!] on top of strum's `EnumIter`
/// and `IntoStaticStr` derives; the ordinal is the variant's position in
/// declaration order.
pub trait NbtEnum: Copy + Send + Sync + 'static {
    /// The symbolic name of this variant.
    fn name(self) -> &'static str;
    /// Finds a variant by its exact symbolic name.
    fn from_name(name: &str) -> Option<Self>;
    /// Finds a variant by its declaration-order ordinal.
    fn from_ordinal(ordinal: usize) -> Option<Self>;
}

/// Adapter for enums: a String of the variant name on the wire, with any
/// integer kind accepted as an ordinal when reading.
pub struct EnumAdapter<T>(PhantomData<fn() -> T>);

impl<T> Default for EnumAdapter<T> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<T: NbtEnum> Adapter<T> for EnumAdapter<T> {
    fn kind(&self) -> TagKind {
        TagKind::String
    }

    fn write(&self, value: &T, sink: &mut dyn TagSink) -> writer::Res {
        sink.write_string(value.name())
    }

    fn read(&self, source: &mut dyn TagSource) -> reader::Res<T> {
        let path = source.path();
        let ordinal = match source.peek()? {
            TagKind::String => {
                let name = source.read_string()?;
                return T::from_name(&name).ok_or_else(|| {
                    ErrorPath::new_with_path(ReadError::InvalidEnumValue(name), path)
                });
            }
            TagKind::Byte => source.read_byte()? as i64,
            TagKind::Short => source.read_short()? as i64,
            TagKind::Int => source.read_int()? as i64,
            TagKind::Long => source.read_long()?,
            found => {
                return Err(ErrorPath::new_with_path(
                    ReadError::UnexpectedKind {
                        expected: TagKind::String,
                        found,
                    },
                    path,
                ))
            }
        };
        usize::try_from(ordinal)
            .ok()
            .and_then(T::from_ordinal)
            .ok_or_else(|| {
                ErrorPath::new_with_path(ReadError::InvalidEnumValue(ordinal.to_string()), path)
            })
    }
}

/// Wires an enum into the engine: implements [NbtEnum],
/// [crate::Adaptable] and [crate::adapt::MapKey] for it.
///
/// The enum must be `Copy` and derive strum's `EnumIter` and
/// `IntoStaticStr`:
///
/// ```
/// use cobalt_nbt::impl_nbt_enum;
/// use strum_macros::{EnumIter, IntoStaticStr};
///
/// #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, EnumIter, IntoStaticStr)]
/// enum Difficulty {
///     Peaceful,
///     Easy,
///     Normal,
///     Hard,
/// }
///
/// impl_nbt_enum!(Difficulty);
/// ```
#[macro_export]
macro_rules! impl_nbt_enum {
    ($typ:ty) => {
        impl $crate::adapt::NbtEnum for $typ {
            fn name(self) -> &'static str {
                self.into()
            }

            fn from_name(name: &str) -> ::std::option::Option<Self> {
                <Self as ::strum::IntoEnumIterator>::iter()
                    .find(|v| <&'static str>::from(*v) == name)
            }

            fn from_ordinal(ordinal: usize) -> ::std::option::Option<Self> {
                <Self as ::strum::IntoEnumIterator>::iter().nth(ordinal)
            }
        }

        impl $crate::Adaptable for $typ {
            fn build_adapter(_: &$crate::Engine) -> $crate::AdapterRef<Self> {
                ::std::sync::Arc::new(<$crate::adapt::EnumAdapter<Self>>::default())
            }
        }

        impl $crate::adapt::MapKey for $typ {
            fn to_name(&self) -> ::std::string::String {
                $crate::adapt::NbtEnum::name(*self).to_string()
            }

            fn from_name(name: &str) -> $crate::reader::Res<Self> {
                <Self as $crate::adapt::NbtEnum>::from_name(name).ok_or_else(|| {
                    $crate::err::ErrorPath::new($crate::err::ReadError::InvalidEnumValue(
                        name.to_string(),
                    ))
                })
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::engine::Engine;
    use crate::err::ReadError;
    use strum_macros::{EnumIter, IntoStaticStr};

    #[allow(non_camel_case_types)]
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, EnumIter, IntoStaticStr)]
    enum TestEnum {
        TEST1,
        SOME_TEST,
        ABC,
    }

    impl_nbt_enum!(TestEnum);

    #[test]
    fn serializes_as_variant_name() {
        let engine = Engine::new();
        let bytes = engine.to_bytes(&TestEnum::SOME_TEST).unwrap();
        assert_eq!(
            engine.from_bytes::<String>(&bytes).unwrap(),
            "SOME_TEST"
        );
        assert_eq!(engine.from_bytes::<TestEnum>(&bytes).unwrap(), TestEnum::SOME_TEST);
    }

    #[test]
    fn ordinals_decode_in_declaration_order() {
        let engine = Engine::new();
        let bytes = engine.to_bytes(&2i32).unwrap();
        assert_eq!(engine.from_bytes::<TestEnum>(&bytes).unwrap(), TestEnum::ABC);
        let bytes = engine.to_bytes(&0i8).unwrap();
        assert_eq!(engine.from_bytes::<TestEnum>(&bytes).unwrap(), TestEnum::TEST1);
    }

    #[test]
    fn unknown_names_and_ordinals_fail() {
        let engine = Engine::new();
        let bytes = engine.to_bytes(&"NOPE".to_string()).unwrap();
        let err = engine.from_bytes::<TestEnum>(&bytes).unwrap_err();
        assert!(matches!(err.inner, ReadError::InvalidEnumValue(_)));

        let bytes = engine.to_bytes(&3i32).unwrap();
        let err = engine.from_bytes::<TestEnum>(&bytes).unwrap_err();
        assert!(matches!(err.inner, ReadError::InvalidEnumValue(_)));

        let bytes = engine.to_bytes(&(-1i32)).unwrap();
        let err = engine.from_bytes::<TestEnum>(&bytes).unwrap_err();
        assert!(matches!(err.inner, ReadError::InvalidEnumValue(_)));
    }
}
