//! Built-in adapters: scalars, strings, arrays, sequences, mappings,
//! enums, the dynamic [crate::Value] tree, structured types and
//! polymorphic type resolution.
mod array;
mod dynamic;
mod enums;
mod map;
mod scalar;
mod seq;
pub(crate) mod resolve;
mod structure;

pub use array::{ByteArray, IntArray, LongArray};
pub use dynamic::ValueAdapter;
pub use enums::{EnumAdapter, NbtEnum};
pub use map::{MapAdapter, MapKey, Mapping};
pub use resolve::TypeResolver;
pub use scalar::{
    BoolAdapter, ByteAdapter, CharAdapter, DoubleAdapter, FloatAdapter, IntAdapter, LongAdapter,
    ShortAdapter, StringAdapter,
};
pub use seq::{BoxAdapter, SeqAdapter, Sequence};
pub use structure::{FieldBinding, StructAdapter, StructBuilder};
