#![doc = include_str!("../README.md")]
#![deny(missing_docs)]

use strum_macros::{Display, IntoStaticStr};

pub mod adapt;
pub mod adapter;
mod capture;
pub mod descriptor;
pub mod encoding;
pub mod engine;
pub mod err;
pub mod naming;
pub mod reader;
pub mod value;
pub mod writer;

pub use adapter::{Adaptable, Adapter, AdapterFactory, AdapterRef, AnyAdapter, InstanceCreator};
pub use descriptor::TypeDescriptor;
pub use engine::{Engine, EngineBuilder};
pub use naming::NamingStrategy;
pub use reader::{NbtReader, TagSource};
pub use value::Value;
pub use writer::{NbtWriter, TagSink};

/// An enum representing all possible NBT tag kinds.
///
/// The discriminant of each variant is the id byte used on the wire.
#[allow(missing_docs)]
#[repr(u8)]
#[derive(Copy, Clone, Debug, Display, IntoStaticStr, Eq, PartialEq, Hash)]
pub enum TagKind {
    End = 0,
    Byte = 1,
    Short = 2,
    Int = 3,
    Long = 4,
    Float = 5,
    Double = 6,
    ByteArray = 7,
    String = 8,
    List = 9,
    Compound = 10,
    IntArray = 11,
    LongArray = 12,
}

impl TagKind {
    /// The largest valid wire id.
    pub const MAX_ID: u8 = 12;

    /// Gets the discriminator of this kind used for encoding and decoding.
    #[inline]
    pub fn id(self) -> u8 {
        self as u8
    }

    /// Maps a wire id byte back to a kind, or `None` for ids outside `0..=12`.
    pub fn from_id(id: u8) -> Option<TagKind> {
        Some(match id {
            0 => TagKind::End,
            1 => TagKind::Byte,
            2 => TagKind::Short,
            3 => TagKind::Int,
            4 => TagKind::Long,
            5 => TagKind::Float,
            6 => TagKind::Double,
            7 => TagKind::ByteArray,
            8 => TagKind::String,
            9 => TagKind::List,
            10 => TagKind::Compound,
            11 => TagKind::IntArray,
            12 => TagKind::LongArray,
            _ => return None,
        })
    }

    /// Returns the fixed payload size in bytes for kinds that have one.
    ///
    /// Variable-length kinds (strings, arrays, lists, compounds) return
    /// `None`; `End` has an empty payload and returns `Some(0)`.
    pub fn payload_size(self) -> Option<usize> {
        match self {
            TagKind::End => Some(0),
            TagKind::Byte => Some(1),
            TagKind::Short => Some(2),
            TagKind::Int => Some(4),
            TagKind::Long => Some(8),
            TagKind::Float => Some(4),
            TagKind::Double => Some(8),
            _ => None,
        }
    }
}
