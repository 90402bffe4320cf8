//! Big-endian primitive and modified UTF-8 codecs shared by the reader
//! and the writer.
//!
//! NBT fixes the byte order of every numeric payload to big-endian and
//! encodes strings in the Java "modified UTF-8" variant: `U+0000` becomes
//! a two-byte sequence and supplementary code points are written as CESU-8
//! surrogate pairs. The helpers in this module are the only place where
//! raw bytes are interpreted; both state machines go through them.
use byteorder::{ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

use crate::err::{ErrorPath, ReadError, WriteError};
use crate::{reader, writer};

pub(crate) fn from_io(err: std::io::Error) -> ErrorPath<ReadError> {
    if err.kind() == std::io::ErrorKind::UnexpectedEof {
        ErrorPath::new(ReadError::UnexpectedEnd)
    } else {
        ErrorPath::new(err.into())
    }
}

macro_rules! impl_primitives {
    ($(($typ:ty, $read_name:ident, $read:ident, $write_name:ident, $write:ident)),* $(,)?) => {$(
        #[doc = concat!("Reads a big-endian `", stringify!($typ), "`.")]
        pub fn $read_name(buf: &mut impl Read) -> reader::Res<$typ> {
            buf.$read::<byteorder::BigEndian>().map_err(from_io)
        }

        #[doc = concat!("Writes a big-endian `", stringify!($typ), "`.")]
        pub fn $write_name(buf: &mut impl Write, x: $typ) -> writer::Res {
            buf.$write::<byteorder::BigEndian>(x)
                .map_err(|x| ErrorPath::new(x.into()))
        }
    )*};
}

impl_primitives!(
    (i16, read_i16, read_i16, write_i16, write_i16),
    (u16, read_u16, read_u16, write_u16, write_u16),
    (i32, read_i32, read_i32, write_i32, write_i32),
    (i64, read_i64, read_i64, write_i64, write_i64),
    (f32, read_f32, read_f32, write_f32, write_f32),
    (f64, read_f64, read_f64, write_f64, write_f64),
);

/// Reads an 8-bit unsigned integer.
pub fn read_u8(buf: &mut impl Read) -> reader::Res<u8> {
    buf.read_u8().map_err(from_io)
}

/// Reads an 8-bit signed integer.
pub fn read_i8(buf: &mut impl Read) -> reader::Res<i8> {
    buf.read_i8().map_err(from_io)
}

/// Writes an 8-bit unsigned integer.
pub fn write_u8(buf: &mut impl Write, x: u8) -> writer::Res {
    buf.write_u8(x).map_err(|x| ErrorPath::new(x.into()))
}

/// Writes an 8-bit signed integer.
pub fn write_i8(buf: &mut impl Write, x: i8) -> writer::Res {
    buf.write_i8(x).map_err(|x| ErrorPath::new(x.into()))
}

/// Reads a length-prefixed modified UTF-8 string.
pub fn read_string(buf: &mut impl Read) -> reader::Res<String> {
    let len = read_u16(buf)?;
    let mut str_buf = vec![0u8; len as usize];
    buf.read_exact(&mut str_buf).map_err(from_io)?;
    match cesu8::from_java_cesu8(&str_buf) {
        Ok(str) => Ok(str.into_owned()),
        Err(_) => Err(ErrorPath::new(ReadError::InvalidUtf8)),
    }
}

/// Writes a length-prefixed modified UTF-8 string.
pub fn write_string(buf: &mut impl Write, x: &str) -> writer::Res {
    let modified_bytes = cesu8::to_java_cesu8(x);
    if modified_bytes.len() > u16::MAX as usize {
        return Err(ErrorPath::new(WriteError::LengthOverflow {
            max: u16::MAX as usize,
            actual: modified_bytes.len(),
        }));
    }

    write_u16(buf, modified_bytes.len() as u16)?;
    buf.write_all(&modified_bytes)
        .map_err(|x| ErrorPath::new(x.into()))
}
