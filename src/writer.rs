//! See [NbtWriter].
use std::io::Write;

use crate::encoding;
use crate::err::{ErrorPath, WriteError};
use crate::reader::Scope;
use crate::TagKind;

/// A short notation for the result type used when writing.
pub type Res = Result<(), ErrorPath<WriteError>>;

/// A push-style sink of structured NBT tokens.
///
/// Implemented by [NbtWriter]; adapters drive it as a trait object. Every
/// value emission must be preceded by [TagSink::name] inside a compound;
/// list elements are unnamed and must all share the list's element kind.
pub trait TagSink {
    /// Sets the name of the next value.
    ///
    /// Mandatory before each value in a compound, optional at the root
    /// (where it defaults to the empty string), and an error inside a
    /// list.
    fn name(&mut self, name: &str) -> Res;

    /// Writes a Byte value.
    fn write_byte(&mut self, v: i8) -> Res;
    /// Writes a Short value.
    fn write_short(&mut self, v: i16) -> Res;
    /// Writes an Int value.
    fn write_int(&mut self, v: i32) -> Res;
    /// Writes a Long value.
    fn write_long(&mut self, v: i64) -> Res;
    /// Writes a Float value.
    fn write_float(&mut self, v: f32) -> Res;
    /// Writes a Double value.
    fn write_double(&mut self, v: f64) -> Res;
    /// Writes a String value.
    fn write_string(&mut self, v: &str) -> Res;
    /// Writes a ByteArray value.
    fn write_byte_array(&mut self, v: &[i8]) -> Res;
    /// Writes an IntArray value.
    fn write_int_array(&mut self, v: &[i32]) -> Res;
    /// Writes a LongArray value.
    fn write_long_array(&mut self, v: &[i64]) -> Res;

    /// Opens a compound value.
    fn begin_compound(&mut self) -> Res;
    /// Closes the current compound, emitting its End byte.
    fn end_compound(&mut self) -> Res;

    /// Opens a list of `len` elements whose kind is pinned by the first
    /// element written into it.
    ///
    /// The list header is deferred until that first element arrives, so a
    /// `len` of zero is rejected with
    /// [`MissingElementKind`](WriteError::MissingElementKind); use
    /// [TagSink::begin_list_of] to emit an empty typed list.
    fn begin_list(&mut self, len: usize) -> Res;
    /// Opens a list of `len` elements of an explicitly declared kind; the
    /// header is written immediately.
    fn begin_list_of(&mut self, len: usize, element: TagKind) -> Res;
    /// Closes the current list. Lists are length-prefixed so no byte is
    /// written, but the declared length must have been fulfilled.
    fn end_list(&mut self) -> Res;
}

#[derive(Debug)]
struct Frame {
    scope: Scope,
    /// Element kind of a list frame, once declared or pinned.
    element: Option<TagKind>,
    /// Length committed (or to be committed) to a list header.
    declared: i32,
    /// Number of elements emitted into a list frame so far.
    written: i32,
    header_written: bool,
}

impl Frame {
    fn new(scope: Scope) -> Self {
        Frame {
            scope,
            element: None,
            declared: 0,
            written: 0,
            header_written: false,
        }
    }
}

/// A streaming NBT encoder over a big-endian byte sink.
///
/// Tokens are serialized in call order; structural violations fail before
/// anything is written for the offending token, but the stream as a whole
/// is left unusable after any error.
pub struct NbtWriter<W: Write> {
    dst: W,
    /// Invariant: never empty; the bottom entry is the root frame.
    frames: Vec<Frame>,
    pending_name: Option<String>,
}

impl<W: Write> NbtWriter<W> {
    /// Creates a writer over `dst`, positioned before the root tag.
    pub fn new(dst: W) -> Self {
        Self {
            dst,
            frames: vec![Frame::new(Scope::Root)],
            pending_name: None,
        }
    }

    /// Finishes the document, flushes the sink and hands it back.
    ///
    /// Fails with [WriteError::IncompleteDocument] while any compound or
    /// list is still open.
    pub fn close(mut self) -> Result<W, ErrorPath<WriteError>> {
        if self.frames.len() > 1 {
            return Err(ErrorPath::new(WriteError::IncompleteDocument));
        }
        if self.pending_name.is_some() {
            return Err(ErrorPath::new(WriteError::NameOutOfPlace));
        }
        self.dst.flush().map_err(|e| ErrorPath::new(e.into()))?;
        Ok(self.dst)
    }

    /// Emits the header of a value of `kind`: kind id and name in a
    /// compound or at the root, list bookkeeping (and a deferred list
    /// header) inside a list.
    fn begin_value(&mut self, kind: TagKind) -> Res {
        let name = self.pending_name.take();
        // The stack is never empty.
        let top = self.frames.last_mut().unwrap();
        match top.scope {
            Scope::Root => {
                encoding::write_u8(&mut self.dst, kind.id())?;
                encoding::write_string(&mut self.dst, name.as_deref().unwrap_or(""))?;
            }
            Scope::Compound => {
                let Some(name) = name else {
                    return Err(ErrorPath::new(WriteError::NameOutOfPlace));
                };
                encoding::write_u8(&mut self.dst, kind.id())?;
                encoding::write_string(&mut self.dst, &name)?;
            }
            Scope::List => {
                if !top.header_written {
                    // The first element pins the kind unless it was
                    // declared up front.
                    let element = top.element.unwrap_or(kind);
                    encoding::write_u8(&mut self.dst, element.id())?;
                    encoding::write_i32(&mut self.dst, top.declared)?;
                    top.element = Some(element);
                    top.header_written = true;
                }
                let element = top.element.unwrap_or(kind);
                if kind != element {
                    return Err(ErrorPath::new(WriteError::UnexpectedKind {
                        expected: element,
                        found: kind,
                    }));
                }
                if top.written >= top.declared {
                    return Err(ErrorPath::new(WriteError::LengthMismatch {
                        declared: top.declared,
                        written: top.written + 1,
                    }));
                }
                top.written += 1;
            }
        }
        Ok(())
    }

    fn check_len(&self, len: usize) -> Result<i32, ErrorPath<WriteError>> {
        if len > i32::MAX as usize {
            return Err(ErrorPath::new(WriteError::LengthOverflow {
                max: i32::MAX as usize,
                actual: len,
            }));
        }
        Ok(len as i32)
    }
}

macro_rules! impl_scalar_writes {
    ($(($fn_name:ident, $typ:ty, $kind:path, $write:path)),* $(,)?) => {$(
        fn $fn_name(&mut self, v: $typ) -> Res {
            self.begin_value($kind)?;
            $write(&mut self.dst, v)
        }
    )*};
}

impl<W: Write> TagSink for NbtWriter<W> {
    fn name(&mut self, name: &str) -> Res {
        if matches!(self.frames.last().unwrap().scope, Scope::List) {
            return Err(ErrorPath::new(WriteError::NameOutOfPlace));
        }
        self.pending_name = Some(name.to_string());
        Ok(())
    }

    impl_scalar_writes!(
        (write_byte, i8, TagKind::Byte, encoding::write_i8),
        (write_short, i16, TagKind::Short, encoding::write_i16),
        (write_int, i32, TagKind::Int, encoding::write_i32),
        (write_long, i64, TagKind::Long, encoding::write_i64),
        (write_float, f32, TagKind::Float, encoding::write_f32),
        (write_double, f64, TagKind::Double, encoding::write_f64),
    );

    fn write_string(&mut self, v: &str) -> Res {
        self.begin_value(TagKind::String)?;
        encoding::write_string(&mut self.dst, v)
    }

    fn write_byte_array(&mut self, v: &[i8]) -> Res {
        self.begin_value(TagKind::ByteArray)?;
        let len = self.check_len(v.len())?;
        encoding::write_i32(&mut self.dst, len)?;
        let bytes: Vec<u8> = v.iter().map(|b| *b as u8).collect();
        self.dst
            .write_all(&bytes)
            .map_err(|e| ErrorPath::new(e.into()))
    }

    fn write_int_array(&mut self, v: &[i32]) -> Res {
        self.begin_value(TagKind::IntArray)?;
        let len = self.check_len(v.len())?;
        encoding::write_i32(&mut self.dst, len)?;
        for x in v {
            encoding::write_i32(&mut self.dst, *x)?;
        }
        Ok(())
    }

    fn write_long_array(&mut self, v: &[i64]) -> Res {
        self.begin_value(TagKind::LongArray)?;
        let len = self.check_len(v.len())?;
        encoding::write_i32(&mut self.dst, len)?;
        for x in v {
            encoding::write_i64(&mut self.dst, *x)?;
        }
        Ok(())
    }

    fn begin_compound(&mut self) -> Res {
        self.begin_value(TagKind::Compound)?;
        self.frames.push(Frame::new(Scope::Compound));
        Ok(())
    }

    fn end_compound(&mut self) -> Res {
        if !matches!(self.frames.last().unwrap().scope, Scope::Compound) {
            return Err(ErrorPath::new(WriteError::ContextMismatch));
        }
        if self.pending_name.is_some() {
            // A name with no value would silently vanish.
            return Err(ErrorPath::new(WriteError::NameOutOfPlace));
        }
        encoding::write_u8(&mut self.dst, TagKind::End.id())?;
        self.frames.pop();
        Ok(())
    }

    fn begin_list(&mut self, len: usize) -> Res {
        if len == 0 {
            return Err(ErrorPath::new(WriteError::MissingElementKind));
        }
        let declared = self.check_len(len)?;
        self.begin_value(TagKind::List)?;
        let mut frame = Frame::new(Scope::List);
        frame.declared = declared;
        self.frames.push(frame);
        Ok(())
    }

    fn begin_list_of(&mut self, len: usize, element: TagKind) -> Res {
        if element == TagKind::End && len > 0 {
            return Err(ErrorPath::new(WriteError::Custom(
                "cannot write a list of End tags".to_string(),
            )));
        }
        let declared = self.check_len(len)?;
        self.begin_value(TagKind::List)?;
        encoding::write_u8(&mut self.dst, element.id())?;
        encoding::write_i32(&mut self.dst, declared)?;
        let mut frame = Frame::new(Scope::List);
        frame.element = Some(element);
        frame.declared = declared;
        frame.header_written = true;
        self.frames.push(frame);
        Ok(())
    }

    fn end_list(&mut self) -> Res {
        let top = self.frames.last().unwrap();
        if !matches!(top.scope, Scope::List) {
            return Err(ErrorPath::new(WriteError::ContextMismatch));
        }
        let written = if top.header_written { top.written } else { 0 };
        if written != top.declared {
            return Err(ErrorPath::new(WriteError::LengthMismatch {
                declared: top.declared,
                written,
            }));
        }
        self.frames.pop();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::err::WriteError;

    #[test]
    fn literal_layout() {
        let mut w = NbtWriter::new(vec![]);
        w.begin_compound().unwrap();
        w.name("answer").unwrap();
        w.write_int(42).unwrap();
        w.end_compound().unwrap();
        let bytes = w.close().unwrap();

        let mut expected = vec![0x0a, 0x00, 0x00];
        expected.extend_from_slice(&[0x03, 0x00, 0x06]);
        expected.extend_from_slice(b"answer");
        expected.extend_from_slice(&42i32.to_be_bytes());
        expected.push(0x00);
        assert_eq!(bytes, expected);
    }

    #[test]
    fn first_element_pins_list_kind() {
        let mut w = NbtWriter::new(vec![]);
        w.begin_compound().unwrap();
        w.name("xs").unwrap();
        w.begin_list(2).unwrap();
        w.write_double(0.5).unwrap();
        let err = w.write_int(1).unwrap_err();
        assert!(matches!(
            err.inner,
            WriteError::UnexpectedKind {
                expected: crate::TagKind::Double,
                found: crate::TagKind::Int
            }
        ));
    }

    #[test]
    fn list_length_is_enforced() {
        let mut w = NbtWriter::new(vec![]);
        w.begin_compound().unwrap();
        w.name("xs").unwrap();
        w.begin_list(2).unwrap();
        w.write_byte(1).unwrap();
        let err = w.end_list().unwrap_err();
        assert!(matches!(
            err.inner,
            WriteError::LengthMismatch {
                declared: 2,
                written: 1
            }
        ));
    }

    #[test]
    fn empty_list_requires_kind() {
        let mut w = NbtWriter::new(vec![]);
        w.begin_compound().unwrap();
        w.name("xs").unwrap();
        let err = w.begin_list(0).unwrap_err();
        assert!(matches!(err.inner, WriteError::MissingElementKind));

        w.begin_list_of(0, crate::TagKind::Compound).unwrap();
        w.end_list().unwrap();
        w.end_compound().unwrap();
        let bytes = w.close().unwrap();
        // id, root name, "xs" entry, element kind + zero length, End.
        let mut expected = vec![0x0a, 0x00, 0x00];
        expected.extend_from_slice(&[0x09, 0x00, 0x02]);
        expected.extend_from_slice(b"xs");
        expected.push(0x0a);
        expected.extend_from_slice(&0i32.to_be_bytes());
        expected.push(0x00);
        assert_eq!(bytes, expected);
    }

    #[test]
    fn names_are_mandatory_in_compounds() {
        let mut w = NbtWriter::new(vec![]);
        w.begin_compound().unwrap();
        let err = w.write_byte(1).unwrap_err();
        assert!(matches!(err.inner, WriteError::NameOutOfPlace));
    }

    #[test]
    fn names_are_forbidden_in_lists() {
        let mut w = NbtWriter::new(vec![]);
        w.begin_compound().unwrap();
        w.name("xs").unwrap();
        w.begin_list(1).unwrap();
        let err = w.name("nope").unwrap_err();
        assert!(matches!(err.inner, WriteError::NameOutOfPlace));
    }

    #[test]
    fn close_rejects_open_frames() {
        let mut w = NbtWriter::new(vec![]);
        w.begin_compound().unwrap();
        let err = w.close().unwrap_err();
        assert!(matches!(err.inner, WriteError::IncompleteDocument));
    }

    #[test]
    fn mismatched_end_calls() {
        let mut w = NbtWriter::new(vec![]);
        w.begin_compound().unwrap();
        let err = w.end_list().unwrap_err();
        assert!(matches!(err.inner, WriteError::ContextMismatch));
    }

    #[test]
    fn root_name_defaults_to_empty() {
        let mut w = NbtWriter::new(vec![]);
        w.begin_compound().unwrap();
        w.end_compound().unwrap();
        let bytes = w.close().unwrap();
        assert_eq!(bytes, [0x0a, 0x00, 0x00, 0x00]);
    }
}
