//! See [NbtReader].
use std::io::Read;

use crate::capture::TeeReader;
use crate::encoding;
use crate::err::{ErrorPath, Path, PathPart, ReadError};
use crate::TagKind;

/// A short notation for the result type used when reading.
pub type Res<T> = Result<T, ErrorPath<ReadError>>;

/// The sentinel returned by [TagSource::name] at positions that carry no
/// name on the wire: list elements and End tags.
pub const UNNAMED: &str = "unknown";

/// A pull-style source of structured NBT tokens.
///
/// The trait mirrors the byte stream exactly: every call either inspects
/// the current token or consumes it and advances. Implemented by
/// [NbtReader]; adapters consume it as a trait object so that one adapter
/// instance can serve any underlying byte source.
pub trait TagSource {
    /// Returns the kind of the next token without consuming its payload.
    ///
    /// In a compound (or at the root) this lazily reads the token's kind
    /// id byte; in a list the kind is derived from the list header and no
    /// byte is consumed. Once a token's kind has been resolved, repeated
    /// calls are free.
    fn peek(&mut self) -> Res<TagKind>;

    /// Returns the name of the current token, reading it lazily.
    ///
    /// Valid between [TagSource::peek] and the read of the value. Inside a
    /// list, or when the current token is an End, there is no name and the
    /// [UNNAMED] sentinel is returned.
    fn name(&mut self) -> Res<&str>;

    /// Reads a Byte payload.
    fn read_byte(&mut self) -> Res<i8>;
    /// Reads a Short payload.
    fn read_short(&mut self) -> Res<i16>;
    /// Reads an Int payload.
    fn read_int(&mut self) -> Res<i32>;
    /// Reads a Long payload.
    fn read_long(&mut self) -> Res<i64>;
    /// Reads a Float payload.
    fn read_float(&mut self) -> Res<f32>;
    /// Reads a Double payload.
    fn read_double(&mut self) -> Res<f64>;
    /// Reads a String payload.
    fn read_string(&mut self) -> Res<String>;
    /// Reads a ByteArray payload.
    fn read_byte_array(&mut self) -> Res<Vec<i8>>;
    /// Reads an IntArray payload.
    fn read_int_array(&mut self) -> Res<Vec<i32>>;
    /// Reads a LongArray payload.
    fn read_long_array(&mut self) -> Res<Vec<i64>>;

    /// Enters the compound at the current position.
    fn begin_compound(&mut self) -> Res<()>;
    /// Leaves the current compound; the current token must be its End.
    fn end_compound(&mut self) -> Res<()>;
    /// Enters the list at the current position and returns its length.
    ///
    /// Encoders may declare any element kind for empty lists; a length of
    /// zero always yields an effective element kind of End.
    fn begin_list(&mut self) -> Res<usize>;
    /// Leaves the current list; every element must have been consumed.
    fn end_list(&mut self) -> Res<()>;

    /// Skips one whole element at the current position; when `depth > 0`,
    /// additionally consumes the remainder of that many enclosing
    /// compounds or lists and closes them.
    fn skip(&mut self, depth: usize) -> Res<()>;

    /// Consumes the next element and returns the exact bytes it occupied,
    /// including its kind id byte and its name.
    ///
    /// Components already parsed (the kind byte, possibly the name) are
    /// synthesized from frame state; the rest is copied verbatim off the
    /// source. List elements get an empty synthesized name so the capture
    /// always re-parses as a standalone named tag.
    fn capture_raw(&mut self) -> Res<Vec<u8>>;

    /// The path of the current position, for diagnostics.
    fn path(&self) -> Path;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Scope {
    Root,
    Compound,
    List,
}

#[derive(Debug)]
struct Frame {
    scope: Scope,
    /// Kind of the current token, `None` until resolved by a peek.
    kind: Option<TagKind>,
    /// Name of the current token, read at most once.
    name: Option<String>,
    /// Unread element count of a list frame.
    remaining: i32,
    /// Element kind of a list frame.
    element: TagKind,
    /// Index of the current element of a list frame.
    index: usize,
}

impl Frame {
    fn root() -> Self {
        Frame {
            scope: Scope::Root,
            kind: None,
            name: None,
            remaining: 0,
            element: TagKind::End,
            index: 0,
        }
    }

    fn compound() -> Self {
        Frame {
            scope: Scope::Compound,
            ..Frame::root()
        }
    }

    fn list(element: TagKind, remaining: i32) -> Self {
        Frame {
            scope: Scope::List,
            element,
            remaining,
            ..Frame::root()
        }
    }
}

macro_rules! try_at {
    ($self:ident, $expr:expr) => {{
        let result = $expr;
        match result {
            Ok(v) => v,
            Err(e) => return Err($self.locate(e)),
        }
    }};
}

/// A streaming NBT decoder over a big-endian byte source.
///
/// The reader keeps an explicit stack of frames; the root frame exists
/// from construction, so the very first [TagSource::peek] reads the root
/// tag's kind byte. Reads that fail leave the reader in an unspecified
/// position; callers should discard it.
pub struct NbtReader<R> {
    src: R,
    /// Invariant: never empty; the bottom entry is the root frame.
    frames: Vec<Frame>,
    capture: Option<Vec<u8>>,
}

impl<R: Read> NbtReader<R> {
    /// Creates a reader over `src`, positioned before the root tag.
    pub fn new(src: R) -> Self {
        Self {
            src,
            frames: vec![Frame::root()],
            capture: None,
        }
    }

    /// Consumes the reader and hands back the underlying byte source.
    pub fn into_inner(self) -> R {
        self.src
    }

    fn source(&mut self) -> TeeReader<'_, R> {
        TeeReader::new(&mut self.src, self.capture.as_mut())
    }

    fn top(&self) -> &Frame {
        // The stack is never empty.
        self.frames.last().unwrap()
    }

    fn top_mut(&mut self) -> &mut Frame {
        self.frames.last_mut().unwrap()
    }

    fn err(&self, inner: ReadError) -> ErrorPath<ReadError> {
        ErrorPath::new_with_path(inner, self.locate_path())
    }

    /// Attaches the current path to errors bubbling up from the byte
    /// layer, which does not know where in the document it is.
    fn locate(&self, mut err: ErrorPath<ReadError>) -> ErrorPath<ReadError> {
        if err.path.0.is_empty() {
            err.path = self.locate_path();
        }
        err
    }

    fn locate_path(&self) -> Path {
        let mut path = Path::default();
        for frame in &self.frames {
            match frame.scope {
                Scope::List => path.push(PathPart::Index(frame.index)),
                _ => {
                    if let Some(name) = &frame.name {
                        if !name.is_empty() {
                            path.push(PathPart::Field(name.clone()));
                        }
                    }
                }
            }
        }
        path
    }

    /// Asserts the kind of the current token and consumes its name if the
    /// caller never asked for it, leaving the position at the payload.
    fn expect(&mut self, expected: TagKind) -> Res<()> {
        let found = self.peek()?;
        if found != expected {
            return Err(self.err(ReadError::UnexpectedKind { expected, found }));
        }
        self.consume_name()
    }

    fn consume_name(&mut self) -> Res<()> {
        let unread = {
            let top = self.top();
            !matches!(top.scope, Scope::List)
                && top.name.is_none()
                && top.kind != Some(TagKind::End)
        };
        if unread {
            let name = try_at!(self, encoding::read_string(&mut self.source()));
            self.top_mut().name = Some(name);
        }
        Ok(())
    }

    /// Moves past the token that was just consumed.
    fn advance(&mut self) {
        let top = self.top_mut();
        match top.scope {
            Scope::List => {
                top.remaining -= 1;
                top.index += 1;
                top.kind = None;
            }
            _ => {
                top.kind = None;
                top.name = None;
            }
        }
    }

    fn array_len(&mut self) -> Res<usize> {
        let len = try_at!(self, encoding::read_i32(&mut self.source()));
        if len < 0 {
            return Err(self.err(ReadError::NegativeLength(len)));
        }
        Ok(len as usize)
    }

    fn read_kind_id(&mut self) -> Res<TagKind> {
        let id = try_at!(self, encoding::read_u8(&mut self.source()));
        match TagKind::from_id(id) {
            Some(kind) => Ok(kind),
            None => Err(self.err(ReadError::InvalidTagId(id))),
        }
    }

    fn skip_bytes(&mut self, n: u64) -> Res<()> {
        let result = {
            let mut taken = self.source().take(n);
            std::io::copy(&mut taken, &mut std::io::sink())
        };
        let copied = match result {
            Ok(copied) => copied,
            Err(e) => return Err(self.locate(encoding::from_io(e))),
        };
        if copied < n {
            return Err(self.err(ReadError::UnexpectedEnd));
        }
        Ok(())
    }

    /// Skips one element whose kind (and name, in a compound) have already
    /// been consumed off the wire.
    fn skip_payload(&mut self, kind: TagKind) -> Res<()> {
        match kind {
            TagKind::String => {
                let len = try_at!(self, encoding::read_u16(&mut self.source()));
                self.skip_bytes(len as u64)
            }
            TagKind::ByteArray => {
                let len = self.array_len()?;
                self.skip_bytes(len as u64)
            }
            TagKind::IntArray => {
                let len = self.array_len()?;
                self.skip_bytes(len as u64 * 4)
            }
            TagKind::LongArray => {
                let len = self.array_len()?;
                self.skip_bytes(len as u64 * 8)
            }
            TagKind::List => {
                let element = self.read_kind_id()?;
                let len = try_at!(self, encoding::read_i32(&mut self.source()));
                if len < 0 {
                    return Err(self.err(ReadError::NegativeLength(len)));
                }
                if element == TagKind::End && len > 0 {
                    return Err(self.err(ReadError::CorruptData(
                        "list declares End elements with a nonzero length".to_string(),
                    )));
                }
                if let Some(size) = element.payload_size() {
                    // Lists of fixed-size scalars skip in one stride.
                    self.skip_bytes(len as u64 * size as u64)
                } else {
                    for _ in 0..len {
                        self.skip_payload(element)?;
                    }
                    Ok(())
                }
            }
            TagKind::Compound => loop {
                let child = self.read_kind_id()?;
                if child == TagKind::End {
                    return Ok(());
                }
                let name_len = try_at!(self, encoding::read_u16(&mut self.source()));
                self.skip_bytes(name_len as u64)?;
                self.skip_payload(child)?;
            },
            fixed => {
                // End and the six numeric kinds all have a known size.
                self.skip_bytes(fixed.payload_size().unwrap_or(0) as u64)
            }
        }
    }

    /// Skips exactly one element at the current position. Skipping at an
    /// End position is a no-op.
    fn skip_element(&mut self) -> Res<()> {
        let kind = self.peek()?;
        if kind == TagKind::End {
            return Ok(());
        }
        self.consume_name()?;
        self.skip_payload(kind)?;
        self.advance();
        Ok(())
    }
}

macro_rules! impl_scalar_reads {
    ($(($fn_name:ident, $typ:ty, $kind:path, $read:path)),* $(,)?) => {$(
        fn $fn_name(&mut self) -> Res<$typ> {
            self.expect($kind)?;
            let v = try_at!(self, $read(&mut self.source()));
            self.advance();
            Ok(v)
        }
    )*};
}

impl<R: Read> TagSource for NbtReader<R> {
    fn peek(&mut self) -> Res<TagKind> {
        let (cached, in_list, list_kind) = {
            let top = self.top();
            let list_kind = if top.remaining > 0 {
                top.element
            } else {
                TagKind::End
            };
            (top.kind, matches!(top.scope, Scope::List), list_kind)
        };
        if let Some(kind) = cached {
            return Ok(kind);
        }
        let kind = if in_list {
            list_kind
        } else {
            self.read_kind_id()?
        };
        self.top_mut().kind = Some(kind);
        Ok(kind)
    }

    fn name(&mut self) -> Res<&str> {
        self.peek()?;
        {
            let top = self.top();
            if matches!(top.scope, Scope::List) || top.kind == Some(TagKind::End) {
                return Ok(UNNAMED);
            }
        }
        if self.top().name.is_none() {
            let name = try_at!(self, encoding::read_string(&mut self.source()));
            self.top_mut().name = Some(name);
        }
        Ok(self.top().name.as_deref().unwrap_or(UNNAMED))
    }

    impl_scalar_reads!(
        (read_byte, i8, TagKind::Byte, encoding::read_i8),
        (read_short, i16, TagKind::Short, encoding::read_i16),
        (read_int, i32, TagKind::Int, encoding::read_i32),
        (read_long, i64, TagKind::Long, encoding::read_i64),
        (read_float, f32, TagKind::Float, encoding::read_f32),
        (read_double, f64, TagKind::Double, encoding::read_f64),
    );

    fn read_string(&mut self) -> Res<String> {
        self.expect(TagKind::String)?;
        let v = try_at!(self, encoding::read_string(&mut self.source()));
        self.advance();
        Ok(v)
    }

    fn read_byte_array(&mut self) -> Res<Vec<i8>> {
        self.expect(TagKind::ByteArray)?;
        let len = self.array_len()?;
        let mut buf = vec![0u8; len];
        let result = {
            let mut src = self.source();
            src.read_exact(&mut buf)
        };
        if let Err(e) = result {
            return Err(self.locate(encoding::from_io(e)));
        }
        self.advance();
        Ok(buf.into_iter().map(|b| b as i8).collect())
    }

    fn read_int_array(&mut self) -> Res<Vec<i32>> {
        self.expect(TagKind::IntArray)?;
        let len = self.array_len()?;
        let mut values = Vec::with_capacity(len);
        for _ in 0..len {
            values.push(try_at!(self, encoding::read_i32(&mut self.source())));
        }
        self.advance();
        Ok(values)
    }

    fn read_long_array(&mut self) -> Res<Vec<i64>> {
        self.expect(TagKind::LongArray)?;
        let len = self.array_len()?;
        let mut values = Vec::with_capacity(len);
        for _ in 0..len {
            values.push(try_at!(self, encoding::read_i64(&mut self.source())));
        }
        self.advance();
        Ok(values)
    }

    fn begin_compound(&mut self) -> Res<()> {
        self.expect(TagKind::Compound)?;
        self.frames.push(Frame::compound());
        Ok(())
    }

    fn end_compound(&mut self) -> Res<()> {
        if !matches!(self.top().scope, Scope::Compound) {
            return Err(self.err(ReadError::ContextMismatch));
        }
        let found = self.peek()?;
        if found != TagKind::End {
            return Err(self.err(ReadError::UnexpectedKind {
                expected: TagKind::End,
                found,
            }));
        }
        self.frames.pop();
        self.advance();
        Ok(())
    }

    fn begin_list(&mut self) -> Res<usize> {
        self.expect(TagKind::List)?;
        let declared = self.read_kind_id()?;
        let len = try_at!(self, encoding::read_i32(&mut self.source()));
        if len < 0 {
            return Err(self.err(ReadError::NegativeLength(len)));
        }
        if declared == TagKind::End && len > 0 {
            return Err(self.err(ReadError::CorruptData(
                "list declares End elements with a nonzero length".to_string(),
            )));
        }
        // Empty lists may declare any element kind; normalize to End.
        let element = if len == 0 { TagKind::End } else { declared };
        self.frames.push(Frame::list(element, len));
        Ok(len as usize)
    }

    fn end_list(&mut self) -> Res<()> {
        if !matches!(self.top().scope, Scope::List) {
            return Err(self.err(ReadError::ContextMismatch));
        }
        let found = self.peek()?;
        if found != TagKind::End {
            return Err(self.err(ReadError::UnexpectedKind {
                expected: TagKind::End,
                found,
            }));
        }
        self.frames.pop();
        self.advance();
        Ok(())
    }

    fn skip(&mut self, depth: usize) -> Res<()> {
        self.skip_element()?;
        for _ in 0..depth {
            while self.peek()? != TagKind::End {
                self.skip_element()?;
            }
            match self.top().scope {
                Scope::Compound => self.end_compound()?,
                Scope::List => self.end_list()?,
                Scope::Root => return Err(self.err(ReadError::ContextMismatch)),
            }
        }
        Ok(())
    }

    fn capture_raw(&mut self) -> Res<Vec<u8>> {
        let kind = self.peek()?;
        if kind == TagKind::End {
            return Err(self.err(ReadError::CorruptData(
                "cannot capture an End tag".to_string(),
            )));
        }
        let mut prefix = vec![kind.id()];
        {
            let top = self.top();
            match top.scope {
                // List elements are unnamed; synthesize an empty name so
                // the capture parses as a standalone named tag.
                Scope::List => prefix.extend_from_slice(&[0, 0]),
                _ => {
                    if let Some(name) = &top.name {
                        let bytes = cesu8::to_java_cesu8(name);
                        prefix.extend_from_slice(&(bytes.len() as u16).to_be_bytes());
                        prefix.extend_from_slice(&bytes);
                    }
                    // An unread name is still on the wire and the tee
                    // records it during the skip below.
                }
            }
        }
        self.capture = Some(prefix);
        let result = self.skip_element();
        let captured = self.capture.take().unwrap_or_default();
        result?;
        Ok(captured)
    }

    fn path(&self) -> Path {
        self.locate_path()
    }
}
