//! See [ErrorPath].
use std::collections::VecDeque;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::ops::{Deref, DerefMut};
use thiserror::Error;

use crate::TagKind;

/// An error that can occur while reading NBT data from a byte source.
#[derive(Error, Debug)]
pub enum ReadError {
    /// The underlying byte source reported a failure.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// The stream ended in the middle of a token.
    #[error("unexpected end of stream")]
    UnexpectedEnd,
    /// A read asserted one tag kind but found another.
    #[error("expected tag {expected}, found {found}")]
    UnexpectedKind {
        /// The kind the caller asked for.
        expected: TagKind,
        /// The kind actually present on the wire.
        found: TagKind,
    },
    /// A byte outside `0..=12` appeared where a kind id was expected.
    #[error("invalid tag id {0:#04x}")]
    InvalidTagId(u8),
    /// A string payload could not be decoded as modified UTF-8.
    #[error("string payload is not valid modified UTF-8")]
    InvalidUtf8,
    /// An array or list carried a negative length prefix.
    #[error("negative length {0}")]
    NegativeLength(i32),
    /// `end_compound`/`end_list` was called with the wrong frame on top.
    #[error("end of compound or list does not match the enclosing context")]
    ContextMismatch,
    /// An enum reader saw an unknown name or an out-of-range ordinal.
    #[error("no enum value matches {0:?}")]
    InvalidEnumValue(String),
    /// A mapping was asked to handle a key type that is neither a string
    /// nor an enum.
    #[error("map keys must be strings or enums, not {0}")]
    UnsupportedKeyType(&'static str),
    /// No instance-creation strategy is available for a type.
    #[error("no way to construct an instance of {0}")]
    NoConstructor(&'static str),
    /// Higher-level adapter-detected inconsistency in otherwise
    /// well-formed data.
    #[error("{0}")]
    CorruptData(String),
    /// A custom variant for errors other than the provided variants.
    #[error("{0}")]
    Custom(String),
}

/// An error that can occur while writing NBT data into a byte sink.
#[derive(Error, Debug)]
pub enum WriteError {
    /// The underlying byte sink reported a failure.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// A name was supplied in a list context, or a value was emitted in a
    /// compound without a preceding name.
    #[error("name out of place: compounds require one per value, lists forbid them")]
    NameOutOfPlace,
    /// `end_compound`/`end_list` was called with the wrong frame on top.
    #[error("end of compound or list does not match the enclosing context")]
    ContextMismatch,
    /// The writer was closed while compound or list frames were still open.
    #[error("document closed with unfinished compounds or lists")]
    IncompleteDocument,
    /// A list element did not match the list's element kind.
    #[error("expected tag {expected}, found {found}")]
    UnexpectedKind {
        /// The element kind pinned by the list header.
        expected: TagKind,
        /// The kind of the offending value.
        found: TagKind,
    },
    /// An empty list was begun without declaring its element kind.
    #[error("empty lists require an explicit element kind")]
    MissingElementKind,
    /// A list was closed with a different number of elements than its
    /// header declared.
    #[error("list declared {declared} elements but {written} were written")]
    LengthMismatch {
        /// The length committed to the wire in the list header.
        declared: i32,
        /// The number of elements actually emitted.
        written: i32,
    },
    /// A string or array is too long for its length prefix.
    #[error("length must be at most {max}, but got {actual}")]
    LengthOverflow {
        /// The largest length the prefix can carry.
        max: usize,
        /// The offending length.
        actual: usize,
    },
    /// A custom variant for errors other than the provided variants.
    #[error("{0}")]
    Custom(String),
}

/// A generic wrapper that gives a [Path] to an error type.
pub struct ErrorPath<I> {
    /// The inner data for an NBT error. It is boxed to reduce the memory
    /// footprint of the happy path.
    pub boxed: Box<InnerErrorPath<I>>,
}

/// Inner container for the [ErrorPath] type.
pub struct InnerErrorPath<I> {
    /// The inner element that the wrapper wraps around.
    pub inner: I,
    /// The associated path. Usually, this should be the location where the
    /// error occurred.
    pub path: Path,
}

impl<I> Deref for ErrorPath<I> {
    type Target = InnerErrorPath<I>;

    fn deref(&self) -> &Self::Target {
        &self.boxed
    }
}

impl<I> DerefMut for ErrorPath<I> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.boxed
    }
}

impl<I> ErrorPath<I> {
    /// Create a new [ErrorPath] wrapper from the inner element, using the
    /// default (empty) path.
    pub fn new(inner: I) -> Self {
        Self {
            boxed: Box::new(InnerErrorPath {
                inner,
                path: Default::default(),
            }),
        }
    }

    /// Create a new [ErrorPath] wrapper from the inner element and a path.
    pub fn new_with_path(inner: I, path: Path) -> Self {
        Self {
            boxed: Box::new(InnerErrorPath { inner, path }),
        }
    }

    /// Prepend the path in the wrapper with a new [PathPart].
    pub fn prepend(mut self, part: PathPart) -> Self {
        self.path.0.push_front(part);
        self
    }
}

impl<I: Error + 'static> Error for ErrorPath<I> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.inner)
    }
}

impl<I: Debug> Debug for ErrorPath<I> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorPath")
            .field("inner", &self.inner)
            .field("path", &self.path)
            .finish()
    }
}

impl<I: Display> Display for ErrorPath<I> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("`")?;
        <Path as Display>::fmt(&self.path, f)?;
        f.write_str("`: ")?;
        self.inner.fmt(f)
    }
}

/// A path into an NBT document that indicates where an error occurred.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct Path(pub VecDeque<PathPart>);

impl Path {
    /// Create a path from a single [PathPart].
    pub fn from_single(part: PathPart) -> Self {
        Self(VecDeque::from([part]))
    }

    /// Append a [PathPart] at the end of the path.
    pub fn push(&mut self, part: PathPart) {
        self.0.push_back(part);
    }
}

impl Display for Path {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            return f.write_str("(root)");
        }

        let mut iter = self.0.iter();
        // Unwrapping will never panic here due to the 'is empty' check.
        <PathPart as Display>::fmt(iter.next().unwrap(), f)?;

        for next in iter {
            if let PathPart::Index(_) = next {
                // Dont write a `.` for list indices.
            } else {
                f.write_str(".")?;
            }
            <PathPart as Display>::fmt(next, f)?;
        }
        Ok(())
    }
}

/// A single part of a [Path].
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum PathPart {
    /// A named entry inside a compound.
    Field(String),
    /// An element index inside a list or array.
    Index(usize),
}

impl Display for PathPart {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            PathPart::Field(v) => f.write_str(v),
            PathPart::Index(v) => {
                f.write_str("[")?;
                f.write_str(&v.to_string())?;
                f.write_str("]")
            }
        }
    }
}
