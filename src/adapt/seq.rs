//! Sequence adapters: lists of a single element type, plus the `Box`
//! wrapper that makes recursive types expressible.
use std::any::Any;
use std::collections::VecDeque;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::adapter::{Adaptable, Adapter, AdapterRef};
use crate::engine::Engine;
use crate::err::{ErrorPath, PathPart, ReadError};
use crate::reader::TagSource;
use crate::writer::TagSink;
use crate::{reader, writer, TagKind};

/// An ordered collection the sequence adapter can walk and rebuild.
pub trait Sequence<T>: Send + Sync + 'static {
    /// The number of elements.
    fn length(&self) -> usize;
    /// Calls `f` on every element in order, stopping at the first error.
    fn visit(&self, f: &mut dyn FnMut(&T) -> writer::Res) -> writer::Res;
    /// Rebuilds the collection from decoded elements.
    fn collect(items: Vec<T>) -> Self;
}

impl<T: Send + Sync + 'static> Sequence<T> for Vec<T> {
    fn length(&self) -> usize {
        self.len()
    }

    fn visit(&self, f: &mut dyn FnMut(&T) -> writer::Res) -> writer::Res {
        for item in self {
            f(item)?;
        }
        Ok(())
    }

    fn collect(items: Vec<T>) -> Self {
        items
    }
}

impl<T: Send + Sync + 'static> Sequence<T> for VecDeque<T> {
    fn length(&self) -> usize {
        self.len()
    }

    fn visit(&self, f: &mut dyn FnMut(&T) -> writer::Res) -> writer::Res {
        for item in self {
            f(item)?;
        }
        Ok(())
    }

    fn collect(items: Vec<T>) -> Self {
        items.into()
    }
}

/// Moves a `Vec<U>` into a `Vec<T>` when `U` and `T` are the same type.
fn same_type<U: 'static, T: 'static>(items: Vec<U>) -> Option<Vec<T>> {
    let mut slot = Some(items);
    (&mut slot as &mut dyn Any)
        .downcast_mut::<Option<Vec<T>>>()?
        .take()
}

/// Adapter for ordered collections, serialized as a List of the element
/// adapter's kind.
///
/// Empty sequences ask the element adapter for its kind so the list
/// header can still be typed. Reading also accepts the packed
/// ByteArray/IntArray/LongArray forms when the element type matches.
pub struct SeqAdapter<C, T> {
    element: AdapterRef<T>,
    _marker: PhantomData<fn() -> C>,
}

impl<C, T> SeqAdapter<C, T> {
    /// Creates a sequence adapter around an element adapter.
    pub fn new(element: AdapterRef<T>) -> Self {
        Self {
            element,
            _marker: PhantomData,
        }
    }
}

impl<C: Sequence<T>, T: Send + Sync + 'static> Adapter<C> for SeqAdapter<C, T> {
    fn kind(&self) -> TagKind {
        TagKind::List
    }

    fn write(&self, value: &C, sink: &mut dyn TagSink) -> writer::Res {
        let len = value.length();
        if len == 0 {
            sink.begin_list_of(0, self.element.kind())?;
            return sink.end_list();
        }
        sink.begin_list(len)?;
        let mut index = 0;
        value.visit(&mut |item| {
            let result = self
                .element
                .write(item, sink)
                .map_err(|e| e.prepend(PathPart::Index(index)));
            index += 1;
            result
        })?;
        sink.end_list()
    }

    fn read(&self, source: &mut dyn TagSource) -> reader::Res<C> {
        let element_kind = self.element.kind();
        let found = source.peek()?;
        let items = match found {
            TagKind::List => {
                let len = source.begin_list()?;
                let mut items = Vec::with_capacity(len);
                for _ in 0..len {
                    // Reader errors already carry the element's path.
                    items.push(self.element.read(source)?);
                }
                source.end_list()?;
                items
            }
            TagKind::ByteArray if element_kind == TagKind::Byte => {
                let path = source.path();
                let values = source.read_byte_array()?;
                same_type::<i8, T>(values).ok_or_else(|| Self::no_packed_form(path))?
            }
            TagKind::IntArray if element_kind == TagKind::Int => {
                let path = source.path();
                let values = source.read_int_array()?;
                same_type::<i32, T>(values).ok_or_else(|| Self::no_packed_form(path))?
            }
            TagKind::LongArray if element_kind == TagKind::Long => {
                let path = source.path();
                let values = source.read_long_array()?;
                same_type::<i64, T>(values).ok_or_else(|| Self::no_packed_form(path))?
            }
            found => {
                return Err(ErrorPath::new_with_path(
                    ReadError::UnexpectedKind {
                        expected: TagKind::List,
                        found,
                    },
                    source.path(),
                ))
            }
        };
        Ok(C::collect(items))
    }
}

impl<C, T: 'static> SeqAdapter<C, T> {
    fn no_packed_form(path: crate::err::Path) -> ErrorPath<ReadError> {
        ErrorPath::new_with_path(
            ReadError::CorruptData(format!(
                "packed array cannot populate a sequence of {}",
                std::any::type_name::<T>()
            )),
            path,
        )
    }
}

impl<T: Adaptable> Adaptable for Vec<T> {
    fn build_adapter(engine: &Engine) -> AdapterRef<Self> {
        Arc::new(SeqAdapter::new(engine.adapter::<T>()))
    }
}

impl<T: Adaptable> Adaptable for VecDeque<T> {
    fn build_adapter(engine: &Engine) -> AdapterRef<Self> {
        Arc::new(SeqAdapter::new(engine.adapter::<T>()))
    }
}

/// Adapter for boxed values; delegates to the inner adapter.
pub struct BoxAdapter<T> {
    inner: AdapterRef<T>,
}

impl<T> BoxAdapter<T> {
    /// Creates a box adapter around the inner type's adapter.
    pub fn new(inner: AdapterRef<T>) -> Self {
        Self { inner }
    }
}

impl<T: Send + Sync + 'static> Adapter<Box<T>> for BoxAdapter<T> {
    fn kind(&self) -> TagKind {
        self.inner.kind()
    }

    fn write(&self, value: &Box<T>, sink: &mut dyn TagSink) -> writer::Res {
        self.inner.write(value, sink)
    }

    fn read(&self, source: &mut dyn TagSource) -> reader::Res<Box<T>> {
        Ok(Box::new(self.inner.read(source)?))
    }
}

impl<T: Adaptable> Adaptable for Box<T> {
    fn build_adapter(engine: &Engine) -> AdapterRef<Self> {
        Arc::new(BoxAdapter::new(engine.adapter::<T>()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;

    #[test]
    fn sequences_round_trip() {
        let engine = Engine::new();
        let input = vec![0.43f64, -0.43, 1.0];
        let bytes = engine.to_bytes(&input).unwrap();
        assert_eq!(engine.from_bytes::<Vec<f64>>(&bytes).unwrap(), input);

        let deque: VecDeque<i16> = [1i16, 2, 3].into_iter().collect();
        let bytes = engine.to_bytes(&deque).unwrap();
        assert_eq!(engine.from_bytes::<VecDeque<i16>>(&bytes).unwrap(), deque);
    }

    #[test]
    fn empty_sequences_write_typed_headers() {
        let engine = Engine::new();
        let bytes = engine.to_bytes(&Vec::<String>::new()).unwrap();
        // Root list header: kind id, root name, element kind, length.
        assert_eq!(bytes[0], TagKind::List.id());
        assert_eq!(bytes[3], TagKind::String.id());
        assert_eq!(engine.from_bytes::<Vec<String>>(&bytes).unwrap(), Vec::<String>::new());
    }

    #[test]
    fn packed_arrays_populate_sequences() {
        let engine = Engine::new();
        let bytes = engine
            .to_bytes(&crate::adapt::IntArray(vec![5, 6, 7]))
            .unwrap();
        assert_eq!(engine.from_bytes::<Vec<i32>>(&bytes).unwrap(), [5, 6, 7]);
    }

    #[test]
    fn nested_lists() {
        let engine = Engine::new();
        let input = vec![vec![1i32, 2], vec![3]];
        let bytes = engine.to_bytes(&input).unwrap();
        assert_eq!(engine.from_bytes::<Vec<Vec<i32>>>(&bytes).unwrap(), input);
    }

    #[test]
    fn element_errors_carry_indices() {
        let engine = Engine::new();
        let bytes = engine.to_bytes(&vec!["x".to_string()]).unwrap();
        let err = engine.from_bytes::<Vec<i32>>(&bytes).unwrap_err();
        assert_eq!(err.path.to_string(), "[0]");
    }
}
