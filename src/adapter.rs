//! The seam between user types and the token streams.
//!
//! An [Adapter] bundles the encoder and decoder for one concrete type
//! together with the outermost [TagKind] it produces. Adapters operate on
//! `dyn` [TagSource]/[TagSink] so one adapter instance serves any byte
//! source or sink; the engine stores them behind [AdapterRef] handles and
//! hands out clones.
use std::any::Any;
use std::sync::Arc;

use crate::descriptor::TypeDescriptor;
use crate::engine::Engine;
use crate::err::{ErrorPath, ReadError, WriteError};
use crate::reader::TagSource;
use crate::writer::TagSink;
use crate::{reader, writer, TagKind};

/// An encoder/decoder pair for values of type `T`.
pub trait Adapter<T>: Send + Sync {
    /// The outermost tag kind produced when writing a value.
    ///
    /// Sequence adapters consult this to emit typed headers for empty
    /// lists.
    fn kind(&self) -> TagKind;

    /// Serializes `value` as a single element on `sink`.
    fn write(&self, value: &T, sink: &mut dyn TagSink) -> writer::Res;

    /// Reads a single element from the current position of `source`.
    fn read(&self, source: &mut dyn TagSource) -> reader::Res<T>;
}

/// Shared handle to an adapter.
pub type AdapterRef<T> = Arc<dyn Adapter<T>>;

/// A type the engine can build an adapter for without registration.
///
/// [Adaptable::build_adapter] is the built-in fallback at the end of the
/// factory chain; scalar types, strings, containers and [crate::Value]
/// implement it in this crate, structured user types get an
/// implementation from the [crate::nbt_struct!] macro, and enums from
/// [crate::impl_nbt_enum!]. Child adapters must be resolved through
/// `engine` rather than built directly, so that recursion through
/// self-referential types terminates via the engine's placeholders.
pub trait Adaptable: Sized + Send + Sync + 'static {
    /// The descriptor used to key the adapter cache.
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::of::<Self>()
    }

    /// Builds the built-in adapter for this type.
    fn build_adapter(engine: &Engine) -> AdapterRef<Self>;
}

/// Object-safe adapter used by the registry internals and by polymorphic
/// type resolution, where the concrete type is only known as a
/// [TypeDescriptor].
pub trait ErasedAdapter: Send + Sync {
    /// See [Adapter::kind].
    fn kind(&self) -> TagKind;
    /// Writes a type-erased value; fails when `value` is not of the
    /// adapter's concrete type.
    fn write_any(&self, value: &dyn Any, sink: &mut dyn TagSink) -> writer::Res;
    /// Reads a boxed value of the adapter's concrete type.
    fn read_any(&self, source: &mut dyn TagSource) -> reader::Res<Box<dyn Any>>;
}

struct ErasedWrap<T> {
    inner: AdapterRef<T>,
}

impl<T: Send + Sync + 'static> ErasedAdapter for ErasedWrap<T> {
    fn kind(&self) -> TagKind {
        self.inner.kind()
    }

    fn write_any(&self, value: &dyn Any, sink: &mut dyn TagSink) -> writer::Res {
        match value.downcast_ref::<T>() {
            Some(value) => self.inner.write(value, sink),
            None => Err(ErrorPath::new(WriteError::Custom(format!(
                "value is not a {}",
                std::any::type_name::<T>()
            )))),
        }
    }

    fn read_any(&self, source: &mut dyn TagSource) -> reader::Res<Box<dyn Any>> {
        Ok(Box::new(self.inner.read(source)?))
    }
}

/// The reverse of [ErasedWrap]: presents an erased adapter as a typed one.
/// Used when a factory hands the engine an adapter it built through the
/// erased interface.
pub(crate) struct ErasedBridge<T> {
    inner: Arc<dyn ErasedAdapter>,
    _marker: std::marker::PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> Adapter<T> for ErasedBridge<T> {
    fn kind(&self) -> TagKind {
        self.inner.kind()
    }

    fn write(&self, value: &T, sink: &mut dyn TagSink) -> writer::Res {
        self.inner.write_any(value, sink)
    }

    fn read(&self, source: &mut dyn TagSource) -> reader::Res<T> {
        let boxed = self.inner.read_any(source)?;
        match boxed.downcast::<T>() {
            Ok(value) => Ok(*value),
            Err(_) => Err(ErrorPath::new(ReadError::CorruptData(format!(
                "adapter produced a value that is not a {}",
                std::any::type_name::<T>()
            )))),
        }
    }
}

/// A cloneable, type-erased container for an [AdapterRef].
///
/// Factories produce these; the engine recovers the typed handle (or
/// bridges through the erased interface when the types do not line up).
#[derive(Clone)]
pub struct AnyAdapter {
    typed: Arc<dyn Any + Send + Sync>,
    erased: Arc<dyn ErasedAdapter>,
}

impl AnyAdapter {
    /// Wraps a typed adapter handle.
    pub fn new<T: Send + Sync + 'static>(adapter: AdapterRef<T>) -> Self {
        Self {
            typed: Arc::new(adapter.clone()),
            erased: Arc::new(ErasedWrap { inner: adapter }),
        }
    }

    /// Recovers the typed handle when `T` matches the wrapped adapter.
    pub fn downcast<T: Send + Sync + 'static>(&self) -> Option<AdapterRef<T>> {
        (*self.typed).downcast_ref::<AdapterRef<T>>().cloned()
    }

    /// Recovers the typed handle, falling back to a bridge through the
    /// erased interface for foreign `T`.
    pub(crate) fn typed_or_bridge<T: Send + Sync + 'static>(&self) -> AdapterRef<T> {
        match self.downcast::<T>() {
            Some(adapter) => adapter,
            None => Arc::new(ErasedBridge {
                inner: self.erased.clone(),
                _marker: std::marker::PhantomData,
            }),
        }
    }

    /// The erased view of the wrapped adapter.
    pub(crate) fn erased(&self) -> Arc<dyn ErasedAdapter> {
        self.erased.clone()
    }
}

/// Builds adapters for descriptors it recognizes.
///
/// Factories are consulted newest-registration-first; the first one to
/// return `Some` provides the adapter, and `None` passes the descriptor on
/// to the next factory (ultimately to the type's built-in adapter).
pub trait AdapterFactory: Send + Sync {
    /// Returns an adapter when this factory can handle `descriptor`.
    fn create(&self, engine: &Engine, descriptor: &TypeDescriptor) -> Option<AnyAdapter>;
}

/// Produces fresh instances for decoding into structured types.
pub trait InstanceCreator<T>: Send + Sync {
    /// Creates a new value ready to receive decoded fields.
    fn create(&self) -> reader::Res<T>;
}

impl<T, F> InstanceCreator<T> for F
where
    F: Fn() -> T + Send + Sync,
{
    fn create(&self) -> reader::Res<T> {
        Ok(self())
    }
}
