//! See [Engine].
use std::any::Any;
use std::collections::HashMap;
use std::io::{Read, Write};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use crate::adapt::resolve::{ResolvingAdapter, TypeResolver};
use crate::adapter::{
    Adaptable, Adapter, AdapterFactory, AdapterRef, AnyAdapter, ErasedAdapter, InstanceCreator,
};
use crate::descriptor::TypeDescriptor;
use crate::err::{ErrorPath, ReadError, WriteError};
use crate::naming::NamingStrategy;
use crate::reader::{NbtReader, TagSource};
use crate::writer::{NbtWriter, TagSink};
use crate::{reader, writer, TagKind};

/// The placeholder installed in the cache while an adapter is being
/// constructed.
///
/// Requests for the same descriptor issued during construction (recursive
/// types, concurrent threads) receive this forwarder; its slot is filled
/// exactly once when the outer construction finishes, and every holder
/// dispatches through it from then on.
pub(crate) struct FutureAdapter<T> {
    slot: OnceLock<AdapterRef<T>>,
}

impl<T> FutureAdapter<T> {
    fn new() -> Self {
        Self {
            slot: OnceLock::new(),
        }
    }
}

impl<T: Send + Sync + 'static> Adapter<T> for FutureAdapter<T> {
    fn kind(&self) -> TagKind {
        self.slot.get().map_or(TagKind::End, |a| a.kind())
    }

    fn write(&self, value: &T, sink: &mut dyn TagSink) -> writer::Res {
        match self.slot.get() {
            Some(adapter) => adapter.write(value, sink),
            None => Err(ErrorPath::new(WriteError::Custom(format!(
                "adapter for {} used during its own construction",
                std::any::type_name::<T>()
            )))),
        }
    }

    fn read(&self, source: &mut dyn TagSource) -> reader::Res<T> {
        match self.slot.get() {
            Some(adapter) => adapter.read(source),
            None => Err(ErrorPath::new(ReadError::Custom(format!(
                "adapter for {} used during its own construction",
                std::any::type_name::<T>()
            )))),
        }
    }
}

enum CacheEntry {
    /// Construction in flight; holds an `Arc<FutureAdapter<T>>`.
    Building(Arc<dyn Any + Send + Sync>),
    /// Completed adapter.
    Ready(AnyAdapter),
}

type WrapFn<T> = Arc<dyn Fn(&Engine, AdapterRef<T>) -> AdapterRef<T> + Send + Sync>;

struct Shared {
    factories: RwLock<Vec<Arc<dyn AdapterFactory>>>,
    adapters: RwLock<HashMap<TypeDescriptor, CacheEntry>>,
    creators: RwLock<HashMap<TypeDescriptor, Arc<dyn Any + Send + Sync>>>,
    resolvers: RwLock<HashMap<TypeDescriptor, Arc<dyn Any + Send + Sync>>>,
    naming: RwLock<NamingStrategy>,
}

/// The engine facade: adapter registry, caches and entry points.
///
/// Cloning an engine is cheap and yields a handle to the same registry.
/// Lookups are safe from any number of threads; at most one completed
/// adapter per descriptor ever exists, even when several threads (or a
/// recursive type graph) request it at once.
#[derive(Clone)]
pub struct Engine {
    shared: Arc<Shared>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Creates an engine with the default configuration.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                factories: RwLock::new(Vec::new()),
                adapters: RwLock::new(HashMap::new()),
                creators: RwLock::new(HashMap::new()),
                resolvers: RwLock::new(HashMap::new()),
                naming: RwLock::new(NamingStrategy::default()),
            }),
        }
    }

    /// Starts configuring a new engine.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// The strategy structure adapters use to derive wire names.
    pub fn naming_strategy(&self) -> NamingStrategy {
        self.shared
            .naming
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replaces the naming strategy.
    ///
    /// Adapters snapshot the strategy when they are built; already-built
    /// adapters keep the names they were built with.
    pub fn set_naming_strategy(&self, strategy: NamingStrategy) {
        *self
            .shared
            .naming
            .write()
            .unwrap_or_else(PoisonError::into_inner) = strategy;
    }

    /// Returns the adapter for `T`, building and caching it on first use.
    ///
    /// Registered factories are consulted newest-first; when none claims
    /// the descriptor the type's built-in adapter is used. A registered
    /// [TypeResolver] for `T` wraps whatever adapter came out of that
    /// chain.
    pub fn adapter<T: Adaptable>(&self) -> AdapterRef<T> {
        let descriptor = T::descriptor();
        if let Some(found) = self.lookup::<T>(&descriptor) {
            return found;
        }

        let future = Arc::new(FutureAdapter::<T>::new());
        {
            let mut cache = self
                .shared
                .adapters
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            // Someone may have raced us here while we held no lock.
            match cache.get(&descriptor) {
                Some(CacheEntry::Ready(any)) => return any.typed_or_bridge::<T>(),
                Some(CacheEntry::Building(any)) => {
                    if let Some(pending) = (**any).downcast_ref::<Arc<FutureAdapter<T>>>() {
                        return pending.clone();
                    }
                }
                None => {}
            }
            cache.insert(
                descriptor.clone(),
                CacheEntry::Building(Arc::new(future.clone())),
            );
        }

        // Factories run without the cache lock so they can request child
        // adapters (including, recursively, this descriptor's).
        let built = self
            .run_factories::<T>(&descriptor)
            .unwrap_or_else(|| T::build_adapter(self));
        let built = match self.resolver_wrap::<T>(&descriptor) {
            Some(wrap) => wrap(self, built),
            None => built,
        };

        // Completion is monotonic: the first finisher wins and everyone
        // else adopts its adapter, keeping the instance unique.
        let candidate = built.clone();
        let adapter = match future.slot.set(built) {
            Ok(()) => candidate,
            Err(_) => future.slot.get().cloned().unwrap_or(candidate),
        };

        let mut cache = self
            .shared
            .adapters
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        cache.insert(descriptor, CacheEntry::Ready(AnyAdapter::new(adapter.clone())));
        adapter
    }

    fn lookup<T: Send + Sync + 'static>(&self, descriptor: &TypeDescriptor) -> Option<AdapterRef<T>> {
        let cache = self
            .shared
            .adapters
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        match cache.get(descriptor)? {
            CacheEntry::Ready(any) => Some(any.typed_or_bridge::<T>()),
            CacheEntry::Building(any) => (**any)
                .downcast_ref::<Arc<FutureAdapter<T>>>()
                .map(|pending| pending.clone() as AdapterRef<T>),
        }
    }

    fn run_factories<T: Send + Sync + 'static>(
        &self,
        descriptor: &TypeDescriptor,
    ) -> Option<AdapterRef<T>> {
        let factories: Vec<Arc<dyn AdapterFactory>> = self
            .shared
            .factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        // Most recently registered wins.
        for factory in factories.iter().rev() {
            if let Some(any) = factory.create(self, descriptor) {
                return Some(any.typed_or_bridge::<T>());
            }
        }
        None
    }

    fn resolver_wrap<T: Send + Sync + 'static>(
        &self,
        descriptor: &TypeDescriptor,
    ) -> Option<WrapFn<T>> {
        let resolvers = self
            .shared
            .resolvers
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let any = resolvers.get(descriptor)?;
        (**any).downcast_ref::<WrapFn<T>>().cloned()
    }

    /// Appends a factory; later registrations take precedence over
    /// earlier ones and over the built-in adapters.
    pub fn register_factory(&self, factory: impl AdapterFactory + 'static) {
        self.shared
            .factories
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(factory));
        self.clear_adapter_cache();
    }

    /// Registers an adapter bound to exactly `T`'s descriptor.
    pub fn register_adapter<T: Adaptable>(&self, adapter: impl Adapter<T> + 'static) {
        struct ExactFactory {
            descriptor: TypeDescriptor,
            adapter: AnyAdapter,
        }
        impl AdapterFactory for ExactFactory {
            fn create(&self, _: &Engine, descriptor: &TypeDescriptor) -> Option<AnyAdapter> {
                (*descriptor == self.descriptor).then(|| self.adapter.clone())
            }
        }
        self.register_factory(ExactFactory {
            descriptor: T::descriptor(),
            adapter: AnyAdapter::new(Arc::new(adapter) as AdapterRef<T>),
        });
    }

    /// Registers an instance creator for `T`, overriding `T::default()`
    /// for structure adapters built afterwards.
    pub fn register_creator<T: Send + Sync + 'static>(
        &self,
        creator: impl InstanceCreator<T> + 'static,
    ) {
        let creator: Arc<dyn InstanceCreator<T>> = Arc::new(creator);
        self.shared
            .creators
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(TypeDescriptor::of::<T>(), Arc::new(creator));
        self.clear_adapter_cache();
    }

    /// The registered instance creator for `T`, if any.
    pub fn instance_creator<T: Send + Sync + 'static>(&self) -> Option<Arc<dyn InstanceCreator<T>>> {
        let creators = self
            .shared
            .creators
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let any = creators.get(&TypeDescriptor::of::<T>())?;
        (**any).downcast_ref::<Arc<dyn InstanceCreator<T>>>().cloned()
    }

    /// Registers a polymorphic type resolver for its `Value` type.
    ///
    /// Decoding that type then goes through the resolver: the subtree is
    /// buffered, parsed as the resolver's `Base`, and re-parsed as the
    /// concrete type the resolver picks. Concrete subtypes must have an
    /// adapter in the cache at decode time; see [Engine::prepare].
    pub fn register_resolver<R: TypeResolver>(&self, resolver: R) {
        let resolver = Arc::new(resolver);
        let wrap: WrapFn<R::Value> = Arc::new(move |engine: &Engine, underlying| {
            Arc::new(ResolvingAdapter::new(
                resolver.clone(),
                underlying,
                engine.clone(),
            )) as AdapterRef<R::Value>
        });
        self.shared
            .resolvers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(R::Value::descriptor(), Arc::new(wrap));
        self.clear_adapter_cache();
    }

    /// Builds and caches the adapter for `T` without using it, so that
    /// later descriptor-driven lookups (polymorphic resolution) find it.
    pub fn prepare<T: Adaptable>(&self) {
        let _ = self.adapter::<T>();
    }

    pub(crate) fn cached_erased(
        &self,
        descriptor: &TypeDescriptor,
    ) -> Option<Arc<dyn ErasedAdapter>> {
        let cache = self
            .shared
            .adapters
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        match cache.get(descriptor)? {
            CacheEntry::Ready(any) => Some(any.erased()),
            CacheEntry::Building(_) => None,
        }
    }

    fn clear_adapter_cache(&self) {
        self.shared
            .adapters
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Decodes a root tag from `src`, ignoring the root's name.
    pub fn read_from<T: Adaptable>(&self, src: impl Read) -> reader::Res<T> {
        let mut reader = NbtReader::new(src);
        self.adapter::<T>().read(&mut reader)
    }

    /// Decodes a root tag from `src` along with the root's name.
    pub fn read_named_from<T: Adaptable>(&self, src: impl Read) -> reader::Res<(String, T)> {
        let mut reader = NbtReader::new(src);
        reader.peek()?;
        let name = reader.name()?.to_string();
        let value = self.adapter::<T>().read(&mut reader)?;
        Ok((name, value))
    }

    /// Decodes a root tag from a byte slice.
    pub fn from_bytes<T: Adaptable>(&self, bytes: &[u8]) -> reader::Res<T> {
        self.read_from(bytes)
    }

    /// Encodes `value` as a root tag with an empty name.
    pub fn write_to<T: Adaptable>(&self, value: &T, dst: impl Write) -> writer::Res {
        let mut writer = NbtWriter::new(dst);
        self.adapter::<T>().write(value, &mut writer)?;
        writer.close()?;
        Ok(())
    }

    /// Encodes `value` as a root tag named `name`.
    pub fn write_named_to<T: Adaptable>(
        &self,
        name: &str,
        value: &T,
        dst: impl Write,
    ) -> writer::Res {
        let mut writer = NbtWriter::new(dst);
        writer.name(name)?;
        self.adapter::<T>().write(value, &mut writer)?;
        writer.close()?;
        Ok(())
    }

    /// Encodes `value` into a fresh byte vector.
    pub fn to_bytes<T: Adaptable>(&self, value: &T) -> Result<Vec<u8>, ErrorPath<WriteError>> {
        let mut buf = Vec::new();
        self.write_to(value, &mut buf)?;
        Ok(buf)
    }
}

/// Configures and builds an [Engine].
///
/// Everything the builder does can also be done on a live engine; the
/// builder just keeps construction-time configuration in one place.
#[derive(Default)]
pub struct EngineBuilder {
    naming: NamingStrategy,
    #[allow(clippy::type_complexity)]
    ops: Vec<Box<dyn FnOnce(&Engine)>>,
}

impl EngineBuilder {
    /// Sets the naming strategy for structure adapters.
    pub fn naming_strategy(mut self, strategy: NamingStrategy) -> Self {
        self.naming = strategy;
        self
    }

    /// Appends an adapter factory; later registrations win.
    pub fn factory(mut self, factory: impl AdapterFactory + 'static) -> Self {
        self.ops
            .push(Box::new(move |engine| engine.register_factory(factory)));
        self
    }

    /// Registers an adapter bound to exactly `T`'s descriptor.
    pub fn adapter<T: Adaptable>(mut self, adapter: impl Adapter<T> + 'static) -> Self {
        self.ops
            .push(Box::new(move |engine| engine.register_adapter(adapter)));
        self
    }

    /// Registers an instance creator for `T`.
    pub fn creator<T: Send + Sync + 'static>(
        mut self,
        creator: impl InstanceCreator<T> + 'static,
    ) -> Self {
        self.ops
            .push(Box::new(move |engine| engine.register_creator(creator)));
        self
    }

    /// Registers a polymorphic type resolver.
    pub fn resolver<R: TypeResolver>(mut self, resolver: R) -> Self {
        self.ops
            .push(Box::new(move |engine| engine.register_resolver(resolver)));
        self
    }

    /// Builds the engine and applies every queued registration in order.
    pub fn build(self) -> Engine {
        let engine = Engine::new();
        engine.set_naming_strategy(self.naming);
        for op in self.ops {
            op(&engine);
        }
        engine
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn adapters_are_cached_and_unique() {
        let engine = Engine::new();
        let a = engine.adapter::<i32>();
        let b = engine.adapter::<i32>();
        assert!(Arc::ptr_eq(&a, &b));
    }

    struct FixedIntAdapter(i32);

    impl Adapter<i32> for FixedIntAdapter {
        fn kind(&self) -> TagKind {
            TagKind::Int
        }

        fn write(&self, _: &i32, sink: &mut dyn TagSink) -> writer::Res {
            sink.write_int(self.0)
        }

        fn read(&self, source: &mut dyn TagSource) -> reader::Res<i32> {
            source.read_int()?;
            Ok(self.0)
        }
    }

    #[test]
    fn later_registrations_win() {
        let engine = Engine::new();
        engine.register_adapter::<i32>(FixedIntAdapter(1));
        engine.register_adapter::<i32>(FixedIntAdapter(2));

        let bytes = engine.to_bytes(&0i32).unwrap();
        let back: i32 = engine.from_bytes(&bytes).unwrap();
        assert_eq!(back, 2);
    }

    #[test]
    fn registration_clears_the_cache() {
        let engine = Engine::new();
        let before = engine.adapter::<i32>();
        engine.register_adapter::<i32>(FixedIntAdapter(7));
        let after = engine.adapter::<i32>();
        assert!(!Arc::ptr_eq(&before, &after));
        let bytes = engine.to_bytes(&0i32).unwrap();
        assert_eq!(engine.from_bytes::<i32>(&bytes).unwrap(), 7);
    }

    #[test]
    fn factories_fall_through_to_builtins() {
        struct DeclinesEverything;
        impl AdapterFactory for DeclinesEverything {
            fn create(&self, _: &Engine, _: &TypeDescriptor) -> Option<AnyAdapter> {
                None
            }
        }
        let engine = Engine::builder().factory(DeclinesEverything).build();
        let bytes = engine.to_bytes(&123i32).unwrap();
        assert_eq!(engine.from_bytes::<i32>(&bytes).unwrap(), 123);
    }

    #[test]
    fn concurrent_lookups_share_one_adapter() {
        let engine = Engine::new();
        let mut handles = Vec::new();
        for _ in 0..8 {
            let engine = engine.clone();
            handles.push(std::thread::spawn(move || engine.adapter::<Vec<i64>>()));
        }
        let adapters: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        // All threads may have built one, but the cache holds exactly one
        // and later lookups return it.
        let canonical = engine.adapter::<Vec<i64>>();
        let bytes = engine.to_bytes(&vec![1i64, 2, 3]).unwrap();
        for adapter in adapters {
            drop(adapter);
        }
        let back: Vec<i64> = engine.from_bytes(&bytes).unwrap();
        assert_eq!(back, [1, 2, 3]);
        drop(canonical);
    }
}
