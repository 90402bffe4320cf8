//! Mapping adapters: key/value collections serialized as compounds.
use indexmap::IndexMap;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::adapter::{Adaptable, Adapter, AdapterRef};
use crate::engine::Engine;
use crate::err::{ErrorPath, PathPart};
use crate::reader::TagSource;
use crate::writer::TagSink;
use crate::{reader, writer, TagKind};

/// A type that can serve as a compound key.
///
/// NBT names are strings, so keys must map to and from text: `String`
/// does trivially, enums go through their variant name (see
/// [crate::impl_nbt_enum!]). Anything else is unsupported as a key.
pub trait MapKey: Sized + Send + Sync + 'static {
    /// The wire name for this key.
    fn to_name(&self) -> String;
    /// Parses a key back from its wire name.
    fn from_name(name: &str) -> reader::Res<Self>;
}

impl MapKey for String {
    fn to_name(&self) -> String {
        self.clone()
    }

    fn from_name(name: &str) -> reader::Res<Self> {
        Ok(name.to_string())
    }
}

/// A key/value collection the mapping adapter can walk and rebuild.
pub trait Mapping<K, V>: Send + Sync + 'static {
    /// Calls `f` on every entry in the collection's iteration order.
    fn visit(&self, f: &mut dyn FnMut(&K, &V) -> writer::Res) -> writer::Res;
    /// Rebuilds the collection from decoded entries.
    fn collect(entries: Vec<(K, V)>) -> Self;
}

impl<K: Eq + Hash + Send + Sync + 'static, V: Send + Sync + 'static> Mapping<K, V>
    for HashMap<K, V>
{
    fn visit(&self, f: &mut dyn FnMut(&K, &V) -> writer::Res) -> writer::Res {
        for (k, v) in self {
            f(k, v)?;
        }
        Ok(())
    }

    fn collect(entries: Vec<(K, V)>) -> Self {
        entries.into_iter().collect()
    }
}

impl<K: Ord + Send + Sync + 'static, V: Send + Sync + 'static> Mapping<K, V> for BTreeMap<K, V> {
    fn visit(&self, f: &mut dyn FnMut(&K, &V) -> writer::Res) -> writer::Res {
        for (k, v) in self {
            f(k, v)?;
        }
        Ok(())
    }

    fn collect(entries: Vec<(K, V)>) -> Self {
        entries.into_iter().collect()
    }
}

impl<K: Eq + Hash + Send + Sync + 'static, V: Send + Sync + 'static> Mapping<K, V>
    for IndexMap<K, V>
{
    fn visit(&self, f: &mut dyn FnMut(&K, &V) -> writer::Res) -> writer::Res {
        for (k, v) in self {
            f(k, v)?;
        }
        Ok(())
    }

    fn collect(entries: Vec<(K, V)>) -> Self {
        entries.into_iter().collect()
    }
}

/// Adapter for mappings, serialized as a compound with one named entry
/// per key.
///
/// Writes follow the collection's iteration order (insertion order for
/// [IndexMap], which is what the dynamic tree uses); reads accept entries
/// in any order.
pub struct MapAdapter<M, K, V> {
    value: AdapterRef<V>,
    _marker: PhantomData<fn() -> (M, K)>,
}

impl<M, K, V> MapAdapter<M, K, V> {
    /// Creates a mapping adapter around a value adapter.
    pub fn new(value: AdapterRef<V>) -> Self {
        Self {
            value,
            _marker: PhantomData,
        }
    }
}

impl<M, K, V> Adapter<M> for MapAdapter<M, K, V>
where
    M: Mapping<K, V>,
    K: MapKey,
    V: Send + Sync + 'static,
{
    fn kind(&self) -> TagKind {
        TagKind::Compound
    }

    fn write(&self, value: &M, sink: &mut dyn TagSink) -> writer::Res {
        sink.begin_compound()?;
        value.visit(&mut |key, entry| {
            let name = key.to_name();
            sink.name(&name)?;
            self.value
                .write(entry, sink)
                .map_err(|e| e.prepend(PathPart::Field(name)))
        })?;
        sink.end_compound()
    }

    fn read(&self, source: &mut dyn TagSource) -> reader::Res<M> {
        source.begin_compound()?;
        let mut entries = Vec::new();
        loop {
            if source.peek()? == TagKind::End {
                break;
            }
            let name = source.name()?.to_string();
            let key = K::from_name(&name)
                .map_err(|e| ErrorPath::new_with_path(e.boxed.inner, source.path()))?;
            let value = self.value.read(source)?;
            entries.push((key, value));
        }
        source.end_compound()?;
        Ok(M::collect(entries))
    }
}

macro_rules! impl_map_adaptable {
    ($(($map:ident, $($bound:tt)+)),* $(,)?) => {$(
        impl<K, V> Adaptable for $map<K, V>
        where
            K: MapKey + $($bound)+,
            V: Adaptable,
        {
            fn build_adapter(engine: &Engine) -> AdapterRef<Self> {
                Arc::new(MapAdapter::<Self, K, V>::new(engine.adapter::<V>()))
            }
        }
    )*};
}

impl_map_adaptable!((HashMap, Eq + Hash), (BTreeMap, Ord), (IndexMap, Eq + Hash));

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;

    #[test]
    fn string_keyed_maps_round_trip() {
        let engine = Engine::new();
        let mut map = HashMap::new();
        map.insert("a".to_string(), 1i32);
        map.insert("b".to_string(), 2);
        let bytes = engine.to_bytes(&map).unwrap();
        assert_eq!(engine.from_bytes::<HashMap<String, i32>>(&bytes).unwrap(), map);
    }

    #[test]
    fn index_maps_preserve_insertion_order() {
        let engine = Engine::new();
        let mut map = IndexMap::new();
        map.insert("z".to_string(), 26i8);
        map.insert("a".to_string(), 1);
        let bytes = engine.to_bytes(&map).unwrap();
        let back: IndexMap<String, i8> = engine.from_bytes(&bytes).unwrap();
        assert_eq!(
            back.keys().collect::<Vec<_>>(),
            ["z", "a"]
        );
    }

    #[test]
    fn nested_map_values() {
        let engine = Engine::new();
        let mut inner = BTreeMap::new();
        inner.insert("x".to_string(), vec![1i64, 2]);
        let mut map = BTreeMap::new();
        map.insert("inner".to_string(), inner);
        let bytes = engine.to_bytes(&map).unwrap();
        let back: BTreeMap<String, BTreeMap<String, Vec<i64>>> =
            engine.from_bytes(&bytes).unwrap();
        assert_eq!(back, map);
    }
}
