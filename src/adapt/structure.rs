//! Structured-type adapters built from field bindings.
//!
//! Rust has no runtime field reflection, so the field walk happens once,
//! up front: every field contributes a [FieldBinding] (names, accessors
//! and the field's adapter), and the [StructAdapter] synthesizes its
//! reader and writer from the binding list. The [crate::nbt_struct!]
//! macro generates the bindings for the common cases; the
//! [StructBuilder] is the full surface behind it.
use std::collections::HashMap;
use std::sync::Arc;

use crate::adapter::{Adaptable, Adapter, AdapterRef, InstanceCreator};
use crate::engine::Engine;
use crate::err::{ErrorPath, PathPart, ReadError};
use crate::naming::NamingStrategy;
use crate::reader::TagSource;
use crate::writer::TagSink;
use crate::{reader, writer, TagKind};

type WriteFn<S> = Box<dyn Fn(&S, &mut dyn TagSink) -> writer::Res + Send + Sync>;
type ReadFn<S> = Box<dyn Fn(&mut S, &mut dyn TagSource) -> reader::Res<()> + Send + Sync>;

/// One field of a structured type: its wire names, and how to move a
/// value of the field between a struct instance and a token stream.
///
/// The first name is used when writing; every name is accepted when
/// reading. The write function is in charge of emitting the field's name
/// (which is how optional fields skip themselves entirely).
pub struct FieldBinding<S> {
    write_name: String,
    aliases: Vec<String>,
    write: WriteFn<S>,
    read: ReadFn<S>,
}

impl<S> FieldBinding<S> {
    /// Builds a binding from explicit functions.
    pub fn new(names: Vec<String>, write: WriteFn<S>, read: ReadFn<S>) -> Self {
        let write_name = names.first().cloned().unwrap_or_default();
        Self {
            write_name,
            aliases: names,
            write,
            read,
        }
    }

    /// The name used when writing this field.
    pub fn write_name(&self) -> &str {
        &self.write_name
    }

    /// Every name accepted for this field when reading.
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }
}

/// Adapter for a structured type, synthesized from its field bindings.
///
/// Writing emits a compound with one named entry per binding, in
/// declaration order. Reading creates a fresh instance, dispatches each
/// named entry to the binding that claims the name, silently skips
/// entries no binding claims, and finally runs the post-deserialize
/// hooks.
pub struct StructAdapter<S> {
    type_name: &'static str,
    bindings: Vec<FieldBinding<S>>,
    lookup: HashMap<String, usize>,
    creator: Option<Arc<dyn InstanceCreator<S>>>,
    hooks: Vec<Box<dyn Fn(&mut S) + Send + Sync>>,
}

impl<S: Send + Sync + 'static> StructAdapter<S> {
    /// Starts building an adapter for `S`, creating instances with a
    /// creator registered on the engine or falling back to
    /// `S::default()`.
    pub fn builder(engine: &Engine) -> StructBuilder<S>
    where
        S: Default,
    {
        let creator = engine
            .instance_creator::<S>()
            .unwrap_or_else(|| Arc::new(|| S::default()) as Arc<dyn InstanceCreator<S>>);
        StructBuilder::new(engine, Some(creator))
    }

    /// Starts building an adapter for `S` without a `Default` bound.
    ///
    /// Instances come from a creator registered on the engine (or set
    /// with [StructBuilder::creator]); with neither, decoding fails with
    /// [ReadError::NoConstructor].
    pub fn builder_registered(engine: &Engine) -> StructBuilder<S> {
        let creator = engine.instance_creator::<S>();
        StructBuilder::new(engine, creator)
    }
}

impl<S: Send + Sync + 'static> Adapter<S> for StructAdapter<S> {
    fn kind(&self) -> TagKind {
        TagKind::Compound
    }

    fn write(&self, value: &S, sink: &mut dyn TagSink) -> writer::Res {
        sink.begin_compound()?;
        for binding in &self.bindings {
            (binding.write)(value, sink)?;
        }
        sink.end_compound()
    }

    fn read(&self, source: &mut dyn TagSource) -> reader::Res<S> {
        let creator = self.creator.as_ref().ok_or_else(|| {
            ErrorPath::new_with_path(ReadError::NoConstructor(self.type_name), source.path())
        })?;
        let mut value = creator.create()?;
        source.begin_compound()?;
        loop {
            if source.peek()? == TagKind::End {
                break;
            }
            let name = source.name()?.to_string();
            match self.lookup.get(&name) {
                Some(&index) => (self.bindings[index].read)(&mut value, source)?,
                // Entries no binding claims are structural surplus.
                None => source.skip(0)?,
            }
        }
        source.end_compound()?;
        for hook in &self.hooks {
            hook(&mut value);
        }
        Ok(value)
    }
}

/// Collects the field bindings, creator and hooks of a [StructAdapter].
pub struct StructBuilder<S> {
    engine: Engine,
    naming: NamingStrategy,
    type_name: &'static str,
    bindings: Vec<FieldBinding<S>>,
    lookup: HashMap<String, usize>,
    creator: Option<Arc<dyn InstanceCreator<S>>>,
    hooks: Vec<Box<dyn Fn(&mut S) + Send + Sync>>,
}

impl<S: Send + Sync + 'static> StructBuilder<S> {
    fn new(engine: &Engine, creator: Option<Arc<dyn InstanceCreator<S>>>) -> Self {
        Self {
            engine: engine.clone(),
            // Snapshot: strategy changes do not retrofit built adapters.
            naming: engine.naming_strategy(),
            type_name: std::any::type_name::<S>(),
            bindings: Vec::new(),
            lookup: HashMap::new(),
            creator,
            hooks: Vec::new(),
        }
    }

    /// Adds a field whose wire name is derived from the declared name by
    /// the engine's naming strategy.
    pub fn field<F: Adaptable>(
        self,
        declared: &str,
        get: impl Fn(&S) -> &F + Send + Sync + 'static,
        set: impl Fn(&mut S, F) + Send + Sync + 'static,
    ) -> Self {
        let adapter = self.engine.adapter::<F>();
        let name = self.naming.apply(declared);
        self.binding(vec![name], adapter, get, set)
    }

    /// Adds a field with explicit wire names: the first is used for
    /// writing, all of them (plus the strategy-derived name) are accepted
    /// when reading.
    pub fn renamed_field<F: Adaptable>(
        self,
        declared: &str,
        names: &[&str],
        get: impl Fn(&S) -> &F + Send + Sync + 'static,
        set: impl Fn(&mut S, F) + Send + Sync + 'static,
    ) -> Self {
        let adapter = self.engine.adapter::<F>();
        let all = self.alias_names(declared, names);
        self.binding(all, adapter, get, set)
    }

    /// Adds a field that uses `adapter` instead of the engine's adapter
    /// for its type.
    pub fn field_with<F: Send + Sync + 'static>(
        self,
        adapter: impl Adapter<F> + 'static,
        declared: &str,
        get: impl Fn(&S) -> &F + Send + Sync + 'static,
        set: impl Fn(&mut S, F) + Send + Sync + 'static,
    ) -> Self {
        let name = self.naming.apply(declared);
        self.binding(vec![name], Arc::new(adapter), get, set)
    }

    /// Adds a field that writes through `adapter` but reads through the
    /// engine's adapter for its type.
    pub fn field_writing_with<F: Adaptable>(
        self,
        adapter: impl Adapter<F> + 'static,
        declared: &str,
        get: impl Fn(&S) -> &F + Send + Sync + 'static,
        set: impl Fn(&mut S, F) + Send + Sync + 'static,
    ) -> Self {
        let split = SplitAdapter {
            writer: Arc::new(adapter) as AdapterRef<F>,
            reader: self.engine.adapter::<F>(),
        };
        let name = self.naming.apply(declared);
        self.binding(vec![name], Arc::new(split), get, set)
    }

    /// Adds a field that reads through `adapter` but writes through the
    /// engine's adapter for its type.
    pub fn field_reading_with<F: Adaptable>(
        self,
        adapter: impl Adapter<F> + 'static,
        declared: &str,
        get: impl Fn(&S) -> &F + Send + Sync + 'static,
        set: impl Fn(&mut S, F) + Send + Sync + 'static,
    ) -> Self {
        let split = SplitAdapter {
            writer: self.engine.adapter::<F>(),
            reader: Arc::new(adapter) as AdapterRef<F>,
        };
        let name = self.naming.apply(declared);
        self.binding(vec![name], Arc::new(split), get, set)
    }

    /// Adds an `Option` field: `None` is not written at all, and a
    /// missing entry leaves the field untouched when reading.
    pub fn optional_field<F: Adaptable>(
        self,
        declared: &str,
        get: impl Fn(&S) -> &Option<F> + Send + Sync + 'static,
        set: impl Fn(&mut S, F) + Send + Sync + 'static,
    ) -> Self {
        let adapter = self.engine.adapter::<F>();
        let name = self.naming.apply(declared);
        self.optional_binding(vec![name], adapter, get, set)
    }

    /// Adds an `Option` field with explicit wire names.
    pub fn renamed_optional_field<F: Adaptable>(
        self,
        declared: &str,
        names: &[&str],
        get: impl Fn(&S) -> &Option<F> + Send + Sync + 'static,
        set: impl Fn(&mut S, F) + Send + Sync + 'static,
    ) -> Self {
        let adapter = self.engine.adapter::<F>();
        let all = self.alias_names(declared, names);
        self.optional_binding(all, adapter, get, set)
    }

    /// Overrides how instances are created for decoding.
    pub fn creator(mut self, creator: impl InstanceCreator<S> + 'static) -> Self {
        self.creator = Some(Arc::new(creator));
        self
    }

    /// Adds a hook that runs after all fields of a decoded instance are
    /// populated; hooks run in registration order.
    pub fn finalize(mut self, hook: impl Fn(&mut S) + Send + Sync + 'static) -> Self {
        self.hooks.push(Box::new(hook));
        self
    }

    /// Finishes the adapter.
    pub fn build(self) -> AdapterRef<S> {
        Arc::new(StructAdapter {
            type_name: self.type_name,
            bindings: self.bindings,
            lookup: self.lookup,
            creator: self.creator,
            hooks: self.hooks,
        })
    }

    fn alias_names(&self, declared: &str, names: &[&str]) -> Vec<String> {
        let mut all: Vec<String> = names.iter().map(|s| s.to_string()).collect();
        let derived = self.naming.apply(declared);
        if !all.contains(&derived) {
            all.push(derived);
        }
        all
    }

    fn binding<F: Send + Sync + 'static>(
        self,
        names: Vec<String>,
        adapter: AdapterRef<F>,
        get: impl Fn(&S) -> &F + Send + Sync + 'static,
        set: impl Fn(&mut S, F) + Send + Sync + 'static,
    ) -> Self {
        let write_name = names.first().cloned().unwrap_or_default();
        let write_adapter = adapter.clone();
        let write: WriteFn<S> = Box::new(move |value, sink| {
            sink.name(&write_name)?;
            write_adapter
                .write(get(value), sink)
                .map_err(|e| e.prepend(PathPart::Field(write_name.clone())))
        });
        let read: ReadFn<S> = Box::new(move |value, source| {
            set(value, adapter.read(source)?);
            Ok(())
        });
        self.push(FieldBinding::new(names, write, read))
    }

    fn optional_binding<F: Send + Sync + 'static>(
        self,
        names: Vec<String>,
        adapter: AdapterRef<F>,
        get: impl Fn(&S) -> &Option<F> + Send + Sync + 'static,
        set: impl Fn(&mut S, F) + Send + Sync + 'static,
    ) -> Self {
        let write_name = names.first().cloned().unwrap_or_default();
        let write_adapter = adapter.clone();
        let write: WriteFn<S> = Box::new(move |value, sink| match get(value) {
            Some(field) => {
                sink.name(&write_name)?;
                write_adapter
                    .write(field, sink)
                    .map_err(|e| e.prepend(PathPart::Field(write_name.clone())))
            }
            None => Ok(()),
        });
        let read: ReadFn<S> = Box::new(move |value, source| {
            set(value, adapter.read(source)?);
            Ok(())
        });
        self.push(FieldBinding::new(names, write, read))
    }

    fn push(mut self, binding: FieldBinding<S>) -> Self {
        let index = self.bindings.len();
        for alias in binding.aliases() {
            // The first binding to claim a name keeps it.
            self.lookup.entry(alias.clone()).or_insert(index);
        }
        self.bindings.push(binding);
        self
    }
}

/// One-directional adapter pin: each direction delegates to its own
/// adapter.
struct SplitAdapter<F> {
    writer: AdapterRef<F>,
    reader: AdapterRef<F>,
}

impl<F: Send + Sync + 'static> Adapter<F> for SplitAdapter<F> {
    fn kind(&self) -> TagKind {
        self.writer.kind()
    }

    fn write(&self, value: &F, sink: &mut dyn TagSink) -> writer::Res {
        self.writer.write(value, sink)
    }

    fn read(&self, source: &mut dyn TagSource) -> reader::Res<F> {
        self.reader.read(source)
    }
}

/// Declares how a struct maps to NBT and implements [crate::Adaptable]
/// for it.
///
/// Each entry is `field: Type`, optionally with explicit wire names
/// (`field as "Name" | "OldName": Type`) and optionally marked
/// `optional` for `Option` fields (`field: optional Type`, where `Type`
/// is the type inside the `Option`). The struct must implement
/// `Default`.
///
/// ```
/// use cobalt_nbt::{nbt_struct, Engine};
///
/// #[derive(Default, Debug, PartialEq)]
/// struct Level {
///     name: String,
///     seed: i64,
///     border: Option<f64>,
/// }
///
/// nbt_struct!(Level {
///     name as "LevelName": String,
///     seed: i64,
///     border as "BorderSize": optional f64,
/// });
///
/// let engine = Engine::new();
/// let level = Level { name: "world".into(), seed: -1, border: None };
/// let bytes = engine.to_bytes(&level).unwrap();
/// assert_eq!(engine.from_bytes::<Level>(&bytes).unwrap(), level);
/// ```
#[macro_export]
macro_rules! nbt_struct {
    ($typ:ty { $($fields:tt)* }) => {
        impl $crate::Adaptable for $typ {
            fn build_adapter(engine: &$crate::Engine) -> $crate::AdapterRef<Self> {
                let builder = $crate::adapt::StructAdapter::<Self>::builder(engine);
                $crate::nbt_struct!(@fields builder, $($fields)*)
            }
        }
    };

    (@fields $builder:expr, ) => { $builder.build() };

    (@fields $builder:expr, $field:ident as $($alias:literal)|+ : optional $ftyp:ty, $($rest:tt)*) => {
        $crate::nbt_struct!(@fields $builder.renamed_optional_field::<$ftyp>(
            stringify!($field),
            &[$($alias),+],
            |v: &Self| &v.$field,
            |v: &mut Self, x| v.$field = ::std::option::Option::Some(x),
        ), $($rest)*)
    };
    (@fields $builder:expr, $field:ident as $($alias:literal)|+ : optional $ftyp:ty) => {
        $crate::nbt_struct!(@fields $builder, $field as $($alias)|+ : optional $ftyp,)
    };

    (@fields $builder:expr, $field:ident : optional $ftyp:ty, $($rest:tt)*) => {
        $crate::nbt_struct!(@fields $builder.optional_field::<$ftyp>(
            stringify!($field),
            |v: &Self| &v.$field,
            |v: &mut Self, x| v.$field = ::std::option::Option::Some(x),
        ), $($rest)*)
    };
    (@fields $builder:expr, $field:ident : optional $ftyp:ty) => {
        $crate::nbt_struct!(@fields $builder, $field : optional $ftyp,)
    };

    (@fields $builder:expr, $field:ident as $($alias:literal)|+ : $ftyp:ty, $($rest:tt)*) => {
        $crate::nbt_struct!(@fields $builder.renamed_field::<$ftyp>(
            stringify!($field),
            &[$($alias),+],
            |v: &Self| &v.$field,
            |v: &mut Self, x| v.$field = x,
        ), $($rest)*)
    };
    (@fields $builder:expr, $field:ident as $($alias:literal)|+ : $ftyp:ty) => {
        $crate::nbt_struct!(@fields $builder, $field as $($alias)|+ : $ftyp,)
    };

    (@fields $builder:expr, $field:ident : $ftyp:ty, $($rest:tt)*) => {
        $crate::nbt_struct!(@fields $builder.field::<$ftyp>(
            stringify!($field),
            |v: &Self| &v.$field,
            |v: &mut Self, x| v.$field = x,
        ), $($rest)*)
    };
    (@fields $builder:expr, $field:ident : $ftyp:ty) => {
        $crate::nbt_struct!(@fields $builder, $field : $ftyp,)
    };
}
