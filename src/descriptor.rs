//! See [TypeDescriptor].
use std::any::TypeId;
use std::fmt::{Display, Formatter};

/// A runtime value representing a concrete Rust type, optionally
/// parameterized by argument descriptors.
///
/// Descriptors key the engine's adapter cache and are the currency of
/// factories and polymorphic type resolvers: a factory is asked whether it
/// can build an adapter for a descriptor, and a resolver answers "parse
/// the rest of this subtree as the type behind that descriptor".
///
/// Equality and hashing are structural over the raw type id and the
/// argument list. Monomorphization already distinguishes `Vec<i32>` from
/// `Vec<String>` at the `TypeId` level, so arguments are only needed when
/// a single registration should carry extra typing context of its own.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeDescriptor {
    id: TypeId,
    name: &'static str,
    args: Vec<TypeDescriptor>,
}

impl TypeDescriptor {
    /// The descriptor of the bare type `T`.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            args: Vec::new(),
        }
    }

    /// The descriptor of `T` carrying explicit argument descriptors.
    pub fn parameterized<T: ?Sized + 'static>(args: Vec<TypeDescriptor>) -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            args,
        }
    }

    /// Whether this descriptor's raw type is `T`, ignoring arguments.
    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }

    /// The raw type id.
    pub fn raw_id(&self) -> TypeId {
        self.id
    }

    /// The raw type's name, for diagnostics only; not part of equality in
    /// any meaningful sense beyond its one-to-one mapping to the id.
    pub fn type_name(&self) -> &'static str {
        self.name
    }

    /// The argument descriptors.
    pub fn args(&self) -> &[TypeDescriptor] {
        &self.args
    }

    /// The argument descriptor at `index`, if present.
    pub fn arg(&self, index: usize) -> Option<&TypeDescriptor> {
        self.args.get(index)
    }
}

impl Display for TypeDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name)?;
        if !self.args.is_empty() {
            f.write_str("<")?;
            for (i, arg) in self.args.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                arg.fmt(f)?;
            }
            f.write_str(">")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    fn hash(d: &TypeDescriptor) -> u64 {
        let mut h = DefaultHasher::new();
        d.hash(&mut h);
        h.finish()
    }

    #[test]
    fn equality_is_structural() {
        assert_eq!(TypeDescriptor::of::<Vec<i32>>(), TypeDescriptor::of::<Vec<i32>>());
        assert_ne!(TypeDescriptor::of::<Vec<i32>>(), TypeDescriptor::of::<Vec<i64>>());

        let plain = TypeDescriptor::of::<Vec<i32>>();
        let tagged =
            TypeDescriptor::parameterized::<Vec<i32>>(vec![TypeDescriptor::of::<i32>()]);
        assert_ne!(plain, tagged);
        assert_eq!(hash(&plain), hash(&TypeDescriptor::of::<Vec<i32>>()));
    }

    #[test]
    fn raw_queries() {
        let d = TypeDescriptor::parameterized::<Vec<i32>>(vec![TypeDescriptor::of::<i32>()]);
        assert!(d.is::<Vec<i32>>());
        assert!(!d.is::<Vec<i64>>());
        assert!(d.arg(0).unwrap().is::<i32>());
        assert!(d.arg(1).is_none());
    }
}
