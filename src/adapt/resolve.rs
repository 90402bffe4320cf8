//! Polymorphic decoding through registered type resolvers.
use std::any::Any;
use std::sync::Arc;

use crate::adapter::{Adaptable, Adapter, AdapterRef};
use crate::descriptor::TypeDescriptor;
use crate::engine::Engine;
use crate::err::{ErrorPath, ReadError};
use crate::reader::{NbtReader, TagSource};
use crate::writer::TagSink;
use crate::{reader, writer, TagKind};

/// A policy for decoding a polymorphic type.
///
/// The subtree is buffered verbatim, parsed once as [TypeResolver::Base],
/// and then re-parsed as whatever concrete type [TypeResolver::resolve]
/// picks from the base value. The concrete type's adapter is looked up in
/// the engine's cache by descriptor, so subtypes must be registered or
/// pre-built with [Engine::prepare] after the resolver is registered;
/// registration clears the cache.
pub trait TypeResolver: Send + Sync + 'static {
    /// The polymorphic type decoded through this resolver.
    type Value: Adaptable;
    /// The shape parsed first to decide on the concrete type.
    type Base: Adaptable;

    /// Picks the concrete type to re-parse the subtree as.
    ///
    /// `None`, a descriptor with no cached adapter, or `Value`'s own
    /// descriptor all fall back to the adapter the engine would have used
    /// without the resolver.
    fn resolve(&self, base: &Self::Base) -> Option<TypeDescriptor>;

    /// Converts the re-parsed concrete value into `Value`.
    ///
    /// The default downcasts, which covers resolvers whose `Value` is the
    /// concrete type itself; resolvers producing enum wrappers or boxed
    /// trait objects override this.
    fn assemble(&self, parsed: Box<dyn Any>) -> reader::Res<Self::Value> {
        match parsed.downcast::<Self::Value>() {
            Ok(value) => Ok(*value),
            Err(_) => Err(ErrorPath::new(ReadError::CorruptData(format!(
                "resolved value is not a {}",
                std::any::type_name::<Self::Value>()
            )))),
        }
    }

    /// The only sanctioned recovery point: called when parsing the base
    /// or the resolved type fails, with `base` present once the base
    /// parse has succeeded. The default rethrows.
    fn on_error(
        &self,
        error: ErrorPath<ReadError>,
        base: Option<&Self::Base>,
    ) -> reader::Res<Self::Value> {
        let _ = base;
        Err(error)
    }
}

/// The adapter wrapped around a type's ordinary adapter when a resolver
/// is registered for it. Writing is untouched; reading follows the
/// buffer/parse/resolve/re-parse dance described on [TypeResolver].
pub(crate) struct ResolvingAdapter<R: TypeResolver> {
    resolver: Arc<R>,
    underlying: AdapterRef<R::Value>,
    engine: Engine,
}

impl<R: TypeResolver> ResolvingAdapter<R> {
    pub(crate) fn new(resolver: Arc<R>, underlying: AdapterRef<R::Value>, engine: Engine) -> Self {
        Self {
            resolver,
            underlying,
            engine,
        }
    }
}

impl<R: TypeResolver> Adapter<R::Value> for ResolvingAdapter<R> {
    fn kind(&self) -> TagKind {
        self.underlying.kind()
    }

    fn write(&self, value: &R::Value, sink: &mut dyn TagSink) -> writer::Res {
        self.underlying.write(value, sink)
    }

    fn read(&self, source: &mut dyn TagSource) -> reader::Res<R::Value> {
        let raw = source.capture_raw()?;

        let base_adapter = self.engine.adapter::<R::Base>();
        let mut base_reader = NbtReader::new(raw.as_slice());
        let base = match base_adapter.read(&mut base_reader) {
            Ok(base) => base,
            Err(e) => return self.resolver.on_error(e, None),
        };

        if let Some(descriptor) = self.resolver.resolve(&base) {
            if descriptor != R::Value::descriptor() {
                if let Some(erased) = self.engine.cached_erased(&descriptor) {
                    let mut again = NbtReader::new(raw.as_slice());
                    return match erased.read_any(&mut again) {
                        Ok(parsed) => self.resolver.assemble(parsed),
                        Err(e) => self.resolver.on_error(e, Some(&base)),
                    };
                }
            }
        }

        let mut again = NbtReader::new(raw.as_slice());
        match self.underlying.read(&mut again) {
            Ok(value) => Ok(value),
            Err(e) => self.resolver.on_error(e, Some(&base)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;
    use crate::nbt_struct;
    use crate::value::Value;

    #[derive(Debug, PartialEq, Default, Clone)]
    struct Circle {
        shape: String,
        radius: f64,
    }

    nbt_struct!(Circle {
        shape: String,
        radius: f64,
    });

    #[derive(Debug, PartialEq, Default, Clone)]
    struct Square {
        shape: String,
        side: f64,
    }

    nbt_struct!(Square {
        shape: String,
        side: f64,
    });

    #[derive(Debug, PartialEq, Clone)]
    enum Shape {
        Circle(Circle),
        Square(Square),
    }

    struct ShapeAdapter;

    impl Adapter<Shape> for ShapeAdapter {
        fn kind(&self) -> TagKind {
            TagKind::Compound
        }

        fn write(&self, value: &Shape, sink: &mut dyn TagSink) -> writer::Res {
            match value {
                Shape::Circle(c) => Circle::build_adapter(&Engine::new()).write(c, sink),
                Shape::Square(s) => Square::build_adapter(&Engine::new()).write(s, sink),
            }
        }

        fn read(&self, source: &mut dyn TagSource) -> reader::Res<Shape> {
            Err(ErrorPath::new_with_path(
                ReadError::CorruptData("shape subtype was not resolved".to_string()),
                source.path(),
            ))
        }
    }

    impl Adaptable for Shape {
        fn build_adapter(_: &Engine) -> AdapterRef<Self> {
            Arc::new(ShapeAdapter)
        }
    }

    struct ShapeResolver;

    impl TypeResolver for ShapeResolver {
        type Value = Shape;
        type Base = Value;

        fn resolve(&self, base: &Value) -> Option<TypeDescriptor> {
            match base.get_string("shape")?.as_str() {
                "circle" => Some(TypeDescriptor::of::<Circle>()),
                "square" => Some(TypeDescriptor::of::<Square>()),
                _ => None,
            }
        }

        fn assemble(&self, parsed: Box<dyn Any>) -> reader::Res<Shape> {
            let parsed = match parsed.downcast::<Circle>() {
                Ok(circle) => return Ok(Shape::Circle(*circle)),
                Err(other) => other,
            };
            match parsed.downcast::<Square>() {
                Ok(square) => Ok(Shape::Square(*square)),
                Err(_) => Err(ErrorPath::new(ReadError::CorruptData(
                    "resolved shape has an unexpected type".to_string(),
                ))),
            }
        }
    }

    fn shape_engine() -> Engine {
        let engine = Engine::new();
        engine.register_resolver(ShapeResolver);
        // Registration cleared the cache, so prepare the subtypes after.
        engine.prepare::<Circle>();
        engine.prepare::<Square>();
        engine
    }

    #[test]
    fn resolves_concrete_subtypes() {
        let engine = shape_engine();
        let circle = Circle {
            shape: "circle".into(),
            radius: 2.5,
        };
        let bytes = engine
            .to_bytes(&Shape::Circle(circle.clone()))
            .unwrap();
        let back: Shape = engine.from_bytes(&bytes).unwrap();
        assert_eq!(back, Shape::Circle(circle));

        let square = Square {
            shape: "square".into(),
            side: 4.0,
        };
        let bytes = engine.to_bytes(&Shape::Square(square.clone())).unwrap();
        assert_eq!(
            engine.from_bytes::<Shape>(&bytes).unwrap(),
            Shape::Square(square)
        );
    }

    #[test]
    fn unknown_subtype_falls_back_to_the_underlying_adapter() {
        let engine = shape_engine();
        let value = Value::compound().with("shape", "triangle").build();
        let bytes = engine.to_bytes(&value).unwrap();
        let err = engine.from_bytes::<Shape>(&bytes).unwrap_err();
        assert!(matches!(err.inner, ReadError::CorruptData(_)));
    }

    struct RecoveringResolver;

    impl TypeResolver for RecoveringResolver {
        type Value = Shape;
        type Base = Value;

        fn resolve(&self, _: &Value) -> Option<TypeDescriptor> {
            Some(TypeDescriptor::of::<Circle>())
        }

        fn on_error(
            &self,
            _: ErrorPath<ReadError>,
            _: Option<&Value>,
        ) -> reader::Res<Shape> {
            Ok(Shape::Circle(Circle {
                shape: "fallback".into(),
                radius: 0.0,
            }))
        }
    }

    #[test]
    fn on_error_may_recover() {
        let engine = Engine::new();
        engine.register_resolver(RecoveringResolver);
        // Circle is deliberately not prepared, and the payload is not a
        // compound, so the underlying parse fails and the hook kicks in.
        let bytes = engine.to_bytes(&42i32).unwrap();
        let back: Shape = engine.from_bytes(&bytes).unwrap();
        assert_eq!(
            back,
            Shape::Circle(Circle {
                shape: "fallback".into(),
                radius: 0.0
            })
        );
    }
}
