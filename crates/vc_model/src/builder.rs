//! Declarative construction of composite models.

use alloc::borrow::Cow;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::model::{CompositeModel, DefaultFn, ModelKind, default_of};
use crate::property::{
    AccessorPair, EntryMap, FieldAccess, InheritedAccess, MapEntriesProperty, MapEntry, Property,
    PropertyAccess, Range,
};
use crate::{Model, ModelError, ModelRegistry, ModelSource, Modeled};

struct Draft {
    property: Property,
    inherited: bool,
}

/// Builds the composite [`Model`] of `T`.
///
/// Properties are declared in order. Modifiers such as
/// [`nullable`](Self::nullable) or [`range`](Self::range) apply to the
/// property declared last, or to the one picked with
/// [`property`](Self::property). Mistakes are collected and reported by
/// [`build`](Self::build), so a model is never silently incomplete.
///
/// # Examples
///
/// ```
/// use vc_model::{Model, ModelBuilder, ModelError, ModelRegistry, Modeled};
/// use std::borrow::Cow;
///
/// #[derive(Default)]
/// struct Transform {
///     x: f32,
///     y: f32,
/// }
///
/// impl Modeled for Transform {
///     fn type_name() -> Cow<'static, str> {
///         Cow::Borrowed("demo::Transform")
///     }
///     fn build_model(registry: &ModelRegistry) -> Result<Model, ModelError> {
///         ModelBuilder::<Self>::new(registry)
///             .field("x", |v| &v.x, |v| &mut v.x)
///             .field("y", |v| &v.y, |v| &mut v.y)
///             .build()
///     }
/// }
///
/// #[derive(Default)]
/// struct Sprite {
///     transform: Transform,
///     layer: u8,
/// }
///
/// impl Modeled for Sprite {
///     fn type_name() -> Cow<'static, str> {
///         Cow::Borrowed("demo::Sprite")
///     }
///     fn build_model(registry: &ModelRegistry) -> Result<Model, ModelError> {
///         ModelBuilder::<Self>::new(registry)
///             .field("transform", |v| &v.transform, |v| &mut v.transform)
///             .in_place()
///             .field("layer", |v| &v.layer, |v| &mut v.layer)
///             .range(0.0, 31.0)
///             .group("Rendering")
///             .build()
///     }
/// }
///
/// let registry = ModelRegistry::new();
/// let sprite = registry.get::<Sprite>().unwrap();
/// assert!(sprite.property("transform").unwrap().is_in_place());
/// assert_eq!(sprite.property("layer").unwrap().group(), Some("Rendering"));
/// ```
pub struct ModelBuilder<'r, T: Modeled> {
    registry: &'r ModelRegistry,
    default: DefaultFn<T>,
    drafts: Vec<Draft>,
    selected: Option<usize>,
    error: Option<ModelError>,
}

impl<'r, T: Modeled + Default> ModelBuilder<'r, T> {
    /// Starts a model whose default instance is `T::default()`.
    #[inline]
    pub fn new(registry: &'r ModelRegistry) -> Self {
        Self::with_default(registry, default_of::<T>)
    }
}

impl<'r, T: Modeled> ModelBuilder<'r, T> {
    /// Starts a model whose default instance comes from `default`.
    pub fn with_default(registry: &'r ModelRegistry, default: DefaultFn<T>) -> Self {
        Self {
            registry,
            default,
            drafts: Vec::new(),
            selected: None,
            error: None,
        }
    }

    fn fail(&mut self, property: &str, reason: impl Into<String>) {
        if self.error.is_none() {
            self.error = Some(ModelError::property(&T::type_name(), property, reason));
        }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.drafts
            .iter()
            .position(|draft| draft.property.name() == name)
    }

    fn push(&mut self, property: Property, inherited: bool) {
        match self.position(property.name()) {
            Some(index) if self.drafts[index].inherited => {
                // Redeclaring an inherited property overrides it in place.
                self.drafts[index] = Draft {
                    property,
                    inherited,
                };
                self.selected = Some(index);
            }
            Some(_) if inherited => {
                log::debug!(
                    "`{}` inherits `{}` twice; keeping the first",
                    T::type_name(),
                    property.name()
                );
                self.selected = None;
            }
            Some(_) => {
                let name = property.name().to_string();
                self.fail(&name, "declared twice");
                self.selected = None;
            }
            None => {
                self.drafts.push(Draft {
                    property,
                    inherited,
                });
                self.selected = Some(self.drafts.len() - 1);
            }
        }
    }

    // -------------------------------------------------------------------------
    // Declarations

    /// Merges the properties of an embedded base value.
    ///
    /// Base properties keep their flags and precede the properties declared
    /// afterwards. The base model is taken from the registry, so shared
    /// ancestors are built once.
    pub fn extends<B: Modeled>(mut self, base: fn(&T) -> &B, base_mut: fn(&mut T) -> &mut B) -> Self {
        let model = match self.registry.get::<B>() {
            Ok(model) => model,
            Err(err) => {
                if self.error.is_none() {
                    self.error = Some(err);
                }
                return self;
            }
        };
        let Some(composite) = model.as_composite() else {
            self.fail(
                &B::type_name(),
                format!("base type is a {}, not a composite", model.kind().kind_name()),
            );
            return self;
        };
        for property in composite.properties() {
            let mut property = property.clone();
            property.access = Arc::new(InheritedAccess::<T, B> {
                base,
                base_mut,
                inner: Arc::clone(&property.access),
            });
            self.push(property, true);
        }
        self.selected = None;
        self
    }

    /// Declares a property stored in a field.
    pub fn field<V: Modeled>(
        mut self,
        name: impl Into<Cow<'static, str>>,
        get: fn(&T) -> &V,
        get_mut: fn(&mut T) -> &mut V,
    ) -> Self {
        let access = Arc::new(FieldAccess { get, get_mut });
        self.push(
            Property::new(name, ModelSource::of::<V>(), V::NULLABLE, access),
            false,
        );
        self
    }

    /// Declares a property read by a getter and written by a setter.
    pub fn accessor<V: Modeled>(
        mut self,
        name: impl Into<Cow<'static, str>>,
        get: fn(&T) -> V,
        set: fn(&mut T, V),
    ) -> Self {
        let access = Arc::new(AccessorPair { get, set });
        self.push(
            Property::new(name, ModelSource::of::<V>(), V::NULLABLE, access),
            false,
        );
        self
    }

    /// Declares a map field written as a list of `{key, value}` records.
    pub fn map_entries<M: EntryMap>(
        mut self,
        name: impl Into<Cow<'static, str>>,
        get: fn(&T) -> &M,
        get_mut: fn(&mut T) -> &mut M,
    ) -> Self {
        let access = Arc::new(MapEntriesProperty { get, get_mut });
        let value = ModelSource::of::<Vec<MapEntry<M::Key, M::Value>>>();
        self.push(Property::new(name, value, false, access), false);
        self
    }

    /// Declares a property with a custom access implementation.
    pub fn custom(
        mut self,
        name: impl Into<Cow<'static, str>>,
        value: ModelSource,
        access: impl PropertyAccess,
    ) -> Self {
        self.push(Property::new(name, value, false, Arc::new(access)), false);
        self
    }

    // -------------------------------------------------------------------------
    // Selection

    /// Selects a declared or inherited property for the following modifiers.
    pub fn property(mut self, name: &str) -> Self {
        self.selected = self.position(name);
        if self.selected.is_none() {
            self.fail(name, "no such property");
        }
        self
    }

    /// Removes a declared or inherited property.
    pub fn exclude(mut self, name: &str) -> Self {
        match self.position(name) {
            Some(index) => {
                self.drafts.remove(index);
            }
            None => self.fail(name, "cannot exclude a missing property"),
        }
        self.selected = None;
        self
    }

    // -------------------------------------------------------------------------
    // Modifiers

    fn modify(mut self, modifier: &str, f: impl FnOnce(&mut Property)) -> Self {
        match self.selected {
            Some(index) => f(&mut self.drafts[index].property),
            None => self.fail(modifier, "modifier used without a selected property"),
        }
        self
    }

    /// Whether an explicit null is accepted.
    pub fn nullable(self, nullable: bool) -> Self {
        self.modify("nullable", |p| p.nullable = nullable)
    }

    /// The property must be present when no template is given.
    pub fn required(self) -> Self {
        self.modify("required", |p| p.required = true)
    }

    /// Populate the existing value instead of replacing it.
    pub fn in_place(self) -> Self {
        self.modify("in_place", |p| p.in_place = true)
    }

    /// Write the referenced object inline, without identity.
    pub fn flat(self) -> Self {
        self.modify("flat", |p| p.flat = true)
    }

    /// Copies and template inheritance share the referenced objects.
    pub fn shared(self) -> Self {
        self.modify("shared", |p| p.shared = true)
    }

    pub fn copyable(self, copyable: bool) -> Self {
        self.modify("copyable", |p| p.copyable = copyable)
    }

    /// Accepted numeric values, inclusive.
    pub fn range(mut self, min: f64, max: f64) -> Self {
        if min > max {
            self.fail("range", format!("empty range {min}..={max}"));
            return self;
        }
        self.modify("range", |p| p.range = Some(Range { min, max }))
    }

    /// Editor grouping.
    pub fn group(self, group: impl Into<Cow<'static, str>>) -> Self {
        let group = group.into();
        self.modify("group", |p| p.group = Some(group))
    }

    // -------------------------------------------------------------------------
    // Build

    /// Validates the declarations and creates the model.
    pub fn build(self) -> Result<Model, ModelError> {
        if let Some(err) = self.error {
            return Err(err);
        }

        let type_name = T::type_name();
        let mut properties = Vec::with_capacity(self.drafts.len());

        for Draft { property, .. } in self.drafts {
            if property.name().is_empty() || property.name().starts_with('$') {
                return Err(ModelError::property(
                    &type_name,
                    property.name(),
                    "names must be non-empty and may not start with `$`",
                ));
            }

            if property.in_place {
                if !property.access.supports_in_place() {
                    return Err(ModelError::property(
                        &type_name,
                        property.name(),
                        "in-place properties need mutable field access",
                    ));
                }
                // In-place values are stored by value, so their model never
                // depends on the model being built.
                let value = self.registry.resolve(property.value_source())?;
                if value.as_composite().is_some_and(CompositeModel::is_empty) {
                    log::debug!(
                        "`{type_name}`: dropping in-place property `{}` of opaque type `{}`",
                        property.name(),
                        value.name()
                    );
                    continue;
                }
            }

            properties.push(property);
        }

        log::debug!(
            "built model `{type_name}` with {} properties",
            properties.len()
        );

        Ok(Model::new::<T>(
            ModelKind::Composite(CompositeModel::new(properties)),
            Some(self.default),
        ))
    }
}
