//! Type models: the declarative description of a type's serializable shape.
//!
//! Every modeled type owns exactly one [`Model`], cached by the
//! [`ModelRegistry`]. The model's [`ModelKind`] is a closed set of shapes,
//! and each session (writer, reader, copier) matches on it exhaustively.
//!
//! Values are handled type-erased as `&dyn Any` / [`BoxedValue`]. The
//! operations stored in a model are monomorphized for the modeled type and
//! downcast internally, so a mismatched value surfaces as
//! [`ModelError::TypeMismatch`] rather than a panic.

// -----------------------------------------------------------------------------
// Modules

mod array;
mod composite;
mod leaf;
mod map;
mod optional;
mod reference;

// -----------------------------------------------------------------------------
// Exports

pub use array::{ArrayModel, ArrayOps};
pub use composite::CompositeModel;
pub use leaf::{LeafModel, LeafValue};
pub use map::{MapModel, MapOps};
pub use optional::{OptionalModel, OptionalOps};
pub use reference::{RefKind, ReferenceModel, ReferenceOps};

// -----------------------------------------------------------------------------
// Imports

use alloc::borrow::Cow;
use alloc::boxed::Box;
use alloc::vec::Vec;
use core::any::{Any, TypeId};
use core::fmt;
use core::marker::PhantomData;
use std::sync::OnceLock;

use crate::handle::{ObjectGuard, ObjectGuardMut, ObjectRef};
use crate::property::Property;
use crate::{ModelError, ModelRegistry};

/// An owned, type-erased value.
pub type BoxedValue = Box<dyn Any + Send + Sync>;

/// Produces the default instance of `T`.
pub type DefaultFn<T> = fn(&ModelRegistry) -> Result<T, ModelError>;

// -----------------------------------------------------------------------------
// Modeled

/// A type that can describe itself with a [`Model`].
///
/// Usually implemented with `#[derive(Model)]`; leaf types can use
/// [`impl_leaf!`](crate::impl_leaf).
///
/// # Examples
///
/// ```
/// use vc_model::{Model, Modeled, ModelBuilder, ModelError, ModelRegistry};
/// use std::borrow::Cow;
///
/// #[derive(Default)]
/// struct Light {
///     intensity: f32,
/// }
///
/// impl Modeled for Light {
///     fn type_name() -> Cow<'static, str> {
///         Cow::Borrowed("demo::Light")
///     }
///
///     fn build_model(registry: &ModelRegistry) -> Result<Model, ModelError> {
///         ModelBuilder::<Self>::new(registry)
///             .field("intensity", |v| &v.intensity, |v| &mut v.intensity)
///             .range(0.0, 10.0)
///             .build()
///     }
/// }
///
/// let registry = ModelRegistry::new();
/// let model = registry.get::<Light>().unwrap();
/// assert_eq!(model.name(), "demo::Light");
/// assert_eq!(model.properties().len(), 1);
/// ```
pub trait Modeled: Any + Send + Sync + Sized {
    /// Whether a property of this type accepts null by default.
    const NULLABLE: bool = false;

    /// The declared name, written as the type tag.
    fn type_name() -> Cow<'static, str>;

    /// Builds the model of `Self`.
    ///
    /// Called at most once per registry in the common case, but may run
    /// more than once when threads race on first use; only one result is
    /// retained.
    fn build_model(registry: &ModelRegistry) -> Result<Model, ModelError>;
}

// -----------------------------------------------------------------------------
// ModelSource

/// A lazy pointer to the model of a type.
///
/// Properties and containers store sources instead of models, so recursive
/// types (a node holding references to nodes) never build eagerly.
#[derive(Clone, Copy)]
pub struct ModelSource {
    type_id: TypeId,
    type_name: fn() -> Cow<'static, str>,
    build: fn(&ModelRegistry) -> Result<Model, ModelError>,
}

impl ModelSource {
    /// The source of `T`'s model.
    #[inline]
    pub fn of<T: Modeled>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: T::type_name,
            build: T::build_model,
        }
    }

    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    #[inline]
    pub fn type_name(&self) -> Cow<'static, str> {
        (self.type_name)()
    }

    #[inline]
    pub(crate) fn build(&self, registry: &ModelRegistry) -> Result<Model, ModelError> {
        (self.build)(registry)
    }
}

impl fmt::Debug for ModelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ModelSource").field(&self.type_name()).finish()
    }
}

// -----------------------------------------------------------------------------
// ModelKind

/// The shape of a modeled type.
pub enum ModelKind {
    /// Inline literal values.
    Leaf(LeafModel),
    /// Ordered containers.
    Array(ArrayModel),
    /// Keyed containers.
    Map(MapModel),
    /// Types described by an ordered property list.
    Composite(CompositeModel),
    /// `Option<T>`.
    Optional(OptionalModel),
    /// Shared handles, written by reference id.
    Reference(ReferenceModel),
}

impl ModelKind {
    /// Name of the variant, for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Leaf(_) => "leaf",
            Self::Array(_) => "array",
            Self::Map(_) => "map",
            Self::Composite(_) => "composite",
            Self::Optional(_) => "optional",
            Self::Reference(_) => "reference",
        }
    }
}

// -----------------------------------------------------------------------------
// Model

/// The description of one type's serializable shape.
pub struct Model {
    name: Cow<'static, str>,
    type_id: TypeId,
    kind: ModelKind,
    ops: Box<dyn ValueOps>,
    default_instance: OnceLock<Option<BoxedValue>>,
}

impl Model {
    /// Creates the model of `T`.
    ///
    /// `default` creates fresh instances; types without one cannot be
    /// allocated by the reader and must always be written inline or
    /// through handles of other types.
    pub fn new<T: Modeled>(kind: ModelKind, default: Option<DefaultFn<T>>) -> Self {
        Self {
            name: T::type_name(),
            type_id: TypeId::of::<T>(),
            kind,
            ops: Box::new(TypedOps::<T> {
                default,
                _marker: PhantomData,
            }),
            default_instance: OnceLock::new(),
        }
    }

    /// The model of a leaf type using its [`Default`] value.
    pub fn leaf<T: LeafValue + Modeled + Default>() -> Self {
        Self::new::<T>(ModelKind::Leaf(LeafModel::new::<T>()), Some(default_of::<T>))
    }

    /// The declared type name, used as the type tag on the wire.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    #[inline]
    pub fn kind(&self) -> &ModelKind {
        &self.kind
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, ModelKind::Leaf(_))
    }

    #[inline]
    pub fn as_composite(&self) -> Option<&CompositeModel> {
        match &self.kind {
            ModelKind::Composite(composite) => Some(composite),
            _ => None,
        }
    }

    /// Properties of a composite model, empty for every other kind.
    #[inline]
    pub fn properties(&self) -> &[Property] {
        self.as_composite()
            .map(CompositeModel::properties)
            .unwrap_or_default()
    }

    /// Finds a property by name.
    #[inline]
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.as_composite()?.property(name)
    }

    /// Creates a fresh default instance.
    #[inline]
    pub fn new_default(&self, registry: &ModelRegistry) -> Result<BoxedValue, ModelError> {
        self.ops.new_default(registry)
    }

    /// The cached default instance, created once on first use.
    ///
    /// `None` when the type has no default.
    pub fn default_instance(&self, registry: &ModelRegistry) -> Option<&dyn Any> {
        let instance = self.default_instance.get_or_init(|| {
            self.ops
                .new_default(registry)
                .map_err(|err| log::debug!("no default instance for `{}`: {err}", self.name))
                .ok()
        });
        instance.as_deref().map(|value| value as &dyn Any)
    }

    /// Replaces `target` with `value`.
    #[inline]
    pub(crate) fn assign(&self, target: &mut dyn Any, value: BoxedValue) -> Result<(), ModelError> {
        self.ops.assign(target, value)
    }

    /// Wraps `value` into a new mutable shared object.
    #[inline]
    pub(crate) fn share(&self, value: BoxedValue) -> Result<ObjectRef, ModelError> {
        self.ops.share(value)
    }

    /// Wraps `value` into a new frozen shared object.
    #[inline]
    pub(crate) fn freeze(&self, value: BoxedValue) -> Result<ObjectRef, ModelError> {
        self.ops.freeze(value)
    }

    /// Read access to an object of this model's type.
    #[inline]
    pub(crate) fn read<'a>(&self, object: &'a ObjectRef) -> Result<ObjectGuard<'a>, ModelError> {
        self.ops.read(object)
    }

    /// Write access to a mutable object of this model's type.
    #[inline]
    pub(crate) fn write<'a>(
        &self,
        object: &'a ObjectRef,
    ) -> Result<ObjectGuardMut<'a>, ModelError> {
        self.ops.write(object)
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("Model");
        debug.field("name", &self.name);
        debug.field("kind", &self.kind.kind_name());
        if let ModelKind::Composite(composite) = &self.kind {
            let names: Vec<&str> =
                composite.properties().iter().map(Property::name).collect();
            debug.field("properties", &names);
        }
        debug.finish()
    }
}

// -----------------------------------------------------------------------------
// Value operations

pub(crate) trait ValueOps: Send + Sync {
    fn new_default(&self, registry: &ModelRegistry) -> Result<BoxedValue, ModelError>;
    fn assign(&self, target: &mut dyn Any, value: BoxedValue) -> Result<(), ModelError>;
    fn share(&self, value: BoxedValue) -> Result<ObjectRef, ModelError>;
    fn freeze(&self, value: BoxedValue) -> Result<ObjectRef, ModelError>;
    fn read<'a>(&self, object: &'a ObjectRef) -> Result<ObjectGuard<'a>, ModelError>;
    fn write<'a>(&self, object: &'a ObjectRef) -> Result<ObjectGuardMut<'a>, ModelError>;
}

struct TypedOps<T> {
    default: Option<DefaultFn<T>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Modeled> ValueOps for TypedOps<T> {
    fn new_default(&self, registry: &ModelRegistry) -> Result<BoxedValue, ModelError> {
        match self.default {
            Some(default) => Ok(Box::new(default(registry)?)),
            None => Err(ModelError::NoDefault {
                type_name: T::type_name().into_owned(),
            }),
        }
    }

    fn assign(&self, target: &mut dyn Any, value: BoxedValue) -> Result<(), ModelError> {
        *downcast_mut::<T>(target)? = downcast_box::<T>(value)?;
        Ok(())
    }

    fn share(&self, value: BoxedValue) -> Result<ObjectRef, ModelError> {
        Ok(ObjectRef::new(downcast_box::<T>(value)?))
    }

    fn freeze(&self, value: BoxedValue) -> Result<ObjectRef, ModelError> {
        Ok(ObjectRef::frozen(downcast_box::<T>(value)?))
    }

    fn read<'a>(&self, object: &'a ObjectRef) -> Result<ObjectGuard<'a>, ModelError> {
        object.read_as::<T>()
    }

    fn write<'a>(&self, object: &'a ObjectRef) -> Result<ObjectGuardMut<'a>, ModelError> {
        object.write_as::<T>()
    }
}

// -----------------------------------------------------------------------------
// Helpers

/// A [`DefaultFn`] backed by [`Default`].
#[inline]
pub fn default_of<T: Default>(_: &ModelRegistry) -> Result<T, ModelError> {
    Ok(T::default())
}

const INCOMPATIBLE: &str = "an incompatible value";

#[inline]
pub(crate) fn downcast_ref<T: Modeled>(value: &dyn Any) -> Result<&T, ModelError> {
    value
        .downcast_ref::<T>()
        .ok_or_else(|| ModelError::mismatch(T::type_name(), INCOMPATIBLE))
}

#[inline]
pub(crate) fn downcast_mut<T: Modeled>(value: &mut dyn Any) -> Result<&mut T, ModelError> {
    value
        .downcast_mut::<T>()
        .ok_or_else(|| ModelError::mismatch(T::type_name(), INCOMPATIBLE))
}

#[inline]
pub(crate) fn downcast_box<T: Modeled>(value: BoxedValue) -> Result<T, ModelError> {
    value
        .downcast::<T>()
        .map(|value| *value)
        .map_err(|_| ModelError::mismatch(T::type_name(), INCOMPATIBLE))
}
