//! Properties: the named, typed attributes of a composite model.

// -----------------------------------------------------------------------------
// Modules

mod access;
mod map_entries;

// -----------------------------------------------------------------------------
// Exports

pub use access::{AccessorPair, FieldAccess, InheritedAccess};
pub use map_entries::{EntryMap, MapEntriesProperty, MapEntry};

// -----------------------------------------------------------------------------
// Imports

use alloc::borrow::Cow;
use alloc::sync::Arc;
use core::any::{Any, TypeId};
use core::fmt;
use core::ops::Deref;

use crate::{BoxedValue, Model, ModelError, ModelRegistry, ModelSource};

// -----------------------------------------------------------------------------
// PropertyValue

/// A property value read off an owner.
///
/// Field properties lend their storage; accessor properties produce a
/// fresh value.
pub enum PropertyValue<'a> {
    Borrowed(&'a dyn Any),
    Owned(BoxedValue),
}

impl Deref for PropertyValue<'_> {
    type Target = dyn Any;

    #[inline]
    fn deref(&self) -> &Self::Target {
        match self {
            Self::Borrowed(value) => *value,
            Self::Owned(value) => &**value,
        }
    }
}

// -----------------------------------------------------------------------------
// PropertyAccess

/// Reads and writes one property of an owner value.
///
/// `owner` is always an instance of the type the property was declared on.
pub trait PropertyAccess: Send + Sync + 'static {
    fn get<'a>(&self, owner: &'a dyn Any) -> Result<PropertyValue<'a>, ModelError>;

    /// Mutable access to the stored value, for in-place population.
    ///
    /// `None` when the property is not backed by storage the owner exposes.
    fn get_mut<'a>(&self, owner: &'a mut dyn Any) -> Result<Option<&'a mut dyn Any>, ModelError> {
        let _ = owner;
        Ok(None)
    }

    fn set(&self, owner: &mut dyn Any, value: BoxedValue) -> Result<(), ModelError>;

    /// Whether [`get_mut`](PropertyAccess::get_mut) returns a value.
    fn supports_in_place(&self) -> bool {
        false
    }
}

// -----------------------------------------------------------------------------
// Range

/// An inclusive numeric range constraint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    #[inline]
    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }
}

// -----------------------------------------------------------------------------
// Property

/// One named, typed attribute of a composite model.
#[derive(Clone)]
pub struct Property {
    pub(crate) name: Cow<'static, str>,
    pub(crate) value: ModelSource,
    pub(crate) access: Arc<dyn PropertyAccess>,
    pub(crate) nullable: bool,
    pub(crate) required: bool,
    pub(crate) in_place: bool,
    pub(crate) copyable: bool,
    pub(crate) flat: bool,
    pub(crate) shared: bool,
    pub(crate) range: Option<Range>,
    pub(crate) group: Option<Cow<'static, str>>,
}

impl Property {
    /// A property with default flags: nullable when the value type is,
    /// copyable, not in place, not flat.
    pub fn new(
        name: impl Into<Cow<'static, str>>,
        value: ModelSource,
        nullable: bool,
        access: Arc<dyn PropertyAccess>,
    ) -> Self {
        Self {
            name: name.into(),
            value,
            access,
            nullable,
            required: false,
            in_place: false,
            copyable: true,
            flat: false,
            shared: false,
            range: None,
            group: None,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub(crate) fn name_cow(&self) -> Cow<'static, str> {
        self.name.clone()
    }

    /// Where the model of the declared value type comes from.
    #[inline]
    pub fn value_source(&self) -> ModelSource {
        self.value
    }

    #[inline]
    pub fn value_type_id(&self) -> TypeId {
        self.value.type_id()
    }

    /// Whether an explicit null is accepted.
    #[inline]
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Whether the property must be present when there is no template.
    #[inline]
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Whether the existing value is populated instead of replaced.
    #[inline]
    pub fn is_in_place(&self) -> bool {
        self.in_place
    }

    #[inline]
    pub fn is_copyable(&self) -> bool {
        self.copyable
    }

    /// Whether a referenced object is written inline, without identity.
    #[inline]
    pub fn is_flat(&self) -> bool {
        self.flat
    }

    /// Whether copies share the referenced objects instead of duplicating them.
    #[inline]
    pub fn is_shared(&self) -> bool {
        self.shared
    }

    #[inline]
    pub fn range(&self) -> Option<Range> {
        self.range
    }

    #[inline]
    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    #[inline]
    pub fn get<'a>(&self, owner: &'a dyn Any) -> Result<PropertyValue<'a>, ModelError> {
        self.access.get(owner)
    }

    #[inline]
    pub fn get_mut<'a>(
        &self,
        owner: &'a mut dyn Any,
    ) -> Result<Option<&'a mut dyn Any>, ModelError> {
        self.access.get_mut(owner)
    }

    #[inline]
    pub fn set(&self, owner: &mut dyn Any, value: BoxedValue) -> Result<(), ModelError> {
        self.access.set(owner, value)
    }

    /// The value this property has on the owner's default instance.
    pub fn default_value<'a>(
        &self,
        owner: &'a Model,
        registry: &ModelRegistry,
    ) -> Result<Option<PropertyValue<'a>>, ModelError> {
        owner
            .default_instance(registry)
            .map(|instance| self.get(instance))
            .transpose()
    }
}

impl fmt::Debug for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("name", &self.name)
            .field("value", &self.value)
            .field("nullable", &self.nullable)
            .field("required", &self.required)
            .field("in_place", &self.in_place)
            .field("copyable", &self.copyable)
            .field("flat", &self.flat)
            .field("shared", &self.shared)
            .field("range", &self.range)
            .field("group", &self.group)
            .finish()
    }
}
