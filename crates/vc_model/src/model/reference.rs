use alloc::boxed::Box;
use core::any::{Any, TypeId};

use super::{BoxedValue, ModelSource};
use crate::ModelError;
use crate::handle::ObjectRef;

/// How a reference type owns its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    /// `Ref<T>`: mutable, registered before population, cycles allowed.
    Shared,
    /// `Arc<T>`: immutable once built, registered after population.
    Frozen,
    /// `ObjectRef`: any type, registered like [`RefKind::Shared`].
    Dynamic,
}

/// Model data of a shared handle type.
pub struct ReferenceModel {
    target: Option<ModelSource>,
    kind: RefKind,
    ops: Box<dyn ReferenceOps>,
}

impl ReferenceModel {
    /// `target` is the statically known type of the referenced object, or
    /// `None` for handles that may point at anything.
    pub fn new(target: Option<ModelSource>, kind: RefKind, ops: impl ReferenceOps + 'static) -> Self {
        Self {
            target,
            kind,
            ops: Box::new(ops),
        }
    }

    #[inline]
    pub fn target(&self) -> Option<ModelSource> {
        self.target
    }

    #[inline]
    pub fn target_type_id(&self) -> Option<TypeId> {
        self.target.map(|target| target.type_id())
    }

    #[inline]
    pub fn ref_kind(&self) -> RefKind {
        self.kind
    }

    /// Whether objects are built before they are registered.
    #[inline]
    pub fn is_frozen(&self) -> bool {
        self.kind == RefKind::Frozen
    }

    #[inline]
    pub(crate) fn handle(&self, value: &dyn Any) -> Result<ObjectRef, ModelError> {
        self.ops.handle(value)
    }

    #[inline]
    pub(crate) fn from_handle(&self, object: &ObjectRef) -> Result<BoxedValue, ModelError> {
        self.ops.from_handle(object)
    }
}

/// Conversion between a typed handle and [`ObjectRef`].
pub trait ReferenceOps: Send + Sync {
    fn handle(&self, value: &dyn Any) -> Result<ObjectRef, ModelError>;

    /// The typed handle for `object`, failing when it has another type.
    fn from_handle(&self, object: &ObjectRef) -> Result<BoxedValue, ModelError>;
}
