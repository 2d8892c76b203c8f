//! Shared object handles.
//!
//! Objects that can be referenced from several places (and so have an
//! identity on the wire) live behind one of these handles:
//!
//! - [`Ref<T>`]: a mutable shared object, `Arc<RwLock<T>>`.
//! - `Arc<T>`: a frozen shared object, immutable once built.
//! - [`ObjectRef`]: either of the above with the concrete type erased.
//!
//! Identity is the address of the shared allocation, so a `Ref<T>` and the
//! `ObjectRef` made from it are the same object.

use alloc::borrow::Cow;
use alloc::boxed::Box;
use alloc::sync::Arc;
use core::any::{Any, TypeId};
use core::fmt;
use core::ops::{Deref, DerefMut};

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::{ModelError, ModelSource, Modeled};

/// Read access to an object with its type erased.
pub struct ObjectGuard<'a>(Box<dyn Deref<Target = dyn Any> + 'a>);

impl Deref for ObjectGuard<'_> {
    type Target = dyn Any;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &**self.0
    }
}

/// Write access to an object with its type erased.
pub struct ObjectGuardMut<'a>(Box<dyn DerefMut<Target = dyn Any> + 'a>);

impl Deref for ObjectGuardMut<'_> {
    type Target = dyn Any;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &**self.0
    }
}

impl DerefMut for ObjectGuardMut<'_> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut **self.0
    }
}

// -----------------------------------------------------------------------------
// Ref

/// A mutable object shared by reference.
///
/// Cloning a `Ref` clones the handle, not the object.
///
/// # Examples
///
/// ```
/// use vc_model::Ref;
///
/// let a = Ref::new(1);
/// let b = a.clone();
/// *b.write() += 1;
///
/// assert_eq!(*a.read(), 2);
/// assert!(Ref::ptr_eq(&a, &b));
/// ```
pub struct Ref<T>(Arc<RwLock<T>>);

impl<T> Ref<T> {
    #[inline]
    pub fn new(value: T) -> Self {
        Self(Arc::new(RwLock::new(value)))
    }

    /// Locks the object for reading.
    #[inline]
    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        self.0.read()
    }

    /// Locks the object for writing.
    #[inline]
    pub fn write(&self) -> RwLockWriteGuard<'_, T> {
        self.0.write()
    }

    /// Whether both handles point at the same object.
    #[inline]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }

    /// The object's identity, stable while any handle is alive.
    #[inline]
    pub fn identity(&self) -> usize {
        Arc::as_ptr(&self.0).cast::<()>() as usize
    }
}

impl<T> Clone for Ref<T> {
    #[inline]
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T: Default> Default for Ref<T> {
    #[inline]
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> fmt::Debug for Ref<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The target is not printed: object graphs may be cyclic.
        write!(f, "Ref({:#x})", self.identity())
    }
}

// -----------------------------------------------------------------------------
// ObjectRef

#[derive(Clone)]
enum Cell {
    /// Holds `RwLock<T>`.
    Shared(Arc<dyn Any + Send + Sync>),
    /// Holds `T`.
    Frozen(Arc<dyn Any + Send + Sync>),
}

/// A shared object of any modeled type.
///
/// # Examples
///
/// ```
/// use vc_model::{ObjectRef, Ref};
///
/// let name = Ref::new(String::from("lamp"));
/// let object = ObjectRef::from(name.clone());
///
/// assert_eq!(object.identity(), name.identity());
/// assert_eq!(object.type_name(), "String");
/// assert!(object.downcast::<String>().is_some());
/// assert!(object.downcast::<i32>().is_none());
/// ```
#[derive(Clone)]
pub struct ObjectRef {
    cell: Cell,
    source: ModelSource,
}

impl ObjectRef {
    /// Creates a new mutable shared object.
    #[inline]
    pub fn new<T: Modeled>(value: T) -> Self {
        Self::from(Ref::new(value))
    }

    /// Creates a new frozen shared object.
    #[inline]
    pub fn frozen<T: Modeled>(value: T) -> Self {
        Self::from(Arc::new(value))
    }

    #[inline]
    fn arc(&self) -> &Arc<dyn Any + Send + Sync> {
        match &self.cell {
            Cell::Shared(arc) | Cell::Frozen(arc) => arc,
        }
    }

    /// The object's identity, equal to the identity of the typed handle it
    /// was made from.
    #[inline]
    pub fn identity(&self) -> usize {
        Arc::as_ptr(self.arc()).cast::<()>() as usize
    }

    #[inline]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        a.identity() == b.identity()
    }

    /// The concrete type of the object.
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.source.type_id()
    }

    #[inline]
    pub fn type_name(&self) -> Cow<'static, str> {
        self.source.type_name()
    }

    #[inline]
    pub fn source(&self) -> ModelSource {
        self.source
    }

    #[inline]
    pub fn is_frozen(&self) -> bool {
        matches!(self.cell, Cell::Frozen(_))
    }

    /// The typed mutable handle, if the object is a `T` and not frozen.
    pub fn downcast<T: Modeled>(&self) -> Option<Ref<T>> {
        match &self.cell {
            Cell::Shared(arc) => Arc::clone(arc).downcast::<RwLock<T>>().ok().map(Ref),
            Cell::Frozen(_) => None,
        }
    }

    /// The typed frozen handle, if the object is a frozen `T`.
    pub fn downcast_frozen<T: Modeled>(&self) -> Option<Arc<T>> {
        match &self.cell {
            Cell::Frozen(arc) => Arc::clone(arc).downcast::<T>().ok(),
            Cell::Shared(_) => None,
        }
    }

    fn mismatch<T: Modeled>(&self) -> ModelError {
        ModelError::mismatch(T::type_name(), self.type_name())
    }

    /// Read access with the type erased; the object must be a `T`.
    ///
    /// Takes a recursive read lock, so the same object may be read again
    /// further down the call stack.
    pub(crate) fn read_as<T: Modeled>(&self) -> Result<ObjectGuard<'_>, ModelError> {
        match &self.cell {
            Cell::Shared(arc) => {
                let lock = arc
                    .downcast_ref::<RwLock<T>>()
                    .ok_or_else(|| self.mismatch::<T>())?;
                Ok(ObjectGuard(Box::new(ReadGuard(lock.read_recursive()))))
            }
            Cell::Frozen(arc) => {
                let value = arc.downcast_ref::<T>().ok_or_else(|| self.mismatch::<T>())?;
                Ok(ObjectGuard(Box::new(FrozenGuard(value))))
            }
        }
    }

    /// Write access with the type erased; the object must be a mutable `T`.
    pub(crate) fn write_as<T: Modeled>(&self) -> Result<ObjectGuardMut<'_>, ModelError> {
        match &self.cell {
            Cell::Shared(arc) => {
                let lock = arc
                    .downcast_ref::<RwLock<T>>()
                    .ok_or_else(|| self.mismatch::<T>())?;
                Ok(ObjectGuardMut(Box::new(WriteGuard(lock.write()))))
            }
            Cell::Frozen(_) => Err(ModelError::Immutable {
                type_name: self.type_name().into_owned(),
            }),
        }
    }
}

impl<T: Modeled> From<Ref<T>> for ObjectRef {
    #[inline]
    fn from(value: Ref<T>) -> Self {
        Self {
            cell: Cell::Shared(value.0),
            source: ModelSource::of::<T>(),
        }
    }
}

impl<T: Modeled> From<Arc<T>> for ObjectRef {
    #[inline]
    fn from(value: Arc<T>) -> Self {
        Self {
            cell: Cell::Frozen(value),
            source: ModelSource::of::<T>(),
        }
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectRef<{}>({:#x})", self.type_name(), self.identity())
    }
}

// -----------------------------------------------------------------------------
// Guards

struct ReadGuard<'a, T>(RwLockReadGuard<'a, T>);

impl<T: Any> Deref for ReadGuard<'_, T> {
    type Target = dyn Any;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

struct FrozenGuard<'a, T>(&'a T);

impl<T: Any> Deref for FrozenGuard<'_, T> {
    type Target = dyn Any;

    #[inline]
    fn deref(&self) -> &Self::Target {
        self.0
    }
}

struct WriteGuard<'a, T>(RwLockWriteGuard<'a, T>);

impl<T: Any> Deref for WriteGuard<'_, T> {
    type Target = dyn Any;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

impl<T: Any> DerefMut for WriteGuard<'_, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.0
    }
}
