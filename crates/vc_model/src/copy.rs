//! Deep copies of object graphs.

use alloc::collections::VecDeque;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::any::Any;

use crate::model::{ModelKind, downcast_box};
use crate::utils::IdentityMap;
use crate::{BoxedValue, Model, ModelError, ModelRegistry, Modeled, ObjectRef};

/// One deep copy session.
///
/// Every shared object reachable from the copied value is duplicated once;
/// a graph with shared or cyclic references is copied into a graph with
/// the same shape. Objects reached through several `copy` calls of one
/// session are duplicated only once as well.
///
/// Properties declared `copyable(false)` are skipped, so the copy keeps
/// its default value. Handles in `shared` properties are copied as
/// handles: the copy points at the original objects.
///
/// # Examples
///
/// ```
/// use vc_model::{CopyContext, ModelRegistry, Ref};
///
/// let registry = ModelRegistry::new();
/// let shared = Ref::new(String::from("texture"));
/// let value = vec![shared.clone(), shared];
///
/// let mut context = CopyContext::new(&registry);
/// let copy = context.copy(&value).unwrap();
///
/// assert!(Ref::ptr_eq(&copy[0], &copy[1]));
/// assert!(!Ref::ptr_eq(&copy[0], &value[0]));
/// assert_eq!(*copy[0].read(), "texture");
/// ```
pub struct CopyContext<'r> {
    registry: &'r ModelRegistry,
    /// Source identity to `(source, copy)`.
    copies: IdentityMap<(ObjectRef, ObjectRef)>,
    pending: VecDeque<(ObjectRef, ObjectRef, Arc<Model>)>,
}

impl<'r> CopyContext<'r> {
    pub fn new(registry: &'r ModelRegistry) -> Self {
        Self {
            registry,
            copies: IdentityMap::default(),
            pending: VecDeque::new(),
        }
    }

    /// A deep copy of `value`.
    pub fn copy<T: Modeled>(&mut self, value: &T) -> Result<T, ModelError> {
        let model = self.registry.get::<T>()?;
        let copy = self.value(&model, value, false)?;
        self.drain()?;
        downcast_box::<T>(copy)
    }

    /// Copies the properties of `source` into `target`.
    ///
    /// Non-copyable properties of `target` are left untouched. For types
    /// that are not composites the whole value is replaced.
    pub fn copy_properties<T: Modeled>(&mut self, source: &T, target: &mut T) -> Result<(), ModelError> {
        let model = self.registry.get::<T>()?;
        self.copy_into(&model, source, target)?;
        self.drain()
    }

    /// The copy of a shared object, created on first request.
    pub fn object(&mut self, object: &ObjectRef) -> Result<ObjectRef, ModelError> {
        if let Some((_, copy)) = self.copies.get(&object.identity()) {
            return Ok(copy.clone());
        }

        let model = self.registry.resolve(object.source())?;
        let copy = if object.is_frozen() {
            // Frozen objects cannot be populated later, build them now.
            let guard = model.read(object)?;
            let value = self.value(&model, &*guard, false)?;
            model.freeze(value)?
        } else {
            let copy = model.share(model.new_default(self.registry)?)?;
            self.pending
                .push_back((object.clone(), copy.clone(), model));
            copy
        };
        self.copies
            .insert(object.identity(), (object.clone(), copy.clone()));
        Ok(copy)
    }

    /// A copy of `value`. With `share`, handles are cloned instead of the
    /// objects they point at.
    pub(crate) fn value(
        &mut self,
        model: &Model,
        value: &dyn Any,
        share: bool,
    ) -> Result<BoxedValue, ModelError> {
        match model.kind() {
            ModelKind::Leaf(leaf) => leaf.duplicate(value),
            ModelKind::Optional(optional) => match optional.get(value)? {
                None => Ok(optional.none()),
                Some(inner) => {
                    let inner_model = self.registry.resolve(optional.inner())?;
                    let inner = self.value(&inner_model, inner, share)?;
                    optional.some(inner)
                }
            },
            ModelKind::Array(array) => {
                let element = self.registry.resolve(array.element())?;
                let len = array.len(value)?;
                let mut elements = Vec::with_capacity(len);
                for index in 0..len {
                    if let Some(item) = array.get(value, index)? {
                        elements.push(self.value(&element, item, share)?);
                    }
                }
                array.collect(elements)
            }
            ModelKind::Map(map) => {
                let key_model = self.registry.resolve(map.key())?;
                let value_model = self.registry.resolve(map.value())?;
                let mut entries = Vec::with_capacity(map.len(value)?);
                for (key, entry) in map.entries(value)? {
                    entries.push((
                        self.value(&key_model, key, share)?,
                        self.value(&value_model, entry, share)?,
                    ));
                }
                map.collect(entries)
            }
            ModelKind::Composite(_) => {
                let mut copy = model.new_default(self.registry)?;
                self.copy_into(model, value, &mut *copy)?;
                Ok(copy)
            }
            ModelKind::Reference(reference) => {
                let object = reference.handle(value)?;
                if share {
                    return reference.from_handle(&object);
                }
                let copy = self.object(&object)?;
                reference.from_handle(&copy)
            }
        }
    }

    /// Copies `source` into the existing `target`.
    pub(crate) fn copy_into(
        &mut self,
        model: &Model,
        source: &dyn Any,
        target: &mut dyn Any,
    ) -> Result<(), ModelError> {
        let Some(composite) = model.as_composite() else {
            let value = self.value(model, source, false)?;
            return model.assign(target, value);
        };

        for property in composite.properties() {
            if !property.is_copyable() {
                continue;
            }
            let value_model = self.registry.resolve(property.value_source())?;
            let value = property.get(source)?;
            if property.is_in_place()
                && !property.is_shared()
                && value_model.as_composite().is_some()
                && let Some(slot) = property.get_mut(target)?
            {
                self.copy_into(&value_model, &*value, slot)?;
                continue;
            }
            let copy = self.value(&value_model, &*value, property.is_shared())?;
            property.set(target, copy)?;
        }
        Ok(())
    }

    /// Populates every copy allocated so far.
    pub(crate) fn drain(&mut self) -> Result<(), ModelError> {
        while let Some((source, copy, model)) = self.pending.pop_front() {
            log::trace!("copying object of `{}`", model.name());
            let source = model.read(&source)?;
            let mut copy = model.write(&copy)?;
            self.copy_into(&model, &*source, &mut *copy)?;
        }
        Ok(())
    }
}

/// Whether values of `model` hold handles, directly or in containers.
pub(crate) fn holds_reference(registry: &ModelRegistry, model: &Model) -> Result<bool, ModelError> {
    match model.kind() {
        ModelKind::Reference(_) => Ok(true),
        ModelKind::Optional(optional) => holds_reference(registry, &*registry.resolve(optional.inner())?),
        ModelKind::Array(array) => holds_reference(registry, &*registry.resolve(array.element())?),
        ModelKind::Map(map) => holds_reference(registry, &*registry.resolve(map.value())?),
        ModelKind::Leaf(_) | ModelKind::Composite(_) => Ok(false),
    }
}

/// A deep copy of `value`. See [`CopyContext`].
pub fn copy<T: Modeled>(registry: &ModelRegistry, value: &T) -> Result<T, ModelError> {
    CopyContext::new(registry).copy(value)
}

/// Copies the properties of `source` into `target`. See [`CopyContext`].
pub fn copy_properties<T: Modeled>(
    registry: &ModelRegistry,
    source: &T,
    target: &mut T,
) -> Result<(), ModelError> {
    CopyContext::new(registry).copy_properties(source, target)
}
