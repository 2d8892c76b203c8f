use alloc::borrow::Cow;
use alloc::boxed::Box;
use alloc::format;
use alloc::sync::Arc;
use core::any::Any;
use core::marker::PhantomData;

use crate::model::{ModelKind, RefKind, ReferenceModel, ReferenceOps, downcast_ref};
use crate::{BoxedValue, Model, ModelError, ModelRegistry, ModelSource, Modeled, ObjectRef, Ref};

struct Handle<T>(PhantomData<fn() -> T>);

impl<T> Handle<T> {
    const NEW: Self = Self(PhantomData);
}

fn wrong_handle(expected: Cow<'static, str>, object: &ObjectRef) -> ModelError {
    let found = if object.is_frozen() {
        format!("Arc<{}>", object.type_name())
    } else {
        format!("Ref<{}>", object.type_name())
    };
    ModelError::mismatch(expected, found)
}

// -----------------------------------------------------------------------------
// Ref

impl<T: Modeled> Modeled for Ref<T> {
    fn type_name() -> Cow<'static, str> {
        Cow::Owned(format!("Ref<{}>", T::type_name()))
    }

    fn build_model(_: &ModelRegistry) -> Result<Model, ModelError> {
        let kind = ModelKind::Reference(ReferenceModel::new(
            Some(ModelSource::of::<T>()),
            RefKind::Shared,
            Handle::<Ref<T>>::NEW,
        ));
        Ok(Model::new::<Self>(
            kind,
            Some(|registry| Ok(Ref::new(registry.new_default::<T>()?))),
        ))
    }
}

impl<T: Modeled> ReferenceOps for Handle<Ref<T>> {
    fn handle(&self, value: &dyn Any) -> Result<ObjectRef, ModelError> {
        Ok(ObjectRef::from(downcast_ref::<Ref<T>>(value)?.clone()))
    }

    fn from_handle(&self, object: &ObjectRef) -> Result<BoxedValue, ModelError> {
        match object.downcast::<T>() {
            Some(handle) => Ok(Box::new(handle)),
            None => Err(wrong_handle(Ref::<T>::type_name(), object)),
        }
    }
}

// -----------------------------------------------------------------------------
// Arc

impl<T: Modeled> Modeled for Arc<T> {
    fn type_name() -> Cow<'static, str> {
        Cow::Owned(format!("Arc<{}>", T::type_name()))
    }

    fn build_model(_: &ModelRegistry) -> Result<Model, ModelError> {
        let kind = ModelKind::Reference(ReferenceModel::new(
            Some(ModelSource::of::<T>()),
            RefKind::Frozen,
            Handle::<Arc<T>>::NEW,
        ));
        Ok(Model::new::<Self>(
            kind,
            Some(|registry| Ok(Arc::new(registry.new_default::<T>()?))),
        ))
    }
}

impl<T: Modeled> ReferenceOps for Handle<Arc<T>> {
    fn handle(&self, value: &dyn Any) -> Result<ObjectRef, ModelError> {
        Ok(ObjectRef::from(Arc::clone(downcast_ref::<Arc<T>>(value)?)))
    }

    fn from_handle(&self, object: &ObjectRef) -> Result<BoxedValue, ModelError> {
        match object.downcast_frozen::<T>() {
            Some(handle) => Ok(Box::new(handle)),
            None => Err(wrong_handle(Arc::<T>::type_name(), object)),
        }
    }
}

// -----------------------------------------------------------------------------
// ObjectRef

impl Modeled for ObjectRef {
    fn type_name() -> Cow<'static, str> {
        Cow::Borrowed("ObjectRef")
    }

    fn build_model(_: &ModelRegistry) -> Result<Model, ModelError> {
        let kind = ModelKind::Reference(ReferenceModel::new(
            None,
            RefKind::Dynamic,
            Handle::<ObjectRef>::NEW,
        ));
        Ok(Model::new::<Self>(kind, None))
    }
}

impl ReferenceOps for Handle<ObjectRef> {
    fn handle(&self, value: &dyn Any) -> Result<ObjectRef, ModelError> {
        Ok(downcast_ref::<ObjectRef>(value)?.clone())
    }

    fn from_handle(&self, object: &ObjectRef) -> Result<BoxedValue, ModelError> {
        Ok(Box::new(object.clone()))
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::String;
    use alloc::sync::Arc;

    use crate::model::{ModelKind, RefKind};
    use crate::{ModelError, ModelRegistry, ObjectRef, Ref};

    #[test]
    fn ref_handles() {
        let registry = ModelRegistry::new();
        let model = registry.get::<Ref<String>>().unwrap();
        let ModelKind::Reference(reference) = model.kind() else {
            panic!("Ref is a reference");
        };
        assert_eq!(reference.ref_kind(), RefKind::Shared);
        assert_eq!(reference.target().unwrap().type_name(), "String");

        let value = Ref::new(String::from("x"));
        let object = reference.handle(&value).unwrap();
        assert_eq!(object.identity(), value.identity());

        let back = reference.from_handle(&object).unwrap();
        let back = back.downcast_ref::<Ref<String>>().unwrap();
        assert!(Ref::ptr_eq(back, &value));

        let frozen = ObjectRef::frozen(String::from("y"));
        let err = reference.from_handle(&frozen).unwrap_err();
        assert!(matches!(err, ModelError::TypeMismatch { ref found, .. } if found == "Arc<String>"));
    }

    #[test]
    fn arc_and_dynamic() {
        let registry = ModelRegistry::new();
        let model = registry.get::<Arc<u32>>().unwrap();
        let ModelKind::Reference(reference) = model.kind() else {
            panic!("Arc is a reference");
        };
        assert!(reference.is_frozen());
        let default = model.new_default(&registry).unwrap();
        assert_eq!(default.downcast_ref::<Arc<u32>>().map(|v| **v), Some(0));

        let dynamic = registry.get::<ObjectRef>().unwrap();
        let ModelKind::Reference(reference) = dynamic.kind() else {
            panic!("ObjectRef is a reference");
        };
        assert_eq!(reference.ref_kind(), RefKind::Dynamic);
        assert!(reference.target().is_none());
        assert!(matches!(
            dynamic.new_default(&registry),
            Err(ModelError::NoDefault { .. })
        ));
    }
}
