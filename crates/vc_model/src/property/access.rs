use alloc::boxed::Box;
use alloc::sync::Arc;
use core::any::Any;

use super::{PropertyAccess, PropertyValue};
use crate::model::{downcast_box, downcast_mut, downcast_ref};
use crate::{BoxedValue, ModelError, Modeled};

// -----------------------------------------------------------------------------
// FieldAccess

/// Direct access to a field through a pair of lenses.
pub struct FieldAccess<T, V> {
    pub get: fn(&T) -> &V,
    pub get_mut: fn(&mut T) -> &mut V,
}

impl<T: Modeled, V: Modeled> PropertyAccess for FieldAccess<T, V> {
    fn get<'a>(&self, owner: &'a dyn Any) -> Result<PropertyValue<'a>, ModelError> {
        let owner = downcast_ref::<T>(owner)?;
        Ok(PropertyValue::Borrowed((self.get)(owner)))
    }

    fn get_mut<'a>(&self, owner: &'a mut dyn Any) -> Result<Option<&'a mut dyn Any>, ModelError> {
        let owner = downcast_mut::<T>(owner)?;
        Ok(Some((self.get_mut)(owner)))
    }

    fn set(&self, owner: &mut dyn Any, value: BoxedValue) -> Result<(), ModelError> {
        let owner = downcast_mut::<T>(owner)?;
        *(self.get_mut)(owner) = downcast_box::<V>(value)?;
        Ok(())
    }

    #[inline]
    fn supports_in_place(&self) -> bool {
        true
    }
}

// -----------------------------------------------------------------------------
// AccessorPair

/// Access through a getter and a setter.
///
/// Assignments always go through the setter, so the owner can react to
/// them (mark itself dirty, update caches and so on).
pub struct AccessorPair<T, V> {
    pub get: fn(&T) -> V,
    pub set: fn(&mut T, V),
}

impl<T: Modeled, V: Modeled> PropertyAccess for AccessorPair<T, V> {
    fn get<'a>(&self, owner: &'a dyn Any) -> Result<PropertyValue<'a>, ModelError> {
        let owner = downcast_ref::<T>(owner)?;
        Ok(PropertyValue::Owned(Box::new((self.get)(owner))))
    }

    fn set(&self, owner: &mut dyn Any, value: BoxedValue) -> Result<(), ModelError> {
        let owner = downcast_mut::<T>(owner)?;
        (self.set)(owner, downcast_box::<V>(value)?);
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// InheritedAccess

/// A property of an embedded base value, seen from the outer type.
pub struct InheritedAccess<T, B> {
    pub base: fn(&T) -> &B,
    pub base_mut: fn(&mut T) -> &mut B,
    pub inner: Arc<dyn PropertyAccess>,
}

impl<T: Modeled, B: Modeled> PropertyAccess for InheritedAccess<T, B> {
    fn get<'a>(&self, owner: &'a dyn Any) -> Result<PropertyValue<'a>, ModelError> {
        let owner = downcast_ref::<T>(owner)?;
        self.inner.get((self.base)(owner))
    }

    fn get_mut<'a>(&self, owner: &'a mut dyn Any) -> Result<Option<&'a mut dyn Any>, ModelError> {
        let owner = downcast_mut::<T>(owner)?;
        self.inner.get_mut((self.base_mut)(owner))
    }

    fn set(&self, owner: &mut dyn Any, value: BoxedValue) -> Result<(), ModelError> {
        let owner = downcast_mut::<T>(owner)?;
        self.inner.set((self.base_mut)(owner), value)
    }

    #[inline]
    fn supports_in_place(&self) -> bool {
        self.inner.supports_in_place()
    }
}

#[cfg(test)]
mod tests {
    use alloc::boxed::Box;
    use alloc::string::String;
    use alloc::sync::Arc;

    use super::{AccessorPair, FieldAccess, InheritedAccess};
    use crate::property::PropertyAccess;
    use crate::{Model, ModelBuilder, ModelError, ModelRegistry, Modeled};
    use std::borrow::Cow;

    #[derive(Default)]
    struct Base {
        label: String,
    }

    impl Modeled for Base {
        fn type_name() -> Cow<'static, str> {
            Cow::Borrowed("test::Base")
        }

        fn build_model(registry: &ModelRegistry) -> Result<Model, ModelError> {
            ModelBuilder::<Self>::new(registry)
                .field("label", |v| &v.label, |v| &mut v.label)
                .build()
        }
    }

    #[derive(Default)]
    struct Outer {
        base: Base,
        dirty: bool,
        size: u32,
    }

    impl Modeled for Outer {
        fn type_name() -> Cow<'static, str> {
            Cow::Borrowed("test::Outer")
        }

        fn build_model(registry: &ModelRegistry) -> Result<Model, ModelError> {
            ModelBuilder::<Self>::new(registry).build()
        }
    }

    #[test]
    fn field_access() {
        let access = FieldAccess::<Outer, u32> {
            get: |v| &v.size,
            get_mut: |v| &mut v.size,
        };
        let mut outer = Outer::default();
        access.set(&mut outer, Box::new(4_u32)).unwrap();
        assert_eq!(outer.size, 4);
        assert_eq!(access.get(&outer).unwrap().downcast_ref::<u32>(), Some(&4));
        assert!(access.supports_in_place());
        assert!(access.set(&mut outer, Box::new(4_i8)).is_err());
    }

    #[test]
    fn accessor_pair_calls_setter() {
        let access = AccessorPair::<Outer, u32> {
            get: |v| v.size * 10,
            set: |v, size| {
                v.size = size;
                v.dirty = true;
            },
        };
        let mut outer = Outer::default();
        access.set(&mut outer, Box::new(3_u32)).unwrap();
        assert!(outer.dirty);
        assert_eq!(access.get(&outer).unwrap().downcast_ref::<u32>(), Some(&30));
        assert!(access.get_mut(&mut outer).unwrap().is_none());
    }

    #[test]
    fn inherited_access() {
        let inner = FieldAccess::<Base, String> {
            get: |v| &v.label,
            get_mut: |v| &mut v.label,
        };
        let access = InheritedAccess::<Outer, Base> {
            base: |v| &v.base,
            base_mut: |v| &mut v.base,
            inner: Arc::new(inner),
        };
        let mut outer = Outer::default();
        access.set(&mut outer, Box::new(String::from("lamp"))).unwrap();
        assert_eq!(outer.base.label, "lamp");
        assert!(access.supports_in_place());
    }
}
