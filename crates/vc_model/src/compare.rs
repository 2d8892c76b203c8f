//! Equality of values through their models.

use alloc::vec::Vec;
use core::any::Any;

use crate::model::ModelKind;
use crate::utils::HashSet;
use crate::{Model, ModelError, ModelRegistry, Modeled, ObjectRef};

struct Compare<'r> {
    registry: &'r ModelRegistry,
    /// `None` compares handles by identity.
    deep: Option<Deep>,
}

#[derive(Default)]
struct Deep {
    visited: HashSet<(usize, usize)>,
    pending: Vec<(ObjectRef, ObjectRef)>,
}

impl Compare<'_> {
    fn equal(&mut self, model: &Model, a: &dyn Any, b: &dyn Any) -> Result<bool, ModelError> {
        match model.kind() {
            ModelKind::Leaf(leaf) => leaf.equals(a, b),
            ModelKind::Optional(optional) => match (optional.get(a)?, optional.get(b)?) {
                (None, None) => Ok(true),
                (Some(a), Some(b)) => {
                    let inner = self.registry.resolve(optional.inner())?;
                    self.equal(&inner, a, b)
                }
                _ => Ok(false),
            },
            ModelKind::Array(array) => {
                let len = array.len(a)?;
                if len != array.len(b)? {
                    return Ok(false);
                }
                let element = self.registry.resolve(array.element())?;
                for index in 0..len {
                    match (array.get(a, index)?, array.get(b, index)?) {
                        (Some(a), Some(b)) if self.equal(&element, a, b)? => {}
                        _ => return Ok(false),
                    }
                }
                Ok(true)
            }
            ModelKind::Map(map) => {
                if map.len(a)? != map.len(b)? {
                    return Ok(false);
                }
                let value = self.registry.resolve(map.value())?;
                for (key, a) in map.entries(a)? {
                    match map.lookup(b, key)? {
                        Some(b) if self.equal(&value, a, b)? => {}
                        _ => return Ok(false),
                    }
                }
                Ok(true)
            }
            ModelKind::Composite(composite) => {
                for property in composite.properties() {
                    // Copies leave non-copyable properties behind.
                    if self.deep.is_some() && !property.is_copyable() {
                        continue;
                    }
                    let value = self.registry.resolve(property.value_source())?;
                    if !self.equal(&value, &*property.get(a)?, &*property.get(b)?)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            ModelKind::Reference(reference) => {
                let a = reference.handle(a)?;
                let b = reference.handle(b)?;
                if ObjectRef::ptr_eq(&a, &b) {
                    return Ok(true);
                }
                let Some(deep) = &mut self.deep else {
                    return Ok(false);
                };
                if a.type_id() != b.type_id() {
                    return Ok(false);
                }
                // Pairs already compared, or being compared, are assumed
                // equal; a difference shows up elsewhere.
                if deep.visited.insert((a.identity(), b.identity())) {
                    deep.pending.push((a, b));
                }
                Ok(true)
            }
        }
    }
}

/// Equality as the writer sees it: handles are equal when they point at
/// the same object.
pub(crate) fn shallow_equal(
    registry: &ModelRegistry,
    model: &Model,
    a: &dyn Any,
    b: &dyn Any,
) -> Result<bool, ModelError> {
    Compare {
        registry,
        deep: None,
    }
    .equal(model, a, b)
}

/// Whether two object graphs have the same shape and content.
///
/// Handles are followed and compared by content, so a graph and its
/// [`copy`](crate::copy) compare equal. Cycles are handled. Properties
/// declared with `copyable(false)` hold per-instance state and are not
/// compared.
///
/// # Examples
///
/// ```
/// use vc_model::{ModelRegistry, Ref, deep_equal};
///
/// let registry = ModelRegistry::new();
/// let a = vec![Ref::new(1_u32), Ref::new(2)];
/// let b = vec![Ref::new(1_u32), Ref::new(2)];
/// assert!(deep_equal(&registry, &a, &b).unwrap());
///
/// *b[1].write() = 3;
/// assert!(!deep_equal(&registry, &a, &b).unwrap());
/// ```
pub fn deep_equal<T: Modeled>(registry: &ModelRegistry, a: &T, b: &T) -> Result<bool, ModelError> {
    let model = registry.get::<T>()?;
    let mut compare = Compare {
        registry,
        deep: Some(Deep::default()),
    };
    if !compare.equal(&model, a, b)? {
        return Ok(false);
    }

    loop {
        let Some((a, b)) = compare.deep.as_mut().and_then(|deep| deep.pending.pop()) else {
            return Ok(true);
        };
        let model = registry.resolve(a.source())?;
        let guard_a = model.read(&a)?;
        let guard_b = model.read(&b)?;
        if !compare.equal(&model, &*guard_a, &*guard_b)? {
            return Ok(false);
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::borrow::Cow;
    use alloc::string::String;
    use alloc::sync::Arc;
    use alloc::vec::Vec;

    use super::{deep_equal, shallow_equal};
    use crate::{Model, ModelBuilder, ModelError, ModelRegistry, Modeled, ObjectRef, Ref};

    #[derive(Default)]
    struct Cell {
        value: i32,
        next: Option<Ref<Cell>>,
    }

    impl Modeled for Cell {
        fn type_name() -> Cow<'static, str> {
            Cow::Borrowed("test::Cell")
        }

        fn build_model(registry: &ModelRegistry) -> Result<Model, ModelError> {
            ModelBuilder::<Self>::new(registry)
                .field("value", |v| &v.value, |v| &mut v.value)
                .field("next", |v| &v.next, |v| &mut v.next)
                .build()
        }
    }

    fn ring(values: &[i32]) -> Ref<Cell> {
        let cells: Vec<Ref<Cell>> = values
            .iter()
            .map(|&value| Ref::new(Cell { value, next: None }))
            .collect();
        for (index, cell) in cells.iter().enumerate() {
            cell.write().next = Some(cells[(index + 1) % cells.len()].clone());
        }
        cells[0].clone()
    }

    #[test]
    fn shallow_compares_identity() {
        let registry = ModelRegistry::new();
        let model = registry.get::<Ref<String>>().unwrap();
        let a = Ref::new(String::from("x"));
        let b = Ref::new(String::from("x"));
        assert!(shallow_equal(&registry, &model, &a, &a.clone()).unwrap());
        assert!(!shallow_equal(&registry, &model, &a, &b).unwrap());
        assert!(deep_equal(&registry, &a, &b).unwrap());
    }

    #[test]
    fn cycles_compare_by_content() {
        let registry = ModelRegistry::new();
        let a = ring(&[1, 2, 3]);
        let b = ring(&[1, 2, 3]);
        let c = ring(&[1, 2, 4]);
        assert!(deep_equal(&registry, &a, &b).unwrap());
        assert!(!deep_equal(&registry, &a, &c).unwrap());
        assert!(deep_equal(&registry, &a, &a).unwrap());
    }

    #[derive(Default)]
    struct Slot {
        item: u32,
        handle: u64,
    }

    impl Modeled for Slot {
        fn type_name() -> Cow<'static, str> {
            Cow::Borrowed("test::Slot")
        }

        fn build_model(registry: &ModelRegistry) -> Result<Model, ModelError> {
            ModelBuilder::<Self>::new(registry)
                .field("item", |v| &v.item, |v| &mut v.item)
                .field("handle", |v| &v.handle, |v| &mut v.handle)
                .copyable(false)
                .build()
        }
    }

    #[test]
    fn non_copyable_properties_are_ignored() {
        let registry = ModelRegistry::new();
        let a = Slot { item: 3, handle: 1 };
        let b = Slot { item: 3, handle: 2 };
        assert!(deep_equal(&registry, &a, &b).unwrap());

        let model = registry.get::<Slot>().unwrap();
        assert!(!shallow_equal(&registry, &model, &a, &b).unwrap());

        let c = Slot { item: 4, handle: 1 };
        assert!(!deep_equal(&registry, &a, &c).unwrap());
    }

    #[test]
    fn dynamic_types_must_match() {
        let registry = ModelRegistry::new();
        let a = Some(ObjectRef::new(1_i32));
        let b = Some(ObjectRef::new(1_i64));
        assert!(!deep_equal(&registry, &a, &b).unwrap());

        let frozen = Some(ObjectRef::from(Arc::new(1_i32)));
        assert!(deep_equal(&registry, &a, &frozen).unwrap());
    }
}
