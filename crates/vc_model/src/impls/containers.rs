use alloc::borrow::Cow;
use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::format;
use alloc::vec::Vec;
use core::any::Any;
use core::hash::{BuildHasher, Hash};
use core::marker::PhantomData;
use std::collections::HashMap;

use crate::model::{
    ArrayModel, ArrayOps, MapModel, MapOps, ModelKind, OptionalModel, OptionalOps, downcast_box,
    downcast_ref,
};
use crate::{BoxedValue, Model, ModelError, ModelRegistry, ModelSource, Modeled};

struct Ops<T>(PhantomData<fn() -> T>);

impl<T> Ops<T> {
    const NEW: Self = Self(PhantomData);
}

fn boxed_ref<V: Any>(value: &V) -> &dyn Any {
    value
}

// -----------------------------------------------------------------------------
// Option

impl<T: Modeled> Modeled for Option<T> {
    const NULLABLE: bool = true;

    fn type_name() -> Cow<'static, str> {
        Cow::Owned(format!("Option<{}>", T::type_name()))
    }

    fn build_model(_: &ModelRegistry) -> Result<Model, ModelError> {
        let kind = ModelKind::Optional(OptionalModel::new(
            ModelSource::of::<T>(),
            Ops::<Option<T>>::NEW,
        ));
        Ok(Model::new::<Self>(kind, Some(|_| Ok(None))))
    }
}

impl<T: Modeled> OptionalOps for Ops<Option<T>> {
    fn get<'a>(&self, value: &'a dyn Any) -> Result<Option<&'a dyn Any>, ModelError> {
        Ok(downcast_ref::<Option<T>>(value)?.as_ref().map(boxed_ref))
    }

    fn none(&self) -> BoxedValue {
        Box::new(None::<T>)
    }

    fn some(&self, inner: BoxedValue) -> Result<BoxedValue, ModelError> {
        Ok(Box::new(Some(downcast_box::<T>(inner)?)))
    }
}

// -----------------------------------------------------------------------------
// Vec

impl<T: Modeled> Modeled for Vec<T> {
    fn type_name() -> Cow<'static, str> {
        Cow::Owned(format!("Vec<{}>", T::type_name()))
    }

    fn build_model(_: &ModelRegistry) -> Result<Model, ModelError> {
        let kind = ModelKind::Array(ArrayModel::new(ModelSource::of::<T>(), Ops::<Vec<T>>::NEW));
        Ok(Model::new::<Self>(kind, Some(|_| Ok(Vec::new()))))
    }
}

impl<T: Modeled> ArrayOps for Ops<Vec<T>> {
    fn len(&self, array: &dyn Any) -> Result<usize, ModelError> {
        Ok(downcast_ref::<Vec<T>>(array)?.len())
    }

    fn get<'a>(&self, array: &'a dyn Any, index: usize) -> Result<Option<&'a dyn Any>, ModelError> {
        Ok(downcast_ref::<Vec<T>>(array)?.get(index).map(boxed_ref))
    }

    fn collect(&self, elements: Vec<BoxedValue>) -> Result<BoxedValue, ModelError> {
        let elements = elements
            .into_iter()
            .map(downcast_box::<T>)
            .collect::<Result<Vec<T>, _>>()?;
        Ok(Box::new(elements))
    }
}

// -----------------------------------------------------------------------------
// Fixed arrays

fn array_default<T: Modeled, const N: usize>(registry: &ModelRegistry) -> Result<[T; N], ModelError> {
    let mut elements = Vec::with_capacity(N);
    for _ in 0..N {
        elements.push(registry.new_default::<T>()?);
    }
    into_array(elements)
}

fn into_array<T: Modeled, const N: usize>(elements: Vec<T>) -> Result<[T; N], ModelError> {
    let len = elements.len();
    <[T; N]>::try_from(elements).map_err(|_| {
        ModelError::malformed(
            &<[T; N]>::type_name(),
            format!("expected {N} elements, found {len}"),
        )
    })
}

impl<T: Modeled, const N: usize> Modeled for [T; N] {
    fn type_name() -> Cow<'static, str> {
        Cow::Owned(format!("[{}; {N}]", T::type_name()))
    }

    fn build_model(_: &ModelRegistry) -> Result<Model, ModelError> {
        let kind = ModelKind::Array(ArrayModel::fixed(
            ModelSource::of::<T>(),
            N,
            Ops::<[T; N]>::NEW,
        ));
        Ok(Model::new::<Self>(kind, Some(array_default::<T, N>)))
    }
}

impl<T: Modeled, const N: usize> ArrayOps for Ops<[T; N]> {
    fn len(&self, array: &dyn Any) -> Result<usize, ModelError> {
        downcast_ref::<[T; N]>(array)?;
        Ok(N)
    }

    fn get<'a>(&self, array: &'a dyn Any, index: usize) -> Result<Option<&'a dyn Any>, ModelError> {
        Ok(downcast_ref::<[T; N]>(array)?.get(index).map(boxed_ref))
    }

    fn collect(&self, elements: Vec<BoxedValue>) -> Result<BoxedValue, ModelError> {
        let elements = elements
            .into_iter()
            .map(downcast_box::<T>)
            .collect::<Result<Vec<T>, _>>()?;
        Ok(Box::new(into_array::<T, N>(elements)?))
    }
}

// -----------------------------------------------------------------------------
// Maps

fn map_entries<'a, K: Any, V: Any>(
    iter: impl Iterator<Item = (&'a K, &'a V)>,
) -> Vec<(&'a dyn Any, &'a dyn Any)> {
    iter.map(|(key, value)| (boxed_ref(key), boxed_ref(value)))
        .collect()
}

fn typed_entries<K: Modeled, V: Modeled>(
    entries: Vec<(BoxedValue, BoxedValue)>,
) -> impl Iterator<Item = Result<(K, V), ModelError>> {
    entries
        .into_iter()
        .map(|(key, value)| Ok((downcast_box::<K>(key)?, downcast_box::<V>(value)?)))
}

impl<K, V, S> Modeled for HashMap<K, V, S>
where
    K: Modeled + Eq + Hash,
    V: Modeled,
    S: BuildHasher + Default + Send + Sync + 'static,
{
    fn type_name() -> Cow<'static, str> {
        Cow::Owned(format!("HashMap<{}, {}>", K::type_name(), V::type_name()))
    }

    fn build_model(_: &ModelRegistry) -> Result<Model, ModelError> {
        let kind = ModelKind::Map(MapModel::new(
            ModelSource::of::<K>(),
            ModelSource::of::<V>(),
            Ops::<HashMap<K, V, S>>::NEW,
        ));
        Ok(Model::new::<Self>(kind, Some(|_| Ok(HashMap::default()))))
    }
}

impl<K, V, S> MapOps for Ops<HashMap<K, V, S>>
where
    K: Modeled + Eq + Hash,
    V: Modeled,
    S: BuildHasher + Default + Send + Sync + 'static,
{
    fn len(&self, map: &dyn Any) -> Result<usize, ModelError> {
        Ok(downcast_ref::<HashMap<K, V, S>>(map)?.len())
    }

    fn entries<'a>(&self, map: &'a dyn Any) -> Result<Vec<(&'a dyn Any, &'a dyn Any)>, ModelError> {
        Ok(map_entries(downcast_ref::<HashMap<K, V, S>>(map)?.iter()))
    }

    fn lookup<'a>(&self, map: &'a dyn Any, key: &dyn Any) -> Result<Option<&'a dyn Any>, ModelError> {
        let map = downcast_ref::<HashMap<K, V, S>>(map)?;
        Ok(map.get(downcast_ref::<K>(key)?).map(boxed_ref))
    }

    fn collect(&self, entries: Vec<(BoxedValue, BoxedValue)>) -> Result<BoxedValue, ModelError> {
        let map = typed_entries::<K, V>(entries).collect::<Result<HashMap<K, V, S>, _>>()?;
        Ok(Box::new(map))
    }
}

impl<K, V> Modeled for BTreeMap<K, V>
where
    K: Modeled + Ord,
    V: Modeled,
{
    fn type_name() -> Cow<'static, str> {
        Cow::Owned(format!("BTreeMap<{}, {}>", K::type_name(), V::type_name()))
    }

    fn build_model(_: &ModelRegistry) -> Result<Model, ModelError> {
        let kind = ModelKind::Map(MapModel::new(
            ModelSource::of::<K>(),
            ModelSource::of::<V>(),
            Ops::<BTreeMap<K, V>>::NEW,
        ));
        Ok(Model::new::<Self>(kind, Some(|_| Ok(BTreeMap::new()))))
    }
}

impl<K, V> MapOps for Ops<BTreeMap<K, V>>
where
    K: Modeled + Ord,
    V: Modeled,
{
    fn len(&self, map: &dyn Any) -> Result<usize, ModelError> {
        Ok(downcast_ref::<BTreeMap<K, V>>(map)?.len())
    }

    fn entries<'a>(&self, map: &'a dyn Any) -> Result<Vec<(&'a dyn Any, &'a dyn Any)>, ModelError> {
        Ok(map_entries(downcast_ref::<BTreeMap<K, V>>(map)?.iter()))
    }

    fn lookup<'a>(&self, map: &'a dyn Any, key: &dyn Any) -> Result<Option<&'a dyn Any>, ModelError> {
        let map = downcast_ref::<BTreeMap<K, V>>(map)?;
        Ok(map.get(downcast_ref::<K>(key)?).map(boxed_ref))
    }

    fn collect(&self, entries: Vec<(BoxedValue, BoxedValue)>) -> Result<BoxedValue, ModelError> {
        let map = typed_entries::<K, V>(entries).collect::<Result<BTreeMap<K, V>, _>>()?;
        Ok(Box::new(map))
    }
}

#[cfg(test)]
mod tests {
    use alloc::boxed::Box;
    use alloc::collections::BTreeMap;
    use alloc::string::String;
    use alloc::vec;
    use alloc::vec::Vec;

    use crate::model::ModelKind;
    use crate::{BoxedValue, ModelError, ModelRegistry};

    #[test]
    fn vec_collects_elements() {
        let registry = ModelRegistry::new();
        let model = registry.get::<Vec<u16>>().unwrap();
        let ModelKind::Array(array) = model.kind() else {
            panic!("Vec is an array");
        };
        assert_eq!(array.fixed_len(), None);
        assert_eq!(array.element().type_name(), "u16");

        let elements: Vec<BoxedValue> = vec![Box::new(1_u16), Box::new(2_u16)];
        let value = array.collect(elements).unwrap();
        assert_eq!(value.downcast_ref::<Vec<u16>>(), Some(&vec![1, 2]));

        let mismatched: Vec<BoxedValue> = vec![Box::new(1_u8)];
        assert!(array.collect(mismatched).is_err());
    }

    #[test]
    fn fixed_array_length() {
        let registry = ModelRegistry::new();
        let model = registry.get::<[String; 2]>().unwrap();
        assert_eq!(model.name(), "[String; 2]");
        let ModelKind::Array(array) = model.kind() else {
            panic!("[T; N] is an array");
        };
        assert_eq!(array.fixed_len(), Some(2));

        let default = model.new_default(&registry).unwrap();
        assert_eq!(
            default.downcast_ref::<[String; 2]>(),
            Some(&[String::new(), String::new()])
        );

        let short: Vec<BoxedValue> = vec![Box::new(String::from("a"))];
        let err = array.collect(short).unwrap_err();
        assert!(matches!(err, ModelError::Malformed { .. }));
    }

    #[test]
    fn map_lookup() {
        let registry = ModelRegistry::new();
        let model = registry.get::<BTreeMap<String, i32>>().unwrap();
        assert_eq!(model.name(), "BTreeMap<String, i32>");
        let ModelKind::Map(map) = model.kind() else {
            panic!("BTreeMap is a map");
        };

        let mut value = BTreeMap::new();
        value.insert(String::from("b"), 2);
        value.insert(String::from("a"), 1);

        assert_eq!(map.len(&value).unwrap(), 2);
        let found = map.lookup(&value, &String::from("b")).unwrap();
        assert_eq!(found.and_then(|v| v.downcast_ref::<i32>()), Some(&2));
        let keys: Vec<&String> = map
            .entries(&value)
            .unwrap()
            .into_iter()
            .filter_map(|(key, _)| key.downcast_ref::<String>())
            .collect();
        assert_eq!(keys, ["a", "b"]);
    }

    #[test]
    fn option_wraps_inner() {
        let registry = ModelRegistry::new();
        let model = registry.get::<Option<u8>>().unwrap();
        let ModelKind::Optional(optional) = model.kind() else {
            panic!("Option is optional");
        };
        let some = optional.some(Box::new(4_u8)).unwrap();
        assert_eq!(some.downcast_ref::<Option<u8>>(), Some(&Some(4)));
        let none = optional.none();
        assert_eq!(none.downcast_ref::<Option<u8>>(), Some(&None));
        assert!(optional.get(&Some(4_u8)).unwrap().is_some());
    }
}
