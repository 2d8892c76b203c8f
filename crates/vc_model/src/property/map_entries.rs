use alloc::borrow::Cow;
use alloc::boxed::Box;
use alloc::format;
use alloc::vec::Vec;
use core::any::Any;
use core::hash::{BuildHasher, Hash};
use std::collections::{BTreeMap, HashMap};

use super::{PropertyAccess, PropertyValue};
use crate::model::{downcast_box, downcast_mut, downcast_ref};
use crate::{BoxedValue, Model, ModelBuilder, ModelError, ModelRegistry, Modeled};

// -----------------------------------------------------------------------------
// MapEntry

/// One `{key, value}` record of a map written by [`MapEntriesProperty`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapEntry<K, V> {
    pub key: K,
    pub value: V,
}

impl<K: Modeled, V: Modeled> Modeled for MapEntry<K, V> {
    fn type_name() -> Cow<'static, str> {
        Cow::Owned(format!("MapEntry<{}, {}>", K::type_name(), V::type_name()))
    }

    fn build_model(registry: &ModelRegistry) -> Result<Model, ModelError> {
        ModelBuilder::<Self>::with_default(registry, |registry| {
            Ok(MapEntry {
                key: registry.new_default::<K>()?,
                value: registry.new_default::<V>()?,
            })
        })
        .field("key", |v| &v.key, |v| &mut v.key)
        .field("value", |v| &v.value, |v| &mut v.value)
        .build()
    }
}

// -----------------------------------------------------------------------------
// EntryMap

/// A map that can be taken apart into entries and rebuilt from them.
pub trait EntryMap: Send + Sync + 'static {
    type Key: Modeled + Clone;
    type Value: Modeled + Clone;

    /// Entries in a deterministic order.
    fn entries(&self) -> Vec<MapEntry<Self::Key, Self::Value>>;

    fn rebuild(&mut self, entries: Vec<MapEntry<Self::Key, Self::Value>>);
}

impl<K, V, S> EntryMap for HashMap<K, V, S>
where
    K: Modeled + Clone + Eq + Hash + Ord,
    V: Modeled + Clone,
    S: BuildHasher + Send + Sync + 'static,
{
    type Key = K;
    type Value = V;

    fn entries(&self) -> Vec<MapEntry<K, V>> {
        let mut entries: Vec<_> = self
            .iter()
            .map(|(key, value)| MapEntry {
                key: key.clone(),
                value: value.clone(),
            })
            .collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        entries
    }

    fn rebuild(&mut self, entries: Vec<MapEntry<K, V>>) {
        self.clear();
        self.extend(entries.into_iter().map(|entry| (entry.key, entry.value)));
    }
}

impl<K, V> EntryMap for BTreeMap<K, V>
where
    K: Modeled + Clone + Ord,
    V: Modeled + Clone,
{
    type Key = K;
    type Value = V;

    fn entries(&self) -> Vec<MapEntry<K, V>> {
        self.iter()
            .map(|(key, value)| MapEntry {
                key: key.clone(),
                value: value.clone(),
            })
            .collect()
    }

    fn rebuild(&mut self, entries: Vec<MapEntry<K, V>>) {
        self.clear();
        self.extend(entries.into_iter().map(|entry| (entry.key, entry.value)));
    }
}

// -----------------------------------------------------------------------------
// MapEntriesProperty

/// Writes a map field as its list of [`MapEntry`] records.
///
/// The value type of the property is `Vec<MapEntry<K, V>>`; assigning it
/// rebuilds the map.
pub struct MapEntriesProperty<T, M> {
    pub get: fn(&T) -> &M,
    pub get_mut: fn(&mut T) -> &mut M,
}

impl<T: Modeled, M: EntryMap> PropertyAccess for MapEntriesProperty<T, M> {
    fn get<'a>(&self, owner: &'a dyn Any) -> Result<PropertyValue<'a>, ModelError> {
        let owner = downcast_ref::<T>(owner)?;
        Ok(PropertyValue::Owned(Box::new((self.get)(owner).entries())))
    }

    fn set(&self, owner: &mut dyn Any, value: BoxedValue) -> Result<(), ModelError> {
        let owner = downcast_mut::<T>(owner)?;
        let entries = downcast_box::<Vec<MapEntry<M::Key, M::Value>>>(value)?;
        (self.get_mut)(owner).rebuild(entries);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use alloc::borrow::Cow;
    use alloc::boxed::Box;
    use alloc::string::String;
    use alloc::vec;
    use alloc::vec::Vec;
    use std::collections::HashMap;

    use super::{EntryMap, MapEntriesProperty, MapEntry};
    use crate::property::PropertyAccess;
    use crate::{Model, ModelBuilder, ModelError, ModelRegistry, Modeled};

    #[derive(Default)]
    struct Inventory {
        slots: HashMap<u8, String>,
    }

    impl Modeled for Inventory {
        fn type_name() -> Cow<'static, str> {
            Cow::Borrowed("test::Inventory")
        }

        fn build_model(registry: &ModelRegistry) -> Result<Model, ModelError> {
            ModelBuilder::<Self>::new(registry)
                .map_entries("slots", |v| &v.slots, |v| &mut v.slots)
                .build()
        }
    }

    fn access() -> MapEntriesProperty<Inventory, HashMap<u8, String>> {
        MapEntriesProperty {
            get: |v| &v.slots,
            get_mut: |v| &mut v.slots,
        }
    }

    #[test]
    fn entries_are_sorted() {
        let mut map = HashMap::new();
        map.insert(3_u8, String::from("c"));
        map.insert(1_u8, String::from("a"));
        let keys: Vec<u8> = map.entries().into_iter().map(|e| e.key).collect();
        assert_eq!(keys, vec![1, 3]);
    }

    #[test]
    fn property_reads_entries() {
        let mut inventory = Inventory::default();
        inventory.slots.insert(2, String::from("sword"));

        let value = access().get(&inventory).unwrap();
        let entries = value.downcast_ref::<Vec<MapEntry<u8, String>>>().unwrap();
        assert_eq!(
            entries,
            &vec![MapEntry {
                key: 2,
                value: String::from("sword"),
            }]
        );
        assert!(!access().supports_in_place());
    }

    #[test]
    fn property_rebuilds_map() {
        let mut inventory = Inventory::default();
        inventory.slots.insert(9, String::from("stale"));

        let entries = vec![MapEntry {
            key: 1_u8,
            value: String::from("shield"),
        }];
        access().set(&mut inventory, Box::new(entries)).unwrap();
        assert_eq!(inventory.slots.len(), 1);
        assert_eq!(inventory.slots.get(&1).map(String::as_str), Some("shield"));
    }

    #[test]
    fn entry_model() {
        let registry = ModelRegistry::new();
        let model = registry.get::<MapEntry<u8, String>>().unwrap();
        assert_eq!(model.name(), "MapEntry<u8, String>");
        let names: Vec<&str> = model.properties().iter().map(|p| p.name()).collect();
        assert_eq!(names, ["key", "value"]);

        let owner = registry.get::<Inventory>().unwrap();
        let slots = owner.property("slots").unwrap();
        assert_eq!(
            slots.value_source().type_name(),
            "Vec<MapEntry<u8, String>>"
        );
    }
}
