use alloc::borrow::Cow;
use alloc::vec::Vec;

use crate::property::Property;
use crate::utils::HashMap;

/// Model data of a type described by named properties.
///
/// Property order is the declaration order, with properties merged from a
/// base type first. Names are unique.
pub struct CompositeModel {
    properties: Vec<Property>,
    indices: HashMap<Cow<'static, str>, usize>,
}

impl CompositeModel {
    /// Creates the composite from an already validated property list.
    pub(crate) fn new(properties: Vec<Property>) -> Self {
        let indices = properties
            .iter()
            .enumerate()
            .map(|(index, property)| (property.name_cow(), index))
            .collect();
        Self {
            properties,
            indices,
        }
    }

    #[inline]
    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.indices
            .get(name)
            .map(|&index| &self.properties[index])
    }

    /// Position of the property in the declaration order.
    #[inline]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.indices.get(name).copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}
