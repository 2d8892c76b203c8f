use alloc::boxed::Box;
use alloc::vec::Vec;
use core::any::Any;

use super::{BoxedValue, ModelSource};
use crate::ModelError;

/// Model data of a keyed container.
///
/// Maps are written as a sequence of `[key, value]` pairs, so keys are not
/// limited to strings.
pub struct MapModel {
    key: ModelSource,
    value: ModelSource,
    ops: Box<dyn MapOps>,
}

impl MapModel {
    pub fn new(key: ModelSource, value: ModelSource, ops: impl MapOps + 'static) -> Self {
        Self {
            key,
            value,
            ops: Box::new(ops),
        }
    }

    #[inline]
    pub fn key(&self) -> ModelSource {
        self.key
    }

    #[inline]
    pub fn value(&self) -> ModelSource {
        self.value
    }

    #[inline]
    pub(crate) fn len(&self, map: &dyn Any) -> Result<usize, ModelError> {
        self.ops.len(map)
    }

    #[inline]
    pub(crate) fn entries<'a>(
        &self,
        map: &'a dyn Any,
    ) -> Result<Vec<(&'a dyn Any, &'a dyn Any)>, ModelError> {
        self.ops.entries(map)
    }

    #[inline]
    pub(crate) fn lookup<'a>(
        &self,
        map: &'a dyn Any,
        key: &dyn Any,
    ) -> Result<Option<&'a dyn Any>, ModelError> {
        self.ops.lookup(map, key)
    }

    #[inline]
    pub(crate) fn collect(
        &self,
        entries: Vec<(BoxedValue, BoxedValue)>,
    ) -> Result<BoxedValue, ModelError> {
        self.ops.collect(entries)
    }
}

/// Type-erased access to a map value.
pub trait MapOps: Send + Sync {
    fn len(&self, map: &dyn Any) -> Result<usize, ModelError>;

    /// All entries, in the container's iteration order.
    fn entries<'a>(&self, map: &'a dyn Any) -> Result<Vec<(&'a dyn Any, &'a dyn Any)>, ModelError>;

    fn lookup<'a>(&self, map: &'a dyn Any, key: &dyn Any)
    -> Result<Option<&'a dyn Any>, ModelError>;

    /// Builds a new container from `entries`. Later duplicates win.
    fn collect(&self, entries: Vec<(BoxedValue, BoxedValue)>) -> Result<BoxedValue, ModelError>;
}
