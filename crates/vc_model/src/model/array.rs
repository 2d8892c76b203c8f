use alloc::boxed::Box;
use alloc::vec::Vec;
use core::any::Any;

use super::{BoxedValue, ModelSource};
use crate::ModelError;

/// Model data of an ordered container.
pub struct ArrayModel {
    element: ModelSource,
    fixed_len: Option<usize>,
    ops: Box<dyn ArrayOps>,
}

impl ArrayModel {
    /// A growable container of `element` values.
    pub fn new(element: ModelSource, ops: impl ArrayOps + 'static) -> Self {
        Self {
            element,
            fixed_len: None,
            ops: Box::new(ops),
        }
    }

    /// A container holding exactly `len` elements.
    pub fn fixed(element: ModelSource, len: usize, ops: impl ArrayOps + 'static) -> Self {
        Self {
            element,
            fixed_len: Some(len),
            ops: Box::new(ops),
        }
    }

    #[inline]
    pub fn element(&self) -> ModelSource {
        self.element
    }

    #[inline]
    pub fn fixed_len(&self) -> Option<usize> {
        self.fixed_len
    }

    #[inline]
    pub(crate) fn len(&self, array: &dyn Any) -> Result<usize, ModelError> {
        self.ops.len(array)
    }

    #[inline]
    pub(crate) fn get<'a>(
        &self,
        array: &'a dyn Any,
        index: usize,
    ) -> Result<Option<&'a dyn Any>, ModelError> {
        self.ops.get(array, index)
    }

    #[inline]
    pub(crate) fn collect(&self, elements: Vec<BoxedValue>) -> Result<BoxedValue, ModelError> {
        self.ops.collect(elements)
    }
}

/// Type-erased access to an array value.
///
/// Implemented by the container impls in this crate; exposed so custom
/// containers can be modeled the same way.
pub trait ArrayOps: Send + Sync {
    fn len(&self, array: &dyn Any) -> Result<usize, ModelError>;

    fn get<'a>(&self, array: &'a dyn Any, index: usize)
    -> Result<Option<&'a dyn Any>, ModelError>;

    /// Builds a new container from `elements`, in order.
    fn collect(&self, elements: Vec<BoxedValue>) -> Result<BoxedValue, ModelError>;
}
