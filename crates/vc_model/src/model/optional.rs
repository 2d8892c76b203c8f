use alloc::boxed::Box;
use core::any::Any;

use super::{BoxedValue, ModelSource};
use crate::ModelError;

/// Model data of `Option<T>`. `None` is written as null.
pub struct OptionalModel {
    inner: ModelSource,
    ops: Box<dyn OptionalOps>,
}

impl OptionalModel {
    pub fn new(inner: ModelSource, ops: impl OptionalOps + 'static) -> Self {
        Self {
            inner,
            ops: Box::new(ops),
        }
    }

    #[inline]
    pub fn inner(&self) -> ModelSource {
        self.inner
    }

    #[inline]
    pub(crate) fn get<'a>(&self, value: &'a dyn Any) -> Result<Option<&'a dyn Any>, ModelError> {
        self.ops.get(value)
    }

    #[inline]
    pub(crate) fn none(&self) -> BoxedValue {
        self.ops.none()
    }

    #[inline]
    pub(crate) fn some(&self, inner: BoxedValue) -> Result<BoxedValue, ModelError> {
        self.ops.some(inner)
    }
}

/// Type-erased access to an optional value.
pub trait OptionalOps: Send + Sync {
    fn get<'a>(&self, value: &'a dyn Any) -> Result<Option<&'a dyn Any>, ModelError>;
    fn none(&self) -> BoxedValue;
    fn some(&self, inner: BoxedValue) -> Result<BoxedValue, ModelError>;
}
