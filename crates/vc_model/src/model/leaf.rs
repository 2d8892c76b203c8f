use alloc::boxed::Box;
use core::any::Any;
use core::marker::PhantomData;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as Json;

use super::{BoxedValue, Modeled, downcast_ref};
use crate::ModelError;
use crate::io::Dependency;

/// A value written inline as a literal.
///
/// The literal is whatever the type's serde implementation produces, so
/// unit enums, UUIDs and dates work without extra code.
pub trait LeafValue: Serialize + DeserializeOwned + Clone + PartialEq + Send + Sync + 'static {
    /// External file this value points at, reported to readers so they can
    /// fetch it before materializing the graph.
    fn dependency(&self) -> Option<Dependency> {
        None
    }
}

/// Model data of a leaf type.
pub struct LeafModel {
    ops: Box<dyn LeafOps>,
}

impl LeafModel {
    pub fn new<T: LeafValue + Modeled>() -> Self {
        Self {
            ops: Box::new(SerdeLeaf::<T>(PhantomData)),
        }
    }

    #[inline]
    pub(crate) fn encode(&self, value: &dyn Any) -> Result<Json, ModelError> {
        self.ops.encode(value)
    }

    #[inline]
    pub(crate) fn decode(&self, json: &Json) -> Result<BoxedValue, ModelError> {
        self.ops.decode(json)
    }

    #[inline]
    pub(crate) fn equals(&self, a: &dyn Any, b: &dyn Any) -> Result<bool, ModelError> {
        self.ops.equals(a, b)
    }

    #[inline]
    pub(crate) fn duplicate(&self, value: &dyn Any) -> Result<BoxedValue, ModelError> {
        self.ops.duplicate(value)
    }

    #[inline]
    pub(crate) fn dependency(&self, value: &dyn Any) -> Result<Option<Dependency>, ModelError> {
        self.ops.dependency(value)
    }
}

pub(crate) trait LeafOps: Send + Sync {
    fn encode(&self, value: &dyn Any) -> Result<Json, ModelError>;
    fn decode(&self, json: &Json) -> Result<BoxedValue, ModelError>;
    fn equals(&self, a: &dyn Any, b: &dyn Any) -> Result<bool, ModelError>;
    fn duplicate(&self, value: &dyn Any) -> Result<BoxedValue, ModelError>;
    fn dependency(&self, value: &dyn Any) -> Result<Option<Dependency>, ModelError>;
}

struct SerdeLeaf<T>(PhantomData<fn() -> T>);

impl<T: LeafValue + Modeled> LeafOps for SerdeLeaf<T> {
    fn encode(&self, value: &dyn Any) -> Result<Json, ModelError> {
        Ok(serde_json::to_value(downcast_ref::<T>(value)?)?)
    }

    fn decode(&self, json: &Json) -> Result<BoxedValue, ModelError> {
        Ok(Box::new(T::deserialize(json)?))
    }

    fn equals(&self, a: &dyn Any, b: &dyn Any) -> Result<bool, ModelError> {
        Ok(downcast_ref::<T>(a)? == downcast_ref::<T>(b)?)
    }

    fn duplicate(&self, value: &dyn Any) -> Result<BoxedValue, ModelError> {
        Ok(Box::new(downcast_ref::<T>(value)?.clone()))
    }

    fn dependency(&self, value: &dyn Any) -> Result<Option<Dependency>, ModelError> {
        Ok(downcast_ref::<T>(value)?.dependency())
    }
}
