//! Error type shared by model building, serialization and copying.

use alloc::borrow::Cow;
use alloc::string::{String, ToString};

use thiserror::Error;

/// Every failure the engine reports.
///
/// All variants are fatal for the session that produced them: a serialize,
/// deserialize or copy call is abandoned as a whole, there is no partial
/// result. Each variant carries the name of the offending type so callers
/// can report which asset or type is broken.
#[derive(Debug, Error)]
pub enum ModelError {
    /// A type name from the stream (or an untagged slot) cannot be resolved
    /// to a registered model.
    #[error("cannot resolve type `{type_name}`")]
    TypeResolution { type_name: String },

    /// A reference was met again while its first resolution was still in
    /// progress and no instance had been registered for early binding.
    #[error("circular reference to slot {id} of type `{type_name}`")]
    CircularReference { id: usize, type_name: String },

    /// A property declaration or override is invalid.
    #[error("property `{property}` of `{type_name}`: {reason}")]
    PropertyAccess {
        type_name: String,
        property: String,
        reason: String,
    },

    /// A non-nullable property is null, or a required property is absent
    /// with no template to inherit from.
    #[error("property `{property}` of `{type_name}` is not nullable")]
    NullPrimitive { type_name: String, property: String },

    /// A value or handle does not have the expected concrete type.
    #[error("type mismatch: expected `{expected}`, found `{found}`")]
    TypeMismatch { expected: String, found: String },

    /// The type has no default instance, so it cannot be allocated.
    #[error("type `{type_name}` has no default instance")]
    NoDefault { type_name: String },

    /// A numeric property value lies outside its declared range.
    #[error("property `{property}` of `{type_name}` is out of range: {value}")]
    OutOfRange {
        type_name: String,
        property: String,
        value: f64,
    },

    /// A `flat` reference leads back to an object that is still being
    /// written inline.
    #[error("flat reference cycle through `{type_name}`")]
    FlatCycle { type_name: String },

    /// Mutable access was requested for a frozen object.
    #[error("object of type `{type_name}` is frozen")]
    Immutable { type_name: String },

    /// The document does not have the expected shape.
    #[error("malformed document at `{type_name}`: {reason}")]
    Malformed { type_name: String, reason: String },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Cbor(#[from] serde_cbor::Error),
}

impl ModelError {
    #[inline]
    pub(crate) fn type_resolution(type_name: impl Into<String>) -> Self {
        Self::TypeResolution {
            type_name: type_name.into(),
        }
    }

    #[inline]
    pub(crate) fn property(
        type_name: &str,
        property: &str,
        reason: impl Into<String>,
    ) -> Self {
        Self::PropertyAccess {
            type_name: type_name.to_string(),
            property: property.to_string(),
            reason: reason.into(),
        }
    }

    #[inline]
    pub(crate) fn null_primitive(type_name: &str, property: &str) -> Self {
        Self::NullPrimitive {
            type_name: type_name.to_string(),
            property: property.to_string(),
        }
    }

    #[inline]
    pub(crate) fn mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }

    #[inline]
    pub(crate) fn malformed(type_name: &str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            type_name: type_name.to_string(),
            reason: reason.into(),
        }
    }

    /// The name of the type this error is about, when it has one.
    pub fn type_name(&self) -> Option<Cow<'_, str>> {
        match self {
            Self::TypeResolution { type_name }
            | Self::CircularReference { type_name, .. }
            | Self::PropertyAccess { type_name, .. }
            | Self::NullPrimitive { type_name, .. }
            | Self::NoDefault { type_name }
            | Self::OutOfRange { type_name, .. }
            | Self::FlatCycle { type_name }
            | Self::Immutable { type_name }
            | Self::Malformed { type_name, .. } => Some(Cow::Borrowed(type_name)),
            Self::TypeMismatch { expected, .. } => Some(Cow::Borrowed(expected)),
            Self::Json(_) | Self::Cbor(_) => None,
        }
    }
}
