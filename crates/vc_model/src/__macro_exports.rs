//! Paths used by the code that `vc_model` macros expand to.
//!
//! Not public API.
#![doc(hidden)]

pub use alloc::borrow::Cow;

#[cfg(feature = "auto_register")]
pub use inventory;

pub use crate::registry::{AutoRegistration, register_type};
