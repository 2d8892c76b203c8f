//! [`Modeled`](crate::Modeled) implementations for foreign types.
//!
//! ## Implemented Menu
//!
//! - leaves:
//!     - `bool`, `char`, `i8`-`i64`, `u8`-`u64`, `isize`, `usize`, `f32`, `f64`
//!     - `String`, `PathBuf`, `Duration`, `SystemTime`
//!     - `uuid::Uuid`, `chrono::DateTime<Utc>`, `chrono::NaiveDate`
//!     - [`AssetRef`](crate::AssetRef)
//! - containers:
//!     - `Option<T>`
//!     - `Vec<T>`, `[T; N]`
//!     - `HashMap<K, V, S>`, `BTreeMap<K, V>`
//! - handles:
//!     - [`Ref<T>`](crate::Ref), `Arc<T>`, [`ObjectRef`](crate::ObjectRef)
//!
//! Other leaf types can be added with [`impl_leaf!`](crate::impl_leaf).

// -----------------------------------------------------------------------------
// Modules

mod containers;
mod primitives;
mod references;

// -----------------------------------------------------------------------------
// impl_leaf

/// Implements [`Modeled`](crate::Modeled) and [`LeafValue`](crate::model::LeafValue)
/// for types written as serde literals.
///
/// The types need `Default`, `Clone`, `PartialEq` and serde support. The
/// name is the type tag written on the wire.
///
/// ```
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
/// struct Rgb(u8, u8, u8);
///
/// vc_model::impl_leaf!(Rgb => "demo::Rgb");
///
/// let registry = vc_model::ModelRegistry::new();
/// assert!(registry.get::<Rgb>().unwrap().is_leaf());
/// ```
#[macro_export]
macro_rules! impl_leaf {
    ($($ty:ty => $name:expr),+ $(,)?) => {
        $(
            impl $crate::model::LeafValue for $ty {}

            impl $crate::Modeled for $ty {
                #[inline]
                fn type_name() -> $crate::__macro_exports::Cow<'static, str> {
                    $crate::__macro_exports::Cow::Borrowed($name)
                }

                fn build_model(
                    _: &$crate::ModelRegistry,
                ) -> ::core::result::Result<$crate::Model, $crate::ModelError> {
                    ::core::result::Result::Ok($crate::Model::leaf::<Self>())
                }
            }
        )+
    };
}
