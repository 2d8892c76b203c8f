//! Derive macro for `vc_model::Modeled`, see [`Model`].
#![allow(clippy::std_instead_of_core, reason = "proc-macro lib")]
#![allow(clippy::std_instead_of_alloc, reason = "proc-macro lib")]

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

// -----------------------------------------------------------------------------
// Modules

mod attributes;
mod derive_data;
mod impls;
mod path;

// -----------------------------------------------------------------------------
// Macros

/// # Derive `Modeled`
///
/// Structs with named or tuple fields become composite models with one
/// property per field, in declaration order. Enums, and types marked
/// `#[model(leaf)]`, become leaf models written as their serde literal.
///
/// Composite types need `Default`, which provides the instance the reader
/// populates and the values unchanged properties are compared against.
/// Leaf types need `Default`, `Clone`, `PartialEq` and serde's `Serialize`
/// and `Deserialize`.
///
/// ```rust, ignore
/// #[derive(Model, Default)]
/// #[model(name = "game::Door", auto_register)]
/// struct Door {
///     #[model(extends)]
///     base: Entity,
///     #[model(required, rename = "title")]
///     name: String,
///     #[model(min = 0, max = 1)]
///     openness: f32,
///     #[model(in_place)]
///     transform: Transform,
///     #[model(shared)]
///     material: Option<Ref<Material>>,
///     #[model(skip)]
///     cache: Vec<u8>,
/// }
/// ```
///
/// ## Type attributes
///
/// - `name = "..."`: the type tag, `module_path!()::Ident` by default.
/// - `leaf`: model a struct as a leaf.
/// - `auto_register`: collect the type for `ModelRegistry::auto_register`.
///   No-op without the `auto_register` feature.
///
/// ## Field attributes
///
/// - `skip`: not a property.
/// - `extends`: merge the properties of this embedded base value; they
///   come before the type's own properties.
/// - `rename = "..."`: the property name, the field name by default.
/// - `in_place`: read into the existing value instead of replacing it.
/// - `flat`: write the referenced object inline, without identity.
/// - `shared`: copies and inheriting readers keep the target.
/// - `required`: an absent value is an error when there is no template.
/// - `nullable = bool`, `copyable = bool`.
/// - `min = ..`, `max = ..`: numeric range checked when reading.
/// - `group = "..."`: editor grouping, kept as metadata.
/// - `getter = path`, `setter = path`: access through
///   `fn(&Self) -> T` and `fn(&mut Self, T)` instead of the field.
///
/// Generic types are rejected; implement `Modeled` by hand for them.
#[proc_macro_derive(Model, attributes(model))]
pub fn derive_model(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);

    match derive_data::ModelDerive::from_input(&ast) {
        Ok(derive) => impls::impl_modeled(&derive).into(),
        Err(err) => err.into_compile_error().into(),
    }
}
