use proc_macro2::TokenStream;
use quote::quote;

/// The path generated code uses for `vc_model`.
///
/// `::vc_model` for crates depending on it directly, `::vc_graph::model`
/// for crates depending on the umbrella crate. Reading the manifest is not
/// cheap, so it is done once per derive and passed around.
pub(crate) fn vc_model() -> syn::Path {
    vc_macro_utils::Manifest::shared(|manifest| manifest.crate_path("vc_model"))
}

#[inline]
pub(crate) fn cow_(vc_model: &syn::Path) -> TokenStream {
    quote! { #vc_model::__macro_exports::Cow }
}
