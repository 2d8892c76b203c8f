use proc_macro2::TokenStream;
use quote::{quote, quote_spanned};

use crate::derive_data::{ModelDerive, ModelField, Shape};
use crate::path;

pub(crate) fn impl_modeled(derive: &ModelDerive) -> TokenStream {
    let vc_model = path::vc_model();
    let cow_ = path::cow_(&vc_model);
    let ident = &derive.ident;

    let name = match &derive.attrs.name {
        Some(name) => quote! { #name },
        None => {
            let suffix = format!("::{ident}");
            quote! { ::core::concat!(::core::module_path!(), #suffix) }
        }
    };

    let (leaf_impl, registry, body) = match &derive.shape {
        Shape::Leaf => (
            quote! { impl #vc_model::model::LeafValue for #ident {} },
            quote! { _ },
            quote! { ::core::result::Result::Ok(#vc_model::Model::leaf::<Self>()) },
        ),
        Shape::Composite(fields) => {
            let declarations = fields.iter().map(declaration);
            (
                TokenStream::new(),
                quote! { registry },
                quote! {
                    #vc_model::ModelBuilder::<Self>::new(registry)
                        #(#declarations)*
                        .build()
                },
            )
        }
    };

    let auto_register = auto_register(derive, &vc_model);

    quote! {
        #leaf_impl

        impl #vc_model::Modeled for #ident {
            #[inline]
            fn type_name() -> #cow_<'static, str> {
                #cow_::Borrowed(#name)
            }

            fn build_model(
                #registry: &#vc_model::ModelRegistry,
            ) -> ::core::result::Result<#vc_model::Model, #vc_model::ModelError> {
                #body
            }
        }

        #auto_register
    }
}

/// The builder calls declaring one field.
fn declaration(field: &ModelField) -> TokenStream {
    let member = &field.member;
    let ty = &field.ty;
    let attrs = &field.attrs;

    if attrs.extends.is_some() {
        return quote! {
            .extends::<#ty>(|v| &v.#member, |v| &mut v.#member)
        };
    }

    let name = field.name();
    let mut tokens = match (&attrs.getter, &attrs.setter) {
        (Some(getter), Some(setter)) => quote! {
            .accessor::<#ty>(#name, #getter, #setter)
        },
        _ => quote! {
            .field(#name, |v| &v.#member, |v| &mut v.#member)
        },
    };

    if let Some(span) = attrs.in_place {
        tokens.extend(quote_spanned! { span => .in_place() });
    }
    if let Some(span) = attrs.flat {
        tokens.extend(quote_spanned! { span => .flat() });
    }
    if let Some(span) = attrs.shared {
        tokens.extend(quote_spanned! { span => .shared() });
    }
    if let Some(span) = attrs.required {
        tokens.extend(quote_spanned! { span => .required() });
    }
    if let Some(nullable) = attrs.nullable {
        tokens.extend(quote! { .nullable(#nullable) });
    }
    if let Some(copyable) = attrs.copyable {
        tokens.extend(quote! { .copyable(#copyable) });
    }
    if attrs.min.is_some() || attrs.max.is_some() {
        let min = attrs
            .min
            .as_ref()
            .map_or_else(|| quote! { f64::NEG_INFINITY }, |min| quote! { (#min) as f64 });
        let max = attrs
            .max
            .as_ref()
            .map_or_else(|| quote! { f64::INFINITY }, |max| quote! { (#max) as f64 });
        tokens.extend(quote! { .range(#min, #max) });
    }
    if let Some(group) = &attrs.group {
        tokens.extend(quote! { .group(#group) });
    }
    tokens
}

#[cfg(feature = "auto_register")]
fn auto_register(derive: &ModelDerive, vc_model: &syn::Path) -> TokenStream {
    let Some(span) = derive.attrs.auto_register else {
        return TokenStream::new();
    };
    let ident = &derive.ident;
    quote_spanned! { span =>
        #vc_model::auto_register!(#ident);
    }
}

#[cfg(not(feature = "auto_register"))]
fn auto_register(_: &ModelDerive, _: &syn::Path) -> TokenStream {
    TokenStream::new()
}
