use proc_macro2::Span;
use syn::spanned::Spanned;
use syn::{Data, DeriveInput, Fields, Ident, Member, Type};

use crate::attributes::{FieldAttributes, TypeAttributes};

/// How a derived type is modeled.
pub(crate) enum Shape {
    /// A serde literal.
    Leaf,
    /// A record of the listed properties.
    Composite(Vec<ModelField>),
}

/// A field that takes part in the model.
pub(crate) struct ModelField {
    pub member: Member,
    pub ty: Type,
    pub attrs: FieldAttributes,
}

impl ModelField {
    /// The property name: `rename`, else the field name or index.
    pub fn name(&self) -> String {
        if let Some(rename) = &self.attrs.rename {
            return rename.value();
        }
        match &self.member {
            Member::Named(ident) => ident.to_string(),
            Member::Unnamed(index) => index.index.to_string(),
        }
    }
}

/// The parsed input of `#[derive(Model)]`.
pub(crate) struct ModelDerive {
    pub ident: Ident,
    pub attrs: TypeAttributes,
    pub shape: Shape,
}

impl ModelDerive {
    pub fn from_input(input: &DeriveInput) -> syn::Result<Self> {
        if !input.generics.params.is_empty() {
            return Err(syn::Error::new(
                input.generics.span(),
                "`Model` cannot be derived for generic types; implement `Modeled` by hand",
            ));
        }

        let attrs = TypeAttributes::parse_attrs(&input.attrs)?;
        let shape = match &input.data {
            _ if attrs.leaf.is_some() => Shape::Leaf,
            Data::Enum(_) => Shape::Leaf,
            Data::Struct(data) => Shape::Composite(Self::fields(&data.fields)?),
            Data::Union(data) => {
                return Err(syn::Error::new(
                    data.union_token.span,
                    "`Model` cannot be derived for unions",
                ));
            }
        };

        Ok(Self {
            ident: input.ident.clone(),
            attrs,
            shape,
        })
    }

    fn fields(fields: &Fields) -> syn::Result<Vec<ModelField>> {
        let mut result = Vec::with_capacity(fields.len());
        let mut errors: Option<syn::Error> = None;
        for (index, field) in fields.iter().enumerate() {
            let span = field.ident.as_ref().map_or_else(|| field.ty.span(), Ident::span);
            let attrs = match FieldAttributes::parse_attrs(&field.attrs, span) {
                Ok(attrs) => attrs,
                Err(err) => {
                    combine(&mut errors, err);
                    continue;
                }
            };
            if attrs.skip.is_some() {
                continue;
            }
            let member = match &field.ident {
                Some(ident) => Member::Named(ident.clone()),
                None => Member::Unnamed(syn::Index {
                    index: index as u32,
                    span: Span::call_site(),
                }),
            };
            result.push(ModelField {
                member,
                ty: field.ty.clone(),
                attrs,
            });
        }
        match errors {
            Some(err) => Err(err),
            None => Ok(result),
        }
    }
}

fn combine(errors: &mut Option<syn::Error>, err: syn::Error) {
    match errors {
        Some(errors) => errors.combine(err),
        None => *errors = Some(err),
    }
}
