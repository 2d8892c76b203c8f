//! Parsing of `#[model(...)]` attributes.

use proc_macro2::Span;
use syn::meta::ParseNestedMeta;
use syn::{Attribute, Expr, LitBool, LitStr, Path, Token};

pub(crate) const ATTRIBUTE_NAME: &str = "model";

fn duplicate(meta: &ParseNestedMeta) -> syn::Error {
    let name = meta
        .path
        .get_ident()
        .map(ToString::to_string)
        .unwrap_or_default();
    meta.error(format!("duplicate `{name}` attribute"))
}

/// Stores `value` into `slot`, rejecting a second occurrence.
fn set<T>(meta: &ParseNestedMeta, slot: &mut Option<T>, value: T) -> syn::Result<()> {
    if slot.is_some() {
        return Err(duplicate(meta));
    }
    *slot = Some(value);
    Ok(())
}

/// `flag` or `flag = bool`.
fn parse_bool(meta: &ParseNestedMeta) -> syn::Result<bool> {
    if meta.input.peek(Token![=]) {
        Ok(meta.value()?.parse::<LitBool>()?.value)
    } else {
        Ok(true)
    }
}

// -----------------------------------------------------------------------------
// Type attributes

/// Attributes on the type itself.
///
/// - `name = "game::Node"`: the declared type name, `module_path!()::Ident`
///   by default.
/// - `leaf`: write the type as a serde literal instead of a record.
/// - `auto_register`: submit the type for `ModelRegistry::auto_register`.
#[derive(Default)]
pub(crate) struct TypeAttributes {
    pub name: Option<LitStr>,
    pub leaf: Option<Span>,
    pub auto_register: Option<Span>,
}

impl TypeAttributes {
    pub fn parse_attrs(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut this = Self::default();
        for attr in attrs {
            if !attr.path().is_ident(ATTRIBUTE_NAME) {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    let lit: LitStr = meta.value()?.parse()?;
                    if lit.value().is_empty() {
                        return Err(meta.error("the type name cannot be empty"));
                    }
                    set(&meta, &mut this.name, lit)
                } else if meta.path.is_ident("leaf") {
                    set(&meta, &mut this.leaf, meta.path.require_ident()?.span())
                } else if meta.path.is_ident("auto_register") {
                    set(&meta, &mut this.auto_register, meta.path.require_ident()?.span())
                } else {
                    Err(meta.error("expected `name`, `leaf` or `auto_register`"))
                }
            })?;
        }
        Ok(this)
    }
}

// -----------------------------------------------------------------------------
// Field attributes

/// Attributes on a field.
#[derive(Default)]
pub(crate) struct FieldAttributes {
    /// Not a property.
    pub skip: Option<Span>,
    /// The field holds a base value whose properties are merged in.
    pub extends: Option<Span>,
    pub rename: Option<LitStr>,
    pub in_place: Option<Span>,
    pub flat: Option<Span>,
    pub shared: Option<Span>,
    pub required: Option<Span>,
    pub nullable: Option<bool>,
    pub copyable: Option<bool>,
    pub min: Option<Expr>,
    pub max: Option<Expr>,
    pub group: Option<LitStr>,
    pub getter: Option<Path>,
    pub setter: Option<Path>,
}

impl FieldAttributes {
    pub fn parse_attrs(attrs: &[Attribute], span: Span) -> syn::Result<Self> {
        let mut this = Self::default();
        for attr in attrs {
            if !attr.path().is_ident(ATTRIBUTE_NAME) {
                continue;
            }
            attr.parse_nested_meta(|meta| this.parse_meta(&meta))?;
        }
        this.validate(span)?;
        Ok(this)
    }

    fn parse_meta(&mut self, meta: &ParseNestedMeta) -> syn::Result<()> {
        let Some(ident) = meta.path.get_ident() else {
            return Err(meta.error("expected a field attribute"));
        };
        let span = ident.span();
        match ident.to_string().as_str() {
            "skip" => set(meta, &mut self.skip, span),
            "extends" => set(meta, &mut self.extends, span),
            "in_place" => set(meta, &mut self.in_place, span),
            "flat" => set(meta, &mut self.flat, span),
            "shared" => set(meta, &mut self.shared, span),
            "required" => set(meta, &mut self.required, span),
            "nullable" => {
                let value = parse_bool(meta)?;
                set(meta, &mut self.nullable, value)
            }
            "copyable" => {
                let value = parse_bool(meta)?;
                set(meta, &mut self.copyable, value)
            }
            "rename" => {
                let lit: LitStr = meta.value()?.parse()?;
                set(meta, &mut self.rename, lit)
            }
            "group" => {
                let lit: LitStr = meta.value()?.parse()?;
                set(meta, &mut self.group, lit)
            }
            "min" => {
                let expr: Expr = meta.value()?.parse()?;
                set(meta, &mut self.min, expr)
            }
            "max" => {
                let expr: Expr = meta.value()?.parse()?;
                set(meta, &mut self.max, expr)
            }
            "getter" => {
                let path: Path = meta.value()?.parse()?;
                set(meta, &mut self.getter, path)
            }
            "setter" => {
                let path: Path = meta.value()?.parse()?;
                set(meta, &mut self.setter, path)
            }
            _ => Err(meta.error(format!("unknown field attribute `{ident}`"))),
        }
    }

    fn validate(&self, span: Span) -> syn::Result<()> {
        if self.getter.is_some() != self.setter.is_some() {
            return Err(syn::Error::new(span, "`getter` and `setter` must be given together"));
        }
        if self.getter.is_some() && self.in_place.is_some() {
            return Err(syn::Error::new(
                span,
                "an accessor property cannot be `in_place`",
            ));
        }
        if self.skip.is_some() && (self.extends.is_some() || self.has_property_flags()) {
            return Err(syn::Error::new(span, "`skip` cannot be combined with other attributes"));
        }
        if self.extends.is_some() && self.has_property_flags() {
            return Err(syn::Error::new(
                span,
                "`extends` cannot be combined with property attributes",
            ));
        }
        Ok(())
    }

    fn has_property_flags(&self) -> bool {
        self.rename.is_some()
            || self.in_place.is_some()
            || self.flat.is_some()
            || self.shared.is_some()
            || self.required.is_some()
            || self.nullable.is_some()
            || self.copyable.is_some()
            || self.min.is_some()
            || self.max.is_some()
            || self.group.is_some()
            || self.getter.is_some()
    }
}
