//! Reading and writing object graphs.
//!
//! # Wire format
//!
//! A document is a JSON array of *slots*. Slot 0 holds the root; every
//! shared object written by reference gets a slot of its own, addressed by
//! its index. An optional trailing slot lists the external files the graph
//! depends on.
//!
//! ```text
//! [
//!   {"name": "root", "child": 1},          // slot 0: the root record
//!   {"name": "leaf", "parent": 0},         // slot 1: a shared object
//!   {"$dependencies": [{"file": "a.png", "type": "Texture"}]}
//! ]
//! ```
//!
//! - Records are JSON objects keyed by property name. Properties equal to
//!   the template (or to the type's default when there is no template) are
//!   left out.
//! - `$type` names the runtime type of a slot. It is only written when the
//!   reader could not infer it: from the template object, or from the
//!   statically declared handle type.
//! - Shared arrays and maps start with a `{"$type": name}` marker when
//!   tagged. Maps are sequences of `[key, value]` pairs.
//! - Slots holding a leaf, optional or handle value are written as
//!   `{"$type"?, "$value": ...}`. So are flat references to them.
//!
//! The document can be stored as JSON text or as CBOR, see [`Format`].
//!
//! # Sessions
//!
//! [`Output`] and [`Input`] hold the state of one write or read: the table
//! of objects met so far and the worklist of objects still to process.
//! [`serialize`] and [`deserialize`] run a session with default settings.

// -----------------------------------------------------------------------------
// Modules

mod document;
mod input;
mod output;
mod references;

// -----------------------------------------------------------------------------
// Exports

pub use document::{Dependency, Document};
pub use input::Input;
pub use output::Output;

// -----------------------------------------------------------------------------
// Imports

use alloc::vec::Vec;

use crate::{ModelError, ModelRegistry, Modeled};

/// Key of the runtime type name in a record or array marker.
pub const TYPE_TAG: &str = "$type";

/// Key of the value in a boxed slot.
pub const VALUE_TAG: &str = "$value";

/// Key of the dependency list in the trailing slot.
pub const DEPENDENCIES_TAG: &str = "$dependencies";

// -----------------------------------------------------------------------------
// Config

/// Byte encoding of a [`Document`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Format {
    /// Compact JSON text.
    #[default]
    Json,
    /// Indented JSON text.
    PrettyJson,
    /// CBOR, the binary form of the same JSON document.
    Cbor,
}

/// Settings of an [`Output`] session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputConfig {
    pub format: Format,
    /// Write `$type` on every slot, even when the reader could infer it.
    pub always_tag_types: bool,
    /// Without a template, leave out properties equal to the type's default.
    pub skip_defaults: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: Format::Json,
            always_tag_types: false,
            skip_defaults: true,
        }
    }
}

impl OutputConfig {
    #[inline]
    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    #[inline]
    pub fn with_always_tag_types(mut self, always_tag_types: bool) -> Self {
        self.always_tag_types = always_tag_types;
        self
    }

    #[inline]
    pub fn with_skip_defaults(mut self, skip_defaults: bool) -> Self {
        self.skip_defaults = skip_defaults;
        self
    }
}

/// Settings of an [`Input`] session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputConfig {
    pub format: Format,
}

impl InputConfig {
    #[inline]
    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }
}

// -----------------------------------------------------------------------------
// Entry points

/// Writes `value` as a JSON document.
///
/// With a `template`, only the differences from it are written, and
/// [`deserialize`] needs the same template to restore the value.
///
/// # Examples
///
/// ```
/// use vc_model::{ModelRegistry, Ref, derive::Model, deserialize, serialize};
///
/// #[derive(Model, Default)]
/// struct Node {
///     name: String,
///     next: Option<Ref<Node>>,
/// }
///
/// let registry = ModelRegistry::new();
/// let leaf = Ref::new(Node { name: "leaf".into(), next: None });
/// let root = Node { name: "root".into(), next: Some(leaf) };
///
/// let bytes = serialize(&registry, &root, None).unwrap();
/// assert_eq!(bytes, br#"[{"name":"root","next":1},{"name":"leaf"}]"#);
///
/// let back: Node = deserialize(&registry, &bytes, None).unwrap();
/// assert_eq!(back.next.unwrap().read().name, "leaf");
/// ```
pub fn serialize<T: Modeled>(
    registry: &ModelRegistry,
    value: &T,
    template: Option<&T>,
) -> Result<Vec<u8>, ModelError> {
    Output::new(registry, OutputConfig::default()).serialize(value, template)
}

/// Reads a value written by [`serialize`].
pub fn deserialize<T: Modeled>(
    registry: &ModelRegistry,
    bytes: &[u8],
    template: Option<&T>,
) -> Result<T, ModelError> {
    Input::new(registry, InputConfig::default()).deserialize(bytes, template)
}

/// Lists the external files a document depends on, without reading the
/// object graph.
pub fn read_dependencies(bytes: &[u8], format: Format) -> Result<Vec<Dependency>, ModelError> {
    Ok(Document::decode(bytes, format)?.into_parts().1)
}

