use alloc::collections::VecDeque;
use alloc::string::{String, ToString};
use alloc::vec;
use alloc::vec::Vec;
use core::any::Any;

use serde_json::{Map, Value as Json};

use super::references::ReferenceTable;
use super::{Dependency, Document, OutputConfig, TYPE_TAG, VALUE_TAG};
use crate::compare::shallow_equal;
use crate::model::{ArrayModel, LeafModel, MapModel, ModelKind, ReferenceModel};
use crate::utils::HashSet;
use crate::{Model, ModelError, ModelRegistry, ModelSource, Modeled, ObjectRef};

/// A shared object waiting to be written into its slot.
struct Pending {
    id: usize,
    object: ObjectRef,
    template: Option<ObjectRef>,
    tagged: bool,
}

/// One write of an object graph.
///
/// Shared objects are written in the order they are met, breadth first.
/// Frozen objects (`Arc<T>`) are written as soon as they are met, so the
/// reader, which has to build them before it can hand them out, sees them
/// in the same order.
///
/// # Examples
///
/// ```
/// use vc_model::derive::Model;
/// use vc_model::io::{Format, Output, OutputConfig};
/// use vc_model::ModelRegistry;
///
/// #[derive(Model, Default)]
/// struct Settings {
///     volume: u8,
///     muted: bool,
/// }
///
/// let registry = ModelRegistry::new();
/// let settings = Settings { volume: 7, muted: false };
///
/// let config = OutputConfig::default().with_skip_defaults(false);
/// let document = Output::new(&registry, config).write(&settings, None).unwrap();
/// assert_eq!(document.slots()[0], serde_json::json!({"volume": 7, "muted": false}));
///
/// let compact = OutputConfig::default().with_format(Format::Cbor);
/// let bytes = Output::new(&registry, compact).serialize(&settings, None).unwrap();
/// assert!(!bytes.is_empty());
/// ```
pub struct Output<'r> {
    registry: &'r ModelRegistry,
    config: OutputConfig,
    table: ReferenceTable,
    slots: Vec<Json>,
    queue: VecDeque<Pending>,
    flattening: HashSet<usize>,
    dependencies: Vec<Dependency>,
    seen_dependencies: HashSet<Dependency>,
}

impl<'r> Output<'r> {
    pub fn new(registry: &'r ModelRegistry, config: OutputConfig) -> Self {
        Self {
            registry,
            config,
            table: ReferenceTable::default(),
            slots: Vec::new(),
            queue: VecDeque::new(),
            flattening: HashSet::default(),
            dependencies: Vec::new(),
            seen_dependencies: HashSet::default(),
        }
    }

    /// Writes `value` and encodes the document in the configured format.
    pub fn serialize<T: Modeled>(self, value: &T, template: Option<&T>) -> Result<Vec<u8>, ModelError> {
        let format = self.config.format;
        self.write(value, template)?.encode(format)
    }

    /// Writes `value` into a [`Document`].
    pub fn write<T: Modeled>(mut self, value: &T, template: Option<&T>) -> Result<Document, ModelError> {
        let model = self.registry.get::<T>()?;
        let template = template.map(|template| template as &dyn Any);

        if let ModelKind::Reference(reference) = model.kind() {
            // A shared root is object 0.
            let object = reference.handle(value)?;
            let template = template.map(|t| reference.handle(t)).transpose()?;
            self.reference(reference, &object, template, false)?;
        } else {
            let id = self.table.reserve();
            self.slots.push(Json::Null);
            self.slots[id] = self.value(&model, value, template, false)?;
        }

        while let Some(pending) = self.queue.pop_front() {
            let model = self.registry.resolve(pending.object.source())?;
            log::trace!("writing slot {} of `{}`", pending.id, model.name());
            self.slots[pending.id] =
                self.body(&model, &pending.object, pending.template.as_ref(), pending.tagged)?;
        }

        log::debug!(
            "wrote `{}` into {} slots with {} dependencies",
            model.name(),
            self.slots.len(),
            self.dependencies.len()
        );
        Ok(Document::new(self.slots, self.dependencies))
    }

    // -------------------------------------------------------------------------
    // Values

    /// What a property is diffed against: the template, or the default
    /// instance when defaults are skipped.
    fn base<'a>(&self, model: &'a Model, template: Option<&'a dyn Any>) -> Option<&'a dyn Any> {
        match template {
            Some(template) => Some(template),
            None if self.config.skip_defaults => model.default_instance(self.registry),
            None => None,
        }
    }

    fn value(
        &mut self,
        model: &Model,
        value: &dyn Any,
        template: Option<&dyn Any>,
        flat: bool,
    ) -> Result<Json, ModelError> {
        match model.kind() {
            ModelKind::Leaf(leaf) => self.leaf(leaf, value),
            ModelKind::Optional(optional) => match optional.get(value)? {
                None => Ok(Json::Null),
                Some(inner) => {
                    let inner_model = self.registry.resolve(optional.inner())?;
                    let template = match template {
                        Some(template) => optional.get(template)?,
                        None => None,
                    };
                    self.value(&inner_model, inner, template, flat)
                }
            },
            ModelKind::Array(array) => Ok(Json::Array(self.elements(array, value, template, flat)?)),
            ModelKind::Map(map) => Ok(Json::Array(self.entries(map, value, template)?)),
            ModelKind::Composite(_) => {
                let base = self.base(model, template);
                let mut record = self.record(model, value, template, base)?;
                if self.config.always_tag_types {
                    record.insert(TYPE_TAG.into(), Json::from(model.name()));
                }
                Ok(Json::Object(record))
            }
            ModelKind::Reference(reference) => {
                let object = reference.handle(value)?;
                let template = template.map(|t| reference.handle(t)).transpose()?;
                self.reference(reference, &object, template, flat)
            }
        }
    }

    fn leaf(&mut self, leaf: &LeafModel, value: &dyn Any) -> Result<Json, ModelError> {
        if let Some(dependency) = leaf.dependency(value)?
            && self.seen_dependencies.insert(dependency.clone())
        {
            self.dependencies.push(dependency);
        }
        leaf.encode(value)
    }

    fn elements(
        &mut self,
        array: &ArrayModel,
        value: &dyn Any,
        template: Option<&dyn Any>,
        flat: bool,
    ) -> Result<Vec<Json>, ModelError> {
        let model = self.registry.resolve(array.element())?;
        let len = array.len(value)?;
        let mut items = Vec::with_capacity(len);
        for index in 0..len {
            let Some(element) = array.get(value, index)? else {
                break;
            };
            let template = match template {
                Some(template) => array.get(template, index)?,
                None => None,
            };
            items.push(self.value(&model, element, template, flat)?);
        }
        Ok(items)
    }

    fn entries(
        &mut self,
        map: &MapModel,
        value: &dyn Any,
        template: Option<&dyn Any>,
    ) -> Result<Vec<Json>, ModelError> {
        let key_model = self.registry.resolve(map.key())?;
        let value_model = self.registry.resolve(map.value())?;
        let mut items = Vec::with_capacity(map.len(value)?);
        for (key, entry) in map.entries(value)? {
            let template = match template {
                Some(template) => map.lookup(template, key)?,
                None => None,
            };
            let key = self.value(&key_model, key, None, false)?;
            let entry = self.value(&value_model, entry, template, false)?;
            items.push(Json::Array(vec![key, entry]));
        }
        Ok(items)
    }

    /// The properties of `value` that differ from `base`.
    fn record(
        &mut self,
        model: &Model,
        value: &dyn Any,
        template: Option<&dyn Any>,
        base: Option<&dyn Any>,
    ) -> Result<Map<String, Json>, ModelError> {
        let mut record = Map::new();
        for property in model.properties() {
            let value_model = self.registry.resolve(property.value_source())?;
            let current = property.get(value)?;
            let base_value = base.map(|base| property.get(base)).transpose()?;
            // Without a template the reader rejects an absent required
            // property, even when it holds the default.
            let must_write = property.is_required() && template.is_none();
            if let Some(base_value) = &base_value
                && !must_write
                && shallow_equal(self.registry, &value_model, &**base_value, &*current)?
            {
                continue;
            }

            let template_value = template.map(|t| property.get(t)).transpose()?;
            let json = if property.is_in_place() && value_model.as_composite().is_some() {
                // The reader populates the value it already holds, which
                // starts out equal to `base`.
                let mut nested = self.record(
                    &value_model,
                    &*current,
                    template_value.as_deref(),
                    base_value.as_deref(),
                )?;
                if self.config.always_tag_types {
                    nested.insert(TYPE_TAG.into(), Json::from(value_model.name()));
                }
                Json::Object(nested)
            } else {
                self.value(
                    &value_model,
                    &*current,
                    template_value.as_deref(),
                    property.is_flat(),
                )?
            };
            record.insert(property.name().to_string(), json);
        }
        Ok(record)
    }

    // -------------------------------------------------------------------------
    // Shared objects

    /// Whether the reader needs `$type` to know the runtime type of `object`.
    fn needs_tag(
        &self,
        object: &ObjectRef,
        template: Option<&ObjectRef>,
        expected: Option<ModelSource>,
    ) -> bool {
        if self.config.always_tag_types {
            return true;
        }
        let inferred = template
            .map(ObjectRef::type_id)
            .or_else(|| expected.map(|source| source.type_id()));
        inferred != Some(object.type_id())
    }

    fn reference(
        &mut self,
        reference: &ReferenceModel,
        object: &ObjectRef,
        template: Option<ObjectRef>,
        flat: bool,
    ) -> Result<Json, ModelError> {
        let model = self.registry.resolve(object.source())?;
        let tagged = self.needs_tag(object, template.as_ref(), reference.target());

        if flat {
            let identity = object.identity();
            if !self.flattening.insert(identity) {
                return Err(ModelError::FlatCycle {
                    type_name: model.name().to_string(),
                });
            }
            let body = self.body(&model, object, template.as_ref(), tagged);
            self.flattening.remove(&identity);
            return body;
        }

        if let Some(id) = self.table.get(object) {
            return Ok(Json::from(id));
        }
        let id = self.table.insert(object.clone());
        self.slots.push(Json::Null);
        if reference.is_frozen() {
            log::trace!("writing frozen slot {id} of `{}`", model.name());
            self.slots[id] = self.body(&model, object, template.as_ref(), tagged)?;
        } else {
            self.queue.push_back(Pending {
                id,
                object: object.clone(),
                template,
                tagged,
            });
        }
        Ok(Json::from(id))
    }

    /// The content of a shared object, as written into its slot or inline
    /// for a flat reference.
    fn body(
        &mut self,
        model: &Model,
        object: &ObjectRef,
        template: Option<&ObjectRef>,
        tagged: bool,
    ) -> Result<Json, ModelError> {
        let guard = model.read(object)?;
        // A template of another type says nothing about this object.
        let template_guard = match template {
            Some(template) if template.type_id() == object.type_id() => Some(model.read(template)?),
            _ => None,
        };
        let value = &*guard;
        let template = template_guard.as_deref();

        match model.kind() {
            ModelKind::Composite(_) => {
                let base = self.base(model, template);
                let mut record = self.record(model, value, template, base)?;
                if tagged {
                    record.insert(TYPE_TAG.into(), Json::from(model.name()));
                }
                Ok(Json::Object(record))
            }
            ModelKind::Array(array) => {
                let mut items = self.elements(array, value, template, false)?;
                if tagged {
                    items.insert(0, type_marker(model));
                }
                Ok(Json::Array(items))
            }
            ModelKind::Map(map) => {
                let mut items = self.entries(map, value, template)?;
                if tagged {
                    items.insert(0, type_marker(model));
                }
                Ok(Json::Array(items))
            }
            ModelKind::Leaf(_) | ModelKind::Optional(_) | ModelKind::Reference(_) => {
                let mut record = Map::new();
                if tagged {
                    record.insert(TYPE_TAG.into(), Json::from(model.name()));
                }
                record.insert(VALUE_TAG.into(), self.value(model, value, template, false)?);
                Ok(Json::Object(record))
            }
        }
    }
}

fn type_marker(model: &Model) -> Json {
    let mut marker = Map::new();
    marker.insert(TYPE_TAG.into(), Json::from(model.name()));
    Json::Object(marker)
}
