use alloc::collections::VecDeque;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::any::Any;
use core::mem;

use serde_json::Value as Json;

use super::{Document, InputConfig, TYPE_TAG, VALUE_TAG};
use crate::copy::{CopyContext, holds_reference};
use crate::model::{ArrayModel, MapModel, ModelKind, ReferenceModel, downcast_box};
use crate::property::Property;
use crate::{BoxedValue, Model, ModelError, ModelRegistry, Modeled, ObjectRef};

enum SlotState {
    Unresolved,
    /// Slot 0 when the root is a plain value.
    Reserved,
    /// A frozen object whose body is being read.
    Resolving(String),
    Resolved(ObjectRef),
}

/// A shared object allocated but not populated yet.
struct Pending {
    object: ObjectRef,
    model: Arc<Model>,
    json: Json,
    template: Option<ObjectRef>,
}

/// One read of an object graph.
///
/// Shared objects are allocated with their default value when first met
/// and populated afterwards, in the order they were met. Forward and cyclic
/// references therefore resolve to the final object. Frozen objects have
/// to be complete before a handle to them exists, so they are read as soon
/// as they are met; a frozen object that refers back to itself cannot be
/// read.
///
/// Properties missing from a record are inherited from the template, if
/// there is one, through a [`CopyContext`] shared by the whole session.
///
/// # Examples
///
/// ```
/// use vc_model::derive::Model;
/// use vc_model::io::{Format, Input, InputConfig};
/// use vc_model::ModelRegistry;
///
/// #[derive(Model, Default)]
/// struct Settings {
///     volume: u8,
///     muted: bool,
/// }
///
/// let registry = ModelRegistry::new();
/// let input = Input::new(&registry, InputConfig::default().with_format(Format::Json));
/// let settings: Settings = input.deserialize(br#"[{"volume": 3}]"#, None).unwrap();
/// assert_eq!(settings.volume, 3);
/// assert!(!settings.muted);
/// ```
pub struct Input<'r> {
    registry: &'r ModelRegistry,
    config: InputConfig,
    slots: Vec<Json>,
    states: Vec<SlotState>,
    queue: VecDeque<Pending>,
    copier: CopyContext<'r>,
}

impl<'r> Input<'r> {
    pub fn new(registry: &'r ModelRegistry, config: InputConfig) -> Self {
        Self {
            registry,
            config,
            slots: Vec::new(),
            states: Vec::new(),
            queue: VecDeque::new(),
            copier: CopyContext::new(registry),
        }
    }

    /// Decodes `bytes` in the configured format and reads the root value.
    pub fn deserialize<T: Modeled>(self, bytes: &[u8], template: Option<&T>) -> Result<T, ModelError> {
        let document = Document::decode(bytes, self.config.format)?;
        self.read(document, template)
    }

    /// Reads the root value of `document`.
    pub fn read<T: Modeled>(mut self, document: Document, template: Option<&T>) -> Result<T, ModelError> {
        let model = self.registry.get::<T>()?;
        let (slots, dependencies) = document.into_parts();
        if slots.is_empty() {
            return Err(ModelError::malformed(model.name(), "the document has no root slot"));
        }
        log::debug!(
            "reading `{}` from {} slots with {} dependencies",
            model.name(),
            slots.len(),
            dependencies.len()
        );
        self.states = slots.iter().map(|_| SlotState::Unresolved).collect();
        self.slots = slots;
        let template = template.map(|template| template as &dyn Any);

        let root = match model.kind() {
            ModelKind::Reference(reference) => {
                // A shared root is object 0.
                let template = template.map(|t| reference.handle(t)).transpose()?;
                let object = self.reference(&model, reference, Json::from(0), template)?;
                reference.from_handle(&object)?
            }
            _ => {
                self.states[0] = SlotState::Reserved;
                let json = mem::take(&mut self.slots[0]);
                self.value(&model, json, template)?
            }
        };

        self.drain()?;
        downcast_box::<T>(root)
    }

    /// Populates the shared objects allocated so far, then the copies made
    /// for inherited properties.
    fn drain(&mut self) -> Result<(), ModelError> {
        while let Some(Pending {
            object,
            model,
            json,
            template,
        }) = self.queue.pop_front()
        {
            log::trace!("reading object of `{}`", model.name());
            let template_guard = template.as_ref().map(|t| model.read(t)).transpose()?;
            let template = template_guard.as_deref();
            let mut guard = model.write(&object)?;
            if model.as_composite().is_some() {
                self.populate(&model, &mut *guard, json, template)?;
            } else {
                let json = content(&model, json)?;
                let value = self.value(&model, json, template)?;
                model.assign(&mut *guard, value)?;
            }
        }
        self.copier.drain()
    }

    // -------------------------------------------------------------------------
    // Values

    fn value(
        &mut self,
        model: &Model,
        json: Json,
        template: Option<&dyn Any>,
    ) -> Result<BoxedValue, ModelError> {
        match model.kind() {
            ModelKind::Leaf(leaf) => leaf.decode(&json),
            ModelKind::Optional(optional) => {
                if json.is_null() {
                    return Ok(optional.none());
                }
                let inner_model = self.registry.resolve(optional.inner())?;
                let template = match template {
                    Some(template) => optional.get(template)?,
                    None => None,
                };
                let inner = self.value(&inner_model, json, template)?;
                optional.some(inner)
            }
            ModelKind::Array(array) => self.elements(model, array, json, template),
            ModelKind::Map(map) => self.entries(model, map, json, template),
            ModelKind::Composite(_) => {
                let mut value = model.new_default(self.registry)?;
                self.populate(model, &mut *value, json, template)?;
                Ok(value)
            }
            ModelKind::Reference(reference) => {
                let template = template.map(|t| reference.handle(t)).transpose()?;
                let object = self.reference(model, reference, json, template)?;
                reference.from_handle(&object)
            }
        }
    }

    fn elements(
        &mut self,
        model: &Model,
        array: &ArrayModel,
        json: Json,
        template: Option<&dyn Any>,
    ) -> Result<BoxedValue, ModelError> {
        let items = self.sequence(model, json)?;
        let element = self.registry.resolve(array.element())?;
        let mut elements = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            let template = match template {
                Some(template) => array.get(template, index)?,
                None => None,
            };
            elements.push(self.value(&element, item, template)?);
        }
        array.collect(elements)
    }

    fn entries(
        &mut self,
        model: &Model,
        map: &MapModel,
        json: Json,
        template: Option<&dyn Any>,
    ) -> Result<BoxedValue, ModelError> {
        let items = self.sequence(model, json)?;
        let key_model = self.registry.resolve(map.key())?;
        let value_model = self.registry.resolve(map.value())?;
        let mut entries = Vec::with_capacity(items.len());
        for item in items {
            let Json::Array(pair) = item else {
                return Err(ModelError::malformed(model.name(), "map entries are [key, value] pairs"));
            };
            let [key, value] = <[Json; 2]>::try_from(pair).map_err(|pair| {
                ModelError::malformed(
                    model.name(),
                    format!("map entry with {} elements", pair.len()),
                )
            })?;
            let key = self.value(&key_model, key, None)?;
            let template = match template {
                Some(template) => map.lookup(template, &*key)?,
                None => None,
            };
            let value = self.value(&value_model, value, template)?;
            entries.push((key, value));
        }
        map.collect(entries)
    }

    /// The elements of an array or map, without its type marker.
    fn sequence(&self, model: &Model, json: Json) -> Result<Vec<Json>, ModelError> {
        let Json::Array(mut items) = json else {
            return Err(ModelError::malformed(model.name(), "expected an array"));
        };
        let strip = match items.first().and_then(marker) {
            Some(name) if name == model.name() => true,
            Some(name) => {
                // A marker naming another container is a wrong type, not
                // an element that happens to look like one.
                if let Ok(other) = self.registry.get_by_name(name)
                    && is_container(&other)
                {
                    return Err(ModelError::mismatch(model.name(), name));
                }
                false
            }
            None => false,
        };
        if strip {
            items.remove(0);
        }
        Ok(items)
    }

    // -------------------------------------------------------------------------
    // Records

    /// Reads a record into the existing value `target`.
    fn populate(
        &mut self,
        model: &Model,
        target: &mut dyn Any,
        json: Json,
        template: Option<&dyn Any>,
    ) -> Result<(), ModelError> {
        let Json::Object(mut record) = json else {
            return Err(ModelError::malformed(model.name(), "expected a record"));
        };
        if let Some(tag) = record.remove(TYPE_TAG)
            && tag.as_str() != Some(model.name())
        {
            return Err(ModelError::mismatch(model.name(), tag.to_string()));
        }

        for property in model.properties() {
            match record.remove(property.name()) {
                Some(json) => self.property(model, property, target, json, template)?,
                None => match template {
                    Some(template) => self.inherit(property, target, template)?,
                    None if property.is_required() => {
                        return Err(ModelError::null_primitive(model.name(), property.name()));
                    }
                    None => {}
                },
            }
        }

        for name in record.keys() {
            log::warn!("ignoring unknown property `{name}` of `{}`", model.name());
        }
        Ok(())
    }

    fn property(
        &mut self,
        model: &Model,
        property: &Property,
        target: &mut dyn Any,
        json: Json,
        template: Option<&dyn Any>,
    ) -> Result<(), ModelError> {
        let value_model = self.registry.resolve(property.value_source())?;

        if json.is_null() {
            if !property.is_nullable() {
                return Err(ModelError::null_primitive(model.name(), property.name()));
            }
            let value = match value_model.kind() {
                ModelKind::Optional(optional) => optional.none(),
                _ => value_model.new_default(self.registry)?,
            };
            return property.set(target, value);
        }

        if let Some(range) = property.range()
            && let Some(number) = json.as_f64()
            && !range.contains(number)
        {
            return Err(ModelError::OutOfRange {
                type_name: model.name().to_string(),
                property: property.name().to_string(),
                value: number,
            });
        }

        let template_value = template.map(|t| property.get(t)).transpose()?;
        let template_value = template_value.as_deref();
        if property.is_in_place()
            && value_model.as_composite().is_some()
            && let Some(slot) = property.get_mut(target)?
        {
            return self.populate(&value_model, slot, json, template_value);
        }
        let value = self.value(&value_model, json, template_value)?;
        property.set(target, value)
    }

    /// Gives `target` the template's value of an absent property.
    fn inherit(
        &mut self,
        property: &Property,
        target: &mut dyn Any,
        template: &dyn Any,
    ) -> Result<(), ModelError> {
        let value_model = self.registry.resolve(property.value_source())?;
        let value = property.get(template)?;

        if !property.is_copyable() {
            // Handles are shared, everything else keeps its default.
            if !holds_reference(self.registry, &value_model)? {
                return Ok(());
            }
            let shared = self.copier.value(&value_model, &*value, true)?;
            return property.set(target, shared);
        }

        if property.is_in_place()
            && !property.is_shared()
            && value_model.as_composite().is_some()
            && let Some(slot) = property.get_mut(target)?
        {
            return self.copier.copy_into(&value_model, &*value, slot);
        }
        let copy = self
            .copier
            .value(&value_model, &*value, property.is_shared())?;
        property.set(target, copy)
    }

    // -------------------------------------------------------------------------
    // Shared objects

    fn reference(
        &mut self,
        owner: &Model,
        reference: &ReferenceModel,
        json: Json,
        template: Option<ObjectRef>,
    ) -> Result<ObjectRef, ModelError> {
        match json {
            Json::Number(number) => {
                let id = number
                    .as_u64()
                    .and_then(|id| usize::try_from(id).ok())
                    .ok_or_else(|| {
                        ModelError::malformed(owner.name(), format!("invalid reference id {number}"))
                    })?;
                self.slot(owner, reference, id, template)
            }
            // Written inline: a flat reference or a boxed leaf.
            json @ (Json::Object(_) | Json::Array(_)) => {
                let model = self.slot_model(reference, &json, template.as_ref())?;
                let template = template.filter(|t| t.type_id() == model.type_id());
                let value = self.body(&model, json, template.as_ref())?;
                if reference.is_frozen() {
                    model.freeze(value)
                } else {
                    model.share(value)
                }
            }
            other => Err(ModelError::malformed(
                owner.name(),
                format!("expected a reference, found `{other}`"),
            )),
        }
    }

    /// The object stored in slot `id`, read on first request.
    fn slot(
        &mut self,
        owner: &Model,
        reference: &ReferenceModel,
        id: usize,
        template: Option<ObjectRef>,
    ) -> Result<ObjectRef, ModelError> {
        match self.states.get(id) {
            None => {
                return Err(ModelError::malformed(
                    owner.name(),
                    format!("reference {id} is out of range"),
                ));
            }
            Some(SlotState::Resolved(object)) => return Ok(object.clone()),
            Some(SlotState::Resolving(type_name)) => {
                return Err(ModelError::CircularReference {
                    id,
                    type_name: type_name.clone(),
                });
            }
            Some(SlotState::Reserved) => {
                return Err(ModelError::malformed(
                    owner.name(),
                    format!("reference {id} points at the root value"),
                ));
            }
            Some(SlotState::Unresolved) => {}
        }

        let json = mem::take(&mut self.slots[id]);
        let model = self.slot_model(reference, &json, template.as_ref())?;
        // A template of another type says nothing about this object.
        let template = template.filter(|t| t.type_id() == model.type_id());

        let object = if reference.is_frozen() {
            log::trace!("reading frozen slot {id} of `{}`", model.name());
            self.states[id] = SlotState::Resolving(model.name().to_string());
            let value = self.body(&model, json, template.as_ref())?;
            model.freeze(value)?
        } else {
            let object = model.share(model.new_default(self.registry)?)?;
            self.queue.push_back(Pending {
                object: object.clone(),
                model,
                json,
                template,
            });
            object
        };
        self.states[id] = SlotState::Resolved(object.clone());
        Ok(object)
    }

    /// The runtime model of a slot: its tag, else the template's type, else
    /// the type the handle points at.
    fn slot_model(
        &self,
        reference: &ReferenceModel,
        json: &Json,
        template: Option<&ObjectRef>,
    ) -> Result<Arc<Model>, ModelError> {
        let inferred = match template {
            Some(template) => Some(template.source()),
            None => reference.target(),
        };

        match json {
            Json::Object(record) => {
                if let Some(tag) = record.get(TYPE_TAG) {
                    let name = tag.as_str().ok_or_else(|| {
                        ModelError::malformed(TYPE_TAG, format!("type tag `{tag}` is not a string"))
                    })?;
                    return self.registry.get_by_name(name);
                }
            }
            Json::Array(items) => {
                if let Some(name) = items.first().and_then(marker) {
                    match self.registry.get_by_name(name) {
                        Ok(model) if is_container(&model) => return Ok(model),
                        Err(err) if inferred.is_none() => return Err(err),
                        _ => {}
                    }
                }
            }
            _ => {}
        }

        match inferred {
            Some(source) => self.registry.resolve(source),
            None => Err(ModelError::type_resolution("<untagged object>")),
        }
    }

    /// Builds the value of a slot or inline object.
    fn body(
        &mut self,
        model: &Model,
        json: Json,
        template: Option<&ObjectRef>,
    ) -> Result<BoxedValue, ModelError> {
        let guard = template.map(|t| model.read(t)).transpose()?;
        let json = content(model, json)?;
        self.value(model, json, guard.as_deref())
    }
}

/// The content of a slot: kinds without a JSON shape of their own are
/// boxed as `{"$value": ...}`.
fn content(model: &Model, json: Json) -> Result<Json, ModelError> {
    match model.kind() {
        ModelKind::Leaf(_) | ModelKind::Optional(_) | ModelKind::Reference(_) => match json {
            Json::Object(mut record) => record.remove(VALUE_TAG).ok_or_else(|| {
                ModelError::malformed(model.name(), "boxed value without `$value`")
            }),
            _ => Err(ModelError::malformed(model.name(), "expected a boxed value")),
        },
        ModelKind::Array(_) | ModelKind::Map(_) | ModelKind::Composite(_) => Ok(json),
    }
}

/// The type named by an array marker `{"$type": name}`.
fn marker(json: &Json) -> Option<&str> {
    match json {
        Json::Object(record) if record.len() == 1 => record.get(TYPE_TAG)?.as_str(),
        _ => None,
    }
}

fn is_container(model: &Model) -> bool {
    matches!(model.kind(), ModelKind::Array(_) | ModelKind::Map(_))
}

#[cfg(test)]
mod tests {
    use alloc::borrow::Cow;
    use alloc::string::String;
    use alloc::sync::Arc;
    use alloc::vec;
    use alloc::vec::Vec;
    use std::collections::BTreeMap;

    use super::Input;
    use crate::io::{Format, InputConfig, Output, OutputConfig, read_dependencies};
    use crate::{
        AssetRef, Model, ModelBuilder, ModelError, ModelRegistry, Modeled, ObjectRef, Ref,
        deep_equal, deserialize, serialize,
    };

    #[derive(Default)]
    struct Node {
        name: String,
        children: Vec<Ref<Node>>,
        next: Option<Ref<Node>>,
    }

    impl Modeled for Node {
        fn type_name() -> Cow<'static, str> {
            Cow::Borrowed("test::Node")
        }

        fn build_model(registry: &ModelRegistry) -> Result<Model, ModelError> {
            ModelBuilder::<Self>::new(registry)
                .field("name", |v| &v.name, |v| &mut v.name)
                .field("children", |v| &v.children, |v| &mut v.children)
                .field("next", |v| &v.next, |v| &mut v.next)
                .build()
        }
    }

    #[derive(Default)]
    struct Frozen {
        name: String,
        me: Option<Arc<Frozen>>,
    }

    impl Modeled for Frozen {
        fn type_name() -> Cow<'static, str> {
            Cow::Borrowed("test::Frozen")
        }

        fn build_model(registry: &ModelRegistry) -> Result<Model, ModelError> {
            ModelBuilder::<Self>::new(registry)
                .field("name", |v| &v.name, |v| &mut v.name)
                .field("me", |v| &v.me, |v| &mut v.me)
                .build()
        }
    }

    #[derive(Default)]
    struct Holder {
        any: Option<ObjectRef>,
        frozen: Option<Arc<Node>>,
        icon: AssetRef,
        table: BTreeMap<String, Ref<Node>>,
    }

    impl Modeled for Holder {
        fn type_name() -> Cow<'static, str> {
            Cow::Borrowed("test::Holder")
        }

        fn build_model(registry: &ModelRegistry) -> Result<Model, ModelError> {
            ModelBuilder::<Self>::new(registry)
                .field("any", |v| &v.any, |v| &mut v.any)
                .field("frozen", |v| &v.frozen, |v| &mut v.frozen)
                .field("icon", |v| &v.icon, |v| &mut v.icon)
                .field("table", |v| &v.table, |v| &mut v.table)
                .build()
        }
    }

    #[derive(Default)]
    struct Labels {
        front: Option<Ref<String>>,
        back: Option<Ref<String>>,
    }

    impl Modeled for Labels {
        fn type_name() -> Cow<'static, str> {
            Cow::Borrowed("test::Labels")
        }

        fn build_model(registry: &ModelRegistry) -> Result<Model, ModelError> {
            ModelBuilder::<Self>::new(registry)
                .field("front", |v| &v.front, |v| &mut v.front)
                .field("back", |v| &v.back, |v| &mut v.back)
                .build()
        }
    }

    #[derive(Default)]
    struct Prefab {
        name: String,
        health: u32,
        tags: Vec<String>,
        material: Option<Ref<String>>,
        cache: Option<Ref<String>>,
        scratch: u32,
    }

    impl Modeled for Prefab {
        fn type_name() -> Cow<'static, str> {
            Cow::Borrowed("test::Prefab")
        }

        fn build_model(registry: &ModelRegistry) -> Result<Model, ModelError> {
            ModelBuilder::<Self>::new(registry)
                .field("name", |v| &v.name, |v| &mut v.name)
                .required()
                .field("health", |v| &v.health, |v| &mut v.health)
                .range(0.0, 1000.0)
                .field("tags", |v| &v.tags, |v| &mut v.tags)
                .field("material", |v| &v.material, |v| &mut v.material)
                .shared()
                .field("cache", |v| &v.cache, |v| &mut v.cache)
                .copyable(false)
                .field("scratch", |v| &v.scratch, |v| &mut v.scratch)
                .copyable(false)
                .build()
        }
    }

    #[derive(Default)]
    struct Position {
        x: i32,
        y: i32,
    }

    impl Modeled for Position {
        fn type_name() -> Cow<'static, str> {
            Cow::Borrowed("test::Position")
        }

        fn build_model(registry: &ModelRegistry) -> Result<Model, ModelError> {
            ModelBuilder::<Self>::new(registry)
                .field("x", |v| &v.x, |v| &mut v.x)
                .field("y", |v| &v.y, |v| &mut v.y)
                .build()
        }
    }

    #[derive(Default)]
    struct Actor {
        base: Position,
        position: Position,
        label: String,
    }

    impl Actor {
        fn label(&self) -> String {
            self.label.to_uppercase()
        }

        fn set_label(&mut self, label: String) {
            self.label = label.to_lowercase();
        }
    }

    impl Modeled for Actor {
        fn type_name() -> Cow<'static, str> {
            Cow::Borrowed("test::Actor")
        }

        fn build_model(registry: &ModelRegistry) -> Result<Model, ModelError> {
            ModelBuilder::<Self>::new(registry)
                .extends::<Position>(|v| &v.base, |v| &mut v.base)
                .field("position", |v| &v.position, |v| &mut v.position)
                .in_place()
                .accessor("label", Actor::label, Actor::set_label)
                .build()
        }
    }

    fn node(name: &str) -> Node {
        Node {
            name: name.into(),
            ..Node::default()
        }
    }

    fn read<T: Modeled>(registry: &ModelRegistry, json: &str) -> Result<T, ModelError> {
        deserialize(registry, json.as_bytes(), None)
    }

    #[test]
    fn reads_forward_references() {
        let registry = ModelRegistry::new();
        let root: Node = read(&registry, r#"[{"name":"root","next":1},{"name":"leaf"}]"#).unwrap();
        assert_eq!(root.name, "root");
        assert_eq!(root.next.unwrap().read().name, "leaf");
    }

    #[test]
    fn round_trip_preserves_sharing_and_cycles() {
        let registry = ModelRegistry::new();
        let root = Ref::new(node("root"));
        let shared = Ref::new(node("shared"));
        shared.write().next = Some(root.clone());
        root.write().children = vec![shared.clone(), Ref::new(node("other")), shared];

        let bytes = serialize(&registry, &root, None).unwrap();
        let back: Ref<Node> = deserialize(&registry, &bytes, None).unwrap();
        assert!(deep_equal(&registry, &root, &back).unwrap());

        let back_ref = back.read();
        assert!(Ref::ptr_eq(&back_ref.children[0], &back_ref.children[2]));
        let parent = back_ref.children[0].read().next.clone().unwrap();
        assert!(Ref::ptr_eq(&parent, &back));

        drop(back_ref);
        // Break the cycles so the objects are freed.
        back.write().children.clear();
        root.write().children.clear();
    }

    #[test]
    fn shared_leaf_values_keep_their_identity() {
        let registry = ModelRegistry::new();
        let text = Ref::new(String::from("stone"));
        let labels = Labels {
            front: Some(text.clone()),
            back: Some(text),
        };

        let bytes = serialize(&registry, &labels, None).unwrap();
        assert_eq!(
            bytes,
            br#"[{"back":1,"front":1},{"$value":"stone"}]"#
        );

        let back: Labels = deserialize(&registry, &bytes, None).unwrap();
        let front = back.front.unwrap();
        let other = back.back.unwrap();
        assert!(Ref::ptr_eq(&front, &other));
        *front.write() = String::from("moss");
        assert_eq!(*other.read(), "moss");

        let root = Ref::new(String::from("root"));
        let bytes = serialize(&registry, &root, None).unwrap();
        assert_eq!(bytes, br#"[{"$value":"root"}]"#);
        let back: Ref<String> = deserialize(&registry, &bytes, None).unwrap();
        assert_eq!(*back.read(), "root");
    }

    #[test]
    fn frozen_objects() {
        let registry = ModelRegistry::new();
        let frozen = Arc::new(Node {
            name: "frozen".into(),
            children: vec![Ref::new(node("inner"))],
            next: None,
        });
        let holder = Holder {
            any: Some(ObjectRef::new(node("later"))),
            frozen: Some(frozen),
            ..Holder::default()
        };
        let bytes = serialize(&registry, &holder, None).unwrap();
        let back: Holder = deserialize(&registry, &bytes, None).unwrap();
        assert!(deep_equal(&registry, &holder, &back).unwrap());
        assert!(back.any.unwrap().downcast::<Node>().is_some());

        let err = read::<Arc<Frozen>>(&registry, r#"[{"name":"loop","me":0}]"#).err().unwrap();
        assert!(matches!(
            err,
            ModelError::CircularReference { id: 0, ref type_name } if type_name == "test::Frozen"
        ));
    }

    #[test]
    fn template_inheritance() {
        let registry = ModelRegistry::new();
        let template = Prefab {
            name: "orc".into(),
            health: 100,
            tags: vec!["enemy".into()],
            material: Some(Ref::new(String::from("skin"))),
            cache: Some(Ref::new(String::from("cache"))),
            scratch: 5,
        };
        let value = Prefab {
            health: 80,
            tags: template.tags.clone(),
            material: template.material.clone(),
            cache: template.cache.clone(),
            name: template.name.clone(),
            scratch: 5,
        };

        let bytes = serialize(&registry, &value, Some(&template)).unwrap();
        assert_eq!(bytes, br#"[{"health":80}]"#);

        let back = deserialize(&registry, &bytes, Some(&template)).unwrap();
        assert_eq!(back.name, "orc");
        assert_eq!(back.health, 80);
        assert_eq!(back.tags, ["enemy"]);
        assert!(Ref::ptr_eq(
            back.material.as_ref().unwrap(),
            template.material.as_ref().unwrap()
        ));
        assert!(Ref::ptr_eq(
            back.cache.as_ref().unwrap(),
            template.cache.as_ref().unwrap()
        ));
        assert_eq!(back.scratch, 0);
    }

    #[test]
    fn required_and_null_properties() {
        let registry = ModelRegistry::new();

        // Required properties are written even when they hold the default.
        let bytes = serialize(&registry, &Prefab::default(), None).unwrap();
        assert_eq!(bytes, br#"[{"name":""}]"#);

        let err = read::<Prefab>(&registry, "[{}]").err().unwrap();
        assert!(matches!(err, ModelError::NullPrimitive { ref property, .. } if property == "name"));

        let err = read::<Node>(&registry, r#"[{"name":null}]"#).err().unwrap();
        assert!(matches!(err, ModelError::NullPrimitive { ref property, .. } if property == "name"));

        let cleared: Node = read(&registry, r#"[{"name":"n","next":null}]"#).unwrap();
        assert!(cleared.next.is_none());
    }

    #[test]
    fn range_checks() {
        let registry = ModelRegistry::new();
        let err = read::<Prefab>(&registry, r#"[{"name":"x","health":5000}]"#).err().unwrap();
        assert!(matches!(err, ModelError::OutOfRange { value, .. } if value == 5000.0));
    }

    #[test]
    fn type_resolution() {
        let registry = ModelRegistry::new();
        let err = read::<Holder>(&registry, r#"[{"any":{"$type":"nope","$value":1}}]"#).err().unwrap();
        assert!(matches!(err, ModelError::TypeResolution { ref type_name } if type_name == "nope"));

        let err = read::<Holder>(&registry, r#"[{"any":1},{"name":"x"}]"#).err().unwrap();
        assert!(matches!(err, ModelError::TypeResolution { .. }));

        // Inline boxed leaves name their type, which must be registered.
        registry.register::<String>().unwrap();
        let holder: Holder = read(&registry, r#"[{"any":{"$type":"String","$value":"text"}}]"#).unwrap();
        let text = holder.any.unwrap().downcast::<String>().unwrap();
        assert_eq!(*text.read(), "text");
    }

    #[test]
    fn malformed_documents() {
        let registry = ModelRegistry::new();
        let err = read::<Node>(&registry, r#"[{"next":5}]"#).err().unwrap();
        assert!(matches!(err, ModelError::Malformed { .. }));

        let err = read::<Node>(&registry, r#"[{"next":0}]"#).err().unwrap();
        assert!(matches!(err, ModelError::Malformed { .. }));

        let err = read::<Node>(&registry, r#"[{"children":{}}]"#).err().unwrap();
        assert!(matches!(err, ModelError::Malformed { .. }));

        let err = read::<[u8; 2]>(&registry, "[[1,2,3]]").err().unwrap();
        assert!(matches!(err, ModelError::Malformed { .. }));
    }

    #[test]
    fn array_markers() {
        let registry = ModelRegistry::new();
        let value = ObjectRef::new(vec![1_u32, 2]);
        let bytes = serialize(&registry, &value, None).unwrap();
        assert_eq!(bytes, br#"[[{"$type":"Vec<u32>"},1,2]]"#);

        let back: ObjectRef = deserialize(&registry, &bytes, None).unwrap();
        assert_eq!(*back.downcast::<Vec<u32>>().unwrap().read(), [1, 2]);

        let plain: Ref<Vec<u32>> = read(&registry, "[[3,4]]").unwrap();
        assert_eq!(*plain.read(), [3, 4]);

        registry.get::<Vec<u8>>().unwrap();
        let err = read::<Ref<Vec<u32>>>(&registry, r#"[[{"$type":"Vec<u8>"},1]]"#).err().unwrap();
        assert!(matches!(err, ModelError::TypeMismatch { .. }));
    }

    #[test]
    fn maps_share_values() {
        let registry = ModelRegistry::new();
        let shared = Ref::new(node("shared"));
        let mut holder = Holder::default();
        holder.table.insert("a".into(), shared.clone());
        holder.table.insert("b".into(), shared);

        let bytes = serialize(&registry, &holder, None).unwrap();
        let back: Holder = deserialize(&registry, &bytes, None).unwrap();
        assert!(Ref::ptr_eq(&back.table["a"], &back.table["b"]));
        assert_eq!(back.table["a"].read().name, "shared");
    }

    #[test]
    fn in_place_accessor_and_inherited_properties() {
        let registry = ModelRegistry::new();
        let actor = Actor {
            base: Position { x: 1, y: 0 },
            position: Position { x: 0, y: 7 },
            label: "hero".into(),
        };
        let bytes = serialize(&registry, &actor, None).unwrap();
        assert_eq!(bytes, br#"[{"label":"HERO","position":{"y":7},"x":1}]"#);

        let back: Actor = deserialize(&registry, &bytes, None).unwrap();
        assert_eq!(back.base.x, 1);
        assert_eq!(back.position.y, 7);
        assert_eq!(back.label, "hero");
    }

    #[test]
    fn dependencies_and_cbor() {
        let registry = ModelRegistry::new();
        let holder = Holder {
            icon: AssetRef::new("icons/door.png", "Texture"),
            ..Holder::default()
        };

        let json = serialize(&registry, &holder, None).unwrap();
        let dependencies = read_dependencies(&json, Format::Json).unwrap();
        assert_eq!(dependencies.len(), 1);
        assert_eq!(dependencies[0].file, "icons/door.png");
        let back: Holder = deserialize(&registry, &json, None).unwrap();
        assert_eq!(back.icon, holder.icon);

        let cbor = Output::new(&registry, OutputConfig::default().with_format(Format::Cbor))
            .serialize(&holder, None)
            .unwrap();
        let back: Holder = Input::new(&registry, InputConfig::default().with_format(Format::Cbor))
            .deserialize(&cbor, None)
            .unwrap();
        assert_eq!(back.icon, holder.icon);
        assert_eq!(read_dependencies(&cbor, Format::Cbor).unwrap(), dependencies);
    }
}
