use alloc::string::String;
use alloc::vec::Vec;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};

use super::{DEPENDENCIES_TAG, Format};
use crate::ModelError;

const DOCUMENT: &str = "<document>";

/// An external file a document refers to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dependency {
    pub file: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

/// A decoded document: the slot list and the dependency list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    slots: Vec<Json>,
    dependencies: Vec<Dependency>,
}

impl Document {
    #[inline]
    pub fn new(slots: Vec<Json>, dependencies: Vec<Dependency>) -> Self {
        Self {
            slots,
            dependencies,
        }
    }

    /// Slot 0 is the root.
    #[inline]
    pub fn slots(&self) -> &[Json] {
        &self.slots
    }

    #[inline]
    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    #[inline]
    pub fn into_parts(self) -> (Vec<Json>, Vec<Dependency>) {
        (self.slots, self.dependencies)
    }

    /// The document as one JSON array, with the dependency slot last.
    pub fn to_value(&self) -> Result<Json, ModelError> {
        let mut slots = self.slots.clone();
        if !self.dependencies.is_empty() {
            let mut record = Map::new();
            record.insert(
                DEPENDENCIES_TAG.into(),
                serde_json::to_value(&self.dependencies)?,
            );
            slots.push(Json::Object(record));
        }
        Ok(Json::Array(slots))
    }

    /// Splits a JSON array into slots and dependencies.
    pub fn from_value(json: Json) -> Result<Self, ModelError> {
        let Json::Array(mut slots) = json else {
            return Err(ModelError::malformed(DOCUMENT, "expected an array of slots"));
        };

        let mut dependencies = Vec::new();
        // The root slot is never a dependency slot.
        if slots.len() > 1 && slots.last().is_some_and(is_dependency_slot) {
            if let Some(Json::Object(mut record)) = slots.pop() {
                let list = record.remove(DEPENDENCIES_TAG).unwrap_or_default();
                dependencies = serde_json::from_value(list)?;
            }
        }

        if slots.is_empty() {
            return Err(ModelError::malformed(DOCUMENT, "no root slot"));
        }
        Ok(Self {
            slots,
            dependencies,
        })
    }

    pub fn encode(&self, format: Format) -> Result<Vec<u8>, ModelError> {
        let value = self.to_value()?;
        Ok(match format {
            Format::Json => serde_json::to_vec(&value)?,
            Format::PrettyJson => serde_json::to_vec_pretty(&value)?,
            Format::Cbor => serde_cbor::to_vec(&value)?,
        })
    }

    pub fn decode(bytes: &[u8], format: Format) -> Result<Self, ModelError> {
        let value: Json = match format {
            Format::Json | Format::PrettyJson => serde_json::from_slice(bytes)?,
            Format::Cbor => serde_cbor::from_slice(bytes)?,
        };
        Self::from_value(value)
    }
}

fn is_dependency_slot(json: &Json) -> bool {
    matches!(json, Json::Object(record) if record.len() == 1 && record.contains_key(DEPENDENCIES_TAG))
}

#[cfg(test)]
mod tests {
    use alloc::vec;
    use alloc::vec::Vec;

    use serde_json::json;

    use super::{Dependency, Document};
    use crate::ModelError;
    use crate::io::Format;

    fn texture() -> Dependency {
        Dependency {
            file: "a.png".into(),
            type_name: "Texture".into(),
        }
    }

    #[test]
    fn dependency_slot_is_last() {
        let document = Document::new(vec![json!({"x": 1})], vec![texture()]);
        assert_eq!(
            document.to_value().unwrap(),
            json!([{"x": 1}, {"$dependencies": [{"file": "a.png", "type": "Texture"}]}])
        );

        let back = Document::from_value(document.to_value().unwrap()).unwrap();
        assert_eq!(back, document);
    }

    #[test]
    fn root_is_never_dependencies() {
        let document = Document::from_value(json!([{"$dependencies": []}])).unwrap();
        assert_eq!(document.slots().len(), 1);
        assert!(document.dependencies().is_empty());
    }

    #[test]
    fn cbor_and_pretty() {
        let document = Document::new(vec![json!({"name": "n", "ids": [1, 2]}), json!([3])], Vec::new());
        for format in [Format::Json, Format::PrettyJson, Format::Cbor] {
            let bytes = document.encode(format).unwrap();
            assert_eq!(Document::decode(&bytes, format).unwrap(), document);
        }
        let pretty = document.encode(Format::PrettyJson).unwrap();
        assert!(pretty.contains(&b'\n'));
    }

    #[test]
    fn malformed_documents() {
        assert!(matches!(
            Document::from_value(json!({"x": 1})),
            Err(ModelError::Malformed { .. })
        ));
        assert!(matches!(
            Document::from_value(json!([])),
            Err(ModelError::Malformed { .. })
        ));
        assert!(matches!(
            Document::decode(b"[1,", Format::Json),
            Err(ModelError::Json(_))
        ));
    }
}
