use alloc::borrow::Cow;
use alloc::string::String;

use serde::{Deserialize, Serialize};

use crate::io::Dependency;
use crate::model::LeafValue;
use crate::{Model, ModelError, ModelRegistry, Modeled};

/// A reference to an external file, such as a texture or a sound.
///
/// Written inline as `{"file": ..., "type": ...}`. Every asset reference in
/// a serialized graph is also listed in the document's dependency slot, so
/// a loader can fetch the files before materializing the graph.
///
/// # Examples
///
/// ```
/// use vc_model::AssetRef;
///
/// let texture = AssetRef::new("textures/door.png", "Texture");
/// assert_eq!(texture.file, "textures/door.png");
/// assert!(!texture.is_empty());
/// assert!(AssetRef::default().is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetRef {
    pub file: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl AssetRef {
    #[inline]
    pub fn new(file: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            kind: kind.into(),
        }
    }

    /// Whether this points at nothing.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.file.is_empty()
    }
}

impl LeafValue for AssetRef {
    fn dependency(&self) -> Option<Dependency> {
        if self.is_empty() {
            return None;
        }
        Some(Dependency {
            file: self.file.clone(),
            type_name: self.kind.clone(),
        })
    }
}

impl Modeled for AssetRef {
    fn type_name() -> Cow<'static, str> {
        Cow::Borrowed("AssetRef")
    }

    fn build_model(_: &ModelRegistry) -> Result<Model, ModelError> {
        Ok(Model::leaf::<Self>())
    }
}

#[cfg(test)]
mod tests {
    use super::AssetRef;
    use crate::model::LeafValue;

    #[test]
    fn dependency_of_asset() {
        let asset = AssetRef::new("sounds/bell.ogg", "Sound");
        let dependency = asset.dependency().unwrap();
        assert_eq!(dependency.file, "sounds/bell.ogg");
        assert_eq!(dependency.type_name, "Sound");
        assert!(AssetRef::default().dependency().is_none());
    }

    #[test]
    fn wire_shape() {
        let asset = AssetRef::new("a.png", "Texture");
        assert_eq!(
            serde_json::to_value(&asset).unwrap(),
            serde_json::json!({"file": "a.png", "type": "Texture"})
        );
    }
}
