use alloc::borrow::Cow;
use alloc::string::String;
use core::time::Duration;
use std::path::PathBuf;
use std::time::SystemTime;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::model::{LeafModel, LeafValue, ModelKind};
use crate::{Model, ModelError, ModelRegistry, Modeled};

crate::impl_leaf!(
    bool => "bool",
    char => "char",
    i8 => "i8",
    i16 => "i16",
    i32 => "i32",
    i64 => "i64",
    isize => "isize",
    u8 => "u8",
    u16 => "u16",
    u32 => "u32",
    u64 => "u64",
    usize => "usize",
    f32 => "f32",
    f64 => "f64",
    String => "String",
    PathBuf => "PathBuf",
    Duration => "Duration",
    Uuid => "Uuid",
    DateTime<Utc> => "DateTime<Utc>",
    NaiveDate => "NaiveDate",
);

impl LeafValue for SystemTime {}

impl Modeled for SystemTime {
    fn type_name() -> Cow<'static, str> {
        Cow::Borrowed("SystemTime")
    }

    fn build_model(_: &ModelRegistry) -> Result<Model, ModelError> {
        Ok(Model::new::<Self>(
            ModelKind::Leaf(LeafModel::new::<Self>()),
            Some(|_| Ok(SystemTime::UNIX_EPOCH)),
        ))
    }
}

crate::auto_register!(
    bool, char, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64, String, PathBuf,
    Duration, SystemTime, Uuid, DateTime<Utc>, NaiveDate,
);

#[cfg(test)]
mod tests {
    use core::time::Duration;

    use chrono::NaiveDate;
    use serde_json::json;
    use uuid::Uuid;

    use crate::{ModelKind, ModelRegistry};

    fn encode<T: crate::Modeled>(registry: &ModelRegistry, value: &T) -> serde_json::Value {
        let model = registry.get::<T>().unwrap();
        let ModelKind::Leaf(leaf) = model.kind() else {
            panic!("`{}` is not a leaf", model.name());
        };
        leaf.encode(value).unwrap()
    }

    #[test]
    fn leaf_literals() {
        let registry = ModelRegistry::new();
        assert_eq!(encode(&registry, &true), json!(true));
        assert_eq!(encode(&registry, &'x'), json!("x"));
        assert_eq!(encode(&registry, &-3_i16), json!(-3));
        assert_eq!(
            encode(&registry, &Duration::from_millis(1500)),
            json!({"secs": 1, "nanos": 500_000_000})
        );
        assert_eq!(
            encode(&registry, &Uuid::nil()),
            json!("00000000-0000-0000-0000-000000000000")
        );
        assert_eq!(
            encode(&registry, &NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()),
            json!("2024-02-29")
        );
    }

    #[test]
    fn names_are_short() {
        let registry = ModelRegistry::new();
        assert_eq!(registry.get::<u64>().unwrap().name(), "u64");
        assert_eq!(registry.get::<std::path::PathBuf>().unwrap().name(), "PathBuf");
        assert!(registry.get::<std::time::SystemTime>().unwrap().is_leaf());
    }

    #[cfg(feature = "auto_register")]
    #[test]
    fn primitives_auto_register() {
        let registry = ModelRegistry::new();
        assert!(registry.auto_register());
        assert!(registry.contains::<Uuid>());
        assert!(registry.get_by_name("NaiveDate").is_ok());
    }
}
