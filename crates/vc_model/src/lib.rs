#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

// -----------------------------------------------------------------------------
// Extern Self

// Generated code names `vc_model`, which must also resolve inside this crate.
extern crate self as vc_model;

extern crate alloc;

// -----------------------------------------------------------------------------
// Modules

mod asset;
mod builder;
mod compare;
mod copy;
mod error;
mod handle;
mod impls;
mod registry;

pub mod io;
pub mod model;
pub mod property;
pub mod utils;

// -----------------------------------------------------------------------------
// Top-Level exports

pub mod __macro_exports;

pub use asset::AssetRef;
pub use builder::ModelBuilder;
pub use compare::deep_equal;
pub use copy::{CopyContext, copy, copy_properties};
pub use error::ModelError;
pub use handle::{ObjectGuard, ObjectGuardMut, ObjectRef, Ref};
pub use io::{Format, InputConfig, OutputConfig, deserialize, serialize};
pub use model::{BoxedValue, DefaultFn, Model, ModelKind, ModelSource, Modeled, default_of};
pub use property::Property;
pub use registry::{AutoRegistration, ModelFactory, ModelRegistry};
pub use vc_model_derive as derive;

#[cfg(test)]
mod tests {
    use alloc::string::String;
    use alloc::vec;
    use alloc::vec::Vec;

    use serde::{Deserialize, Serialize};

    use crate::derive::Model;
    use crate::{ModelError, ModelRegistry, Ref, deserialize, serialize};

    #[derive(Model, Default)]
    #[model(name = "test::Base")]
    struct Base {
        id: u32,
    }

    #[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize, Model)]
    #[model(name = "test::Mode")]
    enum Mode {
        #[default]
        Idle,
        Busy,
    }

    #[derive(Model, Default)]
    #[model(name = "test::Point")]
    struct Point(i32, i32);

    #[derive(Model, Default)]
    #[model(name = "test::Machine", auto_register)]
    struct Machine {
        #[model(extends)]
        base: Base,
        #[model(rename = "title", required)]
        name: String,
        mode: Mode,
        #[model(in_place)]
        origin: Point,
        #[model(min = 0, max = 10, group = "tuning")]
        level: u8,
        #[model(getter = Machine::label, setter = Machine::set_label)]
        label: String,
        #[model(shared, copyable = false)]
        owner: Option<Ref<String>>,
        #[model(skip)]
        cache: Vec<u8>,
    }

    impl Machine {
        fn label(&self) -> String {
            self.label.trim().into()
        }

        fn set_label(&mut self, label: String) {
            self.label = label;
        }
    }

    #[test]
    fn derived_models() {
        let registry = ModelRegistry::new();
        let model = registry.get::<Machine>().unwrap();
        assert_eq!(model.name(), "test::Machine");

        let names: Vec<&str> = model.properties().iter().map(|p| p.name()).collect();
        assert_eq!(
            names,
            ["id", "title", "mode", "origin", "level", "label", "owner"]
        );

        let level = model.property("level").unwrap();
        assert_eq!(level.range().map(|r| (r.min, r.max)), Some((0.0, 10.0)));
        assert_eq!(level.group(), Some("tuning"));
        assert!(model.property("title").unwrap().is_required());
        assert!(model.property("origin").unwrap().is_in_place());
        let owner = model.property("owner").unwrap();
        assert!(owner.is_shared() && !owner.is_copyable() && owner.is_nullable());

        let mode = registry.get::<Mode>().unwrap();
        assert!(mode.is_leaf());
        assert_eq!(mode.name(), "test::Mode");

        let point = registry.get::<Point>().unwrap();
        let names: Vec<&str> = point.properties().iter().map(|p| p.name()).collect();
        assert_eq!(names, ["0", "1"]);
    }

    #[test]
    fn derived_round_trip() {
        let registry = ModelRegistry::new();
        let machine = Machine {
            base: Base { id: 7 },
            name: "m1".into(),
            mode: Mode::Busy,
            origin: Point(1, 2),
            level: 3,
            label: " x ".into(),
            owner: None,
            cache: vec![1],
        };

        let bytes = serialize(&registry, &machine, None).unwrap();
        assert_eq!(
            bytes,
            br#"[{"id":7,"label":"x","level":3,"mode":"Busy","origin":{"0":1,"1":2},"title":"m1"}]"#
        );

        let back: Machine = deserialize(&registry, &bytes, None).unwrap();
        assert_eq!(back.base.id, 7);
        assert_eq!(back.name, "m1");
        assert_eq!(back.mode, Mode::Busy);
        assert_eq!((back.origin.0, back.origin.1), (1, 2));
        assert_eq!(back.level, 3);
        assert_eq!(back.label, "x");
        assert!(back.cache.is_empty());

        let err = deserialize::<Machine>(&registry, br#"[{"title":"m","level":11}]"#, None)
            .err()
            .unwrap();
        assert!(matches!(err, ModelError::OutOfRange { ref property, .. } if property == "level"));
    }

    #[cfg(feature = "auto_register")]
    #[test]
    fn derived_auto_register() {
        let registry = ModelRegistry::new();
        assert!(registry.auto_register());
        assert_eq!(
            registry.get_by_name("test::Machine").unwrap().name(),
            "test::Machine"
        );
    }
}
