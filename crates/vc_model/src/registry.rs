use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::any::TypeId;
use core::fmt;

use parking_lot::RwLock;

use crate::model::downcast_box;
use crate::utils::{HashMap, HashSet, TypeIdMap};
use crate::{Model, ModelError, ModelSource, Modeled};

/// Builds a model, replacing [`Modeled::build_model`] for one type.
pub type ModelFactory = fn(&ModelRegistry) -> Result<Model, ModelError>;

#[derive(Default)]
struct Tables {
    models: TypeIdMap<Arc<Model>>,
    names: HashMap<String, TypeId>,
    ambiguous: HashSet<String>,
    factories: TypeIdMap<ModelFactory>,
}

impl Tables {
    // The type must not be indexed yet.
    fn index_name(&mut self, model: &Model) {
        let name = model.name();
        if self.ambiguous.contains(name) {
            return;
        }
        match self.names.get(name) {
            Some(&type_id) if type_id != model.type_id() => {
                log::warn!("type name `{name}` is declared by several types and cannot be resolved");
                self.names.remove(name);
                self.ambiguous.insert(name.to_string());
            }
            Some(_) => {}
            None => {
                self.names.insert(name.to_string(), model.type_id());
            }
        }
    }
}

// -----------------------------------------------------------------------------
// ModelRegistry

/// The cache of every model built so far.
///
/// Models are created on first use and never change afterwards; every
/// lookup of a type returns the same `Arc`. The registry is `Send + Sync`
/// and is usually shared through an `Arc` by every session of a program.
///
/// Type names are indexed as models are built. A reader can only resolve a
/// `$type` tag for a type that was reached or [`register`]ed before, so
/// polymorphic subtypes should be registered up front (or collected with
/// [`auto_register`]).
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use vc_model::ModelRegistry;
///
/// let registry = ModelRegistry::new();
/// let a = registry.get::<Vec<String>>().unwrap();
/// let b = registry.get::<Vec<String>>().unwrap();
/// assert!(Arc::ptr_eq(&a, &b));
///
/// let by_name = registry.get_by_name("Vec<String>").unwrap();
/// assert!(Arc::ptr_eq(&a, &by_name));
/// assert!(registry.get_by_name("Vec<Unknown>").is_err());
/// ```
///
/// [`register`]: ModelRegistry::register
/// [`auto_register`]: ModelRegistry::auto_register
pub struct ModelRegistry {
    inner: RwLock<Tables>,
}

impl Default for ModelRegistry {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl ModelRegistry {
    /// Creates an empty registry.
    #[inline]
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Tables::default()),
        }
    }

    /// The model of `T`, built on first use.
    #[inline]
    pub fn get<T: Modeled>(&self) -> Result<Arc<Model>, ModelError> {
        self.resolve(ModelSource::of::<T>())
    }

    /// The model a [`ModelSource`] points at, built on first use.
    pub fn resolve(&self, source: ModelSource) -> Result<Arc<Model>, ModelError> {
        let type_id = source.type_id();
        let factory = {
            let tables = self.inner.read();
            if let Some(model) = tables.models.get(&type_id) {
                return Ok(Arc::clone(model));
            }
            tables.factories.get(&type_id).copied()
        };

        // Built without holding the lock: building a model may look up
        // other models.
        let model = match factory {
            Some(factory) => factory(self)?,
            None => source.build(self)?,
        };
        if model.type_id() != type_id {
            return Err(ModelError::mismatch(source.type_name(), model.name()));
        }

        let mut tables = self.inner.write();
        if let Some(existing) = tables.models.get(&type_id) {
            log::debug!("model `{}` was built concurrently; keeping the first", model.name());
            return Ok(Arc::clone(existing));
        }
        tables.index_name(&model);
        let model = Arc::new(model);
        tables
            .models
            .get_or_insert(type_id, || Arc::clone(&model));
        log::debug!("registered model `{}`", model.name());
        Ok(model)
    }

    /// The model of an already registered type.
    pub fn get_by_id(&self, type_id: TypeId) -> Result<Arc<Model>, ModelError> {
        self.inner
            .read()
            .models
            .get(&type_id)
            .cloned()
            .ok_or_else(|| ModelError::type_resolution(alloc::format!("{type_id:?}")))
    }

    /// The model registered under a declared type name.
    ///
    /// Fails for unknown names and for names declared by more than one type.
    pub fn get_by_name(&self, name: &str) -> Result<Arc<Model>, ModelError> {
        let tables = self.inner.read();
        tables
            .names
            .get(name)
            .and_then(|type_id| tables.models.get(type_id))
            .cloned()
            .ok_or_else(|| ModelError::type_resolution(name))
    }

    /// Whether `name` is declared by more than one registered type.
    pub fn is_ambiguous(&self, name: &str) -> bool {
        self.inner.read().ambiguous.contains(name)
    }

    /// Makes sure the model of `T` exists and its name can be resolved.
    #[inline]
    pub fn register<T: Modeled>(&self) -> Result<Arc<Model>, ModelError> {
        self.get::<T>()
    }

    /// Registers `factory` as the way to build `T`'s model.
    ///
    /// An existing model of `T` is replaced; sessions that already hold the
    /// old `Arc` keep using it.
    pub fn register_with<T: Modeled>(&self, factory: ModelFactory) -> Result<Arc<Model>, ModelError> {
        let type_id = TypeId::of::<T>();
        let model = factory(self)?;
        if model.type_id() != type_id {
            return Err(ModelError::mismatch(T::type_name(), model.name()));
        }

        let model = Arc::new(model);
        let mut tables = self.inner.write();
        tables.factories.insert(type_id, factory);
        if !tables.models.contains(&type_id) {
            tables.index_name(&model);
        }
        tables.models.insert(type_id, Arc::clone(&model));
        log::debug!("registered model `{}` from a factory", model.name());
        Ok(model)
    }

    /// A fresh default instance of `T`, as the reader would allocate it.
    pub fn new_default<T: Modeled>(&self) -> Result<T, ModelError> {
        let value = self.get::<T>()?.new_default(self)?;
        downcast_box::<T>(value)
    }

    #[inline]
    pub fn contains<T: Modeled>(&self) -> bool {
        self.inner.read().models.contains(&TypeId::of::<T>())
    }

    /// Number of models built so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.read().models.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.read().models.is_empty()
    }

    /// Resolvable type names, sorted.
    pub fn type_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.read().names.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Registers every type submitted with [`auto_register!`](crate::auto_register)
    /// or `#[model(auto_register)]`.
    ///
    /// Returns `false` when the `auto_register` feature is disabled, in
    /// which case nothing is registered. Types whose model fails to build
    /// are skipped with a warning.
    pub fn auto_register(&self) -> bool {
        #[cfg(feature = "auto_register")]
        {
            let mut count = 0_usize;
            for registration in inventory::iter::<AutoRegistration> {
                (registration.0)(self);
                count += 1;
            }
            log::debug!("auto-registered {count} types");
            true
        }
        #[cfg(not(feature = "auto_register"))]
        {
            false
        }
    }
}

impl fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tables = self.inner.read();
        f.debug_struct("ModelRegistry")
            .field("models", &tables.models.len())
            .field("ambiguous", &tables.ambiguous)
            .finish()
    }
}

// -----------------------------------------------------------------------------
// Auto registration

/// One type collected for [`ModelRegistry::auto_register`].
pub struct AutoRegistration(pub fn(&ModelRegistry));

impl AutoRegistration {
    #[inline]
    pub const fn new(register: fn(&ModelRegistry)) -> Self {
        Self(register)
    }
}

#[cfg(feature = "auto_register")]
inventory::collect!(AutoRegistration);

/// Registers `T`, logging instead of failing.
pub fn register_type<T: Modeled>(registry: &ModelRegistry) {
    if let Err(err) = registry.register::<T>() {
        log::warn!("cannot auto-register `{}`: {err}", T::type_name());
    }
}

/// Submits types for [`ModelRegistry::auto_register`].
///
/// Expands to nothing when the `auto_register` feature is disabled.
///
/// ```
/// use vc_model::{auto_register, derive::Model};
///
/// #[derive(Model, Default)]
/// struct Door {
///     open: bool,
/// }
///
/// auto_register!(Door);
/// ```
#[cfg(feature = "auto_register")]
#[macro_export]
macro_rules! auto_register {
    ($($ty:ty),+ $(,)?) => {
        $(
            $crate::__macro_exports::inventory::submit! {
                $crate::__macro_exports::AutoRegistration::new(
                    $crate::__macro_exports::register_type::<$ty>
                )
            }
        )+
    };
}

/// Submits types for [`ModelRegistry::auto_register`].
///
/// Expands to nothing when the `auto_register` feature is disabled.
#[cfg(not(feature = "auto_register"))]
#[macro_export]
macro_rules! auto_register {
    ($($ty:ty),+ $(,)?) => {};
}
