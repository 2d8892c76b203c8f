use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use std::time::SystemTime;

use toml_edit::{Document, Item, Table};

/// The caller's `Cargo.toml`, used to find how generated code must name a
/// workspace crate.
///
/// Derived code lives in the user's crate, which may depend on `vc_model`
/// directly or only through the `vc_graph` umbrella crate.
///
/// # Example
///
/// ```rust
/// # use vc_macro_utils::Manifest;
/// let path: syn::Path = Manifest::shared(|m| m.crate_path("vc_model"));
/// ```
///
/// # Resolution rules
///
/// 1. A crate listed in `dependencies` is `::name`.
/// 2. A `vc_` crate reached through a `vc_graph` dependency is
///    `::vc_graph::short_name`, e.g. `vc_model` -> `::vc_graph::model`.
/// 3. The same two rules in `dev-dependencies`.
/// 4. Otherwise `::name`.
///
/// A crate naming itself in doctests relies on `extern crate self as name;`
/// in its root.
#[derive(Debug)]
pub struct Manifest {
    document: Document<Box<str>>,
    modified: SystemTime,
}

const UMBRELLA: &str = "vc_graph";
const PREFIX: &str = "vc_";

impl Manifest {
    fn path() -> PathBuf {
        let dir = env::var_os("CARGO_MANIFEST_DIR").expect("cargo sets CARGO_MANIFEST_DIR");
        let path = PathBuf::from(dir).join("Cargo.toml");
        assert!(path.exists(), "no Cargo.toml at {}", path.display());
        path
    }

    fn modified(path: &Path) -> SystemTime {
        std::fs::metadata(path)
            .and_then(|metadata| metadata.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH)
    }

    fn load(path: &Path, modified: SystemTime) -> Self {
        let text = std::fs::read_to_string(path)
            .unwrap_or_else(|err| panic!("cannot read {}: {err}", path.display()));
        let document = Document::parse(text.into_boxed_str())
            .unwrap_or_else(|err| panic!("cannot parse {}: {err}", path.display()));
        Self { document, modified }
    }

    fn path_of(segments: &[&str]) -> syn::Path {
        syn::parse_str(&format!("::{}", segments.join("::")))
            .unwrap_or_else(|err| panic!("invalid crate path {segments:?}: {err}"))
    }

    fn lookup(table: &Table, name: &str) -> Option<syn::Path> {
        if table.contains_key(name) {
            return Some(Self::path_of(&[name]));
        }
        let short = name.strip_prefix(PREFIX)?;
        table
            .contains_key(UMBRELLA)
            .then(|| Self::path_of(&[UMBRELLA, short]))
    }

    /// The path of crate `name` as seen from the caller.
    pub fn crate_path(&self, name: &str) -> syn::Path {
        ["dependencies", "dev-dependencies"]
            .into_iter()
            .filter_map(|key| match self.document.get(key) {
                Some(Item::Table(table)) => Self::lookup(table, name),
                _ => None,
            })
            .next()
            .unwrap_or_else(|| Self::path_of(&[name]))
    }

    /// Runs `f` with the caller's manifest.
    ///
    /// Manifests are cached per path and reloaded when the file changes.
    pub fn shared<R>(f: impl FnOnce(&Self) -> R) -> R {
        static CACHE: RwLock<BTreeMap<PathBuf, Manifest>> = RwLock::new(BTreeMap::new());

        let path = Self::path();
        let modified = Self::modified(&path);

        {
            let cache = CACHE.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(manifest) = cache.get(&path)
                && manifest.modified == modified
            {
                return f(manifest);
            }
        }

        let manifest = Self::load(&path, modified);
        let result = f(&manifest);
        CACHE
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path, manifest);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::Manifest;

    fn manifest(text: &str) -> Manifest {
        Manifest {
            document: toml_edit::Document::parse(Box::from(text)).unwrap(),
            modified: std::time::SystemTime::UNIX_EPOCH,
        }
    }

    fn path(manifest: &Manifest, name: &str) -> String {
        let path = manifest.crate_path(name);
        let segments: Vec<String> = path.segments.iter().map(|s| s.ident.to_string()).collect();
        segments.join("::")
    }

    #[test]
    fn direct_dependency() {
        let m = manifest("[dependencies]\nvc_model = \"0.0.1\"\n");
        assert_eq!(path(&m, "vc_model"), "vc_model");
    }

    #[test]
    fn through_umbrella() {
        let m = manifest("[dependencies]\nvc_graph = \"0.0.1\"\n");
        assert_eq!(path(&m, "vc_model"), "vc_graph::model");

        let m = manifest("[dev-dependencies]\nvc_graph = \"0.0.1\"\n");
        assert_eq!(path(&m, "vc_model"), "vc_graph::model");
    }

    #[test]
    fn fallback() {
        let m = manifest("[package]\nname = \"demo\"\n");
        assert_eq!(path(&m, "vc_model"), "vc_model");
        assert_eq!(path(&m, "serde"), "serde");
    }
}
