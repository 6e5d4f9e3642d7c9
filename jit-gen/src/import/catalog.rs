use crate::import::ImportError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

const BUILTIN_CATALOG: &str = include_str!("builtin.ron");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDescriptor {
    pub name: String,
    /// JVM method descriptor, e.g. `(IJ)Ljava/lang/String;`.
    pub signature: String,
    #[serde(default)]
    pub is_static: bool,
}

/// Statically declared shape of an importable class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDescriptor {
    /// Fully qualified, dotted name.
    pub name: String,
    #[serde(default)]
    pub parents: Vec<String>,
    #[serde(default)]
    pub is_final: bool,
    #[serde(default)]
    pub is_abstract: bool,
    #[serde(default)]
    pub is_interface: bool,
    /// Constructor descriptors, all returning `V`.
    #[serde(default)]
    pub constructors: Vec<String>,
    #[serde(default)]
    pub methods: Vec<MethodDescriptor>,
}

/// Class descriptors by name.
#[derive(Debug, Clone, Default)]
pub struct ClassCatalog {
    classes: BTreeMap<String, ClassDescriptor>,
}

impl ClassCatalog {
    /// Deterministic members of the core `java.lang` classes.
    pub fn builtin() -> Result<ClassCatalog, ImportError> {
        ClassCatalog::from_ron(BUILTIN_CATALOG)
    }

    pub fn from_ron(text: &str) -> Result<ClassCatalog, ImportError> {
        let classes: Vec<ClassDescriptor> =
            ron::from_str(text).map_err(|err| ImportError::Catalog(err.to_string()))?;
        let mut catalog = ClassCatalog::default();
        for class in classes {
            catalog.insert(class);
        }
        Ok(catalog)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<ClassCatalog, ImportError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ImportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        ClassCatalog::from_ron(&text)
    }

    /// Adds or replaces a descriptor.
    pub fn insert(&mut self, class: ClassDescriptor) {
        self.classes.insert(class.name.clone(), class);
    }

    pub fn extend(&mut self, other: ClassCatalog) {
        self.classes.extend(other.classes);
    }

    pub fn get(&self, name: &str) -> Option<&ClassDescriptor> {
        self.classes.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::descriptor::parse_method_descriptor;

    #[test]
    fn builtin_catalog_parses() {
        let catalog = ClassCatalog::builtin().unwrap();
        assert!(catalog.get("java.lang.Object").is_some());
        assert!(catalog.get("java.lang.Math").unwrap().is_final);
        for name in catalog.names() {
            let class = catalog.get(name).unwrap();
            for method in &class.methods {
                assert!(
                    parse_method_descriptor(&method.signature).is_ok(),
                    "{}::{}{}",
                    name,
                    method.name,
                    method.signature
                );
            }
        }
    }

    #[test]
    fn defaults_are_optional() {
        let catalog = ClassCatalog::from_ron(r#"[(name: "a.B")]"#).unwrap();
        let class = catalog.get("a.B").unwrap();
        assert!(class.parents.is_empty());
        assert!(!class.is_interface);
        assert!(class.methods.is_empty());
    }

    #[test]
    fn malformed_catalog_is_an_error() {
        assert!(matches!(
            ClassCatalog::from_ron("[(nom: 1)]"),
            Err(ImportError::Catalog(_))
        ));
    }
}
