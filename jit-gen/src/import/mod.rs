//! Import of external classes from a static catalog.
//!
//! The catalog declares the shape of each class. A type list picks the classes to import and an
//! exclusion list drops individual methods. Every constructor and method surviving the exclusions
//! becomes a [`FunctionInfo`] the grammar may call.

pub mod catalog;
pub mod descriptor;

use crate::import::catalog::{ClassCatalog, ClassDescriptor};
use crate::import::descriptor::{
    parse_exclusions, parse_method_descriptor, parse_type_list, DescriptorTy, Exclusion,
};
use crate::symbol_table::symbol::{FunctionInfo, Symbol, SymbolFlags, VariableInfo};
use crate::ty::env::TypeEnvironment;
use crate::ty::{ClassFlags, Type, TypeId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Malformed type name on line {line_number}: {line:?}")]
    MalformedTypeLine { line_number: usize, line: String },
    #[error("Malformed method exclusion on line {line_number}: {line:?}")]
    MalformedExclusionLine { line_number: usize, line: String },
    #[error("Malformed method descriptor {0:?}")]
    MalformedSignature(String),
    #[error("Unable to resolve type {0}")]
    UnresolvedType(String),
    #[error("Unable to resolve method {owner}::{name}({args})")]
    UnresolvedMethod {
        owner: String,
        name: String,
        args: String,
    },
    #[error("Class hierarchy of {0} is cyclic")]
    CyclicHierarchy(String),
    #[error("Invalid external symbol selector {0:?}")]
    InvalidSelector(String),
    #[error("Unable to parse class catalog: {0}")]
    Catalog(String),
    #[error("Unable to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Which imported classes contribute symbols to generated code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExternalSymbolSelector {
    All,
    /// Fully qualified or simple class names.
    Only(Vec<String>),
}

impl ExternalSymbolSelector {
    pub fn selects(&self, class_name: &str) -> bool {
        match self {
            ExternalSymbolSelector::All => true,
            ExternalSymbolSelector::Only(names) => {
                let simple = class_name.rsplit('.').next().unwrap_or(class_name);
                names.iter().any(|name| name == class_name || name == simple)
            }
        }
    }
}

impl FromStr for ExternalSymbolSelector {
    type Err = ImportError;

    /// `all`, or a comma separated list of class names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim() == "all" {
            return Ok(ExternalSymbolSelector::All);
        }
        let names: Vec<String> = s
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();
        if names.is_empty() {
            return Err(ImportError::InvalidSelector(s.to_string()));
        }
        Ok(ExternalSymbolSelector::Only(names))
    }
}

/// Constructors and methods of the imported classes.
#[derive(Debug, Clone, Default)]
pub struct ExternalSymbols {
    functions: Vec<FunctionInfo>,
}

impl ExternalSymbols {
    pub fn functions(&self) -> &[FunctionInfo] {
        &self.functions
    }

    /// Symbols of the classes picked by `selector`.
    pub fn selected(&self, types: &TypeEnvironment, selector: &ExternalSymbolSelector) -> Vec<Symbol> {
        self.functions
            .iter()
            .filter(|function| selector.selects(&types.class(function.owner).name))
            .cloned()
            .map(Symbol::from)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

fn read_descriptor(path: &Path) -> Result<String, ImportError> {
    std::fs::read_to_string(path).map_err(|source| ImportError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Collects the type list and the exclusions before importing from a catalog.
#[derive(Debug, Clone)]
pub struct ImportBuilder {
    catalog: ClassCatalog,
    names: Vec<String>,
    exclusions: Vec<Exclusion>,
}

impl ImportBuilder {
    pub fn new(catalog: ClassCatalog) -> ImportBuilder {
        ImportBuilder {
            catalog,
            names: vec![],
            exclusions: vec![],
        }
    }

    /// Builder importing every class of the built-in catalog.
    pub fn builtin() -> Result<ImportBuilder, ImportError> {
        Ok(ImportBuilder::new(ClassCatalog::builtin()?).all_types())
    }

    pub fn all_types(mut self) -> ImportBuilder {
        self.names = self.catalog.names().map(str::to_string).collect();
        self
    }

    pub fn type_list(mut self, text: &str) -> Result<ImportBuilder, ImportError> {
        self.names.extend(parse_type_list(text)?);
        Ok(self)
    }

    pub fn exclusions(mut self, text: &str) -> Result<ImportBuilder, ImportError> {
        self.exclusions.extend(parse_exclusions(text)?);
        Ok(self)
    }

    /// Replaces the imported classes with the type list in `path`.
    pub fn type_list_file<P: AsRef<Path>>(mut self, path: P) -> Result<ImportBuilder, ImportError> {
        self.names.clear();
        self.type_list(&read_descriptor(path.as_ref())?)
    }

    pub fn exclusions_file<P: AsRef<Path>>(self, path: P) -> Result<ImportBuilder, ImportError> {
        self.exclusions(&read_descriptor(path.as_ref())?)
    }

    /// Registers the listed classes, their parents and every type their members mention.
    /// On error the environment is left as it was.
    pub fn import(&self, types: &mut TypeEnvironment) -> Result<ExternalSymbols, ImportError> {
        let mark = types.len();
        let res = self.import_into(types);
        if res.is_err() {
            types.truncate(mark);
        }
        res
    }

    fn import_into(&self, types: &mut TypeEnvironment) -> Result<ExternalSymbols, ImportError> {
        self.check_exclusions()?;
        let mut importer = Importer {
            catalog: &self.catalog,
            exclusions: &self.exclusions,
            types,
            resolved: BTreeMap::new(),
            in_progress: vec![],
            functions: vec![],
        };
        for name in &self.names {
            importer.resolve_class(name)?;
        }
        tracing::debug!(
            classes = importer.resolved.len(),
            functions = importer.functions.len(),
            "Imported external classes"
        );
        Ok(ExternalSymbols {
            functions: importer.functions,
        })
    }

    fn check_exclusions(&self) -> Result<(), ImportError> {
        for exclusion in &self.exclusions {
            let class = self
                .catalog
                .get(&exclusion.owner)
                .ok_or_else(|| ImportError::UnresolvedType(exclusion.owner.clone()))?;
            let found = class
                .methods
                .iter()
                .map(|method| (method.name.as_str(), method.signature.as_str()))
                .chain(
                    class
                        .constructors
                        .iter()
                        .map(|signature| ("<init>", signature.as_str())),
                )
                .any(|(name, signature)| exclusion.matches(&class.name, name, signature));
            if !found {
                return Err(ImportError::UnresolvedMethod {
                    owner: exclusion.owner.clone(),
                    name: exclusion.name.clone(),
                    args: exclusion.args.clone(),
                });
            }
        }
        Ok(())
    }
}

struct Importer<'a> {
    catalog: &'a ClassCatalog,
    exclusions: &'a [Exclusion],
    types: &'a mut TypeEnvironment,
    resolved: BTreeMap<String, TypeId>,
    in_progress: Vec<String>,
    functions: Vec<FunctionInfo>,
}

impl<'a> Importer<'a> {
    fn resolve_class(&mut self, name: &str) -> Result<TypeId, ImportError> {
        if let Some(id) = self.resolved.get(name) {
            return Ok(*id);
        }
        if self.in_progress.iter().any(|other| other == name) {
            return Err(ImportError::CyclicHierarchy(name.to_string()));
        }
        let catalog = self.catalog;
        let class = match catalog.get(name) {
            Some(class) => class,
            None => {
                return self
                    .types
                    .find_class(name)
                    .ok_or_else(|| ImportError::UnresolvedType(name.to_string()))
            }
        };
        self.in_progress.push(name.to_string());
        let mut parents = vec![];
        for parent in &class.parents {
            parents.push(self.resolve_class(parent)?);
        }
        self.in_progress.pop();
        let id = self.types.register(
            &class.name,
            &parents,
            ClassFlags {
                is_final: class.is_final,
                is_abstract: class.is_abstract,
                is_interface: class.is_interface,
            },
        );
        self.resolved.insert(name.to_string(), id);
        self.import_members(id, class)?;
        Ok(id)
    }

    fn import_members(&mut self, owner: TypeId, class: &ClassDescriptor) -> Result<(), ImportError> {
        let instantiable = !class.is_abstract && !class.is_interface;
        for signature in &class.constructors {
            if !instantiable || self.is_excluded(&class.name, "<init>", signature) {
                continue;
            }
            let (args, _) = parse_method_descriptor(signature)?;
            let flags = SymbolFlags {
                is_static: true,
                is_constructor: true,
                ..SymbolFlags::default()
            };
            let function = self.function("<init>", owner, &args, Type::Class(owner), flags)?;
            self.functions.push(function);
        }
        for method in &class.methods {
            if self.is_excluded(&class.name, &method.name, &method.signature) {
                tracing::trace!(class = %class.name, method = %method.name, "Excluded method");
                continue;
            }
            let (args, return_ty) = parse_method_descriptor(&method.signature)?;
            let return_ty = self.resolve_ty(&return_ty)?;
            let flags = SymbolFlags {
                is_static: method.is_static,
                is_abstract: class.is_interface,
                ..SymbolFlags::default()
            };
            let function = self.function(&method.name, owner, &args, return_ty, flags)?;
            self.functions.push(function);
        }
        Ok(())
    }

    fn function(
        &mut self,
        name: &str,
        owner: TypeId,
        args: &[DescriptorTy],
        return_ty: Type,
        flags: SymbolFlags,
    ) -> Result<FunctionInfo, ImportError> {
        let mut arg_infos = vec![];
        for (i, arg) in args.iter().enumerate() {
            arg_infos.push(VariableInfo {
                name: format!("arg_{}", i),
                owner,
                ty: self.resolve_ty(arg)?,
                flags: SymbolFlags::local(),
            });
        }
        Ok(FunctionInfo {
            name: name.to_string(),
            owner,
            return_ty,
            args: arg_infos,
            flags,
            complexity: 0,
        })
    }

    fn resolve_ty(&mut self, ty: &DescriptorTy) -> Result<Type, ImportError> {
        Ok(match ty {
            DescriptorTy::Void => Type::Void,
            DescriptorTy::Prim(prim) => Type::Prim(*prim),
            DescriptorTy::Class(name) => Type::Class(self.resolve_class(name)?),
            DescriptorTy::Array(elem, dims) => Type::array(self.resolve_ty(elem)?, *dims),
        })
    }

    fn is_excluded(&self, owner: &str, name: &str, signature: &str) -> bool {
        self.exclusions
            .iter()
            .any(|exclusion| exclusion.matches(owner, name, signature))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ty::PrimTy;

    const CATALOG: &str = r#"[
        (name: "java.lang.Object", constructors: ["()V"]),
        (name: "java.lang.String", is_final: true),
        (name: "demo.Shape", is_interface: true, methods: [(name: "area", signature: "()D")]),
        (
            name: "demo.Square",
            parents: ["demo.Shape"],
            constructors: ["()V", "(I)V"],
            methods: [
                (name: "area", signature: "()D"),
                (name: "grid", signature: "(I)[[I"),
                (name: "of", signature: "(Ldemo/Circle;)Ldemo/Square;", is_static: true),
            ],
        ),
        (name: "demo.Circle", is_final: true),
        (name: "demo.A", parents: ["demo.B"]),
        (name: "demo.B", parents: ["demo.A"]),
    ]"#;

    fn builder() -> ImportBuilder {
        ImportBuilder::new(ClassCatalog::from_ron(CATALOG).unwrap())
    }

    #[test]
    fn imports_listed_types_and_dependencies() {
        let mut types = TypeEnvironment::default();
        let symbols = builder()
            .type_list("demo.Square\n")
            .unwrap()
            .import(&mut types)
            .unwrap();
        let square = types.find_class("demo.Square").unwrap();
        let shape = types.find_class("demo.Shape").unwrap();
        assert!(types.find_class("demo.Circle").is_some());
        assert!(types.is_subclass(square, shape));
        assert!(types.class(shape).is_interface);

        let grid = symbols
            .functions()
            .iter()
            .find(|f| f.name == "grid")
            .unwrap();
        assert_eq!(grid.return_ty, Type::array(PrimTy::Int.into(), 2));
        let constructors = symbols
            .functions()
            .iter()
            .filter(|f| f.owner == square && f.flags.is_constructor)
            .count();
        assert_eq!(constructors, 2);
        // the interface method is abstract
        assert!(symbols
            .functions()
            .iter()
            .any(|f| f.owner == shape && f.flags.is_abstract));
    }

    #[test]
    fn exclusions_drop_methods() {
        let mut types = TypeEnvironment::default();
        let symbols = builder()
            .type_list("demo.Square")
            .unwrap()
            .exclusions("demo/Square::grid(I)\ndemo.Square::<init>(I)")
            .unwrap()
            .import(&mut types)
            .unwrap();
        assert!(!symbols.functions().iter().any(|f| f.name == "grid"));
        assert_eq!(
            symbols
                .functions()
                .iter()
                .filter(|f| f.flags.is_constructor)
                .count(),
            1
        );
    }

    #[test]
    fn unknown_exclusion_aborts() {
        let mut types = TypeEnvironment::default();
        let res = builder()
            .type_list("demo.Square")
            .unwrap()
            .exclusions("demo.Square::grid(J)")
            .unwrap()
            .import(&mut types);
        assert!(matches!(res, Err(ImportError::UnresolvedMethod { .. })));
    }

    #[test]
    fn unresolved_type_rolls_back() {
        let mut types = TypeEnvironment::default();
        let before = types.len();
        let res = builder()
            .type_list("demo.Square\ndemo.Missing")
            .unwrap()
            .import(&mut types);
        assert!(matches!(res, Err(ImportError::UnresolvedType(name)) if name == "demo.Missing"));
        assert_eq!(types.len(), before);
    }

    #[test]
    fn cyclic_hierarchy_aborts() {
        let mut types = TypeEnvironment::default();
        let res = builder().type_list("demo.A").unwrap().import(&mut types);
        assert!(matches!(res, Err(ImportError::CyclicHierarchy(_))));
    }

    #[test]
    fn builtin_import() {
        let mut types = TypeEnvironment::default();
        let symbols = ImportBuilder::builtin().unwrap().import(&mut types).unwrap();
        assert!(!symbols.is_empty());
        let math = ExternalSymbolSelector::Only(vec!["Math".to_string()]);
        let selected = symbols.selected(&types, &math);
        assert!(!selected.is_empty());
        assert!(selected
            .iter()
            .all(|s| types.class(s.owner()).name == "java.lang.Math"));
    }

    #[test]
    fn selector_parsing() {
        assert_eq!(
            "all".parse::<ExternalSymbolSelector>().unwrap(),
            ExternalSymbolSelector::All
        );
        let selector: ExternalSymbolSelector = "java.lang.Math, Integer".parse().unwrap();
        assert!(selector.selects("java.lang.Math"));
        assert!(selector.selects("java.lang.Integer"));
        assert!(!selector.selects("java.lang.Long"));
        assert!(" , ".parse::<ExternalSymbolSelector>().is_err());
    }
}
