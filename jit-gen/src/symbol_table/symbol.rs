use crate::ty::{Type, TypeId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AccessLevel {
    Public,
    Protected,
    Package,
    Private,
}

impl AccessLevel {
    pub fn modifier(&self) -> &'static str {
        match self {
            AccessLevel::Public => "public ",
            AccessLevel::Protected => "protected ",
            AccessLevel::Package => "",
            AccessLevel::Private => "private ",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolFlags {
    pub access: AccessLevel,
    pub is_static: bool,
    pub is_final: bool,
    pub is_local: bool,
    pub is_initialized: bool,
    pub is_abstract: bool,
    pub is_constructor: bool,
}

impl Default for SymbolFlags {
    fn default() -> Self {
        SymbolFlags {
            access: AccessLevel::Public,
            is_static: false,
            is_final: false,
            is_local: false,
            is_initialized: true,
            is_abstract: false,
            is_constructor: false,
        }
    }
}

impl SymbolFlags {
    pub fn local() -> SymbolFlags {
        SymbolFlags {
            access: AccessLevel::Package,
            is_local: true,
            ..SymbolFlags::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableInfo {
    pub name: String,
    pub owner: TypeId,
    pub ty: Type,
    pub flags: SymbolFlags,
}

impl VariableInfo {
    pub fn is_assignable(&self) -> bool {
        !self.flags.is_final
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionInfo {
    pub name: String,
    pub owner: TypeId,
    pub return_ty: Type,
    pub args: Vec<VariableInfo>,
    pub flags: SymbolFlags,
    /// Cost of executing the function body once.
    pub complexity: usize,
}

impl FunctionInfo {
    pub fn arg_types(&self) -> Vec<Type> {
        self.args.iter().map(|arg| arg.ty.clone()).collect()
    }

    /// Same name and argument types, as required for overriding.
    pub fn has_same_signature(&self, other: &FunctionInfo) -> bool {
        self.name == other.name && self.arg_types() == other.arg_types()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Symbol {
    Variable(VariableInfo),
    Function(FunctionInfo),
}

impl Symbol {
    /// Key of the symbol inside a scope frame. Functions are keyed by their return type.
    pub fn ty(&self) -> &Type {
        match self {
            Symbol::Variable(variable) => &variable.ty,
            Symbol::Function(function) => &function.return_ty,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Symbol::Variable(variable) => &variable.name,
            Symbol::Function(function) => &function.name,
        }
    }

    pub fn owner(&self) -> TypeId {
        match self {
            Symbol::Variable(variable) => variable.owner,
            Symbol::Function(function) => function.owner,
        }
    }

    pub fn flags(&self) -> &SymbolFlags {
        match self {
            Symbol::Variable(variable) => &variable.flags,
            Symbol::Function(function) => &function.flags,
        }
    }

    pub fn as_variable(&self) -> Option<&VariableInfo> {
        match self {
            Symbol::Variable(variable) => Some(variable),
            Symbol::Function(_) => None,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionInfo> {
        match self {
            Symbol::Function(function) => Some(function),
            Symbol::Variable(_) => None,
        }
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, Symbol::Variable(_))
    }

    pub fn is_function(&self) -> bool {
        matches!(self, Symbol::Function(_))
    }
}

impl From<VariableInfo> for Symbol {
    fn from(variable: VariableInfo) -> Symbol {
        Symbol::Variable(variable)
    }
}

impl From<FunctionInfo> for Symbol {
    fn from(function: FunctionInfo) -> Symbol {
        Symbol::Function(function)
    }
}
