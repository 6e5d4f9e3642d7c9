//! Types of the generated programs.

pub mod env;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PrimTy {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
}

impl PrimTy {
    pub fn all() -> [PrimTy; 8] {
        [
            PrimTy::Boolean,
            PrimTy::Byte,
            PrimTy::Char,
            PrimTy::Short,
            PrimTy::Int,
            PrimTy::Long,
            PrimTy::Float,
            PrimTy::Double,
        ]
    }

    /// Position in the widening order `byte < short < int < long < float < double`.
    /// Boolean and char take no part in implicit widening.
    fn rank(&self) -> Option<u8> {
        match self {
            PrimTy::Boolean | PrimTy::Char => None,
            PrimTy::Byte => Some(0),
            PrimTy::Short => Some(1),
            PrimTy::Int => Some(2),
            PrimTy::Long => Some(3),
            PrimTy::Float => Some(4),
            PrimTy::Double => Some(5),
        }
    }

    /// Whether a value of this type implicitly widens to `target`.
    pub fn widens_to(&self, target: &PrimTy) -> bool {
        match (self.rank(), target.rank()) {
            (Some(from), Some(to)) => from < to,
            _ => false,
        }
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(self, PrimTy::Boolean)
    }

    pub fn is_integral(&self) -> bool {
        matches!(
            self,
            PrimTy::Byte | PrimTy::Char | PrimTy::Short | PrimTy::Int | PrimTy::Long
        )
    }

    pub fn is_floating(&self) -> bool {
        matches!(self, PrimTy::Float | PrimTy::Double)
    }

    /// Types produced by binary arithmetic after numeric promotion.
    pub fn is_arithmetic_result(&self) -> bool {
        matches!(
            self,
            PrimTy::Int | PrimTy::Long | PrimTy::Float | PrimTy::Double
        )
    }

    pub fn descriptor(&self) -> char {
        match self {
            PrimTy::Boolean => 'Z',
            PrimTy::Byte => 'B',
            PrimTy::Char => 'C',
            PrimTy::Short => 'S',
            PrimTy::Int => 'I',
            PrimTy::Long => 'J',
            PrimTy::Float => 'F',
            PrimTy::Double => 'D',
        }
    }

    pub fn from_descriptor(code: char) -> Option<PrimTy> {
        Some(match code {
            'Z' => PrimTy::Boolean,
            'B' => PrimTy::Byte,
            'C' => PrimTy::Char,
            'S' => PrimTy::Short,
            'I' => PrimTy::Int,
            'J' => PrimTy::Long,
            'F' => PrimTy::Float,
            'D' => PrimTy::Double,
            _ => return None,
        })
    }
}

impl Display for PrimTy {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            PrimTy::Boolean => "boolean",
            PrimTy::Byte => "byte",
            PrimTy::Char => "char",
            PrimTy::Short => "short",
            PrimTy::Int => "int",
            PrimTy::Long => "long",
            PrimTy::Float => "float",
            PrimTy::Double => "double",
        };
        f.write_str(name)
    }
}

/// Index of a reference type inside a [`env::TypeEnvironment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TypeId(pub u32);

impl TypeId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Type {
    Void,
    Prim(PrimTy),
    Class(TypeId),
    Array(ArrayTy),
}

/// Array type. The element type is never itself an array, nesting is expressed by `dims`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ArrayTy {
    pub elem: Box<Type>,
    pub dims: usize,
}

impl Type {
    pub fn array(elem: Type, dims: usize) -> Type {
        assert!(dims > 0, "Array type requires at least one dimension");
        match elem {
            Type::Array(inner) => Type::Array(ArrayTy {
                elem: inner.elem,
                dims: inner.dims + dims,
            }),
            elem => Type::Array(ArrayTy {
                elem: Box::new(elem),
                dims,
            }),
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Type::Void)
    }

    pub fn as_prim(&self) -> Option<PrimTy> {
        match self {
            Type::Prim(prim) => Some(*prim),
            _ => None,
        }
    }

    pub fn as_class(&self) -> Option<TypeId> {
        match self {
            Type::Class(id) => Some(*id),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.as_prim().map_or(false, |prim| prim.is_numeric())
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self, Type::Prim(PrimTy::Boolean))
    }

    /// Type of `array[i]`.
    pub fn element_ty(&self) -> Option<Type> {
        match self {
            Type::Array(array) if array.dims == 1 => Some((*array.elem).clone()),
            Type::Array(array) => Some(Type::Array(ArrayTy {
                elem: array.elem.clone(),
                dims: array.dims - 1,
            })),
            _ => None,
        }
    }
}

impl From<PrimTy> for Type {
    fn from(prim: PrimTy) -> Type {
        Type::Prim(prim)
    }
}

/// Class metadata stored in the type arena.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassInfo {
    pub name: String,
    pub parents: Vec<TypeId>,
    pub children: Vec<TypeId>,
    pub is_final: bool,
    pub is_abstract: bool,
    pub is_interface: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassFlags {
    pub is_final: bool,
    pub is_abstract: bool,
    pub is_interface: bool,
}

impl ClassInfo {
    /// Whether `new Name()` is legal.
    pub fn is_instantiable(&self) -> bool {
        !self.is_abstract && !self.is_interface
    }

    pub fn can_be_extended(&self) -> bool {
        !self.is_final && !self.is_interface
    }
}
