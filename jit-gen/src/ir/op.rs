use crate::ty::PrimTy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    UShr,
    And,
    Or,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    RemAssign,
    BitAndAssign,
    BitOrAssign,
    BitXorAssign,
    ShlAssign,
    ShrAssign,
    UShrAssign,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::UShr => ">>>",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Assign => "=",
            BinaryOp::AddAssign => "+=",
            BinaryOp::SubAssign => "-=",
            BinaryOp::MulAssign => "*=",
            BinaryOp::DivAssign => "/=",
            BinaryOp::RemAssign => "%=",
            BinaryOp::BitAndAssign => "&=",
            BinaryOp::BitOrAssign => "|=",
            BinaryOp::BitXorAssign => "^=",
            BinaryOp::ShlAssign => "<<=",
            BinaryOp::ShrAssign => ">>=",
            BinaryOp::UShrAssign => ">>>=",
        }
    }

    pub fn is_assignment(&self) -> bool {
        matches!(
            self,
            BinaryOp::Assign
                | BinaryOp::AddAssign
                | BinaryOp::SubAssign
                | BinaryOp::MulAssign
                | BinaryOp::DivAssign
                | BinaryOp::RemAssign
                | BinaryOp::BitAndAssign
                | BinaryOp::BitOrAssign
                | BinaryOp::BitXorAssign
                | BinaryOp::ShlAssign
                | BinaryOp::ShrAssign
                | BinaryOp::UShrAssign
        )
    }

    pub fn is_shift(&self) -> bool {
        matches!(
            self,
            BinaryOp::Shl
                | BinaryOp::Shr
                | BinaryOp::UShr
                | BinaryOp::ShlAssign
                | BinaryOp::ShrAssign
                | BinaryOp::UShrAssign
        )
    }

    /// Operators yielding a value of the operand type `ty`, both operands having type `ty`
    /// (the right operand of a shift may be any integral type).
    pub fn closed_ops(ty: PrimTy) -> Vec<BinaryOp> {
        use BinaryOp::*;
        match ty {
            PrimTy::Boolean => vec![And, Or, BitAnd, BitOr, BitXor],
            PrimTy::Int | PrimTy::Long => {
                vec![Add, Sub, Mul, Div, Rem, BitAnd, BitOr, BitXor, Shl, Shr, UShr]
            }
            PrimTy::Float | PrimTy::Double => vec![Add, Sub, Mul, Div, Rem],
            PrimTy::Byte | PrimTy::Char | PrimTy::Short => vec![],
        }
    }

    /// Compound assignments applicable to a variable of type `ty`.
    pub fn compound_assignments(ty: PrimTy) -> Vec<BinaryOp> {
        use BinaryOp::*;
        match ty {
            PrimTy::Boolean => vec![BitAndAssign, BitOrAssign, BitXorAssign],
            PrimTy::Float | PrimTy::Double => {
                vec![AddAssign, SubAssign, MulAssign, DivAssign, RemAssign]
            }
            _ => vec![
                AddAssign,
                SubAssign,
                MulAssign,
                DivAssign,
                RemAssign,
                BitAndAssign,
                BitOrAssign,
                BitXorAssign,
                ShlAssign,
                ShrAssign,
                UShrAssign,
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    BitNot,
    Not,
    PreInc,
    PreDec,
    PostInc,
    PostDec,
}

impl UnaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::BitNot => "~",
            UnaryOp::Not => "!",
            UnaryOp::PreInc | UnaryOp::PostInc => "++",
            UnaryOp::PreDec | UnaryOp::PostDec => "--",
        }
    }

    pub fn is_prefix(&self) -> bool {
        !matches!(self, UnaryOp::PostInc | UnaryOp::PostDec)
    }

    /// Increments and decrements, which need an assignable operand.
    pub fn is_update(&self) -> bool {
        matches!(
            self,
            UnaryOp::PreInc | UnaryOp::PreDec | UnaryOp::PostInc | UnaryOp::PostDec
        )
    }

    /// Non-updating operators yielding a value of the operand type `ty`.
    pub fn closed_ops(ty: PrimTy) -> Vec<UnaryOp> {
        match ty {
            PrimTy::Boolean => vec![UnaryOp::Not],
            PrimTy::Int | PrimTy::Long => vec![UnaryOp::Neg, UnaryOp::BitNot],
            PrimTy::Float | PrimTy::Double => vec![UnaryOp::Neg],
            PrimTy::Byte | PrimTy::Char | PrimTy::Short => vec![],
        }
    }
}
