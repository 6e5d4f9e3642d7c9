//! Intermediate representation of generated programs.

pub mod op;
pub mod tree;
pub mod visitor;

use crate::ir::op::{BinaryOp, UnaryOp};
use crate::symbol_table::symbol::{FunctionInfo, VariableInfo};
use crate::ty::{PrimTy, Type, TypeId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Boolean(bool),
    /// Integral literal of the given type (byte, short, char, int or long).
    Integral(i64, PrimTy),
    Floating(f64, PrimTy),
    String(String),
}

/// Counter bounded loop header. The counter is only ever written by the loop itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopDef {
    pub counter: String,
    pub iterations: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    // Classes
    /// Holder of the private helper classes.
    ClassDefinitionBlock,
    /// Class or interface definition. Children are member blocks.
    Klass(TypeId),
    /// The public test class.
    MainKlass(TypeId),

    // Members
    /// Field declarations.
    VariableDeclarationBlock,
    /// Method definitions and declarations.
    FunctionDefinitionBlock,
    /// Method with a body. Children: body block.
    FunctionDefinition(FunctionInfo),
    /// Abstract method.
    FunctionDeclaration(FunctionInfo),
    /// Synthetic `print()` method printing the listed fields.
    PrintVariables(Vec<VariableInfo>),
    /// Synthetic `main(String[])` entry point.
    MainMethod,

    // Statements
    Block,
    /// Expression statement. Children: expression.
    Statement,
    /// Declaration with initializer. Children: initializer.
    VariableDeclaration(VariableInfo),
    /// Children: condition, then block and an optional else block.
    If,
    /// Children: selector followed by one block per label and the default block when present.
    Switch { labels: Vec<i32>, has_default: bool },
    For(LoopDef),
    While(LoopDef),
    DoWhile(LoopDef),
    Break,
    Continue,
    /// Children: returned expression when the function is not void.
    Return,

    // Expressions
    Literal(Literal),
    LocalVariable(VariableInfo),
    StaticMemberVariable(VariableInfo),
    /// Children: receiver.
    NonStaticMemberVariable(VariableInfo),
    This,
    BinaryOperator(BinaryOp),
    UnaryOperator(UnaryOp),
    /// Cast to the node type. Children: operand.
    Cast,
    /// Children: condition and both alternatives.
    Ternary,
    /// Children: receiver when `has_receiver`, then arguments.
    FunctionCall { info: FunctionInfo, has_receiver: bool },
    /// Children: arguments.
    ConstructorCall(FunctionInfo),
    ArrayCreation { lengths: Vec<usize> },
    /// Children: array and index.
    ArrayElement,
    /// Removed node placeholder.
    Nothing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NodeCategory {
    Class,
    Member,
    Statement,
    Expression,
}

impl NodeKind {
    pub fn category(&self) -> NodeCategory {
        match self {
            NodeKind::ClassDefinitionBlock | NodeKind::Klass(_) | NodeKind::MainKlass(_) => {
                NodeCategory::Class
            }
            NodeKind::VariableDeclarationBlock
            | NodeKind::FunctionDefinitionBlock
            | NodeKind::FunctionDefinition(_)
            | NodeKind::FunctionDeclaration(_)
            | NodeKind::PrintVariables(_)
            | NodeKind::MainMethod => NodeCategory::Member,
            NodeKind::Block
            | NodeKind::Statement
            | NodeKind::VariableDeclaration(_)
            | NodeKind::If
            | NodeKind::Switch { .. }
            | NodeKind::For(_)
            | NodeKind::While(_)
            | NodeKind::DoWhile(_)
            | NodeKind::Break
            | NodeKind::Continue
            | NodeKind::Return
            | NodeKind::Nothing => NodeCategory::Statement,
            _ => NodeCategory::Expression,
        }
    }

    /// Short name used for statistics.
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::ClassDefinitionBlock => "ClassDefinitionBlock",
            NodeKind::Klass(_) => "Klass",
            NodeKind::MainKlass(_) => "MainKlass",
            NodeKind::VariableDeclarationBlock => "VariableDeclarationBlock",
            NodeKind::FunctionDefinitionBlock => "FunctionDefinitionBlock",
            NodeKind::FunctionDefinition(_) => "FunctionDefinition",
            NodeKind::FunctionDeclaration(_) => "FunctionDeclaration",
            NodeKind::PrintVariables(_) => "PrintVariables",
            NodeKind::MainMethod => "MainMethod",
            NodeKind::Block => "Block",
            NodeKind::Statement => "Statement",
            NodeKind::VariableDeclaration(_) => "VariableDeclaration",
            NodeKind::If => "If",
            NodeKind::Switch { .. } => "Switch",
            NodeKind::For(_) => "For",
            NodeKind::While(_) => "While",
            NodeKind::DoWhile(_) => "DoWhile",
            NodeKind::Break => "Break",
            NodeKind::Continue => "Continue",
            NodeKind::Return => "Return",
            NodeKind::Literal(_) => "Literal",
            NodeKind::LocalVariable(_) => "LocalVariable",
            NodeKind::StaticMemberVariable(_) => "StaticMemberVariable",
            NodeKind::NonStaticMemberVariable(_) => "NonStaticMemberVariable",
            NodeKind::This => "This",
            NodeKind::BinaryOperator(_) => "BinaryOperator",
            NodeKind::UnaryOperator(_) => "UnaryOperator",
            NodeKind::Cast => "Cast",
            NodeKind::Ternary => "Ternary",
            NodeKind::FunctionCall { .. } => "FunctionCall",
            NodeKind::ConstructorCall(_) => "ConstructorCall",
            NodeKind::ArrayCreation { .. } => "ArrayCreation",
            NodeKind::ArrayElement => "ArrayElement",
            NodeKind::Nothing => "Nothing",
        }
    }

    /// Control structures counted by the control-flow depth.
    pub fn is_control_flow(&self) -> bool {
        matches!(
            self,
            NodeKind::If
                | NodeKind::Switch { .. }
                | NodeKind::For(_)
                | NodeKind::While(_)
                | NodeKind::DoWhile(_)
        )
    }

    /// Nodes whose code is injected after generation and costs nothing.
    pub fn is_synthetic(&self) -> bool {
        matches!(self, NodeKind::PrintVariables(_) | NodeKind::MainMethod)
    }
}

/// A single node of the [`tree::IrTree`] arena.
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    /// Value type of expressions, `Type::Void` for everything else.
    pub ty: Type,
    /// Class the code of the node belongs to.
    pub owner: TypeId,
    pub parent: Option<tree::NodeId>,
    pub children: Vec<tree::NodeId>,
    /// Control-flow nesting level.
    pub level: usize,
}
