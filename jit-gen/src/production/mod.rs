//! Grammar productions turning rules into IR subtrees.

pub mod expr;
pub mod function;
pub mod klass;
pub mod rule;
pub mod stmt;

use crate::context::Context;
use crate::ir::tree::NodeId;
use crate::ir::NodeKind;
use crate::ty::env::TypeEnvironment;
use crate::ty::{Type, TypeId};
use rand::prelude::SliceRandom;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Recoverable signal that a variant cannot produce a node under the current constraints.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Production failed: {0}")]
pub struct ProductionFailed(pub String);

impl ProductionFailed {
    pub fn new<S: Into<String>>(reason: S) -> ProductionFailed {
        ProductionFailed(reason.into())
    }
}

pub type ProductionResult<T> = Result<T, ProductionFailed>;

/// Fails with `reason` unless `condition` holds.
pub fn ensure(condition: bool, reason: &str) -> ProductionResult<()> {
    if condition {
        Ok(())
    } else {
        Err(ProductionFailed::new(reason))
    }
}

/// Whether an expression of type `actual` may stand where `target` is expected.
/// Primitives and arrays must match exactly, classes may be subclasses.
pub fn fits(types: &TypeEnvironment, actual: &Type, target: &Type) -> bool {
    match (actual, target) {
        (Type::Class(_), Type::Class(_)) => types.can_implicitly_cast(actual, target),
        _ => actual == target,
    }
}

/// Adds a node in the scope described by `args`.
pub fn new_node(
    ctx: &mut Context,
    kind: NodeKind,
    ty: Type,
    args: &ProductionArgs,
    children: Vec<NodeId>,
) -> NodeId {
    ctx.tree.node(kind, ty, args.owner, args.level, children)
}

/// Accepts `id` unless its complexity exceeds `limit`.
pub fn within_limit(ctx: &Context, id: NodeId, limit: usize) -> ProductionResult<NodeId> {
    let complexity = ctx.tree.complexity(id);
    if complexity > limit {
        return Err(ProductionFailed::new(format!(
            "complexity {} exceeds {}",
            complexity, limit
        )));
    }
    Ok(id)
}

/// Even share of `remaining` for one of `parts` children, at least one.
pub fn share(remaining: usize, parts: usize) -> usize {
    (remaining / parts.max(1)).max(1)
}

/// Declared type of a new variable, field, argument or return value.
pub fn produce_ty(ctx: &mut Context) -> ProductionResult<Type> {
    let kind = ctx
        .choose_ty_kind()
        .ok_or_else(|| ProductionFailed::new("empty type distribution"))?;
    let no_prim = || ProductionFailed::new("empty primitive distribution");
    match kind {
        TyKind::Prim => Ok(ctx.choose_prim_type().ok_or_else(no_prim)?.into()),
        TyKind::String => Ok(Type::Class(TypeEnvironment::STRING)),
        TyKind::Class => {
            choose_class_type(ctx).ok_or_else(|| ProductionFailed::new("no class type"))
        }
        TyKind::Array => {
            let elem = ctx.choose_prim_type().ok_or_else(no_prim)?;
            let dims = ctx.choose_dimensions();
            ensure(dims > 0, "arrays need a dimension")?;
            Ok(Type::array(elem.into(), dims))
        }
    }
}

/// A generated class or `java.lang.Object`.
pub fn choose_class_type(ctx: &mut Context) -> Option<Type> {
    let disable_classes = ctx.policy.disable_classes;
    let candidates: Vec<TypeId> = ctx
        .types
        .classes()
        .filter(|(id, _)| {
            *id == TypeEnvironment::OBJECT || (!disable_classes && ctx.types.is_session_type(*id))
        })
        .map(|(id, _)| id)
        .collect();
    candidates.choose(&mut ctx.rng).map(|id| Type::Class(*id))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StmtKind {
    VariableDeclaration,
    Expression,
    If,
    Switch,
    For,
    While,
    DoWhile,
    Block,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ExprKind {
    Literal,
    Variable,
    FieldAccess,
    Binary,
    Unary,
    Cast,
    Ternary,
    FunctionCall,
    ConstructorCall,
    ArrayCreation,
    ArrayElement,
    Assignment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TyKind {
    Prim,
    String,
    Class,
    Array,
}

/// Constraints handed down from a production to its sub-productions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductionArgs {
    pub complexity_limit: usize,
    pub operator_limit: usize,
    /// Class the produced code belongs to.
    pub owner: TypeId,
    pub level: usize,
    /// No `this` and no instance members without a receiver.
    pub is_static: bool,
    /// Field initializer of `owner`. Restricts calls and constructions to earlier classes.
    pub in_initializer: bool,
    pub can_have_break: bool,
    pub can_have_continue: bool,
    /// Forbids literals, used for operands that would fold into constants.
    pub no_consts: bool,
}

impl ProductionArgs {
    pub fn new(owner: TypeId, complexity_limit: usize, operator_limit: usize) -> ProductionArgs {
        ProductionArgs {
            complexity_limit,
            operator_limit,
            owner,
            level: 0,
            is_static: false,
            in_initializer: false,
            can_have_break: false,
            can_have_continue: false,
            no_consts: false,
        }
    }

    pub fn with_limit(&self, complexity_limit: usize) -> ProductionArgs {
        ProductionArgs {
            complexity_limit,
            ..*self
        }
    }

    /// Arguments for an operand: one operator and one unit of complexity fewer.
    pub fn operand(&self) -> ProductionArgs {
        ProductionArgs {
            complexity_limit: self.complexity_limit.saturating_sub(1),
            operator_limit: self.operator_limit.saturating_sub(1),
            no_consts: false,
            ..*self
        }
    }

    /// Arguments for code nested one control-flow level deeper.
    pub fn nested(&self) -> ProductionArgs {
        ProductionArgs {
            level: self.level + 1,
            ..*self
        }
    }

    pub fn without_jumps(&self) -> ProductionArgs {
        ProductionArgs {
            can_have_break: false,
            can_have_continue: false,
            ..*self
        }
    }
}
