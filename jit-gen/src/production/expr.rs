use crate::context::Context;
use crate::ir::op::{BinaryOp, UnaryOp};
use crate::ir::tree::NodeId;
use crate::ir::{Literal, NodeKind};
use crate::production::rule::Rule;
use crate::production::{
    choose_class_type, ensure, fits, new_node, share, within_limit, ExprKind, ProductionArgs,
    ProductionFailed, ProductionResult,
};
use crate::symbol_table::symbol::{AccessLevel, FunctionInfo, Symbol, VariableInfo};
use crate::ty::env::TypeEnvironment;
use crate::ty::{PrimTy, Type, TypeId};
use rand::prelude::SliceRandom;
use rand::Rng;

const STRING_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789 ";

/// Candidate callees tried before a call gives up.
const CALL_ATTEMPTS: usize = 3;

fn string_ty() -> Type {
    Type::Class(TypeEnvironment::STRING)
}

/// Produces an expression whose value fits `ty`.
pub fn produce_expr(
    ctx: &mut Context,
    ty: &Type,
    args: ProductionArgs,
) -> ProductionResult<NodeId> {
    ensure(args.complexity_limit > 0, "complexity limit reached")?;
    ensure(!ty.is_void(), "void expression")?;
    let mut rule = Rule::new("expr");
    for (kind, weight) in ctx.choose_expr_kinds() {
        if !is_applicable(kind, ty, &args) {
            continue;
        }
        let ty = ty.clone();
        rule.add(format!("{:?}", kind), weight, move |ctx| {
            produce_expr_kind(ctx, kind, &ty, args)
        });
    }
    rule.produce(ctx)
}

fn is_applicable(kind: ExprKind, ty: &Type, args: &ProductionArgs) -> bool {
    let has_operators = args.operator_limit > 0;
    match kind {
        ExprKind::Literal => {
            !args.no_consts && (ty.as_prim().is_some() || *ty == string_ty())
        }
        ExprKind::Variable => true,
        ExprKind::FieldAccess | ExprKind::FunctionCall | ExprKind::Ternary => has_operators,
        ExprKind::Binary => {
            has_operators
                && match ty {
                    Type::Prim(prim) => {
                        *prim == PrimTy::Boolean || !BinaryOp::closed_ops(*prim).is_empty()
                    }
                    _ => *ty == string_ty(),
                }
        }
        ExprKind::Unary => has_operators && ty.as_prim().is_some(),
        ExprKind::Cast => has_operators && ty.is_numeric(),
        ExprKind::ConstructorCall => has_operators && ty.as_class().is_some(),
        ExprKind::ArrayCreation => matches!(ty, Type::Array(_)),
        ExprKind::ArrayElement => {
            has_operators
                && match ty {
                    Type::Prim(_) => true,
                    Type::Array(array) => array.elem.as_prim().is_some(),
                    _ => false,
                }
        }
        ExprKind::Assignment => has_operators && !args.in_initializer,
    }
}

fn produce_expr_kind(
    ctx: &mut Context,
    kind: ExprKind,
    ty: &Type,
    args: ProductionArgs,
) -> ProductionResult<NodeId> {
    match kind {
        ExprKind::Literal => produce_literal(ctx, ty, args),
        ExprKind::Variable => produce_variable(ctx, ty, args),
        ExprKind::FieldAccess => produce_field_access(ctx, ty, args),
        ExprKind::Binary => produce_binary(ctx, ty, args),
        ExprKind::Unary => produce_unary(ctx, ty, args),
        ExprKind::Cast => produce_cast(ctx, ty, args),
        ExprKind::Ternary => produce_ternary(ctx, ty, args),
        ExprKind::FunctionCall => produce_function_call(ctx, Some(ty), args),
        ExprKind::ConstructorCall => produce_constructor_call(ctx, Some(ty), args),
        ExprKind::ArrayCreation => produce_array_creation(ctx, ty, args),
        ExprKind::ArrayElement => produce_array_element(ctx, ty, args),
        ExprKind::Assignment => produce_assignment(ctx, Some(ty), args),
    }
}

fn produce_literal(ctx: &mut Context, ty: &Type, args: ProductionArgs) -> ProductionResult<NodeId> {
    let literal = match ty {
        Type::Prim(prim) => random_literal(ctx, *prim),
        Type::Class(TypeEnvironment::STRING) => Literal::String(random_string(ctx)),
        _ => return Err(ProductionFailed::new("no literal of this type")),
    };
    Ok(new_node(ctx, NodeKind::Literal(literal), ty.clone(), &args, vec![]))
}

/// Random value of `prim`. Integers are biased towards small values, floating point values
/// keep two decimals so they print the same everywhere.
pub fn random_literal(ctx: &mut Context, prim: PrimTy) -> Literal {
    let rng = &mut ctx.rng;
    match prim {
        PrimTy::Boolean => Literal::Boolean(rng.gen()),
        PrimTy::Byte => Literal::Integral(rng.gen::<i8>() as i64, prim),
        PrimTy::Short => Literal::Integral(rng.gen::<i16>() as i64, prim),
        PrimTy::Char => Literal::Integral(rng.gen_range(32..127), prim),
        PrimTy::Int => {
            let value = if rng.gen_bool(0.5) {
                rng.gen_range(-100..=100)
            } else {
                rng.gen::<i32>() as i64
            };
            Literal::Integral(value, prim)
        }
        PrimTy::Long => {
            let value = if rng.gen_bool(0.5) {
                rng.gen_range(-100..=100)
            } else {
                rng.gen::<i64>()
            };
            Literal::Integral(value, prim)
        }
        PrimTy::Float | PrimTy::Double => {
            let value: f64 = rng.gen_range(-1000.0..1000.0);
            Literal::Floating((value * 100.0).round() / 100.0, prim)
        }
    }
}

fn random_string(ctx: &mut Context) -> String {
    let len = ctx.choose_count(ctx.policy.string_literal_size_limit);
    (0..len)
        .filter_map(|_| STRING_CHARS.choose(&mut ctx.rng).map(|c| *c as char))
        .collect()
}

/// How a variable is reached from the code being produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Local,
    Static,
    /// Instance field of `this`.
    This,
}

fn access_of(types: &TypeEnvironment, args: &ProductionArgs, var: &VariableInfo) -> Option<Access> {
    if var.flags.is_local {
        return Some(Access::Local);
    }
    if var.flags.access == AccessLevel::Private && var.owner != args.owner {
        return None;
    }
    if var.flags.is_static {
        Some(Access::Static)
    } else if !args.is_static && types.is_subclass(args.owner, var.owner) {
        Some(Access::This)
    } else {
        None
    }
}

/// Variables readable without a receiver expression.
fn reachable_variables<P>(
    ctx: &Context,
    args: &ProductionArgs,
    predicate: P,
) -> Vec<(VariableInfo, Access)>
where
    P: Fn(&VariableInfo) -> bool,
{
    ctx.symbols
        .get_all(|symbol| matches!(symbol, Symbol::Variable(var) if predicate(var)))
        .into_iter()
        .filter_map(|symbol| match symbol {
            Symbol::Variable(var) => {
                let access = access_of(&ctx.types, args, &var)?;
                Some((var, access))
            }
            Symbol::Function(_) => None,
        })
        .collect()
}

pub fn variable_node(
    ctx: &mut Context,
    var: &VariableInfo,
    access: Access,
    args: &ProductionArgs,
) -> NodeId {
    let ty = var.ty.clone();
    match access {
        Access::Local => new_node(ctx, NodeKind::LocalVariable(var.clone()), ty, args, vec![]),
        Access::Static => {
            new_node(ctx, NodeKind::StaticMemberVariable(var.clone()), ty, args, vec![])
        }
        Access::This => {
            let this = new_node(ctx, NodeKind::This, Type::Class(args.owner), args, vec![]);
            new_node(ctx, NodeKind::NonStaticMemberVariable(var.clone()), ty, args, vec![this])
        }
    }
}

fn can_use_this(ctx: &Context, ty: &Type, args: &ProductionArgs) -> bool {
    !args.is_static
        && !ctx.types.class(args.owner).is_interface
        && fits(&ctx.types, &Type::Class(args.owner), ty)
}

fn produce_variable(ctx: &mut Context, ty: &Type, args: ProductionArgs) -> ProductionResult<NodeId> {
    let mut candidates: Vec<Option<(VariableInfo, Access)>> =
        reachable_variables(ctx, &args, |var| fits(&ctx.types, &var.ty, ty))
            .into_iter()
            .map(Some)
            .collect();
    if can_use_this(ctx, ty, &args) {
        candidates.push(None);
    }
    let chosen = pick(ctx, &candidates, "no variable of this type")?;
    let node = match chosen {
        Some((var, access)) => variable_node(ctx, &var, access, &args),
        None => new_node(ctx, NodeKind::This, Type::Class(args.owner), &args, vec![]),
    };
    within_limit(ctx, node, args.complexity_limit)
}

fn produce_field_access(
    ctx: &mut Context,
    ty: &Type,
    args: ProductionArgs,
) -> ProductionResult<NodeId> {
    ensure(args.complexity_limit > 1, "no room for a receiver")?;
    let owner = args.owner;
    let fields: Vec<VariableInfo> = ctx
        .symbols
        .get_all(|symbol| match symbol {
            Symbol::Variable(var) => {
                !var.flags.is_local
                    && !var.flags.is_static
                    && (var.flags.access != AccessLevel::Private || var.owner == owner)
                    && fits(&ctx.types, &var.ty, ty)
            }
            Symbol::Function(_) => false,
        })
        .into_iter()
        .filter_map(|symbol| symbol.as_variable().cloned())
        .collect();
    let field = pick(ctx, &fields, "no field of this type")?;
    let receiver = produce_expr(
        ctx,
        &Type::Class(field.owner),
        args.operand().with_limit(args.complexity_limit - 1),
    )?;
    let node = new_node(
        ctx,
        NodeKind::NonStaticMemberVariable(field),
        ty.clone(),
        &args,
        vec![receiver],
    );
    within_limit(ctx, node, args.complexity_limit)
}

/// Operator and operand types of a binary expression producing `ty`.
fn choose_binary_op(ctx: &mut Context, ty: &Type) -> ProductionResult<(BinaryOp, Type, Type)> {
    let no_op = || ProductionFailed::new("no binary operator");
    match ty {
        Type::Prim(PrimTy::Boolean) => match ctx.rng.gen_range(0..3) {
            0 => {
                let op = *BinaryOp::closed_ops(PrimTy::Boolean)
                    .choose(&mut ctx.rng)
                    .ok_or_else(no_op)?;
                Ok((op, ty.clone(), ty.clone()))
            }
            1 => {
                let operand: Type = ctx.choose_numeric_type().ok_or_else(no_op)?.into();
                let op = *[BinaryOp::Lt, BinaryOp::Le, BinaryOp::Gt, BinaryOp::Ge]
                    .choose(&mut ctx.rng)
                    .ok_or_else(no_op)?;
                Ok((op, operand.clone(), operand))
            }
            _ => {
                let operand = if ctx.rng.gen_bool(0.7) {
                    ctx.choose_prim_type().map(Type::from)
                } else {
                    choose_class_type(ctx)
                }
                .ok_or_else(no_op)?;
                let op = if ctx.rng.gen_bool(0.5) {
                    BinaryOp::Eq
                } else {
                    BinaryOp::Ne
                };
                Ok((op, operand.clone(), operand))
            }
        },
        Type::Prim(prim) => {
            let op = *BinaryOp::closed_ops(*prim)
                .choose(&mut ctx.rng)
                .ok_or_else(no_op)?;
            Ok((op, ty.clone(), ty.clone()))
        }
        Type::Class(TypeEnvironment::STRING) => {
            let right = if ctx.rng.gen_bool(0.5) {
                string_ty()
            } else {
                ctx.choose_prim_type().ok_or_else(no_op)?.into()
            };
            Ok((BinaryOp::Add, string_ty(), right))
        }
        _ => Err(no_op()),
    }
}

fn produce_binary(ctx: &mut Context, ty: &Type, args: ProductionArgs) -> ProductionResult<NodeId> {
    let limit = args.complexity_limit;
    ensure(limit >= 3, "no room for two operands")?;
    let (op, left_ty, right_ty) = choose_binary_op(ctx, ty)?;
    let operand = args.operand();
    let left = produce_expr(ctx, &left_ty, operand.with_limit(share(limit - 1, 2)))?;
    let used = 1 + ctx.tree.complexity(left);
    let mut right = produce_expr(ctx, &right_ty, operand.with_limit(limit.saturating_sub(used)))?;
    if left_ty.as_class().is_some() && left_ty != string_ty() {
        // both sides may hold unrelated subclasses of the operand type
        right = new_node(ctx, NodeKind::Cast, left_ty.clone(), &args, vec![right]);
    }
    let node = new_node(
        ctx,
        NodeKind::BinaryOperator(op),
        ty.clone(),
        &args,
        vec![left, right],
    );
    within_limit(ctx, node, limit)
}

fn produce_unary(ctx: &mut Context, ty: &Type, args: ProductionArgs) -> ProductionResult<NodeId> {
    let prim = ty
        .as_prim()
        .ok_or_else(|| ProductionFailed::new("unary operators need a primitive"))?;
    let mut ops = UnaryOp::closed_ops(prim);
    if prim.is_numeric() && !args.in_initializer {
        ops.extend([
            UnaryOp::PreInc,
            UnaryOp::PreDec,
            UnaryOp::PostInc,
            UnaryOp::PostDec,
        ]);
    }
    let op = *ops
        .choose(&mut ctx.rng)
        .ok_or_else(|| ProductionFailed::new("no unary operator"))?;
    if op.is_update() {
        return produce_update_with(ctx, op, Some(ty), args);
    }
    let operand = produce_expr(ctx, ty, args.operand())?;
    let node = new_node(
        ctx,
        NodeKind::UnaryOperator(op),
        ty.clone(),
        &args,
        vec![operand],
    );
    within_limit(ctx, node, args.complexity_limit)
}

/// Increment or decrement of a numeric variable, of type `ty` when given.
pub fn produce_update(
    ctx: &mut Context,
    ty: Option<&Type>,
    args: ProductionArgs,
) -> ProductionResult<NodeId> {
    let op = *[
        UnaryOp::PreInc,
        UnaryOp::PreDec,
        UnaryOp::PostInc,
        UnaryOp::PostDec,
    ]
    .choose(&mut ctx.rng)
    .ok_or_else(|| ProductionFailed::new("no update operator"))?;
    produce_update_with(ctx, op, ty, args)
}

fn produce_update_with(
    ctx: &mut Context,
    op: UnaryOp,
    ty: Option<&Type>,
    args: ProductionArgs,
) -> ProductionResult<NodeId> {
    ensure(!args.in_initializer, "no updates in initializers")?;
    ensure(args.complexity_limit >= 2, "no room for an update")?;
    let candidates = assignable_variables(ctx, &args, |var| {
        var.ty.is_numeric() && ty.map_or(true, |ty| var.ty == *ty)
    });
    let (var, access) = pick(ctx, &candidates, "no numeric variable to update")?;
    let target = variable_node(ctx, &var, access, &args);
    let node = new_node(
        ctx,
        NodeKind::UnaryOperator(op),
        var.ty.clone(),
        &args,
        vec![target],
    );
    within_limit(ctx, node, args.complexity_limit)
}

fn assignable_variables<P>(
    ctx: &Context,
    args: &ProductionArgs,
    predicate: P,
) -> Vec<(VariableInfo, Access)>
where
    P: Fn(&VariableInfo) -> bool,
{
    reachable_variables(ctx, args, |var| var.is_assignable() && predicate(var))
}

fn pick<T: Clone>(ctx: &mut Context, candidates: &[T], reason: &str) -> ProductionResult<T> {
    candidates
        .choose(&mut ctx.rng)
        .cloned()
        .ok_or_else(|| ProductionFailed::new(reason))
}

fn produce_cast(ctx: &mut Context, ty: &Type, args: ProductionArgs) -> ProductionResult<NodeId> {
    let target = ty
        .as_prim()
        .filter(PrimTy::is_numeric)
        .ok_or_else(|| ProductionFailed::new("casts produce numeric primitives"))?;
    let sources: Vec<(PrimTy, f64)> = ctx
        .policy
        .prim_type_dist
        .iter()
        .filter(|(prim, _)| prim.is_numeric() && *prim != target)
        .copied()
        .collect();
    let source = crate::context::choose(&sources, &mut ctx.rng)
        .ok_or_else(|| ProductionFailed::new("no source type for a cast"))?;
    let operand = produce_expr(ctx, &source.into(), args.operand())?;
    let node = new_node(ctx, NodeKind::Cast, ty.clone(), &args, vec![operand]);
    within_limit(ctx, node, args.complexity_limit)
}

fn produce_ternary(ctx: &mut Context, ty: &Type, args: ProductionArgs) -> ProductionResult<NodeId> {
    let limit = args.complexity_limit;
    ensure(limit >= 4, "no room for three operands")?;
    let operand = args.operand();
    let condition = produce_expr(
        ctx,
        &PrimTy::Boolean.into(),
        operand.with_limit(share(limit - 1, 3)),
    )?;
    let mut used = 1 + ctx.tree.complexity(condition);
    let then = produce_expr(ctx, ty, operand.with_limit(share(limit.saturating_sub(used), 2)))?;
    used += ctx.tree.complexity(then);
    let otherwise = produce_expr(ctx, ty, operand.with_limit(limit.saturating_sub(used)))?;
    let node = new_node(
        ctx,
        NodeKind::Ternary,
        ty.clone(),
        &args,
        vec![condition, then, otherwise],
    );
    within_limit(ctx, node, limit)
}

fn is_callable(function: &FunctionInfo, owner: TypeId) -> bool {
    !function.flags.is_abstract
        && !function.flags.is_constructor
        && (function.flags.access != AccessLevel::Private || function.owner == owner)
}

/// Call of a visible concrete method. Without `ty` any return type, void included, is fine.
pub fn produce_function_call(
    ctx: &mut Context,
    ty: Option<&Type>,
    args: ProductionArgs,
) -> ProductionResult<NodeId> {
    ensure(!ctx.policy.disable_functions, "functions are disabled")?;
    let candidates: Vec<FunctionInfo> = ctx
        .symbols
        .get_all(|symbol| match symbol {
            Symbol::Function(function) => {
                is_callable(function, args.owner)
                    && function.complexity < args.complexity_limit
                    && ty.map_or(true, |ty| {
                        !function.return_ty.is_void() && fits(&ctx.types, &function.return_ty, ty)
                    })
            }
            Symbol::Variable(_) => false,
        })
        .into_iter()
        .filter_map(|symbol| symbol.as_function().cloned())
        .collect();
    let mut rule = Rule::new("call").with_attempt_limit(CALL_ATTEMPTS);
    for function in candidates {
        let name = format!("{}.{}", function.owner.index(), function.name);
        rule.add(name, 1.0, move |ctx| build_call(ctx, function, args));
    }
    rule.produce(ctx)
}

/// Produces a receiver when `has_receiver` and one expression per argument, splitting what
/// is left of `limit` once `used` is spent.
fn produce_call_operands(
    ctx: &mut Context,
    function: &FunctionInfo,
    has_receiver: bool,
    mut used: usize,
    args: ProductionArgs,
) -> ProductionResult<Vec<NodeId>> {
    let limit = args.complexity_limit;
    ensure(used <= limit, "callee too complex")?;
    let operand = args.operand();
    let mut operands = vec![];
    let mut wanted = function.arg_types();
    if has_receiver {
        wanted.insert(0, Type::Class(function.owner));
    }
    let count = wanted.len();
    for (i, ty) in wanted.iter().enumerate() {
        let remaining = limit.saturating_sub(used);
        let child = produce_expr(ctx, ty, operand.with_limit(share(remaining, count - i)))?;
        used += ctx.tree.complexity(child);
        operands.push(child);
    }
    Ok(operands)
}

fn build_call(
    ctx: &mut Context,
    function: FunctionInfo,
    args: ProductionArgs,
) -> ProductionResult<NodeId> {
    let has_receiver = !function.flags.is_static;
    let operands = produce_call_operands(ctx, &function, has_receiver, 1 + function.complexity, args)?;
    let ty = function.return_ty.clone();
    let node = new_node(
        ctx,
        NodeKind::FunctionCall {
            info: function,
            has_receiver,
        },
        ty,
        &args,
        operands,
    );
    within_limit(ctx, node, args.complexity_limit)
}

/// Instantiation of a concrete class fitting `ty`, or of any class without `ty`.
pub fn produce_constructor_call(
    ctx: &mut Context,
    ty: Option<&Type>,
    args: ProductionArgs,
) -> ProductionResult<NodeId> {
    ensure(!ctx.policy.disable_classes, "classes are disabled")?;
    let candidates: Vec<FunctionInfo> = ctx
        .symbols
        .get_all(|symbol| match symbol {
            Symbol::Function(function) => {
                function.flags.is_constructor
                    && !function.flags.is_abstract
                    && function.complexity < args.complexity_limit
                    && ty.map_or(true, |ty| fits(&ctx.types, &function.return_ty, ty))
            }
            Symbol::Variable(_) => false,
        })
        .into_iter()
        .filter_map(|symbol| symbol.as_function().cloned())
        .collect();
    let constructor = pick(ctx, &candidates, "no constructor")?;
    let operands = produce_call_operands(ctx, &constructor, false, 1 + constructor.complexity, args)?;
    let ty = constructor.return_ty.clone();
    let node = new_node(
        ctx,
        NodeKind::ConstructorCall(constructor),
        ty,
        &args,
        operands,
    );
    within_limit(ctx, node, args.complexity_limit)
}

fn produce_array_creation(
    ctx: &mut Context,
    ty: &Type,
    args: ProductionArgs,
) -> ProductionResult<NodeId> {
    let dims = match ty {
        Type::Array(array) => array.dims,
        _ => return Err(ProductionFailed::new("not an array type")),
    };
    ensure(ctx.policy.array_length_limit > 0, "arrays cannot be empty")?;
    let lengths = (0..dims).map(|_| ctx.choose_array_length()).collect();
    let node = new_node(
        ctx,
        NodeKind::ArrayCreation { lengths },
        ty.clone(),
        &args,
        vec![],
    );
    within_limit(ctx, node, args.complexity_limit)
}

/// Indexes into an array with more dimensions than `ty`. Indices stay in bounds: they are
/// drawn from the lengths of a fresh array, and are 0 otherwise since no array is empty.
fn produce_array_element(
    ctx: &mut Context,
    ty: &Type,
    args: ProductionArgs,
) -> ProductionResult<NodeId> {
    let (elem, base_dims) = match ty {
        Type::Prim(prim) => (*prim, 0),
        Type::Array(array) => (
            array
                .elem
                .as_prim()
                .ok_or_else(|| ProductionFailed::new("arrays hold primitives"))?,
            array.dims,
        ),
        _ => return Err(ProductionFailed::new("not an element type")),
    };
    let max_dims = ctx.policy.dimensions_limit;
    ensure(base_dims < max_dims, "too many dimensions")?;
    let dims = ctx.rng.gen_range(base_dims + 1..=max_dims);
    let levels = dims - base_dims;
    let limit = args.complexity_limit;
    ensure(limit > 2 * levels, "no room for the array")?;
    let array_ty = Type::array(elem.into(), dims);
    let mut node = produce_expr(ctx, &array_ty, args.operand().with_limit(limit - 2 * levels))?;
    let lengths = match ctx.tree.kind(node) {
        NodeKind::ArrayCreation { lengths } => Some(lengths.clone()),
        _ => None,
    };
    let mut current = array_ty;
    for level in 0..levels {
        let index = match &lengths {
            Some(lengths) => ctx.rng.gen_range(0..lengths[level]),
            None => 0,
        };
        current = current
            .element_ty()
            .ok_or_else(|| ProductionFailed::new("indexed past the last dimension"))?;
        let index = new_node(
            ctx,
            NodeKind::Literal(Literal::Integral(index as i64, PrimTy::Int)),
            PrimTy::Int.into(),
            &args,
            vec![],
        );
        node = new_node(ctx, NodeKind::ArrayElement, current.clone(), &args, vec![node, index]);
    }
    within_limit(ctx, node, limit)
}

/// Plain or compound assignment to a visible variable whose type fits `ty` when given.
pub fn produce_assignment(
    ctx: &mut Context,
    ty: Option<&Type>,
    args: ProductionArgs,
) -> ProductionResult<NodeId> {
    ensure(!args.in_initializer, "no assignments in initializers")?;
    ensure(args.complexity_limit >= 3, "no room for an assignment")?;
    let candidates = assignable_variables(ctx, &args, |var| {
        ty.map_or(true, |ty| fits(&ctx.types, &var.ty, ty))
    });
    let (var, access) = pick(ctx, &candidates, "no assignable variable")?;
    let compound = match &var.ty {
        Type::Prim(prim) => BinaryOp::compound_assignments(*prim),
        _ => vec![],
    };
    let op = if compound.is_empty() || ctx.rng.gen_bool(0.5) {
        BinaryOp::Assign
    } else {
        *compound
            .choose(&mut ctx.rng)
            .ok_or_else(|| ProductionFailed::new("no compound assignment"))?
    };
    let target = variable_node(ctx, &var, access, &args);
    let used = 1 + ctx.tree.complexity(target);
    let value = produce_expr(
        ctx,
        &var.ty,
        args.operand().with_limit(args.complexity_limit.saturating_sub(used)),
    )?;
    let node = new_node(
        ctx,
        NodeKind::BinaryOperator(op),
        var.ty.clone(),
        &args,
        vec![target, value],
    );
    within_limit(ctx, node, args.complexity_limit)
}
