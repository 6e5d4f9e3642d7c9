use crate::context::Context;
use crate::distribution::Distribution;
use crate::ir::tree::NodeId;
use crate::ir::{LoopDef, NodeKind};
use crate::production::expr::{
    produce_assignment, produce_constructor_call, produce_expr, produce_function_call,
    produce_update,
};
use crate::production::rule::Rule;
use crate::production::{
    ensure, new_node, produce_ty, share, within_limit, ExprKind, ProductionArgs,
    ProductionFailed, ProductionResult, StmtKind,
};
use crate::symbol_table::symbol::{SymbolFlags, VariableInfo};
use crate::ty::{PrimTy, Type};
use rand::prelude::SliceRandom;
use rand::Rng;

/// What closes a block after its statements.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockEnd {
    Nothing,
    /// A `break` or `continue` when the enclosing loop allows it.
    Jump,
    /// `return` of a value of the given type.
    Return(Type),
}

/// Produces a block in its own scope.
pub fn produce_block(
    ctx: &mut Context,
    args: ProductionArgs,
    end: BlockEnd,
) -> ProductionResult<NodeId> {
    ctx.scoped(|ctx| produce_block_in_scope(ctx, args, end))
}

fn produce_block_in_scope(
    ctx: &mut Context,
    args: ProductionArgs,
    end: BlockEnd,
) -> ProductionResult<NodeId> {
    let limit = args.complexity_limit;
    let reserved = match &end {
        BlockEnd::Return(_) => share(limit, 4),
        BlockEnd::Jump | BlockEnd::Nothing => 0,
    };
    let budget = limit.saturating_sub(reserved);
    let mut children = vec![];
    let mut used = 0;
    for _ in 0..ctx.choose_num_stmts() {
        let remaining = budget.saturating_sub(used);
        if remaining == 0 {
            break;
        }
        match produce_stmt(ctx, args.with_limit(remaining)) {
            Ok(stmt) => {
                used += ctx.tree.complexity(stmt);
                children.push(stmt);
            }
            Err(err) => {
                tracing::trace!(reason = %err.0, "Block ended early");
                break;
            }
        }
    }
    match end {
        BlockEnd::Return(ty) => {
            let value = produce_expr(ctx, &ty, args.with_limit(limit.saturating_sub(used + 1)))?;
            children.push(new_node(ctx, NodeKind::Return, Type::Void, &args, vec![value]));
        }
        BlockEnd::Jump => {
            if (args.can_have_break || args.can_have_continue) && used < limit && ctx.choose_jump()
            {
                let kind = if args.can_have_break && (!args.can_have_continue || ctx.rng.gen()) {
                    NodeKind::Break
                } else {
                    NodeKind::Continue
                };
                children.push(new_node(ctx, kind, Type::Void, &args, vec![]));
            }
        }
        BlockEnd::Nothing => {}
    }
    let block = new_node(ctx, NodeKind::Block, Type::Void, &args, children);
    within_limit(ctx, block, limit)
}

pub fn produce_stmt(ctx: &mut Context, args: ProductionArgs) -> ProductionResult<NodeId> {
    let mut rule = Rule::new("stmt");
    for (kind, weight) in ctx.choose_stmt_kinds() {
        rule.add(format!("{:?}", kind), weight, move |ctx| match kind {
            StmtKind::VariableDeclaration => produce_variable_declaration(ctx, args),
            StmtKind::Expression => produce_expression_stmt(ctx, args),
            StmtKind::If => produce_if(ctx, args),
            StmtKind::Switch => produce_switch(ctx, args),
            StmtKind::For | StmtKind::While | StmtKind::DoWhile => produce_loop(ctx, kind, args),
            StmtKind::Block => produce_nested_block(ctx, args),
        });
    }
    rule.produce(ctx)
}

/// Block nested in a block. A block costs nothing itself, so nesting is bounded by the
/// control-flow depth.
fn produce_nested_block(ctx: &mut Context, args: ProductionArgs) -> ProductionResult<NodeId> {
    ensure(args.complexity_limit >= 2, "no room for a nested block")?;
    ensure(
        args.level < ctx.policy.max_cfg_depth,
        "nested block beyond the depth limit",
    )?;
    produce_block(ctx, args.nested().without_jumps(), BlockEnd::Nothing)
}

/// Local declaration. The variable is visible to the statements after it, not to its own
/// initializer.
fn produce_variable_declaration(
    ctx: &mut Context,
    args: ProductionArgs,
) -> ProductionResult<NodeId> {
    let limit = args.complexity_limit;
    ensure(limit >= 2, "no room for a declaration")?;
    let ty = produce_ty(ctx)?;
    let name = ctx.create_var_name();
    let init = produce_expr(ctx, &ty, args.with_limit(limit - 1))?;
    let var = VariableInfo {
        name,
        owner: args.owner,
        ty,
        flags: SymbolFlags {
            is_final: ctx.choose_final(),
            ..SymbolFlags::local()
        },
    };
    let node = new_node(
        ctx,
        NodeKind::VariableDeclaration(var.clone()),
        Type::Void,
        &args,
        vec![init],
    );
    let node = within_limit(ctx, node, limit)?;
    ctx.add_symbol(var);
    Ok(node)
}

/// Expression evaluated for its side effect.
fn produce_expression_stmt(ctx: &mut Context, args: ProductionArgs) -> ProductionResult<NodeId> {
    let limit = args.complexity_limit;
    ensure(limit >= 2, "no room for an expression")?;
    let inner = args.with_limit(limit - 1);
    let weight = |kind: ExprKind| {
        ctx.choose_expr_kinds()
            .iter()
            .find(|(k, _)| *k == kind)
            .map_or(0.0, |(_, weight)| *weight)
    };
    let rule = Rule::new("effect")
        .variant("Assignment", weight(ExprKind::Assignment), move |ctx| {
            produce_assignment(ctx, None, inner)
        })
        .variant("Update", weight(ExprKind::Unary), move |ctx| {
            produce_update(ctx, None, inner)
        })
        .variant("FunctionCall", weight(ExprKind::FunctionCall), move |ctx| {
            produce_function_call(ctx, None, inner)
        })
        .variant(
            "ConstructorCall",
            weight(ExprKind::ConstructorCall),
            move |ctx| produce_constructor_call(ctx, None, inner),
        );
    let expr = rule.produce(ctx)?;
    let node = new_node(ctx, NodeKind::Statement, Type::Void, &args, vec![expr]);
    within_limit(ctx, node, limit)
}

fn produce_if(ctx: &mut Context, args: ProductionArgs) -> ProductionResult<NodeId> {
    let limit = args.complexity_limit;
    ensure(limit >= 3, "no room for an if")?;
    let inner = args.nested();
    let condition_args = ProductionArgs {
        no_consts: true,
        ..inner.with_limit(share(limit - 1, 4))
    };
    let condition = produce_expr(ctx, &PrimTy::Boolean.into(), condition_args)?;
    let mut used = 1 + ctx.tree.complexity(condition);
    let has_else = ctx.choose_else();
    let remaining = limit.saturating_sub(used);
    let then_limit = if has_else { remaining / 2 } else { remaining };
    let then = produce_block(ctx, inner.with_limit(then_limit), BlockEnd::Jump)?;
    used += ctx.tree.complexity(then);
    let mut children = vec![condition, then];
    if has_else {
        let otherwise = produce_block(
            ctx,
            inner.without_jumps().with_limit(limit.saturating_sub(used)),
            BlockEnd::Nothing,
        )?;
        children.push(otherwise);
    }
    let node = new_node(ctx, NodeKind::If, Type::Void, &inner, children);
    within_limit(ctx, node, limit)
}

/// Switch over an int selector with distinct labels.
fn produce_switch(ctx: &mut Context, args: ProductionArgs) -> ProductionResult<NodeId> {
    let limit = args.complexity_limit;
    ensure(limit >= 3, "no room for a switch")?;
    let inner = args.nested();
    let selector_ty = ctx
        .choose_numeric_type()
        .ok_or_else(|| ProductionFailed::new("no numeric type"))?;
    let selector = produce_expr(ctx, &selector_ty.into(), inner.with_limit(share(limit - 2, 4)))?;
    let selector = new_node(ctx, NodeKind::Cast, PrimTy::Int.into(), &inner, vec![selector]);

    let count = Distribution::up_to(ctx.policy.switch_cases_limit).sample(&mut ctx.rng);
    let has_default = count == 0 || ctx.choose_default_case();
    let mut labels: Vec<i32> = (-2..2 * count as i32 + 2).collect();
    labels.shuffle(&mut ctx.rng);
    labels.truncate(count);

    let blocks = count + usize::from(has_default);
    let mut used = 1 + ctx.tree.complexity(selector);
    let mut children = vec![selector];
    let case_args = inner.without_jumps();
    for i in 0..blocks {
        let case_limit = limit.saturating_sub(used) / (blocks - i);
        let block = produce_block(ctx, case_args.with_limit(case_limit), BlockEnd::Nothing)?;
        used += ctx.tree.complexity(block);
        children.push(block);
    }
    let node = new_node(
        ctx,
        NodeKind::Switch {
            labels,
            has_default,
        },
        Type::Void,
        &inner,
        children,
    );
    within_limit(ctx, node, limit)
}

/// Counted loop. The body budget is divided by the iteration count since the body complexity
/// is multiplied by it. The counter is a final int only the body can see.
fn produce_loop(ctx: &mut Context, kind: StmtKind, args: ProductionArgs) -> ProductionResult<NodeId> {
    let limit = args.complexity_limit;
    ensure(limit >= 2, "no room for a loop")?;
    let inner = args.nested();
    let iterations = ctx.choose_loop_iterations();
    ensure(iterations > 0, "loops iterate at least once")?;
    let counter = VariableInfo {
        name: ctx.create_var_name(),
        owner: args.owner,
        ty: PrimTy::Int.into(),
        flags: SymbolFlags {
            is_final: true,
            ..SymbolFlags::local()
        },
    };
    let def = LoopDef {
        counter: counter.name.clone(),
        iterations,
    };
    let body_args = ProductionArgs {
        can_have_break: true,
        can_have_continue: true,
        ..inner.with_limit((limit - 1) / iterations)
    };
    let body = ctx.scoped(|ctx| {
        ctx.add_symbol(counter);
        produce_block(ctx, body_args, BlockEnd::Jump)
    })?;
    let kind = match kind {
        StmtKind::For => NodeKind::For(def),
        StmtKind::While => NodeKind::While(def),
        _ => NodeKind::DoWhile(def),
    };
    let node = new_node(ctx, kind, Type::Void, &inner, vec![body]);
    within_limit(ctx, node, limit)
}
