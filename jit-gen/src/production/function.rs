use crate::context::Context;
use crate::ir::tree::NodeId;
use crate::ir::NodeKind;
use crate::production::stmt::{produce_block, BlockEnd};
use crate::production::{produce_ty, ProductionArgs, ProductionResult};
use crate::symbol_table::symbol::{AccessLevel, FunctionInfo, SymbolFlags, VariableInfo};
use crate::ty::{Type, TypeId};

/// Probability of a method returning nothing.
const VOID_PROB: f64 = 0.25;

fn produce_return_ty(ctx: &mut Context) -> ProductionResult<Type> {
    if ctx.choose_prob(VOID_PROB) {
        Ok(Type::Void)
    } else {
        produce_ty(ctx)
    }
}

fn produce_arguments(ctx: &mut Context, owner: TypeId) -> ProductionResult<Vec<VariableInfo>> {
    let count = ctx.choose_count(ctx.policy.member_functions_args_limit);
    let mut args = Vec::with_capacity(count);
    for _ in 0..count {
        args.push(VariableInfo {
            name: ctx.create_var_name(),
            owner,
            ty: produce_ty(ctx)?,
            flags: SymbolFlags::local(),
        });
    }
    Ok(args)
}

fn access(ctx: &mut Context) -> AccessLevel {
    if ctx.choose_private() {
        AccessLevel::Private
    } else {
        AccessLevel::Public
    }
}

/// New method of `owner` with a body of complexity at most `limit`.
pub fn produce_function_definition(
    ctx: &mut Context,
    owner: TypeId,
    limit: usize,
) -> ProductionResult<NodeId> {
    let name = ctx.create_function_name();
    let return_ty = produce_return_ty(ctx)?;
    let args = produce_arguments(ctx, owner)?;
    let flags = SymbolFlags {
        access: access(ctx),
        is_static: ctx.choose_static(),
        ..SymbolFlags::default()
    };
    define_function(
        ctx,
        FunctionInfo {
            name,
            owner,
            return_ty,
            args,
            flags,
            complexity: 0,
        },
        limit,
    )
}

/// Public instance method of `owner` overriding the abstract `function`.
pub fn implement_function(
    ctx: &mut Context,
    function: &FunctionInfo,
    owner: TypeId,
    limit: usize,
) -> ProductionResult<NodeId> {
    define_function(
        ctx,
        FunctionInfo {
            owner,
            flags: SymbolFlags::default(),
            complexity: 0,
            ..function.clone()
        },
        limit,
    )
}

/// Produces the body of `function` and declares it. The function is not visible from its own
/// body, so generated code never recurses.
pub fn define_function(
    ctx: &mut Context,
    mut function: FunctionInfo,
    limit: usize,
) -> ProductionResult<NodeId> {
    let body_args = ProductionArgs {
        is_static: function.flags.is_static,
        ..ProductionArgs::new(function.owner, limit, ctx.policy.operator_limit)
    };
    let end = if function.return_ty.is_void() {
        BlockEnd::Nothing
    } else {
        BlockEnd::Return(function.return_ty.clone())
    };
    let params = function.args.clone();
    let body = ctx.scoped(|ctx| {
        for param in params {
            ctx.add_symbol(param);
        }
        produce_block(ctx, body_args, end)
    })?;
    function.complexity = ctx.tree.complexity(body);
    let node = ctx.tree.node(
        NodeKind::FunctionDefinition(function.clone()),
        Type::Void,
        function.owner,
        0,
        vec![body],
    );
    tracing::debug!(name = %function.name, complexity = function.complexity, "Defined function");
    ctx.add_symbol(function);
    Ok(node)
}

/// Abstract public method of `owner`.
pub fn produce_function_declaration(ctx: &mut Context, owner: TypeId) -> ProductionResult<NodeId> {
    let function = FunctionInfo {
        name: ctx.create_function_name(),
        owner,
        return_ty: produce_return_ty(ctx)?,
        args: produce_arguments(ctx, owner)?,
        flags: SymbolFlags {
            is_abstract: true,
            ..SymbolFlags::default()
        },
        complexity: 0,
    };
    let node = ctx.tree.node(
        NodeKind::FunctionDeclaration(function.clone()),
        Type::Void,
        owner,
        0,
        vec![],
    );
    ctx.add_symbol(function);
    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::ExternalSymbols;
    use crate::policy::Policy;
    use crate::symbol_table::symbol::Symbol;
    use crate::ty::env::TypeEnvironment;
    use crate::ty::ClassFlags;

    fn ctx() -> (Context, TypeId) {
        let mut ctx = Context::with_policy(
            9,
            &Policy::default(),
            TypeEnvironment::default(),
            ExternalSymbols::default(),
        );
        let owner = ctx.types.register("Test_0", &[], ClassFlags::default());
        ctx.add_symbol(crate::production::klass::constructor(owner, false, 0));
        (ctx, owner)
    }

    fn calls(ctx: &Context, id: NodeId) -> Vec<String> {
        ctx.tree
            .descendants(id)
            .into_iter()
            .filter_map(|node| match ctx.tree.kind(node) {
                NodeKind::FunctionCall { info, .. } => Some(info.name.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn functions_never_call_themselves() {
        let (mut ctx, owner) = ctx();
        for _ in 0..10 {
            let node = produce_function_definition(&mut ctx, owner, 100).unwrap();
            let name = match ctx.tree.kind(node) {
                NodeKind::FunctionDefinition(info) => info.name.clone(),
                kind => panic!("unexpected {:?}", kind),
            };
            assert!(!calls(&ctx, node).contains(&name));
        }
    }

    #[test]
    fn complexity_is_recorded() {
        let (mut ctx, owner) = ctx();
        let node = produce_function_definition(&mut ctx, owner, 60).unwrap();
        let info = match ctx.tree.kind(node) {
            NodeKind::FunctionDefinition(info) => info.clone(),
            kind => panic!("unexpected {:?}", kind),
        };
        assert_eq!(info.complexity, ctx.tree.complexity(node));
        assert!(info.complexity <= 60);
        let declared = ctx.symbols.get_by_name(&info.name, Symbol::is_function);
        assert_eq!(declared.len(), 1);
    }

    #[test]
    fn declarations_are_abstract() {
        let (mut ctx, owner) = ctx();
        let node = produce_function_declaration(&mut ctx, owner).unwrap();
        match ctx.tree.kind(node) {
            NodeKind::FunctionDeclaration(info) => {
                assert!(info.flags.is_abstract);
                assert!(!info.flags.is_static);
            }
            kind => panic!("unexpected {:?}", kind),
        }
        assert_eq!(ctx.tree.complexity(node), 0);
    }

    #[test]
    fn implementations_keep_the_signature() {
        let (mut ctx, owner) = ctx();
        let node = produce_function_declaration(&mut ctx, owner).unwrap();
        let declared = match ctx.tree.kind(node) {
            NodeKind::FunctionDeclaration(info) => info.clone(),
            kind => panic!("unexpected {:?}", kind),
        };
        let other = ctx.types.register("Test_Klass_0", &[owner], ClassFlags::default());
        let node = implement_function(&mut ctx, &declared, other, 50).unwrap();
        match ctx.tree.kind(node) {
            NodeKind::FunctionDefinition(info) => {
                assert!(info.has_same_signature(&declared));
                assert_eq!(info.owner, other);
                assert!(!info.flags.is_abstract);
                assert_eq!(info.flags.access, AccessLevel::Public);
            }
            kind => panic!("unexpected {:?}", kind),
        }
    }
}
