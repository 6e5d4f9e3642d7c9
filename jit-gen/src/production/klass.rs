use crate::context::Context;
use crate::distribution::Distribution;
use crate::ir::tree::NodeId;
use crate::ir::NodeKind;
use crate::production::expr::produce_expr;
use crate::production::function::{
    define_function, implement_function, produce_function_declaration,
    produce_function_definition,
};
use crate::production::rule::Rule;
use crate::production::{
    ensure, new_node, produce_ty, within_limit, ProductionArgs, ProductionFailed,
    ProductionResult,
};
use crate::symbol_table::symbol::{AccessLevel, FunctionInfo, Symbol, SymbolFlags, VariableInfo};
use crate::ty::env::TypeEnvironment;
use crate::ty::{ClassFlags, ClassInfo, Type, TypeId};
use rand::prelude::SliceRandom;

/// Name under which constructors live in the symbol table.
pub const CONSTRUCTOR_NAME: &str = "<init>";

/// Probability of a class extending an earlier class.
const EXTENDS_PROB: f64 = 0.5;

/// Default constructor symbol of `owner`. `complexity` is the cost of running every instance
/// initializer up the hierarchy.
pub fn constructor(owner: TypeId, is_abstract: bool, complexity: usize) -> FunctionInfo {
    FunctionInfo {
        name: CONSTRUCTOR_NAME.to_string(),
        owner,
        return_ty: Type::Class(owner),
        args: vec![],
        flags: SymbolFlags {
            is_static: true,
            is_constructor: true,
            is_abstract,
            ..SymbolFlags::default()
        },
        complexity,
    }
}

/// Up to `classes_limit` helper classes sharing `limit`. Classes that fail are skipped, the
/// block fails when none is left.
pub fn produce_class_definition_block(ctx: &mut Context, limit: usize) -> ProductionResult<NodeId> {
    let count = Distribution::up_to(ctx.policy.classes_limit).sample(&mut ctx.rng);
    let mut classes = vec![];
    let mut used = 0;
    for i in 0..count {
        let class_limit = limit.saturating_sub(used) / (count - i);
        if class_limit == 0 {
            break;
        }
        if let Ok(class) = produce_class(ctx, class_limit) {
            used += ctx.tree.complexity(class);
            classes.push(class);
        }
    }
    ensure(!classes.is_empty(), "no helper class")?;
    Ok(ctx.tree.node(
        NodeKind::ClassDefinitionBlock,
        Type::Void,
        TypeEnvironment::OBJECT,
        0,
        classes,
    ))
}

fn produce_class(ctx: &mut Context, limit: usize) -> ProductionResult<NodeId> {
    let policy = &ctx.policy;
    let interface_weight = if policy.disable_interfaces || policy.disable_functions {
        0.0
    } else {
        policy.interface_prob
    };
    Rule::new("class")
        .variant("Interface", interface_weight, produce_interface)
        .variant("Klass", 1.0 - interface_weight, move |ctx| produce_klass(ctx, limit))
        .produce(ctx)
}

fn produce_interface(ctx: &mut Context) -> ProductionResult<NodeId> {
    let name = ctx.create_class_name();
    let id = ctx.types.register(
        &name,
        &[],
        ClassFlags {
            is_interface: true,
            ..ClassFlags::default()
        },
    );
    let count = Distribution::up_to(ctx.policy.member_functions_limit).sample(&mut ctx.rng);
    let mut methods = vec![];
    for _ in 0..count {
        methods.push(produce_function_declaration(ctx, id)?);
    }
    let fields = ctx
        .tree
        .node(NodeKind::VariableDeclarationBlock, Type::Void, id, 0, vec![]);
    let functions = ctx
        .tree
        .node(NodeKind::FunctionDefinitionBlock, Type::Void, id, 0, methods);
    tracing::debug!(%name, "Produced interface");
    Ok(ctx
        .tree
        .node(NodeKind::Klass(id), Type::Void, id, 0, vec![fields, functions]))
}

fn session_classes<P>(ctx: &Context, predicate: P) -> Vec<TypeId>
where
    P: Fn(&ClassInfo) -> bool,
{
    ctx.types
        .classes()
        .filter(|(id, class)| ctx.types.is_session_type(*id) && predicate(class))
        .map(|(id, _)| id)
        .collect()
}

fn choose_parents(ctx: &mut Context) -> Vec<TypeId> {
    let mut parents = vec![];
    if !ctx.policy.disable_inheritance && ctx.choose_prob(EXTENDS_PROB) {
        let candidates = session_classes(ctx, |class| {
            !class.is_interface && class.can_be_extended()
        });
        if let Some(parent) = candidates.choose(&mut ctx.rng) {
            parents.push(*parent);
        }
    }
    if !ctx.policy.disable_interfaces {
        let mut interfaces = session_classes(ctx, |class| class.is_interface);
        interfaces.shuffle(&mut ctx.rng);
        interfaces.truncate(ctx.choose_count(ctx.policy.implementation_limit));
        parents.extend(interfaces);
    }
    parents
}

fn produce_klass(ctx: &mut Context, limit: usize) -> ProductionResult<NodeId> {
    let is_abstract = ctx.choose_prob(ctx.policy.abstract_prob);
    let is_final = !is_abstract && ctx.choose_prob(ctx.policy.final_class_prob);
    let parents = choose_parents(ctx);
    let name = ctx.create_class_name();
    let id = ctx.types.register(
        &name,
        &parents,
        ClassFlags {
            is_final,
            is_abstract,
            is_interface: false,
        },
    );

    let (fields, instance_complexity) = produce_fields(ctx, id, limit / 4)?;
    let inherited = parent_constructor_complexity(ctx, id);
    ctx.add_symbol(constructor(id, is_abstract, instance_complexity + inherited));
    let mut used = ctx.tree.complexity(fields);

    let mut methods = vec![];
    let pending = if is_abstract {
        vec![]
    } else {
        unimplemented_functions(ctx, id)
    };
    let extra = if ctx.policy.disable_functions {
        0
    } else {
        ctx.choose_count(ctx.policy.member_functions_limit)
    };
    let total = pending.len() + extra;
    for (i, function) in pending.iter().enumerate() {
        let function_limit = limit.saturating_sub(used) / (total - i);
        let method = implement_function(ctx, function, id, function_limit)?;
        used += ctx.tree.complexity(method);
        methods.push(method);
    }
    for i in pending.len()..total {
        let function_limit = limit.saturating_sub(used) / (total - i);
        let declare = is_abstract && ctx.choose_prob(ctx.policy.abstract_prob);
        let method = ctx.attempt(|ctx| {
            if declare {
                produce_function_declaration(ctx, id)
            } else {
                produce_function_definition(ctx, id, function_limit)
            }
        });
        if let Ok(method) = method {
            used += ctx.tree.complexity(method);
            methods.push(method);
        }
    }
    let functions = ctx
        .tree
        .node(NodeKind::FunctionDefinitionBlock, Type::Void, id, 0, methods);
    let class = ctx
        .tree
        .node(NodeKind::Klass(id), Type::Void, id, 0, vec![fields, functions]);
    tracing::debug!(%name, ?parents, "Produced class");
    within_limit(ctx, class, limit)
}

/// Cost of the constructor of the superclass of `id`, if any.
fn parent_constructor_complexity(ctx: &Context, id: TypeId) -> usize {
    ctx.types
        .class(id)
        .parents
        .iter()
        .filter(|parent| !ctx.types.class(**parent).is_interface)
        .flat_map(|parent| {
            ctx.symbols.get_by_name(CONSTRUCTOR_NAME, |symbol| symbol.owner() == *parent)
        })
        .filter_map(|symbol| symbol.as_function().map(|function| function.complexity))
        .sum()
}

/// Abstract methods inherited by `id` without a concrete override along the way.
fn unimplemented_functions(ctx: &Context, id: TypeId) -> Vec<FunctionInfo> {
    let inherited: Vec<FunctionInfo> = ctx
        .symbols
        .get_all_combined(&ctx.types, id, Symbol::is_function)
        .into_iter()
        .filter_map(|symbol| symbol.as_function().cloned())
        .filter(|function| function.owner != id && !function.flags.is_constructor)
        .collect();
    let mut pending: Vec<FunctionInfo> = vec![];
    for function in inherited.iter().filter(|function| function.flags.is_abstract) {
        let implemented = inherited
            .iter()
            .any(|other| !other.flags.is_abstract && other.has_same_signature(function));
        if !implemented && !pending.iter().any(|other| other.has_same_signature(function)) {
            pending.push(function.clone());
        }
    }
    pending
}

fn field_access(ctx: &mut Context) -> AccessLevel {
    if ctx.choose_private() {
        AccessLevel::Private
    } else {
        *[
            AccessLevel::Public,
            AccessLevel::Protected,
            AccessLevel::Package,
        ]
        .choose(&mut ctx.rng)
        .unwrap_or(&AccessLevel::Public)
    }
}

/// Initialized fields of `owner` sharing `limit`. Returns the block and the complexity of the
/// instance initializers, which every construction pays.
fn produce_fields(
    ctx: &mut Context,
    owner: TypeId,
    limit: usize,
) -> ProductionResult<(NodeId, usize)> {
    let count = ctx.choose_count(ctx.policy.data_members_limit);
    let mut fields = vec![];
    let mut used = 0;
    let mut instance = 0;
    for i in 0..count {
        let field_limit = limit.saturating_sub(used) / (count - i);
        if field_limit < 2 {
            break;
        }
        if let Ok((field, is_static)) = ctx.attempt(|ctx| produce_field(ctx, owner, field_limit)) {
            let complexity = ctx.tree.complexity(field);
            used += complexity;
            if !is_static {
                instance += complexity;
            }
            fields.push(field);
        }
    }
    let block = ctx
        .tree
        .node(NodeKind::VariableDeclarationBlock, Type::Void, owner, 0, fields);
    Ok((block, instance))
}

fn produce_field(
    ctx: &mut Context,
    owner: TypeId,
    limit: usize,
) -> ProductionResult<(NodeId, bool)> {
    let ty = produce_ty(ctx)?;
    let name = ctx.create_var_name();
    let flags = SymbolFlags {
        access: field_access(ctx),
        is_static: ctx.choose_static(),
        is_final: ctx.choose_final(),
        ..SymbolFlags::default()
    };
    let args = ProductionArgs {
        is_static: flags.is_static,
        in_initializer: true,
        ..ProductionArgs::new(owner, limit - 1, ctx.policy.operator_limit)
    };
    let init = produce_expr(ctx, &ty, args)?;
    let field = VariableInfo {
        name,
        owner,
        ty,
        flags,
    };
    let node = new_node(
        ctx,
        NodeKind::VariableDeclaration(field.clone()),
        Type::Void,
        &args,
        vec![init],
    );
    let node = within_limit(ctx, node, limit)?;
    ctx.add_symbol(field);
    Ok((node, flags.is_static))
}

/// The public test class: fields, helper methods and the `test()` entry point, which gets
/// whatever budget the rest leaves.
pub fn produce_main_class(ctx: &mut Context, limit: usize) -> ProductionResult<NodeId> {
    let name = ctx.create_main_class_name();
    let id = ctx.types.register(&name, &[], ClassFlags::default());
    let (fields, instance_complexity) = produce_fields(ctx, id, limit / 4)?;
    ctx.add_symbol(constructor(id, false, instance_complexity));
    let mut used = ctx.tree.complexity(fields);

    let count = if ctx.policy.disable_functions {
        0
    } else {
        ctx.choose_count(ctx.policy.member_functions_limit)
    };
    let helpers_limit = limit.saturating_sub(used) / 2;
    let mut helpers_used = 0;
    let mut methods = vec![];
    for i in 0..count {
        let function_limit = helpers_limit.saturating_sub(helpers_used) / (count - i);
        if function_limit == 0 {
            break;
        }
        if let Ok(method) =
            ctx.attempt(|ctx| produce_function_definition(ctx, id, function_limit))
        {
            helpers_used += ctx.tree.complexity(method);
            methods.push(method);
        }
    }
    used += helpers_used;

    let test = FunctionInfo {
        name: "test".to_string(),
        owner: id,
        return_ty: Type::Void,
        args: vec![],
        flags: SymbolFlags::default(),
        complexity: 0,
    };
    let test = define_function(ctx, test, limit.saturating_sub(used))?;
    methods.push(test);
    let functions = ctx
        .tree
        .node(NodeKind::FunctionDefinitionBlock, Type::Void, id, 0, methods);
    let class = ctx
        .tree
        .node(NodeKind::MainKlass(id), Type::Void, id, 0, vec![fields, functions]);
    tracing::debug!(%name, "Produced main class");
    within_limit(ctx, class, limit).map_err(|err| {
        ProductionFailed::new(format!("main class {}: {}", name, err.0))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::ExternalSymbols;
    use crate::policy::{Policy, PolicyBuilder};

    fn ctx_with(policy: Policy, seed: u64) -> Context {
        Context::with_policy(seed, &policy, TypeEnvironment::default(), ExternalSymbols::default())
    }

    fn definitions(ctx: &Context, class: NodeId) -> Vec<FunctionInfo> {
        let functions = ctx.tree.children(class)[1];
        ctx.tree
            .children(functions)
            .iter()
            .filter_map(|method| match ctx.tree.kind(*method) {
                NodeKind::FunctionDefinition(info) => Some(info.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn main_class_ends_with_test() {
        for seed in 0..10 {
            let mut ctx = ctx_with(Policy::default(), seed);
            let class = produce_main_class(&mut ctx, 500).unwrap();
            let last = definitions(&ctx, class).pop().unwrap();
            assert_eq!(last.name, "test");
            assert!(last.return_ty.is_void());
            assert!(ctx.tree.complexity(class) <= 500);
        }
    }

    #[test]
    fn concrete_classes_implement_inherited_abstract_methods() {
        let policy = PolicyBuilder::from_policy(Policy::default())
            .interface_prob(0.5)
            .abstract_prob(0.5)
            .classes_limit(6)
            .build()
            .unwrap();
        for seed in 0..20 {
            let mut ctx = ctx_with(policy.clone(), seed);
            let block = match produce_class_definition_block(&mut ctx, 2000) {
                Ok(block) => block,
                Err(_) => continue,
            };
            for class in ctx.tree.children(block).to_vec() {
                let id = match ctx.tree.kind(class) {
                    NodeKind::Klass(id) => *id,
                    kind => panic!("unexpected {:?}", kind),
                };
                let info = ctx.types.class(id);
                if info.is_abstract || info.is_interface {
                    continue;
                }
                let implemented = definitions(&ctx, class);
                for function in unimplemented_functions(&ctx, id) {
                    assert!(
                        implemented
                            .iter()
                            .any(|own| own.has_same_signature(&function)),
                        "{} misses {}",
                        info.name,
                        function.name
                    );
                }
            }
        }
    }

    #[test]
    fn constructors_account_for_parents() {
        let mut ctx = ctx_with(Policy::default(), 0);
        let parent = ctx.types.register("Test_Klass_0", &[], ClassFlags::default());
        ctx.add_symbol(constructor(parent, false, 7));
        let child = ctx.types.register("Test_Klass_1", &[parent], ClassFlags::default());
        assert_eq!(parent_constructor_complexity(&ctx, child), 7);
        assert_eq!(parent_constructor_complexity(&ctx, parent), 0);
    }

    #[test]
    fn no_classes_without_budget() {
        let mut ctx = ctx_with(Policy::default(), 0);
        assert!(produce_class_definition_block(&mut ctx, 0).is_err());
    }
}
