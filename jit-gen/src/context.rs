use crate::distribution::Distribution;
use crate::import::ExternalSymbols;
use crate::ir::tree::IrTree;
use crate::policy::Policy;
use crate::production::{ExprKind, ProductionResult, StmtKind, TyKind};
use crate::statistics::generation::GenerationStatistics;
use crate::symbol_table::symbol::Symbol;
use crate::symbol_table::SymbolTable;
use crate::ty::env::TypeEnvironment;
use crate::ty::PrimTy;
use rand::prelude::{SliceRandom, StdRng};
use rand::{Rng, SeedableRng};

/// State shared by every production of a generation session.
pub struct Context {
    pub policy: Policy,
    pub rng: StdRng,
    pub types: TypeEnvironment,
    pub symbols: SymbolTable,
    pub tree: IrTree,
    pub name_handler: NameHandler,
    pub statistics: GenerationStatistics,
    pub externals: ExternalSymbols,
}

impl Context {
    /// `types` must already hold every class `externals` refers to.
    pub fn with_policy(
        seed: u64,
        policy: &Policy,
        types: TypeEnvironment,
        externals: ExternalSymbols,
    ) -> Context {
        let mut ctx = Context {
            policy: policy.clone(),
            rng: StdRng::seed_from_u64(seed),
            types,
            symbols: SymbolTable::default(),
            tree: IrTree::default(),
            name_handler: NameHandler::default(),
            statistics: GenerationStatistics::default(),
            externals,
        };
        ctx.reset(seed);
        ctx
    }

    /// Reseeds and forgets everything generated so far.
    pub fn reset(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
        self.clear();
    }

    /// Forgets everything generated so far without touching the random state. Imported types
    /// and the selected external symbols are kept, name counters keep counting.
    pub fn clear(&mut self) {
        self.types.reset_to_builtins();
        self.tree = IrTree::default();
        let initial = if self.policy.disable_external_symbols {
            vec![]
        } else {
            self.externals
                .selected(&self.types, &self.policy.external_symbols)
        };
        self.symbols.remove_all(initial);
    }

    /// Runs `f` as a transaction: symbols it declares are committed on success, on failure
    /// its symbols, IR nodes and classes are rolled back.
    pub fn attempt<T, F>(&mut self, f: F) -> ProductionResult<T>
    where
        F: FnOnce(&mut Context) -> ProductionResult<T>,
    {
        let nodes = self.tree.len();
        let types = self.types.len();
        self.symbols.push();
        let res = f(self);
        match res {
            Ok(_) => self.symbols.merge(),
            Err(_) => {
                self.symbols.pop();
                self.tree.truncate(nodes);
                self.types.truncate(types);
            }
        }
        res
    }

    /// Runs `f` in a lexical scope. Symbols it declares are dropped afterwards.
    pub fn scoped<T, F>(&mut self, f: F) -> T
    where
        F: FnOnce(&mut Context) -> T,
    {
        self.symbols.push();
        let res = f(self);
        self.symbols.pop();
        res
    }

    pub fn add_symbol<S: Into<Symbol>>(&mut self, symbol: S) {
        self.symbols.add(symbol.into());
    }
}

pub fn choose<T: Clone>(dist: &[(T, f64)], rng: &mut StdRng) -> Option<T> {
    dist.choose_weighted(rng, |item| item.1)
        .ok()
        .map(|item| item.0.clone())
}

impl Context {
    pub fn choose_stmt_kinds(&self) -> Vec<(StmtKind, f64)> {
        let policy = &self.policy;
        policy
            .stmt_dist
            .iter()
            .filter(|(kind, _)| match kind {
                StmtKind::If => !policy.disable_if,
                StmtKind::Switch => !policy.disable_switch,
                StmtKind::For => !policy.disable_for,
                StmtKind::While => !policy.disable_while,
                StmtKind::DoWhile => !policy.disable_do_while,
                StmtKind::Block => !policy.disable_nested_blocks,
                StmtKind::VariableDeclaration | StmtKind::Expression => true,
            })
            .copied()
            .collect()
    }

    pub fn choose_expr_kinds(&self) -> Vec<(ExprKind, f64)> {
        let policy = &self.policy;
        policy
            .expr_dist
            .iter()
            .filter(|(kind, _)| match kind {
                ExprKind::ArrayCreation | ExprKind::ArrayElement => !policy.disable_arrays,
                ExprKind::ConstructorCall => !policy.disable_classes,
                _ => true,
            })
            .copied()
            .collect()
    }

    pub fn choose_ty_kind(&mut self) -> Option<TyKind> {
        let policy = &self.policy;
        let dist: Vec<(TyKind, f64)> = policy
            .type_dist
            .iter()
            .filter(|(kind, _)| match kind {
                TyKind::Array => !policy.disable_arrays && policy.dimensions_limit > 0,
                _ => true,
            })
            .copied()
            .collect();
        choose(&dist, &mut self.rng)
    }

    pub fn choose_prim_type(&mut self) -> Option<PrimTy> {
        choose(&self.policy.prim_type_dist, &mut self.rng)
    }

    /// Numeric primitive from the primitive distribution.
    pub fn choose_numeric_type(&mut self) -> Option<PrimTy> {
        let dist: Vec<(PrimTy, f64)> = self
            .policy
            .prim_type_dist
            .iter()
            .filter(|(prim, _)| prim.is_numeric())
            .copied()
            .collect();
        choose(&dist, &mut self.rng)
    }

    pub fn choose_num_stmts(&mut self) -> usize {
        Distribution::up_to(self.policy.statement_limit).sample(&mut self.rng)
    }

    pub fn choose_loop_iterations(&mut self) -> usize {
        Distribution::up_to(self.policy.loop_iterations_limit).sample(&mut self.rng)
    }

    pub fn choose_array_length(&mut self) -> usize {
        Distribution::up_to(self.policy.array_length_limit).sample(&mut self.rng)
    }

    pub fn choose_dimensions(&mut self) -> usize {
        Distribution::up_to(self.policy.dimensions_limit).sample(&mut self.rng)
    }

    pub fn choose_count(&mut self, limit: usize) -> usize {
        Distribution::new_uniform_inclusive(0, limit).sample(&mut self.rng)
    }

    /// Draws `true` with probability `prob`.
    pub fn choose_prob(&mut self, prob: f64) -> bool {
        self.rng.gen_bool(prob.clamp(0.0, 1.0))
    }

    pub fn choose_static(&mut self) -> bool {
        !self.policy.disable_static && self.choose_prob(self.policy.static_prob)
    }

    pub fn choose_final(&mut self) -> bool {
        !self.policy.disable_final && self.choose_prob(self.policy.final_prob)
    }

    pub fn choose_private(&mut self) -> bool {
        self.choose_prob(self.policy.private_prob)
    }

    pub fn choose_else(&mut self) -> bool {
        self.choose_prob(self.policy.else_prob)
    }

    pub fn choose_default_case(&mut self) -> bool {
        self.choose_prob(self.policy.default_case_prob)
    }

    pub fn choose_jump(&mut self) -> bool {
        self.choose_prob(self.policy.jump_prob)
    }

    pub fn create_var_name(&mut self) -> String {
        self.name_handler.create_var_name()
    }

    pub fn create_function_name(&mut self) -> String {
        self.name_handler.create_function_name()
    }

    pub fn create_class_name(&mut self) -> String {
        let prefix = self.policy.name_prefix.clone();
        self.name_handler.create_class_name(&prefix)
    }

    pub fn create_main_class_name(&mut self) -> String {
        let prefix = self.policy.name_prefix.clone();
        self.name_handler.create_main_class_name(&prefix)
    }
}

/// Monotonic counters behind every generated identifier.
#[derive(Debug, Default, Clone)]
pub struct NameHandler {
    var_counter: usize,
    function_counter: usize,
    class_counter: usize,
    main_counter: usize,
}

impl NameHandler {
    fn create_var_name(&mut self) -> String {
        let res = format!("var_{}", self.var_counter);
        self.var_counter += 1;
        res
    }

    fn create_function_name(&mut self) -> String {
        let res = format!("func_{}", self.function_counter);
        self.function_counter += 1;
        res
    }

    fn create_class_name(&mut self, prefix: &str) -> String {
        let res = format!("{}Klass_{}", prefix, self.class_counter);
        self.class_counter += 1;
        res
    }

    fn create_main_class_name(&mut self, prefix: &str) -> String {
        let res = format!("{}{}", prefix, self.main_counter);
        self.main_counter += 1;
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Literal, NodeKind};
    use crate::production::ProductionFailed;
    use crate::symbol_table::symbol::{SymbolFlags, VariableInfo};
    use crate::ty::{ClassFlags, Type};

    fn ctx() -> Context {
        Context::with_policy(
            7,
            &Policy::default(),
            TypeEnvironment::default(),
            ExternalSymbols::default(),
        )
    }

    fn local(name: &str) -> VariableInfo {
        VariableInfo {
            name: name.to_string(),
            owner: TypeEnvironment::OBJECT,
            ty: PrimTy::Int.into(),
            flags: SymbolFlags::local(),
        }
    }

    #[test]
    fn failed_attempt_rolls_back() {
        let mut ctx = ctx();
        let types = ctx.types.len();
        let res: ProductionResult<()> = ctx.attempt(|ctx| {
            ctx.add_symbol(local("var_0"));
            ctx.types
                .register("Test_Klass_0", &[], ClassFlags::default());
            ctx.tree.node(
                NodeKind::Literal(Literal::Boolean(true)),
                PrimTy::Boolean.into(),
                TypeEnvironment::OBJECT,
                0,
                vec![],
            );
            Err(ProductionFailed::new("nope"))
        });
        assert!(res.is_err());
        assert!(ctx.tree.is_empty());
        assert_eq!(ctx.types.len(), types);
        assert!(ctx.symbols.get_by_name("var_0", |_| true).is_empty());
        assert_eq!(ctx.symbols.depth(), 1);
    }

    #[test]
    fn successful_attempt_commits() {
        let mut ctx = ctx();
        ctx.attempt(|ctx| {
            ctx.add_symbol(local("var_0"));
            Ok(())
        })
        .unwrap();
        assert_eq!(ctx.symbols.get(&Type::Prim(PrimTy::Int), |_| true).len(), 1);
    }

    #[test]
    fn scope_drops_locals() {
        let mut ctx = ctx();
        ctx.scoped(|ctx| ctx.add_symbol(local("var_0")));
        assert!(ctx.symbols.get_by_name("var_0", |_| true).is_empty());
    }

    #[test]
    fn names_are_unique() {
        let mut ctx = ctx();
        assert_eq!(ctx.create_var_name(), "var_0");
        assert_eq!(ctx.create_var_name(), "var_1");
        assert_eq!(ctx.create_class_name(), "Test_Klass_0");
        assert_eq!(ctx.create_main_class_name(), "Test_0");
        ctx.reset(1);
        assert_eq!(ctx.create_var_name(), "var_2");
    }
}
