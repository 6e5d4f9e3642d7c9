use crate::context::Context;
use crate::import::{ExternalSymbols, ImportBuilder, ImportError};
use crate::ir::tree::{IrTree, NodeId};
use crate::ir::visitor::Visitor;
use crate::ir::NodeKind;
use crate::policy::Policy;
use crate::production::klass::{produce_class_definition_block, produce_main_class};
use crate::production::{ProductionFailed, ProductionResult};
use crate::render::java::JavaEmitVisitor;
use crate::statistics::generation::GenerationStatistics;
use crate::statistics::program::ProgramStatistics;
use crate::statistics::visitor::StatisticsVisitor;
use crate::statistics::FullStatistics;
use crate::symbol_table::symbol::VariableInfo;
use crate::ty::env::TypeEnvironment;
use crate::ty::{Type, TypeId};
use rand::Rng;
use thiserror::Error;
use tracing::{debug, warn};

/// A finished program: the IR arena, the classes it declares and its two roots.
#[derive(Debug, Clone)]
pub struct GeneratedProgram {
    /// Name of the public class, and of the source file.
    pub name: String,
    pub seed: u64,
    pub tree: IrTree,
    pub types: TypeEnvironment,
    pub private_classes: Option<NodeId>,
    pub main: NodeId,
}

impl GeneratedProgram {
    pub fn roots(&self) -> Vec<NodeId> {
        self.private_classes
            .into_iter()
            .chain(std::iter::once(self.main))
            .collect()
    }

    pub fn complexity(&self) -> usize {
        self.roots()
            .into_iter()
            .map(|root| self.tree.complexity(root))
            .sum()
    }

    /// Deepest control-flow level over every method.
    pub fn cfg_depth(&self) -> usize {
        function_nodes(&self.tree, &self.roots())
            .into_iter()
            .map(|function| self.tree.count_depth(function))
            .max()
            .unwrap_or(0)
    }

    pub fn java_source(&self) -> String {
        let mut visitor = JavaEmitVisitor::new(&self.types);
        visitor.visit_program(self);
        visitor.output()
    }

    pub fn program_statistics(&self) -> ProgramStatistics {
        let mut visitor = StatisticsVisitor::default();
        visitor.visit_program(self);
        ProgramStatistics {
            complexity: self.complexity(),
            cfg_depth: self.cfg_depth(),
            ..visitor.into_statistics()
        }
    }
}

#[derive(Error, Debug)]
pub enum GeneratorError {
    #[error("Unable to generate a program for seed {seed} in {attempts} attempts")]
    Exhausted {
        seed: u64,
        attempts: usize,
        statistics: Box<GenerationStatistics>,
    },
    #[error(transparent)]
    Import(#[from] ImportError),
}

pub type GeneratorResult = Result<GeneratedProgram, GeneratorError>;

/// Generation session. Name counters keep counting across programs, so class names never
/// repeat within a session.
pub struct Generator {
    ctx: Context,
}

impl Generator {
    /// Session importing the built-in catalog.
    pub fn new(policy: &Policy) -> Result<Generator, GeneratorError> {
        Generator::with_import(policy, &ImportBuilder::builtin()?)
    }

    /// Session importing what `import` selects.
    pub fn with_import(policy: &Policy, import: &ImportBuilder) -> Result<Generator, GeneratorError> {
        let mut types = TypeEnvironment::new(&policy.name_prefix);
        let externals = import.import(&mut types)?;
        Ok(Generator::with_externals(policy, types, externals))
    }

    /// Session over an already imported environment.
    pub fn with_externals(
        policy: &Policy,
        types: TypeEnvironment,
        externals: ExternalSymbols,
    ) -> Generator {
        Generator {
            ctx: Context::with_policy(0, policy, types, externals),
        }
    }

    pub fn policy(&self) -> &Policy {
        &self.ctx.policy
    }

    pub fn statistics(&self) -> &GenerationStatistics {
        &self.ctx.statistics
    }

    pub fn take_statistics(&mut self) -> GenerationStatistics {
        std::mem::take(&mut self.ctx.statistics)
    }

    pub fn full_statistics(&mut self, program: &GeneratedProgram) -> FullStatistics {
        FullStatistics {
            generation_statistics: self.take_statistics(),
            program_statistics: program.program_statistics(),
        }
    }

    pub fn generate(&mut self, seed: u64) -> GeneratorResult {
        let attempts = self.ctx.policy.max_generation_attempts;
        self.ctx.reset(seed);
        for attempt in 0..attempts {
            if attempt > 0 {
                self.ctx.statistics.discarded_programs += 1;
                self.ctx.clear();
            }
            match self.generate_once(seed) {
                Ok(program) => {
                    debug!(
                        seed,
                        attempt,
                        name = %program.name,
                        complexity = program.complexity(),
                        "Generated program"
                    );
                    return Ok(program);
                }
                Err(err) => debug!(seed, attempt, reason = %err.0, "Discarded program"),
            }
        }
        Err(GeneratorError::Exhausted {
            seed,
            attempts,
            statistics: Box::new(self.ctx.statistics.clone()),
        })
    }

    fn generate_once(&mut self, seed: u64) -> ProductionResult<GeneratedProgram> {
        let ctx = &mut self.ctx;
        let limit = ctx.policy.complexity_limit;
        let fraction: f64 = ctx.rng.gen();
        let private_limit = (limit as f64 * fraction) as usize;
        let private_classes = if ctx.policy.classes_limit > 0
            && !ctx.policy.disable_classes
            && private_limit > 0
        {
            ctx.attempt(|ctx| produce_class_definition_block(ctx, private_limit))
                .ok()
        } else {
            None
        };
        let private_complexity = private_classes.map_or(0, |id| ctx.tree.complexity(id));
        let main = ctx.attempt(|ctx| produce_main_class(ctx, limit - private_complexity))?;

        let roots: Vec<NodeId> = private_classes.into_iter().chain([main]).collect();
        let functions = function_nodes(&ctx.tree, &roots);
        let max_depth = ctx.policy.max_cfg_depth;
        if !ctx.tree.try_to_reduce_nodes_depth(&functions, max_depth) {
            warn!(seed, max_depth, "Unable to reduce control-flow depth");
        }
        let depth = functions
            .iter()
            .map(|function| ctx.tree.count_depth(*function))
            .max()
            .unwrap_or(0);
        if depth < ctx.policy.min_cfg_depth {
            return Err(ProductionFailed::new(format!(
                "control-flow depth {} below {}",
                depth, ctx.policy.min_cfg_depth
            )));
        }

        let main_class = match ctx.tree.kind(main) {
            NodeKind::MainKlass(id) => *id,
            _ => return Err(ProductionFailed::new("main class missing")),
        };
        inject_entry_points(&mut ctx.tree, main, main_class);

        Ok(GeneratedProgram {
            name: ctx.types.class(main_class).name.clone(),
            seed,
            tree: std::mem::take(&mut ctx.tree),
            types: ctx.types.clone(),
            private_classes,
            main,
        })
    }
}

/// Every method definition below `roots`.
pub fn function_nodes(tree: &IrTree, roots: &[NodeId]) -> Vec<NodeId> {
    roots
        .iter()
        .flat_map(|root| tree.descendants(*root))
        .filter(|id| matches!(tree.kind(*id), NodeKind::FunctionDefinition(_)))
        .collect()
}

/// Appends `print()` over the fields of the main class and `main(String[])`.
fn inject_entry_points(tree: &mut IrTree, main: NodeId, owner: TypeId) {
    let (fields, functions) = match tree.children(main) {
        [fields, functions] => (*fields, *functions),
        _ => panic!("Main class without member blocks"),
    };
    let printed: Vec<VariableInfo> = tree
        .children(fields)
        .iter()
        .filter_map(|field| match tree.kind(*field) {
            NodeKind::VariableDeclaration(var) => Some(var.clone()),
            _ => None,
        })
        .collect();
    let print = tree.node(NodeKind::PrintVariables(printed), Type::Void, owner, 0, vec![]);
    tree.add_child(functions, print);
    let entry = tree.node(NodeKind::MainMethod, Type::Void, owner, 0, vec![]);
    tree.add_child(functions, entry);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::PolicyBuilder;

    #[test]
    fn generation_is_deterministic() {
        let policy = PolicyBuilder::from_policy(Policy::default())
            .complexity_limit(2000)
            .build()
            .unwrap();
        let first = Generator::new(&policy).unwrap().generate(17).unwrap();
        let second = Generator::new(&policy).unwrap().generate(17).unwrap();
        assert_eq!(first.java_source(), second.java_source());
    }

    #[test]
    fn complexity_stays_within_the_limit() {
        let policy = PolicyBuilder::from_policy(Policy::default())
            .complexity_limit(1500)
            .build()
            .unwrap();
        let mut generator = Generator::new(&policy).unwrap();
        for seed in 0..10 {
            let program = generator.generate(seed).unwrap();
            assert!(program.complexity() <= 1500, "seed {}", seed);
        }
    }

    #[test]
    fn default_preset_over_many_seeds() {
        let policy = Policy::default();
        let mut generator = Generator::new(&policy).unwrap();
        for seed in 0..50 {
            let program = generator.generate(seed).unwrap();
            assert!(program.complexity() <= policy.complexity_limit, "seed {}", seed);
        }
    }

    #[test]
    fn main_class_gets_entry_points() {
        let mut generator = Generator::new(&Policy::default()).unwrap();
        let program = generator.generate(1).unwrap();
        let functions = program.tree.children(program.main)[1];
        let kinds: Vec<&NodeKind> = program
            .tree
            .children(functions)
            .iter()
            .map(|id| program.tree.kind(*id))
            .collect();
        assert!(matches!(kinds[kinds.len() - 2], NodeKind::PrintVariables(_)));
        assert_eq!(*kinds[kinds.len() - 1], NodeKind::MainMethod);
    }

    #[test]
    fn names_do_not_repeat_within_a_session() {
        let mut generator = Generator::new(&Policy::default()).unwrap();
        let first = generator.generate(3).unwrap();
        let second = generator.generate(3).unwrap();
        assert_ne!(first.name, second.name);
    }

    #[test]
    fn unreachable_minimum_depth_exhausts() {
        let policy = PolicyBuilder::from_policy(Policy::default())
            .complexity_limit(50)
            .min_cfg_depth(3)
            .max_cfg_depth(3)
            .max_generation_attempts(2)
            .disable_if(true)
            .disable_switch(true)
            .disable_for(true)
            .disable_while(true)
            .disable_do_while(true)
            .disable_nested_blocks(true)
            .build()
            .unwrap();
        let mut generator = Generator::new(&policy).unwrap();
        match generator.generate(0) {
            Err(GeneratorError::Exhausted { attempts, statistics, .. }) => {
                assert_eq!(attempts, 2);
                assert_eq!(statistics.discarded_programs, 1);
            }
            res => panic!("unexpected {:?}", res.map(|program| program.name)),
        }
    }
}
