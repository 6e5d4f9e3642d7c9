use crate::import::ExternalSymbolSelector;
use crate::production::{ExprKind, StmtKind, TyKind};
use crate::ty::PrimTy;
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[builder(custom_constructor, build_fn(private, name = "fallible_build"))]
pub struct Policy {
    /// Unique identifier for policy.
    pub name: String,

    /// Max attempts for generating a whole program before giving up on an iteration.
    pub max_generation_attempts: usize,

    // Budgets
    /// Upper bound of the complexity of a program.
    pub complexity_limit: usize,
    /// Max statements in a block.
    pub statement_limit: usize,
    /// Max operators nested in a single expression.
    pub operator_limit: usize,
    /// Max private classes.
    pub classes_limit: usize,
    /// Max new methods per class.
    pub member_functions_limit: usize,
    /// Max arguments of a method.
    pub member_functions_args_limit: usize,
    /// Max fields per class.
    pub data_members_limit: usize,
    /// Max interfaces implemented by a class.
    pub implementation_limit: usize,
    /// Max dimensions of an array.
    pub dimensions_limit: usize,
    /// Max length of each array dimension.
    pub array_length_limit: usize,
    /// Max iterations of a loop.
    pub loop_iterations_limit: usize,
    /// Max labelled cases of a switch.
    pub switch_cases_limit: usize,
    /// Max characters of a string literal.
    pub string_literal_size_limit: usize,
    /// Programs shallower than this are regenerated.
    pub min_cfg_depth: usize,
    /// Control-flow depth methods are pruned to.
    pub max_cfg_depth: usize,

    // Distributions
    /// Distribution of statement kinds.
    pub stmt_dist: Vec<(StmtKind, f64)>,
    /// Distribution of expression kinds.
    pub expr_dist: Vec<(ExprKind, f64)>,
    /// Distribution of type kinds of declarations.
    pub type_dist: Vec<(TyKind, f64)>,
    /// Distribution of primitive types.
    pub prim_type_dist: Vec<(PrimTy, f64)>,

    // Probabilities
    /// Probability of an if statement having an else branch.
    pub else_prob: f64,
    /// Probability of a switch having a default case.
    pub default_case_prob: f64,
    /// Probability of a loop body (or an if inside one) ending with break or continue.
    pub jump_prob: f64,
    /// Probability of a member being static.
    pub static_prob: f64,
    /// Probability of a variable being final.
    pub final_prob: f64,
    /// Probability of a member being private.
    pub private_prob: f64,
    /// Probability of a private class being an interface.
    pub interface_prob: f64,
    /// Probability of a class being abstract.
    pub abstract_prob: f64,
    /// Probability of a concrete class being final.
    pub final_class_prob: f64,

    // Constructs
    pub disable_if: bool,
    pub disable_switch: bool,
    pub disable_for: bool,
    pub disable_while: bool,
    pub disable_do_while: bool,
    pub disable_functions: bool,
    pub disable_arrays: bool,
    pub disable_classes: bool,
    pub disable_inheritance: bool,
    pub disable_interfaces: bool,
    pub disable_static: bool,
    pub disable_final: bool,
    pub disable_nested_blocks: bool,
    pub disable_external_symbols: bool,

    /// Imported classes whose members may be used.
    pub external_symbols: ExternalSymbolSelector,
    /// Prefix of every generated class name.
    pub name_prefix: String,
}

#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("Invalid policy {name}, choose from {available:?} or give a policy file")]
    Unknown { name: String, available: Vec<String> },
    #[error("Unable to read policy file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Unable to parse policy file {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },
    #[error(transparent)]
    Invalid(#[from] PolicyBuilderError),
}

impl Policy {
    pub fn get_policies() -> Vec<Policy> {
        vec![
            Policy::default(),
            Policy::expressions(),
            Policy::control_flow(),
            Policy::classes(),
            Policy::arrays(),
            Policy::stress(),
        ]
    }

    pub fn get_policy_names() -> Vec<String> {
        Policy::get_policies()
            .iter()
            .map(|p| p.name.clone())
            .collect::<Vec<String>>()
    }

    pub fn get_policy(name: &str) -> Option<Policy> {
        Policy::get_policies()
            .iter()
            .find(|p| p.name == name)
            .cloned()
    }

    /// Resolves a preset name or a RON policy file, falling back to the default policy.
    pub fn parse_policy_args(policy: &Option<String>) -> Result<Policy, PolicyError> {
        let policy = match policy {
            None => return Ok(Policy::default()),
            Some(policy) => policy,
        };
        if let Some(preset) = Policy::get_policy(policy) {
            return Ok(preset);
        }
        if Path::new(policy).is_file() {
            return Policy::from_file(policy);
        }
        Err(PolicyError::Unknown {
            name: policy.clone(),
            available: Policy::get_policy_names(),
        })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Policy, PolicyError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| PolicyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let policy: Policy = ron::from_str(&contents).map_err(|err| PolicyError::Parse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        Ok(PolicyBuilder::from_policy(policy).build()?)
    }

    pub fn expressions() -> Policy {
        PolicyBuilder::from_policy(Policy::default())
            .name("expressions".to_owned())
            .classes_limit(0)
            .disable_classes(true)
            .operator_limit(12)
            .stmt_dist(vec![
                (StmtKind::VariableDeclaration, 4.0),
                (StmtKind::Expression, 4.0),
                (StmtKind::If, 0.5),
            ])
            .expr_dist(vec![
                (ExprKind::Literal, 2.0),
                (ExprKind::Variable, 3.0),
                (ExprKind::Binary, 5.0),
                (ExprKind::Unary, 2.0),
                (ExprKind::Cast, 2.0),
                (ExprKind::Ternary, 1.0),
                (ExprKind::Assignment, 2.0),
                (ExprKind::FunctionCall, 1.0),
            ])
            .build()
            .unwrap()
    }

    pub fn control_flow() -> Policy {
        PolicyBuilder::from_policy(Policy::default())
            .name("control_flow".to_owned())
            .classes_limit(1)
            .min_cfg_depth(2)
            .max_cfg_depth(4)
            .jump_prob(0.3)
            .stmt_dist(vec![
                (StmtKind::VariableDeclaration, 2.0),
                (StmtKind::Expression, 2.0),
                (StmtKind::If, 2.0),
                (StmtKind::Switch, 1.0),
                (StmtKind::For, 1.5),
                (StmtKind::While, 1.0),
                (StmtKind::DoWhile, 1.0),
                (StmtKind::Block, 0.5),
            ])
            .build()
            .unwrap()
    }

    pub fn classes() -> Policy {
        PolicyBuilder::from_policy(Policy::default())
            .name("classes".to_owned())
            .classes_limit(8)
            .member_functions_limit(5)
            .data_members_limit(5)
            .interface_prob(0.25)
            .abstract_prob(0.3)
            .type_dist(vec![
                (TyKind::Prim, 3.0),
                (TyKind::String, 0.5),
                (TyKind::Class, 3.0),
                (TyKind::Array, 0.5),
            ])
            .build()
            .unwrap()
    }

    pub fn arrays() -> Policy {
        PolicyBuilder::from_policy(Policy::default())
            .name("arrays".to_owned())
            .dimensions_limit(3)
            .array_length_limit(6)
            .type_dist(vec![(TyKind::Prim, 2.0), (TyKind::Array, 3.0)])
            .expr_dist(vec![
                (ExprKind::Literal, 2.0),
                (ExprKind::Variable, 3.0),
                (ExprKind::Binary, 2.0),
                (ExprKind::ArrayCreation, 2.0),
                (ExprKind::ArrayElement, 4.0),
                (ExprKind::Assignment, 1.0),
            ])
            .build()
            .unwrap()
    }

    pub fn stress() -> Policy {
        PolicyBuilder::from_policy(Policy::default())
            .name("stress".to_owned())
            .complexity_limit(50000)
            .statement_limit(20)
            .operator_limit(10)
            .classes_limit(10)
            .loop_iterations_limit(32)
            .max_cfg_depth(5)
            .build()
            .unwrap()
    }

    fn default_with_name(name: &str) -> Self {
        Policy {
            name: name.to_string(),
            max_generation_attempts: 20,
            complexity_limit: 10000,
            statement_limit: 8,
            operator_limit: 5,
            classes_limit: 4,
            member_functions_limit: 3,
            member_functions_args_limit: 3,
            data_members_limit: 3,
            implementation_limit: 2,
            dimensions_limit: 2,
            array_length_limit: 4,
            loop_iterations_limit: 8,
            switch_cases_limit: 4,
            string_literal_size_limit: 8,
            min_cfg_depth: 0,
            max_cfg_depth: 3,
            stmt_dist: vec![
                (StmtKind::VariableDeclaration, 4.0),
                (StmtKind::Expression, 4.0),
                (StmtKind::If, 1.5),
                (StmtKind::Switch, 0.5),
                (StmtKind::For, 1.0),
                (StmtKind::While, 0.5),
                (StmtKind::DoWhile, 0.5),
                (StmtKind::Block, 0.3),
            ],
            expr_dist: vec![
                (ExprKind::Literal, 4.0),
                (ExprKind::Variable, 4.0),
                (ExprKind::FieldAccess, 1.0),
                (ExprKind::Binary, 3.0),
                (ExprKind::Unary, 1.0),
                (ExprKind::Cast, 1.0),
                (ExprKind::Ternary, 0.5),
                (ExprKind::FunctionCall, 1.5),
                (ExprKind::ConstructorCall, 1.0),
                (ExprKind::ArrayCreation, 1.0),
                (ExprKind::ArrayElement, 1.0),
                (ExprKind::Assignment, 1.0),
            ],
            type_dist: vec![
                (TyKind::Prim, 6.0),
                (TyKind::String, 0.5),
                (TyKind::Class, 1.0),
                (TyKind::Array, 0.5),
            ],
            prim_type_dist: vec![
                (PrimTy::Boolean, 1.0),
                (PrimTy::Byte, 0.5),
                (PrimTy::Char, 0.5),
                (PrimTy::Short, 0.5),
                (PrimTy::Int, 3.0),
                (PrimTy::Long, 1.5),
                (PrimTy::Float, 1.0),
                (PrimTy::Double, 1.0),
            ],
            else_prob: 0.5,
            default_case_prob: 0.5,
            jump_prob: 0.1,
            static_prob: 0.3,
            final_prob: 0.2,
            private_prob: 0.2,
            interface_prob: 0.15,
            abstract_prob: 0.15,
            final_class_prob: 0.15,
            disable_if: false,
            disable_switch: false,
            disable_for: false,
            disable_while: false,
            disable_do_while: false,
            disable_functions: false,
            disable_arrays: false,
            disable_classes: false,
            disable_inheritance: false,
            disable_interfaces: false,
            disable_static: false,
            disable_final: false,
            disable_nested_blocks: false,
            disable_external_symbols: false,
            external_symbols: ExternalSymbolSelector::All,
            name_prefix: "Test_".to_string(),
        }
    }
}

impl Default for Policy {
    fn default() -> Self {
        Policy::default_with_name("default")
    }
}

impl PolicyBuilder {
    pub fn build(&self) -> Result<Policy, PolicyBuilderError> {
        let policy = self.fallible_build()?;
        if policy.max_generation_attempts == 0 {
            return Err(PolicyBuilderError::ValidationError(
                "Max generation attempts must be greater than 0.".to_string(),
            ));
        }
        if policy.min_cfg_depth > policy.max_cfg_depth {
            return Err(PolicyBuilderError::ValidationError(
                "Min CFG depth must not exceed max CFG depth.".to_string(),
            ));
        }
        if policy.name_prefix.is_empty() {
            return Err(PolicyBuilderError::ValidationError(
                "Name prefix must not be empty.".to_string(),
            ));
        }
        Ok(policy)
    }

    pub fn from_policy(policy: Policy) -> PolicyBuilder {
        PolicyBuilder {
            name: Some(policy.name),
            max_generation_attempts: Some(policy.max_generation_attempts),
            complexity_limit: Some(policy.complexity_limit),
            statement_limit: Some(policy.statement_limit),
            operator_limit: Some(policy.operator_limit),
            classes_limit: Some(policy.classes_limit),
            member_functions_limit: Some(policy.member_functions_limit),
            member_functions_args_limit: Some(policy.member_functions_args_limit),
            data_members_limit: Some(policy.data_members_limit),
            implementation_limit: Some(policy.implementation_limit),
            dimensions_limit: Some(policy.dimensions_limit),
            array_length_limit: Some(policy.array_length_limit),
            loop_iterations_limit: Some(policy.loop_iterations_limit),
            switch_cases_limit: Some(policy.switch_cases_limit),
            string_literal_size_limit: Some(policy.string_literal_size_limit),
            min_cfg_depth: Some(policy.min_cfg_depth),
            max_cfg_depth: Some(policy.max_cfg_depth),
            stmt_dist: Some(policy.stmt_dist),
            expr_dist: Some(policy.expr_dist),
            type_dist: Some(policy.type_dist),
            prim_type_dist: Some(policy.prim_type_dist),
            else_prob: Some(policy.else_prob),
            default_case_prob: Some(policy.default_case_prob),
            jump_prob: Some(policy.jump_prob),
            static_prob: Some(policy.static_prob),
            final_prob: Some(policy.final_prob),
            private_prob: Some(policy.private_prob),
            interface_prob: Some(policy.interface_prob),
            abstract_prob: Some(policy.abstract_prob),
            final_class_prob: Some(policy.final_class_prob),
            disable_if: Some(policy.disable_if),
            disable_switch: Some(policy.disable_switch),
            disable_for: Some(policy.disable_for),
            disable_while: Some(policy.disable_while),
            disable_do_while: Some(policy.disable_do_while),
            disable_functions: Some(policy.disable_functions),
            disable_arrays: Some(policy.disable_arrays),
            disable_classes: Some(policy.disable_classes),
            disable_inheritance: Some(policy.disable_inheritance),
            disable_interfaces: Some(policy.disable_interfaces),
            disable_static: Some(policy.disable_static),
            disable_final: Some(policy.disable_final),
            disable_nested_blocks: Some(policy.disable_nested_blocks),
            disable_external_symbols: Some(policy.disable_external_symbols),
            external_symbols: Some(policy.external_symbols),
            name_prefix: Some(policy.name_prefix),
        }
    }
}
