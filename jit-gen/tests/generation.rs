use jit_gen::generator::{GeneratedProgram, Generator};
use jit_gen::ir::NodeKind;
use jit_gen::policy::{Policy, PolicyBuilder};
use jit_gen::runtime::backend::{Backend, CancellationToken};
use jit_gen::runtime::java::JavaBackend;
use jit_gen::seed::{iteration_seed, parse_seed};
use std::collections::BTreeSet;
use std::process::Command;

fn generate(policy: &Policy, seed: u64) -> GeneratedProgram {
    Generator::new(policy).unwrap().generate(seed).unwrap()
}

#[test]
fn no_classes_means_no_private_subtree() {
    let policy = PolicyBuilder::from_policy(Policy::default())
        .complexity_limit(10000)
        .classes_limit(0)
        .build()
        .unwrap();
    let program = generate(&policy, parse_seed("S1"));
    assert!(program.private_classes.is_none());
    assert!(program.tree.complexity(program.main) <= 10000);
    assert!(!program.java_source().contains("class Test_Klass_"));
}

#[test]
fn same_seed_same_source() {
    let policy = Policy::default();
    let run_seed = parse_seed("determinism");
    for iteration in 0..5 {
        let seed = iteration_seed(run_seed, iteration, None);
        assert_eq!(
            generate(&policy, seed).java_source(),
            generate(&policy, seed).java_source()
        );
    }
}

#[test]
fn presets_respect_their_budget() {
    for name in ["default", "expressions", "classes", "arrays"] {
        let policy = Policy::get_policy(name).unwrap();
        let mut generator = Generator::new(&policy).unwrap();
        for seed in 0..3 {
            let program = generator.generate(seed).unwrap();
            assert!(
                program.complexity() <= policy.complexity_limit,
                "{} seed {}: {}",
                name,
                seed,
                program.complexity()
            );
            let source = program.java_source();
            assert!(source.contains(&format!("public class {} {{", program.name)));
        }
    }
}

#[test]
fn classes_are_declared_once() {
    let policy = Policy::get_policy("classes").unwrap();
    let program = generate(&policy, 21);
    let mut names = BTreeSet::new();
    for id in program.roots() {
        for node in program.tree.descendants(id) {
            if let NodeKind::Klass(class) | NodeKind::MainKlass(class) = program.tree.kind(node) {
                assert!(names.insert(*class), "{:?} declared twice", class);
            }
        }
    }
    assert!(!names.is_empty());
}

#[test]
fn statistics_describe_the_program() {
    let mut generator = Generator::new(&Policy::default()).unwrap();
    let program = generator.generate(8).unwrap();
    let statistics = generator.full_statistics(&program);
    let program_statistics = statistics.program_statistics;
    assert_eq!(program_statistics.complexity, program.complexity());
    assert_eq!(program_statistics.node_counter["MainKlass"], 1);
    assert_eq!(program_statistics.node_counter["MainMethod"], 1);
    assert_eq!(
        program_statistics.total_nodes,
        program_statistics.node_counter.values().sum::<usize>()
    );
    assert!(statistics.generation_statistics.total_successes() > 0);
}

#[test]
fn every_preset_generates_over_many_seeds() {
    for policy in Policy::get_policies() {
        let mut generator = Generator::new(&policy).unwrap();
        for seed in 1..=15 {
            let program = match generator.generate(seed) {
                Ok(program) => program,
                Err(err) => panic!("{} seed {}: {}", policy.name, seed, err),
            };
            assert!(program.complexity() <= policy.complexity_limit);
            assert!(!program.java_source().is_empty());
        }
    }
}

fn has_tool(tool: &str) -> bool {
    Command::new(tool)
        .arg("-version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

#[test]
fn generated_programs_compile_and_run() {
    if !has_tool("javac") || !has_tool("java") {
        eprintln!("Skipping, javac or java not found");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let backend = JavaBackend::new(dir.path());
    for policy in Policy::get_policies() {
        let mut generator = Generator::new(&policy).unwrap();
        for seed in 1..=4 {
            let program = generator.generate(seed).unwrap();
            let first = backend.run(&program, &CancellationToken::new());
            let first = match first {
                Ok(golden) => golden,
                Err(err) => panic!("{} seed {}: {}", policy.name, seed, err),
            };
            let second = backend.run(&program, &CancellationToken::new()).unwrap();
            assert_eq!(first.stdout, second.stdout, "{} seed {}", policy.name, seed);
        }
    }
}
