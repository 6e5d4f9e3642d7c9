use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use jit_gen::generator::Generator;
use jit_gen::import::ImportBuilder;
use jit_gen::policy::Policy;
use jit_gen::runtime::backend::Backend;
use jit_gen::runtime::java::JavaBackend;
use jit_gen::runtime::run::{IterationResult, Runner};
use jit_gen::seed::{parse_seed, random_seed};
use jit_gen::utils::write_as_ron;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    #[clap(
        short,
        long,
        help = "Number of programs to be generated and run [default: unbounded].",
        default_value = "0"
    )]
    num_runs: u64,
    #[clap(short, long, help = "Run seed, a number or any text.")]
    seed: Option<String>,
    #[clap(long, help = "Seed used by every iteration instead of a derived one.")]
    fixed_seed: Option<u64>,
    #[clap(
        short,
        long,
        help = "Generation policy [default: default]. Either a preset name or a RON policy file."
    )]
    policy: Option<String>,
    #[clap(short, long, help = "Output path", default_value = "output")]
    output_path: PathBuf,
    #[clap(short = 'S', long, help = "Store passing programs in output path.")]
    save_passing_programs: bool,
    #[clap(long, help = "Only write the generated sources.")]
    no_compile: bool,
    #[clap(long, help = "Backend timeout in seconds.", default_value = "180")]
    timeout: u64,
    #[clap(long, help = "Java compiler.", default_value = "javac")]
    javac: String,
    #[clap(long, help = "Java launcher.", default_value = "java")]
    java: String,
    #[clap(
        long,
        help = "Flags of the reference VM, whitespace separated.",
        default_value = "-Xint"
    )]
    vm_args: String,
    #[clap(long, help = "File listing the external classes to import, one per line.")]
    types: Option<PathBuf>,
    #[clap(long, help = "File listing external methods to exclude.")]
    exclude: Option<PathBuf>,
    #[clap(long, help = "Removes unremoved temp output files in tmp directory.")]
    clean: bool,
}

pub fn main() -> ExitCode {
    let filter = EnvFilter::try_from_env("JIT_GEN_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args: Args = Args::parse();
    if args.clean {
        clean_tmp_files();
        return ExitCode::SUCCESS;
    }

    let policy = match Policy::parse_policy_args(&args.policy) {
        Ok(policy) => policy,
        Err(err) => {
            eprintln!("{}", err);
            return ExitCode::from(2);
        }
    };
    let generator = match create_generator(&args, &policy) {
        Ok(generator) => generator,
        Err(err) => {
            eprintln!("{}", err);
            return ExitCode::from(2);
        }
    };

    let tmp_dir = std::env::temp_dir().join(format!("jit-gen-{}", Uuid::new_v4()));
    if let Err(err) = prepare_directories(&args.output_path, &tmp_dir, &policy) {
        eprintln!("{}", err);
        return ExitCode::from(2);
    }

    let backend = JavaBackend {
        javac: args.javac.clone(),
        java: args.java.clone(),
        vm_args: args.vm_args.split_whitespace().map(str::to_string).collect(),
        no_compile: args.no_compile,
        ..JavaBackend::new(&tmp_dir)
    };
    let backends: Vec<Arc<dyn Backend>> = vec![Arc::new(backend)];
    let run_seed = args.seed.as_deref().map_or_else(random_seed, parse_seed);
    let mut runner = Runner::new(generator, backends, run_seed, &tmp_dir);
    runner.fixed_seed = args.fixed_seed;
    runner.timeout = Duration::from_secs(args.timeout);

    let progress_bar = if args.num_runs == 0 {
        ProgressBar::new_spinner()
    } else {
        ProgressBar::new(args.num_runs)
    };
    progress_bar.set_style(ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:50.cyan/blue}] Program {pos:>5}/{len:5} (ETA {eta})")
        .progress_chars("#>-"));

    tracing::info!(run_seed, output = %args.output_path.display(), "Starting run");
    let result = runner.run(args.num_runs, |i, output| {
        save(output, i, &args);
        progress_bar.inc(1);
    });
    progress_bar.finish();
    if let Err(err) = fs::remove_dir_all(&tmp_dir) {
        tracing::warn!(%err, "Unable to delete temporary directory");
    }

    match result {
        Ok(summary) => {
            println!(
                "{} iterations, {} passed, {} failed, {} golden outputs",
                summary.iterations, summary.passed, summary.failed, summary.golden_outputs
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{}", err);
            ExitCode::from(1)
        }
    }
}

fn create_generator(args: &Args, policy: &Policy) -> Result<Generator, Box<dyn std::error::Error>> {
    let mut import = ImportBuilder::builtin()?;
    if let Some(types) = &args.types {
        import = import.type_list_file(types)?;
    }
    if let Some(exclude) = &args.exclude {
        import = import.exclusions_file(exclude)?;
    }
    Ok(Generator::with_import(policy, &import)?)
}

fn prepare_directories(
    output_path: &Path,
    tmp_dir: &Path,
    policy: &Policy,
) -> Result<(), Box<dyn std::error::Error>> {
    if output_path.exists() {
        fs::remove_dir_all(output_path)?;
    }
    fs::create_dir_all(output_path)?;
    fs::create_dir(tmp_dir)?;
    write_as_ron(fs::File::create(output_path.join("policy.ron"))?, policy)?;
    Ok(())
}

fn save(output: &IterationResult, i: u64, args: &Args) {
    match output {
        Ok(iteration_output) => {
            for (backend, err) in iteration_output.failures() {
                eprintln!("Failed iteration {} on {}", i, backend);
                eprintln!("{}", err);
            }
        }
        Err(err) => {
            eprintln!("Failed iteration {}", i);
            eprintln!("{}", err);
        }
    }
    if let Err(err) =
        Runner::save_and_clean_up(output, i, &args.output_path, args.save_passing_programs)
    {
        tracing::warn!(iteration = i, %err, "Unable to save iteration output");
    }
}

pub fn clean_tmp_files() {
    let tmp_dir = std::env::temp_dir();
    let dir = match fs::read_dir(&tmp_dir) {
        Ok(iter) => iter,
        Err(err) => {
            eprintln!("{:?}", err.kind());
            return;
        }
    };
    for dir_entry in dir.flatten() {
        if let Some(name) = dir_entry.file_name().to_str() {
            if name.starts_with("jit-gen-") {
                if let Err(err) = fs::remove_dir_all(dir_entry.path()) {
                    eprintln!("Unable to remove {}: {}", name, err);
                }
            }
        }
    }
}
