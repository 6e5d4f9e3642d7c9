use clap::Parser;
use jit_gen::generator::Generator;
use jit_gen::import::ImportBuilder;
use jit_gen::policy::Policy;
use jit_gen::seed::{parse_seed, random_seed};
use jit_gen::utils::write_as_ron;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Randomized Java program generator.")]
struct GeneratorArgs {
    #[clap(short, long, help = "Optional seed, a number or any text.")]
    seed: Option<String>,
    #[clap(
        short,
        long,
        help = "Generation policy [default: default]. Either a preset name or a RON policy file."
    )]
    policy: Option<String>,
    #[clap(long, help = "Output statistics instead of program.")]
    statistics: bool,
    #[clap(long, help = "File listing the external classes to import, one per line.")]
    types: Option<PathBuf>,
    #[clap(long, help = "File listing external methods to exclude.")]
    exclude: Option<PathBuf>,
}

pub fn main() -> ExitCode {
    let filter = EnvFilter::try_from_env("JIT_GEN_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args: GeneratorArgs = GeneratorArgs::parse();
    let mut generator = match create_generator(&args) {
        Ok(generator) => generator,
        Err(err) => {
            eprintln!("{}", err);
            return ExitCode::from(2);
        }
    };
    let seed = args.seed.as_deref().map_or_else(random_seed, parse_seed);
    tracing::debug!(seed, "Generating program");
    let program = match generator.generate(seed) {
        Ok(program) => program,
        Err(err) => {
            eprintln!("{}", err);
            return ExitCode::from(1);
        }
    };
    if args.statistics {
        let statistics = generator.full_statistics(&program);
        if let Err(err) = write_as_ron(std::io::stdout(), statistics) {
            eprintln!("{}", err);
            return ExitCode::from(1);
        }
        println!();
    } else {
        print!("{}", program.java_source());
    }
    ExitCode::SUCCESS
}

fn create_generator(args: &GeneratorArgs) -> Result<Generator, Box<dyn std::error::Error>> {
    let policy = Policy::parse_policy_args(&args.policy)?;
    let mut import = ImportBuilder::builtin()?;
    if let Some(types) = &args.types {
        import = import.type_list_file(types)?;
    }
    if let Some(exclude) = &args.exclude {
        import = import.exclusions_file(exclude)?;
    }
    Ok(Generator::with_import(&policy, &import)?)
}
