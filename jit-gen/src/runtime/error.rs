use crate::generator::GeneratorError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Unable to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Unable to execute {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("Failed to compile {file}\nStatus code {status:?}\nStandard error\n{stderr}")]
    Compilation {
        file: PathBuf,
        status: Option<i32>,
        stderr: String,
    },
    #[error("Failed to run {file}\nStatus code {status:?}\nStandard error\n{stderr}")]
    Run {
        file: PathBuf,
        status: Option<i32>,
        stderr: String,
    },
    #[error("Cancelled")]
    Cancelled,
}

impl BackendError {
    pub fn files(&self) -> Vec<PathBuf> {
        match self {
            BackendError::Compilation { file, .. } | BackendError::Run { file, .. } => {
                vec![file.clone()]
            }
            BackendError::Write { .. } | BackendError::Spawn { .. } | BackendError::Cancelled => {
                vec![]
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error(transparent)]
    Generator(#[from] GeneratorError),
    #[error("Backend {backend} failed: {source}")]
    Backend {
        backend: String,
        source: BackendError,
    },
    #[error("Backend {backend} timeout. Timeout of {} seconds exceeded.", .duration.as_secs())]
    Timeout {
        backend: String,
        duration: Duration,
        files: Vec<PathBuf>,
    },
    #[error("No successful test in {iterations} iterations")]
    NoSuccessfulTests { iterations: u64 },
}

impl RunnerError {
    pub fn folder_name(&self) -> &'static str {
        match self {
            RunnerError::Generator(_) => "generator_error",
            RunnerError::Backend { source, .. } => match source {
                BackendError::Compilation { .. } => "compilation_error",
                BackendError::Run { .. } => "run_error",
                _ => "backend_error",
            },
            RunnerError::Timeout { .. } => "timeout",
            RunnerError::NoSuccessfulTests { .. } => "no_successful_tests",
        }
    }

    pub fn files(&self) -> Vec<PathBuf> {
        match self {
            RunnerError::Backend { source, .. } => source.files(),
            RunnerError::Timeout { files, .. } => files.clone(),
            RunnerError::Generator(_) | RunnerError::NoSuccessfulTests { .. } => vec![],
        }
    }
}
