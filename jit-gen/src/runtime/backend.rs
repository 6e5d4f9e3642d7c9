use crate::generator::GeneratedProgram;
use crate::runtime::error::BackendError;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation flag shared between the runner and a backend worker.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> CancellationToken {
        CancellationToken::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Reference output of a program, recorded by a backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoldenOutput {
    pub stdout: String,
    /// `None` when the program was not run.
    pub exit_code: Option<i32>,
    /// Files the backend left behind for this program.
    pub files: Vec<PathBuf>,
}

/// Consumer of generated programs.
pub trait Backend: Send + Sync {
    fn name(&self) -> &str;

    /// Files `run` creates for `program`, kept when the run times out.
    fn artifacts(&self, _program: &GeneratedProgram) -> Vec<PathBuf> {
        vec![]
    }

    /// Processes `program`. Implementations check `cancel` and give up once it is set.
    fn run(
        &self,
        program: &GeneratedProgram,
        cancel: &CancellationToken,
    ) -> Result<GoldenOutput, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_flag() {
        let token = CancellationToken::new();
        let worker = token.clone();
        assert!(!worker.is_cancelled());
        token.cancel();
        assert!(worker.is_cancelled());
    }
}
