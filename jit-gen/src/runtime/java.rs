use crate::generator::GeneratedProgram;
use crate::runtime::backend::{Backend, CancellationToken, GoldenOutput};
use crate::runtime::error::BackendError;
use std::fs;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

/// How often a running subprocess checks its cancellation token.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Compiles programs with `javac` and records their output under `java`.
#[derive(Debug, Clone)]
pub struct JavaBackend {
    pub output_dir: PathBuf,
    pub javac: String,
    pub java: String,
    /// Flags passed to the reference VM, `-Xint` by default.
    pub vm_args: Vec<String>,
    /// Only write the source file.
    pub no_compile: bool,
}

impl JavaBackend {
    pub fn new<P: AsRef<Path>>(output_dir: P) -> JavaBackend {
        JavaBackend {
            output_dir: output_dir.as_ref().to_path_buf(),
            javac: "javac".to_string(),
            java: "java".to_string(),
            vm_args: vec!["-Xint".to_string()],
            no_compile: false,
        }
    }

    pub fn source_file(&self, program: &GeneratedProgram) -> PathBuf {
        self.output_dir.join(format!("{}.java", program.name))
    }

    pub fn gold_file(&self, program: &GeneratedProgram) -> PathBuf {
        self.output_dir.join(format!("{}.gold", program.name))
    }

    fn classes_dir(&self, program: &GeneratedProgram) -> PathBuf {
        self.output_dir.join(format!("{}-classes", program.name))
    }

    fn compile(
        &self,
        source: &Path,
        classes: &Path,
        cancel: &CancellationToken,
    ) -> Result<(), BackendError> {
        let output = run_command(
            Command::new(&self.javac).arg("-d").arg(classes).arg(source),
            cancel,
        )?;
        if !output.status.success() {
            return Err(BackendError::Compilation {
                file: source.to_path_buf(),
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(())
    }

    fn execute(
        &self,
        program: &GeneratedProgram,
        source: &Path,
        classes: &Path,
        cancel: &CancellationToken,
    ) -> Result<Output, BackendError> {
        let output = run_command(
            Command::new(&self.java)
                .args(&self.vm_args)
                .arg("-cp")
                .arg(classes)
                .arg(&program.name),
            cancel,
        )?;
        if !output.status.success() {
            return Err(BackendError::Run {
                file: source.to_path_buf(),
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(output)
    }
}

impl Backend for JavaBackend {
    fn name(&self) -> &str {
        "java"
    }

    fn artifacts(&self, program: &GeneratedProgram) -> Vec<PathBuf> {
        vec![self.source_file(program)]
    }

    fn run(
        &self,
        program: &GeneratedProgram,
        cancel: &CancellationToken,
    ) -> Result<GoldenOutput, BackendError> {
        let source = self.source_file(program);
        write(&source, program.java_source())?;
        if self.no_compile {
            return Ok(GoldenOutput {
                stdout: String::new(),
                exit_code: None,
                files: vec![source],
            });
        }

        let classes = self.classes_dir(program);
        let result = self
            .compile(&source, &classes, cancel)
            .and_then(|_| self.execute(program, &source, &classes, cancel));
        if let Err(err) = fs::remove_dir_all(&classes) {
            debug!(dir = %classes.display(), %err, "Unable to remove class files");
        }
        let output = result?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let gold = self.gold_file(program);
        write(&gold, &stdout)?;
        Ok(GoldenOutput {
            stdout,
            exit_code: output.status.code(),
            files: vec![source, gold],
        })
    }
}

fn write<C: AsRef<[u8]>>(path: &Path, contents: C) -> Result<(), BackendError> {
    fs::write(path, contents).map_err(|source| BackendError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Runs `command` to completion unless `cancel` is set first.
///
/// The child gets its own process group, so cancellation kills whatever it spawned as well.
pub fn run_command(command: &mut Command, cancel: &CancellationToken) -> Result<Output, BackendError> {
    let program = command.get_program().to_string_lossy().into_owned();
    let child = command
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .process_group(0)
        .spawn()
        .map_err(|source| BackendError::Spawn {
            program: program.clone(),
            source,
        })?;
    let child_pid = child.id();

    let (sender, receiver) = mpsc::channel::<()>();
    let watched = cancel.clone();
    let watcher = thread::spawn(move || loop {
        match receiver.recv_timeout(POLL_INTERVAL) {
            Err(mpsc::RecvTimeoutError::Timeout) => {
                if watched.is_cancelled() {
                    kill_process_group(child_pid);
                    return true;
                }
            }
            _ => return false,
        }
    });

    let output = child.wait_with_output();
    let _ = sender.send(());
    let killed = watcher.join().unwrap_or(false);
    if killed {
        warn!(%program, "Killed cancelled process");
        return Err(BackendError::Cancelled);
    }
    output.map_err(|source| BackendError::Spawn { program, source })
}

fn kill_process_group(pid: u32) {
    // SAFETY: killpg only sends a signal. The child was spawned with process_group(0), so its
    // pid is the group id.
    unsafe {
        libc::killpg(pid as libc::pid_t, libc::SIGKILL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn captures_output() {
        let output = run_command(
            Command::new("sh").arg("-c").arg("echo hello"),
            &CancellationToken::new(),
        )
        .unwrap();
        assert!(output.status.success());
        assert_eq!(String::from_utf8_lossy(&output.stdout), "hello\n");
    }

    #[test]
    fn cancellation_kills_the_process_group() {
        let cancel = CancellationToken::new();
        let canceller = cancel.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            canceller.cancel();
        });
        let start = Instant::now();
        let result = run_command(Command::new("sh").arg("-c").arg("sleep 30 & wait"), &cancel);
        assert!(matches!(result, Err(BackendError::Cancelled)));
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn missing_programs_fail_to_spawn() {
        let result = run_command(
            &mut Command::new("jit-gen-no-such-program"),
            &CancellationToken::new(),
        );
        assert!(matches!(result, Err(BackendError::Spawn { .. })));
    }
}
