use crate::generator::{GeneratedProgram, Generator};
use crate::runtime::backend::{Backend, CancellationToken, GoldenOutput};
use crate::runtime::error::{BackendError, RunnerError};
use crate::seed::iteration_seed;
use crate::statistics::FullStatistics;
use crate::utils::write_as_ron;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Backend timeout unless configured otherwise.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(180);

/// Outcome of one backend for one program. Failures are `Backend` or `Timeout` errors.
#[derive(Debug)]
pub struct BackendReport {
    pub backend: String,
    pub duration: Duration,
    pub outcome: Result<GoldenOutput, RunnerError>,
}

#[derive(Debug)]
pub struct IterationOutput {
    pub seed: u64,
    pub name: String,
    /// Statistics file and the files of every successful backend.
    pub files: Vec<PathBuf>,
    pub statistics: FullStatistics,
    pub generation_time: Duration,
    pub dispatch_time: Duration,
    pub reports: Vec<BackendReport>,
}

impl IterationOutput {
    /// Whether every backend produced a golden output.
    pub fn passed(&self) -> bool {
        self.reports.iter().all(|report| report.outcome.is_ok())
    }

    pub fn golden_outputs(&self) -> impl Iterator<Item = (&str, &GoldenOutput)> {
        self.reports.iter().filter_map(|report| match &report.outcome {
            Ok(golden) => Some((report.backend.as_str(), golden)),
            Err(_) => None,
        })
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &RunnerError)> {
        self.reports.iter().filter_map(|report| match &report.outcome {
            Ok(_) => None,
            Err(err) => Some((report.backend.as_str(), err)),
        })
    }

    /// Whether the successful backends printed the same output.
    pub fn outputs_agree(&self) -> bool {
        let mut outputs = self.golden_outputs().map(|(_, golden)| &golden.stdout);
        match outputs.next() {
            Some(first) => outputs.all(|stdout| stdout == first),
            None => true,
        }
    }
}

pub type IterationResult = Result<IterationOutput, RunnerError>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub iterations: u64,
    pub passed: u64,
    pub failed: u64,
    /// Golden outputs recorded over all backends.
    pub golden_outputs: u64,
}

pub struct Timed<T>(pub Duration, pub Option<T>);

impl<T> Timed<T> {
    /// Runs `f` on its own thread. Gives up on the result once `duration` has passed.
    pub fn run_with_timeout<F>(duration: Duration, f: F) -> Timed<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T,
        F: Send + 'static,
    {
        let now = Instant::now();
        let (sender, receiver) = mpsc::channel();
        thread::spawn(move || sender.send(f()));
        match receiver.recv_timeout(duration) {
            Ok(res) => {
                let time_taken = now.elapsed();
                if time_taken >= duration {
                    return Timed(duration, None);
                }
                Timed(time_taken, Some(res))
            }
            Err(_) => {
                warn!(
                    timeout_ms = duration.as_millis() as u64,
                    "Worker still running after timeout, detaching it"
                );
                Timed(duration, None)
            }
        }
    }
}

pub struct Runner {
    pub generator: Generator,
    pub backends: Vec<Arc<dyn Backend>>,
    pub run_seed: u64,
    /// Seed used by every iteration instead of a derived one.
    pub fixed_seed: Option<u64>,
    pub timeout: Duration,
    /// Directory receiving per-iteration statistics.
    pub tmp_dir: PathBuf,
}

impl Runner {
    pub fn new<P: AsRef<Path>>(
        generator: Generator,
        backends: Vec<Arc<dyn Backend>>,
        run_seed: u64,
        tmp_dir: P,
    ) -> Runner {
        Runner {
            generator,
            backends,
            run_seed,
            fixed_seed: None,
            timeout: DEFAULT_TIMEOUT,
            tmp_dir: tmp_dir.as_ref().to_path_buf(),
        }
    }

    pub fn iteration_seed(&self, iteration: u64) -> u64 {
        iteration_seed(self.run_seed, iteration, self.fixed_seed)
    }

    /// Generates one program and hands it to every backend in turn. A failing backend does not
    /// keep the others from running, only generation errors fail the whole iteration.
    pub fn run_iteration(&mut self, iteration: u64) -> IterationResult {
        let seed = self.iteration_seed(iteration);
        let start = Instant::now();
        let program = self.generator.generate(seed)?;
        let statistics = self.generator.full_statistics(&program);
        let generation_time = start.elapsed();

        let mut files = vec![];
        let stats_file = self.tmp_dir.join(format!("{}.statistics.ron", program.name));
        match write_statistics(&stats_file, &statistics) {
            Ok(()) => files.push(stats_file),
            Err(err) => warn!(%err, "Unable to write statistics"),
        }

        let start = Instant::now();
        let program = Arc::new(program);
        let mut reports = vec![];
        for backend in &self.backends {
            let report = self.dispatch(backend, &program);
            match &report.outcome {
                Ok(golden) => {
                    files.extend(golden.files.iter().cloned());
                    info!(iteration, backend = %report.backend, "Backend passed");
                }
                Err(err) => info!(
                    iteration,
                    backend = %report.backend,
                    kind = err.folder_name(),
                    "Backend failed"
                ),
            }
            reports.push(report);
        }
        let output = IterationOutput {
            seed,
            name: program.name.clone(),
            files,
            statistics,
            generation_time,
            dispatch_time: start.elapsed(),
            reports,
        };
        if !output.outputs_agree() {
            warn!(iteration, name = %output.name, "Backends disagree on the program output");
        }
        info!(
            iteration,
            seed,
            name = %output.name,
            passed = output.passed(),
            generation_ms = output.generation_time.as_millis() as u64,
            dispatch_ms = output.dispatch_time.as_millis() as u64,
            "Iteration done"
        );
        Ok(output)
    }

    fn dispatch(
        &self,
        backend: &Arc<dyn Backend>,
        program: &Arc<GeneratedProgram>,
    ) -> BackendReport {
        let cancel = CancellationToken::new();
        let worker = {
            let backend = Arc::clone(backend);
            let program = Arc::clone(program);
            let cancel = cancel.clone();
            move || backend.run(&program, &cancel)
        };
        let Timed(duration, result) = Timed::run_with_timeout(self.timeout, worker);
        let outcome = match result {
            Some(Ok(golden)) => Ok(golden),
            Some(Err(source)) => Err(RunnerError::Backend {
                backend: backend.name().to_string(),
                source,
            }),
            None => {
                cancel.cancel();
                warn!(backend = backend.name(), name = %program.name, "Backend timed out");
                Err(RunnerError::Timeout {
                    backend: backend.name().to_string(),
                    duration,
                    files: backend.artifacts(program),
                })
            }
        };
        BackendReport {
            backend: backend.name().to_string(),
            duration,
            outcome,
        }
    }

    /// Runs `iterations` iterations, forever when zero, reporting each one to `on_iteration`.
    /// Fails when no backend recorded a golden output.
    pub fn run<F>(&mut self, iterations: u64, mut on_iteration: F) -> Result<RunSummary, RunnerError>
    where
        F: FnMut(u64, &IterationResult),
    {
        let mut summary = RunSummary::default();
        let mut iteration = 0;
        while iterations == 0 || iteration < iterations {
            let result = self.run_iteration(iteration);
            match &result {
                Ok(output) => {
                    summary.golden_outputs += output.golden_outputs().count() as u64;
                    if output.passed() {
                        summary.passed += 1;
                    } else {
                        summary.failed += 1;
                    }
                }
                Err(err) => {
                    summary.failed += 1;
                    info!(iteration, kind = err.folder_name(), "Iteration failed");
                }
            }
            on_iteration(iteration, &result);
            iteration += 1;
            summary.iterations = iteration;
        }
        if summary.golden_outputs == 0 {
            return Err(RunnerError::NoSuccessfulTests {
                iterations: summary.iterations,
            });
        }
        Ok(summary)
    }

    /// Moves the files of iteration `i` into `pass/<i>`, or into `fail/<kind>/<i>` for every
    /// kind of failure, below `output_path`. The files of successful backends go along with
    /// the first failure. Files of passing iterations are deleted unless
    /// `save_passing_programs`. Returns the first directory written to.
    pub fn save_and_clean_up<P: AsRef<Path>>(
        output: &IterationResult,
        i: u64,
        output_path: P,
        save_passing_programs: bool,
    ) -> io::Result<PathBuf> {
        let output_path = output_path.as_ref();
        match output {
            Ok(iteration_output) if iteration_output.passed() => {
                let directory = output_path.join("pass").join(i.to_string());
                if save_passing_programs {
                    fs::create_dir_all(&directory)?;
                }
                for file in &iteration_output.files {
                    if save_passing_programs {
                        move_into(file, &directory)?;
                    } else {
                        remove_file(file);
                    }
                }
                Ok(directory)
            }
            Ok(iteration_output) => {
                let mut first = None;
                for (_, err) in iteration_output.failures() {
                    let directory = save_failure(err, i, output_path)?;
                    first.get_or_insert(directory);
                }
                let directory = first.unwrap_or_else(|| output_path.join("fail"));
                for file in &iteration_output.files {
                    if file.exists() {
                        move_into(file, &directory)?;
                    }
                }
                Ok(directory)
            }
            Err(err) => save_failure(err, i, output_path),
        }
    }
}

fn save_failure(err: &RunnerError, i: u64, output_path: &Path) -> io::Result<PathBuf> {
    let directory = output_path
        .join("fail")
        .join(err.folder_name())
        .join(i.to_string());
    fs::create_dir_all(&directory)?;
    for file in &err.files() {
        if file.exists() {
            move_into(file, &directory)?;
        }
    }
    let mut error_file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(directory.join("error.txt"))?;
    writeln!(error_file, "{}", err)?;
    Ok(directory)
}

fn write_statistics(path: &Path, statistics: &FullStatistics) -> Result<(), BackendError> {
    let file = fs::File::create(path).map_err(|source| BackendError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    write_as_ron(file, statistics).map_err(|err| BackendError::Write {
        path: path.to_path_buf(),
        source: io::Error::new(io::ErrorKind::Other, err.to_string()),
    })
}

fn move_into(file: &Path, directory: &Path) -> io::Result<()> {
    match file.file_name() {
        Some(file_name) => fs::rename(file, directory.join(file_name)),
        None => Ok(()),
    }
}

fn remove_file(file: &Path) {
    if let Err(err) = fs::remove_file(file) {
        warn!(file = %file.display(), %err, "Unable to remove file");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{Policy, PolicyBuilder};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Recording {
        dir: PathBuf,
    }

    impl Backend for Recording {
        fn name(&self) -> &str {
            "recording"
        }

        fn run(
            &self,
            program: &GeneratedProgram,
            _cancel: &CancellationToken,
        ) -> Result<GoldenOutput, BackendError> {
            let file = self.dir.join(format!("{}.java", program.name));
            fs::write(&file, program.java_source()).unwrap();
            Ok(GoldenOutput {
                stdout: String::new(),
                exit_code: Some(0),
                files: vec![file],
            })
        }
    }

    struct Sleeping;

    impl Backend for Sleeping {
        fn name(&self) -> &str {
            "sleeping"
        }

        fn run(
            &self,
            _program: &GeneratedProgram,
            cancel: &CancellationToken,
        ) -> Result<GoldenOutput, BackendError> {
            while !cancel.is_cancelled() {
                thread::sleep(Duration::from_millis(5));
            }
            Err(BackendError::Cancelled)
        }
    }

    /// Fails to compile after writing its source.
    struct Failing {
        dir: PathBuf,
    }

    impl Backend for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn run(
            &self,
            program: &GeneratedProgram,
            _cancel: &CancellationToken,
        ) -> Result<GoldenOutput, BackendError> {
            let file = self.dir.join(format!("{}.failing.java", program.name));
            fs::write(&file, program.java_source()).unwrap();
            Err(BackendError::Compilation {
                file,
                status: Some(1),
                stderr: "error".to_string(),
            })
        }
    }

    #[derive(Default)]
    struct Counting {
        calls: AtomicUsize,
    }

    impl Backend for Counting {
        fn name(&self) -> &str {
            "counting"
        }

        fn run(
            &self,
            _program: &GeneratedProgram,
            _cancel: &CancellationToken,
        ) -> Result<GoldenOutput, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(GoldenOutput {
                stdout: "x = 1\n".to_string(),
                exit_code: Some(0),
                files: vec![],
            })
        }
    }

    fn runner_with(dir: &Path, backends: Vec<Arc<dyn Backend>>) -> Runner {
        let policy = PolicyBuilder::from_policy(Policy::default())
            .complexity_limit(500)
            .build()
            .unwrap();
        Runner::new(Generator::new(&policy).unwrap(), backends, 1, dir)
    }

    fn runner(dir: &Path, backend: Arc<dyn Backend>) -> Runner {
        runner_with(dir, vec![backend])
    }

    #[test]
    fn passing_iterations_are_saved() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let backend = Arc::new(Recording {
            dir: tmp.path().to_path_buf(),
        });
        let mut runner = runner(tmp.path(), backend);
        let result = runner.run_iteration(0);
        let name = result.as_ref().unwrap().name.clone();
        let directory = Runner::save_and_clean_up(&result, 0, out.path(), true).unwrap();
        assert_eq!(directory, out.path().join("pass").join("0"));
        assert!(directory.join(format!("{}.java", name)).exists());
        assert!(directory.join(format!("{}.statistics.ron", name)).exists());
        assert!(!tmp.path().join(format!("{}.java", name)).exists());
    }

    #[test]
    fn timeouts_cancel_the_backend() {
        let tmp = tempfile::tempdir().unwrap();
        let mut runner = runner(tmp.path(), Arc::new(Sleeping));
        runner.timeout = Duration::from_millis(50);
        let output = runner.run_iteration(0).unwrap();
        assert!(!output.passed());
        let failures: Vec<&str> = output.failures().map(|(_, err)| err.folder_name()).collect();
        assert_eq!(failures, vec!["timeout"]);
    }

    #[test]
    fn failing_backends_do_not_stop_the_others() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let counting = Arc::new(Counting::default());
        let backends: Vec<Arc<dyn Backend>> = vec![
            Arc::new(Failing {
                dir: tmp.path().to_path_buf(),
            }),
            counting.clone(),
        ];
        let mut runner = runner_with(tmp.path(), backends);
        let result = runner.run_iteration(0);
        assert_eq!(counting.calls.load(Ordering::SeqCst), 1);

        let output = result.as_ref().unwrap();
        assert!(!output.passed());
        assert_eq!(output.golden_outputs().count(), 1);
        let failed: Vec<&str> = output.failures().map(|(backend, _)| backend).collect();
        assert_eq!(failed, vec!["failing"]);
        let name = output.name.clone();

        let directory = Runner::save_and_clean_up(&result, 0, out.path(), false).unwrap();
        assert_eq!(
            directory,
            out.path().join("fail").join("compilation_error").join("0")
        );
        assert!(directory.join(format!("{}.failing.java", name)).exists());
        assert!(directory.join(format!("{}.statistics.ron", name)).exists());
        assert!(directory.join("error.txt").exists());
    }

    #[test]
    fn golden_outputs_count_towards_success() {
        let tmp = tempfile::tempdir().unwrap();
        let backends: Vec<Arc<dyn Backend>> = vec![
            Arc::new(Failing {
                dir: tmp.path().to_path_buf(),
            }),
            Arc::new(Counting::default()),
        ];
        let mut runner = runner_with(tmp.path(), backends);
        let summary = runner.run(2, |_, _| {}).unwrap();
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.passed, 0);
        assert_eq!(summary.golden_outputs, 2);
    }

    #[test]
    fn slow_workers_are_abandoned() {
        let Timed(duration, result) = Timed::run_with_timeout(Duration::from_millis(20), || {
            thread::sleep(Duration::from_millis(500));
        });
        assert_eq!(duration, Duration::from_millis(20));
        assert!(result.is_none());
    }

    #[test]
    fn runs_without_a_passing_iteration_fail() {
        let tmp = tempfile::tempdir().unwrap();
        let mut runner = runner(tmp.path(), Arc::new(Sleeping));
        runner.timeout = Duration::from_millis(20);
        let mut seen = 0;
        let result = runner.run(2, |_, _| seen += 1);
        assert_eq!(seen, 2);
        assert!(matches!(
            result,
            Err(RunnerError::NoSuccessfulTests { iterations: 2 })
        ));
    }

    #[test]
    fn fixed_seeds_override_derivation() {
        let tmp = tempfile::tempdir().unwrap();
        let mut runner = runner(tmp.path(), Arc::new(Sleeping));
        assert_ne!(runner.iteration_seed(0), runner.iteration_seed(1));
        runner.fixed_seed = Some(5);
        assert_eq!(runner.iteration_seed(3), 5);
    }
}
