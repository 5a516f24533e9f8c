use crate::pipeline::Stage;
use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::process::Command;
use std::time::{Duration, Instant};
use thiserror::Error;

/// What a finished stage reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageReport {
    /// Process exit code, 0 on success
    pub exit_code: i32,
    /// Wall-clock time the stage took
    pub duration: Duration,
}

impl StageReport {
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

/// A stage could not be run to completion
#[derive(Debug, Error)]
pub enum RunError {
    #[error("executable not found: {0}")]
    NotFound(String),

    #[error("failed to run stage: {0}")]
    Io(#[from] io::Error),

    #[error("stage terminated without an exit code")]
    Signalled,
}

/// Runs a single stage and waits for it
pub trait StageRunner {
    fn run(&self, stage: &Stage) -> Result<StageReport, RunError>;
}

impl<R: StageRunner + ?Sized> StageRunner for &R {
    fn run(&self, stage: &Stage) -> Result<StageReport, RunError> {
        (**self).run(stage)
    }
}

/// Runs each stage as `<program> <leading args...> <stage id>`
#[derive(Debug, Clone)]
pub struct CommandRunner {
    program: PathBuf,
    leading_args: Vec<OsString>,
}

impl CommandRunner {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
        }
    }

    /// Run stages through the executable of the current process
    pub fn current_exe() -> io::Result<Self> {
        Ok(Self::new(std::env::current_exe()?))
    }

    /// Arguments passed before the stage id, e.g. a shared `--config`
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.leading_args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl StageRunner for CommandRunner {
    fn run(&self, stage: &Stage) -> Result<StageReport, RunError> {
        ::log::debug!(
            "Spawning {} {:?} {}",
            self.program.display(),
            self.leading_args,
            stage.id
        );
        let start = Instant::now();

        let status = Command::new(&self.program)
            .args(&self.leading_args)
            .arg(stage.id)
            .status()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => {
                    RunError::NotFound(self.program.display().to_string())
                }
                _ => RunError::Io(e),
            })?;

        let exit_code = status.code().ok_or(RunError::Signalled)?;
        Ok(StageReport {
            exit_code,
            duration: start.elapsed(),
        })
    }
}
