use crate::pipeline::{RunError, RunPlan, Selection, Stage, StageReport, StageRunner};
use std::time::Duration;
use thiserror::Error;

/// Exit code for a rejected step range
pub const EXIT_INVALID_RANGE: u8 = 2;

/// Exit code when a stage executable cannot be found
pub const EXIT_NOT_FOUND: u8 = 127;

/// Exit code for failures that carry no code of their own
pub const EXIT_FAILURE: u8 = 1;

/// Ways a pipeline invocation can fail
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid step range {from}..={to} (stages are 1..={max})")]
    InvalidRange { from: usize, to: usize, max: usize },

    #[error("stage {index} ({id}) exited with code {code}")]
    StageFailed {
        index: usize,
        id: &'static str,
        code: i32,
    },

    #[error("stage {index} ({id}) could not be started: {source}")]
    StageNotFound {
        index: usize,
        id: &'static str,
        source: RunError,
    },

    #[error("stage {index} ({id}) failed to run: {source}")]
    Invocation {
        index: usize,
        id: &'static str,
        source: RunError,
    },
}

impl PipelineError {
    /// Process exit code for this failure
    pub fn exit_code(&self) -> u8 {
        match self {
            PipelineError::InvalidRange { .. } => EXIT_INVALID_RANGE,
            PipelineError::StageFailed { code, .. } => {
                u8::try_from(*code).ok().filter(|c| *c != 0).unwrap_or(EXIT_FAILURE)
            }
            PipelineError::StageNotFound { .. } => EXIT_NOT_FOUND,
            PipelineError::Invocation { .. } => EXIT_FAILURE,
        }
    }
}

/// Where a run currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Planned,
    Running(usize),
    Failed(usize),
    Done,
}

/// Outcome of a successful run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Stages that ran, with their reports, in execution order
    pub completed: Vec<(usize, StageReport)>,
}

impl RunSummary {
    pub fn total_duration(&self) -> Duration {
        self.completed.iter().map(|(_, report)| report.duration).sum()
    }
}

/// Executes run plans one stage at a time, stopping at the first failure
pub struct Orchestrator<R: StageRunner> {
    runner: R,
    state: RunState,
}

impl<R: StageRunner> Orchestrator<R> {
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            state: RunState::Planned,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Run every planned stage in order.
    ///
    /// A nonzero exit, a missing executable or any other invocation error
    /// aborts the run; later stages never start and nothing is retried.
    pub fn execute(&mut self, plan: &RunPlan) -> Result<RunSummary, PipelineError> {
        let mut summary = RunSummary::default();

        for stage in plan.stages() {
            self.state = RunState::Running(stage.index);
            println!("\n=== {} ===", stage);

            let report = match self.runner.run(stage) {
                Ok(report) => report,
                Err(e) => {
                    self.state = RunState::Failed(stage.index);
                    ::log::error!("Stage {} could not run: {}", stage.index, e);
                    return Err(invocation_error(stage, e));
                }
            };

            if !report.succeeded() {
                self.state = RunState::Failed(stage.index);
                println!(
                    "--- exit {} ({:.1}s) ---",
                    report.exit_code,
                    report.duration.as_secs_f64()
                );
                ::log::error!("Stopping after failure at stage {}", stage.index);
                return Err(PipelineError::StageFailed {
                    index: stage.index,
                    id: stage.id,
                    code: report.exit_code,
                });
            }

            println!("--- OK ({:.1}s) ---", report.duration.as_secs_f64());
            summary.completed.push((stage.index, report));
        }

        self.state = RunState::Done;
        ::log::info!(
            "Pipeline finished: {} stages in {:.1}s",
            summary.completed.len(),
            summary.total_duration().as_secs_f64()
        );
        Ok(summary)
    }
}

/// How a pipeline invocation ended when nothing failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Every selected stage was skipped
    NothingToRun,
    /// The plan was printed and left unexecuted
    DryRun(RunPlan),
    Completed(RunSummary),
}

/// Plan `selection` over `stages`, print the plan and run it with `runner`.
///
/// An empty plan is reported before the dry-run flag is looked at, so an
/// empty dry run prints no plan either.
pub fn run<R: StageRunner>(
    stages: &[Stage],
    selection: &Selection,
    dry_run: bool,
    runner: R,
) -> Result<Outcome, PipelineError> {
    let plan = RunPlan::build(stages, selection)?;

    if plan.is_empty() {
        println!("Nothing to execute.");
        return Ok(Outcome::NothingToRun);
    }

    print!("{}", plan);
    if dry_run {
        return Ok(Outcome::DryRun(plan));
    }

    Orchestrator::new(runner).execute(&plan).map(Outcome::Completed)
}

fn invocation_error(stage: &Stage, source: RunError) -> PipelineError {
    match source {
        RunError::NotFound(_) => PipelineError::StageNotFound {
            index: stage.index,
            id: stage.id,
            source,
        },
        _ => PipelineError::Invocation {
            index: stage.index,
            id: stage.id,
            source,
        },
    }
}
