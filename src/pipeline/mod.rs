//! Sequential stage pipeline.
//!
//! Stages are fixed, numbered from 1, and each runs as its own process.
//! A run selects an inclusive index range minus explicitly skipped indices,
//! executes the selection in ascending order and stops at the first failure.

pub mod orchestrator;
pub mod runner;

pub use orchestrator::{Orchestrator, Outcome, PipelineError, RunState, RunSummary, run};
pub use runner::{CommandRunner, RunError, StageReport, StageRunner};

use std::fmt;

/// One independently executable unit of the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stage {
    /// 1-based position in the pipeline
    pub index: usize,
    /// Subcommand that runs the stage
    pub id: &'static str,
    pub description: &'static str,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}) {} - {}", self.index, self.id, self.description)
    }
}

/// The pipeline, in execution order
pub static STAGES: [Stage; 5] = [
    Stage {
        index: 1,
        id: "update-driver",
        description: "Download the latest ChromeDriver",
    },
    Stage {
        index: 2,
        id: "read-mail",
        description: "Read job alerts and scrape offer contacts",
    },
    Stage {
        index: 3,
        id: "find-companies",
        description: "Find each company's LinkedIn page",
    },
    Stage {
        index: 4,
        id: "find-profiles",
        description: "Find the LinkedIn profile of each company's leader",
    },
    Stage {
        index: 5,
        id: "enrich",
        description: "Enrich contacts through FullEnrich and export the final table",
    },
];

/// Which stages an invocation asked for
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// First stage to run, defaults to 1
    pub from_step: Option<usize>,
    /// Last stage to run, defaults to the last stage
    pub to_step: Option<usize>,
    /// Stage indices to leave out
    pub skip: Vec<usize>,
}

/// The stages selected for one invocation, in execution order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPlan {
    stages: Vec<Stage>,
}

impl RunPlan {
    /// Build the plan for `selection` over `stages`.
    ///
    /// Fails when the range falls outside `1..=stages.len()` or is reversed.
    /// Skipping every selected stage is fine and gives an empty plan.
    pub fn build(stages: &[Stage], selection: &Selection) -> Result<Self, PipelineError> {
        let max = stages.len();
        let from = selection.from_step.unwrap_or(1);
        let to = selection.to_step.unwrap_or(max);

        if from < 1 || to > max || from > to {
            return Err(PipelineError::InvalidRange { from, to, max });
        }

        let stages = stages
            .iter()
            .filter(|stage| (from..=to).contains(&stage.index))
            .filter(|stage| !selection.skip.contains(&stage.index))
            .copied()
            .collect();

        Ok(Self { stages })
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn indices(&self) -> Vec<usize> {
        self.stages.iter().map(|stage| stage.index).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl fmt::Display for RunPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Execution plan:")?;
        for stage in &self.stages {
            writeln!(f, "  {}", stage)?;
        }
        Ok(())
    }
}
