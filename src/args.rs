use clap::{Args as ClapArgs, Parser, Subcommand};
use jobscout::pipeline::Selection;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "jobscout")]
#[command(about = "Turns job-alert emails into enriched leads, one stage at a time")]
#[command(version)]
pub struct Args {
    /// JSON configuration file (defaults apply when omitted)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub run: RunArgs,

    /// Run a single stage instead of the pipeline
    #[command(subcommand)]
    pub command: Option<StageCommand>,
}

/// Which part of the pipeline to run
#[derive(ClapArgs, Debug, Default)]
pub struct RunArgs {
    /// Start at stage N
    #[arg(long, value_name = "N")]
    pub from_step: Option<usize>,

    /// Stop after stage N
    #[arg(long, value_name = "N")]
    pub to_step: Option<usize>,

    /// Leave stage N out (repeatable)
    #[arg(long, value_name = "N")]
    pub skip: Vec<usize>,

    /// Print the plan without running anything
    #[arg(long)]
    pub dry_run: bool,
}

impl RunArgs {
    pub fn selection(&self) -> Selection {
        Selection {
            from_step: self.from_step,
            to_step: self.to_step,
            skip: self.skip.clone(),
        }
    }
}

/// Stage subcommands; the names match the pipeline's stage ids
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageCommand {
    /// Download the latest stable ChromeDriver
    UpdateDriver,
    /// Read job alerts and scrape offer pages
    ReadMail,
    /// Look up LinkedIn company pages
    FindCompanies,
    /// Look up LinkedIn profiles of company leaders
    FindProfiles,
    /// Enrich profiles through the enrichment API
    Enrich,
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobscout::pipeline::STAGES;

    #[test]
    fn test_pipeline_flags() {
        let args = Args::parse_from([
            "jobscout",
            "--from-step",
            "2",
            "--skip",
            "3",
            "--skip",
            "4",
            "--dry-run",
        ]);
        assert!(args.command.is_none());
        assert!(args.run.dry_run);
        assert_eq!(
            args.run.selection(),
            Selection {
                from_step: Some(2),
                to_step: None,
                skip: vec![3, 4],
            }
        );
    }

    #[test]
    fn test_every_stage_id_is_a_subcommand() {
        for stage in &STAGES {
            let args = Args::try_parse_from(["jobscout", "--config", "c.json", stage.id]).unwrap();
            assert!(args.command.is_some(), "{} did not parse", stage.id);
            assert_eq!(args.config, Some(PathBuf::from("c.json")));
        }
    }

    #[test]
    fn test_rejects_negative_step() {
        assert!(Args::try_parse_from(["jobscout", "--from-step", "-1"]).is_err());
    }
}
