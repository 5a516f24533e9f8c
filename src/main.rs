use clap::Parser;
use jobscout::config::{AppConfig, EnvSource};
use jobscout::pipeline::orchestrator::EXIT_FAILURE;
use jobscout::pipeline::{self, CommandRunner, Outcome, PipelineError, STAGES};
use jobscout::stages;
use std::path::Path;
use std::process::ExitCode;

mod args;
use args::{Args, RunArgs, StageCommand};

fn main() -> ExitCode {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    match args.command {
        Some(command) => run_stage(command, args.config.as_deref()),
        None => run_pipeline(&args.run, args.config.as_deref()),
    }
}

/// Plan the selected stages and run each one as a child process
fn run_pipeline(run: &RunArgs, config: Option<&Path>) -> ExitCode {
    let runner = match CommandRunner::current_exe() {
        Ok(runner) => runner,
        Err(e) => {
            ::log::error!("Cannot locate the current executable: {}", e);
            return ExitCode::from(EXIT_FAILURE);
        }
    };
    let config_args = config
        .map(|path| vec!["--config".into(), path.as_os_str().to_os_string()])
        .unwrap_or_default();

    match pipeline::run(&STAGES, &run.selection(), run.dry_run, runner.with_args(config_args)) {
        Ok(Outcome::Completed(summary)) => {
            println!(
                "Pipeline completed successfully ({} stages, {:.1}s).",
                summary.completed.len(),
                summary.total_duration().as_secs_f64()
            );
            ExitCode::SUCCESS
        }
        Ok(Outcome::NothingToRun | Outcome::DryRun(_)) => ExitCode::SUCCESS,
        Err(e @ PipelineError::InvalidRange { .. }) => {
            eprintln!("Invalid step range: {}", e);
            ExitCode::from(e.exit_code())
        }
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

/// Run one stage in this process
fn run_stage(command: StageCommand, config_path: Option<&Path>) -> ExitCode {
    let config = match AppConfig::load(config_path) {
        Ok(config) => config.with_overrides(&[&EnvSource]),
        Err(e) => {
            ::log::error!("Failed to load configuration: {}", e);
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            ::log::error!("Failed to start the async runtime: {}", e);
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    let result = runtime.block_on(async {
        match command {
            StageCommand::UpdateDriver => stages::update_driver(&config).await,
            StageCommand::ReadMail => stages::read_mail(&config).await,
            StageCommand::FindCompanies => stages::find_companies(&config).await,
            StageCommand::FindProfiles => stages::find_profiles(&config).await,
            StageCommand::Enrich => stages::enrich(&config).await,
        }
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            ::log::error!("{:?} failed: {}", command, e);
            ExitCode::from(EXIT_FAILURE)
        }
    }
}
