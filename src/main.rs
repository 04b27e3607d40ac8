use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;

use evorun::cli::Cli;
use evorun::config::Config;
use evorun::controller::RunController;
use evorun::domain::{RunMode, RunModeKind, RunOutcome};
use evorun::evo::Evolver;
use evorun::logging::{self, LogTarget, VerboseStreams};
use evorun::runner::EngineRunner;
use evorun::rundir;
use evorun::setup::ProcessSetup;

fn setup_logging(cli: &Cli, config: &Config) -> Result<()> {
    let verbose = VerboseStreams::parse(cli.verbose.as_slice()).context("Invalid verbose streams")?;
    let target = logging::init(&verbose, config.log_level.as_deref()).context("Failed to setup logging")?;
    match target {
        LogTarget::File(path) => info!("Logging initialized, writing to: {}", path.display()),
        LogTarget::Stderr => info!("Logging initialized on stderr for streams: {:?}", verbose.streams()),
    }
    Ok(())
}

async fn run_application(cli: &Cli, config: &Config) -> Result<RunOutcome> {
    info!("Starting application");

    let settings = cli.settings();
    let res_root = cli.res_dir.clone().unwrap_or_else(|| config.experiment.res_dir.clone());
    let run_dir = rundir::for_mode(&settings.mode, &res_root, &config.experiment.name);
    if let Some(dir) = &run_dir {
        rundir::ensure(dir).context("Failed to create result directory")?;
        println!("{} {}", "Results:".cyan(), dir.display());
    }
    let run_dir = run_dir.unwrap_or_else(|| res_root.clone());

    let evolver = Evolver::new(config.ea.clone(), &run_dir).context("Invalid algorithm parameters")?;
    let runner = EngineRunner::new(evolver, &run_dir);

    let setup = ProcessSetup::from_config(&config.seed, &config.parallel, cli.seed, cli.threads);
    let mut controller = RunController::new(settings, setup);
    // A resumed run keeps the fitness prototype stored in its checkpoint.
    if matches!(controller.settings().mode, RunMode::Fresh) {
        controller = controller.with_fitness_prototype(config.fitness);
    }

    let outcome = controller.execute(runner).await.context("Run failed")?;
    Ok(outcome)
}

fn print_outcome(outcome: &RunOutcome) {
    if outcome.mode == RunModeKind::LoadReport {
        // Stdout may carry the report itself.
        return;
    }
    if let Some(seed) = outcome.seed {
        println!("{} {}", "Seed:".cyan(), seed);
    }
    match (&outcome.stopped_by, &outcome.checkpoint) {
        (Some(request), Some(checkpoint)) => {
            println!(
                "{} {} at generation {}, checkpoint {}",
                "Stopped:".yellow(),
                request.signal,
                outcome.generation,
                checkpoint.display()
            );
        }
        (Some(request), None) => {
            println!("{} {} at generation {}", "Stopped:".yellow(), request.signal, outcome.generation);
        }
        (None, _) => {
            println!("{} {} at generation {}", "Done:".green(), outcome.mode, outcome.generation);
        }
    }
    if !outcome.monitored {
        eprintln!("{} ran without a termination monitor; signals were not handled", "Warning:".yellow());
    } else if outcome.monitor_faults > 0 {
        eprintln!(
            "{} termination monitor reported {} fault(s)",
            "Warning:".yellow(),
            outcome.monitor_faults
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    setup_logging(&cli, &config)?;

    info!("Starting with config from: {:?}", cli.config);

    let outcome = run_application(&cli, &config).await.context("Application failed")?;
    print_outcome(&outcome);

    Ok(())
}
