//! The command line interface for the simulation.
use crate::batch::run_batch;
use crate::input::load_model;
use crate::log;
use crate::model::scenario::ScenarioBatch;
use crate::output::{create_output_directory, get_output_dir};
use crate::settings::Settings;
use ::log::{info, warn};
use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::path::{Path, PathBuf};

pub mod example;
use example::ExampleSubcommands;
pub mod settings;
use settings::SettingsSubcommands;

/// The default name of the file listing scenarios for the `batch` command
const SCENARIOS_FILE_NAME: &str = "scenarios.toml";

/// The command line interface for the simulation.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// The available commands.
    #[command(subcommand)]
    command: Option<Commands>,
    /// Flag to provide the CLI docs as markdown
    #[arg(long, hide = true)]
    markdown_help: bool,
}

/// Options for the run command
#[derive(Args)]
pub struct RunOpts {
    /// Directory for output files
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
    /// Whether to overwrite the output directory if it already exists
    #[arg(long)]
    pub overwrite: bool,
    /// Whether to write candidate rankings to an extra CSV file
    #[arg(long)]
    pub debug_model: bool,
}

/// Options for the batch command
#[derive(Args)]
pub struct BatchOpts {
    /// File listing the scenarios to run (defaults to scenarios.toml in the model directory)
    #[arg(long)]
    pub scenarios: Option<PathBuf>,
    /// Other output options
    #[command(flatten)]
    pub run_opts: RunOpts,
}

/// The available commands.
#[derive(Subcommand)]
enum Commands {
    /// Run the default scenario of a model.
    Run {
        /// Path to the model directory.
        model_dir: PathBuf,
        /// Other run options
        #[command(flatten)]
        opts: RunOpts,
    },
    /// Validate a model.
    Validate {
        /// The path to the model directory.
        model_dir: PathBuf,
    },
    /// Run a batch of scenarios against a model in parallel.
    Batch {
        /// Path to the model directory.
        model_dir: PathBuf,
        /// Other batch options
        #[command(flatten)]
        opts: BatchOpts,
    },
    /// Manage example models.
    Example {
        /// The available subcommands for managing example models.
        #[command(subcommand)]
        subcommand: ExampleSubcommands,
    },
    /// Manage program settings.
    Settings {
        /// The subcommands for managing settings.
        #[command(subcommand)]
        subcommand: SettingsSubcommands,
    },
}

impl Commands {
    /// Execute the supplied CLI command
    fn execute(self) -> Result<()> {
        match self {
            Self::Run { model_dir, opts } => handle_run_command(&model_dir, &opts, None),
            Self::Validate { model_dir } => handle_validate_command(&model_dir, None),
            Self::Batch { model_dir, opts } => handle_batch_command(&model_dir, &opts, None),
            Self::Example { subcommand } => subcommand.execute(),
            Self::Settings { subcommand } => subcommand.execute(),
        }
    }
}

/// Parse CLI arguments and start the program
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    // Invoked as: `$ steelsim --markdown-help`
    if cli.markdown_help {
        clap_markdown::print_help_markdown::<Cli>();
        return Ok(());
    }

    let Some(command) = cli.command else {
        let help_str = Cli::command().render_long_help().to_string();
        println!("{help_str}");
        return Ok(());
    };

    command.execute()
}

/// Load program settings, if not provided
fn load_settings(settings: Option<Settings>) -> Result<Settings> {
    if let Some(settings) = settings {
        Ok(settings)
    } else {
        Settings::load().context("Failed to load settings.")
    }
}

/// Create the output folder and start logging to it.
///
/// # Returns
///
/// The path to the output folder.
fn prepare_output(
    model_path: &Path,
    opts: &RunOpts,
    settings: &Settings,
) -> Result<PathBuf> {
    let output_path = match &opts.output_dir {
        Some(path) => path.clone(),
        None => get_output_dir(model_path)?,
    };

    let overwrite = create_output_directory(&output_path, opts.overwrite || settings.overwrite)
        .with_context(|| {
            format!(
                "Failed to create output directory: {}",
                output_path.display()
            )
        })?;

    // Initialise program logger
    log::init(Some(settings.log_level.as_str()), Some(&output_path))
        .context("Failed to initialise logging.")?;

    // NB: We have to wait until the logger is initialised to display this warning
    if overwrite {
        warn!("Output folder will be overwritten");
    }
    info!("Output folder: {}", output_path.display());

    Ok(output_path)
}

/// Handle the `run` command.
pub fn handle_run_command(
    model_path: &Path,
    opts: &RunOpts,
    settings: Option<Settings>,
) -> Result<()> {
    let mut settings = load_settings(settings)?;

    // This setting can be overridden by command-line argument
    if opts.debug_model {
        settings.debug_model = true;
    }

    let output_path = prepare_output(model_path, opts, &settings)?;

    // Load the model to run
    let model = load_model(model_path).context("Failed to load model.")?;
    info!("Loaded model from {}", model_path.display());

    // Run the simulation
    let scenario = model.parameters.scenario.clone();
    crate::simulation::run(&model, scenario, &output_path, settings.debug_model)?;
    info!("Simulation complete!");

    Ok(())
}

/// Handle the `validate` command.
pub fn handle_validate_command(model_path: &Path, settings: Option<Settings>) -> Result<()> {
    let settings = load_settings(settings)?;

    // Initialise program logger (we won't save log files when running the validate command)
    log::init(Some(settings.log_level.as_str()), None).context("Failed to initialise logging.")?;

    // Load/validate the model
    load_model(model_path).context("Failed to validate model.")?;
    info!("Model validation successful!");

    Ok(())
}

/// Handle the `batch` command.
pub fn handle_batch_command(
    model_path: &Path,
    opts: &BatchOpts,
    settings: Option<Settings>,
) -> Result<()> {
    let mut settings = load_settings(settings)?;
    if opts.run_opts.debug_model {
        settings.debug_model = true;
    }

    let scenarios_path = match &opts.scenarios {
        Some(path) => path.clone(),
        None => model_path.join(SCENARIOS_FILE_NAME),
    };
    let batch = ScenarioBatch::from_path(&scenarios_path).context("Failed to load scenarios.")?;

    let output_path = prepare_output(model_path, &opts.run_opts, &settings)?;

    // Check the model before starting any workers
    load_model(model_path).context("Failed to load model.")?;
    run_batch(
        model_path,
        &batch,
        &output_path,
        settings.debug_model,
        settings.num_threads,
    )?;
    info!("Simulation complete!");

    Ok(())
}
