use std::path::PathBuf;

use anyhow::Result;
use celeba::{
    create_device, run_inspect, run_sampling, InspectArgs, SamplingArgs, SelectedBackend, NAME,
};
use celeba_data::DatasetVariant;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "celeba")]
#[command(about = "CelebA attribute dataset loader and batch sampler")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Source {
    /// YAML configuration file
    #[arg(short, long)]
    config: PathBuf,

    /// Dataset root, overrides `train.root`
    #[arg(long)]
    root: Option<PathBuf>,

    /// Image variant (reg, align, hq), overrides `train.type`
    #[arg(long)]
    variant: Option<DatasetVariant>,
}

impl From<Source> for InspectArgs {
    fn from(source: Source) -> Self {
        Self {
            config_path: source.config,
            root: source.root,
            variant: source.variant,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Load a dataset and report its splits
    Inspect {
        #[command(flatten)]
        source: Source,
    },

    /// Decode a dataset and draw training and evaluation batches
    Sample {
        #[command(flatten)]
        source: Source,

        /// Number of training batches to draw
        #[arg(short, long, default_value_t = 1)]
        batches: usize,

        /// Maximum size of the evaluation batch
        #[arg(long, default_value_t = 64)]
        eval_size: usize,
    },

    /// Show backend information
    Info,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let cli = Cli::parse();
    let device = create_device();
    tracing::info!(backend = NAME, "using backend");

    match cli.command {
        Commands::Inspect { source } => {
            run_inspect(&source.into())?;
            Ok(())
        }

        Commands::Sample {
            source,
            batches,
            eval_size,
        } => {
            let args = SamplingArgs {
                source: source.into(),
                batches,
                eval_size,
            };
            let report = run_sampling::<SelectedBackend>(&args, &device)?;
            tracing::info!(?report, "sampling finished");
            Ok(())
        }

        Commands::Info => {
            println!("CelebA sampler information:");
            println!("  Backend: {NAME}");
            println!("  Device: {device:?}");
            Ok(())
        }
    }
}
