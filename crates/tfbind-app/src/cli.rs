use super::commands;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tfbind_app::scan::{DEFAULT_STEP_SIZE, DEFAULT_WINDOW_SIZE};
use tfbind_app::{PromoterPreset, DEFAULT_PANEL};
use tfbind_core::DevicePreference;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    context: ContextArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Overrides for the JSON config; every flag wins over the file.
#[derive(Args, Debug, Clone, Default)]
pub struct ContextArgs {
    /// JSON config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(long, global = true)]
    pub device: Option<DevicePreference>,

    /// Affinity model weights (.safetensors or .pt)
    #[arg(long, global = true)]
    pub weights: Option<PathBuf>,

    /// Affinity model config JSON
    #[arg(long, global = true)]
    pub model_config: Option<PathBuf>,

    /// Published ESM-2 checkpoint: 8M, 35M, 150M, 650M, 3B or 15B
    #[arg(long, global = true)]
    pub esm_model: Option<String>,

    /// Local ESM-2 directory with config.json and model.safetensors
    #[arg(long, global = true)]
    pub esm_dir: Option<PathBuf>,

    #[arg(long, global = true)]
    pub repr_layer: Option<usize>,

    #[arg(long, global = true)]
    pub embedding_root: Option<PathBuf>,

    #[arg(long, global = true)]
    pub embedding_key: Option<String>,

    /// Layer to read from layer-indexed .pt artifacts
    #[arg(long, global = true)]
    pub embedding_layer: Option<usize>,

    #[arg(long, global = true)]
    pub genome_root: Option<PathBuf>,
}

/// Where the TF embedding comes from.
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct TfArgs {
    /// Amino-acid sequence, embedded with ESM-2
    #[arg(long)]
    pub protein: Option<String>,

    /// Precomputed embedding artifact
    #[arg(long)]
    pub embedding: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Predict binding of one TF to one DNA sequence
    Predict {
        #[command(flatten)]
        tf: TfArgs,
        #[arg(long)]
        dna: String,
    },
    /// Compare the TF against a panel of reference TFs
    Compare {
        #[command(flatten)]
        tf: TfArgs,
        #[arg(long)]
        dna: String,
        #[arg(long, value_delimiter = ',', default_values_t = DEFAULT_PANEL.map(String::from))]
        panel: Vec<String>,
        /// Write an SVG bar chart
        #[arg(long)]
        plot: Option<PathBuf>,
    },
    /// Binding profile along a genomic region
    Scan {
        #[command(flatten)]
        tf: TfArgs,
        #[arg(long, conflicts_with_all = ["chrom", "start", "end"])]
        preset: Option<PromoterPreset>,
        #[arg(long, requires_all = ["start", "end"])]
        chrom: Option<String>,
        #[arg(long)]
        start: Option<usize>,
        #[arg(long)]
        end: Option<usize>,
        /// Subtracted from window offsets
        #[arg(long, default_value_t = 0)]
        radius: usize,
        #[arg(long, default_value_t = DEFAULT_WINDOW_SIZE)]
        window_size: usize,
        #[arg(long, default_value_t = DEFAULT_STEP_SIZE)]
        step_size: usize,
        /// Write an SVG bar chart
        #[arg(long)]
        plot: Option<PathBuf>,
    },
    /// Save the per-token ESM-2 embedding of a protein as an artifact
    Embed {
        #[arg(long)]
        protein: String,
        #[arg(long)]
        output: PathBuf,
    },
}

impl Cli {
    pub fn execute(self) -> anyhow::Result<()> {
        let ctx = &self.context;
        match self.command {
            Commands::Predict { tf, dna } => commands::predict::execute(ctx, &tf, &dna),
            Commands::Compare {
                tf,
                dna,
                panel,
                plot,
            } => commands::compare::execute(ctx, &tf, &dna, &panel, plot.as_deref()),
            Commands::Scan {
                tf,
                preset,
                chrom,
                start,
                end,
                radius,
                window_size,
                step_size,
                plot,
            } => {
                let request = commands::scan::resolve_request(
                    preset,
                    chrom,
                    start,
                    end,
                    radius,
                    window_size,
                    step_size,
                )?;
                commands::scan::execute(ctx, &tf, &request, plot.as_deref())
            }
            Commands::Embed { protein, output } => {
                commands::embed::execute(ctx, &protein, &output)
            }
        }
    }
}
