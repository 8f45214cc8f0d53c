use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use intopp_core::ModelConfig;
use intopp_store::{LogProgress, Store};

#[derive(Parser)]
#[command(name = "intopp", about = "Intervening-opportunities model driver")]
struct Cli {
    /// Model database path
    #[arg(long, global = true, default_value = "intopp.sqlite")]
    db: PathBuf,

    /// TOML file overriding model parameter field names
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a JSON dataset (points, values, distances)
    Load {
        /// Dataset file path
        path: PathBuf,
    },

    /// Write the points, values, and distances back out as a JSON dataset
    Export {
        /// Output file path
        path: PathBuf,
    },

    /// (Re)build the parameter table from the named point values
    InitParams,

    /// Build rings around every origin
    Rings {
        #[command(subcommand)]
        policy: RingPolicy,
    },

    /// Calibrate selectivity from a target escape fraction
    Calibrate {
        /// Probability an object finds no destination, in (0, 1)
        #[arg(long)]
        efs: f64,
    },

    /// Recompute per-ring destination mass totals
    Totals,

    /// Run the motion-exchange computation
    Exchange,

    /// Renormalize exchange so remaining objects are the new 100%
    Normalize,

    /// Redistribute mass after an exchange run
    Shift {
        #[arg(value_enum)]
        kind: ShiftKind,
    },

    /// Snapshot origins/destinations/selectivity under suffixed names
    Save {
        #[arg(long)]
        suffix: String,
    },

    /// Save one parameter field into the named value store
    SaveParam {
        #[arg(long)]
        parameter: String,
        #[arg(long)]
        name: String,
    },

    /// Show dataset and model statistics
    Stats,
}

#[derive(Subcommand)]
enum RingPolicy {
    /// Uniform distance binning into n rings
    Uniform {
        #[arg(short)]
        n: i64,
        /// Snap uncaptured destinations to the last ring
        #[arg(long)]
        snap: bool,
    },
    /// Binning with a caller-supplied width factor
    Weighted {
        #[arg(short)]
        w: f64,
        #[arg(long)]
        snap: bool,
    },
    /// Explicit layouts, shared or parsed from point descriptions
    Layout {
        /// Comma-separated ring sizes applied to every origin
        #[arg(long, value_delimiter = ',')]
        sizes: Option<Vec<f64>>,
        #[arg(long)]
        snap: bool,
    },
    /// Degenerate mode: each point alone in its first ring
    FirstRingOnly,
}

#[derive(Clone, Copy, ValueEnum)]
enum ShiftKind {
    Origins,
    Destinations,
    General,
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<ModelConfig> {
    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            toml::from_str(&text).context("invalid model config")
        }
        None => Ok(ModelConfig::default()),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let store = Store::open(&cli.db)
        .with_context(|| format!("failed to open model database {}", cli.db.display()))?;
    let config = load_config(cli.config.as_deref())?;

    match &cli.command {
        Commands::Load { path } => {
            store.import_dataset_file(path)?;
            store.init_model_parameters(&config)?;
            println!("loaded {} points", store.point_count()?);
        }
        Commands::Export { path } => {
            store.export_dataset_file(path)?;
            println!("exported {} points to {}", store.point_count()?, path.display());
        }
        Commands::InitParams => {
            store.init_model_parameters(&config)?;
            println!("initialized parameters for {} points", store.point_count()?);
        }
        Commands::Rings { policy } => cmd_rings(&store, &config, policy)?,
        Commands::Calibrate { efs } => {
            let selectivity = store.create_escape_fraction_selectivity(*efs)?;
            println!("selectivity: {selectivity:.9}");
        }
        Commands::Totals => {
            store.ring_total()?;
            println!("ring totals recomputed");
        }
        Commands::Exchange => {
            let mut progress = LogProgress::default();
            store.motion_exchange(&mut progress)?;
            println!("motion exchange complete");
        }
        Commands::Normalize => {
            store.normalize_motion_exchange()?;
            println!("motion exchange normalized");
        }
        Commands::Shift { kind } => {
            match kind {
                ShiftKind::Origins => store.origins_shift()?,
                ShiftKind::Destinations => store.destination_shift()?,
                ShiftKind::General => store.general_shift()?,
            }
            println!("shift applied");
        }
        Commands::Save { suffix } => {
            store.save_intopp_parameters(suffix)?;
            println!("parameters saved with suffix '{suffix}'");
        }
        Commands::SaveParam { parameter, name } => {
            store.save_model_parameters(parameter, name)?;
            println!("saved {parameter} as '{name}'");
        }
        Commands::Stats => cmd_stats(&store)?,
    }
    Ok(())
}

fn cmd_rings(store: &Store, config: &ModelConfig, policy: &RingPolicy) -> Result<()> {
    let snap = match policy {
        RingPolicy::Uniform { n, snap } => {
            store.build_uniform_rings(*n)?;
            *snap
        }
        RingPolicy::Weighted { w, snap } => {
            store.build_weighted_rings(*w)?;
            *snap
        }
        RingPolicy::Layout { sizes, snap } => {
            store.read_rings_layout(config, sizes.as_deref())?;
            store.build_rings_from_layout()?;
            *snap
        }
        RingPolicy::FirstRingOnly => {
            store.only_origin_in_first_ring()?;
            false
        }
    };
    if snap {
        store.snap_outstanding_od_to_last_ring()?;
    }

    let rings: i64 = store
        .conn()
        .query_row("SELECT count(*) FROM ring", [], |row| row.get(0))?;
    println!("rings: {rings} memberships");
    Ok(())
}

fn cmd_stats(store: &Store) -> Result<()> {
    let count = |table: &str| -> Result<i64> {
        let n = store
            .conn()
            .query_row(&format!("SELECT count(*) FROM {table}"), [], |row| {
                row.get(0)
            })?;
        Ok(n)
    };

    println!("points:     {}", count("od_point")?);
    println!("distances:  {}", count("distance")?);
    println!("rings:      {}", count("ring")?);
    println!("totals:     {}", count("ring_total")?);
    println!("exchanges:  {}", count("motion_exchange")?);
    match store.get_max_distance() {
        Ok(max) => println!("max dist:   {max}"),
        Err(_) => println!("max dist:   n/a"),
    }
    Ok(())
}
