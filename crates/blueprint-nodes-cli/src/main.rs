//! blueprint-nodes CLI: detect circular markers and export node configurations.

use blueprint_nodes::{
    BlueprintSession, DetectConfig, DetectionParameters, NodeStatus, SENSITIVITY_RANGE,
};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "blueprint-nodes")]
#[command(about = "Detect circular node markers on blueprint images and export their occupancy")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print pre-analysis statistics and estimated detection parameters.
    Analyze(CliAnalyzeArgs),

    /// Detect markers and write the configuration document.
    Detect(CliDetectArgs),
}

#[derive(Debug, Clone, Args)]
struct CliAnalyzeArgs {
    /// Path to the input image.
    #[arg(long)]
    image: PathBuf,

    /// Optional JSON file with `DetectConfig` overrides.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct CliDetectArgs {
    /// Path to the input image.
    #[arg(long)]
    image: PathBuf,

    /// Path to write the configuration document (JSON).
    #[arg(long)]
    out: PathBuf,

    /// Minimum distance between marker centers (px).
    #[arg(long)]
    min_distance: Option<f32>,

    /// Smallest marker radius searched (px).
    #[arg(long)]
    min_radius: Option<f32>,

    /// Largest marker radius searched (px).
    #[arg(long)]
    max_radius: Option<f32>,

    /// Accumulator threshold; higher reports fewer, stronger circles.
    #[arg(long)]
    sensitivity: Option<f32>,

    /// Node ids to mark occupied before export (repeatable).
    #[arg(long, num_args = 1..)]
    occupied: Vec<u32>,

    /// Optional JSON file with `DetectConfig` overrides.
    #[arg(long)]
    config: Option<PathBuf>,
}

impl CliDetectArgs {
    fn manual_count(&self) -> usize {
        [
            self.min_distance,
            self.min_radius,
            self.max_radius,
            self.sensitivity,
        ]
        .iter()
        .filter(|v| v.is_some())
        .count()
    }

    /// Overlay explicitly given values on `base`.
    fn to_parameters(&self, base: &DetectionParameters) -> CliResult<DetectionParameters> {
        let params = DetectionParameters::new(
            self.min_distance.unwrap_or(base.min_distance()),
            self.min_radius.unwrap_or(base.min_radius()),
            self.max_radius.unwrap_or(base.max_radius()),
            self.sensitivity.unwrap_or(base.sensitivity()),
        )?;
        Ok(params)
    }
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze(args) => run_analyze(&args),
        Commands::Detect(args) => run_detect(&args),
    }
}

fn load_config(path: Option<&Path>) -> CliResult<DetectConfig> {
    match path {
        Some(p) => {
            tracing::info!("Loading config: {}", p.display());
            DetectConfig::from_json_file(p)
        }
        None => Ok(DetectConfig::default()),
    }
}

fn open_session(image: &Path, config: DetectConfig) -> CliResult<BlueprintSession> {
    tracing::info!("Loading image: {}", image.display());
    let img = blueprint_nodes::load_image(image)?;
    let session = BlueprintSession::with_config(&img, config)?;
    let (w, h) = session.dimensions();
    tracing::info!("Image size: {}x{}", w, h);
    Ok(session)
}

fn run_analyze(args: &CliAnalyzeArgs) -> CliResult<()> {
    let config = load_config(args.config.as_deref())?;
    let session = open_session(&args.image, config)?;

    let stats = session.analyze();
    let params = blueprint_nodes::estimate(&stats);

    println!("edge density:      {:.4}", stats.edge_density);
    println!("regions examined:  {}", stats.regions_examined);
    println!("circular regions:  {}", stats.candidate_radii.len());
    println!();
    println!("estimated parameters");
    println!("  min distance:    {}", params.min_distance());
    println!("  min radius:      {}", params.min_radius());
    println!("  max radius:      {}", params.max_radius());
    println!("  sensitivity:     {}", params.sensitivity());
    Ok(())
}

fn run_detect(args: &CliDetectArgs) -> CliResult<()> {
    let config = load_config(args.config.as_deref())?;
    let mut session = open_session(&args.image, config)?;

    let run = if args.manual_count() > 0 {
        // Values left out of a partial override come from the estimator.
        let base = if args.manual_count() == 4 {
            DetectionParameters::default()
        } else {
            session.estimate_parameters()
        };
        let params = args.to_parameters(&base)?;
        if !SENSITIVITY_RANGE.contains(&params.sensitivity()) {
            tracing::warn!(
                "sensitivity {} is outside the usual range {:?}",
                params.sensitivity(),
                SENSITIVITY_RANGE
            );
        }
        session.run_manual(&params)
    } else {
        session.run_auto()
    };
    let n = session.commit(run).len();

    for &id in &args.occupied {
        session.set_status(id, NodeStatus::Occupied)?;
    }

    let doc = session.export()?;
    tracing::info!(
        "Detected {} markers ({} occupied)",
        n,
        doc.occupied_count()
    );

    let json = doc.to_json_pretty()?;
    std::fs::write(&args.out, &json)?;
    tracing::info!("Configuration written to {}", args.out.display());
    Ok(())
}
