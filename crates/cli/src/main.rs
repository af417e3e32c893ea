//! floodosp CLI - Open Space Preservation credit estimates for CRS communities

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use floodosp_core::Region;
use floodosp_pipeline::{
    CommunityResult, CommunityRunner, CommunitySelection, CoordinateSpace, DatasetPaths, Datasets,
    FieldNames, PipelineParams, ProtectedAreasSource, RunConfig, RunSummary, Workspace,
};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "floodosp")]
#[command(author, version, about = "Open Space Preservation credit estimates for CRS communities", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute credits for one community or every community in the hazard layer
    Run(RunArgs),
    /// List community IDs found in a hazard-boundary layer
    Communities {
        /// Hazard-boundary GeoJSON
        input: PathBuf,
        /// Community ID attribute
        #[arg(short, long, default_value = "CID")]
        field: String,
    },
    /// List supported states and their State Plane projections
    Regions,
}

#[derive(Args)]
struct RunArgs {
    /// JSON run configuration; replaces every option below except --parallel and --json
    #[arg(short, long, conflicts_with_all = ["region", "community", "all", "workspace"])]
    config: Option<PathBuf>,

    /// State code: NC, FL, VA or SC
    #[arg(short, long)]
    region: Option<Region>,

    /// Single community ID
    #[arg(long, conflicts_with = "all")]
    community: Option<String>,

    /// Process every community in the hazard-boundary layer
    #[arg(long)]
    all: bool,

    /// Output directory
    #[arg(short, long)]
    workspace: Option<PathBuf>,

    #[command(flatten)]
    datasets: DatasetArgs,

    /// Origin of the protected-areas layer
    #[arg(long, value_enum, default_value = "national-inventory")]
    protected_source: SourceArg,

    /// Inputs are in longitude/latitude rather than State Plane
    #[arg(long)]
    geographic: bool,

    /// Process communities on all cores
    #[arg(long)]
    parallel: bool,

    /// Print the result rows as JSON when done
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct DatasetArgs {
    /// Hazard-boundary layer carrying community IDs
    #[arg(long)]
    hazard_boundary: Option<PathBuf>,
    /// Flood-hazard layer carrying the SFHA flag (defaults to the boundary layer)
    #[arg(long)]
    flood_hazard: Option<PathBuf>,
    /// Hydrography area polygons
    #[arg(long)]
    hydro_area: Option<PathBuf>,
    /// Hydrography waterbody polygons
    #[arg(long)]
    hydro_waterbody: Option<PathBuf>,
    /// Percent impervious GeoTIFF
    #[arg(long)]
    impervious: Option<PathBuf>,
    /// Land-cover GeoTIFF
    #[arg(long)]
    land_cover: Option<PathBuf>,
    /// Protected-areas polygons
    #[arg(long)]
    protected_areas: Option<PathBuf>,
    /// Parcel polygons
    #[arg(long)]
    parcels: Option<PathBuf>,
    /// Virginia conservation easements
    #[arg(long)]
    easements: Option<PathBuf>,
    /// Virginia resource protection areas
    #[arg(long)]
    resource_protection: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum SourceArg {
    NationalInventory,
    Custom,
}

impl From<SourceArg> for ProtectedAreasSource {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::NationalInventory => ProtectedAreasSource::NationalInventory,
            SourceArg::Custom => ProtectedAreasSource::Custom,
        }
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn progress_bar(len: usize) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    if let Ok(style) =
        ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
    {
        pb.set_style(style);
    }
    pb
}

fn required(value: Option<PathBuf>, flag: &str) -> Result<PathBuf> {
    match value {
        Some(path) => Ok(path),
        None => bail!("--{} is required without --config", flag),
    }
}

/// Build the run configuration from a JSON file or from flags
fn build_config(args: &RunArgs) -> Result<RunConfig> {
    if let Some(path) = &args.config {
        return RunConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config: {}", path.display()));
    }

    let Some(region) = args.region else {
        bail!("--region is required without --config");
    };
    let communities = match (&args.community, args.all) {
        (Some(id), false) => CommunitySelection::One(id.clone()),
        (None, true) => CommunitySelection::All,
        _ => bail!("pass exactly one of --community or --all"),
    };

    let d = &args.datasets;
    let hazard_boundary = required(d.hazard_boundary.clone(), "hazard-boundary")?;
    let datasets = DatasetPaths {
        flood_hazard: d.flood_hazard.clone().unwrap_or_else(|| hazard_boundary.clone()),
        hazard_boundary,
        hydro_area: required(d.hydro_area.clone(), "hydro-area")?,
        hydro_waterbody: required(d.hydro_waterbody.clone(), "hydro-waterbody")?,
        impervious: required(d.impervious.clone(), "impervious")?,
        land_cover: required(d.land_cover.clone(), "land-cover")?,
        protected_areas: required(d.protected_areas.clone(), "protected-areas")?,
        parcels: d.parcels.clone(),
        state_easements: d.easements.clone(),
        resource_protection: d.resource_protection.clone(),
    };

    let config = RunConfig {
        region,
        communities,
        workspace: required(args.workspace.clone(), "workspace")?,
        datasets,
        protected_source: args.protected_source.into(),
        coordinate_space: if args.geographic {
            CoordinateSpace::Geographic
        } else {
            CoordinateSpace::StatePlane
        },
        fields: FieldNames::default(),
        params: PipelineParams::default(),
    };
    config.validate()?;
    Ok(config)
}

fn print_summary(summary: &RunSummary, rows: &[CommunityResult]) {
    println!("Communities processed: {}", summary.communities);
    if !summary.failed.is_empty() {
        println!("  Credits zeroed after errors: {}", summary.failed.join(", "));
    }
    for row in rows {
        println!(
            "  CID {:>8}  aSFHA {:>10.2} ac  current {:>8.2}  future max {:>8.2}",
            row.community_id, row.asfha_acres, row.osp_cred_curr_total, row.osp_cred_future_max
        );
    }
}

fn done(name: &str, path: &PathBuf, elapsed: Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

fn execute(args: RunArgs) -> Result<()> {
    let config = build_config(&args)?;
    if config.region != Region::Virginia
        && (config.datasets.state_easements.is_some() || config.datasets.resource_protection.is_some())
    {
        warn!(region = %config.region, "state easement layers are only used for VA");
    }

    let pb = spinner("Loading datasets...");
    let start = Instant::now();
    let datasets = Datasets::load(&config.datasets, |name| pb.set_message(format!("Reading {}...", name)))
        .context("Failed to load input datasets")?;
    pb.finish_and_clear();
    info!(elapsed = ?start.elapsed(), "datasets loaded");

    let engine = config.engine();
    let runner = CommunityRunner::new(&config, &datasets, &engine);
    let mut workspace = Workspace::new();

    let start = Instant::now();
    let summary = if args.parallel {
        run_parallel(&runner, &mut workspace)?
    } else {
        let pb = progress_bar(runner.community_ids()?.len());
        let summary = runner.run_with(&mut workspace, |row| {
            pb.set_message(format!("CID {}", row.community_id));
            pb.inc(1);
        })?;
        pb.finish_and_clear();
        summary
    };

    let pb = spinner("Writing workspace...");
    let written = workspace
        .save(&config.workspace)
        .with_context(|| format!("Failed to write workspace: {}", config.workspace.display()))?;
    pb.finish_and_clear();
    info!(files = written.len(), "workspace written");

    print_summary(&summary, workspace.results());
    if args.json {
        println!("{}", serde_json::to_string_pretty(workspace.results())?);
    }
    done("Workspace", &config.workspace, start.elapsed());
    Ok(())
}

#[cfg(feature = "parallel")]
fn run_parallel(runner: &CommunityRunner<'_>, workspace: &mut Workspace) -> Result<RunSummary> {
    let pb = spinner("Processing communities in parallel...");
    let summary = runner.run_parallel(workspace)?;
    pb.finish_and_clear();
    Ok(summary)
}

#[cfg(not(feature = "parallel"))]
fn run_parallel(runner: &CommunityRunner<'_>, workspace: &mut Workspace) -> Result<RunSummary> {
    warn!("built without the parallel feature, processing sequentially");
    Ok(runner.run(workspace)?)
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Run(args) => execute(args)?,

        Commands::Communities { input, field } => {
            let layer = floodosp_core::io::read_geojson(&input)
                .with_context(|| format!("Failed to read layer: {}", input.display()))?;
            let datasets = Datasets {
                hazard_boundary: layer,
                ..Default::default()
            };
            let ids = datasets.community_ids(&field);
            if ids.is_empty() {
                bail!("no '{}' values in {}", field, input.display());
            }
            println!("{} communities in {}", ids.len(), input.display());
            for id in ids {
                println!("  {}", id);
            }
        }

        Commands::Regions => {
            for region in Region::ALL {
                let crs = region.state_plane();
                println!(
                    "{}  {}  linear unit {} m",
                    region.code(),
                    crs.identifier(),
                    region.linear_unit_meters()
                );
            }
        }
    }

    Ok(())
}
