use clap::{Parser, Subcommand};
use cli::{TallyPlan, load_config, parse_point};
use color_eyre::eyre::Result;
use counting::{CountReport, Session, SessionConfig};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a whole plan file: pick, train, count, save
    Run {
        /// Path to the plan file (.json or .toml)
        #[arg(short, long)]
        plan: PathBuf,
    },
    /// Grow training regions for a class from seed points
    Pick {
        /// Path to the photo
        photo: PathBuf,
        /// Class receiving the picks
        #[arg(short = 'k', long)]
        class: String,
        /// Seed points as x,y pairs
        #[arg(required = true, value_parser = parse_point)]
        points: Vec<(i32, i32)>,
        /// Path to the JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Remove the trained region containing a point
    Unpick {
        /// Path to the photo
        photo: PathBuf,
        /// Point inside the region, as x,y
        #[arg(value_parser = parse_point)]
        point: (i32, i32),
        /// Path to the JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Forget all training for a class
    Clear {
        /// Path to the photo
        photo: PathBuf,
        /// Class to clear
        #[arg(short = 'k', long)]
        class: String,
        /// Path to the JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Cluster the picked samples into a palette
    Train {
        /// Path to the photo
        photo: PathBuf,
        /// Path to the JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Classify the photo and count cards per class
    Count {
        /// Path to the photo
        photo: PathBuf,
        /// Path to the JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Override the color-diff threshold
        #[arg(short, long)]
        threshold: Option<f32>,
        /// Override the minimum card size filter
        #[arg(short, long)]
        size_filter: Option<f32>,
        /// Save the classification difference image here
        #[arg(short, long)]
        diff: Option<PathBuf>,
        /// Save a JSON report of counts and outlines here
        #[arg(short, long)]
        report: Option<PathBuf>,
    },
    /// Show what the session knows about a photo
    Status {
        /// Path to the photo
        photo: PathBuf,
        /// Path to the JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Print the JSON schema for plan or configuration files
    Schema {
        /// Print the plan schema instead of the configuration schema
        #[arg(long)]
        plan: bool,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Run { plan } => {
            run_plan(plan)?;
        }
        Commands::Pick {
            photo,
            class,
            points,
            config,
        } => {
            pick(photo, class, points, config.as_deref())?;
        }
        Commands::Unpick {
            photo,
            point,
            config,
        } => {
            unpick(photo, *point, config.as_deref())?;
        }
        Commands::Clear {
            photo,
            class,
            config,
        } => {
            clear(photo, class, config.as_deref())?;
        }
        Commands::Train { photo, config } => {
            train(photo, config.as_deref())?;
        }
        Commands::Count {
            photo,
            config,
            threshold,
            size_filter,
            diff,
            report,
        } => {
            count(
                photo,
                config.as_deref(),
                *threshold,
                *size_filter,
                diff.as_deref(),
                report.as_deref(),
            )?;
        }
        Commands::Status { photo, config } => {
            status(photo, config.as_deref())?;
        }
        Commands::Schema { plan } => {
            print_schema(*plan)?;
        }
    }

    Ok(())
}

fn run_plan(plan_path: &Path) -> Result<()> {
    let plan = TallyPlan::from_file(plan_path)?;
    info!("Running plan for {}", plan.photo);

    let config = plan.config.clone().unwrap_or_default();
    let mut session = Session::open(plan.photo.as_str(), config)?;

    for picks in &plan.picks {
        session.train_class(&picks.class)?;
        for &(x, y) in &picks.points {
            if session.pick(x, y).is_none() {
                warn!("Pick ({x}, {y}) for '{}' grew nothing", picks.class);
            }
        }
    }

    session.train()?;
    let report = session.count()?;
    print_report(&report);
    session.save();

    info!("✅ Plan completed!");
    Ok(())
}

fn pick(photo: &Path, class: &str, points: &[(i32, i32)], config: Option<&Path>) -> Result<()> {
    let mut session = Session::open(photo, load_config(config)?)?;
    session.train_class(class)?;

    let mut grown = 0usize;
    for &(x, y) in points {
        match session.pick(x, y) {
            Some(_) => grown += 1,
            None => warn!("Pick ({x}, {y}) grew nothing"),
        }
    }
    session.save();

    info!("{grown} of {} picks grew a region for '{class}'", points.len());
    Ok(())
}

fn unpick(photo: &Path, point: (i32, i32), config: Option<&Path>) -> Result<()> {
    let mut session = Session::open(photo, load_config(config)?)?;
    match session.unpick(point.0, point.1) {
        Some(class) => {
            info!(
                "Removed a '{}' region at ({}, {})",
                session.config().class_name(class),
                point.0,
                point.1
            );
            session.save();
        }
        None => warn!("No trained region at ({}, {})", point.0, point.1),
    }
    Ok(())
}

fn clear(photo: &Path, class: &str, config: Option<&Path>) -> Result<()> {
    let mut session = Session::open(photo, load_config(config)?)?;
    let class_id = session
        .config()
        .class_id(class)
        .ok_or_else(|| color_eyre::eyre::eyre!("Unknown class '{class}'"))?;
    session.clear_class(class_id);
    session.save();
    Ok(())
}

fn train(photo: &Path, config: Option<&Path>) -> Result<()> {
    let mut session = Session::open(photo, load_config(config)?)?;
    session.train()?;
    let entries = session.palette().map(|p| p.len()).unwrap_or(0);
    info!("✅ Trained a palette of {entries} entries");
    Ok(())
}

fn count(
    photo: &Path,
    config: Option<&Path>,
    threshold: Option<f32>,
    size_filter: Option<f32>,
    diff: Option<&Path>,
    report_path: Option<&Path>,
) -> Result<()> {
    let mut config = load_config(config)?;
    if let Some(threshold) = threshold {
        config.color_diff_threshold = threshold;
    }
    if let Some(size_filter) = size_filter {
        config.size_filter = size_filter;
    }

    let mut session = Session::open(photo, config)?;
    let report = session.count()?;
    print_report(&report);

    if let Some(path) = diff {
        report.diff.save(path)?;
        info!("Wrote the difference image to {}", path.display());
    }
    if let Some(path) = report_path {
        std::fs::write(path, serde_json::to_string_pretty(&report.classes)?)?;
        info!("Wrote the count report to {}", path.display());
    }
    Ok(())
}

fn status(photo: &Path, config: Option<&Path>) -> Result<()> {
    let session = Session::open(photo, load_config(config)?)?;
    let (width, height) = session.photo_size();
    info!("Photo: {} ({width}x{height})", photo.display());
    info!("Cache: {}", session.cache_dir().display());

    for class in session.config().class_ids().collect::<Vec<_>>() {
        info!(
            "  {}: {} picks, {} regions, {} mask pixels",
            session.config().class_name(class),
            session.picks_for(class).len(),
            session.outlines_for(class).len(),
            session.mask_pixels(class)
        );
    }
    match session.palette() {
        Some(palette) => info!("Palette: {} entries", palette.len()),
        None => info!("Palette: not trained yet"),
    }
    Ok(())
}

fn print_report(report: &CountReport) {
    for class in &report.classes {
        info!("{}: {} cards", class.name, class.count);
    }
    info!("Total: {} cards", report.total());
}

fn print_schema(plan: bool) -> Result<()> {
    let schema = if plan {
        schemars::schema_for!(TallyPlan)
    } else {
        schemars::schema_for!(SessionConfig)
    };
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}
