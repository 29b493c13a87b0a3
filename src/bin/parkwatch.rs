//! parkwatch - operator CLI
//!
//! Works directly on the status database, without the daemon. Every command
//! prints JSON to stdout.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use parkwatch::{
    config::ServiceConfig, load_areas, open_source, BackendRegistry, ModePreference,
    ParkingService, RawDetection, ScriptedBackend, SqliteStatusStore, StatusStore,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Inspect and drive parking-slot occupancy")]
struct Cli {
    /// Status database path (overrides config).
    #[arg(long, env = "PARKWATCH_DB_PATH")]
    db: Option<String>,

    /// Areas file path (overrides config).
    #[arg(long, env = "PARKWATCH_AREAS")]
    areas: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List configured areas.
    Areas,
    /// Scan an area and store the result.
    Scan(ScanArgs),
    /// Scan an area and book its first available slot.
    Assign {
        #[command(flatten)]
        scan: ScanArgs,
        /// Booking owner.
        #[arg(long)]
        user: String,
    },
    /// Release a booked slot.
    Release {
        #[arg(long)]
        area: String,
        #[arg(long)]
        slot: String,
    },
    /// Show stored slot states.
    Status {
        #[arg(long)]
        area: String,
    },
    /// Show the booking trail.
    Bookings {
        #[arg(long)]
        area: String,
    },
}

#[derive(Args, Debug)]
struct ScanArgs {
    #[arg(long)]
    area: String,

    /// JSON file with detector boxes to replay instead of running a model.
    #[arg(long, value_name = "PATH")]
    detections: Option<PathBuf>,

    /// Still image to scan instead of the configured capture source
    /// (needs the ingest-image feature).
    #[arg(long, value_name = "PATH")]
    image: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let mut config = ServiceConfig::load()?;
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    if let Some(areas) = cli.areas {
        config.areas_path = areas;
    }

    match cli.command {
        Command::Areas => {
            let service = open_service(&config, None)?;
            print_json(&service.list_areas())
        }
        Command::Scan(args) => {
            let service = open_service(&config, args.detections.as_deref())?;
            let report = match &args.image {
                Some(path) => {
                    let frame = capture_image(path)?;
                    service.scan_frame(&args.area, &frame)?
                }
                None => service.scan(&args.area)?,
            };
            print_json(&report)
        }
        Command::Assign { scan, user } => {
            let service = open_service(&config, scan.detections.as_deref())?;
            match &scan.image {
                Some(path) => {
                    let frame = capture_image(path)?;
                    service.scan_frame(&scan.area, &frame)?;
                }
                None => {
                    service.scan(&scan.area)?;
                }
            }
            let record = service.book_first_available(&scan.area, &user)?;
            print_json(&record)
        }
        Command::Release { area, slot } => {
            let service = open_service(&config, None)?;
            let released = service.release(&area, &slot)?;
            print_json(&serde_json::json!({ "ok": true, "released": released }))
        }
        Command::Status { area } => {
            let service = open_service(&config, None)?;
            print_json(&service.status(&area)?)
        }
        Command::Bookings { area } => {
            let service = open_service(&config, None)?;
            print_json(&service.bookings(&area)?)
        }
    }
}

fn open_service(
    config: &ServiceConfig,
    detections: Option<&std::path::Path>,
) -> Result<ParkingService> {
    let areas = load_areas(&config.areas_path)
        .with_context(|| format!("loading areas from {}", config.areas_path.display()))?;
    let store: Arc<dyn StatusStore> = Arc::new(
        SqliteStatusStore::open(&config.db_path)
            .with_context(|| format!("opening database {}", config.db_path))?,
    );

    let mut registry = BackendRegistry::new();
    let mut options = config.service_options()?;
    if let Some(path) = detections {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading detections from {}", path.display()))?;
        let dets: Vec<RawDetection> = serde_json::from_str(&raw)
            .with_context(|| format!("parsing detections from {}", path.display()))?;
        registry.register(ScriptedBackend::fixed(dets));
        options.mode = ModePreference::Detector;
    }

    Ok(ParkingService::new(
        areas,
        store,
        registry,
        Box::new(config.capture_provider()),
        options,
    )?)
}

fn capture_image(path: &std::path::Path) -> Result<parkwatch::Frame> {
    let uri = path.to_string_lossy();
    let mut source = open_source(&uri)?;
    Ok(source.next_frame()?)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
