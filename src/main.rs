//! Command-line shell around the match service: bootstrap a corpus
//! database from JSON batches, then classify one clip.

use std::path::PathBuf;
use std::process::ExitCode;

use echodex::config::Config;
use echodex::corpus::SqliteStore;
use echodex::logging;
use echodex::matching::majority_genre;
use echodex::service::MatchService;

struct Args {
    config: Option<PathBuf>,
    database: PathBuf,
    ingest_dir: PathBuf,
    clip: PathBuf,
}

fn main() -> ExitCode {
    if let Err(err) = logging::init() {
        eprintln!("Failed to initialize logging: {err}");
    }
    let args = match parse_args() {
        Some(args) => args,
        None => {
            eprintln!("Usage: echodex [--config <file>] <database> <ingest-dir> <clip>");
            return ExitCode::from(2);
        }
    };
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn parse_args() -> Option<Args> {
    let mut positional = Vec::new();
    let mut config = None;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            config = Some(PathBuf::from(args.next()?));
        } else {
            positional.push(PathBuf::from(arg));
        }
    }
    let mut positional = positional.into_iter();
    Some(Args {
        config,
        database: positional.next()?,
        ingest_dir: positional.next()?,
        clip: positional.next()?,
    })
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let store = SqliteStore::open(&args.database)?;
    let service = MatchService::new(config, Box::new(store))?;
    service.bootstrap(&args.ingest_dir)?;

    let bytes = std::fs::read(&args.clip)?;
    let matches = service.classify_bytes(&bytes)?;
    println!("{}", serde_json::to_string_pretty(&matches)?);
    if let Some(genre) = majority_genre(&matches) {
        tracing::info!("Majority genre index: {genre}");
    }
    service.shutdown();
    Ok(())
}
