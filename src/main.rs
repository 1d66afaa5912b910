use rand::{rngs::StdRng, SeedableRng};
use thiserror::Error;
use tracing::debug;

use std::path::PathBuf;

use shell::Shell;
use storage::SqliteStore;
use tier_store::TierStore;
use tmdb::TmdbClient;

mod catalog;
mod heatmap;
mod shell;
mod storage;
mod suggest;
mod tier_store;
mod tmdb;
mod types;

const STORAGE_SCOPE: &str = "tier-tracker";

#[derive(Error, Debug)]
enum ArgParseError {
    #[error("Unknown arg {0}")]
    UnknownArg(String),
    #[error("No db path argument provided")]
    NoDbPath,
    #[error("No api key provided, use --api-key or TMDB_API_KEY")]
    NoApiKey,
}

struct Args {
    db_path: PathBuf,
    api_key: String,
}

impl Args {
    fn parse() -> Result<Args, ArgParseError> {
        let mut args = std::env::args();
        let _process_name = args.next();

        let mut db_path = None;
        let mut api_key = None;
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--help" => {
                    println!("{}", Self::help());
                    std::process::exit(1);
                }
                "--db-path" => {
                    db_path = args.next().map(Into::into);
                }
                "--api-key" => {
                    api_key = args.next();
                }
                _ => {
                    return Err(ArgParseError::UnknownArg(arg));
                }
            }
        }

        let db_path = db_path.ok_or(ArgParseError::NoDbPath)?;
        let api_key = api_key
            .or_else(|| std::env::var("TMDB_API_KEY").ok())
            .ok_or(ArgParseError::NoApiKey)?;

        Ok(Args { db_path, api_key })
    }

    fn help() -> String {
        let process_name = std::env::args()
            .next()
            .unwrap_or_else(|| "tier-tracker".to_string());

        format!(
            "Rank your tv shows\n\
                \n\
                Usage: {process_name} [ARGS]\n\
                \n\
                Args:\n\
                --help: Show this help\n\
                --db-path: Where to store tracked shows\n\
                --api-key: TMDB api key, defaults to the TMDB_API_KEY environment variable\n\
                \n\
                {}\n\
                ",
            shell::Command::help()
        )
    }
}

fn main() {
    tracing_subscriber::fmt::init();

    let args = match Args::parse() {
        Ok(v) => v,
        Err(e) => {
            println!("{}", e);
            println!();
            println!("{}", Args::help());
            return;
        }
    };

    let storage = match SqliteStore::new(&args.db_path, STORAGE_SCOPE) {
        Ok(v) => v,
        Err(e) => {
            println!("Failed to open {}: {e}", args.db_path.display());
            return;
        }
    };

    let mut store = match TierStore::open(storage) {
        Ok(v) => v,
        Err(e) => {
            println!("Failed to load tracked shows: {e}");
            return;
        }
    };

    store.subscribe(|state| {
        debug!(
            "State changed: {} tier entries, {} watchlist entries",
            state.tier_items.len(),
            state.watchlist.len()
        );
    });

    let catalog = TmdbClient::new(args.api_key);
    let mut shell = Shell::new(
        store,
        catalog,
        StdRng::from_entropy(),
        std::io::stdout(),
    );

    if let Err(e) = shell.run(std::io::stdin().lock()) {
        println!("Failed to run shell: {e}");
    }
}
