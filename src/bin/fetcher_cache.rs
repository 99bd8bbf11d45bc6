//! fetcher-cache — inspect and edit the fetcher cache.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use fetcher_cache::{Cache, FetcherCache, Settings, attrs};

/// Inspect and edit the fetcher cache
#[derive(Parser)]
#[command(name = "fetcher-cache")]
#[command(version = fetcher_cache::PKG_VERSION)]
#[command(about = "Inspect and edit the persistent fetcher cache")]
struct Args {
    /// Path to a settings file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured TTL in seconds (0 = always expire).
    #[arg(long, env = "FETCHER_CACHE_TTL")]
    ttl: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the database location
    Path,

    /// Print version information
    Version,

    /// Record a path-less entry
    Add {
        /// Input attributes as a JSON object
        input: String,
        /// Info attributes as a JSON object
        info: String,
    },

    /// Look up a path-less entry, including expired ones
    Lookup {
        /// Input attributes as a JSON object
        input: String,
    },

    /// Read or write facts
    Fact {
        #[command(subcommand)]
        command: FactCommand,
    },
}

#[derive(Subcommand)]
enum FactCommand {
    /// Print the value of a fact
    Get { key: String },
    /// Set a fact
    Set { key: String, value: String },
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    // Initialise tracing (default: warn; override with RUST_LOG).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut settings = Settings::load(args.config.as_deref())?;
    if let Some(ttl) = args.ttl {
        settings.cache.ttl_secs = ttl;
    }

    let open = || FetcherCache::open(&settings);

    match args.command {
        Command::Path => println!("{}", settings.db_path()?.display()),
        Command::Version => println!("{}", fetcher_cache::version_string()),
        Command::Add { input, info } => {
            open()?.add(&attrs::decode(&input)?, &attrs::decode(&info)?)?;
        }
        Command::Lookup { input } => match open()?.lookup_expired2(&attrs::decode(&input)?)? {
            Some(res) => {
                let out = serde_json::json!({
                    "expired": res.expired,
                    "info": attrs::attrs_to_json(&res.info_attrs),
                });
                println!("{out}");
            }
            None => {
                eprintln!("not cached");
                return Ok(ExitCode::FAILURE);
            }
        },
        Command::Fact { command } => match command {
            FactCommand::Get { key } => match open()?.query_fact(&key)? {
                Some(value) => println!("{value}"),
                None => {
                    eprintln!("no fact recorded for '{key}'");
                    return Ok(ExitCode::FAILURE);
                }
            },
            FactCommand::Set { key, value } => open()?.upsert_fact(&key, &value)?,
        },
    }

    Ok(ExitCode::SUCCESS)
}

