use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;
use lib_docview::loggers::{init_tracing, LogOptions};
use lib_docview::retrieve::{FileOfflineCache, OfflineCache};

/// Inspects the persisted offline cache.
#[derive(Parser, Debug)]
#[command(
    version,
    about,
    long_about = "Lists the responses stored in a persisted offline cache directory, prints the stored body of one URL, or empties the cache."
)]
struct Args {
    /// Offline cache directory.
    #[arg(short, long, env = "DOCVIEW_OFFLINE_DIR")]
    dir: PathBuf,

    /// Print the stored body of this URL.
    #[arg(short, long)]
    url: Option<String>,

    /// List entries as JSON.
    #[arg(short, long)]
    json: bool,

    /// Delete every entry.
    #[arg(long)]
    clear: bool,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    let _guard = init_tracing(&LogOptions::from_env("offline-cache"))?;

    let cache = FileOfflineCache::open(&args.dir)?;

    if args.clear {
        let removed = cache.clear()?;
        tracing::info!("Removed {} entries from {}", removed, cache.dir().display());
        return Ok(());
    }

    if let Some(url) = args.url {
        let Some(record) = cache.lookup(&url) else {
            bail!("No offline copy of {}", url);
        };
        io::stdout().write_all(record.response_text.unwrap_or_default().as_bytes())?;
        return Ok(());
    }

    let entries = cache.entries()?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }
    for entry in &entries {
        println!(
            "{:>3} {:<12} {:>9} {}",
            entry.record.status,
            entry.record.status_text,
            entry.record.body_len(),
            entry.url
        );
    }
    tracing::info!("{} entries in {}", entries.len(), cache.dir().display());
    Ok(())
}
