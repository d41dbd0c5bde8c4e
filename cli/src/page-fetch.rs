use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use clap::{Parser, ValueEnum};
use lib_docview::loggers::{init_tracing, LogOptions};
use lib_docview::providers::register_src_providers;
use lib_docview::{DocviewSettings, Framework, Locator, Scope};

/// Fetches one page asset through the viewer framework and prints it.
#[derive(Parser, Debug)]
#[command(
    version,
    about,
    long_about = "Bootstraps the viewer framework from a JSON5 settings file, creates a scope and requests one page asset. The processed SVG or text markup (or the image URL) is written to stdout. Failures print the structured asset error and exit non-zero."
)]
struct Args {
    /// Path to the JSON5 settings file. Defaults apply when omitted.
    #[arg(short, long, env = "DOCVIEW_CONFIG")]
    config: Option<PathBuf>,

    /// Viewer origin, overriding `transport.origin`.
    #[arg(long, env = "DOCVIEW_ORIGIN")]
    origin: Option<String>,

    /// Persisted offline cache directory, overriding `transport.offlineCacheDir`.
    #[arg(long, env = "DOCVIEW_OFFLINE_DIR")]
    offline_dir: Option<PathBuf>,

    /// Asset base URL, overriding `viewer.url`.
    #[arg(short, long)]
    url: Option<String>,

    /// Which asset to fetch.
    #[arg(short, long, value_enum, default_value_t = Asset::Svg)]
    asset: Asset,

    /// Page number.
    #[arg(short, long, default_value_t = 1)]
    page: u32,

    /// Full asset URL, fetched with a single request instead of the page templates.
    #[arg(long)]
    src: Option<String>,

    /// Disable offline replay.
    #[arg(long)]
    no_offline: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Asset {
    Svg,
    Text,
    Img,
}

impl Asset {
    fn model_name(self) -> &'static str {
        match self {
            Asset::Svg => "page-svg",
            Asset::Text => "page-text",
            Asset::Img => "page-img",
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    let _guard = init_tracing(&LogOptions::from_env("page-fetch"))?;

    let mut settings = match &args.config {
        Some(path) => DocviewSettings::load(path)?,
        None => DocviewSettings::default(),
    };
    if let Some(origin) = args.origin {
        settings.transport.origin = Some(origin);
    }
    if let Some(dir) = args.offline_dir {
        settings.transport.offline_cache_dir = Some(dir);
    }
    if let Some(url) = args.url {
        settings.viewer.url = url;
    }
    if args.no_offline {
        settings.transport.offline = false;
    }

    let framework = Framework::bootstrap(&settings)?;
    let locator = match args.src {
        Some(src) => {
            register_src_providers(&framework);
            Locator::Src(src)
        }
        None => Locator::Page(args.page),
    };

    let model_name = args.asset.model_name();
    if !framework.has_data_provider(model_name) {
        bail!("No data provider registered for {}", model_name);
    }

    let scope = Scope::new(Arc::clone(&framework), settings.viewer.clone());
    tracing::info!("Requesting {} ({})", model_name, locator);
    let result = scope.get(model_name, locator).await;
    scope.destroy();

    match result {
        Ok(Some(content)) => {
            io::stdout().write_all(content.as_bytes())?;
            Ok(())
        }
        Ok(None) => {
            tracing::warn!("Nothing to render for this page");
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", serde_json::to_string_pretty(&e.to_payload())?);
            std::process::exit(1);
        }
    }
}
