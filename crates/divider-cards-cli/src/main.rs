//! Divider Cards CLI - Export a list of card sets as printable divider cards.

use anyhow::{Context, Result};
use clap::Parser;
use divider_cards_core::{AppConfig, CardList, DividerExporter, SortOrder, Surface, SurfaceHandle};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "divider-cards")]
#[command(author, version, about = "Export card-set divider cards as a printable PDF", long_about = None)]
struct Args {
    /// Card list: a JSON array of sets, or a catalog response with a "data" array
    #[arg(required = true)]
    input: PathBuf,

    /// Output PDF file (default: the configured filename, next to the input)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Set codes to leave out (repeatable)
    #[arg(short = 'x', long = "exclude")]
    exclude: Vec<String>,

    /// Card order on the sheet: added, name, date-desc or date-asc
    #[arg(short, long, default_value = "added")]
    sort: SortOrder,

    /// Base URL of the pass-through proxy used to fetch set icons
    #[arg(long, env = "DIVIDER_PROXY_BASE")]
    proxy_base: Option<String>,

    /// Number of icons converted at once
    #[arg(long)]
    icon_concurrency: Option<usize>,

    /// TrueType font used for card text (default: built-in DejaVu Sans Condensed)
    #[arg(long, env = "DIVIDER_FONT")]
    font: Option<PathBuf>,

    /// Snapshot scale factor
    #[arg(long)]
    scale: Option<f32>,

    /// Config file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Disable the icon cache
    #[arg(long)]
    no_cache: bool,
}

/// Write `bytes` to `path` through a temporary file in the same directory.
fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut file = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;
    file.write_all(bytes).context("Failed to write PDF")?;
    file.persist(path)
        .with_context(|| format!("Failed to write output: {}", path.display()))?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before parsing args so env vars are available)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Setup logging
    let log_level = match args.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    // Load or create config
    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path).context("Failed to load config file")?
    } else {
        AppConfig::load()
    };

    // Override config with CLI arguments
    if let Some(proxy_base) = args.proxy_base {
        config.icons.proxy_base = proxy_base;
    }
    if let Some(concurrency) = args.icon_concurrency {
        config.icons.concurrency = concurrency;
    }
    if let Some(font) = args.font {
        config.snapshot.font_path = Some(font);
    }
    if let Some(scale) = args.scale {
        config.snapshot.scale = scale;
    }
    if args.no_cache {
        config.icons.cache_enabled = false;
    }

    // Load card list
    info!("Loading card list: {}", args.input.display());
    let mut cards = CardList::from_json_file(&args.input)
        .with_context(|| format!("Failed to load card list: {}", args.input.display()))?;
    for code in &args.exclude {
        if cards.remove(code).is_none() {
            warn!("Excluded set {} is not in the list", code);
        }
    }
    if cards.is_empty() {
        anyhow::bail!("No card sets to export");
    }
    info!("Exporting {} card sets", cards.len());

    let output_path = args
        .output
        .unwrap_or_else(|| args.input.with_file_name(&config.default_filename));
    let filename = output_path
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string);

    let exporter = DividerExporter::new(config).context("Failed to initialize exporter")?;
    let mut surface = Surface::from_cards(&cards);
    surface.sort_cards(args.sort);
    let surface = SurfaceHandle::new(surface);

    // Setup progress bar over icon conversions
    let pb = ProgressBar::new(0);
    // Template is hardcoded and valid, unwrap is safe
    #[allow(clippy::unwrap_used)]
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} icons")
            .unwrap()
            .progress_chars("#>-"),
    );
    let progress = {
        let pb = pb.clone();
        move |done: usize, total: usize| {
            pb.set_length(total as u64);
            pb.set_position(done as u64);
        }
    };

    let document = exporter
        .export_with_progress(&surface, filename.as_deref(), Some(&progress))
        .await
        .context("Failed to export divider cards")?;

    pb.finish_and_clear();

    write_atomically(&output_path, &document.bytes)?;

    // CLI output is intentional
    #[allow(clippy::print_stdout)]
    {
        println!(
            "Divider cards saved to: {} ({} pages, {} x {} grid)",
            output_path.display(),
            document.page_count,
            document.layout.columns,
            document.layout.rows
        );
    }

    Ok(())
}
