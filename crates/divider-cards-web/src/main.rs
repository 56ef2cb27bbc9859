//! Divider Cards Web - Web server for the live divider card grid.

mod helpers;
mod routes;
mod state;
mod templates;

use anyhow::{Context, Result};
use axum::http::{HeaderValue, header};
use axum::{
    Router,
    routing::{get, post},
};
use clap::Parser;
use divider_cards_core::{AppConfig, CardList};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, services::ServeDir,
    set_header::SetResponseHeaderLayer, trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use state::AppState;

/// Resolve the static files directory.
///
/// Priority:
/// 1. Explicit path if provided
/// 2. ./static if it exists
/// 3. Crate's built-in static directory
fn resolve_static_dir(explicit_path: Option<&str>) -> PathBuf {
    if let Some(path) = explicit_path {
        return PathBuf::from(path);
    }

    let local_static = PathBuf::from("static");
    if local_static.is_dir() {
        return local_static;
    }

    PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/static"))
}

#[derive(Parser, Debug)]
#[command(name = "divider-cards-web")]
#[command(author, version, about = "Divider Cards Web Server", long_about = None)]
struct Args {
    /// Card list shown in the grid (JSON array or catalog "data" envelope)
    #[arg(env = "DIVIDER_CARDS")]
    cards: Option<PathBuf>,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to bind to
    #[arg(short, long, default_value = "3000")]
    port: u16,

    /// Config file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Base URL of the pass-through proxy used to fetch set icons
    #[arg(long, env = "DIVIDER_PROXY_BASE")]
    proxy_base: Option<String>,

    /// TrueType font used for card text in exports
    #[arg(long, env = "DIVIDER_FONT")]
    font: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Static files directory (defaults to ./static or crate's static dir)
    #[arg(long, env = "STATIC_DIR")]
    static_dir: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before parsing args so env vars are available)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let default_level = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{default_level},usvg=warn")));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path).context("Failed to load config file")?
    } else {
        AppConfig::load()
    };
    if let Some(proxy_base) = args.proxy_base {
        config.icons.proxy_base = proxy_base;
    }
    if let Some(font) = args.font {
        config.snapshot.font_path = Some(font);
    }

    let cards = match &args.cards {
        Some(path) => CardList::from_json_file(path)
            .with_context(|| format!("Failed to load card list: {}", path.display()))?,
        None => {
            warn!("No card list given, starting with an empty grid");
            CardList::new()
        }
    };
    info!("Loaded {} card sets", cards.len());

    let state = Arc::new(
        AppState::new(config, &cards).context("Failed to initialize application state")?,
    );

    // Build router
    let app = Router::new()
        // Pages
        .route("/", get(routes::index))
        .route("/print", get(routes::print_view))
        // API endpoints - HTML fragments (HTMX)
        .route("/api/cards/sort", post(routes::sort_cards))
        .route("/api/cards/{code}/remove", post(routes::remove_card))
        // API endpoints - binary responses
        .route("/api/export", get(routes::export_pdf))
        // Static files with Cache-Control: no-cache (cache but always revalidate via ETag)
        .nest_service(
            "/static",
            ServiceBuilder::new()
                .layer(SetResponseHeaderLayer::if_not_present(
                    header::CACHE_CONTROL,
                    HeaderValue::from_static("no-cache"),
                ))
                .service(ServeDir::new(resolve_static_dir(args.static_dir.as_deref()))),
        )
        // Middleware
        // The grid changes under the page, never let the browser reuse it
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store, max-age=0"),
        ))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
