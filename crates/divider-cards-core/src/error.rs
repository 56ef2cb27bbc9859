use thiserror::Error;

/// Unified error type for divider-cards-core
///
/// Grouped by the stage that raises them:
/// - card list handling (loading, duplicate codes)
/// - surface handling (missing grid, concurrent access)
/// - icon normalization (fetch, decode, timeout), recovered inside the pipeline
/// - snapshot capture and document assembly, fatal to one export
/// - configuration and general I/O
#[derive(Error, Debug)]
pub enum Error {
    // ==========================================================================
    // Card List Errors
    // ==========================================================================
    /// A record with this code is already in the list
    #[error("card set {0} is already in the list")]
    DuplicateCard(String),

    /// Failed to read or parse a card list
    #[error("failed to load card list: {0}")]
    CardListLoad(String),

    /// Not one of the known grid orderings
    #[error("unknown sort order '{0}' (expected added, name, date-desc or date-asc)")]
    UnknownSortOrder(String),

    // ==========================================================================
    // Surface Errors
    // ==========================================================================
    /// The surface has no grid container to lay out
    #[error("cards grid not found in surface")]
    GridNotFound,

    /// Another task currently owns the surface
    #[error("surface is busy, an export is in progress")]
    SurfaceBusy,

    // ==========================================================================
    // Icon Errors
    // ==========================================================================
    /// Proxy fetch failed or returned a non-success status
    #[error("failed to fetch icon {url}: {reason}")]
    IconFetch { url: String, reason: String },

    /// Fetched icon bytes could not be parsed or rendered
    #[error("failed to decode icon: {0}")]
    IconDecode(String),

    /// Rasterizing the icon did not finish in time
    #[error("icon conversion timed out after {0} ms")]
    IconTimeout(u64),

    // ==========================================================================
    // Snapshot & Assembly Errors
    // ==========================================================================
    /// The surface could not be captured
    #[error("failed to capture surface: {0}")]
    Render(String),

    /// An embedded image did not finish decoding in time
    #[error("snapshot image loading timed out after {0} ms")]
    SnapshotTimeout(u64),

    /// Failed to build or serialize the output document
    #[error("failed to assemble PDF: {0}")]
    Assembly(String),

    // ==========================================================================
    // Export Errors
    // ==========================================================================
    /// Export was requested for an empty grid
    #[error("no divider cards to export")]
    NothingToExport,

    /// An export is already running
    #[error("an export is already in progress")]
    ExportInProgress,

    /// Generic failure surfaced to callers of the export pipeline
    #[error("PDF generation failed")]
    ExportFailed {
        #[source]
        source: Box<Error>,
    },

    // ==========================================================================
    // Configuration Errors
    // ==========================================================================
    /// Failed to load configuration file
    #[error("failed to load config: {0}")]
    ConfigLoad(String),

    /// Invalid configuration value
    #[error("invalid config value for '{field}': {reason}")]
    ConfigInvalid { field: String, reason: String },

    // ==========================================================================
    // I/O Errors
    // ==========================================================================
    /// General I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wrap a pipeline error into the single failure kind seen by callers.
    pub fn export_failed(source: Self) -> Self {
        Self::ExportFailed {
            source: Box::new(source),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
