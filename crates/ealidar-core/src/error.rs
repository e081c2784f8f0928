//! Error types for tile resolution, catalog queries and downloads.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading vector layers or building the grid index.
#[derive(Debug, Error)]
pub enum DataError {
    /// I/O error reading a vector source.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// Path of the source that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The source is not valid GeoJSON.
    #[error("Invalid GeoJSON in {origin}: {reason}")]
    InvalidGeoJson {
        /// Path or label of the source.
        origin: String,
        /// Parser message.
        reason: String,
    },

    /// A feature carries no geometry.
    #[error("Feature {index} in {origin} has no geometry")]
    MissingGeometry {
        /// Path or label of the source.
        origin: String,
        /// Position of the feature in the source.
        index: usize,
    },

    /// A feature geometry is not a polygon or multipolygon.
    #[error("Feature {index} in {origin} has unsupported geometry type {kind}")]
    UnsupportedGeometry {
        /// Path or label of the source.
        origin: String,
        /// Position of the feature in the source.
        index: usize,
        /// GeoJSON geometry type name.
        kind: String,
    },

    /// A tile feature lacks the tile name property or leaves it empty.
    #[error("Feature {index} has no value for property '{field}'")]
    MissingProperty {
        /// Position of the feature in the layer.
        index: usize,
        /// Name of the expected property.
        field: String,
    },

    /// A layer contains no features.
    #[error("Layer {origin} contains no features")]
    EmptyLayer {
        /// Path or label of the layer.
        origin: String,
    },

    /// A geometry has no coordinates, so no bounding box can be computed.
    #[error("Geometry '{label}' is empty")]
    EmptyGeometry {
        /// Tile name or AOI position.
        label: String,
    },
}

/// Errors raised for malformed identifiers or unusable output locations.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Tile id length is neither 4 nor 6 characters.
    #[error("Invalid tile id '{0}' (must be 4 or 6 characters)")]
    TileIdLength(String),

    /// Tile id contains characters other than ASCII letters and digits.
    #[error("Invalid tile id '{0}' (must be ASCII alphanumeric)")]
    TileIdCharacters(String),

    /// Six-character id with a suffix outside {ne, se, sw, nw}.
    #[error("Invalid quadrant '{suffix}' in tile id '{id}' (must be ne, se, sw or nw)")]
    UnknownQuadrant {
        /// Full id as supplied.
        id: String,
        /// Offending suffix.
        suffix: String,
    },

    /// A fine (6-character) id was required.
    #[error("Tile '{0}' is not a quadrant tile")]
    NotFine(String),

    /// The output directory cannot receive downloads.
    #[error("Output folder {path} is not usable: {reason}")]
    OutputDir {
        /// Directory that was checked.
        path: PathBuf,
        /// What is wrong with it.
        reason: String,
    },
}

/// Errors raised while querying the remote catalog for one coarse key.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The HTTP client could not be constructed.
    #[error("Failed to build catalog client: {0}")]
    Client(#[source] reqwest::Error),

    /// Transport-level failure.
    #[error("Catalog request for {key} failed: {source}")]
    Request {
        /// Coarse key being queried.
        key: String,
        /// Underlying HTTP client error.
        #[source]
        source: reqwest::Error,
    },

    /// The catalog answered with a non-success status.
    #[error("Catalog request for {key} returned HTTP {status}")]
    Status {
        /// Coarse key being queried.
        key: String,
        /// HTTP status code.
        status: u16,
    },

    /// The response body is not the expected JSON listing.
    #[error("Catalog response for {key} is not a product listing: {source}")]
    Parse {
        /// Coarse key being queried.
        key: String,
        /// JSON decoding error.
        #[source]
        source: serde_json::Error,
    },
}

/// Errors raised while fetching a single archive. Never fatal for a batch.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport-level failure.
    #[error("Download of {url} failed: {source}")]
    Request {
        /// Source locator.
        url: String,
        /// Underlying HTTP client error.
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[error("Download of {url} returned HTTP {status}")]
    Status {
        /// Source locator.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// Writing the archive to disk failed.
    #[error("Failed to write {path}: {source}")]
    Io {
        /// Destination path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The executor could not be set up.
    #[error("Fetch executor setup failed: {0}")]
    Setup(String),
}

/// Any error produced by this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Unreadable, empty or malformed vector data.
    #[error(transparent)]
    Data(#[from] DataError),

    /// Malformed tile id or invalid output directory.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Remote catalog failure.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Download failure.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Unreadable or invalid configuration file.
    #[error("Invalid configuration {origin}: {reason}")]
    Config {
        /// Path or label of the configuration.
        origin: String,
        /// What went wrong.
        reason: String,
    },
}
