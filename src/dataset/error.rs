//! Dataset loading errors.

use thiserror::Error;

/// Failure while building the reference image set.
#[derive(Error, Debug)]
pub enum DatasetError {
    /// Transport-level failure (DNS, TLS, timeout, ...).
    #[error("network error fetching {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The HTTP client could not be set up (TLS backend, resolver, ...).
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// Server answered with a non-success status.
    #[error("HTTP {status} fetching {url}")]
    Http { url: String, status: u16 },

    /// Payload is not a JSON array of objects.
    #[error("malformed dataset: {0}")]
    Malformed(String),

    /// Dataset URL could not be parsed.
    #[error("invalid URL {0:?}")]
    InvalidUrl(String),

    /// A reference photo could not be decoded.
    #[error("failed to decode image for {name}: {source}")]
    Decode {
        name: String,
        #[source]
        source: image::ImageError,
    },

    /// A reference photo decoded to zero pixels.
    #[error("image for {0} has no pixels")]
    EmptyImage(String),

    /// Every card was dropped, or the dataset was empty.
    #[error("dataset produced no reference images")]
    NoReferenceImages,
}
