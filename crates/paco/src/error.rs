//! Error taxonomy for fetch resolution and page lookup.

use crate::spec::Device;

/// A page registry lookup that matched nothing.
///
/// Kept separate from transport failures so expected-failure assertions
/// can match on it directly.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("could not find fetched page with index \"{index}\" ({len} pages fetched)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("could not find fetched page with url-snippet \"{0}\"")]
    UrlSnippet(String),

    #[error("could not find fetched page for device {0}")]
    Device(Device),

    #[error("could not find fetched page with url-snippet \"{snippet}\" for device {device}")]
    UrlSnippetAndDevice { snippet: String, device: Device },

    #[error("expected exactly one fetched page, found {0}")]
    NotSingle(usize),
}

/// Failure of the network call behind a fetch.
#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    #[error("timed out fetching {url} after {attempts} attempt(s)")]
    TimeoutExhausted { url: String, attempts: u32 },

    #[error("malformed URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("connection to {url} failed: {reason}")]
    Connect { url: String, reason: String },

    #[error("unsupported content type {content_type:?} from {url}")]
    UnsupportedContentType { url: String, content_type: String },

    #[error("request to {url} failed: {reason}")]
    Request { url: String, reason: String },
}

/// XML well-formedness or schema validation failure.
#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("malformed XML at byte {position}: {reason}")]
    Malformed { position: u64, reason: String },

    #[error("unbound namespace prefix: {0}")]
    UnboundPrefix(String),

    #[error("document does not match schema {xsd}: {details}")]
    SchemaMismatch { xsd: String, details: String },

    #[error("unsupported schema language: {0}")]
    UnsupportedSchemaLanguage(String),

    #[error("schema validator unavailable: {0}")]
    ValidatorUnavailable(String),
}

/// Invalid request composition.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("empty host in request url (prefix {prefix:?}, url {url:?})")]
    EmptyHost { prefix: String, url: String },

    #[error("invalid value for {field}: {value:?}")]
    InvalidValue { field: &'static str, value: String },
}

/// All errors surfaced by this crate.
#[derive(thiserror::Error, Debug)]
pub enum PacoError {
    #[error("Lookup error: {0}")]
    Lookup(#[from] LookupError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid selector {selector:?}: {reason}")]
    Selector { selector: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience result type.
pub type PacoResult<T> = Result<T, PacoError>;
