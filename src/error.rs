//! Error types for the harvest loop.
//!
//! Every variant is fatal to the harvest that produced it. `kind()` groups
//! the variants by how an operator should read them.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarvestError {
    /// The provider base URL could not be parsed.
    #[error("Invalid provider URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// HTTP request failed before a response was received.
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Provider answered with a non-success status.
    #[error("Provider returned HTTP {status} for {url}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },

    /// Connection failed while the response body was being streamed.
    #[error("Failed to read response body: {0}")]
    Body(#[source] std::io::Error),

    /// Response could not be tokenized as XML.
    #[error("XML parsing failed: {0}")]
    Malformed(#[from] quick_xml::Error),

    /// An entity or character reference could not be resolved.
    #[error("Invalid XML escape: {0}")]
    Escape(#[from] quick_xml::escape::EscapeError),

    /// Response is not UTF-8, or declares another encoding.
    #[error("Unsupported response encoding: {0}")]
    Encoding(String),

    /// Response did not contain an `OAI-PMH` element.
    #[error("Response has no OAI-PMH root element")]
    MissingRoot,

    /// Response ended before the `OAI-PMH` element was closed.
    #[error("Response ended inside the OAI-PMH element")]
    UnexpectedEof,

    /// Provider rejected the request with an OAI-PMH error.
    #[error("OAI-PMH error {code}: {message}")]
    Protocol { code: String, message: String },

    /// Payload could not be written to the output.
    #[error("Failed to write payload: {0}")]
    Output(#[source] std::io::Error),

    /// Shutdown was requested before the harvest finished.
    #[error("Harvest interrupted after {pages} page(s)")]
    Interrupted { pages: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    MalformedResponse,
    Protocol,
    Output,
    Interrupted,
}

impl HarvestError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            HarvestError::InvalidUrl { .. }
            | HarvestError::Transport(_)
            | HarvestError::Status { .. }
            | HarvestError::Body(_) => ErrorKind::Transport,
            HarvestError::Malformed(_)
            | HarvestError::Escape(_)
            | HarvestError::Encoding(_)
            | HarvestError::MissingRoot
            | HarvestError::UnexpectedEof => ErrorKind::MalformedResponse,
            HarvestError::Protocol { .. } => ErrorKind::Protocol,
            HarvestError::Output(_) => ErrorKind::Output,
            HarvestError::Interrupted { .. } => ErrorKind::Interrupted,
        }
    }

    /// Provider error code, when the provider rejected the request.
    pub fn protocol_code(&self) -> Option<&str> {
        match self {
            HarvestError::Protocol { code, .. } => Some(code),
            _ => None,
        }
    }

    /// Map a quick-xml failure, pulling body I/O errors out as transport errors.
    pub(crate) fn from_xml(error: quick_xml::Error) -> Self {
        match error {
            quick_xml::Error::Io(io) => {
                HarvestError::Body(std::io::Error::new(io.kind(), io.to_string()))
            }
            other => HarvestError::Malformed(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, HarvestError>;
