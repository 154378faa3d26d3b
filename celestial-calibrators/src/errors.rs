//! Error types for the calibrator pipeline.
//!
//! Only failures that abort a unit of work are errors here. Catalogue-level
//! problems (a missing row, an ambiguous cross-match, a service timeout) are
//! folded into the star's verdict and never surface as [`CalibError`].
//!
//! | Variant | Aborts | Raised by |
//! |---------|--------|-----------|
//! | [`Resolution`](CalibError::Resolution) | one star | [`NameResolver`](crate::query::NameResolver) |
//! | [`Configuration`](CalibError::Configuration) | the whole run | [`Settings::validate`](crate::config::Settings::validate) |
//! | [`Service`](CalibError::Service) | a search run | candidate cone search |
//! | [`Parse`](CalibError::Parse) | the caller's operation | VOTable and TOML decoding |
//! | [`Io`](CalibError::Io) | the caller's operation | result file output |

use thiserror::Error;

pub type CalibResult<T> = Result<T, CalibError>;

#[derive(Debug, Error)]
pub enum CalibError {
    #[error("Could not resolve '{name}': {message}")]
    Resolution { name: String, message: String },

    #[error("Invalid configuration: {message}")]
    Configuration { message: String },

    #[error("{catalogue} query failed: {message}")]
    Service { catalogue: String, message: String },

    #[error("Parse error ({context}): {message}")]
    Parse { context: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CalibError {
    pub fn resolution(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Resolution {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn service(catalogue: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Service {
            catalogue: catalogue.into(),
            message: message.into(),
        }
    }

    pub fn parse(context: &str, message: impl Into<String>) -> Self {
        Self::Parse {
            context: context.to_string(),
            message: message.into(),
        }
    }

    /// True for errors that only affect a single star in a batch.
    pub fn is_per_star(&self) -> bool {
        matches!(self, Self::Resolution { .. })
    }
}
