use thiserror::Error;

/// Everything the translation pipeline can fail with, as seen by the overlay.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslateError {
    /// Endpoint or credential missing; the user has to open Settings.
    #[error("{0}")]
    Config(String),
    /// Provider rejected the call. `status` is `None` for transport failures.
    #[error("{message}")]
    Api { message: String, status: Option<u16> },
    /// The provider answered 2xx but the body is not a usable completion.
    #[error("{0}")]
    Format(String),
    /// Superseded or dismissed. Never shown.
    #[error("request was cancelled")]
    Cancelled,
}

pub type Result<T, E = TranslateError> = std::result::Result<T, E>;

impl TranslateError {
    pub fn missing_config() -> Self {
        TranslateError::Config("Please configure the API settings first (open Settings)".into())
    }

    pub fn network(err: impl std::fmt::Display) -> Self {
        TranslateError::Api {
            message: format!("Network error: {}", err),
            status: None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, TranslateError::Cancelled)
    }
}
