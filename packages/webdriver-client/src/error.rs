use thiserror::Error;

pub type Result<T> = std::result::Result<T, WebDriverError>;

#[derive(Debug, Error)]
pub enum WebDriverError {
    /// Transport failure talking to the driver
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The driver answered with a W3C error object
    #[error("WebDriver error ({status}) {error}: {message}")]
    Command {
        status: u16,
        error: String,
        message: String,
    },

    /// Response body did not have the expected shape
    #[error("Unexpected response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
}

impl WebDriverError {
    /// W3C error code, when the driver sent one.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Command { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn is_no_such_element(&self) -> bool {
        self.code() == Some("no such element")
    }

    /// The element handle points at a node no longer in the document.
    pub fn is_stale(&self) -> bool {
        self.code() == Some("stale element reference")
    }
}
