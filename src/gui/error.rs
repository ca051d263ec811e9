use crate::error::BridgeError;
use std::{error::Error, fmt::Display};

/// Why the dashboard had to quit.
#[derive(Debug)]
#[allow(missing_docs)]
pub enum GuiError {
    IOError(std::io::Error),
    BridgeError(BridgeError),
}

impl Display for GuiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GuiError::IOError(e) => write!(f, "terminal error: {e}"),
            GuiError::BridgeError(e) => write!(f, "{e}"),
        }
    }
}

impl Error for GuiError {}

impl From<std::io::Error> for GuiError {
    fn from(value: std::io::Error) -> Self {
        Self::IOError(value)
    }
}

impl From<BridgeError> for GuiError {
    fn from(value: BridgeError) -> Self {
        Self::BridgeError(value)
    }
}
