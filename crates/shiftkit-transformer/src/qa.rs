//! Seam to the question-answering service used by interactive plugins.

use std::net::SocketAddr;

use thiserror::Error;

/// Raised when the question-answering receiver cannot be started.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to start question receiver: {message}")]
pub struct QaStartError {
    /// Receiver diagnostics.
    pub message: String,
}

/// Starts a question-answering endpoint commands can reach.
pub trait QaReceiver {
    /// Starts the receiver and returns its address.
    ///
    /// # Errors
    ///
    /// Returns [`QaStartError`] when the receiver cannot listen.
    fn start(&self) -> Result<SocketAddr, QaStartError>;
}

impl<F> QaReceiver for F
where
    F: Fn() -> Result<SocketAddr, QaStartError>,
{
    fn start(&self) -> Result<SocketAddr, QaStartError> {
        self()
    }
}
