//! Per-request transfer errors and their coarse classification.
//!
//! Nothing here is retried by the scheduler. Callers that want a retry policy
//! can use [`TransferError::kind`] to decide which failures are worth another
//! attempt.

use thiserror::Error;

/// Outcome of a single transfer. `Ok(())` means the engine completed the
/// exchange; the HTTP status is reported separately on the response.
pub type TransferResult = Result<(), TransferError>;

/// Error recorded on a response when a transfer could not run to completion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    /// The handle was never driven: the request was rejected before or
    /// while it was being registered with the multiplexer.
    #[error("failed to start transfer: {0}")]
    StartFailed(String),
    /// The transport engine finished the transfer with a failure code
    /// (timeout, connection refused, TLS failure, ...). Surfaced verbatim.
    #[error("transfer failed (code {code}): {message}")]
    Transport { code: u32, message: String },
    /// The engine lost track of the transfer (e.g. the handle could not be
    /// detached after completion).
    #[error("transport engine error: {0}")]
    Engine(String),
}

/// Coarse classification of a failed transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Operation timed out (connect, low-speed or total time limit).
    Timeout,
    /// Network-level failure (DNS, refused, reset, empty reply).
    Connection,
    /// Anything else.
    Other,
}

impl TransferError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TransferError::Transport { code, .. } => classify_code(*code),
            TransferError::StartFailed(_) | TransferError::Engine(_) => ErrorKind::Other,
        }
    }
}

impl From<curl::Error> for TransferError {
    fn from(e: curl::Error) -> Self {
        let message = match e.extra_description() {
            Some(extra) => format!("{}: {}", e.description(), extra),
            None => e.description().to_string(),
        };
        TransferError::Transport {
            code: e.code() as u32,
            message,
        }
    }
}

fn classify_code(code: u32) -> ErrorKind {
    let e = curl::Error::new(code as _);
    if e.is_operation_timedout() {
        return ErrorKind::Timeout;
    }
    if e.is_couldnt_connect()
        || e.is_couldnt_resolve_host()
        || e.is_couldnt_resolve_proxy()
        || e.is_read_error()
        || e.is_recv_error()
        || e.is_send_error()
        || e.is_got_nothing()
    {
        return ErrorKind::Connection;
    }
    ErrorKind::Other
}
