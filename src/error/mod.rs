/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::error::Error;

use thiserror::Error;

mod control;
mod parse;

pub use control::FtpControlError;
pub use parse::FtpParseError;

/// The session level error type. Every public operation returns this.
#[derive(Debug, Error)]
pub enum FtpError {
    /// The session is not in the state the operation requires: `connect`
    /// was not called, was called twice, or the session has been closed.
    #[error("session is not ready")]
    SessionNotReady,
    /// A transport primitive failed: connect, listen, accept or TLS
    /// handshake, or I/O on a data socket.
    #[error("transport failed: {0}")]
    Transport(#[source] Box<dyn Error + Send + Sync>),
    /// Control channel I/O or reply framing failed.
    #[error("control channel failed: {0}")]
    Control(#[from] FtpControlError),
    /// The server answered with a valid but unexpected reply code.
    /// The original reply text is kept for caller inspection.
    #[error("unexpected reply code {got} (expected {expected}): {message}")]
    UnexpectedStatus {
        expected: u16,
        got: u16,
        message: String,
    },
    /// A structured payload (PASV, EPSV, PWD, MDTM, MLST, listing) did not
    /// match its grammar.
    #[error("reply payload did not parse: {0}")]
    Parse(#[from] FtpParseError),
    /// The operation needs a FEAT-advertised capability the server lacks.
    #[error("server does not support {0}")]
    FeatureUnsupported(&'static str),
    /// A primary error forced resource teardown and the teardown itself
    /// failed; the secondary failures are attached.
    #[error("{source} (cleanup also failed: {} more)", .auxiliary.len())]
    Cleanup {
        source: Box<FtpError>,
        auxiliary: Vec<FtpError>,
    },
}

impl FtpError {
    pub(crate) fn transport<E: Error + Send + Sync + 'static>(e: E) -> Self {
        FtpError::Transport(Box::new(e))
    }

    pub(crate) fn unexpected_status(expected: u16, got: u16, message: String) -> Self {
        FtpError::UnexpectedStatus {
            expected,
            got,
            message,
        }
    }

    /// Attach teardown failures to a primary error. A no-op if there are
    /// none.
    pub(crate) fn with_auxiliary(self, auxiliary: Vec<FtpError>) -> Self {
        if auxiliary.is_empty() {
            self
        } else {
            FtpError::Cleanup {
                source: Box::new(self),
                auxiliary,
            }
        }
    }

    /// Whether this error leaves the control channel unusable, forcing the
    /// session to close. Protocol-level errors (unexpected status, parse
    /// failures, unsupported features) keep the session alive.
    pub(crate) fn closes_session(&self) -> bool {
        match self {
            FtpError::Control(e) => e.is_fatal(),
            FtpError::Cleanup { source, auxiliary } => {
                source.closes_session() || auxiliary.iter().any(|e| e.closes_session())
            }
            _ => false,
        }
    }
}
