/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io;

use thiserror::Error;

/// I/O and framing failures on the control channel.
#[derive(Debug, Error)]
pub enum FtpControlError {
    #[error("unable to send command: {0:?}")]
    WriteFailed(io::Error),
    #[error("unable to read reply: {0:?}")]
    ReadFailed(io::Error),
    #[error("connection closed by peer")]
    ConnectionClosed,
    #[error("reply line too long")]
    LineTooLong,
    #[error("too many lines in reply")]
    TooManyLines,
    #[error("invalid reply line format")]
    InvalidLineFormat,
    #[error("invalid reply code {0}")]
    InvalidReplyCode(u16),
    #[error("reply line is not utf-8")]
    LineIsNotUtf8,
    #[error("read reply for stage '{0}' timed out")]
    ReadTimedOut(&'static str),
}

impl FtpControlError {
    /// Whether the control channel can still be used after this error.
    /// Framing violations leave the connection open; transport failures,
    /// EOF and timeouts leave the channel desynced and force a close.
    pub(crate) fn is_fatal(&self) -> bool {
        matches!(
            self,
            FtpControlError::WriteFailed(_)
                | FtpControlError::ReadFailed(_)
                | FtpControlError::ConnectionClosed
                | FtpControlError::ReadTimedOut(_)
        )
    }
}
