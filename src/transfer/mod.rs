/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use async_trait::async_trait;
use tokio::io::{AsyncRead, BufReader};

use crate::config::FtpTransferConfig;
use crate::error::{FtpError, FtpParseError};
use crate::io_ext::limited_read_until;

/// Sink for the lines of a LIST/MLSD data stream. Lines are delivered
/// with their CRLF terminator stripped.
#[async_trait]
pub trait FtpLineDataReceiver: Send {
    async fn recv_line(&mut self, line: &str);

    /// Checked after every line; return true to stop the transfer early
    /// (e.g. a local sink failed).
    fn should_return_early(&self) -> bool {
        false
    }
}

#[derive(Default)]
pub(crate) struct FtpLineCollector {
    pub(crate) lines: Vec<String>,
}

#[async_trait]
impl FtpLineDataReceiver for FtpLineCollector {
    async fn recv_line(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }
}

/// Reads a listing data stream line by line, bounded in line length and
/// entry count, and feeds each line to the receiver.
pub(crate) struct FtpLineDataTransfer<S> {
    reader: BufReader<S>,
    config: FtpTransferConfig,
}

impl<S> FtpLineDataTransfer<S>
where
    S: AsyncRead + Unpin,
{
    pub(crate) fn new(stream: S, config: &FtpTransferConfig) -> Self {
        FtpLineDataTransfer {
            reader: BufReader::new(stream),
            config: *config,
        }
    }

    pub(crate) async fn read_to_end<R>(mut self, receiver: &mut R) -> Result<(), FtpError>
    where
        R: FtpLineDataReceiver,
    {
        let mut buf = Vec::<u8>::with_capacity(self.config.list_max_line_len);
        let mut entries = 0usize;

        loop {
            buf.clear();
            let (found, len) = limited_read_until(
                &mut self.reader,
                b'\n',
                self.config.list_max_line_len,
                &mut buf,
            )
            .await
            .map_err(FtpError::transport)?;
            if len == 0 {
                return Ok(());
            }
            if !found && len >= self.config.list_max_line_len {
                return Err(FtpParseError::ListLineTooLong(entries + 1).into());
            }

            entries += 1;
            if entries > self.config.list_max_entries {
                return Err(FtpParseError::ListTooManyEntries(entries).into());
            }

            let line =
                std::str::from_utf8(&buf).map_err(|_| FtpParseError::ListLineIsNotUtf8)?;
            receiver.recv_line(line.trim_end_matches(['\r', '\n'])).await;
            if receiver.should_return_early() {
                return Ok(());
            }
            if !found {
                // final line without a terminator
                return Ok(());
            }
        }
    }
}
