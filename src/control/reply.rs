/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;

use tokio::io::AsyncBufRead;

use crate::config::FtpControlConfig;
use crate::error::{FtpControlError, FtpParseError};
use crate::io_ext::limited_read_until;

/// One fully framed server reply: a code in `[100, 600)` and one text line
/// per wire line, CRLF stripped and end-trimmed. Continuation lines of a
/// multi-line reply keep their leading whitespace.
#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) struct FtpReply {
    code: u16,
    lines: Vec<String>,
}

impl FtpReply {
    #[inline]
    pub(crate) fn code(&self) -> u16 {
        self.code
    }

    /// The first (for single-line replies, the only) text line.
    #[inline]
    pub(crate) fn line(&self) -> &str {
        self.lines.first().map(|s| s.as_str()).unwrap_or_default()
    }

    #[inline]
    pub(crate) fn lines(&self) -> &[String] {
        &self.lines
    }

    pub(crate) fn message(&self) -> String {
        self.lines.join("\n")
    }

    /// Parse the `(h1,h2,h3,h4,p1,p2)` payload of a 227 reply.
    pub(crate) fn parse_passive_addr(&self) -> Result<SocketAddr, FtpParseError> {
        let line = self.line();
        let inner = paren_payload(line).ok_or(FtpParseError::PassiveAddrNotFound)?;

        let a: Vec<&str> = inner.split(',').collect();
        if a.len() != 6 {
            return Err(FtpParseError::PassiveAddrNotFound);
        }
        let mut v = [0u8; 6];
        for (i, s) in a.iter().enumerate() {
            v[i] = u8::from_str(s.trim()).map_err(|_| FtpParseError::PassiveAddrNotFound)?;
        }

        let ip = IpAddr::V4(Ipv4Addr::new(v[0], v[1], v[2], v[3]));
        let port = ((v[4] as u16) << 8) | (v[5] as u16);
        Ok(SocketAddr::new(ip, port))
    }

    /// Parse the `(|||port|)` payload of a 229 reply. The delimiter is
    /// whatever character the server chose for the first position.
    pub(crate) fn parse_extended_passive_port(&self) -> Result<u16, FtpParseError> {
        let line = self.line();
        let inner = paren_payload(line).ok_or(FtpParseError::ExtendedPassivePortNotFound)?;

        let mut chars = inner.chars();
        let delimiter = chars
            .next()
            .ok_or(FtpParseError::ExtendedPassivePortNotFound)?;
        let fields: Vec<&str> = inner.split(delimiter).collect();
        // "|||port|" splits into 5 fields, the first and last empty
        if fields.len() != 5 || !fields[0].is_empty() || !fields[4].is_empty() {
            return Err(FtpParseError::ExtendedPassivePortNotFound);
        }
        u16::from_str(fields[3]).map_err(|_| FtpParseError::ExtendedPassivePortNotFound)
    }

    /// Extract the quoted path of a 257 reply. A doubled quote inside the
    /// quotes stands for one literal quote character.
    pub(crate) fn parse_dir_path(&self) -> Result<String, FtpParseError> {
        let line = self.line();
        let start = memchr::memchr(b'"', line.as_bytes()).ok_or(FtpParseError::DirPathNotFound)?;

        let mut path = String::new();
        let mut rest = line[start + 1..].chars().peekable();
        while let Some(c) = rest.next() {
            if c == '"' {
                if rest.peek() == Some(&'"') {
                    rest.next();
                    path.push('"');
                } else {
                    return Ok(path);
                }
            } else {
                path.push(c);
            }
        }
        Err(FtpParseError::DirPathNotFound)
    }
}

fn paren_payload(line: &str) -> Option<&str> {
    let start = memchr::memchr(b'(', line.as_bytes())?;
    let end = memchr::memchr(b')', &line.as_bytes()[start..])? + start;
    Some(&line[start + 1..end])
}

fn line_to_string(line: &[u8]) -> Result<String, FtpControlError> {
    let s = std::str::from_utf8(line).map_err(|_| FtpControlError::LineIsNotUtf8)?;
    Ok(s.trim_end().to_string())
}

fn parse_code(line: &[u8]) -> Result<u16, FtpControlError> {
    if line.len() < 5 {
        // at least "NNNx\n"
        return Err(FtpControlError::InvalidLineFormat);
    }
    if !line[..3].iter().all(u8::is_ascii_digit) {
        return Err(FtpControlError::InvalidLineFormat);
    }
    let code = (line[0] - b'0') as u16 * 100 + (line[1] - b'0') as u16 * 10 + (line[2] - b'0') as u16;
    if !(100..600).contains(&code) {
        return Err(FtpControlError::InvalidReplyCode(code));
    }
    Ok(code)
}

async fn read_line<R>(
    reader: &mut R,
    max_len: usize,
    buf: &mut Vec<u8>,
) -> Result<(), FtpControlError>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    let (found, len) = limited_read_until(reader, b'\n', max_len, buf)
        .await
        .map_err(FtpControlError::ReadFailed)?;

    #[cfg(feature = "log-raw-io")]
    crate::debug::log_rsp(&String::from_utf8_lossy(buf));

    if found {
        Ok(())
    } else if len >= max_len {
        Err(FtpControlError::LineTooLong)
    } else {
        // peer closed in the middle of a reply
        Err(FtpControlError::ConnectionClosed)
    }
}

/// Frame exactly one server reply. Single-line replies are `NNN SP text`;
/// multi-line replies open with `NNN-` and run until a line starting with
/// the same `NNN` followed by a space.
pub(crate) async fn read_reply<R>(
    reader: &mut R,
    config: &FtpControlConfig,
) -> Result<FtpReply, FtpControlError>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::<u8>::with_capacity(config.max_line_len);
    read_line(reader, config.max_line_len, &mut buf).await?;

    let code = parse_code(&buf)?;
    match buf[3] {
        b' ' => Ok(FtpReply {
            code,
            lines: vec![line_to_string(&buf[4..])?],
        }),
        b'-' => {
            let end_prefix = [buf[0], buf[1], buf[2], b' '];
            let mut lines = vec![line_to_string(&buf[4..])?];
            for _ in 0..config.max_multi_lines {
                read_line(reader, config.max_line_len, &mut buf).await?;
                if buf.starts_with(&end_prefix) {
                    lines.push(line_to_string(&buf[4..])?);
                    return Ok(FtpReply { code, lines });
                }
                lines.push(line_to_string(&buf)?);
            }
            Err(FtpControlError::TooManyLines)
        }
        _ => Err(FtpControlError::InvalidLineFormat),
    }
}
