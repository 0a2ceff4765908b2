/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::net::{SocketAddr, SocketAddrV4};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

use crate::config::FtpControlConfig;
use crate::error::{FtpControlError, FtpError, FtpParseError};
use crate::facts::{time_val, FtpFileInfo};
use crate::feature::FtpServerFeature;

mod command;
mod reply;

pub(crate) use command::FtpCommand;
pub(crate) use reply::FtpReply;

mod status {
    pub(crate) const START_TRANSFER: u16 = 150;
    pub(crate) const OK: u16 = 200;
    pub(crate) const ALLO_NOT_NEEDED: u16 = 202;
    pub(crate) const FEATURES: u16 = 211;
    pub(crate) const FILE_STATUS: u16 = 213;
    pub(crate) const READY_SOON: u16 = 120;
    pub(crate) const READY: u16 = 220;
    pub(crate) const DATA_CLOSE: u16 = 226;
    pub(crate) const PASSIVE: u16 = 227;
    pub(crate) const EXT_PASSIVE: u16 = 229;
    pub(crate) const LOGGED_IN: u16 = 230;
    pub(crate) const AUTH_PROCEED: u16 = 234;
    pub(crate) const ACTION_OK: u16 = 250;
    pub(crate) const PATH_CREATED: u16 = 257;
    pub(crate) const NEED_PASS: u16 = 331;
    pub(crate) const NEED_FILE_INFO: u16 = 350;
    pub(crate) const SYNTAX_ERROR: u16 = 500;
    pub(crate) const NOT_IMPLEMENTED: u16 = 502;
    pub(crate) const FILE_UNKNOWN: u16 = 550;
}

/// Outcome of a SIZE query. Servers answer 550 for paths that are not
/// regular files, which callers branch on instead of treating as failure.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) enum FtpSizeOutcome {
    Size(u64),
    NotAFile,
}

/// The request/reply half-duplex engine for one control connection.
/// Strictly serial: the session coordinator guarantees a single caller.
pub(crate) struct FtpControlChannel<S> {
    stream: BufReader<S>,
    config: FtpControlConfig,
}

impl<S> FtpControlChannel<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub(crate) fn new(stream: S, config: FtpControlConfig) -> Self {
        FtpControlChannel {
            stream: BufReader::new(stream),
            config,
        }
    }

    /// Give the raw stream back for a TLS upgrade. Nothing may be in
    /// flight: the buffered reader is discarded.
    pub(crate) fn into_stream(self) -> S {
        self.stream.into_inner()
    }

    async fn send_command(
        &mut self,
        cmd: FtpCommand,
        arg: Option<&str>,
    ) -> Result<(), FtpControlError> {
        let line = match arg {
            Some(arg) => format!("{} {arg}\r\n", cmd.as_str()),
            None => format!("{}\r\n", cmd.as_str()),
        };

        #[cfg(feature = "log-raw-io")]
        crate::debug::log_cmd(line.trim_end());

        self.stream
            .write_all(line.as_bytes())
            .await
            .map_err(FtpControlError::WriteFailed)?;
        self.stream
            .flush()
            .await
            .map_err(FtpControlError::WriteFailed)
    }

    async fn read_reply(&mut self) -> Result<FtpReply, FtpControlError> {
        reply::read_reply(&mut self.stream, &self.config).await
    }

    async fn timed_read_reply(
        &mut self,
        timeout: Duration,
        stage: &'static str,
    ) -> Result<FtpReply, FtpControlError> {
        match tokio::time::timeout(timeout, self.read_reply()).await {
            Ok(r) => r,
            Err(_) => Err(FtpControlError::ReadTimedOut(stage)),
        }
    }

    async fn exchange(
        &mut self,
        cmd: FtpCommand,
        arg: Option<&str>,
        stage: &'static str,
    ) -> Result<FtpReply, FtpError> {
        self.send_command(cmd, arg).await?;
        let reply = self
            .timed_read_reply(self.config.command_timeout, stage)
            .await?;
        Ok(reply)
    }

    fn expect(reply: FtpReply, expected: u16) -> Result<FtpReply, FtpError> {
        if reply.code() == expected {
            Ok(reply)
        } else {
            Err(FtpError::unexpected_status(
                expected,
                reply.code(),
                reply.message(),
            ))
        }
    }

    /// Wait for the 220 service-ready greeting. A 120 reply means the
    /// service will be ready shortly; keep waiting for the real greeting.
    pub(crate) async fn wait_greeting(&mut self) -> Result<(), FtpError> {
        let mut reply = self.read_reply().await?;
        if reply.code() == status::READY_SOON {
            reply = self.read_reply().await?;
        }
        Self::expect(reply, status::READY)?;
        Ok(())
    }

    /// Query FEAT and build the feature matrix. Servers without FEAT
    /// answer 500/502, which yields an empty matrix.
    pub(crate) async fn request_features(&mut self) -> Result<FtpServerFeature, FtpError> {
        let reply = self.exchange(FtpCommand::FEAT, None, "FEAT").await?;
        match reply.code() {
            status::FEATURES => Ok(FtpServerFeature::parse_feat_reply(reply.lines())),
            status::SYNTAX_ERROR | status::NOT_IMPLEMENTED => Ok(FtpServerFeature::default()),
            _ => Err(FtpError::unexpected_status(
                status::FEATURES,
                reply.code(),
                reply.message(),
            )),
        }
    }

    pub(crate) async fn request_auth_tls(&mut self) -> Result<(), FtpError> {
        let reply = self
            .exchange(FtpCommand::AUTH, Some("TLS"), "AUTH TLS")
            .await?;
        Self::expect(reply, status::AUTH_PROCEED)?;
        Ok(())
    }

    pub(crate) async fn set_protection_buffer_zero(&mut self) -> Result<(), FtpError> {
        let reply = self.exchange(FtpCommand::PBSZ, Some("0"), "PBSZ").await?;
        Self::expect(reply, status::OK)?;
        Ok(())
    }

    pub(crate) async fn set_private_protection(&mut self) -> Result<(), FtpError> {
        let reply = self.exchange(FtpCommand::PROT, Some("P"), "PROT").await?;
        Self::expect(reply, status::OK)?;
        Ok(())
    }

    /// USER, and PASS if the server asks for one.
    pub(crate) async fn login(&mut self, username: &str, password: &str) -> Result<(), FtpError> {
        let reply = self
            .exchange(FtpCommand::USER, Some(username), "USER")
            .await?;
        match reply.code() {
            status::LOGGED_IN => return Ok(()),
            status::NEED_PASS => {}
            _ => {
                return Err(FtpError::unexpected_status(
                    status::NEED_PASS,
                    reply.code(),
                    reply.message(),
                ));
            }
        }

        let reply = self
            .exchange(FtpCommand::PASS, Some(password), "PASS")
            .await?;
        Self::expect(reply, status::LOGGED_IN)?;
        Ok(())
    }

    /// OPTS UTF8 ON. The reply is read but its status does not matter:
    /// servers advertising UTF8 often treat this as a no-op.
    pub(crate) async fn set_use_utf8(&mut self) -> Result<(), FtpError> {
        let _ = self.exchange(FtpCommand::OPTS, Some("UTF8 ON"), "OPTS").await?;
        Ok(())
    }

    pub(crate) async fn set_binary_type(&mut self) -> Result<(), FtpError> {
        let reply = self.exchange(FtpCommand::TYPE, Some("I"), "TYPE").await?;
        Self::expect(reply, status::OK)?;
        Ok(())
    }

    pub(crate) async fn request_current_dir(&mut self) -> Result<String, FtpError> {
        let reply = self.exchange(FtpCommand::PWD, None, "PWD").await?;
        let reply = Self::expect(reply, status::PATH_CREATED)?;
        Ok(reply.parse_dir_path()?)
    }

    pub(crate) async fn change_dir(&mut self, path: &str) -> Result<(), FtpError> {
        let reply = self.exchange(FtpCommand::CWD, Some(path), "CWD").await?;
        Self::expect(reply, status::ACTION_OK)?;
        Ok(())
    }

    pub(crate) async fn change_dir_up(&mut self) -> Result<(), FtpError> {
        let reply = self.exchange(FtpCommand::CDUP, None, "CDUP").await?;
        Self::expect(reply, status::ACTION_OK)?;
        Ok(())
    }

    pub(crate) async fn make_dir(&mut self, path: &str) -> Result<(), FtpError> {
        let reply = self.exchange(FtpCommand::MKD, Some(path), "MKD").await?;
        Self::expect(reply, status::PATH_CREATED)?;
        Ok(())
    }

    pub(crate) async fn remove_dir(&mut self, path: &str) -> Result<(), FtpError> {
        let reply = self.exchange(FtpCommand::RMD, Some(path), "RMD").await?;
        Self::expect(reply, status::ACTION_OK)?;
        Ok(())
    }

    pub(crate) async fn delete_file(&mut self, path: &str) -> Result<(), FtpError> {
        let reply = self.exchange(FtpCommand::DELE, Some(path), "DELE").await?;
        Self::expect(reply, status::ACTION_OK)?;
        Ok(())
    }

    pub(crate) async fn rename_from(&mut self, path: &str) -> Result<(), FtpError> {
        let reply = self.exchange(FtpCommand::RNFR, Some(path), "RNFR").await?;
        Self::expect(reply, status::NEED_FILE_INFO)?;
        Ok(())
    }

    pub(crate) async fn rename_to(&mut self, path: &str) -> Result<(), FtpError> {
        let reply = self.exchange(FtpCommand::RNTO, Some(path), "RNTO").await?;
        Self::expect(reply, status::ACTION_OK)?;
        Ok(())
    }

    pub(crate) async fn request_size(&mut self, path: &str) -> Result<FtpSizeOutcome, FtpError> {
        let reply = self.exchange(FtpCommand::SIZE, Some(path), "SIZE").await?;
        match reply.code() {
            status::FILE_STATUS => {
                let size = reply
                    .line()
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| FtpParseError::InvalidSizeValue)?;
                Ok(FtpSizeOutcome::Size(size))
            }
            status::FILE_UNKNOWN => Ok(FtpSizeOutcome::NotAFile),
            _ => Err(FtpError::unexpected_status(
                status::FILE_STATUS,
                reply.code(),
                reply.message(),
            )),
        }
    }

    pub(crate) async fn request_mtime(&mut self, path: &str) -> Result<DateTime<Utc>, FtpError> {
        let reply = self.exchange(FtpCommand::MDTM, Some(path), "MDTM").await?;
        let reply = Self::expect(reply, status::FILE_STATUS)?;
        let dt =
            time_val::parse_from_str(reply.line().trim()).map_err(FtpParseError::InvalidTimeValue)?;
        Ok(dt)
    }

    /// MLST. The entry is the second payload line of the 250 reply,
    /// indented by one space.
    pub(crate) async fn request_facts(&mut self, path: &str) -> Result<FtpFileInfo, FtpError> {
        let reply = self.exchange(FtpCommand::MLST, Some(path), "MLST").await?;
        let reply = Self::expect(reply, status::ACTION_OK)?;
        let lines = reply.lines();
        if lines.len() < 3 {
            return Err(FtpParseError::EntryLineNotFound.into());
        }
        let entry = lines[1].strip_prefix(' ').unwrap_or(&lines[1]);
        Ok(FtpFileInfo::parse_entry(entry)?)
    }

    pub(crate) async fn request_extended_passive_port(&mut self) -> Result<u16, FtpError> {
        let reply = self.exchange(FtpCommand::EPSV, None, "EPSV").await?;
        let reply = Self::expect(reply, status::EXT_PASSIVE)?;
        Ok(reply.parse_extended_passive_port()?)
    }

    pub(crate) async fn request_passive_addr(&mut self) -> Result<SocketAddr, FtpError> {
        let reply = self.exchange(FtpCommand::PASV, None, "PASV").await?;
        let reply = Self::expect(reply, status::PASSIVE)?;
        Ok(reply.parse_passive_addr()?)
    }

    pub(crate) async fn request_active_v4(&mut self, addr: SocketAddrV4) -> Result<(), FtpError> {
        let ip = addr.ip().octets();
        let arg = format!(
            "{},{},{},{},{},{}",
            ip[0],
            ip[1],
            ip[2],
            ip[3],
            addr.port() >> 8,
            addr.port() & 0xff
        );
        let reply = self.exchange(FtpCommand::PORT, Some(&arg), "PORT").await?;
        Self::expect(reply, status::OK)?;
        Ok(())
    }

    pub(crate) async fn request_active_extended(
        &mut self,
        addr: SocketAddr,
    ) -> Result<(), FtpError> {
        let family = if addr.is_ipv4() { 1 } else { 2 };
        let arg = format!("|{family}|{}|{}|", addr.ip(), addr.port());
        let reply = self.exchange(FtpCommand::EPRT, Some(&arg), "EPRT").await?;
        Self::expect(reply, status::OK)?;
        Ok(())
    }

    /// ALLO. Servers that do not need preallocation answer 202.
    pub(crate) async fn request_allocate(&mut self, size: u64) -> Result<(), FtpError> {
        let arg = size.to_string();
        let reply = self.exchange(FtpCommand::ALLO, Some(&arg), "ALLO").await?;
        match reply.code() {
            status::OK | status::ALLO_NOT_NEEDED => Ok(()),
            _ => Err(FtpError::unexpected_status(
                status::OK,
                reply.code(),
                reply.message(),
            )),
        }
    }

    /// Send a transfer verb (RETR/STOR/LIST/MLSD) and wait for the
    /// 150 start mark.
    pub(crate) async fn start_transfer(
        &mut self,
        cmd: FtpCommand,
        path: Option<&str>,
    ) -> Result<(), FtpError> {
        let reply = self.exchange(cmd, path, "transfer start").await?;
        Self::expect(reply, status::START_TRANSFER)?;
        Ok(())
    }

    /// Wait for the trailing 226 after the data channel closed.
    pub(crate) async fn wait_transfer_end(&mut self, timeout: Duration) -> Result<(), FtpError> {
        let reply = self.timed_read_reply(timeout, "transfer end").await?;
        Self::expect(reply, status::DATA_CLOSE)?;
        Ok(())
    }

    /// Best-effort QUIT. Write or read failures do not matter, the
    /// connection is going away either way.
    pub(crate) async fn send_quit(&mut self) {
        if self.send_command(FtpCommand::QUIT, None).await.is_ok() {
            let _ = self
                .timed_read_reply(self.config.command_timeout, "QUIT")
                .await;
        }
    }
}
