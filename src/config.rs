/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

const MAXIMUM_LIST_ALL_TIMEOUT: Duration = Duration::from_secs(300);

const DEFAULT_ANONYMOUS_USER: &str = "anonymous";

/// How the data channel for a transfer is established.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum FtpDataChannelMode {
    /// The server listens (EPSV, falling back to PASV) and the client
    /// connects.
    #[default]
    Passive,
    /// The client listens (EPRT, falling back to PORT) and the server
    /// connects.
    Active,
}

/// Local endpoint used when the data channel runs in active mode.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FtpActiveModeConfig {
    /// Address the data listener binds to and advertises to the server.
    pub ip: IpAddr,
    pub port: u16,
    /// Advertise the listener with EPRT address family 2 (IPv6).
    pub ipv6: bool,
}

impl Default for FtpActiveModeConfig {
    fn default() -> Self {
        FtpActiveModeConfig {
            ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 20,
            ipv6: false,
        }
    }
}

/// TLS upgrade parameters, handed to the transport provider for both the
/// control and the data channel.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FtpTlsConfig {
    /// Server name for certificate verification. Defaults to the host part
    /// of the server address when unset.
    pub hostname: Option<String>,
    /// Extra trust anchors, PEM encoded.
    pub trusted_certs: Vec<Vec<u8>>,
    /// Wrap the control connection before the greeting instead of issuing
    /// `AUTH TLS`.
    pub implicit: bool,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FtpControlConfig {
    pub max_line_len: usize,
    pub max_multi_lines: usize,
    pub command_timeout: Duration,
}

impl Default for FtpControlConfig {
    fn default() -> Self {
        FtpControlConfig {
            max_line_len: 2048,
            max_multi_lines: 128,
            command_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FtpTransferConfig {
    pub end_wait_timeout: Duration,
    pub list_max_entries: usize,
    pub list_max_line_len: usize,
    pub(crate) list_all_timeout: Duration,
}

impl Default for FtpTransferConfig {
    fn default() -> Self {
        FtpTransferConfig {
            end_wait_timeout: Duration::from_secs(2),
            list_max_entries: 1024,
            list_max_line_len: 2048,
            list_all_timeout: Duration::from_secs(120),
        }
    }
}

impl FtpTransferConfig {
    pub fn set_list_all_timeout(&mut self, timeout: Duration) {
        self.list_all_timeout = timeout.min(MAXIMUM_LIST_ALL_TIMEOUT);
    }
}

/// Resolved per-session configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct FtpSessionConfig {
    pub control: FtpControlConfig,
    pub transfer: FtpTransferConfig,
    pub connect_timeout: Duration,
    pub greeting_timeout: Duration,
    pub data_channel: FtpDataChannelMode,
    pub username: String,
    pub password: String,
    pub active: FtpActiveModeConfig,
    pub tls: Option<FtpTlsConfig>,
}

impl Default for FtpSessionConfig {
    fn default() -> Self {
        FtpSessionConfig {
            control: FtpControlConfig::default(),
            transfer: FtpTransferConfig::default(),
            connect_timeout: Duration::from_secs(30),
            greeting_timeout: Duration::from_secs(10),
            data_channel: FtpDataChannelMode::default(),
            username: DEFAULT_ANONYMOUS_USER.to_string(),
            password: DEFAULT_ANONYMOUS_USER.to_string(),
            active: FtpActiveModeConfig::default(),
            tls: None,
        }
    }
}
