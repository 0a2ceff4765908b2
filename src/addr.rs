/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use crate::error::FtpParseError;

const DEFAULT_CONTROL_PORT: u16 = 21;

/// Address of an FTP server, either a domain name or an IP literal,
/// together with the control channel port.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct FtpServerAddr {
    host: String,
    port: u16,
}

impl FtpServerAddr {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        FtpServerAddr {
            host: host.into(),
            port,
        }
    }

    pub fn from_ip_and_port(ip: IpAddr, port: u16) -> Self {
        FtpServerAddr {
            host: ip.to_string(),
            port,
        }
    }

    #[inline]
    pub fn host(&self) -> &str {
        self.host.as_str()
    }

    #[inline]
    pub fn port(&self) -> u16 {
        self.port
    }

    #[inline]
    pub fn set_port(&mut self, port: u16) {
        self.port = port;
    }
}

impl From<SocketAddr> for FtpServerAddr {
    fn from(addr: SocketAddr) -> Self {
        FtpServerAddr::from_ip_and_port(addr.ip(), addr.port())
    }
}

impl fmt::Display for FtpServerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

impl FromStr for FtpServerAddr {
    type Err = FtpParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(FtpParseError::InvalidServerAddr);
        }

        if let Some(r) = s.strip_prefix('[') {
            // "[v6]" or "[v6]:port"
            let Some((host, tail)) = r.split_once(']') else {
                return Err(FtpParseError::InvalidServerAddr);
            };
            let port = match tail.strip_prefix(':') {
                Some(p) => u16::from_str(p).map_err(|_| FtpParseError::InvalidServerAddr)?,
                None if tail.is_empty() => DEFAULT_CONTROL_PORT,
                None => return Err(FtpParseError::InvalidServerAddr),
            };
            return Ok(FtpServerAddr::new(host, port));
        }

        match s.rsplit_once(':') {
            Some((host, p)) if !host.contains(':') => {
                let port = u16::from_str(p).map_err(|_| FtpParseError::InvalidServerAddr)?;
                Ok(FtpServerAddr::new(host, port))
            }
            // more than one ':' and no brackets, take it as a bare v6 literal
            _ => Ok(FtpServerAddr::new(s, DEFAULT_CONTROL_PORT)),
        }
    }
}
