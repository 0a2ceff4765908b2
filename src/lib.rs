/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

mod addr;
mod config;
mod connection;
mod control;
mod debug;
mod error;
mod facts;
mod feature;
mod io_ext;
mod session;
mod transfer;

pub use addr::FtpServerAddr;
pub use config::{
    FtpActiveModeConfig, FtpControlConfig, FtpDataChannelMode, FtpSessionConfig,
    FtpTlsConfig, FtpTransferConfig,
};
pub use connection::FtpTransportProvider;
pub use debug::{FTP_DEBUG_LOG_LEVEL, FTP_DEBUG_LOG_TARGET};
pub use error::{FtpControlError, FtpError, FtpParseError};
pub use facts::{FtpEntryType, FtpFileInfo};
pub use feature::FtpServerFeature;
pub use session::{FtpDataStream, FtpSession};
pub use transfer::FtpLineDataReceiver;
