/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::fmt;

/// Verbs this client may put on the wire.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[allow(clippy::upper_case_acronyms)]
pub(crate) enum FtpCommand {
    USER,
    PASS,
    QUIT,
    FEAT,
    OPTS,
    AUTH,
    PBSZ,
    PROT,
    TYPE,
    PWD,
    CWD,
    CDUP,
    MKD,
    RMD,
    DELE,
    RNFR,
    RNTO,
    SIZE,
    MDTM,
    MLST,
    MLSD,
    LIST,
    RETR,
    STOR,
    ALLO,
    PASV,
    EPSV,
    PORT,
    EPRT,
}

impl FtpCommand {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            FtpCommand::USER => "USER",
            FtpCommand::PASS => "PASS",
            FtpCommand::QUIT => "QUIT",
            FtpCommand::FEAT => "FEAT",
            FtpCommand::OPTS => "OPTS",
            FtpCommand::AUTH => "AUTH",
            FtpCommand::PBSZ => "PBSZ",
            FtpCommand::PROT => "PROT",
            FtpCommand::TYPE => "TYPE",
            FtpCommand::PWD => "PWD",
            FtpCommand::CWD => "CWD",
            FtpCommand::CDUP => "CDUP",
            FtpCommand::MKD => "MKD",
            FtpCommand::RMD => "RMD",
            FtpCommand::DELE => "DELE",
            FtpCommand::RNFR => "RNFR",
            FtpCommand::RNTO => "RNTO",
            FtpCommand::SIZE => "SIZE",
            FtpCommand::MDTM => "MDTM",
            FtpCommand::MLST => "MLST",
            FtpCommand::MLSD => "MLSD",
            FtpCommand::LIST => "LIST",
            FtpCommand::RETR => "RETR",
            FtpCommand::STOR => "STOR",
            FtpCommand::ALLO => "ALLO",
            FtpCommand::PASV => "PASV",
            FtpCommand::EPSV => "EPSV",
            FtpCommand::PORT => "PORT",
            FtpCommand::EPRT => "EPRT",
        }
    }
}

impl fmt::Display for FtpCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
