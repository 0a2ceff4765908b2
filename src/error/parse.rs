/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use thiserror::Error;

/// A structured reply payload did not match its grammar.
#[derive(Debug, Error)]
pub enum FtpParseError {
    #[error("invalid server address")]
    InvalidServerAddr,
    #[error("no passive address in reply")]
    PassiveAddrNotFound,
    #[error("no extended passive port in reply")]
    ExtendedPassivePortNotFound,
    #[error("no quoted directory path in reply")]
    DirPathNotFound,
    #[error("invalid time value: {0}")]
    InvalidTimeValue(chrono::ParseError),
    #[error("invalid size value")]
    InvalidSizeValue,
    #[error("no path in listing entry")]
    NoPathInEntry,
    #[error("no '=' delimiter in fact ({0})")]
    NoDelimiterInFact(String),
    #[error("no entry line in reply")]
    EntryLineNotFound,
    #[error("listing line {0} is too long")]
    ListLineTooLong(usize),
    #[error("too many listing entries ({0})")]
    ListTooManyEntries(usize),
    #[error("listing line is not utf-8")]
    ListLineIsNotUtf8,
}
