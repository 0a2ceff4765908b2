/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use chrono::{DateTime, Utc};
use mime::Mime;

use crate::error::FtpParseError;

mod entry_type;
pub(crate) mod time_val;

pub use entry_type::FtpEntryType;

/// Parsed metadata of one directory entry, from an MLST/MLSD fact line or
/// assembled from SIZE/MDTM fallbacks. Constructed per call, never shared.
#[derive(Debug, Clone)]
pub struct FtpFileInfo {
    path: String,
    entry_type: FtpEntryType,
    size: u64,
    modify_time: Option<DateTime<Utc>>,
    create_time: Option<DateTime<Utc>>,
    unix_mode: Option<u32>,
    unix_uid: Option<u32>,
    unix_gid: Option<u32>,
    perm: Option<String>,
    lang: Option<String>,
    charset: Option<String>,
    media_type: Option<Mime>,
}

impl FtpFileInfo {
    pub(crate) fn new(path: &str) -> Self {
        FtpFileInfo {
            path: path.to_string(),
            entry_type: FtpEntryType::default(),
            size: 0,
            modify_time: None,
            create_time: None,
            unix_mode: None,
            unix_uid: None,
            unix_gid: None,
            perm: None,
            lang: None,
            charset: None,
            media_type: None,
        }
    }

    #[inline]
    pub fn path(&self) -> &str {
        self.path.as_str()
    }

    #[inline]
    pub fn entry_type(&self) -> &FtpEntryType {
        &self.entry_type
    }

    #[inline]
    pub fn is_file(&self) -> bool {
        self.entry_type.is_file()
    }

    #[inline]
    pub fn is_dir(&self) -> bool {
        self.entry_type.is_dir()
    }

    #[inline]
    pub fn is_symlink(&self) -> bool {
        self.entry_type.is_symlink()
    }

    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    #[inline]
    pub fn mtime(&self) -> Option<&DateTime<Utc>> {
        self.modify_time.as_ref()
    }

    #[inline]
    pub fn btime(&self) -> Option<&DateTime<Utc>> {
        self.create_time.as_ref()
    }

    #[inline]
    pub fn unix_mode(&self) -> Option<u32> {
        self.unix_mode
    }

    #[inline]
    pub fn unix_uid(&self) -> Option<u32> {
        self.unix_uid
    }

    #[inline]
    pub fn unix_gid(&self) -> Option<u32> {
        self.unix_gid
    }

    #[inline]
    pub fn perm(&self) -> Option<&str> {
        self.perm.as_deref()
    }

    #[inline]
    pub fn lang(&self) -> Option<&str> {
        self.lang.as_deref()
    }

    #[inline]
    pub fn charset(&self) -> Option<&str> {
        self.charset.as_deref()
    }

    #[inline]
    pub fn media_type(&self) -> Option<&Mime> {
        self.media_type.as_ref()
    }

    #[inline]
    pub(crate) fn set_size(&mut self, size: u64) {
        self.size = size;
    }

    #[inline]
    pub(crate) fn set_mtime(&mut self, mtime: DateTime<Utc>) {
        self.modify_time = Some(mtime);
    }

    #[inline]
    pub(crate) fn set_entry_type(&mut self, entry_type: FtpEntryType) {
        self.entry_type = entry_type;
    }

    /// Parse one RFC 3659 entry line: `fact=value;...;fact=value; path`.
    /// The facts part may be empty; the single space before the path is
    /// the delimiter and is consumed.
    pub(crate) fn parse_entry(line: &str) -> Result<Self, FtpParseError> {
        let Some((facts, path)) = line.split_once(' ') else {
            return Err(FtpParseError::NoPathInEntry);
        };

        let mut info = FtpFileInfo::new(path);
        for fact in facts.split(';') {
            if fact.is_empty() {
                continue;
            }
            let Some((key, value)) = fact.split_once('=') else {
                return Err(FtpParseError::NoDelimiterInFact(fact.to_string()));
            };
            info.set_fact(key, value)?;
        }
        Ok(info)
    }

    fn set_fact(&mut self, key: &str, value: &str) -> Result<(), FtpParseError> {
        match key.to_lowercase().as_str() {
            "type" => self.entry_type = FtpEntryType::parse(value),
            "size" => {
                let size = value
                    .parse::<u64>()
                    .map_err(|_| FtpParseError::InvalidSizeValue)?;
                self.size = size;
            }
            "modify" => {
                let dt = time_val::parse_from_str(value)
                    .map_err(FtpParseError::InvalidTimeValue)?;
                self.modify_time = Some(dt);
            }
            "create" => {
                let dt = time_val::parse_from_str(value)
                    .map_err(FtpParseError::InvalidTimeValue)?;
                self.create_time = Some(dt);
            }
            "perm" => self.perm = Some(value.to_string()),
            "lang" => self.lang = Some(value.to_string()),
            "charset" => self.charset = Some(value.to_string()),
            "media-type" => {
                if let Ok(mime) = value.parse() {
                    self.media_type = Some(mime);
                }
            }
            "unix.mode" => self.unix_mode = u32::from_str_radix(value, 8).ok(),
            "unix.uid" => self.unix_uid = value.parse().ok(),
            "unix.gid" => self.unix_gid = value.parse().ok(),
            _ => {}
        }
        Ok(())
    }
}
