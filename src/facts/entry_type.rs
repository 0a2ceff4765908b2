/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

/// The `type` fact of a listing entry. Entries without a `type` fact are
/// taken to be regular files.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub enum FtpEntryType {
    #[default]
    File,
    Dir,
    /// The listed directory itself (`type=cdir`).
    CurrentDir,
    /// The parent of the listed directory (`type=pdir`).
    ParentDir,
    Symlink,
    Other(String),
}

impl FtpEntryType {
    pub(crate) fn parse(value: &str) -> Self {
        let v = value.to_lowercase();
        match v.as_str() {
            "file" => FtpEntryType::File,
            "dir" => FtpEntryType::Dir,
            "cdir" => FtpEntryType::CurrentDir,
            "pdir" => FtpEntryType::ParentDir,
            _ => {
                // pure-ftpd emits OS.unix:symlink, proftpd OS.unix:slink:<target>
                if v.starts_with("os.unix:symlink") || v.starts_with("os.unix:slink") {
                    FtpEntryType::Symlink
                } else {
                    FtpEntryType::Other(v)
                }
            }
        }
    }

    #[inline]
    pub fn is_file(&self) -> bool {
        matches!(self, FtpEntryType::File)
    }

    #[inline]
    pub fn is_dir(&self) -> bool {
        matches!(
            self,
            FtpEntryType::Dir | FtpEntryType::CurrentDir | FtpEntryType::ParentDir
        )
    }

    #[inline]
    pub fn is_symlink(&self) -> bool {
        matches!(self, FtpEntryType::Symlink)
    }
}
