/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::collections::HashMap;

/// What the server advertised in its FEAT reply. Built once right after
/// the greeting and frozen for the session lifetime.
///
/// The tags this client acts on are typed fields; anything else lands in
/// the overflow map and is observable but never interpreted.
#[derive(Debug, Clone, Default)]
pub struct FtpServerFeature {
    mlst_facts: Option<Vec<String>>,
    mlsd: bool,
    mdtm: bool,
    size: bool,
    rest_args: Option<Vec<String>>,
    epsv: bool,
    eprt: bool,
    prot: bool,
    pbsz: bool,
    auth_mechanisms: Option<Vec<String>>,
    utf8: bool,
    extra: HashMap<String, String>,
}

impl FtpServerFeature {
    /// Parse the body of a 211 FEAT reply. The first and last lines are
    /// the human framing; every non-empty line in between, left-trimmed,
    /// is one feature token with an optional argument string.
    pub(crate) fn parse_feat_reply(lines: &[String]) -> Self {
        let mut feature = FtpServerFeature::default();
        if lines.len() < 2 {
            return feature;
        }
        for line in &lines[1..lines.len() - 1] {
            let token = line.trim_start();
            if !token.is_empty() {
                feature.parse_and_set(token);
            }
        }
        feature
    }

    fn parse_and_set(&mut self, s: &str) {
        let (f, v) = s.split_once(' ').unwrap_or((s, ""));
        match f.to_lowercase().as_str() {
            "mlst" => {
                let facts = v
                    .split(';')
                    .filter(|f| !f.is_empty())
                    .map(|f| f.trim_end_matches('*').to_string())
                    .collect();
                self.mlst_facts = Some(facts);
            }
            "mlsd" => self.mlsd = true,
            "mdtm" => self.mdtm = true,
            "size" => self.size = true,
            "rest" => {
                let args = v.split_whitespace().map(|a| a.to_string()).collect();
                self.rest_args = Some(args);
            }
            "epsv" => self.epsv = true,
            "eprt" => self.eprt = true,
            "prot" => self.prot = true,
            "pbsz" => self.pbsz = true,
            "auth" => {
                // RFC 2228 leaves the separator open, servers use both
                // whitespace and commas
                let mechanisms = v
                    .split([' ', '\t', ','])
                    .filter(|m| !m.is_empty())
                    .map(|m| m.to_string())
                    .collect();
                self.auth_mechanisms = Some(mechanisms);
            }
            "utf8" => self.utf8 = true,
            _ => {
                self.extra.insert(f.to_string(), v.to_string());
            }
        }
    }

    /// The MLST facts the server can emit, if MLST was advertised.
    #[inline]
    pub fn mlst_facts(&self) -> Option<&[String]> {
        self.mlst_facts.as_deref()
    }

    #[inline]
    pub fn support_machine_list(&self) -> bool {
        self.mlst_facts.is_some()
    }

    /// MLSD availability. Servers advertising MLST implement MLSD as
    /// well, so either tag enables machine listings.
    #[inline]
    pub fn support_machine_list_dir(&self) -> bool {
        self.mlsd || self.mlst_facts.is_some()
    }

    #[inline]
    pub fn support_file_mtime(&self) -> bool {
        self.mdtm
    }

    #[inline]
    pub fn support_file_size(&self) -> bool {
        self.size
    }

    #[inline]
    pub fn rest_args(&self) -> Option<&[String]> {
        self.rest_args.as_deref()
    }

    /// REST STREAM is detected but never issued by this client.
    #[inline]
    pub fn support_rest_stream(&self) -> bool {
        self.rest_args
            .as_ref()
            .map(|args| args.iter().any(|a| a.eq_ignore_ascii_case("stream")))
            .unwrap_or(false)
    }

    #[inline]
    pub fn support_extended_passive(&self) -> bool {
        self.epsv
    }

    #[inline]
    pub fn support_extended_active(&self) -> bool {
        self.eprt
    }

    #[inline]
    pub fn support_protection(&self) -> bool {
        self.prot
    }

    #[inline]
    pub fn support_protection_buffer(&self) -> bool {
        self.pbsz
    }

    #[inline]
    pub fn auth_mechanisms(&self) -> Option<&[String]> {
        self.auth_mechanisms.as_deref()
    }

    #[inline]
    pub fn support_auth_tls(&self) -> bool {
        self.auth_mechanisms
            .as_ref()
            .map(|m| m.iter().any(|m| m.eq_ignore_ascii_case("tls")))
            .unwrap_or(false)
    }

    #[inline]
    pub fn support_utf8_path(&self) -> bool {
        self.utf8
    }

    /// FEAT lines this client does not interpret, keyed by feature name.
    #[inline]
    pub fn extra(&self) -> &HashMap<String, String> {
        &self.extra
    }
}
