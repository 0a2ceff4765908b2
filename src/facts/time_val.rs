/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use chrono::{DateTime, NaiveDateTime, ParseResult, Timelike, Utc};

const TIME_VAL_FORMAT: &str = "%Y%m%d%H%M%S%.f";

/// Parse an RFC 3659 `time-val`: `YYYYMMDDHHMMSS` with an optional
/// fractional second part. Always UTC. A `T` between the date and time
/// digits is tolerated, some servers emit it.
pub(crate) fn parse_from_str(s: &str) -> ParseResult<DateTime<Utc>> {
    let dt = if s.as_bytes().get(8) == Some(&b'T') {
        let compact = format!("{}{}", &s[..8], &s[9..]);
        NaiveDateTime::parse_from_str(&compact, TIME_VAL_FORMAT)?
    } else {
        NaiveDateTime::parse_from_str(s, TIME_VAL_FORMAT)?
    };
    Ok(dt.and_utc())
}

/// Format a timestamp back into `time-val` form, with milliseconds when
/// the value carries sub-second precision.
pub(crate) fn format_to_string(dt: &DateTime<Utc>) -> String {
    if dt.nanosecond() == 0 {
        dt.format("%Y%m%d%H%M%S").to_string()
    } else {
        let millis = dt.timestamp_subsec_millis();
        format!("{}.{millis:03}", dt.format("%Y%m%d%H%M%S"))
    }
}
