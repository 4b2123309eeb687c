// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A single `device:hash_type:runtime:speed` tuple parsed from hashcat's
//! `--benchmark --machine-readable` output, as persisted in the benchmark
//! cache.

use serde::{Deserialize, Serialize};

/// Fields are kept as their original string form (not parsed to numbers):
/// the control plane is the consumer of record and the agent never
/// computes on these values itself, so round-tripping the exact text
/// hashcat emitted avoids lossy reformatting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRow {
    pub device: String,
    pub hash_type: String,
    pub runtime_ms: String,
    pub hash_time_ms: String,
    pub speed_hs: String,
    /// Added after the cache format was first shipped; missing on disk
    /// means an unsubmitted row from before the flag existed.
    #[serde(default)]
    pub submitted: bool,
}

impl BenchmarkRow {
    /// Parse one colon-delimited benchmark line:
    /// `device_id:hash_type:_:runtime_ms:hash_time_ms:speed_hs`.
    ///
    /// Any field count other than 6 is not a benchmark row (§6); the caller
    /// logs it at debug and moves on.
    pub fn parse_line(line: &str) -> Option<Self> {
        let fields: Vec<&str> = line.split(':').collect();
        if fields.len() != 6 {
            return None;
        }
        Some(Self {
            device: fields[0].to_string(),
            hash_type: fields[1].to_string(),
            // fields[2] is the discarded placeholder field.
            runtime_ms: fields[3].to_string(),
            hash_time_ms: fields[4].to_string(),
            speed_hs: fields[5].to_string(),
            submitted: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_six_field_line() {
        let row = BenchmarkRow::parse_line("1:0:-:100:50:12345.67").unwrap();
        assert_eq!(row.device, "1");
        assert_eq!(row.hash_type, "0");
        assert_eq!(row.runtime_ms, "100");
        assert_eq!(row.hash_time_ms, "50");
        assert_eq!(row.speed_hs, "12345.67");
        assert!(!row.submitted);
    }

    #[test]
    fn ignores_lines_with_wrong_field_count() {
        assert!(BenchmarkRow::parse_line("1:0:-:100:50").is_none());
        assert!(BenchmarkRow::parse_line("some unrelated stdout line").is_none());
    }

    #[test]
    fn missing_submitted_field_defaults_false() {
        let row: BenchmarkRow =
            serde_json::from_str(r#"{"device":"1","hash_type":"0","runtime_ms":"100","hash_time_ms":"50","speed_hs":"1.0"}"#)
                .unwrap();
        assert!(!row.submitted);
    }
}
