// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A recovered plaintext, produced by the outfile watcher.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrackedHash {
    pub timestamp: DateTime<Utc>,
    pub hash: String,
    pub plaintext: String,
}

impl CrackedHash {
    /// Parse one line of the `--outfile-format=1,2` outfile: `hash:plaintext`.
    ///
    /// The hash itself may legally contain colons (salted formats), so the
    /// split happens on the *last* colon, not the first.
    pub fn parse_line(line: &str, read_at: DateTime<Utc>) -> Option<Self> {
        let (hash, plaintext) = line.rsplit_once(':')?;
        if hash.is_empty() {
            return None;
        }
        Some(Self {
            timestamp: read_at,
            hash: hash.to_string(),
            plaintext: plaintext.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_hash_plaintext_line() {
        let now = Utc::now();
        let cracked = CrackedHash::parse_line("5f4dcc3b5aa765d61d8327deb882cf99:password", now).unwrap();
        assert_eq!(cracked.hash, "5f4dcc3b5aa765d61d8327deb882cf99");
        assert_eq!(cracked.plaintext, "password");
        assert_eq!(cracked.timestamp, now);
    }

    #[test]
    fn splits_on_last_colon_for_salted_hashes() {
        let now = Utc::now();
        let cracked = CrackedHash::parse_line("hash:with:colons:salt:secret", now).unwrap();
        assert_eq!(cracked.hash, "hash:with:colons:salt");
        assert_eq!(cracked.plaintext, "secret");
    }

    #[test]
    fn rejects_line_without_colon() {
        assert!(CrackedHash::parse_line("not-a-cracked-line", Utc::now()).is_none());
    }

    #[test]
    fn allows_empty_plaintext() {
        let cracked = CrackedHash::parse_line("deadbeef:", Utc::now()).unwrap();
        assert_eq!(cracked.plaintext, "");
    }
}
