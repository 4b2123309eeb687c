// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Attack definitions fetched from the control plane. Immutable for the
//! lifetime of the task that references them.

use crate::id::{AttackId, HashListId};
use serde::{Deserialize, Serialize};

/// hashcat's own attack-mode numbering (`-a`), as distinct from the
/// human-readable `AttackMode` string the control plane sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum AttackModeHashcat {
    Dictionary = 0,
    Combinator = 1,
    Mask = 3,
    HybridDictionaryMask = 6,
    HybridMaskDictionary = 7,
}

impl AttackModeHashcat {
    /// Maps the control plane's `attack_mode` string to hashcat's `-a` value.
    /// Unknown strings map to `Dictionary`, matching a dictionary-first
    /// default for attack kinds the agent doesn't otherwise recognize.
    pub fn from_wire_str(mode: &str) -> Self {
        match mode {
            "dictionary" => Self::Dictionary,
            "combinator" => Self::Combinator,
            "mask" => Self::Mask,
            "hybrid-dictionary" => Self::HybridDictionaryMask,
            "hybrid-mask" => Self::HybridMaskDictionary,
            _ => Self::Dictionary,
        }
    }

    pub fn as_hashcat_arg(&self) -> &'static str {
        match self {
            Self::Dictionary => "0",
            Self::Combinator => "1",
            Self::Mask => "3",
            Self::HybridDictionaryMask => "6",
            Self::HybridMaskDictionary => "7",
        }
    }
}

/// A downloadable attack resource (word list, rule list, or mask list).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceFile {
    pub file_name: String,
    pub download_url: String,
    #[serde(default)]
    pub checksum: Option<String>,
}

/// A server-defined cracking job description. Immutable per task lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attack {
    pub id: AttackId,
    pub hash_mode: u32,
    pub attack_mode_hashcat: AttackModeHashcat,
    pub hash_list_id: HashListId,
    pub hash_list_url: String,
    #[serde(default)]
    pub mask: Option<String>,
    #[serde(default)]
    pub increment_mode: bool,
    #[serde(default)]
    pub increment_minimum: Option<u32>,
    #[serde(default)]
    pub increment_maximum: Option<u32>,
    #[serde(default)]
    pub custom_charset_1: Option<String>,
    #[serde(default)]
    pub custom_charset_2: Option<String>,
    #[serde(default)]
    pub custom_charset_3: Option<String>,
    #[serde(default)]
    pub custom_charset_4: Option<String>,
    #[serde(default)]
    pub word_list: Option<ResourceFile>,
    #[serde(default)]
    pub rule_list: Option<ResourceFile>,
    #[serde(default)]
    pub mask_list: Option<ResourceFile>,
    #[serde(default)]
    pub optimized: bool,
    #[serde(default)]
    pub slow_candidate_generators: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_attack_mode_strings() {
        assert_eq!(AttackModeHashcat::from_wire_str("dictionary").as_hashcat_arg(), "0");
        assert_eq!(AttackModeHashcat::from_wire_str("combinator").as_hashcat_arg(), "1");
        assert_eq!(AttackModeHashcat::from_wire_str("mask").as_hashcat_arg(), "3");
        assert_eq!(
            AttackModeHashcat::from_wire_str("hybrid-dictionary").as_hashcat_arg(),
            "6"
        );
        assert_eq!(
            AttackModeHashcat::from_wire_str("hybrid-mask").as_hashcat_arg(),
            "7"
        );
    }

    #[test]
    fn unknown_attack_mode_falls_back_to_dictionary() {
        assert_eq!(AttackModeHashcat::from_wire_str("quantum-annealing").as_hashcat_arg(), "0");
    }
}
