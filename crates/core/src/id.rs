// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed numeric identifiers for server-assigned entities.

/// Define a newtype ID wrapper around `u64`.
///
/// Generates `new()`, `get()`, `Display`, `From<u64>`, and `FromStr`
/// implementations. IDs are server-assigned and serialize transparently as
/// numbers so the wire format matches the control plane's JSON.
macro_rules! define_numeric_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident;
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
            serde::Serialize, serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            pub fn new(id: u64) -> Self {
                Self(id)
            }

            pub fn get(&self) -> u64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }

        impl std::str::FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.parse()?))
            }
        }
    };
}

define_numeric_id! {
    /// Identifier for this agent, assigned by the control plane on authentication.
    pub struct AgentId;
}

define_numeric_id! {
    /// Identifier for an attack (a server-defined cracking job description).
    pub struct AttackId;
}

define_numeric_id! {
    /// Identifier for a task (a contiguous slice of an attack's keyspace).
    pub struct TaskId;
}

define_numeric_id! {
    /// Identifier for a hash list on the control plane.
    pub struct HashListId;
}
