// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! agent-platform: OS/arch probes behind the `Platform` trait (§4.A).
//!
//! Real implementations shell out only to hard-coded, allowlisted binary
//! names (`lspci`, `system_profiler`, `wmic`, `7z`) and reject any argument
//! string containing shell metacharacters before spawning — see
//! [`exec::ensure_safe_argument`].

pub mod error;
pub mod exec;
mod host_info;
mod system;

pub use error::PlatformError;
pub use host_info::HostInfo;
pub use system::SystemPlatform;

use async_trait::async_trait;
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// OS/arch probes the rest of the agent depends on. Exactly the capability
/// set named in §4.A — nothing more.
#[async_trait]
pub trait Platform: Send + Sync {
    fn host_info(&self) -> HostInfo;

    /// GPU device names, via a platform-specific allowlisted mechanism.
    async fn device_inventory(&self) -> Result<Vec<String>, PlatformError>;

    /// `hashcat --version` output for the binary at `path`.
    async fn hashcat_version(&self, path: &Path) -> Result<String, PlatformError>;

    fn default_hashcat_binary_name(&self) -> &'static str;

    /// Extra hashcat CLI flags this platform always needs
    /// (e.g. `--backend-ignore-opencl` on macOS).
    fn additional_hashcat_args(&self) -> Vec<String>;

    /// Extract a 7z archive at `src` into `dst`.
    async fn extract_7z(
        &self,
        cancel: &CancellationToken,
        src: &Path,
        dst: &Path,
    ) -> Result<(), PlatformError>;
}

#[cfg(any(test, feature = "test-support"))]
pub mod fake;
