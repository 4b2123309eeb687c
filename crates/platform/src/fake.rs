// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory [`Platform`] double for tests in this crate and downstream
//! crates (enabled via the `test-support` feature).

use crate::error::PlatformError;
use crate::host_info::HostInfo;
use crate::Platform;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Scripted [`Platform`] implementation. Every method returns whatever was
/// configured via the builder methods, or an innocuous default.
pub struct FakePlatform {
    host_info: HostInfo,
    devices: Vec<String>,
    hashcat_version: String,
    binary_name: &'static str,
    extra_args: Vec<String>,
    extract_calls: Mutex<Vec<(String, String)>>,
    fail_device_inventory: bool,
    fail_extract: bool,
}

impl Default for FakePlatform {
    fn default() -> Self {
        Self {
            host_info: HostInfo {
                hostname: "fake-host".to_string(),
                os: "linux".to_string(),
                kernel_arch: "x86_64".to_string(),
            },
            devices: vec!["Fake GPU 0".to_string()],
            hashcat_version: "v6.2.6".to_string(),
            binary_name: "hashcat",
            extra_args: Vec::new(),
            extract_calls: Mutex::new(Vec::new()),
            fail_device_inventory: false,
            fail_extract: false,
        }
    }
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_devices(mut self, devices: Vec<String>) -> Self {
        self.devices = devices;
        self
    }

    pub fn with_hashcat_version(mut self, version: impl Into<String>) -> Self {
        self.hashcat_version = version.into();
        self
    }

    pub fn with_extra_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }

    pub fn failing_device_inventory(mut self) -> Self {
        self.fail_device_inventory = true;
        self
    }

    pub fn failing_extract(mut self) -> Self {
        self.fail_extract = true;
        self
    }

    /// `(src, dst)` pairs passed to `extract_7z`, in call order.
    pub fn extract_calls(&self) -> Vec<(String, String)> {
        self.extract_calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl Platform for FakePlatform {
    fn host_info(&self) -> HostInfo {
        self.host_info.clone()
    }

    async fn device_inventory(&self) -> Result<Vec<String>, PlatformError> {
        if self.fail_device_inventory {
            return Err(PlatformError::Spawn {
                command: "lspci".to_string(),
                source: std::io::Error::other("fake failure"),
            });
        }
        Ok(self.devices.clone())
    }

    async fn hashcat_version(&self, _path: &Path) -> Result<String, PlatformError> {
        Ok(self.hashcat_version.clone())
    }

    fn default_hashcat_binary_name(&self) -> &'static str {
        self.binary_name
    }

    fn additional_hashcat_args(&self) -> Vec<String> {
        self.extra_args.clone()
    }

    async fn extract_7z(
        &self,
        _cancel: &CancellationToken,
        src: &Path,
        dst: &Path,
    ) -> Result<(), PlatformError> {
        if self.fail_extract {
            return Err(PlatformError::ExtractionFailed {
                src: src.to_string_lossy().into_owned(),
                reason: "fake failure".to_string(),
            });
        }
        self.extract_calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((
                src.to_string_lossy().into_owned(),
                dst.to_string_lossy().into_owned(),
            ));
        Ok(())
    }
}
