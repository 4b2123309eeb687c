// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cracker self-update: download → extract → validate → swap, with the
//! previous install kept as a backup (§4.H step 5).

use crate::error::DaemonError;
use agent_api::{ApiClient, CrackerUpdate};
use agent_platform::Platform;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

/// Download and install `update` under `crackers_path`. On any failure
/// (download, extraction, or post-extraction validation) the existing
/// `hashcat/` install is left untouched and this returns `Err` — the
/// caller keeps running with whatever binary it already had.
pub async fn apply(
    api: &dyn ApiClient,
    platform: &dyn Platform,
    cancel: &CancellationToken,
    crackers_path: &Path,
    update: &CrackerUpdate,
) -> Result<PathBuf, DaemonError> {
    let archive_path = crackers_path.join("hashcat.7z");
    api.download_resource(cancel, &update.download_url, None, &archive_path)
        .await?;

    let staged_path = crackers_path.join("hashcat_new");
    if staged_path.exists() {
        std::fs::remove_dir_all(&staged_path)?;
    }
    let extract_result = platform.extract_7z(cancel, &archive_path, &staged_path).await;
    let _ = std::fs::remove_file(&archive_path);
    extract_result?;

    let staged_binary = staged_path.join(&update.exec_name);
    if let Err(e) = platform.hashcat_version(&staged_binary).await {
        let _ = std::fs::remove_dir_all(&staged_path);
        return Err(DaemonError::Platform(e));
    }

    let active_path = crackers_path.join("hashcat");
    let backup_path = crackers_path.join("hashcat_old");
    if backup_path.exists() {
        std::fs::remove_dir_all(&backup_path)?;
    }
    if active_path.exists() {
        std::fs::rename(&active_path, &backup_path)?;
    }
    std::fs::rename(&staged_path, &active_path)?;

    Ok(active_path.join(&update.exec_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_api::fake::FakeApiClient;
    use agent_platform::fake::FakePlatform;

    fn sample_update() -> CrackerUpdate {
        CrackerUpdate {
            version: "6.2.6".to_string(),
            download_url: "https://example.test/hashcat.7z".to_string(),
            exec_name: "hashcat".to_string(),
        }
    }

    #[tokio::test]
    async fn swaps_in_new_install_and_backs_up_old() {
        let dir = tempfile::tempdir().unwrap();
        let crackers_path = dir.path().join("crackers");
        std::fs::create_dir_all(crackers_path.join("hashcat")).unwrap();
        std::fs::write(crackers_path.join("hashcat").join("hashcat"), b"old").unwrap();

        let api = FakeApiClient::new();
        // FakePlatform's extract_7z is a no-op recorder, so pre-populate
        // the directory it's supposed to have produced.
        let platform = FakePlatform::new();
        let cancel = CancellationToken::new();

        // extract_7z being a no-op means `staged_path` never gets created by
        // the fake; simulate what a real extractor would leave behind.
        std::fs::create_dir_all(crackers_path.join("hashcat_new")).unwrap();
        std::fs::write(crackers_path.join("hashcat_new").join("hashcat"), b"new").unwrap();

        let binary = apply(&api, &platform, &cancel, &crackers_path, &sample_update())
            .await
            .unwrap();

        assert_eq!(binary, crackers_path.join("hashcat").join("hashcat"));
        assert_eq!(
            std::fs::read_to_string(&binary).unwrap(),
            "new"
        );
        assert_eq!(
            std::fs::read_to_string(crackers_path.join("hashcat_old").join("hashcat")).unwrap(),
            "old"
        );
    }

    #[tokio::test]
    async fn extraction_failure_leaves_existing_install_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let crackers_path = dir.path().join("crackers");
        std::fs::create_dir_all(crackers_path.join("hashcat")).unwrap();
        std::fs::write(crackers_path.join("hashcat").join("hashcat"), b"old").unwrap();

        let api = FakeApiClient::new();
        let platform = FakePlatform::new().failing_extract();
        let cancel = CancellationToken::new();

        let result = apply(&api, &platform, &cancel, &crackers_path, &sample_update()).await;
        assert!(result.is_err());
        assert_eq!(
            std::fs::read_to_string(crackers_path.join("hashcat").join("hashcat")).unwrap(),
            "old"
        );
        assert!(!crackers_path.join("hashcat_old").exists());
    }
}
