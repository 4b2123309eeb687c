// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Download preconditions for a task's dependencies (§4.F).
//!
//! The hashlist is always re-fetched (the server may have updated it);
//! attack resources (wordlist/rulelist/masklist) are only re-fetched when
//! absent or when the local copy's MD5 no longer matches the server's
//! checksum. A mismatch is treated as a download failure that must be
//! retried, not as silent success — the server's checksum is the only
//! thing that can be trusted once it disagrees with what's on disk.

use agent_api::{ApiClient, ApiError};
use agent_core::{Attack, AttackId, ResourceFile};
use md5::{Digest, Md5};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

/// Ensure `attack`'s hashlist exists at `hashlist_path/<hash_list_id>.txt`,
/// always re-downloading it to pick up server-side edits.
pub async fn ensure_hash_list(
    api: &dyn ApiClient,
    cancel: &CancellationToken,
    attack: &Attack,
    hashlist_path: &Path,
) -> Result<PathBuf, ApiError> {
    let dest = hashlist_path.join(format!("{}.txt", attack.hash_list_id));
    api.download_hash_list(cancel, attack.id, &dest).await?;
    Ok(dest)
}

/// Ensure every resource attached to `attack` (wordlist, rulelist,
/// masklist) exists under `file_path`, re-downloading any that are absent
/// or whose on-disk MD5 no longer matches `resource.checksum`.
pub async fn ensure_attack_resources(
    api: &dyn ApiClient,
    cancel: &CancellationToken,
    attack: &Attack,
    file_path: &Path,
) -> Result<(), ApiError> {
    for resource in [&attack.word_list, &attack.rule_list, &attack.mask_list]
        .into_iter()
        .flatten()
    {
        ensure_resource(api, cancel, attack.id, resource, file_path).await?;
    }
    Ok(())
}

async fn ensure_resource(
    api: &dyn ApiClient,
    cancel: &CancellationToken,
    attack_id: AttackId,
    resource: &ResourceFile,
    file_path: &Path,
) -> Result<(), ApiError> {
    let dest = file_path.join(&resource.file_name);
    if needs_download(&dest, resource.checksum.as_deref()) {
        tracing::debug!(
            attack_id = %attack_id,
            file = %resource.file_name,
            "downloading attack resource"
        );
        api.download_resource(cancel, &resource.download_url, resource.checksum.as_deref(), &dest)
            .await?;
    }
    Ok(())
}

/// A resource needs downloading when it's absent, or a checksum was
/// supplied and the file on disk doesn't match it. A checksum mismatch is
/// *not* treated as success-after-delete — the caller re-downloads and
/// propagates any failure from that re-download as an error.
fn needs_download(path: &Path, checksum: Option<&str>) -> bool {
    let Some(expected) = checksum else {
        return !path.exists();
    };
    match md5_hex(path) {
        Some(actual) => !actual.eq_ignore_ascii_case(expected),
        None => true,
    }
}

fn md5_hex(path: &Path) -> Option<String> {
    let bytes = std::fs::read(path).ok()?;
    let mut hasher = Md5::new();
    hasher.update(&bytes);
    Some(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_api::fake::FakeApiClient;
    use agent_core::id::HashListId;
    use tempfile::tempdir;

    fn sample_attack(word_list: Option<ResourceFile>) -> Attack {
        Attack {
            id: AttackId::new(5),
            hash_mode: 0,
            attack_mode_hashcat: agent_core::AttackModeHashcat::Dictionary,
            hash_list_id: HashListId::new(9),
            hash_list_url: "https://example.test/hash_list".into(),
            mask: None,
            increment_mode: false,
            increment_minimum: None,
            increment_maximum: None,
            custom_charset_1: None,
            custom_charset_2: None,
            custom_charset_3: None,
            custom_charset_4: None,
            word_list,
            rule_list: None,
            mask_list: None,
            optimized: false,
            slow_candidate_generators: false,
        }
    }

    #[test]
    fn missing_file_with_no_checksum_needs_download() {
        let dir = tempdir().unwrap();
        assert!(needs_download(&dir.path().join("missing.txt"), None));
    }

    #[test]
    fn present_file_with_no_checksum_is_a_no_op() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("present.txt");
        std::fs::write(&path, b"data").unwrap();
        assert!(!needs_download(&path, None));
    }

    #[test]
    fn matching_checksum_is_a_no_op() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rockyou.txt");
        std::fs::write(&path, b"password123").unwrap();
        let checksum = md5_hex(&path).unwrap();
        assert!(!needs_download(&path, Some(&checksum)));
    }

    #[test]
    fn mismatched_checksum_forces_redownload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rockyou.txt");
        std::fs::write(&path, b"stale contents").unwrap();
        assert!(needs_download(&path, Some("0".repeat(32).as_str())));
    }

    #[tokio::test]
    async fn hash_list_is_always_redownloaded() {
        let fake = FakeApiClient::new();
        let attack = sample_attack(None);
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("9.txt"), b"stale").unwrap();
        let cancel = CancellationToken::new();
        let dest = ensure_hash_list(&fake, &cancel, &attack, dir.path()).await.unwrap();
        assert_eq!(std::fs::read_to_string(dest).unwrap(), "fakehash:fakesalt\n");
    }

    #[tokio::test]
    async fn resource_download_skipped_when_checksum_matches() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rockyou.txt");
        std::fs::write(&path, b"password123").unwrap();
        let checksum = md5_hex(&path).unwrap();
        let attack = sample_attack(Some(ResourceFile {
            file_name: "rockyou.txt".into(),
            download_url: "https://example.test/rockyou.txt".into(),
            checksum: Some(checksum),
        }));
        let fake = FakeApiClient::new();
        let cancel = CancellationToken::new();
        ensure_attack_resources(&fake, &cancel, &attack, dir.path()).await.unwrap();
        // Untouched: FakeApiClient::download_resource would overwrite with
        // "fake resource contents\n" if it were (wrongly) called.
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "password123");
    }
}
