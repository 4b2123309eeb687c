// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Polling tailer for hashcat's outfile (`--outfile-format=1,2`).
//!
//! The outfile doesn't exist until the first hash cracks, so the tailer
//! polls for its creation rather than opening it up front. Tracks a byte
//! offset so repeated polls only parse content appended since the last
//! read, mirroring the incremental-offset approach used for session log
//! tailing elsewhere in this codebase's lineage.

use agent_core::CrackedHash;
use chrono::Utc;
use std::io::{Read, Seek, SeekFrom};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const POLL_INTERVAL: std::time::Duration = std::time::Duration::from_millis(250);

/// Spawn a background task that tails `path` until `cancel` fires, emitting
/// one [`CrackedHash`] per complete `hash:plaintext` line.
pub fn spawn_tailer(
    path: PathBuf,
    cancel: CancellationToken,
) -> mpsc::UnboundedReceiver<CrackedHash> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(tail_loop(path, tx, cancel));
    rx
}

async fn tail_loop(path: PathBuf, tx: mpsc::UnboundedSender<CrackedHash>, cancel: CancellationToken) {
    let mut offset: u64 = 0;
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(POLL_INTERVAL) => {}
        }
        offset = read_new_lines(&path, offset, &tx);
    }
}

/// Read whatever has been appended to `path` since `offset`, emitting each
/// complete line. Returns the new offset (unchanged on any I/O error, since
/// the file commonly doesn't exist yet).
fn read_new_lines(path: &std::path::Path, offset: u64, tx: &mpsc::UnboundedSender<CrackedHash>) -> u64 {
    let Ok(mut file) = std::fs::File::open(path) else {
        return offset;
    };
    let Ok(metadata) = file.metadata() else {
        return offset;
    };
    let len = metadata.len();
    if len < offset {
        // Outfile was truncated or replaced; restart from the top.
        return read_new_lines(path, 0, tx);
    }
    if len == offset {
        return offset;
    }
    if file.seek(SeekFrom::Start(offset)).is_err() {
        return offset;
    }
    let mut buf = String::new();
    if file.read_to_string(&mut buf).is_err() {
        return offset;
    }
    let mut consumed = 0u64;
    for line in buf.split_inclusive('\n') {
        if !line.ends_with('\n') {
            // Partial line at EOF; leave it for the next poll.
            break;
        }
        consumed += line.len() as u64;
        let trimmed = line.trim_end_matches(['\n', '\r']);
        if let Some(cracked) = CrackedHash::parse_line(trimmed, Utc::now()) {
            let _ = tx.send(cracked);
        }
    }
    offset + consumed
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn parses_appended_lines_incrementally() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("5.out");
        std::fs::write(&path, "deadbeef:password\n").unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let offset = read_new_lines(&path, 0, &tx);
        let first = rx.try_recv().unwrap();
        assert_eq!(first.hash, "deadbeef");
        assert_eq!(first.plaintext, "password");
        assert!(rx.try_recv().is_err());

        let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "cafebabe:hunter2").unwrap();
        let offset = read_new_lines(&path, offset, &tx);
        let second = rx.try_recv().unwrap();
        assert_eq!(second.hash, "cafebabe");
        assert_eq!(second.plaintext, "hunter2");

        // No more appends: offset stays put, no further emissions.
        assert_eq!(read_new_lines(&path, offset, &tx), offset);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn ignores_partial_trailing_line() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("5.out");
        std::fs::write(&path, "deadbeef:passwor").unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let offset = read_new_lines(&path, 0, &tx);
        assert!(rx.try_recv().is_err());
        assert_eq!(offset, 0);
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.out");
        let (tx, mut rx) = mpsc::unbounded_channel();
        assert_eq!(read_new_lines(&path, 0, &tx), 0);
        assert!(rx.try_recv().is_err());
    }
}
