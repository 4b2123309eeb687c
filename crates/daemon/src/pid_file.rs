// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Advisory PID file (§4.H step 1, §5 "shared resources").
//!
//! Unlike the teacher's `fs2::try_lock_exclusive` file lock, §5 specifies an
//! advisory PID file whose liveness must be checked explicitly: a stale
//! file (naming a PID that is no longer running) is silently overwritten
//! rather than treated as a conflict. We use `sysinfo` to check liveness
//! instead of an OS-level lock, since the spec's model is "detect by PID
//! liveness", not "exclusive lock".

use crate::error::DaemonError;
use std::io::Write;
use std::path::Path;
use sysinfo::{Pid, System};

/// Claim `path` for this process: if it names a PID that's still alive,
/// refuse with [`DaemonError::AlreadyRunning`]; otherwise (absent, empty,
/// unparseable, or naming a dead PID) overwrite it with our own PID.
pub fn claim(path: &Path) -> Result<(), DaemonError> {
    if let Some(existing) = read_live_pid(path) {
        return Err(DaemonError::AlreadyRunning(existing));
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    writeln!(file, "{}", std::process::id())?;
    Ok(())
}

/// Remove the PID file if it still names this process (§4.H main loop,
/// shutdown step).
pub fn release(path: &Path) {
    if let Ok(contents) = std::fs::read_to_string(path) {
        if contents.trim().parse::<u32>() == Ok(std::process::id()) {
            let _ = std::fs::remove_file(path);
        }
    }
}

fn read_live_pid(path: &Path) -> Option<u32> {
    let contents = std::fs::read_to_string(path).ok()?;
    let pid: u32 = contents.trim().parse().ok()?;

    let mut system = System::new();
    system.refresh_processes(sysinfo::ProcessesToUpdate::All, true);
    system.process(Pid::from_u32(pid)).map(|_| pid)
}
