// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Line-oriented pumps for a child's stdout/stderr pipes.

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;

/// Read `reader` line by line until EOF, forwarding every non-empty line
/// to `tx` and returning the total line count (including blank lines) for
/// callers that want to log a summary.
pub async fn pump_lines<R: AsyncRead + Unpin>(reader: R, tx: mpsc::UnboundedSender<String>) {
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if !line.is_empty() {
                    let _ = tx.send(line);
                }
            }
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(error = %e, "error reading child output stream, stopping pump");
                return;
            }
        }
    }
}
