//
// Copyright (c) The Fabric Control Plane Contributors
//
// SPDX-License-Identifier: MIT
//

//! The append-only, externally-graded log files (spec §6). This is
//! deliberately hand-formatted rather than routed through `tracing`: its
//! byte-for-byte shape (two leading blank lines, a microsecond timestamp,
//! then fixed content strings) is part of the wire contract graders check,
//! the same way the on-disk protocol formats in `message.rs` are -- neither
//! belongs to the operator-facing `tracing` diagnostics the binaries also
//! emit.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Local;

use crate::error::IoError;

/// Serializes writes to one log file. A second, dedicated lock rather than
/// reusing the state mutex (spec §5 offers both; this keeps the state lock
/// uncontended by file I/O).
pub struct Logger {
    path: PathBuf,
    guard: Mutex<()>,
}

impl Logger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Logger {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    /// Appends one entry: two blank lines, a `HH:MM:SS.micros` timestamp,
    /// then `content_lines` verbatim.
    pub fn write_entry(&self, content_lines: &[String]) {
        let _lock = self.guard.lock().unwrap();
        if let Err(e) = self.append(content_lines) {
            IoError::LogWrite(e).log();
        }
    }

    fn append(&self, content_lines: &[String]) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let ts = Local::now().format("%H:%M:%S%.6f");
        let mut buf = String::from("\n\n");
        buf.push_str(&ts.to_string());
        buf.push('\n');
        for line in content_lines {
            buf.push_str(line);
            buf.push('\n');
        }
        file.write_all(buf.as_bytes())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Builds the `Routing Update ... Routing Complete` block shared by both
/// roles, differing only in whether the distance column is present.
pub fn routing_update_block<I, S>(rows: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut lines = vec!["Routing Update".to_string()];
    lines.extend(rows.into_iter().map(Into::into));
    lines.push("Routing Complete".to_string());
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn entry_is_preceded_by_two_blank_lines() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("sdn-log-test-{}.log", std::process::id()));
        let _ = std::fs::remove_file(&path);
        let logger = Logger::new(&path);

        logger.write_entry(&["Register Request 0".to_string()]);
        logger.write_entry(&["Register Request 1".to_string()]);

        let mut contents = String::new();
        std::fs::File::open(&path)
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        let lines: Vec<&str> = contents.split('\n').collect();
        // Leading: "", "", "<ts>", "Register Request 0", "", "", "<ts>", "Register Request 1", ""
        assert_eq!(lines[0], "");
        assert_eq!(lines[1], "");
        assert_eq!(lines[3], "Register Request 0");
        assert_eq!(lines[4], "");
        assert_eq!(lines[5], "");
        assert_eq!(lines[7], "Register Request 1");

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn routing_update_block_wraps_rows() {
        let block = routing_update_block(vec!["0,1:1,2".to_string()]);
        assert_eq!(
            block,
            vec![
                "Routing Update".to_string(),
                "0,1:1,2".to_string(),
                "Routing Complete".to_string(),
            ]
        );
    }
}
