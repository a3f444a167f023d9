//! Block I/O counter parsing from `/proc/<pid>/io`.

use std::fs;
use std::io;
use std::path::Path;

/// Cumulative storage I/O counters of a single process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IoCounters {
    /// Total bytes read from storage
    pub read_bytes: u64,
    /// Total bytes written to storage
    pub write_bytes: u64,
}

impl IoCounters {
    /// Combined traffic attributed to the process.
    pub fn total(&self) -> u64 {
        self.read_bytes.saturating_add(self.write_bytes)
    }
}

/// Why a single process could not be sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The process exited between enumeration and read.
    Vanished,
    /// The io file is not readable by us (usually not root / no CAP_SYS_PTRACE).
    AccessDenied,
    /// The io file was readable but did not contain both counters.
    Malformed,
    /// Any other read failure on a per-process file.
    Other,
}

impl SkipReason {
    pub fn classify(err: &io::Error) -> Self {
        // ESRCH shows up when the task is torn down while we hold the file open.
        if err.raw_os_error() == Some(nix::errno::Errno::ESRCH as i32) {
            return SkipReason::Vanished;
        }
        match err.kind() {
            io::ErrorKind::NotFound => SkipReason::Vanished,
            io::ErrorKind::PermissionDenied => SkipReason::AccessDenied,
            io::ErrorKind::InvalidData => SkipReason::Malformed,
            _ => SkipReason::Other,
        }
    }
}

/// Reads Block I/O statistics from /proc/[pid]/io.
/// Note: Requires appropriate permissions (usually root or CAP_SYS_PTRACE).
pub fn read_block_io(proc_path: &Path) -> io::Result<IoCounters> {
    let content = fs::read_to_string(proc_path.join("io"))?;
    parse_block_io(&content)
}

/// Parses the `read_bytes:` / `write_bytes:` lines of an io file.
pub fn parse_block_io(content: &str) -> io::Result<IoCounters> {
    let mut read_bytes = None;
    let mut write_bytes = None;

    for line in content.lines() {
        if let Some(v) = line.strip_prefix("read_bytes:") {
            read_bytes = v.trim().parse::<u64>().ok();
        } else if let Some(v) = line.strip_prefix("write_bytes:") {
            write_bytes = v.trim().parse::<u64>().ok();
        }

        // Early exit if we've found both values
        if read_bytes.is_some() && write_bytes.is_some() {
            break;
        }
    }

    match (read_bytes, write_bytes) {
        (Some(read_bytes), Some(write_bytes)) => Ok(IoCounters {
            read_bytes,
            write_bytes,
        }),
        _ => Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "io file lacks read_bytes/write_bytes",
        )),
    }
}
