//! Process-related modules for enumerating processes and reading their I/O counters.
//!
//! This module provides:
//! - `scanner`: Process discovery and filtering
//! - `io`: Block I/O counter parsing from /proc/<pid>/io

pub mod io;
pub mod scanner;

// Re-export commonly used types
pub use io::{parse_block_io, read_block_io, IoCounters, SkipReason};
pub use scanner::{collect_proc_entries, read_process_name, should_include_process, ProcEntry};
