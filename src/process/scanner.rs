//! Process scanning utilities for discovering and reading process entries from /proc.
//!
//! This module provides functions to scan the proc filesystem for process entries,
//! read process names and decide whether a process passes the name filters.

use crate::config::Config;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Process entry representing a directory in the proc filesystem.
#[derive(Debug, Clone)]
pub struct ProcEntry {
    pub pid: u32,
    pub proc_path: PathBuf,
}

/// Scans the proc root for process entries with numeric PIDs.
///
/// Failing to open the root itself is returned as an error: without it there is
/// nothing to enumerate. Individual entries that vanish mid-scan are skipped.
pub fn collect_proc_entries(root: &Path, max: Option<usize>) -> io::Result<Vec<ProcEntry>> {
    let mut out = Vec::new();
    for entry in fs::read_dir(root)?.flatten() {
        let p = entry.path();
        let name = match p.file_name().and_then(|s| s.to_str()) {
            Some(v) => v,
            None => continue,
        };
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }
        let pid: u32 = match name.parse() {
            Ok(v) => v,
            Err(_) => continue,
        };
        out.push(ProcEntry { pid, proc_path: p });
        if let Some(maxp) = max {
            if out.len() >= maxp {
                break;
            }
        }
    }
    Ok(out)
}

/// Reads process name from comm file or extracts from cmdline.
pub fn read_process_name(proc_path: &Path) -> Option<String> {
    let comm = proc_path.join("comm");
    if let Ok(s) = fs::read_to_string(&comm) {
        let t = s.trim();
        if !t.is_empty() {
            return Some(t.into());
        }
    }

    let cmd = proc_path.join("cmdline");
    if let Ok(content) = fs::read(&cmd) {
        let first = content.split(|&b| b == 0u8).next().unwrap_or(&[]);
        if let Ok(arg0) = std::str::from_utf8(first) {
            if let Some(name) = Path::new(arg0).file_name() {
                return name.to_str().map(|s| s.to_string());
            }
        }
    }
    None
}

/// Determines if a process should be included based on configuration filters.
pub fn should_include_process(name: &str, cfg: &Config) -> bool {
    if let Some(ex) = &cfg.exclude_names {
        if ex.iter().any(|s| name.contains(s)) {
            return false;
        }
    }
    if let Some(inc) = &cfg.include_names {
        if !inc.is_empty() {
            return inc.iter().any(|s| name.contains(s));
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fake_proc(pids: &[(&str, Option<&str>, Option<&[u8]>)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (pid, comm, cmdline) in pids {
            let p = dir.path().join(pid);
            fs::create_dir(&p).unwrap();
            if let Some(c) = comm {
                fs::write(p.join("comm"), c).unwrap();
            }
            if let Some(c) = cmdline {
                fs::write(p.join("cmdline"), c).unwrap();
            }
        }
        dir
    }

    // -------------------------------------------------------------------------
    // Tests for collect_proc_entries
    // -------------------------------------------------------------------------

    #[test]
    fn test_collect_proc_entries_skips_non_numeric() {
        let dir = fake_proc(&[("1", None, None), ("42", None, None), ("self", None, None)]);
        fs::create_dir(dir.path().join("sys")).unwrap();

        let mut pids: Vec<u32> = collect_proc_entries(dir.path(), None)
            .unwrap()
            .iter()
            .map(|e| e.pid)
            .collect();
        pids.sort_unstable();
        assert_eq!(pids, vec![1, 42]);
    }

    #[test]
    fn test_collect_proc_entries_respects_max() {
        let dir = fake_proc(&[("1", None, None), ("2", None, None), ("3", None, None)]);
        let entries = collect_proc_entries(dir.path(), Some(2)).unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn test_collect_proc_entries_missing_root_is_error() {
        let dir = TempDir::new().unwrap();
        assert!(collect_proc_entries(&dir.path().join("nope"), None).is_err());
    }

    // -------------------------------------------------------------------------
    // Tests for read_process_name
    // -------------------------------------------------------------------------

    #[test]
    fn test_read_process_name_prefers_comm() {
        let dir = fake_proc(&[("7", Some("nginx\n"), Some(&b"/usr/sbin/other\0-g\0"[..]))]);
        assert_eq!(
            read_process_name(&dir.path().join("7")),
            Some("nginx".to_string())
        );
    }

    #[test]
    fn test_read_process_name_falls_back_to_cmdline() {
        let dir = fake_proc(&[("7", Some("  \n"), Some(&b"/usr/bin/curl\0-s\0"[..]))]);
        assert_eq!(
            read_process_name(&dir.path().join("7")),
            Some("curl".to_string())
        );
    }

    #[test]
    fn test_read_process_name_none_when_unreadable() {
        let dir = fake_proc(&[("7", None, None)]);
        assert_eq!(read_process_name(&dir.path().join("7")), None);
    }

    // -------------------------------------------------------------------------
    // Tests for should_include_process
    // -------------------------------------------------------------------------

    #[test]
    fn test_should_include_process_no_filters() {
        let cfg = Config::default();
        assert!(should_include_process("firefox", &cfg));
        assert!(should_include_process("any_process", &cfg));
    }

    #[test]
    fn test_should_include_process_exclude_takes_priority() {
        let mut cfg = Config::default();
        cfg.include_names = Some(vec!["app".to_string()]);
        cfg.exclude_names = Some(vec!["test".to_string()]);

        assert!(!should_include_process("test_app", &cfg));
        assert!(should_include_process("prod_app", &cfg));
        assert!(!should_include_process("sshd", &cfg));
    }
}
