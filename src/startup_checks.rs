//! Startup requirement validation for herakles-traffic.
//!
//! Checks privileges and proc filesystem access before a run. Only a missing
//! proc root is fatal; reduced visibility is reported as a warning.

use nix::unistd::geteuid;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{error, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum RequirementError {
    #[error("proc root {0} not found")]
    ProcRootMissing(String),
}

/// What the checks found out about process visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Counters of every process (including pid 1) are readable.
    AllProcesses,
    /// Only processes owned by the current user can be read.
    OwnProcesses,
    /// pid 1 is not present under the proc root; nothing to judge by.
    Unknown,
}

/// Validate all runtime requirements
pub fn validate_requirements(proc_root: &Path) -> Result<Visibility, RequirementError> {
    info!("🔍 Validating runtime requirements...");

    check_user_privileges();
    let visibility = check_proc_access(proc_root)?;

    info!("✅ Runtime requirements validated");
    Ok(visibility)
}

/// Check if running with sufficient privileges
fn check_user_privileges() {
    if !geteuid().is_root() {
        warn!("⚠️  Not running as root - counters of other users' processes are not readable");
        warn!("   Recommendation: Run as root for a system-wide picture");
    } else {
        info!("✅ Running as root (uid=0)");
    }
}

/// Check I/O counter access using pid 1 as the probe.
fn check_proc_access(proc_root: &Path) -> Result<Visibility, RequirementError> {
    if !proc_root.is_dir() {
        error!("❌ {} is not a directory", proc_root.display());
        return Err(RequirementError::ProcRootMissing(
            proc_root.display().to_string(),
        ));
    }

    let probe = proc_root.join("1").join("io");
    // metadata() succeeds for unreadable io files; only an actual read tells.
    match fs::read_to_string(&probe) {
        Ok(_) => {
            info!("✅ {} readable: all processes visible", probe.display());
            Ok(Visibility::AllProcesses)
        }
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            warn!("⚠️  Cannot read {} - insufficient permissions", probe.display());
            warn!("   Only user-owned processes will be measured");
            warn!("   Solutions: run as root, or grant cap_dac_read_search,cap_sys_ptrace");
            Ok(Visibility::OwnProcesses)
        }
        Err(e) => {
            warn!("⚠️  Could not test {}: {}", probe.display(), e);
            Ok(Visibility::Unknown)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_proc_root_is_fatal() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            check_proc_access(&dir.path().join("nope")),
            Err(RequirementError::ProcRootMissing(_))
        ));
    }

    #[test]
    fn test_readable_init_counters() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("1")).unwrap();
        fs::write(dir.path().join("1/io"), "read_bytes: 0\nwrite_bytes: 0\n").unwrap();

        assert_eq!(
            check_proc_access(dir.path()).unwrap(),
            Visibility::AllProcesses
        );
    }

    #[test]
    fn test_absent_init_is_unknown() {
        let dir = TempDir::new().unwrap();
        assert_eq!(check_proc_access(dir.path()).unwrap(), Visibility::Unknown);
    }
}
