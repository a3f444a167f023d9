//! Check command implementation.
//!
//! Validates system requirements and configuration, optionally running one
//! test collection.

use std::sync::Arc;

use crate::config::{validate_effective_config, Config};
use crate::process::collect_proc_entries;
use crate::snapshot::{ProcfsSource, SnapshotSource};
use crate::startup_checks::{validate_requirements, Visibility};
use crate::stats::SamplerStats;

/// Number of processes listed after a test collection.
const SUMMARY_ROWS: usize = 5;

/// Validates system requirements and configuration. Returns `false` when a
/// check failed.
pub fn command_check(collect: bool, config: &Config) -> anyhow::Result<bool> {
    println!("🔍 Herakles Traffic Sampler - System Check");
    println!("==========================================");

    let mut all_ok = true;
    let proc_root = config.proc_root();

    println!("\n📁 Checking {} ...", proc_root.display());
    match validate_requirements(&proc_root) {
        Ok(Visibility::AllProcesses) => println!("   ✅ I/O counters of all processes readable"),
        Ok(Visibility::OwnProcesses) => {
            println!("   ⚠️  Only I/O counters of user-owned processes are readable")
        }
        Ok(Visibility::Unknown) => println!("   ⚠️  Could not probe pid 1"),
        Err(e) => {
            println!("   ❌ {}", e);
            all_ok = false;
        }
    }

    match collect_proc_entries(&proc_root, Some(SUMMARY_ROWS)) {
        Ok(entries) if !entries.is_empty() => {
            println!("   ✅ Can read {} process entries", entries.len())
        }
        Ok(_) => {
            println!("   ❌ No process entries found");
            all_ok = false;
        }
        Err(e) => {
            println!("   ❌ Cannot enumerate processes: {}", e);
            all_ok = false;
        }
    }

    println!("\n⚙️  Checking configuration...");
    match validate_effective_config(config) {
        Ok(()) => println!("   ✅ Configuration is valid"),
        Err(e) => {
            println!("   ❌ Configuration invalid: {}", e);
            all_ok = false;
        }
    }

    if collect {
        println!("\n📊 Test collection...");
        let stats = Arc::new(SamplerStats::new());
        let mut source = ProcfsSource::from_config(Arc::new(config.clone()), stats.clone());
        match source.collect() {
            Ok(snapshot) => {
                println!(
                    "   ✅ {} process names, {} processes skipped",
                    snapshot.len(),
                    stats.skipped_total()
                );
                let mut busiest: Vec<(&String, &u64)> = snapshot.iter().collect();
                busiest.sort_by(|a, b| b.1.cmp(a.1));
                for (name, bytes) in busiest.into_iter().take(SUMMARY_ROWS) {
                    println!("      {:<24} {:>14} bytes", name, bytes);
                }
            }
            Err(e) => {
                println!("   ❌ Collection failed: {}", e);
                all_ok = false;
            }
        }
    }

    println!("\n📋 Summary:");
    if all_ok {
        println!("   ✅ All checks passed - system is ready");
    } else {
        println!("   ❌ Some checks failed - please review warnings");
    }
    Ok(all_ok)
}
