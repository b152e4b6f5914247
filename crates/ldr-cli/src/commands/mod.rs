//! Command handler modules for the `ldr` binary.
//!
//! Shared helpers live here; command logic lives in the submodules.

pub mod primary;
pub mod reconcile;

use anyhow::Result;
use ldr_config::{report_unused_keys, EngineConfig, LoadedConfig, UnusedKeyPolicy};

/// Load layered config, or defaults when no path is given. Returns the engine
/// view and the config hash to stamp on the summary.
pub fn load_engine_config(paths: &[String], strict: bool) -> Result<(EngineConfig, Option<String>)> {
    if paths.is_empty() {
        return Ok((EngineConfig::default(), None));
    }

    let loaded = load_config(paths)?;
    let policy = if strict {
        UnusedKeyPolicy::Fail
    } else {
        UnusedKeyPolicy::Warn
    };

    let report = report_unused_keys(&loaded.config_json, policy)?;
    if !report.is_clean() {
        eprintln!(
            "WARN: CONFIG_UNUSED_KEYS unused_leaf_keys={}",
            report.unused_leaf_pointers.len()
        );
        for p in report.unused_leaf_pointers.iter().take(50) {
            eprintln!("  unused={}", p);
        }
    }

    Ok((loaded.engine, Some(loaded.config_hash)))
}

pub fn load_config(paths: &[String]) -> Result<LoadedConfig> {
    let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
    ldr_config::load_layered_yaml(&path_refs)
}
