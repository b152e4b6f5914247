//! ldr-config
//!
//! Layered YAML configuration for the reconciliation engine.
//!
//! Documents are deep-merged in order (later documents override earlier ones),
//! converted to JSON, canonicalised and hashed. The hash travels with every
//! reconciliation summary so two runs can be told apart by configuration.
//! [`EngineConfig`] is the typed view the engine reads; every field has a
//! default, so an empty document is a valid configuration.

mod engine;

pub use engine::{ChunkTier, CodesConfig, DatesConfig, EngineConfig, ScanConfig};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fs;

/// JSON-pointer prefixes the engine actually reads. Anything outside these is
/// reported by [`report_unused_keys`].
pub const CONSUMED_POINTERS: &[&str] = &[
    "/scan/chunk_tiers",
    "/scan/progress_steps",
    "/scan/estimated_row_bytes",
    "/scan/yield_pause_ms",
    "/scan/channel_capacity",
    "/codes/approved_disposition",
    "/codes/excluded_emission_type",
    "/dates/tolerance_days",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnusedKeyPolicy {
    Warn,
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnusedKeyReport {
    /// Consumed JSON-pointer prefixes used for this analysis (sorted, unique)
    pub consumed_prefixes: Vec<String>,
    /// Unused leaf pointers (sorted)
    pub unused_leaf_pointers: Vec<String>,
}

impl UnusedKeyReport {
    pub fn is_clean(&self) -> bool {
        self.unused_leaf_pointers.is_empty()
    }

    fn first_unused(&self, n: usize) -> String {
        let head: Vec<&str> = self
            .unused_leaf_pointers
            .iter()
            .take(n)
            .map(String::as_str)
            .collect();
        head.join(", ")
    }
}

/// Report config leaves the engine never reads.
///
/// `Warn` logs and returns the report; `Fail` errors when anything is unused.
/// Typos in YAML keys otherwise fall back to defaults without a trace.
pub fn report_unused_keys(config_json: &Value, policy: UnusedKeyPolicy) -> Result<UnusedKeyReport> {
    let consumed_prefixes: Vec<String> = CONSUMED_POINTERS
        .iter()
        .map(|p| p.to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let unused: BTreeSet<String> = leaf_pointers(config_json)
        .into_iter()
        .filter(|leaf| !consumed_prefixes.iter().any(|cp| is_prefix_pointer(cp, leaf)))
        .collect();

    let report = UnusedKeyReport {
        consumed_prefixes,
        unused_leaf_pointers: unused.into_iter().collect(),
    };

    if !report.is_clean() {
        let first = report.first_unused(12);
        match policy {
            UnusedKeyPolicy::Fail => bail!(
                "CONFIG_UNUSED_KEYS: {} unused config leaf key(s) detected. First few: {first}",
                report.unused_leaf_pointers.len(),
            ),
            UnusedKeyPolicy::Warn => tracing::warn!(
                unused = report.unused_leaf_pointers.len(),
                first = %first,
                "config contains keys the engine does not read"
            ),
        }
    }

    Ok(report)
}

/// True if `prefix` is a JSON-pointer prefix of `leaf`.
/// "/a/b" consumes "/a/b/c" but not "/a/bc".
fn is_prefix_pointer(prefix: &str, leaf: &str) -> bool {
    if prefix == "/" || leaf == prefix {
        return true;
    }
    leaf.strip_prefix(prefix)
        .is_some_and(|rest| rest.starts_with('/'))
}

/// JSON pointers of every scalar in `root`. Chunk tiers are an array, so
/// indexes appear as tokens (`/scan/chunk_tiers/0/max_file_bytes`).
fn leaf_pointers(root: &Value) -> Vec<String> {
    let mut out = Vec::new();
    let mut stack: Vec<(String, &Value)> = vec![(String::new(), root)];
    while let Some((pointer, value)) = stack.pop() {
        match value {
            Value::Object(map) => {
                for (k, v) in map {
                    let token = k.replace('~', "~0").replace('/', "~1");
                    stack.push((format!("{pointer}/{token}"), v));
                }
            }
            Value::Array(items) => {
                for (i, v) in items.iter().enumerate() {
                    stack.push((format!("{pointer}/{i}"), v));
                }
            }
            _ if pointer.is_empty() => out.push("/".to_string()),
            _ => out.push(pointer),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_hash: String,
    pub canonical_json: String,
    pub config_json: Value,
    pub engine: EngineConfig,
}

pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let mut docs: Vec<String> = Vec::new();
    for p in paths {
        let raw =
            fs::read_to_string(p).with_context(|| format!("failed to read yaml path: {p}"))?;
        docs.push(raw);
    }

    let doc_refs: Vec<&str> = docs.iter().map(|s| s.as_str()).collect();
    load_layered_yaml_from_strings(&doc_refs)
}

pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    let mut merged = serde_json::json!({});
    for raw in yaml_docs {
        let v_yaml: serde_yaml::Value = serde_yaml::from_str(raw).context("invalid yaml")?;
        // An empty document parses to null; it contributes nothing.
        if v_yaml.is_null() {
            continue;
        }
        let v_json = serde_json::to_value(v_yaml).context("yaml->json conversion failed")?;
        merge_layer(&mut merged, v_json);
    }

    let engine: EngineConfig =
        serde_json::from_value(merged.clone()).context("config does not match engine schema")?;
    engine.validate()?;

    let canonical_json = canonicalize_json(&merged)?;
    let config_hash = sha256_hex(canonical_json.as_bytes());
    Ok(LoadedConfig {
        config_hash,
        canonical_json,
        config_json: merged,
        engine,
    })
}

/// Overlay `layer` onto `base`. Objects merge key by key; any other value
/// replaces what was there.
fn merge_layer(base: &mut Value, layer: Value) {
    match (base, layer) {
        (Value::Object(base_map), Value::Object(layer_map)) => {
            for (k, v) in layer_map {
                merge_layer(base_map.entry(k).or_insert(Value::Null), v);
            }
        }
        (slot, other) => *slot = other,
    }
}

fn canonicalize_json(v: &Value) -> Result<String> {
    // serde_json::Map is BTreeMap-backed here, so key order is sorted.
    serde_json::to_string(v).context("canonical json serialize failed")
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
