use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

const MIB: u64 = 1024 * 1024;

/// Typed engine configuration. Missing sections fall back to defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub scan: ScanConfig,
    pub codes: CodesConfig,
    pub dates: DatesConfig,
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.scan.chunk_tiers.is_empty() {
            bail!("scan.chunk_tiers must not be empty");
        }
        if self.scan.chunk_tiers.iter().any(|t| t.chunk_bytes == 0) {
            bail!("scan.chunk_tiers: chunk_bytes must be > 0");
        }
        if self.scan.progress_steps == 0 {
            bail!("scan.progress_steps must be > 0");
        }
        if self.scan.estimated_row_bytes == 0 {
            bail!("scan.estimated_row_bytes must be > 0");
        }
        if self.scan.channel_capacity == 0 {
            bail!("scan.channel_capacity must be > 0");
        }
        if self.dates.tolerance_days < 0 {
            bail!("dates.tolerance_days must be >= 0");
        }
        Ok(())
    }
}

/// Chunk size for files up to `max_file_bytes`. `None` matches any size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkTier {
    pub max_file_bytes: Option<u64>,
    pub chunk_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Checked in order; first tier whose bound covers the file wins.
    pub chunk_tiers: Vec<ChunkTier>,
    /// Progress buckets over the estimated row count.
    pub progress_steps: u64,
    /// Average row width used to estimate row count from file size.
    pub estimated_row_bytes: u64,
    /// Pause at each chunk boundary. 0 means a bare cooperative yield.
    pub yield_pause_ms: u64,
    /// Bounded hand-off depth between the parser thread and the index builder.
    pub channel_capacity: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            chunk_tiers: vec![
                ChunkTier {
                    max_file_bytes: Some(64 * MIB),
                    chunk_bytes: MIB,
                },
                ChunkTier {
                    max_file_bytes: Some(1024 * MIB),
                    chunk_bytes: 4 * MIB,
                },
                ChunkTier {
                    max_file_bytes: None,
                    chunk_bytes: 16 * MIB,
                },
            ],
            progress_steps: 100,
            estimated_row_bytes: 256,
            yield_pause_ms: 0,
            channel_capacity: 2,
        }
    }
}

impl ScanConfig {
    /// Larger files get larger chunks so per-chunk overhead stays flat.
    pub fn chunk_bytes_for(&self, file_size: u64) -> u64 {
        self.chunk_tiers
            .iter()
            .find(|t| t.max_file_bytes.map_or(true, |max| file_size <= max))
            .or_else(|| self.chunk_tiers.last())
            .map(|t| t.chunk_bytes)
            .unwrap_or(MIB)
    }

    pub fn estimated_rows(&self, file_size: u64) -> u64 {
        (file_size / self.estimated_row_bytes.max(1)).max(1)
    }

    /// Rows between two progress reports.
    pub fn progress_every(&self, file_size: u64) -> u64 {
        (self.estimated_rows(file_size) / self.progress_steps.max(1)).max(1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodesConfig {
    /// Disposition code that marks an approved revision.
    pub approved_disposition: String,
    /// Emission type that never certifies.
    pub excluded_emission_type: String,
}

impl Default for CodesConfig {
    fn default() -> Self {
        Self {
            approved_disposition: "1".to_string(),
            excluded_emission_type: "C".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatesConfig {
    /// Maximum absolute day difference still reported as equal.
    pub tolerance_days: i64,
}

impl Default for DatesConfig {
    fn default() -> Self {
        Self { tolerance_days: 1 }
    }
}
