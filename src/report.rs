use crate::analysis::NormalizedBatch;
use crate::error::ImageError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One band in a tube report, as consumed by downstream reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandRecord {
    pub color: String,
    pub units: u32,
}

/// The externally consumed per-tube artifact. Immutable after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TubeReport {
    pub tube_id: String,
    pub bands: Vec<BandRecord>,
    pub empty_units: u32,
}

/// Batch-level output. Carries the reference area for auditability: every
/// unit count in the batch was derived against it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub generated_at: DateTime<Utc>,
    pub reference_area: u64,
    pub tubes: Vec<TubeReport>,
}

impl BatchReport {
    pub fn from_normalized(batch: &NormalizedBatch) -> Self {
        let tubes = batch
            .tubes
            .iter()
            .map(|tube| TubeReport {
                tube_id: tube.tube_id.clone(),
                bands: tube
                    .bands
                    .iter()
                    .map(|b| BandRecord {
                        color: b.label.clone(),
                        units: b.units,
                    })
                    .collect(),
                empty_units: tube.empty_units,
            })
            .collect();

        Self {
            generated_at: Utc::now(),
            reference_area: batch.reference_area,
            tubes,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn write_json(&self, path: &Path) -> Result<(), crate::error::RackscanError> {
        let json = self.to_json()?;
        std::fs::write(path, json)
            .map_err(|e| ImageError::WriteReport(path.to_path_buf(), e))?;
        Ok(())
    }
}
