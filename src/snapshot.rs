use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::stats::RuleSeries;

/// Every rule's series from one survey, plus the parameters that produced it.
/// Reloading one lets classification and reporting rerun without simulating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub size: usize,
    pub generations: u32,
    pub series: Vec<RuleSeries>,
}

impl Snapshot {
    pub fn new(size: usize, generations: u32, mut series: Vec<RuleSeries>) -> Self {
        series.sort_by_key(|s| s.rule);
        Self {
            size,
            generations,
            series,
        }
    }

    pub fn series_for(&self, rule: u8) -> Option<&RuleSeries> {
        self.series.iter().find(|s| s.rule == rule)
    }
}

/// Write a snapshot as JSON, creating parent directories as needed.
pub fn save(path: &Path, snapshot: &Snapshot) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(fs::File::create(path)?);
    serde_json::to_writer(&mut writer, snapshot)?;
    writer.flush()?;
    log::info!("Snapshot saved to {}", path.display());
    Ok(())
}

/// Read a snapshot written by [`save`].
pub fn load(path: &Path) -> Result<Snapshot> {
    let reader = BufReader::new(fs::File::open(path)?);
    let snapshot: Snapshot = serde_json::from_reader(reader)?;
    log::info!(
        "Loaded {} rules ({}³ lattice, {} generations) from {}",
        snapshot.series.len(),
        snapshot.size,
        snapshot.generations,
        path.display()
    );
    Ok(snapshot)
}
