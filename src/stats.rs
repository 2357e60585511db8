use std::f64::consts::PI;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::grid::{Lattice, Rule};
use crate::simulation::{neighbor_sums, Simulation};

/// Statistics of the lattice after one generation.
///
/// All derived fields are zero when the population is zero.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GenerationRecord {
    /// 1-based generation index.
    pub generation: u32,
    pub total_cells: u64,
    pub mean_neighbor_sum: f64,
    pub max_neighbor_sum: u8,
    pub min_neighbor_sum: u8,
    /// Euclidean distance of the farthest live cell from the seed position.
    pub max_distance_from_center: f64,
    /// Population per unit volume of the sphere reaching the farthest cell.
    pub density: f64,
    /// Live cells whose 27-cell neighborhood contains only themselves.
    pub cells_sum_eq_one: u64,
    pub std_neighbor_sum: f64,
}

impl GenerationRecord {
    /// Derive the record for `lattice`, given its neighborhood-sum field.
    pub fn measure(generation: u32, lattice: &Lattice, sums: &[u8]) -> Self {
        debug_assert_eq!(sums.len(), lattice.volume());
        let c = lattice.center() as f64;
        let mut total = 0u64;
        let mut sum_total = 0u64;
        let mut max_sum = u8::MIN;
        let mut min_sum = u8::MAX;
        let mut eq_one = 0u64;
        let mut max_dist_sq = 0.0f64;

        for (idx, (&cell, &s)) in lattice.cells().iter().zip(sums).enumerate() {
            if cell == 0 {
                continue;
            }
            total += 1;
            sum_total += u64::from(s);
            max_sum = max_sum.max(s);
            min_sum = min_sum.min(s);
            if s == 1 {
                eq_one += 1;
            }
            let (x, y, z) = lattice.coords(idx);
            let (dx, dy, dz) = (x as f64 - c, y as f64 - c, z as f64 - c);
            max_dist_sq = max_dist_sq.max(dx * dx + dy * dy + dz * dz);
        }

        if total == 0 {
            return Self {
                generation,
                ..Self::default()
            };
        }

        let n = total as f64;
        let mean = sum_total as f64 / n;
        // Second pass keeps the variance numerically stable.
        let variance = lattice
            .cells()
            .iter()
            .zip(sums)
            .filter(|(cell, _)| **cell == 1)
            .map(|(_, &s)| (f64::from(s) - mean).powi(2))
            .sum::<f64>()
            / n;

        let max_dist = max_dist_sq.sqrt();
        let volume = if max_dist > 0.0 {
            4.0 / 3.0 * PI * max_dist.powi(3)
        } else {
            1.0
        };

        Self {
            generation,
            total_cells: total,
            mean_neighbor_sum: mean,
            max_neighbor_sum: max_sum,
            min_neighbor_sum: min_sum,
            max_distance_from_center: max_dist,
            density: n / volume,
            cells_sum_eq_one: eq_one,
            std_neighbor_sum: variance.sqrt(),
        }
    }
}

/// The per-generation statistics of one rule, in generation order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSeries {
    pub rule: u8,
    /// Side length of the lattice the rule was simulated on.
    pub size: usize,
    pub records: Vec<GenerationRecord>,
}

impl RuleSeries {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of cells in the simulated lattice, `size^3`.
    pub fn grid_volume(&self) -> u64 {
        (self.size as u64).pow(3)
    }

    pub fn populations(&self) -> Vec<u64> {
        self.records.iter().map(|r| r.total_cells).collect()
    }

    pub fn final_population(&self) -> u64 {
        self.records.last().map_or(0, |r| r.total_cells)
    }

    pub fn max_population(&self) -> u64 {
        self.records.iter().map(|r| r.total_cells).max().unwrap_or(0)
    }

    pub fn min_population(&self) -> u64 {
        self.records.iter().map(|r| r.total_cells).min().unwrap_or(0)
    }

    pub fn final_extent(&self) -> f64 {
        self.records.last().map_or(0.0, |r| r.max_distance_from_center)
    }

    pub fn max_extent(&self) -> f64 {
        self.records
            .iter()
            .map(|r| r.max_distance_from_center)
            .fold(0.0, f64::max)
    }

    /// The last `n` records (all of them if the series is shorter).
    pub fn tail(&self, n: usize) -> &[GenerationRecord] {
        let start = self.records.len().saturating_sub(n);
        &self.records[start..]
    }
}

// ── File I/O ────────────────────────────────────────────────────────────────

const SERIES_HEADER: &str = "generation,total_cells,mean_neighbor_sum,max_neighbor_sum,min_neighbor_sum,max_distance_from_center,density,cells_sum_eq_one,std_neighbor_sum";

/// Write every generation of a series as CSV.
pub fn write_series(path: &Path, series: &RuleSeries) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut f = BufWriter::new(fs::File::create(path)?);
    writeln!(f, "{SERIES_HEADER}")?;
    for r in &series.records {
        writeln!(
            f,
            "{},{},{},{},{},{},{},{},{}",
            r.generation,
            r.total_cells,
            r.mean_neighbor_sum,
            r.max_neighbor_sum,
            r.min_neighbor_sum,
            r.max_distance_from_center,
            r.density,
            r.cells_sum_eq_one,
            r.std_neighbor_sum,
        )?;
    }
    f.flush()?;
    log::info!("Wrote {} generations of rule {} to {}", series.len(), series.rule, path.display());
    Ok(())
}

/// Simulate `rule_number` from a single seed for `generations` steps on a
/// lattice of side `size`, recording statistics after every step.
pub fn collect(size: usize, generations: u32, rule_number: i64) -> Result<RuleSeries> {
    let rule = Rule::encode(rule_number)?;
    if generations == 0 {
        return Err(Error::InvalidGenerations);
    }
    let mut sim = Simulation::new(Lattice::seeded(size)?, rule);
    let mut records = Vec::with_capacity(generations as usize);

    while sim.generation < generations {
        sim.step();
        // Metrics describe the post-update state, so the sums are recomputed.
        let sums = neighbor_sums(sim.lattice());
        let record = GenerationRecord::measure(sim.generation, sim.lattice(), &sums);
        if record.generation % 10 == 0 {
            log::debug!(
                "{} gen {}: pop={} extent={:.2}",
                rule.label(),
                record.generation,
                record.total_cells,
                record.max_distance_from_center
            );
        }
        records.push(record);
    }

    Ok(RuleSeries {
        rule: rule.number(),
        size,
        records,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rule_zero_extinct_from_first_generation() {
        let series = collect(51, 10, 0).unwrap();
        assert_eq!(series.len(), 10);
        assert_eq!(series.records[0].total_cells, 0);
        assert!(series.records.iter().all(|r| r.total_cells == 0));
        assert_eq!(series.records[0], GenerationRecord { generation: 1, ..Default::default() });
    }

    #[test]
    fn test_generation_indices_are_one_based() {
        let series = collect(7, 5, 54).unwrap();
        let gens: Vec<u32> = series.records.iter().map(|r| r.generation).collect();
        assert_eq!(gens, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_rule_two_first_generation_cube() {
        // Sum 1 is live: generation 1 is the 3×3×3 cube around the seed,
        // measured on its own post-update sums.
        let series = collect(9, 1, 2).unwrap();
        let r = series.records[0];
        assert_eq!(r.total_cells, 27);
        assert_eq!(r.max_neighbor_sum, 27);
        assert_eq!(r.min_neighbor_sum, 8);
        assert_eq!(r.cells_sum_eq_one, 0);
        assert_relative_eq!(r.max_distance_from_center, 3f64.sqrt(), epsilon = 1e-12);
        let volume = 4.0 / 3.0 * PI * 3f64.sqrt().powi(3);
        assert_relative_eq!(r.density, 27.0 / volume, epsilon = 1e-12);
        // Corners 8, edges 12, faces 18, center 27.
        let mean = (8.0 * 8.0 + 12.0 * 12.0 + 6.0 * 18.0 + 27.0) / 27.0;
        assert_relative_eq!(r.mean_neighbor_sum, mean, epsilon = 1e-12);
    }

    #[test]
    fn test_density_uses_unit_divisor_for_center_only() {
        let lattice = Lattice::seeded(5).unwrap();
        let sums = neighbor_sums(&lattice);
        let r = GenerationRecord::measure(1, &lattice, &sums);
        assert_eq!(r.total_cells, 1);
        assert_eq!(r.max_distance_from_center, 0.0);
        assert_relative_eq!(r.density, r.total_cells as f64);
        assert_eq!(r.cells_sum_eq_one, 1);
        assert_eq!(r.std_neighbor_sum, 0.0);
    }

    #[test]
    fn test_collect_is_deterministic() {
        let a = collect(11, 12, 54).unwrap();
        let b = collect(11, 12, 54).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_population_bounded_by_volume() {
        for rule in [1i64, 3, 54, 126, 255] {
            let series = collect(7, 8, rule).unwrap();
            assert!(series.records.iter().all(|r| r.total_cells <= 343));
        }
    }

    #[test]
    fn test_collect_rejects_bad_config() {
        assert!(matches!(collect(51, 10, 256), Err(Error::RuleOutOfRange(256))));
        assert!(matches!(collect(51, 10, -1), Err(Error::RuleOutOfRange(-1))));
        assert!(matches!(collect(50, 10, 54), Err(Error::InvalidLatticeSize(50))));
        assert!(matches!(collect(0, 10, 54), Err(Error::InvalidLatticeSize(0))));
        assert!(matches!(collect(51, 0, 54), Err(Error::InvalidGenerations)));
    }

    #[test]
    fn test_series_accessors() {
        let series = collect(9, 4, 2).unwrap();
        assert_eq!(series.grid_volume(), 729);
        assert_eq!(series.populations().len(), 4);
        assert_eq!(series.final_population(), series.records[3].total_cells);
        assert!(series.max_population() >= series.min_population());
        assert_eq!(series.tail(2).len(), 2);
        assert_eq!(series.tail(20).len(), 4);
        assert!(series.max_extent() >= series.final_extent());
    }

    #[test]
    fn test_write_series_one_row_per_generation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("series").join("rule_2.csv");
        let series = collect(9, 3, 2).unwrap();
        write_series(&path, &series).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], SERIES_HEADER);
        // Generation 1 of rule 2 is the full 3×3×3 block around the seed.
        let first: Vec<&str> = lines[1].split(',').collect();
        assert_eq!(first.len(), 9);
        assert_eq!(first[0], "1");
        assert_eq!(first[1], "27");
        assert_eq!(first[1].parse::<u64>().unwrap(), series.records[0].total_cells);
        assert_eq!(first[3], "27");
        assert_eq!(first[4], "8");
    }
}
