use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::io::{BufRead, BufWriter, Write};
use std::path::Path;

use crate::error::{Error, Result};
use crate::stats::RuleSeries;

/// Number of trailing generations the tail statistics are computed over.
pub const TAIL_WINDOW: usize = 20;

/// Spatial extent beyond which a pattern is considered to reach the boundary.
pub const BOUNDARY_EXTENT: f64 = 40.0;

// ── Behavior classification ─────────────────────────────────────────────────

/// Qualitative long-run behavior of a rule grown from a single seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BehaviorClass {
    /// Falls through every test.
    Unclassified,
    /// Dies out within the first five generations.
    ImmediateExtinction,
    /// Dies out after surviving at least five generations.
    DelayedExtinction,
    /// Alternates between an empty and a nearly full lattice.
    ExtinctionBlink,
    /// Alternates between a sparse and a nearly full lattice.
    SparseFullBlink,
    /// Small pattern with a near-periodic population.
    StaticPeriodic,
    /// Large pattern with a near-periodic, non-expanding population.
    StableOscillator,
    /// Near-periodic population that keeps growing.
    ExpandingOscillator,
    /// Large, highly irregular neighborhood structure.
    ChaoticTurbulent,
    /// Structured pattern that reaches the lattice boundary.
    StructuredExpander,
    /// Structured pattern contained away from the boundary.
    StructuredBounded,
    /// Irregular structure whose irregularity no longer changes.
    ComplexStable,
    /// Large, regular growth.
    SimpleGrowth,
}

impl BehaviorClass {
    /// All behavior classes in code order.
    pub fn all() -> &'static [BehaviorClass] {
        &[
            BehaviorClass::Unclassified,
            BehaviorClass::ImmediateExtinction,
            BehaviorClass::DelayedExtinction,
            BehaviorClass::ExtinctionBlink,
            BehaviorClass::SparseFullBlink,
            BehaviorClass::StaticPeriodic,
            BehaviorClass::StableOscillator,
            BehaviorClass::ExpandingOscillator,
            BehaviorClass::ChaoticTurbulent,
            BehaviorClass::StructuredExpander,
            BehaviorClass::StructuredBounded,
            BehaviorClass::ComplexStable,
            BehaviorClass::SimpleGrowth,
        ]
    }

    /// Short class code. Static and stable oscillators share `2C`.
    pub fn code(&self) -> &'static str {
        match self {
            BehaviorClass::Unclassified => "0",
            BehaviorClass::ImmediateExtinction => "1A",
            BehaviorClass::DelayedExtinction => "1B",
            BehaviorClass::ExtinctionBlink => "2A",
            BehaviorClass::SparseFullBlink => "2B",
            BehaviorClass::StaticPeriodic => "2C",
            BehaviorClass::StableOscillator => "2C",
            BehaviorClass::ExpandingOscillator => "2D",
            BehaviorClass::ChaoticTurbulent => "3",
            BehaviorClass::StructuredExpander => "4A",
            BehaviorClass::StructuredBounded => "4B",
            BehaviorClass::ComplexStable => "5",
            BehaviorClass::SimpleGrowth => "6",
        }
    }

    /// Full class name, e.g. `Class 1A: Immediate Extinction`.
    pub fn name(&self) -> &'static str {
        match self {
            BehaviorClass::Unclassified => "Class 0: Unclassified",
            BehaviorClass::ImmediateExtinction => "Class 1A: Immediate Extinction",
            BehaviorClass::DelayedExtinction => "Class 1B: Delayed Extinction",
            BehaviorClass::ExtinctionBlink => "Class 2A: Extinction Blink (0↔Full)",
            BehaviorClass::SparseFullBlink => "Class 2B: Sparse-Full Blink (N↔Full)",
            BehaviorClass::StaticPeriodic => "Class 2C: Static/Local Periodic",
            BehaviorClass::StableOscillator => "Class 2C: Stable Oscillator",
            BehaviorClass::ExpandingOscillator => "Class 2D: Expanding Oscillator",
            BehaviorClass::ChaoticTurbulent => "Class 3: Chaotic Turbulent",
            BehaviorClass::StructuredExpander => "Class 4A: Structured Expander (Boundary)",
            BehaviorClass::StructuredBounded => "Class 4B: Structured Bounded",
            BehaviorClass::ComplexStable => "Class 5: Complex Stable",
            BehaviorClass::SimpleGrowth => "Class 6: Simple Growth",
        }
    }

    /// Parse from the full class name.
    pub fn from_name(s: &str) -> Option<BehaviorClass> {
        BehaviorClass::all().iter().copied().find(|c| c.name() == s)
    }
}

impl fmt::Display for BehaviorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── Tail statistics ─────────────────────────────────────────────────────────

fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Population standard deviation (divisor `n`).
fn std_dev(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let m = mean(data);
    (data.iter().map(|&x| (x - m).powi(2)).sum::<f64>() / data.len() as f64).sqrt()
}

/// Summary of the last [`TAIL_WINDOW`] generations of a series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TailStats {
    /// Mean neighborhood-sum standard deviation; zero for extinct series.
    pub mean_variance: f64,
    /// Spread of the neighborhood-sum standard deviation.
    pub variance_trend: f64,
    /// Mean density; zero for extinct series.
    pub mean_density: f64,
    /// Distinct population values.
    pub unique_pops: usize,
}

impl TailStats {
    pub fn of(series: &RuleSeries) -> Self {
        let tail = series.tail(TAIL_WINDOW);
        let stds: Vec<f64> = tail.iter().map(|r| r.std_neighbor_sum).collect();
        let densities: Vec<f64> = tail.iter().map(|r| r.density).collect();
        let extinct = series.final_population() == 0;
        let unique_pops = tail.iter().map(|r| r.total_cells).collect::<HashSet<_>>().len();

        Self {
            mean_variance: if extinct { 0.0 } else { mean(&stds) },
            variance_trend: std_dev(&stds),
            mean_density: if extinct { 0.0 } else { mean(&densities) },
            unique_pops,
        }
    }
}

/// Classify a rule's series. `grid_volume` is the cell count of the lattice
/// the series was simulated on.
///
/// The tests run as a priority cascade; the first match wins and some
/// combinations are deliberately left unclassified.
pub fn classify(series: &RuleSeries, grid_volume: u64) -> BehaviorClass {
    let pops = series.populations();
    let final_pop = series.final_population();
    let max_pop = series.max_population();
    let min_pop = series.min_population();
    let final_extent = series.final_extent();
    let tail = TailStats::of(series);
    let mean_variance = tail.mean_variance;
    let variance_trend = tail.variance_trend;

    let min_pop_after_growth = if pops.len() > TAIL_WINDOW {
        pops[TAIL_WINDOW..].iter().copied().min().unwrap_or(min_pop)
    } else {
        min_pop
    };

    // Extinction.
    if final_pop == 0 {
        let extinct_gen = pops.iter().position(|&p| p == 0).unwrap_or(pops.len());
        if extinct_gen < 5 {
            return BehaviorClass::ImmediateExtinction;
        }
        return BehaviorClass::DelayedExtinction;
    }

    // Blinkers that fill most of the lattice at some point.
    if max_pop as f64 > 0.7 * grid_volume as f64 {
        if min_pop_after_growth == 0 {
            return BehaviorClass::ExtinctionBlink;
        }
        if min_pop_after_growth > 0 && min_pop_after_growth < 1000 {
            return BehaviorClass::SparseFullBlink;
        }
    }

    // Near-periodic tail.
    if tail.unique_pops < 10 && mean_variance < 0.5 {
        if max_pop < 5000 {
            return BehaviorClass::StaticPeriodic;
        }
        if pops.len() > 2 * TAIL_WINDOW {
            let early: Vec<f64> = pops[10..20].iter().map(|&p| p as f64).collect();
            let late: Vec<f64> = pops[pops.len() - TAIL_WINDOW..]
                .iter()
                .map(|&p| p as f64)
                .collect();
            if mean(&late) > mean(&early) * 2.0 {
                return BehaviorClass::ExpandingOscillator;
            }
        }
        return BehaviorClass::StableOscillator;
    }

    if mean_variance > 2.0 && max_pop > 20000 && variance_trend > 0.1 {
        return BehaviorClass::ChaoticTurbulent;
    }

    if 1.3 < mean_variance && mean_variance <= 2.0 && final_pop > 10000 {
        if final_extent > BOUNDARY_EXTENT {
            return BehaviorClass::StructuredExpander;
        }
        return BehaviorClass::StructuredBounded;
    }

    if mean_variance >= 1.8 && variance_trend < 0.1 {
        return BehaviorClass::ComplexStable;
    }

    if final_pop > 1000 && mean_variance < 1.3 {
        return BehaviorClass::SimpleGrowth;
    }

    BehaviorClass::Unclassified
}

// ── Batch classification ────────────────────────────────────────────────────

/// One row of the classification table.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedRule {
    pub rule: u8,
    pub behavior: BehaviorClass,
    pub final_population: u64,
    pub max_population: u64,
    pub min_population: u64,
    pub final_extent: f64,
    pub mean_variance: f64,
    pub mean_density: f64,
}

impl ClassifiedRule {
    /// Classify one series against the volume of its own lattice.
    pub fn from_series(series: &RuleSeries) -> Self {
        let tail = TailStats::of(series);
        Self {
            rule: series.rule,
            behavior: classify(series, series.grid_volume()),
            final_population: series.final_population(),
            max_population: series.max_population(),
            min_population: series.min_population(),
            final_extent: series.final_extent(),
            mean_variance: tail.mean_variance,
            mean_density: tail.mean_density,
        }
    }

    pub fn code(&self) -> &'static str {
        self.behavior.code()
    }

    pub fn name(&self) -> &'static str {
        self.behavior.name()
    }
}

/// Classify every series, ordered by rule number.
pub fn classify_all(series: &[RuleSeries]) -> Vec<ClassifiedRule> {
    let mut out: Vec<ClassifiedRule> = series
        .iter()
        .filter(|s| {
            if s.is_empty() {
                log::warn!("Rule {} has no recorded generations, skipping", s.rule);
            }
            !s.is_empty()
        })
        .map(ClassifiedRule::from_series)
        .collect();
    out.sort_by_key(|r| r.rule);
    out
}

// ── File I/O ────────────────────────────────────────────────────────────────

const TABLE_HEADER: &str = "rule,class_code,class_name,final_population,max_population,min_population,final_extent,mean_variance,mean_density";

/// Write the classification table as CSV.
pub fn write_table(path: &Path, records: &[ClassifiedRule]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut f = BufWriter::new(fs::File::create(path)?);
    writeln!(f, "{TABLE_HEADER}")?;
    for r in records {
        writeln!(
            f,
            "{},{},{},{},{},{},{},{},{}",
            r.rule,
            r.code(),
            r.name(),
            r.final_population,
            r.max_population,
            r.min_population,
            r.final_extent,
            r.mean_variance,
            r.mean_density,
        )?;
    }
    f.flush()?;
    Ok(())
}

/// Load a classification table written by [`write_table`]. Malformed lines
/// are logged and skipped.
pub fn load_table(path: &Path) -> Result<Vec<ClassifiedRule>> {
    let file = fs::File::open(path)?;
    let mut out = Vec::new();
    for (i, line) in std::io::BufReader::new(file).lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line == TABLE_HEADER {
            continue;
        }
        match parse_table_line(i + 1, line) {
            Ok(record) => out.push(record),
            Err(e) => log::warn!("Skipping table row: {e}"),
        }
    }
    Ok(out)
}

fn parse_table_line(line_no: usize, line: &str) -> Result<ClassifiedRule> {
    let bad = |reason: String| Error::Parse {
        line: line_no,
        reason,
    };
    let parts: Vec<&str> = line.split(',').collect();
    if parts.len() != 9 {
        return Err(bad(format!("expected 9 fields, found {}", parts.len())));
    }

    let behavior = BehaviorClass::from_name(parts[2])
        .ok_or_else(|| bad(format!("unknown class name {:?}", parts[2])))?;
    if behavior.code() != parts[1] {
        return Err(bad(format!("class code {:?} does not match {:?}", parts[1], parts[2])));
    }

    fn field<T: std::str::FromStr>(s: &str) -> std::result::Result<T, String> {
        s.parse().map_err(|_| format!("invalid number {s:?}"))
    }

    Ok(ClassifiedRule {
        rule: field(parts[0]).map_err(bad)?,
        behavior,
        final_population: field(parts[3]).map_err(bad)?,
        max_population: field(parts[4]).map_err(bad)?,
        min_population: field(parts[5]).map_err(bad)?,
        final_extent: field(parts[6]).map_err(bad)?,
        mean_variance: field(parts[7]).map_err(bad)?,
        mean_density: field(parts[8]).map_err(bad)?,
    })
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::{collect, GenerationRecord};
    use approx::assert_relative_eq;

    const VOLUME_51: u64 = 51 * 51 * 51;

    /// Build a series from (population, std, extent) triples.
    fn series_from(points: &[(u64, f64, f64)]) -> RuleSeries {
        let records = points
            .iter()
            .enumerate()
            .map(|(i, &(pop, std, extent))| GenerationRecord {
                generation: i as u32 + 1,
                total_cells: pop,
                std_neighbor_sum: std,
                max_distance_from_center: extent,
                density: if pop > 0 { 0.5 } else { 0.0 },
                ..GenerationRecord::default()
            })
            .collect();
        RuleSeries {
            rule: 0,
            size: 51,
            records,
        }
    }

    fn constant(len: usize, pop: u64, std: f64, extent: f64) -> RuleSeries {
        series_from(&vec![(pop, std, extent); len])
    }

    /// Distinct populations every generation with a fixed std value.
    fn ramp(len: usize, start: u64, std: f64, extent: f64) -> RuleSeries {
        let points: Vec<_> = (0..len).map(|i| (start + i as u64 * 7, std, extent)).collect();
        series_from(&points)
    }

    // ── Extinction ──

    #[test]
    fn rule_zero_is_immediate_extinction() {
        let series = collect(51, 30, 0).unwrap();
        let class = classify(&series, series.grid_volume());
        assert_eq!(
            (class.name(), class.code()),
            ("Class 1A: Immediate Extinction", "1A")
        );
    }

    #[test]
    fn late_death_is_delayed_extinction() {
        let mut points = vec![(10u64, 0.5, 2.0); 6];
        points.extend(vec![(0u64, 0.0, 0.0); 4]);
        assert_eq!(classify(&series_from(&points), VOLUME_51), BehaviorClass::DelayedExtinction);

        let mut points = vec![(10u64, 0.5, 2.0); 4];
        points.extend(vec![(0u64, 0.0, 0.0); 6]);
        assert_eq!(classify(&series_from(&points), VOLUME_51), BehaviorClass::ImmediateExtinction);
    }

    // ── Blinkers ──

    #[test]
    fn full_and_empty_is_extinction_blink() {
        let full = VOLUME_51 * 9 / 10;
        let points: Vec<_> = (0..40)
            .map(|i| if i % 2 == 0 { (full, 1.0, 40.0) } else { (0, 0.0, 0.0) })
            .collect();
        // Ends on a full generation so the series is not extinct.
        let mut points = points;
        points.push((full, 1.0, 40.0));
        assert_eq!(classify(&series_from(&points), VOLUME_51), BehaviorClass::ExtinctionBlink);
    }

    #[test]
    fn full_and_sparse_is_sparse_full_blink() {
        let full = VOLUME_51 * 9 / 10;
        let points: Vec<_> = (0..41)
            .map(|i| if i % 2 == 0 { (full, 1.0, 40.0) } else { (27, 0.0, 1.7) })
            .collect();
        assert_eq!(classify(&series_from(&points), VOLUME_51), BehaviorClass::SparseFullBlink);
    }

    #[test]
    fn grid_volume_is_a_parameter() {
        // 25 000 cells fills a 31³ lattice but not a 51³ one.
        let points: Vec<_> = (0..41)
            .map(|i| if i % 2 == 0 { (25_000, 1.0, 20.0) } else { (0, 0.0, 0.0) })
            .collect();
        let series = series_from(&points);
        assert_eq!(classify(&series, 31 * 31 * 31), BehaviorClass::ExtinctionBlink);
        assert_ne!(classify(&series, VOLUME_51), BehaviorClass::ExtinctionBlink);
    }

    // ── Periodic ──

    #[test]
    fn small_constant_is_static_periodic() {
        let series = constant(60, 27, 0.0, 1.7);
        assert_eq!(classify(&series, VOLUME_51), BehaviorClass::StaticPeriodic);
    }

    #[test]
    fn large_constant_is_stable_oscillator() {
        let series = constant(60, 8000, 0.2, 20.0);
        let class = classify(&series, VOLUME_51);
        assert_eq!(class, BehaviorClass::StableOscillator);
        assert_eq!(class.code(), "2C");
    }

    #[test]
    fn short_large_series_is_stable_oscillator() {
        let series = constant(30, 8000, 0.2, 20.0);
        assert_eq!(classify(&series, VOLUME_51), BehaviorClass::StableOscillator);
    }

    #[test]
    fn growing_periodic_tail_is_expanding_oscillator() {
        let mut points = vec![(1000u64, 0.2, 5.0); 30];
        points.extend(vec![(9000u64, 0.2, 25.0); 30]);
        assert_eq!(classify(&series_from(&points), VOLUME_51), BehaviorClass::ExpandingOscillator);
    }

    #[test]
    fn periodic_with_high_variance_falls_through() {
        // Low-cardinality tail but mean variance too high for class 2.
        let series = constant(60, 2000, 1.0, 10.0);
        assert_eq!(classify(&series, VOLUME_51), BehaviorClass::SimpleGrowth);
    }

    // ── Chaotic / structured / stable ──

    #[test]
    fn turbulent_variance_is_chaotic() {
        let points: Vec<_> = (0..60)
            .map(|i| (30_000 + i as u64 * 11, if i % 2 == 0 { 2.5 } else { 2.9 }, 30.0))
            .collect();
        assert_eq!(classify(&series_from(&points), VOLUME_51), BehaviorClass::ChaoticTurbulent);
    }

    #[test]
    fn structured_classes_split_on_extent() {
        let expander = ramp(60, 15_000, 1.5, 42.0);
        assert_eq!(classify(&expander, VOLUME_51), BehaviorClass::StructuredExpander);
        let bounded = ramp(60, 15_000, 1.5, 30.0);
        assert_eq!(classify(&bounded, VOLUME_51), BehaviorClass::StructuredBounded);
        // Exactly 40 is not beyond the boundary.
        let edge = ramp(60, 15_000, 1.5, 40.0);
        assert_eq!(classify(&edge, VOLUME_51), BehaviorClass::StructuredBounded);
    }

    #[test]
    fn steady_high_variance_is_complex_stable() {
        // Population too small for classes 3 and 4.
        let series = ramp(60, 500, 2.4, 15.0);
        assert_eq!(classify(&series, VOLUME_51), BehaviorClass::ComplexStable);
    }

    #[test]
    fn regular_growth_is_simple_growth() {
        let series = ramp(60, 2000, 0.9, 15.0);
        assert_eq!(classify(&series, VOLUME_51), BehaviorClass::SimpleGrowth);
    }

    #[test]
    fn small_irregular_pattern_is_unclassified() {
        let series = ramp(60, 100, 0.9, 5.0);
        assert_eq!(classify(&series, VOLUME_51), BehaviorClass::Unclassified);
    }

    // ── Cascade edges ──

    #[test]
    fn extinction_at_generation_five_is_delayed() {
        let mut points = vec![(10u64, 0.5, 2.0); 5];
        points.extend(vec![(0u64, 0.0, 0.0); 5]);
        assert_eq!(classify(&series_from(&points), VOLUME_51), BehaviorClass::DelayedExtinction);
    }

    #[test]
    fn blink_with_dense_low_phase_falls_through() {
        let full = VOLUME_51 * 9 / 10;
        let blink = |low: u64| -> RuleSeries {
            let points: Vec<_> = (0..41)
                .map(|i| if i % 2 == 0 { (full, 0.2, 40.0) } else { (low, 0.2, 20.0) })
                .collect();
            series_from(&points)
        };
        assert_eq!(classify(&blink(999), VOLUME_51), BehaviorClass::SparseFullBlink);
        assert_eq!(classify(&blink(1000), VOLUME_51), BehaviorClass::StableOscillator);
    }

    #[test]
    fn short_series_uses_overall_minimum_for_blinks() {
        let full = VOLUME_51 * 9 / 10;
        let with_len = |len: usize| -> RuleSeries {
            let mut points = vec![(0u64, 0.0, 0.0)];
            points.extend(vec![(full, 1.0, 40.0); len - 1]);
            series_from(&points)
        };
        // Twenty generations: the early zero still counts.
        assert_eq!(classify(&with_len(20), VOLUME_51), BehaviorClass::ExtinctionBlink);
        // Longer series only look past generation 20.
        assert_eq!(classify(&with_len(22), VOLUME_51), BehaviorClass::SimpleGrowth);
    }

    #[test]
    fn periodic_split_at_five_thousand() {
        assert_eq!(
            classify(&constant(60, 4999, 0.2, 20.0), VOLUME_51),
            BehaviorClass::StaticPeriodic
        );
        assert_eq!(
            classify(&constant(60, 5000, 0.2, 20.0), VOLUME_51),
            BehaviorClass::StableOscillator
        );
    }

    #[test]
    fn half_variance_leaves_periodic_classes() {
        assert_eq!(classify(&constant(60, 2000, 0.25, 10.0), VOLUME_51), BehaviorClass::StaticPeriodic);
        assert_eq!(classify(&constant(60, 2000, 0.5, 10.0), VOLUME_51), BehaviorClass::SimpleGrowth);
    }

    #[test]
    fn structured_lower_bound_is_exclusive() {
        // Single-generation series so the tail mean is the value itself.
        let one = |pop: u64, std: f64| series_from(&[(pop, std, 30.0)]);
        assert_eq!(classify(&one(15_000, 1.3), VOLUME_51), BehaviorClass::Unclassified);
        assert_eq!(classify(&one(15_000, 1.31), VOLUME_51), BehaviorClass::StructuredBounded);
    }

    #[test]
    fn structured_upper_bound_is_inclusive() {
        assert_eq!(classify(&ramp(60, 15_000, 2.0, 30.0), VOLUME_51), BehaviorClass::StructuredBounded);
        // Above 2.0 with a flat trend skips classes 3 and 4.
        assert_eq!(classify(&ramp(60, 15_000, 2.5, 30.0), VOLUME_51), BehaviorClass::ComplexStable);
    }

    #[test]
    fn complex_stable_bound_is_inclusive() {
        let one = |std: f64| series_from(&[(500, std, 10.0)]);
        assert_eq!(classify(&one(1.8), VOLUME_51), BehaviorClass::ComplexStable);
        assert_eq!(classify(&one(1.79), VOLUME_51), BehaviorClass::Unclassified);
    }

    #[test]
    fn classify_is_pure() {
        let series = collect(15, 25, 54).unwrap();
        let a = classify(&series, series.grid_volume());
        let b = classify(&series, series.grid_volume());
        assert_eq!(a, b);
    }

    // ── Tail statistics ──

    #[test]
    fn tail_stats_use_last_twenty() {
        let mut points = vec![(5u64, 9.0, 1.0); 10];
        points.extend((0..20).map(|i| (100 + i as u64, if i % 2 == 0 { 1.0 } else { 3.0 }, 4.0)));
        let tail = TailStats::of(&series_from(&points));
        assert_relative_eq!(tail.mean_variance, 2.0);
        assert_relative_eq!(tail.variance_trend, 1.0);
        assert_relative_eq!(tail.mean_density, 0.5);
        assert_eq!(tail.unique_pops, 20);
    }

    #[test]
    fn tail_stats_zero_for_extinct() {
        let mut points = vec![(5u64, 1.0, 1.0); 10];
        points.push((0, 0.0, 0.0));
        let tail = TailStats::of(&series_from(&points));
        assert_eq!(tail.mean_variance, 0.0);
        assert_eq!(tail.mean_density, 0.0);
    }

    // ── Batch ──

    #[test]
    fn classify_all_orders_by_rule() {
        let mut a = constant(25, 27, 0.0, 1.7);
        a.rule = 9;
        let mut b = constant(25, 0, 0.0, 0.0);
        b.rule = 3;
        let table = classify_all(&[a, b]);
        assert_eq!(table.len(), 2);
        assert_eq!(table[0].rule, 3);
        assert_eq!(table[0].code(), "1A");
        assert_eq!(table[1].rule, 9);
        assert_eq!(table[1].code(), "2C");
        assert_eq!(table[1].final_population, 27);
        assert_relative_eq!(table[1].mean_density, 0.5);
    }

    #[test]
    fn classify_all_skips_empty_series() {
        let mut empty = constant(25, 0, 0.0, 0.0);
        empty.records.clear();
        let table = classify_all(&[empty, constant(25, 27, 0.0, 1.7)]);
        assert_eq!(table.len(), 1);
        assert_eq!(table[0].final_population, 27);
    }

    // ── Behavior class ──

    #[test]
    fn behavior_class_name_roundtrip() {
        for &class in BehaviorClass::all() {
            assert_eq!(BehaviorClass::from_name(class.name()), Some(class));
            assert!(class.name().contains(class.code()));
            assert!(!class.name().contains(','));
        }
    }

    #[test]
    fn behavior_class_from_name_invalid() {
        assert_eq!(BehaviorClass::from_name("nonsense"), None);
    }

    // ── File I/O ──

    #[test]
    fn table_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("classification.csv");
        let records = vec![
            ClassifiedRule {
                rule: 0,
                behavior: BehaviorClass::ImmediateExtinction,
                final_population: 0,
                max_population: 0,
                min_population: 0,
                final_extent: 0.0,
                mean_variance: 0.0,
                mean_density: 0.0,
            },
            ClassifiedRule {
                rule: 54,
                behavior: BehaviorClass::SparseFullBlink,
                final_population: 12_345,
                max_population: 99_000,
                min_population: 27,
                final_extent: 34.641_016_151_377_55,
                mean_variance: 1.234_567_890_123,
                mean_density: 0.071_234,
            },
        ];
        write_table(&path, &records).unwrap();
        let loaded = load_table(&path).unwrap();
        assert_eq!(loaded, records);
    }

    #[test]
    fn load_table_skips_malformed_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("classification.csv");
        let text = format!(
            "{TABLE_HEADER}\n\
             1,1A,Class 1A: Immediate Extinction,0,0,0,0,0,0\n\
             2,9Z,Class 9Z: Nothing,0,0,0,0,0,0\n\
             3,1A,Class 1A: Immediate Extinction,zero,0,0,0,0,0\n\
             4,2C,Class 2C: Stable Oscillator\n"
        );
        fs::write(&path, text).unwrap();
        let loaded = load_table(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].rule, 1);
    }

    #[test]
    fn parse_error_reports_line() {
        let err = parse_table_line(7, "1,2,3").unwrap_err();
        assert!(matches!(err, Error::Parse { line: 7, .. }));
    }
}
