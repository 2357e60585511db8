use std::collections::BTreeMap;
use std::fmt::Write;

use crate::classify::{ClassifiedRule, TailStats, BOUNDARY_EXTENT};
use crate::stats::RuleSeries;

/// Rules listed in full per class before the list is truncated.
const MAX_LISTED_RULES: usize = 15;

/// Rules shown in the "most interesting" section.
const MAX_INTERESTING: usize = 20;

/// Generations between rows of a single rule's table.
const SERIES_STRIDE: u32 = 10;

const RULE_LINE: &str = "================================================================================";

/// Format an integer with thousands separators.
fn grouped(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Sustained, irregular rules ordered by descending mean variance.
pub fn interesting(records: &[ClassifiedRule], limit: usize) -> Vec<&ClassifiedRule> {
    let mut picked: Vec<&ClassifiedRule> = records
        .iter()
        .filter(|r| r.final_population > 1000 && r.mean_variance > 0.5)
        .collect();
    picked.sort_by(|a, b| b.mean_variance.total_cmp(&a.mean_variance));
    picked.truncate(limit);
    picked
}

/// Plain-text report over a classification table.
pub fn render(records: &[ClassifiedRule]) -> String {
    let mut by_code: BTreeMap<&str, Vec<&ClassifiedRule>> = BTreeMap::new();
    for r in records {
        by_code.entry(r.code()).or_default().push(r);
    }

    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = writeln!(out, "\n{RULE_LINE}");
    let _ = writeln!(out, "CLASSIFICATION REPORT - {} 3D Totalistic CA Rules", records.len());
    let _ = writeln!(out, "{RULE_LINE}\n");

    let _ = writeln!(out, "OVERALL STATISTICS:");
    let _ = writeln!(out, "Total rules analyzed: {}", records.len());
    let _ = writeln!(out, "Unique classes found: {}", by_code.len());
    let _ = writeln!(
        out,
        "Rules with sustained growth: {}",
        records.iter().filter(|r| r.final_population > 0).count()
    );
    let _ = writeln!(
        out,
        "Rules reaching boundary: {}\n",
        records.iter().filter(|r| r.final_extent > BOUNDARY_EXTENT).count()
    );

    let _ = writeln!(out, "CLASS BREAKDOWN:");
    for (code, members) in &by_code {
        let Some(first) = members.first() else {
            continue;
        };
        let _ = writeln!(out, "\n{code}: {} - {} rules", first.name(), members.len());

        let mut rules: Vec<u8> = members.iter().map(|r| r.rule).collect();
        rules.sort_unstable();
        if rules.len() <= MAX_LISTED_RULES {
            let _ = writeln!(out, "  Rules: {rules:?}");
        } else {
            let _ = writeln!(out, "  First {MAX_LISTED_RULES}: {:?}", &rules[..MAX_LISTED_RULES]);
            let _ = writeln!(out, "  ... and {} more", rules.len() - MAX_LISTED_RULES);
        }

        let n = members.len() as f64;
        let avg_pop = members.iter().map(|r| r.final_population as f64).sum::<f64>() / n;
        let avg_var = members.iter().map(|r| r.mean_variance).sum::<f64>() / n;
        let _ = writeln!(out, "  Avg final pop: {avg_pop:.0}");
        let _ = writeln!(out, "  Avg variance: {avg_var:.3}");
    }

    let _ = writeln!(out, "\n{RULE_LINE}");
    let _ = writeln!(out, "MOST INTERESTING RULES:");
    let _ = writeln!(out, "{RULE_LINE}");
    for r in interesting(records, MAX_INTERESTING) {
        let _ = writeln!(out, "\nRule {}: {}", r.rule, r.name());
        let _ = writeln!(
            out,
            "  Pop: {} | Extent: {:.1} | Variance: {:.3}",
            grouped(r.final_population),
            r.final_extent,
            r.mean_variance
        );
    }
    let _ = writeln!(out, "\n{RULE_LINE}");
    out
}

/// Summary of a single rule's run.
pub fn render_series(series: &RuleSeries, classified: &ClassifiedRule) -> String {
    let tail = TailStats::of(series);
    let mut out = String::new();
    let _ = writeln!(out, "Rule {} on a {}³ lattice, {} generations", series.rule, series.size, series.len());
    let _ = writeln!(out, "Classification: {} ({})", classified.name(), classified.code());
    let _ = writeln!(out, "Summary Statistics:");
    let _ = writeln!(out, "  Max population: {}", grouped(series.max_population()));
    let _ = writeln!(out, "  Final population: {}", grouped(series.final_population()));
    let _ = writeln!(out, "  Max spatial extent: {:.2}", series.max_extent());
    let _ = writeln!(out, "  Mean variance: {:.3}", tail.mean_variance);
    let _ = writeln!(out, "  Variance trend: {:.3}", tail.variance_trend);

    let _ = writeln!(out, "\nPer-generation statistics (every {SERIES_STRIDE}th):");
    let _ = writeln!(
        out,
        "{:>5} {:>9} {:>8} {:>8} {:>10} {:>7} {:>8}",
        "gen", "pop", "mean_n", "extent", "density", "sum=1", "std_n"
    );
    let last = series.len().saturating_sub(1);
    for (i, r) in series.records.iter().enumerate() {
        if i != 0 && i != last && r.generation % SERIES_STRIDE != 0 {
            continue;
        }
        let _ = writeln!(
            out,
            "{:>5} {:>9} {:>8.3} {:>8.2} {:>10.4} {:>7} {:>8.3}",
            r.generation,
            r.total_cells,
            r.mean_neighbor_sum,
            r.max_distance_from_center,
            r.density,
            r.cells_sum_eq_one,
            r.std_neighbor_sum
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::BehaviorClass;
    use crate::stats::collect;

    fn record(rule: u8, behavior: BehaviorClass, pop: u64, extent: f64, var: f64) -> ClassifiedRule {
        ClassifiedRule {
            rule,
            behavior,
            final_population: pop,
            max_population: pop,
            min_population: 0,
            final_extent: extent,
            mean_variance: var,
            mean_density: 0.1,
        }
    }

    #[test]
    fn grouped_inserts_separators() {
        assert_eq!(grouped(0), "0");
        assert_eq!(grouped(999), "999");
        assert_eq!(grouped(1000), "1,000");
        assert_eq!(grouped(132_651), "132,651");
        assert_eq!(grouped(1_234_567), "1,234,567");
    }

    #[test]
    fn interesting_filters_and_sorts() {
        let records = vec![
            record(1, BehaviorClass::SimpleGrowth, 5000, 20.0, 0.9),
            record(2, BehaviorClass::ChaoticTurbulent, 50_000, 45.0, 2.5),
            record(3, BehaviorClass::StaticPeriodic, 27, 1.7, 0.0),
            record(4, BehaviorClass::SimpleGrowth, 5000, 20.0, 0.4),
        ];
        let picked: Vec<u8> = interesting(&records, 10).iter().map(|r| r.rule).collect();
        assert_eq!(picked, vec![2, 1]);
        assert_eq!(interesting(&records, 1).len(), 1);
    }

    #[test]
    fn render_counts_and_truncates() {
        let mut records: Vec<ClassifiedRule> = (0..20)
            .map(|r| record(r, BehaviorClass::ImmediateExtinction, 0, 0.0, 0.0))
            .collect();
        records.push(record(200, BehaviorClass::StructuredExpander, 12_000, 42.0, 1.5));
        let text = render(&records);
        assert!(text.contains("Total rules analyzed: 21"));
        assert!(text.contains("Unique classes found: 2"));
        assert!(text.contains("Rules with sustained growth: 1"));
        assert!(text.contains("Rules reaching boundary: 1"));
        assert!(text.contains("1A: Class 1A: Immediate Extinction - 20 rules"));
        assert!(text.contains("... and 5 more"));
        assert!(text.contains("Rule 200: Class 4A: Structured Expander (Boundary)"));
        assert!(text.contains("Pop: 12,000 | Extent: 42.0 | Variance: 1.500"));
    }

    #[test]
    fn render_series_summarizes_run() {
        let series = collect(9, 5, 0).unwrap();
        let classified = ClassifiedRule::from_series(&series);
        let text = render_series(&series, &classified);
        assert!(text.contains("Rule 0 on a 9³ lattice, 5 generations"));
        assert!(text.contains("Classification: Class 1A: Immediate Extinction (1A)"));
        assert!(text.contains("Final population: 0"));
    }

    #[test]
    fn render_series_tabulates_generations() {
        let series = collect(9, 25, 2).unwrap();
        let classified = ClassifiedRule::from_series(&series);
        let text = render_series(&series, &classified);
        let rows: Vec<u32> = text
            .lines()
            .skip_while(|l| !l.trim_start().starts_with("gen"))
            .skip(1)
            .filter_map(|l| l.split_whitespace().next()?.parse().ok())
            .collect();
        assert_eq!(rows, vec![1, 10, 20, 25]);
        // Generation 1 of rule 2: 27 cells, 8 of them corners.
        let first = text
            .lines()
            .find(|l| l.split_whitespace().next() == Some("1"))
            .unwrap();
        let cols: Vec<&str> = first.split_whitespace().collect();
        assert_eq!(cols[1], "27");
        assert_eq!(cols[5], "0");
    }
}
