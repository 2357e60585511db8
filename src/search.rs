use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::grid::{check_size, Rule};
use crate::stats::{collect, RuleSeries};

/// Configuration for a survey over many rules.
#[derive(Debug, Clone)]
pub struct SurveyConfig {
    /// Lattice side length (odd).
    pub size: usize,
    /// Generations simulated per rule.
    pub generations: u32,
    /// Rules to simulate, in output order.
    pub rules: Vec<u8>,
    /// Worker threads; 0 uses the rayon default.
    pub threads: usize,
}

impl Default for SurveyConfig {
    fn default() -> Self {
        Self {
            size: 51,
            generations: 100,
            rules: Rule::all().map(|r| r.number()).collect(),
            threads: 0,
        }
    }
}

impl SurveyConfig {
    /// Reject configurations that cannot be simulated.
    pub fn validate(&self) -> Result<()> {
        check_size(self.size)?;
        if self.generations == 0 {
            return Err(Error::InvalidGenerations);
        }
        Ok(())
    }
}

/// Progress snapshot of a running survey.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurveyProgress {
    pub completed: usize,
    pub total: usize,
    pub running: bool,
}

/// Simulate every configured rule, in parallel across rules.
///
/// Rules not yet started when `shutdown` is raised are skipped, so the result
/// may be shorter than `config.rules`. Order follows `config.rules`.
pub fn run_survey(
    config: &SurveyConfig,
    shutdown: &AtomicBool,
    completed: &AtomicUsize,
) -> Result<Vec<RuleSeries>> {
    config.validate()?;
    log::info!(
        "Surveying {} rules on a {}³ lattice ({} cells) for {} generations",
        config.rules.len(),
        config.size,
        config.size.pow(3),
        config.generations
    );

    let total = config.rules.len();
    let work = || {
        config
            .rules
            .par_iter()
            .filter_map(|&rule| {
                if shutdown.load(Ordering::Relaxed) {
                    return None;
                }
                match collect(config.size, config.generations, i64::from(rule)) {
                    Ok(series) => {
                        let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                        log::debug!("Rule {rule} done ({done}/{total})");
                        if done % 10 == 0 {
                            log::info!("Surveyed {done}/{total} rules");
                        }
                        Some(series)
                    }
                    Err(e) => {
                        log::warn!("Skipping rule {rule}: {e}");
                        None
                    }
                }
            })
            .collect::<Vec<_>>()
    };

    let series = if config.threads > 0 {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.threads)
            .build()?;
        pool.install(work)
    } else {
        work()
    };

    if shutdown.load(Ordering::Relaxed) {
        log::info!("Survey stopped after {} rules", series.len());
    } else {
        log::info!("Survey complete");
    }
    Ok(series)
}

/// Thread-safe handle to a survey running in the background.
pub struct SurveyHandle {
    completed: Arc<AtomicUsize>,
    shutdown: Arc<AtomicBool>,
    total: usize,
    worker: thread::JoinHandle<Result<Vec<RuleSeries>>>,
}

impl SurveyHandle {
    /// Get a snapshot of current progress.
    pub fn progress(&self) -> SurveyProgress {
        SurveyProgress {
            completed: self.completed.load(Ordering::Relaxed),
            total: self.total,
            running: !self.worker.is_finished(),
        }
    }

    /// Signal the survey to stop starting new rules.
    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Wait for the survey to finish and take its results.
    pub fn join(self) -> Result<Vec<RuleSeries>> {
        match self.worker.join() {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}

/// Spawn a background thread that runs [`run_survey`].
pub fn spawn_survey(config: SurveyConfig) -> SurveyHandle {
    let completed = Arc::new(AtomicUsize::new(0));
    let shutdown = Arc::new(AtomicBool::new(false));
    let total = config.rules.len();

    let worker = {
        let completed = completed.clone();
        let shutdown = shutdown.clone();
        thread::spawn(move || run_survey(&config, &shutdown, &completed))
    };

    SurveyHandle {
        completed,
        shutdown,
        total,
        worker,
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
