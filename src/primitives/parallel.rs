//! # Parallel load driver.
//!
//! [`ParallelRunner`] splits `count` invocations of a closure evenly across
//! `degree` blocking units and collects what they produce:
//! results and errors go to [`ConcurrentQueue`]s, completed invocations are
//! counted by a [`CycleCounter`]. It is used to hammer the primitives and
//! mailboxes from many producers at once.
//!
//! ```text
//! run(count=8, degree=4)
//!   unit 0: 0..2   unit 1: 2..4   unit 2: 4..6   unit 3: 6..8
//!      └──► f(i) ──► Ok(v)  → results.push(v)
//!                 └► Err(e) → errors.push(e)
//!      cycles.increment() after every call
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinSet;

use super::{ConcurrentQueue, CycleCounter};

/// Outcome of a [`ParallelRunner::run`].
#[derive(Debug)]
pub struct ParallelReport<T> {
    /// Values returned by successful calls (per-unit order preserved).
    pub results: ConcurrentQueue<T>,
    /// Errors returned by failed calls.
    pub errors: ConcurrentQueue<String>,
    /// Number of completed calls.
    pub cycles: CycleCounter,
    /// Wall-clock duration of the whole run.
    pub elapsed: Duration,
}

/// Runs a closure across parallel blocking units.
#[derive(Clone, Copy, Debug)]
pub struct ParallelRunner {
    degree: usize,
}

impl Default for ParallelRunner {
    fn default() -> Self {
        let degree = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        Self { degree }
    }
}

impl ParallelRunner {
    /// Creates a runner with the given degree of parallelism (min 1).
    pub fn new(degree: usize) -> Self {
        Self {
            degree: degree.max(1),
        }
    }

    /// Degree of parallelism.
    pub fn degree(&self) -> usize {
        self.degree
    }

    /// Invokes `f(i)` for every `i` in `0..count`, spread over the units.
    ///
    /// When `count` is not a multiple of the degree, the last unit takes the rest.
    pub async fn run<T, F>(&self, count: usize, f: F) -> ParallelReport<T>
    where
        T: Send + 'static,
        F: Fn(usize) -> Result<T, String> + Send + Sync + 'static,
    {
        let report = ParallelReport {
            results: ConcurrentQueue::new(),
            errors: ConcurrentQueue::new(),
            cycles: CycleCounter::new(),
            elapsed: Duration::ZERO,
        };
        let f = Arc::new(f);
        let step = count / self.degree;
        let started = Instant::now();

        let mut set = JoinSet::new();
        for unit in 0..self.degree {
            let from = step * unit;
            let to = if unit + 1 == self.degree { count } else { step * (unit + 1) };
            let f = Arc::clone(&f);
            let results = report.results.clone();
            let errors = report.errors.clone();
            let cycles = report.cycles.clone();

            set.spawn_blocking(move || {
                for i in from..to {
                    match f(i) {
                        Ok(v) => results.push(v),
                        Err(e) => errors.push(e),
                    }
                    cycles.increment();
                }
            });
        }
        while let Some(joined) = set.join_next().await {
            if let Err(e) = joined {
                report.errors.push(format!("unit panicked: {e}"));
            }
        }

        ParallelReport {
            elapsed: started.elapsed(),
            ..report
        }
    }
}
