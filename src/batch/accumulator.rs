//! Partial batch with its size/timeout triggers.

use tokio::time::Instant;

use super::config::BatchConfig;

pub(crate) struct Accumulator<T> {
    items: Vec<T>,
    opened_at: Option<Instant>,
    cfg: BatchConfig,
}

impl<T> Accumulator<T> {
    pub(crate) fn new(cfg: BatchConfig) -> Self {
        Self {
            items: Vec::new(),
            opened_at: None,
            cfg,
        }
    }

    /// Starts the timeout clock of the next batch unless it is already running.
    ///
    /// Called when handling of a request begins, so slow handling counts
    /// against `batch_timeout`.
    pub(crate) fn open(&mut self) {
        self.opened_at.get_or_insert_with(Instant::now);
    }

    /// Appends `item`; returns `true` when the size trigger fired.
    pub(crate) fn push(&mut self, item: T) -> bool {
        self.open();
        self.items.push(item);
        self.cfg.size_limit().is_some_and(|n| self.items.len() >= n)
    }

    /// When the timeout trigger fires for the current batch.
    pub(crate) fn deadline(&self) -> Option<Instant> {
        let timeout = self.cfg.timeout_limit()?;
        self.opened_at.map(|t| t + timeout)
    }

    /// The timeout trigger fired.
    pub(crate) fn is_due(&self, now: Instant) -> bool {
        self.deadline().is_some_and(|d| now >= d)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub(crate) fn take(&mut self) -> Vec<T> {
        self.opened_at = None;
        std::mem::take(&mut self.items)
    }

    pub(crate) fn config(&self) -> &BatchConfig {
        &self.cfg
    }
}
