//! # LogWriter: runtime events as `tracing` records
//!
//! Forwards every [`Event`] to `tracing` at the event's [`Level`], with the
//! event metadata as structured fields. Install any `tracing` subscriber
//! (e.g. `tracing-subscriber` with `EnvFilter`) to see the output.
//!
//! ## Example output
//! ```text
//! DEBUG workvisor: starting worker="INGEST" attempt=1
//!  WARN workvisor: restart-scheduled worker="INGEST" attempt=1 delay_ms=10 reason="cycle execution failed: boom"
//!  INFO workvisor: halted worker="INGEST"
//! ERROR workvisor: child-lost worker="ROOT" reason="INGEST: Halted"
//! ```

use async_trait::async_trait;

use crate::events::{Event, Level};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

macro_rules! emit {
    ($lvl:ident, $e:expr) => {
        tracing::$lvl!(
            target: "workvisor",
            seq = $e.seq,
            worker = $e.worker.as_deref(),
            reason = $e.reason.as_deref(),
            attempt = $e.attempt,
            delay_ms = $e.delay_ms,
            timeout_ms = $e.timeout_ms,
            batch_len = $e.batch_len,
            "{}",
            $e.kind.as_label()
        )
    };
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        match e.level() {
            Level::Debug => emit!(debug, e),
            Level::Info => emit!(info, e),
            Level::Warn => emit!(warn, e),
            Level::Error => emit!(error, e),
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
