//! # Demo: interval scheduler
//!
//! A crontab-like worker: each cycle finds the next due job, sleeps until it
//! is due and fires it. Runs under a supervisor until Ctrl-C or three seconds.
//!
//! ```text
//! RUST_LOG=workvisor=debug cargo run --example interval_scheduler
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing_subscriber::EnvFilter;
use workvisor::{
    Bus, LogWriter, Subscribe, Supervisor, SupervisorConfig, Worker, WorkerConfig, WorkerContext,
    WorkerError, WorkerHandle, shutdown_signal,
};

struct Job {
    name: &'static str,
    every: Duration,
    next: Instant,
}

struct Scheduler {
    jobs: Vec<Job>,
}

impl Scheduler {
    fn new(jobs: &[(&'static str, u64)]) -> Self {
        let now = Instant::now();
        let jobs = jobs
            .iter()
            .map(|&(name, ms)| Job {
                name,
                every: Duration::from_millis(ms),
                next: now + Duration::from_millis(ms),
            })
            .collect();
        Self { jobs }
    }
}

#[async_trait]
impl Worker for Scheduler {
    async fn initialize(&mut self, ctx: &WorkerContext) -> Result<(), WorkerError> {
        println!("[{}] {} jobs scheduled", ctx.name(), self.jobs.len());
        Ok(())
    }

    async fn run_single_cycle(&mut self, ctx: &WorkerContext) -> Result<bool, WorkerError> {
        let Some(job) = self.jobs.iter_mut().min_by_key(|j| j.next) else {
            return Ok(false);
        };

        let wait = job.next.saturating_duration_since(Instant::now());
        tokio::select! {
            _ = ctx.halted() => return Ok(true),
            slept = ctx.sleep(wait) => slept?,
        }

        println!("[{}] fire {} (cycle {})", ctx.name(), job.name, ctx.cycles().get() + 1);
        job.next += job.every;
        Ok(true)
    }

    async fn clean_up(&mut self, ctx: &WorkerContext) -> Result<(), WorkerError> {
        println!("[{}] stopped after {} cycles", ctx.name(), ctx.cycles().get());
        Ok(())
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "workvisor=info".into()))
        .init();

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let bus = Bus::with_subscribers(256, subs);

    let sup = Supervisor::new("cron", SupervisorConfig::default().with_bus(bus.clone()));
    let scheduler = WorkerHandle::new(
        "scheduler",
        Scheduler::new(&[("heartbeat", 250), ("report", 700), ("rotate-logs", 1_300)]),
        WorkerConfig::default().with_bus(bus),
    );
    sup.add_worker(scheduler).await?;
    sup.run(Duration::from_secs(1)).await?;

    tokio::select! {
        res = shutdown_signal() => res?,
        _ = tokio::time::sleep(Duration::from_secs(3)) => {}
    }

    sup.terminate(false);
    sup.wait_termination(Duration::from_secs(5)).await?;
    println!("supervisor: {:?}", sup.status());
    Ok(())
}
