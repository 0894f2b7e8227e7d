//! # Demo: supervised batch pipeline
//!
//! A producer worker feeds a supervised async batch worker; batches of five
//! are "committed" together. Once the producer runs out of input, the
//! supervisor is stopped gracefully and the last partial batch is flushed.
//!
//! ```text
//! RUST_LOG=workvisor=debug cargo run --example batch_pipeline
//! ```

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing_subscriber::EnvFilter;
use workvisor::{
    AsyncBatchWorker, AsyncRequestHandler, BatchConfig, BatchWorkerHandle, Bus, LogWriter,
    MessageWorkerHandle, RequestObjectMessage, Subscribe, Supervisor, SupervisorConfig, Worker,
    WorkerConfig, WorkerContext, WorkerError, WorkerHandle,
};

struct Order {
    sku: String,
    quantity: u32,
    price: Option<u32>,
}

struct Pricer;

#[async_trait]
impl AsyncRequestHandler for Pricer {
    type Request = Order;
    type Message = Infallible;

    async fn handle_task_request(
        &self,
        ctx: &WorkerContext,
        container: &mut RequestObjectMessage<Order>,
    ) -> Result<bool, WorkerError> {
        ctx.sleep(Duration::from_millis(20)).await?;
        let order = &mut container.request;
        if order.quantity == 0 {
            return Ok(false);
        }
        order.price = Some(order.quantity * 199);
        Ok(true)
    }

    async fn handle_batch_completed(
        &self,
        _ctx: &WorkerContext,
        batch: Vec<RequestObjectMessage<Order>>,
    ) -> Result<(), WorkerError> {
        let total: u32 = batch.iter().filter_map(|c| c.request.price).sum();
        let rejected = batch.iter().filter(|c| !c.succeeded).count();
        let skus: Vec<&str> = batch.iter().map(|c| c.request.sku.as_str()).collect();
        println!("commit {skus:?} total={total} rejected={rejected}");
        Ok(())
    }
}

struct Producer {
    sink: BatchWorkerHandle<Order>,
    remaining: u32,
}

#[async_trait]
impl Worker for Producer {
    async fn run_single_cycle(&mut self, ctx: &WorkerContext) -> Result<bool, WorkerError> {
        if self.remaining == 0 {
            return Ok(false);
        }
        let n = self.remaining;
        self.sink
            .send_request(Order {
                sku: format!("SKU-{n:03}"),
                quantity: n % 4,
                price: None,
            })
            .map_err(|e| WorkerError::fail(e.to_string()))?;
        self.remaining -= 1;
        ctx.sleep(Duration::from_millis(15)).await?;
        Ok(true)
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "workvisor=info".into()))
        .init();

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let bus = Bus::with_subscribers(1024, subs);
    let worker_cfg = WorkerConfig::default().with_bus(bus.clone());

    let batch_cfg = BatchConfig {
        batch_size: 5,
        batch_timeout: Duration::from_millis(300),
        max_in_flight: 3,
        ..BatchConfig::default()
    };
    let pricer = MessageWorkerHandle::new(
        "pricer",
        AsyncBatchWorker::new(Pricer, batch_cfg),
        worker_cfg.clone(),
    );
    let producer = WorkerHandle::new(
        "producer",
        Producer {
            sink: pricer.clone(),
            remaining: 23,
        },
        worker_cfg,
    );

    let sup = Supervisor::new("pipeline", SupervisorConfig::default().with_bus(bus));
    sup.add_worker(pricer.clone()).await?;
    sup.run(Duration::from_secs(1)).await?;

    // The producer halts itself; a supervised child doing that would count as lost.
    producer.run(Duration::from_secs(1)).await?;
    while !producer.status().is_terminal() {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    println!("producer: {:?}, pending: {}", producer.status(), pricer.pending());

    sup.terminate(false);
    sup.wait_termination(Duration::from_secs(5)).await?;
    println!("supervisor: {:?}, pricer: {:?}", sup.status(), pricer.status());
    Ok(())
}
