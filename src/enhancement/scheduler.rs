//! Background cycle scheduler
//!
//! The engine only returns a delay hint; this loop turns the hint into
//! actual re-invocation. One task per scheduled workflow, stopped
//! through a watch channel.

use super::engine::EnhancementEngine;
use crate::metrics::METRICS;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

pub struct CycleScheduler {
    engine: Arc<EnhancementEngine>,
    shutdown: watch::Sender<bool>,
}

impl CycleScheduler {
    pub fn new(engine: Arc<EnhancementEngine>) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self { engine, shutdown }
    }

    /// Spawn the cycle loop for one workflow
    ///
    /// Runs an immediate first cycle, then sleeps for however long the
    /// engine asked before running the next one. The task ends when
    /// `stop` is called.
    pub fn schedule(&self, workflow_id: &str) -> JoinHandle<()> {
        let engine = Arc::clone(&self.engine);
        let workflow_id = workflow_id.to_string();
        let mut shutdown = self.shutdown.subscribe();

        tokio::spawn(async move {
            info!("Cycle loop started for {}", workflow_id);
            loop {
                let started = std::time::Instant::now();
                let report = engine.run_enhancement_cycle(&workflow_id).await;
                METRICS
                    .cycle_duration
                    .observe(started.elapsed().as_secs_f64());

                debug!(
                    "Next cycle for {} in {}ms",
                    workflow_id, report.next_cycle_in
                );

                tokio::select! {
                    _ = tokio::time::sleep(Duration::from_millis(report.next_cycle_in)) => {}
                    _ = shutdown.changed() => {
                        if *shutdown.borrow() {
                            info!("Cycle loop stopped for {}", workflow_id);
                            break;
                        }
                    }
                }
            }
        })
    }

    /// Stop every scheduled loop
    pub fn stop(&self) {
        let _ = self.shutdown.send(true);
    }
}
