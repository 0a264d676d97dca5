//! Concurrent Dispatcher: a bounded worker pool over the input tree
//!
//! A producer feeds relative paths into a bounded channel; `workers`
//! consumers share the receiver and process one file at a time each.

use crate::error::PipelineResult;
use crate::pipeline::context::RunContext;
use crate::pipeline::input::discover_files;
use crate::pipeline::orchestrator::process_file;
use crate::pipeline::stats::StatsSummary;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info};

/// Final numbers of one dispatcher run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub stats: StatsSummary,
    pub wall_time: Duration,
}

pub struct Dispatcher {
    context: Arc<RunContext>,
    workers: usize,
}

impl Dispatcher {
    pub fn new(context: Arc<RunContext>, workers: usize) -> Self {
        Self {
            context,
            workers: workers.max(1),
        }
    }

    /// Process every file under `input_root` into the mirrored path under
    /// `output_root`
    pub async fn run(&self, input_root: &Path, output_root: &Path) -> PipelineResult<RunSummary> {
        let started = Instant::now();

        let files = discover_files(input_root, Some(output_root))?;
        info!(
            "Found {} files under {}, {} workers",
            files.len(),
            input_root.display(),
            self.workers
        );

        let (work_tx, work_rx) = mpsc::channel::<PathBuf>(self.workers * 2);
        let work_rx = Arc::new(Mutex::new(work_rx));

        let mut handles = Vec::with_capacity(self.workers);
        for worker_id in 0..self.workers {
            handles.push(spawn_worker(
                worker_id,
                Arc::clone(&self.context),
                Arc::clone(&work_rx),
                input_root.to_path_buf(),
                output_root.to_path_buf(),
            ));
        }

        for relative in files {
            if work_tx.send(relative).await.is_err() {
                break;
            }
        }
        drop(work_tx);

        for handle in handles {
            handle.await?;
        }

        Ok(RunSummary {
            stats: self.context.stats.snapshot(),
            wall_time: started.elapsed(),
        })
    }
}

fn spawn_worker(
    worker_id: usize,
    context: Arc<RunContext>,
    work_rx: Arc<Mutex<mpsc::Receiver<PathBuf>>>,
    input_root: PathBuf,
    output_root: PathBuf,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let relative = {
                let mut rx = work_rx.lock().await;
                match rx.recv().await {
                    Some(path) => path,
                    None => break,
                }
            };

            let source = input_root.join(&relative);
            let dest = output_root.join(&relative);
            let outcome = process_file(&context, &source, &dest).await;
            debug!("[worker {}] {}: {:?}", worker_id, relative.display(), outcome);
        }
    })
}
