//! Background worker that runs sweeps off the main thread.

use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender, channel};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rupture_core::{
    Dims, ProgressReporter, RunStatus, RuptureEnvelope, SweepError, SweepGrid, SweepReport,
    SweepStatus,
};

/// Grid points evaluated between cancellation-friendly yields
pub const DEFAULT_CHUNK: usize = 10;

/// Request sent to the background worker
#[derive(Debug)]
pub enum SweepRequest {
    Run {
        envelope: Box<RuptureEnvelope>,
        dims: Dims,
        /// Points per chunk for the sequential runner
        chunk: usize,
        /// Use the rayon runner when available
        parallel: bool,
    },
    /// Graceful shutdown
    Shutdown,
}

/// Response from the background worker
#[derive(Debug)]
pub enum SweepResponse {
    Progress { current: usize, total: usize },
    Complete {
        report: SweepReport,
        grid: SweepGrid<f64>,
        envelope: Box<RuptureEnvelope>,
    },
    /// Stopped early; the grid holds NaN where nothing was evaluated
    Cancelled {
        report: SweepReport,
        grid: SweepGrid<f64>,
    },
    Error(String),
}

/// Runs sweeps on a dedicated thread and streams progress back
pub struct SweepWorker {
    request_tx: Sender<SweepRequest>,
    response_rx: Receiver<SweepResponse>,
    progress: ProgressReporter,
    thread: Option<JoinHandle<()>>,
}

impl SweepWorker {
    pub fn new() -> Self {
        let (request_tx, request_rx) = channel();
        let (response_tx, response_rx) = channel();

        let progress_tx = response_tx.clone();
        let base = ProgressReporter::new().with_label("rupture");
        let totals = base.clone();
        let progress = base.with_observer(move |current| {
            let _ = progress_tx.send(SweepResponse::Progress {
                current,
                total: totals.total(),
            });
        });

        let ctx = WorkerContext {
            response_tx,
            progress: progress.clone(),
        };
        let thread = thread::spawn(move || ctx.run(request_rx));

        Self {
            request_tx,
            response_rx,
            progress,
            thread: Some(thread),
        }
    }

    pub fn send(&self, request: SweepRequest) -> bool {
        self.request_tx.send(request).is_ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<SweepResponse, RecvTimeoutError> {
        self.response_rx.recv_timeout(timeout)
    }

    /// Request cancellation of the current sweep
    pub fn cancel(&self) {
        self.progress.cancel();
    }

    pub fn shutdown(&self) {
        let _ = self.request_tx.send(SweepRequest::Shutdown);
    }
}

impl Default for SweepWorker {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SweepWorker {
    fn drop(&mut self) {
        self.progress.cancel();
        self.shutdown();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// State owned by the worker thread
struct WorkerContext {
    response_tx: Sender<SweepResponse>,
    progress: ProgressReporter,
}

impl WorkerContext {
    fn run(&self, request_rx: Receiver<SweepRequest>) {
        while let Ok(request) = request_rx.recv() {
            match request {
                SweepRequest::Shutdown => break,

                SweepRequest::Run {
                    mut envelope,
                    dims,
                    chunk,
                    parallel,
                } => {
                    tracing::info!(?dims, n = envelope.sampling(), parallel, "starting sweep");
                    let response = match self.run_sweep(&mut envelope, dims, chunk, parallel) {
                        Ok(report) => Self::respond(report, envelope),
                        Err(e) => {
                            tracing::error!("sweep failed: {e}");
                            SweepResponse::Error(e.to_string())
                        }
                    };
                    let _ = self.response_tx.send(response);
                }
            }
        }
    }

    fn run_sweep(
        &self,
        envelope: &mut RuptureEnvelope,
        dims: Dims,
        chunk: usize,
        parallel: bool,
    ) -> Result<SweepReport, SweepError> {
        if parallel && let Some(result) = run_parallel(envelope, dims, &self.progress) {
            return result;
        }

        let mut sweep = envelope.sweep(dims, &self.progress)?;
        while sweep.advance(chunk.max(1))? == SweepStatus::Running {
            thread::yield_now();
        }
        sweep.finish()
    }

    fn respond(report: SweepReport, mut envelope: Box<RuptureEnvelope>) -> SweepResponse {
        let grid = match report.dims {
            Dims::Two => envelope.take_square(),
            Dims::Three => envelope.take_cube(),
        };
        let Some(grid) = grid else {
            return SweepResponse::Error("sweep produced no grid".to_string());
        };
        match report.status {
            RunStatus::Completed => SweepResponse::Complete {
                report,
                grid,
                envelope,
            },
            RunStatus::Cancelled => SweepResponse::Cancelled { report, grid },
        }
    }
}

#[cfg(feature = "parallel")]
fn run_parallel(
    envelope: &mut RuptureEnvelope,
    dims: Dims,
    progress: &ProgressReporter,
) -> Option<Result<SweepReport, SweepError>> {
    Some(envelope.run_parallel(dims, progress))
}

#[cfg(not(feature = "parallel"))]
fn run_parallel(
    _envelope: &mut RuptureEnvelope,
    _dims: Dims,
    _progress: &ProgressReporter,
) -> Option<Result<SweepReport, SweepError>> {
    tracing::warn!("built without the parallel feature, running sequentially");
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use rupture_core::geometry::rectangle;

    fn envelope() -> Box<RuptureEnvelope> {
        let mut envelope = RuptureEnvelope::new();
        let mesh = rectangle(2.0, 2.0, 2, 2).tilted(45.0, 0.0);
        envelope.add_fault(&mesh.positions, &mesh.indices).unwrap();
        envelope.set_sh_max("2");
        envelope.set_sh_min("1");
        envelope.set_sv("3");
        envelope.set_sampling(6).unwrap();
        Box::new(envelope)
    }

    fn wait_final(worker: &SweepWorker) -> (SweepResponse, Vec<usize>) {
        let mut seen = Vec::new();
        loop {
            match worker.recv_timeout(Duration::from_secs(30)).unwrap() {
                SweepResponse::Progress { current, .. } => seen.push(current),
                other => return (other, seen),
            }
        }
    }

    #[test]
    fn test_chunked_sweep_completes() {
        let worker = SweepWorker::new();
        assert!(worker.send(SweepRequest::Run {
            envelope: envelope(),
            dims: Dims::Two,
            chunk: 4,
            parallel: false,
        }));

        let (response, seen) = wait_final(&worker);
        match response {
            SweepResponse::Complete { report, grid, .. } => {
                assert!(report.is_complete());
                assert_eq!(grid.shape(), &[6, 6]);
                assert_eq!(grid.written(), 36);
            }
            other => panic!("unexpected response: {other:?}"),
        }
        assert_eq!(seen.last(), Some(&36));
    }

    #[test]
    fn test_errors_are_reported() {
        let worker = SweepWorker::new();
        let mut bad = envelope();
        bad.set_sv("depth");
        worker.send(SweepRequest::Run {
            envelope: bad,
            dims: Dims::Two,
            chunk: DEFAULT_CHUNK,
            parallel: false,
        });
        match wait_final(&worker).0 {
            SweepResponse::Error(msg) => assert!(msg.contains("depth"), "{msg}"),
            other => panic!("unexpected response: {other:?}"),
        }
    }
}
