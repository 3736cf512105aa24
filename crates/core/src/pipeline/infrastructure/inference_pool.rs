use std::panic::{self, AssertUnwindSafe};
use std::sync::Mutex;
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender, TrySendError};
use thiserror::Error;

use crate::classification::domain::prediction::PredictionResult;
use crate::pipeline::frame_pipeline::FramePipeline;
use crate::pipeline::pipeline_error::PipelineError;
use crate::shared::frame_payload::FramePayload;

pub const DEFAULT_QUEUE_CAPACITY: usize = 32;

/// Called exactly once with the outcome of a submitted frame, on the worker
/// thread that processed it.
pub type Completion = Box<dyn FnOnce(Result<PredictionResult, PipelineError>) + Send>;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SubmitError {
    #[error("inference queue is full")]
    QueueFull,
    #[error("inference pool is shut down")]
    Closed,
}

struct Job {
    payload: FramePayload,
    done: Completion,
}

/// Fixed set of inference workers fed from one bounded queue.
///
/// Each worker thread exclusively owns a `FramePipeline` (and with it an
/// independent detector and classifier instance), so model runtimes are
/// never entered concurrently. Throughput scales with the number of
/// pipelines, not with the number of callers.
///
/// Layout: `submit → [bounded queue] → worker 0..N → completion`
pub struct InferencePool {
    sender: Mutex<Option<Sender<Job>>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    workers: usize,
}

impl InferencePool {
    /// Starts one worker thread per pipeline.
    pub fn new(pipelines: Vec<FramePipeline>, queue_capacity: usize) -> std::io::Result<Self> {
        let (job_tx, job_rx) = crossbeam_channel::bounded::<Job>(queue_capacity.max(1));
        let workers = pipelines.len();
        let handles = pipelines
            .into_iter()
            .enumerate()
            .map(|(index, pipeline)| spawn_worker(index, pipeline, job_rx.clone()))
            .collect::<std::io::Result<Vec<_>>>()?;

        Ok(Self {
            sender: Mutex::new(Some(job_tx)),
            handles: Mutex::new(handles),
            workers,
        })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Frames waiting for a free worker.
    pub fn queue_depth(&self) -> usize {
        lock(&self.sender).as_ref().map_or(0, |tx| tx.len())
    }

    /// Queues a frame without blocking. On error the completion is dropped
    /// uncalled.
    pub fn submit(&self, payload: FramePayload, done: Completion) -> Result<(), SubmitError> {
        let guard = lock(&self.sender);
        let tx = guard.as_ref().ok_or(SubmitError::Closed)?;
        tx.try_send(Job { payload, done }).map_err(|e| match e {
            TrySendError::Full(_) => SubmitError::QueueFull,
            TrySendError::Disconnected(_) => SubmitError::Closed,
        })
    }

    /// Stops accepting frames, lets workers drain the queue, and joins them.
    ///
    /// Idempotent.
    pub fn shutdown(&self) {
        let sender = lock(&self.sender).take();
        if sender.is_none() {
            return;
        }
        drop(sender);

        let handles: Vec<_> = lock(&self.handles).drain(..).collect();
        log::info!("Draining {} inference worker(s)", handles.len());
        for handle in handles {
            if handle.join().is_err() {
                log::error!("Inference worker thread panicked during shutdown");
            }
        }
    }
}

impl Drop for InferencePool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn spawn_worker(
    index: usize,
    mut pipeline: FramePipeline,
    job_rx: Receiver<Job>,
) -> std::io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name(format!("inference-{index}"))
        .spawn(move || {
            for job in job_rx {
                let Job { payload, done } = job;
                let result = panic::catch_unwind(AssertUnwindSafe(|| pipeline.process_frame(&payload)))
                    .unwrap_or_else(|cause| Err(PipelineError::WorkerPanic(panic_message(&*cause))));
                if let Err(cause) = panic::catch_unwind(AssertUnwindSafe(move || done(result))) {
                    log::error!(
                        "Completion panicked on inference worker {index}: {}",
                        panic_message(&*cause)
                    );
                }
            }
            pipeline.summary();
            log::debug!("Inference worker {index} stopped");
        })
}

fn panic_message(cause: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = cause.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = cause.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
