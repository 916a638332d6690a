//! Asynchronous job queue: an mpsc channel drained by a fixed pool of worker
//! tasks, each running the full pipeline for one job at a time.
//!
//! Cancellation flags live in process memory and are authoritative: a worker
//! consults its flag before starting and the pipeline consults it again after
//! generation, so a job cancelled in time never writes a file.
//!
//! Every status change is a read-modify-write on the stored record, done under
//! one lock shared by the queue and its workers. A terminal status is never
//! replaced.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::errors::{AppError, ErrorReport, ResumeError};
use crate::jobs::store::{JobRecord, JobStatus, JobStore};
use crate::pipeline::{GenerateInput, Pipeline};

const QUEUE_CAPACITY: usize = 256;

struct QueuedJob {
    id: Uuid,
    input: GenerateInput,
}

type CancelFlags = Arc<Mutex<HashMap<Uuid, Arc<AtomicBool>>>>;

/// Serialised access to job records.
#[derive(Clone)]
struct Records {
    store: Arc<dyn JobStore>,
    update_lock: Arc<tokio::sync::Mutex<()>>,
}

impl Records {
    async fn get(&self, id: Uuid) -> Result<Option<JobRecord>, AppError> {
        Ok(self.store.get(id).await?)
    }

    /// Re-reads the record and applies `change` while holding the update
    /// lock. `change` returns the record to store, or `None` to leave it as
    /// is; either way the record as it now stands is returned.
    async fn update<F>(&self, id: Uuid, change: F) -> Result<JobRecord, AppError>
    where
        F: FnOnce(Option<JobRecord>) -> Result<Option<JobRecord>, AppError>,
    {
        let _guard = self.update_lock.lock().await;
        let current = self.store.get(id).await?;
        let fallback = current.clone();
        match change(current)? {
            Some(next) => {
                self.store.put(&next).await?;
                Ok(next)
            }
            None => fallback.ok_or_else(|| AppError::NotFound(format!("job {id}"))),
        }
    }
}

#[derive(Clone)]
pub struct JobQueue {
    sender: mpsc::Sender<QueuedJob>,
    records: Records,
    cancel_flags: CancelFlags,
}

impl JobQueue {
    /// Spawns `workers` worker tasks on the current runtime.
    pub fn start(pipeline: Pipeline, store: Arc<dyn JobStore>, workers: usize) -> Self {
        let (sender, receiver) = mpsc::channel(QUEUE_CAPACITY);
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));
        let cancel_flags: CancelFlags = Arc::default();
        let records = Records {
            store,
            update_lock: Arc::default(),
        };

        for worker_id in 0..workers.max(1) {
            let worker = Worker {
                id: worker_id,
                pipeline: pipeline.clone(),
                records: records.clone(),
                cancel_flags: cancel_flags.clone(),
            };
            tokio::spawn(worker.run(receiver.clone()));
        }
        info!("Job queue started with {} worker(s)", workers.max(1));

        Self {
            sender,
            records,
            cancel_flags,
        }
    }

    pub async fn enqueue(&self, input: GenerateInput) -> Result<JobRecord, AppError> {
        let id = Uuid::new_v4();
        let record = JobRecord::pending(id);
        self.records.store.put(&record).await?;
        flags(&self.cancel_flags).insert(id, Arc::new(AtomicBool::new(false)));

        if self.sender.send(QueuedJob { id, input }).await.is_err() {
            flags(&self.cancel_flags).remove(&id);
            return Err(AppError::Internal(anyhow::anyhow!("job workers have stopped")));
        }
        info!("Job {id} enqueued");
        Ok(record)
    }

    pub async fn status(&self, id: Uuid) -> Result<JobRecord, AppError> {
        self.records
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("job {id}")))
    }

    /// Pending jobs become `Cancelled` at once; running jobs become
    /// `CancelRequested` and finish as `Cancelled` without writing output,
    /// unless they already got past their last cancellation check.
    pub async fn cancel(&self, id: Uuid) -> Result<JobRecord, AppError> {
        let cancel_flags = self.cancel_flags.clone();
        let record = self
            .records
            .update(id, move |current| {
                let record = current.ok_or_else(|| AppError::NotFound(format!("job {id}")))?;
                let next = match record.status {
                    JobStatus::Pending => JobStatus::Cancelled,
                    JobStatus::Running => JobStatus::CancelRequested,
                    JobStatus::CancelRequested | JobStatus::Cancelled => return Ok(None),
                    JobStatus::Succeeded | JobStatus::Failed => {
                        return Err(AppError::Conflict(format!(
                            "job {id} already finished with status {:?}",
                            record.status
                        )))
                    }
                };
                if let Some(flag) = flags(&cancel_flags).get(&id) {
                    flag.store(true, Ordering::SeqCst);
                }
                Ok(Some(record.transition(next)))
            })
            .await?;
        info!("Job {id} cancellation recorded ({:?})", record.status);
        Ok(record)
    }
}

fn flags(cancel_flags: &CancelFlags) -> std::sync::MutexGuard<'_, HashMap<Uuid, Arc<AtomicBool>>> {
    cancel_flags.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Worker {
    id: usize,
    pipeline: Pipeline,
    records: Records,
    cancel_flags: CancelFlags,
}

impl Worker {
    async fn run(self, receiver: Arc<tokio::sync::Mutex<mpsc::Receiver<QueuedJob>>>) {
        loop {
            let job = receiver.lock().await.recv().await;
            let Some(job) = job else {
                info!("Worker {} stopping: queue closed", self.id);
                return;
            };
            let id = job.id;
            if let Err(e) = self.process(job).await {
                error!("Worker {} failed to record job {id}: {e}", self.id);
            }
            flags(&self.cancel_flags).remove(&id);
        }
    }

    async fn process(&self, job: QueuedJob) -> Result<(), AppError> {
        let id = job.id;
        let flag = flags(&self.cancel_flags)
            .get(&id)
            .cloned()
            .unwrap_or_default();

        let start_flag = flag.clone();
        let started = self
            .records
            .update(id, move |current| {
                let record = current.unwrap_or_else(|| JobRecord::pending(id));
                if record.status.is_terminal() {
                    return Ok(None);
                }
                let next = if start_flag.load(Ordering::SeqCst) {
                    JobStatus::Cancelled
                } else {
                    JobStatus::Running
                };
                Ok(Some(record.transition(next)))
            })
            .await?;
        if started.status != JobStatus::Running {
            info!("Job {id} was cancelled before it started");
            return Ok(());
        }
        info!("Worker {} running job {id}", self.id);

        let outcome = self.pipeline.run_cancellable(job.input, &flag).await;

        let finished = self
            .records
            .update(id, move |current| {
                let mut record = current.unwrap_or_else(|| JobRecord::pending(id));
                if record.status.is_terminal() {
                    return Ok(None);
                }
                Ok(Some(match outcome {
                    Ok(artifact) => {
                        record.result = Some(artifact);
                        record.transition(JobStatus::Succeeded)
                    }
                    Err(ResumeError::Cancelled) => record.transition(JobStatus::Cancelled),
                    Err(e) => {
                        record.error = Some(ErrorReport::from(&e));
                        record.transition(JobStatus::Failed)
                    }
                }))
            })
            .await?;

        match (&finished.status, &finished.result, &finished.error) {
            (JobStatus::Succeeded, Some(artifact), _) => {
                info!("Job {id} succeeded: {}", artifact.path.display())
            }
            (JobStatus::Failed, _, Some(report)) => {
                warn!("Job {id} failed at {} stage: {}", report.stage, report.message)
            }
            (status, _, _) => info!("Job {id} finished as {status:?}"),
        }
        Ok(())
    }
}
