use super::lifecycle::{WorkerEvent, WorkerLifecycle};
use crate::{
    Error, Request, Response, Result,
    executor::{ExecutorFactory, PredictionExecutor},
};
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use std::time::Duration;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{Instrument, Span, error, info, warn};

const QUEUE_DEPTH_PER_WORKER: usize = 8;
const MAX_RESTART_ATTEMPTS: usize = 5;
const RESTART_BACKOFF: Duration = Duration::from_millis(500);

type BoxedExecutor = Box<dyn PredictionExecutor>;
type SharedExecutor = Arc<Mutex<BoxedExecutor>>;

struct Job {
    request: Request,
    reply: oneshot::Sender<Result<Response>>,
    span: Span,
}

enum JobStatus {
    Completed,
    /// Unexpected error or panic.
    Failed,
    Abandoned,
}

/// Fixed-size pool of workers, each owning its own executor.
///
/// A worker handles one job at a time. A worker whose job fails unexpectedly,
/// panics, or is abandoned by its caller is rebuilt from the factory without
/// touching the other workers.
pub struct WorkerPool {
    size: usize,
    sender: Mutex<Option<mpsc::Sender<Job>>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    restarts: Arc<AtomicUsize>,
    live: Arc<AtomicUsize>,
}

struct WorkerContext {
    id: usize,
    size: usize,
    factory: Arc<dyn ExecutorFactory>,
    queue: Arc<Mutex<mpsc::Receiver<Job>>>,
    restarts: Arc<AtomicUsize>,
    live: Arc<AtomicUsize>,
}

impl WorkerPool {
    /// Starts `size` workers and waits until every one has initialized.
    pub async fn start(size: usize, factory: Arc<dyn ExecutorFactory>) -> Result<Self> {
        if size == 0 {
            return Err(Error::config("Worker pool needs at least one worker"));
        }

        let (sender, receiver) = mpsc::channel(size * QUEUE_DEPTH_PER_WORKER);
        let queue = Arc::new(Mutex::new(receiver));
        let restarts = Arc::new(AtomicUsize::new(0));
        let live = Arc::new(AtomicUsize::new(size));

        let mut handles = Vec::with_capacity(size);
        let mut readiness = Vec::with_capacity(size);

        for id in 0..size {
            let (ready_tx, ready_rx) = oneshot::channel();
            let context = WorkerContext {
                id,
                size,
                factory: factory.clone(),
                queue: queue.clone(),
                restarts: restarts.clone(),
                live: live.clone(),
            };
            handles.push(tokio::spawn(run_worker(context, ready_tx)));
            readiness.push((id, ready_rx));
        }

        for (id, ready_rx) in readiness {
            let outcome = ready_rx
                .await
                .unwrap_or_else(|_| Err(Error::worker("worker exited during startup")));

            if let Err(e) = outcome {
                error!("Worker {} failed to initialize: {}", id, e);
                drop(sender);
                for handle in handles {
                    let _ = handle.await;
                }
                return Err(Error::worker(format!(
                    "Worker {} failed to initialize: {}",
                    id, e
                )));
            }
        }

        info!("Worker pool started with {} workers", size);

        Ok(Self {
            size,
            sender: Mutex::new(Some(sender)),
            handles: Mutex::new(handles),
            restarts,
            live,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of worker restarts since the pool started.
    pub fn restart_count(&self) -> usize {
        self.restarts.load(Ordering::SeqCst)
    }

    /// Workers still serving. Drops when a worker cannot be restarted.
    pub fn live_workers(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Runs `request` on the next free worker.
    ///
    /// Dropping the returned future abandons the job; the worker handling it
    /// cancels the execution and rebuilds its executor.
    pub async fn submit(&self, request: Request) -> Result<Response> {
        let sender = self
            .sender
            .lock()
            .await
            .clone()
            .ok_or_else(|| Error::worker("Worker pool is shut down"))?;

        let (reply, outcome) = oneshot::channel();
        let job = Job {
            request,
            reply,
            span: Span::current(),
        };

        sender
            .send(job)
            .await
            .map_err(|_| Error::worker("Worker pool is shut down"))?;
        drop(sender);

        outcome
            .await
            .map_err(|_| Error::worker("Worker terminated without answering the request"))?
    }

    /// Stops accepting jobs, drains the queue and waits for every worker to stop.
    pub async fn shutdown(&self) {
        if self.sender.lock().await.take().is_none() {
            return;
        }
        info!("Shutting down worker pool");

        let handles = std::mem::take(&mut *self.handles.lock().await);
        for handle in handles {
            if let Err(e) = handle.await {
                warn!("Worker task ended abnormally: {}", e);
            }
        }

        info!("Worker pool stopped");
    }
}

fn advance(lifecycle: &mut WorkerLifecycle, event: WorkerEvent) {
    if let Err(e) = lifecycle.transition(event) {
        warn!("{}", e);
    }
}

async fn start_executor(context: &WorkerContext) -> Result<BoxedExecutor> {
    let mut executor = context.factory.create(context.id).await?;
    executor.start().await?;
    Ok(executor)
}

async fn stop_executor(context: &WorkerContext, executor: &SharedExecutor) {
    if let Err(e) = executor.lock().await.stop().await {
        warn!("Worker {} failed to stop its executor: {}", context.id, e);
    }
}

async fn run_worker(context: WorkerContext, ready: oneshot::Sender<Result<()>>) {
    let mut lifecycle = WorkerLifecycle::new(context.id);

    let mut gave_up = false;
    let mut executor: SharedExecutor = match start_executor(&context).await {
        Ok(executor) => {
            advance(&mut lifecycle, WorkerEvent::Started);
            let _ = ready.send(Ok(()));
            Arc::new(Mutex::new(executor))
        }
        Err(e) => {
            advance(&mut lifecycle, WorkerEvent::StartFailed);
            let _ = ready.send(Err(e));
            return;
        }
    };

    while lifecycle.accepts_jobs() {
        let job = {
            let mut queue = context.queue.lock().await;
            queue.recv().await
        };
        let Some(job) = job else {
            advance(&mut lifecycle, WorkerEvent::ShutdownRequested);
            break;
        };

        if job.reply.is_closed() {
            // Caller gave up while the job was queued.
            continue;
        }

        advance(&mut lifecycle, WorkerEvent::JobReceived);

        match run_job(&executor, job).await {
            JobStatus::Completed => {
                advance(&mut lifecycle, WorkerEvent::JobCompleted);
                continue;
            }
            JobStatus::Failed => advance(&mut lifecycle, WorkerEvent::JobFailed),
            JobStatus::Abandoned => advance(&mut lifecycle, WorkerEvent::JobAbandoned),
        }

        stop_executor(&context, &executor).await;

        advance(&mut lifecycle, WorkerEvent::Respawning);
        match restart(&context).await {
            Some(replacement) => {
                advance(&mut lifecycle, WorkerEvent::Started);
                executor = Arc::new(Mutex::new(replacement));
            }
            None => {
                advance(&mut lifecycle, WorkerEvent::StartFailed);
                gave_up = true;
            }
        }
    }

    let remaining = context.live.fetch_sub(1, Ordering::SeqCst).saturating_sub(1);

    if gave_up {
        error!(
            "Worker {} could not be restarted and left the pool ({} of {} workers remaining)",
            context.id, remaining, context.size
        );
        return;
    }

    stop_executor(&context, &executor).await;
}

async fn restart(context: &WorkerContext) -> Option<BoxedExecutor> {
    context.restarts.fetch_add(1, Ordering::SeqCst);

    for attempt in 1..=MAX_RESTART_ATTEMPTS {
        match start_executor(context).await {
            Ok(executor) => {
                info!("Worker {} restarted (attempt {})", context.id, attempt);
                return Some(executor);
            }
            Err(e) => {
                warn!(
                    "Worker {} restart attempt {} failed: {}",
                    context.id, attempt, e
                );
                if attempt < MAX_RESTART_ATTEMPTS {
                    tokio::time::sleep(RESTART_BACKOFF * attempt as u32).await;
                }
            }
        }
    }

    None
}

async fn run_job(executor: &SharedExecutor, job: Job) -> JobStatus {
    let Job {
        request,
        mut reply,
        span,
    } = job;

    // The execution runs on its own task so a panic or a cancellation only
    // drops the future; the executor stays behind the lock for `stop`.
    let mut running = executor.clone().lock_owned().await;
    let mut task = tokio::spawn(async move { running.execute(request).await }.instrument(span));

    let joined = tokio::select! {
        joined = &mut task => Some(joined),
        _ = reply.closed() => None,
    };

    match joined {
        Some(Ok(Ok(response))) => {
            let _ = reply.send(Ok(response));
            JobStatus::Completed
        }
        Some(Ok(Err(e))) => {
            error!("Request failed unexpectedly, restarting worker: {}", e);
            let _ = reply.send(Err(e));
            JobStatus::Failed
        }
        Some(Err(join_error)) => {
            error!("Executor crashed while handling request: {}", join_error);
            let _ = reply.send(Err(Error::worker("Executor crashed while handling request")));
            JobStatus::Failed
        }
        None => {
            warn!("Request abandoned by caller, cancelling execution");
            task.abort();
            match task.await {
                Ok(Ok(_)) => JobStatus::Completed,
                _ => JobStatus::Abandoned,
            }
        }
    }
}
