// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - SecureScan Worker Pool
 * Fixed-size worker set with rate limiting, an in-flight cap and
 * crash recovery
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */
use async_trait::async_trait;
use std::cmp::Ordering as CmpOrdering;
use std::collections::{BinaryHeap, HashMap};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::errors::TaskError;
use crate::types::{Page, ScanTask, TaskOutcome, WorkerResult};

/// Executes one task. The page scanner provides the production
/// implementation; tests substitute their own.
#[async_trait]
pub trait TaskExecutor: Send + Sync + 'static {
    async fn execute(&self, task: &ScanTask) -> Result<TaskOutcome, String>;
}

#[derive(Debug, Clone)]
pub struct WorkerPoolConfig {
    pub worker_count: usize,
    /// Minimum spacing between two task dispatches.
    pub rate_limit_delay: Duration,
    /// Cap on tasks in flight at any moment.
    pub max_concurrent_requests: usize,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            worker_count: 5,
            rate_limit_delay: Duration::from_millis(500),
            max_concurrent_requests: 10,
        }
    }
}

impl WorkerPoolConfig {
    pub fn from_engine(config: &EngineConfig) -> Self {
        Self {
            worker_count: config.worker_count,
            rate_limit_delay: config.rate_limit_delay,
            max_concurrent_requests: config.max_concurrent_requests,
        }
    }
}

/// Point-in-time pool statistics.
#[derive(Debug, Clone, Copy)]
pub struct PoolStats {
    pub worker_count: usize,
    /// Workers currently holding a task.
    pub active: usize,
    pub queued: usize,
    pub in_flight: usize,
}

/// Fixed-size worker pool. A single driver task owns all mutable scheduling
/// state; submissions and worker completions reach it over channels, so no
/// lock is ever held across a dispatch decision.
pub struct WorkerPool {
    cmd_tx: mpsc::UnboundedSender<PoolCommand>,
    stats: Arc<SharedStats>,
    driver: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl WorkerPool {
    pub fn new(config: WorkerPoolConfig, executor: Arc<dyn TaskExecutor>) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();

        let stats = Arc::new(SharedStats {
            worker_count: config.worker_count,
            active: AtomicUsize::new(0),
            queued: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
        });

        let workers = (0..config.worker_count)
            .map(|worker_id| spawn_worker(worker_id, Arc::clone(&executor), completion_tx.clone()))
            .collect();

        let driver = Driver {
            config,
            executor,
            cmd_rx,
            cmd_closed: false,
            completion_rx,
            completion_tx,
            queue: BinaryHeap::new(),
            workers,
            active: HashMap::new(),
            in_flight: 0,
            last_dispatch: None,
            next_seq: 0,
            shutting_down: false,
            shutdown_acks: Vec::new(),
            stats: Arc::clone(&stats),
        };

        let handle = tokio::spawn(driver.run());

        Self {
            cmd_tx,
            stats,
            driver: std::sync::Mutex::new(Some(handle)),
        }
    }

    /// Queue a task. The returned future resolves when the task completes,
    /// fails, or is rejected by shutdown.
    pub fn submit(&self, task: ScanTask) -> impl Future<Output = WorkerResult> + Send + 'static {
        let task_id = task.task_id.clone();
        let (reply_tx, reply_rx) = oneshot::channel();
        let accepted = self
            .cmd_tx
            .send(PoolCommand::Submit(QueuedTask {
                priority: task.priority,
                seq: 0, // assigned by the driver
                task,
                reply: reply_tx,
            }))
            .is_ok();

        async move {
            if !accepted {
                return WorkerResult {
                    task_id,
                    worker_id: None,
                    outcome: Err(TaskError::PoolShutdown),
                };
            }
            match reply_rx.await {
                Ok(result) => result,
                Err(_) => WorkerResult {
                    task_id,
                    worker_id: None,
                    outcome: Err(TaskError::PoolShutdown),
                },
            }
        }
    }

    /// Submit one scan task per page and wait for all of them. Only the
    /// tasks that succeeded are returned; failed pages simply contribute
    /// nothing.
    pub async fn scan_pages(&self, scan_id: &str, pages: Vec<Page>) -> Vec<WorkerResult> {
        let futures: Vec<_> = pages
            .into_iter()
            .enumerate()
            .map(|(index, page)| self.submit(ScanTask::for_page(scan_id, index, page)))
            .collect();

        futures::future::join_all(futures)
            .await
            .into_iter()
            .filter(|result| result.outcome.is_ok())
            .collect()
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            worker_count: self.stats.worker_count,
            active: self.stats.active.load(Ordering::Relaxed),
            queued: self.stats.queued.load(Ordering::Relaxed),
            in_flight: self.stats.in_flight.load(Ordering::Relaxed),
        }
    }

    /// Cooperative shutdown: stop dispatching, drain active tasks for up to
    /// `drain_timeout`, then force-terminate whatever is left.
    pub async fn shutdown(&self, drain_timeout: Duration) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.cmd_tx.send(PoolCommand::Shutdown(ack_tx)).is_err() {
            return;
        }

        if tokio::time::timeout(drain_timeout, ack_rx).await.is_err() {
            warn!("Worker pool drain timed out, force-terminating workers");
            if let Some(handle) = self.driver.lock().expect("driver lock").take() {
                handle.abort();
            }
        }
    }
}

struct SharedStats {
    worker_count: usize,
    active: AtomicUsize,
    queued: AtomicUsize,
    in_flight: AtomicUsize,
}

enum PoolCommand {
    Submit(QueuedTask),
    Shutdown(oneshot::Sender<()>),
}

struct QueuedTask {
    task: ScanTask,
    reply: oneshot::Sender<WorkerResult>,
    priority: i64,
    seq: u64,
}

// Max-heap ordering: higher priority first, FIFO within a priority.
impl Ord for QueuedTask {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for QueuedTask {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for QueuedTask {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == CmpOrdering::Equal
    }
}

impl Eq for QueuedTask {}

enum WorkerMessage {
    Done {
        worker_id: usize,
        result: Result<TaskOutcome, String>,
    },
    Crashed {
        worker_id: usize,
    },
}

struct WorkerAssignment {
    task: ScanTask,
}

struct WorkerSlot {
    tx: mpsc::UnboundedSender<WorkerAssignment>,
    busy: bool,
}

struct ActiveTask {
    task_id: String,
    reply: oneshot::Sender<WorkerResult>,
}

fn spawn_worker(
    worker_id: usize,
    executor: Arc<dyn TaskExecutor>,
    completions: mpsc::UnboundedSender<WorkerMessage>,
) -> WorkerSlot {
    let (tx, rx) = mpsc::unbounded_channel();

    let handle = tokio::spawn(worker_loop(worker_id, rx, executor, completions.clone()));

    // A worker that unwinds mid-task never reports back on its own; the
    // monitor turns the panic into a crash message for the driver.
    tokio::spawn(async move {
        if let Err(join_err) = handle.await {
            if join_err.is_panic() {
                let _ = completions.send(WorkerMessage::Crashed { worker_id });
            }
        }
    });

    WorkerSlot { tx, busy: false }
}

async fn worker_loop(
    worker_id: usize,
    mut rx: mpsc::UnboundedReceiver<WorkerAssignment>,
    executor: Arc<dyn TaskExecutor>,
    completions: mpsc::UnboundedSender<WorkerMessage>,
) {
    while let Some(assignment) = rx.recv().await {
        debug!("Worker {} running task {}", worker_id, assignment.task.task_id);
        let result = executor.execute(&assignment.task).await;
        if completions
            .send(WorkerMessage::Done { worker_id, result })
            .is_err()
        {
            break;
        }
    }
}

struct Driver {
    config: WorkerPoolConfig,
    executor: Arc<dyn TaskExecutor>,
    cmd_rx: mpsc::UnboundedReceiver<PoolCommand>,
    cmd_closed: bool,
    completion_rx: mpsc::UnboundedReceiver<WorkerMessage>,
    completion_tx: mpsc::UnboundedSender<WorkerMessage>,
    queue: BinaryHeap<QueuedTask>,
    workers: Vec<WorkerSlot>,
    active: HashMap<usize, ActiveTask>,
    in_flight: usize,
    last_dispatch: Option<Instant>,
    next_seq: u64,
    shutting_down: bool,
    shutdown_acks: Vec<oneshot::Sender<()>>,
    stats: Arc<SharedStats>,
}

impl Driver {
    async fn run(mut self) {
        loop {
            let rate_wait = self.try_dispatch();
            self.publish_stats();

            tokio::select! {
                cmd = self.cmd_rx.recv(), if !self.cmd_closed => match cmd {
                    Some(PoolCommand::Submit(mut queued)) => {
                        if self.shutting_down {
                            self.reject(queued, TaskError::PoolShutdown);
                        } else {
                            queued.seq = self.next_seq;
                            self.next_seq += 1;
                            self.queue.push(queued);
                        }
                    }
                    Some(PoolCommand::Shutdown(ack)) => {
                        info!("Worker pool shutting down, draining {} active tasks", self.in_flight);
                        self.shutting_down = true;
                        self.shutdown_acks.push(ack);
                    }
                    None => {
                        self.cmd_closed = true;
                        self.shutting_down = true;
                    }
                },
                Some(msg) = self.completion_rx.recv() => self.handle_worker_message(msg),
                _ = sleep_for(rate_wait), if rate_wait.is_some() => {}
            }

            if self.shutting_down && self.in_flight == 0 {
                while let Some(queued) = self.queue.pop() {
                    self.reject(queued, TaskError::PoolShutdown);
                }
                // Dropping the assignment channels ends the worker loops.
                self.workers.clear();
                self.publish_stats();
                for ack in self.shutdown_acks.drain(..) {
                    let _ = ack.send(());
                }
                info!("Worker pool shut down");
                break;
            }
        }
    }

    /// Dispatch as many queued tasks as the gates allow. Returns how long to
    /// wait when only the rate limit is blocking.
    fn try_dispatch(&mut self) -> Option<Duration> {
        loop {
            if self.shutting_down || self.queue.is_empty() {
                return None;
            }
            if self.in_flight >= self.config.max_concurrent_requests {
                return None;
            }
            let Some(worker_id) = self.idle_worker() else {
                return None;
            };

            if let Some(last) = self.last_dispatch {
                let elapsed = last.elapsed();
                if elapsed < self.config.rate_limit_delay {
                    return Some(self.config.rate_limit_delay - elapsed);
                }
            }

            let queued = self.queue.pop().expect("queue checked non-empty");
            self.dispatch(worker_id, queued);
        }
    }

    fn idle_worker(&self) -> Option<usize> {
        self.workers.iter().position(|worker| !worker.busy)
    }

    fn dispatch(&mut self, worker_id: usize, queued: QueuedTask) {
        let task_id = queued.task.task_id.clone();
        match self.workers[worker_id].tx.send(WorkerAssignment { task: queued.task }) {
            Ok(()) => {
                self.workers[worker_id].busy = true;
                self.active.insert(
                    worker_id,
                    ActiveTask {
                        task_id,
                        reply: queued.reply,
                    },
                );
                self.in_flight += 1;
                self.last_dispatch = Some(Instant::now());
            }
            Err(_) => {
                // Synchronous post failure: reject the task's future, leave
                // the worker idle. The crash monitor replaces the worker.
                warn!("Failed to post task {} to worker {}", task_id, worker_id);
                let _ = queued.reply.send(WorkerResult {
                    task_id,
                    worker_id: Some(worker_id),
                    outcome: Err(TaskError::DispatchFailed { worker_id }),
                });
            }
        }
    }

    fn handle_worker_message(&mut self, msg: WorkerMessage) {
        match msg {
            WorkerMessage::Done { worker_id, result } => {
                if let Some(active) = self.active.remove(&worker_id) {
                    self.workers[worker_id].busy = false;
                    self.in_flight -= 1;
                    let _ = active.reply.send(WorkerResult {
                        task_id: active.task_id,
                        worker_id: Some(worker_id),
                        outcome: result.map_err(TaskError::Execution),
                    });
                }
            }
            WorkerMessage::Crashed { worker_id } => {
                warn!("Worker {} crashed, replacing it at the same index", worker_id);
                if let Some(active) = self.active.remove(&worker_id) {
                    self.workers[worker_id].busy = false;
                    self.in_flight -= 1;
                    let _ = active.reply.send(WorkerResult {
                        task_id: active.task_id,
                        worker_id: Some(worker_id),
                        outcome: Err(TaskError::WorkerCrashed { worker_id }),
                    });
                }
                if !self.shutting_down && worker_id < self.workers.len() {
                    self.workers[worker_id] = spawn_worker(
                        worker_id,
                        Arc::clone(&self.executor),
                        self.completion_tx.clone(),
                    );
                }
            }
        }
    }

    fn reject(&self, queued: QueuedTask, error: TaskError) {
        let _ = queued.reply.send(WorkerResult {
            task_id: queued.task.task_id,
            worker_id: None,
            outcome: Err(error),
        });
    }

    fn publish_stats(&self) {
        let active = self.workers.iter().filter(|worker| worker.busy).count();
        self.stats.active.store(active, Ordering::Relaxed);
        self.stats.queued.store(self.queue.len(), Ordering::Relaxed);
        self.stats.in_flight.store(self.in_flight, Ordering::Relaxed);
    }
}

async fn sleep_for(duration: Option<Duration>) {
    match duration {
        Some(duration) => tokio::time::sleep(duration).await,
        None => std::future::pending().await,
    }
}
