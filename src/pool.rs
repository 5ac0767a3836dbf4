// SPDX-License-Identifier: Apache-2.0

//! Supervised worker pool that runs correctness checks on untrusted
//! candidates.
//!
//! Each worker thread owns an oracle built from an `OracleFactory`. The
//! coordinator (the thread calling `run_batch`) feeds jobs through a bounded
//! channel and is the only place counters change. Workers retire after a
//! fixed number of tasks, the whole generation of workers is rebuilt every
//! `restart_every` completions, and a watchdog thread warns when nothing has
//! completed for a while.
//!
//! A batch runs in attempts. When an attempt's deadline passes, its cancel
//! token fires, and only the tasks without a result are resubmitted with a
//! longer timeout. Results that arrive from an older attempt are dropped, so
//! each task is recorded once.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, RecvTimeoutError, SyncSender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::oracle::{
    CancelToken, CorrectnessOracle, OracleError, OracleFactory, OracleReport,
};
use crate::store::Problem;

/// Upper bound on how long any pool thread blocks before looking at its
/// stop flag.
const TICK: Duration = Duration::from_millis(50);

/// How long `Drop` waits for busy workers before detaching them.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub workers: usize,
    /// A worker exits after this many tasks and is replaced.
    pub max_tasks_per_worker: Option<usize>,
    /// Rebuild every worker after this many completed tasks.
    pub restart_every: Option<usize>,
    pub watchdog_window: Duration,
    /// Deadline of the first attempt of a batch.
    pub timeout: Duration,
    pub timeout_growth: f64,
    pub max_retries: usize,
    /// Bound on jobs in flight; defaults to `max(4 * workers, 16)`.
    pub queue_capacity: Option<usize>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: num_cpus::get(),
            max_tasks_per_worker: Some(200),
            restart_every: Some(2000),
            watchdog_window: Duration::from_secs(120),
            timeout: Duration::from_secs(30),
            timeout_growth: 2.0,
            max_retries: 2,
            queue_capacity: None,
        }
    }
}

impl PoolConfig {
    fn capacity(&self) -> usize {
        self.queue_capacity
            .unwrap_or_else(|| std::cmp::max(self.workers * 4, 16))
            .max(1)
    }
}

/// One candidate to check.
#[derive(Debug, Clone)]
pub struct Task {
    pub problem: Arc<Problem>,
    pub candidate: String,
    pub base_only: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TaskResult {
    Report(OracleReport),
    /// The oracle crashed or could not run the candidate.
    Error(String),
    /// No attempt finished before the retries ran out.
    Unresolved,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    /// One entry per submitted task, in submission order.
    pub results: Vec<TaskResult>,
    pub attempts: usize,
    pub unresolved: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub completed: u64,
    pub retired_workers: u64,
    pub restarts: u64,
    /// Attempts that hit their deadline with tasks still incomplete.
    pub timeouts: u64,
    pub watchdog_warnings: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// Every worker failed to build its oracle.
    NoWorkers(String),
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolError::NoWorkers(msg) => write!(f, "PoolError: no live workers: {}", msg),
        }
    }
}

impl std::error::Error for PoolError {}

struct Job {
    batch: u64,
    attempt: usize,
    index: usize,
    task: Task,
    timeout: Duration,
    cancel: CancelToken,
}

struct TaskOutcome {
    batch: u64,
    attempt: usize,
    index: usize,
    result: Result<OracleReport, OracleError>,
}

enum WorkerMessage {
    Done(TaskOutcome),
    Retired(usize),
    StartFailed(usize, OracleError),
}

/// Worker threads sharing one job channel. Replaced wholesale on restart.
struct Generation {
    work_tx: SyncSender<Job>,
    work_rx: Arc<Mutex<Receiver<Job>>>,
    res_tx: SyncSender<WorkerMessage>,
    res_rx: Receiver<WorkerMessage>,
    stop: Arc<AtomicBool>,
    workers: HashMap<usize, JoinHandle<()>>,
}

fn spawn_worker<F: OracleFactory>(
    id: usize,
    factory: Arc<F>,
    work_rx: Arc<Mutex<Receiver<Job>>>,
    res_tx: SyncSender<WorkerMessage>,
    stop: Arc<AtomicBool>,
    max_tasks: Option<usize>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let mut oracle = match factory.create() {
            Ok(oracle) => oracle,
            Err(e) => {
                let _ = res_tx.send(WorkerMessage::StartFailed(id, e));
                return;
            }
        };
        let mut handled = 0usize;
        loop {
            if stop.load(Ordering::Relaxed) {
                break;
            }
            let job = {
                let rx = match work_rx.lock() {
                    Ok(rx) => rx,
                    Err(_) => break,
                };
                rx.recv_timeout(TICK)
            };
            let job = match job {
                Ok(job) => job,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            };
            let result = if job.cancel.is_cancelled() {
                Err(OracleError::Cancelled)
            } else {
                oracle.check(
                    &job.task.problem,
                    &job.task.candidate,
                    job.task.base_only,
                    job.timeout,
                    &job.cancel,
                )
            };
            handled += 1;
            let outcome = TaskOutcome {
                batch: job.batch,
                attempt: job.attempt,
                index: job.index,
                result,
            };
            if res_tx.send(WorkerMessage::Done(outcome)).is_err() {
                break;
            }
            if max_tasks.is_some_and(|max| handled >= max) {
                let _ = res_tx.send(WorkerMessage::Retired(id));
                break;
            }
        }
    })
}

struct Watchdog {
    started: Instant,
    last_progress_ms: AtomicU64,
    busy: AtomicBool,
    stop: AtomicBool,
    warnings: AtomicU64,
}

impl Watchdog {
    fn now_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    fn progress(&self) {
        self.last_progress_ms.store(self.now_ms(), Ordering::Relaxed);
    }

    fn run(&self, window: Duration) {
        let window_ms = window.as_millis() as u64;
        let tick = std::cmp::min(TICK, window / 2).max(Duration::from_millis(1));
        let mut warned_at = None;
        while !self.stop.load(Ordering::Relaxed) {
            std::thread::sleep(tick);
            if !self.busy.load(Ordering::Relaxed) {
                continue;
            }
            let last = self.last_progress_ms.load(Ordering::Relaxed);
            let idle = self.now_ms().saturating_sub(last);
            if idle >= window_ms && warned_at != Some(last) {
                log::warn!(
                    "worker pool: no task completed in the last {:?}",
                    Duration::from_millis(idle)
                );
                self.warnings.fetch_add(1, Ordering::Relaxed);
                warned_at = Some(last);
            }
        }
    }
}

pub struct SupervisedPool<F: OracleFactory> {
    factory: Arc<F>,
    config: PoolConfig,
    generation: Option<Generation>,
    next_worker_id: usize,
    next_batch: u64,
    inflight: usize,
    since_restart: usize,
    stats: PoolStats,
    watchdog: Arc<Watchdog>,
    watchdog_handle: Option<JoinHandle<()>>,
}

impl<F: OracleFactory> SupervisedPool<F> {
    pub fn new(factory: F, mut config: PoolConfig) -> Self {
        config.workers = config.workers.max(1);
        let watchdog = Arc::new(Watchdog {
            started: Instant::now(),
            last_progress_ms: AtomicU64::new(0),
            busy: AtomicBool::new(false),
            stop: AtomicBool::new(false),
            warnings: AtomicU64::new(0),
        });
        let watchdog_handle = {
            let watchdog = watchdog.clone();
            let window = config.watchdog_window;
            std::thread::spawn(move || watchdog.run(window))
        };
        let mut pool = Self {
            factory: Arc::new(factory),
            config,
            generation: None,
            next_worker_id: 0,
            next_batch: 0,
            inflight: 0,
            since_restart: 0,
            stats: PoolStats::default(),
            watchdog,
            watchdog_handle: Some(watchdog_handle),
        };
        pool.generation = Some(pool.new_generation());
        pool
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            watchdog_warnings: self.watchdog.warnings.load(Ordering::Relaxed),
            ..self.stats
        }
    }

    fn new_generation(&mut self) -> Generation {
        let capacity = self.config.capacity();
        let (work_tx, work_rx) = sync_channel::<Job>(capacity);
        let (res_tx, res_rx) = sync_channel::<WorkerMessage>(capacity + self.config.workers * 2);
        let mut generation = Generation {
            work_tx,
            work_rx: Arc::new(Mutex::new(work_rx)),
            res_tx,
            res_rx,
            stop: Arc::new(AtomicBool::new(false)),
            workers: HashMap::new(),
        };
        for _ in 0..self.config.workers {
            self.add_worker(&mut generation);
        }
        generation
    }

    fn add_worker(&mut self, generation: &mut Generation) {
        let id = self.next_worker_id;
        self.next_worker_id += 1;
        let handle = spawn_worker(
            id,
            self.factory.clone(),
            generation.work_rx.clone(),
            generation.res_tx.clone(),
            generation.stop.clone(),
            self.config.max_tasks_per_worker,
        );
        generation.workers.insert(id, handle);
    }

    fn restart_due(&self) -> bool {
        self.config
            .restart_every
            .is_some_and(|every| self.since_restart >= every)
    }

    /// Only called with nothing in flight, so every worker is idle.
    fn restart(&mut self) {
        log::info!(
            "worker pool: restarting {} workers after {} completed tasks",
            self.config.workers,
            self.since_restart
        );
        if let Some(old) = self.generation.take() {
            shutdown(old, SHUTDOWN_GRACE);
        }
        self.generation = Some(self.new_generation());
        self.since_restart = 0;
        self.stats.restarts += 1;
    }

    /// Checks every task and returns one result per task.
    pub fn run_batch(&mut self, tasks: Vec<Task>) -> Result<BatchReport, PoolError> {
        self.watchdog.progress();
        self.watchdog.busy.store(true, Ordering::Relaxed);
        let report = self.run_attempts(tasks);
        self.watchdog.busy.store(false, Ordering::Relaxed);
        report
    }

    fn run_attempts(&mut self, tasks: Vec<Task>) -> Result<BatchReport, PoolError> {
        let batch = self.next_batch;
        self.next_batch += 1;
        let capacity = self.config.capacity();
        let mut results: Vec<Option<TaskResult>> = vec![None; tasks.len()];
        let mut timeout = self.config.timeout;
        let mut attempts = 0;

        for attempt in 0..=self.config.max_retries {
            let todo: Vec<usize> = (0..tasks.len()).filter(|&i| results[i].is_none()).collect();
            if todo.is_empty() {
                break;
            }
            attempts += 1;
            log::debug!(
                "worker pool: batch {} attempt {}: {} tasks, timeout {:?}",
                batch,
                attempt,
                todo.len(),
                timeout
            );
            let cancel = CancelToken::new();
            let deadline = Instant::now() + timeout;
            let mut unsent = todo.iter().copied().peekable();
            let mut outstanding = todo.len();
            let mut restart_pending = self.restart_due();

            while outstanding > 0 {
                if restart_pending && self.inflight == 0 {
                    self.restart();
                    restart_pending = false;
                }
                if !restart_pending {
                    while self.inflight < capacity {
                        let Some(&index) = unsent.peek() else {
                            break;
                        };
                        let job = Job {
                            batch,
                            attempt,
                            index,
                            task: tasks[index].clone(),
                            timeout,
                            cancel: cancel.clone(),
                        };
                        let Some(generation) = self.generation.as_ref() else {
                            break;
                        };
                        if generation.work_tx.send(job).is_err() {
                            break;
                        }
                        unsent.next();
                        self.inflight += 1;
                    }
                }

                let now = Instant::now();
                if now >= deadline {
                    break;
                }
                let wait = std::cmp::min(deadline - now, TICK);
                let message = match self.generation.as_ref() {
                    Some(generation) => generation.res_rx.recv_timeout(wait),
                    None => Err(RecvTimeoutError::Disconnected),
                };
                match message {
                    Ok(WorkerMessage::Done(outcome)) => {
                        self.inflight = self.inflight.saturating_sub(1);
                        self.since_restart += 1;
                        self.stats.completed += 1;
                        self.watchdog.progress();
                        if self.restart_due() {
                            restart_pending = true;
                        }
                        if outcome.batch != batch || outcome.attempt != attempt {
                            continue;
                        }
                        outstanding -= 1;
                        let slot = &mut results[outcome.index];
                        match outcome.result {
                            Ok(report) => *slot = Some(TaskResult::Report(report)),
                            Err(OracleError::Timeout) | Err(OracleError::Cancelled) => {}
                            Err(e) => {
                                log::error!("oracle failed on task {}: {}", outcome.index, e);
                                *slot = Some(TaskResult::Error(e.to_string()));
                            }
                        }
                    }
                    Ok(WorkerMessage::Retired(id)) => {
                        self.stats.retired_workers += 1;
                        if let Some(mut generation) = self.generation.take() {
                            if let Some(handle) = generation.workers.remove(&id) {
                                let _ = handle.join();
                            }
                            self.add_worker(&mut generation);
                            self.generation = Some(generation);
                        }
                    }
                    Ok(WorkerMessage::StartFailed(id, e)) => {
                        log::error!("worker {} could not build its oracle: {}", id, e);
                        let live = match self.generation.as_mut() {
                            Some(generation) => {
                                if let Some(handle) = generation.workers.remove(&id) {
                                    let _ = handle.join();
                                }
                                generation.workers.len()
                            }
                            None => 0,
                        };
                        if live == 0 {
                            cancel.cancel();
                            return Err(PoolError::NoWorkers(e.to_string()));
                        }
                    }
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => {
                        return Err(PoolError::NoWorkers("result channel closed".to_string()));
                    }
                }
            }

            cancel.cancel();
            let incomplete = results.iter().filter(|r| r.is_none()).count();
            if incomplete > 0 {
                self.stats.timeouts += 1;
                if attempt < self.config.max_retries {
                    timeout = timeout.mul_f64(self.config.timeout_growth.max(1.0));
                    log::warn!(
                        "worker pool: {} of {} tasks incomplete after attempt {}; retrying with timeout {:?}",
                        incomplete,
                        tasks.len(),
                        attempt,
                        timeout
                    );
                } else {
                    log::warn!(
                        "worker pool: {} of {} tasks unresolved after {} attempts",
                        incomplete,
                        tasks.len(),
                        attempt + 1
                    );
                }
            }
        }

        let results: Vec<TaskResult> = results
            .into_iter()
            .map(|r| r.unwrap_or(TaskResult::Unresolved))
            .collect();
        let unresolved = results
            .iter()
            .filter(|r| **r == TaskResult::Unresolved)
            .count();
        Ok(BatchReport {
            results,
            attempts,
            unresolved,
        })
    }
}

/// Stops a generation's workers. Workers still inside a check after `grace`
/// are detached.
fn shutdown(generation: Generation, grace: Duration) {
    let Generation {
        work_tx,
        res_rx,
        stop,
        workers,
        ..
    } = generation;
    stop.store(true, Ordering::Relaxed);
    drop(work_tx);
    // Pending sends from workers fail instead of blocking.
    drop(res_rx);
    let until = Instant::now() + grace;
    for (id, handle) in workers {
        while !handle.is_finished() && Instant::now() < until {
            std::thread::sleep(Duration::from_millis(5));
        }
        if handle.is_finished() {
            let _ = handle.join();
        } else {
            log::warn!("worker {} did not stop; detaching it", id);
        }
    }
}

impl<F: OracleFactory> Drop for SupervisedPool<F> {
    fn drop(&mut self) {
        if let Some(generation) = self.generation.take() {
            shutdown(generation, SHUTDOWN_GRACE);
        }
        self.watchdog.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.watchdog_handle.take() {
            let _ = handle.join();
        }
    }
}
