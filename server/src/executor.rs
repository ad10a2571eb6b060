use std::{
    collections::HashMap,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
    thread::{self, JoinHandle, ThreadId},
    time::{Duration, Instant},
};

use log::{debug, error, trace};
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::ExecutorError;

type Task<S> = Box<dyn FnOnce(&mut S) + Send>;

enum Job<S> {
    Run {
        category: &'static str,
        task: Task<S>,
    },
    Delayed {
        category: &'static str,
        delay: Duration,
        task: Task<S>,
    },
    Flush(oneshot::Sender<()>),
}

/// Time spent in tasks of one category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategoryUsage {
    pub tasks: u64,
    pub busy: Duration,
}

type UsageTable = Arc<Mutex<HashMap<&'static str, CategoryUsage>>>;

/// A single-threaded task queue owning the state `S` of one feature.
///
/// Every task runs on the executor's own thread with exclusive access to the
/// state, in submission order. Submitting never blocks. Delayed tasks are
/// re-enqueued once their delay elapsed, and are dropped together with any
/// pending task on shutdown.
pub struct FeatureExecutor<S: Send + 'static> {
    name: &'static str,
    sender: mpsc::UnboundedSender<Job<S>>,
    cancel: CancellationToken,
    usage: UsageTable,
    thread_id: ThreadId,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl<S: Send + 'static> FeatureExecutor<S> {
    /// Spawns the executor thread, moving `state` onto it
    pub fn new(name: &'static str, state: S) -> Result<Self, ExecutorError> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let usage = UsageTable::default();

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(|source| ExecutorError::Runtime { name, source })?;

        let loop_sender = sender.clone();
        let loop_cancel = cancel.clone();
        let loop_usage = usage.clone();
        let handle = thread::Builder::new()
            .name(format!("tabsync-{name}"))
            .spawn(move || {
                runtime.block_on(run(
                    name,
                    state,
                    receiver,
                    loop_sender,
                    loop_cancel,
                    loop_usage,
                ));
                debug!("Executor {name} stopped");
            })
            .map_err(|source| ExecutorError::Runtime { name, source })?;

        Ok(Self {
            name,
            sender,
            cancel,
            usage,
            thread_id: handle.thread().id(),
            handle: Mutex::new(Some(handle)),
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Queues a task. Tasks submitted after shutdown are dropped.
    pub fn submit(&self, category: &'static str, task: impl FnOnce(&mut S) + Send + 'static) {
        self.enqueue(Job::Run {
            category,
            task: Box::new(task),
        });
    }

    /// Queues a task to run once `delay` elapsed. A zero delay queues it
    /// right away, keeping it ordered with the tasks around it.
    pub fn submit_delayed(
        &self,
        category: &'static str,
        delay: Duration,
        task: impl FnOnce(&mut S) + Send + 'static,
    ) {
        if delay.is_zero() {
            self.submit(category, task);
            return;
        }
        self.enqueue(Job::Delayed {
            category,
            delay,
            task: Box::new(task),
        });
    }

    /// Blocks until every task submitted before this call has run
    pub fn flush(&self) -> Result<(), ExecutorError> {
        if thread::current().id() == self.thread_id {
            return Err(ExecutorError::FlushFromExecutor { name: self.name });
        }
        let (done, wait) = oneshot::channel();
        if self.sender.send(Job::Flush(done)).is_err() {
            return Err(ExecutorError::ShutDown { name: self.name });
        }
        wait.blocking_recv()
            .map_err(|_| ExecutorError::ShutDown { name: self.name })
    }

    /// Runs `query` against the state once every earlier task has run and
    /// blocks for its result
    pub fn query<R: Send + 'static>(
        &self,
        category: &'static str,
        query: impl FnOnce(&mut S) -> R + Send + 'static,
    ) -> Result<R, ExecutorError> {
        if thread::current().id() == self.thread_id {
            return Err(ExecutorError::FlushFromExecutor { name: self.name });
        }
        let (reply, wait) = oneshot::channel();
        self.submit(category, move |state| {
            let _ = reply.send(query(state));
        });
        wait.blocking_recv()
            .map_err(|_| ExecutorError::ShutDown { name: self.name })
    }

    /// Stops the executor. Pending and delayed tasks never run.
    pub fn shutdown(&self) {
        self.cancel.cancel();
        let Some(handle) = self.handle.lock().take() else {
            return;
        };
        if handle.thread().id() == thread::current().id() {
            return;
        }
        if handle.join().is_err() {
            error!("Executor {} thread panicked while stopping", self.name);
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Accumulated time per task category
    pub fn usage(&self) -> Vec<(&'static str, CategoryUsage)> {
        let mut usage: Vec<_> = self
            .usage
            .lock()
            .iter()
            .map(|(category, usage)| (*category, *usage))
            .collect();
        usage.sort_by_key(|(category, _)| *category);
        usage
    }

    fn enqueue(&self, job: Job<S>) {
        if self.cancel.is_cancelled() || self.sender.send(job).is_err() {
            debug!("Executor {} is shut down, dropping task", self.name);
        }
    }
}

impl<S: Send + 'static> Drop for FeatureExecutor<S> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run<S: Send + 'static>(
    name: &'static str,
    mut state: S,
    mut receiver: mpsc::UnboundedReceiver<Job<S>>,
    sender: mpsc::UnboundedSender<Job<S>>,
    cancel: CancellationToken,
    usage: UsageTable,
) {
    loop {
        let job = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            job = receiver.recv() => match job {
                Some(job) => job,
                None => break,
            },
        };

        match job {
            Job::Run { category, task } => execute(name, category, task, &mut state, &usage),
            Job::Delayed {
                category,
                delay,
                task,
            } => {
                let sender = sender.clone();
                let cancel = cancel.clone();
                tokio::spawn(async move {
                    tokio::select! {
                        _ = cancel.cancelled() => {}
                        _ = tokio::time::sleep(delay) => {
                            let _ = sender.send(Job::Run { category, task });
                        }
                    }
                });
            }
            Job::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
}

fn execute<S>(
    name: &'static str,
    category: &'static str,
    task: Task<S>,
    state: &mut S,
    usage: &UsageTable,
) {
    let started = Instant::now();
    let result = panic::catch_unwind(AssertUnwindSafe(|| task(state)));
    let elapsed = started.elapsed();

    if result.is_err() {
        error!("Task {category} of feature {name} panicked");
    }
    trace!("{name}/{category} took {elapsed:?}");

    let mut usage = usage.lock();
    let entry = usage.entry(category).or_default();
    entry.tasks += 1;
    entry.busy += elapsed;
}
