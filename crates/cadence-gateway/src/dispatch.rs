//! Queue-backed job dispatch.
//!
//! Every scheduler handler is wrapped in a [`QueuedHandler`]. When a job
//! fires, the wrapper admits a task into the priority queue and waits; the
//! [`Dispatcher`] worker hands tasks to handlers in score order, serving
//! fresh cached results instead of re-running the work.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use cadence_cache::{ResultCache, SetOptions};
use cadence_queue::{PriorityQueue, Task, TaskResult, TaskSpec};
use cadence_scheduler::{JobContext, JobHandler, JobOutcome};
use tokio::sync::{oneshot, watch, Notify, Semaphore};
use tracing::{debug, info, warn};

/// How often an idle worker re-checks the queue without a wakeup.
const IDLE_POLL: Duration = Duration::from_secs(1);

struct Waiter {
    handler: Arc<dyn JobHandler>,
    ctx: JobContext,
    reply: oneshot::Sender<JobOutcome>,
}

pub struct Dispatcher {
    queue: Arc<PriorityQueue>,
    cache: Arc<ResultCache>,
    /// Keyed by task id. Held across enqueue and dequeue so a task is never
    /// dequeued before its waiter is registered.
    waiters: Mutex<HashMap<String, Waiter>>,
    notify: Notify,
    permits: Arc<Semaphore>,
}

impl Dispatcher {
    pub fn new(queue: Arc<PriorityQueue>, cache: Arc<ResultCache>, workers: usize) -> Arc<Self> {
        Arc::new(Self {
            queue,
            cache,
            waiters: Mutex::new(HashMap::new()),
            notify: Notify::new(),
            permits: Arc::new(Semaphore::new(workers.max(1))),
        })
    }

    /// Wrap `handler` so its executions go through the queue.
    pub fn wrap(self: &Arc<Self>, handler: Arc<dyn JobHandler>) -> Arc<dyn JobHandler> {
        Arc::new(QueuedHandler {
            inner: handler,
            dispatcher: Arc::clone(self),
        })
    }

    /// Admit one execution and wait for its outcome.
    ///
    /// If admission pushes a lower-scored task out of a full queue, that
    /// task's job is answered with an error so it releases its slot.
    pub async fn submit(&self, handler: Arc<dyn JobHandler>, ctx: JobContext) -> JobOutcome {
        let mut spec = TaskSpec::new(ctx.kind)
            .with_target(target_of(&ctx))
            .with_payload(ctx.payload.clone());
        if ctx.manual {
            spec = spec.user_triggered();
        }

        let (tx, rx) = oneshot::channel();
        let task_id = {
            let mut waiters = self.waiters.lock().expect("dispatch waiters poisoned");
            let admission = self.queue.admit(spec).map_err(|e| e.to_string())?;
            if let Some(dropped) = admission.dropped {
                if let Some(waiter) = waiters.remove(&dropped.id) {
                    debug!(task_id = %dropped.id, job = %waiter.ctx.job_name, "waiter released, task dropped");
                    let _ = waiter
                        .reply
                        .send(Err(format!("task {} dropped from a full queue", dropped.id)));
                }
            }
            let task = admission.task;
            waiters.insert(
                task.id.clone(),
                Waiter {
                    handler,
                    ctx,
                    reply: tx,
                },
            );
            task.id
        };
        self.notify.notify_one();

        rx.await
            .unwrap_or_else(|_| Err(format!("task {task_id} cancelled before it ran")))
    }

    /// Drop every pending task. Their waiting jobs fail with "cancelled".
    pub fn cancel_pending(&self) -> usize {
        let mut waiters = self.waiters.lock().expect("dispatch waiters poisoned");
        let mut cancelled = 0;
        for task in self.queue.pending() {
            if self.queue.cancel(&task.id) {
                waiters.remove(&task.id);
                cancelled += 1;
            }
        }
        if cancelled > 0 {
            info!(cancelled, "pending tasks cancelled");
        }
        cancelled
    }

    /// Tasks admitted and not yet handed to a worker.
    pub fn waiting(&self) -> usize {
        self.waiters.lock().expect("dispatch waiters poisoned").len()
    }

    /// Worker loop. Holds one semaphore permit per running task, so pending
    /// tasks stay in the queue (and keep aging) while every worker is busy.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        info!(workers = self.permits.available_permits(), "dispatcher started");
        loop {
            let permit = tokio::select! {
                permit = Arc::clone(&self.permits).acquire_owned() => match permit {
                    Ok(p) => p,
                    Err(_) => break,
                },
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            };

            match self.next() {
                Some((task, waiter)) => {
                    let this = Arc::clone(&self);
                    tokio::spawn(async move {
                        this.serve(task, waiter).await;
                        drop(permit);
                    });
                }
                None => {
                    drop(permit);
                    tokio::select! {
                        _ = self.notify.notified() => {}
                        _ = tokio::time::sleep(IDLE_POLL) => {}
                        _ = shutdown.changed() => {
                            if *shutdown.borrow() {
                                break;
                            }
                        }
                    }
                }
            }
        }
        info!("dispatcher shutting down");
    }

    /// Highest-scored task that still has a waiter.
    fn next(&self) -> Option<(Task, Waiter)> {
        let mut waiters = self.waiters.lock().expect("dispatch waiters poisoned");
        while let Some(task) = self.queue.dequeue() {
            if let Some(waiter) = waiters.remove(&task.id) {
                return Some((task, waiter));
            }
            warn!(task_id = %task.id, kind = %task.spec.kind, "dequeued task has no waiting job");
            let _ = self
                .queue
                .complete_task(&task.id, TaskResult::failed("no waiting job"));
        }
        None
    }

    async fn serve(&self, task: Task, waiter: Waiter) {
        let target = task.spec.target.clone().unwrap_or_default();
        let kind = task.spec.kind.as_str();

        let cached = if waiter.ctx.manual {
            None
        } else {
            self.cache.get(&target, kind)
        };

        let outcome = match cached {
            Some(value) => {
                debug!(task_id = %task.id, %target, kind, "served from cache");
                Ok(serde_json::json!({ "cached": true, "result": value }))
            }
            None => {
                let handler = waiter.handler;
                let ctx = waiter.ctx;
                let outcome = match tokio::spawn(async move { handler.execute(ctx).await }).await {
                    Ok(outcome) => outcome,
                    Err(e) => Err(format!("handler panicked: {e}")),
                };
                if let Ok(value) = &outcome {
                    if let Err(e) = self.cache.set(&target, kind, value, SetOptions::default()) {
                        warn!(task_id = %task.id, %target, kind, "result not cached: {e}");
                    }
                }
                outcome
            }
        };

        let result = match &outcome {
            Ok(value) => TaskResult::ok(value.clone()),
            Err(e) => TaskResult::failed(e.clone()),
        };
        if let Err(e) = self.queue.complete_task(&task.id, result) {
            // Reaped as timed out while the handler was still running.
            debug!(task_id = %task.id, "completion not recorded: {e}");
        }
        let _ = waiter.reply.send(outcome);
    }
}

/// Scheduler-facing handler that routes execution through the queue.
pub struct QueuedHandler {
    inner: Arc<dyn JobHandler>,
    dispatcher: Arc<Dispatcher>,
}

#[async_trait]
impl JobHandler for QueuedHandler {
    async fn execute(&self, ctx: JobContext) -> JobOutcome {
        self.dispatcher.submit(Arc::clone(&self.inner), ctx).await
    }
}

/// Cache id for an execution: an explicit `target` in the payload, else the
/// job name.
fn target_of(ctx: &JobContext) -> String {
    ctx.payload
        .get("target")
        .and_then(serde_json::Value::as_str)
        .unwrap_or(&ctx.job_name)
        .to_string()
}
