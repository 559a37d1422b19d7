//! Incoming job queue: strictly serialized translation of foreign messages.
//! One drain loop at a time; jobs run FIFO and each job's translate + detect
//! calls settle before its rewrite is dispatched and the next job starts.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::host::HostEvents;
use crate::lifecycle::{Lifecycle, LivenessGuard};
use crate::message::Message;
use crate::metrics::{metric_names, MetricsRegistry};
use crate::policy::ChannelPolicy;
use crate::render::{self, SkipReason};
use crate::runtime;
use crate::translate::detect::LanguageDetector;
use crate::translate::TranslationClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainState {
    Idle,
    Draining,
}

/// A foreign-incoming message waiting for translation.
#[derive(Debug, Clone)]
pub struct TranslationJob {
    pub id: Uuid,
    pub message: Message,
    pub channel_id: String,
    pub target_language: String,
    pub enqueued_at: Instant,
    /// Lifecycle generation that admitted the job; stamped by `enqueue`.
    pub generation: u64,
}

impl TranslationJob {
    pub fn new(message: Message, target_language: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            channel_id: message.channel_id.clone(),
            message,
            target_language: target_language.into(),
            enqueued_at: Instant::now(),
            generation: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// Not translatable; re-emitted unchanged.
    Skipped(SkipReason),
    /// Translation empty or identical; re-emitted unchanged.
    Unchanged,
    Translated { detected: String },
    /// Deactivated while the remote calls were in flight; nothing dispatched.
    Abandoned,
}

/// Turns one job into host rewrites.
pub struct JobProcessor {
    translator: Arc<TranslationClient>,
    detector: Arc<LanguageDetector>,
    policy: Arc<ChannelPolicy>,
    host: Arc<dyn HostEvents>,
    metrics: Arc<MetricsRegistry>,
}

impl JobProcessor {
    pub fn new(
        translator: Arc<TranslationClient>,
        detector: Arc<LanguageDetector>,
        policy: Arc<ChannelPolicy>,
        host: Arc<dyn HostEvents>,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self {
            translator,
            detector,
            policy,
            host,
            metrics,
        }
    }

    pub async fn process(&self, job: &TranslationJob, guard: &LivenessGuard) -> JobOutcome {
        let message = &job.message;

        if let Some(reason) = render::skip_reason(message) {
            debug!(job_id = %job.id, ?reason, "job skipped");
            self.host.dispatch_update(message.clone());
            return JobOutcome::Skipped(reason);
        }

        self.host
            .dispatch_update(message.with_content(render::pending(&message.content)));

        let remote = async {
            tokio::join!(
                self.translator.translate(&message.content, &job.target_language),
                self.detector.detect_language(&message.content),
            )
        };
        let (translated, detected) = tokio::select! {
            biased;
            _ = guard.token().cancelled() => {
                info!(job_id = %job.id, "job cancelled while remote calls were in flight");
                return JobOutcome::Abandoned;
            }
            pair = remote => pair,
        };

        if !guard.should_continue() {
            info!(job_id = %job.id, "job result discarded after deactivation");
            return JobOutcome::Abandoned;
        }

        if translated.trim().is_empty() || render::same_text(&translated, &message.content) {
            self.host.dispatch_update(message.clone());
            return JobOutcome::Unchanged;
        }

        self.policy.remember_language(&job.channel_id, &detected);
        self.host.dispatch_update(message.with_content(render::incoming(
            &message.content,
            &detected,
            &translated,
            &job.target_language,
        )));
        JobOutcome::Translated { detected }
    }
}

struct QueueInner {
    jobs: VecDeque<TranslationJob>,
    state: DrainState,
}

pub struct IncomingQueue {
    inner: Mutex<QueueInner>,
    processor: JobProcessor,
    lifecycle: Arc<Lifecycle>,
    metrics: Arc<MetricsRegistry>,
    state_tx: watch::Sender<DrainState>,
    runtime: Option<Handle>,
}

impl IncomingQueue {
    /// Captures the current Tokio runtime, if any, so `enqueue` also works
    /// from host threads outside it.
    pub fn new(
        processor: JobProcessor,
        lifecycle: Arc<Lifecycle>,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        let (state_tx, _) = watch::channel(DrainState::Idle);
        Self {
            runtime: Handle::try_current().ok(),
            inner: Mutex::new(QueueInner {
                jobs: VecDeque::new(),
                state: DrainState::Idle,
            }),
            processor,
            lifecycle,
            metrics,
            state_tx,
        }
    }

    /// Append a job and start a drain loop if none is running. Without a
    /// runtime in scope or captured at construction the job is dropped.
    pub fn enqueue(self: &Arc<Self>, mut job: TranslationJob) {
        let guard = self.lifecycle.guard();
        if !guard.should_continue() {
            debug!(job_id = %job.id, "queue inactive, job dropped");
            return;
        }
        let Some(handle) = runtime::resolve(self.runtime.as_ref()) else {
            warn!(job_id = %job.id, "no tokio runtime available, job dropped");
            return;
        };
        job.generation = guard.my_generation();

        let start_drain = {
            let mut inner = self.inner.lock();
            inner.jobs.push_back(job);
            if inner.state == DrainState::Idle {
                self.set_state(&mut inner, DrainState::Draining);
                true
            } else {
                false
            }
        };

        if start_drain {
            let queue = Arc::clone(self);
            handle.spawn(async move { queue.drain(guard).await });
        }
    }

    /// Only ever one instance running: entered solely via the Idle→Draining
    /// transition in `enqueue`, and leaves through Draining→Idle under the
    /// same lock that admits new jobs. A restart while draining hands the
    /// loop over to the new generation; jobs from older generations are
    /// dropped.
    async fn drain(&self, mut guard: LivenessGuard) {
        debug!("drain started");
        loop {
            let next = {
                let mut inner = self.inner.lock();
                if !guard.should_continue() && self.lifecycle.is_active() {
                    guard = self.lifecycle.guard();
                    let generation = guard.my_generation();
                    let before = inner.jobs.len();
                    inner.jobs.retain(|job| job.generation == generation);
                    info!(
                        generation,
                        stale = before - inner.jobs.len(),
                        "drain resumed after reactivation"
                    );
                    continue;
                }
                if !guard.should_continue() {
                    let dropped = inner.jobs.len();
                    inner.jobs.clear();
                    self.set_state(&mut inner, DrainState::Idle);
                    if dropped > 0 {
                        warn!(dropped, "queue aborted after deactivation");
                    }
                    None
                } else {
                    match inner.jobs.pop_front() {
                        Some(job) => Some(job),
                        None => {
                            self.set_state(&mut inner, DrainState::Idle);
                            None
                        }
                    }
                }
            };

            let Some(job) = next else { break };

            let wait_ms = job.enqueued_at.elapsed().as_secs_f64() * 1000.0;
            self.metrics.record(metric_names::QUEUE_WAIT, wait_ms);

            let span = self.metrics.span(metric_names::JOB_DONE);
            let outcome = self.processor.process(&job, &guard).await;
            let elapsed_ms = span.finish();
            debug!(
                job_id = %job.id,
                channel_id = %job.channel_id,
                ?outcome,
                elapsed_ms,
                "job finished"
            );
        }
        debug!("drain finished");
    }

    /// Watchers observe transitions in the same order as the lock admits them.
    fn set_state(&self, inner: &mut QueueInner, state: DrainState) {
        inner.state = state;
        self.state_tx.send_replace(state);
    }

    pub fn state(&self) -> DrainState {
        self.inner.lock().state
    }

    pub fn len(&self) -> usize {
        self.inner.lock().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop queued jobs. A running drain finishes its current job only.
    pub fn clear(&self) {
        self.inner.lock().jobs.clear();
    }

    /// Resolves once no drain loop is running.
    pub async fn wait_idle(&self) {
        let mut rx = self.state_tx.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx.wait_for(|state| *state == DrainState::Idle).await;
    }
}
