// src/core/sequencer.rs — Timed single and two-step deliveries
//
// Every delivery runs as its own tokio task keyed by a SequenceId. The caller
// gets a handle back immediately; the text reaches the terminal only after the
// requested delay, once the calling agent has finished its turn.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::oneshot;
use tokio::time::Instant;

use super::clock::Clock;
use super::types::SequenceId;
use crate::injector::{InjectionError, TerminalInjector};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Primary,
    FollowUp,
}

impl StepKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::FollowUp => "follow_up",
        }
    }
}

/// One line to type and submit.
#[derive(Debug, Clone)]
pub struct DeliveryStep {
    pub kind: StepKind,
    pub text: String,
    /// Wait before this step. For the follow-up it counts from the moment the
    /// primary step finished.
    pub delay: Duration,
}

/// What happened to one step, handed to the observer before the next step.
#[derive(Debug, Clone)]
pub struct StepReport {
    pub sequence_id: SequenceId,
    pub kind: StepKind,
    pub text: String,
    pub result: Result<(), InjectionError>,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepVerdict {
    Continue,
    Halt(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SequenceOutcome {
    Delivered,
    /// The primary step failed; nothing reached the terminal.
    Failed(InjectionError),
    /// The primary landed, the follow-up did not.
    PartialFailure(InjectionError),
    /// The observer stopped the sequence after `after`.
    Halted { after: StepKind, reason: String },
    /// Stopped while waiting for the next step. `completed` steps landed and
    /// were reported.
    Cancelled { completed: usize },
}

/// Receives each completed step as it happens. `on_step` is awaited before
/// the sequence moves on, so anything it persists is durable before the next
/// keystroke.
#[async_trait]
pub trait StepObserver: Send + Sync {
    async fn on_step(&self, report: &StepReport) -> StepVerdict;

    /// Called exactly once per sequence, including cancelled ones.
    fn on_finish(&self, _id: SequenceId, _outcome: &SequenceOutcome) {}
}

/// Returned as soon as a sequence is scheduled.
pub struct SequenceHandle {
    pub id: SequenceId,
    rx: oneshot::Receiver<SequenceOutcome>,
}

impl SequenceHandle {
    pub async fn outcome(self) -> SequenceOutcome {
        self.rx
            .await
            .unwrap_or(SequenceOutcome::Cancelled { completed: 0 })
    }
}

/// Schedules deliveries and owns exclusive use of the injector.
pub struct InjectionSequencer {
    injector: Arc<dyn TerminalInjector>,
    clock: Arc<dyn Clock>,
    submit_gap: Duration,
    lane: Arc<tokio::sync::Mutex<()>>,
    pending: Arc<Mutex<HashMap<SequenceId, oneshot::Sender<()>>>>,
    next_id: AtomicU64,
}

impl InjectionSequencer {
    pub fn new(
        injector: Arc<dyn TerminalInjector>,
        clock: Arc<dyn Clock>,
        submit_gap: Duration,
    ) -> Self {
        Self {
            injector,
            clock,
            submit_gap,
            lane: Arc::new(tokio::sync::Mutex::new(())),
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn next_id(&self) -> SequenceId {
        SequenceId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    pub fn injector(&self) -> &Arc<dyn TerminalInjector> {
        &self.injector
    }

    /// Type and submit `text` after `delay`.
    pub fn deliver_single(
        &self,
        id: SequenceId,
        text: impl Into<String>,
        delay: Duration,
        observer: Arc<dyn StepObserver>,
    ) -> SequenceHandle {
        let steps = vec![DeliveryStep {
            kind: StepKind::Primary,
            text: text.into(),
            delay,
        }];
        self.schedule(id, steps, observer)
    }

    /// Deliver `primary` after `delay`, then `follow_up` once `follow_up_delay`
    /// has passed since the primary finished.
    pub fn deliver_two_step(
        &self,
        id: SequenceId,
        primary: impl Into<String>,
        follow_up: impl Into<String>,
        delay: Duration,
        follow_up_delay: Duration,
        observer: Arc<dyn StepObserver>,
    ) -> SequenceHandle {
        let steps = vec![
            DeliveryStep {
                kind: StepKind::Primary,
                text: primary.into(),
                delay,
            },
            DeliveryStep {
                kind: StepKind::FollowUp,
                text: follow_up.into(),
                delay: follow_up_delay,
            },
        ];
        self.schedule(id, steps, observer)
    }

    fn schedule(
        &self,
        id: SequenceId,
        steps: Vec<DeliveryStep>,
        observer: Arc<dyn StepObserver>,
    ) -> SequenceHandle {
        let (done_tx, done_rx) = oneshot::channel();
        let (cancel_tx, cancel_rx) = oneshot::channel();
        self.pending
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(id, cancel_tx);

        let run = SequenceRun {
            id,
            injector: self.injector.clone(),
            clock: self.clock.clone(),
            submit_gap: self.submit_gap,
            lane: self.lane.clone(),
            observer: observer.clone(),
        };
        let pending = self.pending.clone();

        tokio::spawn(async move {
            let outcome = run.execute(steps, cancel_rx).await;
            pending
                .lock()
                .unwrap_or_else(|p| p.into_inner())
                .remove(&id);
            match &outcome {
                SequenceOutcome::Delivered => tracing::debug!("{} delivered", id),
                other => tracing::warn!("{} ended: {:?}", id, other),
            }
            observer.on_finish(id, &outcome);
            let _ = done_tx.send(outcome);
        });

        tracing::debug!("Scheduled {}", id);
        SequenceHandle { id, rx: done_rx }
    }

    /// Stop every scheduled sequence at its next wait. A step already being
    /// typed finishes and is reported first. Used on shutdown.
    pub fn cancel_all(&self) -> usize {
        let senders: Vec<_> = self
            .pending
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .drain()
            .map(|(_, tx)| tx)
            .collect();
        senders
            .into_iter()
            .map(|tx| tx.send(()))
            .filter(Result::is_ok)
            .count()
    }
}

struct SequenceRun {
    id: SequenceId,
    injector: Arc<dyn TerminalInjector>,
    clock: Arc<dyn Clock>,
    submit_gap: Duration,
    lane: Arc<tokio::sync::Mutex<()>>,
    observer: Arc<dyn StepObserver>,
}

impl SequenceRun {
    /// Cancellation only lands between steps: typing, submit and the
    /// observer's commit for a started step always run to the end.
    async fn execute(
        &self,
        steps: Vec<DeliveryStep>,
        mut cancel: oneshot::Receiver<()>,
    ) -> SequenceOutcome {
        let mut anchor = Instant::now();
        let mut completed = 0;
        for step in steps {
            tokio::select! {
                biased;
                _ = &mut cancel => return SequenceOutcome::Cancelled { completed },
                _ = tokio::time::sleep_until(anchor + step.delay) => {}
            }

            let result = self.send(&step.text).await;
            anchor = Instant::now();
            completed += 1;

            let report = StepReport {
                sequence_id: self.id,
                kind: step.kind,
                text: step.text,
                result: result.clone(),
                completed_at: self.clock.now(),
            };
            let verdict = self.observer.on_step(&report).await;

            if let Err(e) = result {
                return match step.kind {
                    StepKind::Primary => SequenceOutcome::Failed(e),
                    StepKind::FollowUp => SequenceOutcome::PartialFailure(e),
                };
            }
            if let StepVerdict::Halt(reason) = verdict {
                return SequenceOutcome::Halted {
                    after: step.kind,
                    reason,
                };
            }
        }
        SequenceOutcome::Delivered
    }

    async fn send(&self, text: &str) -> Result<(), InjectionError> {
        let _lane = self.lane.lock().await;
        self.injector.type_text(text).await?;
        tokio::time::sleep(self.submit_gap).await;
        self.injector.submit().await
    }
}
