// src/core/governor.rs — The tool-facing governor
//
// Owns the session, registry, guardrails, sequencer and audit strategy.
// Decisions are made synchronously under the session lock; deliveries run as
// sequencer tasks that report back through `SequenceRecorder`.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use super::clock::{Clock, SystemClock};
use super::guardrails::GuardrailEngine;
use super::sequencer::{
    InjectionSequencer, SequenceHandle, SequenceOutcome, StepKind, StepObserver, StepReport,
    StepVerdict,
};
use super::session::SessionState;
use super::types::*;
use crate::audit::{self, AuditOutcome, AuditRecord, AuditStrategy};
use crate::infra::config::{Config, InjectorKind};
use crate::infra::errors::VelleError;
use crate::injector::{self, TerminalInjector};
use crate::registry::{
    normalize, Classification, CommandRegistry, CommandSummary, OverrideRequest,
};
use crate::util::preview;

const PREVIEW_CHARS: usize = 100;

/// Note attached to configure requests for limits that only the startup
/// config can change.
pub const STARTUP_ONLY_NOTE: &str = "startup_only: edit velle.toml and restart to change";

struct Inner {
    config: Config,
    guardrails: GuardrailEngine,
    session: Mutex<SessionState>,
    registry: Mutex<CommandRegistry>,
    sequencer: InjectionSequencer,
    audit: Arc<dyn AuditStrategy>,
    clock: Arc<dyn Clock>,
}

impl Inner {
    fn session(&self) -> MutexGuard<'_, SessionState> {
        self.session.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn registry(&self) -> MutexGuard<'_, CommandRegistry> {
        self.registry.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn budget_remaining(&self) -> Option<f64> {
        self.session().budget_remaining(self.guardrails.budget_usd)
    }

    fn record(
        &self,
        tool: &str,
        turn: u32,
        payload: impl Into<String>,
        outcome: &str,
    ) -> AuditRecord {
        let session_id = self.session().session_id.clone();
        AuditRecord::new(self.clock.now(), &session_id, tool, turn, payload, outcome)
    }

    /// Audit a refusal and hand back the error the caller should see.
    async fn refuse(&self, record: AuditRecord, err: ToolError) -> ToolError {
        let record = record
            .with_error_code(err.code())
            .as_decision();
        match self.audit.record(&record).await {
            Ok(_) => {
                if err.is_policy_denial() {
                    tracing::info!("{} denied: {}", record.tool, err.code());
                } else {
                    tracing::warn!("{} rejected: {}", record.tool, err);
                }
                err
            }
            Err(e) => ToolError::AuditUnavailable {
                message: e.to_string(),
            },
        }
    }
}

/// Handle to one permitted delivery: the immediate acknowledgement plus a way
/// to await the final result.
pub struct Dispatch<A> {
    ack: A,
    handle: SequenceHandle,
    recorder: Arc<SequenceRecorder>,
}

impl<A> Dispatch<A> {
    pub fn ack(&self) -> &A {
        &self.ack
    }

    pub fn sequence_id(&self) -> SequenceId {
        self.handle.id
    }

    /// Keep only the acknowledgement. The delivery carries on and still
    /// updates the session and audit trail.
    pub fn into_ack(self) -> A {
        self.ack
    }

    /// Wait for the sequence to finish.
    pub async fn wait(self) -> Result<DeliveryReceipt, ToolError> {
        let id = self.handle.id;
        let outcome = self.handle.outcome().await;
        self.recorder.result(id, outcome)
    }
}

/// Commits session and audit state for one sequence as its steps complete.
struct SequenceRecorder {
    inner: Arc<Inner>,
    tool: &'static str,
    reason: Option<String>,
    state: Mutex<RecorderState>,
}

#[derive(Default)]
struct RecorderState {
    turn: Option<u32>,
    degraded: bool,
}

impl SequenceRecorder {
    fn state(&self) -> MutexGuard<'_, RecorderState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn result(
        &self,
        id: SequenceId,
        outcome: SequenceOutcome,
    ) -> Result<DeliveryReceipt, ToolError> {
        match outcome {
            SequenceOutcome::Delivered => {
                let (turn, degraded) = {
                    let st = self.state();
                    (st.turn, st.degraded)
                };
                let inner = &self.inner;
                let turn_count = turn.unwrap_or_else(|| inner.session().turn_count);
                Ok(DeliveryReceipt {
                    status: "delivered",
                    sequence_id: id,
                    turn_count,
                    turn_limit: inner.guardrails.turn_limit,
                    budget_remaining: inner.budget_remaining(),
                    audit: if degraded {
                        AuditOutcome::Degraded.as_str()
                    } else {
                        AuditOutcome::Ok.as_str()
                    },
                    timestamp: inner.clock.now().to_rfc3339(),
                })
            }
            other => Err(outcome_error(&other).unwrap_or(ToolError::InjectionFailed {
                message: "sequence ended without delivering".into(),
            })),
        }
    }
}

fn outcome_error(outcome: &SequenceOutcome) -> Option<ToolError> {
    match outcome {
        SequenceOutcome::Delivered => None,
        SequenceOutcome::Failed(e) => Some(ToolError::InjectionFailed {
            message: e.to_string(),
        }),
        SequenceOutcome::PartialFailure(e) => Some(ToolError::FollowUpFailed {
            message: e.to_string(),
        }),
        SequenceOutcome::Halted { after, reason } => Some(ToolError::AuditUnavailable {
            message: format!("stopped after {} step: {}", after.as_str(), reason),
        }),
        SequenceOutcome::Cancelled { completed: 0 } => Some(ToolError::InjectionFailed {
            message: "cancelled before delivery".into(),
        }),
        SequenceOutcome::Cancelled { completed } => Some(ToolError::FollowUpFailed {
            message: format!("cancelled after {completed} step(s)"),
        }),
    }
}

#[async_trait]
impl StepObserver for SequenceRecorder {
    async fn on_step(&self, report: &StepReport) -> StepVerdict {
        let inner = &self.inner;
        let (turn, outcome, error_code) = match (report.kind, &report.result) {
            (StepKind::Primary, Ok(())) => {
                let mut session = inner.session();
                let turn = session.turn_count + 1;
                session.record_delivery(
                    report.completed_at,
                    PromptLogEntry {
                        turn,
                        sequence_id: report.sequence_id,
                        tool: self.tool.to_string(),
                        text_preview: preview(&report.text, PREVIEW_CHARS),
                        reason: self.reason.clone(),
                        timestamp: report.completed_at,
                    },
                );
                drop(session);
                self.state().turn = Some(turn);
                (turn, "injected", None)
            }
            (StepKind::Primary, Err(_)) => {
                let mut session = inner.session();
                session.refund(inner.guardrails.cost_per_turn_usd);
                (session.turn_count, "injection_failed", Some("INJECTION_FAILED"))
            }
            (StepKind::FollowUp, result) => {
                let turn = self
                    .state()
                    .turn
                    .unwrap_or_else(|| inner.session().turn_count);
                match result {
                    Ok(()) => (turn, "follow_up_injected", None),
                    Err(_) => (turn, "follow_up_failed", Some("FOLLOW_UP_FAILED")),
                }
            }
        };

        let mut record = inner
            .record(self.tool, turn, report.text.clone(), outcome)
            .with_reason(self.reason.clone())
            .with_step(report.sequence_id, report.kind.as_str());
        if let Some(code) = error_code {
            record = record.with_error_code(code);
        }

        match inner.audit.record(&record).await {
            Ok(AuditOutcome::Ok) => StepVerdict::Continue,
            Ok(AuditOutcome::Degraded) => {
                self.state().degraded = true;
                StepVerdict::Continue
            }
            Err(e) => {
                tracing::error!(
                    "{} {} step not audited: {}",
                    report.sequence_id,
                    report.kind.as_str(),
                    e
                );
                StepVerdict::Halt(e.to_string())
            }
        }
    }

    fn on_finish(&self, id: SequenceId, outcome: &SequenceOutcome) {
        let inner = &self.inner;
        let mut session = inner.session();
        session.finish(id);
        if let SequenceOutcome::Cancelled { completed: 0 } = outcome {
            // Nothing reached the terminal.
            session.refund(inner.guardrails.cost_per_turn_usd);
        }
        let err = outcome_error(outcome);
        session.last_outcome = Some(LastOutcome {
            sequence_id: id,
            status: if err.is_none() { "delivered" } else { "error" },
            error_code: err.as_ref().map(|e| e.code()),
            message: err.map(|e| e.to_string()),
            finished_at: inner.clock.now().to_rfc3339(),
        });
    }
}

/// Cheaply cloneable handle to the governor.
#[derive(Clone)]
pub struct Governor {
    inner: Arc<Inner>,
}

impl Governor {
    pub fn new(
        config: Config,
        injector: Arc<dyn TerminalInjector>,
        audit: Arc<dyn AuditStrategy>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let guardrails = GuardrailEngine::from_config(&config.limits);
        let registry = CommandRegistry::from_config(&config.commands);
        let session = SessionState::new(clock.now(), config.delivery.prompts_log_size);
        let sequencer = InjectionSequencer::new(
            injector,
            clock.clone(),
            Duration::from_millis(config.delivery.submit_gap_ms),
        );
        tracing::info!(
            "Governor ready: session {}, turn limit {}, cooldown {}ms, budget ${:.2}",
            session.session_id,
            guardrails.turn_limit,
            guardrails.cooldown_ms,
            guardrails.budget_usd
        );
        Self {
            inner: Arc::new(Inner {
                config,
                guardrails,
                session: Mutex::new(session),
                registry: Mutex::new(registry),
                sequencer,
                audit,
                clock,
            }),
        }
    }

    /// Production wiring: injector and audit strategy from config, system clock.
    pub fn from_config(mut config: Config, dry_run: bool) -> Result<Self, VelleError> {
        if dry_run {
            config.injector.kind = InjectorKind::DryRun;
        }
        config.validate()?;
        let injector = injector::build_injector(&config.injector)?;
        let audit = audit::build_strategy(&config.audit)?;
        Ok(Self::new(config, injector, audit, Arc::new(SystemClock)))
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn session_id(&self) -> String {
        self.inner.session().session_id.clone()
    }

    /// Currently allowed commands, for the tool descriptions.
    pub fn command_catalog(&self) -> Vec<CommandSummary> {
        self.inner.registry().allowed_catalog()
    }

    /// Queue free text as the next user turn.
    pub async fn prompt(&self, req: PromptRequest) -> Result<Dispatch<PromptAck>, ToolError> {
        let inner = &self.inner;
        let delivery = &inner.config.delivery;
        let turn = self.activate();

        if req.text.trim().is_empty() {
            let record = inner.record(PROMPT_TOOL, turn, req.text.clone(), "rejected");
            let err = ToolError::InvalidArguments("text must not be empty".into());
            return Err(inner.refuse(record.with_reason(req.reason), err).await);
        }

        // A prompt must not smuggle in a command the query tool would refuse.
        if let Some(command) = leading_command(&req.text) {
            let classification = inner.registry().classify(command);
            if let Classification::Blocked { reason } = classification {
                let record = inner.record(PROMPT_TOOL, turn, req.text.clone(), "blocked");
                let err = ToolError::CommandBlocked {
                    command: normalize(command),
                    reason,
                };
                return Err(inner.refuse(record.with_reason(req.reason), err).await);
            }
        }

        let follow_up = req.follow_up.clone().filter(|f| !f.trim().is_empty());
        let delay_ms = req.delay_ms.unwrap_or(delivery.default_delay_ms);
        let follow_up_delay_ms = req
            .follow_up_delay_ms
            .unwrap_or(delivery.default_follow_up_delay_ms);

        let (id, projected_turn) = match self.admit() {
            Ok(admitted) => admitted,
            Err(deny) => {
                let record = inner.record(PROMPT_TOOL, turn, req.text.clone(), "denied");
                return Err(inner
                    .refuse(record.with_reason(req.reason), deny.into())
                    .await);
            }
        };

        let recorder = self
            .commit_permit(PROMPT_TOOL, id, projected_turn, &req.text, req.reason.clone())
            .await?;
        let handle = match &follow_up {
            Some(f) => inner.sequencer.deliver_two_step(
                id,
                req.text.clone(),
                f.clone(),
                Duration::from_millis(delay_ms),
                Duration::from_millis(follow_up_delay_ms),
                recorder.clone(),
            ),
            None => inner.sequencer.deliver_single(
                id,
                req.text.clone(),
                Duration::from_millis(delay_ms),
                recorder.clone(),
            ),
        };

        tracing::info!(
            "{} scheduled: turn {}/{} in {}ms{}",
            id,
            projected_turn,
            inner.guardrails.turn_limit,
            delay_ms,
            if follow_up.is_some() { " (+follow-up)" } else { "" }
        );

        let ack = PromptAck {
            status: "injected",
            sequence_id: id,
            turn_count: projected_turn,
            turn_limit: inner.guardrails.turn_limit,
            budget_remaining: inner.budget_remaining(),
            delay_ms,
            has_follow_up: follow_up.is_some(),
            follow_up_delay_ms: follow_up.as_ref().map(|_| follow_up_delay_ms),
            timestamp: inner.clock.now().to_rfc3339(),
        };
        Ok(Dispatch {
            ack,
            handle,
            recorder,
        })
    }

    /// Queue a registered slash command, optionally followed by a prompt
    /// that lets the agent read the command's output.
    pub async fn query(&self, req: QueryRequest) -> Result<Dispatch<QueryAck>, ToolError> {
        let inner = &self.inner;
        let delivery = &inner.config.delivery;
        let turn = self.activate();

        if req.command.trim().is_empty() {
            let record = inner.record(QUERY_TOOL, turn, req.command.clone(), "rejected");
            let err = ToolError::InvalidArguments("command must not be empty".into());
            return Err(inner.refuse(record.with_reason(req.reason), err).await);
        }

        let command = normalize(&req.command);
        let classification = inner.registry().classify(&command);
        match classification {
            Classification::Allowed => {}
            Classification::Blocked { reason } => {
                let record = inner.record(QUERY_TOOL, turn, command.clone(), "blocked");
                let err = ToolError::CommandBlocked { command, reason };
                return Err(inner.refuse(record.with_reason(req.reason), err).await);
            }
            Classification::Unknown => {
                let record = inner.record(QUERY_TOOL, turn, command.clone(), "unknown");
                let err = ToolError::CommandUnknown { command };
                return Err(inner.refuse(record.with_reason(req.reason), err).await);
            }
        }

        let follow_up = req.follow_up.clone().filter(|f| !f.trim().is_empty());
        let gap_ms = req.delay_ms.unwrap_or(delivery.default_follow_up_delay_ms);

        let (id, projected_turn) = match self.admit() {
            Ok(admitted) => admitted,
            Err(deny) => {
                let record = inner.record(QUERY_TOOL, turn, command.clone(), "denied");
                return Err(inner
                    .refuse(record.with_reason(req.reason), deny.into())
                    .await);
            }
        };

        let recorder = self
            .commit_permit(QUERY_TOOL, id, projected_turn, &command, req.reason.clone())
            .await?;
        let primary_delay = Duration::from_millis(delivery.default_delay_ms);
        let handle = match &follow_up {
            Some(f) => inner.sequencer.deliver_two_step(
                id,
                command.clone(),
                f.clone(),
                primary_delay,
                Duration::from_millis(gap_ms),
                recorder.clone(),
            ),
            None => inner
                .sequencer
                .deliver_single(id, command.clone(), primary_delay, recorder.clone()),
        };
        tracing::info!("{} scheduled: {} (turn {})", id, command, projected_turn);

        let ack = QueryAck {
            status: "injected",
            sequence_id: id,
            command,
            follow_up,
            delay_ms: gap_ms,
            turn_count: projected_turn,
            timestamp: inner.clock.now().to_rfc3339(),
        };
        Ok(Dispatch {
            ack,
            handle,
            recorder,
        })
    }

    /// Read-only snapshot. Checks the injector but changes nothing.
    pub async fn status(&self) -> StatusReport {
        let inner = &self.inner;
        let injector = inner.sequencer.injector();
        let check = injector.health_check().await;
        let health = InjectorHealth {
            name: injector.name().to_string(),
            available: check.is_ok(),
            error: check.err().map(|e| e.to_string()),
        };
        let command_overrides = inner.registry().overrides();

        let session = inner.session();
        StatusReport {
            active: session.activated,
            session_id: session.session_id.clone(),
            turn_count: session.turn_count,
            turn_limit: inner.guardrails.turn_limit,
            cooldown_ms: inner.guardrails.cooldown_ms,
            budget_usd: inner.guardrails.budget_usd,
            budget_spent_estimate: round_cents(session.budget_spent_estimate),
            budget_remaining: session
                .budget_remaining(inner.guardrails.budget_usd)
                .map(round_cents),
            audit_mode: inner.audit.mode().to_string(),
            session_start: session.session_start.to_rfc3339(),
            last_delivery_at: session.last_delivery_at.map(|t| t.to_rfc3339()),
            in_flight: session.in_flight,
            last_outcome: session.last_outcome.clone(),
            prompts_log: session.prompts_log(),
            command_overrides,
            injector: health,
            timestamp: inner.clock.now().to_rfc3339(),
        }
    }

    /// Apply command overrides. Limits and the audit mode are fixed at
    /// startup; requests to change them come back as unapplied changes.
    pub async fn configure(&self, req: ConfigureRequest) -> Result<ConfigureReport, ToolError> {
        let inner = &self.inner;
        let turn = self.activate();
        let mut changes = Vec::new();

        let limits = &inner.guardrails;
        let startup_only = [
            ("turn_limit", req.turn_limit.map(|v| json!(v)), json!(limits.turn_limit)),
            ("cooldown_ms", req.cooldown_ms.map(|v| json!(v)), json!(limits.cooldown_ms)),
            ("budget_usd", req.budget_usd.map(|v| json!(v)), json!(limits.budget_usd)),
            (
                "audit_mode",
                req.audit_mode.clone().map(|v| json!(v)),
                json!(inner.audit.mode().as_str()),
            ),
        ];
        for (field, requested, current) in startup_only {
            if let Some(requested) = requested {
                changes.push(ConfigChange {
                    field: field.to_string(),
                    requested,
                    previous: Some(current),
                    applied: false,
                    note: Some(STARTUP_ONLY_NOTE.to_string()),
                });
            }
        }

        let snapshot = inner.registry().clone();
        {
            let mut registry = inner.registry();
            for (name, status_req) in &req.set_command_status {
                let name = normalize(name);
                let field = format!("command_status.{name}");
                let Some(status) = status_req.status() else {
                    changes.push(ConfigChange {
                        field,
                        requested: json!(status_req.raw_status()),
                        previous: None,
                        applied: false,
                        note: Some("status must be ALLOWED or BLOCKED".into()),
                    });
                    continue;
                };
                let previous = registry.set_override(
                    &name,
                    OverrideRequest {
                        status: Some(status),
                        block_reason: status_req.block_reason(),
                    },
                );
                let note = match registry.classify(&name) {
                    Classification::Blocked { reason } => Some(format!("block_reason: {reason}")),
                    _ => None,
                };
                changes.push(ConfigChange {
                    field,
                    requested: json!(status.as_str()),
                    previous: Some(json!(previous.label())),
                    applied: true,
                    note,
                });
            }
        }

        let payload = serde_json::to_string(&changes).unwrap_or_default();
        let record = inner.record(CONFIGURE_TOOL, turn, payload, "configured");
        let audit = match inner.audit.record(&record).await {
            Ok(outcome) => outcome,
            Err(e) => {
                *inner.registry() = snapshot;
                return Err(ToolError::AuditUnavailable {
                    message: e.to_string(),
                });
            }
        };
        tracing::info!("Configure: {} change(s)", changes.len());

        Ok(ConfigureReport {
            status: "configured",
            changes,
            current_config: self.current_config(),
            audit: audit.as_str(),
        })
    }

    /// Reconcile the spend estimate with a cost observed outside the governor.
    pub async fn report_cost(&self, report: CostReport) -> Result<CostCorrectionReport, ToolError> {
        let inner = &self.inner;
        let turn = self.activate();

        let valid = report.spent_usd.is_finite()
            && (report.mode == CorrectionMode::Adjust || report.spent_usd >= 0.0);
        if !valid {
            let payload = report.spent_usd.to_string();
            let record = inner.record(REPORT_COST_TOOL, turn, payload, "rejected");
            let err = ToolError::InvalidArguments(format!(
                "spent_usd must be a finite{} number",
                if report.mode == CorrectionMode::Replace { ", non-negative" } else { "" }
            ));
            return Err(inner.refuse(record, err).await);
        }

        let previous = inner.session().apply_correction(report.mode, report.spent_usd);
        let mode = match report.mode {
            CorrectionMode::Replace => "replace",
            CorrectionMode::Adjust => "adjust",
        };
        let payload = format!("{mode} {:.4} (was {:.4})", report.spent_usd, previous);
        let record = inner.record(REPORT_COST_TOOL, turn, payload, "budget_corrected");

        let audit = match inner.audit.record(&record).await {
            Ok(outcome) => outcome,
            Err(e) => {
                inner.session().budget_spent_estimate = previous;
                return Err(ToolError::AuditUnavailable {
                    message: e.to_string(),
                });
            }
        };

        let session = inner.session();
        tracing::info!(
            "Budget estimate corrected ({}): ${:.2} -> ${:.2}",
            mode,
            previous,
            session.budget_spent_estimate
        );
        Ok(CostCorrectionReport {
            status: "corrected",
            mode: report.mode,
            previous_estimate: round_cents(previous),
            budget_spent_estimate: round_cents(session.budget_spent_estimate),
            budget_remaining: session
                .budget_remaining(inner.guardrails.budget_usd)
                .map(round_cents),
            audit: audit.as_str(),
        })
    }

    /// Cancel every scheduled delivery. Returns how many were stopped.
    pub fn shutdown(&self) -> usize {
        let cancelled = self.inner.sequencer.cancel_all();
        if cancelled > 0 {
            tracing::warn!("Cancelled {} pending deliver(ies) on shutdown", cancelled);
        }
        cancelled
    }

    fn current_config(&self) -> CurrentConfig {
        let inner = &self.inner;
        let g = &inner.guardrails;
        CurrentConfig {
            turn_count: inner.session().turn_count,
            turn_limit: g.turn_limit,
            cooldown_ms: g.cooldown_ms,
            budget_usd: g.budget_usd,
            cost_per_turn_usd: g.cost_per_turn_usd,
            audit_mode: inner.audit.mode().to_string(),
            allowed_commands: inner.registry().allowed_names(),
        }
    }

    /// Mark the session active; returns the current turn count.
    fn activate(&self) -> u32 {
        let mut session = self.inner.session();
        session.activated = true;
        session.turn_count
    }

    /// Run the guardrails and reserve the terminal. Returns the sequence id
    /// and the turn the delivery will occupy.
    fn admit(&self) -> Result<(SequenceId, u32), DenyReason> {
        let inner = &self.inner;
        let id = inner.sequencer.next_id();
        let now = inner.clock.now();
        let mut session = inner.session();
        inner.guardrails.admit(&mut session, now, id)?;
        Ok((id, session.turn_count + 1))
    }

    /// Write the permit's decision record before anything is scheduled. If it
    /// cannot be written the reservation from `admit` is released and nothing
    /// is typed.
    async fn commit_permit(
        &self,
        tool: &'static str,
        id: SequenceId,
        projected_turn: u32,
        payload: &str,
        reason: Option<String>,
    ) -> Result<Arc<SequenceRecorder>, ToolError> {
        let inner = &self.inner;
        let record = inner
            .record(tool, projected_turn, payload, "permitted")
            .with_reason(reason.clone())
            .with_step(id, "decision");

        let degraded = match inner.audit.record(&record).await {
            Ok(outcome) => outcome == AuditOutcome::Degraded,
            Err(e) => {
                {
                    let mut session = inner.session();
                    session.finish(id);
                    session.refund(inner.guardrails.cost_per_turn_usd);
                }
                tracing::error!("{} not scheduled, permit not audited: {}", id, e);
                return Err(ToolError::AuditUnavailable {
                    message: e.to_string(),
                });
            }
        };

        Ok(Arc::new(SequenceRecorder {
            inner: inner.clone(),
            tool,
            reason,
            state: Mutex::new(RecorderState {
                turn: None,
                degraded,
            }),
        }))
    }
}

/// First word of `text` when it looks like a slash command.
fn leading_command(text: &str) -> Option<&str> {
    let first = text.trim_start().split_whitespace().next()?;
    let name = first.strip_prefix('/')?;
    if name.is_empty() || name.contains('/') {
        return None;
    }
    Some(first)
}

fn round_cents(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leading_command() {
        assert_eq!(leading_command("/exit"), Some("/exit"));
        assert_eq!(leading_command("  /compact now"), Some("/compact"));
        assert_eq!(leading_command("fix /tmp/x"), None);
        assert_eq!(leading_command("/tmp/build.log is empty"), None);
        assert_eq!(leading_command("/"), None);
        assert_eq!(leading_command(""), None);
    }

    #[test]
    fn test_round_cents() {
        assert_eq!(round_cents(0.1 + 0.2), 0.3);
        assert_eq!(round_cents(4.556), 4.56);
    }
}
