// src/core/types.rs — Request, response and error types shared by the tool surfaces

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::registry::{CommandStatus, Override};

pub const PROMPT_TOOL: &str = "velle_prompt";
pub const QUERY_TOOL: &str = "velle_query";
pub const STATUS_TOOL: &str = "velle_status";
pub const CONFIGURE_TOOL: &str = "velle_configure";
pub const REPORT_COST_TOOL: &str = "velle_report_cost";

/// Identity of one scheduled delivery sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SequenceId(pub u64);

impl fmt::Display for SequenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "seq-{}", self.0)
    }
}

/// Why a guardrail refused a request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DenyReason {
    #[error("Turn limit reached ({turn_count}/{turn_limit}). Edit the startup config to raise it or end the autonomous session.")]
    TurnLimitReached { turn_count: u32, turn_limit: u32 },

    #[error("Cooldown active ({cooldown_ms}ms between deliveries, {remaining_ms}ms remaining).")]
    CooldownActive { cooldown_ms: u64, remaining_ms: u64 },

    #[error("Delivery {sequence} still in flight; wait for it to finish.")]
    SequenceInFlight { sequence: SequenceId },

    #[error("Estimated cost ${spent:.2} has reached the budget of ${budget:.2}.")]
    BudgetExceeded { spent: f64, budget: f64 },
}

impl DenyReason {
    pub fn code(&self) -> &'static str {
        match self {
            Self::TurnLimitReached { .. } => "TURN_LIMIT_REACHED",
            // An in-flight sequence is rejected through the cooldown.
            Self::CooldownActive { .. } | Self::SequenceInFlight { .. } => "COOLDOWN_ACTIVE",
            Self::BudgetExceeded { .. } => "BUDGET_EXCEEDED",
        }
    }

    fn details(&self) -> Value {
        match self {
            Self::TurnLimitReached {
                turn_count,
                turn_limit,
            } => json!({ "turn_count": turn_count, "turn_limit": turn_limit }),
            Self::CooldownActive {
                cooldown_ms,
                remaining_ms,
            } => json!({ "cooldown_ms": cooldown_ms, "remaining_ms": remaining_ms }),
            Self::SequenceInFlight { sequence } => json!({ "in_flight": sequence.0 }),
            Self::BudgetExceeded { spent, budget } => json!({
                "estimated_cost_usd": (spent * 100.0).round() / 100.0,
                "budget_usd": budget,
            }),
        }
    }
}

/// Every structured failure a tool call can return.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ToolError {
    #[error(transparent)]
    Denied(#[from] DenyReason),

    #[error("Command '{command}' is blocked ({reason}).")]
    CommandBlocked { command: String, reason: String },

    #[error("Command '{command}' is not in the registry. Use velle_configure to classify it first.")]
    CommandUnknown { command: String },

    #[error("Injection failed: {message}")]
    InjectionFailed { message: String },

    #[error("Primary delivered but the follow-up failed: {message}")]
    FollowUpFailed { message: String },

    #[error("Audit sink unavailable: {message}")]
    AuditUnavailable { message: String },

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),
}

impl ToolError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Denied(reason) => reason.code(),
            Self::CommandBlocked { .. } => "COMMAND_BLOCKED",
            Self::CommandUnknown { .. } => "COMMAND_UNKNOWN",
            Self::InjectionFailed { .. } => "INJECTION_FAILED",
            Self::FollowUpFailed { .. } => "FOLLOW_UP_FAILED",
            Self::AuditUnavailable { .. } => "AUDIT_UNAVAILABLE",
            Self::InvalidArguments(_) => "INVALID_ARGUMENTS",
        }
    }

    /// Policy denials are expected results, not faults.
    pub fn is_policy_denial(&self) -> bool {
        matches!(
            self,
            Self::Denied(_) | Self::CommandBlocked { .. } | Self::CommandUnknown { .. }
        )
    }

    /// The JSON body returned to the caller.
    pub fn to_json(&self) -> Value {
        let mut body = json!({
            "status": "error",
            "error_code": self.code(),
            "message": self.to_string(),
            "timestamp": Utc::now().to_rfc3339(),
        });
        let extra = match self {
            Self::Denied(reason) => reason.details(),
            Self::CommandBlocked { command, reason } => {
                json!({ "command": command, "block_reason": reason })
            }
            Self::CommandUnknown { command } => json!({ "command": command }),
            _ => Value::Null,
        };
        if let (Some(obj), Value::Object(extra)) = (body.as_object_mut(), extra) {
            obj.extend(extra);
        }
        body
    }
}

/// Arguments of the prompt tool.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PromptRequest {
    pub text: String,
    #[serde(default)]
    pub delay_ms: Option<u64>,
    #[serde(default)]
    pub follow_up: Option<String>,
    #[serde(default)]
    pub follow_up_delay_ms: Option<u64>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl PromptRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

/// Arguments of the query tool.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryRequest {
    pub command: String,
    #[serde(default)]
    pub follow_up: Option<String>,
    /// Gap between the command and its follow-up.
    #[serde(default)]
    pub delay_ms: Option<u64>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl QueryRequest {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Default::default()
        }
    }
}

/// Requested status for one command: either a bare `"ALLOWED"`/`"BLOCKED"`
/// or an object carrying the block reason.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CommandStatusRequest {
    Bare(String),
    Detailed {
        status: String,
        #[serde(default)]
        block_reason: Option<String>,
    },
}

impl CommandStatusRequest {
    pub fn status(&self) -> Option<CommandStatus> {
        match self {
            Self::Bare(s) | Self::Detailed { status: s, .. } => CommandStatus::parse(s),
        }
    }

    /// The status string as the caller sent it.
    pub fn raw_status(&self) -> &str {
        match self {
            Self::Bare(s) | Self::Detailed { status: s, .. } => s,
        }
    }

    pub fn block_reason(&self) -> Option<String> {
        match self {
            Self::Bare(_) => None,
            Self::Detailed { block_reason, .. } => block_reason.clone(),
        }
    }
}

/// Arguments of the configure tool.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigureRequest {
    #[serde(default)]
    pub turn_limit: Option<u32>,
    #[serde(default)]
    pub cooldown_ms: Option<u64>,
    #[serde(default)]
    pub budget_usd: Option<f64>,
    #[serde(default)]
    pub audit_mode: Option<String>,
    #[serde(default)]
    pub set_command_status: BTreeMap<String, CommandStatusRequest>,
}

/// How an external cost report reconciles with the running estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrectionMode {
    #[default]
    Replace,
    Adjust,
}

/// Arguments of the report_cost tool.
#[derive(Debug, Clone, Deserialize)]
pub struct CostReport {
    pub spent_usd: f64,
    #[serde(default)]
    pub mode: CorrectionMode,
}

/// Immediate answer to a permitted prompt.
#[derive(Debug, Clone, Serialize)]
pub struct PromptAck {
    pub status: &'static str,
    pub sequence_id: SequenceId,
    /// The turn this delivery occupies once it lands.
    pub turn_count: u32,
    pub turn_limit: u32,
    pub budget_remaining: Option<f64>,
    pub delay_ms: u64,
    pub has_follow_up: bool,
    pub follow_up_delay_ms: Option<u64>,
    pub timestamp: String,
}

/// Immediate answer to a permitted query.
#[derive(Debug, Clone, Serialize)]
pub struct QueryAck {
    pub status: &'static str,
    pub sequence_id: SequenceId,
    pub command: String,
    pub follow_up: Option<String>,
    pub delay_ms: u64,
    pub turn_count: u32,
    pub timestamp: String,
}

/// Final result of a delivery, available through `Dispatch::wait`.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryReceipt {
    pub status: &'static str,
    pub sequence_id: SequenceId,
    pub turn_count: u32,
    pub turn_limit: u32,
    pub budget_remaining: Option<f64>,
    pub audit: &'static str,
    pub timestamp: String,
}

/// How the most recent sequence ended, for agents that only see acks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LastOutcome {
    pub sequence_id: SequenceId,
    pub status: &'static str,
    pub error_code: Option<&'static str>,
    pub message: Option<String>,
    pub finished_at: String,
}

/// One row of the status tool's recent-deliveries list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptLogEntry {
    pub turn: u32,
    pub sequence_id: SequenceId,
    pub tool: String,
    pub text_preview: String,
    pub reason: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InjectorHealth {
    pub name: String,
    pub available: bool,
    pub error: Option<String>,
}

/// Read-only snapshot returned by the status tool.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub active: bool,
    pub session_id: String,
    pub turn_count: u32,
    pub turn_limit: u32,
    pub cooldown_ms: u64,
    pub budget_usd: f64,
    pub budget_spent_estimate: f64,
    pub budget_remaining: Option<f64>,
    pub audit_mode: String,
    pub session_start: String,
    pub last_delivery_at: Option<String>,
    pub in_flight: Option<SequenceId>,
    pub last_outcome: Option<LastOutcome>,
    pub prompts_log: Vec<PromptLogEntry>,
    pub command_overrides: BTreeMap<String, Override>,
    pub injector: InjectorHealth,
    pub timestamp: String,
}

/// One line of the configure tool's change list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigChange {
    pub field: String,
    pub requested: Value,
    pub previous: Option<Value>,
    pub applied: bool,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CurrentConfig {
    pub turn_count: u32,
    pub turn_limit: u32,
    pub cooldown_ms: u64,
    pub budget_usd: f64,
    pub cost_per_turn_usd: f64,
    pub audit_mode: String,
    pub allowed_commands: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfigureReport {
    pub status: &'static str,
    pub changes: Vec<ConfigChange>,
    pub current_config: CurrentConfig,
    pub audit: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct CostCorrectionReport {
    pub status: &'static str,
    pub mode: CorrectionMode,
    pub previous_estimate: f64,
    pub budget_spent_estimate: f64,
    pub budget_remaining: Option<f64>,
    pub audit: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cooldown_and_in_flight_share_code() {
        let cooldown = DenyReason::CooldownActive {
            cooldown_ms: 1000,
            remaining_ms: 900,
        };
        let in_flight = DenyReason::SequenceInFlight {
            sequence: SequenceId(3),
        };
        assert_eq!(cooldown.code(), "COOLDOWN_ACTIVE");
        assert_eq!(in_flight.code(), "COOLDOWN_ACTIVE");
    }

    #[test]
    fn test_blocked_error_json_carries_reason() {
        let err = ToolError::CommandBlocked {
            command: "/exit".into(),
            reason: "session_terminating".into(),
        };
        let body = err.to_json();
        assert_eq!(body["status"], "error");
        assert_eq!(body["error_code"], "COMMAND_BLOCKED");
        assert_eq!(body["block_reason"], "session_terminating");
        assert!(err.is_policy_denial());
    }

    #[test]
    fn test_turn_limit_json_details() {
        let err = ToolError::from(DenyReason::TurnLimitReached {
            turn_count: 2,
            turn_limit: 2,
        });
        let body = err.to_json();
        assert_eq!(body["error_code"], "TURN_LIMIT_REACHED");
        assert_eq!(body["turn_limit"], 2);
    }

    #[test]
    fn test_delivery_failures_are_not_policy_denials() {
        let err = ToolError::FollowUpFailed {
            message: "pane closed".into(),
        };
        assert_eq!(err.code(), "FOLLOW_UP_FAILED");
        assert!(!err.is_policy_denial());
    }

    #[test]
    fn test_command_status_request_forms() {
        let bare: CommandStatusRequest = serde_json::from_value(json!("allowed")).unwrap();
        assert_eq!(bare.status(), Some(CommandStatus::Allowed));
        assert_eq!(bare.block_reason(), None);

        let detailed: CommandStatusRequest =
            serde_json::from_value(json!({"status": "BLOCKED", "block_reason": "noisy"})).unwrap();
        assert_eq!(detailed.status(), Some(CommandStatus::Blocked));
        assert_eq!(detailed.block_reason().as_deref(), Some("noisy"));
    }

    #[test]
    fn test_prompt_request_defaults() {
        let req: PromptRequest = serde_json::from_value(json!({"text": "continue"})).unwrap();
        assert_eq!(req.text, "continue");
        assert!(req.delay_ms.is_none());
        assert!(req.follow_up.is_none());
    }

    #[test]
    fn test_sequence_id_display() {
        assert_eq!(SequenceId(42).to_string(), "seq-42");
    }
}
