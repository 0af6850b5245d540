// src/infra/config.rs — Configuration loading (TOML)
//
// Loaded once at startup. The limits in here are the ceilings a human sets;
// nothing at runtime writes back to this file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::infra::errors::VelleError;
use crate::infra::paths;
use crate::registry::CommandStatus;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub limits: LimitsConfig,

    #[serde(default)]
    pub delivery: DeliveryConfig,

    #[serde(default)]
    pub audit: AuditConfig,

    #[serde(default)]
    pub injector: InjectorConfig,

    #[serde(default)]
    pub sidecar: SidecarConfig,

    /// Entries layered over the built-in command table (same name replaces).
    #[serde(default)]
    pub commands: Vec<CommandConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub turn_limit: u32,
    pub cooldown_ms: u64,
    /// Budget ceiling in USD. Zero or negative disables the budget check.
    pub budget_usd: f64,
    /// Heuristic charge per delivered turn.
    pub cost_per_turn_usd: f64,
}

fn default_cost_per_turn() -> f64 {
    0.15
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            turn_limit: 20,
            cooldown_ms: 1000,
            budget_usd: 5.0,
            cost_per_turn_usd: default_cost_per_turn(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    pub default_delay_ms: u64,
    pub default_follow_up_delay_ms: u64,
    /// Pause between the typed text and the Enter that submits it.
    pub submit_gap_ms: u64,
    /// How many recent deliveries `status` reports.
    pub prompts_log_size: usize,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            default_delay_ms: 500,
            default_follow_up_delay_ms: 3000,
            submit_gap_ms: 500,
            prompts_log_size: 10,
        }
    }
}

/// Audit strategy, chosen once at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditMode {
    /// Remote sink only; an unreachable sink fails the operation.
    #[serde(alias = "memorygate")]
    Remote,
    /// Local append-only stream only.
    Local,
    /// Remote first, local backfill on failure.
    #[default]
    #[serde(alias = "both")]
    Dual,
}

impl AuditMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Remote => "remote",
            Self::Local => "local",
            Self::Dual => "dual",
        }
    }
}

impl std::fmt::Display for AuditMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(default)]
    pub mode: AuditMode,
    /// Local JSONL path. Defaults to `<data_dir>/velle_audit.jsonl`.
    #[serde(default)]
    pub local_path: Option<PathBuf>,
    #[serde(default = "default_remote_url")]
    pub remote_url: Option<String>,
    #[serde(default = "default_remote_timeout_ms")]
    pub remote_timeout_ms: u64,
}

fn default_remote_url() -> Option<String> {
    Some("http://127.0.0.1:8000/memory_store".into())
}

fn default_remote_timeout_ms() -> u64 {
    5000
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            mode: AuditMode::default(),
            local_path: None,
            remote_url: default_remote_url(),
            remote_timeout_ms: default_remote_timeout_ms(),
        }
    }
}

impl AuditConfig {
    pub fn resolved_local_path(&self) -> PathBuf {
        self.local_path
            .clone()
            .unwrap_or_else(paths::audit_file_path)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InjectorKind {
    /// `tmux send-keys` into a pane.
    Tmux,
    /// Log deliveries instead of typing them.
    DryRun,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InjectorConfig {
    pub kind: InjectorKind,
    /// tmux target pane. Falls back to `$TMUX_PANE` when unset.
    pub target: Option<String>,
}

impl Default for InjectorConfig {
    fn default() -> Self {
        Self {
            kind: InjectorKind::Tmux,
            target: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SidecarConfig {
    pub enabled: bool,
    pub port: u16,
    /// Optional bearer token required on every sidecar request.
    pub token: Option<String>,
}

impl Default for SidecarConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: 7839,
            token: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandConfig {
    pub name: String,
    pub status: CommandStatus,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub block_reason: Option<String>,
}

fn default_category() -> String {
    "custom".into()
}

impl Config {
    /// Load config from file, falling back to defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = paths::config_file_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            tracing::debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content).map_err(VelleError::from)?;
        config.validate()?;
        tracing::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Reject combinations the governor cannot run with.
    pub fn validate(&self) -> Result<(), VelleError> {
        let has_remote = self
            .audit
            .remote_url
            .as_deref()
            .is_some_and(|u| !u.trim().is_empty());
        if self.audit.mode != AuditMode::Local && !has_remote {
            return Err(VelleError::Config(format!(
                "audit.mode = \"{}\" requires audit.remote_url",
                self.audit.mode
            )));
        }
        if self.limits.cost_per_turn_usd < 0.0 {
            return Err(VelleError::Config(
                "limits.cost_per_turn_usd must not be negative".into(),
            ));
        }
        for cmd in &self.commands {
            if cmd.status == CommandStatus::Blocked && cmd.block_reason.is_none() {
                return Err(VelleError::Config(format!(
                    "command '{}' is BLOCKED but has no block_reason",
                    cmd.name
                )));
            }
        }
        Ok(())
    }
}
