// src/audit/mod.rs — Audit trail: record type, sinks and write strategies
//
// The strategy is picked once at startup from `audit.mode`; call sites only
// ever see `AuditStrategy::record`.

pub mod local;
pub mod remote;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::types::SequenceId;
use crate::infra::config::{AuditConfig, AuditMode};
use crate::infra::errors::VelleError;

pub use local::LocalJsonlSink;
pub use remote::MemoryGateSink;

/// One immutable line of the audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub timestamp: DateTime<Utc>,
    pub turn: u32,
    pub tool: String,
    pub payload: String,
    pub reason: Option<String>,
    pub session_id: String,
    pub outcome: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence_id: Option<SequenceId>,
    /// `decision`, `primary` or `follow_up`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl AuditRecord {
    pub fn new(
        timestamp: DateTime<Utc>,
        session_id: &str,
        tool: &str,
        turn: u32,
        payload: impl Into<String>,
        outcome: &str,
    ) -> Self {
        Self {
            timestamp,
            turn,
            tool: tool.to_string(),
            payload: payload.into(),
            reason: None,
            session_id: session_id.to_string(),
            outcome: outcome.to_string(),
            sequence_id: None,
            step: None,
            error_code: None,
        }
    }

    pub fn with_reason(mut self, reason: Option<String>) -> Self {
        self.reason = reason;
        self
    }

    pub fn with_step(mut self, sequence_id: SequenceId, step: &str) -> Self {
        self.sequence_id = Some(sequence_id);
        self.step = Some(step.to_string());
        self
    }

    /// Mark as a refusal: no sequence was started.
    pub fn as_decision(mut self) -> Self {
        self.step = Some("decision".to_string());
        self
    }

    pub fn with_error_code(mut self, code: &str) -> Self {
        self.error_code = Some(code.to_string());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditOutcome {
    Ok,
    /// Written, but not to the preferred sink.
    Degraded,
}

impl AuditOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Degraded => "degraded",
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuditError {
    #[error("{sink} sink failed: {message}")]
    Sink { sink: String, message: String },

    #[error("remote sink failed ({remote}) and local fallback failed ({local})")]
    Exhausted { remote: String, local: String },

    #[error("could not encode audit record: {0}")]
    Encode(String),
}

impl From<AuditError> for VelleError {
    fn from(e: AuditError) -> Self {
        match e {
            AuditError::Sink { sink, message } => VelleError::AuditSink { sink, message },
            other => VelleError::AuditSink {
                sink: "audit".into(),
                message: other.to_string(),
            },
        }
    }
}

/// A single destination for audit records.
#[async_trait]
pub trait AuditSink: Send + Sync {
    fn name(&self) -> &str;
    async fn write(&self, record: &AuditRecord) -> Result<(), AuditError>;
}

/// Decides where a record goes and what a sink failure means.
#[async_trait]
pub trait AuditStrategy: Send + Sync {
    fn mode(&self) -> AuditMode;
    async fn record(&self, record: &AuditRecord) -> Result<AuditOutcome, AuditError>;
}

/// Fail-closed: the remote sink or nothing.
pub struct RemoteOnly {
    remote: Arc<dyn AuditSink>,
}

impl RemoteOnly {
    pub fn new(remote: Arc<dyn AuditSink>) -> Self {
        Self { remote }
    }
}

#[async_trait]
impl AuditStrategy for RemoteOnly {
    fn mode(&self) -> AuditMode {
        AuditMode::Remote
    }

    async fn record(&self, record: &AuditRecord) -> Result<AuditOutcome, AuditError> {
        self.remote.write(record).await.map_err(|e| {
            tracing::error!("Audit record lost, remote sink unavailable: {}", e);
            e
        })?;
        Ok(AuditOutcome::Ok)
    }
}

pub struct LocalOnly {
    local: Arc<dyn AuditSink>,
}

impl LocalOnly {
    pub fn new(local: Arc<dyn AuditSink>) -> Self {
        Self { local }
    }
}

#[async_trait]
impl AuditStrategy for LocalOnly {
    fn mode(&self) -> AuditMode {
        AuditMode::Local
    }

    async fn record(&self, record: &AuditRecord) -> Result<AuditOutcome, AuditError> {
        self.local.write(record).await?;
        Ok(AuditOutcome::Ok)
    }
}

/// Fail-open: remote first, local file as backfill.
pub struct Dual {
    remote: Arc<dyn AuditSink>,
    local: Arc<dyn AuditSink>,
}

impl Dual {
    pub fn new(remote: Arc<dyn AuditSink>, local: Arc<dyn AuditSink>) -> Self {
        Self { remote, local }
    }
}

#[async_trait]
impl AuditStrategy for Dual {
    fn mode(&self) -> AuditMode {
        AuditMode::Dual
    }

    async fn record(&self, record: &AuditRecord) -> Result<AuditOutcome, AuditError> {
        let remote_err = match self.remote.write(record).await {
            Ok(()) => return Ok(AuditOutcome::Ok),
            Err(e) => e,
        };
        tracing::warn!("Remote audit failed, continuing with local: {}", remote_err);

        match self.local.write(record).await {
            Ok(()) => Ok(AuditOutcome::Degraded),
            Err(local_err) => Err(AuditError::Exhausted {
                remote: remote_err.to_string(),
                local: local_err.to_string(),
            }),
        }
    }
}

/// Build the strategy selected by `audit.mode`.
pub fn build_strategy(cfg: &AuditConfig) -> Result<Arc<dyn AuditStrategy>, VelleError> {
    let local = || -> Arc<dyn AuditSink> {
        Arc::new(LocalJsonlSink::new(cfg.resolved_local_path()))
    };
    let remote = || -> Result<Arc<dyn AuditSink>, VelleError> {
        let url = cfg
            .remote_url
            .clone()
            .ok_or_else(|| VelleError::Config("audit.remote_url is required".into()))?;
        Ok(Arc::new(MemoryGateSink::new(url, cfg.remote_timeout_ms)?))
    };

    let strategy: Arc<dyn AuditStrategy> = match cfg.mode {
        AuditMode::Remote => Arc::new(RemoteOnly::new(remote()?)),
        AuditMode::Local => Arc::new(LocalOnly::new(local())),
        AuditMode::Dual => Arc::new(Dual::new(remote()?, local())),
    };
    tracing::info!("Audit mode: {}", cfg.mode);
    Ok(strategy)
}

/// Last `limit` records of a local audit file. Unparseable lines are skipped.
pub fn read_recent(path: &Path, limit: usize) -> Vec<AuditRecord> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(_) => return Vec::new(),
    };

    let lines: Vec<&str> = content.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(limit);

    lines[start..]
        .iter()
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect()
}
