// src/audit/remote.rs — MemoryGate HTTP audit sink

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use super::{AuditError, AuditRecord, AuditSink};
use crate::infra::errors::VelleError;

/// Body accepted by MemoryGate's `memory_store` endpoint.
#[derive(Debug, Serialize)]
pub struct MemoryGateObservation {
    pub observation: String,
    pub confidence: f64,
    pub domain: &'static str,
    pub evidence: Vec<String>,
}

impl MemoryGateObservation {
    pub fn from_record(record: &AuditRecord) -> Result<Self, AuditError> {
        let observation =
            serde_json::to_string(record).map_err(|e| AuditError::Encode(e.to_string()))?;
        Ok(Self {
            observation,
            confidence: 0.9,
            domain: "velle_audit",
            evidence: vec![format!("velle_turn_{}", record.turn)],
        })
    }
}

pub struct MemoryGateSink {
    client: reqwest::Client,
    url: String,
}

impl MemoryGateSink {
    pub fn new(url: String, timeout_ms: u64) -> Result<Self, VelleError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .user_agent(format!("velle/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| VelleError::Config(format!("audit HTTP client: {e}")))?;
        Ok(Self { client, url })
    }

    fn sink_err(&self, message: String) -> AuditError {
        AuditError::Sink {
            sink: "remote".into(),
            message,
        }
    }
}

#[async_trait]
impl AuditSink for MemoryGateSink {
    fn name(&self) -> &str {
        "remote"
    }

    async fn write(&self, record: &AuditRecord) -> Result<(), AuditError> {
        let body = MemoryGateObservation::from_record(record)?;
        let resp = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.sink_err(format!("{}: {}", self.url, e)))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(self.sink_err(format!("{} returned HTTP {}", self.url, status.as_u16())));
        }
        tracing::debug!("Audit record stored at {} (HTTP {})", self.url, status.as_u16());
        Ok(())
    }
}
