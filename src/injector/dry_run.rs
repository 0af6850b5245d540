// src/injector/dry_run.rs — Logs deliveries instead of typing them

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use super::{InjectionError, TerminalInjector};
use crate::util::preview;

#[derive(Debug, Default)]
pub struct DryRunInjector {
    submitted: AtomicU64,
}

impl DryRunInjector {
    /// Number of lines that would have been submitted.
    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl TerminalInjector for DryRunInjector {
    fn name(&self) -> &str {
        "dry_run"
    }

    async fn health_check(&self) -> Result<(), InjectionError> {
        Ok(())
    }

    async fn type_text(&self, text: &str) -> Result<(), InjectionError> {
        tracing::info!("[dry run] type: {}", preview(text, 80));
        Ok(())
    }

    async fn submit(&self) -> Result<(), InjectionError> {
        let n = self.submitted.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::info!("[dry run] submit #{}", n);
        Ok(())
    }
}
