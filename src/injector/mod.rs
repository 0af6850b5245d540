// src/injector/mod.rs — Terminal injector capability
//
// The governor never synthesizes input itself; it drives whatever adapter
// implements `TerminalInjector`.

pub mod dry_run;
pub mod tmux;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::infra::config::{InjectorConfig, InjectorKind};
use crate::infra::errors::VelleError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InjectionError {
    #[error("terminal not available: {0}")]
    Unavailable(String),

    #[error("write to terminal failed: {0}")]
    Write(String),
}

/// Delivers raw input into the host terminal's input stream.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TerminalInjector: Send + Sync {
    fn name(&self) -> &str;

    /// Cheap availability check with no effect on the terminal.
    async fn health_check(&self) -> Result<(), InjectionError>;

    /// Type `text` without submitting it.
    async fn type_text(&self, text: &str) -> Result<(), InjectionError>;

    /// Send the confirmation (Enter) that submits the typed line.
    async fn submit(&self) -> Result<(), InjectionError>;
}

/// Build the injector selected in config.
pub fn build_injector(cfg: &InjectorConfig) -> Result<Arc<dyn TerminalInjector>, VelleError> {
    match cfg.kind {
        InjectorKind::Tmux => {
            let target = cfg
                .target
                .clone()
                .or_else(|| std::env::var("TMUX_PANE").ok())
                .ok_or_else(|| {
                    VelleError::Injector(
                        "no tmux target: set injector.target or run inside tmux".into(),
                    )
                })?;
            tracing::info!("Terminal injector: tmux pane {}", target);
            Ok(Arc::new(tmux::TmuxInjector::new(target)))
        }
        InjectorKind::DryRun => {
            tracing::warn!("Terminal injector: dry run, deliveries are only logged");
            Ok(Arc::new(dry_run::DryRunInjector::default()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_dry_run() {
        let cfg = InjectorConfig {
            kind: InjectorKind::DryRun,
            target: None,
        };
        let injector = build_injector(&cfg).unwrap();
        assert_eq!(injector.name(), "dry_run");
    }

    #[test]
    fn test_build_tmux_with_explicit_target() {
        let cfg = InjectorConfig {
            kind: InjectorKind::Tmux,
            target: Some("%3".into()),
        };
        let injector = build_injector(&cfg).unwrap();
        assert_eq!(injector.name(), "tmux");
    }
}
