// src/injector/tmux.rs — tmux send-keys adapter

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use super::{InjectionError, TerminalInjector};

/// Types into a tmux pane with `send-keys`. `-l` keeps the text literal so
/// key names inside a prompt are not interpreted.
pub struct TmuxInjector {
    target: String,
}

impl TmuxInjector {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }

    fn send_keys_args<'a>(&'a self, keys: &'a str, literal: bool) -> Vec<&'a str> {
        let mut args = vec!["send-keys", "-t", self.target.as_str()];
        if literal {
            args.push("-l");
        }
        args.push(keys);
        args
    }

    async fn tmux(&self, args: &[&str]) -> Result<(), InjectionError> {
        let output = Command::new("tmux")
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| InjectionError::Unavailable(format!("failed to run tmux: {e}")))?;

        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(InjectionError::Write(format!(
            "tmux {} exited with {}: {}",
            args.first().copied().unwrap_or_default(),
            output.status,
            stderr.trim()
        )))
    }
}

#[async_trait]
impl TerminalInjector for TmuxInjector {
    fn name(&self) -> &str {
        "tmux"
    }

    async fn health_check(&self) -> Result<(), InjectionError> {
        self.tmux(&["display-message", "-p", "-t", &self.target, "#{pane_id}"])
            .await
            .map_err(|e| InjectionError::Unavailable(e.to_string()))
    }

    async fn type_text(&self, text: &str) -> Result<(), InjectionError> {
        if text.is_empty() {
            return Ok(());
        }
        self.tmux(&self.send_keys_args(text, true)).await
    }

    async fn submit(&self) -> Result<(), InjectionError> {
        self.tmux(&self.send_keys_args("Enter", false)).await
    }
}
