// src/registry/mod.rs — Command registry
//
// Immutable default table plus a sparse override layer. Effective status is
// `overrides ?? defaults ?? Unknown`; every name classifies to exactly one of
// the three states.

pub mod defaults;

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::infra::config::CommandConfig;

/// Status a command can be configured with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CommandStatus {
    Allowed,
    Blocked,
}

impl CommandStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allowed => "ALLOWED",
            Self::Blocked => "BLOCKED",
        }
    }

    /// Case-insensitive parse used by the configure tool.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ALLOWED" | "ALLOW" => Some(Self::Allowed),
            "BLOCKED" | "BLOCK" => Some(Self::Blocked),
            _ => None,
        }
    }
}

/// Result of looking a name up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Allowed,
    Blocked { reason: String },
    Unknown,
}

impl Classification {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Allowed => "ALLOWED",
            Self::Blocked { .. } => "BLOCKED",
            Self::Unknown => "UNKNOWN",
        }
    }
}

/// A seeded command definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandEntry {
    pub name: String,
    pub default_status: CommandStatus,
    pub category: String,
    /// Present iff `default_status` is `Blocked`.
    pub block_reason: Option<String>,
    pub description: String,
}

impl CommandEntry {
    pub fn allowed(name: &str, category: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            default_status: CommandStatus::Allowed,
            category: category.to_string(),
            block_reason: None,
            description: description.to_string(),
        }
    }

    pub fn blocked(name: &str, category: &str, description: &str, reason: &str) -> Self {
        Self {
            name: name.to_string(),
            default_status: CommandStatus::Blocked,
            category: category.to_string(),
            block_reason: Some(reason.to_string()),
            description: description.to_string(),
        }
    }
}

impl From<&CommandConfig> for CommandEntry {
    fn from(cfg: &CommandConfig) -> Self {
        Self {
            name: normalize(&cfg.name),
            default_status: cfg.status,
            category: cfg.category.clone(),
            block_reason: match cfg.status {
                CommandStatus::Blocked => cfg.block_reason.clone(),
                CommandStatus::Allowed => None,
            },
            description: cfg.description.clone(),
        }
    }
}

/// An allowed command as advertised to the agent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandSummary {
    pub name: String,
    pub category: String,
    pub description: String,
}

/// Process-lifetime override of a command's status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Override {
    pub status: CommandStatus,
    pub block_reason: Option<String>,
}

/// Request to change a command's status.
#[derive(Debug, Clone, Default)]
pub struct OverrideRequest {
    pub status: Option<CommandStatus>,
    pub block_reason: Option<String>,
}

/// Reason used when a command is blocked at runtime without one.
pub const CONFIGURE_BLOCK_REASON: &str = "blocked_by_configure";

/// Ensure the leading slash the host expects.
pub fn normalize(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

/// Three-way classification table.
#[derive(Debug, Clone)]
pub struct CommandRegistry {
    defaults: HashMap<String, CommandEntry>,
    overrides: HashMap<String, Override>,
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new(defaults::builtin())
    }
}

impl CommandRegistry {
    pub fn new(entries: Vec<CommandEntry>) -> Self {
        let defaults = entries
            .into_iter()
            .map(|mut e| {
                e.name = normalize(&e.name);
                (e.name.clone(), e)
            })
            .collect();
        Self {
            defaults,
            overrides: HashMap::new(),
        }
    }

    /// Built-in table with config entries layered on top.
    pub fn from_config(commands: &[CommandConfig]) -> Self {
        let mut registry = Self::default();
        for cfg in commands {
            let entry = CommandEntry::from(cfg);
            registry.defaults.insert(entry.name.clone(), entry);
        }
        registry
    }

    pub fn classify(&self, name: &str) -> Classification {
        let name = normalize(name);
        let effective = self
            .overrides
            .get(&name)
            .map(|o| (o.status, o.block_reason.clone()))
            .or_else(|| {
                self.defaults
                    .get(&name)
                    .map(|e| (e.default_status, e.block_reason.clone()))
            });

        match effective {
            Some((CommandStatus::Allowed, _)) => Classification::Allowed,
            Some((CommandStatus::Blocked, reason)) => Classification::Blocked {
                reason: reason.unwrap_or_else(|| CONFIGURE_BLOCK_REASON.to_string()),
            },
            None => Classification::Unknown,
        }
    }

    /// Set the effective status of `name`, returning the previous
    /// classification. Applying the same override twice is a no-op.
    pub fn set_override(&mut self, name: &str, request: OverrideRequest) -> Classification {
        let name = normalize(name);
        let previous = self.classify(&name);

        let Some(status) = request.status else {
            return previous;
        };

        let block_reason = match status {
            CommandStatus::Allowed => None,
            CommandStatus::Blocked => Some(
                request
                    .block_reason
                    .or_else(|| match &previous {
                        Classification::Blocked { reason } => Some(reason.clone()),
                        _ => None,
                    })
                    .or_else(|| self.defaults.get(&name).and_then(|e| e.block_reason.clone()))
                    .unwrap_or_else(|| CONFIGURE_BLOCK_REASON.to_string()),
            ),
        };

        tracing::info!(
            "Command '{}' override: {} -> {}",
            name,
            previous.label(),
            status.as_str()
        );
        self.overrides.insert(
            name,
            Override {
                status,
                block_reason,
            },
        );
        previous
    }

    /// Default definition, if the command is seeded.
    pub fn entry(&self, name: &str) -> Option<&CommandEntry> {
        self.defaults.get(&normalize(name))
    }

    /// Sorted names currently classified as Allowed.
    pub fn allowed_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .defaults
            .keys()
            .chain(self.overrides.keys())
            .filter(|n| self.classify(n) == Classification::Allowed)
            .cloned()
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Allowed commands with their descriptions, sorted by name. Names that
    /// only exist as overrides are listed as `custom`.
    pub fn allowed_catalog(&self) -> Vec<CommandSummary> {
        self.allowed_names()
            .into_iter()
            .map(|name| match self.entry(&name) {
                Some(e) => CommandSummary {
                    category: e.category.clone(),
                    description: e.description.clone(),
                    name,
                },
                None => CommandSummary {
                    name,
                    category: "custom".into(),
                    description: String::new(),
                },
            })
            .collect()
    }

    /// Snapshot of active overrides for status output.
    pub fn overrides(&self) -> BTreeMap<String, Override> {
        self.overrides
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.defaults.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defaults.is_empty()
    }
}
