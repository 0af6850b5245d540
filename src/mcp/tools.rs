// src/mcp/tools.rs — Tool definitions and dispatch onto the governor

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

use crate::core::types::*;
use crate::core::Governor;
use crate::registry::CommandSummary;

/// Text payload of a `tools/call` result.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    pub text: String,
    pub is_error: bool,
}

impl ToolOutput {
    fn ok(value: &impl Serialize) -> Self {
        Self {
            text: serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".into()),
            is_error: false,
        }
    }

    /// Policy denials are ordinary answers; everything else is flagged.
    fn err(e: &ToolError) -> Self {
        Self {
            text: serde_json::to_string_pretty(&e.to_json()).unwrap_or_else(|_| "{}".into()),
            is_error: !e.is_policy_denial(),
        }
    }

    pub fn into_result(self) -> Value {
        json!({
            "content": [{ "type": "text", "text": self.text }],
            "isError": self.is_error,
        })
    }
}

/// `tools/list` payload. The prompt and query descriptions name the commands
/// that are currently allowed so the agent does not have to guess.
pub fn definitions(catalog: &[CommandSummary]) -> Vec<Value> {
    let commands = if catalog.is_empty() {
        "(none)".to_string()
    } else {
        catalog
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };
    let described = if catalog.is_empty() {
        " (none)".to_string()
    } else {
        catalog
            .iter()
            .map(|c| {
                if c.description.is_empty() {
                    format!("\n- {}", c.name)
                } else {
                    format!("\n- {}: {}", c.name, c.description)
                }
            })
            .collect()
    };

    vec![
        json!({
            "name": PROMPT_TOOL,
            "description": format!(
                "Queue text as the next user input of this session. The text is typed after \
                 this call returns, so finish your current response first. Use follow_up to \
                 chain a second input after a slash command has rendered. Allowed slash \
                 commands: {commands}."
            ),
            "inputSchema": {
                "type": "object",
                "properties": {
                    "text": { "type": "string", "description": "Text to deliver as user input" },
                    "delay_ms": {
                        "type": "integer",
                        "description": "Delay before delivery (default 500)",
                        "minimum": 0
                    },
                    "follow_up": {
                        "type": "string",
                        "description": "Optional second input delivered after the first"
                    },
                    "follow_up_delay_ms": {
                        "type": "integer",
                        "description": "Gap between the first delivery and the follow-up (default 3000)",
                        "minimum": 0
                    },
                    "reason": { "type": "string", "description": "Why; written to the audit trail" }
                },
                "required": ["text"]
            }
        }),
        json!({
            "name": QUERY_TOOL,
            "description": format!(
                "Run a registered slash command, optionally followed by a prompt that reads \
                 its output. Blocked and unregistered commands are refused. Allowed:{described}"
            ),
            "inputSchema": {
                "type": "object",
                "properties": {
                    "command": { "type": "string", "description": "Slash command, e.g. /context" },
                    "follow_up": { "type": "string", "description": "Prompt delivered after the command" },
                    "delay_ms": {
                        "type": "integer",
                        "description": "Gap between the command and the follow-up (default 3000)",
                        "minimum": 0
                    },
                    "reason": { "type": "string" }
                },
                "required": ["command"]
            }
        }),
        json!({
            "name": STATUS_TOOL,
            "description": "Session state: turn count, limits, budget estimate, recent deliveries and terminal availability.",
            "inputSchema": { "type": "object", "properties": {} }
        }),
        json!({
            "name": CONFIGURE_TOOL,
            "description": "Allow or block slash commands for this session. Turn limit, cooldown, budget and audit mode are fixed at startup; requests to change them are reported but not applied.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "turn_limit": { "type": "integer" },
                    "cooldown_ms": { "type": "integer" },
                    "budget_usd": { "type": "number" },
                    "audit_mode": { "type": "string", "enum": ["remote", "local", "dual"] },
                    "set_command_status": {
                        "type": "object",
                        "description": "Map of command to \"ALLOWED\"/\"BLOCKED\" or {status, block_reason}",
                        "additionalProperties": {
                            "oneOf": [
                                { "type": "string" },
                                {
                                    "type": "object",
                                    "properties": {
                                        "status": { "type": "string" },
                                        "block_reason": { "type": "string" }
                                    },
                                    "required": ["status"]
                                }
                            ]
                        }
                    }
                }
            }
        }),
        json!({
            "name": REPORT_COST_TOOL,
            "description": "Correct the spend estimate with an observed cost. mode=replace sets the estimate, mode=adjust adds a signed delta.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "spent_usd": { "type": "number" },
                    "mode": { "type": "string", "enum": ["replace", "adjust"] }
                },
                "required": ["spent_usd"]
            }
        }),
    ]
}

fn args<T: DeserializeOwned>(arguments: Value) -> Result<T, ToolError> {
    let arguments = if arguments.is_null() {
        json!({})
    } else {
        arguments
    };
    serde_json::from_value(arguments).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

/// Execute one tool. Deliveries are acknowledged as soon as they are
/// scheduled; the sequence finishes in the background.
pub async fn call(governor: &Governor, name: &str, arguments: Value) -> ToolOutput {
    let result = match name {
        PROMPT_TOOL => match args::<PromptRequest>(arguments) {
            Ok(req) => governor
                .prompt(req)
                .await
                .map(|d| ToolOutput::ok(&d.into_ack())),
            Err(e) => Err(e),
        },
        QUERY_TOOL => match args::<QueryRequest>(arguments) {
            Ok(req) => governor
                .query(req)
                .await
                .map(|d| ToolOutput::ok(&d.into_ack())),
            Err(e) => Err(e),
        },
        STATUS_TOOL => Ok(ToolOutput::ok(&governor.status().await)),
        CONFIGURE_TOOL => match args::<ConfigureRequest>(arguments) {
            Ok(req) => governor.configure(req).await.map(|r| ToolOutput::ok(&r)),
            Err(e) => Err(e),
        },
        REPORT_COST_TOOL => match args::<CostReport>(arguments) {
            Ok(req) => governor.report_cost(req).await.map(|r| ToolOutput::ok(&r)),
            Err(e) => Err(e),
        },
        other => {
            return ToolOutput {
                text: json!({
                    "status": "error",
                    "error_code": "UNKNOWN_TOOL",
                    "message": format!("Unknown tool: {other}"),
                })
                .to_string(),
                is_error: true,
            }
        }
    };
    result.unwrap_or_else(|e| ToolOutput::err(&e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definitions_cover_every_tool() {
        let defs = definitions(&[CommandSummary {
            name: "/context".into(),
            category: "info".into(),
            description: "Show context usage".into(),
        }]);
        let names: Vec<&str> = defs.iter().filter_map(|d| d["name"].as_str()).collect();
        assert_eq!(
            names,
            vec![PROMPT_TOOL, QUERY_TOOL, STATUS_TOOL, CONFIGURE_TOOL, REPORT_COST_TOOL]
        );
        assert!(defs[0]["description"]
            .as_str()
            .unwrap()
            .contains("/context"));
        assert!(defs[1]["description"]
            .as_str()
            .unwrap()
            .contains("- /context: Show context usage"));
    }

    #[test]
    fn test_definitions_with_nothing_allowed() {
        let defs = definitions(&[]);
        assert!(defs[0]["description"].as_str().unwrap().contains("(none)"));
        assert!(defs[1]["description"]
            .as_str()
            .unwrap()
            .ends_with("Allowed: (none)"));
    }

    #[test]
    fn test_policy_denial_not_flagged() {
        let denied = ToolOutput::err(&ToolError::CommandUnknown {
            command: "/nope".into(),
        });
        assert!(!denied.is_error);

        let failed = ToolOutput::err(&ToolError::AuditUnavailable {
            message: "down".into(),
        });
        assert!(failed.is_error);
        let result = failed.into_result();
        assert_eq!(result["isError"], true);
        assert_eq!(result["content"][0]["type"], "text");
    }

    #[test]
    fn test_null_arguments_become_empty_object() {
        let parsed: Result<ConfigureRequest, _> = args(Value::Null);
        assert!(parsed.is_ok());
        let missing: Result<PromptRequest, _> = args(Value::Null);
        assert!(matches!(missing, Err(ToolError::InvalidArguments(_))));
    }
}
