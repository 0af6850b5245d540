// src/registry/defaults.rs — Built-in host slash-command table
//
// Validated against the host CLI's command list. Config `[[commands]]`
// entries replace rows here by name.

use super::CommandEntry;

pub fn builtin() -> Vec<CommandEntry> {
    use CommandEntry as C;
    vec![
        // Session management
        C::blocked("/clear", "session", "Clear conversation history and start fresh", "destructive"),
        C::allowed("/compact", "session", "Compact conversation to free context"),
        C::blocked("/exit", "session", "Exit the REPL", "session_terminating"),
        C::blocked("/resume", "session", "Resume a previous conversation", "interactive"),
        C::blocked("/rename", "session", "Give the current session a name", "session_altering"),
        C::blocked("/rewind", "session", "Rewind conversation and/or code changes", "destructive"),
        C::blocked("/plan", "session", "Enter plan mode", "mode_change"),
        C::blocked("/teleport", "session", "Resume a remote session locally", "session_handoff"),
        C::blocked("/desktop", "session", "Hand off session to Desktop app", "session_handoff"),
        C::blocked("/fork", "session", "Branch conversation into a new session", "session_altering"),
        // Information and diagnostics
        C::blocked("/help", "info", "Show all available commands", "interactive"),
        C::blocked("/cost", "info", "Show token usage statistics", "does_not_exist"),
        C::allowed("/context", "info", "Visualize context window usage"),
        C::allowed("/status", "info", "Show version, model, account, connectivity"),
        C::allowed("/stats", "info", "Visualize daily usage, session history"),
        C::allowed("/usage", "info", "Show plan usage limits and rate limits"),
        C::allowed("/doctor", "info", "Check installation health"),
        C::allowed("/debug", "info", "Read session debug log"),
        C::allowed("/release-notes", "info", "View release notes"),
        // Configuration and settings
        C::blocked("/config", "config", "Open interactive settings", "config_modification"),
        C::blocked("/model", "config", "Change AI model", "config_modification"),
        C::blocked("/permissions", "config", "View or update tool permissions", "security_sensitive"),
        C::blocked("/theme", "config", "Change color theme", "config_modification"),
        C::blocked("/output-style", "config", "Configure response formatting", "config_modification"),
        C::blocked("/vim", "config", "Toggle vim editing mode", "config_modification"),
        C::blocked("/terminal-setup", "config", "Install keyboard shortcuts", "config_modification"),
        C::blocked("/statusline", "config", "Set up status line UI", "config_modification"),
        C::blocked("/sandbox", "config", "Enable sandboxed bash execution", "security_sensitive"),
        C::blocked("/fast", "config", "Toggle fast mode", "config_modification"),
        C::blocked("/privacy-settings", "config", "View and update privacy settings", "security_sensitive"),
        // Project and memory
        C::blocked("/init", "project", "Initialize project memory file", "project_modification"),
        C::blocked("/memory", "project", "Open memory file editor", "interactive"),
        C::blocked("/add-dir", "project", "Add working directories", "scope_change"),
        C::allowed("/todos", "project", "Show current TODO items"),
        // Development workflow
        C::blocked("/review", "workflow", "Request code review of recent changes", "triggers_analysis"),
        C::blocked("/pr-comments", "workflow", "View pull request comments", "context_dependent"),
        C::blocked("/install-github-app", "workflow", "Set up GitHub Actions integration", "external_integration"),
        // Tools and integrations
        C::blocked("/mcp", "tools", "Manage MCP server connections", "interactive"),
        C::allowed("/ide", "tools", "View IDE integrations and status"),
        C::blocked("/agents", "tools", "Manage custom subagents", "interactive"),
        C::blocked("/hooks", "tools", "Configure hooks", "config_modification"),
        C::blocked("/plugin", "tools", "Plugin management interface", "interactive"),
        // Account
        C::blocked("/login", "account", "Log in or switch accounts", "authentication"),
        C::blocked("/logout", "account", "Sign out", "authentication"),
        C::blocked("/upgrade", "account", "Upgrade subscription", "financial"),
        C::blocked("/passes", "account", "Manage guest passes", "account_management"),
        // Export and output
        C::blocked("/export", "output", "Export conversation to file/clipboard", "file_write"),
        C::blocked("/copy", "output", "Copy last response to clipboard", "low_risk_but_unnecessary"),
        // Background tasks
        C::allowed("/tasks", "background", "List and manage background tasks"),
        C::allowed("/bashes", "background", "List and manage background shells"),
        // Reporting, remote, migration
        C::blocked("/bug", "reporting", "Report a bug upstream", "external_communication"),
        C::blocked("/remote-env", "remote", "Configure remote environment", "config_modification"),
        C::blocked("/migrate-installer", "migration", "Migrate from npm to local install", "system_modification"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::CommandStatus;
    use std::collections::HashSet;

    #[test]
    fn test_builtin_counts() {
        let table = builtin();
        let allowed = table
            .iter()
            .filter(|e| e.default_status == CommandStatus::Allowed)
            .count();
        assert_eq!(allowed, 12);
        assert_eq!(table.len() - allowed, 41);
    }

    #[test]
    fn test_blocked_rows_have_reasons() {
        for entry in builtin() {
            match entry.default_status {
                CommandStatus::Blocked => assert!(entry.block_reason.is_some(), "{}", entry.name),
                CommandStatus::Allowed => assert!(entry.block_reason.is_none(), "{}", entry.name),
            }
        }
    }

    #[test]
    fn test_names_unique_and_slashed() {
        let table = builtin();
        let names: HashSet<_> = table.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names.len(), table.len());
        assert!(table.iter().all(|e| e.name.starts_with('/')));
    }
}
