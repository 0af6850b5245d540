// src/cli/audit.rs — `velle audit`: tail the local audit log

use std::path::Path;

use crate::audit::{self, AuditRecord};
use crate::infra::config::Config;
use crate::util::preview;

pub fn show_audit(config: &Config, limit: usize, json: bool) -> anyhow::Result<()> {
    let path = config.audit.resolved_local_path();
    print!("{}", render(&path, limit, json)?);
    Ok(())
}

fn render(path: &Path, limit: usize, json: bool) -> anyhow::Result<String> {
    let records = audit::read_recent(path, limit);
    if records.is_empty() {
        return Ok(format!("No audit records in {}\n", path.display()));
    }

    let mut out = String::new();
    for record in &records {
        if json {
            out.push_str(&serde_json::to_string(record)?);
        } else {
            out.push_str(&format_line(record));
        }
        out.push('\n');
    }
    Ok(out)
}

fn format_line(r: &AuditRecord) -> String {
    let step = r.step.as_deref().unwrap_or("-");
    let code = r
        .error_code
        .as_deref()
        .map(|c| format!(" [{c}]"))
        .unwrap_or_default();
    format!(
        "{}  turn {:>3}  {:<17} {:<10} {:<18}{}  {}",
        r.timestamp.format("%Y-%m-%d %H:%M:%S"),
        r.turn,
        r.tool,
        step,
        r.outcome,
        code,
        preview(&r.payload, 60)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    #[test]
    fn test_render_empty() {
        let dir = TempDir::new().unwrap();
        let out = render(&dir.path().join("none.jsonl"), 10, false).unwrap();
        assert!(out.starts_with("No audit records"));
    }

    #[test]
    fn test_render_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.jsonl");
        let record = AuditRecord::new(Utc::now(), "s", "velle_query", 2, "/exit", "blocked")
            .with_error_code("COMMAND_BLOCKED")
            .as_decision();
        std::fs::write(&path, format!("{}\n", serde_json::to_string(&record).unwrap())).unwrap();

        let out = render(&path, 10, false).unwrap();
        assert!(out.contains("velle_query"));
        assert!(out.contains("[COMMAND_BLOCKED]"));
        assert!(out.contains("decision"));

        let raw = render(&path, 10, true).unwrap();
        let parsed: AuditRecord = serde_json::from_str(raw.trim()).unwrap();
        assert_eq!(parsed, record);
    }
}
