// src/util.rs — Shared utility functions

/// Short single-line rendering of `text` for logs and the status tool.
///
/// Keeps at most `max_chars` characters (not bytes), flattens newlines,
/// and appends `…` when something was cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    let flat: String = text
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let mut out: String = flat.chars().take(max_chars).collect();
    out.push('…');
    out
}
