/// Convenience helper for snapshotting parser output as compact JSON.
pub fn snapshot_from_str(input: &str) -> String {
    match crate::parse(input) {
        Ok(statements) => serde_json::to_string(&statements)
            .unwrap_or_else(|err| format!("failed to render JSON: {err}")),
        Err(err) => format!("parse error: {err}"),
    }
}

/// Render each parsed statement on its own line.
pub fn render_from_str(input: &str) -> String {
    match crate::parse(input) {
        Ok(statements) => statements
            .iter()
            .map(|s| format!("{}: {}", s.line, s))
            .collect::<Vec<_>>()
            .join("\n"),
        Err(err) => format!("parse error: {err}"),
    }
}
