/// Export filename `{prefix}_{job_id}.{extension}` with the id made filesystem-safe.
pub fn export_filename(prefix: &str, job_id: &str, extension: &str) -> String {
    format!("{prefix}_{}.{extension}", sanitize_component(job_id))
}

fn sanitize_component(input: &str) -> String {
    let cleaned: String = input
        .chars()
        .map(|c| if is_forbidden(c) { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim_matches(&['_', ' ', '.'][..]);
    if cleaned.is_empty() {
        return "unnamed".to_string();
    }

    // Collapse runs of underscores
    let mut compacted = String::with_capacity(cleaned.len());
    let mut prev_underscore = false;
    for c in cleaned.chars() {
        if c == '_' && prev_underscore {
            continue;
        }
        prev_underscore = c == '_';
        compacted.push(c);
    }
    if compacted.chars().count() > 100 {
        compacted = compacted.chars().take(100).collect();
    }
    compacted
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}'
    )
}
