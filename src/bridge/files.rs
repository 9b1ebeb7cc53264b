//! Files-created extraction from tool output text

use regex::Regex;
use std::sync::LazyLock;

static CREATED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[Cc]reated (?:file|entry|taxonomy|world)[:\s]+(\S+)").expect("valid regex")
});

static SAVED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[Ss]aved to[:\s]+(\S+)").expect("valid regex"));

static BARE_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([^\s"'`()<>\[\]]+\.(?i:md|png|jpg|json|html))\b"#).expect("valid regex")
});

const TRIM: &[char] = &['.', ',', ';', ':', '!', '?', '"', '\'', '`', '(', ')', '[', ']', '<', '>'];

/// Paths a tool reports having created, deduplicated in order of appearance.
///
/// Recognizes `Created file|entry|taxonomy|world: <path>`, `Saved to: <path>`,
/// and bare paths ending in `.md`, `.png`, `.jpg`, `.json` or `.html`.
pub fn extract_created_files(text: &str) -> Vec<String> {
    let mut found: Vec<(usize, &str)> = Vec::new();
    for pattern in [&*CREATED, &*SAVED, &*BARE_PATH] {
        for caps in pattern.captures_iter(text) {
            if let Some(m) = caps.get(1) {
                found.push((m.start(), m.as_str()));
            }
        }
    }
    found.sort_by_key(|(start, _)| *start);

    let mut files: Vec<String> = Vec::new();
    for (_, raw) in found {
        let path = raw.trim_matches(TRIM);
        if !path.is_empty() && !files.iter().any(|f| f == path) {
            files.push(path.to_string());
        }
    }
    files
}
