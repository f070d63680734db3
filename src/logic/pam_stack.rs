//! Pure text operations on a PAM policy file

use std::path::Path;

/// The `pam_u2f` requirement for a given credential file
pub fn requirement_line(authfile: &Path) -> String {
    format!("auth required pam_u2f.so authfile={} cue", authfile.display())
}

/// Whitespace-insensitive form of a policy line
fn normalize(line: &str) -> String {
    line.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Exact match on the trimmed line
pub fn is_configured(policy: &str, required: &str) -> bool {
    policy.lines().any(|line| line.trim() == required.trim())
}

/// An `auth` entry for `pam_u2f` other than the required one
fn is_stale_u2f_entry(line: &str, required: &str) -> bool {
    let mut tokens = line.split_whitespace();
    tokens.next() == Some("auth")
        && tokens.any(|t| t.ends_with("pam_u2f.so"))
        && line.trim() != required.trim()
}

/// New policy text with `required` placed directly before the first anchor
///
/// Existing `pam_u2f` auth entries are dropped so the stack holds a single
/// hardware-key requirement. Returns `None` when no anchor is present;
/// the caller must then leave the file alone.
pub fn insert_requirement(policy: &str, required: &str, anchors: &[String]) -> Option<String> {
    let anchors: Vec<String> = anchors.iter().map(|a| normalize(a)).collect();

    let mut lines: Vec<&str> = policy
        .lines()
        .filter(|line| !is_stale_u2f_entry(line, required))
        .collect();

    let position = lines
        .iter()
        .position(|line| anchors.contains(&normalize(line)))?;
    lines.insert(position, required);

    let mut updated = lines.join("\n");
    updated.push('\n');
    Some(updated)
}

/// Number of stale `pam_u2f` entries `insert_requirement` would drop
pub fn stale_entries(policy: &str, required: &str) -> usize {
    policy
        .lines()
        .filter(|line| is_stale_u2f_entry(line, required))
        .count()
}
