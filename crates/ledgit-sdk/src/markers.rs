//! Issue-closing references in pull request descriptions.
//!
//! A reference is a keyword (`close`, `closes`, `closed`, `fix`, `fixes`,
//! `fixed`, `resolve`, `resolves`, `resolved`, any case), then whitespace or
//! a colon, then `#` and an issue id or id prefix:
//!
//! ```text
//! Fixes #0190f3a2 and closes: #0190f3a2-1b2c-7d4e-8f00-123456789abc
//! ```

use std::sync::OnceLock;

use ledgit_types::RecordId;
use regex::Regex;

/// Shortest id prefix a reference may use.
pub const MIN_PREFIX_LEN: usize = 8;

fn pattern() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| {
        Regex::new(r"(?i)\b(?:close[sd]?|fix(?:e[sd])?|resolve[sd]?)[\s:]+#([0-9a-f][0-9a-f-]*)")
            .expect("closing marker pattern is valid")
    })
}

/// Issue references found in `text`, in order of first appearance, each
/// once. Ids are lowercased with trailing dashes removed.
pub fn parse_closing_markers(text: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for caps in pattern().captures_iter(text) {
        let id = caps[1].trim_end_matches('-').to_ascii_lowercase();
        if !out.contains(&id) {
            out.push(id);
        }
    }
    out
}

/// Resolve one reference against candidate ids: an exact id, or a prefix of
/// at least [`MIN_PREFIX_LEN`] hex digits that matches exactly one id.
pub fn match_reference<'a>(
    reference: &str,
    ids: impl IntoIterator<Item = &'a RecordId>,
) -> Option<RecordId> {
    let ids: Vec<&RecordId> = ids.into_iter().collect();
    if let Ok(exact) = reference.parse::<RecordId>() {
        return ids.into_iter().find(|id| **id == exact).copied();
    }
    let digits = reference.chars().filter(|c| *c != '-').count();
    if digits < MIN_PREFIX_LEN {
        return None;
    }
    let mut hits = ids.into_iter().filter(|id| id.matches_prefix(reference));
    match (hits.next(), hits.next()) {
        (Some(id), None) => Some(*id),
        _ => None,
    }
}
