//! Branch and repository name rules.
//!
//! Branch names follow git conventions, so that a checkout or export never
//! meets a name it cannot represent:
//! - non-empty, no whitespace or control characters, none of `~^:?*[\`
//! - no `..`, no `@{`
//! - no leading or trailing `.` or `/`, no `.lock` suffix
//! - `/`-separated components that are non-empty and do not start with `.`
//!
//! Repository names are single path-free components.

use crate::error::{LedgerError, LedgerResult};

const FORBIDDEN_CHARS: &[char] = &['~', '^', ':', '?', '*', '[', '\\'];

/// Longest accepted repository name, in bytes.
pub const MAX_REPO_NAME_LEN: usize = 100;

fn bad_branch(name: &str, reason: impl Into<String>) -> LedgerError {
    LedgerError::InvalidBranchName {
        name: name.to_string(),
        reason: reason.into(),
    }
}

/// Validate a branch name.
///
/// ```
/// use ledgit_ledger::names::validate_branch_name;
///
/// assert!(validate_branch_name("main").is_ok());
/// assert!(validate_branch_name("feature/auth").is_ok());
/// assert!(validate_branch_name("").is_err());
/// assert!(validate_branch_name("bad..name").is_err());
/// ```
pub fn validate_branch_name(name: &str) -> LedgerResult<()> {
    if name.is_empty() {
        return Err(bad_branch(name, "branch name must not be empty"));
    }
    if let Some(ch) = name
        .chars()
        .find(|c| c.is_whitespace() || c.is_control() || FORBIDDEN_CHARS.contains(c))
    {
        return Err(bad_branch(name, format!("contains forbidden character: {ch:?}")));
    }
    for (pattern, reason) in [("..", "must not contain '..'"), ("@{", "must not contain '@{'")] {
        if name.contains(pattern) {
            return Err(bad_branch(name, reason));
        }
    }
    if name.starts_with(['.', '/']) || name.ends_with(['.', '/']) {
        return Err(bad_branch(name, "must not start or end with '.' or '/'"));
    }
    if name.ends_with(".lock") {
        return Err(bad_branch(name, "must not end with '.lock'"));
    }
    for component in name.split('/') {
        if component.is_empty() {
            return Err(bad_branch(name, "path components must not be empty"));
        }
        if component.starts_with('.') {
            return Err(bad_branch(
                name,
                format!("component must not start with '.': {component:?}"),
            ));
        }
    }
    Ok(())
}

/// Validate a repository name.
pub fn validate_repo_name(name: &str) -> LedgerResult<()> {
    let bad = |reason: &str| LedgerError::InvalidRepoName {
        name: name.to_string(),
        reason: reason.to_string(),
    };
    if name.trim().is_empty() {
        return Err(bad("repository name must not be empty"));
    }
    if name.len() > MAX_REPO_NAME_LEN {
        return Err(bad("repository name is too long"));
    }
    if name.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(bad("must not contain whitespace or control characters"));
    }
    if name.contains(['/', '\\']) {
        return Err(bad("must not contain path separators"));
    }
    if name == "." || name == ".." {
        return Err(bad("must not be a relative path"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_branch_names() {
        for name in ["main", "develop", "my-branch", "v1.0", "feature/auth", "user/alice/fix-123"] {
            assert!(validate_branch_name(name).is_ok(), "{name} should be valid");
        }
    }

    #[test]
    fn reject_bad_branch_names() {
        for name in [
            "",
            "bad..name",
            "has space",
            "has\ttab",
            "a~b",
            "a^b",
            "a:b",
            "a?b",
            "a*b",
            "a[b",
            "a\\b",
            ".hidden",
            "trailing.",
            "/leading",
            "trailing/",
            "a//b",
            "main.lock",
            "ref@{0}",
            "feature/.hidden",
        ] {
            assert!(validate_branch_name(name).is_err(), "{name:?} should be rejected");
        }
    }

    #[test]
    fn branch_error_names_the_branch() {
        let err = validate_branch_name("a b").unwrap_err();
        assert!(err.to_string().contains("\"a b\""));
    }

    #[test]
    fn repo_names() {
        assert!(validate_repo_name("demo").is_ok());
        assert!(validate_repo_name("my.site-v2").is_ok());
        assert!(validate_repo_name("").is_err());
        assert!(validate_repo_name("   ").is_err());
        assert!(validate_repo_name("a/b").is_err());
        assert!(validate_repo_name("a b").is_err());
        assert!(validate_repo_name("..").is_err());
        assert!(validate_repo_name(&"x".repeat(101)).is_err());
    }
}
