//! Schema versioning for reports and config files.

/// Current schema version for JSON run reports.
///
/// Follows semver: MAJOR.MINOR.PATCH
/// - MAJOR: Breaking changes (field removals, type changes)
/// - MINOR: Additive changes (new optional fields)
/// - PATCH: Bug fixes, documentation
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Whether a document at `version` can be read by code written for `current`.
///
/// Versions are compatible when their major components match; an unparsable
/// version is never compatible.
pub fn is_compatible(current: &str, version: &str) -> bool {
    match (major(current), major(version)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

fn major(version: &str) -> Option<u32> {
    version.split('.').next().and_then(|s| s.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_major_compatible() {
        assert!(is_compatible(SCHEMA_VERSION, "1.0.0"));
        assert!(is_compatible(SCHEMA_VERSION, "1.4.2"));
    }

    #[test]
    fn test_different_major_incompatible() {
        assert!(!is_compatible(SCHEMA_VERSION, "0.9.0"));
        assert!(!is_compatible(SCHEMA_VERSION, "2.0.0"));
        assert!(!is_compatible(SCHEMA_VERSION, "garbage"));
    }
}
