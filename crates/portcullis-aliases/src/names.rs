//! Cluster and alias name rules.

use crate::error::{AliasError, AliasResult};

/// Reserved cluster holding gateway-wide aliases.
pub const DEFAULT_CLUSTER: &str = "__gateway";

/// Cluster names become file names, so only `[A-Za-z0-9._-]` is allowed.
///
/// # Errors
///
/// Returns [`AliasError::InvalidName`] for empty names, names containing other
/// characters, or names made only of dots.
pub fn validate_cluster(cluster: &str) -> AliasResult<()> {
    let invalid = |reason| AliasError::InvalidName {
        field: "cluster",
        reason,
        value: cluster.to_string(),
    };
    if cluster.is_empty() {
        return Err(invalid("empty"));
    }
    if !cluster
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    {
        return Err(invalid("invalid_character"));
    }
    if cluster.chars().all(|c| c == '.') {
        return Err(invalid("reserved"));
    }
    Ok(())
}

/// Alias names must be non-empty and free of whitespace, `,` and `@`.
///
/// # Errors
///
/// Returns [`AliasError::InvalidName`] when the name breaks a rule.
pub fn validate_alias(alias: &str) -> AliasResult<()> {
    let invalid = |reason| AliasError::InvalidName {
        field: "alias",
        reason,
        value: alias.to_string(),
    };
    if alias.is_empty() {
        return Err(invalid("empty"));
    }
    if alias.chars().any(|c| c.is_whitespace() || c == ',' || c == '@') {
        return Err(invalid("invalid_character"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cluster_names_are_file_safe() {
        for ok in ["__gateway", "cluster1", "sandbox.v2", "a-b_c"] {
            assert!(validate_cluster(ok).is_ok(), "{ok}");
        }
        for bad in ["", "..", "a/b", "has space", "x\\y"] {
            assert!(validate_cluster(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn alias_names_reject_separators() {
        assert!(validate_alias("test_key").is_ok());
        assert!(validate_alias("gateway-identity-passphrase").is_ok());
        for bad in ["", "a b", "a,b", "user@realm", "tab\there"] {
            assert!(
                matches!(validate_alias(bad), Err(AliasError::InvalidName { field: "alias", .. })),
                "{bad}"
            );
        }
    }
}
