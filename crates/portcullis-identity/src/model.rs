//! Identity value types: principal, group set, and the pair of both.

use std::collections::HashSet;
use std::fmt::{self, Display, Formatter};

use serde::Serialize;

use crate::error::{IdentityError, IdentityResult};

/// Authenticated caller name. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Principal(String);

impl Principal {
    /// Construct a principal, rejecting empty or whitespace-only names.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::EmptyPrincipal`] when `name` is blank.
    pub fn new(name: impl Into<String>) -> IdentityResult<Self> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(IdentityError::EmptyPrincipal);
        }
        if trimmed.len() == name.len() {
            Ok(Self(name))
        } else {
            Ok(Self(trimmed.to_string()))
        }
    }

    /// Borrow the principal name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Principal {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

/// Ordered group names associated with a principal.
///
/// Duplicates may be pushed; [`GroupSet::deduplicated`] drops repeats keeping
/// the first occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct GroupSet(Vec<String>);

impl GroupSet {
    /// Empty group set.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Append a group, ignoring blank names.
    pub fn push(&mut self, group: impl Into<String>) {
        let group = group.into();
        let trimmed = group.trim();
        if !trimmed.is_empty() {
            self.0.push(trimmed.to_string());
        }
    }

    /// Append every group yielded by `groups`.
    pub fn extend<I, S>(&mut self, groups: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for group in groups {
            self.push(group);
        }
    }

    /// Copy with repeated names removed, first occurrence wins.
    #[must_use]
    pub fn deduplicated(&self) -> Self {
        let mut seen = HashSet::with_capacity(self.0.len());
        Self(
            self.0
                .iter()
                .filter(|group| seen.insert(group.as_str()))
                .cloned()
                .collect(),
        )
    }

    /// Copy holding only groups accepted by `keep`.
    #[must_use]
    pub fn filtered(&self, keep: impl Fn(&str) -> bool) -> Self {
        Self(self.0.iter().filter(|g| keep(g.as_str())).cloned().collect())
    }

    /// Whether `group` is present.
    #[must_use]
    pub fn contains(&self, group: &str) -> bool {
        self.0.iter().any(|candidate| candidate == group)
    }

    /// Iterate group names in order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Number of entries, duplicates included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set holds no groups.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Distinct names as a set.
    #[must_use]
    pub fn to_set(&self) -> HashSet<String> {
        self.0.iter().cloned().collect()
    }
}

impl<S: Into<String>> FromIterator<S> for GroupSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut groups = Self::new();
        groups.extend(iter);
        groups
    }
}

/// An asserted identity: who the caller is and which groups they belong to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    /// Caller name.
    pub principal: Principal,
    /// Caller groups.
    pub groups: GroupSet,
}

impl Identity {
    /// Pair a principal with its groups.
    #[must_use]
    pub const fn new(principal: Principal, groups: GroupSet) -> Self {
        Self { principal, groups }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn principal_rejects_blank_names() {
        assert!(matches!(Principal::new(""), Err(IdentityError::EmptyPrincipal)));
        assert!(matches!(
            Principal::new("   "),
            Err(IdentityError::EmptyPrincipal)
        ));
        let principal = Principal::new(" guest ").map(|p| p.to_string());
        assert_eq!(principal.ok().as_deref(), Some("guest"));
    }

    #[test]
    fn group_set_skips_blanks_and_deduplicates_in_order() {
        let groups: GroupSet = ["ops", "", " audit ", "ops", "dev"].into_iter().collect();
        assert_eq!(groups.len(), 4);
        let unique = groups.deduplicated();
        assert_eq!(unique.iter().collect::<Vec<_>>(), vec!["ops", "audit", "dev"]);
        assert!(unique.contains("audit"));
        assert!(!unique.contains(""));
    }

    #[test]
    fn filtered_keeps_matching_groups() {
        let groups: GroupSet = ["hadoop-admin", "users", "hadoop-ops"].into_iter().collect();
        let hadoop = groups.filtered(|g| g.starts_with("hadoop"));
        assert_eq!(hadoop.iter().collect::<Vec<_>>(), vec!["hadoop-admin", "hadoop-ops"]);
    }
}
