//! Principal and group mapping rules.
//!
//! Rules use the `names=targets;names=targets` syntax, where both sides are
//! comma separated and `*` on the left applies a rule to every principal.

use std::collections::HashMap;
use std::sync::Arc;

use crate::authn::UserDirectory;
use crate::error::{IdentityError, IdentityResult};
use crate::model::{GroupSet, Principal};

const WILDCARD: &str = "*";

/// One parsed `names=targets` rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingRule {
    /// Principals the rule applies to.
    pub sources: Vec<String>,
    /// Values assigned to those principals.
    pub targets: Vec<String>,
}

/// Parse a mapping specification into rules, in order.
///
/// # Errors
///
/// Returns [`IdentityError::InvalidMapping`] for a segment without `=` or with
/// an empty side.
pub fn parse_rules(spec: &str) -> IdentityResult<Vec<MappingRule>> {
    let mut rules = Vec::new();
    for segment in spec.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        let (left, right) = segment
            .split_once('=')
            .ok_or_else(|| IdentityError::InvalidMapping {
                rule: segment.to_string(),
                reason: "missing_equals",
            })?;
        let sources = split_names(left);
        let targets = split_names(right);
        if sources.is_empty() {
            return Err(IdentityError::InvalidMapping {
                rule: segment.to_string(),
                reason: "empty_source",
            });
        }
        if targets.is_empty() {
            return Err(IdentityError::InvalidMapping {
                rule: segment.to_string(),
                reason: "empty_target",
            });
        }
        rules.push(MappingRule { sources, targets });
    }
    Ok(rules)
}

fn split_names(side: &str) -> Vec<String> {
    side.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Renames authenticated principals before they are asserted.
#[derive(Debug, Clone, Default)]
pub struct PrincipalMapper {
    renames: HashMap<String, String>,
}

impl PrincipalMapper {
    /// Build from a `principal_mapping` value such as `guest,anon=anonymous`.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::InvalidMapping`] when a rule is malformed or
    /// names more than one target.
    pub fn parse(spec: &str) -> IdentityResult<Self> {
        let mut renames = HashMap::new();
        for rule in parse_rules(spec)? {
            let [target] = rule.targets.as_slice() else {
                return Err(IdentityError::InvalidMapping {
                    rule: format!("{}={}", rule.sources.join(","), rule.targets.join(",")),
                    reason: "multiple_targets",
                });
            };
            for source in &rule.sources {
                renames.insert(source.clone(), target.clone());
            }
        }
        Ok(Self { renames })
    }

    /// Map `principal` to its configured target, or return it unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::EmptyPrincipal`] only if a target is blank,
    /// which [`PrincipalMapper::parse`] never produces.
    pub fn map(&self, principal: Principal) -> IdentityResult<Principal> {
        match self.renames.get(principal.as_str()) {
            Some(target) => Principal::new(target.clone()),
            None => Ok(principal),
        }
    }
}

/// Resolves a principal to its groups.
pub trait GroupMapper: Send + Sync {
    /// Ordered groups for `principal`; may contain duplicates.
    fn groups_for(&self, principal: &Principal) -> GroupSet;
}

/// Directory groups plus statically configured group rules.
pub struct StaticGroupMapper {
    directory: Arc<UserDirectory>,
    everyone: Vec<String>,
    per_principal: HashMap<String, Vec<String>>,
}

impl StaticGroupMapper {
    /// Build from the user directory and an optional `group_mapping` value
    /// such as `*=users;admin=ops,audit`.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::InvalidMapping`] when a rule is malformed.
    pub fn new(directory: Arc<UserDirectory>, spec: Option<&str>) -> IdentityResult<Self> {
        let mut everyone = Vec::new();
        let mut per_principal: HashMap<String, Vec<String>> = HashMap::new();
        for rule in parse_rules(spec.unwrap_or_default())? {
            for source in rule.sources {
                if source == WILDCARD {
                    everyone.extend(rule.targets.iter().cloned());
                } else {
                    per_principal
                        .entry(source)
                        .or_default()
                        .extend(rule.targets.iter().cloned());
                }
            }
        }
        Ok(Self {
            directory,
            everyone,
            per_principal,
        })
    }
}

impl GroupMapper for StaticGroupMapper {
    fn groups_for(&self, principal: &Principal) -> GroupSet {
        let mut groups = GroupSet::new();
        groups.extend(self.directory.groups_of(principal.as_str()).iter().cloned());
        groups.extend(self.everyone.iter().cloned());
        if let Some(extra) = self.per_principal.get(principal.as_str()) {
            groups.extend(extra.iter().cloned());
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authn::DirectoryEntry;

    fn principal(name: &str) -> Principal {
        Principal::new(name).unwrap_or_else(|_| panic!("valid principal"))
    }

    #[test]
    fn parse_rules_reads_sources_and_targets() -> IdentityResult<()> {
        let rules = parse_rules("lmccay,kminder=hdfs; newuser=mapred ;")?;
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].sources, vec!["lmccay", "kminder"]);
        assert_eq!(rules[0].targets, vec!["hdfs"]);
        assert_eq!(rules[1].sources, vec!["newuser"]);

        assert!(matches!(
            parse_rules("nobody"),
            Err(IdentityError::InvalidMapping {
                reason: "missing_equals",
                ..
            })
        ));
        assert!(matches!(
            parse_rules("=users"),
            Err(IdentityError::InvalidMapping {
                reason: "empty_source",
                ..
            })
        ));
        assert!(parse_rules("").map(|rules| rules.is_empty()).unwrap_or(false));
        Ok(())
    }

    #[test]
    fn principal_mapper_renames_known_principals() -> IdentityResult<()> {
        let mapper = PrincipalMapper::parse("lmccay,kminder=hdfs;newuser=mapred")?;
        assert_eq!(mapper.map(principal("kminder"))?.as_str(), "hdfs");
        assert_eq!(mapper.map(principal("newuser"))?.as_str(), "mapred");
        assert_eq!(mapper.map(principal("guest"))?.as_str(), "guest");
        assert!(PrincipalMapper::parse("a=b,c").is_err());
        Ok(())
    }

    #[test]
    fn static_group_mapper_merges_directory_and_rules() -> IdentityResult<()> {
        let directory = Arc::new(UserDirectory::from_records([(
            "admin".to_string(),
            DirectoryEntry {
                password_hash: String::new(),
                groups: vec!["longGroupName1".into(), "longGroupName2".into()],
            },
        )]));
        let mapper = StaticGroupMapper::new(
            directory,
            Some("*=users;admin=longGroupName3,longGroupName4"),
        )?;

        let admin = mapper.groups_for(&principal("admin"));
        assert_eq!(
            admin.iter().collect::<Vec<_>>(),
            vec![
                "longGroupName1",
                "longGroupName2",
                "users",
                "longGroupName3",
                "longGroupName4"
            ]
        );
        let guest = mapper.groups_for(&principal("guest"));
        assert_eq!(guest.iter().collect::<Vec<_>>(), vec!["users"]);
        Ok(())
    }

    #[test]
    fn static_group_mapper_without_rules_uses_directory_only() -> IdentityResult<()> {
        let mapper = StaticGroupMapper::new(Arc::new(UserDirectory::default()), None)?;
        assert!(mapper.groups_for(&principal("guest")).is_empty());
        Ok(())
    }
}
