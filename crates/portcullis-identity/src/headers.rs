//! Header codec for asserted identities.
//!
//! # Design
//! - The actor-id header carries the principal; groups fan out over
//!   `<prefix>-1`, `<prefix>-2`, ... as comma-joined chunks.
//! - [`GroupHeaders`] owns the chunking and reassembly contract so it can be
//!   tested apart from request handling.
//! - A chunk is closed before it would exceed the configured length; a single
//!   oversized group gets a header of its own rather than being truncated.

use http::{HeaderMap, HeaderName, HeaderValue};
use portcullis_config::HeaderNaming;
use regex::Regex;

use crate::error::{IdentityError, IdentityResult};
use crate::model::{GroupSet, Identity, Principal};

/// Chunked representation of a group set under a header prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupHeaders {
    prefix: String,
    chunks: Vec<String>,
}

impl GroupHeaders {
    /// Split `groups` into comma-joined chunks no longer than `max_len` where possible.
    #[must_use]
    pub fn split(prefix: &str, groups: &GroupSet, max_len: usize) -> Self {
        let mut chunks = Vec::new();
        let mut current = String::new();
        for group in groups.iter() {
            if !current.is_empty() && current.len() + 1 + group.len() > max_len {
                chunks.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(',');
            }
            current.push_str(group);
        }
        if !current.is_empty() {
            chunks.push(current);
        }
        Self {
            prefix: prefix.to_string(),
            chunks,
        }
    }

    /// Comma-joined chunk values in header order.
    #[must_use]
    pub fn chunks(&self) -> &[String] {
        &self.chunks
    }

    /// Header name for the chunk at `index` (zero based).
    #[must_use]
    pub fn header_name(&self, index: usize) -> String {
        format!("{}-{}", self.prefix, index + 1)
    }

    /// Write every chunk into `headers`, replacing existing values.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::InvalidHeader`] when a name or value cannot be
    /// represented as an HTTP header.
    pub fn to_headers(&self, headers: &mut HeaderMap) -> IdentityResult<()> {
        for (index, chunk) in self.chunks.iter().enumerate() {
            let name = self.header_name(index);
            let header = HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
                IdentityError::InvalidHeader {
                    name: name.clone(),
                    reason: "invalid_name",
                }
            })?;
            let value =
                HeaderValue::from_str(chunk).map_err(|_| IdentityError::InvalidHeader {
                    name,
                    reason: "invalid_value",
                })?;
            headers.insert(header, value);
        }
        Ok(())
    }

    /// Reassemble the groups carried by every header matching one of `patterns`.
    ///
    /// Headers are read in ascending numeric-suffix order (the bare prefix
    /// first); values are split on `,`, trimmed, and empty segments dropped.
    #[must_use]
    pub fn collect(
        headers: &HeaderMap,
        patterns: &[GroupHeaderPattern],
        exclude: Option<&HeaderName>,
    ) -> GroupSet {
        let mut matched: Vec<(SuffixKey, &HeaderName)> = headers
            .keys()
            .filter(|name| exclude != Some(*name))
            .filter_map(|name| {
                patterns
                    .iter()
                    .find_map(|pattern| pattern.suffix_of(name))
                    .map(|suffix| (SuffixKey::from_suffix(suffix), name))
            })
            .collect();
        matched.sort_by(|left, right| {
            left.0
                .cmp(&right.0)
                .then_with(|| left.1.as_str().cmp(right.1.as_str()))
        });

        let mut groups = GroupSet::new();
        for (_, name) in matched {
            for value in headers.get_all(name) {
                let text = String::from_utf8_lossy(value.as_bytes());
                groups.extend(text.split(',').map(str::trim).filter(|s| !s.is_empty()));
            }
        }
        groups
    }
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum SuffixKey {
    Bare,
    Index(u64),
    Other(String),
}

impl SuffixKey {
    fn from_suffix(suffix: &str) -> Self {
        let trimmed = suffix.trim_start_matches('-');
        if trimmed.is_empty() {
            Self::Bare
        } else {
            trimmed
                .parse::<u64>()
                .map_or_else(|_| Self::Other(trimmed.to_string()), Self::Index)
        }
    }
}

/// Selects group headers by exact name or, with a trailing `*`, by prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupHeaderPattern {
    /// Exactly this header.
    Exact(HeaderName),
    /// Any header whose lowercase name starts with this lowercase prefix.
    Prefix(String),
}

impl GroupHeaderPattern {
    /// Parse `X-Groups` (exact) or `X-Groups-*` (prefix).
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::InvalidHeader`] when the name part is not a valid header name.
    pub fn parse(pattern: &str) -> IdentityResult<Self> {
        let trimmed = pattern.trim();
        if let Some(prefix) = trimmed.strip_suffix('*') {
            if prefix.is_empty() {
                return Err(IdentityError::InvalidHeader {
                    name: pattern.to_string(),
                    reason: "empty_prefix",
                });
            }
            return Ok(Self::Prefix(prefix.to_ascii_lowercase()));
        }
        HeaderName::from_bytes(trimmed.as_bytes())
            .map(Self::Exact)
            .map_err(|_| IdentityError::InvalidHeader {
                name: pattern.to_string(),
                reason: "invalid_name",
            })
    }

    /// Remainder of `name` after the pattern, when it matches.
    fn suffix_of<'a>(&self, name: &'a HeaderName) -> Option<&'a str> {
        match self {
            Self::Exact(exact) => (exact == name).then_some(""),
            Self::Prefix(prefix) => name.as_str().strip_prefix(prefix.as_str()),
        }
    }
}

/// Encodes and decodes identities under one naming scheme.
#[derive(Debug, Clone)]
pub struct HeaderCodec {
    actor_id: HeaderName,
    groups_prefix: String,
    max_header_length: usize,
    group_filter: Option<Regex>,
}

impl HeaderCodec {
    /// Codec with the default 1000 character group header limit and no filter.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::InvalidHeader`] when `actor_id` is not a valid
    /// header name or `groups_prefix` is empty.
    pub fn new(actor_id: &str, groups_prefix: &str) -> IdentityResult<Self> {
        let actor = HeaderName::from_bytes(actor_id.trim().as_bytes()).map_err(|_| {
            IdentityError::InvalidHeader {
                name: actor_id.to_string(),
                reason: "invalid_name",
            }
        })?;
        let prefix = groups_prefix.trim();
        if prefix.is_empty() || HeaderName::from_bytes(prefix.as_bytes()).is_err() {
            return Err(IdentityError::InvalidHeader {
                name: groups_prefix.to_string(),
                reason: "invalid_prefix",
            });
        }
        Ok(Self {
            actor_id: actor,
            groups_prefix: prefix.to_string(),
            max_header_length: portcullis_config::defaults::DEFAULT_MAX_GROUP_HEADER_LENGTH,
            group_filter: None,
        })
    }

    /// Build a codec from a topology's header naming section.
    ///
    /// # Errors
    ///
    /// Returns an error when a header name or the group filter is invalid.
    pub fn from_naming(naming: &HeaderNaming) -> IdentityResult<Self> {
        let mut codec = Self::new(&naming.actor_id, &naming.groups_prefix)?
            .with_max_header_length(naming.max_group_header_length);
        if let Some(filter) = &naming.group_filter {
            codec = codec.with_group_filter(filter)?;
        }
        Ok(codec)
    }

    /// Override the longest value a single group header may carry.
    #[must_use]
    pub fn with_max_header_length(mut self, max: usize) -> Self {
        self.max_header_length = max.max(1);
        self
    }

    /// Emit only groups fully matching `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::InvalidMapping`] when the pattern does not compile.
    pub fn with_group_filter(mut self, pattern: &str) -> IdentityResult<Self> {
        let anchored = format!("^(?:{pattern})$");
        let regex = Regex::new(&anchored).map_err(|_| IdentityError::InvalidMapping {
            rule: pattern.to_string(),
            reason: "invalid_regex",
        })?;
        self.group_filter = Some(regex);
        Ok(self)
    }

    /// Header carrying the principal.
    #[must_use]
    pub const fn actor_id_header(&self) -> &HeaderName {
        &self.actor_id
    }

    /// Prefix of the group headers.
    #[must_use]
    pub fn groups_prefix(&self) -> &str {
        &self.groups_prefix
    }

    /// Encode `identity` as an actor-id header plus zero or more group headers.
    ///
    /// Groups are de-duplicated (first occurrence wins) and filtered before
    /// chunking, so the same identity always yields the same headers.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::InvalidHeader`] when the principal or a group
    /// cannot be carried in a header value, or a group contains `,`.
    pub fn encode(&self, identity: &Identity) -> IdentityResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        let principal = HeaderValue::from_str(identity.principal.as_str()).map_err(|_| {
            IdentityError::InvalidHeader {
                name: self.actor_id.to_string(),
                reason: "invalid_value",
            }
        })?;
        headers.insert(self.actor_id.clone(), principal);

        let mut groups = identity.groups.deduplicated();
        if let Some(filter) = &self.group_filter {
            groups = groups.filtered(|group| filter.is_match(group));
        }
        if groups.iter().any(|group| group.contains(',')) {
            return Err(IdentityError::InvalidHeader {
                name: self.groups_prefix.clone(),
                reason: "group_contains_comma",
            });
        }
        GroupHeaders::split(&self.groups_prefix, &groups, self.max_header_length)
            .to_headers(&mut headers)?;
        Ok(headers)
    }

    /// Decode the identity asserted in `headers`.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::MissingIdentityHeader`] when the actor-id header
    /// is absent or blank.
    pub fn decode(&self, headers: &HeaderMap) -> IdentityResult<Identity> {
        let pattern = GroupHeaderPattern::Prefix(self.groups_prefix.to_ascii_lowercase());
        decode_identity(headers, &self.actor_id, std::slice::from_ref(&pattern))
    }
}

/// Decode an identity given an actor-id header and group header patterns.
///
/// # Errors
///
/// Returns [`IdentityError::MissingIdentityHeader`] when the actor-id header
/// is absent or blank.
pub fn decode_identity(
    headers: &HeaderMap,
    actor_id: &HeaderName,
    group_patterns: &[GroupHeaderPattern],
) -> IdentityResult<Identity> {
    let missing = || IdentityError::MissingIdentityHeader {
        header: actor_id.to_string(),
    };
    let value = headers.get(actor_id).ok_or_else(missing)?;
    let text = value.to_str().map_err(|_| IdentityError::InvalidHeader {
        name: actor_id.to_string(),
        reason: "invalid_value",
    })?;
    let principal = Principal::new(text).map_err(|_| missing())?;
    let groups = GroupHeaders::collect(headers, group_patterns, Some(actor_id));
    Ok(Identity::new(principal, groups))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn identity(principal: &str, groups: &[&str]) -> Identity {
        Identity::new(
            Principal::new(principal).unwrap_or_else(|_| panic!("valid principal")),
            groups.iter().copied().collect(),
        )
    }

    fn set(groups: &[&str]) -> HashSet<String> {
        groups.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn guest_without_groups_emits_only_actor_id() -> IdentityResult<()> {
        let codec = HeaderCodec::new("x-knox-actor-username", "x-knox-actor-groups")?;
        let headers = codec.encode(&identity("guest", &[]))?;
        assert_eq!(headers.len(), 1);
        assert_eq!(
            headers.get("x-knox-actor-username").map(HeaderValue::as_bytes),
            Some(&b"guest"[..])
        );
        let decoded = codec.decode(&headers)?;
        assert_eq!(decoded.principal.as_str(), "guest");
        assert!(decoded.groups.is_empty());
        Ok(())
    }

    #[test]
    fn long_groups_split_across_headers_and_reassemble() -> IdentityResult<()> {
        let groups = [
            "longGroupName1",
            "longGroupName2",
            "longGroupName3",
            "longGroupName4",
        ];
        let codec = HeaderCodec::new("X-Knox-Actor-ID", "X-Knox-Actor-Groups")?
            .with_max_header_length(30);
        let headers = codec.encode(&identity("admin", &groups))?;

        assert_eq!(
            headers.get("x-knox-actor-groups-1").map(HeaderValue::as_bytes),
            Some(&b"longGroupName1,longGroupName2"[..])
        );
        assert_eq!(
            headers.get("x-knox-actor-groups-2").map(HeaderValue::as_bytes),
            Some(&b"longGroupName3,longGroupName4"[..])
        );
        assert!(headers.get("x-knox-actor-groups-3").is_none());

        let decoded = codec.decode(&headers)?;
        assert_eq!(decoded.principal.as_str(), "admin");
        assert_eq!(decoded.groups.to_set(), set(&groups));
        Ok(())
    }

    #[test]
    fn chunks_never_exceed_limit_unless_single_group_is_longer() {
        let many: GroupSet = (0..300).map(|i| format!("group-{i:04}")).collect();
        let split = GroupHeaders::split("X-Groups", &many, 1000);
        assert!(split.chunks().len() > 1);
        assert!(split.chunks().iter().all(|chunk| chunk.len() <= 1000));
        let total: usize = split
            .chunks()
            .iter()
            .map(|chunk| chunk.split(',').count())
            .sum();
        assert_eq!(total, 300);

        let oversized: GroupSet = ["a".repeat(40), "b".to_string()].into_iter().collect();
        let split = GroupHeaders::split("X-Groups", &oversized, 10);
        assert_eq!(split.chunks(), &["a".repeat(40), "b".to_string()]);
        assert_eq!(split.header_name(1), "X-Groups-2");
    }

    #[test]
    fn encode_is_deterministic_and_deduplicates() -> IdentityResult<()> {
        let codec = HeaderCodec::new("X-Knox-Actor-ID", "X-Knox-Actor-Groups")?;
        let subject = identity("admin", &["ops", "audit", "ops"]);
        let first = codec.encode(&subject)?;
        let second = codec.encode(&subject)?;
        assert_eq!(first, second);
        assert_eq!(
            first.get("x-knox-actor-groups-1").map(HeaderValue::as_bytes),
            Some(&b"ops,audit"[..])
        );
        Ok(())
    }

    #[test]
    fn group_filter_drops_non_matching_groups() -> IdentityResult<()> {
        let codec = HeaderCodec::new("X-Knox-Actor-ID", "X-Knox-Actor-Groups")?
            .with_group_filter("hadoop-.*")?;
        let headers = codec.encode(&identity("admin", &["hadoop-ops", "users", "xhadoop-y"]))?;
        assert_eq!(
            headers.get("x-knox-actor-groups-1").map(HeaderValue::as_bytes),
            Some(&b"hadoop-ops"[..])
        );
        assert!(HeaderCodec::new("a", "b")?.with_group_filter("(").is_err());
        Ok(())
    }

    #[test]
    fn decode_requires_actor_id_header() -> IdentityResult<()> {
        let codec = HeaderCodec::new("X-Knox-Actor-ID", "X-Knox-Actor-Groups")?;
        let mut headers = HeaderMap::new();
        headers.insert("x-knox-actor-groups-1", HeaderValue::from_static("ops"));
        assert!(matches!(
            codec.decode(&headers),
            Err(IdentityError::MissingIdentityHeader { .. })
        ));

        headers.insert("x-knox-actor-id", HeaderValue::from_static("  "));
        assert!(matches!(
            codec.decode(&headers),
            Err(IdentityError::MissingIdentityHeader { .. })
        ));
        Ok(())
    }

    #[test]
    fn decode_orders_headers_numerically_and_drops_empty_segments() -> IdentityResult<()> {
        let codec = HeaderCodec::new("X-Knox-Actor-ID", "X-Knox-Actor-Groups")?;
        let mut headers = HeaderMap::new();
        headers.insert("x-knox-actor-id", HeaderValue::from_static("admin"));
        headers.insert("x-knox-actor-groups-10", HeaderValue::from_static("j"));
        headers.insert("x-knox-actor-groups-2", HeaderValue::from_static("b, ,c"));
        headers.insert("x-knox-actor-groups", HeaderValue::from_static("a,"));
        headers.insert("x-other", HeaderValue::from_static("ignored"));

        let decoded = codec.decode(&headers)?;
        assert_eq!(decoded.groups.iter().collect::<Vec<_>>(), vec!["a", "b", "c", "j"]);
        Ok(())
    }

    #[test]
    fn patterns_match_exact_names_and_prefixes() -> IdentityResult<()> {
        let mut headers = HeaderMap::new();
        headers.insert("x-knox-actor-id", HeaderValue::from_static("remote-user"));
        headers.insert("x-knox-actor-groups-1", HeaderValue::from_static("g1,g2"));
        headers.insert("x-team", HeaderValue::from_static("blue"));
        headers.insert("x-teams", HeaderValue::from_static("not-me"));

        let patterns = [
            GroupHeaderPattern::parse("X-Knox-Actor-Groups-*")?,
            GroupHeaderPattern::parse("X-Team")?,
        ];
        let actor = HeaderName::from_static("x-knox-actor-id");
        let decoded = decode_identity(&headers, &actor, &patterns)?;
        assert_eq!(decoded.principal.as_str(), "remote-user");
        assert_eq!(decoded.groups.to_set(), set(&["g1", "g2", "blue"]));

        assert!(GroupHeaderPattern::parse("*").is_err());
        assert!(GroupHeaderPattern::parse("bad header").is_err());
        Ok(())
    }

    #[test]
    fn encode_rejects_values_that_cannot_be_headers() -> IdentityResult<()> {
        let codec = HeaderCodec::new("X-Knox-Actor-ID", "X-Knox-Actor-Groups")?;
        assert!(matches!(
            codec.encode(&identity("bad\nname", &[])),
            Err(IdentityError::InvalidHeader { .. })
        ));
        assert!(matches!(
            codec.encode(&identity("admin", &["a,b"])),
            Err(IdentityError::InvalidHeader {
                reason: "group_contains_comma",
                ..
            })
        ));
        assert!(HeaderCodec::new("bad header", "x").is_err());
        assert!(HeaderCodec::new("x-id", " ").is_err());
        Ok(())
    }
}
