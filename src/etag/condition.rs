//! `If-Match` / `If-None-Match` token sets
//!
//! Grammar accepted:
//!
//! ```text
//! condition  = "*" / #entity-tag
//! entity-tag = [ "W/" ] DQUOTE *etagc DQUOTE
//! etagc      = any visible character except DQUOTE
//! ```
//!
//! A header that does not follow it is malformed, which callers report as
//! a bad request rather than as a mismatch.

use std::fmt;

use thiserror::Error;

use super::ETag;

/// Result type for header parsing
pub type ETagResult<T> = Result<T, ETagError>;

/// Malformed match header
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("ETag value invalid ({reason}): {header}")]
pub struct ETagError {
    /// The header as received
    pub header: String,
    /// What was wrong with it
    pub reason: String,
}

/// One entity tag from a header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityTag {
    /// `W/` prefix present
    pub weak: bool,
    /// Tag text between the quotes
    pub opaque: String,
}

impl EntityTag {
    /// Strong tag equal to a stored token
    pub fn strong(etag: &ETag) -> Self {
        Self {
            weak: false,
            opaque: etag.opaque().to_string(),
        }
    }
}

impl fmt::Display for EntityTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.weak {
            write!(f, "W/\"{}\"", self.opaque)
        } else {
            write!(f, "\"{}\"", self.opaque)
        }
    }
}

/// Parsed token set supplied with a conditional request
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MatchCondition {
    /// No header, or a blank one
    #[default]
    Empty,
    /// `*`
    Any,
    /// Explicit list of tags
    Tags(Vec<EntityTag>),
}

impl MatchCondition {
    /// Parse an optional header value
    pub fn from_header(header: Option<&str>) -> ETagResult<Self> {
        match header {
            None => Ok(MatchCondition::Empty),
            Some(h) => Self::parse(h),
        }
    }

    /// Parse a header value
    pub fn parse(header: &str) -> ETagResult<Self> {
        let trimmed = header.trim();
        if trimmed.is_empty() {
            return Ok(MatchCondition::Empty);
        }
        if trimmed == "*" {
            return Ok(MatchCondition::Any);
        }

        let malformed = |reason: &str| ETagError {
            header: header.to_string(),
            reason: reason.to_string(),
        };

        let mut tags = Vec::new();
        let mut rest = trimmed;
        loop {
            rest = rest.trim_start_matches(|c: char| c == ',' || c.is_ascii_whitespace());
            if rest.is_empty() {
                break;
            }

            let weak = rest.starts_with("W/");
            if weak {
                rest = &rest[2..];
            }
            rest = rest
                .strip_prefix('"')
                .ok_or_else(|| malformed("entity tag must be quoted"))?;
            let end = rest
                .find('"')
                .ok_or_else(|| malformed("unterminated entity tag"))?;
            let opaque = &rest[..end];
            if opaque.chars().any(|c| c.is_control() || c == ' ') {
                return Err(malformed("entity tag contains invalid characters"));
            }
            tags.push(EntityTag {
                weak,
                opaque: opaque.to_string(),
            });

            rest = rest[end + 1..].trim_start();
            if !rest.is_empty() && !rest.starts_with(',') {
                return Err(malformed("expected ',' between entity tags"));
            }
        }

        if tags.is_empty() {
            return Err(malformed("no entity tags in list"));
        }
        Ok(MatchCondition::Tags(tags))
    }

    /// Token set holding exactly the given stored tokens
    pub fn of(etags: &[ETag]) -> Self {
        if etags.is_empty() {
            return MatchCondition::Empty;
        }
        MatchCondition::Tags(etags.iter().map(EntityTag::strong).collect())
    }

    /// No token supplied
    pub fn is_empty(&self) -> bool {
        matches!(self, MatchCondition::Empty)
    }

    /// `If-Match` comparison: weak tags never match
    pub fn matches_strong(&self, current: &ETag) -> bool {
        match self {
            MatchCondition::Empty => false,
            MatchCondition::Any => true,
            MatchCondition::Tags(tags) => tags
                .iter()
                .any(|t| !t.weak && t.opaque == current.opaque()),
        }
    }

    /// `If-None-Match` comparison: weak and strong tags both match
    pub fn matches_weak(&self, current: &ETag) -> bool {
        match self {
            MatchCondition::Empty => false,
            MatchCondition::Any => true,
            MatchCondition::Tags(tags) => tags.iter().any(|t| t.opaque == current.opaque()),
        }
    }
}
