//! Shared domain enumerations and identifiers.

use std::{fmt, num::NonZeroU64, str::FromStr};

use serde::{Deserialize, Serialize};

use super::error::DomainError;

/// Identifier of a post owned by the host store. Zero is reserved for
/// "no resolvable post" and is therefore not representable here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct PostId(NonZeroU64);

impl PostId {
    pub fn new(value: u64) -> Option<Self> {
        NonZeroU64::new(value).map(Self)
    }

    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl TryFrom<u64> for PostId {
    type Error = DomainError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| DomainError::validation("post id must be greater than zero"))
    }
}

impl From<PostId> for u64 {
    fn from(id: PostId) -> Self {
        id.get()
    }
}

impl FromStr for PostId {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let parsed: u64 = value
            .trim()
            .parse()
            .map_err(|_| DomainError::validation(format!("`{value}` is not a post id")))?;
        Self::try_from(parsed)
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    #[default]
    Draft,
    AutoDraft,
    Published,
    Private,
    Trash,
}

impl PostStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::AutoDraft => "auto_draft",
            PostStatus::Published => "published",
            PostStatus::Private => "private",
            PostStatus::Trash => "trash",
        }
    }

    /// Whether the public surface may display a post in this state.
    pub fn is_public(self) -> bool {
        matches!(self, PostStatus::Published)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_id_rejects_zero() {
        assert!(PostId::new(0).is_none());
        assert!(PostId::try_from(0).is_err());
        assert!("0".parse::<PostId>().is_err());
    }

    #[test]
    fn post_id_parses_trimmed_input() {
        let id: PostId = " 42 ".parse().expect("valid id");
        assert_eq!(id.get(), 42);
        assert_eq!(id.to_string(), "42");
    }

    #[test]
    fn only_published_posts_are_public() {
        assert!(PostStatus::Published.is_public());
        assert!(!PostStatus::Draft.is_public());
        assert!(!PostStatus::Private.is_public());
    }
}
