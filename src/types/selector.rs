use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const DEFAULT_PAGE_LIMIT: i64 = 50;
pub const MAX_PAGE_LIMIT: i64 = 500;

/// Identifies exactly one app, either by primary key or by its slug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppSelector {
    Id(String),
    Identifier(String),
}

impl AppSelector {
    /// Builds a selector from optional request parts. Exactly one part must be
    /// present and non-empty.
    pub fn from_parts(id: Option<&str>, identifier: Option<&str>) -> Result<Self> {
        let id = id.filter(|s| !s.is_empty());
        let identifier = identifier.filter(|s| !s.is_empty());
        match (id, identifier) {
            (Some(id), None) => Ok(Self::Id(id.to_string())),
            (None, Some(identifier)) => Ok(Self::Identifier(identifier.to_string())),
            (Some(_), Some(_)) => Err(Error::Validation(
                "selector must name an id or an identifier, not both".to_string(),
            )),
            (None, None) => Err(Error::Validation("empty selector".to_string())),
        }
    }

    pub(crate) fn column(&self) -> &'static str {
        match self {
            Self::Id(_) => "id",
            Self::Identifier(_) => "identifier",
        }
    }

    pub(crate) fn value(&self) -> &str {
        match self {
            Self::Id(v) | Self::Identifier(v) => v,
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.value().is_empty() {
            return Err(Error::Validation("empty selector".to_string()));
        }
        Ok(())
    }
}

impl fmt::Display for AppSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.column(), self.value())
    }
}

/// Keyset pagination state.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Cursor {
    #[serde(default)]
    pub after_id: String,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    DEFAULT_PAGE_LIMIT
}

impl Cursor {
    #[must_use]
    pub fn new(after_id: impl Into<String>, limit: i64) -> Self {
        Self {
            after_id: after_id.into(),
            limit,
        }
    }

    /// Limit clamped to `(0, MAX_PAGE_LIMIT]`; anything outside falls back to
    /// the default.
    #[must_use]
    pub fn effective_limit(&self) -> i64 {
        clamp_limit(self.limit)
    }
}

impl Default for Cursor {
    fn default() -> Self {
        Self::new("", DEFAULT_PAGE_LIMIT)
    }
}

#[must_use]
pub fn clamp_limit(limit: i64) -> i64 {
    if limit <= 0 || limit > MAX_PAGE_LIMIT {
        DEFAULT_PAGE_LIMIT
    } else {
        limit
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipOp {
    Add,
    Remove,
    Replace,
}

impl MembershipOp {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Remove => "remove",
            Self::Replace => "replace",
        }
    }
}

impl FromStr for MembershipOp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "add" => Ok(Self::Add),
            "remove" => Ok(Self::Remove),
            "replace" => Ok(Self::Replace),
            other => Err(Error::InvalidOperation(other.to_string())),
        }
    }
}

impl fmt::Display for MembershipOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
