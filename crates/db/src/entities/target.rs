//! Polymorphic content reference shared by votes and reports.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of content a vote or report points at.
///
/// Closed set: adding a kind means adding a variant here and a resolver arm
/// in the target registry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    #[sea_orm(string_value = "question")]
    Question,
    #[sea_orm(string_value = "answer")]
    Answer,
}

impl TargetKind {
    /// Wire name of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Question => "question",
            Self::Answer => "answer",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a kind name is not in the known enumeration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown target kind: {0}")]
pub struct UnknownTargetKind(pub String);

impl FromStr for TargetKind {
    type Err = UnknownTargetKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "question" => Ok(Self::Question),
            "answer" => Ok(Self::Answer),
            _ => Err(UnknownTargetKind(s.to_string())),
        }
    }
}

/// A (kind, id) pair identifying a votable or reportable entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
    pub kind: TargetKind,
    pub id: String,
}

impl Target {
    /// Reference a question.
    pub fn question(id: impl Into<String>) -> Self {
        Self {
            kind: TargetKind::Question,
            id: id.into(),
        }
    }

    /// Reference an answer.
    pub fn answer(id: impl Into<String>) -> Self {
        Self {
            kind: TargetKind::Answer,
            id: id.into(),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kind() {
        assert_eq!("question".parse(), Ok(TargetKind::Question));
        assert_eq!("Answer".parse(), Ok(TargetKind::Answer));
        assert_eq!(
            "comment".parse::<TargetKind>(),
            Err(UnknownTargetKind("comment".to_string()))
        );
    }

    #[test]
    fn test_target_display() {
        assert_eq!(Target::answer("a1").to_string(), "answer:a1");
    }
}
