//! Vote entity (one signed vote per user per question/answer).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::target::{Target, TargetKind};

/// Direction of a vote. Stored in the `value` column as +1 / -1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoteValue {
    Up,
    Down,
}

impl VoteValue {
    /// Signed representation (+1 / -1).
    #[must_use]
    pub const fn as_i16(self) -> i16 {
        match self {
            Self::Up => 1,
            Self::Down => -1,
        }
    }
}

impl TryFrom<i64> for VoteValue {
    type Error = i64;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Up),
            -1 => Ok(Self::Down),
            other => Err(other),
        }
    }
}

impl Serialize for VoteValue {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i16(self.as_i16())
    }
}

impl<'de> Deserialize<'de> for VoteValue {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = i64::deserialize(deserializer)?;
        Self::try_from(raw)
            .map_err(|v| serde::de::Error::custom(format!("vote value must be 1 or -1, got {v}")))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "vote")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// The voter
    pub user_id: String,

    pub target_kind: TargetKind,

    /// Question or answer id, depending on `target_kind`
    pub target_id: String,

    /// +1 or -1, see [`VoteValue`]
    pub value: i16,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// Typed direction of this vote.
    ///
    /// Rows only ever hold +1 or -1; anything else is reported as `None`.
    #[must_use]
    pub fn vote_value(&self) -> Option<VoteValue> {
        VoteValue::try_from(i64::from(self.value)).ok()
    }

    /// The (kind, id) reference this vote points at.
    #[must_use]
    pub fn target(&self) -> Target {
        Target {
            kind: self.target_kind,
            id: self.target_id.clone(),
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_from_signed_unit() {
        assert_eq!(VoteValue::try_from(1), Ok(VoteValue::Up));
        assert_eq!(VoteValue::try_from(-1), Ok(VoteValue::Down));
        assert_eq!(VoteValue::try_from(0), Err(0));
        assert_eq!(VoteValue::try_from(2), Err(2));
    }

    #[test]
    fn test_value_serde() {
        assert_eq!(serde_json::to_string(&VoteValue::Down).ok().as_deref(), Some("-1"));
        assert!(serde_json::from_str::<VoteValue>("1").is_ok());
        assert!(serde_json::from_str::<VoteValue>("5").is_err());
    }
}
