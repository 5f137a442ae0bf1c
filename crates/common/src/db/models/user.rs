//! Admin user entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::article::ReviewerRole;

/// Fixed per-user role
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(50))")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[sea_orm(string_value = "super_admin")]
    SuperAdmin,
    #[sea_orm(string_value = "admin")]
    Admin,
    #[sea_orm(string_value = "editor")]
    Editor,
    #[sea_orm(string_value = "viewer")]
    Viewer,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::SuperAdmin => "super_admin",
            UserRole::Admin => "admin",
            UserRole::Editor => "editor",
            UserRole::Viewer => "viewer",
        }
    }

    /// Admins and super admins review articles and manage users
    pub fn is_staff(&self) -> bool {
        matches!(self, UserRole::SuperAdmin | UserRole::Admin)
    }

    /// Everyone except viewers may author content
    pub fn can_author(&self) -> bool {
        !matches!(self, UserRole::Viewer)
    }

    /// Whether this role may create, edit, or delete an account holding `other`.
    /// Only super admins manage staff accounts.
    pub fn can_manage(&self, other: UserRole) -> bool {
        match self {
            UserRole::SuperAdmin => true,
            UserRole::Admin => !other.is_staff(),
            _ => false,
        }
    }

    pub fn as_reviewer(&self) -> Option<ReviewerRole> {
        match self {
            UserRole::SuperAdmin => Some(ReviewerRole::SuperAdmin),
            UserRole::Admin => Some(ReviewerRole::Admin),
            _ => None,
        }
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "super_admin" => Ok(UserRole::SuperAdmin),
            "admin" => Ok(UserRole::Admin),
            "editor" => Ok(UserRole::Editor),
            "viewer" => Ok(UserRole::Viewer),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    #[sea_orm(column_type = "Text")]
    pub name: String,

    #[sea_orm(column_type = "Text", unique)]
    pub email: String,

    /// Argon2 PHC string, never serialized
    #[sea_orm(column_type = "Text")]
    #[serde(skip_serializing)]
    pub password_hash: String,

    pub role: UserRole,

    #[sea_orm(column_type = "Text", nullable)]
    pub profile_picture: Option<String>,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing_rejects_unknown() {
        assert_eq!("editor".parse::<UserRole>(), Ok(UserRole::Editor));
        assert_eq!("super_admin".parse::<UserRole>(), Ok(UserRole::SuperAdmin));
        assert!("Editor".parse::<UserRole>().is_err());
        assert!("owner".parse::<UserRole>().is_err());
    }

    #[test]
    fn test_role_capabilities() {
        assert!(UserRole::Admin.is_staff());
        assert!(!UserRole::Editor.is_staff());
        assert!(UserRole::Editor.can_author());
        assert!(!UserRole::Viewer.can_author());
        assert_eq!(UserRole::Editor.as_reviewer(), None);
    }

    #[test]
    fn test_only_super_admin_manages_staff() {
        assert!(UserRole::SuperAdmin.can_manage(UserRole::SuperAdmin));
        assert!(UserRole::SuperAdmin.can_manage(UserRole::Admin));
        assert!(UserRole::Admin.can_manage(UserRole::Editor));
        assert!(UserRole::Admin.can_manage(UserRole::Viewer));
        assert!(!UserRole::Admin.can_manage(UserRole::Admin));
        assert!(!UserRole::Admin.can_manage(UserRole::SuperAdmin));
        assert!(!UserRole::Editor.can_manage(UserRole::Viewer));
    }
}
