//! Article entity and its workflow enums

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Article lifecycle status
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(50))")]
#[serde(rename_all = "snake_case")]
pub enum ArticleStatus {
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "pending_admin_review")]
    PendingAdminReview,
    #[sea_orm(string_value = "pending_super_admin_review")]
    PendingSuperAdminReview,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "published")]
    Published,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

impl ArticleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArticleStatus::Draft => "draft",
            ArticleStatus::PendingAdminReview => "pending_admin_review",
            ArticleStatus::PendingSuperAdminReview => "pending_super_admin_review",
            ArticleStatus::Approved => "approved",
            ArticleStatus::Published => "published",
            ArticleStatus::Rejected => "rejected",
        }
    }

    /// The role whose queue an article in this status sits in
    pub fn reviewer(&self) -> Option<ReviewerRole> {
        match self {
            ArticleStatus::PendingAdminReview => Some(ReviewerRole::Admin),
            ArticleStatus::PendingSuperAdminReview => Some(ReviewerRole::SuperAdmin),
            _ => None,
        }
    }
}

impl Default for ArticleStatus {
    fn default() -> Self {
        ArticleStatus::Draft
    }
}

impl std::fmt::Display for ArticleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role holding the next review action on a pending article
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(50))")]
#[serde(rename_all = "snake_case")]
pub enum ReviewerRole {
    #[sea_orm(string_value = "admin")]
    Admin,
    #[sea_orm(string_value = "super_admin")]
    SuperAdmin,
}

impl ReviewerRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewerRole::Admin => "admin",
            ReviewerRole::SuperAdmin => "super_admin",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "articles")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    #[sea_orm(column_type = "Text")]
    pub section: String,

    #[sea_orm(column_type = "Text")]
    pub title: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub slug: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub summary: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub content: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub image_url: Option<String>,

    /// Front-end placement, e.g. "Home"
    #[sea_orm(column_type = "Text")]
    pub page: String,

    pub views: Option<i32>,

    pub is_audio_pick: bool,

    pub is_hot: bool,

    pub is_live: bool,

    /// Serialized JSON array of link descriptors
    #[sea_orm(column_type = "Text", nullable)]
    pub sub_links: Option<String>,

    /// Serialized JSON array of media descriptors
    #[sea_orm(column_type = "Text", nullable)]
    pub media: Option<String>,

    pub status: ArticleStatus,

    pub submitted_by: Option<i64>,

    pub submitted_at: Option<DateTimeWithTimeZone>,

    pub approved_by: Option<i64>,

    pub approved_at: Option<DateTimeWithTimeZone>,

    pub current_reviewer_role: Option<ReviewerRole>,

    #[sea_orm(column_type = "Text", nullable)]
    pub rejection_reason: Option<String>,

    pub created_at: Option<DateTimeWithTimeZone>,

    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::comment::Entity")]
    Comments,
}

impl Related<super::comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
