//! Article persistence interface
//!
//! The workflow engine and projection layer depend on [`ArticleStore`] rather than
//! on a concrete connection. Every workflow transition is expressed as a single
//! conditional update ([`Transition`]) so that two concurrent reviewers can never
//! both succeed on the same row.

use async_trait::async_trait;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};

use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::Result;

/// Which rows a role-scoped listing may return
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArticleScope {
    /// Every article
    All,
    /// Articles awaiting admin review, plus the admin's own drafts
    AdminQueue { admin_id: i64 },
    /// Articles submitted by one user
    SubmittedBy(i64),
    /// Published articles only
    Published,
}

impl ArticleScope {
    pub fn matches(&self, article: &Article) -> bool {
        match *self {
            ArticleScope::All => true,
            ArticleScope::AdminQueue { admin_id } => {
                article.status == ArticleStatus::PendingAdminReview
                    || (article.status == ArticleStatus::Draft
                        && article.submitted_by == Some(admin_id))
            }
            ArticleScope::SubmittedBy(user_id) => article.submitted_by == Some(user_id),
            ArticleScope::Published => article.status == ArticleStatus::Published,
        }
    }

    pub fn condition(&self) -> Condition {
        match *self {
            ArticleScope::All => Condition::all(),
            ArticleScope::AdminQueue { admin_id } => Condition::any()
                .add(ArticleColumn::Status.eq(ArticleStatus::PendingAdminReview))
                .add(
                    Condition::all()
                        .add(ArticleColumn::Status.eq(ArticleStatus::Draft))
                        .add(ArticleColumn::SubmittedBy.eq(admin_id)),
                ),
            ArticleScope::SubmittedBy(user_id) => {
                Condition::all().add(ArticleColumn::SubmittedBy.eq(user_id))
            }
            ArticleScope::Published => {
                Condition::all().add(ArticleColumn::Status.eq(ArticleStatus::Published))
            }
        }
    }
}

/// Filters and already-clamped paging for the public listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicQuery {
    pub section: Option<String>,
    pub placement: Option<String>,
    /// 1-based page number
    pub page: u64,
    pub limit: u64,
}

impl PublicQuery {
    pub fn matches(&self, article: &Article) -> bool {
        self.section.as_deref().map_or(true, |s| article.section == s)
            && self.placement.as_deref().map_or(true, |p| article.page == p)
    }

    /// Rows skipped before this page, saturating rather than overflowing
    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }
}

/// Row predicate a transition must satisfy besides the id match
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionGuard {
    /// Current status must be one of these
    pub statuses: Option<Vec<ArticleStatus>>,
    /// `submitted_by` must equal this user or be unset
    pub owner: Option<i64>,
}

impl TransitionGuard {
    pub fn matches(&self, article: &Article) -> bool {
        let status_ok = self
            .statuses
            .as_ref()
            .map_or(true, |allowed| allowed.contains(&article.status));
        let owner_ok = self.owner.map_or(true, |owner| {
            article.submitted_by.is_none() || article.submitted_by == Some(owner)
        });
        status_ok && owner_ok
    }

    pub fn condition(&self, article_id: i64) -> Condition {
        let mut cond = Condition::all().add(ArticleColumn::Id.eq(article_id));
        if let Some(statuses) = &self.statuses {
            cond = cond.add(ArticleColumn::Status.is_in(statuses.iter().copied()));
        }
        if let Some(owner) = self.owner {
            cond = cond.add(
                Condition::any()
                    .add(ArticleColumn::SubmittedBy.eq(owner))
                    .add(ArticleColumn::SubmittedBy.is_null()),
            );
        }
        cond
    }
}

/// Column assignments written by a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionPatch {
    pub status: ArticleStatus,
    pub current_reviewer_role: Option<ReviewerRole>,
    /// Sets `submitted_by`
    pub submitted_by: Option<i64>,
    /// Sets `approved_by`
    pub approved_by: Option<i64>,
    pub rejection_reason: Option<String>,
    /// Sets `is_live = true`
    pub go_live: bool,
    /// Stamp for `submitted_at`, `approved_at`, and `updated_at`
    pub at: DateTimeWithTimeZone,
}

impl TransitionPatch {
    pub fn apply(&self, article: &mut Article) {
        article.status = self.status;
        article.current_reviewer_role = self.current_reviewer_role;
        if let Some(user_id) = self.submitted_by {
            article.submitted_by = Some(user_id);
            article.submitted_at = Some(self.at);
        }
        if let Some(user_id) = self.approved_by {
            article.approved_by = Some(user_id);
            article.approved_at = Some(self.at);
        }
        if let Some(reason) = &self.rejection_reason {
            article.rejection_reason = Some(reason.clone());
        }
        if self.go_live {
            article.is_live = true;
        }
        article.updated_at = Some(self.at);
    }

    /// Partial active model carrying only the columns this patch writes
    pub fn to_active_model(&self) -> ArticleActiveModel {
        let mut model = ArticleActiveModel {
            status: Set(self.status),
            current_reviewer_role: Set(self.current_reviewer_role),
            updated_at: Set(Some(self.at)),
            ..Default::default()
        };
        if let Some(user_id) = self.submitted_by {
            model.submitted_by = Set(Some(user_id));
            model.submitted_at = Set(Some(self.at));
        }
        if let Some(user_id) = self.approved_by {
            model.approved_by = Set(Some(user_id));
            model.approved_at = Set(Some(self.at));
        }
        if let Some(reason) = &self.rejection_reason {
            model.rejection_reason = Set(Some(reason.clone()));
        }
        if self.go_live {
            model.is_live = Set(true);
        }
        model
    }
}

/// One atomic conditional update against a single article row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub article_id: i64,
    pub guard: TransitionGuard,
    pub patch: TransitionPatch,
}

/// Content for a new article; workflow columns start at their defaults and
/// `is_live` starts false; only publishing sets it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewArticle {
    pub section: String,
    pub title: String,
    pub slug: Option<String>,
    pub summary: Option<String>,
    pub content: Option<String>,
    pub image_url: Option<String>,
    pub page: String,
    pub is_audio_pick: bool,
    pub is_hot: bool,
    pub sub_links: Vec<SubLink>,
    pub media: Vec<MediaItem>,
}

/// Content columns to overwrite; `None` leaves a column unchanged. Workflow
/// columns and `is_live` are not editable here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleChanges {
    pub section: Option<String>,
    pub title: Option<String>,
    pub slug: Option<String>,
    pub summary: Option<String>,
    pub content: Option<String>,
    pub image_url: Option<String>,
    pub page: Option<String>,
    pub is_audio_pick: Option<bool>,
    pub is_hot: Option<bool>,
    pub sub_links: Option<Vec<SubLink>>,
    pub media: Option<Vec<MediaItem>>,
}

impl ArticleChanges {
    pub fn is_empty(&self) -> bool {
        *self == ArticleChanges::default()
    }

    pub fn apply(&self, article: &mut Article) -> serde_json::Result<()> {
        if let Some(v) = &self.section {
            article.section = v.clone();
        }
        if let Some(v) = &self.title {
            article.title = v.clone();
        }
        if let Some(v) = &self.slug {
            article.slug = Some(v.clone());
        }
        if let Some(v) = &self.summary {
            article.summary = Some(v.clone());
        }
        if let Some(v) = &self.content {
            article.content = Some(v.clone());
        }
        if let Some(v) = &self.image_url {
            article.image_url = Some(v.clone());
        }
        if let Some(v) = &self.page {
            article.page = v.clone();
        }
        if let Some(v) = self.is_audio_pick {
            article.is_audio_pick = v;
        }
        if let Some(v) = self.is_hot {
            article.is_hot = v;
        }
        if let Some(v) = &self.sub_links {
            article.sub_links = Some(encode_list(v)?);
        }
        if let Some(v) = &self.media {
            article.media = Some(encode_list(v)?);
        }
        Ok(())
    }
}

/// Storage collaborator for articles
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Apply a transition as one conditional update, returning rows affected
    async fn apply_transition(&self, transition: &Transition) -> Result<u64>;

    /// Rows visible to a scope, newest first
    async fn list_scoped(&self, scope: ArticleScope) -> Result<Vec<Article>>;

    /// One page of the public listing plus the total row count
    async fn list_public(&self, query: &PublicQuery) -> Result<(Vec<Article>, u64)>;

    async fn find_article(&self, id: i64) -> Result<Option<Article>>;

    async fn insert_article(&self, article: NewArticle) -> Result<Article>;

    /// Returns `None` when the article does not exist
    async fn update_article(&self, id: i64, changes: ArticleChanges) -> Result<Option<Article>>;

    async fn delete_article(&self, id: i64) -> Result<bool>;
}

/// [`ArticleStore`] backed by the SeaORM connection pool
#[derive(Clone)]
pub struct SeaOrmArticleStore {
    pool: DbPool,
}

impl SeaOrmArticleStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ArticleStore for SeaOrmArticleStore {
    async fn apply_transition(&self, transition: &Transition) -> Result<u64> {
        let result = ArticleEntity::update_many()
            .set(transition.patch.to_active_model())
            .filter(transition.guard.condition(transition.article_id))
            .exec(self.pool.write())
            .await?;

        Ok(result.rows_affected)
    }

    async fn list_scoped(&self, scope: ArticleScope) -> Result<Vec<Article>> {
        ArticleEntity::find()
            .filter(scope.condition())
            .order_by_desc(ArticleColumn::CreatedAt)
            .order_by_desc(ArticleColumn::Id)
            .all(self.pool.read())
            .await
            .map_err(Into::into)
    }

    async fn list_public(&self, query: &PublicQuery) -> Result<(Vec<Article>, u64)> {
        let mut select = ArticleEntity::find();
        if let Some(section) = &query.section {
            select = select.filter(ArticleColumn::Section.eq(section.as_str()));
        }
        if let Some(placement) = &query.placement {
            select = select.filter(ArticleColumn::Page.eq(placement.as_str()));
        }

        let paginator = select
            .order_by_desc(ArticleColumn::IsLive)
            .order_by_desc(ArticleColumn::CreatedAt)
            .order_by_desc(ArticleColumn::Id)
            .paginate(self.pool.read(), query.limit);

        let total = paginator.num_items().await?;
        if query.offset() >= total {
            return Ok((Vec::new(), total));
        }
        let articles = paginator.fetch_page(query.page.saturating_sub(1)).await?;

        Ok((articles, total))
    }

    async fn find_article(&self, id: i64) -> Result<Option<Article>> {
        ArticleEntity::find_by_id(id)
            .one(self.pool.read())
            .await
            .map_err(Into::into)
    }

    async fn insert_article(&self, article: NewArticle) -> Result<Article> {
        let now = chrono::Utc::now();

        let model = ArticleActiveModel {
            section: Set(article.section),
            title: Set(article.title),
            slug: Set(article.slug),
            summary: Set(article.summary),
            content: Set(article.content),
            image_url: Set(article.image_url),
            page: Set(article.page),
            views: Set(Some(0)),
            is_audio_pick: Set(article.is_audio_pick),
            is_hot: Set(article.is_hot),
            is_live: Set(false),
            sub_links: Set(Some(encode_list(&article.sub_links)?)),
            media: Set(Some(encode_list(&article.media)?)),
            status: Set(ArticleStatus::Draft),
            submitted_by: Set(None),
            submitted_at: Set(None),
            approved_by: Set(None),
            approved_at: Set(None),
            current_reviewer_role: Set(None),
            rejection_reason: Set(None),
            created_at: Set(Some(now.into())),
            updated_at: Set(Some(now.into())),
            ..Default::default()
        };

        model.insert(self.pool.write()).await.map_err(Into::into)
    }

    async fn update_article(&self, id: i64, changes: ArticleChanges) -> Result<Option<Article>> {
        let Some(existing) = ArticleEntity::find_by_id(id).one(self.pool.write()).await? else {
            return Ok(None);
        };

        let mut model: ArticleActiveModel = existing.into();
        if let Some(v) = changes.section {
            model.section = Set(v);
        }
        if let Some(v) = changes.title {
            model.title = Set(v);
        }
        if let Some(v) = changes.slug {
            model.slug = Set(Some(v));
        }
        if let Some(v) = changes.summary {
            model.summary = Set(Some(v));
        }
        if let Some(v) = changes.content {
            model.content = Set(Some(v));
        }
        if let Some(v) = changes.image_url {
            model.image_url = Set(Some(v));
        }
        if let Some(v) = changes.page {
            model.page = Set(v);
        }
        if let Some(v) = changes.is_audio_pick {
            model.is_audio_pick = Set(v);
        }
        if let Some(v) = changes.is_hot {
            model.is_hot = Set(v);
        }
        if let Some(v) = changes.sub_links {
            model.sub_links = Set(Some(encode_list(&v)?));
        }
        if let Some(v) = changes.media {
            model.media = Set(Some(encode_list(&v)?));
        }
        model.updated_at = Set(Some(chrono::Utc::now().into()));

        let updated = model.update(self.pool.write()).await?;
        Ok(Some(updated))
    }

    async fn delete_article(&self, id: i64) -> Result<bool> {
        let result = ArticleEntity::delete_by_id(id)
            .exec(self.pool.write())
            .await?;

        Ok(result.rows_affected > 0)
    }
}
