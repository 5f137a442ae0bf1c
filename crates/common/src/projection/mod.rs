//! Read-side article projections
//!
//! Resolves which articles a caller may see and renders them in the public
//! response shape. Nothing here mutates state.

use serde::{Deserialize, Serialize};
use sea_orm::prelude::DateTimeWithTimeZone;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::auth::Actor;
use crate::db::models::{
    decode_list, Article, ArticleStatus, MediaItem, ReviewerRole, SubLink, UserRole,
};
use crate::db::store::{ArticleScope, ArticleStore, PublicQuery};
use crate::errors::{AppError, Result};
use crate::metrics::record_listing;

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 10;
pub const MAX_LIMIT: u64 = 100;

/// Query parameters accepted by the public listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PublicFilters {
    pub section: Option<String>,
    /// Placement on the site, matched against the `page` column
    pub placement: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PublicFilters {
    /// Clamp paging into range; out-of-range values are never an error.
    /// The page is also capped so its row offset fits a signed 64-bit OFFSET.
    pub fn to_query(&self) -> PublicQuery {
        let limit = self
            .limit
            .map_or(DEFAULT_LIMIT, |l| l.clamp(1, MAX_LIMIT as i64) as u64);
        let last_page = i64::MAX as u64 / limit + 1;
        let page = self
            .page
            .map_or(DEFAULT_PAGE, |p| p.max(1) as u64)
            .min(last_page);

        PublicQuery {
            section: non_blank(&self.section),
            placement: non_blank(&self.placement),
            page,
            limit,
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// One page of the public listing
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicPage {
    pub articles: Vec<ArticleView>,
    pub page: u64,
    pub limit: u64,
    pub total_items: u64,
    pub total_pages: u64,
    pub has_more: bool,
}

/// Article as returned to clients, with structured fields decoded
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArticleView {
    pub id: i64,
    pub section: String,
    pub title: String,
    pub slug: Option<String>,
    pub summary: Option<String>,
    pub content: Option<String>,
    pub image_url: Option<String>,
    pub page: String,
    pub views: i32,
    #[serde(rename = "isAudioPick")]
    pub is_audio_pick: bool,
    #[serde(rename = "isHot")]
    pub is_hot: bool,
    pub is_live: bool,
    #[serde(rename = "subLinks")]
    pub sub_links: Vec<SubLink>,
    pub media: Vec<MediaItem>,
    pub status: ArticleStatus,
    pub submitted_by: Option<i64>,
    pub submitted_at: Option<DateTimeWithTimeZone>,
    pub approved_by: Option<i64>,
    pub approved_at: Option<DateTimeWithTimeZone>,
    pub current_reviewer_role: Option<ReviewerRole>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

impl ArticleView {
    /// Render a stored row. `now` fills in missing timestamps without persisting them.
    pub fn from_article(article: Article, now: DateTimeWithTimeZone) -> Self {
        let sub_links = decode_or_empty(article.id, "sub_links", article.sub_links.as_deref());
        let media = decode_or_empty(article.id, "media", article.media.as_deref());

        Self {
            id: article.id,
            section: article.section,
            title: article.title,
            slug: article.slug,
            summary: article.summary,
            content: article.content,
            image_url: article.image_url,
            page: article.page,
            views: article.views.unwrap_or(0),
            is_audio_pick: article.is_audio_pick,
            is_hot: article.is_hot,
            is_live: article.is_live,
            sub_links,
            media,
            status: article.status,
            submitted_by: article.submitted_by,
            submitted_at: article.submitted_at,
            approved_by: article.approved_by,
            approved_at: article.approved_at,
            current_reviewer_role: article.current_reviewer_role,
            rejection_reason: article.rejection_reason,
            created_at: article.created_at.unwrap_or(now),
            updated_at: article.updated_at.unwrap_or(now),
        }
    }
}

fn decode_or_empty<T: serde::de::DeserializeOwned>(
    article_id: i64,
    field: &str,
    raw: Option<&str>,
) -> Vec<T> {
    decode_list(raw).unwrap_or_else(|e| {
        warn!(article_id, field, error = %e, "Malformed structured field, serving empty list");
        Vec::new()
    })
}

/// Which rows an actor's role may list
pub fn scope_for(actor: &Actor) -> ArticleScope {
    match actor.role {
        UserRole::SuperAdmin => ArticleScope::All,
        UserRole::Admin => ArticleScope::AdminQueue { admin_id: actor.id },
        UserRole::Editor => ArticleScope::SubmittedBy(actor.id),
        UserRole::Viewer => ArticleScope::Published,
    }
}

#[derive(Clone)]
pub struct ArticleProjector {
    store: Arc<dyn ArticleStore>,
}

impl ArticleProjector {
    pub fn new(store: Arc<dyn ArticleStore>) -> Self {
        Self { store }
    }

    /// Articles visible to the actor's role, newest first
    pub async fn list_for_role(&self, actor: &Actor) -> Result<Vec<ArticleView>> {
        let scope = scope_for(actor);
        let rows = self.store.list_scoped(scope).await?;
        debug!(actor_id = actor.id, role = %actor.role, count = rows.len(), "Role listing");
        record_listing("role");

        let now = chrono::Utc::now().into();
        Ok(rows
            .into_iter()
            .map(|a| ArticleView::from_article(a, now))
            .collect())
    }

    /// Filtered, paginated listing with live articles first
    pub async fn list_public(&self, filters: &PublicFilters) -> Result<PublicPage> {
        let query = filters.to_query();
        let (rows, total_items) = self.store.list_public(&query).await?;
        record_listing("public");

        let total_pages = total_items.div_ceil(query.limit);
        let now = chrono::Utc::now().into();

        Ok(PublicPage {
            articles: rows
                .into_iter()
                .map(|a| ArticleView::from_article(a, now))
                .collect(),
            page: query.page,
            limit: query.limit,
            total_items,
            total_pages,
            has_more: query.page < total_pages,
        })
    }

    pub async fn get_article(&self, id: i64) -> Result<ArticleView> {
        let article = self
            .store
            .find_article(id)
            .await?
            .ok_or_else(|| AppError::not_found("Article", id))?;

        Ok(ArticleView::from_article(article, chrono::Utc::now().into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::{article_fixture, MemoryArticleStore};
    use tokio_test::assert_ok;

    fn projector(articles: Vec<Article>) -> ArticleProjector {
        ArticleProjector::new(Arc::new(MemoryArticleStore::with_articles(articles)))
    }

    fn ids(views: &[ArticleView]) -> Vec<i64> {
        views.iter().map(|v| v.id).collect()
    }

    fn paging(page: i64, limit: i64) -> PublicFilters {
        PublicFilters {
            page: Some(page),
            limit: Some(limit),
            ..Default::default()
        }
    }

    fn mixed() -> Vec<Article> {
        vec![
            article_fixture(1, ArticleStatus::Published, Some(10)),
            article_fixture(2, ArticleStatus::Draft, Some(20)),
            article_fixture(3, ArticleStatus::PendingAdminReview, Some(10)),
            article_fixture(4, ArticleStatus::Draft, Some(10)),
            article_fixture(5, ArticleStatus::Approved, None),
        ]
    }

    #[tokio::test]
    async fn test_list_for_each_role() {
        let projector = projector(mixed());

        let super_admin = Actor::new(1, UserRole::SuperAdmin);
        let all = assert_ok!(projector.list_for_role(&super_admin).await);
        assert_eq!(ids(&all), vec![5, 4, 3, 2, 1]);

        let admin = assert_ok!(projector.list_for_role(&Actor::new(20, UserRole::Admin)).await);
        assert_eq!(ids(&admin), vec![3, 2]);

        let editor = assert_ok!(projector.list_for_role(&Actor::new(10, UserRole::Editor)).await);
        assert_eq!(ids(&editor), vec![4, 3, 1]);

        let viewer = Actor::new(99, UserRole::Viewer);
        let viewer = assert_ok!(projector.list_for_role(&viewer).await);
        assert_eq!(ids(&viewer), vec![1]);
        assert!(viewer.iter().all(|v| v.status == ArticleStatus::Published));
    }

    #[tokio::test]
    async fn test_list_for_role_empty_is_ok() {
        let projector = projector(Vec::new());
        let rows = assert_ok!(projector.list_for_role(&Actor::new(5, UserRole::Editor)).await);
        assert!(rows.is_empty());
    }

    #[test]
    fn test_paging_clamped() {
        let q = paging(0, 200).to_query();
        assert_eq!((q.page, q.limit), (1, 100));

        let q = paging(-3, 0).to_query();
        assert_eq!((q.page, q.limit), (1, 1));

        let q = PublicFilters::default().to_query();
        assert_eq!((q.page, q.limit), (DEFAULT_PAGE, DEFAULT_LIMIT));
    }

    #[test]
    fn test_huge_page_offset_fits_i64() {
        let q = paging(i64::MAX, 100).to_query();
        assert!(q.offset() <= i64::MAX as u64);
        assert_eq!(q.offset(), (q.page - 1) * q.limit);

        let q = paging(i64::MAX, 1).to_query();
        assert_eq!(q.offset(), i64::MAX as u64);
    }

    #[tokio::test]
    async fn test_huge_page_is_empty() {
        let projector = projector(mixed());
        let page = assert_ok!(projector.list_public(&paging(i64::MAX, 100)).await);
        assert!(page.articles.is_empty());
        assert_eq!(page.total_items, 5);
        assert!(!page.has_more);
    }

    #[tokio::test]
    async fn test_public_page_counts() {
        let articles: Vec<Article> = (1..=25)
            .map(|id| article_fixture(id, ArticleStatus::Draft, None))
            .collect();
        let projector = projector(articles);

        let page = assert_ok!(projector.list_public(&paging(3, 10)).await);
        assert_eq!(page.total_items, 25);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.articles.len(), 5);
        assert!(!page.has_more);

        let page = assert_ok!(projector.list_public(&paging(0, 200)).await);
        assert_eq!((page.page, page.limit), (1, 100));
        assert_eq!(page.articles.len(), 25);
    }

    #[tokio::test]
    async fn test_public_filters_and_live_first() {
        let mut sport = article_fixture(2, ArticleStatus::Draft, None);
        sport.section = "sport".into();
        let mut live_sport = article_fixture(1, ArticleStatus::Published, None);
        live_sport.section = "sport".into();
        let mut sidebar = article_fixture(3, ArticleStatus::Draft, None);
        sidebar.section = "sport".into();
        sidebar.page = "Sidebar".into();
        let news = article_fixture(4, ArticleStatus::Draft, None);
        let projector = projector(vec![live_sport, sport, sidebar, news]);

        let filters = PublicFilters {
            section: Some("sport".into()),
            ..Default::default()
        };
        let page = assert_ok!(projector.list_public(&filters).await);
        assert_eq!(ids(&page.articles), vec![1, 3, 2]);

        let filters = PublicFilters {
            section: Some("sport".into()),
            placement: Some("Sidebar".into()),
            ..Default::default()
        };
        let page = assert_ok!(projector.list_public(&filters).await);
        assert_eq!(ids(&page.articles), vec![3]);
    }

    #[test]
    fn test_view_degrades_malformed_fields() {
        let mut article = article_fixture(1, ArticleStatus::Draft, None);
        article.sub_links = Some("{not json".into());
        article.media = Some("   ".into());
        article.views = None;
        article.created_at = None;
        let now: DateTimeWithTimeZone = chrono::Utc::now().into();

        let view = ArticleView::from_article(article, now);
        assert!(view.sub_links.is_empty());
        assert!(view.media.is_empty());
        assert_eq!(view.views, 0);
        assert_eq!(view.created_at, now);
    }

    #[test]
    fn test_view_serializes_client_field_names() {
        let mut article = article_fixture(1, ArticleStatus::Draft, None);
        article.sub_links = Some(r#"[{"title":"More","url":"/more"}]"#.into());
        article.media = Some(r#"[{"type":"video","url":"/uploads/a.mp4"}]"#.into());

        let view = ArticleView::from_article(article, chrono::Utc::now().into());
        let json = serde_json::to_value(view).unwrap();
        assert_eq!(json["subLinks"][0]["title"], "More");
        assert_eq!(json["media"][0]["type"], "video");
        assert_eq!(json["isHot"], false);
        assert_eq!(json["isAudioPick"], false);
        assert_eq!(json["status"], "draft");
    }

    #[tokio::test]
    async fn test_get_article_missing() {
        let projector = projector(Vec::new());
        let err = projector.get_article(9).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
    }
}
