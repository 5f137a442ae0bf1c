//! In-memory [`ArticleStore`] for deterministic tests and local tooling
//!
//! A transition holds the write lock for its whole check-and-apply step, which
//! gives it the same all-or-nothing behavior as a conditional SQL update.

use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use crate::db::models::*;
use crate::db::store::*;
use crate::errors::Result;

#[derive(Default)]
pub struct MemoryArticleStore {
    rows: RwLock<BTreeMap<i64, Article>>,
}

impl MemoryArticleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-populated with the given rows
    pub fn with_articles(articles: impl IntoIterator<Item = Article>) -> Self {
        let rows = articles.into_iter().map(|a| (a.id, a)).collect();
        Self {
            rows: RwLock::new(rows),
        }
    }

    /// Snapshot of every stored row in id order
    pub async fn snapshot(&self) -> Vec<Article> {
        self.rows.read().await.values().cloned().collect()
    }
}

/// Newest first, ties broken by id
fn newest_first(a: &Article, b: &Article) -> std::cmp::Ordering {
    b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id))
}

#[async_trait]
impl ArticleStore for MemoryArticleStore {
    async fn apply_transition(&self, transition: &Transition) -> Result<u64> {
        let mut rows = self.rows.write().await;
        match rows.get_mut(&transition.article_id) {
            Some(article) if transition.guard.matches(article) => {
                transition.patch.apply(article);
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn list_scoped(&self, scope: ArticleScope) -> Result<Vec<Article>> {
        let rows = self.rows.read().await;
        let mut articles: Vec<Article> = rows
            .values()
            .filter(|a| scope.matches(a))
            .cloned()
            .collect();
        articles.sort_by(newest_first);
        Ok(articles)
    }

    async fn list_public(&self, query: &PublicQuery) -> Result<(Vec<Article>, u64)> {
        let rows = self.rows.read().await;
        let mut articles: Vec<Article> = rows
            .values()
            .filter(|a| query.matches(a))
            .cloned()
            .collect();
        articles.sort_by(|a, b| {
            b.is_live
                .cmp(&a.is_live)
                .then_with(|| newest_first(a, b))
        });

        let total = articles.len() as u64;
        let skip = usize::try_from(query.offset()).unwrap_or(usize::MAX);
        let page = articles
            .into_iter()
            .skip(skip)
            .take(query.limit as usize)
            .collect();

        Ok((page, total))
    }

    async fn find_article(&self, id: i64) -> Result<Option<Article>> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn insert_article(&self, article: NewArticle) -> Result<Article> {
        let mut rows = self.rows.write().await;
        let id = rows.keys().next_back().copied().unwrap_or(0) + 1;
        let now = chrono::Utc::now().into();

        let model = Article {
            id,
            section: article.section,
            title: article.title,
            slug: article.slug,
            summary: article.summary,
            content: article.content,
            image_url: article.image_url,
            page: article.page,
            views: Some(0),
            is_audio_pick: article.is_audio_pick,
            is_hot: article.is_hot,
            is_live: false,
            sub_links: Some(encode_list(&article.sub_links)?),
            media: Some(encode_list(&article.media)?),
            status: ArticleStatus::Draft,
            submitted_by: None,
            submitted_at: None,
            approved_by: None,
            approved_at: None,
            current_reviewer_role: None,
            rejection_reason: None,
            created_at: Some(now),
            updated_at: Some(now),
        };

        rows.insert(id, model.clone());
        Ok(model)
    }

    async fn update_article(&self, id: i64, changes: ArticleChanges) -> Result<Option<Article>> {
        let mut rows = self.rows.write().await;
        let Some(article) = rows.get_mut(&id) else {
            return Ok(None);
        };
        changes.apply(article)?;
        article.updated_at = Some(chrono::Utc::now().into());
        Ok(Some(article.clone()))
    }

    async fn delete_article(&self, id: i64) -> Result<bool> {
        Ok(self.rows.write().await.remove(&id).is_some())
    }
}

/// A bare article row for seeding stores in tests
pub fn article_fixture(id: i64, status: ArticleStatus, submitted_by: Option<i64>) -> Article {
    let created = chrono::DateTime::from_timestamp(1_700_000_000 + id * 60, 0)
        .unwrap_or_default()
        .fixed_offset();

    Article {
        id,
        section: "news".to_string(),
        title: format!("Article {}", id),
        slug: None,
        summary: None,
        content: None,
        image_url: None,
        page: "Home".to_string(),
        views: None,
        is_audio_pick: false,
        is_hot: false,
        is_live: status == ArticleStatus::Published,
        sub_links: None,
        media: None,
        status,
        submitted_by,
        submitted_at: None,
        approved_by: None,
        approved_at: None,
        current_reviewer_role: status.reviewer(),
        rejection_reason: None,
        created_at: Some(created),
        updated_at: Some(created),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn publish_transition(id: i64) -> Transition {
        Transition {
            article_id: id,
            guard: TransitionGuard {
                statuses: Some(vec![ArticleStatus::Approved]),
                owner: None,
            },
            patch: TransitionPatch {
                status: ArticleStatus::Published,
                current_reviewer_role: None,
                submitted_by: None,
                approved_by: None,
                rejection_reason: None,
                go_live: true,
                at: chrono::Utc::now().into(),
            },
        }
    }

    #[tokio::test]
    async fn test_guard_mismatch_affects_no_rows() {
        let store =
            MemoryArticleStore::with_articles([article_fixture(1, ArticleStatus::Draft, None)]);

        let affected = store.apply_transition(&publish_transition(1)).await.unwrap();
        assert_eq!(affected, 0);
        assert_eq!(store.snapshot().await[0].status, ArticleStatus::Draft);

        let missing = store.apply_transition(&publish_transition(99)).await.unwrap();
        assert_eq!(missing, 0);
    }

    #[tokio::test]
    async fn test_public_listing_puts_live_first() {
        let store = MemoryArticleStore::with_articles([
            article_fixture(1, ArticleStatus::Published, None),
            article_fixture(2, ArticleStatus::Draft, None),
            article_fixture(3, ArticleStatus::Draft, None),
        ]);
        let query = PublicQuery {
            section: None,
            placement: None,
            page: 1,
            limit: 10,
        };

        let (rows, total) = store.list_public(&query).await.unwrap();
        assert_eq!(total, 3);
        let ids: Vec<i64> = rows.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![1, 3, 2]);
    }

    #[tokio::test]
    async fn test_insert_assigns_next_id_as_draft() {
        let store =
            MemoryArticleStore::with_articles([article_fixture(4, ArticleStatus::Approved, None)]);
        let created = store
            .insert_article(NewArticle {
                section: "sport".into(),
                title: "Derby day".into(),
                page: "Home".into(),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(created.id, 5);
        assert_eq!(created.status, ArticleStatus::Draft);
        assert_eq!(created.current_reviewer_role, None);
        assert_eq!(created.sub_links.as_deref(), Some("[]"));
        assert!(!created.is_live);
    }

    #[tokio::test]
    async fn test_public_listing_past_the_end_is_empty() {
        let store = MemoryArticleStore::with_articles([
            article_fixture(1, ArticleStatus::Published, None),
            article_fixture(2, ArticleStatus::Draft, None),
        ]);
        let query = PublicQuery {
            section: None,
            placement: None,
            page: u64::MAX,
            limit: 100,
        };

        let (rows, total) = store.list_public(&query).await.unwrap();
        assert_eq!(total, 2);
        assert!(rows.is_empty());
    }
}
