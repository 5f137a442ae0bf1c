//! Article content handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use validator::Validate;

use crate::AppState;
use newsroom_common::{
    auth::Actor,
    db::models::{MediaItem, SubLink},
    db::store::{ArticleChanges, NewArticle},
    errors::{AppError, Result},
    projection::{ArticleView, PublicFilters, PublicPage},
};

const DEFAULT_PLACEMENT: &str = "Home";

/// Request body for creating an article. `is_live` is not accepted; only
/// publishing sets it.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateArticleRequest {
    #[validate(length(min = 1, max = 500))]
    pub title: String,

    #[validate(length(min = 1, max = 100))]
    pub section: String,

    pub slug: Option<String>,
    pub summary: Option<String>,
    pub content: Option<String>,
    pub image_url: Option<String>,

    /// Site placement, e.g. `Home`
    pub page: Option<String>,

    #[serde(default, rename = "isAudioPick", alias = "is_audio_pick")]
    pub is_audio_pick: bool,

    #[serde(default, rename = "isHot", alias = "is_hot")]
    pub is_hot: bool,

    #[serde(default, rename = "subLinks", alias = "sub_links")]
    pub sub_links: Vec<SubLink>,

    #[serde(default)]
    pub media: Vec<MediaItem>,
}

/// Request body for updating an article; absent fields are left unchanged
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateArticleRequest {
    #[validate(length(min = 1, max = 500))]
    pub title: Option<String>,

    #[validate(length(min = 1, max = 100))]
    pub section: Option<String>,

    pub slug: Option<String>,
    pub summary: Option<String>,
    pub content: Option<String>,
    pub image_url: Option<String>,
    pub page: Option<String>,

    #[serde(rename = "isAudioPick", alias = "is_audio_pick")]
    pub is_audio_pick: Option<bool>,

    #[serde(rename = "isHot", alias = "is_hot")]
    pub is_hot: Option<bool>,

    #[serde(rename = "subLinks", alias = "sub_links")]
    pub sub_links: Option<Vec<SubLink>>,

    pub media: Option<Vec<MediaItem>>,
}

impl From<UpdateArticleRequest> for ArticleChanges {
    fn from(req: UpdateArticleRequest) -> Self {
        ArticleChanges {
            section: req.section,
            title: req.title,
            slug: req.slug,
            summary: req.summary,
            content: req.content,
            image_url: req.image_url,
            page: req.page,
            is_audio_pick: req.is_audio_pick,
            is_hot: req.is_hot,
            sub_links: req.sub_links,
            media: req.media,
        }
    }
}

/// Public listing with optional section and placement filters
pub async fn list_public(
    State(state): State<AppState>,
    Query(filters): Query<PublicFilters>,
) -> Result<Json<PublicPage>> {
    let page = state.projector.list_public(&filters).await?;
    Ok(Json(page))
}

pub async fn get_article(
    State(state): State<AppState>,
    Path(article_id): Path<i64>,
) -> Result<Json<ArticleView>> {
    let article = state.projector.get_article(article_id).await?;
    Ok(Json(article))
}

/// Create a draft article
pub async fn create_article(
    State(state): State<AppState>,
    actor: Actor,
    Json(request): Json<CreateArticleRequest>,
) -> Result<(StatusCode, Json<ArticleView>)> {
    actor.require_author()?;
    request.validate()?;

    let page = request
        .page
        .filter(|p| !p.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_PLACEMENT.to_string());

    let article = state
        .articles
        .insert_article(NewArticle {
            section: request.section,
            title: request.title,
            slug: request.slug,
            summary: request.summary,
            content: request.content,
            image_url: request.image_url,
            page,
            is_audio_pick: request.is_audio_pick,
            is_hot: request.is_hot,
            sub_links: request.sub_links,
            media: request.media,
        })
        .await?;

    tracing::info!(
        article_id = article.id,
        actor_id = actor.id,
        section = %article.section,
        "Article created"
    );

    Ok((
        StatusCode::CREATED,
        Json(ArticleView::from_article(article, chrono::Utc::now().into())),
    ))
}

pub async fn update_article(
    State(state): State<AppState>,
    actor: Actor,
    Path(article_id): Path<i64>,
    Json(request): Json<UpdateArticleRequest>,
) -> Result<Json<ArticleView>> {
    actor.require_author()?;
    request.validate()?;

    let changes = ArticleChanges::from(request);
    if changes.is_empty() {
        return Err(AppError::Validation {
            message: "No fields to update".to_string(),
            field: None,
        });
    }

    let article = state
        .articles
        .update_article(article_id, changes)
        .await?
        .ok_or_else(|| AppError::not_found("Article", article_id))?;

    tracing::info!(article_id, actor_id = actor.id, "Article updated");

    Ok(Json(ArticleView::from_article(article, chrono::Utc::now().into())))
}

pub async fn delete_article(
    State(state): State<AppState>,
    actor: Actor,
    Path(article_id): Path<i64>,
) -> Result<StatusCode> {
    actor.require_author()?;

    if !state.articles.delete_article(article_id).await? {
        return Err(AppError::not_found("Article", article_id));
    }

    tracing::info!(article_id, actor_id = actor.id, "Article deleted");

    Ok(StatusCode::NO_CONTENT)
}
