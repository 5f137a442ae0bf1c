//! Reader comment handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use validator::Validate;

use crate::AppState;
use newsroom_common::{
    auth::Actor,
    db::models::Comment,
    errors::{AppError, Result},
};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommentRequest {
    #[validate(length(min = 1, max = 100))]
    pub author_name: String,

    #[validate(email)]
    pub author_email: Option<String>,

    #[validate(length(min = 1, max = 5000))]
    pub body: String,
}

async fn ensure_article(state: &AppState, article_id: i64) -> Result<()> {
    state
        .articles
        .find_article(article_id)
        .await?
        .map(|_| ())
        .ok_or_else(|| AppError::not_found("Article", article_id))
}

pub async fn list_comments(
    State(state): State<AppState>,
    Path(article_id): Path<i64>,
) -> Result<Json<Vec<Comment>>> {
    ensure_article(&state, article_id).await?;
    Ok(Json(state.repo.list_comments(article_id).await?))
}

/// Readers comment without an account
pub async fn create_comment(
    State(state): State<AppState>,
    Path(article_id): Path<i64>,
    Json(request): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<Comment>)> {
    request.validate()?;
    ensure_article(&state, article_id).await?;

    let comment = state
        .repo
        .create_comment(
            article_id,
            request.author_name.trim().to_string(),
            request.author_email,
            request.body.trim().to_string(),
        )
        .await?;

    tracing::info!(comment_id = comment.id, article_id, "Comment created");
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    actor: Actor,
    Path(comment_id): Path<i64>,
) -> Result<StatusCode> {
    actor.require_staff()?;

    if !state.repo.delete_comment(comment_id).await? {
        return Err(AppError::not_found("Comment", comment_id));
    }

    tracing::info!(comment_id, actor_id = actor.id, "Comment deleted");
    Ok(StatusCode::NO_CONTENT)
}
