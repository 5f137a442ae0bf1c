//! Review workflow handlers

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;

use crate::AppState;
use newsroom_common::{
    auth::Actor,
    errors::Result,
    projection::ArticleView,
    workflow::TransitionOutcome,
};

#[derive(Debug, Default, Deserialize)]
pub struct RejectRequest {
    #[serde(default)]
    pub reason: String,
}

/// Articles the caller's role may see
pub async fn list_for_role(
    State(state): State<AppState>,
    actor: Actor,
) -> Result<Json<Vec<ArticleView>>> {
    let articles = state.projector.list_for_role(&actor).await?;
    Ok(Json(articles))
}

pub async fn submit(
    State(state): State<AppState>,
    actor: Actor,
    Path(article_id): Path<i64>,
) -> Result<Json<TransitionOutcome>> {
    Ok(Json(state.workflow.submit(article_id, &actor).await?))
}

pub async fn approve(
    State(state): State<AppState>,
    actor: Actor,
    Path(article_id): Path<i64>,
) -> Result<Json<TransitionOutcome>> {
    Ok(Json(state.workflow.approve(article_id, &actor).await?))
}

pub async fn reject(
    State(state): State<AppState>,
    actor: Actor,
    Path(article_id): Path<i64>,
    Json(request): Json<RejectRequest>,
) -> Result<Json<TransitionOutcome>> {
    let outcome = state
        .workflow
        .reject(article_id, &actor, &request.reason)
        .await?;
    Ok(Json(outcome))
}

pub async fn publish(
    State(state): State<AppState>,
    actor: Actor,
    Path(article_id): Path<i64>,
) -> Result<Json<TransitionOutcome>> {
    Ok(Json(state.workflow.publish(article_id, &actor).await?))
}
