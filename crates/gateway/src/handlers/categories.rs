//! Category handlers

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
    db::models::Category,
    errors::{AppError, Result},
};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,

    #[validate(length(max = 120))]
    pub slug: Option<String>,

    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCategoryRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,

    #[validate(length(min = 1, max = 120))]
    pub slug: Option<String>,

    pub description: Option<String>,
}

/// Lowercase, with runs of anything but ASCII letters and digits collapsed to `-`
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

fn checked_slug(slug: String) -> Result<String> {
    if slug.is_empty() {
        return Err(AppError::validation(
            "slug",
            "Slug must contain at least one letter or digit",
        ));
    }
    Ok(slug)
}

pub async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    Ok(Json(state.repo.list_categories().await?))
}

pub async fn create_category(
    State(state): State<AppState>,
    actor: Actor,
    Json(request): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<Category>)> {
    actor.require_staff()?;
    request.validate()?;

    let name = request.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::validation("name", "Name is required"));
    }
    let slug = request
        .slug
        .map(|s| slugify(&s))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| slugify(&name));
    let slug = checked_slug(slug)?;

    let category = state
        .repo
        .create_category(name, slug, request.description)
        .await?;

    tracing::info!(category_id = category.id, actor_id = actor.id, "Category created");
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn update_category(
    State(state): State<AppState>,
    actor: Actor,
    Path(category_id): Path<i64>,
    Json(request): Json<UpdateCategoryRequest>,
) -> Result<Json<Category>> {
    actor.require_staff()?;
    request.validate()?;

    let name = request.name.map(|n| n.trim().to_string());
    if name.as_deref() == Some("") {
        return Err(AppError::validation("name", "Name is required"));
    }
    let slug = request.slug.map(|s| checked_slug(slugify(&s))).transpose()?;

    let category = state
        .repo
        .update_category(category_id, name, slug, request.description)
        .await?
        .ok_or_else(|| AppError::not_found("Category", category_id))?;

    Ok(Json(category))
}

pub async fn delete_category(
    State(state): State<AppState>,
    actor: Actor,
    Path(category_id): Path<i64>,
) -> Result<StatusCode> {
    actor.require_staff()?;

    if !state.repo.delete_category(category_id).await? {
        return Err(AppError::not_found("Category", category_id));
    }

    tracing::info!(category_id, actor_id = actor.id, "Category deleted");
    Ok(StatusCode::NO_CONTENT)
}
