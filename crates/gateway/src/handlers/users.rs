//! Admin user management handlers
//!
//! Create and update take `multipart/form-data` so a profile picture can be
//! sent alongside the text fields. Admins manage editor and viewer accounts;
//! only super admins manage staff accounts. Nobody changes their own role.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use std::collections::HashMap;
use validator::ValidateEmail;

use super::multipart_error;
use crate::AppState;
use newsroom_common::{
    auth::{hash_password, Actor, MIN_PASSWORD_LEN},
    db::{models::{User, UserRole}, UserChanges},
    errors::{AppError, Result},
    uploads::UploadPolicy,
};

const PICTURE_FIELD: &str = "profilePicture";

/// A file part held in memory until the text fields validate
struct FilePart {
    filename: String,
    content_type: String,
    bytes: Vec<u8>,
}

#[derive(Default)]
struct UserForm {
    fields: HashMap<String, String>,
    picture: Option<FilePart>,
}

impl UserForm {
    async fn read(mut multipart: Multipart, limit: usize) -> Result<Self> {
        let mut form = UserForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| multipart_error(e, limit))?
        {
            let name = field.name().unwrap_or_default().to_string();
            if name == PICTURE_FIELD {
                let filename = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(|e| multipart_error(e, limit))?;
                if !bytes.is_empty() {
                    form.picture = Some(FilePart {
                        filename,
                        content_type,
                        bytes: bytes.to_vec(),
                    });
                }
            } else {
                let value = field.text().await.map_err(|e| multipart_error(e, limit))?;
                form.fields.insert(name, value.trim().to_string());
            }
        }

        Ok(form)
    }

    fn optional(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    fn required(&self, name: &str) -> Result<&str> {
        self.optional(name)
            .ok_or_else(|| AppError::validation(name, format!("{} is required", name)))
    }

    fn role(&self) -> Result<UserRole> {
        self.required("role")?
            .parse::<UserRole>()
            .map_err(|message| AppError::validation("role", message))
    }

    fn email(&self) -> Result<String> {
        let email = self.required("email")?.to_lowercase();
        if !email.validate_email() {
            return Err(AppError::validation("email", "Invalid email address"));
        }
        Ok(email)
    }
}

async fn store_picture(state: &AppState, picture: Option<FilePart>) -> Result<Option<String>> {
    let Some(part) = picture else {
        return Ok(None);
    };

    let stored = state
        .uploads
        .store(
            UploadPolicy::Profile,
            &part.filename,
            &part.content_type,
            &part.bytes,
        )
        .await?;
    Ok(Some(stored.url))
}

pub async fn list_users(State(state): State<AppState>, actor: Actor) -> Result<Json<Vec<User>>> {
    actor.require_staff()?;
    Ok(Json(state.repo.list_users().await?))
}

pub async fn create_user(
    State(state): State<AppState>,
    actor: Actor,
    multipart: Multipart,
) -> Result<(StatusCode, Json<User>)> {
    actor.require_staff()?;
    let form = UserForm::read(multipart, state.config.uploads.max_profile_bytes).await?;

    let name = form.required("name")?.to_string();
    let email = form.email()?;
    let role = form.role()?;
    actor.require_can_manage(role)?;
    let password = form.required("password")?;
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(
            "password",
            format!("Password must be at least {} characters", MIN_PASSWORD_LEN),
        ));
    }
    let password_hash = hash_password(password)?;

    let picture = store_picture(&state, form.picture).await?;
    let created = state
        .repo
        .create_user(name, email, password_hash, role, picture.clone())
        .await;

    let user = match created {
        Ok(user) => user,
        Err(e) => {
            if let Some(url) = picture {
                state.uploads.remove(&url).await;
            }
            return Err(e);
        }
    };

    tracing::info!(user_id = user.id, role = %user.role, actor_id = actor.id, "User created");
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn update_user(
    State(state): State<AppState>,
    actor: Actor,
    Path(user_id): Path<i64>,
    multipart: Multipart,
) -> Result<Json<User>> {
    actor.require_staff()?;
    let form = UserForm::read(multipart, state.config.uploads.max_profile_bytes).await?;

    let mut changes = UserChanges {
        name: form.required("name")?.to_string(),
        email: form.email()?,
        role: form.role()?,
        profile_picture: None,
    };

    if user_id == actor.id {
        if changes.role != actor.role {
            return Err(AppError::forbidden("Cannot change your own role"));
        }
    } else {
        actor.require_can_manage(changes.role)?;
        let existing = state
            .repo
            .find_user_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User", user_id))?;
        actor.require_can_manage(existing.role)?;
    }

    let picture = store_picture(&state, form.picture).await?;
    changes.profile_picture = picture.clone();

    let updated = match state.repo.update_user(user_id, changes).await {
        Ok(Some(result)) => Ok(result),
        Ok(None) => Err(AppError::not_found("User", user_id)),
        Err(e) => Err(e),
    };

    let (user, replaced) = match updated {
        Ok(result) => result,
        Err(e) => {
            if let Some(url) = &picture {
                state.uploads.remove(url).await;
            }
            return Err(e);
        }
    };

    if let Some(old) = replaced {
        state.uploads.remove(&old).await;
    }

    tracing::info!(user_id, actor_id = actor.id, "User updated");
    Ok(Json(user))
}

pub async fn delete_user(
    State(state): State<AppState>,
    actor: Actor,
    Path(user_id): Path<i64>,
) -> Result<StatusCode> {
    actor.require_staff()?;
    if user_id == actor.id {
        return Err(AppError::forbidden("Cannot delete your own account"));
    }

    let user = state
        .repo
        .find_user_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User", user_id))?;
    actor.require_can_manage(user.role)?;

    state.repo.delete_user(user_id).await?;
    if let Some(picture) = user.profile_picture {
        state.uploads.remove(&picture).await;
    }

    tracing::info!(user_id, actor_id = actor.id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}
