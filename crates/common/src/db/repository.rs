//! Repository pattern for user, category, and comment data
//!
//! Articles go through [`crate::db::ArticleStore`]; everything else the admin
//! panel edits is plain CRUD and lives here.

use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

/// Profile fields to overwrite on a user
#[derive(Debug, Clone)]
pub struct UserChanges {
    pub name: String,
    pub email: String,
    pub role: UserRole,
    /// New picture path; `None` keeps the current one
    pub profile_picture: Option<String>,
}

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }

    // ========================================================================
    // Health Check
    // ========================================================================

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // User Operations
    // ========================================================================

    pub async fn find_user_by_id(&self, id: i64) -> Result<Option<User>> {
        UserEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        UserEntity::find()
            .filter(UserColumn::Email.eq(email))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// All users, newest first
    pub async fn list_users(&self) -> Result<Vec<User>> {
        UserEntity::find()
            .order_by_desc(UserColumn::CreatedAt)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Insert a user; the email must not already be registered
    pub async fn create_user(
        &self,
        name: String,
        email: String,
        password_hash: String,
        role: UserRole,
        profile_picture: Option<String>,
    ) -> Result<User> {
        if self.find_user_by_email(&email).await?.is_some() {
            return Err(AppError::Duplicate {
                message: "Email already registered".to_string(),
            });
        }

        let user = UserActiveModel {
            name: Set(name),
            email: Set(email),
            password_hash: Set(password_hash),
            role: Set(role),
            profile_picture: Set(profile_picture),
            created_at: Set(chrono::Utc::now().into()),
            ..Default::default()
        };

        user.insert(self.write_conn()).await.map_err(Into::into)
    }

    /// Update a user's profile, returning the updated row and the replaced
    /// picture path (if any) so the caller can remove the old file
    pub async fn update_user(
        &self,
        id: i64,
        changes: UserChanges,
    ) -> Result<Option<(User, Option<String>)>> {
        let Some(existing) = UserEntity::find_by_id(id).one(self.write_conn()).await? else {
            return Ok(None);
        };

        if existing.email != changes.email {
            if let Some(other) = self.find_user_by_email(&changes.email).await? {
                if other.id != id {
                    return Err(AppError::Duplicate {
                        message: "Email already registered".to_string(),
                    });
                }
            }
        }

        let replaced_picture = match &changes.profile_picture {
            Some(_) => existing.profile_picture.clone(),
            None => None,
        };

        let mut user: UserActiveModel = existing.into();
        user.name = Set(changes.name);
        user.email = Set(changes.email);
        user.role = Set(changes.role);
        if let Some(picture) = changes.profile_picture {
            user.profile_picture = Set(Some(picture));
        }

        let updated = user.update(self.write_conn()).await?;
        Ok(Some((updated, replaced_picture)))
    }

    pub async fn delete_user(&self, id: i64) -> Result<bool> {
        let result = UserEntity::delete_by_id(id).exec(self.write_conn()).await?;
        Ok(result.rows_affected > 0)
    }

    // ========================================================================
    // Category Operations
    // ========================================================================

    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        CategoryEntity::find()
            .order_by_asc(CategoryColumn::Name)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    pub async fn create_category(
        &self,
        name: String,
        slug: String,
        description: Option<String>,
    ) -> Result<Category> {
        let existing = CategoryEntity::find()
            .filter(CategoryColumn::Name.eq(name.as_str()))
            .one(self.read_conn())
            .await?;
        if existing.is_some() {
            return Err(AppError::Duplicate {
                message: format!("Category '{}' already exists", name),
            });
        }

        let category = CategoryActiveModel {
            name: Set(name),
            slug: Set(slug),
            description: Set(description),
            created_at: Set(chrono::Utc::now().into()),
            ..Default::default()
        };

        category.insert(self.write_conn()).await.map_err(Into::into)
    }

    pub async fn update_category(
        &self,
        id: i64,
        name: Option<String>,
        slug: Option<String>,
        description: Option<String>,
    ) -> Result<Option<Category>> {
        let Some(existing) = CategoryEntity::find_by_id(id).one(self.write_conn()).await? else {
            return Ok(None);
        };

        let mut category: CategoryActiveModel = existing.into();
        if let Some(name) = name {
            category.name = Set(name);
        }
        if let Some(slug) = slug {
            category.slug = Set(slug);
        }
        if let Some(description) = description {
            category.description = Set(Some(description));
        }

        let updated = category.update(self.write_conn()).await?;
        Ok(Some(updated))
    }

    pub async fn delete_category(&self, id: i64) -> Result<bool> {
        let result = CategoryEntity::delete_by_id(id).exec(self.write_conn()).await?;
        Ok(result.rows_affected > 0)
    }

    // ========================================================================
    // Comment Operations
    // ========================================================================

    /// Comments on an article, oldest first
    pub async fn list_comments(&self, article_id: i64) -> Result<Vec<Comment>> {
        CommentEntity::find()
            .filter(CommentColumn::ArticleId.eq(article_id))
            .order_by_asc(CommentColumn::CreatedAt)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    pub async fn create_comment(
        &self,
        article_id: i64,
        author_name: String,
        author_email: Option<String>,
        body: String,
    ) -> Result<Comment> {
        let comment = CommentActiveModel {
            article_id: Set(article_id),
            author_name: Set(author_name),
            author_email: Set(author_email),
            body: Set(body),
            created_at: Set(chrono::Utc::now().into()),
            ..Default::default()
        };

        comment.insert(self.write_conn()).await.map_err(Into::into)
    }

    pub async fn delete_comment(&self, id: i64) -> Result<bool> {
        let result = CommentEntity::delete_by_id(id).exec(self.write_conn()).await?;
        Ok(result.rows_affected > 0)
    }
}
