//! Category model and queries.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

use super::common::now_timestamp;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategoryRequest {
    pub name: String,
    /// Derived from the name when empty
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl Category {
    /// All categories, alphabetically by name
    pub async fn list(db: &SqlitePool) -> Result<Vec<Category>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, name, slug, description, created_at FROM categories ORDER BY name ASC, id ASC",
        )
        .fetch_all(db)
        .await
    }

    pub async fn find_by_slug(db: &SqlitePool, slug: &str) -> Result<Option<Category>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, name, slug, description, created_at FROM categories WHERE slug = ?",
        )
        .bind(slug)
        .fetch_optional(db)
        .await
    }

    pub async fn find_by_id(db: &SqlitePool, id: i64) -> Result<Option<Category>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, name, slug, description, created_at FROM categories WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(db)
        .await
    }

    /// Insert a category. A duplicate slug fails with the UNIQUE constraint error.
    pub async fn create(
        db: &SqlitePool,
        req: &CreateCategoryRequest,
    ) -> Result<Category, sqlx::Error> {
        sqlx::query_as(
            r#"
            INSERT INTO categories (name, slug, description, created_at)
            VALUES (?, ?, ?, ?)
            RETURNING id, name, slug, description, created_at
            "#,
        )
        .bind(&req.name)
        .bind(&req.slug)
        .bind(&req.description)
        .bind(now_timestamp())
        .fetch_one(db)
        .await
    }

    /// Hard delete. Products in the category keep existing with no category.
    pub async fn delete(db: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn count(db: &SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM categories")
            .fetch_one(db)
            .await
    }
}
