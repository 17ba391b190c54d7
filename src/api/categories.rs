use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::db::{Category, CreateCategoryRequest, User};
use crate::AppState;

use super::error::{ApiError, ValidationErrorBuilder};
use super::metrics::record_catalog_write;
use super::validation::{slugify, validate_name, validate_optional_text, validate_slug};

const MAX_CATEGORY_DESCRIPTION: usize = 2_000;

/// GET /api/categories
pub async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Category>>, ApiError> {
    let categories = Category::list(&state.db).await?;
    Ok(Json(categories))
}

/// GET /api/categories/:slug
pub async fn get_category(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<Json<Category>, ApiError> {
    Category::find_by_slug(&state.db, &slug)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Category not found"))
}

/// POST /api/admin/categories
///
/// An empty slug is derived from the name.
pub async fn create_category(
    State(state): State<Arc<AppState>>,
    user: User,
    Json(mut req): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    if req.slug.trim().is_empty() {
        req.slug = slugify(&req.name);
    }

    let mut errors = ValidationErrorBuilder::new();
    errors.check("name", validate_name(&req.name, "Category name"));
    errors.check("slug", validate_slug(&req.slug));
    errors.check(
        "description",
        validate_optional_text(
            req.description.as_deref(),
            "Description",
            MAX_CATEGORY_DESCRIPTION,
        ),
    );
    errors.finish()?;

    let category = Category::create(&state.db, &req).await?;

    record_catalog_write("category", "create");
    tracing::info!(
        category_id = category.id,
        slug = %category.slug,
        user = %user.username,
        "Category created"
    );

    Ok((StatusCode::CREATED, Json(category)))
}

/// DELETE /api/admin/categories/:id
///
/// Products in the category are kept and lose their category.
pub async fn delete_category(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if !Category::delete(&state.db, id).await? {
        return Err(ApiError::not_found("Category not found"));
    }

    record_catalog_write("category", "delete");
    tracing::info!(category_id = id, user = %user.username, "Category deleted");

    Ok(StatusCode::NO_CONTENT)
}
