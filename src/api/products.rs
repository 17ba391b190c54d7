//! Product catalog endpoints (public reads, admin writes).

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::config::CatalogConfig;
use crate::db::{
    Category, CreateProductRequest, Product, ProductFilter, UpdateProductRequest, User,
};
use crate::AppState;

use super::error::{ApiError, ValidationErrorBuilder};
use super::metrics::record_catalog_write;
use super::validation::{
    normalize_specifications, validate_images, validate_name, validate_optional_text,
    validate_price, validate_rating, validate_review_count, validate_sku, validate_slug,
};

const MAX_SHORT_DESCRIPTION: usize = 500;
const MAX_FULL_DESCRIPTION: usize = 20_000;

/// Check paging values and apply the configured default / maximum page size
fn apply_paging(mut filter: ProductFilter, catalog: &CatalogConfig) -> Result<ProductFilter, ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    if filter.limit.is_some_and(|limit| limit < 0) {
        errors.add("limit", "Limit cannot be negative");
    }
    if filter.offset.is_some_and(|offset| offset < 0) {
        errors.add("offset", "Offset cannot be negative");
    }
    errors.finish()?;

    filter.limit = match filter.limit {
        Some(limit) => Some(limit.min(catalog.max_page_size)),
        None => catalog.default_page_size,
    };
    Ok(filter)
}

fn validate_create_request(req: &CreateProductRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    errors.check("name", validate_name(&req.name, "Product name"));
    errors.check("slug", validate_slug(&req.slug));
    errors.check("price", validate_price(&req.price));
    errors.check("sku", validate_sku(&req.sku));
    errors.check(
        "shortDescription",
        validate_optional_text(
            req.short_description.as_deref(),
            "Short description",
            MAX_SHORT_DESCRIPTION,
        ),
    );
    errors.check(
        "fullDescription",
        validate_optional_text(
            req.full_description.as_deref(),
            "Full description",
            MAX_FULL_DESCRIPTION,
        ),
    );
    errors.check("images", validate_images(&req.images));
    if let Some(rating) = req.rating {
        errors.check("rating", validate_rating(rating));
    }
    if let Some(count) = req.review_count {
        errors.check("reviewCount", validate_review_count(count));
    }

    errors.finish()
}

fn validate_update_request(req: &UpdateProductRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    if let Some(ref name) = req.name {
        errors.check("name", validate_name(name, "Product name"));
    }
    if let Some(ref slug) = req.slug {
        errors.check("slug", validate_slug(slug));
    }
    if let Some(ref price) = req.price {
        errors.check("price", validate_price(price));
    }
    if let Some(ref sku) = req.sku {
        errors.check("sku", validate_sku(sku));
    }
    if let Some(Some(ref text)) = req.short_description {
        errors.check(
            "shortDescription",
            validate_optional_text(Some(text), "Short description", MAX_SHORT_DESCRIPTION),
        );
    }
    if let Some(Some(ref text)) = req.full_description {
        errors.check(
            "fullDescription",
            validate_optional_text(Some(text), "Full description", MAX_FULL_DESCRIPTION),
        );
    }
    if let Some(ref images) = req.images {
        errors.check("images", validate_images(images));
    }
    if let Some(rating) = req.rating {
        errors.check("rating", validate_rating(rating));
    }
    if let Some(count) = req.review_count {
        errors.check("reviewCount", validate_review_count(count));
    }

    errors.finish()
}

async fn ensure_category_exists(state: &AppState, category_id: Option<i64>) -> Result<(), ApiError> {
    if let Some(id) = category_id {
        if Category::find_by_id(&state.db, id).await?.is_none() {
            return Err(ApiError::validation_field("categoryId", "Category does not exist"));
        }
    }
    Ok(())
}

/// List products
///
/// GET /api/products?category=&search=&featured=&limit=&offset=
pub async fn list_products(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<ProductFilter>,
) -> Result<Json<Vec<Product>>, ApiError> {
    let filter = apply_paging(filter, &state.config.catalog)?;
    let products = Product::list(&state.db, &filter).await?;
    Ok(Json(products))
}

/// Get a single product by slug, or by numeric id when no slug matches
///
/// GET /api/products/:key
pub async fn get_product(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Json<Product>, ApiError> {
    if let Some(product) = Product::find_by_slug(&state.db, &key).await? {
        return Ok(Json(product));
    }

    let by_id = match key.parse::<i64>() {
        Ok(id) => Product::find_by_id(&state.db, id).await?,
        Err(_) => None,
    };

    by_id
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Product not found"))
}

/// Create a product
///
/// POST /api/admin/products
pub async fn create_product(
    State(state): State<Arc<AppState>>,
    user: User,
    Json(mut req): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    validate_create_request(&req)?;
    req.specifications = normalize_specifications(req.specifications.take())
        .map_err(|e| ApiError::validation_field("specifications", e))?;
    ensure_category_exists(&state, req.category_id).await?;

    let product = Product::create(&state.db, &req).await?;

    record_catalog_write("product", "create");
    tracing::info!(
        product_id = product.id,
        slug = %product.slug,
        user = %user.username,
        "Product created"
    );

    Ok((StatusCode::CREATED, Json(product)))
}

/// Partially update a product
///
/// PUT /api/admin/products/:id
pub async fn update_product(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<i64>,
    Json(mut req): Json<UpdateProductRequest>,
) -> Result<Json<Product>, ApiError> {
    validate_update_request(&req)?;
    // Explicit null clears; a blank string normalizes to a clear as well
    if let Some(specifications) = req.specifications.take() {
        let normalized = normalize_specifications(specifications)
            .map_err(|e| ApiError::validation_field("specifications", e))?;
        req.specifications = Some(normalized);
    }
    if let Some(category_id) = req.category_id {
        ensure_category_exists(&state, category_id).await?;
    }

    let product = Product::update(&state.db, id, &req)
        .await?
        .ok_or_else(|| ApiError::not_found("Product not found"))?;

    record_catalog_write("product", "update");
    tracing::info!(
        product_id = product.id,
        slug = %product.slug,
        user = %user.username,
        "Product updated"
    );

    Ok(Json(product))
}

/// Delete a product
///
/// DELETE /api/admin/products/:id
pub async fn delete_product(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if !Product::delete(&state.db, id).await? {
        return Err(ApiError::not_found("Product not found"));
    }

    record_catalog_write("product", "delete");
    tracing::info!(product_id = id, user = %user.username, "Product deleted");

    Ok(StatusCode::NO_CONTENT)
}
