//! Product models, DTOs and catalog queries.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};

use super::category::Category;
use super::common::{
    double_option, next_timestamp, now_timestamp, parse_string_list, serialize_string_list,
};

/// Availability of a product
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StockStatus {
    #[default]
    InStock,
    Limited,
    OutOfStock,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown stock status: {0}")]
pub struct ParseStockStatusError(pub String);

impl StockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InStock => "in-stock",
            Self::Limited => "limited",
            Self::OutOfStock => "out-of-stock",
        }
    }
}

impl std::fmt::Display for StockStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StockStatus {
    type Err = ParseStockStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in-stock" => Ok(Self::InStock),
            "limited" => Ok(Self::Limited),
            "out-of-stock" => Ok(Self::OutOfStock),
            other => Err(ParseStockStatusError(other.to_string())),
        }
    }
}

/// Flat row of `products LEFT JOIN categories`
#[derive(Debug, Clone, FromRow)]
struct ProductRow {
    id: i64,
    name: String,
    slug: String,
    short_description: Option<String>,
    full_description: Option<String>,
    price: String,
    sku: String,
    category_id: Option<i64>,
    images: String,
    specifications: Option<String>,
    stock_status: String,
    featured: bool,
    rating: f64,
    review_count: i64,
    created_at: String,
    updated_at: String,
    cat_id: Option<i64>,
    cat_name: Option<String>,
    cat_slug: Option<String>,
    cat_description: Option<String>,
    cat_created_at: Option<String>,
}

const PRODUCT_SELECT: &str = r#"
    SELECT p.id, p.name, p.slug, p.short_description, p.full_description, p.price, p.sku,
           p.category_id, p.images, p.specifications, p.stock_status, p.featured,
           p.rating, p.review_count, p.created_at, p.updated_at,
           c.id AS cat_id, c.name AS cat_name, c.slug AS cat_slug,
           c.description AS cat_description, c.created_at AS cat_created_at
    FROM products p
    LEFT JOIN categories c ON p.category_id = c.id
"#;

/// A product joined with its (optional) category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub short_description: Option<String>,
    pub full_description: Option<String>,
    pub price: String,
    pub sku: String,
    pub category_id: Option<i64>,
    pub images: Vec<String>,
    pub specifications: Option<serde_json::Value>,
    pub stock_status: StockStatus,
    pub featured: bool,
    pub rating: f64,
    pub review_count: i64,
    pub created_at: String,
    pub updated_at: String,
    pub category: Option<Category>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        let category = match (row.cat_id, row.cat_name, row.cat_slug, row.cat_created_at) {
            (Some(id), Some(name), Some(slug), Some(created_at)) => Some(Category {
                id,
                name,
                slug,
                description: row.cat_description,
                created_at,
            }),
            _ => None,
        };

        Self {
            id: row.id,
            name: row.name,
            slug: row.slug,
            short_description: row.short_description,
            full_description: row.full_description,
            price: row.price,
            sku: row.sku,
            category_id: row.category_id,
            images: parse_string_list(&row.images),
            specifications: row
                .specifications
                .and_then(|s| serde_json::from_str(&s).ok()),
            stock_status: row.stock_status.parse().unwrap_or_default(),
            featured: row.featured,
            rating: row.rating,
            review_count: row.review_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
            category,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub short_description: Option<String>,
    #[serde(default)]
    pub full_description: Option<String>,
    pub price: String,
    pub sku: String,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub specifications: Option<serde_json::Value>,
    #[serde(default)]
    pub stock_status: StockStatus,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub review_count: Option<i64>,
}

/// Partial update. Absent fields are left untouched; nullable fields can be
/// cleared with an explicit `null`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub slug: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub short_description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub full_description: Option<Option<String>>,
    pub price: Option<String>,
    pub sku: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub category_id: Option<Option<i64>>,
    pub images: Option<Vec<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub specifications: Option<Option<serde_json::Value>>,
    pub stock_status: Option<StockStatus>,
    pub featured: Option<bool>,
    pub rating: Option<f64>,
    pub review_count: Option<i64>,
}

/// Catalog listing filters; every field is optional
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductFilter {
    /// Category slug
    pub category: Option<String>,
    /// Case-insensitive substring of name or short description
    pub search: Option<String>,
    pub featured: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Escape LIKE wildcards so the term matches literally (used with `ESCAPE '\'`)
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Lowercased haystack for catalog search.
///
/// SQLite's `LIKE` and `lower()` only fold ASCII, so the folding happens here
/// and the query matches against a pre-lowered column.
pub fn search_text(name: &str, short_description: Option<&str>) -> String {
    match short_description {
        Some(description) => format!("{}\n{}", name, description).to_lowercase(),
        None => name.to_lowercase(),
    }
}

fn push_condition(qb: &mut QueryBuilder<'_, Sqlite>, first: &mut bool) {
    qb.push(if *first { " WHERE " } else { " AND " });
    *first = false;
}

fn specifications_column(value: &Option<serde_json::Value>) -> Option<String> {
    value.as_ref().map(|v| v.to_string())
}

impl Product {
    /// List products newest first, applying only the filters that were supplied.
    pub async fn list(db: &SqlitePool, filter: &ProductFilter) -> Result<Vec<Product>, sqlx::Error> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(PRODUCT_SELECT);
        let mut first = true;

        if let Some(category) = filter.category.as_deref().filter(|s| !s.is_empty()) {
            push_condition(&mut qb, &mut first);
            qb.push("c.slug = ").push_bind(category.to_string());
        }

        if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", escape_like(&search.to_lowercase()));
            push_condition(&mut qb, &mut first);
            qb.push("p.search_text LIKE ")
                .push_bind(pattern)
                .push(r" ESCAPE '\'");
        }

        if let Some(featured) = filter.featured {
            push_condition(&mut qb, &mut first);
            qb.push("p.featured = ").push_bind(featured);
        }

        qb.push(" ORDER BY p.created_at DESC, p.id DESC");

        match (filter.limit, filter.offset) {
            (Some(limit), offset) => {
                qb.push(" LIMIT ").push_bind(limit);
                if let Some(offset) = offset {
                    qb.push(" OFFSET ").push_bind(offset);
                }
            }
            // SQLite only accepts OFFSET after a LIMIT; -1 means unbounded
            (None, Some(offset)) => {
                qb.push(" LIMIT -1 OFFSET ").push_bind(offset);
            }
            (None, None) => {}
        }

        let rows: Vec<ProductRow> = qb.build_query_as().fetch_all(db).await?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    pub async fn find_by_id(db: &SqlitePool, id: i64) -> Result<Option<Product>, sqlx::Error> {
        let row: Option<ProductRow> = sqlx::query_as(&format!("{PRODUCT_SELECT} WHERE p.id = ?"))
            .bind(id)
            .fetch_optional(db)
            .await?;
        Ok(row.map(Product::from))
    }

    pub async fn find_by_slug(db: &SqlitePool, slug: &str) -> Result<Option<Product>, sqlx::Error> {
        let row: Option<ProductRow> =
            sqlx::query_as(&format!("{PRODUCT_SELECT} WHERE p.slug = ?"))
                .bind(slug)
                .fetch_optional(db)
                .await?;
        Ok(row.map(Product::from))
    }

    /// Insert a product; `created_at` and `updated_at` are both the write time.
    pub async fn create(db: &SqlitePool, req: &CreateProductRequest) -> Result<Product, sqlx::Error> {
        let now = now_timestamp();

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO products (
                name, slug, short_description, full_description, price, sku,
                category_id, images, specifications, stock_status, featured,
                rating, review_count, search_text, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&req.name)
        .bind(&req.slug)
        .bind(&req.short_description)
        .bind(&req.full_description)
        .bind(&req.price)
        .bind(&req.sku)
        .bind(req.category_id)
        .bind(serialize_string_list(&req.images))
        .bind(specifications_column(&req.specifications))
        .bind(req.stock_status.as_str())
        .bind(req.featured)
        .bind(req.rating.unwrap_or(0.0))
        .bind(req.review_count.unwrap_or(0))
        .bind(search_text(&req.name, req.short_description.as_deref()))
        .bind(&now)
        .bind(&now)
        .fetch_one(db)
        .await?;

        Self::find_by_id(db, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    /// Apply a partial update. Returns `None` when no product has this id.
    pub async fn update(
        db: &SqlitePool,
        id: i64,
        patch: &UpdateProductRequest,
    ) -> Result<Option<Product>, sqlx::Error> {
        let mut tx = db.begin().await?;

        let existing: Option<ProductRow> =
            sqlx::query_as(&format!("{PRODUCT_SELECT} WHERE p.id = ?"))
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(existing) = existing else {
            return Ok(None);
        };
        let current = Product::from(existing);

        let updated_at = next_timestamp(&current.updated_at);
        let name = patch.name.clone().unwrap_or(current.name);
        let slug = patch.slug.clone().unwrap_or(current.slug);
        let short_description = patch
            .short_description
            .clone()
            .unwrap_or(current.short_description);
        let full_description = patch
            .full_description
            .clone()
            .unwrap_or(current.full_description);
        let price = patch.price.clone().unwrap_or(current.price);
        let sku = patch.sku.clone().unwrap_or(current.sku);
        let category_id = patch.category_id.unwrap_or(current.category_id);
        let images = patch.images.clone().unwrap_or(current.images);
        let specifications = patch
            .specifications
            .clone()
            .unwrap_or(current.specifications);
        let stock_status = patch.stock_status.unwrap_or(current.stock_status);
        let featured = patch.featured.unwrap_or(current.featured);
        let rating = patch.rating.unwrap_or(current.rating);
        let review_count = patch.review_count.unwrap_or(current.review_count);

        sqlx::query(
            r#"
            UPDATE products SET
                name = ?,
                slug = ?,
                short_description = ?,
                full_description = ?,
                price = ?,
                sku = ?,
                category_id = ?,
                images = ?,
                specifications = ?,
                stock_status = ?,
                featured = ?,
                rating = ?,
                review_count = ?,
                search_text = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&name)
        .bind(&slug)
        .bind(&short_description)
        .bind(&full_description)
        .bind(&price)
        .bind(&sku)
        .bind(category_id)
        .bind(serialize_string_list(&images))
        .bind(specifications_column(&specifications))
        .bind(stock_status.as_str())
        .bind(featured)
        .bind(rating)
        .bind(review_count)
        .bind(search_text(&name, short_description.as_deref()))
        .bind(&updated_at)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let row: ProductRow = sqlx::query_as(&format!("{PRODUCT_SELECT} WHERE p.id = ?"))
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(Product::from(row)))
    }

    /// Hard delete. Returns `false` when there was nothing to delete.
    pub async fn delete(db: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM products WHERE id = ?")
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Recompute `search_text` for every product. Returns the number of rows.
    pub async fn rebuild_search_text(db: &SqlitePool) -> Result<u64, sqlx::Error> {
        let rows: Vec<(i64, String, Option<String>)> =
            sqlx::query_as("SELECT id, name, short_description FROM products")
                .fetch_all(db)
                .await?;

        let mut tx = db.begin().await?;
        for (id, name, short_description) in &rows {
            sqlx::query("UPDATE products SET search_text = ? WHERE id = ?")
                .bind(search_text(name, short_description.as_deref()))
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        Ok(rows.len() as u64)
    }

    pub async fn count(db: &SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(db)
            .await
    }
}
