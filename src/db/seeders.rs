//! Database seeders for built-in data
//!
//! Seeds the storefront's starter categories so a fresh install has
//! something to browse and to assign products to.

use anyhow::Result;
use sqlx::SqlitePool;
use tracing::info;

use super::models::{now_timestamp, Category};

/// Seed the default categories when the table is empty.
///
/// A catalog with at least one category is never touched, so renaming or
/// deleting individual seeded categories persists. Deleting every category
/// leaves the table empty and the defaults come back on the next start
/// (disable with `catalog.seed_categories = false`).
pub async fn seed_default_categories(pool: &SqlitePool) -> Result<u64> {
    if Category::count(pool).await? > 0 {
        return Ok(0);
    }

    info!("Seeding default categories...");

    // Format: (name, slug, description)
    let categories: Vec<(&str, &str, &str)> = vec![
        (
            "Laptops & Computers",
            "laptops",
            "High-performance laptops and desktop computers for every need",
        ),
        (
            "CCTV Systems",
            "cctv",
            "Complete security camera solutions with professional installation",
        ),
        (
            "Accessories",
            "accessories",
            "Keyboards, mice, cables, and other computer accessories",
        ),
    ];

    let mut inserted = 0;
    for (name, slug, description) in categories {
        let result = sqlx::query(
            r#"
            INSERT INTO categories (name, slug, description, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(slug) DO NOTHING
            "#,
        )
        .bind(name)
        .bind(slug)
        .bind(description)
        .bind(now_timestamp())
        .execute(pool)
        .await?;
        inserted += result.rows_affected();
    }

    info!(count = inserted, "Default categories seeded");
    Ok(inserted)
}
