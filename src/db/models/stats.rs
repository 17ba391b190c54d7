//! Dashboard stats.

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use super::category::Category;
use super::product::Product;

/// Aggregate counts shown on the admin dashboard.
///
/// There is no view or inquiry tracking, so `monthly_views` and
/// `whatsapp_inquiries` are always zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub total_products: i64,
    pub active_categories: i64,
    pub monthly_views: i64,
    pub whatsapp_inquiries: i64,
}

impl StoreStats {
    pub async fn collect(db: &SqlitePool) -> Result<StoreStats, sqlx::Error> {
        Ok(StoreStats {
            total_products: Product::count(db).await?,
            active_categories: Category::count(db).await?,
            monthly_views: 0,
            whatsapp_inquiries: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{init_memory, CreateCategoryRequest};

    #[tokio::test]
    async fn test_counts_follow_table_contents() {
        let db = init_memory().await.unwrap();
        let before = StoreStats::collect(&db).await.unwrap();
        assert_eq!(before.total_products, 0);

        Category::create(
            &db,
            &CreateCategoryRequest {
                name: "CCTV Systems".to_string(),
                slug: "cctv".to_string(),
                description: None,
            },
        )
        .await
        .unwrap();

        let after = StoreStats::collect(&db).await.unwrap();
        assert_eq!(after.active_categories, before.active_categories + 1);
        assert_eq!(after.total_products, before.total_products);
        assert_eq!(after.monthly_views, 0);
        assert_eq!(after.whatsapp_inquiries, 0);
    }

    #[test]
    fn test_serializes_camel_case() {
        let stats = StoreStats {
            total_products: 3,
            active_categories: 2,
            monthly_views: 0,
            whatsapp_inquiries: 0,
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["totalProducts"], 3);
        assert_eq!(json["activeCategories"], 2);
        assert_eq!(json["whatsappInquiries"], 0);
    }
}
