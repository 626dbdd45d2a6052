//! Item, category and item image repository implementations
//!
//! Item search is built with `QueryBuilder` so every filter value is bound,
//! and the same WHERE clause feeds both the page query and the count query.

use super::db_error;
use rentshare_core::{
    filters::ItemSearch,
    location::EARTH_RADIUS_KM,
    models::{Category, Item, ItemCondition, ItemImage, ItemStatus},
    traits::{
        CategoryRepository, ItemImageRepository, ItemRepository, Pagination, Repository,
    },
    AppError, AppResult,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{debug, instrument};
use uuid::Uuid;

const ITEM_COLUMNS: &str = "id, owner_id, category_id, title, description, condition, \
     daily_rate, hourly_rate, security_deposit, min_rental_days, max_rental_days, \
     delivery_available, delivery_fee, location, latitude, longitude, status, view_count, \
     created_at, updated_at";

/// PostgreSQL implementation of ItemRepository
pub struct PgItemRepository {
    pool: PgPool,
}

impl PgItemRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Append the search predicates to a query that already has a WHERE clause
    fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, search: &ItemSearch) {
        qb.push(" AND status = 'active'");

        if let Some(text) = search.text() {
            let pattern = format!("%{}%", text);
            qb.push(" AND (title ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR description ILIKE ")
                .push_bind(pattern)
                .push(")");
        }

        if let Some(category_id) = search.category_id {
            qb.push(" AND category_id = ").push_bind(category_id);
        }

        if let Some(min) = search.min_price {
            qb.push(" AND daily_rate >= ").push_bind(min);
        }

        if let Some(max) = search.max_price {
            qb.push(" AND daily_rate <= ").push_bind(max);
        }

        if let Some(location) = search.location.as_deref().filter(|l| !l.trim().is_empty()) {
            qb.push(" AND location ILIKE ")
                .push_bind(format!("%{}%", location.trim()));
        }

        if search.delivery_only {
            qb.push(" AND delivery_available");
        }

        if let (Some(centre), Some(radius)) = (search.near, search.radius_km) {
            // haversine great-circle distance
            qb.push(" AND latitude IS NOT NULL AND longitude IS NOT NULL AND 2 * ")
                .push_bind(EARTH_RADIUS_KM)
                .push(" * ASIN(SQRT(POWER(SIN(RADIANS(latitude - ")
                .push_bind(centre.latitude)
                .push(") / 2), 2) + COS(RADIANS(")
                .push_bind(centre.latitude)
                .push(")) * COS(RADIANS(latitude)) * POWER(SIN(RADIANS(longitude - ")
                .push_bind(centre.longitude)
                .push(") / 2), 2))) <= ")
                .push_bind(radius);
        }
    }
}

#[async_trait]
impl Repository<Item, Uuid> for PgItemRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Item>> {
        debug!("Finding item by id: {}", id);

        let row = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {} FROM items WHERE id = $1",
            ITEM_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("find item", e))?;

        Ok(row.map(Into::into))
    }

    #[instrument(skip(self, entity), fields(owner_id = %entity.owner_id))]
    async fn create(&self, entity: &Item) -> AppResult<Item> {
        debug!("Creating item: {}", entity.title);

        let row = sqlx::query_as::<_, ItemRow>(&format!(
            r#"
            INSERT INTO items (
                id, owner_id, category_id, title, description, condition,
                daily_rate, hourly_rate, security_deposit, min_rental_days, max_rental_days,
                delivery_available, delivery_fee, location, latitude, longitude, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            RETURNING {}
            "#,
            ITEM_COLUMNS
        ))
        .bind(entity.id)
        .bind(entity.owner_id)
        .bind(entity.category_id)
        .bind(&entity.title)
        .bind(&entity.description)
        .bind(entity.condition.to_string())
        .bind(entity.daily_rate)
        .bind(entity.hourly_rate)
        .bind(entity.security_deposit)
        .bind(entity.min_rental_days)
        .bind(entity.max_rental_days)
        .bind(entity.delivery_available)
        .bind(entity.delivery_fee)
        .bind(&entity.location)
        .bind(entity.latitude)
        .bind(entity.longitude)
        .bind(entity.status.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("create item", e))?;

        Ok(row.into())
    }

    #[instrument(skip(self, entity), fields(id = %entity.id))]
    async fn update(&self, entity: &Item) -> AppResult<Item> {
        debug!("Updating item");

        let row = sqlx::query_as::<_, ItemRow>(&format!(
            r#"
            UPDATE items
            SET category_id = $2,
                title = $3,
                description = $4,
                condition = $5,
                daily_rate = $6,
                hourly_rate = $7,
                security_deposit = $8,
                min_rental_days = $9,
                max_rental_days = $10,
                delivery_available = $11,
                delivery_fee = $12,
                location = $13,
                latitude = $14,
                longitude = $15,
                status = $16,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            ITEM_COLUMNS
        ))
        .bind(entity.id)
        .bind(entity.category_id)
        .bind(&entity.title)
        .bind(&entity.description)
        .bind(entity.condition.to_string())
        .bind(entity.daily_rate)
        .bind(entity.hourly_rate)
        .bind(entity.security_deposit)
        .bind(entity.min_rental_days)
        .bind(entity.max_rental_days)
        .bind(entity.delivery_available)
        .bind(entity.delivery_fee)
        .bind(&entity.location)
        .bind(entity.latitude)
        .bind(entity.longitude)
        .bind(entity.status.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("update item", e))?;

        row.map(Into::into)
            .ok_or_else(|| AppError::ItemNotFound(entity.id.to_string()))
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM items WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("delete item", e))?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ItemRepository for PgItemRepository {
    #[instrument(skip(self, search))]
    async fn search(&self, search: &ItemSearch) -> AppResult<(Vec<Item>, i64)> {
        let pagination = search.pagination();
        debug!(
            "Searching items: page={}, per_page={}",
            pagination.page, pagination.per_page
        );

        let mut count_qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM items WHERE 1=1");
        Self::push_filters(&mut count_qb, search);

        let total: (i64,) = count_qb
            .build_query_as()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("count items", e))?;

        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM items WHERE 1=1",
            ITEM_COLUMNS
        ));
        Self::push_filters(&mut qb, search);
        qb.push(" ORDER BY ")
            .push(search.sort.order_by())
            .push(" LIMIT ")
            .push_bind(pagination.limit())
            .push(" OFFSET ")
            .push_bind(pagination.offset());

        let rows: Vec<ItemRow> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("search items", e))?;

        Ok((rows.into_iter().map(Into::into).collect(), total.0))
    }

    #[instrument(skip(self))]
    async fn list_by_owner(
        &self,
        owner_id: Uuid,
        pagination: &Pagination,
    ) -> AppResult<(Vec<Item>, i64)> {
        let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM items WHERE owner_id = $1")
            .bind(owner_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("count owner items", e))?;

        let rows = sqlx::query_as::<_, ItemRow>(&format!(
            r#"
            SELECT {} FROM items
            WHERE owner_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
            ITEM_COLUMNS
        ))
        .bind(owner_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list owner items", e))?;

        Ok((rows.into_iter().map(Into::into).collect(), total.0))
    }

    #[instrument(skip(self))]
    async fn set_status(&self, id: Uuid, status: ItemStatus) -> AppResult<Item> {
        let row = sqlx::query_as::<_, ItemRow>(&format!(
            "UPDATE items SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            ITEM_COLUMNS
        ))
        .bind(id)
        .bind(status.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("update item status", e))?;

        row.map(Into::into)
            .ok_or_else(|| AppError::ItemNotFound(id.to_string()))
    }

    #[instrument(skip(self))]
    async fn increment_views(&self, id: Uuid) -> AppResult<()> {
        sqlx::query("UPDATE items SET view_count = view_count + 1 WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("increment item views", e))?;

        Ok(())
    }
}

/// PostgreSQL implementation of CategoryRepository
pub struct PgCategoryRepository {
    pool: PgPool,
}

impl PgCategoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CategoryRepository for PgCategoryRepository {
    #[instrument(skip(self))]
    async fn list(&self) -> AppResult<Vec<Category>> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, slug, description FROM categories ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list categories", e))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn find_by_slug(&self, slug: &str) -> AppResult<Option<Category>> {
        let row = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, slug, description FROM categories WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("find category", e))?;

        Ok(row.map(Into::into))
    }
}

/// PostgreSQL implementation of ItemImageRepository
pub struct PgItemImageRepository {
    pool: PgPool,
}

impl PgItemImageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const IMAGE_COLUMNS: &str = "id, item_id, storage_path, url, is_primary, sort_order, created_at";

#[async_trait]
impl ItemImageRepository for PgItemImageRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<ItemImage>> {
        let row = sqlx::query_as::<_, ItemImageRow>(&format!(
            "SELECT {} FROM item_images WHERE id = $1",
            IMAGE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("find item image", e))?;

        Ok(row.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn list_for_item(&self, item_id: Uuid) -> AppResult<Vec<ItemImage>> {
        let rows = sqlx::query_as::<_, ItemImageRow>(&format!(
            "SELECT {} FROM item_images WHERE item_id = $1 ORDER BY sort_order, created_at",
            IMAGE_COLUMNS
        ))
        .bind(item_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list item images", e))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self, image), fields(item_id = %image.item_id))]
    async fn create(&self, image: &ItemImage) -> AppResult<ItemImage> {
        let row = sqlx::query_as::<_, ItemImageRow>(&format!(
            r#"
            INSERT INTO item_images (id, item_id, storage_path, url, is_primary, sort_order)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            IMAGE_COLUMNS
        ))
        .bind(image.id)
        .bind(image.item_id)
        .bind(&image.storage_path)
        .bind(&image.url)
        .bind(image.is_primary)
        .bind(image.sort_order)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("create item image", e))?;

        Ok(row.into())
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM item_images WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("delete item image", e))?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn set_primary(&self, item_id: Uuid, image_id: Uuid) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE item_images SET is_primary = (id = $2) WHERE item_id = $1",
        )
        .bind(item_id)
        .bind(image_id)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("set primary image", e))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("No images for item {}", item_id)));
        }

        Ok(())
    }
}

/// Helper struct for mapping database rows
#[derive(Debug, sqlx::FromRow)]
struct ItemRow {
    id: Uuid,
    owner_id: Uuid,
    category_id: Option<Uuid>,
    title: String,
    description: String,
    condition: String,
    daily_rate: Decimal,
    hourly_rate: Option<Decimal>,
    security_deposit: Decimal,
    min_rental_days: i32,
    max_rental_days: Option<i32>,
    delivery_available: bool,
    delivery_fee: Option<Decimal>,
    location: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    status: String,
    view_count: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ItemRow> for Item {
    fn from(row: ItemRow) -> Self {
        Self {
            id: row.id,
            owner_id: row.owner_id,
            category_id: row.category_id,
            title: row.title,
            description: row.description,
            condition: ItemCondition::from_str(&row.condition).unwrap_or_default(),
            daily_rate: row.daily_rate,
            hourly_rate: row.hourly_rate,
            security_deposit: row.security_deposit,
            min_rental_days: row.min_rental_days,
            max_rental_days: row.max_rental_days,
            delivery_available: row.delivery_available,
            delivery_fee: row.delivery_fee,
            location: row.location,
            latitude: row.latitude,
            longitude: row.longitude,
            // unknown statuses are hidden rather than shown
            status: ItemStatus::from_str(&row.status).unwrap_or(ItemStatus::Inactive),
            view_count: row.view_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CategoryRow {
    id: Uuid,
    name: String,
    slug: String,
    description: Option<String>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            slug: row.slug,
            description: row.description,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ItemImageRow {
    id: Uuid,
    item_id: Uuid,
    storage_path: String,
    url: String,
    is_primary: bool,
    sort_order: i32,
    created_at: DateTime<Utc>,
}

impl From<ItemImageRow> for ItemImage {
    fn from(row: ItemImageRow) -> Self {
        Self {
            id: row.id,
            item_id: row.item_id,
            storage_path: row.storage_path,
            url: row.url,
            is_primary: row.is_primary,
            sort_order: row.sort_order,
            created_at: row.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rentshare_core::location::GeoPoint;
    use rust_decimal_macros::dec;

    #[test]
    fn test_search_filters_bind_every_value() {
        let search = ItemSearch {
            query: Some("drill'; DROP TABLE items; --".to_string()),
            min_price: Some(dec!(5)),
            near: Some(GeoPoint::new(40.0, -3.0)),
            radius_km: Some(10.0),
            delivery_only: true,
            ..Default::default()
        };

        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM items WHERE 1=1");
        PgItemRepository::push_filters(&mut qb, &search);
        let sql = qb.sql();

        assert!(!sql.contains("DROP TABLE"));
        assert!(sql.contains("title ILIKE $1"));
        assert!(sql.contains("daily_rate >= $3"));
        assert!(sql.contains("delivery_available"));
        assert!(sql.contains("ASIN"));
    }

    #[test]
    fn test_search_filters_only_active_by_default() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM items WHERE 1=1");
        PgItemRepository::push_filters(&mut qb, &ItemSearch::default());
        assert_eq!(
            qb.sql(),
            "SELECT COUNT(*) FROM items WHERE 1=1 AND status = 'active'"
        );
    }
}
