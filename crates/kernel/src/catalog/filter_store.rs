//! Per-user filter state persistence.
//!
//! Cache-then-durable-store: an in-process Moka cache fronts the
//! `admin_filter` table. The cache entry is a derived view — every save
//! invalidates it unconditionally, so a load immediately after a save
//! always reflects the saved value.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use sqlx::mysql::MySqlPool;
use tracing::debug;

use crate::error::ListingResult;

use super::filters::FilterSet;
use super::types::RequestScope;

/// Fixed controller/action identifiers keying the catalog listing state.
pub const CONTROLLER: &str = "catalog";
pub const ACTION: &str = "index";

/// Maximum cached filter sets (one per user; listings are per-user state).
const CACHE_MAX_CAPACITY: u64 = 10_000;

/// Durable record of a user's last-applied listing filters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedFilterRecord {
    pub user_id: i64,
    pub shop_id: i64,
    pub controller: String,
    pub action: String,
    pub filters: FilterSet,
    /// Unix timestamp when first persisted.
    pub created: i64,
    /// Unix timestamp of the latest persist.
    pub changed: i64,
}

/// Durable storage collaborator for filter records.
///
/// The store itself never issues raw SQL for this path.
#[async_trait]
pub trait FilterRepository: Send + Sync {
    async fn find(
        &self,
        user_id: i64,
        shop_id: i64,
        controller: &str,
        action: &str,
    ) -> ListingResult<Option<PersistedFilterRecord>>;

    /// Insert or update. An existing record keeps its `created` stamp.
    async fn upsert(&self, record: &PersistedFilterRecord) -> ListingResult<()>;

    async fn remove(
        &self,
        user_id: i64,
        shop_id: i64,
        controller: &str,
        action: &str,
    ) -> ListingResult<()>;
}

/// sqlx-backed repository on the `admin_filter` table.
pub struct MySqlFilterRepository {
    pool: MySqlPool,
}

impl MySqlFilterRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FilterRepository for MySqlFilterRepository {
    async fn find(
        &self,
        user_id: i64,
        shop_id: i64,
        controller: &str,
        action: &str,
    ) -> ListingResult<Option<PersistedFilterRecord>> {
        #[derive(sqlx::FromRow)]
        struct FilterRow {
            user_id: i64,
            shop_id: i64,
            controller: String,
            action: String,
            filters: String,
            created: i64,
            changed: i64,
        }

        let row = sqlx::query_as::<_, FilterRow>(
            "SELECT user_id, shop_id, controller, action, filters, created, changed \
             FROM admin_filter \
             WHERE user_id = ? AND shop_id = ? AND controller = ? AND action = ?",
        )
        .bind(user_id)
        .bind(shop_id)
        .bind(controller)
        .bind(action)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let filters: FilterSet = serde_json::from_str(&row.filters)
            .context("failed to parse persisted filter blob")?;

        Ok(Some(PersistedFilterRecord {
            user_id: row.user_id,
            shop_id: row.shop_id,
            controller: row.controller,
            action: row.action,
            filters,
            created: row.created,
            changed: row.changed,
        }))
    }

    async fn upsert(&self, record: &PersistedFilterRecord) -> ListingResult<()> {
        let blob =
            serde_json::to_string(&record.filters).context("failed to serialize filter blob")?;

        sqlx::query(
            "INSERT INTO admin_filter (user_id, shop_id, controller, action, filters, created, changed) \
             VALUES (?, ?, ?, ?, ?, ?, ?) \
             ON DUPLICATE KEY UPDATE filters = VALUES(filters), changed = VALUES(changed)",
        )
        .bind(record.user_id)
        .bind(record.shop_id)
        .bind(&record.controller)
        .bind(&record.action)
        .bind(blob)
        .bind(record.created)
        .bind(record.changed)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn remove(
        &self,
        user_id: i64,
        shop_id: i64,
        controller: &str,
        action: &str,
    ) -> ListingResult<()> {
        sqlx::query(
            "DELETE FROM admin_filter \
             WHERE user_id = ? AND shop_id = ? AND controller = ? AND action = ?",
        )
        .bind(user_id)
        .bind(shop_id)
        .bind(controller)
        .bind(action)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Cache-fronted store for per-user listing filter state.
pub struct FilterStateStore {
    repo: Arc<dyn FilterRepository>,
    cache: Cache<String, FilterSet>,
}

impl FilterStateStore {
    pub fn new(repo: Arc<dyn FilterRepository>, cache_ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(CACHE_MAX_CAPACITY)
            .time_to_live(cache_ttl)
            .build();

        Self { repo, cache }
    }

    /// Stable cache key for a request scope. Mirrors the durable record
    /// key: user and shop identity together.
    fn cache_key(scope: &RequestScope) -> String {
        format!("catalog_filters:{}:{}", scope.user_key(), scope.shop_id)
    }

    /// Load the persisted filter set, from cache when possible.
    ///
    /// A missing durable record is not an error: the default empty
    /// filter set is returned (and cached) instead.
    pub async fn load(&self, scope: &RequestScope) -> ListingResult<FilterSet> {
        let key = Self::cache_key(scope);

        if let Some(filters) = self.cache.get(&key).await {
            debug!(key = %key, "filter cache hit");
            return Ok(filters);
        }

        let record = self
            .repo
            .find(scope.user_key(), scope.shop_id, CONTROLLER, ACTION)
            .await?;
        let filters = record.map(|r| r.filters).unwrap_or_default();

        self.cache.insert(key, filters.clone()).await;
        Ok(filters)
    }

    /// Persist the filter set for this scope.
    ///
    /// When every value is empty the durable record is deleted rather
    /// than written, so never-customized views leave no storage behind.
    /// The cache entry is invalidated unconditionally.
    pub async fn save(&self, scope: &RequestScope, filters: &FilterSet) -> ListingResult<()> {
        let user_id = scope.user_key();

        if filters.without_empty().is_empty() {
            self.repo
                .remove(user_id, scope.shop_id, CONTROLLER, ACTION)
                .await?;
        } else {
            let now = chrono::Utc::now().timestamp();
            self.repo
                .upsert(&PersistedFilterRecord {
                    user_id,
                    shop_id: scope.shop_id,
                    controller: CONTROLLER.to_string(),
                    action: ACTION.to_string(),
                    filters: filters.clone(),
                    created: now,
                    changed: now,
                })
                .await?;
        }

        self.cache.invalidate(&Self::cache_key(scope)).await;
        Ok(())
    }
}
