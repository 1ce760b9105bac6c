//! Catalog listing service.
//!
//! Ties the pipeline together: persisted filter state, sanitization,
//! query assembly, the two pre-compile hook points, SQL compilation,
//! execution, post-treatment, and the results hook. Callers hand in a
//! [`ListQuery`] and get back a [`CatalogPage`].

use std::sync::Arc;

use sea_query::{Alias, Expr, MysqlQueryBuilder, Query};
use tracing::debug;

use crate::config::Config;
use crate::db::{Row, SqlExecutor};
use crate::error::ListingResult;

use super::compiler;
use super::extension::{ExtensionRegistry, HookPoint};
use super::filter_store::FilterStateStore;
use super::filters::{
    self, FilterSet, LAST_LIMIT, LAST_OFFSET, LAST_ORDER_BY, LAST_SORT_DIRECTION,
};
use super::post_process::{PostProcessContext, ResultPostProcessor};
use super::query_builder::ListingQueryBuilder;
use super::types::RequestScope;

/// Page sizes the listing UI offers.
pub const PAGINATION_LIMIT_CHOICES: [u64; 4] = [20, 50, 100, 300];

/// One listing request.
#[derive(Debug, Clone)]
pub struct ListQuery {
    pub offset: u64,
    /// 0 falls back to the configured default page size.
    pub limit: u64,
    pub order_by: String,
    pub direction: String,
    /// Raw filters as submitted, validated during the fetch.
    pub raw_filters: FilterSet,
    /// When set, the merged filter state is not written back. Persisted
    /// filters still apply to the request itself.
    pub skip_persistence: bool,
    pub format_prices: bool,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 0,
            order_by: "id_product".to_string(),
            direction: "desc".to_string(),
            raw_filters: FilterSet::new(),
            skip_persistence: false,
            format_prices: false,
        }
    }
}

/// One page of listing results plus the page-independent total.
#[derive(Debug, Clone)]
pub struct CatalogPage {
    pub rows: Vec<Row>,
    pub total: i64,
}

pub struct CatalogService {
    executor: Arc<dyn SqlExecutor>,
    store: FilterStateStore,
    extensions: Arc<ExtensionRegistry>,
    post_processor: ResultPostProcessor,
    currency_iso: String,
    price_precision: u32,
    default_page_size: u64,
}

impl CatalogService {
    pub fn new(
        executor: Arc<dyn SqlExecutor>,
        store: FilterStateStore,
        extensions: Arc<ExtensionRegistry>,
        post_processor: ResultPostProcessor,
        config: &Config,
    ) -> Self {
        Self {
            executor,
            store,
            extensions,
            post_processor,
            currency_iso: config.currency_iso.clone(),
            price_precision: config.price_precision,
            default_page_size: config.default_page_size,
        }
    }

    pub fn pagination_limit_choices(&self) -> &'static [u64] {
        &PAGINATION_LIMIT_CHOICES
    }

    /// Filter state as last persisted for this scope.
    pub async fn load_persisted_filters(&self, scope: &RequestScope) -> ListingResult<FilterSet> {
        self.store.load(scope).await
    }

    /// Persist filter state for this scope directly, outside a fetch.
    pub async fn persist_filters(
        &self,
        scope: &RequestScope,
        filters: &FilterSet,
    ) -> ListingResult<()> {
        self.store.save(scope, filters).await
    }

    /// Merge incoming filters over the persisted baseline.
    ///
    /// Incoming values win key-by-key, including incoming empties which
    /// clear a persisted value. This never writes; whether the merged
    /// result is persisted is the caller's decision.
    pub async fn combine_filters(
        &self,
        scope: &RequestScope,
        incoming: &FilterSet,
    ) -> ListingResult<FilterSet> {
        let persisted = self.store.load(scope).await?;
        Ok(filters::merge(&persisted, incoming))
    }

    /// Whether the persisted state carries an active category filter.
    pub async fn is_category_filtered(&self, scope: &RequestScope) -> ListingResult<bool> {
        Ok(self.store.load(scope).await?.category_id().is_some())
    }

    /// Whether the persisted state carries any non-empty column filter.
    pub async fn is_column_filtered(&self, scope: &RequestScope) -> ListingResult<bool> {
        Ok(self.store.load(scope).await?.has_column_filter())
    }

    /// Shop-wide product count, ignoring all listing filters.
    pub async fn count_all(&self, scope: &RequestScope) -> ListingResult<i64> {
        let sql = Query::select()
            .expr(Expr::col(Alias::new("id_product")).count())
            .from(Alias::new("product_shop"))
            .and_where(Expr::col(Alias::new("id_shop")).eq(scope.shop_id))
            .to_string(MysqlQueryBuilder);

        self.executor.fetch_scalar(&sql).await
    }

    /// Run the full listing pipeline and return one page of products.
    pub async fn fetch_list(
        &self,
        scope: &RequestScope,
        query: &ListQuery,
    ) -> ListingResult<CatalogPage> {
        let (order_field, direction) =
            ListingQueryBuilder::validate_order(&query.order_by, &query.direction);
        let limit = if query.limit == 0 {
            self.default_page_size
        } else {
            query.limit
        };

        // Pagination and ordering travel with the filter state so the
        // next visit restores the full view, not just the filters.
        let mut incoming = query.raw_filters.clone();
        incoming.set(LAST_OFFSET, query.offset.to_string());
        incoming.set(LAST_LIMIT, limit.to_string());
        incoming.set(LAST_ORDER_BY, order_field.clone());
        incoming.set(LAST_SORT_DIRECTION, direction.as_sql());

        let combined = self.combine_filters(scope, &incoming).await?;
        if !query.skip_persistence {
            self.store.save(scope, &combined).await?;
        }

        let sanitized = filters::sanitize(&combined);

        let builder = ListingQueryBuilder::new(&*self.executor);
        let (mut spec, effective) = builder.assemble(
            &sanitized,
            &order_field,
            direction.as_sql(),
            query.offset,
            limit,
            scope,
        )?;

        self.extensions
            .dispatch_query(HookPoint::FieldsPreFilter, &mut spec);
        builder.apply_filters(&mut spec, &effective)?;
        self.extensions
            .dispatch_query(HookPoint::PreCompile, &mut spec);

        let select_sql = compiler::compile(&spec);
        let count_sql = compiler::compile_count(&spec);
        debug!(sql = %select_sql, "compiled listing query");

        let mut rows = self.executor.fetch_rows(&select_sql).await?;
        let total = self.executor.fetch_scalar(&count_sql).await?;

        let ctx = PostProcessContext {
            total,
            currency_iso: self.currency_iso.clone(),
            format_prices: query.format_prices,
            price_precision: self.price_precision,
        };
        self.post_processor.apply(&mut rows, &ctx).await;

        // Extensions see the enriched rows, never the raw SQL output.
        self.extensions.dispatch_results(&mut rows, total);

        Ok(CatalogPage { rows, total })
    }
}
