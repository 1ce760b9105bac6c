//! Listing query builder.
//!
//! Turns a sanitized [`FilterSet`] plus sort/pagination state into a
//! [`QuerySpec`]: schema assembly first, then filter application. The
//! two phases are separate so the fields-modifier hook point can run
//! between them, exactly where third parties expect to add or rewrite
//! columns before filters become WHERE predicates.

use crate::db::SqlEscape;
use crate::error::{ListingError, ListingResult};

use super::filters::{FILTER_COLUMN_PREFIX, FilterSet};
use super::schema;
use super::types::{ColumnSource, FilterTemplate, QuerySpec, RequestScope, SortDirection};

pub struct ListingQueryBuilder<'a> {
    escaper: &'a dyn SqlEscape,
}

impl<'a> ListingQueryBuilder<'a> {
    pub fn new(escaper: &'a dyn SqlEscape) -> Self {
        Self { escaper }
    }

    /// Validate a requested sort against the allow-list, falling back to
    /// the primary key descending.
    pub fn validate_order(order_by: &str, direction: &str) -> (String, SortDirection) {
        let field = if schema::is_sortable(order_by) {
            order_by
        } else {
            schema::PRIMARY_KEY
        };
        let direction = SortDirection::parse(direction).unwrap_or_default();
        (field.to_string(), direction)
    }

    /// Assemble the schema-shaped query spec for this request.
    ///
    /// Returns the spec plus the effective filter set: when sorting by
    /// position with an active category filter, all column filters are
    /// suppressed for the request. That precedence rule is legacy
    /// behavior preserved as-is, not something to reason from first
    /// principles.
    pub fn assemble(
        &self,
        filters: &FilterSet,
        order_by: &str,
        direction: &str,
        offset: u64,
        limit: u64,
        scope: &RequestScope,
    ) -> ListingResult<(QuerySpec, FilterSet)> {
        let (mut order_field, direction) = Self::validate_order(order_by, direction);

        // The allow-list check above makes this unreachable; anything
        // slipping through is a defect worth failing loudly on.
        if !schema::is_sortable(&order_field) {
            return Err(ListingError::InvalidSort {
                field: order_field,
                direction: direction.as_sql().to_string(),
            });
        }

        let category_id = filters.category_id();
        let mut filters = filters.clone();

        if order_field == schema::POSITION_ORDERING {
            if category_id.is_some() {
                // Position sort takes precedence over granular filtering.
                filters.clear_column_filters();
            }
            order_field = "position".to_string();
        }

        let mut spec = QuerySpec::new(schema::BASE_TABLE, schema::BASE_ALIAS);
        spec.select = schema::columns();
        spec.joins = schema::joins(scope);
        spec.offset = offset;
        spec.limit = limit;

        if let Some(id) = category_id {
            spec.select.push(schema::position_column());
            spec.joins.push(schema::position_join(id));
        } else if order_field == "position" {
            // No category filter means no position join, no position
            // column, and therefore no position sort.
            spec.order_by
                .push(format!("`{}` asc", schema::PRIMARY_KEY));
            return Ok((spec, filters));
        }

        spec.order_by
            .push(format!("`{order_field}` {}", direction.as_sql()));
        if order_field != schema::PRIMARY_KEY {
            // Deterministic tiebreaker for stable pagination across
            // duplicate sort values.
            spec.order_by
                .push(format!("`{}` asc", schema::PRIMARY_KEY));
        }

        Ok((spec, filters))
    }

    /// Translate active column filters into WHERE predicates and append
    /// the baseline lifecycle-state restriction.
    ///
    /// Column lookup runs against the spec (not the static schema), so
    /// filters targeting hook-added columns resolve, and filters whose
    /// column a hook removed fail the build.
    pub fn apply_filters(&self, spec: &mut QuerySpec, filters: &FilterSet) -> ListingResult<()> {
        for (key, value) in filters.iter() {
            if value.is_empty() {
                // Empty means unset; the literal "0" is a real value.
                continue;
            }
            let Some(field) = key.strip_prefix(FILTER_COLUMN_PREFIX) else {
                // filter_category materializes as the position join, and
                // reserved keys are not predicates.
                continue;
            };

            let column = spec
                .column(field)
                .ok_or_else(|| ListingError::UnknownFilterColumn(key.to_string()))?;
            let template = column
                .filter
                .clone()
                .ok_or_else(|| ListingError::UnfilterableColumn(field.to_string()))?;

            let predicate = self.render_predicate(&column.source, &template, column.numeric, value);
            spec.predicates.push(predicate);
        }

        spec.predicates.push(schema::baseline_state_predicate());
        Ok(())
    }

    fn render_predicate(
        &self,
        source: &ColumnSource,
        template: &FilterTemplate,
        numeric: bool,
        value: &str,
    ) -> String {
        let target = match source {
            ColumnSource::Field { table, field } => format!("{table}.`{field}`"),
            ColumnSource::Expr(expr) => format!("({expr})"),
        };

        match template {
            FilterTemplate::Equals => {
                let escaped = self.escaper.escape(value, true, false);
                format!("{target} = {escaped}")
            }
            FilterTemplate::LikeBoth => {
                let escaped = self
                    .escaper
                    .escape(&escape_like_wildcards(value), false, false);
                format!("{target} LIKE '%{escaped}%'")
            }
            FilterTemplate::Expr(pattern) => {
                let escaped = self.escaper.escape(value, numeric, false);
                format!("({})", pattern.replace("{}", &escaped))
            }
        }
    }
}

/// Escape SQL LIKE wildcard characters (`%`, `_`, `\`) in a value.
fn escape_like_wildcards(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
