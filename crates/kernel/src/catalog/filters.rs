//! Filter state: the open string-keyed filter map and its sanitizer.
//!
//! Raw filter parameters arrive as loosely-typed string pairs from the
//! UI layer. [`sanitize`] is the boundary: past it, a [`FilterSet`] only
//! contains keys the catalog schema knows about, with numeric values
//! already coerced.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::schema;

/// Prefix of per-column filter keys: `filter_column_<field>`.
pub const FILTER_COLUMN_PREFIX: &str = "filter_column_";

/// Category scoping filter key.
pub const FILTER_CATEGORY: &str = "filter_category";

/// Reserved pagination/sort state keys.
pub const LAST_OFFSET: &str = "last_offset";
pub const LAST_LIMIT: &str = "last_limit";
pub const LAST_ORDER_BY: &str = "last_order_by";
pub const LAST_SORT_DIRECTION: &str = "last_sort_direction";

const RESERVED_KEYS: &[&str] = &[LAST_OFFSET, LAST_LIMIT, LAST_ORDER_BY, LAST_SORT_DIRECTION];

/// Named filter criteria for a catalog listing.
///
/// Empty-string values mean "unset", except the literal `"0"` which is a
/// meaningful filter value (e.g. `active = 0`). A `BTreeMap` keeps
/// iteration order stable, so predicate rendering is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterSet(BTreeMap<String, String>);

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether a value counts as set. The empty string means unset; the
    /// literal `"0"` is a real value.
    fn value_is_set(value: &str) -> bool {
        !value.is_empty()
    }

    /// The selected category id, when the category filter is active
    /// (non-empty and positive).
    pub fn category_id(&self) -> Option<i64> {
        let raw = self.get(FILTER_CATEGORY)?;
        let id = raw.trim().parse::<i64>().ok()?;
        (id > 0).then_some(id)
    }

    /// Whether any per-column filter carries a value.
    pub fn has_column_filter(&self) -> bool {
        self.iter()
            .any(|(k, v)| k.starts_with(FILTER_COLUMN_PREFIX) && Self::value_is_set(v))
    }

    /// Blank out all per-column filters (position-sort precedence rule).
    pub fn clear_column_filters(&mut self) {
        for (key, value) in self.0.iter_mut() {
            if key.starts_with(FILTER_COLUMN_PREFIX) {
                value.clear();
            }
        }
    }

    /// Copy without purely-empty entries.
    pub fn without_empty(&self) -> FilterSet {
        FilterSet(
            self.0
                .iter()
                .filter(|(_, v)| !v.is_empty())
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    /// True when every value is the empty string.
    pub fn is_all_empty(&self) -> bool {
        self.0.values().all(String::is_empty)
    }
}

impl FromIterator<(String, String)> for FilterSet {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Normalize a raw filter map into the canonical [`FilterSet`].
///
/// Keeps reserved pagination/sort keys, the category filter, and
/// `filter_column_*` keys resolving to a filterable schema column.
/// Everything else is silently dropped. Values targeting numeric columns
/// that do not parse as numbers are coerced to unset.
pub fn sanitize(raw: &FilterSet) -> FilterSet {
    let mut out = FilterSet::new();

    for (key, value) in raw.iter() {
        if RESERVED_KEYS.contains(&key) {
            out.set(key, value);
            continue;
        }
        if key == FILTER_CATEGORY {
            let coerced = coerce_numeric(value);
            out.set(key, coerced);
            continue;
        }
        if let Some(field) = key.strip_prefix(FILTER_COLUMN_PREFIX) {
            let Some(column) = schema::filterable_column(field) else {
                continue;
            };
            let coerced = if column.numeric && !value.is_empty() {
                coerce_numeric(value)
            } else {
                value.to_string()
            };
            out.set(key, coerced);
        }
    }

    out
}

/// Merge persisted filter state with incoming parameters.
///
/// Last-write-wins per key: incoming values override persisted ones,
/// persisted-only keys survive. Idempotent.
pub fn merge(persisted: &FilterSet, incoming: &FilterSet) -> FilterSet {
    let mut out = persisted.clone();
    for (key, value) in incoming.iter() {
        out.set(key, value);
    }
    out
}

/// Keep the value only if it parses as a number; otherwise unset.
fn coerce_numeric(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.parse::<f64>().is_ok_and(f64::is_finite) {
        trimmed.to_string()
    } else {
        String::new()
    }
}

#[cfg(test)]
// Tests are allowed to use unwrap/expect freely.
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn raw(pairs: &[(&str, &str)]) -> FilterSet {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn sanitize_drops_unknown_keys() {
        let out = sanitize(&raw(&[
            ("filter_column_reference", "ABC"),
            ("filter_column_nonsense", "x"),
            ("totally_unknown", "y"),
            ("last_offset", "40"),
        ]));

        assert_eq!(out.get("filter_column_reference"), Some("ABC"));
        assert_eq!(out.get("last_offset"), Some("40"));
        assert!(out.get("filter_column_nonsense").is_none());
        assert!(out.get("totally_unknown").is_none());
    }

    #[test]
    fn sanitize_coerces_numeric_columns() {
        let out = sanitize(&raw(&[
            ("filter_column_id_product", "12"),
            ("filter_column_price", "19.99"),
            ("filter_column_sav_quantity", "12abc"),
        ]));

        assert_eq!(out.get("filter_column_id_product"), Some("12"));
        assert_eq!(out.get("filter_column_price"), Some("19.99"));
        // Non-numeric value on a numeric column becomes unset.
        assert_eq!(out.get("filter_column_sav_quantity"), Some(""));
    }

    #[test]
    fn sanitize_keeps_category_filter() {
        let out = sanitize(&raw(&[("filter_category", "3")]));
        assert_eq!(out.get("filter_category"), Some("3"));
        assert_eq!(out.category_id(), Some(3));

        let out = sanitize(&raw(&[("filter_category", "not-a-number")]));
        assert_eq!(out.get("filter_category"), Some(""));
        assert_eq!(out.category_id(), None);
    }

    #[test]
    fn zero_is_a_meaningful_filter_value() {
        let out = sanitize(&raw(&[("filter_column_active", "0")]));
        assert_eq!(out.get("filter_column_active"), Some("0"));
        assert!(out.has_column_filter());
    }

    #[test]
    fn category_id_requires_positive() {
        assert_eq!(raw(&[("filter_category", "0")]).category_id(), None);
        assert_eq!(raw(&[("filter_category", "-2")]).category_id(), None);
        assert_eq!(raw(&[("filter_category", "")]).category_id(), None);
        assert_eq!(raw(&[("filter_category", "9")]).category_id(), Some(9));
    }

    #[test]
    fn merge_is_last_write_wins() {
        let persisted = raw(&[("filter_column_name", "old"), ("filter_category", "2")]);
        let incoming = raw(&[("filter_column_name", "new")]);

        let merged = merge(&persisted, &incoming);
        assert_eq!(merged.get("filter_column_name"), Some("new"));
        assert_eq!(merged.get("filter_category"), Some("2"));
    }

    #[test]
    fn merge_is_idempotent() {
        let f = raw(&[("filter_column_name", "x"), ("last_offset", "20")]);

        assert_eq!(merge(&f, &FilterSet::new()), f);
        assert_eq!(merge(&f, &f), f);
    }

    #[test]
    fn clear_column_filters_blanks_only_column_keys() {
        let mut f = raw(&[
            ("filter_column_price", "10"),
            ("filter_category", "3"),
            ("last_limit", "20"),
        ]);
        f.clear_column_filters();

        assert_eq!(f.get("filter_column_price"), Some(""));
        assert_eq!(f.get("filter_category"), Some("3"));
        assert_eq!(f.get("last_limit"), Some("20"));
        assert!(!f.has_column_filter());
    }

    #[test]
    fn without_empty_and_all_empty() {
        let f = raw(&[("a", ""), ("b", "1")]);
        assert!(!f.is_all_empty());
        assert_eq!(f.without_empty().len(), 1);

        let f = raw(&[("a", ""), ("b", "")]);
        assert!(f.is_all_empty());
        assert!(f.without_empty().is_empty());
    }

    #[test]
    fn filter_set_serde_roundtrip() {
        let f = raw(&[("filter_column_name", "Widget"), ("last_offset", "0")]);
        let json = serde_json::to_string(&f).unwrap();
        let parsed: FilterSet = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, f);
    }
}
