//! Declarative catalog listing schema.
//!
//! One place describes the whole join graph and every selectable column
//! of the product listing. The query builder recomputes the active
//! subset per request: the `cp` (category position) join and its
//! `position` column exist only while the category filter is active.

use super::types::{ColumnSpec, FilterTemplate, JoinKind, JoinSpec, RequestScope};

/// Physical base table and its alias.
pub const BASE_TABLE: &str = "product";
pub const BASE_ALIAS: &str = "p";

/// Primary key column, also the default and tiebreaker sort field.
pub const PRIMARY_KEY: &str = "id_product";

/// Virtual sort field mapping to the category position column.
pub const POSITION_ORDERING: &str = "position_ordering";

/// Product lifecycle state restricting every listing (saved products only).
pub const STATE_SAVED: i64 = 1;

/// Fields a listing may be sorted by.
const SORTABLE: &[&str] = &[
    "id_product",
    "reference",
    "price",
    "price_final",
    "name",
    "name_category",
    "active",
    "sav_quantity",
    POSITION_ORDERING,
    "position",
];

/// Whether `field` is on the sortable allow-list.
pub fn is_sortable(field: &str) -> bool {
    SORTABLE.contains(&field)
}

/// The unconditional select list of the catalog listing.
pub fn columns() -> Vec<ColumnSpec> {
    vec![
        ColumnSpec::field("id_product", "p", "id_product")
            .with_filter(FilterTemplate::Equals)
            .numeric(),
        ColumnSpec::field("reference", "p", "reference").with_filter(FilterTemplate::LikeBoth),
        ColumnSpec::field("price", "sa", "price")
            .with_filter(FilterTemplate::Equals)
            .numeric(),
        ColumnSpec::field("id_shop_default", "p", "id_shop_default"),
        ColumnSpec::field("is_virtual", "p", "is_virtual"),
        ColumnSpec::field("name", "pl", "name").with_filter(FilterTemplate::LikeBoth),
        ColumnSpec::field("link_rewrite", "pl", "link_rewrite")
            .with_filter(FilterTemplate::LikeBoth),
        ColumnSpec::field("active", "sa", "active")
            .with_filter(FilterTemplate::Equals)
            .numeric(),
        ColumnSpec::field("shopname", "shop", "name"),
        ColumnSpec::field("id_image", "image_shop", "id_image"),
        ColumnSpec::field("name_category", "cl", "name").with_filter(FilterTemplate::LikeBoth),
        ColumnSpec::expr("price_final", "0"),
        ColumnSpec::field("nb_downloadable", "pd", "nb_downloadable"),
        ColumnSpec::field("sav_quantity", "sav", "quantity")
            .with_filter(FilterTemplate::Equals)
            .numeric(),
        ColumnSpec::expr("badge_danger", "IF(sav.`quantity`<=0, 1, 0)")
            .with_filter(FilterTemplate::Expr(
                "IF(sav.`quantity`<=0, 1, 0) = {}".to_string(),
            ))
            .numeric(),
    ]
}

/// The unconditional join graph, bound to the request scope.
pub fn joins(scope: &RequestScope) -> Vec<JoinSpec> {
    let shop = scope.shop_id;
    let lang = scope.language_id;

    vec![
        JoinSpec::new(
            "pl",
            "product_lang",
            JoinKind::Left,
            format!(
                "pl.`id_product` = p.`id_product` AND pl.`id_lang` = {lang} AND pl.`id_shop` = {shop}"
            ),
        ),
        JoinSpec::new(
            "sav",
            "stock_available",
            JoinKind::Left,
            format!(
                "sav.`id_product` = p.`id_product` AND sav.`id_product_attribute` = 0 AND sav.`id_shop` = {shop}"
            ),
        ),
        JoinSpec::new(
            "sa",
            "product_shop",
            JoinKind::Plain,
            format!("p.`id_product` = sa.`id_product` AND sa.`id_shop` = {shop}"),
        ),
        JoinSpec::new(
            "cl",
            "category_lang",
            JoinKind::Left,
            format!(
                "sa.`id_category_default` = cl.`id_category` AND cl.`id_lang` = {lang} AND cl.`id_shop` = {shop}"
            ),
        ),
        JoinSpec::new(
            "c",
            "category",
            JoinKind::Left,
            "c.`id_category` = cl.`id_category`".to_string(),
        ),
        JoinSpec::new(
            "shop",
            "shop",
            JoinKind::Left,
            format!("shop.`id_shop` = {shop}"),
        ),
        JoinSpec::new(
            "image_shop",
            "image_shop",
            JoinKind::Left,
            format!(
                "image_shop.`id_product` = p.`id_product` AND image_shop.`cover` = 1 AND image_shop.`id_shop` = {shop}"
            ),
        ),
        JoinSpec::new(
            "i",
            "image",
            JoinKind::Left,
            "i.`id_image` = image_shop.`id_image`".to_string(),
        ),
        JoinSpec::new(
            "pd",
            "product_download",
            JoinKind::Left,
            "pd.`id_product` = p.`id_product`".to_string(),
        ),
    ]
}

/// The position column, present only while a category filter is active.
pub fn position_column() -> ColumnSpec {
    ColumnSpec::field("position", "cp", "position")
}

/// The category-position join for the selected category.
pub fn position_join(category_id: i64) -> JoinSpec {
    JoinSpec::new(
        "cp",
        "category_product",
        JoinKind::Inner,
        format!("cp.`id_product` = p.`id_product` AND cp.`id_category` = {category_id}"),
    )
}

/// Baseline predicate restricting listings to saved products.
pub fn baseline_state_predicate() -> String {
    format!("p.`state` = {STATE_SAVED}")
}

/// Look up a filterable column of the unconditional schema by name.
///
/// Used by the sanitizer to decide which `filter_column_*` keys are
/// recognized at all.
pub fn filterable_column(name: &str) -> Option<ColumnSpec> {
    columns()
        .into_iter()
        .find(|c| c.name == name && c.filter.is_some())
}
