//! Query compiler: renders a [`QuerySpec`] into executable SQL.
//!
//! Pure structural assembly. Identifiers the compiler itself emits are
//! backtick-quoted; filter values must already be escaped upstream — the
//! compiler never escapes anything. Identical specs render identical
//! strings, byte for byte.

use super::types::{ColumnSource, QuerySpec};

/// Render the full SELECT statement.
pub fn compile(spec: &QuerySpec) -> String {
    let columns: Vec<String> = spec.select.iter().map(select_sql).collect();

    let mut sql = format!(
        "SELECT {}\nFROM `{}` `{}`",
        columns.join(", "),
        spec.base_table,
        spec.base_alias
    );

    for join in &spec.joins {
        sql.push_str(&format!(
            "\n{} `{}` `{}` ON ({})",
            join.kind.as_sql(),
            join.table,
            join.alias,
            join.on
        ));
    }

    if !spec.predicates.is_empty() {
        let rendered: Vec<String> = spec.predicates.iter().map(|p| format!("({p})")).collect();
        sql.push_str(&format!("\nWHERE {}", rendered.join(" AND ")));
    }

    if !spec.group_by.is_empty() {
        sql.push_str(&format!("\nGROUP BY {}", spec.group_by.join(", ")));
    }

    if !spec.order_by.is_empty() {
        sql.push_str(&format!("\nORDER BY {}", spec.order_by.join(", ")));
    }

    if spec.limit > 0 {
        sql.push_str(&format!("\nLIMIT {}, {}", spec.offset, spec.limit));
    }

    sql
}

/// Render the matching total-count statement.
///
/// Wraps the unordered, unlimited select in a COUNT subquery, which
/// stays correct when hooks add GROUP BY clauses.
pub fn compile_count(spec: &QuerySpec) -> String {
    let mut inner = spec.clone();
    inner.order_by.clear();
    inner.offset = 0;
    inner.limit = 0;

    format!("SELECT COUNT(*) FROM ({}) AS `listing_total`", compile(&inner))
}

fn select_sql(column: &super::types::ColumnSpec) -> String {
    match &column.source {
        ColumnSource::Field { table, field } => {
            format!("{}.`{}` AS `{}`", table, field, column.name)
        }
        ColumnSource::Expr(expr) => format!("{} AS `{}`", expr, column.name),
    }
}
