//! Catalog listing engine types.
//!
//! The query spec is a plain mutable structure: ordered vectors of
//! columns, joins and rendered SQL fragments. Listing extensions receive
//! it by mutable reference at the hook points, so everything here is
//! deliberately open for rewriting. Rendering order follows vector order,
//! which keeps compilation deterministic.

use serde::{Deserialize, Serialize};

/// Explicit request scope, passed into every kernel call.
///
/// Replaces any notion of ambient "current user / current shop" state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestScope {
    /// Back-office user, `None` for anonymous sessions.
    pub user_id: Option<i64>,
    pub shop_id: i64,
    pub language_id: i64,
}

impl RequestScope {
    pub fn new(user_id: Option<i64>, shop_id: i64, language_id: i64) -> Self {
        Self {
            user_id,
            shop_id,
            language_id,
        }
    }

    /// User id used for persistence keys; anonymous maps to the sentinel 0.
    pub fn user_key(&self) -> i64 {
        self.user_id.unwrap_or(0)
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    /// Parse a user-supplied direction; anything unrecognized is `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Where a selected column's value comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnSource {
    /// A physical field behind a table alias.
    Field { table: String, field: String },
    /// A literal or computed SQL expression.
    Expr(String),
}

/// How a column filter value is turned into a WHERE predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterTemplate {
    /// Numeric equality: `` alias.`field` = <value> ``.
    Equals,
    /// Case-insensitive contains: `` alias.`field` LIKE '%<value>%' ``.
    LikeBoth,
    /// Full predicate template with a single `{}` placeholder consuming
    /// the escaped value.
    Expr(String),
}

/// One selectable output field of the listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    /// Output alias, also the `filter_column_<name>` filter key suffix.
    pub name: String,
    pub source: ColumnSource,
    /// Filter template; columns without one cannot be filtered on.
    pub filter: Option<FilterTemplate>,
    /// Whether filter values are escaped in numeric mode.
    pub numeric: bool,
}

impl ColumnSpec {
    /// Column backed by a physical table field.
    pub fn field(name: &str, table: &str, field: &str) -> Self {
        Self {
            name: name.to_string(),
            source: ColumnSource::Field {
                table: table.to_string(),
                field: field.to_string(),
            },
            filter: None,
            numeric: false,
        }
    }

    /// Column backed by a literal or computed expression.
    pub fn expr(name: &str, expr: &str) -> Self {
        Self {
            name: name.to_string(),
            source: ColumnSource::Expr(expr.to_string()),
            filter: None,
            numeric: false,
        }
    }

    pub fn with_filter(mut self, template: FilterTemplate) -> Self {
        self.filter = Some(template);
        self
    }

    pub fn numeric(mut self) -> Self {
        self.numeric = true;
        self
    }
}

/// SQL join kinds used by the listing schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    /// Bare `JOIN` (MySQL treats it as INNER).
    Plain,
}

impl JoinKind {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Inner => "INNER JOIN",
            Self::Left => "LEFT JOIN",
            Self::Plain => "JOIN",
        }
    }
}

/// One joined table of the listing schema.
///
/// The ON condition is a rendered SQL fragment, already bound to the
/// request scope (shop id, language id, selected category id).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinSpec {
    pub alias: String,
    pub table: String,
    pub kind: JoinKind,
    pub on: String,
}

impl JoinSpec {
    pub fn new(alias: &str, table: &str, kind: JoinKind, on: String) -> Self {
        Self {
            alias: alias.to_string(),
            table: table.to_string(),
            kind,
            on,
        }
    }
}

/// Assembled-but-not-yet-rendered listing query.
///
/// Built fresh per request, mutated by hook points, consumed by the
/// compiler. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySpec {
    pub select: Vec<ColumnSpec>,
    pub base_table: String,
    pub base_alias: String,
    pub joins: Vec<JoinSpec>,
    /// WHERE predicates, AND-ed together. Values inside are already escaped.
    pub predicates: Vec<String>,
    pub group_by: Vec<String>,
    /// Rendered ORDER BY entries, e.g. `` `id_product` desc ``.
    pub order_by: Vec<String>,
    pub offset: u64,
    /// A limit of 0 omits the LIMIT clause entirely.
    pub limit: u64,
}

impl QuerySpec {
    pub fn new(base_table: &str, base_alias: &str) -> Self {
        Self {
            select: Vec::new(),
            base_table: base_table.to_string(),
            base_alias: base_alias.to_string(),
            joins: Vec::new(),
            predicates: Vec::new(),
            group_by: Vec::new(),
            order_by: Vec::new(),
            offset: 0,
            limit: 0,
        }
    }

    /// Look up a selected column by output alias.
    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.select.iter().find(|c| c.name == name)
    }

    /// Look up a join by table alias.
    pub fn join(&self, alias: &str) -> Option<&JoinSpec> {
        self.joins.iter().find(|j| j.alias == alias)
    }
}
