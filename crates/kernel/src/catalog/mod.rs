//! Catalog listing engine.
//!
//! Everything behind the back-office product list: per-user filter
//! state, sanitization, declarative query assembly with extension hook
//! points, SQL compilation, and result post-treatment. [`CatalogService`]
//! is the entry point; the submodules are each usable on their own.

pub mod compiler;
pub mod extension;
pub mod filter_store;
pub mod filters;
pub mod post_process;
pub mod query_builder;
pub mod schema;
pub mod service;
pub mod types;

pub use extension::{ExtensionRegistry, HookPoint, ListingExtension};
pub use filter_store::{FilterRepository, FilterStateStore, MySqlFilterRepository};
pub use filters::FilterSet;
pub use post_process::{ImageResolver, PriceCalculator, PriceFormatter, ResultPostProcessor};
pub use query_builder::ListingQueryBuilder;
pub use service::{CatalogPage, CatalogService, ListQuery};
pub use types::{QuerySpec, RequestScope, SortDirection};
