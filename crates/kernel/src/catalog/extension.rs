//! Listing extension points.
//!
//! Third-party code registers a [`ListingExtension`] and gets full
//! read/write access to the in-progress [`QuerySpec`] at two points:
//! before column filters are translated into WHERE predicates, and again
//! immediately before compilation. A third callback sees the finished
//! result rows. The kernel does not validate what extensions do; a
//! corrupted spec surfaces as a query failure at execution time, with no
//! attempt to diagnose which extension caused it.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::db::Row;

use super::types::QuerySpec;

/// Named mutation points in the listing pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPoint {
    /// After schema assembly, before filters become WHERE predicates.
    FieldsPreFilter,
    /// After filter application, immediately before compilation.
    PreCompile,
}

impl HookPoint {
    pub fn name(&self) -> &'static str {
        match self {
            Self::FieldsPreFilter => "listing_fields_pre_filter",
            Self::PreCompile => "listing_pre_compile",
        }
    }
}

/// A registered listing extension.
///
/// Both methods default to no-ops so extensions implement only the
/// point they care about.
pub trait ListingExtension: Send + Sync {
    /// Mutate the query spec at a hook point.
    fn modify_query(&self, point: HookPoint, spec: &mut QuerySpec) {
        let _ = (point, spec);
    }

    /// Mutate the processed result rows before they are returned.
    fn modify_results(&self, rows: &mut Vec<Row>, total: i64) {
        let _ = (rows, total);
    }
}

/// Ordered registry of listing extensions.
///
/// Registration order is preserved as call order.
#[derive(Default)]
pub struct ExtensionRegistry {
    extensions: RwLock<Vec<Arc<dyn ListingExtension>>>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, extension: Arc<dyn ListingExtension>) {
        self.extensions.write().push(extension);
    }

    pub fn len(&self) -> usize {
        self.extensions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.read().is_empty()
    }

    /// Dispatch a query mutation point to all extensions in order.
    pub fn dispatch_query(&self, point: HookPoint, spec: &mut QuerySpec) {
        let extensions = self.extensions.read();
        for extension in extensions.iter() {
            extension.modify_query(point, spec);
        }
        debug!(
            point = point.name(),
            extensions = extensions.len(),
            "listing query hook dispatched"
        );
    }

    /// Dispatch the results mutation point to all extensions in order.
    pub fn dispatch_results(&self, rows: &mut Vec<Row>, total: i64) {
        let extensions = self.extensions.read();
        for extension in extensions.iter() {
            extension.modify_results(rows, total);
        }
        debug!(
            extensions = extensions.len(),
            "listing results hook dispatched"
        );
    }
}
