//! Post-treatment of listing rows.
//!
//! The raw SQL rows carry placeholder values for everything the
//! database cannot compute itself (tax-inclusive final prices,
//! image URLs, the page-independent total). This pass fills them in,
//! degrading per row rather than failing the whole page: a product
//! whose price cannot be resolved keeps its raw columns and a warning
//! is logged, while the rest of the page is enriched normally.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::warn;

use crate::db::Row;

/// Computes the effective sell price of a product, specific pricing
/// rules and taxes included.
#[async_trait]
pub trait PriceCalculator: Send + Sync {
    async fn final_price(&self, product_id: i64, precision: u32) -> anyhow::Result<Decimal>;
}

/// Renders a decimal amount for display in a given currency.
pub trait PriceFormatter: Send + Sync {
    fn format(&self, amount: Decimal, currency_iso: &str) -> String;
}

/// Resolves cover-image locations for a product row.
pub trait ImageResolver: Send + Sync {
    /// Relative thumbnail path for the back-office listing.
    fn thumbnail(&self, image_id: i64) -> Option<String>;
    /// Public image URL.
    fn image_link(&self, link_rewrite: &str, image_id: i64) -> Option<String>;
}

/// Inputs that vary per request rather than per processor.
#[derive(Debug, Clone)]
pub struct PostProcessContext {
    /// Page-independent match count, stamped onto every row.
    pub total: i64,
    pub currency_iso: String,
    /// When false, prices stay numeric strings instead of display text.
    pub format_prices: bool,
    pub price_precision: u32,
}

pub struct ResultPostProcessor {
    prices: Arc<dyn PriceCalculator>,
    formatter: Arc<dyn PriceFormatter>,
    images: Arc<dyn ImageResolver>,
}

impl ResultPostProcessor {
    pub fn new(
        prices: Arc<dyn PriceCalculator>,
        formatter: Arc<dyn PriceFormatter>,
        images: Arc<dyn ImageResolver>,
    ) -> Self {
        Self {
            prices,
            formatter,
            images,
        }
    }

    /// Enrich every row in place. Never fails: per-row problems are
    /// logged and that row keeps its raw values for the affected field.
    pub async fn apply(&self, rows: &mut [Row], ctx: &PostProcessContext) {
        for row in rows.iter_mut() {
            row.insert("total".to_string(), Value::from(ctx.total));

            self.fill_final_price(row, ctx).await;
            if ctx.format_prices {
                self.format_price_field(row, "price", ctx);
                self.format_price_field(row, "price_final", ctx);
            }
            self.fill_images(row);
        }
    }

    async fn fill_final_price(&self, row: &mut Row, ctx: &PostProcessContext) {
        let Some(product_id) = value_as_i64(row.get("id_product")) else {
            warn!("listing row without a usable id_product, skipping price resolution");
            return;
        };

        match self
            .prices
            .final_price(product_id, ctx.price_precision)
            .await
        {
            Ok(price) => {
                row.insert("price_final".to_string(), Value::String(price.to_string()));
            }
            Err(error) => {
                warn!(product_id, %error, "final price resolution failed, keeping raw value");
            }
        }
    }

    fn format_price_field(&self, row: &mut Row, field: &str, ctx: &PostProcessContext) {
        let Some(amount) = value_as_decimal(row.get(field)) else {
            // Missing or non-numeric content stays as-is.
            return;
        };
        let formatted = self.formatter.format(amount, &ctx.currency_iso);
        row.insert(field.to_string(), Value::String(formatted));
    }

    fn fill_images(&self, row: &mut Row) {
        let Some(image_id) = value_as_i64(row.get("id_image")) else {
            return;
        };

        if let Some(path) = self.images.thumbnail(image_id) {
            row.insert("image".to_string(), Value::String(path));
        }

        if let Some(rewrite) = row.get("link_rewrite").and_then(Value::as_str)
            && let Some(link) = self.images.image_link(rewrite, image_id)
        {
            row.insert("image_link".to_string(), Value::String(link));
        }
    }
}

/// Numeric columns may surface as JSON numbers or as strings depending
/// on the column type reported by the driver.
fn value_as_i64(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn value_as_decimal(value: Option<&Value>) -> Option<Decimal> {
    match value? {
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        Value::String(s) => Decimal::from_str(s).ok(),
        _ => None,
    }
}

#[cfg(test)]
// Tests are allowed to use unwrap/expect freely.
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use serde_json::json;

    /// Returns `id * 2` as the final price, failing for id 13.
    struct FakeCalculator;

    #[async_trait]
    impl PriceCalculator for FakeCalculator {
        async fn final_price(&self, product_id: i64, _precision: u32) -> anyhow::Result<Decimal> {
            if product_id == 13 {
                return Err(anyhow!("no price rules for this product"));
            }
            Ok(Decimal::from(product_id * 2))
        }
    }

    struct FakeFormatter;

    impl PriceFormatter for FakeFormatter {
        fn format(&self, amount: Decimal, currency_iso: &str) -> String {
            format!("{amount} {currency_iso}")
        }
    }

    struct FakeImages;

    impl ImageResolver for FakeImages {
        fn thumbnail(&self, image_id: i64) -> Option<String> {
            Some(format!("/thumbs/{image_id}.jpg"))
        }

        fn image_link(&self, link_rewrite: &str, image_id: i64) -> Option<String> {
            Some(format!("/img/{link_rewrite}-{image_id}.jpg"))
        }
    }

    fn processor() -> ResultPostProcessor {
        ResultPostProcessor::new(
            Arc::new(FakeCalculator),
            Arc::new(FakeFormatter),
            Arc::new(FakeImages),
        )
    }

    fn ctx(format_prices: bool) -> PostProcessContext {
        PostProcessContext {
            total: 42,
            currency_iso: "EUR".to_string(),
            format_prices,
            price_precision: 2,
        }
    }

    fn row(pairs: &[(&str, Value)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn total_is_stamped_on_every_row() {
        let mut rows = vec![
            row(&[("id_product", json!(1))]),
            row(&[("id_product", json!(2))]),
        ];

        processor().apply(&mut rows, &ctx(false)).await;

        for r in &rows {
            assert_eq!(r.get("total"), Some(&json!(42)));
        }
    }

    #[tokio::test]
    async fn final_price_is_resolved_per_product() {
        let mut rows = vec![row(&[("id_product", json!(5)), ("price_final", json!("0"))])];

        processor().apply(&mut rows, &ctx(false)).await;

        assert_eq!(rows[0].get("price_final"), Some(&json!("10")));
    }

    #[tokio::test]
    async fn one_failing_row_does_not_poison_the_batch() {
        let mut rows = vec![
            row(&[("id_product", json!(13)), ("price_final", json!("0"))]),
            row(&[("id_product", json!(3)), ("price_final", json!("0"))]),
        ];

        processor().apply(&mut rows, &ctx(false)).await;

        // The failing row keeps its raw placeholder.
        assert_eq!(rows[0].get("price_final"), Some(&json!("0")));
        assert_eq!(rows[1].get("price_final"), Some(&json!("6")));
        assert_eq!(rows[0].get("total"), Some(&json!(42)));
    }

    #[tokio::test]
    async fn prices_are_formatted_on_request() {
        let mut rows = vec![row(&[
            ("id_product", json!(4)),
            ("price", json!("19.99")),
            ("price_final", json!("0")),
        ])];

        processor().apply(&mut rows, &ctx(true)).await;

        assert_eq!(rows[0].get("price"), Some(&json!("19.99 EUR")));
        assert_eq!(rows[0].get("price_final"), Some(&json!("8 EUR")));
    }

    #[tokio::test]
    async fn image_fields_use_the_resolver() {
        let mut rows = vec![row(&[
            ("id_product", json!(4)),
            ("id_image", json!(77)),
            ("link_rewrite", json!("blue-widget")),
        ])];

        processor().apply(&mut rows, &ctx(false)).await;

        assert_eq!(rows[0].get("image"), Some(&json!("/thumbs/77.jpg")));
        assert_eq!(
            rows[0].get("image_link"),
            Some(&json!("/img/blue-widget-77.jpg"))
        );
    }

    #[tokio::test]
    async fn rows_without_image_are_left_alone() {
        let mut rows = vec![row(&[("id_product", json!(4))])];

        processor().apply(&mut rows, &ctx(false)).await;

        assert!(!rows[0].contains_key("image"));
        assert!(!rows[0].contains_key("image_link"));
    }
}
