use serde::{Deserialize, Serialize};

use crate::domain::product::ProductId;
use crate::domain::rule::RuleId;

/// A source product whose evaluation or persistence failed. The run continues.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductExecutionError {
    pub product_id: ProductId,
    pub product_name: String,
    pub error: String,
}

/// Configuration problem in one rule: an unknown field, an operator the field type
/// does not support, or a value that cannot be typed. The affected condition or
/// criterion never matches.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleWarning {
    pub rule_id: RuleId,
    pub rule_name: String,
    pub field: String,
    pub message: String,
}

/// Aggregate report of one bulk execution.
///
/// Counting convention: `products_processed` counts source products whose targets
/// were all handled; a failing source lands in `errors` instead, so
/// `products_processed + errors.len() == total_products`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkExecutionResult {
    pub run_id: String,
    pub rules_executed: Vec<RuleId>,
    pub total_products: usize,
    pub products_processed: usize,
    pub cross_sellings_created: usize,
    pub products_skipped: usize,
    pub errors: Vec<ProductExecutionError>,
    pub warnings: Vec<RuleWarning>,
}

impl BulkExecutionResult {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self { run_id: run_id.into(), ..Self::default() }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{BulkExecutionResult, ProductExecutionError};
    use crate::domain::product::ProductId;

    #[test]
    fn report_serializes_with_camel_case_keys() {
        let mut result = BulkExecutionResult::new("run-1");
        result.total_products = 3;
        result.errors.push(ProductExecutionError {
            product_id: ProductId("lamp-2".to_owned()),
            product_name: "Floor Lamp".to_owned(),
            error: "association store unavailable".to_owned(),
        });

        let encoded = serde_json::to_value(&result).expect("encode report");

        assert_eq!(encoded["totalProducts"], json!(3));
        assert_eq!(encoded["crossSellingsCreated"], json!(0));
        assert_eq!(encoded["productsSkipped"], json!(0));
        assert_eq!(encoded["errors"][0]["productId"], json!("lamp-2"));
        assert_eq!(encoded["errors"][0]["productName"], json!("Floor Lamp"));
        assert!(result.has_errors());
    }
}
