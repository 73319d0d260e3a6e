use std::cmp::Ordering;

use crate::cross_sell::fields::{operator_supports, FieldCatalog, FieldType};
use crate::cross_sell::value::{DimensionBounds, Operand, DEFAULT_NUMERIC_SCALE};
use crate::domain::execution::RuleWarning;
use crate::domain::product::{FieldValue, Product};
use crate::domain::rule::{ConditionOperator, CrossSellingRule, RuleCondition};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConditionOperand {
    Value(Operand),
    Bounds(DimensionBounds),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompiledCondition {
    pub field: String,
    pub field_type: FieldType,
    pub operator: ConditionOperator,
    pub operand: ConditionOperand,
}

/// A source condition after validation against the field catalog.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Predicate {
    Valid(CompiledCondition),
    /// Misconfigured condition; reported as a rule warning and never satisfied.
    NeverMatches,
}

#[derive(Clone, Debug, Default)]
pub struct CompiledConditions {
    pub predicates: Vec<Predicate>,
    pub warnings: Vec<RuleWarning>,
}

#[derive(Clone, Copy, Debug)]
pub struct ConditionEvaluator {
    scale: u32,
}

impl Default for ConditionEvaluator {
    fn default() -> Self {
        Self::new(DEFAULT_NUMERIC_SCALE)
    }
}

impl ConditionEvaluator {
    pub fn new(scale: u32) -> Self {
        Self { scale }
    }

    pub fn compile(&self, rule: &CrossSellingRule, catalog: &FieldCatalog) -> CompiledConditions {
        let mut compiled = CompiledConditions::default();

        for condition in &rule.source_conditions {
            match compile_condition(condition, catalog) {
                Ok(valid) => compiled.predicates.push(Predicate::Valid(valid)),
                Err(message) => {
                    compiled.predicates.push(Predicate::NeverMatches);
                    compiled.warnings.push(RuleWarning {
                        rule_id: rule.id.clone(),
                        rule_name: rule.name.clone(),
                        field: condition.field.clone(),
                        message,
                    });
                }
            }
        }

        compiled
    }

    pub fn matches(&self, product: &Product, predicate: &Predicate) -> bool {
        let condition = match predicate {
            Predicate::Valid(condition) => condition,
            Predicate::NeverMatches => return false,
        };

        let Some(raw) = product.field_value(&condition.field) else {
            return condition.operator.is_negated();
        };

        match &condition.operand {
            ConditionOperand::Bounds(bounds) => match &*raw {
                FieldValue::Dimensions(dimensions) => bounds.admits(dimensions),
                _ => false,
            },
            ConditionOperand::Value(expected) => {
                let Ok(actual) = Operand::from_field_value(&raw, condition.field_type) else {
                    return false;
                };
                self.apply(condition.operator, &actual, expected).unwrap_or(false)
            }
        }
    }

    /// Logical AND; an empty list matches every product.
    pub fn matches_all(&self, product: &Product, predicates: &[Predicate]) -> bool {
        predicates.iter().all(|predicate| self.matches(product, predicate))
    }

    fn apply(
        &self,
        operator: ConditionOperator,
        actual: &Operand,
        expected: &Operand,
    ) -> Option<bool> {
        match operator {
            ConditionOperator::Equals => actual.equals(expected, self.scale),
            ConditionOperator::NotEquals => actual.equals(expected, self.scale).map(|eq| !eq),
            ConditionOperator::Contains => actual.contains(expected),
            ConditionOperator::NotContains => actual.contains(expected).map(|found| !found),
            ConditionOperator::GreaterThan => {
                actual.compare(expected).map(|ordering| ordering == Ordering::Greater)
            }
            ConditionOperator::LessThan => {
                actual.compare(expected).map(|ordering| ordering == Ordering::Less)
            }
            ConditionOperator::GreaterThanOrEqual => {
                actual.compare(expected).map(|ordering| ordering != Ordering::Less)
            }
            ConditionOperator::LessThanOrEqual => {
                actual.compare(expected).map(|ordering| ordering != Ordering::Greater)
            }
            ConditionOperator::MatchesDimensions => None,
        }
    }
}

fn compile_condition(
    condition: &RuleCondition,
    catalog: &FieldCatalog,
) -> Result<CompiledCondition, String> {
    let key = condition.field.trim();
    if key.is_empty() {
        return Err("condition has no field".to_owned());
    }
    let descriptor =
        catalog.resolve_field(key).ok_or_else(|| format!("unknown field `{key}`"))?;

    if !operator_supports(condition.operator, descriptor.field_type) {
        return Err(format!(
            "operator `{}` is not supported for {} field `{key}`",
            condition.operator.as_str(),
            descriptor.field_type
        ));
    }

    let operand = if condition.operator == ConditionOperator::MatchesDimensions {
        DimensionBounds::from_literal(&condition.value).map(ConditionOperand::Bounds)
    } else {
        Operand::from_literal(&condition.value, descriptor.field_type).map(ConditionOperand::Value)
    }
    .map_err(|error| format!("invalid value for `{key}`: {error}"))?;

    Ok(CompiledCondition {
        field: key.to_owned(),
        field_type: descriptor.field_type,
        operator: condition.operator,
        operand,
    })
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use serde_json::json;

    use super::{ConditionEvaluator, Predicate};
    use crate::cross_sell::fields::{CustomFieldDefinition, FieldCatalog, FieldType};
    use crate::domain::product::{Dimensions, FieldValue, Product};
    use crate::domain::rule::{ConditionOperator, CrossSellingRule, RuleCondition};

    fn lamp() -> Product {
        Product::new("lamp-1", "Vintage Desk Lamp")
            .with_attribute("category", "Lamps")
            .with_attribute("price", Decimal::new(4990, 2))
            .with_attribute("availability", "in_stock")
            .with_attribute(
                "tags",
                FieldValue::List(vec!["office".to_owned(), "led".to_owned()]),
            )
            .with_attribute(
                "dimensions",
                Dimensions::new(Decimal::from(100), Decimal::from(40), Decimal::from(30)),
            )
    }

    fn compile(conditions: Vec<RuleCondition>) -> (Vec<Predicate>, usize) {
        let mut rule = CrossSellingRule::new("rule-1", "Test rule");
        rule.source_conditions = conditions;
        let catalog = FieldCatalog::resolve(vec![CustomFieldDefinition::new(
            "socket",
            "Socket",
            FieldType::Enum,
        )]);
        let compiled = ConditionEvaluator::default().compile(&rule, &catalog);
        (compiled.predicates, compiled.warnings.len())
    }

    fn single(field: &str, operator: ConditionOperator, value: serde_json::Value) -> bool {
        let (predicates, warnings) = compile(vec![RuleCondition::new(field, operator, value)]);
        assert_eq!(warnings, 0, "condition on `{field}` should compile");
        ConditionEvaluator::default().matches(&lamp(), &predicates[0])
    }

    #[test]
    fn string_operators_are_case_insensitive() {
        assert!(single("category", ConditionOperator::Equals, json!("lamps")));
        assert!(!single("category", ConditionOperator::NotEquals, json!("LAMPS")));
        assert!(single("name", ConditionOperator::Contains, json!("desk")));
        assert!(single("name", ConditionOperator::NotContains, json!("bulb")));
    }

    #[test]
    fn enum_operators_use_codes() {
        assert!(single("availability", ConditionOperator::Equals, json!("in_stock")));
        assert!(!single("availability", ConditionOperator::Equals, json!("IN_STOCK")));
        assert!(single("tags", ConditionOperator::Contains, json!("led")));
        assert!(single("tags", ConditionOperator::NotContains, json!("halogen")));
    }

    #[test]
    fn numeric_comparisons() {
        assert!(single("price", ConditionOperator::GreaterThan, json!(40)));
        assert!(single("price", ConditionOperator::LessThanOrEqual, json!("49.90")));
        assert!(single("price", ConditionOperator::GreaterThanOrEqual, json!(49.9)));
        assert!(!single("price", ConditionOperator::LessThan, json!(49.9)));
        assert!(single("price", ConditionOperator::Equals, json!(49.9)));
    }

    #[test]
    fn matches_dimensions_ignores_unconstrained_axes() {
        assert!(single("dimensions", ConditionOperator::MatchesDimensions, json!({ "width": 100 })));
        assert!(!single("dimensions", ConditionOperator::MatchesDimensions, json!({ "width": 99 })));

        let wide = lamp().with_attribute(
            "dimensions",
            Dimensions::new(Decimal::from(101), Decimal::from(40), Decimal::from(30)),
        );
        let (predicates, _) = compile(vec![RuleCondition::new(
            "dimensions",
            ConditionOperator::MatchesDimensions,
            json!({ "width": 100 }),
        )]);
        assert!(!ConditionEvaluator::default().matches(&wide, &predicates[0]));
    }

    #[test]
    fn missing_values_only_satisfy_negated_operators() {
        assert!(!single("socket", ConditionOperator::Equals, json!("E27")));
        assert!(single("socket", ConditionOperator::NotEquals, json!("E27")));
        assert!(single("socket", ConditionOperator::NotContains, json!("E27")));
    }

    #[test]
    fn invalid_conditions_never_match_and_warn() {
        let (predicates, warnings) = compile(vec![
            RuleCondition::new("colour", ConditionOperator::Equals, json!("red")),
            RuleCondition::new("price", ConditionOperator::Contains, json!("4")),
            RuleCondition::new("category", ConditionOperator::MatchesDimensions, json!({ "width": 1 })),
            RuleCondition::new("price", ConditionOperator::Equals, json!("cheap")),
            RuleCondition::new(" ", ConditionOperator::Equals, json!("x")),
        ]);

        assert_eq!(warnings, 5);
        assert!(predicates.iter().all(|predicate| *predicate == Predicate::NeverMatches));
        assert!(!ConditionEvaluator::default().matches_all(&lamp(), &predicates[..1]));
    }

    #[test]
    fn malformed_product_values_do_not_match() {
        let broken = lamp().with_attribute("price", "call us");
        let (predicates, _) =
            compile(vec![RuleCondition::new("price", ConditionOperator::GreaterThan, json!(1))]);

        assert!(!ConditionEvaluator::default().matches(&broken, &predicates[0]));
    }

    #[test]
    fn matches_all_is_conjunction_and_empty_list_matches() {
        let evaluator = ConditionEvaluator::default();
        let product = lamp();
        assert!(evaluator.matches_all(&product, &[]));

        let conditions = vec![
            RuleCondition::new("category", ConditionOperator::Equals, json!("Lamps")),
            RuleCondition::new("price", ConditionOperator::LessThan, json!(50)),
            RuleCondition::new("tags", ConditionOperator::Contains, json!("office")),
        ];
        let (predicates, _) = compile(conditions.clone());
        let individually = predicates.iter().all(|predicate| evaluator.matches(&product, predicate));
        assert_eq!(evaluator.matches_all(&product, &predicates), individually);
        assert!(individually);

        let mut failing = conditions;
        failing.push(RuleCondition::new("price", ConditionOperator::GreaterThan, json!(100)));
        let (predicates, _) = compile(failing);
        assert!(!evaluator.matches_all(&product, &predicates));
    }
}
