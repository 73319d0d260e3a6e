use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RuleId(pub String);

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConditionOperator {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
    MatchesDimensions,
}

impl ConditionOperator {
    pub const ALL: [Self; 9] = [
        Self::Equals,
        Self::NotEquals,
        Self::Contains,
        Self::NotContains,
        Self::GreaterThan,
        Self::LessThan,
        Self::GreaterThanOrEqual,
        Self::LessThanOrEqual,
        Self::MatchesDimensions,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equals => "equals",
            Self::NotEquals => "notEquals",
            Self::Contains => "contains",
            Self::NotContains => "notContains",
            Self::GreaterThan => "greaterThan",
            Self::LessThan => "lessThan",
            Self::GreaterThanOrEqual => "greaterThanOrEqual",
            Self::LessThanOrEqual => "lessThanOrEqual",
            Self::MatchesDimensions => "matchesDimensions",
        }
    }

    /// Negated operators hold for products that do not carry the field at all.
    pub fn is_negated(&self) -> bool {
        matches!(self, Self::NotEquals | Self::NotContains)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchType {
    Exact,
    Contains,
    SameDimensions,
    SameProperty,
}

impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Contains => "contains",
            Self::SameDimensions => "sameDimensions",
            Self::SameProperty => "sameProperty",
        }
    }

    /// Whether the criterion compares source and candidate directly, ignoring any literal.
    pub fn is_relational_only(&self) -> bool {
        matches!(self, Self::SameDimensions | Self::SameProperty)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RuleCondition {
    pub field: String,
    pub operator: ConditionOperator,
    #[serde(default)]
    pub value: Value,
}

impl RuleCondition {
    pub fn new(field: impl Into<String>, operator: ConditionOperator, value: impl Into<Value>) -> Self {
        Self { field: field.into(), operator, value: value.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleTargetCriteria {
    pub field: String,
    pub match_type: MatchType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl RuleTargetCriteria {
    pub fn relative(field: impl Into<String>, match_type: MatchType) -> Self {
        Self { field: field.into(), match_type, value: None }
    }

    pub fn literal(field: impl Into<String>, match_type: MatchType, value: impl Into<Value>) -> Self {
        Self { field: field.into(), match_type, value: Some(value.into()) }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossSellingRule {
    pub id: RuleId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub source_conditions: Vec<RuleCondition>,
    #[serde(default)]
    pub target_criteria: Vec<RuleTargetCriteria>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

impl CrossSellingRule {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: RuleId(id.into()),
            name: name.into(),
            description: None,
            active: true,
            source_conditions: Vec::new(),
            target_criteria: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_condition(mut self, condition: RuleCondition) -> Self {
        self.source_conditions.push(condition);
        self
    }

    pub fn with_criteria(mut self, criteria: RuleTargetCriteria) -> Self {
        self.target_criteria.push(criteria);
        self
    }

    pub fn deactivated(mut self) -> Self {
        self.active = false;
        self
    }

    /// Structural checks applied before a rule is stored. Field and operator
    /// compatibility is checked at execution time against that run's field catalog.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.id.0.trim().is_empty() {
            return Err(DomainError::InvariantViolation("rule id must not be blank".to_owned()));
        }
        if self.name.trim().is_empty() {
            return Err(DomainError::InvariantViolation(format!(
                "rule `{}` must have a non-empty name",
                self.id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{ConditionOperator, CrossSellingRule, MatchType};
    use crate::errors::DomainError;

    #[test]
    fn rule_decodes_from_camel_case_wire_shape() {
        let rule: CrossSellingRule = serde_json::from_value(json!({
            "id": "rule-lamps",
            "name": "Lamps need bulbs",
            "active": true,
            "sourceConditions": [
                { "field": "category", "operator": "equals", "value": "Lamps" }
            ],
            "targetCriteria": [
                { "field": "category", "matchType": "exact", "value": "LightBulbs" },
                { "field": "socket", "matchType": "sameProperty" }
            ]
        }))
        .expect("decode rule");

        assert_eq!(rule.source_conditions[0].operator, ConditionOperator::Equals);
        assert_eq!(rule.target_criteria[0].match_type, MatchType::Exact);
        assert_eq!(rule.target_criteria[1].match_type, MatchType::SameProperty);
        assert!(rule.target_criteria[1].value.is_none());
        assert!(rule.description.is_none());
    }

    #[test]
    fn imported_rules_default_to_active() {
        let rule: CrossSellingRule =
            serde_json::from_value(json!({ "id": "rule-2", "name": "Shades" })).expect("decode");

        assert!(rule.active);
        assert!(rule.source_conditions.is_empty());
        assert!(rule.target_criteria.is_empty());
    }

    #[test]
    fn operator_names_match_wire_encoding() {
        for operator in ConditionOperator::ALL {
            let encoded = serde_json::to_value(operator).expect("encode operator");
            assert_eq!(encoded, json!(operator.as_str()));
        }
    }

    #[test]
    fn validation_rejects_blank_name() {
        let rule = CrossSellingRule::new("rule-1", "   ");

        assert!(matches!(rule.validate(), Err(DomainError::InvariantViolation(message)) if message.contains("rule-1")));
        assert!(CrossSellingRule::new("rule-1", "Bulbs").validate().is_ok());
    }
}
