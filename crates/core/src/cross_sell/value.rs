//! Typed operands. Rule values arrive as untyped JSON and product attributes as
//! loosely typed [`FieldValue`]s; both are converted against the field's declared
//! type before any comparison happens.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::Value;
use thiserror::Error;

use crate::cross_sell::fields::FieldType;
use crate::domain::product::{Dimensions, FieldValue};

/// Decimal places numbers are rounded to before equality checks.
pub const DEFAULT_NUMERIC_SCALE: u32 = 4;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ValueError {
    #[error("a value is required")]
    Missing,
    #[error("expected a {expected} value, found {found}")]
    Mismatch { expected: FieldType, found: String },
    #[error("`{0}` is not a valid number")]
    InvalidNumber(String),
    #[error("dimension bounds must constrain at least one axis")]
    EmptyBounds,
    #[error("bound for `{axis}` must be a number or a {{min, max}} range")]
    InvalidBound { axis: &'static str },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operand {
    Text(String),
    Number(Decimal),
    Bool(bool),
    Codes(Vec<String>),
    Dimensions(Dimensions),
}

impl Operand {
    /// Types a literal taken from a rule definition.
    pub fn from_literal(raw: &Value, field_type: FieldType) -> Result<Self, ValueError> {
        if raw.is_null() {
            return Err(ValueError::Missing);
        }
        // Number literals are read from their JSON text, not through an f64.
        if let (FieldType::Number, Value::Number(number)) = (field_type, raw) {
            return parse_decimal(&number.to_string()).map(Self::Number);
        }
        let value: FieldValue = serde_json::from_value(raw.clone()).map_err(|_| {
            ValueError::Mismatch { expected: field_type, found: json_kind(raw).to_owned() }
        })?;
        Self::from_field_value(&value, field_type)
    }

    /// Types a product attribute. Numbers and booleans are accepted as text where
    /// catalogs commonly send them that way.
    pub fn from_field_value(value: &FieldValue, field_type: FieldType) -> Result<Self, ValueError> {
        let mismatch =
            || ValueError::Mismatch { expected: field_type, found: value.kind().to_owned() };

        match (field_type, value) {
            (FieldType::String, FieldValue::Text(text)) => Ok(Self::Text(text.clone())),
            (FieldType::String, FieldValue::Number(number)) => {
                Ok(Self::Text(number.normalize().to_string()))
            }
            (FieldType::String, FieldValue::Bool(flag)) => Ok(Self::Text(flag.to_string())),
            (FieldType::Number, FieldValue::Number(number)) => Ok(Self::Number(*number)),
            (FieldType::Number, FieldValue::Text(text)) => parse_decimal(text).map(Self::Number),
            (FieldType::Boolean, FieldValue::Bool(flag)) => Ok(Self::Bool(*flag)),
            (FieldType::Boolean, FieldValue::Text(text)) => {
                match text.trim().to_ascii_lowercase().as_str() {
                    "true" => Ok(Self::Bool(true)),
                    "false" => Ok(Self::Bool(false)),
                    _ => Err(mismatch()),
                }
            }
            (FieldType::Enum, FieldValue::Text(code)) => Ok(Self::Codes(vec![code.clone()])),
            (FieldType::Enum, FieldValue::Number(number)) => {
                Ok(Self::Codes(vec![number.normalize().to_string()]))
            }
            (FieldType::Enum, FieldValue::List(codes)) => Ok(Self::Codes(codes.clone())),
            (FieldType::Dimensions, FieldValue::Dimensions(dimensions))
                if !dimensions.is_empty() =>
            {
                Ok(Self::Dimensions(dimensions.clone()))
            }
            _ => Err(mismatch()),
        }
    }

    /// Type-aware equality. Text compares case-insensitively, enum codes compare
    /// case-sensitively as sets, numbers compare after rounding to `scale`.
    /// `None` when the operands are of different kinds.
    pub fn equals(&self, other: &Operand, scale: u32) -> Option<bool> {
        match (self, other) {
            (Self::Text(left), Self::Text(right)) => {
                Some(left.to_lowercase() == right.to_lowercase())
            }
            (Self::Number(left), Self::Number(right)) => {
                Some(numbers_equal(*left, *right, scale))
            }
            (Self::Bool(left), Self::Bool(right)) => Some(left == right),
            (Self::Codes(left), Self::Codes(right)) => Some(code_set(left) == code_set(right)),
            (Self::Dimensions(left), Self::Dimensions(right)) => {
                Some(left.axes().iter().zip(right.axes().iter()).all(|((_, l), (_, r))| {
                    match (l, r) {
                        (Some(l), Some(r)) => numbers_equal(*l, *r, scale),
                        (None, None) => true,
                        _ => false,
                    }
                }))
            }
            _ => None,
        }
    }

    /// Substring test for text, membership test for codes. Every code in `needle`
    /// must be present in `self`.
    pub fn contains(&self, needle: &Operand) -> Option<bool> {
        match (self, needle) {
            (Self::Text(haystack), Self::Text(needle)) => {
                Some(haystack.to_lowercase().contains(&needle.to_lowercase()))
            }
            (Self::Codes(haystack), Self::Codes(needle)) => {
                Some(needle.iter().all(|code| haystack.contains(code)))
            }
            _ => None,
        }
    }

    pub fn compare(&self, other: &Operand) -> Option<Ordering> {
        match (self, other) {
            (Self::Number(left), Self::Number(right)) => Some(left.cmp(right)),
            _ => None,
        }
    }
}

/// True when the two dimension sets agree on every axis both of them carry, and
/// they share at least one axis.
pub fn shares_dimensions(left: &Dimensions, right: &Dimensions, scale: u32) -> bool {
    let mut shared = 0;
    for ((_, l), (_, r)) in left.axes().iter().zip(right.axes().iter()) {
        if let (Some(l), Some(r)) = (l, r) {
            if !numbers_equal(*l, *r, scale) {
                return false;
            }
            shared += 1;
        }
    }
    shared > 0
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AxisBound {
    pub min: Option<Decimal>,
    pub max: Option<Decimal>,
}

impl AxisBound {
    pub fn at_most(max: Decimal) -> Self {
        Self { min: None, max: Some(max) }
    }

    pub fn admits(&self, value: Decimal) -> bool {
        self.min.map_or(true, |min| value >= min) && self.max.map_or(true, |max| value <= max)
    }
}

/// Operand of `matchesDimensions`. Each axis is either a plain number (inclusive
/// upper bound) or a `{min, max}` range; absent axes are unconstrained.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DimensionBounds {
    pub width: Option<AxisBound>,
    pub height: Option<AxisBound>,
    pub depth: Option<AxisBound>,
}

impl DimensionBounds {
    pub fn from_literal(raw: &Value) -> Result<Self, ValueError> {
        let object = raw.as_object().ok_or_else(|| ValueError::Mismatch {
            expected: FieldType::Dimensions,
            found: json_kind(raw).to_owned(),
        })?;

        let axis = |name: &'static str| -> Result<Option<AxisBound>, ValueError> {
            match object.get(name) {
                None | Some(Value::Null) => Ok(None),
                Some(Value::Object(range)) => {
                    let min = bound_part(range.get("min"), name)?;
                    let max = bound_part(range.get("max"), name)?;
                    if min.is_none() && max.is_none() {
                        return Err(ValueError::InvalidBound { axis: name });
                    }
                    Ok(Some(AxisBound { min, max }))
                }
                Some(other) => bound_part(Some(other), name).map(|max| max.map(AxisBound::at_most)),
            }
        };

        let bounds = Self { width: axis("width")?, height: axis("height")?, depth: axis("depth")? };
        if bounds.width.is_none() && bounds.height.is_none() && bounds.depth.is_none() {
            return Err(ValueError::EmptyBounds);
        }
        Ok(bounds)
    }

    /// Every constrained axis must be present on the product and within bounds.
    pub fn admits(&self, dimensions: &Dimensions) -> bool {
        [
            (self.width, dimensions.width),
            (self.height, dimensions.height),
            (self.depth, dimensions.depth),
        ]
        .into_iter()
        .all(|(bound, value)| match (bound, value) {
            (None, _) => true,
            (Some(bound), Some(value)) => bound.admits(value),
            (Some(_), None) => false,
        })
    }
}

fn bound_part(raw: Option<&Value>, axis: &'static str) -> Result<Option<Decimal>, ValueError> {
    match raw {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(number)) => parse_decimal(&number.to_string()).map(Some),
        Some(Value::String(text)) => parse_decimal(text).map(Some),
        Some(_) => Err(ValueError::InvalidBound { axis }),
    }
}

pub fn parse_decimal(text: &str) -> Result<Decimal, ValueError> {
    let trimmed = text.trim();
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|_| ValueError::InvalidNumber(trimmed.to_owned()))
}

pub fn numbers_equal(left: Decimal, right: Decimal, scale: u32) -> bool {
    left.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero)
        == right.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero)
}

fn code_set(codes: &[String]) -> BTreeSet<&str> {
    codes.iter().map(String::as_str).collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
