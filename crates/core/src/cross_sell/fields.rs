//! Field catalog: the registry of product attributes that rules may reference.
//!
//! Standard fields are fixed. Custom fields come from store configuration and are
//! resolved again for every run, so a catalog value is never reused across runs.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::rule::{ConditionOperator, MatchType};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Dimensions,
    Enum,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Dimensions => "dimensions",
            Self::Enum => "enum",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "string" | "text" => Some(Self::String),
            "number" | "int" | "float" => Some(Self::Number),
            "boolean" | "bool" => Some(Self::Boolean),
            "dimensions" => Some(Self::Dimensions),
            "enum" | "select" => Some(Self::Enum),
            _ => None,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldSource {
    Standard,
    Custom,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub field: String,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub source: FieldSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Custom field as configured by the store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomFieldDefinition {
    pub field: String,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

impl CustomFieldDefinition {
    pub fn new(field: impl Into<String>, label: impl Into<String>, field_type: FieldType) -> Self {
        Self { field: field.into(), label: label.into(), field_type }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandardFieldEntry {
    pub field: String,
    pub label: String,
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldListing {
    pub standard_fields: Vec<StandardFieldEntry>,
    pub custom_fields: Vec<CustomFieldDefinition>,
}

const STANDARD_FIELDS: &[(&str, &str, FieldType, &str)] = &[
    ("name", "Name", FieldType::String, "Product display name"),
    ("sku", "SKU", FieldType::String, "Stock keeping unit"),
    ("price", "Price", FieldType::Number, "Gross unit price"),
    ("stock", "Stock", FieldType::Number, "Units available in stock"),
    ("category", "Category", FieldType::String, "Primary category name"),
    ("manufacturer", "Manufacturer", FieldType::String, "Manufacturer name"),
    ("dimensions", "Dimensions", FieldType::Dimensions, "Width, height and depth"),
    ("weight", "Weight", FieldType::Number, "Shipping weight"),
    ("availability", "Availability", FieldType::Enum, "Availability status code"),
    ("tags", "Tags", FieldType::Enum, "Assigned tag codes"),
    ("active", "Active", FieldType::Boolean, "Whether the product is listed"),
];

/// Operator legality keyed by operator, listing the field types it applies to.
const OPERATOR_SUPPORT: &[(ConditionOperator, &[FieldType])] = &[
    (
        ConditionOperator::Equals,
        &[
            FieldType::String,
            FieldType::Number,
            FieldType::Boolean,
            FieldType::Enum,
            FieldType::Dimensions,
        ],
    ),
    (
        ConditionOperator::NotEquals,
        &[
            FieldType::String,
            FieldType::Number,
            FieldType::Boolean,
            FieldType::Enum,
            FieldType::Dimensions,
        ],
    ),
    (ConditionOperator::Contains, &[FieldType::String, FieldType::Enum]),
    (ConditionOperator::NotContains, &[FieldType::String, FieldType::Enum]),
    (ConditionOperator::GreaterThan, &[FieldType::Number]),
    (ConditionOperator::LessThan, &[FieldType::Number]),
    (ConditionOperator::GreaterThanOrEqual, &[FieldType::Number]),
    (ConditionOperator::LessThanOrEqual, &[FieldType::Number]),
    (ConditionOperator::MatchesDimensions, &[FieldType::Dimensions]),
];

const MATCH_TYPE_SUPPORT: &[(MatchType, &[FieldType])] = &[
    (
        MatchType::Exact,
        &[
            FieldType::String,
            FieldType::Number,
            FieldType::Boolean,
            FieldType::Enum,
            FieldType::Dimensions,
        ],
    ),
    (MatchType::Contains, &[FieldType::String, FieldType::Enum]),
    (MatchType::SameDimensions, &[FieldType::Dimensions]),
    (
        MatchType::SameProperty,
        &[
            FieldType::String,
            FieldType::Number,
            FieldType::Boolean,
            FieldType::Enum,
            FieldType::Dimensions,
        ],
    ),
];

pub fn operator_supports(operator: ConditionOperator, field_type: FieldType) -> bool {
    OPERATOR_SUPPORT
        .iter()
        .find(|(candidate, _)| *candidate == operator)
        .is_some_and(|(_, types)| types.contains(&field_type))
}

pub fn match_type_supports(match_type: MatchType, field_type: FieldType) -> bool {
    MATCH_TYPE_SUPPORT
        .iter()
        .find(|(candidate, _)| *candidate == match_type)
        .is_some_and(|(_, types)| types.contains(&field_type))
}

#[derive(Clone, Debug)]
pub struct FieldCatalog {
    fields: Vec<FieldDescriptor>,
    index: HashMap<String, usize>,
}

impl Default for FieldCatalog {
    fn default() -> Self {
        Self::resolve(Vec::new())
    }
}

impl FieldCatalog {
    /// Builds the registry from the fixed standard fields plus the store's custom
    /// fields. Standard keys win over colliding custom keys; among custom fields the
    /// first definition of a key wins.
    pub fn resolve(custom_fields: Vec<CustomFieldDefinition>) -> Self {
        let mut catalog = Self { fields: Vec::new(), index: HashMap::new() };

        for (field, label, field_type, description) in STANDARD_FIELDS {
            catalog.insert(FieldDescriptor {
                field: (*field).to_owned(),
                label: (*label).to_owned(),
                field_type: *field_type,
                source: FieldSource::Standard,
                description: Some((*description).to_owned()),
            });
        }

        for definition in custom_fields {
            let key = definition.field.trim().to_owned();
            if key.is_empty() {
                warn!(
                    event_name = "cross_sell.fields.blank_custom_field",
                    label = %definition.label,
                    "ignoring custom field with blank key"
                );
                continue;
            }
            if let Some(existing) = catalog.resolve_field(&key) {
                warn!(
                    event_name = "cross_sell.fields.duplicate_custom_field",
                    field = %key,
                    existing_source = ?existing.source,
                    "ignoring custom field that shadows an existing field"
                );
                continue;
            }
            catalog.insert(FieldDescriptor {
                field: key,
                label: definition.label,
                field_type: definition.field_type,
                source: FieldSource::Custom,
                description: None,
            });
        }

        catalog
    }

    fn insert(&mut self, descriptor: FieldDescriptor) {
        self.index.insert(descriptor.field.clone(), self.fields.len());
        self.fields.push(descriptor);
    }

    pub fn resolve_field(&self, key: &str) -> Option<&FieldDescriptor> {
        self.index.get(key).map(|position| &self.fields[*position])
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn list_fields(&self) -> FieldListing {
        let mut listing =
            FieldListing { standard_fields: Vec::new(), custom_fields: Vec::new() };

        for descriptor in &self.fields {
            match descriptor.source {
                FieldSource::Standard => listing.standard_fields.push(StandardFieldEntry {
                    field: descriptor.field.clone(),
                    label: descriptor.label.clone(),
                    description: descriptor.description.clone().unwrap_or_default(),
                }),
                FieldSource::Custom => listing.custom_fields.push(CustomFieldDefinition {
                    field: descriptor.field.clone(),
                    label: descriptor.label.clone(),
                    field_type: descriptor.field_type,
                }),
            }
        }

        listing
    }
}
