use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProductId(pub String);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Physical dimensions of a product. All axes share one unit.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    #[serde(default, with = "rust_decimal::serde::float_option", skip_serializing_if = "Option::is_none")]
    pub width: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::float_option", skip_serializing_if = "Option::is_none")]
    pub height: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::float_option", skip_serializing_if = "Option::is_none")]
    pub depth: Option<Decimal>,
}

impl Dimensions {
    pub fn new(width: Decimal, height: Decimal, depth: Decimal) -> Self {
        Self { width: Some(width), height: Some(height), depth: Some(depth) }
    }

    pub fn is_empty(&self) -> bool {
        self.width.is_none() && self.height.is_none() && self.depth.is_none()
    }

    pub fn axes(&self) -> [(&'static str, Option<Decimal>); 3] {
        [("width", self.width), ("height", self.height), ("depth", self.depth)]
    }
}

/// Attribute value as delivered by the catalog.
///
/// Variant order matters for untagged decoding: strings stay text even when they
/// look numeric, so a `sku` of `"0042"` is never reinterpreted. Numbers are written
/// back as JSON numbers so a stored attribute map decodes to the same variants.
/// Shapes no field type understands are kept as `Other` and never match.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Text(String),
    Number(#[serde(with = "rust_decimal::serde::float")] Decimal),
    List(Vec<String>),
    Dimensions(Dimensions),
    Other(serde_json::Value),
}

impl FieldValue {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "boolean",
            Self::Text(_) => "text",
            Self::Number(_) => "number",
            Self::List(_) => "list",
            Self::Dimensions(_) => "dimensions",
            Self::Other(_) => "unrecognised value",
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<Decimal> for FieldValue {
    fn from(value: Decimal) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Dimensions> for FieldValue {
    fn from(value: Dimensions) -> Self {
        Self::Dimensions(value)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default, deserialize_with = "non_null_attributes")]
    pub attributes: BTreeMap<String, FieldValue>,
}

fn default_active() -> bool {
    true
}

/// `null` attributes are treated as absent.
fn non_null_attributes<'de, D>(deserializer: D) -> Result<BTreeMap<String, FieldValue>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, Option<FieldValue>>::deserialize(deserializer)?;
    Ok(raw.into_iter().filter_map(|(field, value)| Some((field, value?))).collect())
}

impl Product {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: ProductId(id.into()),
            name: name.into(),
            active: true,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.attributes.insert(field.into(), value.into());
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// Looks up a field by catalog key. `name` and `active` are record columns, every
    /// other key is read from the attribute map.
    pub fn field_value(&self, field: &str) -> Option<Cow<'_, FieldValue>> {
        match field {
            "name" => Some(Cow::Owned(FieldValue::Text(self.name.clone()))),
            "active" => Some(Cow::Owned(FieldValue::Bool(self.active))),
            other => self.attributes.get(other).map(Cow::Borrowed),
        }
    }

    /// Label used in error reports; falls back to the id when the name is blank.
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.id.0
        } else {
            &self.name
        }
    }
}
