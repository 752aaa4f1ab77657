//! Document data types.
//!
//! # Data Model Overview
//!
//! A document is one server entry as found in a `servers.json` file:
//!
//! ```json
//! {
//!   "username": "admin",
//!   "database": "omnisci",
//!   "password": "secret",
//!   "enableJupyter": true,
//!   "feature_flags": {
//!     "ui/enable_map_exports": true,
//!     "dev/sql_notebook_cards": "{\"omnisci\":[{\"text\":\"Flights\",\"dataSources\":[\"flights\"]}]}"
//!   },
//!   "customStyles": { "title": "Ops", "logoURL": "/logo.svg" },
//!   "mapboxCustomStyles": [
//!     { "label": "Dark", "value": "mapbox://styles/mapbox/dark-v10" }
//!   ]
//! }
//! ```
//!
//! # Design Principles
//!
//! - **No schema validation**: any well-formed JSON object loads. Missing,
//!   null and mistyped fields fall back to their defaults, and unknown
//!   fields are carried through untouched (`extra`).
//! - **Order preserving**: maps keep the order they were written in.
//!
//! Serialization writes a normalized document: the four scalar fields are
//! always present and come first, followed by the optional sections and then
//! unknown fields in their original relative order. Values dropped as
//! mistyped on load are not written back.
//! - **Owned values**: every type is plain owned data, so `Clone` is a deep
//!   copy that shares nothing with the original.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::ordered_map::OrderedMap;

// ============================================================================
// Document
// ============================================================================

/// Feature flag mapping, in document order.
pub type FeatureFlags = OrderedMap<FeatureFlagValue>;

/// A complete server configuration document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default, deserialize_with = "lenient")]
    pub username: String,

    #[serde(default, deserialize_with = "lenient")]
    pub database: String,

    /// Stored in clear text, exactly as it appears in the imported file.
    #[serde(default, deserialize_with = "lenient")]
    pub password: String,

    #[serde(rename = "enableJupyter", default, deserialize_with = "lenient")]
    pub enable_jupyter: bool,

    /// Named toggles. Absent on some documents, in which case single-flag
    /// edits are refused.
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub feature_flags: Option<FeatureFlags>,

    #[serde(
        rename = "customStyles",
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub custom_styles: Option<CustomStyles>,

    #[serde(
        rename = "mapboxCustomStyles",
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub mapbox_custom_styles: Option<Vec<MapboxCustomStyle>>,

    /// Fields this crate does not model.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ServerConfig {
    /// Look up a single feature flag.
    pub fn feature_flag(&self, key: &str) -> Option<&FeatureFlagValue> {
        self.feature_flags.as_ref().and_then(|flags| flags.get(key))
    }
}

/// Deserialize a field, substituting its default when the value is null or
/// has the wrong shape.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(T::default());
    }

    match serde_json::from_value(value) {
        Ok(parsed) => Ok(parsed),
        Err(e) => {
            log::warn!("Ignoring mistyped field: {}", e);
            Ok(T::default())
        }
    }
}

// ============================================================================
// Feature Flags
// ============================================================================

/// Value of a single feature flag.
///
/// Booleans, numbers, strings and string lists are the documented shapes.
/// Anything else is kept as raw JSON rather than rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureFlagValue {
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
    List(Vec<String>),
    Other(Value),
}

impl FeatureFlagValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FeatureFlagValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for FeatureFlagValue {
    fn from(v: bool) -> Self {
        FeatureFlagValue::Bool(v)
    }
}

impl From<i64> for FeatureFlagValue {
    fn from(v: i64) -> Self {
        FeatureFlagValue::Number(v.into())
    }
}

impl From<u64> for FeatureFlagValue {
    fn from(v: u64) -> Self {
        FeatureFlagValue::Number(v.into())
    }
}

impl From<f64> for FeatureFlagValue {
    fn from(v: f64) -> Self {
        // NaN and infinities have no JSON representation
        match serde_json::Number::from_f64(v) {
            Some(n) => FeatureFlagValue::Number(n),
            None => FeatureFlagValue::Other(Value::Null),
        }
    }
}

impl From<String> for FeatureFlagValue {
    fn from(v: String) -> Self {
        FeatureFlagValue::Text(v)
    }
}

impl From<&str> for FeatureFlagValue {
    fn from(v: &str) -> Self {
        FeatureFlagValue::Text(v.to_string())
    }
}

impl From<Vec<String>> for FeatureFlagValue {
    fn from(v: Vec<String>) -> Self {
        FeatureFlagValue::List(v)
    }
}

impl From<Value> for FeatureFlagValue {
    /// Map raw JSON onto the closest documented flag shape.
    fn from(v: Value) -> Self {
        match v {
            Value::Bool(b) => FeatureFlagValue::Bool(b),
            Value::Number(n) => FeatureFlagValue::Number(n),
            Value::String(s) => FeatureFlagValue::Text(s),
            Value::Array(items) if items.iter().all(Value::is_string) => FeatureFlagValue::List(
                items
                    .into_iter()
                    .filter_map(|item| match item {
                        Value::String(s) => Some(s),
                        _ => None,
                    })
                    .collect(),
            ),
            other => FeatureFlagValue::Other(other),
        }
    }
}

// ============================================================================
// Branding
// ============================================================================

/// Optional branding overrides.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CustomStyles {
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub title: Option<String>,

    #[serde(
        rename = "logoURL",
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub logo_url: Option<String>,

    #[serde(
        rename = "darkThemeLogoURL",
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub dark_theme_logo_url: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ============================================================================
// Map Styles
// ============================================================================

/// A named map style offered in the basemap picker.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MapboxCustomStyle {
    #[serde(default, deserialize_with = "lenient")]
    pub label: String,

    /// `None` when the entry has no value (or a null one).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<MapboxStyleValue>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Either an inline style definition or an opaque style reference
/// (usually a `mapbox://` URL).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MapboxStyleValue {
    Url(String),
    Style(MapboxStyle),
    /// Anything that is neither a string nor a well-formed style object.
    Other(Value),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MapboxStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<OrderedMap<MapSource>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layers: Option<Vec<MapLayer>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapSource {
    #[serde(rename = "type")]
    pub source_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tiles: Option<Vec<String>>,

    #[serde(rename = "tileSize", default, skip_serializing_if = "Option::is_none")]
    pub tile_size: Option<u32>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapLayer {
    pub id: String,

    #[serde(rename = "type")]
    pub layer_type: String,

    /// Background layers have no source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minzoom: Option<serde_json::Number>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maxzoom: Option<serde_json::Number>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ============================================================================
// Notebook Cards
// ============================================================================

/// A short descriptor card shown in the SQL notebook sidebar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotebookCard {
    pub text: String,

    #[serde(rename = "dataSources", default)]
    pub data_sources: Vec<String>,
}

impl NotebookCard {
    pub fn new(text: impl Into<String>, data_sources: Vec<String>) -> Self {
        Self {
            text: text.into(),
            data_sources,
        }
    }
}

/// Cards per database name, in document order.
pub type NotebookCards = OrderedMap<Vec<NotebookCard>>;

// ============================================================================
// TESTS
// ============================================================================
