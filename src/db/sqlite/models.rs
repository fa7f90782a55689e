//! SQLite database models

use crate::aggregator::types::DEFAULT_FETCH_RESOURCES;
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// User model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub created_at: String,
}

// ============================================================================
// Institutions
// ============================================================================

/// Institution as stored locally
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct InstitutionRecord {
    pub id: String,
    pub name: String,
    pub code: Option<String>,
    pub display_name: Option<String>,
    pub institution_type: Option<String>,
    pub country_code: Option<String>,
    pub country_codes: Option<Value>,
    pub website: Option<String>,
    pub primary_color: Option<String>,
    pub logo: Option<String>,
    pub icon_logo: Option<String>,
    pub text_logo: Option<String>,
    pub form_fields: Option<Value>,
    pub features: Option<Value>,
    pub integration_type: Option<String>,
    pub status: Option<String>,
    pub resources: Option<Value>,
    pub openbanking_information: Option<Value>,
}

fn str_field(item: &Value, key: &str) -> Option<String> {
    match item.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn json_field(item: &Value, key: &str) -> Option<Value> {
    item.get(key).filter(|v| !v.is_null()).cloned()
}

impl InstitutionRecord {
    /// Map an aggregator institution object field by field.
    ///
    /// Returns `None` when the object lacks `id` or `name`.
    pub fn from_api(item: &Value) -> Option<Self> {
        Some(Self {
            id: str_field(item, "id")?,
            name: str_field(item, "name")?,
            code: str_field(item, "code"),
            display_name: str_field(item, "display_name"),
            institution_type: str_field(item, "type"),
            country_code: str_field(item, "country_code"),
            country_codes: json_field(item, "country_codes"),
            website: str_field(item, "website"),
            primary_color: str_field(item, "primary_color"),
            logo: str_field(item, "logo"),
            icon_logo: str_field(item, "icon_logo"),
            text_logo: str_field(item, "text_logo"),
            form_fields: json_field(item, "form_fields"),
            features: json_field(item, "features"),
            integration_type: str_field(item, "integration_type"),
            status: str_field(item, "status"),
            resources: json_field(item, "resources"),
            openbanking_information: json_field(item, "openbanking_information"),
        })
    }

    /// Declared form fields, validated
    pub fn form_fields(&self) -> Result<Vec<FormField>> {
        match &self.form_fields {
            None => Ok(Vec::new()),
            Some(Value::Array(items)) => items.iter().map(FormField::from_api).collect(),
            Some(_) => Err(AppError::Validation(format!(
                "Institution '{}' has a malformed form_fields schema",
                self.name
            ))),
        }
    }

    /// Resources to request for a new link
    pub fn fetch_resources(&self) -> Vec<String> {
        let declared: Vec<String> = self
            .resources
            .as_ref()
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        if declared.is_empty() {
            DEFAULT_FETCH_RESOURCES.iter().map(|r| r.to_string()).collect()
        } else {
            declared
        }
    }
}

/// One selectable value of a `select` form field
#[derive(Debug, Clone, PartialEq)]
pub struct FormFieldValue {
    pub code: String,
    pub label: Option<String>,
}

/// Credential form field declared by an institution
#[derive(Debug, Clone, PartialEq)]
pub struct FormField {
    pub name: String,
    pub field_type: String,
    pub validation: Option<String>,
    pub values: Vec<FormFieldValue>,
    pub selected_index: Option<usize>,
}

impl FormField {
    pub fn from_api(item: &Value) -> Result<Self> {
        let name = item
            .get("name")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::Validation("Form field is missing a name".to_string()))?;

        let field_type = item
            .get("type")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                AppError::Validation(format!("Form field '{}' is missing a type", name))
            })?;

        let values = item
            .get("values")
            .and_then(Value::as_array)
            .map(|values| {
                values
                    .iter()
                    .filter_map(|v| {
                        Some(FormFieldValue {
                            code: str_field(v, "code")?,
                            label: str_field(v, "label"),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        let selected_index = item
            .get("selected_index")
            .or_else(|| item.get("default"))
            .and_then(Value::as_u64)
            .map(|i| i as usize);

        Ok(Self {
            name: name.to_string(),
            field_type: field_type.to_string(),
            validation: str_field(item, "validation").filter(|p| !p.is_empty()),
            values,
            selected_index,
        })
    }

    pub fn is_select(&self) -> bool {
        self.field_type.eq_ignore_ascii_case("select")
    }
}

// ============================================================================
// Links
// ============================================================================

/// Link status as reported by the aggregator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkStatus {
    Valid,
    Invalid,
    Unconfirmed,
    TokenRequired,
    Other(String),
}

impl LinkStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "valid" => LinkStatus::Valid,
            "invalid" => LinkStatus::Invalid,
            "unconfirmed" => LinkStatus::Unconfirmed,
            "token_required" => LinkStatus::TokenRequired,
            other => LinkStatus::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            LinkStatus::Valid => "valid",
            LinkStatus::Invalid => "invalid",
            LinkStatus::Unconfirmed => "unconfirmed",
            LinkStatus::TokenRequired => "token_required",
            LinkStatus::Other(s) => s,
        }
    }
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for LinkStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Link as stored locally and returned by the registrar
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LinkInfo {
    pub id: String,
    pub institution: String,
    pub status: LinkStatus,
    pub fetch_resources: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_mode: Option<String>,
    pub created_at: String,
}

impl LinkInfo {
    /// Map the aggregator's link-creation answer field by field.
    ///
    /// The link is keyed by the local institution name.
    pub fn from_api(item: &Value, institution: &str) -> Result<Self> {
        let id = str_field(item, "id")
            .ok_or_else(|| AppError::Internal("Link response has no id".to_string()))?;

        let status = str_field(item, "status")
            .map(|s| LinkStatus::parse(&s))
            .unwrap_or_else(|| LinkStatus::Other("unknown".to_string()));

        let fetch_resources = item
            .get("fetch_resources")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            id,
            institution: institution.to_string(),
            status,
            fetch_resources,
            access_mode: str_field(item, "access_mode"),
            created_at: str_field(item, "created_at")
                .unwrap_or_else(|| chrono::Utc::now().to_rfc3339()),
        })
    }

    pub fn is_valid(&self) -> bool {
        self.status == LinkStatus::Valid
    }
}
