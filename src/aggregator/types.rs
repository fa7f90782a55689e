//! Aggregator wire types
//!
//! The aggregator is not strict about numbers (some sandboxes send amounts as
//! strings) and account snapshots may be partial, so the typed views below
//! never fail on a malformed field: it simply reads as absent.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Resources requested for a link when the institution declares none
pub const DEFAULT_FETCH_RESOURCES: [&str; 3] = ["ACCOUNTS", "TRANSACTIONS", "BALANCES"];

/// Credentials submitted with a link request (form field name -> value)
pub type Credentials = BTreeMap<String, String>;

// ============================================================================
// Lenient Deserializers
// ============================================================================

/// Number or numeric string; anything else reads as `None`
fn deserialize_lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum FlexibleFloat {
        Float(f64),
        Int(i64),
        Str(String),
        Other(Value),
    }

    Ok(match Option::<FlexibleFloat>::deserialize(deserializer)? {
        Some(FlexibleFloat::Float(f)) => Some(f),
        Some(FlexibleFloat::Int(i)) => Some(i as f64),
        Some(FlexibleFloat::Str(s)) => s.trim().parse().ok(),
        Some(FlexibleFloat::Other(_)) | None => None,
    })
}

/// Any value that does not fit `T` reads as `None`
fn deserialize_lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

// ============================================================================
// Envelopes
// ============================================================================

/// Items of a list response: `{"results": [...], ...}` or a bare list
pub fn page_results(payload: &Value) -> Vec<Value> {
    match payload {
        Value::Array(items) => items.clone(),
        Value::Object(map) => match map.get("results") {
            Some(Value::Array(items)) => items.clone(),
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

// ============================================================================
// Links
// ============================================================================

/// Link creation request body
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LinkRequest {
    pub institution: String,
    pub fetch_resources: Vec<String>,
    #[serde(flatten)]
    pub credentials: Credentials,
}

// ============================================================================
// Accounts & Transactions
// ============================================================================

/// Account classification driving the KPI rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountCategory {
    PensionFund,
    CreditCard,
    Loan,
    /// Checking, savings and anything unrecognised
    Other,
}

impl AccountCategory {
    /// Classify an aggregator category label (`PENSION_FUND_ACCOUNT`,
    /// `pension fund account`, ...)
    pub fn from_label(label: Option<&str>) -> Self {
        let normalized = label
            .unwrap_or_default()
            .trim()
            .to_ascii_uppercase()
            .replace([' ', '-'], "_");

        match normalized.as_str() {
            "PENSION_FUND_ACCOUNT" | "PENSION_FUND" => AccountCategory::PensionFund,
            "CREDIT_CARD" | "CREDIT_CARD_ACCOUNT" => AccountCategory::CreditCard,
            "LOAN_ACCOUNT" | "LOAN" => AccountCategory::Loan,
            _ => AccountCategory::Other,
        }
    }
}

/// Account balance block
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountBalance {
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub current: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub available: Option<f64>,
}

/// One constituent fund of a pension account
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FundData {
    #[serde(default, deserialize_with = "deserialize_lenient")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub balance: Option<f64>,
}

/// Account resource, or the snapshot embedded in each transaction
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountSnapshot {
    #[serde(default, deserialize_with = "deserialize_lenient")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient")]
    pub currency: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient")]
    pub balance: Option<AccountBalance>,
    #[serde(default, deserialize_with = "deserialize_lenient")]
    pub funds_data: Option<Vec<FundData>>,
}

impl AccountSnapshot {
    /// Lenient view over a raw account object
    pub fn from_value(value: &Value) -> Self {
        serde_json::from_value(value.clone()).unwrap_or_default()
    }

    pub fn account_category(&self) -> AccountCategory {
        AccountCategory::from_label(self.category.as_deref())
    }

    pub fn current_balance(&self) -> Option<f64> {
        self.balance.as_ref().and_then(|b| b.current)
    }

    /// Sum of the constituent fund balances (0 when none are reported)
    pub fn funds_total(&self) -> f64 {
        self.funds_data
            .iter()
            .flatten()
            .filter_map(|fund| fund.balance)
            .sum()
    }
}

/// Transaction direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FlowDirection {
    Inflow,
    Outflow,
    #[serde(other)]
    Unknown,
}

/// Transaction settlement status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SettlementStatus {
    Processed,
    Pending,
    #[serde(other)]
    Other,
}

/// Typed view over a transaction
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Transaction {
    #[serde(default, deserialize_with = "deserialize_lenient")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub amount: Option<f64>,
    #[serde(default, rename = "type", deserialize_with = "deserialize_lenient")]
    pub direction: Option<FlowDirection>,
    #[serde(default, deserialize_with = "deserialize_lenient")]
    pub status: Option<SettlementStatus>,
    #[serde(default, deserialize_with = "deserialize_lenient")]
    pub account: Option<AccountSnapshot>,
}

impl Transaction {
    /// Lenient view over a raw transaction object
    pub fn from_value(value: &Value) -> Self {
        serde_json::from_value(value.clone()).unwrap_or_default()
    }

    pub fn is(&self, direction: FlowDirection, status: SettlementStatus) -> bool {
        self.direction == Some(direction) && self.status == Some(status)
    }

    pub fn amount(&self) -> f64 {
        self.amount.unwrap_or(0.0)
    }
}
