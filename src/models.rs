//! Core data models for the life insurance advisor

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::coverage::parse_monetary_amount;

//
// ================= Monetary Input =================
//

/// A monetary field as it arrives from a form: either a number or loosely
/// formatted text such as `"$12,345.67"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MonetaryValue {
    Number(f64),
    Text(String),
}

impl Default for MonetaryValue {
    fn default() -> Self {
        MonetaryValue::Number(0.0)
    }
}

impl From<f64> for MonetaryValue {
    fn from(value: f64) -> Self {
        MonetaryValue::Number(value)
    }
}

impl From<&str> for MonetaryValue {
    fn from(value: &str) -> Self {
        MonetaryValue::Text(value.to_string())
    }
}

impl From<String> for MonetaryValue {
    fn from(value: String) -> Self {
        MonetaryValue::Text(value)
    }
}

impl fmt::Display for MonetaryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonetaryValue::Number(n) => write!(f, "{}", n),
            MonetaryValue::Text(s) => write!(f, "{}", s),
        }
    }
}

//
// ================= Enums =================
//

/// Income replacement horizons offered by the form
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "u32", into = "u32")]
pub enum ReplacementYears {
    Five,
    Ten,
    Fifteen,
}

impl ReplacementYears {
    pub fn years(self) -> u32 {
        match self {
            ReplacementYears::Five => 5,
            ReplacementYears::Ten => 10,
            ReplacementYears::Fifteen => 15,
        }
    }
}

impl TryFrom<u32> for ReplacementYears {
    type Error = String;

    fn try_from(value: u32) -> std::result::Result<Self, Self::Error> {
        match value {
            5 => Ok(ReplacementYears::Five),
            10 => Ok(ReplacementYears::Ten),
            15 => Ok(ReplacementYears::Fifteen),
            other => Err(format!("{} is not one of 5, 10 or 15", other)),
        }
    }
}

impl From<ReplacementYears> for u32 {
    fn from(value: ReplacementYears) -> Self {
        value.years()
    }
}

impl fmt::Display for ReplacementYears {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} years", self.years())
    }
}

//
// ================= Profile =================
//

/// One form submission. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialProfile {
    pub annual_income: MonetaryValue,
    pub income_replacement_years: u32,
    pub total_debt: MonetaryValue,
    pub savings: MonetaryValue,
    pub existing_coverage: MonetaryValue,
    pub location: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
}

/// Wire shape of a profile as sent to the recommendation agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRequest {
    pub annual_income: f64,
    pub income_years: u32,
    pub debt: f64,
    pub savings: f64,
    pub existing_cover: f64,
    pub location: String,
    pub timestamp: String,
}

impl From<&FinancialProfile> for AgentRequest {
    fn from(profile: &FinancialProfile) -> Self {
        Self {
            annual_income: parse_monetary_amount(&profile.annual_income),
            income_years: profile.income_replacement_years,
            debt: parse_monetary_amount(&profile.total_debt),
            savings: parse_monetary_amount(&profile.savings),
            existing_cover: parse_monetary_amount(&profile.existing_coverage),
            location: profile.location.clone(),
            timestamp: profile
                .timestamp
                .to_rfc3339_opts(SecondsFormat::Micros, true),
        }
    }
}

//
// ================= Coverage =================
//

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoverageBreakdown {
    pub income_replacement_value: f64,
    pub annuity_factor: f64,
    pub recommended_coverage: f64,
}

//
// ================= Agent Recommendation =================
//

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSuggestion {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Validated final answer of the recommendation agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub coverage_amount: f64,
    pub breakdown: serde_json::Value,
    #[serde(default)]
    pub assumptions: Vec<String>,
    #[serde(default)]
    pub products: Vec<ProductSuggestion>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reconciliation {
    pub local_coverage: f64,
    pub agent_coverage: Option<f64>,
    pub divergence: Option<f64>,
    pub consistent: bool,
}

//
// ================= Tool I/O =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInput {
    pub tool_name: String,
    pub parameters: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    pub success: bool,
    pub data: serde_json::Value,
    pub error: Option<String>,
}

impl ToolOutput {
    pub fn ok(data: serde_json::Value) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: serde_json::Value::Null,
            error: Some(error.into()),
        }
    }
}

//
// ================= Final Report =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisorReport {
    pub report_id: Uuid,
    pub profile_fingerprint: String,
    pub age: Option<u32>,
    pub location: String,
    pub breakdown: CoverageBreakdown,
    pub recommendation: Option<Recommendation>,
    pub agent_error: Option<String>,
    pub reconciliation: Reconciliation,
    pub generated_at: DateTime<Utc>,
}

impl AdvisorReport {
    /// The figure shown to the user. The local calculation is authoritative.
    pub fn displayed_coverage(&self) -> f64 {
        self.breakdown.recommended_coverage
    }
}
