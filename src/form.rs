//! Profile form - the input surface
//!
//! Mirrors the fields a user fills in. Validation happens here so the
//! calculator only ever sees enumerated replacement horizons and
//! non-negative amounts.

use crate::coverage::parse_monetary_amount;
use crate::error::AdvisorError;
use crate::models::{FinancialProfile, MonetaryValue, ReplacementYears};
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

pub const AGE_RANGE: RangeInclusive<u32> = 18..=80;
pub const DEFAULT_AGE: u32 = 30;
pub const DEFAULT_COUNTRY: &str = "United States";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileForm {
    pub age: u32,
    pub annual_income: MonetaryValue,
    #[serde(alias = "debt")]
    pub total_debt: MonetaryValue,
    pub savings: MonetaryValue,
    #[serde(alias = "existing_cover")]
    pub existing_coverage: MonetaryValue,
    #[serde(alias = "income_years")]
    pub income_replacement_years: u32,
    #[serde(alias = "location")]
    pub country: String,
}

impl Default for ProfileForm {
    fn default() -> Self {
        Self {
            age: DEFAULT_AGE,
            annual_income: MonetaryValue::default(),
            total_debt: MonetaryValue::default(),
            savings: MonetaryValue::default(),
            existing_coverage: MonetaryValue::default(),
            income_replacement_years: ReplacementYears::Five.years(),
            country: DEFAULT_COUNTRY.to_string(),
        }
    }
}

impl ProfileForm {
    /// Validate and stamp with the current time.
    pub fn validate(self) -> Result<FinancialProfile> {
        self.validate_at(Utc::now())
    }

    pub fn validate_at(self, timestamp: DateTime<Utc>) -> Result<FinancialProfile> {
        if !AGE_RANGE.contains(&self.age) {
            return Err(AdvisorError::invalid_form(
                "age",
                format!(
                    "{} is outside {}..={}",
                    self.age,
                    AGE_RANGE.start(),
                    AGE_RANGE.end()
                ),
            ));
        }

        let years = ReplacementYears::try_from(self.income_replacement_years)
            .map_err(|reason| AdvisorError::invalid_form("income_replacement_years", reason))?;

        non_negative("annual_income", &self.annual_income)?;
        non_negative("total_debt", &self.total_debt)?;
        non_negative("savings", &self.savings)?;
        non_negative("existing_coverage", &self.existing_coverage)?;

        let location = self.country.trim();
        if location.is_empty() {
            return Err(AdvisorError::invalid_form("country", "must not be empty"));
        }

        Ok(FinancialProfile {
            annual_income: self.annual_income,
            income_replacement_years: years.years(),
            total_debt: self.total_debt,
            savings: self.savings,
            existing_coverage: self.existing_coverage,
            location: location.to_string(),
            timestamp,
            age: Some(self.age),
        })
    }
}

// Unparseable text is left to the fail-soft parser; only values that
// parse to something negative are rejected.
fn non_negative(field: &'static str, value: &MonetaryValue) -> Result<()> {
    let amount = parse_monetary_amount(value);
    if amount < 0.0 {
        return Err(AdvisorError::invalid_form(
            field,
            format!("{} must not be negative", value),
        ));
    }
    Ok(())
}
