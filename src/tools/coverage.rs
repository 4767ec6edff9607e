//! Local coverage calculator exposed to the agent
//!
//! Lets the model quote the same figure the advisor computes instead of
//! re-deriving the annuity maths on its own.

use super::{ensure_object_parameters, Tool};
use crate::coverage::calculate_coverage_at;
use crate::error::AdvisorError;
use crate::models::{FinancialProfile, MonetaryValue, ReplacementYears, ToolInput, ToolOutput};
use crate::Result;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

pub struct CoverageTool {
    discount_rate: f64,
}

impl CoverageTool {
    pub fn new(discount_rate: f64) -> Self {
        Self { discount_rate }
    }
}

#[derive(Debug, Deserialize)]
struct CoverageArgs {
    #[serde(default)]
    annual_income: MonetaryValue,
    income_years: u32,
    #[serde(default)]
    debt: MonetaryValue,
    #[serde(default)]
    savings: MonetaryValue,
    #[serde(default)]
    existing_cover: MonetaryValue,
}

#[async_trait::async_trait]
impl Tool for CoverageTool {
    fn name(&self) -> &'static str {
        "calculate_coverage"
    }

    fn description(&self) -> &'static str {
        "Compute recommended life cover with the income-replacement annuity model \
         (annuity factor, present value of income, recommended coverage)"
    }

    fn parameters(&self) -> Value {
        let amount = json!({ "type": ["number", "string"] });
        json!({
            "type": "object",
            "properties": {
                "annual_income": amount,
                "income_years": { "type": "integer", "enum": [5, 10, 15] },
                "debt": amount,
                "savings": amount,
                "existing_cover": amount,
            },
            "required": ["annual_income", "income_years"],
        })
    }

    async fn execute(&self, input: &ToolInput) -> Result<ToolOutput> {
        ensure_object_parameters(input)?;

        let args: CoverageArgs = serde_json::from_value(input.parameters.clone())
            .map_err(|e| AdvisorError::InvalidToolInput(e.to_string()))?;
        let years = ReplacementYears::try_from(args.income_years)
            .map_err(AdvisorError::InvalidToolInput)?;

        let profile = FinancialProfile {
            annual_income: args.annual_income,
            income_replacement_years: years.years(),
            total_debt: args.debt,
            savings: args.savings,
            existing_coverage: args.existing_cover,
            location: String::new(),
            timestamp: Utc::now(),
            age: None,
        };

        let breakdown = calculate_coverage_at(&profile, self.discount_rate)?;

        Ok(ToolOutput::ok(json!({
            "discount_rate": self.discount_rate,
            "annuity_factor": breakdown.annuity_factor,
            "income_replacement_value": breakdown.income_replacement_value,
            "recommended_coverage": breakdown.recommended_coverage,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_matches_local_calculation() {
        let tool = CoverageTool::new(0.02);
        let output = tool
            .execute(&ToolInput {
                tool_name: "calculate_coverage".to_string(),
                parameters: json!({
                    "annual_income": "$100,000",
                    "income_years": 10,
                    "debt": 20000,
                }),
            })
            .await
            .unwrap();

        assert!(output.success);
        let recommended = output.data["recommended_coverage"].as_f64().unwrap();
        assert!((recommended - 918_258.5).abs() < 1.0);
        assert_eq!(output.data["discount_rate"], 0.02);
    }

    #[test]
    fn test_missing_years_is_invalid_input() {
        let tool = CoverageTool::new(0.02);
        let err = tokio_test::block_on(tool.execute(&ToolInput {
            tool_name: "calculate_coverage".to_string(),
            parameters: json!({ "annual_income": 50000 }),
        }))
        .unwrap_err();

        assert!(matches!(err, AdvisorError::InvalidToolInput(_)));
    }

    #[tokio::test]
    async fn test_out_of_range_years_rejected() {
        let tool = CoverageTool::new(0.02);
        assert_eq!(tool.parameters()["properties"]["income_years"]["enum"], json!([5, 10, 15]));

        for years in [0u64, 7, 3_000_000_000] {
            let err = tool
                .execute(&ToolInput {
                    tool_name: "calculate_coverage".to_string(),
                    parameters: json!({ "annual_income": 50000, "income_years": years }),
                })
                .await
                .unwrap_err();

            assert!(matches!(err, AdvisorError::InvalidToolInput(_)), "{years} accepted");
        }
    }
}
