//! Validation of the agent's final answer
//!
//! The model's text is never trusted to have the right shape: it either
//! becomes a `Recommendation` with every required field checked, or a
//! `ResponseError` saying what was wrong.

use crate::coverage::parse_monetary_amount;
use crate::error::ResponseError;
use crate::models::{CoverageBreakdown, MonetaryValue, ProductSuggestion, Recommendation, Reconciliation};
use serde_json::{Map, Value};

/// At most this many products are kept from an answer
pub const MAX_PRODUCTS: usize = 3;

/// Parse the agent's final text into a validated recommendation.
pub fn parse_recommendation(text: &str) -> Result<Recommendation, ResponseError> {
    let value = extract_json(text)?;
    let object = value.as_object().ok_or(ResponseError::NotAnObject)?;

    let coverage_amount = coverage_amount(object)?;

    let breakdown = object
        .get("breakdown")
        .filter(|v| !v.is_null())
        .cloned()
        .ok_or(ResponseError::MissingField("breakdown"))?;

    let assumptions = object
        .get("assumptions")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    let products = object
        .get("products")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(product).take(MAX_PRODUCTS).collect())
        .unwrap_or_default();

    Ok(Recommendation {
        coverage_amount,
        breakdown,
        assumptions,
        products,
    })
}

/// Compare the agent's figure with the local one.
///
/// Divergence is relative to the local figure, floored at 1 so a zero
/// local recommendation does not divide by zero.
pub fn reconcile(
    local: &CoverageBreakdown,
    recommendation: Option<&Recommendation>,
    tolerance: f64,
) -> Reconciliation {
    let local_coverage = local.recommended_coverage;

    match recommendation {
        Some(rec) => {
            let divergence = (rec.coverage_amount - local_coverage).abs() / local_coverage.max(1.0);
            Reconciliation {
                local_coverage,
                agent_coverage: Some(rec.coverage_amount),
                divergence: Some(divergence),
                consistent: divergence <= tolerance,
            }
        }
        None => Reconciliation {
            local_coverage,
            agent_coverage: None,
            divergence: None,
            consistent: true,
        },
    }
}

fn extract_json(text: &str) -> Result<Value, ResponseError> {
    let trimmed = text.trim();

    let first_error = match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => return Ok(value),
        Err(e) => e.to_string(),
    };

    // ```json fenced block
    if let Some(start) = trimmed.find("```json") {
        let after = &trimmed[start + 7..];
        if let Some(end) = after.find("```") {
            if let Ok(value) = serde_json::from_str::<Value>(after[..end].trim()) {
                return Ok(value);
            }
        }
    }

    // outermost { ... } span
    if let (Some(open), Some(close)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if open < close {
            if let Ok(value) = serde_json::from_str::<Value>(&trimmed[open..=close]) {
                return Ok(value);
            }
        }
    }

    Err(ResponseError::Malformed(first_error))
}

fn coverage_amount(object: &Map<String, Value>) -> Result<f64, ResponseError> {
    let raw = object
        .get("coverage_amount")
        .filter(|v| !v.is_null())
        .ok_or(ResponseError::MissingField("coverage_amount"))?;

    let amount = match raw {
        Value::Number(n) => n.as_f64().ok_or_else(|| invalid_amount("not representable"))?,
        Value::String(s) => {
            let parsed = parse_monetary_amount(&MonetaryValue::Text(s.clone()));
            // fail-soft parsing would hide garbage as 0.0 here
            if parsed == 0.0 && !looks_like_zero(s) {
                return Err(invalid_amount("not a number"));
            }
            parsed
        }
        _ => return Err(invalid_amount("expected a number")),
    };

    if !amount.is_finite() || amount < 0.0 {
        return Err(invalid_amount("must be a non-negative number"));
    }

    Ok(amount)
}

fn looks_like_zero(text: &str) -> bool {
    let digits: String = text.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect();
    !digits.is_empty() && digits.chars().all(|c| c == '0' || c == '.') && digits.contains('0')
}

fn invalid_amount(reason: &str) -> ResponseError {
    ResponseError::InvalidField {
        field: "coverage_amount",
        reason: reason.to_string(),
    }
}

fn product(value: &Value) -> Option<ProductSuggestion> {
    match value {
        Value::String(name) if !name.trim().is_empty() => Some(ProductSuggestion {
            name: name.trim().to_string(),
            provider: None,
            url: None,
            notes: None,
        }),
        Value::Object(fields) => {
            let text = |key: &str| {
                fields
                    .get(key)
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
            };
            Some(ProductSuggestion {
                name: text("name").or_else(|| text("product"))?,
                provider: text("provider").or_else(|| text("insurer")),
                url: text("url"),
                notes: text("notes").or_else(|| text("description")),
            })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn local(recommended: f64) -> CoverageBreakdown {
        CoverageBreakdown {
            income_replacement_value: recommended,
            annuity_factor: 8.98,
            recommended_coverage: recommended,
        }
    }

    #[test]
    fn test_parses_plain_json() {
        let text = r#"{
            "coverage_amount": 898258,
            "breakdown": {"annuity_factor": 8.98, "income_value": 898258},
            "assumptions": ["2% discount rate", 7],
            "products": [
                {"name": "Term 20", "provider": "Acme Life", "url": "https://acme.example"},
                "Level Term 15",
                {"provider": "no name"},
                {"name": "Fourth"},
                {"name": "Fifth"}
            ]
        }"#;

        let rec = parse_recommendation(text).unwrap();

        assert_eq!(rec.coverage_amount, 898258.0);
        assert_eq!(rec.breakdown["annuity_factor"], 8.98);
        assert_eq!(rec.assumptions, vec!["2% discount rate".to_string()]);
        assert_eq!(rec.products.len(), MAX_PRODUCTS);
        assert_eq!(rec.products[0].provider.as_deref(), Some("Acme Life"));
        assert_eq!(rec.products[1].name, "Level Term 15");
        assert_eq!(rec.products[2].name, "Fourth");
    }

    #[test]
    fn test_parses_fenced_and_wrapped_json() {
        let fenced = "Here you go:\n```json\n{\"coverage_amount\": 10, \"breakdown\": []}\n```";
        assert_eq!(parse_recommendation(fenced).unwrap().coverage_amount, 10.0);

        let wrapped = "Result: {\"coverage_amount\": \"$1,250,000\", \"breakdown\": \"see notes\"} thanks";
        assert_eq!(parse_recommendation(wrapped).unwrap().coverage_amount, 1_250_000.0);
    }

    #[test]
    fn test_error_variants() {
        assert!(matches!(
            parse_recommendation("sorry, I cannot help"),
            Err(ResponseError::Malformed(_))
        ));
        assert_eq!(
            parse_recommendation("[1, 2]"),
            Err(ResponseError::NotAnObject)
        );
        assert_eq!(
            parse_recommendation(r#"{"breakdown": {}}"#),
            Err(ResponseError::MissingField("coverage_amount"))
        );
        assert_eq!(
            parse_recommendation(r#"{"coverage_amount": 5}"#),
            Err(ResponseError::MissingField("breakdown"))
        );
        assert!(matches!(
            parse_recommendation(r#"{"coverage_amount": "lots", "breakdown": {}}"#),
            Err(ResponseError::InvalidField { field: "coverage_amount", .. })
        ));
        assert!(matches!(
            parse_recommendation(r#"{"coverage_amount": -5, "breakdown": {}}"#),
            Err(ResponseError::InvalidField { .. })
        ));
        assert!(matches!(
            parse_recommendation(r#"{"coverage_amount": true, "breakdown": {}}"#),
            Err(ResponseError::InvalidField { .. })
        ));
    }

    #[test]
    fn test_zero_text_amount_is_accepted() {
        let rec = parse_recommendation(r#"{"coverage_amount": "$0.00", "breakdown": {}}"#).unwrap();
        assert_eq!(rec.coverage_amount, 0.0);
    }

    #[test]
    fn test_reconcile_within_and_outside_tolerance() {
        let rec = |amount: f64| Recommendation {
            coverage_amount: amount,
            breakdown: json!({}),
            assumptions: vec![],
            products: vec![],
        };

        let close = reconcile(&local(900_000.0), Some(&rec(905_000.0)), 0.01);
        assert!(close.consistent);
        assert_eq!(close.agent_coverage, Some(905_000.0));

        let far = reconcile(&local(900_000.0), Some(&rec(1_200_000.0)), 0.01);
        assert!(!far.consistent);
        assert!((far.divergence.unwrap() - 1.0 / 3.0).abs() < 1e-9);

        let zero_local = reconcile(&local(0.0), Some(&rec(0.5)), 0.01);
        assert_eq!(zero_local.divergence, Some(0.5));

        let none = reconcile(&local(10.0), None, 0.01);
        assert!(none.consistent);
        assert!(none.divergence.is_none());
    }
}
