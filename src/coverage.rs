//! Income-replacement coverage calculator
//!
//! Pure, synchronous and stateless. The same profile always yields the
//! same breakdown.

use crate::error::AdvisorError;
use crate::models::{CoverageBreakdown, FinancialProfile, MonetaryValue};
use crate::Result;

/// Annual discount rate applied when the caller does not choose one
pub const DEFAULT_DISCOUNT_RATE: f64 = 0.02;

/// Parse a loosely formatted monetary amount.
///
/// `,` and `$` are stripped and surrounding whitespace trimmed before
/// parsing. Anything that still fails to parse, and any non-finite
/// result, yields `0.0` so that one bad field never blocks a calculation.
pub fn parse_monetary_amount(value: &MonetaryValue) -> f64 {
    let parsed = match value {
        MonetaryValue::Number(n) => *n,
        MonetaryValue::Text(text) => {
            let cleaned: String = text.chars().filter(|c| *c != ',' && *c != '$').collect();
            cleaned.trim().parse::<f64>().unwrap_or(0.0)
        }
    };

    if parsed.is_finite() {
        parsed
    } else {
        0.0
    }
}

/// Present value of an ordinary annuity paying 1 per year for `years` years.
pub fn annuity_factor(years: u32, discount_rate: f64) -> f64 {
    if years == 0 {
        return 0.0;
    }
    if discount_rate == 0.0 {
        // limit of the formula as the rate goes to zero
        return f64::from(years);
    }

    // 1 - (1 + r)^-n, kept accurate for tiny rates and any u32 year count
    let discounted_gap = -(-f64::from(years) * discount_rate.ln_1p()).exp_m1();
    discounted_gap / discount_rate
}

/// Coverage at the default 2% discount rate.
pub fn calculate_coverage(profile: &FinancialProfile) -> CoverageBreakdown {
    breakdown_for(profile, DEFAULT_DISCOUNT_RATE)
}

/// Coverage at a caller-chosen discount rate.
///
/// Rejects negative and non-finite rates. A rate of exactly zero is
/// valid and values the income stream undiscounted.
pub fn calculate_coverage_at(
    profile: &FinancialProfile,
    discount_rate: f64,
) -> Result<CoverageBreakdown> {
    if !discount_rate.is_finite() || discount_rate < 0.0 {
        return Err(AdvisorError::InvalidDiscountRate(discount_rate));
    }

    Ok(breakdown_for(profile, discount_rate))
}

fn breakdown_for(profile: &FinancialProfile, discount_rate: f64) -> CoverageBreakdown {
    let income = parse_monetary_amount(&profile.annual_income);
    let debt = parse_monetary_amount(&profile.total_debt);
    let savings = parse_monetary_amount(&profile.savings);
    let existing = parse_monetary_amount(&profile.existing_coverage);

    let annuity = annuity_factor(profile.income_replacement_years, discount_rate);
    let income_value = income * annuity;

    let recommended = (income_value + debt - savings - existing).max(0.0);

    CoverageBreakdown {
        income_replacement_value: income_value,
        annuity_factor: annuity,
        recommended_coverage: recommended,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::{prop_assert, prop_assert_eq, proptest};

    fn profile(income: f64, years: u32, debt: f64, savings: f64, existing: f64) -> FinancialProfile {
        FinancialProfile {
            annual_income: income.into(),
            income_replacement_years: years,
            total_debt: debt.into(),
            savings: savings.into(),
            existing_coverage: existing.into(),
            location: "United States".to_string(),
            timestamp: Utc::now(),
            age: Some(30),
        }
    }

    fn assert_approx(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual}, tolerance {tol}"
        );
    }

    #[test]
    fn test_parse_formatted_amounts() {
        assert_eq!(parse_monetary_amount(&"$12,345.67".into()), 12345.67);
        assert_eq!(parse_monetary_amount(&"  1,000 ".into()), 1000.0);
        assert_eq!(parse_monetary_amount(&"-250".into()), -250.0);
        assert_eq!(parse_monetary_amount(&42.5.into()), 42.5);
    }

    #[test]
    fn test_parse_falls_back_to_zero() {
        assert_eq!(parse_monetary_amount(&"not a number".into()), 0.0);
        assert_eq!(parse_monetary_amount(&"".into()), 0.0);
        assert_eq!(parse_monetary_amount(&"$".into()), 0.0);
        assert_eq!(parse_monetary_amount(&"NaN".into()), 0.0);
        assert_eq!(parse_monetary_amount(&"inf".into()), 0.0);
        assert_eq!(parse_monetary_amount(&f64::INFINITY.into()), 0.0);
    }

    #[test]
    fn test_reference_ten_year_profile() {
        let result = calculate_coverage(&profile(100_000.0, 10, 0.0, 0.0, 0.0));

        assert_approx(result.annuity_factor, 8.9826, 1e-4);
        assert_approx(result.income_replacement_value, 898_258.5, 1.0);
        assert_approx(result.recommended_coverage, result.income_replacement_value, 1e-2);
    }

    #[test]
    fn test_zero_years_means_no_income_value() {
        let result = calculate_coverage(&profile(250_000.0, 0, 0.0, 0.0, 0.0));

        assert_eq!(result.annuity_factor, 0.0);
        assert_eq!(result.income_replacement_value, 0.0);
        assert_eq!(result.recommended_coverage, 0.0);
    }

    #[test]
    fn test_zero_rate_uses_plain_years() {
        let result = calculate_coverage_at(&profile(50_000.0, 15, 0.0, 0.0, 0.0), 0.0).unwrap();

        assert_eq!(result.annuity_factor, 15.0);
        assert_eq!(result.income_replacement_value, 750_000.0);
    }

    #[test]
    fn test_annuity_factor_extreme_inputs() {
        let at_i32_boundary = annuity_factor(2_147_483_648, 0.02);
        assert_approx(at_i32_boundary, 50.0, 1e-9);
        assert_approx(annuity_factor(u32::MAX, 0.02), 50.0, 1e-9);

        assert_approx(annuity_factor(10, 1e-17), 10.0, 1e-9);
        assert_approx(annuity_factor(10, 1e-12), 10.0, 1e-6);
    }

    #[test]
    fn test_rejects_invalid_rates() {
        let p = profile(50_000.0, 5, 0.0, 0.0, 0.0);

        assert!(matches!(
            calculate_coverage_at(&p, -0.01),
            Err(AdvisorError::InvalidDiscountRate(_))
        ));
        assert!(calculate_coverage_at(&p, f64::NAN).is_err());
        assert!(calculate_coverage_at(&p, f64::INFINITY).is_err());
    }

    #[test]
    fn test_debt_and_offsets() {
        let result = calculate_coverage(&profile(60_000.0, 5, 40_000.0, 10_000.0, 100_000.0));
        let expected = 60_000.0 * annuity_factor(5, DEFAULT_DISCOUNT_RATE) + 40_000.0
            - 10_000.0
            - 100_000.0;

        assert_approx(result.recommended_coverage, expected, 1e-6);
    }

    #[test]
    fn test_floor_at_zero() {
        let result = calculate_coverage(&profile(10_000.0, 5, 0.0, 500_000.0, 0.0));
        assert_eq!(result.recommended_coverage, 0.0);
    }

    #[test]
    fn test_text_fields_are_parsed() {
        let mut p = profile(0.0, 10, 0.0, 0.0, 0.0);
        p.annual_income = "$100,000".into();
        p.total_debt = "garbage".into();

        let from_text = calculate_coverage(&p);
        let from_numbers = calculate_coverage(&profile(100_000.0, 10, 0.0, 0.0, 0.0));

        assert_eq!(from_text, from_numbers);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_recommended_coverage_is_non_negative(
            income in 0u32..2_000_000,
            years in 0u32..40,
            debt in 0u32..5_000_000,
            savings in 0u32..5_000_000,
            existing in 0u32..5_000_000,
            rate_bp in 0u32..1500
        ) {
            let p = profile(income as f64, years, debt as f64, savings as f64, existing as f64);
            let result = calculate_coverage_at(&p, rate_bp as f64 / 10_000.0).unwrap();

            prop_assert!(result.recommended_coverage >= 0.0);
            prop_assert!(result.recommended_coverage.is_finite());
        }

        #[test]
        fn prop_annuity_factor_bounded_by_years_and_perpetuity(
            years in 1u32..=u32::MAX,
            rate_bp in 1u32..1500
        ) {
            let rate = rate_bp as f64 / 10_000.0;
            let factor = annuity_factor(years, rate);

            prop_assert!(factor.is_finite());
            prop_assert!(factor > 0.0);
            prop_assert!(factor <= f64::from(years) + 1e-9);
            prop_assert!(factor <= 1.0 / rate + 1e-9);
        }

        #[test]
        fn prop_calculation_is_idempotent(
            income in 0u32..2_000_000,
            years in 0u32..40,
            debt in 0u32..5_000_000
        ) {
            let p = profile(income as f64, years, debt as f64, 0.0, 0.0);
            let first = calculate_coverage(&p);
            let second = calculate_coverage(&p);

            prop_assert_eq!(first.recommended_coverage.to_bits(), second.recommended_coverage.to_bits());
            prop_assert_eq!(first.annuity_factor.to_bits(), second.annuity_factor.to_bits());
            prop_assert_eq!(
                first.income_replacement_value.to_bits(),
                second.income_replacement_value.to_bits()
            );
        }

        #[test]
        fn prop_more_debt_never_lowers_coverage(
            income in 0u32..2_000_000,
            years in 0u32..40,
            debt in 0u32..5_000_000,
            extra in 0u32..1_000_000,
            savings in 0u32..5_000_000
        ) {
            let base = calculate_coverage(&profile(income as f64, years, debt as f64, savings as f64, 0.0));
            let more = calculate_coverage(&profile(income as f64, years, (debt + extra) as f64, savings as f64, 0.0));

            prop_assert!(more.recommended_coverage >= base.recommended_coverage);
        }

        #[test]
        fn prop_more_savings_or_cover_never_raises_coverage(
            income in 0u32..2_000_000,
            years in 0u32..40,
            debt in 0u32..5_000_000,
            savings in 0u32..5_000_000,
            existing in 0u32..5_000_000,
            extra in 0u32..1_000_000
        ) {
            let base = calculate_coverage(&profile(income as f64, years, debt as f64, savings as f64, existing as f64));
            let more_savings = calculate_coverage(&profile(income as f64, years, debt as f64, (savings + extra) as f64, existing as f64));
            let more_cover = calculate_coverage(&profile(income as f64, years, debt as f64, savings as f64, (existing + extra) as f64));

            prop_assert!(more_savings.recommended_coverage <= base.recommended_coverage);
            prop_assert!(more_cover.recommended_coverage <= base.recommended_coverage);
        }

        #[test]
        fn prop_shortfall_clamps_to_exact_zero(
            income in 0u32..100_000,
            years in 0u32..20,
            debt in 0u32..100_000,
            surplus in 1u32..1_000_000
        ) {
            let income_value = income as f64 * annuity_factor(years, DEFAULT_DISCOUNT_RATE);
            let savings = income_value + debt as f64 + surplus as f64;
            let result = calculate_coverage(&profile(income as f64, years, debt as f64, savings, 0.0));

            prop_assert_eq!(result.recommended_coverage, 0.0);
        }
    }
}
