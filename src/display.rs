//! Plain-text presentation of estimates and reports

use crate::models::{AdvisorReport, CoverageBreakdown};
use std::fmt::Write;

/// `$1,234,567` style figure. The fractional part is dropped.
pub fn format_currency(amount: f64) -> String {
    let whole = amount.trunc();
    let negative = whole < 0.0;
    let digits = format!("{:.0}", whole.abs());

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if negative {
        format!("-${}", grouped)
    } else {
        format!("${}", grouped)
    }
}

pub fn render_breakdown(breakdown: &CoverageBreakdown) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Recommended Coverage: {}", format_currency(breakdown.recommended_coverage));
    let _ = writeln!(out, "  Annuity factor:           {:.4}", breakdown.annuity_factor);
    let _ = writeln!(
        out,
        "  Income replacement value: {}",
        format_currency(breakdown.income_replacement_value)
    );
    out
}

pub fn render_report(report: &AdvisorReport) -> String {
    let mut out = String::new();

    match report.age {
        Some(age) => {
            let _ = writeln!(out, "Profile: age {}, {}", age, report.location);
        }
        None => {
            let _ = writeln!(out, "Profile: {}", report.location);
        }
    }
    out.push('\n');
    out.push_str(&render_breakdown(&report.breakdown));

    if let Some(error) = &report.agent_error {
        let _ = writeln!(out, "\n{}", error);
        return out;
    }

    let Some(rec) = &report.recommendation else {
        return out;
    };

    let _ = writeln!(out, "\nAgent estimate: {}", format_currency(rec.coverage_amount));
    if !report.reconciliation.consistent {
        let divergence = report.reconciliation.divergence.unwrap_or_default();
        let _ = writeln!(
            out,
            "  ⚠️ differs from the local estimate by {:.1}%",
            divergence * 100.0
        );
    }

    if !rec.assumptions.is_empty() {
        out.push_str("\nAssumptions:\n");
        for assumption in &rec.assumptions {
            let _ = writeln!(out, "  - {}", assumption);
        }
    }

    if !rec.products.is_empty() {
        out.push_str("\nSuggested term-life products:\n");
        for (i, product) in rec.products.iter().enumerate() {
            let _ = write!(out, "  {}. {}", i + 1, product.name);
            if let Some(provider) = &product.provider {
                let _ = write!(out, " ({})", provider);
            }
            out.push('\n');
            if let Some(url) = &product.url {
                let _ = writeln!(out, "     {}", url);
            }
            if let Some(notes) = &product.notes {
                let _ = writeln!(out, "     {}", notes);
            }
        }
    }

    let pretty = serde_json::to_string_pretty(&rec.breakdown).unwrap_or_else(|_| rec.breakdown.to_string());
    let _ = writeln!(out, "\nHow this was calculated:\n{}", pretty);

    out
}
