//! Input checks run before any calculation. Nothing here fails; every
//! violation is collected so the caller can show them all at once.

use crate::core::metrics::{AcosInput, BudgetInput, Calculation, ForecastInput};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

impl ValidationReport {
    fn from_errors(errors: Vec<String>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
        }
    }
}

pub trait Validate {
    fn validate(&self) -> ValidationReport;
}

fn check_finite(fields: &[(&str, f64)], errors: &mut Vec<String>) {
    for (name, value) in fields {
        if !value.is_finite() {
            errors.push(format!("{name} must be a finite number"));
        }
    }
}

/// Non-negativity only; funnel and budget inputs are not range-checked further.
fn check_non_negative(fields: &[(&str, f64)], errors: &mut Vec<String>) {
    for (name, value) in fields {
        if *value < 0.0 {
            errors.push(format!("{name} must not be negative"));
        }
    }
}

/// Rejects inputs whose intermediate amounts overflow to infinity.
fn check_computable(amounts: &[(&str, f64)], errors: &mut Vec<String>) {
    for (name, value) in amounts {
        if !value.is_finite() {
            errors.push(format!("{name} is too large to compute"));
        }
    }
}

impl Validate for AcosInput {
    fn validate(&self) -> ValidationReport {
        let mut errors = Vec::new();
        check_finite(
            &[
                ("Sales", self.sales),
                ("Spend", self.spend),
                ("Margin", self.margin),
            ],
            &mut errors,
        );

        if self.sales < 0.0 {
            errors.push("Sales must be positive".to_string());
        }
        if self.spend < 0.0 {
            errors.push("Spend must be positive".to_string());
        }
        if self.margin < 0.0 {
            errors.push("Margin must be positive".to_string());
        }
        if self.margin > 100.0 {
            errors.push("Margin cannot exceed 100%".to_string());
        }
        if self.sales > 0.0 && self.spend > self.sales {
            errors.push("Spend cannot exceed sales".to_string());
        }
        if errors.is_empty() {
            check_computable(
                &[("Gross profit", self.sales * self.margin / 100.0)],
                &mut errors,
            );
        }

        ValidationReport::from_errors(errors)
    }
}

impl Validate for ForecastInput {
    fn validate(&self) -> ValidationReport {
        let fields = [
            ("Gross margin", self.gross_margin),
            ("Target AOV", self.target_aov),
            ("Target CTR", self.target_ctr),
            ("Target CPC", self.target_cpc),
            ("Target CVR", self.target_cvr),
        ];
        let mut errors = Vec::new();
        check_finite(&fields, &mut errors);
        check_non_negative(&fields, &mut errors);
        if errors.is_empty() {
            let clicks = self.impressions as f64 * self.target_ctr / 100.0;
            let orders = clicks * self.target_cvr / 100.0;
            let ad_sales = orders * self.target_aov;
            check_computable(
                &[
                    ("Clicks", clicks),
                    ("Orders", orders),
                    ("Ad spend", clicks * self.target_cpc),
                    ("Ad sales", ad_sales),
                    ("Gross profit", ad_sales * self.gross_margin / 100.0),
                ],
                &mut errors,
            );
        }
        ValidationReport::from_errors(errors)
    }
}

impl Validate for BudgetInput {
    fn validate(&self) -> ValidationReport {
        let fields = [
            ("Target sales", self.target_sales),
            ("Target TACOS", self.target_tacos),
            ("Gross margin", self.gross_margin),
        ];
        let mut errors = Vec::new();
        check_finite(&fields, &mut errors);
        check_non_negative(&fields, &mut errors);
        if errors.is_empty() {
            check_computable(
                &[
                    (
                        "Marketing budget",
                        self.target_tacos * self.target_sales / 100.0,
                    ),
                    ("Gross profit", self.target_sales * self.gross_margin / 100.0),
                ],
                &mut errors,
            );
        }
        ValidationReport::from_errors(errors)
    }
}

impl Validate for Calculation {
    fn validate(&self) -> ValidationReport {
        match self {
            Calculation::Acos(input) => input.validate(),
            Calculation::Forecast(input) => input.validate(),
            Calculation::Budget(input) => input.validate(),
        }
    }
}
