use super::ui;
use crate::OutputOptions;
use crate::core::{Calculation, Evaluation, MetricsEngine, RateSource, Validate};
use crate::export::{self, Report};
use anyhow::{Result, bail};
use chrono::Utc;
use comfy_table::Cell;
use tracing::{debug, info};

pub async fn run<R: RateSource>(
    engine: &MetricsEngine<R>,
    calculation: &Calculation,
    output: &OutputOptions,
) -> Result<()> {
    let validation = calculation.validate();
    if !validation.is_valid {
        for error in &validation.errors {
            eprintln!("{}", ui::style_text(error, ui::StyleType::Error));
        }
        bail!("Invalid input: {}", validation.errors.join("; "));
    }
    debug!(?calculation, "Input validated");

    let spinner = match calculation {
        Calculation::Acos(_) => None,
        _ => Some(ui::new_spinner("Fetching EUR/PLN rate...")),
    };
    let evaluation = engine.evaluate(calculation).await;
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    let report = Report::new(&evaluation, Utc::now());

    if output.json {
        println!("{}", serde_json::to_string_pretty(&evaluation.result)?);
    } else {
        println!("{}", display_report(&report, &evaluation));
    }

    if let Some(path) = &output.export {
        export::export_report(&report, path)?;
        if !output.json {
            println!("\nReport saved to {}", path.display());
        }
    }

    info!(kind = report.kind, "Calculation complete");
    Ok(())
}

fn title(kind: &str) -> &'static str {
    match kind {
        "acos" => "ACOS calculation",
        "forecast" => "Campaign forecast",
        _ => "Marketing budget",
    }
}

/// Renders every report section as a two-column table, followed by the
/// profitability message.
pub fn display_report(report: &Report, evaluation: &Evaluation) -> String {
    let mut output = format!(
        "{}\n",
        ui::style_text(title(report.kind), ui::StyleType::Title)
    );

    for section in &report.sections {
        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell(section.title),
            ui::header_cell("Value"),
        ]);

        for field in &section.fields {
            let value = match field.key {
                "profitability_message" => continue,
                "is_profitable" => ui::verdict_cell(evaluation.result.is_profitable()),
                _ => ui::value_cell(&field.display),
            };
            table.add_row(vec![Cell::new(field.label), value]);
        }

        output.push('\n');
        output.push_str(&table.to_string());
        output.push('\n');
    }

    let message = evaluation.result.profitability_message();
    if !message.is_empty() {
        let style_type = if evaluation.result.is_profitable() {
            ui::StyleType::Success
        } else {
            ui::StyleType::Warning
        };
        output.push_str(&format!("\n{}", ui::style_text(message, style_type)));
    }

    if let Some(quote) = evaluation.rate
        && quote.origin == crate::core::RateOrigin::Fallback
    {
        output.push_str(&format!(
            "\n{}",
            ui::style_text(
                &format!(
                    "Live exchange rate unavailable, PLN amounts use the fallback rate {:.2}",
                    quote.rate
                ),
                ui::StyleType::Subtle
            )
        ));
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::metrics::{AcosInput, CalculationResult, calculate_acos};
    use crate::core::rate::{RateOrigin, RateQuote};
    use async_trait::async_trait;

    struct StaticRate;

    #[async_trait]
    impl RateSource for StaticRate {
        async fn quote(&self) -> RateQuote {
            RateQuote {
                rate: 4.3,
                origin: RateOrigin::Fallback,
            }
        }
    }

    #[test]
    fn test_display_report_contains_sections_and_message() {
        console::set_colors_enabled(false);
        let evaluation = Evaluation {
            result: CalculationResult::Acos(calculate_acos(&AcosInput {
                sales: 1000.0,
                spend: 450.0,
                margin: 30.0,
            })),
            rate: None,
        };
        let report = Report::new(&evaluation, Utc::now());
        let rendered = display_report(&report, &evaluation);

        assert!(rendered.contains("ACOS calculation"));
        assert!(rendered.contains("Forecast results"));
        assert!(rendered.contains("45.00%"));
        assert!(rendered.contains("exceeds the margin"));
        assert!(!rendered.contains("fallback rate"));
    }

    #[tokio::test]
    async fn test_invalid_input_is_rejected() {
        let engine = MetricsEngine::new(StaticRate);
        let calculation = Calculation::Acos(AcosInput {
            sales: 100.0,
            spend: 150.0,
            margin: 150.0,
        });

        let err = run(&engine, &calculation, &OutputOptions::default())
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid input: Margin cannot exceed 100%; Spend cannot exceed sales"
        );
    }

    #[tokio::test]
    async fn test_fallback_rate_is_noted() {
        console::set_colors_enabled(false);
        let engine = MetricsEngine::new(StaticRate);
        let evaluation = engine
            .evaluate(&Calculation::Budget(crate::core::metrics::BudgetInput {
                target_sales: 1000.0,
                target_tacos: 10.0,
                gross_margin: 30.0,
            }))
            .await;
        let report = Report::new(&evaluation, Utc::now());
        let rendered = display_report(&report, &evaluation);

        assert!(rendered.contains("Currency info"));
        assert!(rendered.contains("fallback rate 4.30"));
    }
}
