//! Groups calculation results into report sections and writes them to disk.

use crate::core::Evaluation;
use crate::core::metrics::{AcosResult, BudgetResult, CalculationResult, ForecastResult};
use crate::core::rate::{BASE_CURRENCY, QUOTE_CURRENCY, RateOrigin};
use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportField {
    pub key: &'static str,
    pub label: &'static str,
    pub value: Value,
    /// Human readable rendering used by tables and CSV.
    #[serde(skip)]
    pub display: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSection {
    pub id: &'static str,
    pub title: &'static str,
    pub fields: Vec<ReportField>,
}

impl ReportSection {
    fn new(id: &'static str, title: &'static str, fields: Vec<ReportField>) -> Self {
        Self { id, title, fields }
    }

    pub fn field(&self, key: &str) -> Option<&ReportField> {
        self.fields.iter().find(|f| f.key == key)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub kind: &'static str,
    pub generated_at: DateTime<Utc>,
    pub sections: Vec<ReportSection>,
}

impl Report {
    pub fn new(evaluation: &Evaluation, generated_at: DateTime<Utc>) -> Self {
        let kind = match evaluation.result {
            CalculationResult::Acos(_) => "acos",
            CalculationResult::Forecast(_) => "forecast",
            CalculationResult::Budget(_) => "budget",
        };
        Self {
            kind,
            generated_at,
            sections: report_sections(
                &evaluation.result,
                evaluation.rate.map(|quote| quote.origin),
            ),
        }
    }

    pub fn section(&self, id: &str) -> Option<&ReportSection> {
        self.sections.iter().find(|s| s.id == id)
    }
}

/// Formats with fixed decimals and groups the integer digits in threes
/// separated by spaces, e.g. `1 234.56`.
fn group_thousands(value: f64, decimals: usize) -> String {
    let formatted = format!("{value:.decimals$}");
    let (sign, unsigned) = match formatted.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", formatted.as_str()),
    };
    let (integer, fraction) = match unsigned.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (unsigned, None),
    };

    let mut grouped = String::with_capacity(formatted.len() + integer.len() / 3);
    for (i, digit) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(digit);
    }

    match fraction {
        Some(fraction) => format!("{sign}{grouped}.{fraction}"),
        None => format!("{sign}{grouped}"),
    }
}

fn amount(
    key: &'static str,
    label: &'static str,
    value: f64,
    decimals: usize,
    unit: &str,
) -> ReportField {
    let number = group_thousands(value, decimals);
    let display = if unit.is_empty() {
        number
    } else {
        format!("{number} {unit}")
    };
    ReportField {
        key,
        label,
        value: json!(value),
        display,
    }
}

fn percent(key: &'static str, label: &'static str, value: f64, decimals: usize) -> ReportField {
    ReportField {
        key,
        label,
        value: json!(value),
        display: format!("{value:.decimals$}%"),
    }
}

fn flag(key: &'static str, label: &'static str, value: bool) -> ReportField {
    ReportField {
        key,
        label,
        value: json!(value),
        display: if value { "Yes" } else { "No" }.to_string(),
    }
}

fn text(key: &'static str, label: &'static str, value: &str) -> ReportField {
    ReportField {
        key,
        label,
        value: json!(value),
        display: value.to_string(),
    }
}

fn currency_section(
    rate: f64,
    origin: Option<RateOrigin>,
    mut fields: Vec<ReportField>,
) -> ReportSection {
    let mut head = vec![
        text(
            "currency_pair",
            "Currency pair",
            &format!("{BASE_CURRENCY}/{QUOTE_CURRENCY}"),
        ),
        amount("exchange_rate", "Exchange rate", rate, 4, ""),
    ];
    if let Some(origin) = origin {
        head.push(text("rate_source", "Rate source", &origin.to_string()));
    }
    head.append(&mut fields);
    ReportSection::new("currency_info", "Currency info", head)
}

fn acos_sections(r: &AcosResult) -> Vec<ReportSection> {
    vec![
        ReportSection::new(
            "forecast_results",
            "Forecast results",
            vec![
                percent("acos", "ACOS", r.acos, 2),
                percent("roi", "ROI", r.roi, 2),
                amount("profit", "Profit", r.profit, 2, ""),
            ],
        ),
        ReportSection::new(
            "input_parameters",
            "Input parameters",
            vec![
                amount("sales", "Sales", r.sales, 2, ""),
                amount("spend", "Ad spend", r.spend, 2, ""),
                percent("margin", "Gross margin", r.margin, 2),
            ],
        ),
        ReportSection::new(
            "profitability_analysis",
            "Profitability analysis",
            vec![
                percent("break_even_acos", "Break-even ACOS", r.break_even_acos, 2),
                flag("is_profitable", "Profitable", r.is_profitable),
                text(
                    "profitability_status",
                    "Status",
                    &r.profitability_status.to_string(),
                ),
                text("profitability_message", "Message", &r.profitability_message),
            ],
        ),
    ]
}

fn forecast_sections(r: &ForecastResult, origin: Option<RateOrigin>) -> Vec<ReportSection> {
    let cur = r.currency.as_str();
    vec![
        ReportSection::new(
            "forecast_results",
            "Forecast results",
            vec![
                amount("impressions", "Impressions", r.impressions as f64, 0, ""),
                amount("clicks", "Clicks", r.clicks, 0, ""),
                amount("orders", "Orders", r.orders, 0, ""),
                amount("ad_spend", "Ad spend", r.ad_spend, 2, cur),
                amount("ad_sales", "Ad sales", r.ad_sales, 2, cur),
                percent("acos", "ACOS", r.acos, 0),
                percent("roi", "ROI", r.roi, 0),
                amount("roas", "ROAS", r.roas, 2, ""),
                amount("cpm", "CPM", r.cpm, 2, cur),
                amount(
                    "cost_per_conversion",
                    "Cost per conversion",
                    r.cost_per_conversion,
                    2,
                    cur,
                ),
                amount("gross_profit", "Gross profit", r.gross_profit, 2, cur),
                amount("total_profit", "Total profit", r.total_profit, 0, cur),
                amount(
                    "profit_per_order",
                    "Profit per order",
                    r.profit_per_order,
                    0,
                    cur,
                ),
            ],
        ),
        ReportSection::new(
            "input_parameters",
            "Input parameters",
            vec![
                percent("gross_margin", "Gross margin", r.gross_margin, 2),
                amount("target_aov", "Target AOV", r.target_aov, 2, cur),
                percent("target_ctr", "Target CTR", r.target_ctr, 2),
                amount("target_cpc", "Target CPC", r.target_cpc, 2, cur),
                percent("target_cvr", "Target CVR", r.target_cvr, 2),
                text("currency", "Currency", cur),
            ],
        ),
        ReportSection::new(
            "profitability_analysis",
            "Profitability analysis",
            vec![
                percent("break_even_acos", "Break-even ACOS", r.break_even_acos, 0),
                flag("is_profitable", "Profitable", r.is_profitable),
                text(
                    "profitability_status",
                    "Status",
                    &r.profitability_status.to_string(),
                ),
                text("profitability_message", "Message", &r.profitability_message),
            ],
        ),
        currency_section(
            r.exchange_rate,
            origin,
            vec![
                amount("ad_spend_pln", "Ad spend", r.ad_spend_pln, 2, QUOTE_CURRENCY),
                amount("ad_sales_pln", "Ad sales", r.ad_sales_pln, 2, QUOTE_CURRENCY),
                amount(
                    "gross_profit_pln",
                    "Gross profit",
                    r.gross_profit_pln,
                    2,
                    QUOTE_CURRENCY,
                ),
                amount(
                    "total_profit_pln",
                    "Total profit",
                    r.total_profit_pln,
                    2,
                    QUOTE_CURRENCY,
                ),
                amount(
                    "profit_per_order_pln",
                    "Profit per order",
                    r.profit_per_order_pln,
                    2,
                    QUOTE_CURRENCY,
                ),
                amount("target_aov_pln", "Target AOV", r.target_aov_pln, 2, QUOTE_CURRENCY),
                amount("target_cpc_pln", "Target CPC", r.target_cpc_pln, 2, QUOTE_CURRENCY),
                amount("cpm_pln", "CPM", r.cpm_pln, 2, QUOTE_CURRENCY),
                amount(
                    "cost_per_conversion_pln",
                    "Cost per conversion",
                    r.cost_per_conversion_pln,
                    2,
                    QUOTE_CURRENCY,
                ),
            ],
        ),
    ]
}

fn budget_sections(r: &BudgetResult, origin: Option<RateOrigin>) -> Vec<ReportSection> {
    vec![
        ReportSection::new(
            "forecast_results",
            "Forecast results",
            vec![
                amount(
                    "marketing_budget",
                    "Marketing budget",
                    r.marketing_budget,
                    0,
                    BASE_CURRENCY,
                ),
                amount("gross_profit", "Gross profit", r.gross_profit, 0, BASE_CURRENCY),
                amount("net_profit", "Net profit", r.net_profit, 0, BASE_CURRENCY),
                percent("roi", "ROI", r.roi, 1),
                percent("profit_margin", "Profit margin", r.profit_margin, 1),
                percent(
                    "marketing_to_profit_ratio",
                    "Marketing to profit",
                    r.marketing_to_profit_ratio,
                    1,
                ),
            ],
        ),
        ReportSection::new(
            "input_parameters",
            "Input parameters",
            vec![
                amount("target_sales", "Target sales", r.target_sales, 0, BASE_CURRENCY),
                percent("target_tacos", "Target TACOS", r.target_tacos, 1),
                percent("gross_margin", "Gross margin", r.gross_margin, 1),
            ],
        ),
        ReportSection::new(
            "profitability_analysis",
            "Profitability analysis",
            vec![
                percent("break_even_tacos", "Break-even TACOS", r.break_even_tacos, 1),
                flag("is_profitable", "Profitable", r.is_profitable),
                text(
                    "profitability_status",
                    "Status",
                    &r.profitability_status.to_string(),
                ),
                text("profitability_message", "Message", &r.profitability_message),
            ],
        ),
        currency_section(
            r.exchange_rate,
            origin,
            vec![
                amount(
                    "target_sales_pln",
                    "Target sales",
                    r.target_sales_pln,
                    0,
                    QUOTE_CURRENCY,
                ),
                amount(
                    "marketing_budget_pln",
                    "Marketing budget",
                    r.marketing_budget_pln,
                    0,
                    QUOTE_CURRENCY,
                ),
                amount(
                    "gross_profit_pln",
                    "Gross profit",
                    r.gross_profit_pln,
                    0,
                    QUOTE_CURRENCY,
                ),
                amount("net_profit_pln", "Net profit", r.net_profit_pln, 0, QUOTE_CURRENCY),
            ],
        ),
    ]
}

/// Organizes a result into forecast results, input parameters,
/// profitability analysis and, where a rate was used, currency info.
pub fn report_sections(
    result: &CalculationResult,
    origin: Option<RateOrigin>,
) -> Vec<ReportSection> {
    match result {
        CalculationResult::Acos(r) => acos_sections(r),
        CalculationResult::Forecast(r) => forecast_sections(r, origin),
        CalculationResult::Budget(r) => budget_sections(r, origin),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl FromStr for ExportFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            _ => Err(anyhow!("Unsupported export format: {}", s)),
        }
    }
}

impl ExportFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .ok_or_else(|| anyhow!("Export path has no file extension: {}", path.display()))?;
        extension.parse()
    }
}

#[derive(Serialize)]
struct JsonSection<'a> {
    id: &'a str,
    title: &'a str,
    fields: Map<String, Value>,
}

#[derive(Serialize)]
struct JsonDocument<'a> {
    kind: &'a str,
    generated_at: DateTime<Utc>,
    sections: Vec<JsonSection<'a>>,
}

pub fn to_json(report: &Report) -> Result<String> {
    let document = JsonDocument {
        kind: report.kind,
        generated_at: report.generated_at,
        sections: report
            .sections
            .iter()
            .map(|section| JsonSection {
                id: section.id,
                title: section.title,
                fields: section
                    .fields
                    .iter()
                    .map(|f| (f.key.to_string(), f.value.clone()))
                    .collect(),
            })
            .collect(),
    };
    serde_json::to_string_pretty(&document).context("Failed to serialize report")
}

pub fn write_csv<W: std::io::Write>(report: &Report, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(["section", "metric", "value"])?;
    for section in &report.sections {
        for field in &section.fields {
            let value = match &field.value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            wtr.write_record([section.title, field.label, value.as_str()])?;
        }
    }
    wtr.flush()?;
    Ok(())
}

/// Writes the report in the format implied by the file extension.
pub fn export_report(report: &Report, path: &Path) -> Result<ExportFormat> {
    let format = ExportFormat::from_path(path)?;
    debug!(?format, path = %path.display(), "Exporting report");

    match format {
        ExportFormat::Json => {
            let json = to_json(report)?;
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
        }
        ExportFormat::Csv => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create report file {}", path.display()))?;
            write_csv(report, file)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
        }
    }

    info!("Exported report to {}", path.display());
    Ok(format)
}
