//! Closed-form campaign metrics: direct ACOS, funnel forecast and
//! TACOS budget.
//!
//! Every calculation is a pure function of its input (and, for the forecast
//! and budget, the EUR/PLN rate). Divisions by zero yield 0 rather than
//! NaN or infinity. [`MetricsEngine`] pairs the pure functions with a
//! [`RateSource`] so callers only hand over validated inputs.

use crate::core::profitability::{
    self, MessageStyle, ProfitabilityStatus, Strictness, classify,
};
use crate::core::rate::{RateQuote, RateSource};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// `numerator / denominator`, or 0 when the denominator is zero or the
/// quotient is not a finite number.
pub fn safe_divide(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        return 0.0;
    }
    let quotient = numerator / denominator;
    if quotient.is_finite() { quotient } else { 0.0 }
}

/// Rounds half away from zero to `decimals` places. Never returns `-0.0`,
/// and non-finite values collapse to 0.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let factor = 10f64.powi(decimals);
    let scaled = value * factor;
    // Too large to carry any fractional digits.
    if !scaled.is_finite() {
        return value;
    }
    let rounded = scaled.round() / factor;
    if rounded == 0.0 { 0.0 } else { rounded }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AcosInput {
    pub sales: f64,
    pub spend: f64,
    /// Gross margin in percent.
    pub margin: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastInput {
    pub gross_margin: f64,
    pub target_aov: f64,
    pub target_ctr: f64,
    pub target_cpc: f64,
    pub target_cvr: f64,
    pub impressions: u64,
    /// Display tag only; amounts are not converted.
    pub currency: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BudgetInput {
    pub target_sales: f64,
    pub target_tacos: f64,
    pub gross_margin: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AcosResult {
    pub acos: f64,
    pub roi: f64,
    pub profit: f64,
    pub break_even_acos: f64,
    pub is_profitable: bool,
    pub profitability_message: String,
    pub profitability_status: ProfitabilityStatus,
    pub sales: f64,
    pub spend: f64,
    pub margin: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastResult {
    // Funnel volumes
    pub impressions: u64,
    pub clicks: f64,
    pub orders: f64,
    pub ad_spend: f64,
    pub ad_sales: f64,
    // Ratios
    pub acos: f64,
    pub roi: f64,
    pub roas: f64,
    pub cpm: f64,
    pub cost_per_conversion: f64,
    // Profit
    pub gross_profit: f64,
    pub total_profit: f64,
    pub profit_per_order: f64,
    pub break_even_acos: f64,
    pub is_profitable: bool,
    pub profitability_message: String,
    pub profitability_status: ProfitabilityStatus,
    // Inputs
    pub gross_margin: f64,
    pub target_aov: f64,
    pub target_ctr: f64,
    pub target_cpc: f64,
    pub target_cvr: f64,
    pub currency: String,
    // Currency
    pub exchange_rate: f64,
    pub ad_spend_pln: f64,
    pub ad_sales_pln: f64,
    pub gross_profit_pln: f64,
    pub total_profit_pln: f64,
    pub profit_per_order_pln: f64,
    pub target_aov_pln: f64,
    pub target_cpc_pln: f64,
    pub cpm_pln: f64,
    pub cost_per_conversion_pln: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetResult {
    pub marketing_budget: f64,
    pub gross_profit: f64,
    pub net_profit: f64,
    pub roi: f64,
    pub profit_margin: f64,
    pub marketing_to_profit_ratio: f64,
    pub break_even_tacos: f64,
    pub is_profitable: bool,
    pub profitability_message: String,
    pub profitability_status: ProfitabilityStatus,
    pub target_sales: f64,
    pub target_tacos: f64,
    pub gross_margin: f64,
    pub exchange_rate: f64,
    pub target_sales_pln: f64,
    pub marketing_budget_pln: f64,
    pub gross_profit_pln: f64,
    pub net_profit_pln: f64,
}

/// Input of any of the three calculations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Calculation {
    Acos(AcosInput),
    Forecast(ForecastInput),
    Budget(BudgetInput),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CalculationResult {
    Acos(AcosResult),
    Forecast(ForecastResult),
    Budget(BudgetResult),
}

impl CalculationResult {
    pub fn is_profitable(&self) -> bool {
        match self {
            CalculationResult::Acos(r) => r.is_profitable,
            CalculationResult::Forecast(r) => r.is_profitable,
            CalculationResult::Budget(r) => r.is_profitable,
        }
    }

    pub fn profitability_message(&self) -> &str {
        match self {
            CalculationResult::Acos(r) => &r.profitability_message,
            CalculationResult::Forecast(r) => &r.profitability_message,
            CalculationResult::Budget(r) => &r.profitability_message,
        }
    }
}

/// ACOS, ROI and profit from sales, spend and margin.
pub fn calculate_acos(input: &AcosInput) -> AcosResult {
    let AcosInput {
        sales,
        spend,
        margin,
    } = *input;

    let acos = safe_divide(spend, sales) * 100.0;
    let roi = safe_divide(sales - spend, spend) * 100.0;
    let gross_profit = sales * margin / 100.0;
    let profit = gross_profit - spend;

    let verdict = classify(acos, margin, Strictness::AllowZeroCost);

    AcosResult {
        acos: round_to(acos, 2),
        roi: round_to(roi, 2),
        profit: round_to(profit, 2),
        break_even_acos: round_to(margin, 2),
        is_profitable: verdict.is_profitable,
        profitability_message: profitability::message(
            MessageStyle::Acos,
            acos,
            margin,
            verdict.is_profitable,
        ),
        profitability_status: verdict.status,
        sales,
        spend,
        margin,
    }
}

/// Funnel forecast: impressions → clicks → orders → spend and sales.
pub fn calculate_forecast(input: &ForecastInput, rate: f64) -> ForecastResult {
    let impressions = input.impressions as f64;
    let margin = input.gross_margin;

    let clicks = impressions * input.target_ctr / 100.0;
    let orders = clicks * input.target_cvr / 100.0;
    let ad_spend = clicks * input.target_cpc;
    let ad_sales = orders * input.target_aov;

    let acos = safe_divide(ad_spend, ad_sales) * 100.0;
    let roi = safe_divide(ad_sales - ad_spend, ad_spend) * 100.0;
    let roas = safe_divide(ad_sales, ad_spend);

    let gross_profit = ad_sales * margin / 100.0;
    let total_profit = gross_profit - ad_spend;
    let profit_per_order = safe_divide(total_profit, orders);

    let verdict = classify(acos, margin, Strictness::RequirePositiveCost);

    let cpm = safe_divide(ad_spend, impressions) * 1000.0;
    let cost_per_conversion = safe_divide(ad_spend, orders);

    let pln = |amount: f64| round_to(amount * rate, 2);

    ForecastResult {
        impressions: input.impressions,
        clicks: round_to(clicks, 0),
        orders: round_to(orders, 0),
        ad_spend: round_to(ad_spend, 2),
        ad_sales: round_to(ad_sales, 2),
        acos: round_to(acos, 0),
        roi: round_to(roi, 0),
        roas: round_to(roas, 2),
        cpm: round_to(cpm, 2),
        cost_per_conversion: round_to(cost_per_conversion, 2),
        gross_profit: round_to(gross_profit, 2),
        total_profit: round_to(total_profit, 0),
        profit_per_order: round_to(profit_per_order, 0),
        break_even_acos: round_to(margin, 0),
        is_profitable: verdict.is_profitable,
        profitability_message: profitability::message(
            MessageStyle::Forecast,
            acos,
            margin,
            verdict.is_profitable,
        ),
        profitability_status: verdict.status,
        gross_margin: margin,
        target_aov: input.target_aov,
        target_ctr: input.target_ctr,
        target_cpc: input.target_cpc,
        target_cvr: input.target_cvr,
        currency: input.currency.clone(),
        exchange_rate: round_to(rate, 4),
        ad_spend_pln: pln(ad_spend),
        ad_sales_pln: pln(ad_sales),
        gross_profit_pln: pln(gross_profit),
        total_profit_pln: pln(total_profit),
        profit_per_order_pln: pln(profit_per_order),
        target_aov_pln: pln(input.target_aov),
        target_cpc_pln: pln(input.target_cpc),
        cpm_pln: pln(cpm),
        cost_per_conversion_pln: pln(cost_per_conversion),
    }
}

/// Marketing budget implied by a sales target and a TACOS target.
pub fn calculate_budget(input: &BudgetInput, rate: f64) -> BudgetResult {
    let BudgetInput {
        target_sales,
        target_tacos,
        gross_margin,
    } = *input;

    let marketing_budget = target_tacos * target_sales / 100.0;
    let gross_profit = target_sales * gross_margin / 100.0;
    let net_profit = gross_profit - marketing_budget;
    let roi = safe_divide(target_sales - marketing_budget, marketing_budget) * 100.0;
    let profit_margin = safe_divide(net_profit, target_sales) * 100.0;
    // Only meaningful while there is a profit to compare against.
    let marketing_to_profit_ratio = if net_profit > 0.0 {
        safe_divide(marketing_budget, net_profit) * 100.0
    } else {
        0.0
    };

    let verdict = classify(target_tacos, gross_margin, Strictness::AllowZeroCost);

    BudgetResult {
        marketing_budget: round_to(marketing_budget, 0),
        gross_profit: round_to(gross_profit, 0),
        net_profit: round_to(net_profit, 0),
        roi: round_to(roi, 1),
        profit_margin: round_to(profit_margin, 1),
        marketing_to_profit_ratio: round_to(marketing_to_profit_ratio, 1),
        break_even_tacos: round_to(gross_margin, 1),
        is_profitable: verdict.is_profitable,
        profitability_message: profitability::message(
            MessageStyle::Budget,
            target_tacos,
            gross_margin,
            verdict.is_profitable,
        ),
        profitability_status: verdict.status,
        target_sales,
        target_tacos,
        gross_margin,
        exchange_rate: round_to(rate, 4),
        target_sales_pln: round_to(target_sales * rate, 0),
        marketing_budget_pln: round_to(marketing_budget * rate, 0),
        gross_profit_pln: round_to(gross_profit * rate, 0),
        net_profit_pln: round_to(net_profit * rate, 0),
    }
}

/// A calculation result together with the rate quote it used, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub result: CalculationResult,
    pub rate: Option<RateQuote>,
}

/// Runs calculations, looking the exchange rate up once where needed.
pub struct MetricsEngine<R> {
    rates: R,
}

impl<R: RateSource> MetricsEngine<R> {
    pub fn new(rates: R) -> Self {
        Self { rates }
    }

    pub fn acos(&self, input: &AcosInput) -> AcosResult {
        calculate_acos(input)
    }

    pub async fn forecast(&self, input: &ForecastInput) -> (ForecastResult, RateQuote) {
        let quote = self.rates.quote().await;
        (calculate_forecast(input, quote.rate), quote)
    }

    pub async fn budget(&self, input: &BudgetInput) -> (BudgetResult, RateQuote) {
        let quote = self.rates.quote().await;
        (calculate_budget(input, quote.rate), quote)
    }

    #[instrument(skip(self))]
    pub async fn evaluate(&self, calculation: &Calculation) -> Evaluation {
        let evaluation = match calculation {
            Calculation::Acos(input) => Evaluation {
                result: CalculationResult::Acos(self.acos(input)),
                rate: None,
            },
            Calculation::Forecast(input) => {
                let (result, quote) = self.forecast(input).await;
                Evaluation {
                    result: CalculationResult::Forecast(result),
                    rate: Some(quote),
                }
            }
            Calculation::Budget(input) => {
                let (result, quote) = self.budget(input).await;
                Evaluation {
                    result: CalculationResult::Budget(result),
                    rate: Some(quote),
                }
            }
        };
        debug!(
            profitable = evaluation.result.is_profitable(),
            "Calculation finished"
        );
        evaluation
    }
}
