use super::ui;
use crate::core::rate::{BASE_CURRENCY, QUOTE_CURRENCY};
use crate::core::{RateOrigin, RateSource};
use anyhow::Result;
use comfy_table::Cell;

/// Prints the EUR/PLN rate the calculations would use right now.
pub async fn run<R: RateSource>(rates: &R) -> Result<()> {
    let pb = ui::new_spinner("Fetching EUR/PLN rate...");
    let quote = rates.quote().await;
    pb.finish_and_clear();

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Currency pair"),
        ui::header_cell("Rate"),
        ui::header_cell("Source"),
    ]);
    table.add_row(vec![
        Cell::new(format!("{BASE_CURRENCY}/{QUOTE_CURRENCY}")),
        ui::value_cell(&format!("{:.4}", quote.rate)),
        Cell::new(quote.origin.to_string()),
    ]);
    println!("{table}");

    if quote.origin == RateOrigin::Fallback {
        println!(
            "{}",
            ui::style_text(
                "Live rate unavailable, showing the configured fallback",
                ui::StyleType::Subtle
            )
        );
    }
    Ok(())
}
