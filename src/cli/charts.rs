use super::ui;
use crate::core::analytics::{Breakdown, MonthlyPoint, TimeWindow, WindowReport};
use crate::AppSession;
use anyhow::Result;
use chrono::Local;
use comfy_table::Cell;
use rust_decimal::Decimal;

fn breakdown_table(breakdown: &Breakdown, money: fn(Decimal) -> Cell) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Source"),
        ui::header_cell("Value"),
        ui::header_cell("Share"),
    ]);
    for entry in &breakdown.entries {
        table.add_row(vec![
            Cell::new(&entry.label),
            money(entry.value),
            ui::percentage_cell(entry.share),
        ]);
    }
    table.add_row(vec![
        Cell::new(ui::style_text("Total", ui::StyleType::TotalLabel)),
        money(breakdown.total),
        Cell::new(""),
    ]);
    table.to_string()
}

fn evolution_table(points: &[MonthlyPoint]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Month"),
        ui::header_cell("Income"),
        ui::header_cell("Expenses"),
        ui::header_cell("Balance"),
    ]);
    for point in points {
        table.add_row(vec![
            Cell::new(point.label()),
            ui::plain_money_cell(point.income),
            ui::plain_money_cell(point.expense),
            ui::money_cell(point.balance),
        ]);
    }
    table.to_string()
}

impl WindowReport {
    pub fn display_as_tables(&self) -> String {
        let mut output = format!(
            "Window: {} ({} transactions)\n",
            ui::style_text(&self.window.to_string(), ui::StyleType::Title),
            self.transactions
        );

        output.push_str(&format!(
            "\n{}\n",
            ui::style_text("Expenses by source", ui::StyleType::TotalLabel)
        ));
        if self.expenses.entries.is_empty() {
            output.push_str(&ui::style_text("No expenses.", ui::StyleType::Subtle));
        } else {
            output.push_str(&breakdown_table(&self.expenses, ui::plain_money_cell));
        }

        output.push_str(&format!(
            "\n\n{}\n",
            ui::style_text("Balance by source", ui::StyleType::TotalLabel)
        ));
        if self.balances.entries.is_empty() {
            output.push_str(&ui::style_text(
                "No source with a positive balance.",
                ui::StyleType::Subtle,
            ));
        } else {
            output.push_str(&breakdown_table(&self.balances, ui::money_cell));
        }

        output.push_str(&format!(
            "\n\n{}\n",
            ui::style_text("Monthly evolution", ui::StyleType::TotalLabel)
        ));
        if self.evolution.is_empty() {
            output.push_str(&ui::style_text("No dated transactions.", ui::StyleType::Subtle));
        } else {
            output.push_str(&evolution_table(&self.evolution));
        }
        output
    }
}

/// Prints the chart data of the active transactions inside `window`.
pub async fn run(session: &AppSession, window: TimeWindow) -> Result<()> {
    let today = Local::now().date_naive();
    let report = session.window_report(window, today).await;
    println!("{}", report.display_as_tables());
    ui::print_separator();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::analytics::BreakdownEntry;
    use crate::core::transaction::PeriodKey;
    use rust_decimal_macros::dec;

    #[test]
    fn test_report_tables_render_sections() {
        let report = WindowReport {
            window: TimeWindow::Trailing(30),
            transactions: 3,
            expenses: Breakdown {
                entries: vec![BreakdownEntry {
                    label: "Nubank Cartão".to_string(),
                    value: dec!(80),
                    share: 100,
                }],
                total: dec!(80),
            },
            balances: Breakdown {
                entries: Vec::new(),
                total: dec!(0),
            },
            evolution: vec![MonthlyPoint {
                period: PeriodKey::new(2024, 3).unwrap(),
                income: dec!(100),
                expense: dec!(80),
                balance: dec!(20),
            }],
        };

        let output = console::strip_ansi_codes(&report.display_as_tables()).to_string();
        assert!(output.contains("Nubank Cartão"));
        assert!(output.contains("100%"));
        assert!(output.contains("No source with a positive balance."));
        assert!(output.contains("03/2024"));
        assert!(output.contains("20.00"));
    }
}
