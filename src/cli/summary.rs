use super::ui;
use crate::AppSession;
use crate::core::analytics::Summary;
use anyhow::Result;
use comfy_table::Cell;

impl Summary {
    pub fn display_as_table(&self) -> String {
        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell(""),
            ui::header_cell("Income"),
            ui::header_cell("Expenses"),
            ui::header_cell("Balance"),
        ]);

        let rows = [
            ("Pix", self.income_pix, self.expenses_pix, self.balance_pix),
            (
                "Crédito",
                self.income_credit,
                self.expenses_credit,
                self.balance_credit,
            ),
        ];
        for (label, income, expenses, balance) in rows {
            table.add_row(vec![
                Cell::new(label),
                ui::plain_money_cell(income),
                ui::plain_money_cell(expenses),
                ui::money_cell(balance),
            ]);
        }
        table.add_row(vec![
            Cell::new(ui::style_text("Total", ui::StyleType::TotalLabel)),
            ui::plain_money_cell(self.income_total),
            ui::plain_money_cell(self.expenses_total),
            ui::money_cell(self.balance),
        ]);

        let balance_style = if self.balance.is_sign_negative() && !self.balance.is_zero() {
            ui::StyleType::Negative
        } else {
            ui::StyleType::Positive
        };

        let mut output = format!("{}\n\n", ui::style_text("Summary", ui::StyleType::Title));
        output.push_str(&table.to_string());
        output.push_str(&format!(
            "\n\n{}: {}",
            ui::style_text("Balance", ui::StyleType::TotalLabel),
            ui::style_text(&ui::format_money(self.balance), balance_style)
        ));
        output
    }
}

pub async fn run(session: &AppSession) -> Result<()> {
    let selected = session.selected_periods().await;
    if selected.is_empty() {
        println!(
            "{}",
            ui::style_text(
                "No period selected. Use `strato select YYYY-MM` first.",
                ui::StyleType::Subtle
            )
        );
        return Ok(());
    }
    let list: Vec<String> = selected.iter().map(ToString::to_string).collect();
    println!(
        "Periods: {}\n",
        ui::style_text(&list.join(", "), ui::StyleType::TotalLabel)
    );
    println!("{}", session.summary().await.display_as_table());
    Ok(())
}
