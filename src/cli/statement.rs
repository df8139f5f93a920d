use super::ui;
use crate::core::analytics::source_label;
use crate::core::transaction::{
    DEFAULT_CATEGORY, MANUAL_SOURCE, TransactionType, format_feed_date, parse_feed_date,
};
use crate::core::Transaction;
use crate::{AppSession, ManualEntry};
use anyhow::{Result, bail};
use chrono::Utc;
use comfy_table::{Cell, Color};
use tracing::info;

/// Builds the manual transaction an entry describes. Fields left out of an
/// edit keep the values of `existing`. Readable dates are zero padded.
pub fn manual_transaction(entry: ManualEntry, existing: Option<&Transaction>) -> Transaction {
    let id = entry
        .id
        .unwrap_or_else(|| format!("{}-{}", MANUAL_SOURCE, Utc::now().timestamp_millis()));
    let category = entry
        .category
        .filter(|c| !c.trim().is_empty())
        .or_else(|| existing.map(|t| t.category.clone()))
        .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
    let manual_source_label = entry
        .label
        .or_else(|| existing.and_then(|t| t.manual_source_label.clone()))
        .filter(|l| !l.trim().is_empty());

    Transaction {
        id,
        date: parse_feed_date(&entry.date)
            .map(format_feed_date)
            .unwrap_or_else(|| entry.date.trim().to_string()),
        description: entry.description.trim().to_string(),
        amount: entry.amount,
        category,
        kind: TransactionType::from_amount(entry.amount),
        source: MANUAL_SOURCE.to_string(),
        manual_source_label,
    }
}

/// Prints the merged statement of the selected periods, newest first.
pub async fn list(session: &AppSession) -> Result<()> {
    let transactions = session.chronological().await;
    if transactions.is_empty() {
        println!(
            "{}",
            ui::style_text("No transactions.", ui::StyleType::Subtle)
        );
        return Ok(());
    }
    let ignored = session.ignored_ids().await;

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Date"),
        ui::header_cell("Description"),
        ui::header_cell("Category"),
        ui::header_cell("Source"),
        ui::header_cell("Amount"),
        ui::header_cell("Id"),
    ]);
    for t in &transactions {
        let is_ignored = ignored.contains(&t.id);
        let mut row = vec![
            Cell::new(&t.date),
            Cell::new(&t.description),
            Cell::new(&t.category),
            Cell::new(source_label(t, session.catalog())),
            ui::money_cell(t.amount),
            Cell::new(&t.id),
        ];
        if is_ignored {
            row = row.into_iter().map(|c| c.fg(Color::DarkGrey)).collect();
            row[1] = Cell::new(format!("{} (ignored)", t.description)).fg(Color::DarkGrey);
        }
        table.add_row(row);
    }
    println!("{table}");
    println!(
        "\n{} transactions, {} ignored",
        transactions.len(),
        transactions.iter().filter(|t| ignored.contains(&t.id)).count()
    );
    Ok(())
}

/// Adds a manual transaction, or edits the one whose id is given.
pub async fn add(session: &AppSession, entry: ManualEntry) -> Result<()> {
    let existing = match entry.id.as_deref() {
        Some(id) => session.manual_entry(id).await,
        None => None,
    };
    let tx = manual_transaction(entry, existing.as_ref());
    let id = tx.id.clone();
    match session.upsert_manual(tx).await {
        Ok(period) => {
            info!("Stored manual transaction {} in {}", id, period);
            println!(
                "{} {} in {}",
                ui::style_text("Saved", ui::StyleType::Positive),
                id,
                period
            );
            Ok(())
        }
        Err(e) => {
            println!("{}", ui::style_text(&e.to_string(), ui::StyleType::Error));
            Err(e.into())
        }
    }
}

pub async fn remove(session: &AppSession, id: &str) -> Result<()> {
    match session.remove_manual(id).await {
        Some(period) => {
            println!("Removed {id} from {period}");
            Ok(())
        }
        None => bail!("No manual transaction with id {}", id),
    }
}

pub async fn toggle_ignore(session: &AppSession, id: &str) -> Result<()> {
    if session.toggle_ignore(id).await {
        println!("{id} is now ignored");
    } else {
        println!("{id} is counted again");
    }
    Ok(())
}
