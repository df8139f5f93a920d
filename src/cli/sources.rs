use super::{periods, ui};
use crate::AppSession;
use crate::core::feed;
use crate::core::transaction::PeriodKey;
use anyhow::{Result, bail};
use comfy_table::Cell;

/// Prints the configured feed URLs of every selected period.
pub async fn list(session: &AppSession) -> Result<()> {
    let selected = session.selected_periods().await;
    if selected.is_empty() {
        println!(
            "{}",
            ui::style_text("No period selected.", ui::StyleType::Subtle)
        );
        return Ok(());
    }

    let config = session.source_config().await;
    let catalog = session.catalog();
    for period in selected {
        println!(
            "\nPeriod: {}\n",
            ui::style_text(&period.to_string(), ui::StyleType::Title)
        );
        let urls = config.get(&period);
        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("Key"),
            ui::header_cell("Source"),
            ui::header_cell("URL"),
        ]);
        for key in catalog.feed_keys() {
            let url = urls.and_then(|u| u.get(key));
            let url_cell = match url {
                Some(url) if feed::is_fetchable(url) => Cell::new(url),
                Some(url) => Cell::new(ui::style_text(
                    &format!("{url} (not fetchable)"),
                    ui::StyleType::Error,
                )),
                None => Cell::new(ui::style_text("-", ui::StyleType::Subtle)),
            };
            table.add_row(vec![Cell::new(key), Cell::new(catalog.label(key)), url_cell]);
        }
        println!("{table}");
    }
    Ok(())
}

/// Stores (or with an empty `url`, removes) the feed of `source` for `period`.
pub async fn set(session: &AppSession, period: PeriodKey, source: &str, url: &str) -> Result<()> {
    if !session.catalog().feed_keys().any(|k| k == source) {
        let known: Vec<&str> = session.catalog().feed_keys().collect();
        bail!("Unknown source '{}', expected one of: {}", source, known.join(", "));
    }
    periods::with_refresh(session.set_source_url(period, source, url)).await
}
