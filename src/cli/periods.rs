use super::ui;
use crate::AppSession;
use crate::core::RefreshOutcome;
use crate::core::transaction::PeriodKey;
use anyhow::Result;
use std::future::Future;

/// Runs a refreshing operation behind a spinner and reports how it went.
pub async fn with_refresh<F>(operation: F) -> Result<()>
where
    F: Future<Output = RefreshOutcome>,
{
    let pb = ui::new_spinner("Syncing remote feeds...");
    let outcome = operation.await;
    pb.finish_and_clear();
    print_outcome(&outcome);
    Ok(())
}

fn print_outcome(outcome: &RefreshOutcome) {
    match outcome {
        RefreshOutcome::NothingSelected => println!(
            "{}",
            ui::style_text(
                "No period selected. Use `strato select YYYY-MM` first.",
                ui::StyleType::Subtle
            )
        ),
        RefreshOutcome::Committed { failures, .. } if failures.is_empty() => {
            println!("{}", ui::style_text("Feeds synced.", ui::StyleType::Positive))
        }
        RefreshOutcome::Committed { failures, .. } => {
            println!(
                "{}",
                ui::style_text(
                    &format!("Feeds synced with {} failures:", failures.len()),
                    ui::StyleType::Error
                )
            );
            for (period, source) in failures {
                println!("  {period} {source}");
            }
        }
        RefreshOutcome::Superseded { .. } => println!(
            "{}",
            ui::style_text(
                "Another refresh started meanwhile, its result will be kept.",
                ui::StyleType::Subtle
            )
        ),
    }
}

pub async fn refresh(session: &AppSession) -> Result<()> {
    with_refresh(session.refresh()).await
}

/// Adds `periods` to the current selection.
pub async fn select(session: &AppSession, periods: Vec<PeriodKey>) -> Result<()> {
    let mut selected = session.selected_periods().await;
    selected.extend(periods);
    with_refresh(session.select_periods(selected)).await?;
    print_selection(session).await;
    Ok(())
}

pub async fn deselect(session: &AppSession, periods: Vec<PeriodKey>) -> Result<()> {
    let mut selected = session.selected_periods().await;
    selected.retain(|p| !periods.contains(p));
    with_refresh(session.select_periods(selected)).await?;
    print_selection(session).await;
    Ok(())
}

pub async fn clear(session: &AppSession) -> Result<()> {
    session.select_periods(Vec::new()).await;
    print_selection(session).await;
    Ok(())
}

async fn print_selection(session: &AppSession) {
    let selected = session.selected_periods().await;
    if selected.is_empty() {
        println!("Selected periods: {}", ui::style_text("none", ui::StyleType::Subtle));
    } else {
        let list: Vec<String> = selected.iter().map(ToString::to_string).collect();
        println!(
            "Selected periods: {}",
            ui::style_text(&list.join(", "), ui::StyleType::TotalLabel)
        );
    }
}
