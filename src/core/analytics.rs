//! Summary statistics and windowed breakdowns over a set of active transactions.
use crate::core::config::SourceCatalog;
use crate::core::transaction::{CREDIT_CARD_SOURCE, PeriodKey, Transaction};
use anyhow::{Result, anyhow};
use chrono::{Days, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;
use tracing::debug;

/// Breakdown bucket of a transaction's source. `Other` counts towards the grand
/// totals only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceBucket {
    Pix,
    Credit,
    Other,
}

pub fn classify(t: &Transaction) -> SourceBucket {
    if t.source == CREDIT_CARD_SOURCE {
        return SourceBucket::Credit;
    }
    let manual_pix = t.is_manual()
        && t
            .manual_source_label
            .as_deref()
            .is_some_and(|label| label.to_lowercase().contains("pix"));
    if t.source.contains("pix") || manual_pix {
        SourceBucket::Pix
    } else {
        SourceBucket::Other
    }
}

/// Income, expense and balance totals, overall and for the pix and credit
/// buckets. Expenses are absolute values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub income_total: Decimal,
    pub income_pix: Decimal,
    pub income_credit: Decimal,
    pub expenses_total: Decimal,
    pub expenses_pix: Decimal,
    pub expenses_credit: Decimal,
    pub balance: Decimal,
    pub balance_pix: Decimal,
    pub balance_credit: Decimal,
}

pub fn summarize(transactions: &[Transaction]) -> Summary {
    let mut summary = Summary::default();

    for t in transactions {
        let bucket = classify(t);
        if t.is_income() {
            summary.income_total += t.amount;
            match bucket {
                SourceBucket::Pix => summary.income_pix += t.amount,
                SourceBucket::Credit => summary.income_credit += t.amount,
                SourceBucket::Other => {}
            }
        } else {
            let spent = t.amount.abs();
            summary.expenses_total += spent;
            match bucket {
                SourceBucket::Pix => summary.expenses_pix += spent,
                SourceBucket::Credit => summary.expenses_credit += spent,
                SourceBucket::Other => {}
            }
        }
    }

    summary.balance = summary.income_total - summary.expenses_total;
    summary.balance_pix = summary.income_pix - summary.expenses_pix;
    summary.balance_credit = summary.income_credit - summary.expenses_credit;
    debug!("Summarized {} transactions", transactions.len());
    summary
}

/// Date window applied before the breakdowns are computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeWindow {
    #[default]
    All,
    Today,
    /// From `today - days`, inclusive, with no upper bound.
    Trailing(u64),
    /// Inclusive on both ends. Passes everything when either end is missing.
    Custom {
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    },
}

impl TimeWindow {
    pub fn contains(&self, t: &Transaction, today: NaiveDate) -> bool {
        let date = t.calendar_date();
        match *self {
            TimeWindow::All => true,
            TimeWindow::Today => date == Some(today),
            TimeWindow::Trailing(days) => {
                let Some(limit) = today.checked_sub_days(Days::new(days)) else {
                    return true;
                };
                date.is_some_and(|d| d >= limit)
            }
            TimeWindow::Custom {
                start: Some(start),
                end: Some(end),
            } => date.is_some_and(|d| d >= start && d <= end),
            TimeWindow::Custom { .. } => true,
        }
    }

    pub fn apply(&self, transactions: &[Transaction], today: NaiveDate) -> Vec<Transaction> {
        transactions
            .iter()
            .filter(|t| self.contains(t, today))
            .cloned()
            .collect()
    }
}

impl Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeWindow::All => write!(f, "all"),
            TimeWindow::Today => write!(f, "today"),
            TimeWindow::Trailing(days) => write!(f, "{days}d"),
            TimeWindow::Custom { start, end } => {
                let show = |d: &Option<NaiveDate>| {
                    d.map_or("..".to_string(), |d| d.format("%Y-%m-%d").to_string())
                };
                write!(f, "{} to {}", show(start), show(end))
            }
        }
    }
}

impl FromStr for TimeWindow {
    type Err = anyhow::Error;

    /// Parses `all`, `today`, `custom` or a trailing window such as `7d`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(TimeWindow::All),
            "today" => Ok(TimeWindow::Today),
            "custom" => Ok(TimeWindow::Custom {
                start: None,
                end: None,
            }),
            other => other
                .strip_suffix('d')
                .and_then(|days| days.parse().ok())
                .map(TimeWindow::Trailing)
                .ok_or_else(|| anyhow!("Invalid time window: {}", s)),
        }
    }
}

/// Display label of a transaction's source: the free text label of manual
/// entries when set, the catalog label otherwise.
pub fn source_label<'a>(t: &'a Transaction, catalog: &'a SourceCatalog) -> &'a str {
    match t.manual_source_label.as_deref() {
        Some(label) if t.is_manual() && !label.is_empty() => label,
        _ => catalog.label(&t.source),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakdownEntry {
    pub label: String,
    pub value: Decimal,
    /// Rounded percentage of the breakdown total.
    pub share: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Breakdown {
    pub entries: Vec<BreakdownEntry>,
    pub total: Decimal,
}

impl Breakdown {
    fn from_groups(groups: BTreeMap<&str, Decimal>) -> Self {
        let total: Decimal = groups.values().copied().sum();
        let mut entries: Vec<BreakdownEntry> = groups
            .into_iter()
            .map(|(label, value)| BreakdownEntry {
                label: label.to_string(),
                value,
                share: share_of(value, total),
            })
            .collect();
        entries.sort_by(|a, b| b.value.cmp(&a.value));
        Breakdown { entries, total }
    }
}

fn share_of(value: Decimal, total: Decimal) -> u32 {
    if total.is_zero() {
        return 0;
    }
    (value / total * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u32()
        .unwrap_or(0)
}

/// Absolute expense totals per source label.
pub fn expenses_by_source(transactions: &[Transaction], catalog: &SourceCatalog) -> Breakdown {
    let mut groups: BTreeMap<&str, Decimal> = BTreeMap::new();
    for t in transactions.iter().filter(|t| t.is_expense()) {
        *groups.entry(source_label(t, catalog)).or_default() += t.amount.abs();
    }
    Breakdown::from_groups(groups)
}

/// Net balance per source label. Only labels with a positive balance are kept.
pub fn balance_by_source(transactions: &[Transaction], catalog: &SourceCatalog) -> Breakdown {
    let mut groups: BTreeMap<&str, Decimal> = BTreeMap::new();
    for t in transactions {
        *groups.entry(source_label(t, catalog)).or_default() += t.amount;
    }
    groups.retain(|_, value| *value > Decimal::ZERO);
    Breakdown::from_groups(groups)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthlyPoint {
    pub period: PeriodKey,
    pub income: Decimal,
    pub expense: Decimal,
    pub balance: Decimal,
}

impl MonthlyPoint {
    /// `MM/YYYY` label of the bucket.
    pub fn label(&self) -> String {
        format!("{:02}/{:04}", self.period.month(), self.period.year())
    }
}

/// Income, expense and balance per month, oldest month first. Transactions with
/// an unreadable date are left out.
pub fn monthly_evolution(transactions: &[Transaction]) -> Vec<MonthlyPoint> {
    let mut months: BTreeMap<PeriodKey, (Decimal, Decimal)> = BTreeMap::new();
    for t in transactions {
        let Some(date) = t.calendar_date() else {
            debug!("Leaving {} out of the evolution, bad date {}", t.id, t.date);
            continue;
        };
        let (income, expense) = months.entry(PeriodKey::from_date(date)).or_default();
        if t.is_income() {
            *income += t.amount;
        } else {
            *expense += t.amount.abs();
        }
    }

    months
        .into_iter()
        .map(|(period, (income, expense))| MonthlyPoint {
            period,
            income,
            expense,
            balance: income - expense,
        })
        .collect()
}

/// Everything the charts view needs for one window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowReport {
    pub window: TimeWindow,
    pub transactions: usize,
    pub expenses: Breakdown,
    pub balances: Breakdown,
    pub evolution: Vec<MonthlyPoint>,
}

pub fn window_report(
    transactions: &[Transaction],
    window: TimeWindow,
    today: NaiveDate,
    catalog: &SourceCatalog,
) -> WindowReport {
    let windowed = window.apply(transactions, today);
    WindowReport {
        window,
        transactions: windowed.len(),
        expenses: expenses_by_source(&windowed, catalog),
        balances: balance_by_source(&windowed, catalog),
        evolution: monthly_evolution(&windowed),
    }
}
