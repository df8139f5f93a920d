//! Canonical transaction record and the keys used to bucket it.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::Display;
use std::str::FromStr;
use thiserror::Error;

/// Source key of the credit card feed. Rows from it carry their own sign rules.
pub const CREDIT_CARD_SOURCE: &str = "nubank_cc";

/// Pseudo source key of manually entered transactions. Never fetched.
pub const MANUAL_SOURCE: &str = "manual";

/// Category assigned when a feed row carries none.
pub const DEFAULT_CATEGORY: &str = "Geral";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Income,
    Expense,
}

impl TransactionType {
    /// Zero counts as income.
    pub fn from_amount(amount: Decimal) -> Self {
        if amount.is_sign_negative() && !amount.is_zero() {
            TransactionType::Expense
        } else {
            TransactionType::Income
        }
    }
}

impl Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionType::Income => write!(f, "income"),
            TransactionType::Expense => write!(f, "expense"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    /// `DD/MM/YYYY`, as written by the feeds.
    pub date: String,
    pub description: String,
    pub amount: Decimal,
    pub category: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual_source_label: Option<String>,
}

impl Transaction {
    pub fn is_income(&self) -> bool {
        self.kind == TransactionType::Income
    }

    pub fn is_expense(&self) -> bool {
        self.kind == TransactionType::Expense
    }

    pub fn is_manual(&self) -> bool {
        self.source == MANUAL_SOURCE
    }

    /// Calendar date of the transaction, if the text is a valid `DD/MM/YYYY`.
    pub fn calendar_date(&self) -> Option<NaiveDate> {
        parse_feed_date(&self.date)
    }
}

/// Parses a `DD/MM/YYYY` date. Single digit day and month are accepted.
pub fn parse_feed_date(text: &str) -> Option<NaiveDate> {
    let mut parts = text.trim().split('/');
    let day: u32 = parts.next()?.trim().parse().ok()?;
    let month: u32 = parts.next()?.trim().parse().ok()?;
    let year: i32 = parts.next()?.trim().parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Formats a date the way the feeds write it.
pub fn format_feed_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PeriodKeyError {
    #[error("Invalid period '{0}', expected YYYY-MM")]
    Format(String),
    #[error("Invalid month in period '{0}'")]
    Month(String),
}

/// A year-month bucket, rendered as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeriodKey {
    year: i32,
    month: u32,
}

impl PeriodKey {
    pub fn new(year: i32, month: u32) -> Result<Self, PeriodKeyError> {
        if !(1..=12).contains(&month) {
            return Err(PeriodKeyError::Month(format!("{year:04}-{month:02}")));
        }
        Ok(Self { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }
}

impl Display for PeriodKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for PeriodKey {
    type Err = PeriodKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (year, month) = s
            .split_once('-')
            .ok_or_else(|| PeriodKeyError::Format(s.to_string()))?;
        if year.len() != 4 || month.len() != 2 {
            return Err(PeriodKeyError::Format(s.to_string()));
        }
        let year: i32 = year
            .parse()
            .map_err(|_| PeriodKeyError::Format(s.to_string()))?;
        let month: u32 = month
            .parse()
            .map_err(|_| PeriodKeyError::Format(s.to_string()))?;
        PeriodKey::new(year, month)
    }
}

impl Serialize for PeriodKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PeriodKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    #[test]
    fn test_type_follows_sign() {
        assert_eq!(TransactionType::from_amount(dec!(10)), TransactionType::Income);
        assert_eq!(TransactionType::from_amount(dec!(0)), TransactionType::Income);
        assert_eq!(TransactionType::from_amount(dec!(-0.01)), TransactionType::Expense);
    }

    #[test]
    fn test_parse_feed_date() {
        assert_eq!(
            parse_feed_date("05/02/2024"),
            NaiveDate::from_ymd_opt(2024, 2, 5)
        );
        assert_eq!(parse_feed_date("5/2/2024"), NaiveDate::from_ymd_opt(2024, 2, 5));
        assert_eq!(parse_feed_date("31/02/2024"), None);
        assert_eq!(parse_feed_date("2024-02-05"), None);
        assert_eq!(parse_feed_date(""), None);
    }

    #[test]
    fn test_period_key_parse_and_display() {
        let key: PeriodKey = "2024-03".parse().unwrap();
        assert_eq!(key.year(), 2024);
        assert_eq!(key.month(), 3);
        assert_eq!(key.to_string(), "2024-03");

        assert!("2024-3".parse::<PeriodKey>().is_err());
        assert!("2024-13".parse::<PeriodKey>().is_err());
        assert!("march".parse::<PeriodKey>().is_err());
    }

    #[test]
    fn test_period_key_orders_chronologically() {
        let mut keys: Vec<PeriodKey> = ["2025-01", "2024-12", "2024-02"]
            .iter()
            .map(|k| k.parse().unwrap())
            .collect();
        keys.sort();
        let rendered: Vec<String> = keys.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["2024-02", "2024-12", "2025-01"]);
    }

    #[test]
    fn test_period_key_as_json_map_key() {
        let mut map = BTreeMap::new();
        map.insert(PeriodKey::new(2024, 1).unwrap(), 1);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"2024-01":1}"#);
        let back: BTreeMap<PeriodKey, i32> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }

    #[test]
    fn test_transaction_json_field_names() {
        let tx = Transaction {
            id: "manual-1".to_string(),
            date: "10/01/2024".to_string(),
            description: "Coffee".to_string(),
            amount: dec!(-4.50),
            category: DEFAULT_CATEGORY.to_string(),
            kind: TransactionType::Expense,
            source: MANUAL_SOURCE.to_string(),
            manual_source_label: Some("Pix PF".to_string()),
        };
        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["type"], "expense");
        assert_eq!(json["manualSourceLabel"], "Pix PF");

        let legacy = r#"{"id":"a","date":"01/01/2024","description":"x","amount":12.5,
            "category":"Geral","type":"income","source":"nubank_pf_pix"}"#;
        let parsed: Transaction = serde_json::from_str(legacy).unwrap();
        assert_eq!(parsed.amount, dec!(12.5));
        assert!(parsed.manual_source_label.is_none());
    }
}
