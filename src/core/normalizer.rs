//! Turns raw delimited feed exports into canonical transactions.

use crate::core::amount::parse_amount;
use crate::core::transaction::{
    CREDIT_CARD_SOURCE, DEFAULT_CATEGORY, Transaction, TransactionType,
};
use csv::StringRecord;
use regex::Regex;
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::{debug, trace};

/// Settlement rows on the credit card statement ("Pagamento recebido").
static SETTLEMENT_ROW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)pagamento recebido").expect("valid settlement pattern"));

/// Normalizes a feed export for `source` into transactions, in file order.
///
/// Rows that cannot be read (bad amount, missing date or description, fewer than
/// three columns) are dropped. Fields are split on the delimiter as is, quotes
/// included; `clean_field` strips one surrounding pair afterwards.
pub fn normalize_feed(text: &str, source: &str) -> Vec<Transaction> {
    let Some(first) = text.lines().find(|l| !l.trim().is_empty()) else {
        return Vec::new();
    };
    let delimiter = if first.contains(';') { b';' } else { b',' };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(text.as_bytes());
    let records: Vec<StringRecord> = reader
        .records()
        .filter_map(|record| match record {
            Ok(record) => Some(record),
            Err(e) => {
                trace!(error = %e, "Skipping unreadable row");
                None
            }
        })
        .filter(|record| record.iter().any(|f| !f.trim().is_empty()))
        .collect();
    let Some(first) = records.first() else {
        return Vec::new();
    };

    let has_header = first
        .get(1)
        .map(clean_field)
        .and_then(parse_amount)
        .is_none();
    let body = if has_header { &records[1..] } else { &records[..] };

    let is_credit = source == CREDIT_CARD_SOURCE;
    let mut ids = IdGenerator::default();
    let mut result = Vec::with_capacity(body.len());

    for record in body {
        let fields: Vec<&str> = record.iter().map(clean_field).collect();
        if fields.len() < 3 {
            trace!(?record, "Skipping short row");
            continue;
        }
        let (date, description) = (fields[0], fields[2]);
        let Some(mut amount) = parse_amount(fields[1]) else {
            trace!(?record, "Skipping row with unreadable amount");
            continue;
        };
        if date.is_empty() || description.is_empty() {
            trace!(?record, "Skipping row without date or description");
            continue;
        }
        if is_credit {
            if SETTLEMENT_ROW.is_match(description) {
                trace!(?record, "Dropping settlement row");
                continue;
            }
            amount = -amount;
            if amount.is_zero() {
                amount = Decimal::ZERO;
            }
        }

        let category = fields
            .get(3)
            .filter(|c| !c.is_empty())
            .copied()
            .unwrap_or(DEFAULT_CATEGORY);

        result.push(Transaction {
            id: ids.next(source, date, description, amount),
            date: date.to_string(),
            description: description.to_string(),
            amount,
            category: category.to_string(),
            kind: TransactionType::from_amount(amount),
            source: source.to_string(),
            manual_source_label: None,
        });
    }

    debug!(
        "Normalized {} of {} rows for source {}",
        result.len(),
        body.len(),
        source
    );
    result
}

fn clean_field(field: &str) -> &str {
    let field = field.trim();
    let field = field.strip_prefix('"').unwrap_or(field);
    let field = field.strip_suffix('"').unwrap_or(field);
    field.trim()
}

/// Content hash identity for a feed row.
pub fn content_id(source: &str, date: &str, description: &str, amount: Decimal) -> String {
    let mut hasher = Sha256::new();
    for part in [source, date, description, &amount.normalize().to_string()] {
        hasher.update(part.as_bytes());
        hasher.update([0x1f]);
    }
    let digest = hex::encode(hasher.finalize());
    format!("{source}-{}", &digest[..16])
}

/// Hands out content ids, suffixing repeats of identical rows within one feed.
#[derive(Default)]
struct IdGenerator {
    seen: HashMap<String, usize>,
}

impl IdGenerator {
    fn next(&mut self, source: &str, date: &str, description: &str, amount: Decimal) -> String {
        let base = content_id(source, date, description, amount);
        let count = self.seen.entry(base.clone()).or_insert(0);
        let id = if *count == 0 {
            base
        } else {
            format!("{base}-{count}")
        };
        *count += 1;
        id
    }
}
