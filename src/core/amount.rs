//! Parsing of locale-ambiguous amount strings found in bank exports.

use rust_decimal::Decimal;
use std::str::FromStr;

/// Parses an amount such as `"R$ 1.234,56"`, `"1234.56"` or `"50,00"`.
///
/// Currency markers, quotes and whitespace are stripped first. When both `.` and
/// `,` are present, `.` is a thousands separator and `,` the decimal separator. A
/// lone `,` is a decimal separator. Returns `None` when the cleaned text is not a
/// number.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let clean: String = raw
        .chars()
        .filter(|c| !matches!(c, 'R' | '$' | '"') && !c.is_whitespace())
        .collect();

    let normalized = match (clean.contains('.'), clean.contains(',')) {
        (true, true) => clean.replace('.', "").replacen(',', ".", 1),
        (false, true) => clean.replacen(',', ".", 1),
        _ => clean,
    };

    if normalized.is_empty() {
        return None;
    }
    Decimal::from_str(&normalized).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_brazilian_thousands_and_decimal() {
        assert_eq!(parse_amount("1.234,56"), Some(dec!(1234.56)));
    }

    #[test]
    fn test_plain_decimal_point() {
        assert_eq!(parse_amount("1234.56"), Some(dec!(1234.56)));
    }

    #[test]
    fn test_comma_only_is_decimal_separator() {
        assert_eq!(parse_amount("50,00"), Some(dec!(50.00)));
        assert_eq!(parse_amount("-12,5"), Some(dec!(-12.5)));
    }

    #[test]
    fn test_currency_marker_and_quotes_are_stripped() {
        assert_eq!(parse_amount("R$ 10"), Some(dec!(10)));
        assert_eq!(parse_amount("\"R$ 1.000,00\""), Some(dec!(1000)));
        assert_eq!(parse_amount("  -35.90 "), Some(dec!(-35.90)));
    }

    #[test]
    fn test_non_numeric_fails() {
        assert_eq!(parse_amount("abc"), None);
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("R$"), None);
        assert_eq!(parse_amount("Valor"), None);
    }
}
