//! Cell normalization shared by all providers.
//!
//! Numbers are rounded half-up (away from zero) to two decimals, dates are
//! rendered as `YYYY-MM-DD`, and columns are addressed by bracket tokens
//! built from spreadsheet column letters.

use std::str::FromStr;

use calamine::Data;
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::value::Value;

/// Decimal places kept for numeric cells
pub const DECIMAL_PLACES: u32 = 2;

/// Date format for date cells
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Spreadsheet column letters for a 0-based index (0 = `A`, 26 = `AA`)
pub fn column_letters(index: usize) -> String {
    let mut letters = Vec::new();
    let mut n = index + 1;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

/// Bracket token for a 0-based column index, e.g. `[A]`
pub fn column_token(index: usize) -> String {
    format!("[{}]", column_letters(index))
}

/// Round half-up to [`DECIMAL_PLACES`]
pub fn round_decimal(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Round a float through its shortest decimal representation
///
/// `2.675_f64` is stored as 2.67499999..., but it displays as `2.675` and
/// rounds to `2.68`, which is what a spreadsheet user expects.
pub fn round_float(value: f64) -> Option<Decimal> {
    if !value.is_finite() {
        return None;
    }
    Decimal::from_str(&value.to_string())
        .ok()
        .or_else(|| Decimal::from_f64(value))
        .map(round_decimal)
}

fn float_value(value: f64) -> Value {
    match round_float(value) {
        Some(number) => Value::Number(number),
        None => Value::Text(value.to_string()),
    }
}

/// Normalize a calamine cell
pub fn normalize_cell(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Blank,
        Data::String(s) if s.is_empty() => Value::Blank,
        Data::String(s) => Value::Text(s.clone()),
        Data::Int(i) => Value::Number(Decimal::from(*i)),
        Data::Float(f) => float_value(*f),
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(datetime) => Value::Text(datetime.format(DATE_FORMAT).to_string()),
            None => float_value(dt.as_f64()),
        },
        Data::DateTimeIso(s) => Value::Text(normalize_iso_date(s)),
        Data::DurationIso(s) => Value::Text(s.clone()),
        Data::Error(e) => Value::Text(e.to_string()),
    }
}

fn normalize_iso_date(s: &str) -> String {
    if let Ok(datetime) = NaiveDateTime::from_str(s) {
        return datetime.format(DATE_FORMAT).to_string();
    }
    if let Ok(date) = NaiveDate::from_str(s) {
        return date.format(DATE_FORMAT).to_string();
    }
    s.to_string()
}

/// Normalize a text field from a delimited file
///
/// Numeric-looking fields become numbers, except codes with a leading zero
/// such as `007`, which stay text.
pub fn normalize_text_field(field: &str) -> Value {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        return Value::Blank;
    }
    if looks_like_code(trimmed) {
        return Value::Text(trimmed.to_string());
    }
    match Decimal::from_str(trimmed).or_else(|_| Decimal::from_scientific(trimmed)) {
        Ok(number) => Value::Number(round_decimal(number)),
        Err(_) => Value::Text(trimmed.to_string()),
    }
}

fn looks_like_code(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    let mut chars = digits.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some('0'), Some(c)) if c.is_ascii_digit()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn number(s: &str) -> Value {
        Value::Number(Decimal::from_str(s).unwrap())
    }

    #[test]
    fn test_column_letters() {
        assert_eq!(column_letters(0), "A");
        assert_eq!(column_letters(25), "Z");
        assert_eq!(column_letters(26), "AA");
        assert_eq!(column_letters(27), "AB");
        assert_eq!(column_letters(51), "AZ");
        assert_eq!(column_letters(52), "BA");
        assert_eq!(column_letters(701), "ZZ");
        assert_eq!(column_letters(702), "AAA");
        assert_eq!(column_token(1), "[B]");
    }

    #[test]
    fn test_round_half_up() {
        assert_eq!(round_float(2.675), Some(Decimal::from_str("2.68").unwrap()));
        assert_eq!(round_float(1.005), Some(Decimal::from_str("1.01").unwrap()));
        assert_eq!(round_float(-1.005), Some(Decimal::from_str("-1.01").unwrap()));
        assert_eq!(round_float(3.14159), Some(Decimal::from_str("3.14").unwrap()));
        assert_eq!(round_float(f64::NAN), None);
    }

    #[test]
    fn test_normalize_cell() {
        assert_eq!(normalize_cell(&Data::Empty), Value::Blank);
        assert_eq!(normalize_cell(&Data::String(String::new())), Value::Blank);
        assert_eq!(
            normalize_cell(&Data::String("hi".to_string())),
            Value::Text("hi".to_string())
        );
        assert_eq!(normalize_cell(&Data::Int(7)), number("7"));
        assert_eq!(normalize_cell(&Data::Float(95.555)), number("95.56"));
        assert_eq!(normalize_cell(&Data::Bool(false)), Value::Bool(false));
        assert_eq!(
            normalize_cell(&Data::DateTimeIso("2024-03-05T10:30:00".to_string())),
            Value::Text("2024-03-05".to_string())
        );
    }

    #[test]
    fn test_normalize_text_field() {
        assert_eq!(normalize_text_field(""), Value::Blank);
        assert_eq!(normalize_text_field("  "), Value::Blank);
        assert_eq!(normalize_text_field("12.345"), number("12.35"));
        assert_eq!(normalize_text_field("-4"), number("-4"));
        assert_eq!(normalize_text_field("007"), Value::Text("007".to_string()));
        assert_eq!(normalize_text_field("0.5"), number("0.5"));
        assert_eq!(normalize_text_field("Alice"), Value::Text("Alice".to_string()));
    }
}
