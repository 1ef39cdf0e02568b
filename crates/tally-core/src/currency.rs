//! Currency display helpers

use crate::models::DEFAULT_CURRENCY;

const SYMBOLS: [(&str, &str); 10] = [
    ("USD", "$"),
    ("EUR", "€"),
    ("GBP", "£"),
    ("JPY", "¥"),
    ("CAD", "C$"),
    ("AUD", "A$"),
    ("CHF", "CHF"),
    ("CNY", "¥"),
    ("INR", "₹"),
    ("MXN", "$"),
];

/// Display symbol for a currency code; unknown codes are returned as-is
pub fn currency_symbol(code: &str) -> &str {
    SYMBOLS
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, s)| *s)
        .unwrap_or(code)
}

/// Format an amount with thousands separators and two decimals
///
/// The symbol goes before the amount, except for EUR where it follows with a
/// space.
pub fn format_currency(amount: f64, code: Option<&str>) -> String {
    let code = code.unwrap_or(DEFAULT_CURRENCY);
    let symbol = currency_symbol(code);
    let formatted = group_thousands(amount);

    if code == "EUR" {
        format!("{} {}", formatted, symbol)
    } else {
        format!("{}{}", symbol, formatted)
    }
}

fn group_thousands(amount: f64) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((&fixed, "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    // -0.001 rounds to 0.00 and prints unsigned
    let sign = if amount < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, frac_part)
}
