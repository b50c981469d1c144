use chrono::NaiveDate;

/// Formats an amount with thousands separators, dropping the cents when the
/// value is whole: `600` → `"600"`, `1234.5` → `"1,234.50"`.
pub fn group_thousands(amount: f64) -> String {
    let negative = amount < 0.0;
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = cents / 100;
    let fraction = cents % 100;

    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, digit) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let mut out = String::new();
    if negative && (whole > 0 || fraction > 0) {
        out.push('-');
    }
    out.push_str(&grouped);
    if fraction > 0 {
        out.push_str(&format!(".{fraction:02}"));
    }
    out
}

/// Amount with the configured currency symbol: `money(600.0, "KSh")` →
/// `"KSh 600"`. An empty symbol yields the bare amount.
pub fn money(amount: f64, symbol: &str) -> String {
    let grouped = group_thousands(amount);
    let symbol = symbol.trim();
    if symbol.is_empty() {
        grouped
    } else {
        format!("{symbol} {grouped}")
    }
}

/// Reformats a stored `YYYY-MM-DD` date for display, e.g. `"2024-01-10"` →
/// `"10 Jan 2024"`. Values that do not parse pass through untouched.
pub fn display_date(raw: &str) -> String {
    let raw = raw.trim();
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => date.format("%-d %b %Y").to_string(),
        Err(_) => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_thousands() {
        assert_eq!(group_thousands(600.0), "600");
        assert_eq!(group_thousands(1000.0), "1,000");
        assert_eq!(group_thousands(1234567.0), "1,234,567");
        assert_eq!(group_thousands(1234.5), "1,234.50");
        assert_eq!(group_thousands(0.0), "0");
        assert_eq!(group_thousands(-2500.0), "-2,500");
    }

    #[test]
    fn money_joins_symbol_and_amount() {
        assert_eq!(money(600.0, "KSh"), "KSh 600");
        assert_eq!(money(1000.0, ""), "1,000");
        assert_eq!(money(99.99, "$"), "$ 99.99");
    }

    #[test]
    fn reformats_iso_dates() {
        assert_eq!(display_date("2024-01-10"), "10 Jan 2024");
        assert_eq!(display_date(" 2025-12-01 "), "1 Dec 2025");
    }

    #[test]
    fn bad_dates_pass_through() {
        assert_eq!(display_date("next week"), "next week");
        assert_eq!(display_date(""), "");
    }
}
