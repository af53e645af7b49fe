//! Display formatting for numeric listing fields

/// Compact number with B/M/K suffix, two decimals
pub fn format_compact(value: f64) -> String {
    let value = if value.is_finite() { value } else { 0.0 };
    let abs = value.abs();

    if abs >= 1e9 {
        format!("{:.2}B", value / 1e9)
    } else if abs >= 1e6 {
        format!("{:.2}M", value / 1e6)
    } else if abs >= 1e3 {
        format!("{:.2}K", value / 1e3)
    } else {
        format!("{:.2}", value)
    }
}

/// Currency amount with B/M/K suffix, e.g. `$1.23B`
pub fn format_currency(value: f64) -> String {
    format!("${}", format_compact(value))
}

/// Supply figure with the asset symbol, e.g. `19.50M BTC`
pub fn format_supply(value: f64, symbol: &str) -> String {
    format!("{} {}", format_compact(value), symbol)
}

/// Price with thousands separators
///
/// Sub-unit prices keep enough decimals to show three significant digits.
pub fn format_price(value: f64) -> String {
    let value = if value.is_finite() { value } else { 0.0 };
    let abs = value.abs();

    let decimals = if abs >= 1.0 || abs == 0.0 {
        2
    } else {
        let magnitude = (-abs.log10().floor()) as usize;
        (magnitude + 3).clamp(2, 10)
    };

    let formatted = format!("{:.*}", decimals, abs);
    let (int_part, frac_part) = formatted.split_once('.').unwrap_or((formatted.as_str(), ""));

    let mut frac = frac_part.trim_end_matches('0').to_string();
    while frac.len() < 2 {
        frac.push('0');
    }

    let sign = if value < 0.0 { "-" } else { "" };
    format!("{}${}.{}", sign, group_thousands(int_part), frac)
}

/// Percent change rounded to an integer, for display
pub fn round_percent(value: f64) -> i64 {
    if value.is_finite() {
        value.round() as i64
    } else {
        0
    }
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
