//! Price text normalization for heterogeneous marketplace exports
//!
//! Listing pages and CSV exports disagree on number formatting: some use
//! `1.234.567`, some `1,234,567`, some `1.2m`. Everything funnels through
//! here and comes out as a plain `f64`, or `None` when the text carries no
//! usable number. Parsing never errors; bad input is simply no value.

/// Parse locale-ambiguous decimal text into a canonical float.
///
/// Disambiguation rules, applied in order:
/// 1. Whitespace inside and around the value is stripped.
/// 2. Both `,` and `.` present: whichever occurs last is the decimal point,
///    the other is grouping and is removed.
/// 3. A single comma and no period: the comma is the decimal point.
/// 4. Multiple periods and no comma: periods are grouping, removed.
/// 5. Exactly one period with a three-digit fraction and a digit before it:
///    the period is grouping (coin prices are whole-unit integers, so
///    `1.234` is almost always one thousand two hundred thirty-four).
/// 6. Any remaining separators are stripped and the rest parsed as-is.
pub fn normalize_decimal(raw: &str) -> Option<f64> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return None;
    }

    let commas = compact.matches(',').count();
    let periods = compact.matches('.').count();

    let cleaned = if commas > 0 && periods > 0 {
        let decimal = if compact.rfind('.') > compact.rfind(',') {
            '.'
        } else {
            ','
        };
        let grouping = if decimal == '.' { ',' } else { '.' };
        compact
            .chars()
            .filter(|&c| c != grouping)
            .map(|c| if c == decimal { '.' } else { c })
            .collect()
    } else if commas == 1 && periods == 0 {
        compact.replace(',', ".")
    } else if periods > 1 && commas == 0 {
        compact.replace('.', "")
    } else if periods == 1 && commas == 0 && grouping_period(&compact) {
        compact.replace('.', "")
    } else {
        compact.replace(',', "")
    };

    cleaned.parse::<f64>().ok()
}

/// Rule 5: a lone period followed by exactly three digits, with at least one
/// digit in the integer part, is a thousands separator.
fn grouping_period(text: &str) -> bool {
    let idx = match text.rfind('.') {
        Some(i) => i,
        None => return false,
    };
    let (int_part, frac_part) = (&text[..idx], &text[idx + 1..]);
    frac_part.len() == 3
        && frac_part.chars().all(|c| c.is_ascii_digit())
        && int_part.chars().any(|c| c.is_ascii_digit())
}

/// Parse magnitude-suffixed coin text (`2.5k`, `1.2m`, `3b`).
///
/// The leading numeric portion goes through [`normalize_decimal`] and is
/// multiplied by the suffix magnitude. Placeholder tokens (`-`, `?`) and
/// digit-free input yield no value.
pub fn parse_coin(raw: &str) -> Option<f64> {
    let compact: String = raw.split_whitespace().collect();
    if compact.is_empty() || compact == "-" || compact == "?" {
        return None;
    }

    let start = compact.find(|c: char| c.is_ascii_digit())?;
    let rest = &compact[start..];
    let end = rest
        .find(|c: char| !c.is_ascii_digit() && c != '.' && c != ',')
        .unwrap_or(rest.len());

    let number = normalize_decimal(&rest[..end])?;
    let multiplier = match rest[end..].chars().next().map(|c| c.to_ascii_lowercase()) {
        Some('k') => 1_000.0,
        Some('m') => 1_000_000.0,
        Some('b') => 1_000_000_000.0,
        _ => 1.0,
    };

    Some(number * multiplier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixed_separators() {
        // Test: last separator wins as the decimal point
        assert_eq!(normalize_decimal("1.234,56"), Some(1234.56));
        assert_eq!(normalize_decimal("1,234.56"), Some(1234.56));
        assert_eq!(normalize_decimal("1.234.567,89"), Some(1234567.89));
        assert_eq!(normalize_decimal("1,234,567.89"), Some(1234567.89));
    }

    #[test]
    fn test_single_comma_is_decimal() {
        assert_eq!(normalize_decimal("12,5"), Some(12.5));
        assert_eq!(normalize_decimal("1,234"), Some(1.234));
    }

    #[test]
    fn test_grouping_periods() {
        // Multiple periods, no comma: grouping
        assert_eq!(normalize_decimal("1.234.567"), Some(1_234_567.0));
        // Single period, three-digit fraction: grouping
        assert_eq!(normalize_decimal("1.234"), Some(1_234.0));
        // Single period, short fraction: decimal
        assert_eq!(normalize_decimal("1.23"), Some(1.23));
        assert_eq!(normalize_decimal("2.5"), Some(2.5));
    }

    #[test]
    fn test_whitespace_and_plain() {
        assert_eq!(normalize_decimal(" 1 234 "), Some(1234.0));
        assert_eq!(normalize_decimal("42"), Some(42.0));
        assert_eq!(normalize_decimal(""), None);
        assert_eq!(normalize_decimal("   "), None);
        assert_eq!(normalize_decimal("abc"), None);
    }

    #[test]
    fn test_multiple_commas_are_grouping() {
        assert_eq!(normalize_decimal("1,234,567"), Some(1_234_567.0));
    }

    #[test]
    fn test_coin_suffixes() {
        assert_eq!(parse_coin("2.5k"), Some(2_500.0));
        assert_eq!(parse_coin("1.2m"), Some(1_200_000.0));
        assert_eq!(parse_coin("3B"), Some(3_000_000_000.0));
        assert_eq!(parse_coin("150K"), Some(150_000.0));
        assert_eq!(parse_coin("999"), Some(999.0));
    }

    #[test]
    fn test_coin_placeholders() {
        assert_eq!(parse_coin("-"), None);
        assert_eq!(parse_coin("?"), None);
        assert_eq!(parse_coin(""), None);
        assert_eq!(parse_coin("n/a"), None);
    }

    #[test]
    fn test_coin_with_grouping() {
        assert_eq!(parse_coin("1.234.567"), Some(1_234_567.0));
        assert_eq!(parse_coin("1,5m"), Some(1_500_000.0));
    }
}
