//! Whole-unit amount formatting with `.` as the thousands separator.

use crate::error::CoercionError;

pub const CURRENCY_SYMBOL: char = '$';
const GROUP_SEPARATOR: char = '.';

/// Format `value` with thousands grouping: `1234567` -> `"1.234.567"`, `-2500` -> `"-2.500"`.
pub fn format(value: impl Into<i128>) -> String {
    let value: i128 = value.into();
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    let lead = digits.len() % 3;
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (i + 3 - lead) % 3 == 0 {
            out.push(GROUP_SEPARATOR);
        }
        out.push(ch);
    }
    out
}

/// Format a floating amount, truncating toward zero.
pub fn format_f64(value: f64) -> Result<String, CoercionError> {
    truncate_f64(value)
        .map(format)
        .ok_or_else(|| CoercionError {
            input: value.to_string(),
        })
}

fn truncate_f64(value: f64) -> Option<i64> {
    if !value.is_finite() {
        return None;
    }
    let t = value.trunc();
    // i64::MAX is not representable in f64; the bound is the next power of two.
    if t < -9.223_372_036_854_775_808e18 || t >= 9.223_372_036_854_775_808e18 {
        return None;
    }
    Some(t as i64)
}

/// Read a user- or document-supplied amount.
///
/// Accepts `1234`, `1.234`, `$1.234`, `-2.500`, and decimal input such as
/// `12.5` or `12,75` (truncated toward zero).
pub fn coerce(input: &str) -> Result<i64, CoercionError> {
    let fail = || CoercionError {
        input: input.to_string(),
    };
    let trimmed = input.trim();
    let (negative, rest) = match trimmed.strip_prefix('-') {
        Some(r) => (true, r),
        None => (false, trimmed),
    };
    let rest = rest.strip_prefix(CURRENCY_SYMBOL).unwrap_or(rest);
    let (negative, rest) = match rest.strip_prefix('-') {
        Some(r) if !negative => (true, r),
        Some(_) => return Err(fail()),
        None => (negative, rest),
    };

    let whole = if let Some(grouped) = parse_grouped_digits(rest) {
        grouped
    } else {
        let normalized = rest.replace(',', ".");
        let value: f64 = normalized.parse().map_err(|_| fail())?;
        if value.is_sign_negative() {
            return Err(fail());
        }
        truncate_f64(value).ok_or_else(fail)?
    };
    Ok(if negative { -whole } else { whole })
}

/// Format arbitrary input, falling back to `"0"` when it is not an amount.
pub fn format_lenient(input: &str) -> String {
    match coerce(input) {
        Ok(v) => format(v),
        Err(e) => {
            log::debug!("format_lenient: {e}; using 0");
            "0".to_string()
        }
    }
}

/// Cell text for an amount: `"$1.234"`.
pub fn money(value: impl Into<i128>) -> String {
    format!("{CURRENCY_SYMBOL}{}", format(value))
}

/// Inverse of [`money`] / [`format`]. Returns `None` unless `token` is a well-formed grouped amount.
pub fn parse_grouped(token: &str) -> Option<i64> {
    let token = token.trim();
    let token = token.strip_prefix(CURRENCY_SYMBOL).unwrap_or(token);
    let (negative, digits) = match token.strip_prefix('-') {
        Some(r) => (true, r),
        None => (false, token),
    };
    let value = parse_grouped_digits(digits)?;
    Some(if negative { -value } else { value })
}

/// Digits in groups of three separated by `.`; the first group holds 1-3 digits.
fn parse_grouped_digits(s: &str) -> Option<i64> {
    let mut groups = s.split(GROUP_SEPARATOR);
    let first = groups.next()?;
    if first.is_empty() || (first.len() > 3 && s.contains(GROUP_SEPARATOR)) {
        return None;
    }
    if !first.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let mut value: i64 = first.parse().ok()?;
    for group in groups {
        if group.len() != 3 || !group.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        value = value.checked_mul(1000)?.checked_add(group.parse::<i64>().ok()?)?;
    }
    Some(value)
}
