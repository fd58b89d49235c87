/// Parses a C integer literal as written in the SDK headers: decimal or hex,
/// optionally negated, parenthesised or carrying `u`/`l` suffixes.
pub fn parse_integer(repr: &str) -> Option<i64> {
    let mut text = repr.trim();
    while text.starts_with('(') && text.ends_with(')') {
        text = text[1..text.len() - 1].trim();
    }
    let (negative, text) = match text.strip_prefix('-') {
        Some(rest) => (true, rest.trim()),
        None => (false, text),
    };
    let text = text.trim_end_matches(|c| matches!(c, 'u' | 'U' | 'l' | 'L'));
    let value = if let Some(hex) = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
    {
        u64::from_str_radix(hex, 16).ok()? as i64
    } else {
        text.parse::<i64>().ok()?
    };
    if negative {
        value.checked_neg()
    } else {
        Some(value)
    }
}

/// Parses a C floating literal such as `1.5f`.
pub fn parse_float(repr: &str) -> Option<f64> {
    let text = repr.trim().trim_end_matches(|c| matches!(c, 'f' | 'F'));
    if !text.contains('.') {
        return None;
    }
    text.parse::<f64>().ok()
}

/// Unquotes a C string literal, returning `None` for anything else.
pub fn parse_string(repr: &str) -> Option<String> {
    let text = repr.trim();
    if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
        Some(text[1..text.len() - 1].replace("\\\"", "\""))
    } else {
        None
    }
}
