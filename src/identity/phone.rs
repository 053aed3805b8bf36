//! Phone number normalization to E.164.

#[cfg(test)]
#[path = "phone_test.rs"]
mod tests;

/// Normalize user input to E.164 using `country_code` (e.g. `+234`) as the
/// fallback for local numbers.
///
/// - leading trunk prefix `0` is replaced by the country code
/// - input without `+` gets the country code prepended
/// - spaces, dashes, dots and parentheses are dropped
///
/// Returns `None` for empty input or input containing anything other than
/// digits after cleanup. Whether the number actually exists is the
/// provider's call.
#[must_use]
pub fn normalize_phone(raw: &str, country_code: &str) -> Option<String> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '.' | '(' | ')'))
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let normalized = if let Some(local) = cleaned.strip_prefix('0') {
        format!("{country_code}{local}")
    } else if cleaned.starts_with('+') {
        cleaned
    } else {
        format!("{country_code}{cleaned}")
    };

    let digits = normalized.strip_prefix('+')?;
    if digits.len() < 2 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(normalized)
}

/// Mask all but the last four digits for logging.
#[must_use]
pub fn mask_phone(phone: &str) -> String {
    let visible = 4.min(phone.len());
    let (hidden, tail) = phone.split_at(phone.len() - visible);
    let stars = hidden.chars().filter(char::is_ascii_digit).count();
    let prefix = if hidden.starts_with('+') { "+" } else { "" };
    format!("{prefix}{}{tail}", "*".repeat(stars))
}
