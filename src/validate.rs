//! Local input checks run before any network call.

use crate::error::AuthError;

pub const INVITE_CODE_LEN: usize = 8;
pub const MIN_NAME_LEN: usize = 2;

/// Nigerian mobile number: `+234` or `0`, then `[789][01]` and eight digits.
#[must_use]
pub fn is_valid_phone(raw: &str) -> bool {
    let compact: String = raw.chars().filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '.')).collect();
    let Some(rest) = compact.strip_prefix("+234").or_else(|| compact.strip_prefix('0')) else {
        return false;
    };
    let bytes = rest.as_bytes();
    bytes.len() == 10
        && matches!(bytes[0], b'7'..=b'9')
        && matches!(bytes[1], b'0' | b'1')
        && bytes[2..].iter().all(u8::is_ascii_digit)
}

/// Uppercase and check an invite code.
///
/// # Errors
///
/// `Validation` unless the code is exactly eight letters or digits.
pub fn invite_code(raw: &str) -> Result<String, AuthError> {
    let code = raw.trim().to_ascii_uppercase();
    if code.len() != INVITE_CODE_LEN || !code.bytes().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit()) {
        return Err(AuthError::Validation("invite code must be 8 letters or digits"));
    }
    Ok(code)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameField {
    First,
    Last,
}

impl NameField {
    fn too_short(self) -> &'static str {
        match self {
            Self::First => "first name must be at least 2 characters",
            Self::Last => "last name must be at least 2 characters",
        }
    }
}

/// Trim and check a first or last name.
///
/// # Errors
///
/// `Validation` for names shorter than two characters or containing
/// anything other than ASCII letters, whitespace and hyphens.
pub fn name(raw: &str, field: NameField) -> Result<String, AuthError> {
    let name = raw.trim();
    if name.chars().count() < MIN_NAME_LEN {
        return Err(AuthError::Validation(field.too_short()));
    }
    if !name.chars().all(|c| c.is_ascii_alphabetic() || c.is_whitespace() || c == '-') {
        return Err(AuthError::Validation("names may contain only letters, spaces and hyphens"));
    }
    Ok(name.to_owned())
}
