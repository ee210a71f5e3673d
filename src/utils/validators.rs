use once_cell::sync::Lazy;
use regex::Regex;

static PHONE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+?[0-9]{9,15}$").unwrap());

pub fn validate_phone(phone: &str) -> bool {
    PHONE_REGEX.is_match(&normalize_phone(phone))
}

/// Strips spaces, dots and dashes that people type into phone numbers.
pub fn normalize_phone(phone: &str) -> String {
    phone
        .trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '.' | '-' | '(' | ')'))
        .collect()
}

/// Trims the value and treats an empty result as absent.
pub fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone("0901234567"));
        assert!(validate_phone("+84 901 234 567"));
        assert!(validate_phone("090-123-4567"));
        assert!(!validate_phone("12345"));
        assert!(!validate_phone("09012abc67"));
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(Some("  a@b.c ")), Some("a@b.c"));
        assert_eq!(non_empty(Some("   ")), None);
        assert_eq!(non_empty(None), None);
    }
}
