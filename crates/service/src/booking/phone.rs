use once_cell::sync::Lazy;
use regex::Regex;

static PHONE_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[+]?[\d\s\-()]+$").expect("phone regex"));

/// Normalise a Russian phone number to `+7(XXX) XXX-XX-XX`.
///
/// ```
/// use service::booking::phone::normalize_phone;
/// assert_eq!(normalize_phone("8 999 123 45 67").unwrap(), "+7(999) 123-45-67");
/// ```
pub fn normalize_phone(raw: &str) -> Result<String, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err("phone required".into());
    }
    if !PHONE_CHARS.is_match(raw) {
        return Err("phone may contain only digits, spaces, +, - and parentheses".into());
    }
    let mut digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.len() == 10 {
        digits.insert(0, '7');
    }
    if digits.len() != 11 {
        return Err("phone must have 10 or 11 digits".into());
    }
    if digits.starts_with('8') {
        digits.replace_range(0..1, "7");
    }
    if !digits.starts_with('7') {
        return Err("phone must be a +7 number".into());
    }
    Ok(format!("+7({}) {}-{}-{}", &digits[1..4], &digits[4..7], &digits[7..9], &digits[9..11]))
}

#[cfg(test)]
mod tests {
    use super::normalize_phone;

    #[test]
    fn accepts_common_spellings() {
        for raw in ["+7 (999) 123-45-67", "89991234567", "9991234567", "+7(999) 123-45-67"] {
            assert_eq!(normalize_phone(raw).as_deref(), Ok("+7(999) 123-45-67"), "{raw}");
        }
    }

    #[test]
    fn rejects_letters_and_wrong_lengths() {
        assert!(normalize_phone("call me").is_err());
        assert!(normalize_phone("12345").is_err());
        assert!(normalize_phone("+1 999 123 45 67").is_err());
        assert!(normalize_phone("   ").is_err());
    }
}
