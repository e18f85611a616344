use chrono::NaiveTime;

use crate::error::{AppError, AppResult};

/// Pickup/return slots offered by the booking form, 08:00 to 18:00.
pub fn time_slots() -> Vec<String> {
    (16..=36)
        .map(|half_hours| format!("{:02}:{:02}", half_hours / 2, (half_hours % 2) * 30))
        .collect()
}

pub const DEFAULT_TIME_SLOT: &str = "10:00";

pub fn validate_time_slot(slot: &str) -> AppResult<NaiveTime> {
    let time = NaiveTime::parse_from_str(slot, "%H:%M")
        .map_err(|_| AppError::validation(format!("Invalid time: {}", slot)))?;
    if !time_slots().iter().any(|s| s == slot) {
        return Err(AppError::validation("Please pick a time between 08:00 and 18:00"));
    }
    Ok(time)
}

/// Loose shape check; the server does the real validation.
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && domain.contains('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}

pub fn passwords_match(password: &str, confirm: &str) -> AppResult<()> {
    if password != confirm {
        return Err(AppError::validation("Passwords don't match"));
    }
    Ok(())
}

pub fn require_non_empty(value: &str, message: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::validation(message));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_slots_cover_business_hours() {
        let slots = time_slots();
        assert_eq!(slots.first().map(String::as_str), Some("08:00"));
        assert_eq!(slots.last().map(String::as_str), Some("18:00"));
        assert_eq!(slots.len(), 21);
        assert!(validate_time_slot("10:30").is_ok());
        assert!(validate_time_slot("18:30").is_err());
        assert!(validate_time_slot("noon").is_err());
    }

    #[test]
    fn test_email_and_passwords() {
        assert!(is_valid_email("rider@example.com"));
        assert!(!is_valid_email("rider@example"));
        assert!(!is_valid_email("@example.com"));
        assert_eq!(
            passwords_match("secret1", "secret2").unwrap_err().to_string(),
            "Passwords don't match"
        );
    }
}
