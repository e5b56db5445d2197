//! Input checks shared by the services.

use crate::error::{AppError, AppResult};
use crate::models::TimeWindow;

/// Trimmed, non-empty text.
pub fn require_text(value: &str, field: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::validation(format!("{} is required", field)));
    }
    Ok(())
}

/// A loose shape check: one `@`, something before it and a dotted domain
/// after it, no whitespace.
pub fn validate_email(email: &str) -> AppResult<()> {
    let email = email.trim();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(AppError::validation(format!("Invalid email address: {}", email)));
    }
    Ok(())
}

pub fn validate_optional_email(email: Option<&str>) -> AppResult<()> {
    match email {
        Some(e) if !e.trim().is_empty() => validate_email(e),
        _ => Ok(()),
    }
}

/// Lowercase letters, digits and single hyphens, 2 to 63 characters.
pub fn validate_slug(slug: &str) -> AppResult<()> {
    let ok = (2..=63).contains(&slug.len())
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && !slug.contains("--");
    if !ok {
        return Err(AppError::validation(format!(
            "Invalid slug '{}': use 2-63 lowercase letters, digits or hyphens",
            slug
        )));
    }
    Ok(())
}

pub fn non_negative(value: f64, field: &str) -> AppResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(AppError::validation(format!("{} must be zero or positive", field)));
    }
    Ok(())
}

pub fn positive(value: i32, field: &str) -> AppResult<()> {
    if value < 1 {
        return Err(AppError::validation(format!("{} must be at least 1", field)));
    }
    Ok(())
}

/// A window whose start is strictly before its end.
pub fn window(
    start: chrono::DateTime<chrono::Utc>,
    end: chrono::DateTime<chrono::Utc>,
) -> AppResult<TimeWindow> {
    TimeWindow::new(start, end)
        .ok_or_else(|| AppError::validation("End date must be after start date"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_shapes() {
        assert!(validate_email("owner@happytails.com").is_ok());
        assert!(validate_email("no-at-sign.com").is_err());
        assert!(validate_email("a@b").is_err());
        assert!(validate_email("a b@c.com").is_err());
        assert!(validate_optional_email(None).is_ok());
        assert!(validate_optional_email(Some("")).is_ok());
    }

    #[test]
    fn test_slug_rules() {
        assert!(validate_slug("happy-tails-2").is_ok());
        assert!(validate_slug("Happy").is_err());
        assert!(validate_slug("-edge").is_err());
        assert!(validate_slug("a--b").is_err());
        assert!(validate_slug("x").is_err());
    }

    #[test]
    fn test_numbers() {
        assert!(non_negative(0.0, "price").is_ok());
        assert!(non_negative(-0.01, "price").is_err());
        assert!(non_negative(f64::NAN, "price").is_err());
        assert!(positive(0, "quantity").is_err());
    }
}
