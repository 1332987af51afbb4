//! Local input validation. Invalid input never reaches the network layer;
//! errors map to inline field messages.

use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

use super::{ContactInfo, DemoRequest};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Name is required")]
    MissingName,
    #[error("Email address looks invalid")]
    InvalidEmail,
    #[error("Phone number must be 7-15 digits")]
    InvalidPhone,
    #[error("Website URL is required")]
    MissingWebsiteUrl,
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"))
}

fn phone_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // Loose: digits plus common punctuation, 7-15 characters overall.
    PATTERN.get_or_init(|| Regex::new(r"^\+?[0-9()\-. ]{7,15}$").expect("valid phone regex"))
}

pub fn validate_contact(contact: &ContactInfo) -> Result<(), ValidationError> {
    if contact.name.trim().is_empty() {
        return Err(ValidationError::MissingName);
    }
    if !email_pattern().is_match(contact.email.trim()) {
        return Err(ValidationError::InvalidEmail);
    }
    let phone = contact.phone.trim();
    let digit_count = phone.chars().filter(|c| c.is_ascii_digit()).count();
    if !phone_pattern().is_match(phone) || digit_count < 7 {
        return Err(ValidationError::InvalidPhone);
    }
    Ok(())
}

pub fn validate_demo(request: &DemoRequest) -> Result<(), ValidationError> {
    if request.website_url.trim().is_empty() {
        return Err(ValidationError::MissingWebsiteUrl);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact(name: &str, email: &str, phone: &str) -> ContactInfo {
        ContactInfo {
            name: name.to_string(),
            email: email.to_string(),
            phone: phone.to_string(),
            company: None,
        }
    }

    #[test]
    fn test_valid_contact() {
        assert!(validate_contact(&contact("Asha", "a@b.com", "5551234567")).is_ok());
        assert!(validate_contact(&contact("Asha", "a@b.co.uk", "+1 (555) 123-4")).is_ok());
    }

    #[test]
    fn test_missing_name() {
        assert_eq!(
            validate_contact(&contact("  ", "a@b.com", "5551234567")),
            Err(ValidationError::MissingName)
        );
    }

    #[test]
    fn test_invalid_email() {
        for email in ["", "plain", "a@b", "a b@c.com", "a@b .com"] {
            assert_eq!(
                validate_contact(&contact("Asha", email, "5551234567")),
                Err(ValidationError::InvalidEmail),
                "email {email:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_invalid_phone() {
        for phone in ["", "123456", "abc1234567", "1234567890123456"] {
            assert_eq!(
                validate_contact(&contact("Asha", "a@b.com", phone)),
                Err(ValidationError::InvalidPhone),
                "phone {phone:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_punctuation_without_enough_digits() {
        assert_eq!(
            validate_contact(&contact("Asha", "a@b.com", "(---) 12")),
            Err(ValidationError::InvalidPhone)
        );
    }

    #[test]
    fn test_demo_requires_website() {
        let mut request = DemoRequest {
            website_url: String::new(),
            ..Default::default()
        };
        assert_eq!(
            validate_demo(&request),
            Err(ValidationError::MissingWebsiteUrl)
        );

        request.website_url = "https://acme.com".to_string();
        assert!(validate_demo(&request).is_ok());
    }
}
