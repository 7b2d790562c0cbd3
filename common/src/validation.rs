// Input validation rules shared by the user, organization and event services

use crate::errors::ValidationError;
use chrono::{DateTime, Utc};
use regex::Regex;

pub const NAME_MAX_CHARS: usize = 30;
pub const EVENT_DESCRIPTION_MIN_CHARS: usize = 30;
pub const ORGANIZATION_DESCRIPTION_MIN_CHARS: usize = 20;
pub const DESCRIPTION_MAX_CHARS: usize = 800;
pub const PERSON_NAME_MIN_CHARS: usize = 3;
pub const PERSON_NAME_MAX_CHARS: usize = 50;
pub const EMAIL_MAX_CHARS: usize = 254;
pub const PASSWORD_MIN_CHARS: usize = 10;
/// bcrypt ignores everything past this many bytes
pub const BCRYPT_MAX_PASSWORD_BYTES: usize = 72;

lazy_static::lazy_static! {
    // Latin letters (including Latin-1 Supplement and Latin Extended-A), hyphens, spaces
    static ref NAME_FORMAT: Regex =
        Regex::new(r"^[a-zA-Z\x{00C0}-\x{017F}\- ]{1,30}$").expect("Invalid regex pattern");
    static ref EMAIL_FORMAT: Regex =
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("Invalid regex pattern");
}

/// Trim and check an event or organization name
pub fn validate_name(name: &str) -> Result<String, ValidationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::MissingField("name".to_string()));
    }
    if !NAME_FORMAT.is_match(name) {
        return Err(ValidationError::invalid(
            "name",
            format!(
                "must be 1 to {} letters, spaces or hyphens",
                NAME_MAX_CHARS
            ),
        ));
    }
    Ok(name.to_string())
}

fn validate_description(description: &str, min_chars: usize) -> Result<String, ValidationError> {
    let description = description.trim();
    let len = description.chars().count();
    if len < min_chars || len > DESCRIPTION_MAX_CHARS {
        return Err(ValidationError::invalid(
            "description",
            format!(
                "must be between {} and {} characters",
                min_chars, DESCRIPTION_MAX_CHARS
            ),
        ));
    }
    Ok(description.to_string())
}

pub fn validate_event_description(description: &str) -> Result<String, ValidationError> {
    validate_description(description, EVENT_DESCRIPTION_MIN_CHARS)
}

pub fn validate_organization_description(description: &str) -> Result<String, ValidationError> {
    validate_description(description, ORGANIZATION_DESCRIPTION_MIN_CHARS)
}

/// Trim and check a first or last name
pub fn validate_person_name(field: &str, value: &str) -> Result<String, ValidationError> {
    let value = value.trim();
    let len = value.chars().count();
    if len == 0 {
        return Err(ValidationError::MissingField(field.to_string()));
    }
    if !(PERSON_NAME_MIN_CHARS..=PERSON_NAME_MAX_CHARS).contains(&len) {
        return Err(ValidationError::invalid(
            field,
            format!(
                "must be between {} and {} characters",
                PERSON_NAME_MIN_CHARS, PERSON_NAME_MAX_CHARS
            ),
        ));
    }
    Ok(value.to_string())
}

/// Trim, lower-case and check an email address
pub fn normalize_email(email: &str) -> Result<String, ValidationError> {
    let email = email.trim().to_lowercase();
    if email.is_empty() {
        return Err(ValidationError::MissingField("email".to_string()));
    }
    if email.chars().count() > EMAIL_MAX_CHARS || !EMAIL_FORMAT.is_match(&email) {
        return Err(ValidationError::invalid("email", "must be a valid email address"));
    }
    Ok(email)
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::MissingField("password".to_string()));
    }
    if password.chars().count() < PASSWORD_MIN_CHARS {
        return Err(ValidationError::invalid(
            "password",
            format!("must be at least {} characters", PASSWORD_MIN_CHARS),
        ));
    }
    if password.len() > BCRYPT_MAX_PASSWORD_BYTES {
        tracing::warn!(
            ignored_bytes = password.len() - BCRYPT_MAX_PASSWORD_BYTES,
            "Password longer than 72 bytes, trailing bytes will be ignored by bcrypt"
        );
    }
    Ok(())
}

pub fn validate_event_dates(
    beginning: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<(), ValidationError> {
    if beginning >= end {
        return Err(ValidationError::invalid(
            "end",
            "beginning date must be anterior to end date",
        ));
    }
    Ok(())
}

pub fn validate_max_participants(max_participants: i32) -> Result<(), ValidationError> {
    if max_participants < 1 {
        return Err(ValidationError::invalid(
            "maxParticipants",
            "must be greater than 0",
        ));
    }
    Ok(())
}

/// Whether one more participant fits
pub fn has_capacity(current_participants: i64, max_participants: i32) -> bool {
    current_participants < i64::from(max_participants)
}
