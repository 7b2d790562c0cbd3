// Property-based tests for input validation and capacity rules

use chrono::{Duration, TimeZone, Utc};
use common::errors::ValidationError;
use common::validation::{
    has_capacity, normalize_email, validate_event_dates, validate_event_description,
    validate_max_participants, validate_name, validate_organization_description,
    validate_password, validate_person_name, DESCRIPTION_MAX_CHARS, EVENT_DESCRIPTION_MIN_CHARS,
    NAME_MAX_CHARS, ORGANIZATION_DESCRIPTION_MIN_CHARS, PASSWORD_MIN_CHARS,
};
use proptest::prelude::*;

// Names made of letters, spaces and hyphens are accepted up to the limit, trimmed
#[test]
fn property_valid_names_are_trimmed() {
    proptest!(|(
        core in "[A-Za-z][A-Za-z -]{0,28}[A-Za-z]",
        left in " {0,3}",
        right in " {0,3}",
    )| {
        let input = format!("{}{}{}", left, core, right);
        let name = validate_name(&input).unwrap();
        prop_assert_eq!(name, core.trim().to_string());
    });
}

// Any digit or punctuation other than a hyphen makes a name invalid
#[test]
fn property_names_with_forbidden_characters_are_rejected() {
    proptest!(|(
        prefix in "[A-Za-z]{1,10}",
        bad in "[0-9_!?.,@#]",
        suffix in "[A-Za-z]{0,10}",
    )| {
        let input = format!("{}{}{}", prefix, bad, suffix);
        prop_assert!(validate_name(&input).is_err());
    });
}

#[test]
fn property_names_over_the_limit_are_rejected() {
    proptest!(|(extra in 1usize..20)| {
        let input = "a".repeat(NAME_MAX_CHARS + extra);
        prop_assert!(validate_name(&input).is_err());
    });
}

// Description length is checked after trimming, in characters not bytes
#[test]
fn property_description_bounds_are_inclusive() {
    proptest!(|(len in 0usize..900, ch in prop::sample::select(vec!['a', 'é', 'ß', 'z']))| {
        let description: String = std::iter::repeat(ch).take(len).collect();

        let event_ok = (EVENT_DESCRIPTION_MIN_CHARS..=DESCRIPTION_MAX_CHARS).contains(&len);
        prop_assert_eq!(validate_event_description(&description).is_ok(), event_ok);

        let organization_ok =
            (ORGANIZATION_DESCRIPTION_MIN_CHARS..=DESCRIPTION_MAX_CHARS).contains(&len);
        prop_assert_eq!(
            validate_organization_description(&description).is_ok(),
            organization_ok
        );
    });
}

// Normalized emails are lower-case, trimmed and stable under renormalization
#[test]
fn property_email_normalization_is_idempotent() {
    proptest!(|(
        local in "[A-Za-z0-9._]{1,20}",
        domain in "[A-Za-z]{1,15}",
        tld in "[A-Za-z]{2,6}",
        padding in " {0,2}",
    )| {
        let input = format!("{}{}@{}.{}{}", padding, local, domain, tld, padding);
        let email = normalize_email(&input).unwrap();

        prop_assert_eq!(&email, &email.to_lowercase());
        prop_assert_eq!(&email, email.trim());
        prop_assert_eq!(normalize_email(&email).unwrap(), email.clone());
    });
}

#[test]
fn property_email_without_at_sign_is_rejected() {
    proptest!(|(value in "[a-z0-9.]{1,30}")| {
        prop_assert!(normalize_email(&value).is_err());
    });
}

#[test]
fn property_password_minimum_length() {
    proptest!(|(password in "[A-Za-z0-9]{1,40}")| {
        let accepted = password.chars().count() >= PASSWORD_MIN_CHARS;
        prop_assert_eq!(validate_password(&password).is_ok(), accepted);
    });
}

// The failing field is reported under the caller-provided name
#[test]
fn property_person_name_reports_its_field() {
    proptest!(|(
        field in prop::sample::select(vec!["firstName", "lastName"]),
        value in "[a-z]{1,2}",
    )| {
        let err = validate_person_name(field, &value).unwrap_err();
        prop_assert_eq!(err.field(), field);
    });
}

#[test]
fn property_event_must_end_after_it_begins() {
    proptest!(|(start in 0i64..4_000_000_000, offset in -100_000i64..100_000)| {
        let beginning = Utc.timestamp_opt(start, 0).unwrap();
        let end = beginning + Duration::seconds(offset);
        prop_assert_eq!(validate_event_dates(beginning, end).is_ok(), offset > 0);
    });
}

#[test]
fn property_max_participants_must_be_positive() {
    proptest!(|(max in any::<i32>())| {
        let result = validate_max_participants(max);
        prop_assert_eq!(result.is_ok(), max > 0);
        if let Err(err) = result {
            prop_assert!(
                matches!(err, ValidationError::InvalidFieldValue { .. }),
                "expected InvalidFieldValue, got {:?}",
                err
            );
            prop_assert_eq!(err.field(), "maxParticipants");
        }
    });
}

// Joining never pushes the head count past the maximum
#[test]
fn property_capacity_is_never_exceeded() {
    proptest!(|(max in 1i32..500, attempts in 0usize..1000)| {
        let mut participants = 0i64;
        for _ in 0..attempts {
            if has_capacity(participants, max) {
                participants += 1;
            }
        }
        prop_assert!(participants <= i64::from(max));
        prop_assert_eq!(participants, (attempts as i64).min(i64::from(max)));
    });
}
