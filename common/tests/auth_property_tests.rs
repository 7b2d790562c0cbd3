// Property-based tests for token issuing and password hashing

use chrono::Utc;
use common::auth::{BcryptHasher, JwtService, PasswordHasher};
use common::errors::AuthError;
use common::models::UserClaims;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use proptest::prelude::*;

const SECRET: &str = "test-secret-key-for-property-tests";

fn sign(claims: &UserClaims, secret: &str, algorithm: Algorithm) -> String {
    encode(
        &Header::new(algorithm),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("Failed to sign claims")
}

// A token issued for a user decodes back to the same user id and expiry
#[test]
fn property_issued_tokens_identify_their_user() {
    proptest!(|(user_id in 1i64..i64::MAX, hours in 1u64..240)| {
        let jwt = JwtService::new(SECRET, hours);
        let issued = jwt.encode_token(user_id).unwrap();
        let claims = jwt.decode_token(&issued.token).unwrap();

        prop_assert_eq!(claims.user_id, user_id);
        prop_assert_eq!(claims.exp, issued.expires_at.timestamp());
        prop_assert_eq!(claims.exp - claims.iat, hours as i64 * 3600);
    });
}

// Tokens signed with another secret are never accepted
#[test]
fn property_foreign_secret_is_rejected() {
    proptest!(|(user_id in 1i64..100_000, other in "[a-z0-9]{8,32}")| {
        prop_assume!(other != SECRET);
        let token = JwtService::new(&other, 1).encode_token(user_id).unwrap().token;

        let result = JwtService::new(SECRET, 1).decode_token(&token);
        prop_assert!(matches!(result, Err(AuthError::InvalidToken(_))));
    });
}

// Expired tokens are reported as expired, with no leeway
#[test]
fn property_expired_tokens_are_rejected() {
    proptest!(|(user_id in 1i64..100_000, seconds_ago in 1i64..1_000_000)| {
        let now = Utc::now().timestamp();
        let claims = UserClaims {
            user_id,
            exp: now - seconds_ago,
            iat: now - seconds_ago - 3600,
        };
        let token = sign(&claims, SECRET, Algorithm::HS256);

        let result = JwtService::new(SECRET, 1).decode_token(&token);
        prop_assert!(matches!(result, Err(AuthError::TokenExpired)));
    });
}

// Only HS256 is accepted even when the secret matches
#[test]
fn property_other_algorithms_are_rejected() {
    proptest!(|(
        user_id in 1i64..100_000,
        algorithm in prop::sample::select(vec![Algorithm::HS384, Algorithm::HS512]),
    )| {
        let now = Utc::now().timestamp();
        let claims = UserClaims { user_id, exp: now + 3600, iat: now };
        let token = sign(&claims, SECRET, algorithm);

        prop_assert!(JwtService::new(SECRET, 1).decode_token(&token).is_err());
    });
}

#[test]
fn property_garbage_is_not_a_token() {
    proptest!(|(garbage in "[A-Za-z0-9._-]{0,80}")| {
        prop_assert!(JwtService::new(SECRET, 1).decode_token(&garbage).is_err());
    });
}

// bcrypt hashes verify their own password and nothing else
#[test]
fn property_password_hash_round_trip() {
    let hasher = BcryptHasher::new(4);
    proptest!(ProptestConfig::with_cases(16), |(
        password in "[A-Za-z0-9!@#$%]{10,40}",
        other in "[A-Za-z0-9!@#$%]{10,40}",
    )| {
        let hash = hasher.hash(&password).unwrap();

        prop_assert_ne!(&hash, &password);
        prop_assert!(hasher.verify(&password, &hash).unwrap());
        prop_assert_eq!(hasher.verify(&other, &hash).unwrap(), other == password);
    });
}

#[test]
fn test_verify_against_malformed_hash_is_an_error() {
    let hasher = BcryptHasher::new(4);
    assert!(matches!(
        hasher.verify("correct horse battery", "not-a-bcrypt-hash"),
        Err(AuthError::Hashing(_))
    ));
}
