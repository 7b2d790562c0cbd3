use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ============================================================================
// User Models
// ============================================================================

/// Registered account
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated user row ready for insertion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
}

/// Partial profile update; absent fields are left untouched
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// JWT payload carried by bearer tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserClaims {
    #[serde(rename = "userId")]
    pub user_id: i64,
    pub exp: i64,
    pub iat: i64,
}

// ============================================================================
// Organization Models
// ============================================================================

/// A named group of users owning events
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrganization {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrganizationChanges {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Result of removing a member from an organization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RemoveMemberOutcome {
    NotMember,
    Removed { remaining: i64 },
    /// The removed user was the last member; the organization and its events are gone
    OrganizationDeleted,
}

// ============================================================================
// Event Models
// ============================================================================

/// A dated activity belonging to one organization
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: i64,
    pub name: String,
    pub description: String,
    #[sqlx(rename = "begins_at")]
    pub beginning: DateTime<Utc>,
    #[sqlx(rename = "ends_at")]
    pub end: DateTime<Utc>,
    pub max_participants: i32,
    pub organization_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub name: String,
    pub description: String,
    pub beginning: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub max_participants: i32,
    pub organization_id: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventChanges {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Result of a participation request against a capacity-limited event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum JoinOutcome {
    Joined { participants: i64 },
    Full { max_participants: i32 },
    AlreadyParticipating,
    EventNotFound,
}
