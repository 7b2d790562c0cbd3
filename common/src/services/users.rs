// User accounts: registration, profile updates and account deletion

use crate::auth::PasswordHasher;
use crate::db::repositories::{EventStore, OrganizationStore, UserStore};
use crate::errors::{DatabaseError, UserError};
use crate::models::{Event, NewUser, Organization, User, UserChanges};
use crate::telemetry;
use crate::validation::{normalize_email, validate_password, validate_person_name};
use std::sync::Arc;
use tracing::instrument;

#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserStore>,
    organizations: Arc<dyn OrganizationStore>,
    events: Arc<dyn EventStore>,
    hasher: Arc<dyn PasswordHasher>,
}

impl UserService {
    pub fn new(
        users: Arc<dyn UserStore>,
        organizations: Arc<dyn OrganizationStore>,
        events: Arc<dyn EventStore>,
        hasher: Arc<dyn PasswordHasher>,
    ) -> Self {
        Self {
            users,
            organizations,
            events,
            hasher,
        }
    }

    /// Create an account; the email must not be registered yet
    #[instrument(skip(self, password))]
    pub async fn register(
        &self,
        first_name: &str,
        last_name: &str,
        email: &str,
        password: &str,
    ) -> Result<User, UserError> {
        let first_name = validate_person_name("firstName", first_name)?;
        let last_name = validate_person_name("lastName", last_name)?;
        let email = normalize_email(email)?;
        validate_password(password)?;

        if self.users.find_by_email(&email).await?.is_some() {
            return Err(UserError::EmailTaken(email));
        }

        let password_hash = self
            .hasher
            .hash(password)
            .map_err(|e| UserError::Hashing(e.to_string()))?;

        let new_user = NewUser {
            first_name,
            last_name,
            email: email.clone(),
            password_hash,
        };

        let user = self.users.create(&new_user).await.map_err(|e| match e {
            DatabaseError::DuplicateKey(_) => UserError::EmailTaken(email),
            other => UserError::Database(other),
        })?;

        telemetry::record_user_registered();
        tracing::info!(user_id = user.id, "User registered");
        Ok(user)
    }

    #[instrument(skip(self))]
    pub async fn find_by_id(&self, id: i64) -> Result<User, UserError> {
        self.users
            .find_by_id(id)
            .await?
            .ok_or(UserError::NotFound(id))
    }

    #[instrument(skip(self))]
    pub async fn find_all(&self) -> Result<Vec<User>, UserError> {
        Ok(self.users.find_all().await?)
    }

    /// Apply a partial profile update
    #[instrument(skip(self, changes))]
    pub async fn update(&self, id: i64, changes: UserChanges) -> Result<User, UserError> {
        let mut user = self.find_by_id(id).await?;

        if let Some(first_name) = changes.first_name {
            user.first_name = validate_person_name("firstName", &first_name)?;
        }
        if let Some(last_name) = changes.last_name {
            user.last_name = validate_person_name("lastName", &last_name)?;
        }
        if let Some(email) = changes.email {
            let email = normalize_email(&email)?;
            if email != user.email {
                if let Some(existing) = self.users.find_by_email(&email).await? {
                    if existing.id != id {
                        return Err(UserError::EmailTaken(email));
                    }
                }
                user.email = email;
            }
        }
        if let Some(password) = changes.password {
            validate_password(&password)?;
            user.password_hash = self
                .hasher
                .hash(&password)
                .map_err(|e| UserError::Hashing(e.to_string()))?;
        }

        let email = user.email.clone();
        self.users.update(&user).await.map_err(|e| match e {
            DatabaseError::DuplicateKey(_) => UserError::EmailTaken(email),
            DatabaseError::NotFound(_) => UserError::NotFound(id),
            other => UserError::Database(other),
        })
    }

    /// Delete an account
    ///
    /// Returns the organizations that were deleted because this user was their
    /// last member.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> Result<Vec<i64>, UserError> {
        let deleted_organizations = self.users.delete(id).await.map_err(|e| match e {
            DatabaseError::NotFound(_) => UserError::NotFound(id),
            other => UserError::Database(other),
        })?;

        telemetry::record_organizations_deleted(
            "owner_deleted",
            deleted_organizations.len() as u64,
        );
        tracing::info!(
            user_id = id,
            deleted_organizations = ?deleted_organizations,
            "User account deleted"
        );
        Ok(deleted_organizations)
    }

    #[instrument(skip(self))]
    pub async fn organizations_of(&self, user_id: i64) -> Result<Vec<Organization>, UserError> {
        self.find_by_id(user_id).await?;
        Ok(self.organizations.find_for_user(user_id).await?)
    }

    #[instrument(skip(self))]
    pub async fn events_of(&self, user_id: i64) -> Result<Vec<Event>, UserError> {
        self.find_by_id(user_id).await?;
        Ok(self.events.find_for_user(user_id).await?)
    }
}
