// Organizations and their membership rules

use crate::db::repositories::{EventStore, OrganizationStore, UserStore};
use crate::errors::{DatabaseError, OrganizationError};
use crate::models::{
    Event, NewOrganization, Organization, OrganizationChanges, RemoveMemberOutcome,
};
use crate::telemetry;
use crate::validation::{validate_name, validate_organization_description};
use std::sync::Arc;
use tracing::instrument;

#[derive(Clone)]
pub struct OrganizationService {
    organizations: Arc<dyn OrganizationStore>,
    users: Arc<dyn UserStore>,
    events: Arc<dyn EventStore>,
}

impl OrganizationService {
    pub fn new(
        organizations: Arc<dyn OrganizationStore>,
        users: Arc<dyn UserStore>,
        events: Arc<dyn EventStore>,
    ) -> Self {
        Self {
            organizations,
            users,
            events,
        }
    }

    /// Create an organization whose first member is its creator
    #[instrument(skip(self, description))]
    pub async fn create(
        &self,
        creator_id: i64,
        name: &str,
        description: &str,
    ) -> Result<Organization, OrganizationError> {
        let organization = NewOrganization {
            name: validate_name(name)?,
            description: validate_organization_description(description)?,
        };

        let created = self
            .organizations
            .create(&organization, creator_id)
            .await
            .map_err(|e| match e {
                DatabaseError::ForeignKeyViolation(_) => OrganizationError::UserNotFound(creator_id),
                other => OrganizationError::Database(other),
            })?;

        telemetry::record_organization_created();
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn find_all(&self) -> Result<Vec<Organization>, OrganizationError> {
        Ok(self.organizations.find_all().await?)
    }

    #[instrument(skip(self))]
    pub async fn find_by_id(&self, id: i64) -> Result<Organization, OrganizationError> {
        self.organizations
            .find_by_id(id)
            .await?
            .ok_or(OrganizationError::NotFound(id))
    }

    #[instrument(skip(self))]
    pub async fn member_ids(&self, id: i64) -> Result<Vec<i64>, OrganizationError> {
        self.find_by_id(id).await?;
        Ok(self.organizations.member_ids(id).await?)
    }

    #[instrument(skip(self))]
    pub async fn events(&self, id: i64) -> Result<Vec<Event>, OrganizationError> {
        self.find_by_id(id).await?;
        Ok(self.events.find_for_organization(id).await?)
    }

    #[instrument(skip(self, changes))]
    pub async fn update(
        &self,
        id: i64,
        changes: OrganizationChanges,
    ) -> Result<Organization, OrganizationError> {
        let mut organization = self.find_by_id(id).await?;

        if let Some(name) = changes.name {
            organization.name = validate_name(&name)?;
        }
        if let Some(description) = changes.description {
            organization.description = validate_organization_description(&description)?;
        }

        self.organizations
            .update(&organization)
            .await
            .map_err(|e| match e {
                DatabaseError::NotFound(_) => OrganizationError::NotFound(id),
                other => OrganizationError::Database(other),
            })
    }

    /// Delete an organization together with its events
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> Result<(), OrganizationError> {
        if !self.organizations.delete(id).await? {
            return Err(OrganizationError::NotFound(id));
        }
        telemetry::record_organizations_deleted("explicit", 1);
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn is_member(
        &self,
        organization_id: i64,
        user_id: i64,
    ) -> Result<bool, OrganizationError> {
        Ok(self.organizations.is_member(organization_id, user_id).await?)
    }

    #[instrument(skip(self))]
    pub async fn add_member(
        &self,
        organization_id: i64,
        user_id: i64,
    ) -> Result<(), OrganizationError> {
        self.find_by_id(organization_id).await?;

        if self.users.find_by_id(user_id).await?.is_none() {
            return Err(OrganizationError::UserNotFound(user_id));
        }

        let added = self
            .organizations
            .add_member(organization_id, user_id)
            .await
            .map_err(|e| match e {
                // the user or the organization vanished in between
                DatabaseError::ForeignKeyViolation(_) => OrganizationError::UserNotFound(user_id),
                other => OrganizationError::Database(other),
            })?;

        if !added {
            return Err(OrganizationError::AlreadyMember {
                organization_id,
                user_id,
            });
        }
        Ok(())
    }

    /// Remove a member; the organization is deleted when nobody is left
    #[instrument(skip(self))]
    pub async fn remove_member(
        &self,
        organization_id: i64,
        user_id: i64,
    ) -> Result<RemoveMemberOutcome, OrganizationError> {
        self.find_by_id(organization_id).await?;

        let outcome = self
            .organizations
            .remove_member(organization_id, user_id)
            .await?;

        match outcome {
            RemoveMemberOutcome::NotMember => Err(OrganizationError::NotMember {
                organization_id,
                user_id,
            }),
            RemoveMemberOutcome::OrganizationDeleted => {
                telemetry::record_organizations_deleted("last_member_left", 1);
                tracing::info!(
                    organization_id,
                    user_id,
                    "Last member left, organization deleted"
                );
                Ok(outcome)
            }
            RemoveMemberOutcome::Removed { .. } => Ok(outcome),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::event::MockEventStore;
    use crate::db::repositories::organization::MockOrganizationStore;
    use crate::db::repositories::user::MockUserStore;
    use crate::models::User;
    use chrono::Utc;

    fn organization(id: i64) -> Organization {
        Organization {
            id,
            name: "Chess Club".to_string(),
            description: "Weekly games and friendly tournaments".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn user(id: i64) -> User {
        User {
            id,
            first_name: "Judit".to_string(),
            last_name: "Polgar".to_string(),
            email: format!("user{}@example.com", id),
            password_hash: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn service(organizations: MockOrganizationStore, users: MockUserStore) -> OrganizationService {
        OrganizationService::new(
            Arc::new(organizations),
            Arc::new(users),
            Arc::new(MockEventStore::new()),
        )
    }

    fn existing(organizations: &mut MockOrganizationStore) {
        organizations
            .expect_find_by_id()
            .returning(|id| Ok(Some(organization(id))));
    }

    #[tokio::test]
    async fn test_create_trims_and_passes_creator() {
        let mut organizations = MockOrganizationStore::new();
        organizations
            .expect_create()
            .withf(|new_org, creator| new_org.name == "Chess Club" && *creator == 3)
            .returning(|_, _| Ok(organization(10)));

        let created = service(organizations, MockUserStore::new())
            .create(3, "  Chess Club ", "Weekly games and friendly tournaments")
            .await
            .unwrap();
        assert_eq!(created.id, 10);
    }

    #[tokio::test]
    async fn test_create_rejects_short_description() {
        let mut organizations = MockOrganizationStore::new();
        organizations.expect_create().never();

        let result = service(organizations, MockUserStore::new())
            .create(3, "Chess Club", "Too short")
            .await;
        match result {
            Err(OrganizationError::Validation(err)) => assert_eq!(err.field(), "description"),
            other => panic!("unexpected result: {:?}", other.map(|o| o.id)),
        }
    }

    #[tokio::test]
    async fn test_add_member_unknown_user() {
        let mut organizations = MockOrganizationStore::new();
        existing(&mut organizations);
        organizations.expect_add_member().never();
        let mut users = MockUserStore::new();
        users.expect_find_by_id().returning(|_| Ok(None));

        let result = service(organizations, users).add_member(1, 42).await;
        assert!(matches!(result, Err(OrganizationError::UserNotFound(42))));
    }

    #[tokio::test]
    async fn test_add_member_twice() {
        let mut organizations = MockOrganizationStore::new();
        existing(&mut organizations);
        organizations.expect_add_member().returning(|_, _| Ok(false));
        let mut users = MockUserStore::new();
        users.expect_find_by_id().returning(|id| Ok(Some(user(id))));

        let result = service(organizations, users).add_member(1, 2).await;
        assert!(matches!(
            result,
            Err(OrganizationError::AlreadyMember {
                organization_id: 1,
                user_id: 2
            })
        ));
    }

    #[tokio::test]
    async fn test_add_member_unknown_organization() {
        let mut organizations = MockOrganizationStore::new();
        organizations.expect_find_by_id().returning(|_| Ok(None));

        let result = service(organizations, MockUserStore::new())
            .add_member(77, 2)
            .await;
        assert!(matches!(result, Err(OrganizationError::NotFound(77))));
    }

    #[tokio::test]
    async fn test_remove_last_member_deletes_organization() {
        let mut organizations = MockOrganizationStore::new();
        existing(&mut organizations);
        organizations
            .expect_remove_member()
            .returning(|_, _| Ok(RemoveMemberOutcome::OrganizationDeleted));

        let outcome = service(organizations, MockUserStore::new())
            .remove_member(1, 2)
            .await
            .unwrap();
        assert_eq!(outcome, RemoveMemberOutcome::OrganizationDeleted);
    }

    #[tokio::test]
    async fn test_remove_member_keeps_organization_with_others() {
        let mut organizations = MockOrganizationStore::new();
        existing(&mut organizations);
        organizations
            .expect_remove_member()
            .returning(|_, _| Ok(RemoveMemberOutcome::Removed { remaining: 2 }));

        let outcome = service(organizations, MockUserStore::new())
            .remove_member(1, 2)
            .await
            .unwrap();
        assert_eq!(outcome, RemoveMemberOutcome::Removed { remaining: 2 });
    }

    #[tokio::test]
    async fn test_remove_non_member() {
        let mut organizations = MockOrganizationStore::new();
        existing(&mut organizations);
        organizations
            .expect_remove_member()
            .returning(|_, _| Ok(RemoveMemberOutcome::NotMember));

        let result = service(organizations, MockUserStore::new())
            .remove_member(1, 5)
            .await;
        assert!(matches!(result, Err(OrganizationError::NotMember { .. })));
    }

    #[tokio::test]
    async fn test_update_only_description() {
        let mut organizations = MockOrganizationStore::new();
        existing(&mut organizations);
        organizations
            .expect_update()
            .withf(|o| o.name == "Chess Club" && o.description.starts_with("Blitz"))
            .returning(|o| Ok(o.clone()));

        let changes = OrganizationChanges {
            name: None,
            description: Some("Blitz games every Thursday evening".to_string()),
        };
        service(organizations, MockUserStore::new())
            .update(1, changes)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_delete_unknown_organization() {
        let mut organizations = MockOrganizationStore::new();
        organizations.expect_delete().returning(|_| Ok(false));

        let result = service(organizations, MockUserStore::new()).delete(3).await;
        assert!(matches!(result, Err(OrganizationError::NotFound(3))));
    }
}
