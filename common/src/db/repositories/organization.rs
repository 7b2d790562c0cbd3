// Organization repository implementation: organizations and their memberships

use crate::db::DbPool;
use crate::errors::DatabaseError;
use crate::models::{NewOrganization, Organization, RemoveMemberOutcome};
use async_trait::async_trait;
use tracing::instrument;

/// Persistence operations on organizations and memberships
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrganizationStore: Send + Sync {
    /// Insert the organization and its first member in one transaction
    async fn create(
        &self,
        organization: &NewOrganization,
        creator_id: i64,
    ) -> Result<Organization, DatabaseError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Organization>, DatabaseError>;

    async fn find_all(&self) -> Result<Vec<Organization>, DatabaseError>;

    async fn find_for_user(&self, user_id: i64) -> Result<Vec<Organization>, DatabaseError>;

    async fn update(&self, organization: &Organization) -> Result<Organization, DatabaseError>;

    /// Returns false when nothing was deleted
    async fn delete(&self, id: i64) -> Result<bool, DatabaseError>;

    async fn member_ids(&self, organization_id: i64) -> Result<Vec<i64>, DatabaseError>;

    async fn is_member(&self, organization_id: i64, user_id: i64) -> Result<bool, DatabaseError>;

    /// Returns false when the user already was a member
    async fn add_member(&self, organization_id: i64, user_id: i64) -> Result<bool, DatabaseError>;

    /// Remove a membership; the organization is deleted with its last member
    async fn remove_member(
        &self,
        organization_id: i64,
        user_id: i64,
    ) -> Result<RemoveMemberOutcome, DatabaseError>;
}

/// Repository for organization-related database operations
#[derive(Clone)]
pub struct OrganizationRepository {
    pool: DbPool,
}

impl OrganizationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrganizationStore for OrganizationRepository {
    #[instrument(skip(self, organization), fields(name = %organization.name))]
    async fn create(
        &self,
        organization: &NewOrganization,
        creator_id: i64,
    ) -> Result<Organization, DatabaseError> {
        let mut tx = self
            .pool
            .pool()
            .begin()
            .await
            .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))?;

        let created = sqlx::query_as::<_, Organization>(
            r#"
            INSERT INTO organizations (name, description)
            VALUES ($1, $2)
            RETURNING id, name, description, created_at, updated_at
            "#,
        )
        .bind(&organization.name)
        .bind(&organization.description)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO organization_members (organization_id, user_id)
            VALUES ($1, $2)
            "#,
        )
        .bind(created.id)
        .bind(creator_id)
        .execute(&mut *tx)
        .await?;

        tx.commit()
            .await
            .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))?;

        tracing::info!(
            organization_id = created.id,
            creator_id = creator_id,
            "Organization created"
        );
        Ok(created)
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: i64) -> Result<Option<Organization>, DatabaseError> {
        let organization = sqlx::query_as::<_, Organization>(
            r#"
            SELECT id, name, description, created_at, updated_at
            FROM organizations
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool.pool())
        .await?;

        Ok(organization)
    }

    #[instrument(skip(self))]
    async fn find_all(&self) -> Result<Vec<Organization>, DatabaseError> {
        let organizations = sqlx::query_as::<_, Organization>(
            r#"
            SELECT id, name, description, created_at, updated_at
            FROM organizations
            ORDER BY name, id
            "#,
        )
        .fetch_all(self.pool.pool())
        .await?;

        Ok(organizations)
    }

    #[instrument(skip(self))]
    async fn find_for_user(&self, user_id: i64) -> Result<Vec<Organization>, DatabaseError> {
        let organizations = sqlx::query_as::<_, Organization>(
            r#"
            SELECT o.id, o.name, o.description, o.created_at, o.updated_at
            FROM organizations o
            INNER JOIN organization_members m ON m.organization_id = o.id
            WHERE m.user_id = $1
            ORDER BY o.name, o.id
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool.pool())
        .await?;

        Ok(organizations)
    }

    #[instrument(skip(self, organization), fields(organization_id = organization.id))]
    async fn update(&self, organization: &Organization) -> Result<Organization, DatabaseError> {
        let updated = sqlx::query_as::<_, Organization>(
            r#"
            UPDATE organizations
            SET name = $2,
                description = $3,
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, description, created_at, updated_at
            "#,
        )
        .bind(organization.id)
        .bind(&organization.name)
        .bind(&organization.description)
        .fetch_optional(self.pool.pool())
        .await?
        .ok_or_else(|| {
            DatabaseError::NotFound(format!("Organization not found: {}", organization.id))
        })?;

        tracing::info!(organization_id = organization.id, "Organization updated");
        Ok(updated)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: i64) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM organizations WHERE id = $1")
            .bind(id)
            .execute(self.pool.pool())
            .await?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            tracing::info!(organization_id = id, "Organization deleted");
        }
        Ok(deleted)
    }

    #[instrument(skip(self))]
    async fn member_ids(&self, organization_id: i64) -> Result<Vec<i64>, DatabaseError> {
        let ids = sqlx::query_scalar(
            r#"
            SELECT user_id
            FROM organization_members
            WHERE organization_id = $1
            ORDER BY joined_at, user_id
            "#,
        )
        .bind(organization_id)
        .fetch_all(self.pool.pool())
        .await?;

        Ok(ids)
    }

    #[instrument(skip(self))]
    async fn is_member(&self, organization_id: i64, user_id: i64) -> Result<bool, DatabaseError> {
        let is_member: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM organization_members
                WHERE organization_id = $1 AND user_id = $2
            )
            "#,
        )
        .bind(organization_id)
        .bind(user_id)
        .fetch_one(self.pool.pool())
        .await?;

        Ok(is_member)
    }

    #[instrument(skip(self))]
    async fn add_member(&self, organization_id: i64, user_id: i64) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            r#"
            INSERT INTO organization_members (organization_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (organization_id, user_id) DO NOTHING
            "#,
        )
        .bind(organization_id)
        .bind(user_id)
        .execute(self.pool.pool())
        .await?;

        let added = result.rows_affected() > 0;
        if added {
            tracing::info!(organization_id, user_id, "Member added to organization");
        }
        Ok(added)
    }

    #[instrument(skip(self))]
    async fn remove_member(
        &self,
        organization_id: i64,
        user_id: i64,
    ) -> Result<RemoveMemberOutcome, DatabaseError> {
        let mut tx = self
            .pool
            .pool()
            .begin()
            .await
            .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))?;

        // Serialize membership changes on this organization
        let locked: Option<i64> =
            sqlx::query_scalar("SELECT id FROM organizations WHERE id = $1 FOR UPDATE")
                .bind(organization_id)
                .fetch_optional(&mut *tx)
                .await?;

        if locked.is_none() {
            tx.rollback()
                .await
                .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))?;
            return Ok(RemoveMemberOutcome::NotMember);
        }

        let removed = sqlx::query(
            r#"
            DELETE FROM organization_members
            WHERE organization_id = $1 AND user_id = $2
            "#,
        )
        .bind(organization_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        if removed.rows_affected() == 0 {
            tx.rollback()
                .await
                .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))?;
            return Ok(RemoveMemberOutcome::NotMember);
        }

        let remaining: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM organization_members WHERE organization_id = $1",
        )
        .bind(organization_id)
        .fetch_one(&mut *tx)
        .await?;

        let outcome = if remaining == 0 {
            sqlx::query("DELETE FROM organizations WHERE id = $1")
                .bind(organization_id)
                .execute(&mut *tx)
                .await?;
            RemoveMemberOutcome::OrganizationDeleted
        } else {
            RemoveMemberOutcome::Removed { remaining }
        };

        tx.commit()
            .await
            .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))?;

        tracing::info!(organization_id, user_id, outcome = ?outcome, "Member removed");
        Ok(outcome)
    }
}
