// User repository implementation

use crate::db::DbPool;
use crate::errors::DatabaseError;
use crate::models::{NewUser, User};
use async_trait::async_trait;
use tracing::instrument;

/// Persistence operations on users
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create(&self, user: &NewUser) -> Result<User, DatabaseError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, DatabaseError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError>;

    async fn find_all(&self) -> Result<Vec<User>, DatabaseError>;

    async fn update(&self, user: &User) -> Result<User, DatabaseError>;

    /// Delete a user, cascading memberships and participations.
    ///
    /// Organizations whose only member was this user are deleted too; their
    /// ids are returned.
    async fn delete(&self, id: i64) -> Result<Vec<i64>, DatabaseError>;
}

/// Repository for user-related database operations
#[derive(Clone)]
pub struct UserRepository {
    pool: DbPool,
}

impl UserRepository {
    /// Create a new UserRepository
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for UserRepository {
    #[instrument(skip(self, user), fields(email = %user.email))]
    async fn create(&self, user: &NewUser) -> Result<User, DatabaseError> {
        let created = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (first_name, last_name, email, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING id, first_name, last_name, email, password_hash, created_at, updated_at
            "#,
        )
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_one(self.pool.pool())
        .await?;

        tracing::info!(user_id = created.id, "User created");
        Ok(created)
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, first_name, last_name, email, password_hash, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool.pool())
        .await?;

        Ok(user)
    }

    #[instrument(skip(self))]
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, first_name, last_name, email, password_hash, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(self.pool.pool())
        .await?;

        Ok(user)
    }

    #[instrument(skip(self))]
    async fn find_all(&self) -> Result<Vec<User>, DatabaseError> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, first_name, last_name, email, password_hash, created_at, updated_at
            FROM users
            ORDER BY id
            "#,
        )
        .fetch_all(self.pool.pool())
        .await?;

        Ok(users)
    }

    #[instrument(skip(self, user), fields(user_id = user.id))]
    async fn update(&self, user: &User) -> Result<User, DatabaseError> {
        let updated = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET first_name = $2,
                last_name = $3,
                email = $4,
                password_hash = $5,
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, first_name, last_name, email, password_hash, created_at, updated_at
            "#,
        )
        .bind(user.id)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_optional(self.pool.pool())
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("User not found: {}", user.id)))?;

        tracing::info!(user_id = user.id, "User updated");
        Ok(updated)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: i64) -> Result<Vec<i64>, DatabaseError> {
        let mut tx = self
            .pool
            .pool()
            .begin()
            .await
            .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))?;

        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        if exists.is_none() {
            tx.rollback()
                .await
                .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))?;
            return Err(DatabaseError::NotFound(format!("User not found: {}", id)));
        }

        // Lock every organization the user belongs to so concurrent departures
        // cannot both observe a second remaining member.
        sqlx::query(
            r#"
            SELECT o.id
            FROM organizations o
            INNER JOIN organization_members m ON m.organization_id = o.id
            WHERE m.user_id = $1
            ORDER BY o.id
            FOR UPDATE OF o
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let orphaned: Vec<i64> = sqlx::query_scalar(
            r#"
            SELECT m.organization_id
            FROM organization_members m
            WHERE m.user_id = $1
              AND (
                SELECT COUNT(*)
                FROM organization_members other
                WHERE other.organization_id = m.organization_id
              ) = 1
            ORDER BY m.organization_id
            "#,
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        if !orphaned.is_empty() {
            sqlx::query("DELETE FROM organizations WHERE id = ANY($1)")
                .bind(&orphaned)
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit()
            .await
            .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))?;

        tracing::info!(
            user_id = id,
            deleted_organizations = orphaned.len(),
            "User deleted"
        );
        Ok(orphaned)
    }
}
