// Event repository implementation: events and participations

use crate::db::DbPool;
use crate::errors::DatabaseError;
use crate::models::{Event, JoinOutcome, NewEvent};
use crate::validation::has_capacity;
use async_trait::async_trait;
use tracing::instrument;

/// Persistence operations on events and participations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn create(&self, event: &NewEvent) -> Result<Event, DatabaseError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Event>, DatabaseError>;

    async fn find_all(&self) -> Result<Vec<Event>, DatabaseError>;

    async fn find_for_organization(&self, organization_id: i64)
        -> Result<Vec<Event>, DatabaseError>;

    async fn find_for_user(&self, user_id: i64) -> Result<Vec<Event>, DatabaseError>;

    async fn update(&self, event: &Event) -> Result<Event, DatabaseError>;

    /// Returns false when nothing was deleted
    async fn delete(&self, id: i64) -> Result<bool, DatabaseError>;

    async fn participant_ids(&self, event_id: i64) -> Result<Vec<i64>, DatabaseError>;

    /// Register a participant unless the event is already full
    async fn add_participant(&self, event_id: i64, user_id: i64)
        -> Result<JoinOutcome, DatabaseError>;

    /// Returns false when the user was not participating
    async fn remove_participant(&self, event_id: i64, user_id: i64)
        -> Result<bool, DatabaseError>;
}

const EVENT_COLUMNS: &str = "id, name, description, begins_at, ends_at, max_participants, \
                             organization_id, created_at, updated_at";

/// Repository for event-related database operations
#[derive(Clone)]
pub struct EventRepository {
    pool: DbPool,
}

impl EventRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventStore for EventRepository {
    #[instrument(skip(self, event), fields(organization_id = event.organization_id))]
    async fn create(&self, event: &NewEvent) -> Result<Event, DatabaseError> {
        let sql = format!(
            r#"
            INSERT INTO events (name, description, begins_at, ends_at, max_participants, organization_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            EVENT_COLUMNS
        );

        let created = sqlx::query_as::<_, Event>(&sql)
            .bind(&event.name)
            .bind(&event.description)
            .bind(event.beginning)
            .bind(event.end)
            .bind(event.max_participants)
            .bind(event.organization_id)
            .fetch_one(self.pool.pool())
            .await?;

        tracing::info!(event_id = created.id, "Event created");
        Ok(created)
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: i64) -> Result<Option<Event>, DatabaseError> {
        let sql = format!("SELECT {} FROM events WHERE id = $1", EVENT_COLUMNS);
        let event = sqlx::query_as::<_, Event>(&sql)
            .bind(id)
            .fetch_optional(self.pool.pool())
            .await?;

        Ok(event)
    }

    #[instrument(skip(self))]
    async fn find_all(&self) -> Result<Vec<Event>, DatabaseError> {
        let sql = format!("SELECT {} FROM events ORDER BY begins_at, id", EVENT_COLUMNS);
        let events = sqlx::query_as::<_, Event>(&sql)
            .fetch_all(self.pool.pool())
            .await?;

        Ok(events)
    }

    #[instrument(skip(self))]
    async fn find_for_organization(
        &self,
        organization_id: i64,
    ) -> Result<Vec<Event>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM events WHERE organization_id = $1 ORDER BY begins_at, id",
            EVENT_COLUMNS
        );
        let events = sqlx::query_as::<_, Event>(&sql)
            .bind(organization_id)
            .fetch_all(self.pool.pool())
            .await?;

        Ok(events)
    }

    #[instrument(skip(self))]
    async fn find_for_user(&self, user_id: i64) -> Result<Vec<Event>, DatabaseError> {
        let events = sqlx::query_as::<_, Event>(
            r#"
            SELECT e.id, e.name, e.description, e.begins_at, e.ends_at, e.max_participants,
                   e.organization_id, e.created_at, e.updated_at
            FROM events e
            INNER JOIN event_participations p ON p.event_id = e.id
            WHERE p.user_id = $1
            ORDER BY e.begins_at, e.id
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool.pool())
        .await?;

        Ok(events)
    }

    #[instrument(skip(self, event), fields(event_id = event.id))]
    async fn update(&self, event: &Event) -> Result<Event, DatabaseError> {
        let sql = format!(
            r#"
            UPDATE events
            SET name = $2,
                description = $3,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            EVENT_COLUMNS
        );

        let updated = sqlx::query_as::<_, Event>(&sql)
            .bind(event.id)
            .bind(&event.name)
            .bind(&event.description)
            .fetch_optional(self.pool.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Event not found: {}", event.id)))?;

        tracing::info!(event_id = event.id, "Event updated");
        Ok(updated)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: i64) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(self.pool.pool())
            .await?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            tracing::info!(event_id = id, "Event deleted");
        }
        Ok(deleted)
    }

    #[instrument(skip(self))]
    async fn participant_ids(&self, event_id: i64) -> Result<Vec<i64>, DatabaseError> {
        let ids = sqlx::query_scalar(
            r#"
            SELECT user_id
            FROM event_participations
            WHERE event_id = $1
            ORDER BY joined_at, user_id
            "#,
        )
        .bind(event_id)
        .fetch_all(self.pool.pool())
        .await?;

        Ok(ids)
    }

    #[instrument(skip(self))]
    async fn add_participant(
        &self,
        event_id: i64,
        user_id: i64,
    ) -> Result<JoinOutcome, DatabaseError> {
        let mut tx = self
            .pool
            .pool()
            .begin()
            .await
            .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))?;

        // The row lock makes count-then-insert atomic across concurrent joins
        let max_participants: Option<i32> =
            sqlx::query_scalar("SELECT max_participants FROM events WHERE id = $1 FOR UPDATE")
                .bind(event_id)
                .fetch_optional(&mut *tx)
                .await?;

        let outcome = match max_participants {
            None => JoinOutcome::EventNotFound,
            Some(max_participants) => {
                let already: bool = sqlx::query_scalar(
                    r#"
                    SELECT EXISTS (
                        SELECT 1 FROM event_participations
                        WHERE event_id = $1 AND user_id = $2
                    )
                    "#,
                )
                .bind(event_id)
                .bind(user_id)
                .fetch_one(&mut *tx)
                .await?;

                let current: i64 = sqlx::query_scalar(
                    "SELECT COUNT(*) FROM event_participations WHERE event_id = $1",
                )
                .bind(event_id)
                .fetch_one(&mut *tx)
                .await?;

                if already {
                    JoinOutcome::AlreadyParticipating
                } else if !has_capacity(current, max_participants) {
                    JoinOutcome::Full { max_participants }
                } else {
                    sqlx::query(
                        "INSERT INTO event_participations (event_id, user_id) VALUES ($1, $2)",
                    )
                    .bind(event_id)
                    .bind(user_id)
                    .execute(&mut *tx)
                    .await?;
                    JoinOutcome::Joined {
                        participants: current + 1,
                    }
                }
            }
        };

        if matches!(outcome, JoinOutcome::Joined { .. }) {
            tx.commit()
                .await
                .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))?;
        } else {
            tx.rollback()
                .await
                .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))?;
        }

        tracing::info!(event_id, user_id, outcome = ?outcome, "Participation requested");
        Ok(outcome)
    }

    #[instrument(skip(self))]
    async fn remove_participant(
        &self,
        event_id: i64,
        user_id: i64,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "DELETE FROM event_participations WHERE event_id = $1 AND user_id = $2",
        )
        .bind(event_id)
        .bind(user_id)
        .execute(self.pool.pool())
        .await?;

        let removed = result.rows_affected() > 0;
        if removed {
            tracing::info!(event_id, user_id, "Participant removed");
        }
        Ok(removed)
    }
}
