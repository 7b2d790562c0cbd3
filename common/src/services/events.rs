// Events and capacity-limited participation

use crate::db::repositories::{EventStore, OrganizationStore};
use crate::errors::{DatabaseError, EventError};
use crate::models::{Event, EventChanges, JoinOutcome, NewEvent};
use crate::telemetry;
use crate::validation::{
    validate_event_dates, validate_event_description, validate_max_participants, validate_name,
};
use std::sync::Arc;
use tracing::instrument;

#[derive(Clone)]
pub struct EventService {
    events: Arc<dyn EventStore>,
    organizations: Arc<dyn OrganizationStore>,
}

impl EventService {
    pub fn new(events: Arc<dyn EventStore>, organizations: Arc<dyn OrganizationStore>) -> Self {
        Self {
            events,
            organizations,
        }
    }

    /// Validate and store a new event
    #[instrument(skip(self, draft), fields(organization_id = draft.organization_id))]
    pub async fn create(&self, draft: NewEvent) -> Result<Event, EventError> {
        let event = NewEvent {
            name: validate_name(&draft.name)?,
            description: validate_event_description(&draft.description)?,
            beginning: draft.beginning,
            end: draft.end,
            max_participants: draft.max_participants,
            organization_id: draft.organization_id,
        };
        validate_event_dates(event.beginning, event.end)?;
        validate_max_participants(event.max_participants)?;

        if self
            .organizations
            .find_by_id(event.organization_id)
            .await?
            .is_none()
        {
            return Err(EventError::UnknownOrganization(event.organization_id));
        }

        // the organization may still disappear before the insert
        self.events.create(&event).await.map_err(|e| match e {
            DatabaseError::ForeignKeyViolation(_) => {
                EventError::UnknownOrganization(event.organization_id)
            }
            other => EventError::Database(other),
        })
    }

    #[instrument(skip(self))]
    pub async fn find_all(&self) -> Result<Vec<Event>, EventError> {
        Ok(self.events.find_all().await?)
    }

    #[instrument(skip(self))]
    pub async fn find_by_id(&self, id: i64) -> Result<Event, EventError> {
        self.events
            .find_by_id(id)
            .await?
            .ok_or(EventError::NotFound(id))
    }

    /// Events of one organization; empty for an unknown organization
    #[instrument(skip(self))]
    pub async fn for_organization(&self, organization_id: i64) -> Result<Vec<Event>, EventError> {
        Ok(self.events.find_for_organization(organization_id).await?)
    }

    #[instrument(skip(self))]
    pub async fn for_user(&self, user_id: i64) -> Result<Vec<Event>, EventError> {
        Ok(self.events.find_for_user(user_id).await?)
    }

    /// Rename or re-describe an event; dates and capacity are fixed
    #[instrument(skip(self, changes))]
    pub async fn update(&self, id: i64, changes: EventChanges) -> Result<Event, EventError> {
        let mut event = self.find_by_id(id).await?;

        if let Some(name) = changes.name {
            event.name = validate_name(&name)?;
        }
        if let Some(description) = changes.description {
            event.description = validate_event_description(&description)?;
        }

        self.events.update(&event).await.map_err(|e| match e {
            DatabaseError::NotFound(_) => EventError::NotFound(id),
            other => EventError::Database(other),
        })
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> Result<(), EventError> {
        if !self.events.delete(id).await? {
            return Err(EventError::NotFound(id));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn participant_ids(&self, id: i64) -> Result<Vec<i64>, EventError> {
        self.find_by_id(id).await?;
        Ok(self.events.participant_ids(id).await?)
    }

    /// Register the user unless the event is full; returns the new head count
    #[instrument(skip(self))]
    pub async fn join(&self, event_id: i64, user_id: i64) -> Result<i64, EventError> {
        // the event row is locked, so a foreign key failure means the user is gone
        let outcome = self
            .events
            .add_participant(event_id, user_id)
            .await
            .map_err(|e| match e {
                DatabaseError::ForeignKeyViolation(_) => EventError::UserNotFound(user_id),
                other => EventError::Database(other),
            })?;

        match outcome {
            JoinOutcome::Joined { participants } => {
                telemetry::record_participation("joined");
                Ok(participants)
            }
            JoinOutcome::Full { max_participants } => {
                telemetry::record_participation("full");
                Err(EventError::Full {
                    event_id,
                    max_participants,
                })
            }
            JoinOutcome::AlreadyParticipating => {
                telemetry::record_participation("already_participating");
                Err(EventError::AlreadyParticipating { event_id, user_id })
            }
            JoinOutcome::EventNotFound => Err(EventError::NotFound(event_id)),
        }
    }

    #[instrument(skip(self))]
    pub async fn leave(&self, event_id: i64, user_id: i64) -> Result<(), EventError> {
        self.find_by_id(event_id).await?;

        if !self.events.remove_participant(event_id, user_id).await? {
            return Err(EventError::NotParticipating { event_id, user_id });
        }
        telemetry::record_participation("left");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::event::MockEventStore;
    use crate::db::repositories::organization::MockOrganizationStore;
    use crate::models::Organization;
    use chrono::{Duration, Utc};

    fn draft() -> NewEvent {
        let beginning = Utc::now() + Duration::days(7);
        NewEvent {
            name: " Rust Meetup ".to_string(),
            description: "An evening of talks about ownership and lifetimes".to_string(),
            beginning,
            end: beginning + Duration::hours(3),
            max_participants: 2,
            organization_id: 1,
        }
    }

    fn stored(id: i64, event: &NewEvent) -> Event {
        Event {
            id,
            name: event.name.clone(),
            description: event.description.clone(),
            beginning: event.beginning,
            end: event.end,
            max_participants: event.max_participants,
            organization_id: event.organization_id,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn service(events: MockEventStore) -> EventService {
        let mut organizations = MockOrganizationStore::new();
        organizations.expect_find_by_id().returning(|id| {
            Ok((id == 1).then(|| Organization {
                id,
                name: "Rustaceans".to_string(),
                description: "Local Rust user group".to_string(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            }))
        });
        EventService::new(Arc::new(events), Arc::new(organizations))
    }

    #[tokio::test]
    async fn test_create_trims_name() {
        let mut events = MockEventStore::new();
        events
            .expect_create()
            .withf(|e| e.name == "Rust Meetup")
            .returning(|e| Ok(stored(4, e)));

        let event = service(events).create(draft()).await.unwrap();
        assert_eq!(event.id, 4);
        assert_eq!(event.name, "Rust Meetup");
    }

    #[tokio::test]
    async fn test_create_rejects_inverted_dates() {
        let mut events = MockEventStore::new();
        events.expect_create().never();

        let mut event = draft();
        event.end = event.beginning - Duration::hours(1);
        match service(events).create(event).await {
            Err(EventError::Validation(err)) => assert_eq!(err.field(), "end"),
            other => panic!("unexpected result: {:?}", other.map(|e| e.id)),
        }
    }

    #[tokio::test]
    async fn test_create_rejects_zero_capacity() {
        let mut event = draft();
        event.max_participants = 0;
        match service(MockEventStore::new()).create(event).await {
            Err(EventError::Validation(err)) => assert_eq!(err.field(), "maxParticipants"),
            other => panic!("unexpected result: {:?}", other.map(|e| e.id)),
        }
    }

    #[tokio::test]
    async fn test_create_organization_deleted_concurrently() {
        let mut events = MockEventStore::new();
        events.expect_create().returning(|_| {
            Err(DatabaseError::ForeignKeyViolation(
                "events_organization_id_fkey".to_string(),
            ))
        });

        let result = service(events).create(draft()).await;
        assert!(matches!(result, Err(EventError::UnknownOrganization(1))));
    }

    #[tokio::test]
    async fn test_create_checks_organization_first() {
        let mut events = MockEventStore::new();
        events.expect_create().never();

        let mut event = draft();
        event.organization_id = 2;
        assert!(matches!(
            service(events).create(event).await,
            Err(EventError::UnknownOrganization(2))
        ));
    }

    #[tokio::test]
    async fn test_join_maps_outcomes() {
        let mut events = MockEventStore::new();
        events
            .expect_add_participant()
            .withf(|event_id, _| *event_id == 1)
            .returning(|_, _| Ok(JoinOutcome::Joined { participants: 2 }));
        events
            .expect_add_participant()
            .withf(|event_id, _| *event_id == 2)
            .returning(|_, _| {
                Ok(JoinOutcome::Full {
                    max_participants: 2,
                })
            });
        events
            .expect_add_participant()
            .withf(|event_id, _| *event_id == 3)
            .returning(|_, _| Ok(JoinOutcome::AlreadyParticipating));
        events
            .expect_add_participant()
            .withf(|event_id, _| *event_id == 4)
            .returning(|_, _| Ok(JoinOutcome::EventNotFound));
        let service = service(events);

        assert_eq!(service.join(1, 9).await.unwrap(), 2);
        assert!(matches!(
            service.join(2, 9).await,
            Err(EventError::Full {
                event_id: 2,
                max_participants: 2
            })
        ));
        assert!(matches!(
            service.join(3, 9).await,
            Err(EventError::AlreadyParticipating { .. })
        ));
        assert!(matches!(service.join(4, 9).await, Err(EventError::NotFound(4))));
    }

    #[tokio::test]
    async fn test_join_by_deleted_user() {
        let mut events = MockEventStore::new();
        events.expect_add_participant().returning(|_, _| {
            Err(DatabaseError::ForeignKeyViolation(
                "event_participations_user_id_fkey".to_string(),
            ))
        });

        let result = service(events).join(1, 66).await;
        assert!(matches!(result, Err(EventError::UserNotFound(66))));
    }

    #[tokio::test]
    async fn test_leave_removes_participation() {
        let mut events = MockEventStore::new();
        events
            .expect_find_by_id()
            .returning(|id| Ok(Some(stored(id, &draft()))));
        events
            .expect_remove_participant()
            .withf(|event_id, user_id| *event_id == 1 && *user_id == 9)
            .times(1)
            .returning(|_, _| Ok(true));

        service(events).leave(1, 9).await.unwrap();
    }

    #[tokio::test]
    async fn test_leave_unknown_event() {
        let mut events = MockEventStore::new();
        events.expect_find_by_id().returning(|_| Ok(None));
        events.expect_remove_participant().never();

        assert!(matches!(
            service(events).leave(3, 9).await,
            Err(EventError::NotFound(3))
        ));
    }

    #[tokio::test]
    async fn test_leave_without_participation() {
        let mut events = MockEventStore::new();
        events
            .expect_find_by_id()
            .returning(|id| Ok(Some(stored(id, &draft()))));
        events.expect_remove_participant().returning(|_, _| Ok(false));

        let result = service(events).leave(1, 9).await;
        assert!(matches!(result, Err(EventError::NotParticipating { .. })));
    }

    #[tokio::test]
    async fn test_update_rejects_bad_name() {
        let mut events = MockEventStore::new();
        events
            .expect_find_by_id()
            .returning(|id| Ok(Some(stored(id, &draft()))));
        events.expect_update().never();

        let changes = EventChanges {
            name: Some("Meetup #42".to_string()),
            description: None,
        };
        assert!(matches!(
            service(events).update(1, changes).await,
            Err(EventError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_for_organization_lists_store_rows() {
        let mut events = MockEventStore::new();
        events
            .expect_find_for_organization()
            .withf(|organization_id| *organization_id == 5)
            .returning(|_| Ok(vec![stored(1, &draft()), stored(2, &draft())]));

        assert_eq!(service(events).for_organization(5).await.unwrap().len(), 2);
    }
}
