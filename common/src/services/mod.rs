// Domain services: validation, guards and cascade rules on top of the stores

pub mod events;
pub mod organizations;
pub mod users;

pub use events::EventService;
pub use organizations::OrganizationService;
pub use users::UserService;

use crate::auth::PasswordHasher;
use crate::db::repositories::{
    EventRepository, EventStore, OrganizationRepository, OrganizationStore, UserRepository,
    UserStore,
};
use crate::db::DbPool;
use std::sync::Arc;

/// All domain services wired to the same stores
#[derive(Clone)]
pub struct Services {
    pub users: UserService,
    pub organizations: OrganizationService,
    pub events: EventService,
}

impl Services {
    pub fn new(
        users: Arc<dyn UserStore>,
        organizations: Arc<dyn OrganizationStore>,
        events: Arc<dyn EventStore>,
        hasher: Arc<dyn PasswordHasher>,
    ) -> Self {
        Self {
            users: UserService::new(
                users.clone(),
                organizations.clone(),
                events.clone(),
                hasher,
            ),
            organizations: OrganizationService::new(organizations.clone(), users, events.clone()),
            events: EventService::new(events, organizations),
        }
    }

    /// Services backed by the PostgreSQL repositories
    pub fn postgres(pool: &DbPool, hasher: Arc<dyn PasswordHasher>) -> Self {
        Self::new(
            Arc::new(UserRepository::new(pool.clone())),
            Arc::new(OrganizationRepository::new(pool.clone())),
            Arc::new(EventRepository::new(pool.clone())),
            hasher,
        )
    }
}
