// Repository layer for database operations
//
// Each store is a trait so services can be exercised without PostgreSQL;
// the `*Repository` types are the sqlx-backed implementations.

pub mod event;
pub mod organization;
pub mod user;

pub use event::{EventRepository, EventStore};
pub use organization::{OrganizationRepository, OrganizationStore};
pub use user::{UserRepository, UserStore};
