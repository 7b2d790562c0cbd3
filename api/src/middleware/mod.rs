mod audit;
mod auth;
mod membership;
mod ownership;

pub use audit::audit_logging;
pub use auth::{bearer_token, optional_auth, require_auth, AuthenticatedUser};
pub use membership::{
    require_body_organization_member, require_event_organization_member,
    require_organization_member,
};
pub use ownership::require_owner;
