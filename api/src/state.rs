use std::sync::Arc;

use common::auth::{BcryptHasher, DatabaseAuthService, JwtService, PasswordHasher};
use common::config::Settings;
use common::db::DbPool;
use common::services::Services;
use metrics_exporter_prometheus::PrometheusHandle;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: DbPool,
    pub config: Arc<Settings>,
    pub auth: DatabaseAuthService,
    pub services: Services,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Wire services to the PostgreSQL repositories
    pub fn new(db_pool: DbPool, config: Settings, metrics: Option<PrometheusHandle>) -> Self {
        let hasher: Arc<dyn PasswordHasher> = Arc::new(BcryptHasher::new(config.auth.bcrypt_cost));
        let services = Services::postgres(&db_pool, hasher.clone());
        let jwt = JwtService::new(&config.auth.jwt_secret, config.auth.jwt_expiration_hours);
        let auth = DatabaseAuthService::new(
            jwt,
            Arc::new(common::db::repositories::UserRepository::new(db_pool.clone())),
            hasher,
        );

        Self {
            db_pool,
            config: Arc::new(config),
            auth,
            services,
            metrics,
        }
    }
}
