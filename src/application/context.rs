use std::sync::Arc;

use crate::config::Settings;
use crate::infrastructure::cache::CacheStore;
use crate::infrastructure::cluster::ClusterResolver;
use crate::infrastructure::db::repositories::Repositories;
use crate::infrastructure::notify::Mailer;

/// Shared application resources used by use cases and handlers.
pub struct AppContext {
    pub repos: Repositories,
    pub cache: Arc<dyn CacheStore>,
    pub clusters: Arc<dyn ClusterResolver>,
    pub mailer: Arc<Mailer>,
    pub settings: Settings,
}

impl AppContext {
    /// Build a new application context with shared repositories and gateways.
    pub fn new(
        repos: Repositories,
        cache: Arc<dyn CacheStore>,
        clusters: Arc<dyn ClusterResolver>,
        mailer: Arc<Mailer>,
        settings: Settings,
    ) -> Self {
        Self {
            repos,
            cache,
            clusters,
            mailer,
            settings,
        }
    }
}
