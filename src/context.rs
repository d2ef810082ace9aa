/// Application context and dependency injection
use crate::{
    config::{HandleSource, ServerConfig},
    db,
    directory::DidList,
    error::DidgeridooResult,
    probe::SubdomainProbe,
    profiles::ProfileStore,
    resolver::HandleResolver,
    settings::{Configuration, SettingsStore, SqliteSettingsStore},
};
use sqlx::SqlitePool;
use std::borrow::Cow;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub settings: Arc<dyn SettingsStore>,
    pub profiles: Arc<ProfileStore>,
    pub resolver: Arc<HandleResolver>,
    pub probe: Arc<SubdomainProbe>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> DidgeridooResult<Self> {
        config.validate()?;

        let db = db::create_pool(&config.storage.database, db::DatabaseOptions::default()).await?;
        Self::with_pool(config, db).await
    }

    /// Build the context over an existing pool, running migrations first
    pub async fn with_pool(config: ServerConfig, db: SqlitePool) -> DidgeridooResult<Self> {
        db::run_migrations(&db).await?;
        db::test_connection(&db).await?;

        let settings: Arc<dyn SettingsStore> = Arc::new(SqliteSettingsStore::new(db.clone()));
        let profiles = Arc::new(ProfileStore::new(db.clone()));
        let resolver = Arc::new(HandleResolver::new(config.service.site_domain.clone()));
        let probe = Arc::new(SubdomainProbe::new(&config.probe)?);

        tracing::info!(
            site_domain = %config.service.site_domain,
            handle_source = config.identity.handle_source.as_str(),
            "application context ready"
        );

        Ok(Self {
            config: Arc::new(config),
            db,
            settings,
            profiles,
            resolver,
            probe,
        })
    }

    /// Site hostname the root handle is served for
    pub fn site_domain(&self) -> &str {
        &self.config.service.site_domain
    }

    pub fn handle_source(&self) -> HandleSource {
        self.config.identity.handle_source
    }

    /// Organization handle directory selected by the handle source
    pub async fn directory<'a>(
        &self,
        config: &'a Configuration,
    ) -> DidgeridooResult<Cow<'a, DidList>> {
        match self.handle_source() {
            HandleSource::List => Ok(Cow::Borrowed(&config.did_list)),
            HandleSource::Profiles => Ok(Cow::Owned(self.profiles.directory().await?)),
        }
    }
}
