/// Settings persistence
use super::{
    Configuration, StoredSettings, KEY_DID_LIST, KEY_ENABLE_ORG_MODE, KEY_MAIN_DID, KEY_SUBDOMAIN,
};
use crate::error::DidgeridooResult;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use tokio::sync::RwLock;

/// Source and sink of the settings record
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Read the raw persisted values
    async fn load_stored(&self) -> DidgeridooResult<StoredSettings>;

    /// Replace the whole record
    async fn save(&self, settings: &StoredSettings) -> DidgeridooResult<()>;

    /// Read and parse a configuration snapshot
    async fn load(&self) -> DidgeridooResult<Configuration> {
        let stored = self.load_stored().await?;
        Configuration::from_stored(&stored)
    }
}

/// Settings stored in the `options` table
#[derive(Clone)]
pub struct SqliteSettingsStore {
    db: SqlitePool,
}

impl SqliteSettingsStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SettingsStore for SqliteSettingsStore {
    async fn load_stored(&self) -> DidgeridooResult<StoredSettings> {
        let rows = sqlx::query(
            r#"
            SELECT name, value
            FROM options
            WHERE name IN (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(KEY_MAIN_DID)
        .bind(KEY_SUBDOMAIN)
        .bind(KEY_DID_LIST)
        .bind(KEY_ENABLE_ORG_MODE)
        .fetch_all(&self.db)
        .await?;

        // Missing keys read as empty defaults
        let mut stored = StoredSettings::default();
        for row in rows {
            let name: String = row.try_get("name")?;
            let value: String = row.try_get("value")?;
            match name.as_str() {
                KEY_MAIN_DID => stored.main_did = value,
                KEY_SUBDOMAIN => stored.subdomain = value,
                KEY_DID_LIST => stored.did_list = value,
                KEY_ENABLE_ORG_MODE => stored.enable_org_mode = value,
                _ => {}
            }
        }

        Ok(stored)
    }

    async fn save(&self, settings: &StoredSettings) -> DidgeridooResult<()> {
        let mut tx = self.db.begin().await?;

        for (name, value) in [
            (KEY_MAIN_DID, &settings.main_did),
            (KEY_SUBDOMAIN, &settings.subdomain),
            (KEY_DID_LIST, &settings.did_list),
            (KEY_ENABLE_ORG_MODE, &settings.enable_org_mode),
        ] {
            sqlx::query(
                r#"
                INSERT INTO options (name, value)
                VALUES (?1, ?2)
                ON CONFLICT(name) DO UPDATE SET value = excluded.value
                "#,
            )
            .bind(name)
            .bind(value)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::debug!("settings record saved");
        Ok(())
    }
}

/// In-process settings
#[derive(Default)]
pub struct MemorySettingsStore {
    settings: RwLock<StoredSettings>,
}

impl MemorySettingsStore {
    pub fn new(settings: StoredSettings) -> Self {
        Self {
            settings: RwLock::new(settings),
        }
    }

    pub fn from_config(config: &Configuration) -> Self {
        Self::new(config.to_stored())
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn load_stored(&self) -> DidgeridooResult<StoredSettings> {
        Ok(self.settings.read().await.clone())
    }

    async fn save(&self, settings: &StoredSettings) -> DidgeridooResult<()> {
        *self.settings.write().await = settings.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::error::DidgeridooError;

    async fn sqlite_store() -> SqliteSettingsStore {
        let pool = db::create_memory_pool().await.unwrap();
        db::run_migrations(&pool).await.unwrap();
        SqliteSettingsStore::new(pool)
    }

    #[tokio::test]
    async fn test_fresh_store_has_empty_defaults() {
        let store = sqlite_store().await;
        let config = store.load().await.unwrap();

        assert_eq!(config, Configuration::default());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let store = sqlite_store().await;
        let stored = StoredSettings {
            main_did: "did:plc:abc123".into(),
            subdomain: "ids".into(),
            did_list: r#"[{"name":"alice","did":"did:plc:xyz"}]"#.into(),
            enable_org_mode: "1".into(),
        };

        store.save(&stored).await.unwrap();

        assert_eq!(store.load_stored().await.unwrap(), stored);
        let config = store.load().await.unwrap();
        assert!(config.org_mode_enabled);
        assert_eq!(config.did_list.len(), 1);
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let store = sqlite_store().await;
        let first = StoredSettings {
            main_did: "did:plc:first".into(),
            ..Default::default()
        };
        let second = StoredSettings {
            main_did: "did:plc:second".into(),
            ..Default::default()
        };

        store.save(&first).await.unwrap();
        store.save(&second).await.unwrap();

        assert_eq!(store.load_stored().await.unwrap().main_did, "did:plc:second");
    }

    #[tokio::test]
    async fn test_corrupt_list_surfaces_on_load() {
        let store = MemorySettingsStore::new(StoredSettings {
            did_list: "not json".into(),
            ..Default::default()
        });

        assert!(matches!(
            store.load().await,
            Err(DidgeridooError::ConfigCorrupt(_))
        ));
        // Raw values stay readable so the owner can repair them
        assert_eq!(store.load_stored().await.unwrap().did_list, "not json");
    }

    #[test]
    fn test_memory_store_from_config() {
        use crate::directory::{DidList, DidRecord};

        let config = Configuration {
            main_did: "did:plc:abc123".into(),
            subdomain: "ids".into(),
            org_mode_enabled: true,
            did_list: DidList::new(vec![DidRecord::new("alice", "did:plc:xyz")]),
        };
        let store = MemorySettingsStore::from_config(&config);

        let loaded = tokio_test::block_on(store.load()).unwrap();
        assert_eq!(loaded, config);
    }
}
