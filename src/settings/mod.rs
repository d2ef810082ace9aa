/// Persisted DIDgeridoo settings
///
/// Four fixed keys hold the whole configuration. `StoredSettings` mirrors the
/// persisted strings; `Configuration` is the parsed snapshot the resolver reads.
pub mod store;
pub mod update;

use crate::{
    directory::DidList,
    error::{DidgeridooError, DidgeridooResult},
    validation::parse_boolish,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use store::{MemorySettingsStore, SettingsStore, SqliteSettingsStore};

pub const KEY_SUBDOMAIN: &str = "didgeridoo_subdomain";
pub const KEY_MAIN_DID: &str = "didgeridoo_main_did";
pub const KEY_DID_LIST: &str = "didgeridoo_did_list";
pub const KEY_ENABLE_ORG_MODE: &str = "didgeridoo_enable_org_mode";

/// Setting values exactly as persisted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSettings {
    pub main_did: String,
    pub subdomain: String,
    /// JSON-encoded handle list
    pub did_list: String,
    /// Boolean-ish: `"1"` when enabled
    pub enable_org_mode: String,
}

impl StoredSettings {
    pub fn org_mode_enabled(&self) -> bool {
        parse_boolish(&Value::String(self.enable_org_mode.clone())).unwrap_or(false)
    }
}

/// Parsed configuration snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Configuration {
    pub main_did: String,
    pub subdomain: String,
    pub org_mode_enabled: bool,
    pub did_list: DidList,
}

impl Configuration {
    /// Parse persisted settings; an unparseable handle list is `ConfigCorrupt`
    pub fn from_stored(stored: &StoredSettings) -> DidgeridooResult<Self> {
        let did_list = DidList::parse(&stored.did_list)
            .map_err(|e| DidgeridooError::ConfigCorrupt(format!("{}: {}", KEY_DID_LIST, e)))?;

        Ok(Self {
            main_did: stored.main_did.clone(),
            subdomain: stored.subdomain.clone(),
            org_mode_enabled: stored.org_mode_enabled(),
            did_list,
        })
    }

    pub fn to_stored(&self) -> StoredSettings {
        StoredSettings {
            main_did: self.main_did.clone(),
            subdomain: self.subdomain.clone(),
            did_list: self.did_list.to_json(),
            enable_org_mode: if self.org_mode_enabled { "1" } else { "" }.to_string(),
        }
    }

    /// Parent domain of organization handles
    pub fn member_domain(&self, site_host: &str) -> String {
        if self.subdomain.is_empty() {
            site_host.to_string()
        } else {
            format!("{}.{}", self.subdomain, site_host)
        }
    }
}
