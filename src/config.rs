/// Configuration management for DIDgeridoo
use crate::{
    error::{DidgeridooError, DidgeridooResult},
    validation::is_valid_handle,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub authentication: AuthConfig,
    pub identity: IdentityConfig,
    pub probe: ProbeConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub bind_address: String,
    pub port: u16,
    /// Canonical site hostname; the root handle
    pub site_domain: String,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub database: PathBuf,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Token subjects holding the admin capability (comma-separated in env)
    pub admin_subjects: Vec<String>,
}

/// Where organization handles are looked up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandleSource {
    /// Centralized `didgeridoo_did_list` setting
    List,
    /// Per-user profile metadata
    Profiles,
}

impl HandleSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            HandleSource::List => "list",
            HandleSource::Profiles => "profiles",
        }
    }

}

impl FromStr for HandleSource {
    type Err = DidgeridooError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "list" => Ok(HandleSource::List),
            "profiles" => Ok(HandleSource::Profiles),
            _ => Err(DidgeridooError::Config(format!("Invalid handle source: {}", s))),
        }
    }
}

/// Identity configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    pub handle_source: HandleSource,
}

/// Subdomain self-test configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// `https` or `http`
    pub scheme: String,
    /// Port to probe, when the site is not served on the scheme's default
    #[serde(default)]
    pub port: Option<u16>,
    pub timeout_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> DidgeridooResult<Self> {
        dotenv::dotenv().ok();

        let bind_address =
            env::var("DIDGERIDOO_BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("DIDGERIDOO_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|_| DidgeridooError::Config("Invalid port number".to_string()))?;
        let site_domain = env::var("DIDGERIDOO_SITE_DOMAIN")
            .map_err(|_| DidgeridooError::Config("Site domain required".to_string()))?
            .trim()
            .to_lowercase();

        let database = env::var("DIDGERIDOO_DATABASE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data/didgeridoo.sqlite"));

        let jwt_secret = env::var("DIDGERIDOO_JWT_SECRET")
            .map_err(|_| DidgeridooError::Config("JWT secret required".to_string()))?;

        // Parse admin subjects from comma-separated list
        let admin_subjects = env::var("DIDGERIDOO_ADMIN_SUBJECTS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<String>>();

        let handle_source: HandleSource = env::var("DIDGERIDOO_HANDLE_SOURCE")
            .unwrap_or_else(|_| "list".to_string())
            .parse()?;

        let probe_scheme = env::var("DIDGERIDOO_PROBE_SCHEME")
            .unwrap_or_else(|_| "https".to_string())
            .to_lowercase();
        let probe_port = match env::var("DIDGERIDOO_PROBE_PORT") {
            Ok(port) => Some(
                port.parse()
                    .map_err(|_| DidgeridooError::Config("Invalid probe port".to_string()))?,
            ),
            Err(_) => None,
        };
        let probe_timeout_secs = env::var("DIDGERIDOO_PROBE_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .map_err(|_| DidgeridooError::Config("Invalid probe timeout".to_string()))?;

        let log_level = env::var("RUST_LOG")
            .unwrap_or_else(|_| "didgeridoo=info,tower_http=info".to_string());
        let log_json = env::var("DIDGERIDOO_LOG_FORMAT")
            .map(|f| f.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        Ok(ServerConfig {
            service: ServiceConfig {
                bind_address,
                port,
                site_domain,
            },
            storage: StorageConfig { database },
            authentication: AuthConfig {
                jwt_secret,
                admin_subjects,
            },
            identity: IdentityConfig { handle_source },
            probe: ProbeConfig {
                scheme: probe_scheme,
                port: probe_port,
                timeout_secs: probe_timeout_secs,
            },
            logging: LoggingConfig {
                level: log_level,
                json: log_json,
            },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> DidgeridooResult<()> {
        if !is_valid_handle(&self.service.site_domain) {
            return Err(DidgeridooError::Config(format!(
                "Site domain is not a valid hostname: {:?}",
                self.service.site_domain
            )));
        }

        if self.authentication.jwt_secret.len() < 32 {
            return Err(DidgeridooError::Config(
                "JWT secret must be at least 32 characters".to_string(),
            ));
        }

        if self.probe.scheme != "https" && self.probe.scheme != "http" {
            return Err(DidgeridooError::Config(format!(
                "Probe scheme must be http or https: {}",
                self.probe.scheme
            )));
        }

        Ok(())
    }

    /// Configuration for tests and local tooling
    pub fn for_site(site_domain: &str, jwt_secret: &str) -> Self {
        ServerConfig {
            service: ServiceConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 3000,
                site_domain: site_domain.to_lowercase(),
            },
            storage: StorageConfig {
                database: PathBuf::from("./data/didgeridoo.sqlite"),
            },
            authentication: AuthConfig {
                jwt_secret: jwt_secret.to_string(),
                admin_subjects: Vec::new(),
            },
            identity: IdentityConfig {
                handle_source: HandleSource::List,
            },
            probe: ProbeConfig {
                scheme: "https".to_string(),
                port: None,
                timeout_secs: 10,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                json: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test_secret_key_that_is_32_chars";

    #[test]
    fn test_validate_accepts_defaults() {
        let config = ServerConfig::for_site("example.com", SECRET);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_site_domain() {
        let config = ServerConfig::for_site("localhost", SECRET);
        assert!(matches!(config.validate(), Err(DidgeridooError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_short_secret() {
        let config = ServerConfig::for_site("example.com", "short");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unknown_probe_scheme() {
        let mut config = ServerConfig::for_site("example.com", SECRET);
        config.probe.scheme = "ftp".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_handle_source_parsing() {
        assert_eq!("list".parse::<HandleSource>().unwrap(), HandleSource::List);
        assert_eq!(" Profiles ".parse::<HandleSource>().unwrap(), HandleSource::Profiles);
        assert!("ldap".parse::<HandleSource>().is_err());
    }
}
