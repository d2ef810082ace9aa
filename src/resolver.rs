/// Hostname to DID resolution for /.well-known/atproto-did
///
/// Pure over (host, configuration, directory). Malformed hosts are rejected
/// before any lookup.
use crate::{
    directory::HandleDirectory,
    error::ResolutionError,
    settings::Configuration,
    validation::{is_valid_handle, RESERVED_LABEL},
};

/// Body returned to the subdomain self-test
pub const PROBE_RESPONSE: &str = "Success";

/// Successful outcome of a resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// `didgeridoo-test.*` reached this service
    Probe,
    /// DID published for the host
    Did(String),
}

impl Resolution {
    /// Response body line without the trailing newline
    pub fn body(&self) -> &str {
        match self {
            Resolution::Probe => PROBE_RESPONSE,
            Resolution::Did(did) => did,
        }
    }
}

/// How a syntactically valid host relates to the site
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostMatch<'a> {
    Probe,
    Root,
    /// Organization handle with its left-most label
    Member(&'a str),
    Unmatched,
}

/// Resolver bound to the canonical site hostname
#[derive(Debug, Clone)]
pub struct HandleResolver {
    site_host: String,
}

impl HandleResolver {
    pub fn new(site_host: impl Into<String>) -> Self {
        Self {
            site_host: site_host.into(),
        }
    }

    pub fn site_host(&self) -> &str {
        &self.site_host
    }

    /// Classify `host` without consulting any handle directory
    pub fn classify<'a>(
        &self,
        host: &'a str,
        config: &Configuration,
    ) -> Result<HostMatch<'a>, ResolutionError> {
        if !is_valid_handle(host) {
            return Err(ResolutionError::InvalidHandle);
        }

        // The grammar guarantees at least one dot
        let (first_label, remainder) = host.split_once('.').unwrap_or((host, ""));

        if first_label.eq_ignore_ascii_case(RESERVED_LABEL) {
            return Ok(HostMatch::Probe);
        }

        if host.eq_ignore_ascii_case(&self.site_host) {
            return Ok(HostMatch::Root);
        }

        let member_domain = config.member_domain(&self.site_host);
        if config.org_mode_enabled && remainder.eq_ignore_ascii_case(&member_domain) {
            return Ok(HostMatch::Member(first_label));
        }

        Ok(HostMatch::Unmatched)
    }

    /// Resolve `host` to the DID it should publish
    pub fn resolve<D>(
        &self,
        host: &str,
        config: &Configuration,
        directory: &D,
    ) -> Result<Resolution, ResolutionError>
    where
        D: HandleDirectory + ?Sized,
    {
        let did = match self.classify(host, config)? {
            HostMatch::Probe => return Ok(Resolution::Probe),
            HostMatch::Root => Some(config.main_did.as_str()),
            HostMatch::Member(label) => directory.lookup(label),
            HostMatch::Unmatched => None,
        };

        match did {
            Some(did) if !did.is_empty() => Ok(Resolution::Did(did.to_string())),
            _ => Err(ResolutionError::NotFound),
        }
    }
}
