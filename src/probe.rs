/// Subdomain reachability self-test
///
/// Fetches the well-known path on `didgeridoo-test[.<subdomain>].<site>`; a 200
/// means wildcard DNS and routing for organization handles already work.
use crate::{
    config::ProbeConfig,
    error::{DidgeridooError, DidgeridooResult},
    validation::RESERVED_LABEL,
};
use std::time::Duration;

#[derive(Clone)]
pub struct SubdomainProbe {
    http_client: reqwest::Client,
    scheme: String,
    port: Option<u16>,
}

impl SubdomainProbe {
    pub fn new(config: &ProbeConfig) -> DidgeridooResult<Self> {
        let http_client = Self::client_builder(config)
            .build()
            .map_err(|e| DidgeridooError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self::with_client(http_client, config))
    }

    /// Probe over a caller-built client
    pub fn with_client(http_client: reqwest::Client, config: &ProbeConfig) -> Self {
        Self {
            http_client,
            scheme: config.scheme.clone(),
            port: config.port,
        }
    }

    /// Client settings every probe uses
    pub fn client_builder(config: &ProbeConfig) -> reqwest::ClientBuilder {
        reqwest::Client::builder()
            .user_agent(concat!("DIDgeridoo/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
    }

    /// Hostname the probe requests for `subdomain` under `site_domain`
    pub fn probe_host(subdomain: &str, site_domain: &str) -> String {
        if subdomain.is_empty() {
            format!("{}.{}", RESERVED_LABEL, site_domain)
        } else {
            format!("{}.{}.{}", RESERVED_LABEL, subdomain, site_domain)
        }
    }

    /// URL the probe requests for `subdomain` under `site_domain`
    pub fn probe_url(&self, subdomain: &str, site_domain: &str) -> String {
        let port = self.port.map(|p| format!(":{}", p)).unwrap_or_default();
        format!(
            "{}://{}{}/.well-known/atproto-did",
            self.scheme,
            Self::probe_host(subdomain, site_domain),
            port
        )
    }

    /// `Ok` only when the probe URL answers 200
    pub async fn check(&self, subdomain: &str, site_domain: &str) -> DidgeridooResult<()> {
        let url = self.probe_url(subdomain, site_domain);

        // Host carries the handle alone, as a resolver would send it
        let response = self
            .http_client
            .get(&url)
            .header(reqwest::header::HOST, Self::probe_host(subdomain, site_domain))
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(url = %url, error = %e, "subdomain probe request failed");
                DidgeridooError::UpstreamUnreachable(format!("{}: {}", url, e))
            })?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            tracing::warn!(url = %url, status = %status, "subdomain probe returned non-200");
            return Err(DidgeridooError::UpstreamUnreachable(format!(
                "{} returned {}",
                url, status
            )));
        }

        tracing::info!(url = %url, "subdomain probe succeeded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        http::{header, HeaderMap, StatusCode},
        routing::get,
        Router,
    };
    use std::net::SocketAddr;

    fn config(scheme: &str, port: Option<u16>) -> ProbeConfig {
        ProbeConfig {
            scheme: scheme.to_string(),
            port,
            timeout_secs: 2,
        }
    }

    /// Serve `status` on the well-known path from a loopback listener
    ///
    /// Requests whose Host carries a port get 400.
    async fn spawn_site(status: StatusCode) -> SocketAddr {
        let app = Router::new().route(
            "/.well-known/atproto-did",
            get(move |headers: HeaderMap| async move {
                let host = headers
                    .get(header::HOST)
                    .and_then(|h| h.to_str().ok())
                    .unwrap_or_default();
                if host.contains(':') {
                    StatusCode::BAD_REQUEST
                } else {
                    status
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    /// Probe whose requests for `host` land on `addr`
    fn local_probe(host: &str, addr: SocketAddr) -> SubdomainProbe {
        let config = config("http", Some(addr.port()));
        let client = SubdomainProbe::client_builder(&config)
            .resolve(host, addr)
            .no_proxy()
            .build()
            .unwrap();
        SubdomainProbe::with_client(client, &config)
    }

    #[test]
    fn test_probe_url_with_subdomain() {
        let probe = SubdomainProbe::new(&config("https", None)).unwrap();
        assert_eq!(
            probe.probe_url("ids", "example.com"),
            "https://didgeridoo-test.ids.example.com/.well-known/atproto-did"
        );
    }

    #[test]
    fn test_probe_url_without_subdomain() {
        let probe = SubdomainProbe::new(&config("http", Some(8080))).unwrap();
        assert_eq!(
            probe.probe_url("", "example.com"),
            "http://didgeridoo-test.example.com:8080/.well-known/atproto-did"
        );
    }

    #[tokio::test]
    async fn test_ok_response_is_reachable() {
        let addr = spawn_site(StatusCode::OK).await;
        let probe = local_probe("didgeridoo-test.ids.example.com", addr);

        assert!(probe.check("ids", "example.com").await.is_ok());
    }

    #[tokio::test]
    async fn test_non_200_response_is_unreachable() {
        let addr = spawn_site(StatusCode::NOT_FOUND).await;
        let probe = local_probe("didgeridoo-test.example.com", addr);

        match probe.check("", "example.com").await {
            Err(DidgeridooError::UpstreamUnreachable(reason)) => assert!(reason.contains("404")),
            other => panic!("expected UpstreamUnreachable, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreachable_host_reports_upstream_error() {
        // .invalid never resolves
        let probe = SubdomainProbe::new(&config("http", None)).unwrap();

        let result = probe.check("", "example.invalid").await;
        assert!(matches!(result, Err(DidgeridooError::UpstreamUnreachable(_))));
    }
}
