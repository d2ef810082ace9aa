/// Prometheus metrics for DIDgeridoo
///
/// - Handle resolution outcomes
/// - Settings and profile writes
/// - Subdomain self-test results

use lazy_static::lazy_static;
use prometheus::{register_int_counter_vec, Encoder, IntCounterVec, TextEncoder};

lazy_static! {
    /// Well-known resolutions by outcome
    pub static ref HANDLE_RESOLUTIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "handle_resolutions_total",
        "Total number of /.well-known/atproto-did resolutions",
        &["outcome"]
    )
    .unwrap();

    /// Settings and profile writes by kind and status
    pub static ref SETTINGS_UPDATES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "settings_updates_total",
        "Total number of settings and profile writes",
        &["kind", "status"]
    )
    .unwrap();

    /// Subdomain self-tests by status
    pub static ref DNS_PROBES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "dns_probes_total",
        "Total number of subdomain reachability probes",
        &["status"]
    )
    .unwrap();
}

/// Render metrics in Prometheus text format
pub fn render_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!(error = %e, "failed to encode metrics");
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Record a resolution outcome (`did`, `probe`, `not_found`, ...)
pub fn record_resolution(outcome: &str) {
    HANDLE_RESOLUTIONS_TOTAL.with_label_values(&[outcome]).inc();
}

/// Record a settings or profile write
pub fn record_settings_update(kind: &str, success: bool) {
    SETTINGS_UPDATES_TOTAL
        .with_label_values(&[kind, if success { "success" } else { "rejected" }])
        .inc();
}

/// Record a subdomain probe
pub fn record_dns_probe(reachable: bool) {
    DNS_PROBES_TOTAL
        .with_label_values(&[if reachable { "reachable" } else { "unreachable" }])
        .inc();
}
