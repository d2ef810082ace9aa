/// Router-level tests for /.well-known/atproto-did
mod common;

use axum::http::StatusCode;
use common::{context, resolve, seed};
use didgeridoo::{config::HandleSource, settings::StoredSettings};

fn org_settings() -> StoredSettings {
    StoredSettings {
        main_did: "did:plc:abc123".into(),
        subdomain: "ids".into(),
        did_list: r#"[{"name":"alice","did":"did:plc:xyz"}]"#.into(),
        enable_org_mode: "1".into(),
    }
}

#[tokio::test]
async fn test_root_domain_returns_main_did() {
    let ctx = context(HandleSource::List).await;
    seed(
        &ctx,
        StoredSettings {
            main_did: "did:plc:abc123".into(),
            ..Default::default()
        },
    )
    .await;

    assert_eq!(
        resolve(&ctx, "example.com").await,
        (StatusCode::OK, "did:plc:abc123\n".to_string())
    );
    assert_eq!(resolve(&ctx, "foo.example.com").await.0, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_org_member_resolves() {
    let ctx = context(HandleSource::List).await;
    seed(&ctx, org_settings()).await;

    assert_eq!(
        resolve(&ctx, "alice.ids.example.com").await,
        (StatusCode::OK, "did:plc:xyz\n".to_string())
    );
    assert_eq!(
        resolve(&ctx, "bob.ids.example.com").await,
        (StatusCode::NOT_FOUND, "Not found\n".to_string())
    );
}

#[tokio::test]
async fn test_org_mode_disabled_hides_members() {
    let ctx = context(HandleSource::List).await;
    seed(
        &ctx,
        StoredSettings {
            enable_org_mode: String::new(),
            ..org_settings()
        },
    )
    .await;

    assert_eq!(resolve(&ctx, "alice.ids.example.com").await.0, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_host_is_bad_request() {
    let ctx = context(HandleSource::List).await;
    seed(&ctx, org_settings()).await;

    for host in ["localhost", "example.com:8080", "-bad.example.com", "a..example.com"] {
        assert_eq!(
            resolve(&ctx, host).await,
            (StatusCode::BAD_REQUEST, "Invalid handle\n".to_string()),
            "host {}",
            host
        );
    }
}

#[tokio::test]
async fn test_reserved_label_always_succeeds() {
    let ctx = context(HandleSource::List).await;

    assert_eq!(
        resolve(&ctx, "didgeridoo-test.example.com").await,
        (StatusCode::OK, "Success\n".to_string())
    );
    assert_eq!(
        resolve(&ctx, "didgeridoo-test.ids.example.com").await,
        (StatusCode::OK, "Success\n".to_string())
    );
}

#[tokio::test]
async fn test_empty_main_did_is_not_found() {
    let ctx = context(HandleSource::List).await;
    assert_eq!(resolve(&ctx, "example.com").await.0, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_corrupt_list_is_server_error() {
    let ctx = context(HandleSource::List).await;
    seed(
        &ctx,
        StoredSettings {
            did_list: "[{oops".into(),
            ..org_settings()
        },
    )
    .await;

    assert_eq!(
        resolve(&ctx, "alice.ids.example.com").await,
        (StatusCode::INTERNAL_SERVER_ERROR, "Configuration error\n".to_string())
    );
    // Malformed hosts are rejected before storage is read
    assert_eq!(resolve(&ctx, "localhost").await.0, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_duplicate_labels_first_match_wins() {
    let ctx = context(HandleSource::List).await;
    seed(
        &ctx,
        StoredSettings {
            did_list: r#"[{"name":"alice","did":"did:plc:first"},{"name":"ALICE","did":"did:plc:second"}]"#
                .into(),
            ..org_settings()
        },
    )
    .await;

    let first = resolve(&ctx, "alice.ids.example.com").await;
    assert_eq!(first, (StatusCode::OK, "did:plc:first\n".to_string()));
    assert_eq!(resolve(&ctx, "alice.ids.example.com").await, first);
}

#[tokio::test]
async fn test_legacy_map_list_resolves() {
    let ctx = context(HandleSource::List).await;
    seed(
        &ctx,
        StoredSettings {
            did_list: r#"{"alice":"did:plc:legacy"}"#.into(),
            ..org_settings()
        },
    )
    .await;

    assert_eq!(
        resolve(&ctx, "alice.ids.example.com").await,
        (StatusCode::OK, "did:plc:legacy\n".to_string())
    );
}

#[tokio::test]
async fn test_profiles_source_resolves_members() {
    let ctx = context(HandleSource::Profiles).await;
    seed(&ctx, org_settings()).await;
    ctx.profiles.save("7", "carol", "did:plc:carol").await.unwrap();

    assert_eq!(
        resolve(&ctx, "carol.ids.example.com").await,
        (StatusCode::OK, "did:plc:carol\n".to_string())
    );
    // The centralized list is not consulted
    assert_eq!(resolve(&ctx, "alice.ids.example.com").await.0, StatusCode::NOT_FOUND);
}
