/// Per-user handle metadata
///
/// The alternate storage for organization handles: each user record carries
/// its own label and DID instead of the centralized list.
use crate::{
    directory::{DidList, DidRecord},
    error::{DidgeridooError, DidgeridooResult},
    validation::{apply, did_rules, field_str, label_rules, FieldErrors, Peers, MSG_LABEL_TAKEN},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use std::collections::HashSet;

pub const FIELD_USER_LABEL: &str = "didgeridoo_user_label";
pub const FIELD_USER_DID: &str = "didgeridoo_user_did";

/// Handle metadata of one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub didgeridoo_user_label: String,
    pub didgeridoo_user_did: String,
    pub updated_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    pub fn empty(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            didgeridoo_user_label: String::new(),
            didgeridoo_user_did: String::new(),
            updated_at: None,
        }
    }
}

/// Validate a submitted profile form
///
/// `taken` holds the lower-cased labels of every other user. Returns the
/// label and DID to store.
pub fn validate_profile(
    submitted: &Peers,
    taken: &HashSet<String>,
) -> Result<(String, String), FieldErrors> {
    let label = field_str(submitted, FIELD_USER_LABEL);
    let did = field_str(submitted, FIELD_USER_DID);

    let mut errors = FieldErrors::new();
    apply(
        FIELD_USER_LABEL,
        &label,
        submitted,
        &label_rules(|l| taken.contains(&l.to_ascii_lowercase()), MSG_LABEL_TAKEN),
        &mut errors,
    );
    apply(FIELD_USER_DID, &did, submitted, &did_rules(), &mut errors);

    errors.into_result().map(|_| (label, did))
}

/// Profile metadata manager
#[derive(Clone)]
pub struct ProfileStore {
    db: SqlitePool,
}

impl ProfileStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Profile of `user_id`, or `None` if never saved
    pub async fn get(&self, user_id: &str) -> DidgeridooResult<Option<UserProfile>> {
        let row = sqlx::query(
            r#"
            SELECT user_id, didgeridoo_user_label, didgeridoo_user_did, updated_at
            FROM user_profiles
            WHERE user_id = ?1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        match row {
            Some(row) => Ok(Some(UserProfile {
                user_id: row.try_get("user_id")?,
                didgeridoo_user_label: row.try_get("didgeridoo_user_label")?,
                didgeridoo_user_did: row.try_get("didgeridoo_user_did")?,
                updated_at: row
                    .try_get::<String, _>("updated_at")
                    .ok()
                    .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
                    .map(|dt| dt.with_timezone(&Utc)),
            })),
            None => Ok(None),
        }
    }

    /// Upsert the label and DID of `user_id`
    ///
    /// A label already held by another user is rejected as a field error.
    pub async fn save(&self, user_id: &str, label: &str, did: &str) -> DidgeridooResult<()> {
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO user_profiles (user_id, didgeridoo_user_label, didgeridoo_user_did, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(user_id) DO UPDATE SET
                didgeridoo_user_label = excluded.didgeridoo_user_label,
                didgeridoo_user_did = excluded.didgeridoo_user_did,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(user_id)
        .bind(label)
        .bind(did)
        .bind(&now)
        .execute(&self.db)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                let mut errors = FieldErrors::new();
                errors.add(FIELD_USER_LABEL, MSG_LABEL_TAKEN);
                DidgeridooError::Validation(errors)
            }
            other => other.into(),
        })?;

        Ok(())
    }

    /// Lower-cased labels held by every user except `user_id`
    pub async fn labels_excluding(&self, user_id: &str) -> DidgeridooResult<HashSet<String>> {
        let rows = sqlx::query(
            r#"
            SELECT didgeridoo_user_label
            FROM user_profiles
            WHERE user_id != ?1 AND didgeridoo_user_label != ''
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        rows.iter()
            .map(|row| {
                row.try_get::<String, _>("didgeridoo_user_label")
                    .map(|label| label.to_ascii_lowercase())
                    .map_err(Into::into)
            })
            .collect()
    }

    /// Snapshot of every profile with both a label and a DID, ordered by label
    pub async fn directory(&self) -> DidgeridooResult<DidList> {
        let rows = sqlx::query(
            r#"
            SELECT didgeridoo_user_label, didgeridoo_user_did, updated_at
            FROM user_profiles
            WHERE didgeridoo_user_label != '' AND didgeridoo_user_did != ''
            ORDER BY didgeridoo_user_label ASC, user_id ASC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            records.push(DidRecord {
                name: row.try_get("didgeridoo_user_label")?,
                did: row.try_get("didgeridoo_user_did")?,
                last_updated: row
                    .try_get::<String, _>("updated_at")
                    .ok()
                    .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
                    .map(|dt| dt.with_timezone(&Utc)),
            });
        }

        Ok(DidList::new(records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::directory::HandleDirectory;

    async fn store() -> ProfileStore {
        let pool = db::create_memory_pool().await.unwrap();
        db::run_migrations(&pool).await.unwrap();
        ProfileStore::new(pool)
    }

    #[tokio::test]
    async fn test_save_and_get_profile() {
        let profiles = store().await;
        assert!(profiles.get("42").await.unwrap().is_none());

        profiles.save("42", "alice", "did:plc:xyz").await.unwrap();

        let profile = profiles.get("42").await.unwrap().unwrap();
        assert_eq!(profile.didgeridoo_user_label, "alice");
        assert_eq!(profile.didgeridoo_user_did, "did:plc:xyz");
        assert!(profile.updated_at.is_some());
    }

    #[tokio::test]
    async fn test_labels_excluding_current_user() {
        let profiles = store().await;
        profiles.save("1", "Alice", "did:plc:alice").await.unwrap();
        profiles.save("2", "bob", "did:plc:bob").await.unwrap();
        profiles.save("3", "", "").await.unwrap();

        let taken = profiles.labels_excluding("1").await.unwrap();
        assert!(taken.contains("bob"));
        assert!(!taken.contains("alice"));
        assert_eq!(taken.len(), 1);
    }

    #[tokio::test]
    async fn test_save_rejects_label_held_by_another_user() {
        let profiles = store().await;
        profiles.save("1", "alice", "did:plc:alice").await.unwrap();

        match profiles.save("2", "ALICE", "did:plc:other").await {
            Err(DidgeridooError::Validation(errors)) => {
                assert!(errors.contains(FIELD_USER_LABEL, MSG_LABEL_TAKEN))
            }
            other => panic!("expected validation error, got {:?}", other),
        }

        // Re-saving your own label and leaving labels empty are both fine
        profiles.save("1", "Alice", "did:plc:alice").await.unwrap();
        profiles.save("3", "", "").await.unwrap();
        profiles.save("4", "", "").await.unwrap();
        assert_eq!(profiles.get("2").await.unwrap(), None);
    }

    #[test]
    fn test_validate_profile() {
        use crate::validation::{MSG_DID_INVALID, MSG_LABEL_RESERVED};
        use serde_json::json;

        let taken: HashSet<String> = ["bob".to_string()].into_iter().collect();

        let ok = json!({ "didgeridoo_user_label": "alice", "didgeridoo_user_did": "did:plc:xyz" });
        let (label, did) = validate_profile(ok.as_object().unwrap(), &taken).unwrap();
        assert_eq!(label, "alice");
        assert_eq!(did, "did:plc:xyz");

        let bad = json!({ "didgeridoo_user_label": "Bob", "didgeridoo_user_did": "did:x" });
        let errors = validate_profile(bad.as_object().unwrap(), &taken).unwrap_err();
        assert!(errors.contains(FIELD_USER_LABEL, MSG_LABEL_TAKEN));
        assert!(errors.contains(FIELD_USER_DID, MSG_DID_INVALID));

        let reserved = json!({ "didgeridoo_user_label": "didgeridoo-test" });
        let errors = validate_profile(reserved.as_object().unwrap(), &taken).unwrap_err();
        assert!(errors.contains(FIELD_USER_LABEL, MSG_LABEL_RESERVED));

        // Clearing both fields is allowed
        let cleared = json!({ "didgeridoo_user_label": "", "didgeridoo_user_did": "" });
        assert!(validate_profile(cleared.as_object().unwrap(), &taken).is_ok());
    }

    #[tokio::test]
    async fn test_directory_skips_incomplete_profiles() {
        let profiles = store().await;
        profiles.save("1", "carol", "did:plc:carol").await.unwrap();
        profiles.save("2", "dave", "").await.unwrap();
        profiles.save("3", "alice", "did:plc:alice").await.unwrap();

        let directory = profiles.directory().await.unwrap();
        assert_eq!(directory.len(), 2);
        assert_eq!(directory.entries()[0].name, "alice");
        assert_eq!(directory.lookup("carol"), Some("did:plc:carol"));
        assert_eq!(directory.lookup("dave"), None);
    }
}
