/// Settings write validation
///
/// A write is validated as a whole: either every field passes and a new
/// record is produced, or the collected field errors are returned and nothing
/// is persisted.
use super::{StoredSettings, KEY_DID_LIST, KEY_ENABLE_ORG_MODE, KEY_MAIN_DID, KEY_SUBDOMAIN};
use crate::{
    directory::{DidList, DidRecord, HandleDirectory, SortKey, SortOrder},
    validation::{
        apply, did_rules, field_str, label_rules, matches, parse_boolish, FieldErrors, Peers,
        DID_RE, MSG_LABEL_DUPLICATE, MSG_LIST_INVALID, MSG_MAIN_DID_INVALID,
        MSG_ORG_MODE_BOOLEAN, MSG_SUBDOMAIN_INVALID, SUBDOMAIN_RE,
    },
};
use chrono::{DateTime, Utc};
use serde_json::Value;

pub const MSG_LABEL_REQUIRED: &str = "The user handle is required.";
pub const MSG_DID_REQUIRED: &str = "The DID is required.";

/// Validate the subdomain field alone, as the self-test does
pub fn validate_subdomain(subdomain: &str, peers: &Peers) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    apply(
        KEY_SUBDOMAIN,
        subdomain,
        peers,
        &[matches(&SUBDOMAIN_RE, MSG_SUBDOMAIN_INVALID)],
        &mut errors,
    );
    errors.into_result()
}

/// Build the record to persist from a submitted settings form
///
/// With organization mode disabled the subdomain and handle list are excluded:
/// they are neither validated nor changed. A missing handle list field keeps
/// the stored list.
pub fn apply_update(
    submitted: &Peers,
    current: &StoredSettings,
    now: DateTime<Utc>,
) -> Result<StoredSettings, FieldErrors> {
    let mut errors = FieldErrors::new();

    let main_did = field_str(submitted, KEY_MAIN_DID);
    apply(
        KEY_MAIN_DID,
        &main_did,
        submitted,
        &[matches(&DID_RE, MSG_MAIN_DID_INVALID)],
        &mut errors,
    );

    let org_mode = parse_boolish(submitted.get(KEY_ENABLE_ORG_MODE).unwrap_or(&Value::Null));
    if org_mode.is_none() {
        errors.add(KEY_ENABLE_ORG_MODE, MSG_ORG_MODE_BOOLEAN);
    }
    let org_mode = org_mode.unwrap_or(false);

    let mut subdomain = current.subdomain.clone();
    let mut did_list = current.did_list.clone();

    if org_mode {
        subdomain = field_str(submitted, KEY_SUBDOMAIN);
        if let Err(subdomain_errors) = validate_subdomain(&subdomain, submitted) {
            errors.merge(subdomain_errors);
        }

        if let Some(raw) = submitted.get(KEY_DID_LIST) {
            match parse_submitted_list(raw) {
                Ok(list) => {
                    validate_list(&list, submitted, &mut errors);
                    let previous = DidList::parse(&current.did_list).unwrap_or_default();
                    did_list = stamp(list, &previous, now)
                        .sorted(SortKey::Name, SortOrder::Asc)
                        .to_json();
                }
                Err(reason) => {
                    tracing::debug!(reason = %reason, "submitted handle list rejected");
                    errors.add(KEY_DID_LIST, MSG_LIST_INVALID);
                }
            }
        }
    }

    errors.into_result()?;

    Ok(StoredSettings {
        main_did,
        subdomain,
        did_list,
        enable_org_mode: if org_mode { "1" } else { "" }.to_string(),
    })
}

/// The list arrives JSON-encoded in a string, or inline
fn parse_submitted_list(raw: &Value) -> Result<DidList, String> {
    match raw {
        Value::String(s) => DidList::parse(s),
        other => DidList::from_value(other.clone()),
    }
}

fn validate_list(list: &DidList, peers: &Peers, errors: &mut FieldErrors) {
    let duplicates = list.duplicate_labels();
    let label_rules = label_rules(
        |label| duplicates.contains(&label.to_ascii_lowercase()),
        MSG_LABEL_DUPLICATE,
    );
    let did_rules = did_rules();

    for (index, record) in list.entries().iter().enumerate() {
        let name_field = format!("{}.{}.name", KEY_DID_LIST, index);
        let did_field = format!("{}.{}.did", KEY_DID_LIST, index);

        if record.name.is_empty() {
            errors.add(&name_field, MSG_LABEL_REQUIRED);
        }
        if record.did.is_empty() {
            errors.add(&did_field, MSG_DID_REQUIRED);
        }

        apply(&name_field, &record.name, peers, &label_rules, errors);
        apply(&did_field, &record.did, peers, &did_rules, errors);
    }
}

/// Fill missing `last_updated` values, carrying over unchanged entries
fn stamp(list: DidList, previous: &DidList, now: DateTime<Utc>) -> DidList {
    let records = list
        .into_inner()
        .into_iter()
        .map(|record| {
            if record.last_updated.is_some() {
                return record;
            }
            let carried = previous
                .entries()
                .iter()
                .find(|p| p.name.eq_ignore_ascii_case(&record.name) && p.did == record.did)
                .and_then(|p| p.last_updated);
            DidRecord {
                last_updated: Some(carried.unwrap_or(now)),
                ..record
            }
        })
        .collect::<Vec<_>>();

    DidList::new(records)
}
