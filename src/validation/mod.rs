/// Handle, DID and settings validation
///
/// Grammar checks are compiled once. Field rules are plain predicates run in
/// order; every failing rule contributes a message to the field's error list.
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Label answered by the subdomain self-test and never assignable to a user
pub const RESERVED_LABEL: &str = "didgeridoo-test";

/// Maximum length of a single handle label
pub const MAX_LABEL_LENGTH: usize = 63;

/// Maximum length of a stored DID
pub const MAX_DID_LENGTH: usize = 127;

pub const MSG_MAIN_DID_INVALID: &str = "DID invalid.";
pub const MSG_ORG_MODE_BOOLEAN: &str = "The organization mode setting must be a boolean.";
pub const MSG_SUBDOMAIN_INVALID: &str = "The subdomain may only contain letters, numbers, dashes, and periods, and may not start or end with a dash or period.";
pub const MSG_LIST_INVALID: &str = "The handle list must be a valid JSON list of handles.";
pub const MSG_LABEL_TOO_LONG: &str = "The user handle may not be more than 63 characters.";
pub const MSG_LABEL_RESERVED: &str = "The user handle is reserved.";
pub const MSG_LABEL_DUPLICATE: &str = "The user handle must be unique.";
pub const MSG_LABEL_TAKEN: &str = "The user handle is already taken.";
pub const MSG_LABEL_INVALID: &str = "The user handle may only contain letters, numbers, and dashes, and may not start or end with a dash.";
pub const MSG_DID_TOO_LONG: &str = "The DID may not be more than 127 characters.";
pub const MSG_DID_INVALID: &str = "The DID is invalid.";

lazy_static! {
    /// https://atproto.com/specs/handle#handle-identifier-syntax
    pub static ref HANDLE_RE: Regex = Regex::new(
        r"^([a-zA-Z0-9]([a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?\.)+[a-zA-Z]([a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?$"
    )
    .expect("handle grammar compiles");

    pub static ref DID_RE: Regex =
        Regex::new(r"^did:[a-z]+:[a-zA-Z0-9._:%-]*[a-zA-Z0-9_:%]$").expect("DID grammar compiles");

    pub static ref SUBDOMAIN_RE: Regex =
        Regex::new(r"^[a-zA-Z0-9]([a-zA-Z0-9.-]*[a-zA-Z0-9])?$").expect("subdomain grammar compiles");

    pub static ref LABEL_RE: Regex =
        Regex::new(r"^[a-zA-Z0-9]+(?:-[a-zA-Z0-9]+)*$").expect("label grammar compiles");
}

pub fn is_valid_handle(host: &str) -> bool {
    HANDLE_RE.is_match(host)
}

pub fn is_valid_did(did: &str) -> bool {
    DID_RE.is_match(did)
}

pub fn is_valid_subdomain(subdomain: &str) -> bool {
    SUBDOMAIN_RE.is_match(subdomain)
}

pub fn is_valid_label(label: &str) -> bool {
    LABEL_RE.is_match(label)
}

/// Interpret a boolean-ish submitted value
///
/// Accepts JSON booleans, `0`/`1`, and the strings `"0"`, `"1"`, `"true"`,
/// `"false"`, `"on"`, `"off"`, `"yes"`, `"no"`, `""`. Null counts as false.
pub fn parse_boolish(value: &Value) -> Option<bool> {
    match value {
        Value::Null => Some(false),
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "on" | "yes" => Some(true),
            "0" | "false" | "off" | "no" | "" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Field name to list of messages, serialized as a JSON object
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn contains(&self, field: &str, message: &str) -> bool {
        self.get(field)
            .map(|messages| messages.iter().any(|m| m == message))
            .unwrap_or(false)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn merge(&mut self, other: FieldErrors) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }

    /// `Ok(())` when nothing failed
    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(field, messages)| format!("{}: {}", field, messages.join(" ")))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

/// The other submitted fields of the same request
pub type Peers = Map<String, Value>;

/// A single predicate: `Some(message)` when the candidate fails
pub type Rule<'a> = Box<dyn Fn(&str, &Peers) -> Option<String> + Send + Sync + 'a>;

pub fn matches<'a>(re: &'a Regex, message: &'static str) -> Rule<'a> {
    Box::new(move |value, _| (!re.is_match(value)).then(|| message.to_string()))
}

pub fn max_chars<'a>(max: usize, message: &'static str) -> Rule<'a> {
    Box::new(move |value, _| (value.chars().count() > max).then(|| message.to_string()))
}

pub fn not_in<'a>(reserved: &'a [&'a str], message: &'static str) -> Rule<'a> {
    Box::new(move |value, _| {
        reserved
            .iter()
            .any(|r| r.eq_ignore_ascii_case(value))
            .then(|| message.to_string())
    })
}

/// Fails when `taken` reports the candidate as already in use
pub fn unique<'a, F>(taken: F, message: &'static str) -> Rule<'a>
where
    F: Fn(&str) -> bool + Send + Sync + 'a,
{
    Box::new(move |value, _| taken(value).then(|| message.to_string()))
}

/// Run `rules` against `value`, recording failures under `field`
///
/// Empty candidates are not checked; an empty value clears the field.
pub fn apply(field: &str, value: &str, peers: &Peers, rules: &[Rule<'_>], errors: &mut FieldErrors) {
    if value.is_empty() {
        return;
    }
    for rule in rules {
        if let Some(message) = rule(value, peers) {
            errors.add(field, message);
        }
    }
}

/// Rules for a handle label, with `taken` as the uniqueness lookup
pub fn label_rules<'a, F>(taken: F, taken_message: &'static str) -> Vec<Rule<'a>>
where
    F: Fn(&str) -> bool + Send + Sync + 'a,
{
    vec![
        max_chars(MAX_LABEL_LENGTH, MSG_LABEL_TOO_LONG),
        not_in(&[RESERVED_LABEL], MSG_LABEL_RESERVED),
        matches(&LABEL_RE, MSG_LABEL_INVALID),
        unique(taken, taken_message),
    ]
}

pub fn did_rules<'a>() -> Vec<Rule<'a>> {
    vec![
        max_chars(MAX_DID_LENGTH, MSG_DID_TOO_LONG),
        matches(&DID_RE, MSG_DID_INVALID),
    ]
}

/// Read a submitted field as a string; non-strings are rendered as JSON
pub fn field_str(peers: &Peers, field: &str) -> String {
    match peers.get(field) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(other) => other.to_string(),
    }
}
