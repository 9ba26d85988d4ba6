//! Best-effort webhook event extraction.
//!
//! Payloads come from the public internet and differ per gateway, so nothing
//! here fails: missing or malformed fields degrade to `None`/`"unknown"`.

use crate::models::WebhookEvent;
use crate::state::StateOverrides;
use serde_json::{Map, Value};

/// A path of object keys, outermost first
pub type FieldPath = &'static [&'static str];

/// Candidate locations for each event field, tried in order
#[derive(Debug, Clone, Copy)]
pub struct EventFields {
    pub event_id: &'static [FieldPath],
    pub event_type: &'static [FieldPath],
    pub payment_id: &'static [FieldPath],
    pub status: &'static [FieldPath],
}

/// Field layout covering Stripe-, PayPal- and flat generic payloads
pub const DEFAULT_FIELDS: EventFields = EventFields {
    event_id: &[&["id"], &["event_id"]],
    event_type: &[&["type"], &["event_type"]],
    payment_id: &[
        &["payment_id"],
        &["id"],
        &["resource", "id"],
        &["data", "object", "id"],
    ],
    status: &[
        &["status"],
        &["data", "object", "status"],
        &["resource", "status"],
    ],
};

/// Decode `payload` as a JSON object; anything else yields an empty map
pub fn decode_object(payload: &[u8]) -> Map<String, Value> {
    match serde_json::from_slice::<Value>(payload) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

/// Follow `path` through nested objects
pub fn lookup<'a>(root: &'a Map<String, Value>, path: &[&str]) -> Option<&'a Value> {
    let (first, rest) = path.split_first()?;
    rest.iter()
        .try_fold(root.get(*first)?, |value, key| value.as_object()?.get(*key))
}

/// Non-empty strings and numbers, as a string
pub fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// First usable value among `paths`
pub fn first_string(root: &Map<String, Value>, paths: &[FieldPath]) -> Option<String> {
    paths
        .iter()
        .find_map(|path| lookup(root, path).and_then(value_as_string))
}

/// Configurable lenient parser.
///
/// Adapters with their own payload shapes supply different [`EventFields`]
/// and a [`StateOverrides`] table.
#[derive(Debug, Clone, Copy)]
pub struct EventParser {
    fields: EventFields,
    overrides: StateOverrides,
    default_event_type: &'static str,
}

impl EventParser {
    pub const fn new() -> Self {
        Self {
            fields: DEFAULT_FIELDS,
            overrides: StateOverrides::NONE,
            default_event_type: "unknown",
        }
    }

    pub const fn with_fields(mut self, fields: EventFields) -> Self {
        self.fields = fields;
        self
    }

    pub const fn with_overrides(mut self, overrides: StateOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Event type used when the payload names none
    pub const fn with_default_event_type(mut self, event_type: &'static str) -> Self {
        self.default_event_type = event_type;
        self
    }

    /// Parse raw bytes. Never fails.
    pub fn parse(&self, payload: &[u8], provider: &str) -> WebhookEvent {
        self.parse_object(decode_object(payload), provider)
    }

    /// Extract fields from an already decoded object
    pub fn parse_object(&self, data: Map<String, Value>, provider: &str) -> WebhookEvent {
        let fields = &self.fields;
        let raw_status =
            first_string(&data, fields.status).unwrap_or_else(|| "unknown".to_string());

        WebhookEvent {
            event_id: first_string(&data, fields.event_id),
            event_type: first_string(&data, fields.event_type)
                .unwrap_or_else(|| self.default_event_type.to_string()),
            payment_id: first_string(&data, fields.payment_id),
            state: self.overrides.normalise(&raw_status),
            provider: provider.to_string(),
            raw: data,
        }
    }
}

impl Default for EventParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a webhook payload with the default field layout
pub fn parse_event(payload: &[u8], provider: &str) -> WebhookEvent {
    EventParser::new().parse(payload, provider)
}
