use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use super::record::{validate_common, SyncRecord};
use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Sleep,
    Feed,
    Nappy,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Sleep => "sleep",
            EventKind::Feed => "feed",
            EventKind::Nappy => "nappy",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sleep" => Ok(EventKind::Sleep),
            "feed" => Ok(EventKind::Feed),
            "nappy" => Ok(EventKind::Nappy),
            _ => Err(format!(
                "Invalid event type '{}'. Valid options: sleep, feed, nappy",
                s
            )),
        }
    }
}

/// A timestamped care event recorded on a device.
///
/// Timestamps are Unix seconds. `server_clock` is zero until the server has
/// accepted a version of this event; values sent by clients are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub event_id: String,
    #[serde(rename = "type")]
    pub kind: EventKind,
    #[serde(default)]
    pub details: Option<String>,
    /// Free-form, schema-less attributes (feed side, nappy contents, ...).
    #[serde(default)]
    pub payload: Option<Map<String, Value>>,
    #[serde(default)]
    pub start_ts: Option<i64>,
    #[serde(default)]
    pub end_ts: Option<i64>,
    #[serde(default)]
    pub ts: Option<i64>,
    pub created_ts: i64,
    pub updated_ts: i64,
    pub version: i64,
    #[serde(default)]
    pub deleted: bool,
    pub device_id: String,
    #[serde(default)]
    pub server_clock: i64,
}

impl Event {
    /// Creates version 1 of a new event.
    pub fn new(
        event_id: impl Into<String>,
        kind: EventKind,
        device_id: impl Into<String>,
        now: i64,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            kind,
            details: None,
            payload: None,
            start_ts: None,
            end_ts: None,
            ts: None,
            created_ts: now,
            updated_ts: now,
            version: 1,
            deleted: false,
            device_id: device_id.into(),
            server_clock: 0,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_payload(mut self, payload: Map<String, Value>) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn with_span(mut self, start_ts: i64, end_ts: Option<i64>) -> Self {
        self.start_ts = Some(start_ts);
        self.end_ts = end_ts;
        self
    }

    pub fn with_ts(mut self, ts: i64) -> Self {
        self.ts = Some(ts);
        self
    }

    /// Produces the next logical edit of this event as written by `device_id`.
    pub fn edited(&self, device_id: impl Into<String>, now: i64) -> Self {
        Self {
            version: self.version + 1,
            updated_ts: now,
            device_id: device_id.into(),
            server_clock: 0,
            ..self.clone()
        }
    }

    /// Produces the tombstone for this event.
    pub fn tombstone(&self, device_id: impl Into<String>, now: i64) -> Self {
        Self {
            deleted: true,
            ..self.edited(device_id, now)
        }
    }
}

impl SyncRecord for Event {
    const FAMILY: &'static str = "event";

    fn record_id(&self) -> &str {
        &self.event_id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn updated_ts(&self) -> i64 {
        self.updated_ts
    }

    fn writer_device_id(&self) -> &str {
        &self.device_id
    }

    fn server_clock(&self) -> i64 {
        self.server_clock
    }

    fn set_server_clock(&mut self, clock: i64) {
        self.server_clock = clock;
    }

    fn is_deleted(&self) -> bool {
        self.deleted
    }

    fn validate(&self) -> Result<(), ValidationError> {
        validate_common(
            &self.event_id,
            &self.device_id,
            self.version,
            self.created_ts,
            self.updated_ts,
        )?;
        for (field, value) in [
            ("start_ts", self.start_ts),
            ("end_ts", self.end_ts),
            ("ts", self.ts),
        ] {
            if let Some(value) = value.filter(|v| *v < 0) {
                return Err(ValidationError::NegativeTimestamp { field, value });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_kind_from_str() {
        assert_eq!(EventKind::from_str("sleep").unwrap(), EventKind::Sleep);
        assert_eq!(EventKind::from_str("FEED").unwrap(), EventKind::Feed);
        assert_eq!(EventKind::from_str("Nappy").unwrap(), EventKind::Nappy);
        assert!(EventKind::from_str("bath").is_err());
    }

    #[test]
    fn test_event_wire_format() {
        let value = json!({
            "event_id": "e1",
            "type": "sleep",
            "payload": {"note": "nap", "location": {"room": "nursery"}},
            "start_ts": 1000,
            "end_ts": 1600,
            "created_ts": 1000,
            "updated_ts": 1600,
            "version": 1,
            "device_id": "phone"
        });

        let event: Event = serde_json::from_value(value).unwrap();
        assert_eq!(event.kind, EventKind::Sleep);
        assert!(!event.deleted);
        assert_eq!(event.server_clock, 0);
        assert!(event.details.is_none());

        let payload = event.payload.as_ref().unwrap();
        assert_eq!(payload["location"]["room"], "nursery");

        let back = serde_json::to_value(&event).unwrap();
        assert_eq!(back["type"], "sleep");
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let value = json!({
            "event_id": "e1",
            "type": "bath",
            "created_ts": 1,
            "updated_ts": 1,
            "version": 1,
            "device_id": "phone"
        });
        assert!(serde_json::from_value::<Event>(value).is_err());
    }

    #[test]
    fn test_validate() {
        let event = Event::new("e1", EventKind::Feed, "phone", 100);
        assert!(event.validate().is_ok());

        let mut bad = event.clone();
        bad.event_id = "  ".into();
        assert_eq!(bad.validate(), Err(ValidationError::EmptyId));

        let mut bad = event.clone();
        bad.version = 0;
        assert_eq!(bad.validate(), Err(ValidationError::NonPositiveVersion(0)));

        let bad = event.clone().with_span(-5, None);
        assert!(matches!(
            bad.validate(),
            Err(ValidationError::NegativeTimestamp { field: "start_ts", .. })
        ));

        let bad = event.clone().with_ts(-1);
        assert!(matches!(
            bad.validate(),
            Err(ValidationError::NegativeTimestamp { field: "ts", value: -1 })
        ));
    }

    #[test]
    fn test_edited_and_tombstone() {
        let mut event = Event::new("e1", EventKind::Nappy, "phone", 100);
        event.server_clock = 7;

        let edit = event.edited("tablet", 150);
        assert_eq!(edit.version, 2);
        assert_eq!(edit.updated_ts, 150);
        assert_eq!(edit.device_id, "tablet");
        assert_eq!(edit.server_clock, 0);
        assert_eq!(edit.created_ts, 100);

        let gone = edit.tombstone("phone", 200);
        assert!(gone.deleted);
        assert_eq!(gone.version, 3);
    }

    #[test]
    fn test_lww_key_orders_by_version_first() {
        let older = Event::new("e1", EventKind::Sleep, "zzz", 999);
        let newer = older.edited("aaa", 1);
        assert!(newer.lww_key() > older.lww_key());
    }
}
