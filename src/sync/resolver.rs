//! Last-write-wins conflict resolution.
//!
//! Versions are compared on `(version, updated_ts, device_id)`, with the
//! device id compared byte by byte. The winner replaces the stored record
//! wholesale: there is no per-field merge, so concurrent edits to different
//! fields of the same record on two devices keep only one side.

use std::cmp::Ordering;

use crate::models::SyncRecord;

/// Outcome of comparing an incoming record with the stored one.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution<R> {
    /// The version that should be stored after this push.
    pub winner: R,
    /// True when `winner` is the incoming record and must be persisted.
    pub changed: bool,
}

/// Decides whether `incoming` supersedes `existing`.
///
/// Equal keys keep the existing record, which makes resubmitting an
/// already-applied record a no-op.
pub fn resolve<R: SyncRecord>(existing: Option<R>, incoming: R) -> Resolution<R> {
    match existing {
        None => Resolution {
            winner: incoming,
            changed: true,
        },
        Some(existing) => match incoming.lww_key().cmp(&existing.lww_key()) {
            Ordering::Greater => Resolution {
                winner: incoming,
                changed: true,
            },
            Ordering::Equal | Ordering::Less => Resolution {
                winner: existing,
                changed: false,
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Event, EventKind, GrowthCategory, GrowthData};
    use serde_json::json;

    fn event(version: i64, updated_ts: i64, device_id: &str) -> Event {
        let mut event = Event::new("e1", EventKind::Sleep, device_id, updated_ts);
        event.version = version;
        event
    }

    #[test]
    fn test_no_existing_incoming_wins() {
        let incoming = event(1, 100, "phone");
        let resolution = resolve(None, incoming.clone());
        assert!(resolution.changed);
        assert_eq!(resolution.winner, incoming);
    }

    #[test]
    fn test_higher_version_always_wins() {
        let existing = event(1, 9_999, "zzz");
        let incoming = event(2, 1, "aaa");

        let resolution = resolve(Some(existing), incoming.clone());
        assert!(resolution.changed);
        assert_eq!(resolution.winner, incoming);
    }

    #[test]
    fn test_lower_version_loses() {
        let existing = event(3, 100, "phone");
        let incoming = event(2, 500, "tablet");

        let resolution = resolve(Some(existing.clone()), incoming);
        assert!(!resolution.changed);
        assert_eq!(resolution.winner, existing);
    }

    #[test]
    fn test_same_version_later_timestamp_wins() {
        let existing = event(2, 100, "zzz");
        let incoming = event(2, 101, "aaa");

        assert!(resolve(Some(existing), incoming).changed);
    }

    #[test]
    fn test_tie_break_is_independent_of_arrival_order() {
        let a = event(2, 100, "device-a");
        let b = event(2, 100, "device-b");

        let a_then_b = resolve(Some(a.clone()), b.clone());
        let b_then_a = resolve(Some(b.clone()), a.clone());

        assert_eq!(a_then_b.winner.device_id, "device-b");
        assert_eq!(b_then_a.winner.device_id, "device-b");
        assert!(a_then_b.changed);
        assert!(!b_then_a.changed);
    }

    #[test]
    fn test_tie_break_uses_byte_order() {
        // 'Z' (0x5a) sorts before 'a' (0x61) by bytes.
        let upper = event(1, 100, "Z");
        let lower = event(1, 100, "a");
        assert!(resolve(Some(upper), lower).changed);
    }

    #[test]
    fn test_identical_record_is_noop() {
        let existing = event(1, 100, "phone");
        let resolution = resolve(Some(existing.clone()), existing.clone());
        assert!(!resolution.changed);
        assert_eq!(resolution.winner, existing);
    }

    #[test]
    fn test_winner_replaces_every_field() {
        let payload = json!({"side": "left"}).as_object().unwrap().clone();
        let existing = Event::new("e1", EventKind::Feed, "phone", 100)
            .with_details("bottle")
            .with_payload(payload);

        // Tablet edited the timing only, starting from a copy without details.
        let mut incoming = Event::new("e1", EventKind::Feed, "tablet", 100).with_span(90, Some(120));
        incoming.version = 2;

        let resolution = resolve(Some(existing), incoming);
        assert!(resolution.changed);
        assert!(resolution.winner.details.is_none());
        assert!(resolution.winner.payload.is_none());
        assert_eq!(resolution.winner.start_ts, Some(90));
    }

    #[test]
    fn test_tombstone_resolves_like_any_edit() {
        let existing = event(1, 100, "phone");
        let tombstone = existing.tombstone("tablet", 200);

        let resolution = resolve(Some(existing), tombstone);
        assert!(resolution.changed);
        assert!(resolution.winner.deleted);
    }

    #[test]
    fn test_growth_uses_same_ordering() {
        let existing = GrowthData::new("g1", GrowthCategory::Weight, 8.0, "lb", "phone", 100);
        let incoming = existing.edited("tablet", 150);

        let resolution = resolve(Some(existing), incoming);
        assert!(resolution.changed);
        assert_eq!(resolution.winner.version, 2);
    }
}
