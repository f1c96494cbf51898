//! Conflict resolution — last-writer-wins keyed by `(timestamp, id)` (spec §4.3).

use crate::models::SyncEvent;

/// Pick the winner among concurrent events for one resource.
///
/// Primary key is `timestamp` (greater wins); ties are broken by the
/// greater `id` (the later-stored event). Device identity is never a
/// tiebreaker and delete events carry no special priority (spec §4.3).
pub fn resolve(events: &[SyncEvent]) -> Option<&SyncEvent> {
    events
        .iter()
        .max_by(|a, b| (a.timestamp, a.id).cmp(&(b.timestamp, b.id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SyncAction, SyncEventType};
    use chrono::{Duration, Utc};

    fn event_with(id: i64, timestamp: chrono::DateTime<Utc>) -> SyncEvent {
        let mut e = SyncEvent::new(
            SyncEventType::BookmarkUpdated,
            "u1",
            "b1",
            SyncAction::Update,
            "{}",
            "d1",
        );
        e.id = id;
        e.timestamp = timestamp;
        e
    }

    #[test]
    fn resolve_empty_has_no_winner() {
        assert!(resolve(&[]).is_none());
    }

    #[test]
    fn resolve_single_event_is_the_winner() {
        let e = event_with(1, Utc::now());
        assert_eq!(resolve(&[e.clone()]).unwrap().id, e.id);
    }

    #[test]
    fn resolve_picks_greatest_timestamp() {
        let now = Utc::now();
        let older = event_with(1, now - Duration::minutes(10));
        let newer = event_with(2, now);
        let winner = resolve(&[older, newer]).unwrap();
        assert_eq!(winner.id, 2);
    }

    #[test]
    fn resolve_breaks_equal_timestamp_ties_by_greatest_id() {
        let now = Utc::now();
        let a = event_with(7, now);
        let b = event_with(9, now);
        let winner = resolve(&[a, b]).unwrap();
        assert_eq!(winner.id, 9);
    }

    #[test]
    fn resolve_ignores_device_identity() {
        let now = Utc::now();
        let mut from_d1 = event_with(1, now);
        from_d1.device_id = "d1".into();
        let mut from_d2 = event_with(1, now - Duration::seconds(1));
        from_d2.device_id = "d2".into();

        // d1's event has the later timestamp, so it wins regardless of
        // device identity.
        let winner = resolve(&[from_d1.clone(), from_d2]).unwrap();
        assert_eq!(winner.device_id, from_d1.device_id);
    }
}
