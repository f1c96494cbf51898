//! Bandwidth optimization — collapse per-resource event runs to their
//! latest event while preserving global time order (spec §4.4).

use std::collections::HashMap;

use crate::models::SyncEvent;
use crate::sync::conflict::resolve;

/// Partition `events` by `resource_id`, keep only the `(timestamp, id)`
/// winner per partition, then re-merge ascending by `(timestamp, id)`.
///
/// Global time order across distinct resources is preserved — the
/// winners are not grouped by resource at the expense of chronology
/// (spec §4.4's explicit requirement).
pub fn optimize(events: Vec<SyncEvent>) -> Vec<SyncEvent> {
    if events.len() <= 1 {
        return events;
    }

    let mut by_resource: HashMap<String, Vec<SyncEvent>> = HashMap::new();
    for event in events {
        by_resource.entry(event.resource_id.clone()).or_default().push(event);
    }

    let mut winners: Vec<SyncEvent> = by_resource
        .into_values()
        .filter_map(|group| resolve(&group).cloned())
        .collect();

    winners.sort_by(|a, b| (a.timestamp, a.id).cmp(&(b.timestamp, b.id)));
    winners
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SyncAction, SyncEventType};
    use chrono::{Duration, Utc};

    fn event_at(resource_id: &str, id: i64, minutes_ago: i64) -> SyncEvent {
        let mut e = SyncEvent::new(
            SyncEventType::BookmarkUpdated,
            "u1",
            resource_id,
            SyncAction::Update,
            "{}",
            "dx",
        );
        e.id = id;
        e.timestamp = Utc::now() - Duration::minutes(minutes_ago);
        e
    }

    #[test]
    fn optimize_empty_returns_empty() {
        assert!(optimize(vec![]).is_empty());
    }

    #[test]
    fn optimize_single_event_unchanged() {
        let e = event_at("b1", 1, 0);
        let result = optimize(vec![e.clone()]);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, e.id);
    }

    #[test]
    fn optimize_collapses_per_resource_runs_and_preserves_global_order() {
        let e1 = event_at("b1", 1, 30);
        let e2 = event_at("b1", 2, 20);
        let e3 = event_at("b1", 3, 10);
        let e4 = event_at("b2", 4, 15);

        let result = optimize(vec![e1, e2, e3.clone(), e4.clone()]);

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].id, e4.id);
        assert_eq!(result[1].id, e3.id);
    }

    #[test]
    fn optimize_lets_later_delete_win_over_earlier_update() {
        let mut update = event_at("b1", 1, 10);
        update.action = SyncAction::Update;
        let mut delete = event_at("b1", 2, 1);
        delete.action = SyncAction::Delete;

        let result = optimize(vec![update, delete.clone()]);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, delete.id);
        assert_eq!(result[0].action, SyncAction::Delete);
    }
}
