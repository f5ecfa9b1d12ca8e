//! Reconciliation of two quiz replicas.

use std::collections::HashMap;

use crate::models::{QuizId, QuizRecord};

/// Merge a local and a remote replica into one canonical set.
///
/// Remote records are taken first; a local record replaces the remote one only
/// when its `sharedAt` is strictly later, so ties keep the remote copy, as does
/// a pair where either timestamp cannot be parsed. The
/// result holds each id once, newest `sharedAt` first. Ordering trusts client
/// clocks: a skewed clock can win a conflict it should lose.
pub fn merge(local: &[QuizRecord], remote: &[QuizRecord]) -> Vec<QuizRecord> {
    let mut by_id: HashMap<&QuizId, &QuizRecord> = HashMap::with_capacity(remote.len());
    // First-seen order, so equal timestamps keep a deterministic order.
    let mut order: Vec<&QuizId> = Vec::with_capacity(remote.len() + local.len());

    for record in remote {
        if by_id.insert(&record.id, record).is_none() {
            order.push(&record.id);
        }
    }

    for record in local {
        match by_id.get(&record.id) {
            None => {
                by_id.insert(&record.id, record);
                order.push(&record.id);
            }
            Some(existing) if record.shared_at.is_after(&existing.shared_at) => {
                by_id.insert(&record.id, record);
            }
            Some(_) => {}
        }
    }

    let mut merged = order
        .into_iter()
        .filter_map(|id| by_id.get(id).map(|record| (*record).clone()))
        .collect::<Vec<_>>();
    merged.sort_by(|left, right| right.shared_at.sort_key().cmp(&left.shared_at.sort_key()));
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SharedAt;
    use pretty_assertions::assert_eq;
    use serde_json::Map;
    use std::collections::HashSet;

    fn record(id: &str, shared_at: &str, title: &str) -> QuizRecord {
        QuizRecord {
            id: QuizId::from(id),
            original_id: None,
            title: title.to_string(),
            description: String::new(),
            questions: Vec::new(),
            total_questions: 0,
            user_name: "ana".to_string(),
            shared_at: SharedAt::from(shared_at),
            views: 0,
            attempts: 0,
            is_offline: false,
            is_shared: false,
            extra: Map::new(),
        }
    }

    fn ids(records: &[QuizRecord]) -> Vec<&str> {
        records.iter().map(|record| record.id.as_str()).collect()
    }

    #[test]
    fn merge_into_empty_local_returns_remote() {
        let remote = vec![record("x", "2024-01-01T00:00:00Z", "remote")];
        let merged = merge(&[], &remote);
        assert_eq!(merged, remote);
    }

    #[test]
    fn later_local_record_wins() {
        let local = vec![record("x", "2024-02-01", "local")];
        let remote = vec![record("x", "2024-01-01", "remote")];
        let merged = merge(&local, &remote);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].title, "local");
        assert_eq!(merged[0].shared_at.as_str(), "2024-02-01");
    }

    #[test]
    fn later_remote_record_wins() {
        let local = vec![record("x", "2024-01-01", "local")];
        let remote = vec![record("x", "2024-02-01", "remote")];
        assert_eq!(merge(&local, &remote)[0].title, "remote");
    }

    #[test]
    fn ties_resolve_to_remote() {
        let local = vec![record("x", "2024-01-01T00:00:00Z", "local")];
        let remote = vec![record("x", "2024-01-01T00:00:00.000Z", "remote")];
        assert_eq!(merge(&local, &remote)[0].title, "remote");
    }

    #[test]
    fn union_of_ids_without_duplicates() {
        let local = vec![
            record("a", "2024-01-03T00:00:00Z", "a"),
            record("b", "2024-01-02T00:00:00Z", "b"),
        ];
        let remote = vec![
            record("b", "2024-01-02T00:00:00Z", "b"),
            record("c", "2024-01-01T00:00:00Z", "c"),
        ];
        let merged = merge(&local, &remote);
        let distinct = merged.iter().map(|r| r.id.clone()).collect::<HashSet<_>>();
        assert_eq!(merged.len(), 3);
        assert_eq!(distinct.len(), 3);
    }

    #[test]
    fn output_sorted_newest_first() {
        let local = vec![
            record("old", "2023-06-01T00:00:00Z", "old"),
            record("new", "2024-06-01T00:00:00Z", "new"),
        ];
        let remote = vec![record("mid", "2024-01-01T00:00:00Z", "mid")];
        assert_eq!(ids(&merge(&local, &remote)), vec!["new", "mid", "old"]);
    }

    #[test]
    fn merge_is_idempotent() {
        let local = vec![
            record("a", "2024-01-03T00:00:00Z", "a"),
            record("b", "2024-02-02T00:00:00Z", "b-local"),
        ];
        let remote = vec![
            record("b", "2024-01-02T00:00:00Z", "b-remote"),
            record("c", "2024-01-01T00:00:00Z", "c"),
        ];
        let once = merge(&local, &remote);
        assert_eq!(merge(&once, &[]), once);
    }

    #[test]
    fn unparseable_timestamps_sort_last_and_never_override() {
        let local = vec![record("x", "not a date", "local")];
        let remote = vec![
            record("x", "2024-01-01T00:00:00Z", "remote"),
            record("y", "garbage", "y"),
        ];
        let merged = merge(&local, &remote);
        assert_eq!(merged[0].title, "remote");
        assert_eq!(ids(&merged), vec!["x", "y"]);
    }

    #[test]
    fn unparseable_remote_timestamp_keeps_remote_copy() {
        let local = vec![record("x", "2024-06-01T00:00:00Z", "local")];
        let remote = vec![record("x", "soon", "remote")];
        let merged = merge(&local, &remote);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].title, "remote");
    }

    #[test]
    fn duplicate_ids_within_remote_keep_last_copy() {
        let remote = vec![
            record("x", "2024-01-01T00:00:00Z", "first"),
            record("x", "2024-01-01T00:00:00Z", "second"),
        ];
        let merged = merge(&[], &remote);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].title, "second");
    }
}
