//! Permanent removal of soft-deleted nodes once they are old enough.

use chrono::{DateTime, TimeDelta, Utc};
use tracing::debug;

use crate::timestamp;
use crate::tree::{Group, Node};

impl Group {
    /// Remove every node in this subtree deleted more than `seconds_ago`
    /// seconds ago.
    pub fn purge_deleted(&mut self, seconds_ago: i64) -> usize {
        self.purge_deleted_at(seconds_ago, timestamp::now())
    }

    /// Remove every node in this subtree deleted more than `seconds_ago`
    /// seconds before `current_time`, returning how many were removed.
    ///
    /// Survivors keep their relative order. Removing a group removes its
    /// whole subtree and counts once. Does not notify.
    pub fn purge_deleted_at(&mut self, seconds_ago: i64, current_time: DateTime<Utc>) -> usize {
        let threshold = TimeDelta::try_seconds(seconds_ago).unwrap_or(TimeDelta::MAX);
        let removed = purge(&mut self.entries, threshold, current_time);
        if removed > 0 {
            debug!(removed, group = self.label(), "Purged deleted nodes");
        }
        removed
    }
}

fn purge(entries: &mut Vec<Node>, threshold: TimeDelta, current_time: DateTime<Utc>) -> usize {
    let mut removed = 0;
    entries.retain_mut(|node| {
        let expired = node
            .deleted()
            .is_some_and(|deleted| current_time.signed_duration_since(deleted) > threshold);
        if expired {
            removed += 1;
            return false;
        }
        if let Node::Group(group) = node {
            removed += purge(&mut group.entries, threshold, current_time);
        }
        true
    });
    removed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ago(now: DateTime<Utc>, seconds: i64) -> Option<DateTime<Utc>> {
        Some(now - TimeDelta::seconds(seconds))
    }

    #[test]
    fn test_purge_keeps_order() {
        let now = timestamp::now();
        let mut root = Group::new("Root", None).unwrap();
        for label in ["e0", "e1", "e2", "e3", "e4"] {
            root.add_entry(label, "x", false).unwrap();
        }
        root.entries_mut()[1].set_deleted(ago(now, 10));
        root.entries_mut()[3].set_deleted(ago(now, 20));
        root.entries_mut()[4].set_deleted(ago(now, 2));
        let created: Vec<_> = root.entries().iter().map(Node::created).collect();

        let removed = root.purge_deleted_at(5, now);

        assert_eq!(removed, 2);
        let labels: Vec<&str> = root.entries().iter().map(Node::label).collect();
        assert_eq!(labels, vec!["e0", "e2", "e4"]);
        let kept: Vec<_> = root.entries().iter().map(Node::created).collect();
        assert_eq!(kept, vec![created[0], created[2], created[4]]);
        assert!(root.entries()[2].is_deleted());
    }

    #[test]
    fn test_purge_threshold_is_strict() {
        let now = timestamp::now();
        let mut root = Group::new("Root", None).unwrap();
        root.add_entry("edge", "x", false).unwrap().set_deleted(ago(now, 5));

        assert_eq!(root.purge_deleted_at(5, now), 0);
        assert_eq!(root.purge_deleted_at(4, now), 1);
        assert!(root.entries().is_empty());
    }

    #[test]
    fn test_purge_recurses_into_survivors() {
        let now = timestamp::now();
        let mut root = Group::new("Root", None).unwrap();
        let work = root.add_group("Work", None).unwrap();
        work.add_entry("a", "1", false).unwrap();
        work.add_entry("b", "1", true).unwrap().set_deleted(ago(now, 3));
        work.add_entry("c", "1", false).unwrap();

        root.purge_deleted_at(1, now);

        let labels: Vec<&str> = root.child_group("Work").unwrap().entries().iter().map(Node::label).collect();
        assert_eq!(labels, vec!["a", "c"]);
    }

    #[test]
    fn test_purge_removes_cascaded_subtree() {
        let now = timestamp::now();
        let mut root = Group::new("Root", None).unwrap();
        let old = root.add_group("Old", None).unwrap();
        old.add_entry("inner", "1", false).unwrap();
        old.set_deleted(ago(now, 7));
        root.add_entry("keep", "1", false).unwrap();

        assert_eq!(root.purge_deleted_at(4, now), 1);
        assert!(root.child_group("Old").is_none());
        assert!(root.child_entry("keep").is_some());
    }

    #[test]
    fn test_purge_fresh_deletions_survive() {
        let mut root = Group::new("Root", None).unwrap();
        root.add_entry("recent", "1", false).unwrap().mark_deleted();

        assert_eq!(root.purge_deleted(86_400), 0);
        assert_eq!(root.entries().len(), 1);
    }
}
