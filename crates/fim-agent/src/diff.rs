//! Compare a fresh snapshot against the stored baseline.
//!
//! Comparison is read-only: nothing here touches the baseline. Per path:
//!
//! | baseline | current            | event                |
//! |----------|--------------------|----------------------|
//! | absent   | present            | `NEW`                |
//! | present  | absent             | `DELETED`            |
//! | readable | unreadable         | `UNREADABLE`         |
//! | digest A | digest B           | `MODIFIED`           |
//! | digest A | digest A, new mode | `PERMISSION_CHANGED` |
//!
//! Baseline records under an unavailable root produce nothing (the root gets
//! one `ROOT_UNAVAILABLE`), and records under an unlistable directory produce
//! one `UNREADABLE` for that directory.

use chrono::{DateTime, Utc};
use fim_core::{path_key, Baseline, ChangeEvent, ChangeKind, FileRecord};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::monitor::MonitoredSet;
use crate::severity::SeverityPolicy;
use crate::walk::Snapshot;

/// Everything the diff needs besides the two states.
pub struct DiffContext<'a> {
    pub set: &'a MonitoredSet,
    pub policy: &'a SeverityPolicy,
    /// Stamped on every event of this scan
    pub timestamp: DateTime<Utc>,
    pub host: &'a str,
}

impl DiffContext<'_> {
    fn event(
        &self,
        kind: ChangeKind,
        path: &str,
        previous_digest: Option<&String>,
        current_digest: Option<&String>,
        detail: Option<String>,
    ) -> ChangeEvent {
        ChangeEvent {
            timestamp: self.timestamp,
            host: self.host.to_string(),
            path: path.to_string(),
            kind,
            severity: self.policy.classify(kind, &path_key::decode(path)),
            previous_digest: previous_digest.cloned(),
            current_digest: current_digest.cloned(),
            detail,
        }
    }
}

/// Produce path-ordered change events. Deterministic for identical inputs.
pub fn compare(baseline: &Baseline, current: &Snapshot, ctx: &DiffContext<'_>) -> Vec<ChangeEvent> {
    let mut events = Vec::new();

    for root in &current.unavailable_roots {
        events.push(ctx.event(
            ChangeKind::RootUnavailable,
            &path_key::encode(&root.path),
            None,
            None,
            Some(root.reason.clone()),
        ));
    }

    // Blind spots that hide at least one baseline record, with the reason.
    let mut hidden: BTreeMap<PathBuf, &str> = BTreeMap::new();

    for (path, before) in &baseline.records {
        let p = path_key::decode(path);
        if !ctx.set.covers(&p) {
            continue;
        }

        if let Some(after) = current.records.get(path) {
            if let Some(event) = compare_record(before, after, ctx) {
                events.push(event);
            }
            continue;
        }

        if current.unavailable_root_of(&p).is_some() {
            continue;
        }
        if let Some(spot) = current.blind_spot_of(&p) {
            hidden.entry(spot.path.clone()).or_insert(&spot.reason);
            continue;
        }
        events.push(ctx.event(
            ChangeKind::Deleted,
            path,
            before.content_digest.as_ref(),
            None,
            None,
        ));
    }

    for (spot, reason) in hidden {
        events.push(ctx.event(
            ChangeKind::Unreadable,
            &path_key::encode(&spot),
            None,
            None,
            Some(reason.to_string()),
        ));
    }

    for (path, after) in &current.records {
        if baseline.records.contains_key(path) {
            continue;
        }
        let detail = after
            .read_error
            .as_ref()
            .map(|e| format!("unreadable: {e}"));
        events.push(ctx.event(
            ChangeKind::New,
            path,
            None,
            after.content_digest.as_ref(),
            detail,
        ));
    }

    events.sort_by(|a, b| a.path.cmp(&b.path).then(a.kind.cmp(&b.kind)));
    events
}

/// Compare two observations of the same path.
///
/// An unreadable current observation never yields `MODIFIED`, even when the
/// stat size changed: no digest is ever inferred for unread data.
fn compare_record(
    before: &FileRecord,
    after: &FileRecord,
    ctx: &DiffContext<'_>,
) -> Option<ChangeEvent> {
    if !after.is_readable() {
        if before.is_readable() {
            let mut detail = after
                .read_error
                .as_ref()
                .map_or_else(|| "unreadable".to_string(), ToString::to_string);
            if after.size != before.size {
                detail.push_str(&format!("; size {} -> {}", before.size, after.size));
            }
            return Some(ctx.event(
                ChangeKind::Unreadable,
                &after.path,
                before.content_digest.as_ref(),
                None,
                Some(detail),
            ));
        }
        // Unreadable then and now: only metadata can be compared.
        return (!before.same_permissions(after)).then(|| permission_event(before, after, ctx));
    }

    if !before.same_content(after) {
        let detail = (!before.is_readable()).then(|| "previously unreadable".to_string());
        return Some(ctx.event(
            ChangeKind::Modified,
            &after.path,
            before.content_digest.as_ref(),
            after.content_digest.as_ref(),
            detail,
        ));
    }

    (!before.same_permissions(after)).then(|| permission_event(before, after, ctx))
}

fn permission_event(before: &FileRecord, after: &FileRecord, ctx: &DiffContext<'_>) -> ChangeEvent {
    let mut changes = Vec::new();
    if before.mode != after.mode {
        changes.push(format!("mode {:04o} -> {:04o}", before.mode, after.mode));
    }
    if before.owner != after.owner {
        changes.push(format!("owner {} -> {}", before.owner, after.owner));
    }
    if before.group != after.group {
        changes.push(format!("group {} -> {}", before.group, after.group));
    }
    ctx.event(
        ChangeKind::PermissionChanged,
        &after.path,
        before.content_digest.as_ref(),
        after.content_digest.as_ref(),
        Some(changes.join(", ")),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::walk::Obstruction;
    use fim_core::{DigestAlgorithm, EntryKind, ReadFailure, ReadFailureKind, Severity};

    fn rec(path: &str, digest: Option<&str>, mode: u32) -> FileRecord {
        FileRecord {
            path: path.into(),
            entry: EntryKind::File,
            content_digest: digest.map(String::from),
            size: 10,
            mode,
            owner: 0,
            group: 0,
            mtime: None,
            observed_at: Utc::now(),
            read_error: digest.is_none().then(|| ReadFailure {
                kind: ReadFailureKind::PermissionDenied,
                message: "Permission denied (os error 13)".into(),
            }),
        }
    }

    fn map(records: Vec<FileRecord>) -> BTreeMap<String, FileRecord> {
        records.into_iter().map(|r| (r.path.clone(), r)).collect()
    }

    fn baseline(records: Vec<FileRecord>) -> Baseline {
        Baseline::new("lab1", DigestAlgorithm::Sha256, vec!["/srv".into()], map(records))
    }

    fn snapshot(records: Vec<FileRecord>) -> Snapshot {
        Snapshot {
            records: map(records),
            ..Snapshot::default()
        }
    }

    fn run(baseline: &Baseline, current: &Snapshot, critical: &[&str]) -> Vec<ChangeEvent> {
        let set = MonitoredSet::new(vec![PathBuf::from("/srv")], &[]).unwrap();
        let policy = SeverityPolicy::new(critical.iter().map(PathBuf::from).collect());
        let ctx = DiffContext {
            set: &set,
            policy: &policy,
            timestamp: Utc::now(),
            host: "lab1",
        };
        compare(baseline, current, &ctx)
    }

    fn kinds(events: &[ChangeEvent]) -> Vec<(&str, ChangeKind)> {
        events.iter().map(|e| (e.path.as_str(), e.kind)).collect()
    }

    #[test]
    fn test_delete_and_new_scenario() {
        let b = baseline(vec![rec("/srv/a.txt", Some("A"), 0o644), rec("/srv/b.txt", Some("B"), 0o644)]);
        let s = snapshot(vec![rec("/srv/a.txt", Some("A"), 0o644), rec("/srv/c.txt", Some("C"), 0o644)]);
        let events = run(&b, &s, &[]);
        assert_eq!(
            kinds(&events),
            vec![("/srv/b.txt", ChangeKind::Deleted), ("/srv/c.txt", ChangeKind::New)]
        );
        assert_eq!(events[0].previous_digest.as_deref(), Some("B"));
        assert_eq!(events[1].current_digest.as_deref(), Some("C"));
    }

    #[test]
    fn test_modified_and_permission_changed() {
        let b = baseline(vec![rec("/srv/x", Some("X"), 0o644), rec("/srv/y", Some("Y"), 0o644)]);
        let s = snapshot(vec![rec("/srv/x", Some("X2"), 0o644), rec("/srv/y", Some("Y"), 0o600)]);
        let events = run(&b, &s, &[]);
        assert_eq!(
            kinds(&events),
            vec![("/srv/x", ChangeKind::Modified), ("/srv/y", ChangeKind::PermissionChanged)]
        );
        assert_eq!(events[1].detail.as_deref(), Some("mode 0644 -> 0600"));
    }

    #[test]
    fn test_unreadable_wins_over_size_change() {
        let b = baseline(vec![rec("/srv/x", Some("X"), 0o644)]);
        let mut now = rec("/srv/x", None, 0o000);
        now.size = 99;
        let events = run(&b, &snapshot(vec![now]), &[]);
        assert_eq!(kinds(&events), vec![("/srv/x", ChangeKind::Unreadable)]);
        assert_eq!(events[0].severity, Severity::High);
        assert!(events[0].current_digest.is_none());
        assert!(events[0].detail.as_deref().unwrap().contains("size 10 -> 99"));
    }

    #[test]
    fn test_unreadable_both_times_is_quiet() {
        let b = baseline(vec![rec("/srv/x", None, 0o000)]);
        let s = snapshot(vec![rec("/srv/x", None, 0o000)]);
        assert!(run(&b, &s, &[]).is_empty());
    }

    #[test]
    fn test_previously_unreadable_now_readable_is_modified() {
        let b = baseline(vec![rec("/srv/x", None, 0o000)]);
        let s = snapshot(vec![rec("/srv/x", Some("X"), 0o000)]);
        let events = run(&b, &s, &[]);
        assert_eq!(kinds(&events), vec![("/srv/x", ChangeKind::Modified)]);
        assert!(events[0].previous_digest.is_none());
    }

    #[test]
    fn test_unavailable_root_suppresses_deletes() {
        let b = baseline(vec![rec("/srv/a", Some("A"), 0o644), rec("/srv/b", Some("B"), 0o644)]);
        let s = Snapshot {
            unavailable_roots: vec![Obstruction {
                path: PathBuf::from("/srv"),
                reason: "No such file or directory".into(),
            }],
            ..Snapshot::default()
        };
        let events = run(&b, &s, &[]);
        assert_eq!(kinds(&events), vec![("/srv", ChangeKind::RootUnavailable)]);
        assert_eq!(events[0].severity, Severity::High);
    }

    #[test]
    fn test_blind_spot_yields_single_unreadable() {
        let b = baseline(vec![
            rec("/srv/locked/a", Some("A"), 0o644),
            rec("/srv/locked/b", Some("B"), 0o644),
            rec("/srv/open", Some("O"), 0o644),
        ]);
        let s = Snapshot {
            records: map(vec![rec("/srv/open", Some("O"), 0o644)]),
            blind_spots: vec![Obstruction {
                path: PathBuf::from("/srv/locked"),
                reason: "Permission denied".into(),
            }],
            ..Snapshot::default()
        };
        let events = run(&b, &s, &[]);
        assert_eq!(kinds(&events), vec![("/srv/locked", ChangeKind::Unreadable)]);
    }

    #[test]
    fn test_records_outside_monitored_set_ignored() {
        let b = baseline(vec![rec("/old-root/a", Some("A"), 0o644)]);
        assert!(run(&b, &snapshot(Vec::new()), &[]).is_empty());
    }

    #[test]
    fn test_critical_delete_is_high() {
        let b = baseline(vec![rec("/srv/etc/shadow", Some("S"), 0o640)]);
        let events = run(&b, &snapshot(Vec::new()), &["/srv/etc/shadow"]);
        assert_eq!(events[0].kind, ChangeKind::Deleted);
        assert_eq!(events[0].severity, Severity::High);
    }

    #[test]
    fn test_events_sorted_by_path() {
        let b = baseline(vec![rec("/srv/m", Some("M"), 0o644)]);
        let s = snapshot(vec![rec("/srv/z", Some("Z"), 0o644), rec("/srv/a", Some("A"), 0o644)]);
        let events = run(&b, &s, &[]);
        let paths: Vec<_> = events.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["/srv/a", "/srv/m", "/srv/z"]);
    }
}
