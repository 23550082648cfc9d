//! End-to-end properties of initialize / scan / accept against a real
//! filesystem.

use fim_agent::{Agent, AgentConfig, AgentMetrics};
use fim_core::{path_key, ChangeEvent, ChangeKind, Severity};
use std::fs::{self, OpenOptions};
use std::ffi::OsStr;
use std::io::Write;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::{symlink, PermissionsExt};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

struct Fixture {
    root: TempDir,
    state: TempDir,
    agent: Agent,
}

impl Fixture {
    fn new() -> Self {
        Self::with(|_| {})
    }

    fn with(tweak: impl FnOnce(&mut AgentConfig)) -> Self {
        let root = tempfile::tempdir().unwrap();
        let state = tempfile::tempdir().unwrap();
        let mut config = AgentConfig::with_roots(vec![root.path().to_path_buf()]);
        config.baseline_file = state.path().join("baseline.json");
        config.event_log = state.path().join("events.jsonl");
        tweak(&mut config);
        let agent = Agent::new(config, AgentMetrics::shared().unwrap()).unwrap();
        Self { root, state, agent }
    }

    fn path(&self, rel: &str) -> PathBuf {
        self.root.path().join(rel)
    }

    fn key(&self, rel: &str) -> String {
        path_key::encode(&self.path(rel))
    }

    fn write(&self, rel: &str, content: &str) {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    fn scan(&self) -> Vec<ChangeEvent> {
        let baseline = self.agent.load_baseline().unwrap();
        self.agent
            .scan_once(&baseline, &CancellationToken::new())
            .unwrap()
            .events
    }
}

fn kinds(events: &[ChangeEvent]) -> Vec<(String, ChangeKind)> {
    events.iter().map(|e| (e.path.clone(), e.kind)).collect()
}

/// Permission tests are meaningless when the process can read anything.
fn can_still_read(path: &Path) -> bool {
    fs::read(path).is_ok() || fs::read_dir(path).is_ok()
}

#[test]
fn initialize_is_idempotent() {
    let fx = Fixture::new();
    fx.write("a.txt", "alpha");
    fx.write("etc/b.conf", "beta");

    let first = fx.agent.initialize().unwrap();
    let second = fx.agent.initialize().unwrap();
    assert!(first.same_records(&second));
    assert_eq!(first.len(), 2);
}

#[test]
fn scan_right_after_initialize_is_clean() {
    let fx = Fixture::new();
    fx.write("a.txt", "alpha");
    fx.write("nested/deeper/b.txt", "beta");
    fx.agent.initialize().unwrap();

    let baseline = fx.agent.load_baseline().unwrap();
    let report = fx
        .agent
        .scan_once(&baseline, &CancellationToken::new())
        .unwrap();
    assert!(report.events.is_empty());
    assert!(report.summary.is_clean());
    assert_eq!(report.summary.files_tracked, 2);
}

#[test]
fn appended_file_is_single_modified() {
    let fx = Fixture::new();
    fx.write("a.txt", "alpha");
    fx.write("b.txt", "beta");
    fx.agent.initialize().unwrap();

    let mut file = OpenOptions::new().append(true).open(fx.path("b.txt")).unwrap();
    file.write_all(b" appended").unwrap();
    drop(file);

    let events = fx.scan();
    assert_eq!(kinds(&events), vec![(fx.key("b.txt"), ChangeKind::Modified)]);
    assert!(events[0].previous_digest.is_some());
    assert_ne!(events[0].previous_digest, events[0].current_digest);
    assert_eq!(events[0].severity, Severity::Medium);
}

#[test]
fn created_file_is_single_new() {
    let fx = Fixture::new();
    fx.write("a.txt", "alpha");
    fx.agent.initialize().unwrap();

    fx.write("sub/new.txt", "fresh");
    assert_eq!(kinds(&fx.scan()), vec![(fx.key("sub/new.txt"), ChangeKind::New)]);
}

#[test]
fn removed_file_is_single_deleted() {
    let fx = Fixture::new();
    fx.write("a.txt", "alpha");
    fx.write("b.txt", "beta");
    fx.agent.initialize().unwrap();

    fs::remove_file(fx.path("a.txt")).unwrap();
    assert_eq!(kinds(&fx.scan()), vec![(fx.key("a.txt"), ChangeKind::Deleted)]);
}

#[test]
fn excluded_paths_never_produce_events() {
    let fx = Fixture::with(|config| {
        let cache = config.monitored_paths[0].join("cache");
        config.excluded_paths = vec!["*.swp".into(), cache.display().to_string()];
    });
    fx.write("a.txt", "alpha");
    fx.write("cache/old.bin", "old");
    fx.agent.initialize().unwrap();

    fx.write(".a.txt.swp", "swap");
    fx.write("cache/blob.bin", "blob");
    fx.write("cache/deep/er.bin", "deeper");
    fs::remove_file(fx.path("cache/old.bin")).unwrap();

    assert!(fx.scan().is_empty());
    assert!(fx.scan().is_empty());
}

#[test]
fn revoked_read_permission_is_unreadable() {
    let fx = Fixture::new();
    fx.write("secret", "top secret");
    fx.write("other", "plain");
    fx.agent.initialize().unwrap();

    let path = fx.path("secret");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o000)).unwrap();
    if can_still_read(&path) {
        return;
    }

    let events = fx.scan();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

    assert_eq!(kinds(&events), vec![(fx.key("secret"), ChangeKind::Unreadable)]);
    assert_eq!(events[0].severity, Severity::High);
    assert!(events[0].current_digest.is_none());
}

#[test]
fn unreadable_at_initialize_is_not_new_later() {
    let fx = Fixture::new();
    fx.write("locked", "x");
    let path = fx.path("locked");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o000)).unwrap();
    if can_still_read(&path) {
        return;
    }

    let baseline = fx.agent.initialize().unwrap();
    let record = baseline.get(&fx.key("locked")).unwrap();
    assert!(record.content_digest.is_none());
    assert!(record.read_error.is_some());

    let events = fx.scan();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();
    assert!(events.is_empty());
}

#[test]
fn unlistable_directory_is_one_unreadable_event() {
    let fx = Fixture::new();
    fx.write("private/a", "a");
    fx.write("private/b", "b");
    fx.write("public", "p");
    fx.agent.initialize().unwrap();

    let dir = fx.path("private");
    fs::set_permissions(&dir, fs::Permissions::from_mode(0o000)).unwrap();
    if can_still_read(&dir) {
        fs::set_permissions(&dir, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let events = fx.scan();
    fs::set_permissions(&dir, fs::Permissions::from_mode(0o755)).unwrap();
    assert_eq!(kinds(&events), vec![(fx.key("private"), ChangeKind::Unreadable)]);
}

#[test]
fn unavailable_root_is_isolated() {
    let fx = Fixture::new();
    let parent = tempfile::tempdir().unwrap();
    let second = parent.path().join("mnt");
    fs::create_dir(&second).unwrap();
    for i in 0..5 {
        fs::write(second.join(format!("f{i}")), "data").unwrap();
    }

    let mut config = fx.agent.config().clone();
    config.monitored_paths.push(second.clone());
    let agent = Agent::new(config, AgentMetrics::shared().unwrap()).unwrap();
    fx.write("a.txt", "alpha");
    agent.initialize().unwrap();

    fs::remove_dir_all(&second).unwrap();
    fx.write("a.txt", "changed");

    let baseline = agent.load_baseline().unwrap();
    let report = agent.scan_once(&baseline, &CancellationToken::new()).unwrap();
    let mut expected = vec![
        (fx.key("a.txt"), ChangeKind::Modified),
        (second.display().to_string(), ChangeKind::RootUnavailable),
    ];
    expected.sort();
    assert_eq!(kinds(&report.events), expected);
    assert_eq!(report.summary.deleted, 0);
    assert_eq!(report.summary.root_unavailable, 1);
    assert_eq!(report.summary.unavailable_roots, vec![second.display().to_string()]);
    assert!(report.summary.read_errors >= 1);
}

#[test]
fn consecutive_scans_are_deterministic() {
    let fx = Fixture::new();
    for name in ["z", "m", "a", "d/e", "d/f"] {
        fx.write(name, name);
    }
    fx.agent.initialize().unwrap();

    fx.write("m", "changed");
    fx.write("b", "new");
    fs::remove_file(fx.path("d/e")).unwrap();

    let first = fx.scan();
    let second = fx.scan();
    assert_eq!(first.len(), 3);
    let keys_a: Vec<_> = first.iter().map(ChangeEvent::key).collect();
    let keys_b: Vec<_> = second.iter().map(ChangeEvent::key).collect();
    assert_eq!(keys_a, keys_b);

    let paths: Vec<_> = first.iter().map(|e| e.path.clone()).collect();
    let mut sorted = paths.clone();
    sorted.sort();
    assert_eq!(paths, sorted);
}

#[test]
fn delete_plus_new_scenario() {
    let fx = Fixture::new();
    fx.write("a.txt", "digest A");
    fx.write("b.txt", "digest B");
    fx.agent.initialize().unwrap();

    fs::remove_file(fx.path("b.txt")).unwrap();
    fx.write("c.txt", "digest C");

    let baseline = fx.agent.load_baseline().unwrap();
    let report = fx
        .agent
        .scan_once(&baseline, &CancellationToken::new())
        .unwrap();
    assert_eq!(
        kinds(&report.events),
        vec![
            (fx.key("b.txt"), ChangeKind::Deleted),
            (fx.key("c.txt"), ChangeKind::New),
        ]
    );
    assert_eq!(report.summary.deleted, 1);
    assert_eq!(report.summary.new, 1);
    assert_eq!(report.summary.modified, 0);
}

#[test]
fn empty_root_yields_empty_baseline() {
    let fx = Fixture::new();
    let baseline = fx.agent.initialize().unwrap();
    assert!(baseline.is_empty());

    let report = fx
        .agent
        .scan_once(&baseline, &CancellationToken::new())
        .unwrap();
    assert!(report.events.is_empty());
    assert_eq!(report.summary.read_errors, 0);
}

#[test]
fn chmod_is_permission_changed() {
    let fx = Fixture::new();
    fx.write("run.sh", "#!/bin/sh\n");
    fs::set_permissions(fx.path("run.sh"), fs::Permissions::from_mode(0o644)).unwrap();
    fx.agent.initialize().unwrap();

    fs::set_permissions(fx.path("run.sh"), fs::Permissions::from_mode(0o4755)).unwrap();
    let events = fx.scan();
    assert_eq!(kinds(&events), vec![(fx.key("run.sh"), ChangeKind::PermissionChanged)]);
    assert_eq!(events[0].detail.as_deref(), Some("mode 0644 -> 4755"));
}

#[test]
fn retargeted_symlink_is_modified() {
    let fx = Fixture::new();
    fx.write("real", "r");
    fx.write("decoy", "d");
    symlink(fx.path("real"), fx.path("link")).unwrap();
    fx.agent.initialize().unwrap();

    fs::remove_file(fx.path("link")).unwrap();
    symlink(fx.path("decoy"), fx.path("link")).unwrap();
    assert_eq!(kinds(&fx.scan()), vec![(fx.key("link"), ChangeKind::Modified)]);
}

#[test]
fn sockets_are_never_recorded() {
    let fx = Fixture::new();
    fx.write("a", "a");
    let _listener = std::os::unix::net::UnixListener::bind(fx.path("agent.sock")).unwrap();

    let baseline = fx.agent.initialize().unwrap();
    assert_eq!(baseline.len(), 1);
    assert!(baseline.get(&fx.key("agent.sock")).is_none());
}

#[test]
fn scan_never_rewrites_the_baseline() {
    let fx = Fixture::new();
    fx.write("a", "a");
    fx.agent.initialize().unwrap();
    let before = fs::read(fx.state.path().join("baseline.json")).unwrap();

    fx.write("a", "tampered");
    fx.write("b", "dropped in");
    assert_eq!(fx.scan().len(), 2);
    assert_eq!(fx.scan().len(), 2);

    let after = fs::read(fx.state.path().join("baseline.json")).unwrap();
    assert_eq!(before, after);
}

#[test]
fn corrupt_baseline_refuses_to_scan() {
    let fx = Fixture::new();
    fs::write(fx.state.path().join("baseline.json"), "not json").unwrap();
    let err = fx.agent.load_baseline().unwrap_err();
    assert!(err.is_structural());
}

#[test]
fn critical_path_changes_are_high() {
    let fx = Fixture::with(|config| {
        config.critical_paths = vec![config.monitored_paths[0].join("etc/pam.d")];
    });
    fx.write("etc/pam.d/sshd", "auth required");
    fx.write("notes.txt", "n");
    fx.agent.initialize().unwrap();

    fx.write("etc/pam.d/sshd", "auth sufficient pam_permit.so");
    fx.write("notes.txt", "m");
    let events = fx.scan();
    let severities: Vec<_> = events.iter().map(|e| (e.path.clone(), e.severity)).collect();
    assert_eq!(
        severities,
        vec![
            (fx.key("etc/pam.d/sshd"), Severity::High),
            (fx.key("notes.txt"), Severity::Medium),
        ]
    );
}

#[test]
fn non_utf8_names_are_tracked_separately() {
    let fx = Fixture::new();
    let ff = fx.root.path().join(OsStr::from_bytes(b"a\xff"));
    let fe = fx.root.path().join(OsStr::from_bytes(b"a\xfe"));
    fs::write(&ff, "one").unwrap();
    fs::write(&fe, "two").unwrap();

    let baseline = fx.agent.initialize().unwrap();
    assert_eq!(baseline.len(), 2);

    fs::write(&ff, "one, changed").unwrap();
    fs::write(&fe, "two, changed").unwrap();
    fs::remove_file(&fe).unwrap();

    let events = fx.scan();
    assert_eq!(
        kinds(&events),
        vec![
            (path_key::encode(&fe), ChangeKind::Deleted),
            (path_key::encode(&ff), ChangeKind::Modified),
        ]
    );
}

#[test]
fn exclusion_added_later_hides_whole_directory() {
    let fx = Fixture::new();
    fx.write("a.txt", "alpha");
    fx.write("cache/blob", "blob");
    fx.write("cache/deep/er", "deeper");
    fx.agent.initialize().unwrap();

    let mut config = fx.agent.config().clone();
    config.excluded_paths = vec!["cache".into()];
    let agent = Agent::new(config, AgentMetrics::shared().unwrap()).unwrap();

    fs::remove_file(fx.path("cache/blob")).unwrap();
    fx.write("cache/fresh", "new");

    let baseline = agent.load_baseline().unwrap();
    let report = agent.scan_once(&baseline, &CancellationToken::new()).unwrap();
    assert!(report.events.is_empty(), "{:?}", report.events);
}
