/// End-to-end sweep tests against the in-memory backend.
///
/// The in-memory file system lets each test reshape the tree between sweeps
/// and control modification times exactly, so every diffing property can be
/// checked deterministically without sleeping.
use dirsweep_core::{
    BoxError, CallbackSink, CancelToken, CollectingSink, Error, Event, EventKind, EventMask,
    EventSink, ExcludePaths, Filter, MemoryFileSystem, Watcher, WatcherBuilder,
};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant, SystemTime};

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Builder over a shared in-memory tree with the stability gate disabled.
fn builder(fs: &Arc<MemoryFileSystem>) -> WatcherBuilder {
    Watcher::builder()
        .file_system(Arc::clone(fs))
        .write_stability_threshold(Duration::ZERO)
}

fn watcher(fs: &Arc<MemoryFileSystem>) -> Watcher {
    builder(fs).build().expect("failed to build watcher")
}

/// Run one sweep and return `(added, removed)`, both sorted.
fn sweep(w: &mut Watcher) -> (Vec<String>, Vec<String>) {
    let sink = CollectingSink::new();
    w.sweep(&CancelToken::new(), &sink).expect("sweep failed");
    (sink.added(), sink.removed())
}

fn strings(paths: &[&str]) -> Vec<String> {
    let mut v: Vec<String> = paths.iter().map(|p| p.to_string()).collect();
    v.sort();
    v
}

/// Filter that accepts everything and records the paths it was asked about.
/// Clones share the same record.
#[derive(Clone, Default)]
struct RecordingFilter {
    seen: Arc<Mutex<BTreeSet<String>>>,
}

impl Filter for RecordingFilter {
    fn filter(&self, path: &str) -> Result<bool, BoxError> {
        self.seen.lock().insert(path.to_owned());
        Ok(true)
    }
}

// ── Basic diffing ────────────────────────────────────────────────────────────

/// Literal scenario: add, add, empty dir, delete both.
#[test]
fn detects_added_and_removed_files() {
    let fs = Arc::new(MemoryFileSystem::with_files(["foo"]));
    let mut w = watcher(&fs);

    assert_eq!(sweep(&mut w), (strings(&["foo"]), vec![]));

    fs.insert_file("bar");
    assert_eq!(sweep(&mut w), (strings(&["bar"]), vec![]));

    fs.insert_dir("somedir");
    assert_eq!(sweep(&mut w), (vec![], vec![]));

    fs.remove("foo");
    fs.remove("bar");
    assert_eq!(sweep(&mut w), (vec![], strings(&["foo", "bar"])));
}

#[test]
fn consecutive_sweeps_without_changes_are_quiet() {
    let fs = Arc::new(MemoryFileSystem::with_files([
        "hello/foo/a",
        "hello/foo/bar/a",
        "hello/bar/a",
    ]));
    fs.insert_dir("hello/foo/bar/baz");
    let mut w = watcher(&fs);

    let (added, removed) = sweep(&mut w);
    assert_eq!(added, strings(&["hello/foo/a", "hello/foo/bar/a", "hello/bar/a"]));
    assert!(removed.is_empty());
    assert_eq!(w.cached_file_count(), 3);

    let sink = CollectingSink::new();
    let report = w.sweep(&CancelToken::new(), &sink).unwrap();
    assert!(sink.is_empty());
    assert!(report.is_quiet());
    assert_eq!(report.dirs_visited, 6);
}

#[test]
fn delete_every_file_in_a_directory() {
    let fs = Arc::new(MemoryFileSystem::with_files(["hello/foo", "hello/bar", "hello/baz"]));
    let mut w = watcher(&fs);
    sweep(&mut w);

    fs.remove("hello/foo");
    fs.remove("hello/bar");
    fs.remove("hello/baz");
    let (added, removed) = sweep(&mut w);
    assert!(added.is_empty());
    assert_eq!(removed, strings(&["hello/foo", "hello/bar", "hello/baz"]));
}

/// Deleting a whole directory reports every file cached beneath it and
/// nothing for the directory itself.
#[test]
fn removal_cascades_through_subtree() {
    let fs = Arc::new(MemoryFileSystem::with_files([
        "hello/foo/a",
        "hello/foo/bar/a",
        "hello/bar/a",
    ]));
    fs.insert_dir("hello/foo/bar/baz");
    let mut w = watcher(&fs);
    sweep(&mut w);

    fs.remove("hello/foo");
    let (added, removed) = sweep(&mut w);
    assert!(added.is_empty());
    assert_eq!(removed, strings(&["hello/foo/a", "hello/foo/bar/a"]));
    assert_eq!(w.cached_file_count(), 1);

    // Recreating the directory reports its files afresh.
    fs.insert_file("hello/foo/a");
    assert_eq!(sweep(&mut w), (strings(&["hello/foo/a"]), vec![]));
}

#[test]
fn file_replaced_by_directory() {
    let fs = Arc::new(MemoryFileSystem::with_files(["x"]));
    let mut w = watcher(&fs);
    sweep(&mut w);

    fs.remove("x");
    fs.insert_file("x/y");
    assert_eq!(sweep(&mut w), (strings(&["x/y"]), strings(&["x"])));

    fs.remove("x");
    fs.insert_file("x");
    assert_eq!(sweep(&mut w), (strings(&["x"]), strings(&["x/y"])));
}

#[test]
fn fresh_watcher_reports_everything_again() {
    let fs = Arc::new(MemoryFileSystem::with_files(["a", "d/b"]));
    let mut first = watcher(&fs);
    sweep(&mut first);

    let mut restarted = watcher(&fs);
    assert_eq!(sweep(&mut restarted).0, strings(&["a", "d/b"]));
}

// ── Ordering ─────────────────────────────────────────────────────────────────

/// Within one directory: additions, then removals, then children.
#[test]
fn events_are_ordered_within_a_directory() {
    let fs = Arc::new(MemoryFileSystem::with_files(["gone", "keep"]));
    let mut w = watcher(&fs);
    sweep(&mut w);

    fs.remove("gone");
    fs.insert_file("new");
    fs.insert_file("sub/inner");

    let sink = CollectingSink::new();
    w.sweep(&CancelToken::new(), &sink).unwrap();
    assert_eq!(
        sink.take(),
        vec![
            Event::added("new"),
            Event::removed("gone"),
            Event::added("sub/inner"),
        ]
    );
}

// ── Write stability ──────────────────────────────────────────────────────────

#[test]
fn stable_file_is_added_once() {
    let fs = Arc::new(MemoryFileSystem::new());
    fs.insert_file_at("foo", SystemTime::now() - Duration::from_secs(3600));
    let mut w = Watcher::new(Arc::clone(&fs)).unwrap();

    assert_eq!(sweep(&mut w), (strings(&["foo"]), vec![]));
}

#[test]
fn unstable_file_is_deferred_until_it_ages() {
    let fs = Arc::new(MemoryFileSystem::new());
    fs.insert_file_at("partial.bin", SystemTime::now());
    let mut w = Watcher::new(Arc::clone(&fs)).unwrap();

    assert_eq!(sweep(&mut w), (vec![], vec![]));
    assert_eq!(w.cached_file_count(), 0);

    fs.set_modified("partial.bin", SystemTime::now() - Duration::from_secs(60));
    assert_eq!(sweep(&mut w), (strings(&["partial.bin"]), vec![]));
    assert_eq!(sweep(&mut w), (vec![], vec![]));
}

/// A cached file that is written to again stays cached: no phantom
/// removal followed by a second addition.
#[test]
fn cached_file_is_not_regated() {
    let fs = Arc::new(MemoryFileSystem::new());
    fs.insert_file_at("log.txt", SystemTime::now() - Duration::from_secs(3600));
    let mut w = Watcher::new(Arc::clone(&fs)).unwrap();
    sweep(&mut w);

    fs.set_modified("log.txt", SystemTime::now());
    assert_eq!(sweep(&mut w), (vec![], vec![]));

    fs.set_modified("log.txt", SystemTime::now() - Duration::from_secs(3600));
    assert_eq!(sweep(&mut w), (vec![], vec![]));
}

// ── Filters ──────────────────────────────────────────────────────────────────

#[test]
fn excluded_directory_never_reports() {
    let fs = Arc::new(MemoryFileSystem::with_files([
        "hello/foo/a",
        "hello/foo/bar/a",
        "hello/bar/a",
        "world/baz/a",
    ]));
    let mut w = builder(&fs)
        .dir_filter(ExcludePaths::new(["hello/foo"]))
        .build()
        .unwrap();

    assert_eq!(sweep(&mut w).0, strings(&["hello/bar/a", "world/baz/a"]));

    fs.insert_file("hello/foo/new");
    fs.remove("hello/foo/a");
    fs.insert_file("hello/bar/b");
    assert_eq!(sweep(&mut w), (strings(&["hello/bar/b"]), vec![]));

    fs.remove("hello/foo");
    assert_eq!(sweep(&mut w), (vec![], vec![]));
}

#[test]
fn file_filter_drops_entries_entirely() {
    let fs = Arc::new(MemoryFileSystem::with_files(["keep.txt", "skip.tmp", "d/skip.tmp"]));
    let only_txt = |p: &str| -> Result<bool, BoxError> { Ok(!p.ends_with(".tmp")) };
    let mut w = builder(&fs).file_filter(only_txt).build().unwrap();

    assert_eq!(sweep(&mut w).0, strings(&["keep.txt"]));
    fs.remove("skip.tmp");
    assert_eq!(sweep(&mut w), (vec![], vec![]));
    assert_eq!(w.cached_file_count(), 1);
}

#[test]
fn filter_error_aborts_sweep() {
    let fs = Arc::new(MemoryFileSystem::with_files(["ok", "bad"]));
    let failing = |p: &str| -> Result<bool, BoxError> {
        if p == "bad" {
            Err("cannot decide".into())
        } else {
            Ok(true)
        }
    };
    let mut w = builder(&fs).file_filter(failing).build().unwrap();

    let err = w
        .sweep(&CancelToken::new(), &CollectingSink::new())
        .unwrap_err();
    match err {
        Error::Filter { path, .. } => assert_eq!(path, "bad"),
        other => panic!("expected filter error, got {other:?}"),
    }
}

// ── Sub-root ─────────────────────────────────────────────────────────────────

#[test]
fn sub_root_prefixes_paths_and_filter_inputs() {
    let fs = Arc::new(MemoryFileSystem::with_files([
        "hello/foo/a",
        "hello/foo/bar/a",
        "hello/bar/a",
        "world/baz/a",
    ]));
    fs.insert_dir("hello/foo/bar/baz");
    let dirs = RecordingFilter::default();
    let files = RecordingFilter::default();
    let mut w = builder(&fs)
        .sub_root("hello")
        .dir_filter(dirs.clone())
        .file_filter(files.clone())
        .build()
        .unwrap();

    assert_eq!(
        sweep(&mut w).0,
        strings(&["hello/foo/a", "hello/foo/bar/a", "hello/bar/a"])
    );
    assert_eq!(
        dirs.seen.lock().iter().cloned().collect::<Vec<_>>(),
        strings(&["hello", "hello/foo", "hello/foo/bar", "hello/foo/bar/baz", "hello/bar"])
    );
    assert_eq!(
        files.seen.lock().iter().cloned().collect::<Vec<_>>(),
        strings(&["hello/foo/a", "hello/foo/bar/a", "hello/bar/a"])
    );
}

#[test]
fn missing_sub_root_is_transient() {
    let fs = Arc::new(MemoryFileSystem::with_files(["hello/a"]));
    let mut w = builder(&fs).sub_root("world").build().unwrap();

    let sink = CollectingSink::new();
    let err = w.sweep(&CancelToken::new(), &sink).unwrap_err();
    assert!(err.is_root_not_found());
    assert!(err.is_retryable());
    assert!(sink.is_empty());

    fs.insert_file("world/a");
    fs.insert_file("world/child/a");
    fs.insert_dir("world/child/grandchild");
    assert_eq!(sweep(&mut w).0, strings(&["world/a", "world/child/a"]));
}

// ── Depth and mask ───────────────────────────────────────────────────────────

#[test]
fn max_depth_stops_descent() {
    let fs = Arc::new(MemoryFileSystem::with_files(["a", "d1/b", "d1/d2/c"]));
    let mut w = builder(&fs).max_depth(2).build().unwrap();
    assert_eq!(sweep(&mut w).0, strings(&["a", "d1/b"]));

    let mut none = builder(&fs).max_depth(0).build().unwrap();
    assert_eq!(sweep(&mut none), (vec![], vec![]));
}

#[test]
fn event_mask_hides_but_still_tracks() {
    let fs = Arc::new(MemoryFileSystem::with_files(["a"]));
    let mut w = builder(&fs).events(EventMask::ADDED).build().unwrap();
    assert_eq!(sweep(&mut w).0, strings(&["a"]));

    fs.remove("a");
    assert_eq!(sweep(&mut w), (vec![], vec![]));
    assert_eq!(w.cached_file_count(), 0);

    fs.insert_file("a");
    assert_eq!(sweep(&mut w).0, strings(&["a"]));

    let mut removed_only = builder(&fs).events(EventMask::REMOVED).build().unwrap();
    let sink = CollectingSink::new();
    let report = removed_only.sweep(&CancelToken::new(), &sink).unwrap();
    assert!(sink.is_empty());
    assert_eq!(report.added, 0);
}

// ── Errors and cancellation ──────────────────────────────────────────────────

#[test]
fn listing_error_is_surfaced_and_recoverable() {
    let fs = Arc::new(MemoryFileSystem::with_files(["ok/a", "locked/b"]));
    fs.fail_path("locked");
    let mut w = watcher(&fs);

    let err = w
        .sweep(&CancelToken::new(), &CollectingSink::new())
        .unwrap_err();
    match &err {
        Error::ReadDir { path, source } => {
            assert_eq!(path, "locked");
            assert_eq!(source.kind(), std::io::ErrorKind::PermissionDenied);
        }
        other => panic!("expected read dir error, got {other:?}"),
    }
    assert!(!err.is_cancelled());

    fs.clear_failures();
    let (added, removed) = sweep(&mut w);
    assert!(added.contains(&"locked/b".to_string()));
    assert!(removed.is_empty());
}

#[test]
fn error_deep_in_the_tree_wins_over_sibling_cancellation() {
    let fs = Arc::new(MemoryFileSystem::new());
    for i in 0..32 {
        fs.insert_file(&format!("d{i:02}/f"));
    }
    fs.insert_file("d17/deep/x");
    fs.fail_path("d17/deep");
    let mut w = builder(&fs).parallelism(4).build().unwrap();

    let err = w
        .sweep(&CancelToken::new(), &CollectingSink::new())
        .unwrap_err();
    assert!(matches!(err, Error::ReadDir { ref path, .. } if path == "d17/deep"));
}

/// Poll `cond` until it holds or ten seconds pass.
fn wait_for(cond: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !cond() {
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    true
}

/// Shared state between the directory filter and the sink of
/// `failing_branch_cancels_running_siblings`.
#[derive(Default)]
struct Race {
    armed: AtomicBool,
    done_descended: AtomicBool,
    slow_blocked: AtomicBool,
    slow_saw_cancel: AtomicBool,
    attempted: Mutex<Vec<String>>,
    delivered: Mutex<Vec<String>>,
}

/// Rejects `bad` once, but only after `done` has committed and descended
/// into `done/sub` and `slow` is stuck publishing.
struct FailOnceFilter(Arc<Race>);

impl Filter for FailOnceFilter {
    fn filter(&self, path: &str) -> Result<bool, BoxError> {
        let race = &self.0;
        match path {
            "done/sub" => race.done_descended.store(true, Ordering::SeqCst),
            "bad" if race.armed.swap(false, Ordering::SeqCst) => {
                wait_for(|| {
                    race.done_descended.load(Ordering::SeqCst)
                        && race.slow_blocked.load(Ordering::SeqCst)
                });
                return Err("bad is unreadable".into());
            }
            _ => {}
        }
        Ok(true)
    }
}

/// Holds every event under `slow/` until the sweep's token is cancelled.
struct BlockingSink(Arc<Race>);

impl EventSink for BlockingSink {
    fn publish(&self, event: Event, cancel: &CancelToken) -> dirsweep_core::Result<()> {
        let race = &self.0;
        race.attempted.lock().push(event.path.clone());
        if event.path.starts_with("slow/") {
            race.slow_blocked.store(true, Ordering::SeqCst);
            if wait_for(|| cancel.is_cancelled()) {
                race.slow_saw_cancel.store(true, Ordering::SeqCst);
            }
            cancel.check()?;
        }
        race.delivered.lock().push(event.path);
        Ok(())
    }
}

#[test]
fn failing_branch_cancels_running_siblings() {
    let fs = Arc::new(MemoryFileSystem::with_files(["done/f", "slow/1", "slow/2"]));
    fs.insert_dir("done/sub");
    fs.insert_dir("bad");
    let race = Arc::new(Race::default());
    race.armed.store(true, Ordering::SeqCst);
    let mut w = builder(&fs)
        .parallelism(4)
        .dir_filter(FailOnceFilter(Arc::clone(&race)))
        .build()
        .unwrap();

    let err = w
        .sweep(&CancelToken::new(), &BlockingSink(Arc::clone(&race)))
        .unwrap_err();
    assert!(matches!(err, Error::Filter { ref path, .. } if path == "bad"));

    // The blocked sibling was released by cancellation, not by a timeout,
    // and never got to its second file.
    assert!(race.slow_saw_cancel.load(Ordering::SeqCst));
    assert_eq!(*race.delivered.lock(), vec!["done/f".to_string()]);
    assert!(!race.attempted.lock().contains(&"slow/2".to_string()));

    // `done` committed before the failure; `slow` did not.
    assert_eq!(sweep(&mut w), (strings(&["slow/1", "slow/2"]), vec![]));
}

/// Cancelling mid-directory leaves that directory's cache untouched, so the
/// next sweep reports the same additions again.
#[test]
fn cancellation_mid_sweep_commits_nothing_for_that_directory() {
    let fs = Arc::new(MemoryFileSystem::with_files(["a", "b", "c"]));
    let mut w = watcher(&fs);

    let token = CancelToken::new();
    let trip = token.clone();
    let sink = CallbackSink(move |_ev: Event| trip.cancel());
    let err = w.sweep(&token, &sink).unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(w.cached_file_count(), 0);

    assert_eq!(sweep(&mut w).0, strings(&["a", "b", "c"]));
}

#[test]
fn closed_channel_sink_fails_the_sweep() {
    let fs = Arc::new(MemoryFileSystem::with_files(["a"]));
    let mut w = watcher(&fs);
    let (tx, rx) = crossbeam_channel::bounded::<Event>(1);
    drop(rx);
    assert!(matches!(
        w.sweep(&CancelToken::new(), &tx),
        Err(Error::SinkClosed)
    ));
}

// ── Concurrency ──────────────────────────────────────────────────────────────

#[test]
fn wide_tree_is_swept_concurrently() {
    let fs = Arc::new(MemoryFileSystem::new());
    for d in 0..100 {
        for f in 0..5 {
            fs.insert_file(&format!("dir{d:03}/sub/file{f}"));
        }
    }
    let mut w = builder(&fs).parallelism(4).build().unwrap();

    let (tx, rx) = crossbeam_channel::unbounded::<Event>();
    let report = w.sweep(&CancelToken::new(), &tx).unwrap();
    drop(tx);
    let events: Vec<Event> = rx.iter().collect();
    assert_eq!(events.len(), 500);
    assert!(events.iter().all(|e| e.kind == EventKind::Added));
    assert_eq!(report.added, 500);
    assert_eq!(report.dirs_visited, 201);

    for d in (0..100).step_by(2) {
        fs.remove(&format!("dir{d:03}"));
    }
    let (added, removed) = sweep(&mut w);
    assert!(added.is_empty());
    assert_eq!(removed.len(), 250);
    assert_eq!(w.cached_file_count(), 250);
}
