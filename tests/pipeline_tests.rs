//! Worker pool, per-record submit context and directory walk tests.

use arcsubmit::error::TransportError;
use arcsubmit::extract::ContentExtractor;
use arcsubmit::index_client::IndexClient;
use arcsubmit::payload::{CustomFields, DocumentBuilder, NoCustomFields};
use arcsubmit::pipeline::walk::{WalkOutcome, walkdir_iter};
use arcsubmit::pipeline::{SubmitContext, WorkerPool};
use arcsubmit::state::{SqliteStore, StateStore};
use arcsubmit::{FieldMapping, Outcome, RawContent, SubmissionDocument};
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

struct Recorder(Mutex<Vec<String>>);

impl IndexClient for Recorder {
    fn submit(&self, payload: &str) -> Result<(), TransportError> {
        if payload.contains("fail.example") {
            return Err(TransportError::Other("connection refused".into()));
        }
        self.0.lock().unwrap().push(payload.to_string());
        Ok(())
    }
}

struct PanickyFields;

impl CustomFields for PanickyFields {
    fn fields(&self, _doc: &SubmissionDocument) -> String {
        panic!("hook exploded");
    }
}

fn ctx(custom: Arc<dyn CustomFields>) -> (SubmitContext, Arc<SqliteStore>) {
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    let mapping = FieldMapping {
        url: "url".into(),
        title: "title".into(),
        text: "text".into(),
        mime_type: "type".into(),
        cache: "cache".into(),
        offset: "offset".into(),
    };
    let ctx = SubmitContext::new(
        Arc::new(ContentExtractor::default()),
        Arc::new(DocumentBuilder::new(mapping, "/arcs", "/cache")),
        custom,
        Arc::new(Recorder(Mutex::new(Vec::new()))),
        store.clone(),
    );
    (ctx, store)
}

fn doc(url: &str) -> SubmissionDocument {
    SubmissionDocument {
        url: url.into(),
        mime_type: "text/html".into(),
        container: PathBuf::from("/arcs/a.arc"),
        offset: 0,
        raw: RawContent::Text("<title>t</title>body".into()),
        title: None,
        text: String::new(),
        outcome: Outcome::Pending,
    }
}

#[test]
fn test_wait_idle_waits_for_running_tasks() {
    let done = Arc::new(AtomicUsize::new(0));
    let d = Arc::clone(&done);
    let pool = WorkerPool::new(2, 2, move |ms: u64| {
        thread::sleep(Duration::from_millis(ms));
        d.fetch_add(1, Ordering::SeqCst);
    });
    for _ in 0..6 {
        pool.dispatch(20).unwrap();
    }
    pool.wait_idle();
    assert_eq!(done.load(Ordering::SeqCst), 6);
    assert_eq!(pool.pending(), 0);
    assert!(pool.shutdown(Duration::from_secs(5)));
}

#[test]
fn test_pool_never_runs_more_than_worker_count() {
    let active = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let (a, p) = (Arc::clone(&active), Arc::clone(&peak));
    let pool = WorkerPool::new(3, 1, move |_: ()| {
        let now = a.fetch_add(1, Ordering::SeqCst) + 1;
        p.fetch_max(now, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(5));
        a.fetch_sub(1, Ordering::SeqCst);
    });
    for _ in 0..40 {
        pool.dispatch(()).unwrap();
    }
    pool.wait_idle();
    assert!(peak.load(Ordering::SeqCst) <= 3);
    assert!(pool.shutdown(Duration::from_secs(5)));
}

#[test]
fn test_panicking_task_does_not_block_barrier() {
    let pool = WorkerPool::new(2, 4, |n: u32| {
        if n == 1 {
            panic!("boom");
        }
    });
    for n in 0..4 {
        let _ = pool.dispatch(n);
    }
    pool.wait_idle();
    assert_eq!(pool.pending(), 0);
    assert!(pool.shutdown(Duration::from_secs(5)));
}

#[test]
fn test_shutdown_times_out_on_stuck_worker() {
    let pool = WorkerPool::new(1, 1, |_: ()| thread::sleep(Duration::from_millis(500)));
    pool.dispatch(()).unwrap();
    assert!(!pool.shutdown(Duration::from_millis(20)));
}

#[test]
fn test_success_is_buffered_until_flush() {
    let (ctx, store) = ctx(Arc::new(NoCustomFields));
    assert_eq!(ctx.process(doc("http://ok.example/")), Outcome::Success);
    assert_eq!(store.counts().unwrap().indexed_pages, 0);
    assert_eq!(ctx.flush_indexed(), 1);
    assert_eq!(store.counts().unwrap().indexed_pages, 1);
    assert_eq!(ctx.flush_indexed(), 0);
}

#[test]
fn test_transport_failure_is_written_immediately() {
    let (ctx, store) = ctx(Arc::new(NoCustomFields));
    let out = ctx.process(doc("http://fail.example/"));
    assert!(matches!(out, Outcome::Error(ref m) if m.contains("connection refused")));
    assert_eq!(store.counts().unwrap().submission_errors, 1);
    assert_eq!(ctx.failed(), 1);
}

#[test]
fn test_hook_panic_becomes_record_error() {
    let (ctx, store) = ctx(Arc::new(PanickyFields));
    let out = ctx.process(doc("http://ok.example/"));
    assert!(matches!(out, Outcome::Error(ref m) if m.contains("hook exploded")));
    assert_eq!(store.counts().unwrap().submission_errors, 1);
}

#[test]
fn test_walk_yields_files_in_name_order() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("b")).unwrap();
    fs::write(dir.path().join("b").join("2.arc"), b"").unwrap();
    fs::write(dir.path().join("a.arc"), b"").unwrap();
    fs::write(dir.path().join("c.arc"), b"").unwrap();
    let names: Vec<String> = walkdir_iter(dir.path(), false)
        .filter_map(|o| match o {
            WalkOutcome::Ok(p) => Some(
                p.strip_prefix(dir.path())
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/"),
            ),
            WalkOutcome::Err { .. } => None,
        })
        .collect();
    assert_eq!(names, vec!["a.arc", "b/2.arc", "c.arc"]);
}

#[test]
fn test_missing_root_is_reported_as_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope");
    let outcomes: Vec<WalkOutcome> = walkdir_iter(&missing, false).collect();
    assert_eq!(outcomes.len(), 1);
    assert!(matches!(outcomes[0], WalkOutcome::Err { .. }));
}
