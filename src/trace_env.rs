//! Tracing environment decorator
//!
//! `TracingEnv` wraps a delegate `Env` and intercepts every file the engine
//! opens through it. The policy, the remaining-trace budget, and the output
//! sink live in one `Arc`-shared block so file wrappers on any thread reach
//! the same state without extending the environment's public surface.

use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use crate::capture;
use crate::env::{Env, RandomAccessFile, SequentialFile, WritableFile};
use crate::error::{EnvError, Result};
use crate::policy::CapturePolicy;
use crate::sink::TraceSink;
use crate::trace_file::{TracingRandomAccessFile, TracingSequentialFile, TracingWritableFile};

/// Frames to drop when an open operation captures its stack, so the first
/// printed frame is the caller that requested the open. The bulk branch's
/// frame list already starts at `capture_impl` (the backtrace crate strips
/// everything below its own capture call), leaving four instrumentation
/// frames between there and the call site: `capture_impl`, `capture`,
/// `trace`, and the open method itself. Those three inner functions carry
/// `#[inline(never)]` so this count survives optimized builds. Validated
/// by `tests/call_site_tests.rs`; not portable across refactors.
#[cfg(not(windows))]
pub(crate) const OPEN_SKIP: usize = 4;

/// The raw-walk branch delivers the walker's own two frames before
/// `capture_impl`, so the debug-help platforms skip two more.
#[cfg(windows)]
pub(crate) const OPEN_SKIP: usize = 6;

/// Frames to drop for read/write/sync call sites. The wrapper methods sit
/// at the same depth as the env open methods, so the count matches
/// `OPEN_SKIP` on each platform.
#[cfg(not(windows))]
pub(crate) const FILE_OP_SKIP: usize = 4;

/// See `OPEN_SKIP` for the extra walker frames on this branch.
#[cfg(windows)]
pub(crate) const FILE_OP_SKIP: usize = 6;

/// Operation tag for a trace record. Variants that carry data format
/// lazily, after the budget gate has decided the record will be emitted.
pub(crate) enum TraceOp {
    /// Fixed operation name
    Tag(&'static str),
    /// Random-access read; the offset rides inside the tag
    RandRead {
        /// Byte offset of the read
        offset: u64,
    },
}

impl fmt::Display for TraceOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceOp::Tag(tag) => f.write_str(tag),
            TraceOp::RandRead { offset } => write!(f, "rand_read(offset={offset})"),
        }
    }
}

/// Policy, budget, and sink shared by the environment and every file
/// wrapper it hands out.
pub(crate) struct TraceShared {
    pub(crate) policy: CapturePolicy,
    remaining: AtomicI64,
    sink: TraceSink,
}

impl TraceShared {
    fn new(policy: CapturePolicy, sink: TraceSink) -> Self {
        let remaining = AtomicI64::new(policy.max_traces);
        Self {
            policy,
            remaining,
            sink,
        }
    }

    /// Claim one unit of trace budget. Lock-free: a single fetch-sub on the
    /// shared counter. The counter keeps falling below zero under contention;
    /// only a strictly positive pre-decrement value grants emission, so once
    /// exhausted it stays exhausted.
    pub(crate) fn should_trace(&self) -> bool {
        self.remaining.fetch_sub(1, Ordering::Relaxed) > 0
    }

    /// Emit one trace record for a forwarded call. Callers gate on their
    /// category flag before calling; this gates on the budget and returns
    /// before any formatting or capture work when it is spent.
    ///
    /// Never inlined: the skip-frame constants count this frame.
    #[inline(never)]
    pub(crate) fn trace(
        &self,
        op: TraceOp,
        filename: &str,
        n: u64,
        err: Option<&EnvError>,
        skip_frames: usize,
    ) {
        if !self.should_trace() {
            return;
        }

        use std::fmt::Write;
        let mut record = format!("[huella] {op} file={filename}");
        if n != 0 {
            let _ = write!(record, " n={n}");
        }
        match err {
            None => record.push_str(" status=OK"),
            Some(e) => {
                let _ = write!(record, " status={e}");
            }
        }
        record.push('\n');
        if self.policy.stack_depth > 0 {
            record.push_str(&capture::capture(&self.policy, skip_frames));
        }

        self.sink.emit(&record);
    }
}

/// `Env` decorator that traces opens and wraps every handle it returns.
///
/// The delegate is borrowed, not owned: the real environment outlives the
/// tracing layer, exactly as it outlives the engine using it.
pub struct TracingEnv<'e> {
    target: &'e dyn Env,
    shared: Arc<TraceShared>,
}

impl<'e> TracingEnv<'e> {
    /// Wrap `target`, emitting trace records to stderr.
    pub fn new(target: &'e dyn Env, policy: CapturePolicy) -> Self {
        Self::with_sink(target, policy, TraceSink::stderr())
    }

    /// Wrap `target` with an explicit record sink.
    pub fn with_sink(target: &'e dyn Env, policy: CapturePolicy, sink: TraceSink) -> Self {
        tracing::debug!(
            max_traces = policy.max_traces,
            stack_depth = policy.stack_depth,
            "wrapping environment for call-site tracing"
        );
        Self {
            target,
            shared: Arc::new(TraceShared::new(policy, sink)),
        }
    }

    /// The policy this environment was built with.
    pub fn policy(&self) -> &CapturePolicy {
        &self.shared.policy
    }
}

impl Env for TracingEnv<'_> {
    fn new_sequential_file(&self, path: &Path) -> Result<Box<dyn SequentialFile>> {
        let base = self.target.new_sequential_file(path)?;
        let filename = path.display().to_string();
        if self.shared.policy.trace_open {
            self.shared
                .trace(TraceOp::Tag("open_seq"), &filename, 0, None, OPEN_SKIP);
        }
        Ok(Box::new(TracingSequentialFile::new(
            filename,
            base,
            Arc::clone(&self.shared),
        )))
    }

    fn new_random_access_file(&self, path: &Path) -> Result<Box<dyn RandomAccessFile>> {
        let base = self.target.new_random_access_file(path)?;
        let filename = path.display().to_string();
        if self.shared.policy.trace_open {
            self.shared
                .trace(TraceOp::Tag("open_rand"), &filename, 0, None, OPEN_SKIP);
        }
        Ok(Box::new(TracingRandomAccessFile::new(
            filename,
            base,
            Arc::clone(&self.shared),
        )))
    }

    fn new_writable_file(&self, path: &Path) -> Result<Box<dyn WritableFile>> {
        let base = self.target.new_writable_file(path)?;
        let filename = path.display().to_string();
        if self.shared.policy.trace_open {
            self.shared
                .trace(TraceOp::Tag("open_w"), &filename, 0, None, OPEN_SKIP);
        }
        Ok(Box::new(TracingWritableFile::new(
            filename,
            base,
            Arc::clone(&self.shared),
        )))
    }

    fn new_appendable_file(&self, path: &Path) -> Result<Box<dyn WritableFile>> {
        let base = self.target.new_appendable_file(path)?;
        let filename = path.display().to_string();
        if self.shared.policy.trace_open {
            self.shared
                .trace(TraceOp::Tag("open_a"), &filename, 0, None, OPEN_SKIP);
        }
        Ok(Box::new(TracingWritableFile::new(
            filename,
            base,
            Arc::clone(&self.shared),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl SharedBuf {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl std::io::Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().write_all(buf)?;
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn shared_with(policy: CapturePolicy) -> (TraceShared, SharedBuf) {
        let buf = SharedBuf::default();
        let sink = TraceSink::with_writer(Box::new(buf.clone()));
        (TraceShared::new(policy, sink), buf)
    }

    #[test]
    fn test_should_trace_counts_down_to_exhaustion() {
        let (shared, _buf) = shared_with(CapturePolicy {
            max_traces: 3,
            ..CapturePolicy::default()
        });
        assert!(shared.should_trace());
        assert!(shared.should_trace());
        assert!(shared.should_trace());
        assert!(!shared.should_trace());
        assert!(!shared.should_trace());
    }

    #[test]
    fn test_exhausted_budget_stays_exhausted_across_threads() {
        let (shared, _buf) = shared_with(CapturePolicy {
            max_traces: 10,
            ..CapturePolicy::default()
        });
        let shared = Arc::new(shared);

        let mut grants = 0usize;
        std::thread::scope(|scope| {
            let mut handles = Vec::new();
            for _ in 0..8 {
                let shared = Arc::clone(&shared);
                handles.push(scope.spawn(move || {
                    let mut local = 0usize;
                    for _ in 0..100 {
                        if shared.should_trace() {
                            local += 1;
                        }
                    }
                    local
                }));
            }
            for h in handles {
                grants += h.join().unwrap();
            }
        });

        assert_eq!(grants, 10);
        assert!(!shared.should_trace());
    }

    #[test]
    fn test_trace_with_zero_budget_emits_nothing() {
        let (shared, buf) = shared_with(CapturePolicy {
            max_traces: 0,
            ..CapturePolicy::default()
        });
        shared.trace(TraceOp::Tag("append"), "a.log", 5, None, 0);
        assert_eq!(buf.contents(), "");
    }

    #[test]
    fn test_trace_record_shape() {
        let (shared, buf) = shared_with(CapturePolicy {
            stack_depth: 0,
            ..CapturePolicy::default()
        });
        shared.trace(TraceOp::Tag("append"), "db/000001.log", 42, None, 0);
        assert_eq!(
            buf.contents(),
            "[huella] append file=db/000001.log n=42 status=OK\n"
        );
    }

    #[test]
    fn test_trace_record_omits_zero_count() {
        let (shared, buf) = shared_with(CapturePolicy {
            stack_depth: 0,
            ..CapturePolicy::default()
        });
        shared.trace(TraceOp::Tag("open_w"), "db/000001.log", 0, None, 0);
        assert_eq!(buf.contents(), "[huella] open_w file=db/000001.log status=OK\n");
    }

    #[test]
    fn test_trace_record_reports_failure_status() {
        let (shared, buf) = shared_with(CapturePolicy {
            stack_depth: 0,
            ..CapturePolicy::default()
        });
        let err = EnvError::Closed {
            path: "a.log".to_string(),
        };
        shared.trace(TraceOp::Tag("append"), "a.log", 3, Some(&err), 0);
        let contents = buf.contents();
        assert!(contents.contains("status=invalid handle"), "{contents}");
    }

    #[test]
    fn test_rand_read_tag_embeds_offset() {
        let op = TraceOp::RandRead { offset: 4096 };
        assert_eq!(op.to_string(), "rand_read(offset=4096)");
    }

    #[test]
    fn test_open_failure_propagates_without_record() {
        let dir = tempfile::tempdir().unwrap();
        let base = crate::env::FsEnv;
        let buf = SharedBuf::default();
        let env = TracingEnv::with_sink(
            &base,
            CapturePolicy::default(),
            TraceSink::with_writer(Box::new(buf.clone())),
        );

        let missing = dir.path().join("missing.log");
        assert!(env.new_sequential_file(&missing).is_err());
        assert_eq!(buf.contents(), "");
    }

    #[test]
    fn test_handles_wrapped_even_when_open_tracing_off() {
        let dir = tempfile::tempdir().unwrap();
        let base = crate::env::FsEnv;
        let buf = SharedBuf::default();
        let policy = CapturePolicy {
            trace_open: false,
            trace_writes: true,
            stack_depth: 0,
            ..CapturePolicy::default()
        };
        let env = TracingEnv::with_sink(&base, policy, TraceSink::with_writer(Box::new(buf.clone())));

        let path = dir.path().join("wrapped.log");
        let mut w = env.new_writable_file(&path).unwrap();
        assert_eq!(buf.contents(), "", "open must not trace when disabled");

        w.append(b"abc").unwrap();
        assert!(
            buf.contents().contains("append"),
            "handle from a silent open must still trace later operations"
        );
    }
}
