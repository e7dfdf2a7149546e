// Shared helpers for integration tests: an in-memory record sink and
// policy builders.
#![allow(dead_code)]

use std::io::Write;
use std::sync::{Arc, Mutex};

use huella::policy::CapturePolicy;
use huella::sink::TraceSink;

/// Cloneable writer capturing everything emitted through a `TraceSink`.
#[derive(Clone, Default)]
pub struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).expect("trace output is UTF-8")
    }

    pub fn sink(&self) -> TraceSink {
        TraceSink::with_writer(Box::new(self.clone()))
    }

    /// Lines that start a trace record (tag lines), excluding stack lines.
    pub fn record_tags(&self) -> Vec<String> {
        self.contents()
            .lines()
            .filter(|l| l.starts_with("[huella] "))
            .map(|l| l.to_string())
            .collect()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Policy with every category on and stack capture off, for tests that
/// only care about which records appear.
pub fn flat_policy() -> CapturePolicy {
    CapturePolicy {
        trace_open: true,
        trace_reads: true,
        trace_writes: true,
        trace_sync: true,
        symbolize: false,
        max_traces: i64::MAX,
        stack_depth: 0,
    }
}
