//! Capture policy: which operations are traced and how deep stacks go
//!
//! The policy is built once from the CLI (or by hand in tests) and is never
//! mutated afterwards. Every component reads the same shared instance through
//! the tracing environment.

/// Immutable trace capture configuration.
///
/// Category toggles select which I/O operations emit trace records:
/// - `trace_open` covers the four open variants and explicit `close`
/// - `trace_reads` covers sequential reads, skips, and random-access reads
/// - `trace_writes` covers appends
/// - `trace_sync` covers `flush` and `sync`, which are split out because they
///   fire far more often than opens and drown the output when left on
#[derive(Debug, Clone)]
pub struct CapturePolicy {
    /// Trace file opens and closes
    pub trace_open: bool,
    /// Trace sequential and random-access reads
    pub trace_reads: bool,
    /// Trace appends to writable files
    pub trace_writes: bool,
    /// Trace flush and sync calls
    pub trace_sync: bool,
    /// Resolve frame addresses to symbol names and file:line where possible
    pub symbolize: bool,
    /// Total number of trace records permitted for the process lifetime
    pub max_traces: i64,
    /// Frames captured per record; `<= 0` disables stack capture entirely
    pub stack_depth: i32,
}

impl Default for CapturePolicy {
    fn default() -> Self {
        Self {
            trace_open: true,
            trace_reads: true,
            trace_writes: true,
            trace_sync: false,
            symbolize: true,
            max_traces: 200,
            stack_depth: 64,
        }
    }
}
