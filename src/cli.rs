//! CLI argument parsing for the huella workload driver

use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::policy::CapturePolicy;

#[derive(Parser, Debug)]
#[command(name = "huella")]
#[command(version)]
#[command(
    about = "Call-site stack tracing for storage environment I/O",
    long_about = "Runs a fixed write/read workload through a traced filesystem \
                  environment and prints a stack trace record for every \
                  intercepted open, read, write, and sync.\n\n\
                  Build with debug symbols to see function names and file:line \
                  in the stacks. If output is too noisy, lower --max-traces or \
                  turn off trace categories."
)]
pub struct Cli {
    /// Directory the workload writes into
    #[arg(long = "db", value_name = "PATH", default_value = "huella_db")]
    pub db: PathBuf,

    /// Number of records to append
    #[arg(long = "num-writes", value_name = "N", default_value_t = 10)]
    pub num_writes: u32,

    /// Number of sequential + random reads to perform
    #[arg(long = "num-reads", value_name = "N", default_value_t = 10)]
    pub num_reads: u32,

    /// Size of each random value in bytes
    #[arg(long = "value-size", value_name = "BYTES", default_value_t = 100)]
    pub value_size: usize,

    /// Sync the log file after every append
    #[arg(long = "sync-writes", value_name = "BOOL", default_value_t = false, action = ArgAction::Set)]
    pub sync_writes: bool,

    /// Trace file opens and closes
    #[arg(long = "trace-open", value_name = "BOOL", default_value_t = true, action = ArgAction::Set)]
    pub trace_open: bool,

    /// Trace sequential and random-access reads
    #[arg(long = "trace-reads", value_name = "BOOL", default_value_t = true, action = ArgAction::Set)]
    pub trace_reads: bool,

    /// Trace appends
    #[arg(long = "trace-writes", value_name = "BOOL", default_value_t = true, action = ArgAction::Set)]
    pub trace_writes: bool,

    /// Trace flush and sync calls (noisy)
    #[arg(long = "trace-sync", value_name = "BOOL", default_value_t = false, action = ArgAction::Set)]
    pub trace_sync: bool,

    /// Resolve stack frames to symbol names and file:line
    #[arg(long = "symbolize", value_name = "BOOL", default_value_t = true, action = ArgAction::Set)]
    pub symbolize: bool,

    /// Total trace records to emit before going silent
    #[arg(long = "max-traces", value_name = "N", default_value_t = 200)]
    pub max_traces: i64,

    /// Stack frames to capture per record; 0 disables capture
    #[arg(long = "stack-depth", value_name = "N", default_value_t = 64)]
    pub stack_depth: i32,

    /// Enable internal debug logging to stderr
    #[arg(long = "debug")]
    pub debug: bool,
}

impl Cli {
    /// Freeze the trace-related flags into an immutable capture policy.
    pub fn policy(&self) -> CapturePolicy {
        CapturePolicy {
            trace_open: self.trace_open,
            trace_reads: self.trace_reads,
            trace_writes: self.trace_writes,
            trace_sync: self.trace_sync,
            symbolize: self.symbolize,
            max_traces: self.max_traces,
            stack_depth: self.stack_depth,
        }
    }
}
