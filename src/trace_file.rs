//! Tracing wrappers for the three file-handle variants
//!
//! Each wrapper owns its delegate handle and forwards every call to it,
//! then emits a trace record when the matching policy category is on. The
//! delegate's outcome is returned untouched either way; a traced failure is
//! still the caller's failure. Dropping a wrapper drops the delegate with
//! it and emits nothing.

use std::sync::Arc;

use crate::env::{RandomAccessFile, SequentialFile, WritableFile};
use crate::error::Result;
use crate::trace_env::{TraceOp, TraceShared, FILE_OP_SKIP};

/// Sequential-read wrapper; traces reads and skips under `trace_reads`.
pub struct TracingSequentialFile {
    filename: String,
    target: Box<dyn SequentialFile>,
    shared: Arc<TraceShared>,
}

impl TracingSequentialFile {
    pub(crate) fn new(
        filename: String,
        target: Box<dyn SequentialFile>,
        shared: Arc<TraceShared>,
    ) -> Self {
        Self {
            filename,
            target,
            shared,
        }
    }
}

impl SequentialFile for TracingSequentialFile {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let outcome = self.target.read(buf);
        if self.shared.policy.trace_reads {
            self.shared.trace(
                TraceOp::Tag("seq_read"),
                &self.filename,
                buf.len() as u64,
                outcome.as_ref().err(),
                FILE_OP_SKIP,
            );
        }
        outcome
    }

    fn skip(&mut self, n: u64) -> Result<()> {
        let outcome = self.target.skip(n);
        if self.shared.policy.trace_reads {
            self.shared.trace(
                TraceOp::Tag("seq_skip"),
                &self.filename,
                n,
                outcome.as_ref().err(),
                FILE_OP_SKIP,
            );
        }
        outcome
    }
}

/// Random-access wrapper. `read_at` stays `&self`: the delegate capability
/// is offset-based and stateless, and the trace path touches only atomic
/// or lock-guarded state, so concurrent readers remain safe.
pub struct TracingRandomAccessFile {
    filename: String,
    target: Box<dyn RandomAccessFile>,
    shared: Arc<TraceShared>,
}

impl TracingRandomAccessFile {
    pub(crate) fn new(
        filename: String,
        target: Box<dyn RandomAccessFile>,
        shared: Arc<TraceShared>,
    ) -> Self {
        Self {
            filename,
            target,
            shared,
        }
    }
}

impl RandomAccessFile for TracingRandomAccessFile {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        let outcome = self.target.read_at(offset, buf);
        if self.shared.policy.trace_reads {
            self.shared.trace(
                TraceOp::RandRead { offset },
                &self.filename,
                buf.len() as u64,
                outcome.as_ref().err(),
                FILE_OP_SKIP,
            );
        }
        outcome
    }
}

/// Writable wrapper. `append` gates on `trace_writes`, `flush`/`sync` on
/// `trace_sync`, and `close` on `trace_open`, pairing it with the open
/// record it balances.
pub struct TracingWritableFile {
    filename: String,
    target: Box<dyn WritableFile>,
    shared: Arc<TraceShared>,
}

impl TracingWritableFile {
    pub(crate) fn new(
        filename: String,
        target: Box<dyn WritableFile>,
        shared: Arc<TraceShared>,
    ) -> Self {
        Self {
            filename,
            target,
            shared,
        }
    }
}

impl WritableFile for TracingWritableFile {
    fn append(&mut self, data: &[u8]) -> Result<()> {
        let outcome = self.target.append(data);
        if self.shared.policy.trace_writes {
            self.shared.trace(
                TraceOp::Tag("append"),
                &self.filename,
                data.len() as u64,
                outcome.as_ref().err(),
                FILE_OP_SKIP,
            );
        }
        outcome
    }

    fn close(&mut self) -> Result<()> {
        let outcome = self.target.close();
        if self.shared.policy.trace_open {
            self.shared.trace(
                TraceOp::Tag("close"),
                &self.filename,
                0,
                outcome.as_ref().err(),
                FILE_OP_SKIP,
            );
        }
        outcome
    }

    fn flush(&mut self) -> Result<()> {
        let outcome = self.target.flush();
        if self.shared.policy.trace_sync {
            self.shared.trace(
                TraceOp::Tag("flush"),
                &self.filename,
                0,
                outcome.as_ref().err(),
                FILE_OP_SKIP,
            );
        }
        outcome
    }

    fn sync(&mut self) -> Result<()> {
        let outcome = self.target.sync();
        if self.shared.policy.trace_sync {
            self.shared.trace(
                TraceOp::Tag("sync"),
                &self.filename,
                0,
                outcome.as_ref().err(),
                FILE_OP_SKIP,
            );
        }
        outcome
    }
}
