//! Serialized output sink for trace records
//!
//! Many I/O threads emit records concurrently; the sink's only job is to
//! make each record land in the output stream as one contiguous unit.
//! Output is best-effort diagnostics: write failures are swallowed.

use std::io::Write;
use std::sync::Mutex;

/// Shared, lock-serialized destination for formatted trace records.
pub struct TraceSink {
    out: Mutex<Box<dyn Write + Send>>,
}

impl TraceSink {
    /// Sink writing to the process's standard error stream.
    pub fn stderr() -> Self {
        Self::with_writer(Box::new(std::io::stderr()))
    }

    /// Sink writing to an arbitrary writer. Tests use this to capture
    /// records into a shared buffer.
    pub fn with_writer(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    /// Write one complete record. The lock spans the whole write so records
    /// from different threads never interleave mid-record. A failed or
    /// partial write is not an error at this layer.
    pub fn emit(&self, record: &str) {
        let mut out = match self.out.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let _ = out.write_all(record.as_bytes());
        let _ = out.flush();
    }
}

impl Default for TraceSink {
    fn default() -> Self {
        Self::stderr()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_emit_writes_record_verbatim() {
        let buf = SharedBuf::default();
        let sink = TraceSink::with_writer(Box::new(buf.clone()));
        sink.emit("[huella] append file=a.log n=7 status=OK\n");
        let contents = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        assert_eq!(contents, "[huella] append file=a.log n=7 status=OK\n");
    }

    #[test]
    fn test_concurrent_emits_do_not_interleave() {
        let buf = SharedBuf::default();
        let sink = Arc::new(TraceSink::with_writer(Box::new(buf.clone())));

        let mut handles = Vec::new();
        for i in 0..8 {
            let sink = Arc::clone(&sink);
            handles.push(std::thread::spawn(move || {
                for _ in 0..50 {
                    sink.emit(&format!("[huella] op{i} file=f status=OK\n  #00 frame{i}\n"));
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }

        let contents = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        let mut records = 0;
        let mut lines = contents.lines().peekable();
        while let Some(line) = lines.next() {
            assert!(line.starts_with("[huella] op"), "bad tag line: {line}");
            let tag = line.chars().nth(11).unwrap();
            let stack = lines.next().expect("stack line follows tag line");
            assert_eq!(stack, format!("  #00 frame{tag}"));
            records += 1;
        }
        assert_eq!(records, 8 * 50);
    }
}
