//! In-process stack capture behind one cross-platform contract
//!
//! `capture()` walks the calling thread's stack at an intercepted I/O call
//! site and formats it as numbered lines. Two native mechanisms sit behind
//! the same signature:
//!
//! - Windows (dbghelp style): a raw frame walk first, then a per-address
//!   symbol resolution pass. The symbol subsystem needs one process-wide
//!   initialization before the first lookup, guarded by `std::sync::Once`.
//! - Unix (bulk style): one `backtrace::Backtrace` call captures and, when
//!   symbolization is on, resolves every frame in the same pass.
//!
//! Capture never fails loudly: an unresolvable frame degrades to its raw
//! address, and a walk that produces no frames yields an empty string.

use crate::policy::CapturePolicy;

/// Capture the current thread's stack as formatted trace lines.
///
/// Returns an empty string immediately when `policy.stack_depth <= 0`.
/// At most `stack_depth` frames are walked; the first `skip_frames` of
/// those are dropped so the first printed line is the I/O call site rather
/// than this crate's own machinery. Printed indices restart at `#00` after
/// the skip.
///
/// Never inlined: callers' skip-frame counts include this frame.
#[inline(never)]
pub fn capture(policy: &CapturePolicy, skip_frames: usize) -> String {
    if policy.stack_depth <= 0 {
        return String::new();
    }
    capture_impl(policy, skip_frames)
}

/// Append one formatted frame line: zero-padded index, then either the
/// resolved symbol (with `file:line` when known) or the raw address.
fn push_frame_line(
    out: &mut String,
    index: usize,
    addr: usize,
    name: Option<&str>,
    location: Option<(&std::path::Path, u32)>,
) {
    use std::fmt::Write;

    let _ = write!(out, "  #{index:02} ");
    match name {
        Some(name) => {
            let _ = write!(out, "{name}");
            if let Some((file, line)) = location {
                let _ = write!(out, " ({}:{line})", file.display());
            }
        }
        None => {
            let _ = write!(out, "{addr:#x}");
        }
    }
    out.push('\n');
}

#[cfg(not(windows))]
#[inline(never)]
fn capture_impl(policy: &CapturePolicy, skip_frames: usize) -> String {
    use backtrace::Backtrace;

    // One call does both the walk and (when requested) symbolization.
    // `Backtrace` drops everything below its own capture call, so the
    // frame list starts right here at `capture_impl`.
    let bt = if policy.symbolize {
        Backtrace::new()
    } else {
        Backtrace::new_unresolved()
    };

    let depth = policy.stack_depth as usize;
    let frames = bt.frames();
    let walked = &frames[..frames.len().min(depth)];

    let mut out = String::new();
    for (printed, frame) in walked.iter().skip(skip_frames).enumerate() {
        let addr = frame.ip() as usize;
        let symbol = frame.symbols().first();
        let name = symbol.and_then(|s| s.name()).map(|n| n.to_string());
        let location = symbol.and_then(|s| s.filename().zip(s.lineno()));
        push_frame_line(&mut out, printed, addr, name.as_deref(), location);
    }
    out
}

#[cfg(windows)]
#[inline(never)]
fn capture_impl(policy: &CapturePolicy, skip_frames: usize) -> String {
    use std::ffi::c_void;
    use std::sync::Once;

    static SYM_INIT: Once = Once::new();

    let depth = policy.stack_depth as usize;

    // Raw walk first; resolution is a separate pass below.
    let mut addrs: Vec<*mut c_void> = Vec::with_capacity(depth);
    backtrace::trace(|frame| {
        addrs.push(frame.ip());
        addrs.len() < depth
    });

    if policy.symbolize && !addrs.is_empty() {
        // dbghelp wants its symbol handler initialized exactly once per
        // process before any lookup, no matter how many threads race here.
        SYM_INIT.call_once(|| {
            tracing::debug!("initializing dbghelp symbol subsystem");
            backtrace::resolve(addrs[0], |_| {});
        });
    }

    let mut out = String::new();
    for (printed, addr) in addrs.iter().skip(skip_frames).enumerate() {
        let mut name: Option<String> = None;
        let mut location: Option<(std::path::PathBuf, u32)> = None;
        if policy.symbolize {
            backtrace::resolve(*addr, |symbol| {
                if name.is_none() {
                    name = symbol.name().map(|n| n.to_string());
                    location = symbol
                        .filename()
                        .zip(symbol.lineno())
                        .map(|(f, l)| (f.to_path_buf(), l));
                }
            });
        }
        push_frame_line(
            &mut out,
            printed,
            *addr as usize,
            name.as_deref(),
            location.as_ref().map(|(f, l)| (f.as_path(), *l)),
        );
    }
    out
}
