//! Stack trace capture for armed trace points
//!
//! Traces are captured with `std::backtrace::Backtrace::force_capture`, so
//! they do not depend on `RUST_BACKTRACE`. The rendered form is:
//!
//! ```text
//! thread 'main' [running]:
//! my_app::handlers::serve
//! 	at ./src/handlers.rs:88:9
//! my_app::main
//! 	at ./src/main.rs:12:5
//! ```
//!
//! Frames are located by symbol name rather than by a raw frame count, so
//! the capture machinery itself never leaks into the output even when the
//! standard library's own frame layout changes.

use std::backtrace::{Backtrace, BacktraceStatus};
use std::fmt::Write as _;

/// One resolved stack frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Frame {
    pub symbol: String,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub column: Option<u32>,
}

impl Frame {
    fn new(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            file: None,
            line: None,
            column: None,
        }
    }

    fn is(&self, path_suffix: &str) -> bool {
        self.symbol == path_suffix
            || self
                .symbol
                .strip_suffix(path_suffix)
                .is_some_and(|head| head.ends_with("::"))
    }

    fn is_capture_machinery(&self) -> bool {
        self.symbol.starts_with("std::backtrace")
            || self.symbol.starts_with("backtrace::")
            || self.is("stack_trace::frames_above")
    }
}

/// Capture the current thread's stack as text.
///
/// `capture` never lists itself. With `skip == 0` the listing starts at the
/// function that called `capture`; each unit of `skip` drops one more frame
/// of plumbing between it and user code.
#[inline(never)]
pub fn capture(skip: usize) -> String {
    let thread = std::thread::current();
    let mut out = format!(
        "thread '{}' [running]:\n",
        thread.name().unwrap_or("<unnamed>")
    );

    match frames_above("stack_trace::capture", skip) {
        Some(frames) if !frames.is_empty() => {
            for frame in &frames {
                render_frame(&mut out, frame);
            }
        }
        _ => out.push_str("\t<stack unavailable>\n"),
    }
    out
}

fn render_frame(out: &mut String, frame: &Frame) {
    out.push_str(&frame.symbol);
    out.push('\n');
    if let Some(ref file) = frame.file {
        let _ = match (frame.line, frame.column) {
            (Some(line), Some(column)) => writeln!(out, "\tat {}:{}:{}", file, line, column),
            (Some(line), None) => writeln!(out, "\tat {}:{}", file, line),
            _ => writeln!(out, "\tat {}", file),
        };
    }
}

/// Frames strictly above the first frame named `anchor`, minus `skip` more.
///
/// Returns `None` when the platform cannot capture a backtrace.
#[inline(never)]
pub(crate) fn frames_above(anchor: &str, skip: usize) -> Option<Vec<Frame>> {
    let backtrace = Backtrace::force_capture();
    if backtrace.status() != BacktraceStatus::Captured {
        return None;
    }

    let frames = parse_frames(&backtrace.to_string());
    let start = match frames.iter().position(|f| f.is(anchor)) {
        Some(index) => index + 1,
        // Symbols unavailable: assume the anchor is the first frame past
        // the capture machinery.
        None => frames
            .iter()
            .position(|f| !f.is_capture_machinery())
            .map_or(frames.len(), |index| index + 1),
    };

    Some(frames.into_iter().skip(start.saturating_add(skip)).collect())
}

/// Parse the `Display` form of a `Backtrace`:
///
/// ```text
///    4: my_app::main
///              at ./src/main.rs:12:5
/// ```
pub(crate) fn parse_frames(rendered: &str) -> Vec<Frame> {
    let mut frames: Vec<Frame> = Vec::new();

    for raw in rendered.lines() {
        let line = raw.trim();
        if let Some(location) = line.strip_prefix("at ") {
            if let Some(frame) = frames.last_mut() {
                if frame.file.is_none() {
                    let (file, line, column) = parse_location(location);
                    frame.file = Some(file.to_string());
                    frame.line = line;
                    frame.column = column;
                }
            }
            continue;
        }

        if let Some((index, symbol)) = line.split_once(": ") {
            if !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()) {
                frames.push(Frame::new(symbol.trim()));
            }
        }
    }

    frames
}

fn parse_location(location: &str) -> (&str, Option<u32>, Option<u32>) {
    fn split_number(s: &str) -> Option<(&str, u32)> {
        let (head, tail) = s.rsplit_once(':')?;
        Some((head, tail.parse().ok()?))
    }

    match split_number(location) {
        Some((head, last)) => match split_number(head) {
            Some((file, line)) => (file, Some(line), Some(last)),
            None => (head, Some(last), None),
        },
        None => (location, None, None),
    }
}
