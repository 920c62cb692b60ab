use std::backtrace::Backtrace;

/// Produces the call path of the current thread as human-readable frame
/// descriptors, innermost frame first.
pub trait FrameCapture: Send + Sync {
    /// `skip` frames above the recording call are left out.
    fn capture(&self, skip: usize) -> Vec<String>;
}

/// Symbol prefixes that belong to the runtime or the task scheduler rather
/// than the application.
const RUNTIME_PREFIXES: &[&str] = &[
    "std::",
    "core::",
    "alloc::",
    "tokio::",
    "__rust",
    "__libc",
    "<alloc::",
    "<core::",
    "<std::",
    "<tokio::",
];

/// Thread entry points, matched exactly.
const RUNTIME_SYMBOLS: &[&str] = &["<unknown>", "_start", "clone", "clone3", "start_thread"];

/// Frames belonging to the recording machinery itself.
const RECORDER_MARKERS: &[&str] = &["BacktraceCapture", "ErrorReporter::record_error"];

/// [`FrameCapture`] over `std::backtrace`. Frames are rendered as
/// `symbol (file:line)`, or just the symbol when no location is known.
#[derive(Debug, Default, Clone, Copy)]
pub struct BacktraceCapture;

impl FrameCapture for BacktraceCapture {
    fn capture(&self, skip: usize) -> Vec<String> {
        let rendered = Backtrace::force_capture().to_string();
        parse_backtrace(&rendered).into_iter().skip(skip).collect()
    }
}

/// Turns the textual form of a `Backtrace` into frame descriptors,
/// dropping runtime and recorder frames.
pub fn parse_backtrace(rendered: &str) -> Vec<String> {
    let mut frames: Vec<(String, Option<String>)> = Vec::new();

    for line in rendered.lines().map(str::trim) {
        if let Some(location) = line.strip_prefix("at ") {
            if let Some((_, slot)) = frames.last_mut() {
                if slot.is_none() {
                    *slot = Some(strip_column(location).to_owned());
                }
            }
        } else if let Some((index, symbol)) = line.split_once(": ") {
            if !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()) {
                frames.push((strip_hash(symbol).to_owned(), None));
            }
        }
    }

    frames
        .into_iter()
        .filter(|(symbol, _)| !is_internal(symbol))
        .map(|(symbol, location)| match location {
            Some(location) => format!("{symbol} ({location})"),
            None => symbol,
        })
        .collect()
}

fn is_internal(symbol: &str) -> bool {
    RUNTIME_SYMBOLS.contains(&symbol)
        || RUNTIME_PREFIXES.iter().any(|p| symbol.starts_with(p))
        || RECORDER_MARKERS.iter().any(|m| symbol.contains(m))
}

/// `src/lib.rs:10:5` -> `src/lib.rs:10`
fn strip_column(location: &str) -> &str {
    match location.rsplit_once(':') {
        Some((head, col)) if head.contains(':') && col.bytes().all(|b| b.is_ascii_digit()) => head,
        _ => location,
    }
}

/// `app::run::h0123456789abcdef` -> `app::run`
fn strip_hash(symbol: &str) -> &str {
    match symbol.rsplit_once("::h") {
        Some((head, hash)) if hash.len() == 16 && hash.bytes().all(|b| b.is_ascii_hexdigit()) => {
            head
        }
        _ => symbol,
    }
}
