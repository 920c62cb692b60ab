pub mod error_reporter;
pub mod frames;

pub use error_reporter::{ErrorReporter, OTHER_BUCKET, UNDEFINED_MESSAGE};
pub use frames::{BacktraceCapture, FrameCapture};
