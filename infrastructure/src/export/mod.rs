//! Export output. Writes rendered export lines to a file or stdout.

mod writer;

pub use writer::{ExportTarget, ExportWriteError, ExportWriter};
