//! Console rendering of store results

pub mod console;
