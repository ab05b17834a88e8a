//! Agent responder adapters.

mod placeholder;

pub use placeholder::PlaceholderResponder;
