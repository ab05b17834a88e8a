//! Chat session domain.
//!
//! - [`entities::Session`]: keyed session state with a time-to-live
//! - [`entities::SessionKey`]: opaque session identifier

pub mod entities;
