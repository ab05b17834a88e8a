//! Application-level configuration.
//!
//! - [`StoreSettings`]: session TTL, sweep cadence and history limits used by
//!   the stores and the message handler

pub mod store_settings;

pub use store_settings::StoreSettings;
