//! HTTP health endpoint (warp).

mod server;

pub use server::{HealthServer, health_routes};
