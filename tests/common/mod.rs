//! Shared helpers for integration tests

#![allow(dead_code)]

use reqsweep::{DispatchConfig, RateLimit};
use wiremock::MockServer;

/// Dispatch configuration with millisecond pacing
pub fn fast_config(network_limit: usize) -> DispatchConfig {
    DispatchConfig {
        network: RateLimit::new(0.001, network_limit).unwrap(),
        storage: RateLimit::new(0.001, 2).unwrap(),
        collect: true,
        ..Default::default()
    }
}

/// Absolute URL on the mock server
pub fn url(server: &MockServer, path: &str) -> String {
    format!("{}{}", server.uri(), path)
}
