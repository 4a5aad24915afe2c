//! Proptest strategies for scheduler inputs.

use std::time::Duration;

use courier_core::Destination;
use courier_delivery::SchedulerConfig;
use proptest::prelude::*;

/// One of `hosts` destinations on `example.com` subdomains.
pub fn destination(hosts: usize) -> impl Strategy<Value = Destination> {
    (0..hosts.max(1)).prop_map(|host| {
        Destination::parse(&format!("https://host{host}.example.com/hook"))
            .unwrap_or_else(|_| unreachable!("generated destinations are valid"))
    })
}

/// Valid scheduler configuration with short delays.
pub fn scheduler_config() -> impl Strategy<Value = SchedulerConfig> {
    (1u64..100, 0u64..2_000, 1.1f64..4.0, 0u32..4).prop_map(
        |(initial_ms, max_ms, factor, max_url_failure)| SchedulerConfig {
            initial_delay_time: Duration::from_millis(initial_ms),
            max_delay_time: Duration::from_millis(max_ms),
            exponential_backoff_factor: factor,
            max_url_failure,
            response_timeout: Duration::from_secs(2),
        },
    )
}
