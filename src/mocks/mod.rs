pub mod adapter_mock;
pub mod rpc_mock;
pub mod submitter_mock;
#[cfg(test)]
pub mod upstream_mock;

pub use adapter_mock::{MockAdapter, MockBehavior};
pub use rpc_mock::{MockAllowanceReader, MockGasSimulator};
pub use submitter_mock::MockSubmitter;

use std::env;
use std::sync::Arc;
use std::time::Duration;

use crate::adapters::factory::AdapterRegistry;

/// Check if mock mode is enabled
pub fn is_mock_mode() -> bool {
    env::var("API_MODE").unwrap_or_default() == "mock"
}

/// Get mock configuration values
pub fn get_mock_config() -> MockConfig {
    MockConfig {
        network_latency_ms: env::var("MOCK_NETWORK_LATENCY")
            .unwrap_or_else(|_| "50".to_string())
            .parse()
            .unwrap_or(50),
        simulated_gas: env::var("MOCK_SIMULATED_GAS")
            .unwrap_or_else(|_| "180000".to_string())
            .parse()
            .unwrap_or(180_000),
    }
}

#[derive(Debug, Clone)]
pub struct MockConfig {
    pub network_latency_ms: u64,
    pub simulated_gas: u64,
}

/// CLI mock 모드용 레지스트리 (실제 어댑터와 같은 이름/순서)
pub fn mock_registry(config: &MockConfig) -> AdapterRegistry {
    let latency = Duration::from_millis(config.network_latency_ms);
    AdapterRegistry::from_adapters(vec![
        Arc::new(MockAdapter::quoting("alpha_router", 2_500_000_000, 150_000).with_delay(latency)),
        Arc::new(MockAdapter::quoting("zeroex", 2_490_000_000, 180_000).with_delay(latency)),
        Arc::new(MockAdapter::failing("oneinch", Some(503), "service unavailable").with_delay(latency)),
    ])
}
