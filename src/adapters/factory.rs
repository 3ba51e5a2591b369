use std::sync::Arc;

use tracing::{debug, info};

use super::traits::SwapAdapter;
use super::{AlphaRouterAdapter, OneInchAdapter, ZeroExAdapter};
use crate::config::AdaptersConfig;

/// 정적 어댑터 레지스트리
///
/// 등록 순서가 곧 동률 시 우선순위와 비교표 순서입니다.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: Vec<Arc<dyn SwapAdapter>>,
}

impl AdapterRegistry {
    /// alpha_router, zeroex, oneinch 순으로 활성화된 어댑터만 등록
    pub fn from_config(config: &AdaptersConfig) -> Self {
        let mut registry = Self::default();

        if config.alpha_router.enabled {
            registry.register(Arc::new(AlphaRouterAdapter::new(config.alpha_router.clone())));
        }
        if config.zeroex.enabled {
            registry.register(Arc::new(ZeroExAdapter::new(config.zeroex.clone())));
        }
        if config.oneinch.enabled {
            registry.register(Arc::new(OneInchAdapter::new(config.oneinch.clone())));
        }

        info!("Initialized {} swap adapters: {:?}", registry.len(), registry.names());
        registry
    }

    pub fn from_adapters(adapters: Vec<Arc<dyn SwapAdapter>>) -> Self {
        Self { adapters }
    }

    pub fn register(&mut self, adapter: Arc<dyn SwapAdapter>) {
        debug!("Added adapter: {}", adapter.name());
        self.adapters.push(adapter);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn SwapAdapter>> {
        self.adapters.iter().find(|a| a.name() == name).cloned()
    }

    pub fn adapters(&self) -> &[Arc<dyn SwapAdapter>] {
        &self.adapters
    }

    pub fn names(&self) -> Vec<&str> {
        self.adapters.iter().map(|a| a.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_order() {
        let registry = AdapterRegistry::from_config(&AdaptersConfig::default());
        assert_eq!(registry.names(), vec!["alpha_router", "zeroex", "oneinch"]);
        assert_eq!(registry.get("zeroex").unwrap().token(), "ZRX");
        assert!(registry.get("uniswap").is_none());
    }

    #[test]
    fn test_disabled_adapter_is_skipped() {
        let mut config = AdaptersConfig::default();
        config.zeroex.enabled = false;
        let registry = AdapterRegistry::from_config(&config);
        assert_eq!(registry.names(), vec!["alpha_router", "oneinch"]);
    }
}
