use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::adapters::traits::AdapterConfig;
use crate::common::validation::is_valid_slippage_bps;
use crate::constants::*;
use crate::execution::transaction_builder::GasPolicy;
use crate::types::Chain;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatorConfig {
    /// 어댑터별 견적 타임아웃 (ms)
    pub quote_timeout_ms: u64,
    pub default_slippage_bps: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GasConfig {
    pub multiplier_numerator: u64,
    pub multiplier_denominator: u64,
    pub buffer: u64,
    pub simulation_timeout_ms: u64,
    pub approval_gas_limit: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptersConfig {
    pub alpha_router: AdapterConfig,
    pub zeroex: AdapterConfig,
    pub oneinch: AdapterConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RpcConfig {
    /// chain name -> RPC URL
    #[serde(default)]
    pub urls: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub aggregator: AggregatorConfig,
    pub gas: GasConfig,
    pub adapters: AdaptersConfig,
    #[serde(default)]
    pub rpc: RpcConfig,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            quote_timeout_ms: DEFAULT_QUOTE_TIMEOUT_MS,
            default_slippage_bps: DEFAULT_SLIPPAGE_BPS,
        }
    }
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            multiplier_numerator: GAS_MULTIPLIER_NUMERATOR,
            multiplier_denominator: GAS_MULTIPLIER_DENOMINATOR,
            buffer: GAS_BUFFER,
            simulation_timeout_ms: DEFAULT_GAS_SIMULATION_TIMEOUT_MS,
            approval_gas_limit: DEFAULT_APPROVAL_GAS,
        }
    }
}

impl Default for AdaptersConfig {
    fn default() -> Self {
        Self {
            alpha_router: AdapterConfig::with_base_url(ALPHA_ROUTER_API_URL),
            zeroex: AdapterConfig::with_base_url(ZEROEX_API_URL),
            oneinch: AdapterConfig::with_base_url(ONEINCH_API_URL),
        }
    }
}

impl GasConfig {
    pub fn policy(&self) -> GasPolicy {
        GasPolicy {
            multiplier_numerator: self.multiplier_numerator,
            multiplier_denominator: self.multiplier_denominator,
            buffer: self.buffer,
        }
    }

    pub fn simulation_timeout(&self) -> Duration {
        Duration::from_millis(self.simulation_timeout_ms)
    }
}

impl AggregatorConfig {
    pub fn quote_timeout(&self) -> Duration {
        Duration::from_millis(self.quote_timeout_ms)
    }
}

impl Config {
    pub async fn load(path: &str) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read config file {}", path))?;
        let config: Config = toml::from_str(&content).with_context(|| format!("failed to parse {}", path))?;
        Ok(config)
    }

    pub async fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    /// 프로세스 환경 변수로 덮어쓰기
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok().filter(|v| !v.is_empty()));
    }

    /// 조회 함수로 덮어쓰기 (테스트에서 환경 변수 없이 사용)
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("ALPHA_ROUTER_URL") {
            debug!("ALPHA_ROUTER_URL override: {}", url);
            self.adapters.alpha_router.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(url) = lookup("ZEROEX_API_URL") {
            self.adapters.zeroex.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(key) = lookup("ZEROEX_API_KEY") {
            self.adapters.zeroex.api_key = Some(key);
        }
        if let Some(url) = lookup("ONEINCH_API_URL") {
            self.adapters.oneinch.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(key) = lookup("ONEINCH_API_KEY") {
            self.adapters.oneinch.api_key = Some(key);
        }
        for chain in Chain::ALL {
            let key = format!("RPC_URL_{}", chain.name().to_uppercase());
            if let Some(url) = lookup(&key) {
                self.rpc.urls.insert(chain.name().to_string(), url);
            }
        }
    }

    pub fn rpc_url(&self, chain: Chain) -> Option<&str> {
        self.rpc.urls.get(chain.name()).map(String::as_str)
    }

    pub fn validate(&self) -> Result<()> {
        if self.aggregator.quote_timeout_ms == 0 {
            return Err(anyhow::anyhow!("Quote timeout must be greater than 0"));
        }
        if !is_valid_slippage_bps(self.aggregator.default_slippage_bps) {
            return Err(anyhow::anyhow!(
                "Default slippage must be at most {} bps",
                BPS_DENOMINATOR
            ));
        }

        if self.gas.multiplier_denominator == 0 {
            return Err(anyhow::anyhow!("Gas multiplier denominator cannot be zero"));
        }
        if self.gas.multiplier_numerator < self.gas.multiplier_denominator {
            return Err(anyhow::anyhow!("Gas multiplier must not shrink the simulated estimate"));
        }
        if self.gas.approval_gas_limit == 0 {
            return Err(anyhow::anyhow!("Approval gas limit must be greater than 0"));
        }

        for (name, adapter) in [
            ("alpha_router", &self.adapters.alpha_router),
            ("zeroex", &self.adapters.zeroex),
            ("oneinch", &self.adapters.oneinch),
        ] {
            if adapter.enabled && adapter.base_url.is_empty() {
                return Err(anyhow::anyhow!("Adapter {} base URL cannot be empty", name));
            }
        }

        for name in self.rpc.urls.keys() {
            name.parse::<Chain>()
                .map_err(|e| anyhow::anyhow!("Invalid [rpc] entry: {}", e))?;
        }

        Ok(())
    }
}
