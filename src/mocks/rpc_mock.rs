use alloy::primitives::{Address, U256};
use async_trait::async_trait;

use crate::execution::dispatcher::AllowanceReader;
use crate::execution::transaction_builder::{GasSimulationError, GasSimulator};
use crate::types::TxRequest;

/// Mock 가스 시뮬레이터
#[derive(Debug, Clone)]
pub enum MockGasSimulator {
    Succeeding(u64),
    Failing(String),
    Hanging,
}

impl MockGasSimulator {
    pub fn succeeding(gas: u64) -> Self {
        MockGasSimulator::Succeeding(gas)
    }

    pub fn failing(reason: &str) -> Self {
        MockGasSimulator::Failing(reason.to_string())
    }

    pub fn hanging() -> Self {
        MockGasSimulator::Hanging
    }
}

#[async_trait]
impl GasSimulator for MockGasSimulator {
    async fn estimate_gas(&self, _tx: &TxRequest) -> Result<u64, GasSimulationError> {
        match self {
            MockGasSimulator::Succeeding(gas) => Ok(*gas),
            MockGasSimulator::Failing(reason) => Err(GasSimulationError::Failed(reason.clone())),
            MockGasSimulator::Hanging => std::future::pending().await,
        }
    }
}

/// Mock allowance 조회기
#[derive(Debug, Clone)]
pub struct MockAllowanceReader {
    allowance: Option<U256>,
}

impl MockAllowanceReader {
    pub fn fixed(allowance: U256) -> Self {
        Self {
            allowance: Some(allowance),
        }
    }

    /// 항상 조회 실패
    pub fn failing() -> Self {
        Self { allowance: None }
    }
}

#[async_trait]
impl AllowanceReader for MockAllowanceReader {
    async fn allowance(&self, token: Address, _owner: Address, _spender: Address) -> anyhow::Result<U256> {
        self.allowance
            .ok_or_else(|| anyhow::anyhow!("mock allowance lookup failed for {}", token))
    }
}
