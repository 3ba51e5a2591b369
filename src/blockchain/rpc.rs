use alloy::primitives::{Address, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::{TransactionInput, TransactionRequest};
use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, info};

use super::abi::IERC20;
use crate::execution::dispatcher::AllowanceReader;
use crate::execution::transaction_builder::{GasSimulationError, GasSimulator};
use crate::types::{Chain, TxRequest};

/// 블록체인 RPC 클라이언트
/// 가스 시뮬레이션(eth_estimateGas)과 ERC-20 allowance 조회만 담당합니다.
/// 서명/논스/브로드캐스트는 외부 제출 협력자의 책임입니다.
#[derive(Clone)]
pub struct BlockchainClient {
    provider: DynProvider,
    chain: Chain,
}

impl BlockchainClient {
    pub fn connect(chain: Chain, rpc_url: &str) -> Result<Self> {
        info!("🔌 {} RPC 클라이언트 초기화: {}", chain, rpc_url);
        let url = rpc_url.parse().with_context(|| format!("invalid rpc url: {}", rpc_url))?;
        let provider = ProviderBuilder::new().connect_http(url).erased();
        Ok(Self { provider, chain })
    }

    pub fn chain(&self) -> Chain {
        self.chain
    }

    fn to_rpc_request(tx: &TxRequest) -> TransactionRequest {
        let mut request = TransactionRequest::default()
            .from(tx.from)
            .to(tx.to)
            .value(tx.value)
            .input(TransactionInput::new(tx.data.clone()));
        if let Some(gas) = tx.gas_limit {
            request = request.gas_limit(gas);
        }
        request
    }
}

#[async_trait]
impl GasSimulator for BlockchainClient {
    async fn estimate_gas(&self, tx: &TxRequest) -> Result<u64, GasSimulationError> {
        // 가스 한도는 시뮬레이션 결과를 제한하지 않도록 제거
        let request = Self::to_rpc_request(&TxRequest { gas_limit: None, ..tx.clone() });
        let gas = self
            .provider
            .estimate_gas(request)
            .await
            .map_err(|e| GasSimulationError::Failed(e.to_string()))?;
        debug!("eth_estimateGas on {}: {}", self.chain, gas);
        Ok(gas)
    }
}

#[async_trait]
impl AllowanceReader for BlockchainClient {
    async fn allowance(&self, token: Address, owner: Address, spender: Address) -> Result<U256> {
        let erc20 = IERC20::new(token, &self.provider);
        let allowance = erc20
            .allowance(owner, spender)
            .call()
            .await
            .with_context(|| format!("allowance({}, {}) on {}", owner, spender, token))?;
        debug!("allowance {} -> {} on {}: {}", owner, spender, token, allowance);
        Ok(allowance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::Bytes;

    #[test]
    fn test_rpc_request_carries_fields() {
        let tx = TxRequest {
            from: Address::repeat_byte(0x01),
            to: Address::repeat_byte(0x02),
            data: Bytes::from(vec![0xab, 0xcd]),
            value: U256::from(5u64),
            gas_limit: Some(100_000),
        };
        let request = BlockchainClient::to_rpc_request(&tx);
        assert_eq!(request.from, Some(tx.from));
        assert_eq!(request.value, Some(U256::from(5u64)));
        assert_eq!(request.gas, Some(100_000));
        assert_eq!(request.input.input().cloned(), Some(tx.data.clone()));
    }

    #[test]
    fn test_connect_rejects_bad_url() {
        assert!(BlockchainClient::connect(Chain::Base, "not a url").is_err());
    }
}
