use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::U256;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::constants::*;
use crate::types::{SwapTransaction, TxRequest};

/// 슬리피지 하한: floor(amount_out × (10000 − bps) / 10000)
///
/// bps가 10000을 넘으면 0으로 포화됩니다.
pub fn minimum_amount_out(amount_out: U256, slippage_bps: u32) -> U256 {
    let denominator = U256::from(BPS_DENOMINATOR);
    let keep = U256::from(BPS_DENOMINATOR.saturating_sub(slippage_bps as u64));
    // amount_out × keep는 U256 범위를 넘을 수 있으므로 몫/나머지로 분리
    let whole = amount_out / denominator;
    let rest = amount_out % denominator;
    whole * keep + rest * keep / denominator
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GasSimulationError {
    #[error("Gas simulation failed: {0}")]
    Failed(String),

    #[error("Gas simulation timed out after {0}ms")]
    Timeout(u64),
}

/// 온체인 가스 시뮬레이션 협력자
#[async_trait]
pub trait GasSimulator: Send + Sync {
    async fn estimate_gas(&self, tx: &TxRequest) -> Result<u64, GasSimulationError>;
}

/// 시뮬레이션 가스에 적용할 안전 마진
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasPolicy {
    pub multiplier_numerator: u64,
    pub multiplier_denominator: u64,
    pub buffer: u64,
}

impl Default for GasPolicy {
    fn default() -> Self {
        Self {
            multiplier_numerator: GAS_MULTIPLIER_NUMERATOR,
            multiplier_denominator: GAS_MULTIPLIER_DENOMINATOR,
            buffer: GAS_BUFFER,
        }
    }
}

impl GasPolicy {
    /// simulated × 12 / 10 + 86000 (기본값)
    pub fn pad(&self, simulated: u64) -> u64 {
        let denominator = self.multiplier_denominator.max(1) as u128;
        let scaled = simulated as u128 * self.multiplier_numerator as u128 / denominator;
        u64::try_from(scaled).unwrap_or(u64::MAX).saturating_add(self.buffer)
    }
}

/// 가스 추정 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GasEstimate {
    /// 시뮬레이션 성공, 패딩 적용
    Simulated { simulated: u64, padded: u64 },
    /// 시뮬레이션 실패, 정적 추정치 그대로 사용
    Static { gas_limit: u64 },
}

impl GasEstimate {
    pub fn gas_limit(&self) -> u64 {
        match self {
            GasEstimate::Simulated { padded, .. } => *padded,
            GasEstimate::Static { gas_limit } => *gas_limit,
        }
    }

    pub fn is_simulated(&self) -> bool {
        matches!(self, GasEstimate::Simulated { .. })
    }
}

/// 트랜잭션 가스 안전 정책 적용기
#[derive(Clone)]
pub struct TransactionBuilder {
    simulator: Arc<dyn GasSimulator>,
    policy: GasPolicy,
    simulation_timeout: Duration,
}

impl TransactionBuilder {
    pub fn new(simulator: Arc<dyn GasSimulator>, policy: GasPolicy, simulation_timeout: Duration) -> Self {
        Self {
            simulator,
            policy,
            simulation_timeout,
        }
    }

    pub fn policy(&self) -> GasPolicy {
        self.policy
    }

    /// 단일 시뮬레이션 시도 후 실패 시 정적 추정치로 대체 (에러 아님)
    pub async fn estimate(&self, tx: &TxRequest, static_gas: u64) -> GasEstimate {
        debug!("⛽ Simulating gas for tx to {}", tx.to);

        let outcome = match tokio::time::timeout(self.simulation_timeout, self.simulator.estimate_gas(tx)).await {
            Ok(result) => result,
            Err(_) => Err(GasSimulationError::Timeout(self.simulation_timeout.as_millis() as u64)),
        };

        match outcome {
            Ok(simulated) => {
                let padded = self.policy.pad(simulated);
                info!("⛽ Gas simulated: {} -> {} (padded)", simulated, padded);
                GasEstimate::Simulated { simulated, padded }
            }
            Err(e) => {
                warn!("⚠️ {} - falling back to static estimate {}", e, static_gas);
                GasEstimate::Static { gas_limit: static_gas }
            }
        }
    }

    /// 스왑 트랜잭션의 gas_limit을 시뮬레이션 결과로 갱신
    pub async fn finalize(&self, mut tx: SwapTransaction) -> (SwapTransaction, GasEstimate) {
        let estimate = self.estimate(&TxRequest::from(&tx), tx.gas_limit).await;
        tx.gas_limit = estimate.gas_limit();
        (tx, estimate)
    }
}
