//! Concurrent quote collection and ranking across all registered adapters

pub mod ranking;

use std::time::Duration;

use alloy::primitives::U256;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::adapters::factory::AdapterRegistry;
use crate::adapters::traits::AdapterError;
use crate::common::amounts::AmountError;
use crate::common::validation::is_valid_slippage_bps;
use crate::constants::BPS_DENOMINATOR;
use crate::execution::transaction_builder::{GasEstimate, TransactionBuilder};
use crate::types::{ComparisonEntry, NormalizedQuote, QuoteSummary, SwapRequest, SwapTransaction};

#[derive(Debug, Clone, Error)]
pub enum AggregatorError {
    #[error(transparent)]
    InvalidAmount(#[from] AmountError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("No quotes available: {first_error}")]
    NoQuotesAvailable { first_error: AdapterError },

    #[error("Failed to build transaction from best quote: {0}")]
    TransactionBuild(AdapterError),
}

/// 집계 결과
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedQuotes {
    pub best: NormalizedQuote,
    /// 우승자를 제외한 모든 어댑터 (등록 순서)
    pub comparisons: Vec<ComparisonEntry>,
    pub summary: Option<QuoteSummary>,
}

/// 견적 + 가스 안전 정책이 적용된 트랜잭션
#[derive(Debug, Clone)]
pub struct PreparedSwap {
    pub quotes: AggregatedQuotes,
    pub transaction: SwapTransaction,
    pub gas: GasEstimate,
}

pub struct QuoteAggregator {
    registry: AdapterRegistry,
    quote_timeout: Duration,
}

impl QuoteAggregator {
    pub fn new(registry: AdapterRegistry, quote_timeout: Duration) -> Self {
        Self { registry, quote_timeout }
    }

    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    /// 네트워크 호출 전 사전 검증
    pub fn validate(&self, request: &SwapRequest) -> Result<(), AggregatorError> {
        if request.amount_in.is_zero() {
            return Err(AmountError::InvalidAmount {
                input: request.amount_in.to_string(),
                reason: "amount must be greater than zero".to_string(),
            }
            .into());
        }
        if request.from_token == request.to_token {
            return Err(AggregatorError::InvalidRequest(format!(
                "from and to token are the same ({})",
                request.from_token
            )));
        }
        if !is_valid_slippage_bps(request.slippage_tolerance_bps) {
            return Err(AggregatorError::InvalidRequest(format!(
                "slippage {} bps exceeds {}",
                request.slippage_tolerance_bps, BPS_DENOMINATOR
            )));
        }
        if self.registry.is_empty() {
            return Err(AggregatorError::InvalidRequest("no adapters registered".to_string()));
        }
        Ok(())
    }

    /// 모든 어댑터에 동시에 견적 요청 후 순위 결정
    pub async fn aggregate(&self, request: &SwapRequest) -> Result<AggregatedQuotes, AggregatorError> {
        self.validate(request)?;
        let options = request.quote_options();

        info!(
            "🔍 Requesting quotes from {} adapters on {} ({} -> {}, amount {})",
            self.registry.len(),
            request.chain,
            request.from_token,
            request.to_token,
            request.amount_in
        );

        let tasks = self.registry.adapters().iter().map(|adapter| {
            let options = &options;
            async move {
                let name = adapter.name().to_string();
                let call = adapter.get_quote(
                    request.chain,
                    request.from_token,
                    request.to_token,
                    request.amount_in,
                    options,
                );
                let outcome = match tokio::time::timeout(self.quote_timeout, call).await {
                    Ok(result) => result,
                    Err(_) => Err(AdapterError::unavailable(
                        &name,
                        format!("timed out after {}ms", self.quote_timeout.as_millis()),
                    )),
                };
                (name, outcome)
            }
        });
        let outcomes: Vec<(String, Result<NormalizedQuote, AdapterError>)> = join_all(tasks).await;

        for (name, outcome) in &outcomes {
            match outcome {
                Ok(quote) => debug!("{} quoted {} (gas {})", name, quote.amount_out, quote.total_gas_estimate),
                Err(e) => warn!("⚠️ Quote failed for {}: {}", name, e),
            }
        }

        let best_index = ranking::select_best(
            outcomes
                .iter()
                .enumerate()
                .filter_map(|(index, (_, outcome))| outcome.as_ref().ok().map(|quote| (index, quote))),
        );

        let Some(best_index) = best_index else {
            let first_error = outcomes
                .into_iter()
                .find_map(|(_, outcome)| outcome.err())
                .unwrap_or_else(|| AdapterError::unavailable("aggregator", "no adapters responded"));
            return Err(AggregatorError::NoQuotesAvailable { first_error });
        };

        let comparisons = ranking::build_comparisons(&outcomes, best_index);
        let summary = ranking::summarize(&outcomes, best_index);
        let best = match outcomes.into_iter().nth(best_index) {
            Some((_, Ok(quote))) => quote,
            _ => {
                return Err(AggregatorError::InvalidRequest(
                    "best quote disappeared during ranking".to_string(),
                ))
            }
        };

        info!(
            "🏆 Best quote: {} with {} ({} alternatives)",
            best.provider_name,
            best.amount_out,
            comparisons.len()
        );

        Ok(AggregatedQuotes {
            best,
            comparisons,
            summary,
        })
    }

    /// 집계 → 최선 견적으로 트랜잭션 생성 → 가스 시뮬레이션/패딩
    pub async fn prepare(
        &self,
        request: &SwapRequest,
        builder: &TransactionBuilder,
    ) -> Result<PreparedSwap, AggregatorError> {
        let user = request
            .user_address
            .ok_or_else(|| AggregatorError::InvalidRequest("a user address is required to build a transaction".to_string()))?;
        let quotes = self.aggregate(request).await?;

        let adapter = self.registry.get(&quotes.best.provider_name).ok_or_else(|| {
            AggregatorError::InvalidRequest(format!("adapter {} is not registered", quotes.best.provider_name))
        })?;
        let transaction = adapter
            .build_transaction(&quotes.best, user, request.slippage_tolerance_bps)
            .map_err(AggregatorError::TransactionBuild)?;

        let (transaction, gas) = builder.finalize(transaction).await;
        info!(
            "🧾 Transaction ready: to {}, gas limit {}, minimum out {}",
            transaction.to, transaction.gas_limit, transaction.minimum_amount_out
        );

        Ok(PreparedSwap {
            quotes,
            transaction,
            gas,
        })
    }
}

impl AggregatedQuotes {
    /// 모든 성공 견적의 최대 출력량 (최선 견적 포함)
    pub fn max_available_out(&self) -> U256 {
        self.comparisons
            .iter()
            .filter_map(|entry| entry.amount_out)
            .fold(self.best.amount_out, |max, out| max.max(out))
    }
}
