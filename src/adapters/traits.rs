use alloy::primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::common::amounts::AmountError;
use crate::constants::DEFAULT_QUOTE_TIMEOUT_MS;
use crate::execution::dispatcher::{ExecutionDispatcher, ExecutionError, ExecutionReport};
use crate::types::{Chain, NormalizedQuote, QuoteOptions, SwapTransaction, TxRequest};

/// 어댑터 에러 타입
#[derive(Debug, Clone, thiserror::Error)]
pub enum AdapterError {
    #[error("{provider} does not support chain {chain}")]
    UnsupportedChain { provider: String, chain: Chain },

    #[error("{provider} quote unavailable{}: {message}", status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default())]
    QuoteUnavailable {
        provider: String,
        status: Option<u16>,
        message: String,
    },

    #[error(transparent)]
    InvalidAmount(#[from] AmountError),

    #[error("{provider} transaction build failed: {message}")]
    TransactionBuildFailed { provider: String, message: String },
}

impl AdapterError {
    pub fn unavailable(provider: &str, message: impl Into<String>) -> Self {
        AdapterError::QuoteUnavailable {
            provider: provider.to_string(),
            status: None,
            message: message.into(),
        }
    }

    pub fn http(provider: &str, status: u16, body: impl Into<String>) -> Self {
        AdapterError::QuoteUnavailable {
            provider: provider.to_string(),
            status: Some(status),
            message: body.into(),
        }
    }

    pub fn build_failed(provider: &str, message: impl Into<String>) -> Self {
        AdapterError::TransactionBuildFailed {
            provider: provider.to_string(),
            message: message.into(),
        }
    }

    /// 프로바이더 calldata가 요청된 taker/슬리피지로 인코딩되었는지 확인
    ///
    /// 재인코딩할 수 없는 calldata이므로 다르면 재견적이 필요합니다.
    pub fn check_binding(provider: &str, quote: &NormalizedQuote, user: Address, slippage_bps: u32) -> Result<(), Self> {
        match quote.calldata_binding {
            None => Err(Self::build_failed(provider, "quote was fetched without a user; no calldata")),
            Some(binding) if binding.taker != user => Err(Self::build_failed(
                provider,
                format!("calldata was quoted for taker {}, not {}; re-quote", binding.taker, user),
            )),
            Some(binding) if binding.slippage_bps != slippage_bps => Err(Self::build_failed(
                provider,
                format!(
                    "calldata was quoted at {} bps slippage, not {} bps; re-quote",
                    binding.slippage_bps, slippage_bps
                ),
            )),
            Some(_) => Ok(()),
        }
    }

    /// 비교표에 표시할 사유
    pub fn reason(&self) -> String {
        match self {
            AdapterError::UnsupportedChain { chain, .. } => format!("chain {} not supported", chain),
            AdapterError::QuoteUnavailable { status: Some(status), message, .. } => {
                format!("HTTP {}: {}", status, message)
            }
            AdapterError::QuoteUnavailable { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// 어댑터 설정 (생성자에 명시적으로 전달)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// 등록 여부
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// API 베이스 URL
    pub base_url: String,
    /// API 키 (집계기용)
    #[serde(default)]
    pub api_key: Option<String>,
    /// HTTP 타임아웃 (ms)
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// 승인/라우터 컨트랙트 주소 오버라이드
    #[serde(default)]
    pub router_address: Option<Address>,
}

fn default_enabled() -> bool {
    true
}

fn default_timeout_ms() -> u64 {
    DEFAULT_QUOTE_TIMEOUT_MS
}

impl AdapterConfig {
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            enabled: true,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: None,
            timeout_ms: DEFAULT_QUOTE_TIMEOUT_MS,
            router_address: None,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

/// 라우팅 프로바이더 어댑터 트레이트
///
/// 모든 어댑터는 동일한 계약을 구현하므로 집계기는 이들을 다형적으로 다룹니다.
#[async_trait]
pub trait SwapAdapter: Send + Sync {
    /// 어댑터 이름
    fn name(&self) -> &str;

    /// 브랜드 토큰 심볼
    fn token(&self) -> &str;

    /// 레퍼럴 수수료 태깅 지원 여부
    fn referral(&self) -> bool;

    /// exact-output 견적 지원 여부
    fn is_output_available(&self) -> bool;

    /// 지원 체인
    fn supported_chains(&self) -> &[Chain];

    fn supports_chain(&self, chain: Chain) -> bool {
        self.supported_chains().contains(&chain)
    }

    /// 네이티브 자산을 0xEeee… 플레이스홀더로 직접 견적하는지 (아니면 wrapped native로 변환)
    fn quotes_native(&self) -> bool {
        false
    }

    /// 토큰 승인 대상 주소 (프로바이더별 상수)
    fn approval_address(&self, chain: Chain) -> Address;

    /// 견적 조회
    async fn get_quote(
        &self,
        chain: Chain,
        from_token: Address,
        to_token: Address,
        amount_in: U256,
        options: &QuoteOptions,
    ) -> Result<NormalizedQuote, AdapterError>;

    /// 이미 조회한 견적으로 트랜잭션 생성 (네트워크 I/O 없음, 결정적)
    fn build_transaction(
        &self,
        quote: &NormalizedQuote,
        user: Address,
        slippage_bps: u32,
    ) -> Result<SwapTransaction, AdapterError>;

    /// 견적에 포함된 calldata
    fn get_tx_data(&self, quote: &NormalizedQuote) -> Option<Bytes> {
        quote.transaction.as_ref().map(|tx| tx.data.clone())
    }

    /// 견적에 포함된 트랜잭션 요청
    fn get_tx(&self, quote: &NormalizedQuote) -> Option<TxRequest> {
        quote.transaction.as_ref().map(|tx| TxRequest {
            gas_limit: None,
            ..TxRequest::from(tx)
        })
    }

    /// 승인(필요 시) + 스왑 실행
    async fn swap(
        &self,
        dispatcher: &ExecutionDispatcher,
        quote: &NormalizedQuote,
        cancel: &CancellationToken,
    ) -> Result<ExecutionReport, ExecutionError> {
        let tx = quote.transaction.as_ref().ok_or_else(|| ExecutionError::MissingTransaction {
            provider: self.name().to_string(),
        })?;

        let plan = dispatcher
            .plan(quote.chain, quote.token_in, quote.amount_in, self.approval_address(quote.chain), tx)
            .await;
        dispatcher.execute(plan, cancel).await
    }
}
