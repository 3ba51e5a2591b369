use std::sync::Mutex;
use std::time::{Duration, Instant};

use alloy::primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use crate::adapters::traits::{AdapterError, SwapAdapter};
use crate::common::tokens::{is_native, normalize_token};
use crate::execution::transaction_builder::minimum_amount_out;
use crate::types::*;

/// Mock 어댑터 동작
#[derive(Debug, Clone)]
pub enum MockBehavior {
    Quote { amount_out: U256, gas: u64 },
    Fail { status: Option<u16>, message: String },
    /// 응답하지 않음 (타임아웃 테스트용)
    Hang,
}

/// 테스트와 CLI mock 모드용 어댑터
pub struct MockAdapter {
    name: String,
    chains: Vec<Chain>,
    behavior: MockBehavior,
    delay: Duration,
    router: Address,
    seen: Mutex<Vec<(Address, Address)>>,
}

impl MockAdapter {
    pub fn new(name: &str, behavior: MockBehavior) -> Self {
        Self {
            name: name.to_string(),
            chains: Chain::ALL.to_vec(),
            behavior,
            delay: Duration::ZERO,
            router: Address::repeat_byte(0xaa),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn quoting(name: &str, amount_out: u64, gas: u64) -> Self {
        Self::new(name, MockBehavior::Quote { amount_out: U256::from(amount_out), gas })
    }

    pub fn failing(name: &str, status: Option<u16>, message: &str) -> Self {
        Self::new(
            name,
            MockBehavior::Fail {
                status,
                message: message.to_string(),
            },
        )
    }

    pub fn hanging(name: &str) -> Self {
        Self::new(name, MockBehavior::Hang)
    }

    pub fn with_chains(mut self, chains: &[Chain]) -> Self {
        self.chains = chains.to_vec();
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_router(mut self, router: Address) -> Self {
        self.router = router;
        self
    }

    /// 업스트림에 전달된 (from, to) 토큰 기록
    pub fn seen_tokens(&self) -> Vec<(Address, Address)> {
        self.seen.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl SwapAdapter for MockAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn token(&self) -> &str {
        "MOCK"
    }

    fn referral(&self) -> bool {
        false
    }

    fn is_output_available(&self) -> bool {
        false
    }

    fn supported_chains(&self) -> &[Chain] {
        &self.chains
    }

    fn approval_address(&self, _chain: Chain) -> Address {
        self.router
    }

    async fn get_quote(
        &self,
        chain: Chain,
        from_token: Address,
        to_token: Address,
        amount_in: U256,
        options: &QuoteOptions,
    ) -> Result<NormalizedQuote, AdapterError> {
        if !self.supports_chain(chain) {
            return Err(AdapterError::UnsupportedChain {
                provider: self.name.clone(),
                chain,
            });
        }

        let started = Instant::now();
        let upstream_in = normalize_token(chain, from_token);
        let upstream_out = normalize_token(chain, to_token);
        self.seen
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((upstream_in, upstream_out));
        debug!("{} mock quote {} -> {}", self.name, upstream_in, upstream_out);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let (amount_out, gas) = match &self.behavior {
            MockBehavior::Quote { amount_out, gas } => (*amount_out, *gas),
            MockBehavior::Fail { status: Some(status), message } => {
                return Err(AdapterError::http(&self.name, *status, message.clone()))
            }
            MockBehavior::Fail { status: None, message } => {
                return Err(AdapterError::unavailable(&self.name, message.clone()))
            }
            MockBehavior::Hang => std::future::pending().await,
        };

        if amount_out.is_zero() {
            return Err(AdapterError::unavailable(&self.name, "no usable route"));
        }

        let route = vec![RouteStep {
            source_venue: format!("{}-pool", self.name),
            pool_identifier: format!("{:#x}", self.router),
            amount_out,
            gas_estimate: gas,
            price_impact_bps: 0,
            path: vec![upstream_in, upstream_out],
        }];

        let mut quote = NormalizedQuote {
            provider_name: self.name.clone(),
            chain,
            token_in: from_token,
            token_out: to_token,
            amount_in,
            amount_out,
            total_gas_estimate: route_gas(&route),
            route,
            fee_breakdown: FeeBreakdown::default(),
            price_impact_bps: 0,
            execution_time_ms: started.elapsed().as_millis() as u64,
            approval_target: self.router,
            routing: None,
            transaction: None,
            calldata_binding: None,
            quoted_at: Utc::now(),
            raw_payload: serde_json::Value::Null,
        };

        if let Some(user) = options.recipient() {
            let slippage = options.slippage_bps.unwrap_or(crate::constants::DEFAULT_SLIPPAGE_BPS);
            quote.transaction = Some(self.build_transaction(&quote, user, slippage)?);
        }
        Ok(quote)
    }

    fn build_transaction(
        &self,
        quote: &NormalizedQuote,
        user: Address,
        slippage_bps: u32,
    ) -> Result<SwapTransaction, AdapterError> {
        let minimum = minimum_amount_out(quote.amount_out, slippage_bps);
        let mut data = Vec::with_capacity(64);
        data.extend_from_slice(&quote.amount_in.to_be_bytes::<32>());
        data.extend_from_slice(&minimum.to_be_bytes::<32>());

        Ok(SwapTransaction {
            from: user,
            to: self.router,
            data: Bytes::from(data),
            value: if is_native(quote.token_in) { quote.amount_in } else { U256::ZERO },
            gas_limit: quote.total_gas_estimate,
            minimum_amount_out: minimum,
        })
    }
}
