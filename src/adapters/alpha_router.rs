use std::time::Instant;

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::http::{bps_to_percent, build_client, parse_leading_u64, percent_to_bps, send_json, string_or_number};
use super::traits::*;
use crate::blockchain::abi::encode_alpha_swap;
use crate::common::amounts::parse_base_units;
use crate::common::tokens::{is_native, normalize_token, provider_facing};
use crate::constants::*;
use crate::execution::transaction_builder::minimum_amount_out;
use crate::types::*;

const NAME: &str = "alpha_router";
const SUPPORTED_CHAINS: [Chain; 1] = [Chain::Base];

/// POST /api/quote 요청 바디
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct AlphaQuoteRequest {
    chain: String,
    from_token: String,
    to_token: String,
    amount_in: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_address: Option<String>,
    /// 퍼센트 단위 (0.5 = 50bps)
    #[serde(skip_serializing_if = "Option::is_none")]
    slippage: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
struct AlphaQuoteResponse {
    #[serde(default)]
    success: bool,
    quote: Option<AlphaQuote>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AlphaQuote {
    #[serde(default, deserialize_with = "string_or_number")]
    amount_out: String,
    #[serde(default)]
    route: Vec<AlphaRouteStep>,
    fees: Option<AlphaRouteFees>,
    impact: Option<AlphaRouteImpact>,
    routing: Option<AlphaRoutingInfo>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AlphaRouteStep {
    #[serde(default)]
    dex: String,
    #[serde(default)]
    pool_address: String,
    #[serde(default, deserialize_with = "string_or_number")]
    amount_out: String,
    #[serde(default, deserialize_with = "string_or_number")]
    gas_estimate: String,
    #[serde(default, deserialize_with = "string_or_number")]
    price_impact: String,
    #[serde(default)]
    path: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AlphaDexFee {
    #[serde(default)]
    dex: String,
    #[serde(default, deserialize_with = "string_or_number")]
    amount: String,
    #[serde(default)]
    percent: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AlphaRouteFees {
    #[serde(default)]
    dex_fees: Vec<AlphaDexFee>,
    total_dex_fees: Option<String>,
    gas_cost: Option<String>,
    #[serde(rename = "gasCostUSD")]
    gas_cost_usd: Option<f64>,
    our_fee: Option<String>,
    our_fee_percent: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AlphaRouteImpact {
    price_impact_percent: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AlphaRoutingInfo {
    #[serde(default)]
    is_split: bool,
    #[serde(default)]
    hops: u32,
    #[serde(default)]
    complexity: String,
    #[serde(default)]
    best_source: String,
}

/// Alpha Router가 자체적으로 돌려주는 경쟁사 비교 (참고용)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamComparison {
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub amount_out: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub difference: String,
    #[serde(default)]
    pub percent_difference: f64,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub available: bool,
}

/// Alpha Router 어댑터 (Base 전용, GA 기반 라우팅 API)
pub struct AlphaRouterAdapter {
    config: AdapterConfig,
    client: reqwest::Client,
}

impl AlphaRouterAdapter {
    pub fn new(config: AdapterConfig) -> Self {
        let client = build_client(config.timeout());
        Self { config, client }
    }

    fn router(&self) -> Address {
        self.config.router_address.unwrap_or(ALPHA_ROUTER_CONTRACT)
    }

    /// 업스트림이 보고한 경쟁사 비교 목록; 집계기 순위에는 사용하지 않음
    pub fn upstream_comparisons(quote: &NormalizedQuote) -> Vec<UpstreamComparison> {
        quote
            .raw_payload
            .get("quote")
            .and_then(|quote| quote.get("comparison"))
            .cloned()
            .and_then(|value| serde_json::from_value(value).ok())
            .unwrap_or_default()
    }

    fn parse_address(&self, raw: &str, field: &str) -> Result<Address, AdapterError> {
        raw.parse()
            .map_err(|_| AdapterError::unavailable(NAME, format!("malformed {} address '{}'", field, raw)))
    }

    fn normalize_step(&self, step: &AlphaRouteStep) -> Result<RouteStep, AdapterError> {
        if step.path.len() < 2 {
            return Err(AdapterError::unavailable(NAME, "route step path has fewer than two tokens"));
        }
        let path = step
            .path
            .iter()
            .map(|token| self.parse_address(token, "path"))
            .collect::<Result<Vec<_>, _>>()?;
        let amount_out = parse_base_units(&step.amount_out)
            .map_err(|e| AdapterError::unavailable(NAME, format!("malformed step amountOut: {}", e)))?;

        Ok(RouteStep {
            source_venue: step.dex.clone(),
            pool_identifier: step.pool_address.clone(),
            amount_out,
            gas_estimate: parse_leading_u64(&step.gas_estimate),
            price_impact_bps: percent_to_bps(step.price_impact.trim().parse().unwrap_or(0.0)),
            path,
        })
    }

    /// 업스트림 응답을 공통 견적 형태로 변환
    fn normalize(
        &self,
        chain: Chain,
        from_token: Address,
        to_token: Address,
        amount_in: U256,
        payload: serde_json::Value,
        started: Instant,
    ) -> Result<NormalizedQuote, AdapterError> {
        let response: AlphaQuoteResponse = serde_json::from_value(payload.clone())
            .map_err(|e| AdapterError::unavailable(NAME, format!("malformed response: {}", e)))?;

        let quote = match (response.success, response.quote) {
            (true, Some(quote)) => quote,
            _ => return Err(AdapterError::unavailable(NAME, "no valid quote returned")),
        };

        let amount_out = parse_base_units(&quote.amount_out)
            .map_err(|e| AdapterError::unavailable(NAME, format!("malformed amountOut: {}", e)))?;
        if amount_out.is_zero() {
            return Err(AdapterError::unavailable(NAME, "no usable route"));
        }

        let route = quote
            .route
            .iter()
            .map(|step| self.normalize_step(step))
            .collect::<Result<Vec<_>, _>>()?;

        let summed = route_gas(&route);
        let total_gas_estimate = if summed == 0 { DEFAULT_SWAP_GAS } else { summed };

        let price_impact_bps = quote
            .impact
            .as_ref()
            .and_then(|impact| impact.price_impact_percent)
            .map(percent_to_bps)
            .unwrap_or_else(|| route.iter().map(|s| s.price_impact_bps).max().unwrap_or(0));

        let fee_breakdown = quote
            .fees
            .map(|fees| FeeBreakdown {
                venue_fees: fees
                    .dex_fees
                    .into_iter()
                    .map(|fee| VenueFee {
                        venue: fee.dex,
                        amount: fee.amount,
                        percent: fee.percent,
                    })
                    .collect(),
                total_venue_fees: fees.total_dex_fees,
                gas_cost: fees.gas_cost,
                gas_cost_usd: fees.gas_cost_usd,
                platform_fee: fees.our_fee,
                platform_fee_percent: fees.our_fee_percent,
            })
            .unwrap_or_default();

        let routing = quote.routing.map(|info| RoutingInfo {
            is_split: info.is_split,
            hops: info.hops,
            complexity: info.complexity,
            best_source: info.best_source,
        });

        Ok(NormalizedQuote {
            provider_name: NAME.to_string(),
            chain,
            token_in: from_token,
            token_out: to_token,
            amount_in,
            amount_out,
            route,
            total_gas_estimate,
            fee_breakdown,
            price_impact_bps,
            execution_time_ms: started.elapsed().as_millis() as u64,
            approval_target: self.router(),
            routing,
            transaction: None,
            calldata_binding: None,
            quoted_at: Utc::now(),
            raw_payload: payload,
        })
    }
}

#[async_trait]
impl SwapAdapter for AlphaRouterAdapter {
    fn name(&self) -> &str {
        NAME
    }

    fn token(&self) -> &str {
        "ALPHA"
    }

    fn referral(&self) -> bool {
        false
    }

    fn is_output_available(&self) -> bool {
        false
    }

    fn supported_chains(&self) -> &[Chain] {
        &SUPPORTED_CHAINS
    }

    fn approval_address(&self, _chain: Chain) -> Address {
        self.router()
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
                provider: NAME.to_string(),
                chain,
            });
        }

        let started = Instant::now();
        let body = AlphaQuoteRequest {
            chain: chain.name().to_string(),
            from_token: provider_facing(chain, from_token),
            to_token: provider_facing(chain, to_token),
            amount_in: amount_in.to_string(),
            user_address: options.recipient().map(|user| format!("{:#x}", user)),
            slippage: options.slippage_bps.map(bps_to_percent),
        };
        debug!("Alpha Router quote request: {:?}", body);

        let request = self.client.post(self.config.endpoint("/api/quote")).json(&body);
        let payload: serde_json::Value = send_json(NAME, request).await?;
        let mut quote = self.normalize(chain, from_token, to_token, amount_in, payload, started)?;

        if let Some(user) = options.recipient() {
            let slippage = options.slippage_bps.unwrap_or(DEFAULT_SLIPPAGE_BPS);
            match self.build_transaction(&quote, user, slippage) {
                Ok(tx) => quote.transaction = Some(tx),
                Err(e) => warn!("⚠️ Alpha Router quote kept without transaction: {}", e),
            }
        }

        info!(
            "🔀 Alpha Router: {} -> {} = {} ({} hops, {}ms)",
            body.from_token,
            body.to_token,
            quote.amount_out,
            quote.route.len(),
            quote.execution_time_ms
        );
        Ok(quote)
    }

    fn build_transaction(
        &self,
        quote: &NormalizedQuote,
        user: Address,
        slippage_bps: u32,
    ) -> Result<SwapTransaction, AdapterError> {
        let minimum = minimum_amount_out(quote.amount_out, slippage_bps);
        let pools = quote
            .route
            .iter()
            .map(|step| {
                step.pool_identifier.parse::<Address>().map_err(|_| {
                    AdapterError::build_failed(NAME, format!("pool identifier '{}' is not an address", step.pool_identifier))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let data = encode_alpha_swap(
            normalize_token(quote.chain, quote.token_in),
            normalize_token(quote.chain, quote.token_out),
            quote.amount_in,
            minimum,
            user,
            pools,
        );

        Ok(SwapTransaction {
            from: user,
            to: self.router(),
            data,
            value: if is_native(quote.token_in) { quote.amount_in } else { U256::ZERO },
            gas_limit: quote.total_gas_estimate,
            minimum_amount_out: minimum,
        })
    }
}
