use std::time::Instant;

use alloy::primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::http::{build_client, parse_leading_u64, send_json, string_or_number};
use super::traits::*;
use crate::common::amounts::parse_base_units;
use crate::common::tokens::{normalize_token, upstream_token};
use crate::constants::*;
use crate::execution::transaction_builder::minimum_amount_out;
use crate::types::*;

const NAME: &str = "zeroex";

/// 0x v2 allowance-holder 응답 (/price, /quote 공통)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ZeroExResponse {
    #[serde(default = "default_true")]
    liquidity_available: bool,
    #[serde(default, deserialize_with = "string_or_number")]
    buy_amount: String,
    #[serde(default, deserialize_with = "string_or_number")]
    gas: String,
    #[serde(default, deserialize_with = "string_or_number")]
    total_network_fee: String,
    route: Option<ZeroExRoute>,
    fees: Option<ZeroExFees>,
    issues: Option<ZeroExIssues>,
    transaction: Option<ZeroExTransaction>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ZeroExRoute {
    #[serde(default)]
    fills: Vec<ZeroExFill>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ZeroExFill {
    from: String,
    to: String,
    #[serde(default)]
    source: String,
    #[serde(default, deserialize_with = "string_or_number")]
    proportion_bps: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ZeroExFees {
    zero_ex_fee: Option<ZeroExFee>,
    integrator_fee: Option<ZeroExFee>,
}

#[derive(Debug, Clone, Deserialize)]
struct ZeroExFee {
    #[serde(default, deserialize_with = "string_or_number")]
    amount: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ZeroExIssues {
    allowance: Option<ZeroExAllowanceIssue>,
}

#[derive(Debug, Clone, Deserialize)]
struct ZeroExAllowanceIssue {
    spender: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ZeroExTransaction {
    to: String,
    data: String,
    #[serde(default, deserialize_with = "string_or_number")]
    gas: String,
    #[serde(default, deserialize_with = "string_or_number")]
    value: String,
}

/// 0x 어댑터 (allowance-holder API)
pub struct ZeroExAdapter {
    config: AdapterConfig,
    client: reqwest::Client,
}

impl ZeroExAdapter {
    pub fn new(config: AdapterConfig) -> Self {
        let client = build_client(config.timeout());
        Self { config, client }
    }

    fn allowance_holder(&self) -> Address {
        self.config.router_address.unwrap_or(ZEROEX_ALLOWANCE_HOLDER)
    }

    /// taker가 있으면 /quote (calldata 포함), 없으면 /price
    fn request(&self, chain: Chain, from: Address, to: Address, amount_in: U256, options: &QuoteOptions) -> reqwest::RequestBuilder {
        let taker = options.recipient();
        let path = if taker.is_some() {
            "/swap/allowance-holder/quote"
        } else {
            "/swap/allowance-holder/price"
        };

        let mut query = vec![
            ("chainId", chain.chain_id().to_string()),
            ("sellToken", format!("{:#x}", upstream_token(chain, from, true))),
            ("buyToken", format!("{:#x}", upstream_token(chain, to, true))),
            ("sellAmount", amount_in.to_string()),
            // calldata의 최소 출력량이 이 값으로 인코딩됨
            ("slippageBps", options.slippage_bps.unwrap_or(DEFAULT_SLIPPAGE_BPS).to_string()),
        ];
        if let Some(taker) = taker {
            query.push(("taker", format!("{:#x}", taker)));
        }

        let mut request = self
            .client
            .get(self.config.endpoint(path))
            .query(&query)
            .header("0x-version", "v2");
        if let Some(api_key) = &self.config.api_key {
            request = request.header("0x-api-key", api_key);
        }
        request
    }

    fn normalize(
        &self,
        chain: Chain,
        from_token: Address,
        to_token: Address,
        amount_in: U256,
        payload: serde_json::Value,
        started: Instant,
    ) -> Result<NormalizedQuote, AdapterError> {
        let response: ZeroExResponse = serde_json::from_value(payload.clone())
            .map_err(|e| AdapterError::unavailable(NAME, format!("malformed response: {}", e)))?;

        if !response.liquidity_available {
            return Err(AdapterError::unavailable(NAME, "no liquidity available"));
        }
        let amount_out = parse_base_units(&response.buy_amount)
            .map_err(|e| AdapterError::unavailable(NAME, format!("malformed buyAmount: {}", e)))?;
        if amount_out.is_zero() {
            return Err(AdapterError::unavailable(NAME, "no usable route"));
        }

        let upstream_in = upstream_token(chain, from_token, true);
        let upstream_out = upstream_token(chain, to_token, true);
        let wrapped_in = normalize_token(chain, from_token);
        let fills = response.route.map(|r| r.fills).unwrap_or_default();

        let mut route = Vec::with_capacity(fills.len().max(1));
        for fill in &fills {
            let path = vec![parse_token(&fill.from)?, parse_token(&fill.to)?];
            let proportion = parse_leading_u64(&fill.proportion_bps).min(BPS_DENOMINATOR);
            route.push(RouteStep {
                source_venue: fill.source.clone(),
                pool_identifier: fill.source.clone(),
                amount_out: amount_out * U256::from(proportion) / U256::from(BPS_DENOMINATOR),
                gas_estimate: 0,
                price_impact_bps: 0,
                path,
            });
        }
        if route.is_empty() {
            route.push(RouteStep {
                source_venue: NAME.to_string(),
                pool_identifier: String::new(),
                amount_out,
                gas_estimate: 0,
                price_impact_bps: 0,
                path: vec![upstream_in, upstream_out],
            });
        }

        // 0x가 보고하는 gas는 경로 전체에 대한 값
        let gas = match parse_leading_u64(&response.gas) {
            0 => response
                .transaction
                .as_ref()
                .map(|tx| parse_leading_u64(&tx.gas))
                .filter(|gas| *gas > 0)
                .unwrap_or(DEFAULT_SWAP_GAS),
            gas => gas,
        };

        let best_source = fills
            .iter()
            .max_by_key(|fill| parse_leading_u64(&fill.proportion_bps))
            .map(|fill| fill.source.clone())
            .unwrap_or_else(|| NAME.to_string());
        let routing = Some(RoutingInfo {
            is_split: fills.len() > 1,
            hops: if fills.iter().any(|fill| {
                parse_token(&fill.from).map_or(true, |from| from != upstream_in && from != wrapped_in)
            }) {
                2
            } else {
                1
            },
            complexity: if fills.len() > 1 { "split" } else { "simple" }.to_string(),
            best_source,
        });

        let fees = response.fees.unwrap_or_default();
        let fee_breakdown = FeeBreakdown {
            gas_cost: Some(response.total_network_fee).filter(|fee| !fee.is_empty()),
            platform_fee: fees.zero_ex_fee.or(fees.integrator_fee).map(|fee| fee.amount),
            ..FeeBreakdown::default()
        };

        let approval_target = response
            .issues
            .and_then(|issues| issues.allowance)
            .and_then(|allowance| allowance.spender)
            .and_then(|spender| spender.parse().ok())
            .unwrap_or_else(|| self.allowance_holder());

        Ok(NormalizedQuote {
            provider_name: NAME.to_string(),
            chain,
            token_in: from_token,
            token_out: to_token,
            amount_in,
            amount_out,
            route,
            total_gas_estimate: gas,
            fee_breakdown,
            price_impact_bps: 0,
            execution_time_ms: started.elapsed().as_millis() as u64,
            approval_target,
            routing,
            transaction: None,
            calldata_binding: None,
            quoted_at: Utc::now(),
            raw_payload: payload,
        })
    }
}

fn parse_token(raw: &str) -> Result<Address, AdapterError> {
    raw.parse()
        .map_err(|_| AdapterError::unavailable(NAME, format!("malformed token address '{}'", raw)))
}

#[async_trait]
impl SwapAdapter for ZeroExAdapter {
    fn name(&self) -> &str {
        NAME
    }

    fn token(&self) -> &str {
        "ZRX"
    }

    fn referral(&self) -> bool {
        true
    }

    fn is_output_available(&self) -> bool {
        false
    }

    fn supported_chains(&self) -> &[Chain] {
        &Chain::ALL
    }

    fn quotes_native(&self) -> bool {
        true
    }

    fn approval_address(&self, _chain: Chain) -> Address {
        self.allowance_holder()
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
        let request = self.request(chain, from_token, to_token, amount_in, options);
        let payload: serde_json::Value = send_json(NAME, request).await?;
        let mut quote = self.normalize(chain, from_token, to_token, amount_in, payload, started)?;

        if let Some(user) = options.recipient() {
            let slippage = options.slippage_bps.unwrap_or(DEFAULT_SLIPPAGE_BPS);
            quote.calldata_binding = Some(CalldataBinding { taker: user, slippage_bps: slippage });
            match self.build_transaction(&quote, user, slippage) {
                Ok(tx) => quote.transaction = Some(tx),
                Err(e) => warn!("⚠️ 0x quote kept without transaction: {}", e),
            }
        }

        info!("🔀 0x: {} -> {} ({} gas, {}ms)", amount_in, quote.amount_out, quote.total_gas_estimate, quote.execution_time_ms);
        Ok(quote)
    }

    /// /quote 응답에 담긴 calldata를 그대로 사용 (견적 시 taker/슬리피지와 같아야 함)
    fn build_transaction(
        &self,
        quote: &NormalizedQuote,
        user: Address,
        slippage_bps: u32,
    ) -> Result<SwapTransaction, AdapterError> {
        AdapterError::check_binding(NAME, quote, user, slippage_bps)?;
        let tx: ZeroExTransaction = quote
            .raw_payload
            .get("transaction")
            .cloned()
            .and_then(|value| serde_json::from_value(value).ok())
            .ok_or_else(|| AdapterError::build_failed(NAME, "quote was fetched without a taker; no calldata"))?;

        let to: Address = tx
            .to
            .parse()
            .map_err(|_| AdapterError::build_failed(NAME, format!("invalid 'to' address: {}", tx.to)))?;
        let data = hex::decode(tx.data.trim_start_matches("0x"))
            .map_err(|e| AdapterError::build_failed(NAME, format!("invalid calldata: {}", e)))?;
        let value = if tx.value.is_empty() {
            U256::ZERO
        } else {
            parse_base_units(&tx.value).map_err(|e| AdapterError::build_failed(NAME, e.to_string()))?
        };
        let gas_limit = match parse_leading_u64(&tx.gas) {
            0 => quote.total_gas_estimate,
            gas => gas,
        };
        debug!("0x tx to {} ({} bytes calldata)", to, data.len());

        Ok(SwapTransaction {
            from: user,
            to,
            data: Bytes::from(data),
            value,
            gas_limit,
            minimum_amount_out: minimum_amount_out(quote.amount_out, slippage_bps),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::{ExecutionPlanner, GasPolicy, TransactionBuilder};
    use crate::mocks::upstream_mock::spawn_get;
    use crate::mocks::{MockAllowanceReader, MockGasSimulator};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio_test::{assert_err, assert_ok};

    fn price_body() -> serde_json::Value {
        json!({
            "liquidityAvailable": true,
            "buyAmount": "2490000000",
            "sellAmount": "1000000000000000000",
            "gas": "182000",
            "totalNetworkFee": "1820000000000",
            "route": {
                "fills": [
                    {"from": format!("{:#x}", WETH_BASE), "to": format!("{:#x}", USDC_BASE), "source": "Aerodrome_V3", "proportionBps": "7000"},
                    {"from": format!("{:#x}", WETH_BASE), "to": format!("{:#x}", USDC_BASE), "source": "Uniswap_V3", "proportionBps": "3000"}
                ],
                "tokens": []
            },
            "fees": {"zeroExFee": {"amount": "3735000", "token": format!("{:#x}", USDC_BASE), "type": "volume"}},
            "issues": {"allowance": null}
        })
    }

    fn quote_body() -> serde_json::Value {
        let mut body = price_body();
        body["transaction"] = json!({
            "to": "0x0000000000001ff3684f28c67538d4d072c22734",
            "data": "0x2213bc0b00ff",
            "gas": "190000",
            "gasPrice": "10000000",
            "value": "1000000000000000000"
        });
        body
    }

    fn adapter(url: &str) -> ZeroExAdapter {
        ZeroExAdapter::new(AdapterConfig::with_base_url(url))
    }

    #[tokio::test]
    async fn test_price_without_taker() {
        let (url, recorded) = spawn_get("/swap/allowance-holder/price", 200, price_body()).await;
        let options = QuoteOptions {
            user_address: None,
            slippage_bps: Some(50),
        };
        let quote = adapter(&url)
            .get_quote(Chain::Base, NATIVE_TOKEN, USDC_BASE, U256::from(1_000_000_000_000_000_000u64), &options)
            .await
            .unwrap();

        let sent = recorded.lock().unwrap()[0].clone();
        assert_eq!(sent["chainId"], "8453");
        assert_eq!(sent["sellToken"], format!("{:#x}", NATIVE_PLACEHOLDER));
        assert_eq!(sent["slippageBps"], "50");
        assert!(sent.get("taker").is_none());

        assert_eq!(quote.token_in, NATIVE_TOKEN);
        assert_eq!(quote.amount_out, U256::from(2_490_000_000u64));
        assert_eq!(quote.total_gas_estimate, 182_000);
        assert_eq!(quote.route.len(), 2);
        assert_eq!(quote.route[0].amount_out, U256::from(1_743_000_000u64));
        let routing = quote.routing.clone().unwrap();
        assert!(routing.is_split);
        assert_eq!(routing.best_source, "Aerodrome_V3");
        assert_eq!(quote.fee_breakdown.platform_fee.as_deref(), Some("3735000"));
        assert!(quote.transaction.is_none());
    }

    #[tokio::test]
    async fn test_quote_with_taker_embeds_calldata() {
        let (url, recorded) = spawn_get("/swap/allowance-holder/quote", 200, quote_body()).await;
        let user = Address::repeat_byte(0x42);
        let options = QuoteOptions {
            user_address: Some(user),
            slippage_bps: Some(50),
        };
        let quote = adapter(&url)
            .get_quote(Chain::Base, NATIVE_TOKEN, USDC_BASE, U256::from(1_000_000_000_000_000_000u64), &options)
            .await
            .unwrap();

        assert_eq!(recorded.lock().unwrap()[0]["taker"], format!("{:#x}", user));
        let tx = quote.transaction.unwrap();
        assert_eq!(tx.to, ZEROEX_ALLOWANCE_HOLDER);
        assert_eq!(tx.data, Bytes::from(vec![0x22, 0x13, 0xbc, 0x0b, 0x00, 0xff]));
        assert_eq!(tx.gas_limit, 190_000);
        assert_eq!(tx.value, U256::from(1_000_000_000_000_000_000u64));
        assert_eq!(tx.minimum_amount_out, U256::from(2_477_550_000u64));
    }

    #[tokio::test]
    async fn test_no_liquidity_is_unavailable() {
        let (url, _) = spawn_get("/swap/allowance-holder/price", 200, json!({"liquidityAvailable": false})).await;
        let err = adapter(&url)
            .get_quote(Chain::Ethereum, WETH_ETHEREUM, USDC_BASE, U256::from(1u64), &QuoteOptions::default())
            .await
            .unwrap_err();
        assert!(err.reason().contains("no liquidity"));
    }

    #[tokio::test]
    async fn test_rate_limited_is_unavailable() {
        let (url, _) = spawn_get("/swap/allowance-holder/price", 429, json!({"name": "RATE_LIMITED"})).await;
        let err = adapter(&url)
            .get_quote(Chain::Base, USDC_BASE, WETH_BASE, U256::from(1u64), &QuoteOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::QuoteUnavailable { status: Some(429), .. }));
    }

    #[test]
    fn test_build_transaction_requires_quote_calldata() {
        let adapter = adapter("http://unused");
        let quote = adapter
            .normalize(Chain::Base, USDC_BASE, WETH_BASE, U256::from(5u64), price_body(), Instant::now())
            .unwrap();
        let err = adapter.build_transaction(&quote, Address::repeat_byte(1), 50).unwrap_err();
        assert!(matches!(err, AdapterError::TransactionBuildFailed { .. }));
    }

    #[test]
    fn test_build_transaction_is_deterministic() {
        let adapter = adapter("http://unused");
        let mut quote = adapter
            .normalize(Chain::Base, NATIVE_TOKEN, USDC_BASE, U256::from(5u64), quote_body(), Instant::now())
            .unwrap();
        let user = Address::repeat_byte(9);
        quote.calldata_binding = Some(CalldataBinding { taker: user, slippage_bps: 100 });
        assert_eq!(
            adapter.build_transaction(&quote, user, 100).unwrap(),
            adapter.build_transaction(&quote, user, 100).unwrap()
        );
    }

    #[test]
    fn test_missing_gas_falls_back() {
        let mut body = price_body();
        body["gas"] = serde_json::Value::Null;
        let adapter = adapter("http://unused");
        let quote = adapter
            .normalize(Chain::Base, USDC_BASE, WETH_BASE, U256::from(5u64), body, Instant::now())
            .unwrap();
        assert_eq!(quote.total_gas_estimate, DEFAULT_SWAP_GAS);
    }

    #[tokio::test]
    async fn test_calldata_rejects_other_taker_or_slippage() {
        let (url, _) = spawn_get("/swap/allowance-holder/quote", 200, quote_body()).await;
        let quoted_user = Address::repeat_byte(0x42);
        let options = QuoteOptions {
            user_address: Some(quoted_user),
            slippage_bps: Some(50),
        };
        let adapter = adapter(&url);
        let quote = adapter
            .get_quote(Chain::Base, NATIVE_TOKEN, USDC_BASE, U256::from(1_000_000_000_000_000_000u64), &options)
            .await
            .unwrap();

        let other_user = Address::repeat_byte(0x99);
        for (user, bps) in [(other_user, 2000), (other_user, 50), (quoted_user, 2000)] {
            let err = assert_err!(adapter.build_transaction(&quote, user, bps));
            assert!(matches!(err, AdapterError::TransactionBuildFailed { .. }));
            assert!(err.to_string().contains("re-quote"));
        }

        let rebuilt = assert_ok!(adapter.build_transaction(&quote, quoted_user, 50));
        assert_eq!(Some(rebuilt), quote.transaction);
    }

    #[tokio::test]
    async fn test_native_sell_plan_sends_value_without_approval() {
        let (url, recorded) = spawn_get("/swap/allowance-holder/quote", 200, quote_body()).await;
        let amount = U256::from(1_000_000_000_000_000_000u64);
        let user = Address::repeat_byte(0x42);
        let options = QuoteOptions {
            user_address: Some(user),
            slippage_bps: Some(50),
        };
        let quote = adapter(&url)
            .get_quote(Chain::Base, NATIVE_TOKEN, USDC_BASE, amount, &options)
            .await
            .unwrap();
        assert_eq!(recorded.lock().unwrap()[0]["sellToken"], format!("{:#x}", NATIVE_PLACEHOLDER));

        let tx = quote.transaction.clone().unwrap();
        let builder = TransactionBuilder::new(
            Arc::new(MockGasSimulator::failing("no rpc")),
            GasPolicy::default(),
            Duration::from_millis(50),
        );
        let planner = ExecutionPlanner::new(Arc::new(MockAllowanceReader::fixed(U256::ZERO)), builder, 60_000);
        let plan = planner.plan(Chain::Base, NATIVE_TOKEN, amount, quote.approval_target, &tx).await;

        assert!(!plan.requires_approval());
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.swap_step().unwrap().request.value, amount);
    }
}
